use serde::{Deserialize, Serialize};
use std::fmt;

/// Action tag sent with every start command.
pub const START_ACTION: &str = "iniciar";

/// Mode tag used when no mode option is active.
pub const DEFAULT_MODE: &str = "normal";

/// Status values the controller firmware reports for an idle machine.
pub const AVAILABLE_STATUSES: [&str; 2] = ["Disponible", "Available"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    #[serde(rename = "numero", default)]
    pub number: String,
}

impl Machine {
    pub fn new(number: impl Into<String>) -> Self {
        Self { number: number.into() }
    }
}

/// Backend primary key of a patient. Never interpreted, only echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub serde_json::Value);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<i64> for PatientId {
    fn from(id: i64) -> Self {
        PatientId(serde_json::Value::from(id))
    }
}

/// A patient measurement as it arrives from the backend: floats for the
/// physical measurements, free text for the session count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

impl Measure {
    /// Text shown in a form field. Zero and empty values render as blank.
    pub fn to_field_text(&self) -> String {
        match self {
            Measure::Number(n) if *n == 0.0 || n.is_nan() => String::new(),
            Measure::Number(n) => n.to_string(),
            Measure::Text(s) => s.clone(),
        }
    }
}

pub fn field_text(measure: &Option<Measure>) -> String {
    measure.as_ref().map(Measure::to_field_text).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "peso", default)]
    pub weight: Option<Measure>,
    #[serde(rename = "tamano_de_la_pantorrilla", default)]
    pub calf_length: Option<Measure>,
    #[serde(rename = "sesiones", default)]
    pub sessions: Option<Measure>,
    #[serde(rename = "altura", default)]
    pub height: Option<Measure>,
}

/// Body of `GET /estado_arduino/`. Only `estado` matters to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub estado: Option<String>,
}

impl StatusReport {
    pub fn is_available(&self) -> bool {
        self.estado
            .as_deref()
            .map(|s| AVAILABLE_STATUSES.contains(&s))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartCommand {
    pub maquina: String,
    pub paciente: PatientId,
    pub grados: String,
    pub repeticiones: String,
    pub stop_grados: String,
    pub modo: String,
    pub accion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub nombre: String,
    pub altura: String,
    pub tamano_de_la_pantorrilla: String,
    pub peso: String,
}

/// One selectable therapy mode; `tag` is what the backend receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOption {
    pub tag: String,
    pub label: String,
}

impl ModeOption {
    pub fn new(tag: &str, label: &str) -> Self {
        Self {
            tag: tag.to_string(),
            label: label.to_string(),
        }
    }
}

pub fn default_modes() -> Vec<ModeOption> {
    vec![
        ModeOption::new("normal", "Normal"),
        ModeOption::new("pasivo", "Pasivo"),
        ModeOption::new("activo", "Activo"),
    ]
}
