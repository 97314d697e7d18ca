// services/rehab-dash/src/state.rs
//
// View state for the terminal dashboard: focus, autocomplete lists, the
// add-patient overlay, notices and the activity log

use chrono::{DateTime, Local};

use svckit::types::{Machine, NewPatient, Patient};

use crate::store::FormField;
use crate::submit::Notice;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Patient,
    Machine,
    Field(FormField),
    Mode,
    Start,
}

impl Focus {
    pub const ORDER: [Focus; 11] = [
        Focus::Patient,
        Focus::Field(FormField::Weight),
        Focus::Field(FormField::CalfLength),
        Focus::Field(FormField::Sessions),
        Focus::Field(FormField::Height),
        Focus::Machine,
        Focus::Field(FormField::Degrees),
        Focus::Field(FormField::Repetitions),
        Focus::Field(FormField::StopDegrees),
        Focus::Mode,
        Focus::Start,
    ];

    fn position(&self) -> usize {
        Self::ORDER.iter().position(|f| f == self).unwrap_or(0)
    }

    pub fn next(&self) -> Focus {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(&self) -> Focus {
        let len = Self::ORDER.len();
        Self::ORDER[(self.position() + len - 1) % len]
    }
}

/// An open autocomplete dropdown with the highlighted row.
#[derive(Debug, Clone)]
pub struct Suggestions<T> {
    pub items: Vec<T>,
    pub highlighted: usize,
}

impl<T> Suggestions<T> {
    /// `None` when there is nothing to show; an empty dropdown is never displayed.
    pub fn open(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self { items, highlighted: 0 })
        }
    }

    pub fn up(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.highlighted + 1 < self.items.len() {
            self.highlighted += 1;
        }
    }

    pub fn current(&self) -> Option<&T> {
        self.items.get(self.highlighted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayField {
    Name,
    Height,
    Calf,
    Weight,
}

impl OverlayField {
    pub const ORDER: [OverlayField; 4] = [
        OverlayField::Name,
        OverlayField::Height,
        OverlayField::Calf,
        OverlayField::Weight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OverlayField::Name => "Nombre",
            OverlayField::Height => "Altura",
            OverlayField::Calf => "Pantorrilla",
            OverlayField::Weight => "Peso",
        }
    }

    pub fn next(&self) -> OverlayField {
        let i = Self::ORDER.iter().position(|f| f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }
}

/// The add-patient form.
#[derive(Debug, Clone)]
pub struct PatientOverlay {
    pub form: NewPatient,
    pub focus: OverlayField,
}

impl PatientOverlay {
    pub fn new() -> Self {
        Self {
            form: NewPatient::default(),
            focus: OverlayField::Name,
        }
    }

    pub fn value(&self, field: OverlayField) -> &str {
        match field {
            OverlayField::Name => &self.form.nombre,
            OverlayField::Height => &self.form.altura,
            OverlayField::Calf => &self.form.tamano_de_la_pantorrilla,
            OverlayField::Weight => &self.form.peso,
        }
    }

    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            OverlayField::Name => &mut self.form.nombre,
            OverlayField::Height => &mut self.form.altura,
            OverlayField::Calf => &mut self.form.tamano_de_la_pantorrilla,
            OverlayField::Weight => &mut self.form.peso,
        }
    }
}

impl Default for PatientOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: String, // INFO, WARN, ERROR
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub focus: Focus,
    pub patient_suggestions: Option<Suggestions<Patient>>,
    pub machine_suggestions: Option<Suggestions<Machine>>,
    pub overlay: Option<PatientOverlay>,
    pub notice: Option<Notice>,
    pub submitting: bool,
    pub activity_log: Vec<LogEntry>,
    pub scroll_offset: usize,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            focus: Focus::Patient,
            patient_suggestions: None,
            machine_suggestions: None,
            overlay: None,
            notice: None,
            submitting: false,
            activity_log: Vec::new(),
            scroll_offset: 0,
        }
    }

    /// Move focus, closing any dropdown that belongs to the field being left.
    pub fn set_focus(&mut self, focus: Focus) {
        if focus != Focus::Patient {
            self.patient_suggestions = None;
        }
        if focus != Focus::Machine {
            self.machine_suggestions = None;
        }
        self.focus = focus;
    }

    pub fn show_notice(&mut self, notice: Notice) {
        let level = if notice.is_success() { "INFO" } else { "ERROR" };
        self.add_log(level, &notice.message);
        self.notice = Some(notice);
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        }
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset + 1 < self.activity_log.len() {
            self.scroll_offset += 1;
        }
    }

    pub fn add_log(&mut self, level: &str, message: &str) {
        self.activity_log.push(LogEntry {
            timestamp: Local::now(),
            level: level.to_string(),
            message: message.to_string(),
        });

        if self.activity_log.len() > MAX_LOG_ENTRIES {
            self.activity_log.remove(0);
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}
