// services/rehab-dash/src/store.rs
//
// Selection store: catalog snapshots, the operator's selection, and the
// autocomplete filters over them

use svckit::types::{field_text, Machine, ModeOption, Patient};

use crate::gate;

pub const PATIENT_QUERY_MIN_CHARS: usize = 2;
pub const MACHINE_QUERY_MIN_CHARS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Weight,
    CalfLength,
    Sessions,
    Height,
    Degrees,
    Repetitions,
    StopDegrees,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Weight => "Peso",
            FormField::CalfLength => "Pantorrilla",
            FormField::Sessions => "Sesiones",
            FormField::Height => "Altura",
            FormField::Degrees => "Grados",
            FormField::Repetitions => "Repeticiones",
            FormField::StopDegrees => "Grados de paro",
        }
    }

    /// Increment used by the +/- buttons.
    pub fn step(&self) -> i64 {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields {
    pub weight: String,
    pub calf_length: String,
    pub sessions: String,
    pub height: String,
    pub degrees: String,
    pub repetitions: String,
    pub stop_degrees: String,
}

impl FormFields {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Weight => &self.weight,
            FormField::CalfLength => &self.calf_length,
            FormField::Sessions => &self.sessions,
            FormField::Height => &self.height,
            FormField::Degrees => &self.degrees,
            FormField::Repetitions => &self.repetitions,
            FormField::StopDegrees => &self.stop_degrees,
        }
    }

    fn get_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Weight => &mut self.weight,
            FormField::CalfLength => &mut self.calf_length,
            FormField::Sessions => &mut self.sessions,
            FormField::Height => &mut self.height,
            FormField::Degrees => &mut self.degrees,
            FormField::Repetitions => &mut self.repetitions,
            FormField::StopDegrees => &mut self.stop_degrees,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub patient_text: String,
    pub machine_text: String,
    pub selected_patient: Option<Patient>,
    pub selected_machine_id: Option<String>,
    pub active_mode: Option<String>,
    pub fields: FormFields,
}

#[derive(Debug, Clone)]
pub struct SelectionStore {
    machines: Vec<Machine>,
    patients: Vec<Patient>,
    modes: Vec<ModeOption>,
    selection: Selection,
    start_enabled: bool,
}

impl SelectionStore {
    pub fn new(modes: Vec<ModeOption>) -> Self {
        Self {
            machines: Vec::new(),
            patients: Vec::new(),
            modes,
            selection: Selection::default(),
            start_enabled: false,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn modes(&self) -> &[ModeOption] {
        &self.modes
    }

    pub fn is_start_enabled(&self) -> bool {
        self.start_enabled
    }

    fn revalidate(&mut self) {
        self.start_enabled = gate::is_start_enabled(&self.selection, &self.modes);
    }

    pub fn set_patients(&mut self, patients: Vec<Patient>) {
        self.patients = patients;
        self.revalidate();
    }

    pub fn set_machines(&mut self, machines: Vec<Machine>) {
        self.machines = machines;
        self.revalidate();
    }

    pub fn filter_patients(&self, query: &str) -> Vec<&Patient> {
        if query.chars().count() < PATIENT_QUERY_MIN_CHARS {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn filter_machines(&self, query: &str) -> Vec<&Machine> {
        if query.chars().count() < MACHINE_QUERY_MIN_CHARS {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.machines
            .iter()
            .filter(|m| !m.number.is_empty() && m.number.to_lowercase().contains(&needle))
            .collect()
    }

    /// Raw edit of the patient input. A confirmed patient survives only while
    /// the text still reads exactly as its name.
    pub fn set_patient_text(&mut self, text: &str) {
        self.selection.patient_text = text.to_string();
        let still_matches = self
            .selection
            .selected_patient
            .as_ref()
            .map(|p| p.name == text)
            .unwrap_or(true);
        if !still_matches {
            self.selection.selected_patient = None;
        }
        self.revalidate();
    }

    pub fn select_patient(&mut self, patient: &Patient) {
        let fields = &mut self.selection.fields;
        fields.weight = field_text(&patient.weight);
        fields.calf_length = field_text(&patient.calf_length);
        fields.sessions = field_text(&patient.sessions);
        fields.height = field_text(&patient.height);

        self.selection.patient_text = patient.name.clone();
        self.selection.selected_patient = Some(patient.clone());
        self.revalidate();
    }

    pub fn set_machine_text(&mut self, text: &str) {
        self.selection.machine_text = text.to_string();
        self.revalidate();
    }

    pub fn select_machine(&mut self, machine: &Machine) {
        self.selection.machine_text = machine.number.clone();
        self.selection.selected_machine_id = Some(machine.number.clone());
        self.revalidate();
    }

    pub fn clear_machine(&mut self) {
        self.selection.machine_text.clear();
        self.selection.selected_machine_id = None;
        self.revalidate();
    }

    pub fn set_field(&mut self, field: FormField, value: &str) {
        *self.selection.fields.get_mut(field) = value.to_string();
        self.revalidate();
    }

    /// The +/- buttons: unparsable text counts as zero, stepping down stops at zero.
    pub fn step_field(&mut self, field: FormField, direction: StepDirection) {
        let current = leading_int(self.selection.fields.get(field));
        let next = match direction {
            StepDirection::Up => current.saturating_add(field.step()),
            StepDirection::Down => current.saturating_sub(field.step()).max(0),
        };
        self.set_field(field, &next.to_string());
    }

    /// Activate one mode option, deactivating the rest. Unknown tags are ignored.
    pub fn select_mode(&mut self, tag: &str) -> bool {
        if !self.modes.iter().any(|m| m.tag == tag) {
            return false;
        }
        self.selection.active_mode = Some(tag.to_string());
        self.revalidate();
        true
    }

    pub fn active_mode_index(&self) -> Option<usize> {
        let active = self.selection.active_mode.as_deref()?;
        self.modes.iter().position(|m| m.tag == active)
    }
}

/// Integer prefix of `text` (after leading whitespace), or 0.
fn leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svckit::types::{default_modes, Measure, PatientId};

    fn patient(id: i64, name: &str) -> Patient {
        Patient {
            id: PatientId::from(id),
            name: name.to_string(),
            weight: Some(Measure::Number(61.5)),
            calf_length: Some(Measure::Number(34.0)),
            sessions: Some(Measure::Text("4".to_string())),
            height: None,
        }
    }

    fn store() -> SelectionStore {
        let mut store = SelectionStore::new(default_modes());
        store.set_patients(vec![
            patient(1, "Ana Ruiz"),
            patient(2, "Juan Pérez"),
            patient(3, "Mariana López"),
        ]);
        store.set_machines(vec![Machine::new("M1"), Machine::new("m12"), Machine::new("X9"), Machine::new("")]);
        store
    }

    #[test]
    fn test_patient_filter_needs_two_chars() {
        let store = store();
        assert!(store.filter_patients("").is_empty());
        assert!(store.filter_patients("a").is_empty());
        assert_eq!(store.filter_patients("an").len(), 3);
    }

    #[test]
    fn test_patient_filter_is_case_insensitive_and_ordered() {
        let store = store();
        let names: Vec<&str> = store.filter_patients("AN").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana Ruiz", "Juan Pérez", "Mariana López"]);

        let names: Vec<&str> = store.filter_patients("pé").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Juan Pérez"]);
        assert!(store.filter_patients("zz").is_empty());
    }

    #[test]
    fn test_machine_filter_needs_one_char_and_skips_unnamed() {
        let store = store();
        assert!(store.filter_machines("").is_empty());
        let numbers: Vec<&str> = store.filter_machines("m").iter().map(|m| m.number.as_str()).collect();
        assert_eq!(numbers, vec!["M1", "m12"]);
        let numbers: Vec<&str> = store.filter_machines("9").iter().map(|m| m.number.as_str()).collect();
        assert_eq!(numbers, vec!["X9"]);
    }

    #[test]
    fn test_set_snapshots_replace_instead_of_merge() {
        let mut store = store();
        store.set_machines(vec![Machine::new("Z1")]);
        assert_eq!(store.machines().len(), 1);
        assert!(store.filter_machines("m").is_empty());
    }

    #[test]
    fn test_select_patient_populates_fields() {
        let mut store = store();
        let ana = store.patients()[0].clone();
        store.select_patient(&ana);

        let selection = store.selection();
        assert_eq!(selection.patient_text, "Ana Ruiz");
        assert_eq!(selection.selected_patient.as_ref().map(|p| &p.id), Some(&PatientId::from(1)));
        assert_eq!(selection.fields.weight, "61.5");
        assert_eq!(selection.fields.calf_length, "34");
        assert_eq!(selection.fields.sessions, "4");
        assert_eq!(selection.fields.height, "");
    }

    #[test]
    fn test_editing_patient_text_drops_confirmed_patient() {
        let mut store = store();
        let ana = store.patients()[0].clone();
        store.select_patient(&ana);

        store.set_patient_text("Ana Ruiz");
        assert!(store.selection().selected_patient.is_some());

        store.set_patient_text("Ana Rui");
        assert!(store.selection().selected_patient.is_none());

        // Retyping the full name is not a confirmation.
        store.set_patient_text("Ana Ruiz");
        assert!(store.selection().selected_patient.is_none());
    }

    #[test]
    fn test_step_field_parses_leading_integer_and_clamps() {
        let mut store = store();
        store.set_field(FormField::Degrees, "12.7");
        store.step_field(FormField::Degrees, StepDirection::Up);
        assert_eq!(store.selection().fields.degrees, "13");

        store.set_field(FormField::Degrees, "abc");
        store.step_field(FormField::Degrees, StepDirection::Up);
        assert_eq!(store.selection().fields.degrees, "1");

        store.set_field(FormField::Degrees, "0");
        store.step_field(FormField::Degrees, StepDirection::Down);
        assert_eq!(store.selection().fields.degrees, "0");

        store.set_field(FormField::Degrees, "-5");
        store.step_field(FormField::Degrees, StepDirection::Up);
        assert_eq!(store.selection().fields.degrees, "-4");
    }

    #[test]
    fn test_select_mode_rejects_unknown_tags() {
        let mut store = store();
        assert!(!store.select_mode("turbo"));
        assert_eq!(store.selection().active_mode, None);

        assert!(store.select_mode("pasivo"));
        assert!(store.select_mode("activo"));
        assert_eq!(store.selection().active_mode.as_deref(), Some("activo"));
        assert_eq!(store.active_mode_index(), Some(2));
    }

    #[test]
    fn test_clear_machine_resets_text_and_id() {
        let mut store = store();
        store.select_machine(&Machine::new("M1"));
        assert_eq!(store.selection().selected_machine_id.as_deref(), Some("M1"));
        store.clear_machine();
        assert_eq!(store.selection().machine_text, "");
        assert_eq!(store.selection().selected_machine_id, None);
    }

    #[test]
    fn test_every_mutation_recomputes_gate() {
        let mut store = store();
        let ana = store.patients()[0].clone();
        store.select_patient(&ana);
        store.set_field(FormField::Height, "170");
        store.set_field(FormField::Degrees, "90");
        store.set_field(FormField::Repetitions, "10");
        store.set_field(FormField::StopDegrees, "80");
        store.select_machine(&Machine::new("M1"));
        assert!(!store.is_start_enabled());

        store.select_mode("normal");
        assert!(store.is_start_enabled());

        store.set_field(FormField::Repetitions, "   ");
        assert!(!store.is_start_enabled());
        store.step_field(FormField::Repetitions, StepDirection::Up);
        assert!(store.is_start_enabled());

        store.clear_machine();
        assert!(!store.is_start_enabled());
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("  42kg"), 42);
        assert_eq!(leading_int("+7"), 7);
        assert_eq!(leading_int("-"), 0);
        assert_eq!(leading_int(""), 0);
    }
}
