// services/rehab-dash/src/gate.rs
//
// Validation gate for the start control

use svckit::types::ModeOption;

use crate::store::{FormField, Selection};

/// Form fields that must be filled before a session can start.
/// Sessions is informational and not required.
pub const REQUIRED_FIELDS: [FormField; 6] = [
    FormField::Weight,
    FormField::CalfLength,
    FormField::Height,
    FormField::Degrees,
    FormField::Repetitions,
    FormField::StopDegrees,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    PatientText,
    Field(FormField),
    Mode,
    MachineText,
    ConfirmedPatient,
}

impl Requirement {
    pub fn describe(&self) -> &'static str {
        match self {
            Requirement::PatientText => "Paciente",
            Requirement::Field(field) => field.label(),
            Requirement::Mode => "Modo",
            Requirement::MachineText => "Máquina",
            Requirement::ConfirmedPatient => "Paciente seleccionado",
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Every unmet precondition, in display order.
pub fn unmet_requirements(selection: &Selection, modes: &[ModeOption]) -> Vec<Requirement> {
    let mut unmet = Vec::new();

    if is_blank(&selection.patient_text) {
        unmet.push(Requirement::PatientText);
    }
    for field in REQUIRED_FIELDS {
        if is_blank(selection.fields.get(field)) {
            unmet.push(Requirement::Field(field));
        }
    }

    let active_modes = selection
        .active_mode
        .as_deref()
        .map(|tag| modes.iter().filter(|m| m.tag == tag).count())
        .unwrap_or(0);
    if active_modes != 1 {
        unmet.push(Requirement::Mode);
    }

    // Raw text only: a typed but unconfirmed machine passes.
    if is_blank(&selection.machine_text) {
        unmet.push(Requirement::MachineText);
    }
    if selection.selected_patient.is_none() {
        unmet.push(Requirement::ConfirmedPatient);
    }

    unmet
}

pub fn is_start_enabled(selection: &Selection, modes: &[ModeOption]) -> bool {
    unmet_requirements(selection, modes).is_empty()
}
