// services/rehab-dash/src/controller.rs
//
// Dashboard controller. Owns the selection store and the status poller for
// the mounted lifetime of the view; every operator action goes through here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use svckit::errors::DashError;
use svckit::types::{Machine, ModeOption, Patient, StartCommand, DEFAULT_MODE, START_ACTION};

use crate::api::ClinicApi;
use crate::gate::{self, Requirement};
use crate::poller::{PollerState, StatusIndicator, StatusPoller};
use crate::store::{FormField, SelectionStore, StepDirection};
use crate::submit::CommandSubmitter;

pub struct Dashboard {
    api: Arc<dyn ClinicApi>,
    store: SelectionStore,
    poller: StatusPoller,
    submitter: CommandSubmitter,
}

impl Dashboard {
    pub fn new(api: Arc<dyn ClinicApi>, modes: Vec<ModeOption>, poll_interval: Duration) -> Self {
        Self {
            store: SelectionStore::new(modes),
            poller: StatusPoller::new(api.clone(), poll_interval),
            submitter: CommandSubmitter::new(api.clone()),
            api,
        }
    }

    /// Load both catalogs. A failed fetch leaves that list empty.
    pub async fn mount(&mut self) {
        match self.api.list_machines().await {
            Ok(machines) => {
                info!("Machines loaded: {}", machines.len());
                self.store.set_machines(machines);
            }
            Err(e) => error!("Failed to load machines: {}", e),
        }
        self.reload_patients().await;
        self.poller.stop();
    }

    pub fn unmount(&mut self) {
        self.poller.stop();
    }

    pub async fn reload_patients(&mut self) {
        match self.api.list_patients().await {
            Ok(patients) => self.set_patients(patients),
            Err(e) => error!("Failed to load patients: {}", e),
        }
    }

    /// Replace the patient catalog with a list fetched elsewhere.
    pub fn set_patients(&mut self, patients: Vec<Patient>) {
        info!("Patients loaded: {}", patients.len());
        self.store.set_patients(patients);
    }

    pub fn api(&self) -> Arc<dyn ClinicApi> {
        self.api.clone()
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn submitter(&self) -> CommandSubmitter {
        self.submitter.clone()
    }

    pub fn backend(&self) -> String {
        self.api.describe()
    }

    pub fn indicator(&self) -> StatusIndicator {
        self.poller.indicator()
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn is_start_enabled(&self) -> bool {
        self.store.is_start_enabled()
    }

    pub fn unmet_requirements(&self) -> Vec<Requirement> {
        gate::unmet_requirements(self.store.selection(), self.store.modes())
    }

    /// Patient input edited; returns the autocomplete suggestions.
    pub fn set_patient_text(&mut self, text: &str) -> Vec<Patient> {
        self.store.set_patient_text(text);
        self.store.filter_patients(text).into_iter().cloned().collect()
    }

    pub fn choose_patient(&mut self, patient: &Patient) {
        info!("Patient selected: {} ({})", patient.name, patient.id);
        self.store.select_patient(patient);
    }

    /// Machine input edited; returns the autocomplete suggestions. Emptying
    /// the input clears the machine and stops polling.
    pub fn set_machine_text(&mut self, text: &str) -> Vec<Machine> {
        if text.is_empty() {
            self.clear_machine();
            return Vec::new();
        }
        self.store.set_machine_text(text);
        self.store.filter_machines(text).into_iter().cloned().collect()
    }

    pub fn choose_machine(&mut self, machine: &Machine) {
        self.store.select_machine(machine);
        self.poller.start(&machine.number);
    }

    pub fn clear_machine(&mut self) {
        self.store.clear_machine();
        self.poller.stop();
    }

    pub fn set_field(&mut self, field: FormField, value: &str) {
        self.store.set_field(field, value);
    }

    pub fn step_field(&mut self, field: FormField, direction: StepDirection) {
        self.store.step_field(field, direction);
    }

    pub fn select_mode(&mut self, tag: &str) -> bool {
        self.store.select_mode(tag)
    }

    /// Package the current selection as a start command. Machine text and a
    /// confirmed patient are re-checked here regardless of the gate.
    pub fn start_command(&self) -> Result<StartCommand, DashError> {
        let selection = self.store.selection();
        let machine = selection.machine_text.trim();
        let patient = selection
            .selected_patient
            .as_ref()
            .ok_or_else(|| DashError::ValidationError("no patient selected".to_string()))?;
        if machine.is_empty() {
            return Err(DashError::ValidationError("no machine entered".to_string()));
        }

        Ok(StartCommand {
            maquina: machine.to_string(),
            paciente: patient.id.clone(),
            grados: selection.fields.degrees.clone(),
            repeticiones: selection.fields.repetitions.clone(),
            stop_grados: selection.fields.stop_degrees.clone(),
            modo: selection
                .active_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_MODE.to_string()),
            accion: START_ACTION.to_string(),
        })
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}
