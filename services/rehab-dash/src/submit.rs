// services/rehab-dash/src/submit.rs
//
// Start-command and add-patient submission, reported as operator notices

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use svckit::errors::DashError;
use svckit::types::{NewPatient, StartCommand};

use crate::api::ClinicApi;

pub const MISSING_DATA_TEXT: &str = "Faltan datos para enviar.";
pub const SENT_TEXT: &str = "Datos enviados correctamente";
pub const REJECTED_TEXT: &str = "Error 400/500 al enviar datos.";
pub const UNREACHABLE_TEXT: &str = "Error conectando al servidor.";
pub const IN_FLIGHT_TEXT: &str = "Ya hay un envío en curso.";
pub const PATIENT_SAVED_TEXT: &str = "Datos guardados en la base de datos";
pub const PATIENT_FAILED_TEXT: &str = "Error guardando datos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// A one-shot message for the operator (the dashboard's alert box).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: &str) -> Self {
        Self { level: NoticeLevel::Success, message: message.to_string() }
    }

    pub fn failure(message: &str) -> Self {
        Self { level: NoticeLevel::Failure, message: message.to_string() }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }

    /// Notice for a failed start command.
    pub fn for_command_error(err: &DashError) -> Self {
        match err {
            DashError::ValidationError(_) => Self::failure(MISSING_DATA_TEXT),
            DashError::InFlight => Self::failure(IN_FLIGHT_TEXT),
            e if e.is_unreachable() => Self::failure(UNREACHABLE_TEXT),
            _ => Self::failure(REJECTED_TEXT),
        }
    }
}

/// Clears the in-flight flag when the submission finishes, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct CommandSubmitter {
    api: Arc<dyn ClinicApi>,
    in_flight: Arc<AtomicBool>,
}

impl CommandSubmitter {
    pub fn new(api: Arc<dyn ClinicApi>) -> Self {
        Self {
            api,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<InFlightGuard, DashError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(self.in_flight.clone()))
            .map_err(|_| DashError::InFlight)
    }

    /// Send a start command. Only one may be outstanding.
    pub async fn send_start(&self, command: &StartCommand) -> Result<serde_json::Value, DashError> {
        let _guard = self.acquire()?;
        info!(
            "Sending start command: machine={} patient={} mode={}",
            command.maquina, command.paciente, command.modo
        );
        self.api.send_command(command).await
    }

    /// Submit the start command built from the current selection. `Err` from
    /// `built` means the selection was incomplete; no request is made then.
    pub async fn submit_start(&self, built: Result<StartCommand, DashError>) -> Notice {
        let command = match built {
            Ok(command) => command,
            Err(e) => {
                warn!("Start refused: {}", e);
                return Notice::for_command_error(&e);
            }
        };

        match self.send_start(&command).await {
            Ok(reply) => {
                info!("Backend accepted start command: {}", reply);
                Notice::success(SENT_TEXT)
            }
            Err(e) => {
                error!("Start command failed: {}", e);
                Notice::for_command_error(&e)
            }
        }
    }

    pub async fn add_patient(&self, patient: &NewPatient) -> Notice {
        match self.api.add_patient(patient).await {
            Ok(reply) => {
                info!("Patient {} saved: {}", patient.nombre, reply);
                Notice::success(PATIENT_SAVED_TEXT)
            }
            Err(e) => {
                error!("Saving patient {} failed: {}", patient.nombre, e);
                Notice::failure(PATIENT_FAILED_TEXT)
            }
        }
    }
}
