// services/rehab-dash/src/mock.rs
//
// In-process clinic backend for demo mode

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::json;
use tracing::info;

use svckit::errors::DashError;
use svckit::types::{Machine, Measure, NewPatient, Patient, PatientId, StartCommand, StatusReport};

use crate::api::ClinicApi;

/// Machine that never answers, to show the connection-error state.
pub const OFFLINE_MACHINE: &str = "REH-04";

pub struct MockClinic {
    machines: Vec<Machine>,
    patients: Mutex<Vec<Patient>>,
    commands: Mutex<Vec<StartCommand>>,
}

impl MockClinic {
    pub fn new() -> Self {
        let patients = [
            (1_i64, "Ana Martínez", 61.5, 34.0, "6", 1.64),
            (2, "Bruno Salas", 82.0, 39.5, "2", 1.80),
            (3, "Carmen Ortega", 70.2, 36.0, "11", 1.58),
            (4, "Diego Fuentes", 77.8, 38.0, "", 1.75),
            (5, "Elena Rivas", 55.0, 0.0, "1", 1.61),
        ]
        .into_iter()
        .map(|(id, name, weight, calf, sessions, height)| Patient {
            id: PatientId::from(id),
            name: name.to_string(),
            weight: Some(Measure::Number(weight)),
            calf_length: Some(Measure::Number(calf)),
            sessions: Some(Measure::Text(sessions.to_string())),
            height: Some(Measure::Number(height)),
        })
        .collect();

        Self {
            machines: ["REH-01", "REH-02", "REH-03", OFFLINE_MACHINE]
                .into_iter()
                .map(Machine::new)
                .collect(),
            patients: Mutex::new(patients),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<StartCommand> {
        self.commands.lock().clone()
    }
}

impl Default for MockClinic {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClinicApi for MockClinic {
    async fn list_machines(&self) -> Result<Vec<Machine>, DashError> {
        Ok(self.machines.clone())
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, DashError> {
        Ok(self.patients.lock().clone())
    }

    async fn fetch_status(&self, machine: &str) -> Result<StatusReport, DashError> {
        if machine == OFFLINE_MACHINE || !self.machines.iter().any(|m| m.number == machine) {
            return Err(DashError::NetworkError(format!("{} did not answer", machine)));
        }

        let running = self.commands.lock().iter().any(|c| c.maquina == machine);
        let mut rng = rand::thread_rng();
        let estado = if running || rng.gen_ratio(1, 5) { "Ocupado" } else { "Disponible" };
        Ok(StatusReport { estado: Some(estado.to_string()) })
    }

    async fn add_patient(&self, patient: &NewPatient) -> Result<serde_json::Value, DashError> {
        if patient.nombre.trim().is_empty() {
            return Err(DashError::Rejected { status: 400, body: "Falta nombre".to_string() });
        }

        let parse = |text: &str| text.trim().parse::<f64>().ok().map(Measure::Number);
        let mut patients = self.patients.lock();
        let id = patients.len() as i64 + 1;
        patients.push(Patient {
            id: PatientId::from(id),
            name: patient.nombre.clone(),
            weight: parse(&patient.peso),
            calf_length: parse(&patient.tamano_de_la_pantorrilla),
            sessions: None,
            height: parse(&patient.altura),
        });

        let username = patient.nombre.to_lowercase().replace(' ', "_");
        info!("Mock clinic registered patient {} as {}", patient.nombre, username);
        Ok(json!({"status": "ok", "username": username}))
    }

    async fn send_command(&self, command: &StartCommand) -> Result<serde_json::Value, DashError> {
        self.commands.lock().push(command.clone());
        info!("Mock clinic received {} for machine {}", command.accion, command.maquina);
        Ok(json!({
            "mensaje": "Datos recibidos correctamente",
            "maquina": command.maquina,
            "accion": command.accion,
            "modo": command.modo,
        }))
    }

    fn describe(&self) -> String {
        "demo clinic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_machine_errors() {
        let clinic = MockClinic::new();
        assert!(clinic.fetch_status(OFFLINE_MACHINE).await.is_err());
        assert!(clinic.fetch_status("nope").await.is_err());
        assert!(clinic.fetch_status("REH-01").await.is_ok());
    }

    #[tokio::test]
    async fn test_added_patient_is_listed() {
        let clinic = MockClinic::new();
        let before = clinic.list_patients().await.unwrap().len();
        clinic
            .add_patient(&NewPatient {
                nombre: "Fabián Cruz".to_string(),
                altura: "1.70".to_string(),
                tamano_de_la_pantorrilla: "x".to_string(),
                peso: "68".to_string(),
            })
            .await
            .unwrap();

        let patients = clinic.list_patients().await.unwrap();
        assert_eq!(patients.len(), before + 1);
        let added = patients.last().unwrap();
        assert_eq!(added.name, "Fabián Cruz");
        assert_eq!(added.weight, Some(Measure::Number(68.0)));
        assert_eq!(added.calf_length, None);
    }

    #[tokio::test]
    async fn test_busy_after_start_command() {
        let clinic = MockClinic::new();
        clinic
            .send_command(&StartCommand {
                maquina: "REH-02".to_string(),
                paciente: PatientId::from(2),
                grados: "45".to_string(),
                repeticiones: "5".to_string(),
                stop_grados: "40".to_string(),
                modo: "normal".to_string(),
                accion: "iniciar".to_string(),
            })
            .await
            .unwrap();

        let report = clinic.fetch_status("REH-02").await.unwrap();
        assert_eq!(report.estado.as_deref(), Some("Ocupado"));
        assert_eq!(clinic.commands().len(), 1);
    }
}
