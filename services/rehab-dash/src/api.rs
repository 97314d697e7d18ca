// services/rehab-dash/src/api.rs
//
// Clinic backend client: machine/patient lists, machine status, commands

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use tracing::{debug, warn};

use svckit::config::BackendConfig;
use svckit::errors::DashError;
use svckit::types::{Machine, NewPatient, Patient, StartCommand, StatusReport};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const MACHINES_PATH: &str = "/lista_maquinas_json/";
pub const STATUS_PATH: &str = "/estado_arduino/";
pub const ADD_PATIENT_PATH: &str = "/agregar_paciente/";
pub const COMMAND_PATH: &str = "/recibir_datos/";

/// Everything the dashboard needs from the clinic backend.
#[async_trait]
pub trait ClinicApi: Send + Sync {
    async fn list_machines(&self) -> Result<Vec<Machine>, DashError>;
    async fn list_patients(&self) -> Result<Vec<Patient>, DashError>;
    async fn fetch_status(&self, machine: &str) -> Result<StatusReport, DashError>;
    async fn add_patient(&self, patient: &NewPatient) -> Result<serde_json::Value, DashError>;
    async fn send_command(&self, command: &StartCommand) -> Result<serde_json::Value, DashError>;
    fn describe(&self) -> String;
}

/// Extract a cookie value from a `Cookie` header string.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

pub struct HttpClinicApi {
    client: reqwest::Client,
    base_url: String,
    patient_list_path: String,
    cookie: Option<String>,
    csrf_token: Option<String>,
    status_timeout: Duration,
}

impl HttpClinicApi {
    pub fn new(config: &BackendConfig, status_timeout: Duration) -> Result<Self, DashError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let csrf_token = config
            .cookie
            .as_deref()
            .and_then(|header| cookie_value(header, &config.csrf_cookie_name));
        if config.cookie.is_some() && csrf_token.is_none() {
            warn!(
                "Cookie header has no '{}' entry; POSTs will be sent without a CSRF token",
                config.csrf_cookie_name
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            patient_list_path: config.patient_list_path.clone(),
            cookie: config.cookie.clone(),
            csrf_token,
            status_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }
        request
    }

    fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.url(path))
            .json(body);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token.as_str());
        }
        request
    }

    /// Send a POST and insist on a 2xx. A successful reply whose body is not
    /// JSON is still a success.
    async fn post_checked<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<serde_json::Value, DashError> {
        let response = self.post_json(path, body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Server rejected POST {} with {}: {}", path, status, body);
            return Err(DashError::Rejected { status: status.as_u16(), body });
        }

        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("POST {} succeeded but reply was not JSON: {}", path, e);
                Ok(serde_json::Value::Null)
            }
        }
    }
}

#[async_trait]
impl ClinicApi for HttpClinicApi {
    async fn list_machines(&self) -> Result<Vec<Machine>, DashError> {
        let machines: Vec<Machine> = self.get(MACHINES_PATH).send().await?.json().await?;
        debug!("Loaded {} machines", machines.len());
        Ok(machines)
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, DashError> {
        let patients: Vec<Patient> = self.get(&self.patient_list_path).send().await?.json().await?;
        debug!("Loaded {} patients", patients.len());
        Ok(patients)
    }

    async fn fetch_status(&self, machine: &str) -> Result<StatusReport, DashError> {
        // Status code is not inspected; error bodies decode to a report
        // without `estado`.
        let response = self
            .get(STATUS_PATH)
            .query(&[("numero", machine)])
            .timeout(self.status_timeout)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    async fn add_patient(&self, patient: &NewPatient) -> Result<serde_json::Value, DashError> {
        self.post_checked(ADD_PATIENT_PATH, patient).await
    }

    async fn send_command(&self, command: &StartCommand) -> Result<serde_json::Value, DashError> {
        self.post_checked(COMMAND_PATH, command).await
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
