// services/rehab-dash/src/poller.rs
//
// Live machine status poller. At most one machine is polled at a time;
// starting a new session always tears the previous one down first.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use svckit::errors::DashError;
use svckit::types::StatusReport;

use crate::api::ClinicApi;

pub const LOADING_TEXT: &str = "Cargando...";
pub const BUSY_TEXT: &str = "Ocupado";
pub const CONNECTION_ERROR_TEXT: &str = "Error de conexión";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPhase {
    Loading,
    Reported,
    ConnectionError,
}

/// What the status badge shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub text: String,
    pub available: bool,
    pub phase: IndicatorPhase,
}

impl StatusIndicator {
    pub fn loading() -> Self {
        Self {
            text: LOADING_TEXT.to_string(),
            available: false,
            phase: IndicatorPhase::Loading,
        }
    }

    pub fn connection_error() -> Self {
        Self {
            text: CONNECTION_ERROR_TEXT.to_string(),
            available: false,
            phase: IndicatorPhase::ConnectionError,
        }
    }

    pub fn from_report(report: &StatusReport) -> Self {
        Self {
            text: report
                .estado
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| BUSY_TEXT.to_string()),
            available: report.is_available(),
            phase: IndicatorPhase::Reported,
        }
    }

    pub fn from_fetch(result: &Result<StatusReport, DashError>) -> Self {
        match result {
            Ok(report) => Self::from_report(report),
            Err(_) => Self::connection_error(),
        }
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::loading()
    }
}

/// Indicator shared between the poll task and readers, stamped with the
/// generation of the session allowed to write it.
#[derive(Debug)]
struct IndicatorSlot {
    generation: u64,
    indicator: StatusIndicator,
}

impl IndicatorSlot {
    fn apply(&mut self, generation: u64, indicator: StatusIndicator) -> bool {
        if generation != self.generation {
            return false;
        }
        self.indicator = indicator;
        true
    }

    fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.indicator = StatusIndicator::loading();
    }
}

struct PollSession {
    machine_id: String,
    task: JoinHandle<()>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling(String),
}

pub struct StatusPoller {
    api: Arc<dyn ClinicApi>,
    interval: Duration,
    slot: Arc<Mutex<IndicatorSlot>>,
    generation: u64,
    session: Option<PollSession>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn ClinicApi>, interval: Duration) -> Self {
        Self {
            api,
            interval,
            slot: Arc::new(Mutex::new(IndicatorSlot {
                generation: 0,
                indicator: StatusIndicator::loading(),
            })),
            generation: 0,
            session: None,
        }
    }

    pub fn state(&self) -> PollerState {
        match &self.session {
            Some(session) => PollerState::Polling(session.machine_id.clone()),
            None => PollerState::Idle,
        }
    }

    pub fn active_machine(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.machine_id.as_str())
    }

    pub fn indicator(&self) -> StatusIndicator {
        self.slot.lock().indicator.clone()
    }

    /// Tear down any running session and begin polling `machine_id`.
    /// The first fetch is issued immediately. Must be called inside a tokio runtime.
    pub fn start(&mut self, machine_id: &str) {
        self.stop();

        let generation = self.generation;
        let api = self.api.clone();
        let slot = self.slot.clone();
        let interval = self.interval;
        let machine = machine_id.to_string();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let result = api.fetch_status(&machine).await;
                if let Err(e) = &result {
                    warn!("Status fetch for machine {} failed: {}", machine, e);
                }

                let indicator = StatusIndicator::from_fetch(&result);
                if !slot.lock().apply(generation, indicator) {
                    debug!("Discarding stale status for machine {}", machine);
                    return;
                }
            }
        });

        info!("Polling status of machine {} every {:?}", machine_id, self.interval);
        self.session = Some(PollSession {
            machine_id: machine_id.to_string(),
            task,
        });
    }

    /// Cancel polling and reset the indicator to the loading placeholder.
    /// Safe to call when already idle.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
            info!("Stopped polling machine {}", session.machine_id);
        }
        self.generation += 1;
        self.slot.lock().reset(self.generation);
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use svckit::types::{Machine, NewPatient, Patient, StartCommand};

    /// Status source whose replies and latency are set per machine.
    #[derive(Default)]
    struct FakeStatus {
        replies: Mutex<HashMap<String, Result<Option<String>, ()>>>,
        delays: Mutex<HashMap<String, Duration>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeStatus {
        fn reply(&self, machine: &str, estado: Option<&str>) {
            self.replies
                .lock()
                .insert(machine.to_string(), Ok(estado.map(str::to_string)));
        }

        fn fail(&self, machine: &str) {
            self.replies.lock().insert(machine.to_string(), Err(()));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ClinicApi for FakeStatus {
        async fn list_machines(&self) -> Result<Vec<Machine>, DashError> {
            Ok(Vec::new())
        }

        async fn list_patients(&self) -> Result<Vec<Patient>, DashError> {
            Ok(Vec::new())
        }

        async fn fetch_status(&self, machine: &str) -> Result<StatusReport, DashError> {
            self.calls.lock().push(machine.to_string());
            let delay = self.delays.lock().get(machine).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self.replies.lock().get(machine).cloned();
            match reply {
                Some(Ok(estado)) => Ok(StatusReport { estado }),
                Some(Err(())) | None => Err(DashError::NetworkError("unreachable".to_string())),
            }
        }

        async fn add_patient(&self, _patient: &NewPatient) -> Result<serde_json::Value, DashError> {
            Ok(serde_json::Value::Null)
        }

        async fn send_command(&self, _command: &StartCommand) -> Result<serde_json::Value, DashError> {
            Ok(serde_json::Value::Null)
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_indicator_from_report() {
        let free = StatusIndicator::from_report(&StatusReport { estado: Some("Disponible".to_string()) });
        assert_eq!(free.text, "Disponible");
        assert!(free.available);

        let busy = StatusIndicator::from_report(&StatusReport { estado: Some("Busy".to_string()) });
        assert_eq!(busy.text, "Busy");
        assert!(!busy.available);

        let missing = StatusIndicator::from_report(&StatusReport { estado: None });
        assert_eq!(missing.text, BUSY_TEXT);
        assert!(!missing.available);

        let failed = StatusIndicator::from_fetch(&Err(DashError::DecodeError("not json".to_string())));
        assert_eq!(failed, StatusIndicator::connection_error());
    }

    #[test]
    fn test_slot_rejects_superseded_generation() {
        let mut slot = IndicatorSlot { generation: 1, indicator: StatusIndicator::loading() };
        slot.reset(2);
        let stale = StatusIndicator::from_report(&StatusReport { estado: Some("Disponible".to_string()) });
        assert!(!slot.apply(1, stale.clone()));
        assert_eq!(slot.indicator, StatusIndicator::loading());
        assert!(slot.apply(2, stale));
        assert!(slot.indicator.available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let api = Arc::new(FakeStatus::default());
        api.reply("M1", Some("Disponible"));
        let mut poller = StatusPoller::new(api.clone(), Duration::from_millis(500));

        poller.start("M1");
        settle().await;

        assert_eq!(api.calls(), vec!["M1".to_string()]);
        assert!(poller.indicator().available);
        assert_eq!(poller.state(), PollerState::Polling("M1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_every_interval() {
        let api = Arc::new(FakeStatus::default());
        api.reply("M1", Some("Ocupado"));
        let mut poller = StatusPoller::new(api.clone(), Duration::from_millis(500));

        poller.start("M1");
        settle().await;
        tokio::time::sleep(Duration::from_millis(1_250)).await;
        settle().await;

        assert_eq!(api.calls().len(), 3);
        assert_eq!(poller.indicator().text, "Ocupado");
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_machines_leaves_one_poll_on_the_new_machine() {
        let api = Arc::new(FakeStatus::default());
        api.reply("A", Some("Disponible"));
        api.reply("B", Some("Ocupado"));
        let mut poller = StatusPoller::new(api.clone(), Duration::from_millis(500));

        poller.start("A");
        settle().await;
        poller.start("B");
        settle().await;
        let calls_at_switch = api.calls().len();

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        settle().await;

        let calls = api.calls();
        assert!(calls.len() > calls_at_switch);
        assert!(calls[calls_at_switch..].iter().all(|m| m == "B"));
        assert_eq!(poller.active_machine(), Some("B"));
        assert_eq!(poller.indicator().text, "Ocupado");
        assert!(!poller.indicator().available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_from_previous_machine_is_discarded() {
        let api = Arc::new(FakeStatus::default());
        api.reply("A", Some("Disponible"));
        api.reply("B", Some("Ocupado"));
        api.delays.lock().insert("A".to_string(), Duration::from_millis(300));
        let mut poller = StatusPoller::new(api.clone(), Duration::from_millis(500));

        poller.start("A");
        settle().await;
        // A's first fetch is still in flight.
        poller.start("B");
        tokio::time::sleep(Duration::from_millis(400)).await;
        settle().await;

        assert_eq!(poller.indicator().text, "Ocupado");
        assert!(!poller.indicator().available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_render_connection_error_and_keep_polling() {
        let api = Arc::new(FakeStatus::default());
        api.fail("M1");
        let mut poller = StatusPoller::new(api.clone(), Duration::from_millis(500));

        poller.start("M1");
        settle().await;
        assert_eq!(poller.indicator(), StatusIndicator::connection_error());

        api.reply("M1", Some("Disponible"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        settle().await;

        assert!(poller.indicator().available);
        assert!(api.calls().len() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_resets_indicator_and_halts_ticks() {
        let api = Arc::new(FakeStatus::default());
        api.reply("M1", Some("Disponible"));
        let mut poller = StatusPoller::new(api.clone(), Duration::from_millis(500));

        poller.stop();
        assert_eq!(poller.state(), PollerState::Idle);

        poller.start("M1");
        settle().await;
        poller.stop();
        let calls = api.calls().len();

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        settle().await;

        assert_eq!(api.calls().len(), calls);
        assert_eq!(poller.indicator(), StatusIndicator::loading());
        assert_eq!(poller.state(), PollerState::Idle);
    }
}
