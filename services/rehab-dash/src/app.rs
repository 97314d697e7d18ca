// services/rehab-dash/src/app.rs
//
// Keyboard handling and background-task plumbing for the terminal dashboard

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use svckit::errors::DashError;
use svckit::types::Patient;

use crate::controller::Dashboard;
use crate::state::{Focus, OverlayField, PatientOverlay, Suggestions, ViewState};
use crate::store::StepDirection;
use crate::submit::Notice;

/// Results of work spawned off the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    StartFinished(Notice),
    PatientSaved(Notice),
    PatientsLoaded(Result<Vec<Patient>, DashError>),
}

pub struct App {
    pub dashboard: Dashboard,
    pub view: ViewState,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(dashboard: Dashboard, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            dashboard,
            view: ViewState::new(),
            events,
        }
    }

    pub async fn mount(&mut self) {
        self.dashboard.mount().await;
        let store = self.dashboard.store();
        let message = format!(
            "Connected to {}: {} machines, {} patients",
            self.dashboard.backend(),
            store.machines().len(),
            store.patients().len()
        );
        self.view.add_log("INFO", &message);
    }

    /// Returns `false` when the operator asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::F(10)
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            return false;
        }

        if self.view.overlay.is_some() {
            self.handle_overlay_key(key);
            return true;
        }

        match key.code {
            KeyCode::F(2) => {
                self.view.patient_suggestions = None;
                self.view.machine_suggestions = None;
                self.view.overlay = Some(PatientOverlay::new());
            }
            KeyCode::Esc => self.dismiss(),
            KeyCode::Tab => self.view.set_focus(self.view.focus.next()),
            KeyCode::BackTab => self.view.set_focus(self.view.focus.prev()),
            KeyCode::Up => self.move_highlight(StepDirection::Up),
            KeyCode::Down => self.move_highlight(StepDirection::Down),
            KeyCode::Left if self.view.focus == Focus::Mode => self.cycle_mode(false),
            KeyCode::Right if self.view.focus == Focus::Mode => self.cycle_mode(true),
            KeyCode::Enter => self.confirm(),
            KeyCode::Backspace => self.edit(|text| {
                text.pop();
            }),
            KeyCode::Char(c) => self.type_char(c),
            _ => {}
        }
        true
    }

    fn dismiss(&mut self) {
        if self.view.patient_suggestions.take().is_some() || self.view.machine_suggestions.take().is_some() {
            return;
        }
        self.view.notice = None;
    }

    fn move_highlight(&mut self, direction: StepDirection) {
        let list_moved = match self.view.focus {
            Focus::Patient => self.view.patient_suggestions.as_mut().map(|list| match direction {
                StepDirection::Up => list.up(),
                StepDirection::Down => list.down(),
            }),
            Focus::Machine => self.view.machine_suggestions.as_mut().map(|list| match direction {
                StepDirection::Up => list.up(),
                StepDirection::Down => list.down(),
            }),
            _ => None,
        };
        if list_moved.is_none() {
            match direction {
                StepDirection::Up => self.view.scroll_up(),
                StepDirection::Down => self.view.scroll_down(),
            }
        }
    }

    fn cycle_mode(&mut self, forward: bool) {
        let modes = self.dashboard.store().modes();
        if modes.is_empty() {
            return;
        }
        let next = match (self.dashboard.store().active_mode_index(), forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % modes.len(),
            (Some(i), false) => (i + modes.len() - 1) % modes.len(),
        };
        let tag = modes[next].tag.clone();
        self.dashboard.select_mode(&tag);
    }

    fn type_char(&mut self, c: char) {
        if let Focus::Field(field) = self.view.focus {
            match c {
                '+' => return self.dashboard.step_field(field, StepDirection::Up),
                '-' => return self.dashboard.step_field(field, StepDirection::Down),
                _ => {}
            }
        }
        self.edit(|text| text.push(c));
    }

    /// Apply an edit to the focused text input and propagate it.
    fn edit(&mut self, change: impl FnOnce(&mut String)) {
        let selection = self.dashboard.store().selection();
        let mut text = match self.view.focus {
            Focus::Patient => selection.patient_text.clone(),
            Focus::Machine => selection.machine_text.clone(),
            Focus::Field(field) => selection.fields.get(field).to_string(),
            Focus::Mode | Focus::Start => return,
        };
        change(&mut text);

        match self.view.focus {
            Focus::Patient => {
                let found = self.dashboard.set_patient_text(&text);
                self.view.patient_suggestions = Suggestions::open(found);
            }
            Focus::Machine => {
                let found = self.dashboard.set_machine_text(&text);
                self.view.machine_suggestions = Suggestions::open(found);
            }
            Focus::Field(field) => self.dashboard.set_field(field, &text),
            Focus::Mode | Focus::Start => {}
        }
    }

    fn confirm(&mut self) {
        match self.view.focus {
            Focus::Patient => {
                if let Some(patient) = self.view.patient_suggestions.take().and_then(|l| l.current().cloned()) {
                    self.dashboard.choose_patient(&patient);
                    self.view.add_log("INFO", &format!("Paciente: {}", patient.name));
                    return;
                }
            }
            Focus::Machine => {
                if let Some(machine) = self.view.machine_suggestions.take().and_then(|l| l.current().cloned()) {
                    self.dashboard.choose_machine(&machine);
                    self.view.add_log("INFO", &format!("Monitoreando máquina {}", machine.number));
                    return;
                }
            }
            Focus::Start => {
                self.start();
                return;
            }
            _ => {}
        }
        self.view.set_focus(self.view.focus.next());
    }

    fn start(&mut self) {
        if self.view.submitting {
            debug!("Start pressed while a submission is pending");
            return;
        }
        if !self.dashboard.is_start_enabled() {
            let missing: Vec<&str> = self
                .dashboard
                .unmet_requirements()
                .iter()
                .map(|r| r.describe())
                .collect();
            debug!("Start pressed while disabled; missing {:?}", missing);
            self.view.add_log("WARN", &format!("Faltan: {}", missing.join(", ")));
            return;
        }

        let submitter = self.dashboard.submitter();
        let built = self.dashboard.start_command();
        let events = self.events.clone();
        self.view.submitting = true;
        tokio::spawn(async move {
            let notice = submitter.submit_start(built).await;
            let _ = events.send(AppEvent::StartFinished(notice));
        });
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        let Some(overlay) = self.view.overlay.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.view.overlay = None,
            KeyCode::Tab => overlay.focus = overlay.focus.next(),
            KeyCode::Backspace => {
                overlay.focused_mut().pop();
            }
            KeyCode::Char(c) => overlay.focused_mut().push(c),
            KeyCode::Enter => {
                let form = overlay.form.clone();
                let submitter = self.dashboard.submitter();
                let events = self.events.clone();
                info!("Registering patient {}", form.nombre);
                tokio::spawn(async move {
                    let notice = submitter.add_patient(&form).await;
                    let _ = events.send(AppEvent::PatientSaved(notice));
                });
            }
            _ => {}
        }
    }

    /// Re-fetch patients off the UI loop; the list arrives as `PatientsLoaded`.
    fn spawn_patient_reload(&self) {
        let api = self.dashboard.api();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.list_patients().await;
            let _ = events.send(AppEvent::PatientsLoaded(result));
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            // Only one start is spawned at a time, so this reply is the pending one.
            AppEvent::StartFinished(notice) => {
                self.view.submitting = false;
                self.view.show_notice(notice);
            }
            AppEvent::PatientSaved(notice) => {
                if notice.is_success() {
                    self.view.overlay = None;
                    self.spawn_patient_reload();
                }
                self.view.show_notice(notice);
            }
            AppEvent::PatientsLoaded(Ok(patients)) => self.dashboard.set_patients(patients),
            AppEvent::PatientsLoaded(Err(e)) => {
                error!("Failed to reload patients: {}", e);
                self.view.add_log("ERROR", "No se pudo recargar la lista de pacientes");
            }
        }
    }

    pub fn overlay_field_value(&self, field: OverlayField) -> &str {
        self.view.overlay.as_ref().map(|o| o.value(field)).unwrap_or("")
    }
}
