// services/rehab-dash/src/main.rs
//
// Terminal dashboard for rehabilitation machines
//
// Run with: cargo run --bin rehab-dash -- --demo

use std::fs::OpenOptions;
use std::io::stdout;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rehab_dash::api::{ClinicApi, HttpClinicApi};
use rehab_dash::app::App;
use rehab_dash::config::{load_config, DashboardConfig};
use rehab_dash::controller::Dashboard;
use rehab_dash::mock::MockClinic;
use rehab_dash::ui;
use svckit::config::ObservabilityConfig;
use svckit::types::Machine;

#[derive(Parser, Debug)]
#[command(name = "rehab-dash")]
#[command(about = "Terminal dashboard for starting rehabilitation machine sessions")]
#[command(version = "0.1.0")]
struct Args {
    #[arg(short, long, default_value = "config/rehab-dash.yaml")]
    config: String,

    /// Clinic backend base URL (overrides backend.base_url)
    #[arg(long)]
    api_url: Option<String>,

    /// Cookie header of a logged-in session (overrides backend.cookie)
    #[arg(long)]
    cookie: Option<String>,

    /// Run against a simulated clinic (no backend required)
    #[arg(long, short)]
    demo: bool,

    /// Log machine status changes instead of drawing the UI
    #[arg(long)]
    headless: bool,

    /// Machine to monitor in headless mode
    #[arg(long, short)]
    machine: Option<String>,

    /// Redraw interval in milliseconds
    #[arg(long, default_value = "100")]
    refresh_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(url) = &args.api_url {
        config.backend.base_url = url.clone();
    }
    if let Some(cookie) = &args.cookie {
        config.backend.cookie = Some(cookie.clone());
    }

    init_tracing(&config.observability, args.headless)?;
    info!("Starting rehab-dash (demo={}, headless={})", args.demo, args.headless);

    let dashboard = build_dashboard(&config, args.demo)?;
    let refresh = Duration::from_millis(args.refresh_ms.max(1));

    if args.headless {
        return run_headless(dashboard, args.machine, refresh).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, dashboard, args.demo, refresh).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

/// The terminal belongs to the UI, so logs go to a file or nowhere unless headless.
fn init_tracing(observability: &ObservabilityConfig, headless: bool) -> Result<()> {
    let writer = if headless {
        BoxMakeWriter::new(std::io::stderr)
    } else if let Some(path) = &observability.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(std::io::sink)
    };

    let level = &observability.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rehab_dash={level},svckit={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(headless).with_writer(writer))
        .init();

    Ok(())
}

fn build_dashboard(config: &DashboardConfig, demo: bool) -> Result<Dashboard> {
    let api: Arc<dyn ClinicApi> = if demo {
        Arc::new(MockClinic::new())
    } else {
        Arc::new(HttpClinicApi::new(&config.backend, config.poller.status_timeout())?)
    };
    info!("Using backend {}", api.describe());

    Ok(Dashboard::new(api, config.modes.clone(), config.poller.interval()))
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    dashboard: Dashboard,
    demo_mode: bool,
    refresh: Duration,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(dashboard, tx);
    app.mount().await;
    if demo_mode {
        app.view.add_log("INFO", "Dashboard started in DEMO mode");
    }

    loop {
        terminal.draw(|frame| ui::draw(frame, &app, demo_mode))?;

        while let Ok(event) = rx.try_recv() {
            app.handle_event(event);
        }

        // crossterm polling blocks; keep the poller and submissions running meanwhile.
        if tokio::task::block_in_place(|| event::poll(refresh))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key) {
                    break;
                }
            }
        }
    }

    app.dashboard.unmount();
    info!("Dashboard closed");
    Ok(())
}

async fn run_headless(mut dashboard: Dashboard, machine: Option<String>, refresh: Duration) -> Result<()> {
    dashboard.mount().await;
    info!(
        "Mounted against {}: {} machines, {} patients",
        dashboard.backend(),
        dashboard.store().machines().len(),
        dashboard.store().patients().len()
    );

    let Some(machine) = machine else {
        warn!("No --machine given; nothing to monitor");
        return Ok(());
    };

    let chosen = dashboard
        .store()
        .machines()
        .iter()
        .find(|m| m.number == machine)
        .cloned()
        .unwrap_or_else(|| {
            warn!("Machine {} is not in the catalog; polling it anyway", machine);
            Machine::new(machine.as_str())
        });
    dashboard.choose_machine(&chosen);

    let mut ticker = tokio::time::interval(refresh);
    let mut last = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let indicator = dashboard.indicator();
                if last.as_ref() != Some(&indicator) {
                    info!("Machine {}: {} (available={})", chosen.number, indicator.text, indicator.available);
                    last = Some(indicator);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    dashboard.unmount();
    Ok(())
}
