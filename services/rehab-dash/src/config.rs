// services/rehab-dash/src/config.rs
//
// Dashboard configuration: YAML file plus environment overrides

use anyhow::Result;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use svckit::config::{BackendConfig, ObservabilityConfig, PollerConfig};
use svckit::types::{default_modes, ModeOption};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendConfig,
    pub poller: PollerConfig,
    pub modes: Vec<ModeOption>,
    pub observability: ObservabilityConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            poller: PollerConfig::default(),
            modes: default_modes(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Load `path` (optional) with `REHAB_DASH__SECTION__KEY` environment overrides.
pub fn load_config(path: &str) -> Result<DashboardConfig> {
    let config = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("REHAB_DASH").separator("__"))
        .build()?;

    let mut loaded: DashboardConfig = config.try_deserialize()?;
    if loaded.modes.is_empty() {
        loaded.modes = default_modes();
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("does/not/exist/rehab-dash").unwrap();
        assert_eq!(config.poller.interval_ms, 500);
        assert_eq!(config.backend.patient_list_path, "/api/pacientes/");
        assert_eq!(config.modes, default_modes());
    }

    #[test]
    fn test_yaml_sections_override_defaults() {
        let path = std::env::temp_dir().join(format!("rehab-dash-config-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "backend:\n  base_url: http://clinic:9000\n  cookie: \"csrftoken=abc\"\npoller:\n  interval_ms: 250\nmodes:\n  - tag: isometrico\n    label: Isométrico\n"
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.backend.base_url, "http://clinic:9000");
        assert_eq!(config.backend.cookie.as_deref(), Some("csrftoken=abc"));
        assert_eq!(config.backend.csrf_cookie_name, "csrftoken");
        assert_eq!(config.poller.interval_ms, 250);
        assert_eq!(config.poller.status_timeout_ms, 500);
        assert_eq!(config.modes, vec![ModeOption::new("isometrico", "Isométrico")]);
    }
}
