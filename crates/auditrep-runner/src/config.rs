use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use auditrep_core::{PipelineError, PollPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "auditrep.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    /// Fallback when the default credential chain is empty.
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    #[serde(default = "default_poll_deadline_secs")]
    pub poll_deadline_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_description")]
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_poll_deadline_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_description() -> String {
    "This report is generated via evidence collector automation".to_string()
}

fn default_true() -> bool {
    true
}

fn default_key_prefix() -> String {
    "evidence_csv".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            poll_deadline_secs: default_poll_deadline_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            description: default_description(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { enabled: true, key_prefix: default_key_prefix() }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// An explicit path must exist; otherwise `auditrep.toml` in `cwd` is
    /// used when present, falling back to defaults.
    pub fn resolve(explicit: Option<&str>, cwd: &Path) -> Result<Self> {
        match explicit {
            Some(p) => Self::load_from(&expand_path(p)),
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.report.poll_interval_secs == 0 {
            return Err(PipelineError::Config("report.poll_interval_secs must be positive".to_string()));
        }
        if self.aws.access_key_id.is_some() != self.aws.secret_access_key.is_some() {
            return Err(PipelineError::Config(
                "aws.access_key_id and aws.secret_access_key must be set together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            deadline: Duration::from_secs(self.report.poll_deadline_secs),
            interval: Duration::from_secs(self.report.poll_interval_secs),
        }
    }
}

pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.poll_policy(), PollPolicy::default());
        assert!(cfg.export.enabled);
        assert_eq!(cfg.export.key_prefix, "evidence_csv");
        assert!(cfg.aws.region.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auditrep.toml");
        std::fs::write(&path, "[aws]\nregion = \"eu-west-1\"\n\n[report]\npoll_deadline_secs = 120\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cfg.report.poll_deadline_secs, 120);
        assert_eq!(cfg.report.poll_interval_secs, 10);
        assert!(cfg.export.enabled);
    }

    #[test]
    fn save_and_resolve_from_cwd() {
        let dir = tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.export.key_prefix = "exports".to_string();
        cfg.save_to(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(Config::resolve(None, dir.path()).unwrap(), cfg);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::resolve(Some(missing.to_str().unwrap()), dir.path()).is_err());
        assert_eq!(Config::resolve(None, dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn half_configured_static_credentials_are_rejected() {
        let mut cfg = Config::default();
        cfg.aws.access_key_id = Some("AKIA".to_string());
        assert!(cfg.validate().is_err());
    }
}
