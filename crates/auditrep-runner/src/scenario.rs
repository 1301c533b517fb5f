use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use auditrep_core::{Evidence, FilterCriteria, RunOutcome};
use auditrep_export::parse_evidence_csv;
use auditrep_services::{CallLog, InMemoryAuditManager, ManualClock, MemoryObjectStorage, RecordingNotifier, World};

use crate::{Config, RunRequest, Runner};

/// `request.yaml`: the arguments a scenario runs `generate` with.
#[derive(Debug, Deserialize)]
pub struct ScenarioRequest {
    pub assessment_name: String,
    #[serde(default)]
    pub account_ids: Option<String>,
    #[serde(default)]
    pub exclude_manual: bool,
    #[serde(default)]
    pub latest_only: bool,
    #[serde(default)]
    pub notify: bool,
}

/// `expected.yaml`: what the scenario must observe.
#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    pub scenario_id: String,
    /// One of `complete`, `failed`, `timed_out`, `error`.
    pub outcome: String,
    #[serde(default)]
    pub error_contains: Option<String>,
    #[serde(default)]
    pub folder_associations: Vec<String>,
    #[serde(default)]
    pub batch_sizes: Vec<usize>,
    #[serde(default)]
    pub csv_rows: Option<usize>,
    #[serde(default)]
    pub notifications: usize,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub outcome: std::result::Result<RunOutcome, String>,
    pub calls: CallLog,
    /// Rows of the exported CSV, if one was written.
    pub exported: Option<Vec<Evidence>>,
    pub notifications: usize,
    pub sleeps: usize,
}

impl ScenarioResult {
    pub fn outcome_label(&self) -> &'static str {
        match &self.outcome {
            Ok(RunOutcome::Complete { .. }) => "complete",
            Ok(RunOutcome::Failed { .. }) => "failed",
            Ok(RunOutcome::TimedOut { .. }) => "timed_out",
            Err(_) => "error",
        }
    }
}

fn read_yaml<T: for<'de> Deserialize<'de>>(dir: &Path, file: &str) -> Result<T> {
    let p = dir.join(file);
    let s = std::fs::read_to_string(&p).with_context(|| format!("read {}: {}", file, p.display()))?;
    serde_yaml::from_str(&s).with_context(|| format!("parse {}", file))
}

pub fn load_world(dir: &Path) -> Result<World> {
    read_yaml(dir, "world.yaml")
}

pub fn load_request(dir: &Path) -> Result<ScenarioRequest> {
    read_yaml(dir, "request.yaml")
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    read_yaml(dir, "expected.yaml")
}

/// Runs the full pipeline against the fixture world in `dir`, with an
/// in-memory Audit Manager, object store and notifier and a clock that never
/// really sleeps. Pipeline errors are captured in the result; fixture errors
/// are returned.
pub fn simulate(dir: &Path, cfg: &Config) -> Result<ScenarioResult> {
    let world = load_world(dir)?;
    let req = load_request(dir)?;

    let svc = InMemoryAuditManager::from_world(world);
    let objects = MemoryObjectStorage::new();
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new();

    let mut runner = Runner::new(cfg, &svc, &objects, &clock);
    if req.notify {
        runner = runner.with_notifier(&notifier);
    }

    let criteria = FilterCriteria::from_args(req.account_ids.as_deref(), req.exclude_manual);
    let outcome = RunRequest::new(req.assessment_name, criteria, req.latest_only)
        .map_err(anyhow::Error::from)
        .and_then(|r| runner.run(&r))
        .map_err(|e| format!("{:#}", e));

    let exported = match objects.objects().first() {
        Some(obj) => Some(parse_evidence_csv(&obj.body).context("parse exported csv")?),
        None => None,
    };

    Ok(ScenarioResult {
        outcome,
        calls: svc.calls(),
        exported,
        notifications: notifier.messages().len(),
        sleeps: clock.sleeps().len(),
    })
}

/// Compares a simulated run against `expected.yaml`, listing every mismatch.
pub fn check(exp: &ScenarioExpected, res: &ScenarioResult) -> Vec<String> {
    let mut problems = Vec::new();
    if res.outcome_label() != exp.outcome {
        problems.push(format!("outcome: expected {}, got {} ({:?})", exp.outcome, res.outcome_label(), res.outcome));
    }
    if let (Some(want), Err(got)) = (&exp.error_contains, &res.outcome) {
        if !got.contains(want.as_str()) {
            problems.push(format!("error: expected to contain {:?}, got {:?}", want, got));
        }
    }
    let folders: Vec<&str> = res.calls.folder_associations.iter().map(|f| f.as_str()).collect();
    if folders != exp.folder_associations {
        problems.push(format!("folder associations: expected {:?}, got {:?}", exp.folder_associations, folders));
    }
    let sizes: Vec<usize> = res.calls.batch_associations.iter().map(|(_, ids)| ids.len()).collect();
    if sizes != exp.batch_sizes {
        problems.push(format!("batch sizes: expected {:?}, got {:?}", exp.batch_sizes, sizes));
    }
    let rows = res.exported.as_ref().map(Vec::len);
    if rows != exp.csv_rows {
        problems.push(format!("csv rows: expected {:?}, got {:?}", exp.csv_rows, rows));
    }
    if res.notifications != exp.notifications {
        problems.push(format!("notifications: expected {}, got {}", exp.notifications, res.notifications));
    }
    problems
}
