pub mod config;
pub mod doctor;
pub mod report;
pub mod runner;
pub mod scenario;

pub use config::*;
pub use doctor::*;
pub use report::*;
pub use runner::*;

#[cfg(test)]
mod scenario_tests {
    use super::scenario::*;
    use super::Config;
    use auditrep_core::RunOutcome;
    use std::path::{Path, PathBuf};

    fn dir(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios").join(name)
    }

    fn run(name: &str) -> ScenarioResult {
        let p = dir(name);
        let exp = load_expected(&p).unwrap();
        let res = simulate(&p, &Config::default()).unwrap();
        let problems = check(&exp, &res);
        assert!(problems.is_empty(), "{}: {:#?}", exp.scenario_id, problems);
        res
    }

    #[test]
    fn scenario_sc01_no_filters_exports_six_rows() {
        let res = run("SC-01-no-filters");
        let exported = res.exported.unwrap();
        assert!(exported.iter().all(|e| !e.is_not_applicable()));
        let RunOutcome::Complete { url, .. } = res.outcome.unwrap() else { panic!("expected complete") };
        assert!(url.link.starts_with("https://"));
    }

    #[test]
    fn scenario_sc02_account_and_manual_filter_batches() {
        let res = run("SC-02-account-manual-filter");
        for e in res.exported.unwrap() {
            assert_eq!(e.account_id.as_deref(), Some("111111111111"));
            assert!(e.is_automated());
        }
    }

    #[test]
    fn scenario_sc03_latest_only_keeps_tied_folders() {
        run("SC-03-latest-only");
    }

    #[test]
    fn scenario_sc04_failed_report_has_no_url() {
        let res = run("SC-04-report-failed");
        assert_eq!(res.calls.report_url_calls, 0);
    }

    #[test]
    fn scenario_sc05_timeout_stops_after_deadline() {
        let res = run("SC-05-report-timeout");
        assert_eq!(res.sleeps, 4);
        assert_eq!(res.calls.report_url_calls, 0);
    }

    #[test]
    fn scenario_sc06_unknown_assessment_creates_nothing() {
        let res = run("SC-06-assessment-not-found");
        assert!(res.calls.created_reports.is_empty());
    }

    #[test]
    fn scenario_sc07_inactive_service_stops_before_lookup() {
        let res = run("SC-07-service-inactive");
        assert_eq!(res.calls.list_assessments, 0);
    }
}
