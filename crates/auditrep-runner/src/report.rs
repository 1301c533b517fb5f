use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use auditrep_core::{collect_pages, PollOutcome, PollPolicy, PollStep, ReportId};
use auditrep_services::{Clock, ReportService};

/// Polls the report listing until the report reaches a terminal status or
/// the policy deadline passes. Listing errors abort the wait.
pub fn wait_for_report(
    reports: &dyn ReportService,
    clock: &dyn Clock,
    policy: &PollPolicy,
    report_id: &ReportId,
) -> Result<PollOutcome> {
    let started = clock.now();
    loop {
        if policy.expired(clock.now().duration_since(started)) {
            info!(%report_id, "report generation is taking a while; audit manager keeps generating it in the background");
            info!("once completed, download it from the audit manager console or the assessment's S3 bucket");
            return Ok(PollOutcome::TimedOut);
        }

        let listing = collect_pages(|t| reports.list_reports(t)).context("list assessment reports")?;
        let observed = listing.iter().find(|r| &r.id == report_id).map(|r| &r.status);
        match policy.step(observed) {
            PollStep::Complete => {
                info!(%report_id, "report generation complete");
                return Ok(PollOutcome::Complete);
            }
            PollStep::Failed => {
                warn!(%report_id, "report generation failed");
                return Ok(PollOutcome::Failed);
            }
            PollStep::Wait => {
                match observed {
                    Some(status) => info!(%report_id, status = status.as_str(), "waiting for the report to generate"),
                    None => debug!(%report_id, "report not listed yet"),
                }
                clock.sleep(policy.interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use auditrep_core::{Assessment, AssessmentId, AssessmentStatus, ReportStatus};
    use auditrep_services::{InMemoryAuditManager, ManualClock};

    fn service(statuses: Vec<Option<ReportStatus>>) -> (InMemoryAuditManager, ReportId) {
        let svc = InMemoryAuditManager::new(2);
        svc.add_assessment(Assessment {
            id: AssessmentId::from_str("a1"),
            name: "Q1-Audit".into(),
            status: AssessmentStatus::Active,
            reports_destination: None,
        });
        // unrelated reports push ours onto a later page
        svc.script_report_statuses(vec![Some(ReportStatus::Complete)]);
        for _ in 0..3 {
            svc.create_report(&AssessmentId::from_str("a1"), "other", "d").unwrap();
        }
        svc.script_report_statuses(statuses);
        let id = svc.create_report(&AssessmentId::from_str("a1"), "mine", "d").unwrap();
        (svc, id)
    }

    #[test]
    fn completes_after_two_sleeps() {
        let (svc, id) = service(vec![
            Some(ReportStatus::InProgress),
            Some(ReportStatus::InProgress),
            Some(ReportStatus::Complete),
        ]);
        let clock = ManualClock::new();
        let outcome = wait_for_report(&svc, &clock, &PollPolicy::default(), &id).unwrap();
        assert_eq!(outcome, PollOutcome::Complete);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 2]);
    }

    #[test]
    fn failed_on_first_poll_returns_immediately() {
        let (svc, id) = service(vec![Some(ReportStatus::Failed)]);
        let clock = ManualClock::new();
        let outcome = wait_for_report(&svc, &clock, &PollPolicy::default(), &id).unwrap();
        assert_eq!(outcome, PollOutcome::Failed);
        assert!(clock.sleeps().is_empty());
        assert_eq!(svc.calls().report_url_calls, 0);
    }

    #[test]
    fn always_in_progress_times_out() {
        let (svc, id) = service(vec![Some(ReportStatus::InProgress)]);
        let clock = ManualClock::new();
        let outcome = wait_for_report(&svc, &clock, &PollPolicy::default(), &id).unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut);
        // polls at 0, 10, 20 and 30 seconds, deadline passes after the fourth sleep
        assert_eq!(clock.sleeps().len(), 4);
    }

    #[test]
    fn unlisted_report_keeps_polling() {
        let (svc, id) = service(vec![None, None, Some(ReportStatus::Complete)]);
        let clock = ManualClock::new();
        let outcome = wait_for_report(&svc, &clock, &PollPolicy::default(), &id).unwrap();
        assert_eq!(outcome, PollOutcome::Complete);
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn zero_deadline_still_polls_once() {
        let (svc, id) = service(vec![Some(ReportStatus::Complete)]);
        let clock = ManualClock::new();
        let policy = PollPolicy { deadline: Duration::ZERO, interval: Duration::from_secs(1) };
        assert_eq!(wait_for_report(&svc, &clock, &policy, &id).unwrap(), PollOutcome::Complete);
    }
}
