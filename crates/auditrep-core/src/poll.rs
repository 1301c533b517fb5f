use std::time::Duration;

use crate::model::ReportStatus;

pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Wall-clock budget and sleep interval for waiting on report generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub deadline: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { deadline: DEFAULT_POLL_DEADLINE, interval: DEFAULT_POLL_INTERVAL }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStep {
    Complete,
    Failed,
    /// Still generating, or not yet visible in the listing.
    Wait,
}

impl PollPolicy {
    pub fn expired(&self, elapsed: Duration) -> bool {
        elapsed > self.deadline
    }

    /// Pure transition for one observation of the created report.
    pub fn step(&self, observed: Option<&ReportStatus>) -> PollStep {
        match observed {
            Some(ReportStatus::Failed) => PollStep::Failed,
            Some(status) if status.is_terminal() => PollStep::Complete,
            _ => PollStep::Wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_thirty_by_ten() {
        let p = PollPolicy::default();
        assert_eq!(p.deadline, Duration::from_secs(30));
        assert_eq!(p.interval, Duration::from_secs(10));
    }

    #[test]
    fn deadline_is_exclusive() {
        let p = PollPolicy::default();
        assert!(!p.expired(Duration::from_secs(30)));
        assert!(p.expired(Duration::from_secs(31)));
    }

    #[test]
    fn missing_report_keeps_waiting() {
        let p = PollPolicy::default();
        assert_eq!(p.step(None), PollStep::Wait);
        assert_eq!(p.step(Some(&ReportStatus::InProgress)), PollStep::Wait);
        assert_eq!(p.step(Some(&ReportStatus::Complete)), PollStep::Complete);
        assert_eq!(p.step(Some(&ReportStatus::Failed)), PollStep::Failed);
    }

    #[test]
    fn unrecognized_status_keeps_waiting() {
        let p = PollPolicy::default();
        assert_eq!(p.step(Some(&ReportStatus::parse("QUEUED"))), PollStep::Wait);
    }
}
