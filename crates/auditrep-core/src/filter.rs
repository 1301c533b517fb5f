use std::collections::BTreeSet;

use crate::types::Evidence;

/// Account and origin-type restrictions applied to each folder's evidence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// `None` means every account is accepted.
    pub account_ids: Option<BTreeSet<String>>,
    pub exclude_manual: bool,
}

impl FilterCriteria {
    pub fn new(account_ids: Option<BTreeSet<String>>, exclude_manual: bool) -> Self {
        let account_ids = account_ids.filter(|ids| !ids.is_empty());
        Self { account_ids, exclude_manual }
    }

    /// Builds criteria from the comma separated `--account-ids` value.
    pub fn from_args(account_ids: Option<&str>, exclude_manual: bool) -> Self {
        Self::new(account_ids.map(parse_account_ids), exclude_manual)
    }

    pub fn filters_accounts(&self) -> bool {
        self.account_ids.is_some()
    }

    /// When false, folders skip the filter engine and are associated whole.
    pub fn is_active(&self) -> bool {
        self.filters_accounts() || self.exclude_manual
    }

    pub fn accepts_account(&self, evidence: &Evidence) -> bool {
        match &self.account_ids {
            None => true,
            Some(ids) => evidence.account_id.as_deref().is_some_and(|a| ids.contains(a)),
        }
    }

    pub fn accepts_type(&self, evidence: &Evidence) -> bool {
        !self.exclude_manual || evidence.is_automated()
    }

    /// Conjunction of the account and type predicates, account first.
    /// Order of the input is preserved.
    pub fn apply(&self, evidence: Vec<Evidence>) -> Vec<Evidence> {
        evidence
            .into_iter()
            .filter(|e| self.accepts_account(e))
            .filter(|e| self.accepts_type(e))
            .collect()
    }
}

pub fn parse_account_ids(raw: &str) -> BTreeSet<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Drops evidence whose compliance check is NOT_APPLICABLE. Runs on every
/// fetched folder before any other processing.
pub fn drop_not_applicable(evidence: Vec<Evidence>) -> Vec<Evidence> {
    evidence.into_iter().filter(|e| !e.is_not_applicable()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EvidenceFolderId, EvidenceId, COMPLIANCE_NOT_APPLICABLE, MANUAL_EVIDENCE_TYPE};

    fn ev(id: &str, account: &str, ty: Option<&str>) -> Evidence {
        Evidence {
            id: EvidenceId::from_str(id),
            evidence_folder_id: EvidenceFolderId::from_str("f1"),
            data_source: Some("AWS Config".into()),
            account_id: Some(account.into()),
            event_source: None,
            event_name: None,
            evidence_by_type: ty.map(str::to_string),
            resources_included: vec![],
            attributes: Default::default(),
            compliance_check: Some("COMPLIANT".into()),
        }
    }

    fn ids(evidence: &[Evidence]) -> Vec<&str> {
        evidence.iter().map(|e| e.id.as_str()).collect()
    }

    fn mixed() -> Vec<Evidence> {
        vec![
            ev("a1", "A", Some("Compliance check")),
            ev("b1", "B", Some("Compliance check")),
            ev("a2", "A", Some(MANUAL_EVIDENCE_TYPE)),
            ev("c1", "C", Some("Configuration data")),
            ev("a3", "A", None),
        ]
    }

    #[test]
    fn parses_comma_separated_accounts() {
        let set = parse_account_ids(" 111111111111, 222222222222,,");
        assert_eq!(set.len(), 2);
        assert!(set.contains("111111111111"));
        assert!(set.contains("222222222222"));
    }

    #[test]
    fn blank_account_list_means_unrestricted() {
        let c = FilterCriteria::from_args(Some(" , "), false);
        assert!(!c.filters_accounts());
        assert!(!c.is_active());
    }

    #[test]
    fn account_filter_keeps_only_listed_accounts_with_manual_off() {
        let c = FilterCriteria::from_args(Some("A"), false);
        assert_eq!(ids(&c.apply(mixed())), vec!["a1", "a2", "a3"]);
    }

    #[test]
    fn account_filter_keeps_only_listed_accounts_with_manual_on() {
        let c = FilterCriteria::from_args(Some("A"), true);
        let out = c.apply(mixed());
        assert_eq!(ids(&out), vec!["a1"]);
        assert!(out.iter().all(|e| e.account_id.as_deref() == Some("A")));
    }

    #[test]
    fn manual_exclusion_drops_manual_and_untyped_evidence() {
        let c = FilterCriteria::from_args(None, true);
        assert_eq!(ids(&c.apply(mixed())), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn evidence_without_account_never_matches_account_filter() {
        let mut e = ev("x", "A", Some("Compliance check"));
        e.account_id = None;
        let c = FilterCriteria::from_args(Some("A"), false);
        assert!(c.apply(vec![e]).is_empty());
    }

    #[test]
    fn not_applicable_is_dropped_before_anything_else() {
        let mut na = ev("na", "A", Some("Compliance check"));
        na.compliance_check = Some(COMPLIANCE_NOT_APPLICABLE.into());
        let mut no_check = ev("nc", "A", Some("Compliance check"));
        no_check.compliance_check = None;
        let out = drop_not_applicable(vec![ev("a1", "A", None), na, no_check]);
        assert_eq!(ids(&out), vec!["a1", "nc"]);
    }
}
