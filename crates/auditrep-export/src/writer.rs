use anyhow::{Context, Result};

use auditrep_core::{Evidence, ReportId};

use crate::record::{EvidenceRow, EVIDENCE_CSV_HEADER};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Renders evidence as CSV: header, then one row per record in input order.
/// No deduplication.
pub fn render_evidence_csv(evidence: &[Evidence]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(EVIDENCE_CSV_HEADER).context("write csv header")?;
    for ev in evidence {
        let row = EvidenceRow::from_evidence(ev)?;
        wtr.serialize(&row).with_context(|| format!("write csv row for evidence {}", ev.id))?;
    }
    wtr.into_inner().context("flush csv")
}

pub fn parse_evidence_csv(bytes: &[u8]) -> Result<Vec<Evidence>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let headers = rdr.headers().context("read csv header")?.clone();
    if headers.iter().ne(EVIDENCE_CSV_HEADER.iter().copied()) {
        anyhow::bail!("unexpected csv header: {:?}", headers);
    }
    let mut out = Vec::new();
    for (i, row) in rdr.deserialize::<EvidenceRow>().enumerate() {
        let row = row.with_context(|| format!("read csv row {}", i + 1))?;
        out.push(row.into_evidence()?);
    }
    Ok(out)
}

/// Object key of the evidence export, relative to the destination prefix.
pub fn export_key(key_prefix: &str, assessment_name: &str, report_id: &ReportId) -> String {
    let prefix = key_prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}/{}", assessment_name, report_id, assessment_name)
    } else {
        format!("{}/{}/{}/{}", prefix, assessment_name, report_id, assessment_name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use auditrep_core::{EvidenceFolderId, EvidenceId, EvidenceResource};

    fn sample(i: usize) -> Evidence {
        let mut attributes = BTreeMap::new();
        attributes.insert("findingComplianceStatus".to_string(), "PASSED".to_string());
        attributes.insert("note".to_string(), format!("line one, \"quoted\"\nline {}", i));
        Evidence {
            id: EvidenceId::from_str(format!("ev-{}", i)),
            evidence_folder_id: EvidenceFolderId::from_str(format!("folder-{}", i % 2)),
            data_source: Some("AWS Security Hub".to_string()),
            account_id: Some("111122223333".to_string()),
            event_source: if i % 3 == 0 { None } else { Some("securityhub.amazonaws.com".to_string()) },
            event_name: Some("GetFindings".to_string()),
            evidence_by_type: Some("Compliance check".to_string()),
            resources_included: vec![EvidenceResource {
                arn: Some(format!("arn:aws:s3:::bucket-{}", i)),
                value: None,
            }],
            attributes,
            compliance_check: Some("COMPLIANT".to_string()),
        }
    }

    #[test]
    fn header_has_fixed_column_order() {
        let bytes = render_evidence_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "dataSource,evidenceAwsAccountId,eventSource,eventName,evidenceByType,resourcesIncluded,attributes,complianceCheck,evidenceFolderId,id\n"
        );
    }

    #[test]
    fn decoding_preserves_rows_and_order() {
        let input: Vec<Evidence> = (0..7).map(sample).collect();
        let bytes = render_evidence_csv(&input).unwrap();
        let decoded = parse_evidence_csv(&bytes).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn duplicates_are_kept() {
        let ev = sample(1);
        let bytes = render_evidence_csv(&[ev.clone(), ev.clone()]).unwrap();
        assert_eq!(parse_evidence_csv(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn row_columns_follow_header() {
        let bytes = render_evidence_csv(&[sample(1)]).unwrap();
        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let rec = rdr.records().next().unwrap().unwrap();
        assert_eq!(&rec[0], "AWS Security Hub");
        assert_eq!(&rec[1], "111122223333");
        assert_eq!(&rec[5], r#"[{"arn":"arn:aws:s3:::bucket-1","value":null}]"#);
        assert_eq!(&rec[8], "folder-1");
        assert_eq!(&rec[9], "ev-1");
    }

    #[test]
    fn rejects_foreign_header() {
        assert!(parse_evidence_csv(b"a,b\n1,2\n").is_err());
    }

    #[test]
    fn export_key_nests_report_under_assessment() {
        let key = export_key("evidence_csv", "Q1-Audit", &ReportId::from_str("r-1"));
        assert_eq!(key, "evidence_csv/Q1-Audit/r-1/Q1-Audit");
        assert_eq!(export_key("", "Q1", &ReportId::from_str("r")), "Q1/r/Q1");
    }
}
