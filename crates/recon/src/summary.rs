//! Summary statistics over reconciled lines.

use crate::model::{ReconSummary, ReportLine, UnmatchedReason, Verdict};

/// Tally verdicts, keeping "charges differ" separate from "an input
/// could not be resolved"; collapsing them hides data-quality problems
/// behind apparent billing disputes.
pub fn compute_summary(lines: &[ReportLine]) -> ReconSummary {
    let mut matched = 0;
    let mut charge_mismatches = 0;
    let mut missing_input = 0;
    let mut unresolved_lookups = 0;

    for line in lines {
        match (line.verdict, line.reason) {
            (Verdict::Matched, _) => matched += 1,
            (Verdict::NotMatched, Some(UnmatchedReason::ChargeDifference)) => {
                charge_mismatches += 1
            }
            (Verdict::NotMatched, Some(UnmatchedReason::UnresolvedLookup)) => {
                unresolved_lookups += 1
            }
            (Verdict::NotMatched, _) => missing_input += 1,
        }
    }

    let total = lines.len();
    let match_rate = if total > 0 {
        matched as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    ReconSummary {
        total_records: total,
        matched,
        not_matched: total - matched,
        charge_mismatches,
        missing_input,
        unresolved_lookups,
        match_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(verdict: Verdict, reason: Option<UnmatchedReason>) -> ReportLine {
        ReportLine {
            identifier: "x".into(),
            registration: None,
            mtow_kg: None,
            distance_km: None,
            category: None,
            unit_rate: None,
            weight_factor: None,
            flat_charge: None,
            calculated_charge: None,
            vendor_charge: None,
            difference: None,
            verdict,
            reason,
        }
    }

    #[test]
    fn summary_counts() {
        let lines = vec![
            line(Verdict::Matched, None),
            line(Verdict::Matched, None),
            line(Verdict::NotMatched, Some(UnmatchedReason::ChargeDifference)),
            line(Verdict::NotMatched, Some(UnmatchedReason::MissingMass)),
            line(Verdict::NotMatched, Some(UnmatchedReason::MissingVendorCharge)),
            line(Verdict::NotMatched, Some(UnmatchedReason::UnresolvedLookup)),
        ];
        let summary = compute_summary(&lines);
        assert_eq!(summary.total_records, 6);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.not_matched, 4);
        assert_eq!(summary.charge_mismatches, 1);
        assert_eq!(summary.missing_input, 2);
        assert_eq!(summary.unresolved_lookups, 1);
        assert!((summary.match_rate - 33.333).abs() < 0.01);
    }

    #[test]
    fn empty_batch() {
        let summary = compute_summary(&[]);
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.match_rate, 0.0);
    }
}
