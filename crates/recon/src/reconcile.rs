//! Per-record reconciliation and the engine entry point.

use std::collections::HashMap;

use crate::config::{SourceConfig, TableRole};
use crate::error::ReconError;
use crate::formula::{self, Resolution, ResolvedRefs};
use crate::model::{
    ReconMeta, ReconReport, ReconciliationResult, ReportLine, UnmatchedReason, VendorRecord,
    Verdict,
};
use crate::summary::compute_summary;
use crate::table::ReferenceTable;

/// Pre-loaded input for one reconciliation run. Reference tables are
/// read-only and shared across all records; records never alias each
/// other.
pub struct ReconInput {
    pub records: Vec<VendorRecord>,
    pub tables: HashMap<TableRole, ReferenceTable>,
}

/// Resolve the reference-table values one record needs, keeping the most
/// specific failure per role.
pub fn resolve_refs(
    record: &VendorRecord,
    config: &SourceConfig,
    tables: &HashMap<TableRole, ReferenceTable>,
) -> ResolvedRefs {
    ResolvedRefs {
        unit_rate: resolve_role(record, tables, TableRole::UnitRate),
        weight_factor: resolve_weight_factor(record, config, tables),
        flat_charge: resolve_role(record, tables, TableRole::FlatCharge),
    }
}

fn resolve_role(
    record: &VendorRecord,
    tables: &HashMap<TableRole, ReferenceTable>,
    role: TableRole,
) -> Resolution {
    let Some(table) = tables.get(&role) else {
        return Resolution::NotConfigured;
    };
    let Some(mtow_kg) = record.mtow_kg else {
        return Resolution::Unresolved(UnmatchedReason::MissingMass);
    };
    match table.lookup(mtow_kg, record.category) {
        Some(value) => Resolution::Value(value),
        None => Resolution::Unresolved(UnmatchedReason::UnresolvedLookup),
    }
}

/// A configured vendor factor column is the primary weight-factor
/// source; an empty cell there is a record-level missing input, not an
/// invitation to fall back.
fn resolve_weight_factor(
    record: &VendorRecord,
    config: &SourceConfig,
    tables: &HashMap<TableRole, ReferenceTable>,
) -> Resolution {
    if config.vendor.columns.weight_factor.is_some() {
        return match record.weight_factor {
            Some(v) => Resolution::Value(v),
            None => Resolution::Unresolved(UnmatchedReason::MissingFactor),
        };
    }
    resolve_role(record, tables, TableRole::WeightFactor)
}

/// Reconcile one record: compute the expected charge, compare within
/// tolerance, emit a verdict. Deterministic and side-effect-free.
///
/// A record without a vendor charge can never be Matched; absence of
/// ground truth is not success.
pub fn reconcile(
    record: &VendorRecord,
    formula: &crate::config::FormulaConfig,
    refs: &ResolvedRefs,
    tolerance: f64,
) -> ReconciliationResult {
    match (formula::compute(formula, record, refs), record.vendor_charge) {
        (Ok(calculated), Some(vendor)) => {
            let difference = (calculated - vendor).abs();
            if difference <= tolerance {
                ReconciliationResult {
                    calculated_charge: Some(calculated),
                    difference: Some(difference),
                    verdict: Verdict::Matched,
                    reason: None,
                }
            } else {
                ReconciliationResult {
                    calculated_charge: Some(calculated),
                    difference: Some(difference),
                    verdict: Verdict::NotMatched,
                    reason: Some(UnmatchedReason::ChargeDifference),
                }
            }
        }
        (Ok(calculated), None) => ReconciliationResult {
            calculated_charge: Some(calculated),
            difference: None,
            verdict: Verdict::NotMatched,
            reason: Some(UnmatchedReason::MissingVendorCharge),
        },
        (Err(reason), _) => ReconciliationResult {
            calculated_charge: None,
            difference: None,
            verdict: Verdict::NotMatched,
            reason: Some(reason),
        },
    }
}

/// Run reconciliation for a whole source. Per-record failures never
/// abort the batch; structural (schema) failures already aborted during
/// loading.
pub fn run(config: &SourceConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    let mut lines = Vec::with_capacity(input.records.len());

    for record in &input.records {
        let refs = resolve_refs(record, config, &input.tables);
        let result = reconcile(record, &config.formula, &refs, config.tolerance);

        lines.push(ReportLine {
            identifier: record.identifier.clone(),
            registration: record.registration.clone(),
            mtow_kg: record.mtow_kg,
            distance_km: record.distance_km,
            category: record.category,
            unit_rate: refs.unit_rate.value(),
            weight_factor: record.weight_factor.or(refs.weight_factor.value()),
            flat_charge: refs.flat_charge.value(),
            calculated_charge: result.calculated_charge,
            vendor_charge: record.vendor_charge,
            difference: result.difference,
            verdict: result.verdict,
            reason: result.reason,
        });
    }

    let summary = compute_summary(&lines);

    Ok(ReconReport {
        meta: ReconMeta {
            source_name: config.name.clone(),
            airport: config.airport.clone(),
            formula: config.formula.kind_name().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormulaConfig;
    use crate::table::ReferenceRow;

    fn record(mtow_kg: Option<f64>, vendor_charge: Option<f64>) -> VendorRecord {
        VendorRecord {
            identifier: "INV-1".into(),
            registration: Some("A7-BCD".into()),
            aircraft_type: None,
            mtow_kg,
            distance_km: None,
            category: None,
            vendor_charge,
            weight_factor: None,
            distance_factor: None,
            raw_fields: HashMap::new(),
        }
    }

    fn flat_refs(value: f64) -> ResolvedRefs {
        ResolvedRefs {
            flat_charge: Resolution::Value(value),
            ..Default::default()
        }
    }

    #[test]
    fn matched_within_tolerance() {
        let r = record(Some(90_000.0), Some(286.0));
        let result = reconcile(&r, &FormulaConfig::FlatRateByMass, &flat_refs(286.0), 0.01);
        assert_eq!(result.verdict, Verdict::Matched);
        assert_eq!(result.calculated_charge, Some(286.0));
        assert_eq!(result.difference, Some(0.0));
        assert_eq!(result.reason, None);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let r = record(Some(90_000.0), Some(286.01));
        let result = reconcile(&r, &FormulaConfig::FlatRateByMass, &flat_refs(286.0), 0.01);
        assert_eq!(result.verdict, Verdict::Matched);

        let r = record(Some(90_000.0), Some(286.011));
        let result = reconcile(&r, &FormulaConfig::FlatRateByMass, &flat_refs(286.0), 0.01);
        assert_eq!(result.verdict, Verdict::NotMatched);
        assert_eq!(result.reason, Some(UnmatchedReason::ChargeDifference));
    }

    #[test]
    fn missing_vendor_charge_never_matches() {
        let r = record(Some(90_000.0), None);
        let result = reconcile(&r, &FormulaConfig::FlatRateByMass, &flat_refs(286.0), 1e9);
        assert_eq!(result.verdict, Verdict::NotMatched);
        assert_eq!(result.calculated_charge, Some(286.0));
        assert_eq!(result.difference, None);
        assert_eq!(result.reason, Some(UnmatchedReason::MissingVendorCharge));
    }

    #[test]
    fn missing_mass_reason_regardless_of_vendor_charge() {
        let r = record(None, Some(286.0));
        let refs = ResolvedRefs {
            flat_charge: Resolution::Unresolved(UnmatchedReason::MissingMass),
            ..Default::default()
        };
        let result = reconcile(&r, &FormulaConfig::FlatRateByMass, &refs, 0.01);
        assert_eq!(result.verdict, Verdict::NotMatched);
        assert_eq!(result.calculated_charge, None);
        assert_eq!(result.difference, None);
        assert_eq!(result.reason, Some(UnmatchedReason::MissingMass));
    }

    #[test]
    fn deterministic() {
        let r = record(Some(90_000.0), Some(290.0));
        let a = reconcile(&r, &FormulaConfig::FlatRateByMass, &flat_refs(286.0), 0.01);
        let b = reconcile(&r, &FormulaConfig::FlatRateByMass, &flat_refs(286.0), 0.01);
        assert_eq!(a, b);
    }

    fn flat_config() -> SourceConfig {
        SourceConfig::from_toml(
            r#"
name = "flat test"
airport = "DAC"
tolerance = 0.01

[vendor]
file = "v.csv"
[vendor.columns]
registration = ["regn"]
mtow         = ["mtow"]
charge       = ["charge"]

[[tables]]
file  = "Rate Master.csv"
role  = "flat_charge"
key   = ["mtow"]
value = ["charge"]

[formula]
kind = "flat_rate_by_mass"
"#,
        )
        .unwrap()
    }

    #[test]
    fn run_flat_rate_nearest_key_scenario() {
        // Reference [(77000, 250.0), (97000, 286.0)], MTOW 90000 ->
        // nearest 97000 -> 286.00; vendor 286.00 -> Matched.
        let config = flat_config();
        let table = ReferenceTable::new(
            vec![
                ReferenceRow { key: 77_000.0, category: None, value: 250.0 },
                ReferenceRow { key: 97_000.0, category: None, value: 286.0 },
            ],
            false,
        );
        let input = ReconInput {
            records: vec![
                record(Some(90_000.0), Some(286.0)),
                record(Some(77_000.0), Some(999.0)),
                record(None, Some(250.0)),
            ],
            tables: HashMap::from([(TableRole::FlatCharge, table)]),
        };

        let report = run(&config, &input).unwrap();
        assert_eq!(report.meta.formula, "flat_rate_by_mass");
        assert_eq!(report.summary.total_records, 3);
        assert_eq!(report.summary.matched, 1);
        assert_eq!(report.summary.charge_mismatches, 1);
        assert_eq!(report.summary.missing_input, 1);

        assert_eq!(report.lines[0].verdict, Verdict::Matched);
        assert_eq!(report.lines[0].calculated_charge, Some(286.0));
        assert_eq!(report.lines[1].reason, Some(UnmatchedReason::ChargeDifference));
        assert_eq!(report.lines[2].reason, Some(UnmatchedReason::MissingMass));
    }

    #[test]
    fn run_reports_unresolved_lookup_distinctly() {
        let config = flat_config();
        // Empty table: lookups resolve to nothing, but the batch runs.
        let input = ReconInput {
            records: vec![record(Some(90_000.0), Some(286.0))],
            tables: HashMap::from([(TableRole::FlatCharge, ReferenceTable::new(vec![], false))]),
        };
        let report = run(&config, &input).unwrap();
        assert_eq!(report.summary.unresolved_lookups, 1);
        assert_eq!(report.summary.charge_mismatches, 0);
        assert_eq!(report.summary.missing_input, 0);
        assert_eq!(report.lines[0].reason, Some(UnmatchedReason::UnresolvedLookup));
    }
}
