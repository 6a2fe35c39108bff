//! Human summary and CSV report emission.
//!
//! The engine produces structured results; everything printable lives
//! here, downstream of it.

use std::io::Write;

use navcharge_recon::model::{ReconReport, ReportLine, Verdict};

use crate::exit_codes::EXIT_RUNTIME;
use crate::CliError;

fn fmt_amount(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_default()
}

fn fmt_num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Print the verification summary block to stdout.
pub fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    let bar = "=".repeat(72);

    println!("{bar}");
    println!("VERIFICATION SUMMARY - {}", report.meta.source_name);
    println!("{bar}");
    println!("Airport:       {}", report.meta.airport);
    println!("Formula:       {}", report.meta.formula);
    println!();
    println!("[MATCHED]     {}", s.matched);
    println!("[NOT MATCHED] {}", s.not_matched);
    println!("Total Records: {}", s.total_records);
    println!("Match Rate:    {:.1}%", s.match_rate);

    if s.not_matched > 0 {
        println!();
        println!("Not matched breakdown:");
        println!("  charges differ:     {}", s.charge_mismatches);
        println!("  missing input:      {}", s.missing_input);
        println!("  unresolved lookup:  {}", s.unresolved_lookups);
    }

    let mut mismatches: Vec<&ReportLine> = report
        .lines
        .iter()
        .filter(|l| l.verdict == Verdict::NotMatched && l.difference.is_some())
        .collect();
    mismatches.sort_by(|a, b| {
        b.difference
            .partial_cmp(&a.difference)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if !mismatches.is_empty() {
        println!();
        println!("Largest differences (top {}):", mismatches.len().min(10));
        for line in mismatches.iter().take(10) {
            println!(
                "  {:<20} calculated {:>12} vendor {:>12} diff {:>10}",
                line.identifier,
                fmt_amount(line.calculated_charge),
                fmt_amount(line.vendor_charge),
                fmt_amount(line.difference),
            );
        }
    }
    println!("{bar}");
}

/// Emit the line-level report as CSV, suitable for re-ingestion by a
/// human auditor.
pub fn write_csv<W: Write>(report: &ReconReport, writer: W) -> Result<(), CliError> {
    let mut w = csv::Writer::from_writer(writer);

    w.write_record([
        "Identifier",
        "Registration",
        "Category",
        "MTOW_kg",
        "Distance_km",
        "Unit_Rate",
        "Weight_Factor",
        "Flat_Charge",
        "Calculated_Charge",
        "Vendor_Charge",
        "Difference",
        "Status",
        "Reason",
    ])
    .map_err(csv_err)?;

    for line in &report.lines {
        w.write_record([
            line.identifier.clone(),
            line.registration.clone().unwrap_or_default(),
            line.category.map(|c| c.to_string()).unwrap_or_default(),
            fmt_num(line.mtow_kg),
            fmt_num(line.distance_km),
            fmt_num(line.unit_rate),
            fmt_num(line.weight_factor),
            fmt_amount(line.flat_charge),
            fmt_amount(line.calculated_charge),
            fmt_amount(line.vendor_charge),
            fmt_amount(line.difference),
            line.verdict.to_string(),
            line.reason.map(|r| r.to_string()).unwrap_or_default(),
        ])
        .map_err(csv_err)?;
    }

    w.flush().map_err(|e| CliError {
        code: EXIT_RUNTIME,
        message: format!("cannot write report: {e}"),
        hint: None,
    })
}

fn csv_err(e: csv::Error) -> CliError {
    CliError {
        code: EXIT_RUNTIME,
        message: format!("cannot write report: {e}"),
        hint: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navcharge_recon::model::{
        FlightCategory, ReconMeta, ReconSummary, UnmatchedReason,
    };

    fn report() -> ReconReport {
        let lines = vec![
            ReportLine {
                identifier: "INV-1".into(),
                registration: Some("A7-ALA".into()),
                category: Some(FlightCategory::WithLanding),
                mtow_kg: Some(77000.0),
                distance_km: None,
                unit_rate: None,
                weight_factor: None,
                flat_charge: Some(250.0),
                calculated_charge: Some(250.0),
                vendor_charge: Some(250.0),
                difference: Some(0.0),
                verdict: Verdict::Matched,
                reason: None,
            },
            ReportLine {
                identifier: "INV-2".into(),
                registration: None,
                category: None,
                mtow_kg: None,
                distance_km: None,
                unit_rate: None,
                weight_factor: None,
                flat_charge: None,
                calculated_charge: None,
                vendor_charge: Some(100.0),
                difference: None,
                verdict: Verdict::NotMatched,
                reason: Some(UnmatchedReason::MissingMass),
            },
        ];
        ReconReport {
            meta: ReconMeta {
                source_name: "test".into(),
                airport: "DOH".into(),
                formula: "flat_rate_by_mass".into(),
                engine_version: "0.0.0".into(),
                run_at: "2026-01-01T00:00:00Z".into(),
            },
            summary: ReconSummary {
                total_records: 2,
                matched: 1,
                not_matched: 1,
                charge_mismatches: 0,
                missing_input: 1,
                unresolved_lookups: 0,
                match_rate: 50.0,
            },
            lines,
        }
    }

    #[test]
    fn csv_report_round_trips_verdicts() {
        let mut buf = Vec::new();
        write_csv(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Identifier,Registration,Category"));
        let first = lines.next().unwrap();
        assert!(first.contains("INV-1"));
        assert!(first.contains("with_landing"));
        assert!(first.contains("Matched"));
        let second = lines.next().unwrap();
        assert!(second.contains("Not Matched"));
        assert!(second.contains("missing_mass"));
    }
}
