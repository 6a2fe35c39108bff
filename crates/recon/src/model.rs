use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized invoice line from a vendor file.
///
/// Mass is always kilograms, distance always kilometers; the normalizer
/// performs all unit conversion before a record reaches lookup or formula
/// code.
#[derive(Debug, Clone)]
pub struct VendorRecord {
    pub identifier: String,
    pub registration: Option<String>,
    pub aircraft_type: Option<String>,
    pub mtow_kg: Option<f64>,
    pub distance_km: Option<f64>,
    pub category: Option<FlightCategory>,
    pub vendor_charge: Option<f64>,
    /// Pre-computed factors some vendors carry in the invoice itself.
    pub weight_factor: Option<f64>,
    pub distance_factor: Option<f64>,
    pub raw_fields: HashMap<String, String>,
}

/// Flight category relative to the airport of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightCategory {
    WithLanding,
    Overflight,
}

impl std::fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WithLanding => write!(f, "with_landing"),
            Self::Overflight => write!(f, "overflight"),
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Matched,
    NotMatched,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "Matched"),
            Self::NotMatched => write!(f, "Not Matched"),
        }
    }
}

/// Why a line was NotMatched. The report must always distinguish "the
/// charges differ" from "an input could not be resolved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    ChargeDifference,
    MissingVendorCharge,
    MissingMass,
    MissingDistance,
    MissingFactor,
    UnresolvedLookup,
}

impl std::fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChargeDifference => write!(f, "charge_difference"),
            Self::MissingVendorCharge => write!(f, "missing_vendor_charge"),
            Self::MissingMass => write!(f, "missing_mass"),
            Self::MissingDistance => write!(f, "missing_distance"),
            Self::MissingFactor => write!(f, "missing_factor"),
            Self::UnresolvedLookup => write!(f, "unresolved_lookup"),
        }
    }
}

/// Outcome of reconciling one record. Computed once, immutable, consumed
/// only by reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub calculated_charge: Option<f64>,
    pub difference: Option<f64>,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnmatchedReason>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One line of the final report: the record identifier, the resolved
/// inputs that fed the formula, and the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ReportLine {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtow_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FlightCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnmatchedReason>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_records: usize,
    pub matched: usize,
    pub not_matched: usize,
    /// NotMatched where both charges resolved but differ beyond tolerance.
    pub charge_mismatches: usize,
    /// NotMatched because a required record field could not be extracted.
    pub missing_input: usize,
    /// NotMatched because a reference lookup had no rows to search.
    pub unresolved_lookups: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub source_name: String,
    pub airport: String,
    pub formula: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub lines: Vec<ReportLine>,
}
