//! Vendor-file normalization: header hygiene, role-to-column resolution,
//! and per-record construction of [`VendorRecord`]s.
//!
//! Every vendor ships a different schema. Column roles are found by
//! ordered candidate-substring match against cleaned headers, never by
//! fixed position (except an explicitly configured last-resort fallback).

use std::collections::HashMap;

use crate::config::{ColumnSpec, SourceConfig};
use crate::error::ReconError;
use crate::extract::extract_optional;
use crate::model::{FlightCategory, VendorRecord};
use crate::table::AircraftMassTable;

/// Normalize one raw header cell: newlines, carriage returns and
/// non-breaking spaces become plain spaces, then trim.
pub fn clean_header(raw: &str) -> String {
    raw.replace(['\n', '\r'], " ")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

/// Resolve a column role against cleaned headers: first candidate name
/// that is a case-insensitive substring of any header wins, in candidate
/// order; otherwise the configured positional fallback (negative counts
/// from the right).
pub fn resolve_column(headers: &[String], spec: &ColumnSpec) -> Option<usize> {
    for candidate in spec.names() {
        let needle = candidate.to_lowercase();
        if let Some(idx) = headers
            .iter()
            .position(|h| h.to_lowercase().contains(&needle))
        {
            return Some(idx);
        }
    }

    let pos = spec.fallback_position()?;
    let len = headers.len() as i64;
    let idx = if pos < 0 { len + pos } else { pos };
    if (0..len).contains(&idx) {
        Some(idx as usize)
    } else {
        None
    }
}

/// Column indices for every configured vendor role.
#[derive(Debug)]
struct ResolvedColumns {
    identifier: Option<usize>,
    registration: Option<usize>,
    aircraft_type: Option<usize>,
    mtow: Option<usize>,
    distance: Option<usize>,
    charge: usize,
    origin: Option<usize>,
    destination: Option<usize>,
    weight_factor: Option<usize>,
    distance_factor: Option<usize>,
}

fn resolve_required(
    headers: &[String],
    spec: &ColumnSpec,
    source: &str,
    role: &str,
) -> Result<usize, ReconError> {
    resolve_column(headers, spec).ok_or_else(|| ReconError::SchemaMismatch {
        source: source.into(),
        role: role.into(),
    })
}

/// A configured role that matches nothing is a schema mismatch for the
/// whole source, not a per-record defect.
fn resolve_configured(
    headers: &[String],
    spec: Option<&ColumnSpec>,
    source: &str,
    role: &str,
) -> Result<Option<usize>, ReconError> {
    match spec {
        Some(spec) => resolve_required(headers, spec, source, role).map(Some),
        None => Ok(None),
    }
}

fn resolve_all(
    headers: &[String],
    config: &SourceConfig,
) -> Result<ResolvedColumns, ReconError> {
    let cols = &config.vendor.columns;
    let src = &config.name;
    Ok(ResolvedColumns {
        identifier: resolve_configured(headers, cols.identifier.as_ref(), src, "identifier")?,
        registration: resolve_configured(headers, cols.registration.as_ref(), src, "registration")?,
        aircraft_type: resolve_configured(headers, cols.aircraft_type.as_ref(), src, "aircraft_type")?,
        mtow: resolve_configured(headers, cols.mtow.as_ref(), src, "mtow")?,
        distance: resolve_configured(headers, cols.distance.as_ref(), src, "distance")?,
        charge: resolve_required(headers, &cols.charge, src, "charge")?,
        origin: resolve_configured(headers, cols.origin.as_ref(), src, "origin")?,
        destination: resolve_configured(headers, cols.destination.as_ref(), src, "destination")?,
        weight_factor: resolve_configured(headers, cols.weight_factor.as_ref(), src, "weight_factor")?,
        distance_factor: resolve_configured(headers, cols.distance_factor.as_ref(), src, "distance_factor")?,
    })
}

/// Load and normalize vendor CSV text into records.
///
/// Per-record problems (missing MTOW, dirty charge cell) become `None`
/// fields that resolve to NotMatched downstream; only unresolvable
/// configured columns abort the source.
pub fn load_vendor_records(
    csv_data: &str,
    config: &SourceConfig,
    mass_table: Option<&AircraftMassTable>,
) -> Result<Vec<VendorRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Csv(e.to_string()))?
        .iter()
        .map(clean_header)
        .collect();

    let cols = resolve_all(&headers, config)?;
    let airport = config.airport.trim().to_uppercase();

    let mut records = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));

        let identifier = cell(cols.identifier)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| (row_no + 1).to_string());

        let registration = cell(cols.registration)
            .map(|s| extract_registration(s, config.vendor.registration_split))
            .filter(|s| !s.is_empty());

        let aircraft_type = cell(cols.aircraft_type)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Mass: direct column, then registration join, then type fallback
        let mtow_kg = extract_optional(cell(cols.mtow))
            .map(|m| config.vendor.mass_unit.to_kg(m))
            .or_else(|| {
                mass_table.and_then(|t| {
                    t.resolve(registration.as_deref(), aircraft_type.as_deref())
                })
            });

        let distance_km = extract_optional(cell(cols.distance))
            .map(|d| config.vendor.distance_unit.to_km(d));

        let category = derive_category(cell(cols.origin), cell(cols.destination), &airport);

        let vendor_charge = extract_optional(cell(Some(cols.charge)));
        let weight_factor = extract_optional(cell(cols.weight_factor));
        let distance_factor = extract_optional(cell(cols.distance_factor));

        let mut raw_fields = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            if let Some(val) = record.get(i) {
                raw_fields.insert(h.clone(), val.to_string());
            }
        }

        records.push(VendorRecord {
            identifier,
            registration,
            aircraft_type,
            mtow_kg,
            distance_km,
            category,
            vendor_charge,
            weight_factor,
            distance_factor,
            raw_fields,
        });
    }

    Ok(records)
}

/// Some vendors pack "FLIGHTNO REGISTRATION" into a single cell; the
/// registration is the last whitespace-separated token.
fn extract_registration(raw: &str, split_composite: bool) -> String {
    let trimmed = raw.trim();
    if split_composite {
        trimmed
            .split_whitespace()
            .last()
            .unwrap_or(trimmed)
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// With landing iff the destination is the airport of interest;
/// otherwise the flight only crossed the charging zone.
fn derive_category(
    origin: Option<&str>,
    destination: Option<&str>,
    airport: &str,
) -> Option<FlightCategory> {
    let dest = destination?.trim().to_uppercase();
    if dest.is_empty() {
        return None;
    }
    // Origin is not used in the rule but its presence confirms the
    // config meant to derive categories for this source.
    let _ = origin;
    if dest == airport {
        Some(FlightCategory::WithLanding)
    } else {
        Some(FlightCategory::Overflight)
    }
}
