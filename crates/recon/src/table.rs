//! Reference tables: rate/charge lookup keyed by mass, and the aircraft
//! mass master keyed by registration.
//!
//! Tables are loaded once per run and never mutated; every lookup is a
//! pure function over the loaded rows. Keys are always kilograms; the
//! loaders convert, the lookup never infers units.

use std::collections::HashMap;

use crate::config::{CategoryColumnConfig, MassTableConfig, RateTableConfig};
use crate::error::ReconError;
use crate::extract::extract_numeric;
use crate::model::FlightCategory;
use crate::normalize::{clean_header, resolve_column};

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    /// Key in kilograms.
    pub key: f64,
    pub category: Option<FlightCategory>,
    pub value: f64,
}

/// Ordered rate/charge rows with exact-then-nearest lookup.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
    partitioned: bool,
}

impl ReferenceTable {
    pub fn new(rows: Vec<ReferenceRow>, partitioned: bool) -> Self {
        Self { rows, partitioned }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Resolve a key to a value, or `None` when there is nothing to
    /// search.
    ///
    /// Category filtering is strict: when the table is partitioned and
    /// the caller supplies a category, an empty filtered set is
    /// unresolved, never silently widened back to the full table. An
    /// exact key match always dominates; ties break to the first row in
    /// original table order.
    pub fn lookup(&self, key_kg: f64, category: Option<FlightCategory>) -> Option<f64> {
        let rows: Vec<&ReferenceRow> = match (self.partitioned, category) {
            (true, Some(cat)) => self
                .rows
                .iter()
                .filter(|r| r.category == Some(cat))
                .collect(),
            _ => self.rows.iter().collect(),
        };

        if rows.is_empty() {
            return None;
        }

        if let Some(exact) = rows.iter().find(|r| r.key == key_kg) {
            return Some(exact.value);
        }

        let mut best: Option<(&ReferenceRow, f64)> = None;
        for row in rows {
            let diff = (row.key - key_kg).abs();
            // Strict less-than keeps the first-listed row on ties.
            if best.map_or(true, |(_, d)| diff < d) {
                best = Some((row, diff));
            }
        }
        best.map(|(row, _)| row.value)
    }

    /// Load a rate table from CSV text per its config. Rows whose key or
    /// value cell holds no number are skipped; an unresolvable key,
    /// value, or category column aborts the source.
    pub fn from_csv(csv_data: &str, config: &RateTableConfig) -> Result<Self, ReconError> {
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

        let source = config.file.clone();
        let missing = |role: &str| ReconError::SchemaMismatch {
            source: source.clone(),
            role: role.into(),
        };

        let key_idx = resolve_column(&headers, &config.key).ok_or_else(|| missing("key"))?;
        let value_idx = resolve_column(&headers, &config.value).ok_or_else(|| missing("value"))?;
        let category_idx = match &config.category {
            Some(cat) => {
                Some(resolve_column(&headers, &cat.column).ok_or_else(|| missing("category"))?)
            }
            None => None,
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;

            let key = match record.get(key_idx).and_then(extract_numeric) {
                Some(k) => config.key_unit.to_kg(k),
                None => continue,
            };
            let value = match record.get(value_idx).and_then(extract_numeric) {
                Some(v) => v,
                None => continue,
            };
            let category = match (category_idx, &config.category) {
                (Some(idx), Some(cat_config)) => {
                    parse_category(record.get(idx).unwrap_or(""), cat_config)
                }
                _ => None,
            };

            rows.push(ReferenceRow { key, category, value });
        }

        Ok(Self::new(rows, config.category.is_some()))
    }
}

/// Map free-text category cells onto the two flight categories.
/// Overflight markers win first so "Without landing rate" is not caught
/// by a bare "landing" substring.
fn parse_category(raw: &str, config: &CategoryColumnConfig) -> Option<FlightCategory> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if config
        .overflight_markers
        .iter()
        .any(|m| text.contains(&m.to_lowercase()))
    {
        return Some(FlightCategory::Overflight);
    }
    if config
        .landing_markers
        .iter()
        .any(|m| text.contains(&m.to_lowercase()))
    {
        return Some(FlightCategory::WithLanding);
    }
    None
}

// ---------------------------------------------------------------------------
// Aircraft mass master
// ---------------------------------------------------------------------------

/// Registration → MTOW (kilograms), with a static type-code fallback for
/// registrations absent from the master.
#[derive(Debug, Clone, Default)]
pub struct AircraftMassTable {
    by_registration: HashMap<String, f64>,
    by_type: HashMap<String, f64>,
}

impl AircraftMassTable {
    pub fn from_csv(csv_data: &str, config: &MassTableConfig) -> Result<Self, ReconError> {
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

        let missing = |role: &str| ReconError::SchemaMismatch {
            source: config.file.clone(),
            role: role.into(),
        };
        let reg_idx =
            resolve_column(&headers, &config.registration).ok_or_else(|| missing("registration"))?;
        let mass_idx = resolve_column(&headers, &config.mass).ok_or_else(|| missing("mass"))?;

        let mut by_registration = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;
            let reg = record.get(reg_idx).unwrap_or("").trim().to_string();
            if reg.is_empty() {
                continue;
            }
            if let Some(mass) = record.get(mass_idx).and_then(extract_numeric) {
                // First entry wins on duplicate registrations.
                by_registration.entry(reg).or_insert(config.unit.to_kg(mass));
            }
        }

        let by_type = config
            .type_fallback
            .iter()
            .map(|(k, v)| (k.trim().to_string(), *v))
            .collect();

        Ok(Self { by_registration, by_type })
    }

    /// Exact trimmed-string join on registration, then the type-code
    /// fallback. `None` means the record cannot be reconciled by mass.
    pub fn resolve(&self, registration: Option<&str>, type_code: Option<&str>) -> Option<f64> {
        if let Some(reg) = registration {
            if let Some(mass) = self.by_registration.get(reg.trim()) {
                return Some(*mass);
            }
        }
        type_code.and_then(|t| self.by_type.get(t.trim()).copied())
    }
}
