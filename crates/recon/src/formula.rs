//! Charge formula strategies.
//!
//! A closed set of interchangeable shapes dispatched over the
//! [`FormulaConfig`] tag. Every shape rounds to 2 decimals (vendor
//! invoicing convention) and fails with the most specific reason when a
//! required input is missing, never a substituted default.

use crate::config::FormulaConfig;
use crate::model::{UnmatchedReason, VendorRecord};

/// Reference-table values resolved for one record before dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedRefs {
    pub unit_rate: Resolution,
    pub weight_factor: Resolution,
    pub flat_charge: Resolution,
}

/// Outcome of resolving one reference role for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Resolution {
    /// No table or vendor column supplies this role.
    #[default]
    NotConfigured,
    /// A source is configured but produced nothing for this record.
    Unresolved(UnmatchedReason),
    Value(f64),
}

impl Resolution {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    fn require(&self) -> Result<f64, UnmatchedReason> {
        match self {
            Self::Value(v) => Ok(*v),
            Self::Unresolved(reason) => Err(*reason),
            Self::NotConfigured => Err(UnmatchedReason::UnresolvedLookup),
        }
    }
}

/// Round to 2 decimal places, matching vendor invoicing convention.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Compute the expected charge for a record, or the reason it cannot be
/// computed.
pub fn compute(
    formula: &FormulaConfig,
    record: &VendorRecord,
    refs: &ResolvedRefs,
) -> Result<f64, UnmatchedReason> {
    match formula {
        FormulaConfig::FlatRateByMass => {
            if record.mtow_kg.is_none() {
                return Err(UnmatchedReason::MissingMass);
            }
            refs.flat_charge.require().map(round2)
        }

        FormulaConfig::LinearDistanceWeight { unit_rate, weight_factor, distance_step } => {
            let rate = match refs.unit_rate {
                Resolution::Value(r) => r,
                Resolution::Unresolved(reason) => match unit_rate {
                    Some(c) => *c,
                    None => return Err(reason),
                },
                Resolution::NotConfigured => {
                    unit_rate.ok_or(UnmatchedReason::UnresolvedLookup)?
                }
            };

            let wf = match refs.weight_factor {
                Resolution::Value(v) => v,
                Resolution::Unresolved(reason) => return Err(reason),
                // Folded into the unit rate for this airport.
                Resolution::NotConfigured => weight_factor.unwrap_or(1.0),
            };

            let distance_factor = match record.distance_factor {
                Some(df) => df,
                None => {
                    let d = record
                        .distance_km
                        .ok_or(UnmatchedReason::MissingDistance)?;
                    let d = match distance_step {
                        Some(step) => (d / step).ceil() * step,
                        None => d,
                    };
                    d / 100.0
                }
            };

            Ok(round2(rate * distance_factor * wf))
        }

        FormulaConfig::CappedDistanceAverage { low_bound, high_bound } => {
            let d = record.distance_km.ok_or(UnmatchedReason::MissingDistance)?;
            let mtow_tonnes =
                record.mtow_kg.ok_or(UnmatchedReason::MissingMass)? / 1000.0;
            let capped = d.clamp(*low_bound, *high_bound);
            Ok(round2((capped + mtow_tonnes) / 3.0))
        }

        FormulaConfig::SquareRootWeightFactor { unit_rate } => {
            let d = record.distance_km.ok_or(UnmatchedReason::MissingDistance)?;
            let m = record.mtow_kg.ok_or(UnmatchedReason::MissingMass)?;
            Ok(round2(unit_rate * (d / 100.0) * (m.sqrt() / 50.0)))
        }

        FormulaConfig::MassThresholdSurcharge { per_kg_rate, threshold_kg, surcharge } => {
            let d = record.distance_km.ok_or(UnmatchedReason::MissingDistance)?;
            let m = record.mtow_kg.ok_or(UnmatchedReason::MissingMass)?;
            let rate = if m > *threshold_kg {
                m * per_kg_rate + surcharge
            } else {
                m * per_kg_rate
            };
            Ok(round2(rate * d))
        }

        FormulaConfig::FixedComponentSum { components } => {
            Ok(round2(components.iter().sum()))
        }
    }
}
