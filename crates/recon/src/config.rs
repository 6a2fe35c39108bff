use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Per-airport source configuration. One TOML file per vendor source
/// replaces one bespoke verification script: column-name candidates,
/// unit conventions, reference tables, formula, and tolerance are all
/// data here.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// IATA code of the airport of interest; drives landing detection.
    pub airport: String,
    /// Maximum |calculated - vendor| still counted as Matched. Always
    /// explicit: airports round differently (0.01 vs 0.5 observed).
    pub tolerance: f64,
    pub vendor: VendorFileConfig,
    #[serde(default)]
    pub mass_table: Option<MassTableConfig>,
    #[serde(default)]
    pub tables: Vec<RateTableConfig>,
    pub formula: FormulaConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Column specs
// ---------------------------------------------------------------------------

/// How to find one column role in a loosely-normalized header row.
///
/// Either a bare list of candidate substrings (case-insensitive), or a
/// table that additionally allows a positional fallback: negative
/// positions count from the right. Position is a documented last resort
/// for headerless junk columns, never the primary mechanism.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Names(Vec<String>),
    Detailed {
        #[serde(default)]
        names: Vec<String>,
        #[serde(default)]
        fallback_position: Option<i64>,
    },
}

impl ColumnSpec {
    pub fn names(&self) -> &[String] {
        match self {
            Self::Names(n) => n,
            Self::Detailed { names, .. } => names,
        }
    }

    pub fn fallback_position(&self) -> Option<i64> {
        match self {
            Self::Names(_) => None,
            Self::Detailed { fallback_position, .. } => *fallback_position,
        }
    }
}

// ---------------------------------------------------------------------------
// Vendor file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VendorFileConfig {
    pub file: String,
    pub columns: VendorColumns,
    #[serde(default)]
    pub mass_unit: MassUnit,
    #[serde(default)]
    pub distance_unit: DistanceUnit,
    /// Registration is the last whitespace token of a composite cell
    /// (some vendors pack "FLIGHTNO REGISTRATION" into one column).
    #[serde(default)]
    pub registration_split: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorColumns {
    #[serde(default)]
    pub identifier: Option<ColumnSpec>,
    #[serde(default)]
    pub registration: Option<ColumnSpec>,
    #[serde(default)]
    pub aircraft_type: Option<ColumnSpec>,
    #[serde(default)]
    pub mtow: Option<ColumnSpec>,
    #[serde(default)]
    pub distance: Option<ColumnSpec>,
    pub charge: ColumnSpec,
    #[serde(default)]
    pub origin: Option<ColumnSpec>,
    #[serde(default)]
    pub destination: Option<ColumnSpec>,
    #[serde(default)]
    pub weight_factor: Option<ColumnSpec>,
    #[serde(default)]
    pub distance_factor: Option<ColumnSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassUnit {
    Kilograms,
    Tonnes,
}

impl Default for MassUnit {
    fn default() -> Self {
        Self::Kilograms
    }
}

impl MassUnit {
    /// Convert a mass in this unit to kilograms.
    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            Self::Kilograms => value,
            Self::Tonnes => value * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    Kilometers,
    NauticalMiles,
}

impl Default for DistanceUnit {
    fn default() -> Self {
        Self::Kilometers
    }
}

impl DistanceUnit {
    /// Convert a distance in this unit to kilometers.
    pub fn to_km(&self, value: f64) -> f64 {
        match self {
            Self::Kilometers => value,
            Self::NauticalMiles => value * 1.852,
        }
    }
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Aircraft mass master: registration → MTOW, with an optional static
/// type-code fallback for registrations missing from the master.
#[derive(Debug, Clone, Deserialize)]
pub struct MassTableConfig {
    pub file: String,
    pub registration: ColumnSpec,
    pub mass: ColumnSpec,
    #[serde(default)]
    pub unit: MassUnit,
    #[serde(default)]
    pub type_fallback: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateTableConfig {
    pub file: String,
    pub role: TableRole,
    pub key: ColumnSpec,
    pub value: ColumnSpec,
    /// Unit of the key column; lookup keys are always kilograms.
    #[serde(default)]
    pub key_unit: MassUnit,
    #[serde(default)]
    pub category: Option<CategoryColumnConfig>,
}

/// Which resolved value a rate table supplies to the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    UnitRate,
    WeightFactor,
    FlatCharge,
}

impl std::fmt::Display for TableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnitRate => write!(f, "unit_rate"),
            Self::WeightFactor => write!(f, "weight_factor"),
            Self::FlatCharge => write!(f, "flat_charge"),
        }
    }
}

/// Category partition of a rate table (landing vs overflight rows).
/// Overflight markers are checked first: "Without landing rate" must not
/// match a bare "landing" substring.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryColumnConfig {
    pub column: ColumnSpec,
    #[serde(default = "default_landing_markers")]
    pub landing_markers: Vec<String>,
    #[serde(default = "default_overflight_markers")]
    pub overflight_markers: Vec<String>,
}

fn default_landing_markers() -> Vec<String> {
    vec!["with landing".into(), "landing".into()]
}

fn default_overflight_markers() -> Vec<String> {
    vec!["without".into(), "overflight".into()]
}

// ---------------------------------------------------------------------------
// Formula
// ---------------------------------------------------------------------------

/// The charge formula, a closed tagged set. Adding a shape means adding
/// a variant here and a compute arm in `formula`; the reconciler never
/// changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulaConfig {
    /// Charge is the flat-charge table value at the record's MTOW,
    /// optionally partitioned by flight category.
    FlatRateByMass,
    /// `unit_rate × (distance / 100) × weight_factor`. Rate and factor
    /// come from vendor columns, rate tables, or the constants here;
    /// `distance_step` rounds distance up to the next multiple first.
    LinearDistanceWeight {
        #[serde(default)]
        unit_rate: Option<f64>,
        #[serde(default)]
        weight_factor: Option<f64>,
        #[serde(default)]
        distance_step: Option<f64>,
    },
    /// `(clamp(distance, low, high) + mtow_tonnes) / 3`.
    CappedDistanceAverage { low_bound: f64, high_bound: f64 },
    /// `unit_rate × (distance / 100) × (sqrt(mtow_kg) / 50)`.
    SquareRootWeightFactor { unit_rate: f64 },
    /// `(mtow_kg × per_kg_rate + surcharge if over threshold) × distance`.
    MassThresholdSurcharge {
        per_kg_rate: f64,
        threshold_kg: f64,
        surcharge: f64,
    },
    /// Sum of fixed airport-wide components; no per-record variation.
    FixedComponentSum { components: Vec<f64> },
}

impl FormulaConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::FlatRateByMass => "flat_rate_by_mass",
            Self::LinearDistanceWeight { .. } => "linear_distance_weight",
            Self::CappedDistanceAverage { .. } => "capped_distance_average",
            Self::SquareRootWeightFactor { .. } => "square_root_weight_factor",
            Self::MassThresholdSurcharge { .. } => "mass_threshold_surcharge",
            Self::FixedComponentSum { .. } => "fixed_component_sum",
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SourceConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SourceConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn table(&self, role: TableRole) -> Option<&RateTableConfig> {
        self.tables.iter().find(|t| t.role == role)
    }

    /// The record can obtain an MTOW somehow: a vendor column, a mass
    /// master, or a type-code fallback map.
    fn has_mass_source(&self) -> bool {
        self.vendor.columns.mtow.is_some() || self.mass_table.is_some()
    }

    fn has_distance_source(&self) -> bool {
        self.vendor.columns.distance.is_some() || self.vendor.columns.distance_factor.is_some()
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }

        if self.airport.trim().is_empty() {
            return Err(ReconError::ConfigValidation("airport must not be empty".into()));
        }

        // One table per role
        let mut seen = Vec::new();
        for t in &self.tables {
            if seen.contains(&t.role) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate reference table for role '{}'",
                    t.role
                )));
            }
            seen.push(t.role);
        }

        // Every configured column spec needs at least one way to resolve
        let specs: [(&str, Option<&ColumnSpec>); 10] = [
            ("identifier", self.vendor.columns.identifier.as_ref()),
            ("registration", self.vendor.columns.registration.as_ref()),
            ("aircraft_type", self.vendor.columns.aircraft_type.as_ref()),
            ("mtow", self.vendor.columns.mtow.as_ref()),
            ("distance", self.vendor.columns.distance.as_ref()),
            ("charge", Some(&self.vendor.columns.charge)),
            ("origin", self.vendor.columns.origin.as_ref()),
            ("destination", self.vendor.columns.destination.as_ref()),
            ("weight_factor", self.vendor.columns.weight_factor.as_ref()),
            ("distance_factor", self.vendor.columns.distance_factor.as_ref()),
        ];
        for (role, spec) in specs {
            if let Some(spec) = spec {
                if spec.names().is_empty() && spec.fallback_position().is_none() {
                    return Err(ReconError::ConfigValidation(format!(
                        "column '{role}': needs candidate names or a fallback position"
                    )));
                }
            }
        }

        // Formula-specific requirements
        match &self.formula {
            FormulaConfig::FlatRateByMass => {
                if self.table(TableRole::FlatCharge).is_none() {
                    return Err(ReconError::ConfigValidation(
                        "flat_rate_by_mass requires a flat_charge reference table".into(),
                    ));
                }
                if !self.has_mass_source() {
                    return Err(ReconError::ConfigValidation(
                        "flat_rate_by_mass requires an MTOW column or a mass table".into(),
                    ));
                }
            }
            FormulaConfig::LinearDistanceWeight { unit_rate, weight_factor, distance_step } => {
                if unit_rate.is_none() && self.table(TableRole::UnitRate).is_none() {
                    return Err(ReconError::ConfigValidation(
                        "linear_distance_weight requires a unit_rate constant or table".into(),
                    ));
                }
                if !self.has_distance_source() {
                    return Err(ReconError::ConfigValidation(
                        "linear_distance_weight requires a distance or distance_factor column"
                            .into(),
                    ));
                }
                // Weight factor may fall back to 1.0 (folded into the unit
                // rate), so only the table-keyed case needs a mass source.
                if weight_factor.is_none()
                    && self.vendor.columns.weight_factor.is_none()
                    && self.table(TableRole::WeightFactor).is_some()
                    && !self.has_mass_source()
                {
                    return Err(ReconError::ConfigValidation(
                        "weight_factor table lookup requires an MTOW source".into(),
                    ));
                }
                if let Some(step) = distance_step {
                    if !step.is_finite() || *step <= 0.0 {
                        return Err(ReconError::ConfigValidation(format!(
                            "distance_step must be positive, got {step}"
                        )));
                    }
                }
            }
            FormulaConfig::CappedDistanceAverage { low_bound, high_bound } => {
                if !(low_bound.is_finite() && high_bound.is_finite()) || low_bound > high_bound {
                    return Err(ReconError::ConfigValidation(format!(
                        "capped_distance_average bounds invalid: {low_bound}..{high_bound}"
                    )));
                }
                if !self.has_distance_source() || !self.has_mass_source() {
                    return Err(ReconError::ConfigValidation(
                        "capped_distance_average requires distance and MTOW sources".into(),
                    ));
                }
            }
            FormulaConfig::SquareRootWeightFactor { unit_rate } => {
                if !unit_rate.is_finite() {
                    return Err(ReconError::ConfigValidation(
                        "square_root_weight_factor unit_rate must be finite".into(),
                    ));
                }
                if !self.has_distance_source() || !self.has_mass_source() {
                    return Err(ReconError::ConfigValidation(
                        "square_root_weight_factor requires distance and MTOW sources".into(),
                    ));
                }
            }
            FormulaConfig::MassThresholdSurcharge { per_kg_rate, threshold_kg, surcharge } => {
                for (name, v) in [
                    ("per_kg_rate", per_kg_rate),
                    ("threshold_kg", threshold_kg),
                    ("surcharge", surcharge),
                ] {
                    if !v.is_finite() {
                        return Err(ReconError::ConfigValidation(format!(
                            "mass_threshold_surcharge {name} must be finite, got {v}"
                        )));
                    }
                }
                if !self.has_distance_source() || !self.has_mass_source() {
                    return Err(ReconError::ConfigValidation(
                        "mass_threshold_surcharge requires distance and MTOW sources".into(),
                    ));
                }
            }
            FormulaConfig::FixedComponentSum { components } => {
                if components.is_empty() || components.iter().any(|c| !c.is_finite()) {
                    return Err(ReconError::ConfigValidation(
                        "fixed_component_sum requires at least one finite component".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_FLAT_RATE: &str = r#"
name = "DAC en-route charges"
airport = "DAC"
tolerance = 0.01

[vendor]
file = "Vendor data.csv"

[vendor.columns]
identifier   = ["invoice", "flight no"]
registration = ["regn", "registration", "acft reg"]
mtow         = ["mtow (kg)", "mtow"]
charge       = ["rnc", "usd"]

[[tables]]
file  = "Rate Master.csv"
role  = "flat_charge"
key   = ["mtow (kg)", "mtow"]
value = ["charge"]

[formula]
kind = "flat_rate_by_mass"
"#;

    #[test]
    fn parse_valid_flat_rate() {
        let config = SourceConfig::from_toml(VALID_FLAT_RATE).unwrap();
        assert_eq!(config.name, "DAC en-route charges");
        assert_eq!(config.airport, "DAC");
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.tables.len(), 1);
        assert_eq!(config.tables[0].role, TableRole::FlatCharge);
        assert_eq!(config.formula.kind_name(), "flat_rate_by_mass");
        assert_eq!(config.vendor.mass_unit, MassUnit::Kilograms);
    }

    #[test]
    fn parse_linear_with_tables_and_units() {
        let input = r#"
name = "MCT overflight charges"
airport = "MCT"
tolerance = 0.01

[vendor]
file = "1900374945.csv"
mass_unit = "tonnes"
distance_unit = "nautical_miles"

[vendor.columns]
mtow     = ["max. take off weight"]
distance = ["distance"]
charge   = ["total", "amount"]

[[tables]]
file  = "Rate Master.csv"
role  = "unit_rate"
key   = ["mtow"]
value = ["unit rate"]

[[tables]]
file  = "Rate Master.csv"
role  = "weight_factor"
key   = ["mtow"]
value = ["weight factor"]

[formula]
kind = "linear_distance_weight"
"#;
        let config = SourceConfig::from_toml(input).unwrap();
        assert_eq!(config.vendor.mass_unit, MassUnit::Tonnes);
        assert_eq!(config.vendor.distance_unit, DistanceUnit::NauticalMiles);
        assert!(config.table(TableRole::UnitRate).is_some());
        assert!(config.table(TableRole::WeightFactor).is_some());
        assert!(config.table(TableRole::FlatCharge).is_none());
    }

    #[test]
    fn parse_detailed_column_spec() {
        let input = r#"
name = "EGY"
airport = "CAI"
tolerance = 0.01

[vendor]
file = "v.csv"

[vendor.columns]
mtow     = { names = ["mtow"], fallback_position = -2 }
distance = ["distance"]
charge   = { names = [], fallback_position = -1 }

[formula]
kind = "square_root_weight_factor"
unit_rate = 21.38
"#;
        let config = SourceConfig::from_toml(input).unwrap();
        let mtow = config.vendor.columns.mtow.as_ref().unwrap();
        assert_eq!(mtow.names(), ["mtow"]);
        assert_eq!(mtow.fallback_position(), Some(-2));
        assert_eq!(config.vendor.columns.charge.fallback_position(), Some(-1));
    }

    #[test]
    fn parse_mass_table_with_type_fallback() {
        let input = r#"
name = "DOH"
airport = "DOH"
tolerance = 0.01

[vendor]
file = "Vendor Data.csv"

[vendor.columns]
registration = ["registration"]
aircraft_type = ["ac type"]
origin       = ["iata"]
destination  = ["iata.1"]
charge       = ["total bill"]

[mass_table]
file = "MTOW Master.csv"
registration = ["aircraft"]
mass = ["mtow_in_kgs"]

[mass_table.type_fallback]
A20N = 77000.0
A21N = 97000.0

[[tables]]
file  = "Rate Master.csv"
role  = "flat_charge"
key   = ["mtow"]
value = ["charge"]
key_unit = "tonnes"

[tables.category]
column = ["landing/takeoff"]

[formula]
kind = "flat_rate_by_mass"
"#;
        let config = SourceConfig::from_toml(input).unwrap();
        let mass = config.mass_table.as_ref().unwrap();
        assert_eq!(mass.type_fallback["A20N"], 77000.0);
        let table = config.table(TableRole::FlatCharge).unwrap();
        assert_eq!(table.key_unit, MassUnit::Tonnes);
        let cat = table.category.as_ref().unwrap();
        assert_eq!(cat.overflight_markers, ["without", "overflight"]);
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = VALID_FLAT_RATE.replace("tolerance = 0.01", "tolerance = -1.0");
        let err = SourceConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn reject_flat_rate_without_table() {
        let input = r#"
name = "Bad"
airport = "XXX"
tolerance = 0.01

[vendor]
file = "v.csv"
[vendor.columns]
mtow   = ["mtow"]
charge = ["charge"]

[formula]
kind = "flat_rate_by_mass"
"#;
        let err = SourceConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("flat_charge"));
    }

    #[test]
    fn reject_duplicate_table_role() {
        let input = format!(
            r#"{VALID_FLAT_RATE}
[[tables]]
file  = "Other.csv"
role  = "flat_charge"
key   = ["mtow"]
value = ["charge"]
"#
        );
        let err = SourceConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn reject_linear_without_rate_source() {
        let input = r#"
name = "Bad"
airport = "XXX"
tolerance = 0.5

[vendor]
file = "v.csv"
[vendor.columns]
distance = ["distance"]
charge   = ["charge"]

[formula]
kind = "linear_distance_weight"
"#;
        let err = SourceConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("unit_rate"));
    }

    #[test]
    fn reject_inverted_cap_bounds() {
        let input = r#"
name = "Bad"
airport = "CMB"
tolerance = 0.01

[vendor]
file = "v.csv"
[vendor.columns]
mtow     = ["mtow"]
distance = ["distance"]
charge   = ["charge"]

[formula]
kind = "capped_distance_average"
low_bound = 600.0
high_bound = 300.0
"#;
        let err = SourceConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("bounds"));
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(MassUnit::Tonnes.to_kg(180.0), 180_000.0);
        assert_eq!(MassUnit::Kilograms.to_kg(77000.0), 77000.0);
        assert_eq!(DistanceUnit::NauticalMiles.to_km(100.0), 185.2);
        assert_eq!(DistanceUnit::Kilometers.to_km(774.0), 774.0);
    }
}
