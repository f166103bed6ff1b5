//! Unit Conversion Table
//!
//! Enumerated measurement units grouped in families (energy, CO2, CO2
//! equivalent) and a precomputed conversion matrix per family.
//!
//! Conversions only happen inside a family. The factor for a unit to itself
//! is exactly `1.0`; every other factor is derived from the amount of that
//! unit contained in one reference unit of the family (Mtoe, MtCO2, MtCO2eq).
//!
//! # Example
//!
//! ```rust
//! use dataportal_engine::units::{convert, EnergyUnit, Unit, UnitFamily};
//!
//! let twh = convert(1.0, Unit::Energy(EnergyUnit::Mtoe), Unit::Energy(EnergyUnit::TWh), UnitFamily::Energy).unwrap();
//! assert!((twh - 11.63).abs() < 1e-9);
//! ```

use crate::error::ConversionError;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Families
// ============================================================================

/// A set of mutually convertible units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitFamily {
    /// Energy quantities (Mtoe, TWh, ...)
    Energy,
    /// CO2 emissions (MtCO2, GtC, ...)
    Co2,
    /// CO2-equivalent emissions (MtCO2eq, ...)
    Co2eq,
}

impl UnitFamily {
    /// Unit every fact table of this family stores its values in
    pub fn reference_unit(self) -> Unit {
        match self {
            UnitFamily::Energy => Unit::Energy(EnergyUnit::Mtoe),
            UnitFamily::Co2 => Unit::Co2(Co2Unit::MtCo2),
            UnitFamily::Co2eq => Unit::Co2eq(Co2eqUnit::MtCo2eq),
        }
    }

    /// All units of the family, in wire order
    pub fn units(self) -> Vec<Unit> {
        match self {
            UnitFamily::Energy => EnergyUnit::ALL.iter().copied().map(Unit::Energy).collect(),
            UnitFamily::Co2 => Co2Unit::ALL.iter().copied().map(Unit::Co2).collect(),
            UnitFamily::Co2eq => Co2eqUnit::ALL.iter().copied().map(Unit::Co2eq).collect(),
        }
    }

    fn matrix(self) -> &'static ConversionMatrix {
        match self {
            UnitFamily::Energy => &ENERGY_MATRIX,
            UnitFamily::Co2 => &CO2_MATRIX,
            UnitFamily::Co2eq => &CO2EQ_MATRIX,
        }
    }
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitFamily::Energy => write!(f, "energy"),
            UnitFamily::Co2 => write!(f, "CO2"),
            UnitFamily::Co2eq => write!(f, "CO2eq"),
        }
    }
}

// ============================================================================
// Unit enums (wire names are part of the public contract)
// ============================================================================

/// All the energy units available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyUnit {
    /// Million tonnes of oil equivalent (reference)
    #[serde(rename = "Mtoe")]
    Mtoe,
    /// Thousand British thermal units
    #[serde(rename = "Mbtu")]
    Mbtu,
    /// Million barrels per day
    #[serde(rename = "Mb_per_d")]
    MbPerD,
    /// Million tonnes of coal equivalent
    #[serde(rename = "Mtce")]
    Mtce,
    /// Trillion cubic feet of gas
    #[serde(rename = "Tcf_gas")]
    TcfGas,
    /// Billion cubic meters of gas
    #[serde(rename = "Bcm")]
    Bcm,
    /// Terawatt hours
    #[serde(rename = "TWh")]
    TWh,
    /// Billion barrels per year
    #[serde(rename = "Gbl_per_yr")]
    GblPerYr,
    /// Terajoules
    #[serde(rename = "TJ")]
    Tj,
    /// Million British thermal units
    #[serde(rename = "Mmbtu")]
    Mmbtu,
    /// Exajoules
    #[serde(rename = "EJ")]
    Ej,
    /// Tonnes of oil equivalent
    #[serde(rename = "toe")]
    Toe,
    /// Kilowatt hours
    #[serde(rename = "KWh")]
    KWh,
}

impl EnergyUnit {
    /// Every energy unit, in wire order
    pub const ALL: [EnergyUnit; 13] = [
        EnergyUnit::Mtoe,
        EnergyUnit::Mbtu,
        EnergyUnit::MbPerD,
        EnergyUnit::Mtce,
        EnergyUnit::TcfGas,
        EnergyUnit::Bcm,
        EnergyUnit::TWh,
        EnergyUnit::GblPerYr,
        EnergyUnit::Tj,
        EnergyUnit::Mmbtu,
        EnergyUnit::Ej,
        EnergyUnit::Toe,
        EnergyUnit::KWh,
    ];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            EnergyUnit::Mtoe => "Mtoe",
            EnergyUnit::Mbtu => "Mbtu",
            EnergyUnit::MbPerD => "Mb_per_d",
            EnergyUnit::Mtce => "Mtce",
            EnergyUnit::TcfGas => "Tcf_gas",
            EnergyUnit::Bcm => "Bcm",
            EnergyUnit::TWh => "TWh",
            EnergyUnit::GblPerYr => "Gbl_per_yr",
            EnergyUnit::Tj => "TJ",
            EnergyUnit::Mmbtu => "Mmbtu",
            EnergyUnit::Ej => "EJ",
            EnergyUnit::Toe => "toe",
            EnergyUnit::KWh => "KWh",
        }
    }

    /// Amount of this unit in one Mtoe
    fn per_mtoe(self) -> f64 {
        match self {
            EnergyUnit::Mtoe => 1.0,
            EnergyUnit::Mbtu => 39.683_207e9,
            EnergyUnit::MbPerD => 7.33 / 365.0,
            EnergyUnit::Mtce => 1.0 / 0.7,
            EnergyUnit::TcfGas => (1.0 / 0.9) * 0.035_314_7,
            EnergyUnit::Bcm => 1.0 / 0.9,
            EnergyUnit::TWh => 11.63,
            EnergyUnit::GblPerYr => 7.33e-3,
            EnergyUnit::Tj => 41_868.0,
            EnergyUnit::Mmbtu => 39.683_207e6,
            EnergyUnit::Ej => 0.041_868,
            EnergyUnit::Toe => 1e6,
            EnergyUnit::KWh => 11.63e9,
        }
    }
}

/// All the CO2 units available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Co2Unit {
    /// Gigatonnes of CO2
    #[serde(rename = "GtCO2")]
    GtCo2,
    /// Megatonnes of CO2 (reference)
    #[serde(rename = "MtCO2")]
    MtCo2,
    /// Kilotonnes of CO2
    #[serde(rename = "KtCO2")]
    KtCo2,
    /// Gigatonnes of carbon
    #[serde(rename = "GtC")]
    GtC,
    /// Megatonnes of carbon
    #[serde(rename = "MtC")]
    MtC,
    /// Kilotonnes of carbon
    #[serde(rename = "KtC")]
    KtC,
    /// Tonnes of CO2
    #[serde(rename = "tCO2")]
    TCo2,
    /// Kilograms of CO2
    #[serde(rename = "KCO2")]
    Kco2,
}

/// Carbon mass in a mass of CO2 (12/44)
const CARBON_PER_CO2: f64 = 12.0 / 44.0;

impl Co2Unit {
    /// Every CO2 unit, in wire order
    pub const ALL: [Co2Unit; 8] = [
        Co2Unit::GtCo2,
        Co2Unit::MtCo2,
        Co2Unit::KtCo2,
        Co2Unit::GtC,
        Co2Unit::MtC,
        Co2Unit::KtC,
        Co2Unit::TCo2,
        Co2Unit::Kco2,
    ];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Co2Unit::GtCo2 => "GtCO2",
            Co2Unit::MtCo2 => "MtCO2",
            Co2Unit::KtCo2 => "KtCO2",
            Co2Unit::GtC => "GtC",
            Co2Unit::MtC => "MtC",
            Co2Unit::KtC => "KtC",
            Co2Unit::TCo2 => "tCO2",
            Co2Unit::Kco2 => "KCO2",
        }
    }

    fn per_mtco2(self) -> f64 {
        match self {
            Co2Unit::GtCo2 => 1e-3,
            Co2Unit::MtCo2 => 1.0,
            Co2Unit::KtCo2 => 1e3,
            Co2Unit::GtC => CARBON_PER_CO2 * 1e-3,
            Co2Unit::MtC => CARBON_PER_CO2,
            Co2Unit::KtC => CARBON_PER_CO2 * 1e3,
            Co2Unit::TCo2 => 1e6,
            Co2Unit::Kco2 => 1e9,
        }
    }
}

/// All the CO2 equivalent units available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Co2eqUnit {
    /// Gigatonnes of CO2 equivalent
    #[serde(rename = "GtCO2eq")]
    GtCo2eq,
    /// Megatonnes of CO2 equivalent (reference)
    #[serde(rename = "MtCO2eq")]
    MtCo2eq,
    /// Kilotonnes of CO2 equivalent
    #[serde(rename = "KtCO2eq")]
    KtCo2eq,
    /// Gigatonnes of carbon equivalent
    #[serde(rename = "GtCeq")]
    GtCeq,
    /// Megatonnes of carbon equivalent
    #[serde(rename = "MtCeq")]
    MtCeq,
    /// Kilotonnes of carbon equivalent
    #[serde(rename = "KtCeq")]
    KtCeq,
    /// Tonnes of CO2 equivalent
    #[serde(rename = "tCO2eq")]
    TCo2eq,
}

impl Co2eqUnit {
    /// Every CO2-eq unit, in wire order
    pub const ALL: [Co2eqUnit; 7] = [
        Co2eqUnit::GtCo2eq,
        Co2eqUnit::MtCo2eq,
        Co2eqUnit::KtCo2eq,
        Co2eqUnit::GtCeq,
        Co2eqUnit::MtCeq,
        Co2eqUnit::KtCeq,
        Co2eqUnit::TCo2eq,
    ];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Co2eqUnit::GtCo2eq => "GtCO2eq",
            Co2eqUnit::MtCo2eq => "MtCO2eq",
            Co2eqUnit::KtCo2eq => "KtCO2eq",
            Co2eqUnit::GtCeq => "GtCeq",
            Co2eqUnit::MtCeq => "MtCeq",
            Co2eqUnit::KtCeq => "KtCeq",
            Co2eqUnit::TCo2eq => "tCO2eq",
        }
    }

    fn per_mtco2eq(self) -> f64 {
        match self {
            Co2eqUnit::GtCo2eq => 1e-3,
            Co2eqUnit::MtCo2eq => 1.0,
            Co2eqUnit::KtCo2eq => 1e3,
            Co2eqUnit::GtCeq => CARBON_PER_CO2 * 1e-3,
            Co2eqUnit::MtCeq => CARBON_PER_CO2,
            Co2eqUnit::KtCeq => CARBON_PER_CO2 * 1e3,
            Co2eqUnit::TCo2eq => 1e6,
        }
    }
}

// ============================================================================
// Unit (any family)
// ============================================================================

/// A unit of any family
///
/// Serialized as its bare wire name; wire names are unique across families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Unit {
    /// Energy unit
    Energy(EnergyUnit),
    /// CO2 unit
    Co2(Co2Unit),
    /// CO2-equivalent unit
    Co2eq(Co2eqUnit),
}

impl Unit {
    /// Family this unit belongs to
    pub fn family(self) -> UnitFamily {
        match self {
            Unit::Energy(_) => UnitFamily::Energy,
            Unit::Co2(_) => UnitFamily::Co2,
            Unit::Co2eq(_) => UnitFamily::Co2eq,
        }
    }

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Energy(u) => u.as_str(),
            Unit::Co2(u) => u.as_str(),
            Unit::Co2eq(u) => u.as_str(),
        }
    }

    fn per_reference(self) -> f64 {
        match self {
            Unit::Energy(u) => u.per_mtoe(),
            Unit::Co2(u) => u.per_mtco2(),
            Unit::Co2eq(u) => u.per_mtco2eq(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [UnitFamily::Energy, UnitFamily::Co2, UnitFamily::Co2eq]
            .into_iter()
            .flat_map(UnitFamily::units)
            .find(|u| u.as_str() == s)
            .ok_or_else(|| ConversionError::UnknownUnit(s.to_string()))
    }
}

// ============================================================================
// Conversion matrix
// ============================================================================

/// Square matrix of factors for one family, indexed by position in `units`
struct ConversionMatrix {
    units: Vec<Unit>,
    factors: Vec<Vec<f64>>,
}

impl ConversionMatrix {
    fn build(family: UnitFamily) -> Self {
        let units = family.units();
        let factors = units
            .iter()
            .map(|from| {
                units
                    .iter()
                    .map(|to| {
                        if from == to {
                            1.0
                        } else {
                            to.per_reference() / from.per_reference()
                        }
                    })
                    .collect()
            })
            .collect();
        Self { units, factors }
    }

    fn index_of(&self, unit: Unit) -> Option<usize> {
        self.units.iter().position(|u| *u == unit)
    }
}

lazy_static! {
    static ref ENERGY_MATRIX: ConversionMatrix = ConversionMatrix::build(UnitFamily::Energy);
    static ref CO2_MATRIX: ConversionMatrix = ConversionMatrix::build(UnitFamily::Co2);
    static ref CO2EQ_MATRIX: ConversionMatrix = ConversionMatrix::build(UnitFamily::Co2eq);
}

/// Multiplicative factor turning a value in `source` into a value in `target`
///
/// Fails if either unit is outside `family`.
pub fn factor(source: Unit, target: Unit, family: UnitFamily) -> Result<f64, ConversionError> {
    let matrix = family.matrix();
    let mismatch = |unit: Unit| ConversionError::FamilyMismatch {
        unit: unit.as_str().to_string(),
        family: family.to_string(),
    };
    let from = matrix.index_of(source).ok_or_else(|| mismatch(source))?;
    let to = matrix.index_of(target).ok_or_else(|| mismatch(target))?;
    Ok(matrix.factors[from][to])
}

/// Convert `value` from `source` to `target` within `family`
pub fn convert(
    value: f64,
    source: Unit,
    target: Unit,
    family: UnitFamily,
) -> Result<f64, ConversionError> {
    Ok(value * factor(source, target, family)?)
}

/// Same as [`convert`] but with wire names, for callers holding raw strings
pub fn convert_named(
    value: f64,
    source: &str,
    target: &str,
    family: UnitFamily,
) -> Result<f64, ConversionError> {
    convert(value, source.parse()?, target.parse()?, family)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= 1e-9 * scale
    }

    #[test]
    fn test_identity_is_exact() {
        for family in [UnitFamily::Energy, UnitFamily::Co2, UnitFamily::Co2eq] {
            for unit in family.units() {
                assert_eq!(factor(unit, unit, family).unwrap(), 1.0);
                assert_eq!(convert(123.456, unit, unit, family).unwrap(), 123.456);
            }
        }
    }

    #[test]
    fn test_mtoe_to_mtce() {
        let f = factor(
            Unit::Energy(EnergyUnit::Mtoe),
            Unit::Energy(EnergyUnit::Mtce),
            UnitFamily::Energy,
        )
        .unwrap();
        assert!((f - 1.428_571_43).abs() < 1e-8);

        let back = convert(
            100.0,
            Unit::Energy(EnergyUnit::Mtce),
            Unit::Energy(EnergyUnit::Mtoe),
            UnitFamily::Energy,
        )
        .unwrap();
        assert!(approx(back, 70.0));
    }

    #[test]
    fn test_round_trip_all_pairs() {
        for family in [UnitFamily::Energy, UnitFamily::Co2, UnitFamily::Co2eq] {
            let units = family.units();
            for &a in &units {
                for &b in &units {
                    let x = 42.5;
                    let there = convert(x, a, b, family).unwrap();
                    let back = convert(there, b, a, family).unwrap();
                    assert!(approx(back, x), "{} -> {} -> {}: {}", a, b, a, back);
                }
            }
        }
    }

    #[test]
    fn test_family_mismatch_fails() {
        let err = convert(
            1.0,
            Unit::Energy(EnergyUnit::Mtoe),
            Unit::Co2(Co2Unit::MtCo2),
            UnitFamily::Energy,
        )
        .unwrap_err();
        assert!(matches!(err, ConversionError::FamilyMismatch { .. }));
    }

    #[test]
    fn test_unknown_unit_fails() {
        let err = convert_named(1.0, "Mtoe", "furlongs", UnitFamily::Energy).unwrap_err();
        assert_eq!(err, ConversionError::UnknownUnit("furlongs".to_string()));
    }

    #[test]
    fn test_wire_names_round_trip() {
        for family in [UnitFamily::Energy, UnitFamily::Co2, UnitFamily::Co2eq] {
            for unit in family.units() {
                let json = serde_json::to_string(&unit).unwrap();
                assert_eq!(json, format!("\"{}\"", unit.as_str()));
                let parsed: Unit = serde_json::from_str(&json).unwrap();
                assert_eq!(parsed, unit);
                assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
            }
        }
    }

    #[test]
    fn test_carbon_units() {
        let mtc = convert(
            44.0,
            Unit::Co2(Co2Unit::MtCo2),
            Unit::Co2(Co2Unit::MtC),
            UnitFamily::Co2,
        )
        .unwrap();
        assert!(approx(mtc, 12.0));
    }
}
