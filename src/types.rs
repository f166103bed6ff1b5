//! Core value objects
//!
//! Everything a request carries in (`DimensionQuery`) and everything it
//! carries out (`DimensionResult` and its parts). All of these are plain
//! immutable values owned by the request that built them; only the query
//! cache keeps copies across requests.

use crate::error::{Error, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Grouping
// ============================================================================

/// Kind of entity a fact row is grouped under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// A single country
    Country,
    /// A named set of countries (e.g. "European Union")
    Group,
    /// A geographic zone (e.g. "Africa")
    Zone,
}

impl GroupType {
    /// Value stored in the `group_type` column
    pub fn as_str(self) -> &'static str {
        match self {
            GroupType::Country => "country",
            GroupType::Group => "group",
            GroupType::Zone => "zone",
        }
    }

    /// Plural used in user-facing labels
    pub fn plural(self) -> &'static str {
        match self {
            GroupType::Country => "countries",
            GroupType::Group => "groups",
            GroupType::Zone => "zones",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Dimension kinds
// ============================================================================

/// Named aggregation a topic can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionKind {
    /// Totals per group over time
    #[serde(rename = "total")]
    Total,
    /// Values per inhabitant
    #[serde(rename = "perCapita")]
    PerCapita,
    /// Values per unit of GDP
    #[serde(rename = "perGDP")]
    PerGdp,
    /// Breakdown by energy family for one group
    #[serde(rename = "byEnergyFamily")]
    ByEnergyFamily,
    /// Breakdown by sector
    #[serde(rename = "bySector")]
    BySector,
    /// Breakdown by gas for one group
    #[serde(rename = "byGas")]
    ByGas,
    /// Breakdown by destination continent
    #[serde(rename = "byContinent")]
    ByContinent,
    /// Breakdown by destination country
    #[serde(rename = "byCountry")]
    ByCountry,
    /// Proven fossil reserves
    #[serde(rename = "provenReserve")]
    ProvenReserve,
    /// Share of electricity generation
    #[serde(rename = "shareOfElectricityGeneration")]
    ShareOfElectricityGeneration,
    /// Renewable share of primary energy
    #[serde(rename = "shareOfPrimaryEnergy")]
    ShareOfPrimaryEnergy,
    /// Imports, exports and net imports per group of one fossil source
    #[serde(rename = "importExport")]
    ImportExport,
}

impl DimensionKind {
    /// Every kind, in wire order
    pub const ALL: [DimensionKind; 12] = [
        DimensionKind::Total,
        DimensionKind::PerCapita,
        DimensionKind::PerGdp,
        DimensionKind::ByEnergyFamily,
        DimensionKind::BySector,
        DimensionKind::ByGas,
        DimensionKind::ByContinent,
        DimensionKind::ByCountry,
        DimensionKind::ProvenReserve,
        DimensionKind::ShareOfElectricityGeneration,
        DimensionKind::ShareOfPrimaryEnergy,
        DimensionKind::ImportExport,
    ];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKind::Total => "total",
            DimensionKind::PerCapita => "perCapita",
            DimensionKind::PerGdp => "perGDP",
            DimensionKind::ByEnergyFamily => "byEnergyFamily",
            DimensionKind::BySector => "bySector",
            DimensionKind::ByGas => "byGas",
            DimensionKind::ByContinent => "byContinent",
            DimensionKind::ByCountry => "byCountry",
            DimensionKind::ProvenReserve => "provenReserve",
            DimensionKind::ShareOfElectricityGeneration => "shareOfElectricityGeneration",
            DimensionKind::ShareOfPrimaryEnergy => "shareOfPrimaryEnergy",
            DimensionKind::ImportExport => "importExport",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DimensionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::invalid(format!("unknown dimension kind '{}'", s)))
    }
}

// ============================================================================
// Axis mode
// ============================================================================

/// How the period axis of a time layout is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    /// Distinct periods present in the filtered rows
    #[default]
    Observed,
    /// Every year of `[year_start, year_end]`, gaps null-filled
    FullRange,
}

// ============================================================================
// Request
// ============================================================================

/// Parameters of one dimension request
///
/// `extra_filters` maps a column name to the single value it must equal
/// (e.g. `type = "Consumption"`, `gdp_unit = "GDP (constant 2010 US$)"`).
/// A `BTreeMap` keeps the ordering stable so the query fingerprints the
/// same way regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionQuery {
    /// Topic slug the dimension belongs to (e.g. `primaryEnergies`)
    pub topic: String,
    /// Dimension kind wire name (e.g. `byEnergyFamily`)
    pub dimension_name: String,
    /// Groups to chart
    #[serde(default)]
    pub group_names: Vec<String>,
    /// First year, inclusive
    #[serde(default)]
    pub year_start: Option<i32>,
    /// Last year, inclusive
    #[serde(default)]
    pub year_end: Option<i32>,
    /// Unit wire name the values should be expressed in
    #[serde(default)]
    pub target_unit: Option<String>,
    /// Categories to keep (energy families, sectors, gases, types, scopes)
    #[serde(default)]
    pub category_filter: Vec<String>,
    /// Column equality filters
    #[serde(default)]
    pub extra_filters: BTreeMap<String, String>,
    /// Overrides the configured axis mode
    #[serde(default)]
    pub axis_mode: Option<AxisMode>,
    /// Overrides the number of targets kept before "Others"
    #[serde(default)]
    pub top_n: Option<usize>,
}

impl DimensionQuery {
    /// Start a query for `dimension_name` of `topic`
    pub fn new(topic: impl Into<String>, dimension_name: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            dimension_name: dimension_name.into(),
            group_names: Vec::new(),
            year_start: None,
            year_end: None,
            target_unit: None,
            category_filter: Vec::new(),
            extra_filters: BTreeMap::new(),
            axis_mode: None,
            top_n: None,
        }
    }

    /// Set the groups
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_names = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Set the inclusive year range
    pub fn with_years(mut self, start: i32, end: i32) -> Self {
        self.year_start = Some(start);
        self.year_end = Some(end);
        self
    }

    /// Set the target unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.target_unit = Some(unit.into());
        self
    }

    /// Set the category filter
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_filter = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Add a column equality filter
    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_filters.insert(column.into(), value.into());
        self
    }

    /// Override the axis mode
    pub fn with_axis_mode(mut self, mode: AxisMode) -> Self {
        self.axis_mode = Some(mode);
        self
    }

    /// Override the number of targets kept
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Checks that do not depend on the dimension being asked for
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.is_empty() {
            return Err(ValidationError::MissingField("topic".to_string()));
        }
        if self.dimension_name.is_empty() {
            return Err(ValidationError::MissingField("dimensionName".to_string()));
        }
        if let (Some(start), Some(end)) = (self.year_start, self.year_end) {
            if start > end {
                return Err(ValidationError::InvertedRange { start, end });
            }
        }
        if self.top_n == Some(0) {
            return Err(ValidationError::OutOfRange {
                field: "topN".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: usize::MAX.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Response
// ============================================================================

/// Line style of a chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DashStyle {
    Dash,
    DashDot,
    Dot,
    LongDash,
    LongDashDot,
    LongDashDotDot,
    ShortDash,
    ShortDashDot,
    ShortDashDotDot,
    ShortDot,
    Solid,
}

/// A labelled color
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameColor {
    /// Label
    pub name: String,
    /// Hex color (`#rrggbb` or `#rgb`)
    pub color: String,
}

/// One line of a chart
///
/// `data` is aligned with the result's `categories`: same length, missing
/// points are `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    /// Display name
    pub name: String,
    /// Hex color
    pub color: String,
    /// Line style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_style: Option<DashStyle>,
    /// Chart type hint (e.g. `column`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
    /// Values, one per category
    pub data: Vec<Option<f64>>,
}

/// Named preset of groups offered as a quick selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiSelect {
    /// Label
    pub name: String,
    /// Members
    pub data: Vec<NameColor>,
}

/// Chart-ready answer to a `DimensionQuery`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionResult {
    /// X axis labels
    pub categories: Vec<String>,
    /// One entry per line
    pub series: Vec<Series>,
    /// Quick-select suggestions, when the dimension ranks its groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_selects: Option<Vec<MultiSelect>>,
}

impl DimensionResult {
    /// True when every series has exactly one point per category
    pub fn is_aligned(&self) -> bool {
        self.series
            .iter()
            .all(|s| s.data.len() == self.categories.len())
    }
}
