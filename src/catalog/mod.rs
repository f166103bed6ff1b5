//! Topic catalog
//!
//! Everything the resolver needs to know about a fact table is data: which
//! columns hold the group, the period, the measure and the breakdown, which
//! unit the measure is stored in, and how a dimension lays its series out.
//! Adding a table or a topic means adding a [`Topic`] value, not code.
//!
//! ```text
//! Catalog
//!   └─ Topic ("primaryEnergies", md slug "primary-energy")
//!        ├─ DimensionSpec (total)          ─► FactTableDescriptor + SeriesLayout
//!        ├─ DimensionSpec (byEnergyFamily) ─► ...
//!        ├─ CategoryList  (energyFamilies)
//!        └─ DistinctList  (types)
//! ```

mod builtin;

use crate::color::ColorStrategy;
use crate::error::{Error, Result};
use crate::storage::{FilterValue, Predicate};
use crate::types::{DashStyle, DimensionKind};
use crate::units::{Unit, UnitFamily};
use std::collections::BTreeMap;

/// Table of preset country groups offered as multi-selects
pub const MULTISELECT_TABLE: &str = "COUNTRY_multiselect_groups_prod";

// ============================================================================
// Fact tables
// ============================================================================

/// Column layout of one fact table
#[derive(Debug, Clone, PartialEq)]
pub struct FactTableDescriptor {
    /// Table name
    pub table: String,
    /// Column naming the group (country, region, zone)
    pub group_column: String,
    /// Column holding `country` / `group` / `zone`, if the table has one
    pub group_type_column: Option<String>,
    /// Year column; `None` for tables without a time axis
    pub period_column: Option<String>,
    /// Measure summed by every query
    pub value_column: String,
    /// Breakdown column (energy family, sector, gas, type, scope)
    pub category_column: Option<String>,
    /// Destination column for trade breakdowns (`country_to`, `continent_to`)
    pub target_column: Option<String>,
    /// Unit the measure is stored in; `None` for unitless measures
    pub stored_unit: Option<Unit>,
    /// Constant applied to every value on top of the unit conversion
    pub scale: f64,
}

impl FactTableDescriptor {
    /// Descriptor with the usual `group_name` / `group_type` / `year` columns
    pub fn new(table: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            group_column: "group_name".to_string(),
            group_type_column: Some("group_type".to_string()),
            period_column: Some("year".to_string()),
            value_column: value_column.into(),
            category_column: None,
            target_column: None,
            stored_unit: None,
            scale: 1.0,
        }
    }

    /// Use another column for the group
    pub fn with_group_column(mut self, column: impl Into<String>) -> Self {
        self.group_column = column.into();
        self
    }

    /// The table has no group type column
    pub fn without_group_type(mut self) -> Self {
        self.group_type_column = None;
        self
    }

    /// The table has no time axis
    pub fn without_period(mut self) -> Self {
        self.period_column = None;
        self
    }

    /// Set the breakdown column
    pub fn with_category(mut self, column: impl Into<String>) -> Self {
        self.category_column = Some(column.into());
        self
    }

    /// Set the trade destination column
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the stored unit
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.stored_unit = Some(unit);
        self
    }

    /// Set the constant scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Family of the stored unit
    pub fn unit_family(&self) -> Option<UnitFamily> {
        self.stored_unit.map(Unit::family)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// A caller-supplied equality filter a dimension requires
///
/// `name` is the key looked up in `DimensionQuery::extra_filters`; the
/// predicate is applied to `column`. Some tables encode the parameter
/// differently, so a value can be translated first: `mapping` pairs are
/// checked in order and `fallback`, when set, replaces any other value.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParam {
    /// Key in the request's extra filters
    pub name: String,
    /// Column the predicate reads
    pub column: String,
    /// Value translations
    pub mapping: Vec<(String, String)>,
    /// Translation of values absent from `mapping`
    pub fallback: Option<String>,
}

impl FilterParam {
    /// Parameter applied to the column of the same name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            mapping: Vec::new(),
            fallback: None,
        }
    }

    /// Parameter applied to another column
    pub fn on_column(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::new(name)
        }
    }

    /// Parameter whose value is translated before filtering
    pub fn mapped<I, K, V>(
        name: impl Into<String>,
        column: impl Into<String>,
        mapping: I,
        fallback: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fallback: Some(fallback.into()),
            ..Self::on_column(name, column)
        }
    }

    /// Value actually compared against the column
    pub fn translate(&self, value: &str) -> String {
        self.mapping
            .iter()
            .find(|(from, _)| from == value)
            .map(|(_, to)| to.clone())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| value.to_string())
    }

    /// Predicate for `value`
    pub fn predicate(&self, value: &str) -> Predicate {
        Predicate::eq(self.column.clone(), self.translate(value))
    }
}

// ============================================================================
// Dimensions
// ============================================================================

/// How rows become series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesLayout {
    /// Year axis, one series per requested group
    GroupsOverTime,
    /// Year axis, one series per requested category of a single group
    CategoriesOverTime,
    /// Year axis, one series per (category, group) named `"{group} - {category}"`
    GroupCategoriesOverTime,
    /// Requested groups as the axis, one series per category
    CategoriesByGroup,
    /// Requested categories as the axis, one series per destination of a
    /// single group; with `others`, only the largest destinations per
    /// category are kept and the remainder is summed into `"Others"`
    TargetsByCategory {
        /// Keep the top destinations and add an `"Others"` series
        others: bool,
    },
}

impl SeriesLayout {
    /// The layout is charted against years
    pub fn is_time_based(self) -> bool {
        matches!(
            self,
            SeriesLayout::GroupsOverTime
                | SeriesLayout::CategoriesOverTime
                | SeriesLayout::GroupCategoriesOverTime
        )
    }

    /// Exactly one group must be requested
    pub fn single_group(self) -> bool {
        matches!(
            self,
            SeriesLayout::CategoriesOverTime | SeriesLayout::TargetsByCategory { .. }
        )
    }

    /// At least one category must be requested
    pub fn needs_categories(self) -> bool {
        !matches!(self, SeriesLayout::GroupsOverTime)
    }
}

/// One dimension of a topic
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSpec {
    /// Dimension kind served
    pub kind: DimensionKind,
    /// Fact table read
    pub table: FactTableDescriptor,
    /// Series layout
    pub layout: SeriesLayout,
    /// Filters the caller must supply
    pub params: Vec<FilterParam>,
    /// Filters always applied
    pub fixed_filters: Vec<Predicate>,
    /// Category values never charted
    pub excluded_categories: Vec<String>,
    /// Compute quick-select suggestions
    pub ranked: bool,
    /// Coloring of series keys that are not groups
    pub series_colors: ColorStrategy,
    /// Dash style per category value
    pub dash_styles: Vec<(String, DashStyle)>,
    /// Dash style of categories absent from `dash_styles`
    pub default_dash: Option<DashStyle>,
    /// Request filter `(name, value)` selecting this spec among the specs
    /// of the same kind; the filter is consumed, never applied to a column
    pub variant: Option<(String, String)>,
}

impl DimensionSpec {
    /// Unranked dimension with curated series colors
    pub fn new(kind: DimensionKind, table: FactTableDescriptor, layout: SeriesLayout) -> Self {
        Self {
            kind,
            table,
            layout,
            params: Vec::new(),
            fixed_filters: Vec::new(),
            excluded_categories: Vec::new(),
            ranked: false,
            series_colors: ColorStrategy::Curated,
            dash_styles: Vec::new(),
            default_dash: None,
            variant: None,
        }
    }

    /// One series per group over time
    pub fn groups(kind: DimensionKind, table: FactTableDescriptor) -> Self {
        Self::new(kind, table, SeriesLayout::GroupsOverTime)
    }

    /// One series per category of a single group over time
    pub fn categories(kind: DimensionKind, table: FactTableDescriptor) -> Self {
        Self::new(kind, table, SeriesLayout::CategoriesOverTime)
    }

    /// Require a caller filter
    pub fn with_param(mut self, param: FilterParam) -> Self {
        self.params.push(param);
        self
    }

    /// Always filter `column = value`
    pub fn with_fixed(mut self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.fixed_filters.push(Predicate::eq(column, value));
        self
    }

    /// Always apply `predicate`
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.fixed_filters.push(predicate);
        self
    }

    /// Never chart these categories
    pub fn excluding<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_categories
            .extend(categories.into_iter().map(Into::into));
        self
    }

    /// Compute quick-select suggestions
    pub fn ranked(mut self) -> Self {
        self.ranked = true;
        self
    }

    /// Color series keys with `strategy`
    pub fn colored(mut self, strategy: ColorStrategy) -> Self {
        self.series_colors = strategy;
        self
    }

    /// Dash styles per category
    pub fn dashed<I, S>(mut self, styles: I, default: DashStyle) -> Self
    where
        I: IntoIterator<Item = (S, DashStyle)>,
        S: Into<String>,
    {
        self.dash_styles = styles.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.default_dash = Some(default);
        self
    }

    /// Serve this spec when the request filter `name` equals `value`
    pub fn selected_by(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variant = Some((name.into(), value.into()));
        self
    }

    /// `name` is the key of this spec's variant filter
    pub fn is_selector(&self, name: &str) -> bool {
        self.variant.as_ref().is_some_and(|(key, _)| key == name)
    }

    /// The dimension needs a GDP unit filter
    pub fn requires_gdp(&self) -> bool {
        self.params.iter().any(|p| p.column == "gdp_unit")
    }

    /// Dash style of a category
    pub fn dash_for(&self, category: &str) -> Option<DashStyle> {
        self.dash_styles
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, style)| *style)
            .or(self.default_dash)
    }

    /// Parameter declared under `name`
    pub fn param(&self, name: &str) -> Option<&FilterParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// Option lists
// ============================================================================

/// Categories ordered by their total value, largest first
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryList {
    /// Option name (`energyFamilies`, `sectors`, `gases`)
    pub name: String,
    /// Table read
    pub table: String,
    /// Category column
    pub column: String,
    /// Measure summed for the ordering
    pub value_column: String,
    /// Filters the caller must supply
    pub params: Vec<FilterParam>,
    /// Filters always applied
    pub fixed_filters: Vec<Predicate>,
    /// Values left out
    pub excluded: Vec<String>,
    /// Coloring of the entries
    pub colors: ColorStrategy,
}

impl CategoryList {
    /// Curated-color list of `column` ordered by `SUM(value_column)`
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            column: column.into(),
            value_column: value_column.into(),
            params: Vec::new(),
            fixed_filters: Vec::new(),
            excluded: Vec::new(),
            colors: ColorStrategy::Curated,
        }
    }

    /// Require a caller filter
    pub fn with_param(mut self, param: FilterParam) -> Self {
        self.params.push(param);
        self
    }

    /// Always apply `predicate`
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.fixed_filters.push(predicate);
        self
    }

    /// Leave `values` out
    pub fn excluding<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(values.into_iter().map(Into::into));
        self
    }
}

/// Distinct non-null values of a column, ascending
#[derive(Debug, Clone, PartialEq)]
pub struct DistinctList {
    /// Option name (`types`, `sources`, `gdpUnits`, `scopes`)
    pub name: String,
    /// Table read
    pub table: String,
    /// Column listed
    pub column: String,
}

impl DistinctList {
    /// List the values of `column` in `table`
    pub fn new(name: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

// ============================================================================
// Topics
// ============================================================================

/// A page of the portal and everything it can chart
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// Wire name (`primaryEnergies`)
    pub slug: String,
    /// Key of the topic's markdown blurb (`primary-energy`)
    pub md_slug: String,
    /// Table listing the topic's groups
    pub group_table: FactTableDescriptor,
    /// Dimensions served
    pub dimensions: Vec<DimensionSpec>,
    /// Ordered category options
    pub category_lists: Vec<CategoryList>,
    /// Distinct value options
    pub distinct_lists: Vec<DistinctList>,
}

impl Topic {
    /// Empty topic whose groups are listed from `group_table`
    pub fn new(
        slug: impl Into<String>,
        md_slug: impl Into<String>,
        group_table: FactTableDescriptor,
    ) -> Self {
        Self {
            slug: slug.into(),
            md_slug: md_slug.into(),
            group_table,
            dimensions: Vec::new(),
            category_lists: Vec::new(),
            distinct_lists: Vec::new(),
        }
    }

    /// Add a dimension
    pub fn with_dimension(mut self, spec: DimensionSpec) -> Self {
        self.dimensions.push(spec);
        self
    }

    /// Add an ordered category option
    pub fn with_category_list(mut self, list: CategoryList) -> Self {
        self.category_lists.push(list);
        self
    }

    /// Add a distinct value option
    pub fn with_distinct_list(mut self, list: DistinctList) -> Self {
        self.distinct_lists.push(list);
        self
    }

    /// First declared dimension of kind `kind`
    pub fn dimension(&self, kind: DimensionKind) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.kind == kind)
    }

    /// Dimension of kind `kind` for a request carrying `filters`
    ///
    /// A spec whose variant filter matches wins, then a spec without a
    /// variant. Kinds served only through variants require the filter.
    pub fn select(
        &self,
        kind: DimensionKind,
        filters: &BTreeMap<String, String>,
    ) -> Result<&DimensionSpec> {
        let specs: Vec<&DimensionSpec> = self.dimensions.iter().filter(|d| d.kind == kind).collect();
        if specs.is_empty() {
            return Err(Error::invalid(format!(
                "topic '{}' has no dimension '{}'",
                self.slug, kind
            )));
        }

        let matching = specs.iter().find(|d| {
            d.variant
                .as_ref()
                .is_some_and(|(name, value)| filters.get(name) == Some(value))
        });
        if let Some(spec) = matching.or_else(|| specs.iter().find(|d| d.variant.is_none())) {
            return Ok(*spec);
        }

        let (name, _) = specs[0].variant.clone().unwrap_or_default();
        let values: Vec<&str> = specs
            .iter()
            .filter_map(|d| d.variant.as_ref().map(|(_, v)| v.as_str()))
            .collect();
        Err(Error::invalid(format!(
            "{}/{} requires filter '{}' in [{}]",
            self.slug,
            kind,
            name,
            values.join(", ")
        )))
    }

    /// Kinds served, in declaration order
    pub fn kinds(&self) -> Vec<DimensionKind> {
        let mut kinds = Vec::new();
        for spec in &self.dimensions {
            if !kinds.contains(&spec.kind) {
                kinds.push(spec.kind);
            }
        }
        kinds
    }

    /// Unit family the topic's selector offers
    ///
    /// The family of the first dimension with a stored unit.
    pub fn unit_family(&self) -> Option<UnitFamily> {
        self.dimensions
            .iter()
            .find_map(|d| d.table.unit_family())
    }

    /// Ordered category option named `name`
    pub fn category_list(&self, name: &str) -> Option<&CategoryList> {
        self.category_lists.iter().find(|l| l.name == name)
    }

    /// Distinct value option named `name`
    pub fn distinct_list(&self, name: &str) -> Option<&DistinctList> {
        self.distinct_lists.iter().find(|l| l.name == name)
    }
}

/// The set of topics the engine serves
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    topics: Vec<Topic>,
    multiselect_table: String,
}

impl Catalog {
    /// Catalog over `topics`
    pub fn new(topics: Vec<Topic>) -> Self {
        Self {
            topics,
            multiselect_table: MULTISELECT_TABLE.to_string(),
        }
    }

    /// The portal's topics
    pub fn builtin() -> Self {
        Self::new(builtin::topics())
    }

    /// Read multi-select presets from another table
    pub fn with_multiselect_table(mut self, table: impl Into<String>) -> Self {
        self.multiselect_table = table.into();
        self
    }

    /// Add or replace a topic
    pub fn register(&mut self, topic: Topic) {
        match self.topics.iter_mut().find(|t| t.slug == topic.slug) {
            Some(existing) => *existing = topic,
            None => self.topics.push(topic),
        }
    }

    /// All topics
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Table of multi-select presets
    pub fn multiselect_table(&self) -> &str {
        &self.multiselect_table
    }

    /// Topic named `slug`
    pub fn topic(&self, slug: &str) -> Result<&Topic> {
        self.topics
            .iter()
            .find(|t| t.slug == slug)
            .ok_or_else(|| Error::invalid(format!("unknown topic '{}'", slug)))
    }

    /// Dimension `kind` of topic `slug`, first declared variant
    pub fn dimension(&self, slug: &str, kind: DimensionKind) -> Result<&DimensionSpec> {
        self.topic(slug)?.dimension(kind).ok_or_else(|| {
            Error::invalid(format!("topic '{}' has no dimension '{}'", slug, kind))
        })
    }

    /// Dimension `kind` of topic `slug` for a request carrying `filters`
    pub fn select(
        &self,
        slug: &str,
        kind: DimensionKind,
        filters: &BTreeMap<String, String>,
    ) -> Result<&DimensionSpec> {
        self.topic(slug)?.select(kind, filters)
    }
}
