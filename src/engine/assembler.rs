//! Series Assembler
//!
//! Aligns raw aggregate rows onto a shared category axis. Every series gets
//! exactly one point per axis entry; a position with no row is `None`, never
//! omitted. Rows are indexed once per series key, so assembly is linear in
//! the number of rows plus the size of the output.
//!
//! ```text
//! rows ──► RowIndex { series key ─► { axis label ─► value } }
//!                 │
//! axis ───────────┴──► Series { data: [v | null; axis.len()] }
//! ```

use crate::catalog::{DimensionSpec, SeriesLayout};
use crate::color::{color_for, hashed_color};
use crate::storage::{Row, Value};
use crate::types::Series;
use std::collections::HashMap;

/// Name of the remainder series of trade breakdowns
pub const OTHERS: &str = "Others";

// ============================================================================
// Axis
// ============================================================================

/// Label of a cell used as an axis position
///
/// Integral numbers render without a fractional part so that a year stored
/// as `2015.0` lands on the `"2015"` axis entry.
pub fn cell_label(value: &Value) -> Option<String> {
    value
        .as_i64()
        .map(|i| i.to_string())
        .or_else(|| value.as_str().map(str::to_string))
}

/// Sorted distinct years present in `rows`
pub fn observed_years(rows: &[Row], period_column: &str) -> Vec<String> {
    let mut years: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.get(period_column).as_i64())
        .collect();
    years.sort_unstable();
    years.dedup();
    years.into_iter().map(|y| y.to_string()).collect()
}

/// Every year of `start..=end`
pub fn full_range_years(start: i32, end: i32) -> Vec<String> {
    (start..=end).map(|y| y.to_string()).collect()
}

// ============================================================================
// Row index
// ============================================================================

/// Values keyed by series key, then by axis label
#[derive(Debug, Default)]
pub struct RowIndex {
    values: HashMap<Vec<String>, HashMap<String, Option<f64>>>,
}

impl RowIndex {
    /// Index `rows` by `series_columns`, positioned by `position_column`
    pub fn build(
        rows: &[Row],
        series_columns: &[&str],
        position_column: &str,
        value_column: &str,
    ) -> Self {
        let mut values: HashMap<Vec<String>, HashMap<String, Option<f64>>> = HashMap::new();
        for row in rows {
            let key: Option<Vec<String>> = series_columns
                .iter()
                .map(|c| cell_label(row.get(c)))
                .collect();
            let (Some(key), Some(position)) = (key, cell_label(row.get(position_column))) else {
                continue;
            };
            values
                .entry(key)
                .or_default()
                .insert(position, row.get(value_column).as_f64());
        }
        Self { values }
    }

    /// Data of series `key` aligned on `axis`
    pub fn aligned(&self, key: &[String], axis: &[String]) -> Vec<Option<f64>> {
        match self.values.get(key) {
            Some(points) => axis
                .iter()
                .map(|label| points.get(label).copied().flatten())
                .collect(),
            None => vec![None; axis.len()],
        }
    }
}

// ============================================================================
// Layouts
// ============================================================================

impl SeriesLayout {
    /// Columns the data query groups by, period first
    pub fn group_columns(self, spec: &DimensionSpec) -> Vec<String> {
        let table = &spec.table;
        let mut columns: Vec<String> = Vec::new();
        if self.is_time_based() {
            columns.extend(table.period_column.clone());
        }
        match self {
            SeriesLayout::GroupsOverTime => columns.push(table.group_column.clone()),
            SeriesLayout::CategoriesOverTime => columns.extend(table.category_column.clone()),
            SeriesLayout::GroupCategoriesOverTime | SeriesLayout::CategoriesByGroup => {
                columns.push(table.group_column.clone());
                columns.extend(table.category_column.clone());
            },
            SeriesLayout::TargetsByCategory { .. } => columns.extend(table.target_column.clone()),
        }
        columns
    }
}

/// Series of a year-axis layout
///
/// `groups` and `categories` come from the request, so a requested key with
/// no rows still yields an all-null series.
pub fn over_time(
    spec: &DimensionSpec,
    rows: &[Row],
    axis: &[String],
    groups: &[String],
    categories: &[String],
) -> Vec<Series> {
    let table = &spec.table;
    let Some(period) = table.period_column.as_deref() else {
        return Vec::new();
    };
    let value = table.value_column.as_str();
    let group = table.group_column.as_str();
    let category = table.category_column.as_deref().unwrap_or_default();

    match spec.layout {
        SeriesLayout::GroupsOverTime => {
            let index = RowIndex::build(rows, &[group], period, value);
            groups
                .iter()
                .map(|g| Series {
                    name: g.clone(),
                    color: hashed_color(g),
                    dash_style: None,
                    series_type: None,
                    data: index.aligned(std::slice::from_ref(g), axis),
                })
                .collect()
        },
        SeriesLayout::CategoriesOverTime => {
            let index = RowIndex::build(rows, &[category], period, value);
            categories
                .iter()
                .map(|c| Series {
                    name: c.clone(),
                    color: color_for(c, spec.series_colors),
                    dash_style: spec.dash_for(c),
                    series_type: None,
                    data: index.aligned(std::slice::from_ref(c), axis),
                })
                .collect()
        },
        SeriesLayout::GroupCategoriesOverTime => {
            let index = RowIndex::build(rows, &[group, category], period, value);
            let mut series = Vec::with_capacity(groups.len() * categories.len());
            for c in categories {
                for g in groups {
                    series.push(Series {
                        name: format!("{} - {}", g, c),
                        color: hashed_color(g),
                        dash_style: spec.dash_for(c),
                        series_type: None,
                        data: index.aligned(&[g.clone(), c.clone()], axis),
                    });
                }
            }
            series
        },
        SeriesLayout::CategoriesByGroup | SeriesLayout::TargetsByCategory { .. } => Vec::new(),
    }
}

/// Series of the groups-as-axis layout: one per category
pub fn categories_by_group(
    spec: &DimensionSpec,
    rows: &[Row],
    groups: &[String],
    categories: &[String],
) -> Vec<Series> {
    let table = &spec.table;
    let category = table.category_column.as_deref().unwrap_or_default();
    let index = RowIndex::build(rows, &[category], &table.group_column, &table.value_column);
    categories
        .iter()
        .map(|c| Series {
            name: c.clone(),
            color: color_for(c, spec.series_colors),
            dash_style: None,
            series_type: None,
            data: index.aligned(std::slice::from_ref(c), groups),
        })
        .collect()
}

/// Series of the categories-as-axis trade layout
///
/// `per_category` holds, for each requested category in axis order, its
/// destination rows sorted by value descending. With `keep = Some(n)` only
/// the first `n` destinations of each category are charted and the rest is
/// summed into an [`OTHERS`] series, appended last. Destinations appear in
/// first-seen order.
pub fn targets_by_category(
    spec: &DimensionSpec,
    per_category: &[(String, Vec<Row>)],
    keep: Option<usize>,
) -> Vec<Series> {
    let table = &spec.table;
    let Some(target) = table.target_column.as_deref() else {
        return Vec::new();
    };
    let value = table.value_column.as_str();

    let mut order: Vec<String> = Vec::new();
    let mut points: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    let mut others: Vec<Option<f64>> = vec![None; per_category.len()];
    let mut has_others = false;

    for (position, (_, rows)) in per_category.iter().enumerate() {
        let split = keep.unwrap_or(rows.len()).min(rows.len());
        let (top, rest) = rows.split_at(split);
        for row in top {
            let Some(name) = cell_label(row.get(target)) else {
                continue;
            };
            let data = points.entry(name.clone()).or_insert_with(|| {
                order.push(name);
                vec![None; per_category.len()]
            });
            data[position] = row.get(value).as_f64();
        }
        if !rest.is_empty() {
            has_others = true;
            others[position] = rest
                .iter()
                .filter_map(|row| row.get(value).as_f64())
                .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v));
        }
    }

    let mut series: Vec<Series> = order
        .into_iter()
        .map(|name| Series {
            color: color_for(&name, spec.series_colors),
            data: points.remove(&name).unwrap_or_default(),
            name,
            dash_style: None,
            series_type: None,
        })
        .collect();
    if has_others {
        series.push(Series {
            name: OTHERS.to_string(),
            color: color_for(OTHERS, spec.series_colors),
            dash_style: None,
            series_type: None,
            data: others,
        });
    }
    series
}
