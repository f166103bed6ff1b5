//! Filter snapshot
//!
//! Validates a [`DimensionQuery`] against its [`DimensionSpec`] once and
//! freezes the resulting predicates. Every sub-query of the request (axis,
//! data, ranking) is built from the same snapshot, so the axis can never be
//! computed over a different row set than the data.

use crate::catalog::DimensionSpec;
use crate::error::{Error, Result};
use crate::storage::{FilterValue, Predicate};
use crate::types::{DimensionQuery, GroupType};
use crate::units::{self, Unit};
use std::str::FromStr;

/// Validated, immutable filters of one request
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSnapshot {
    /// Requested groups, deduplicated, in request order
    pub groups: Vec<String>,
    /// Requested categories minus excluded ones, in request order
    pub categories: Vec<String>,
    /// Inclusive year range, for tables with a time axis
    pub years: Option<(i32, i32)>,
    /// Factor applied to every summed value
    pub multiplier: f64,
    fixed: Vec<Predicate>,
    params: Vec<Predicate>,
    group: Predicate,
    category: Option<Predicate>,
    period: Option<Predicate>,
}

impl FilterSnapshot {
    /// Validate `query` for `spec`
    ///
    /// Fails with `InvalidQuery` on a structurally invalid request and with
    /// `Conversion` on an unknown or mismatched unit.
    pub fn build(spec: &DimensionSpec, query: &DimensionQuery) -> Result<Self> {
        query.validate()?;
        let table = &spec.table;

        let groups = dedup(&query.group_names);
        if spec.layout.single_group() {
            if groups.len() != 1 {
                return Err(Error::invalid(format!(
                    "{} expects exactly one group, got {}",
                    spec.kind,
                    groups.len()
                )));
            }
        } else if groups.is_empty() {
            return Err(Error::invalid(format!("{} requires at least one group", spec.kind)));
        }

        let categories: Vec<String> = dedup(&query.category_filter)
            .into_iter()
            .filter(|c| !spec.excluded_categories.contains(c))
            .collect();
        if spec.layout.needs_categories() && categories.is_empty() {
            return Err(Error::invalid(format!(
                "{} requires a non-empty category filter",
                spec.kind
            )));
        }
        if table.category_column.is_none() && !query.category_filter.is_empty() {
            return Err(Error::invalid(format!("{} does not take categories", spec.kind)));
        }

        let years = match (&table.period_column, query.year_start, query.year_end) {
            (Some(_), Some(start), Some(end)) => Some((start, end)),
            (Some(_), _, _) if spec.layout.is_time_based() => {
                return Err(Error::invalid(format!(
                    "{} requires yearStart and yearEnd",
                    spec.kind
                )))
            },
            _ => None,
        };

        let multiplier = multiplier(spec, query.target_unit.as_deref())?;

        for key in query.extra_filters.keys() {
            if spec.param(key).is_none() && !spec.is_selector(key) {
                return Err(Error::invalid(format!(
                    "{} does not accept filter '{}'",
                    spec.kind, key
                )));
            }
        }
        let params = spec
            .params
            .iter()
            .map(|param| {
                query
                    .extra_filters
                    .get(&param.name)
                    .map(|value| param.predicate(value))
                    .ok_or_else(|| {
                        Error::invalid(format!(
                            "{} requires filter '{}'",
                            spec.kind, param.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let group = match groups.as_slice() {
            [single] => Predicate::eq(table.group_column.clone(), single.as_str()),
            many => Predicate::is_in(table.group_column.clone(), many.iter()),
        };
        let category = match &table.category_column {
            Some(column) if !categories.is_empty() => {
                Some(Predicate::is_in(column.clone(), categories.iter()))
            },
            _ => None,
        };
        let period = match (&table.period_column, years) {
            (Some(column), Some((start, end))) => {
                Some(Predicate::between(column.clone(), start as i64, end as i64))
            },
            _ => None,
        };

        // Excluded values never reach the axis either
        let mut fixed = spec.fixed_filters.clone();
        if let (Some(column), false) = (&table.category_column, spec.excluded_categories.is_empty()) {
            fixed.push(Predicate::not_in(column.clone(), spec.excluded_categories.iter()));
        }

        Ok(Self {
            groups,
            categories,
            years,
            multiplier,
            fixed,
            params,
            group,
            category,
            period,
        })
    }

    /// Predicates of the axis and data queries
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = self.without_category();
        out.extend(self.category.clone());
        out
    }

    /// Predicates of the axis and data queries, minus the category filter
    ///
    /// Used by layouts that issue one query per category.
    pub fn without_category(&self) -> Vec<Predicate> {
        let mut out = self.fixed.clone();
        out.extend(self.params.iter().cloned());
        out.push(self.group.clone());
        out.extend(self.period.clone());
        out
    }

    /// Predicates of the ranking query
    ///
    /// Same fixed, caller and category filters as the data, but over every
    /// group of type `scope` and every period.
    pub fn ranking(&self, spec: &DimensionSpec, scope: GroupType) -> Vec<Predicate> {
        let mut out = self.fixed.clone();
        out.extend(self.params.iter().cloned());
        out.extend(self.category.clone());
        if let Some(column) = &spec.table.group_type_column {
            out.push(Predicate::eq(column.clone(), FilterValue::from(scope.as_str())));
        }
        out.push(Predicate::not_null(spec.table.group_column.clone()));
        out
    }
}

/// Unit factor times the table's constant scale
fn multiplier(spec: &DimensionSpec, target: Option<&str>) -> Result<f64> {
    let factor = match (spec.table.stored_unit, target) {
        (Some(stored), Some(target)) => {
            let target = Unit::from_str(target)?;
            units::factor(stored, target, stored.family())?
        },
        (Some(stored), None) => {
            return Err(Error::invalid(format!(
                "{} requires a target unit of the {} family",
                spec.kind,
                stored.family()
            )))
        },
        (None, Some(target)) => {
            return Err(Error::invalid(format!(
                "{} is unitless, got unit '{}'",
                spec.kind, target
            )))
        },
        (None, None) => 1.0,
    };
    Ok(factor * spec.table.scale)
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::ConversionError;
    use crate::types::DimensionKind;

    fn spec(topic: &str, kind: DimensionKind) -> DimensionSpec {
        Catalog::builtin().dimension(topic, kind).unwrap().clone()
    }

    fn by_family() -> DimensionQuery {
        DimensionQuery::new("primaryEnergies", "byEnergyFamily")
            .with_groups(["World"])
            .with_categories(["Oil", "Gas"])
            .with_years(2015, 2017)
            .with_unit("TWh")
            .with_filter("type", "Consumption")
    }

    #[test]
    fn test_snapshot_predicates() {
        let snapshot =
            FilterSnapshot::build(&spec("primaryEnergies", DimensionKind::ByEnergyFamily), &by_family())
                .unwrap();
        assert!((snapshot.multiplier - 11.63).abs() < 1e-9);
        assert_eq!(snapshot.years, Some((2015, 2017)));
        assert_eq!(
            snapshot.predicates(),
            vec![
                Predicate::eq("type", "Consumption"),
                Predicate::eq("group_name", "World"),
                Predicate::between("year", 2015, 2017),
                Predicate::is_in("energy_family", ["Oil", "Gas"]),
            ]
        );
    }

    #[test]
    fn test_single_group_layouts() {
        let spec = spec("primaryEnergies", DimensionKind::ByEnergyFamily);
        let err = FilterSnapshot::build(&spec, &by_family().with_groups(["World", "France"]));
        assert!(matches!(err, Err(Error::InvalidQuery(_))));
        let err = FilterSnapshot::build(&spec, &by_family().with_groups(Vec::<String>::new()));
        assert!(matches!(err, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_empty_groups_rejected() {
        let query = DimensionQuery::new("coal", "total")
            .with_years(2000, 2010)
            .with_unit("Mtoe")
            .with_filter("type", "Consumption");
        let err = FilterSnapshot::build(&spec("coal", DimensionKind::Total), &query).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_unit_validation() {
        let spec = spec("primaryEnergies", DimensionKind::ByEnergyFamily);

        let mut missing = by_family();
        missing.target_unit = None;
        assert!(matches!(
            FilterSnapshot::build(&spec, &missing),
            Err(Error::InvalidQuery(_))
        ));

        let err = FilterSnapshot::build(&spec, &by_family().with_unit("furlong")).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::UnknownUnit(_))));

        let err = FilterSnapshot::build(&spec, &by_family().with_unit("MtCO2")).unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::FamilyMismatch { .. })));

        // unitless tables refuse a unit
        let reserve = DimensionQuery::new("gas", "provenReserve")
            .with_groups(["France"])
            .with_years(2000, 2010)
            .with_unit("Mtoe");
        assert!(matches!(
            FilterSnapshot::build(&self::spec("gas", DimensionKind::ProvenReserve), &reserve),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_required_and_unknown_filters() {
        let spec = spec("co2FromEnergy", DimensionKind::PerGdp);
        let base = DimensionQuery::new("co2FromEnergy", "perGDP")
            .with_groups(["France"])
            .with_years(2000, 2010)
            .with_unit("MtCO2");

        let err = FilterSnapshot::build(&spec, &base).unwrap_err();
        assert!(err.to_string().contains("gdp_unit"));

        let ok = FilterSnapshot::build(&spec, &base.clone().with_filter("gdp_unit", "GDP (constant 2010 US$)"));
        assert!(ok.is_ok());

        let err = FilterSnapshot::build(
            &spec,
            &base
                .with_filter("gdp_unit", "GDP (constant 2010 US$)")
                .with_filter("color", "red"),
        );
        assert!(matches!(err, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_inverted_range_and_missing_years() {
        let spec = spec("primaryEnergies", DimensionKind::ByEnergyFamily);
        assert!(matches!(
            FilterSnapshot::build(&spec, &by_family().with_years(2018, 2015)),
            Err(Error::InvalidQuery(_))
        ));
        let mut no_years = by_family();
        no_years.year_end = None;
        assert!(matches!(
            FilterSnapshot::build(&spec, &no_years),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_excluded_categories() {
        let spec = spec("ghgByGas", DimensionKind::BySector);
        let query = DimensionQuery::new("ghgByGas", "bySector")
            .with_groups(["France"])
            .with_years(2000, 2010)
            .with_unit("MtCO2eq")
            .with_filter("source", "PIK")
            .with_categories(["Energy", "LUCF"]);
        let snapshot = FilterSnapshot::build(&spec, &query).unwrap();
        assert_eq!(snapshot.categories, vec!["Energy".to_string()]);
        assert!(snapshot
            .predicates()
            .contains(&Predicate::not_in("sector", ["LUCF"])));

        let only_excluded = query.with_categories(["LUCF"]);
        assert!(matches!(
            FilterSnapshot::build(&spec, &only_excluded),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_variant_filter_is_consumed() {
        let query = DimensionQuery::new("electricity", "total")
            .with_groups(["France"])
            .with_years(2000, 2010)
            .with_filter("type", "Capacity");
        let catalog = Catalog::builtin();
        let spec = catalog
            .select("electricity", DimensionKind::Total, &query.extra_filters)
            .unwrap();
        let snapshot = FilterSnapshot::build(spec, &query).unwrap();
        assert_eq!(snapshot.multiplier, 1.0);
        assert!(!snapshot
            .predicates()
            .iter()
            .any(|p| *p == Predicate::eq("type", "Capacity")));
    }

    #[test]
    fn test_ranking_predicates() {
        let spec = spec("primaryEnergies", DimensionKind::Total);
        let query = DimensionQuery::new("primaryEnergies", "total")
            .with_groups(["France", "Spain"])
            .with_years(2000, 2010)
            .with_unit("Mtoe")
            .with_filter("type", "Production");
        let snapshot = FilterSnapshot::build(&spec, &query).unwrap();
        assert_eq!(
            snapshot.ranking(&spec, GroupType::Country),
            vec![
                Predicate::eq("type", "Production"),
                Predicate::eq("group_type", "country"),
                Predicate::not_null("group_name"),
            ]
        );
    }
}
