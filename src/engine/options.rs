//! Option lookups
//!
//! Everything a topic page needs besides its charts: the selectable groups,
//! ordered category lists, plain distinct lists, preset multi-selects, the
//! markdown blurb, and the topic's dimensions and units. Row lookups share
//! the engine's row cache; markdown has its own.

use super::ranking::value_order;
use super::rows::RowFetcher;
use crate::cache::{CacheConfig, Fingerprint, QueryCache};
use crate::catalog::{Catalog, FilterParam, Topic};
use crate::color::{color_for, hashed_color, ColorStrategy, DEFAULT_COLOR};
use crate::error::{Error, Result};
use crate::metrics::Recorder;
use crate::storage::{Direction, FilterValue, Predicate, TabularQuery};
use crate::types::{DimensionKind, GroupType, MultiSelect, NameColor};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const MULTISELECT_GROUP: &str = "group";
const MULTISELECT_MEMBER: &str = "country";

/// Option lookups over the catalog
pub struct OptionsService {
    catalog: Arc<Catalog>,
    rows: Arc<RowFetcher>,
    markdown: QueryCache<String>,
    metrics: Recorder,
}

impl OptionsService {
    /// Create the service
    pub fn new(catalog: Arc<Catalog>, rows: Arc<RowFetcher>, cache: CacheConfig) -> Self {
        Self {
            catalog,
            rows,
            metrics: cache.metrics,
            markdown: QueryCache::new("markdown", cache),
        }
    }

    /// Countries of a topic's main table
    pub async fn countries(&self, topic: &str) -> Result<Vec<NameColor>> {
        self.groups_of_type(topic, GroupType::Country).await
    }

    /// Country groups of a topic's main table
    pub async fn groups(&self, topic: &str) -> Result<Vec<NameColor>> {
        self.groups_of_type(topic, GroupType::Group).await
    }

    /// Zones of a topic's main table
    pub async fn zones(&self, topic: &str) -> Result<Vec<NameColor>> {
        self.groups_of_type(topic, GroupType::Zone).await
    }

    /// Distinct group names of type `group_type`, ascending, hashed colors
    ///
    /// Tables without a group type column only hold countries.
    pub async fn groups_of_type(&self, topic: &str, group_type: GroupType) -> Result<Vec<NameColor>> {
        let table = &self.catalog.topic(topic)?.group_table;
        let mut query = TabularQuery::distinct(&table.table, [table.group_column.as_str()])
            .filter(Predicate::not_null(table.group_column.clone()))
            .order_by(&table.group_column, Direction::Asc);
        match &table.group_type_column {
            Some(column) => {
                query = query.filter(Predicate::eq(
                    column.clone(),
                    FilterValue::from(group_type.as_str()),
                ))
            },
            None if group_type != GroupType::Country => return Ok(Vec::new()),
            None => {},
        }

        let rows = self.rows.fetch(&query).await?;
        let mut names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(&table.group_column).label())
            .collect();
        names.sort();
        names.dedup();
        Ok(names
            .into_iter()
            .map(|name| NameColor {
                color: hashed_color(&name),
                name,
            })
            .collect())
    }

    /// Named category list, largest total first
    ///
    /// `filters` must provide every parameter the list declares.
    pub async fn category_list(
        &self,
        topic: &str,
        name: &str,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<NameColor>> {
        let list = self
            .catalog
            .topic(topic)?
            .category_list(name)
            .ok_or_else(|| Error::invalid(format!("topic '{}' has no list '{}'", topic, name)))?;

        let params = bind(&list.params, filters, name)?;
        let mut query = TabularQuery::sum(
            &list.table,
            [list.column.as_str()],
            &list.value_column,
            1.0,
            &list.value_column,
        )
        .filters(list.fixed_filters.iter().cloned())
        .filters(params)
        .filter(Predicate::not_null(list.column.clone()))
        .order_by(&list.value_column, Direction::Desc)
        .order_by(&list.column, Direction::Asc);
        if !list.excluded.is_empty() {
            query = query.filter(Predicate::not_in(list.column.clone(), list.excluded.iter()));
        }

        let rows = self.rows.fetch(&query).await?;
        let mut ranked: Vec<(String, Option<f64>)> = rows
            .iter()
            .filter_map(|row| {
                let label = row.get(&list.column).label()?;
                Some((label, row.get(&list.value_column).as_f64()))
            })
            .collect();
        ranked.sort_by(|a, b| value_order(a.1, b.1).then_with(|| a.0.cmp(&b.0)));

        let entries: Vec<NameColor> = ranked
            .into_iter()
            .map(|(name, _)| NameColor {
                color: color_for(&name, list.colors),
                name,
            })
            .collect();
        if list.colors == ColorStrategy::Curated {
            let misses = entries.iter().filter(|e| e.color == DEFAULT_COLOR).count();
            self.metrics.color_misses(misses as u64);
        }
        Ok(entries)
    }

    /// Named distinct list, ascending
    pub async fn distinct_list(&self, topic: &str, name: &str) -> Result<Vec<String>> {
        let list = self
            .catalog
            .topic(topic)?
            .distinct_list(name)
            .ok_or_else(|| Error::invalid(format!("topic '{}' has no list '{}'", topic, name)))?;

        let query = TabularQuery::distinct(&list.table, [list.column.as_str()])
            .filter(Predicate::not_null(list.column.clone()))
            .order_by(&list.column, Direction::Asc);
        let rows = self.rows.fetch(&query).await?;

        let mut values: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(&list.column).label())
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// Preset group selections, one per group, members in name order
    pub async fn multi_selects(&self) -> Result<Vec<MultiSelect>> {
        let query = TabularQuery::distinct(
            self.catalog.multiselect_table(),
            [MULTISELECT_GROUP, MULTISELECT_MEMBER],
        )
        .filter(Predicate::not_null(MULTISELECT_GROUP))
        .filter(Predicate::not_null(MULTISELECT_MEMBER))
        .order_by(MULTISELECT_GROUP, Direction::Asc)
        .order_by(MULTISELECT_MEMBER, Direction::Asc);
        let rows = self.rows.fetch(&query).await?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows.iter() {
            if let (Some(group), Some(member)) = (
                row.get(MULTISELECT_GROUP).label(),
                row.get(MULTISELECT_MEMBER).label(),
            ) {
                grouped.entry(group).or_default().push(member);
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(name, mut members)| {
                members.sort();
                members.dedup();
                MultiSelect {
                    name,
                    data: members
                        .into_iter()
                        .map(|member| NameColor {
                            color: hashed_color(&member),
                            name: member,
                        })
                        .collect(),
                }
            })
            .collect())
    }

    /// Markdown blurb of a topic, empty when none is registered
    pub async fn md_infos(&self, topic: &str) -> Result<String> {
        let slug = self.catalog.topic(topic)?.md_slug.clone();
        let gateway = self.rows.gateway();
        self.markdown
            .get_or_compute(Fingerprint::of(&slug), || async {
                let body = gateway.markdown(&slug).await?;
                if body.is_none() {
                    debug!(slug = %slug, "No markdown registered");
                }
                Ok::<_, Error>(body.unwrap_or_default())
            })
            .await
    }

    /// Markdown cache
    pub fn markdown_cache(&self) -> &QueryCache<String> {
        &self.markdown
    }

    /// Dimension kinds a topic serves
    pub fn dimensions(&self, topic: &str) -> Result<Vec<DimensionKind>> {
        Ok(self.catalog.topic(topic)?.kinds())
    }

    /// Wire names of the units a topic can be expressed in
    pub fn units(&self, topic: &str) -> Result<Vec<String>> {
        Ok(unit_names(self.catalog.topic(topic)?))
    }
}

fn unit_names(topic: &Topic) -> Vec<String> {
    topic
        .unit_family()
        .map(|family| family.units().into_iter().map(|u| u.as_str().to_string()).collect())
        .unwrap_or_default()
}

fn bind(params: &[FilterParam], filters: &BTreeMap<String, String>, list: &str) -> Result<Vec<Predicate>> {
    if let Some(key) = filters.keys().find(|k| !params.iter().any(|p| &p.name == *k)) {
        return Err(Error::invalid(format!("list '{}' does not accept filter '{}'", list, key)));
    }
    params
        .iter()
        .map(|param| {
            filters
                .get(&param.name)
                .map(|value| param.predicate(value))
                .ok_or_else(|| Error::invalid(format!("list '{}' requires filter '{}'", list, param.name)))
        })
        .collect()
}
