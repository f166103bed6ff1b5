//! Dimension Resolver
//!
//! Turns a [`DimensionQuery`] into a [`DimensionResult`]:
//!
//! ```text
//! query ─► catalog lookup ─► FilterSnapshot ─┬─► data query ────┐
//!                                            ├─► axis query ────┼─► assemble ─► cache
//!                                            └─► ranking query ─┘
//! ```
//!
//! The sub-queries of one request are issued concurrently and joined; the
//! first failure fails the whole request. Whole results are cached under a
//! fingerprint of the query and of every setting that changes the output.

use super::assembler::{self, full_range_years, observed_years};
use super::filters::FilterSnapshot;
use super::ranking::{self, value_order};
use super::rows::RowFetcher;
use crate::cache::{CacheConfig, Fingerprint, QueryCache};
use crate::catalog::{Catalog, DimensionSpec, SeriesLayout};
use crate::color::{ColorStrategy, DEFAULT_COLOR};
use crate::config::{EngineConfig, RankingSettings};
use crate::error::{Error, Result};
use crate::metrics::Recorder;
use crate::storage::{Direction, Predicate, Row, TabularQuery};
use crate::types::{AxisMode, DimensionKind, DimensionQuery, DimensionResult, MultiSelect, Series};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Effective per-request settings, part of the result fingerprint
#[derive(Debug, Clone, Copy, PartialEq)]
struct Resolution {
    axis_mode: AxisMode,
    top_n: usize,
}

/// Resolves dimension queries against the catalog
pub struct DimensionResolver {
    catalog: Arc<Catalog>,
    rows: Arc<RowFetcher>,
    results: QueryCache<DimensionResult>,
    ranking: RankingSettings,
    axis_mode: AxisMode,
    metrics: Recorder,
}

impl DimensionResolver {
    /// Create a resolver
    pub fn new(catalog: Arc<Catalog>, rows: Arc<RowFetcher>, config: &EngineConfig) -> Self {
        let metrics = Recorder::from(&config.monitoring);
        Self {
            catalog,
            rows,
            results: QueryCache::new(
                "dimensions",
                CacheConfig::from(&config.cache).with_metrics(metrics),
            ),
            ranking: config.ranking.clone(),
            axis_mode: config.axis.mode,
            metrics,
        }
    }

    /// Resolve `query`
    pub async fn resolve(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        let start = Instant::now();
        let result = self.resolve_inner(query).await;
        let elapsed = start.elapsed();

        let label = query
            .dimension_name
            .parse::<DimensionKind>()
            .map(DimensionKind::as_str)
            .unwrap_or("unknown");
        match &result {
            Ok(r) => {
                self.metrics.dimension(label, elapsed.as_secs_f64(), "success");
                debug!(
                    topic = %query.topic,
                    dimension = label,
                    categories = r.categories.len(),
                    series = r.series.len(),
                    ?elapsed,
                    "Dimension resolved"
                );
            },
            Err(e) => {
                self.metrics.dimension(label, elapsed.as_secs_f64(), e.kind());
                warn!(topic = %query.topic, dimension = label, error = %e, "Dimension failed");
            },
        }
        result
    }

    /// Resolve `query` as dimension `kind`, whatever its `dimension_name`
    pub async fn resolve_as(&self, kind: DimensionKind, query: &DimensionQuery) -> Result<DimensionResult> {
        let mut query = query.clone();
        query.dimension_name = kind.as_str().to_string();
        self.resolve(&query).await
    }

    /// `total` dimension
    pub async fn total(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::Total, query).await
    }

    /// `perCapita` dimension
    pub async fn per_capita(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::PerCapita, query).await
    }

    /// `perGDP` dimension
    pub async fn per_gdp(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::PerGdp, query).await
    }

    /// `byEnergyFamily` dimension
    pub async fn by_energy_family(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ByEnergyFamily, query).await
    }

    /// `bySector` dimension
    pub async fn by_sector(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::BySector, query).await
    }

    /// `byGas` dimension
    pub async fn by_gas(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ByGas, query).await
    }

    /// `byContinent` dimension
    pub async fn by_continent(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ByContinent, query).await
    }

    /// `byCountry` dimension
    pub async fn by_country(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ByCountry, query).await
    }

    /// `provenReserve` dimension
    pub async fn proven_reserve(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ProvenReserve, query).await
    }

    /// `shareOfElectricityGeneration` dimension
    pub async fn share_of_electricity_generation(
        &self,
        query: &DimensionQuery,
    ) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ShareOfElectricityGeneration, query)
            .await
    }

    /// `shareOfPrimaryEnergy` dimension
    pub async fn share_of_primary_energy(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ShareOfPrimaryEnergy, query).await
    }

    /// `importExport` dimension
    pub async fn import_export(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolve_as(DimensionKind::ImportExport, query).await
    }

    /// Result cache
    pub fn cache(&self) -> &QueryCache<DimensionResult> {
        &self.results
    }

    async fn resolve_inner(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        let kind: DimensionKind = query.dimension_name.parse()?;
        let spec = self.catalog.select(&query.topic, kind, &query.extra_filters)?;
        let filters = FilterSnapshot::build(spec, query)?;
        let resolution = Resolution {
            axis_mode: query.axis_mode.unwrap_or(self.axis_mode),
            top_n: query.top_n.unwrap_or(self.ranking.top_n),
        };

        let key = Fingerprint::of(&(query, resolution, &self.ranking));
        self.results
            .get_or_compute(key, || async {
                info!(topic = %query.topic, dimension = %kind, "Computing dimension");
                self.compute(spec, &filters, resolution).await
            })
            .await
    }

    async fn compute(
        &self,
        spec: &DimensionSpec,
        filters: &FilterSnapshot,
        resolution: Resolution,
    ) -> Result<DimensionResult> {
        let result = match spec.layout {
            SeriesLayout::CategoriesByGroup => self.categories_by_group(spec, filters).await?,
            SeriesLayout::TargetsByCategory { others } => {
                let keep = others.then_some(resolution.top_n);
                self.targets_by_category(spec, filters, keep).await?
            },
            _ => self.over_time(spec, filters, resolution.axis_mode).await?,
        };
        self.record_color_misses(spec, &result.series);
        Ok(result)
    }

    /// Curated lookups that fell back to the default color
    fn record_color_misses(&self, spec: &DimensionSpec, series: &[Series]) {
        let keyed = !matches!(
            spec.layout,
            SeriesLayout::GroupsOverTime | SeriesLayout::GroupCategoriesOverTime
        );
        if keyed && spec.series_colors == ColorStrategy::Curated {
            let misses = series.iter().filter(|s| s.color == DEFAULT_COLOR).count();
            self.metrics.color_misses(misses as u64);
        }
    }

    async fn over_time(
        &self,
        spec: &DimensionSpec,
        filters: &FilterSnapshot,
        axis_mode: AxisMode,
    ) -> Result<DimensionResult> {
        let table = &spec.table;
        let period = table.period_column.as_deref().ok_or_else(|| {
            Error::Configuration(format!("{} has no period column", table.table))
        })?;

        let data_query = TabularQuery::sum(
            &table.table,
            spec.layout.group_columns(spec),
            &table.value_column,
            filters.multiplier,
            &table.value_column,
        )
        .filters(filters.predicates())
        .order_by(period, Direction::Asc);

        let axis = async {
            match (axis_mode, filters.years) {
                (AxisMode::FullRange, Some((start, end))) => Ok(full_range_years(start, end)),
                _ => {
                    let query = TabularQuery::distinct(&table.table, [period])
                        .filters(filters.predicates())
                        .order_by(period, Direction::Asc);
                    let rows = self.rows.fetch(&query).await?;
                    Ok::<_, Error>(observed_years(&rows, period))
                },
            }
        };

        let (rows, axis, multi_selects) = tokio::try_join!(
            self.rows.fetch(&data_query),
            axis,
            self.quick_selects(spec, filters)
        )?;

        let series = assembler::over_time(spec, &rows, &axis, &filters.groups, &filters.categories);
        Ok(DimensionResult {
            categories: axis,
            series,
            multi_selects,
        })
    }

    async fn categories_by_group(
        &self,
        spec: &DimensionSpec,
        filters: &FilterSnapshot,
    ) -> Result<DimensionResult> {
        let table = &spec.table;
        let data_query = TabularQuery::sum(
            &table.table,
            spec.layout.group_columns(spec),
            &table.value_column,
            filters.multiplier,
            &table.value_column,
        )
        .filters(filters.predicates());

        let (rows, multi_selects) =
            tokio::try_join!(self.rows.fetch(&data_query), self.quick_selects(spec, filters))?;

        let series =
            assembler::categories_by_group(spec, &rows, &filters.groups, &filters.categories);
        Ok(DimensionResult {
            categories: filters.groups.clone(),
            series,
            multi_selects,
        })
    }

    async fn targets_by_category(
        &self,
        spec: &DimensionSpec,
        filters: &FilterSnapshot,
        keep: Option<usize>,
    ) -> Result<DimensionResult> {
        let table = &spec.table;
        let (Some(target), Some(category)) = (&table.target_column, &table.category_column) else {
            return Err(Error::Configuration(format!(
                "{} needs a target and a category column",
                table.table
            )));
        };

        // One query per category so the cut-off applies per category
        let per_category = try_join_all(filters.categories.iter().map(|value| async move {
            let query = TabularQuery::sum(
                &table.table,
                [target.as_str()],
                &table.value_column,
                filters.multiplier,
                &table.value_column,
            )
            .filters(filters.without_category())
            .filter(Predicate::eq(category.clone(), value.as_str()))
            .filter(Predicate::not_null(target.clone()))
            .order_by(&table.value_column, Direction::Desc)
            .order_by(target, Direction::Asc);

            let mut rows: Vec<Row> = self.rows.fetch(&query).await?.to_vec();
            rows.sort_by(|a, b| {
                value_order(a.get(&table.value_column).as_f64(), b.get(&table.value_column).as_f64())
                    .then_with(|| a.get(target).sort_cmp(b.get(target)))
            });
            Ok::<_, Error>((value.clone(), rows))
        }))
        .await?;

        let series = assembler::targets_by_category(spec, &per_category, keep);
        Ok(DimensionResult {
            categories: filters.categories.clone(),
            series,
            multi_selects: None,
        })
    }

    async fn quick_selects(
        &self,
        spec: &DimensionSpec,
        filters: &FilterSnapshot,
    ) -> Result<Option<Vec<MultiSelect>>> {
        if !spec.ranked {
            return Ok(None);
        }
        let table = &spec.table;
        let mut group_by = vec![table.group_column.clone()];
        group_by.extend(table.period_column.clone());

        let query = TabularQuery::sum(&table.table, group_by, &table.value_column, 1.0, &table.value_column)
            .filters(filters.ranking(spec, self.ranking.group_type))
            .order_by(&table.group_column, Direction::Asc);
        let rows = self.rows.fetch(&query).await?;

        Ok(Some(ranking::quick_selects(
            &rows,
            &table.group_column,
            table.period_column.as_deref(),
            &table.value_column,
            &self.ranking,
        )))
    }
}
