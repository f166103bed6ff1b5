//! In-memory fact store
//!
//! Evaluates [`TabularQuery`] directly over rows held in memory. Used by the
//! tests and benches, and as a reference for what a database-backed store
//! must return.

use super::query::{Direction, Row, Selection, TabularQuery, Value};
use super::{FactStore, TextLookup};
use crate::error::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Simple in-memory fact store
#[derive(Default)]
pub struct InMemoryFactStore {
    /// table name -> rows
    tables: RwLock<HashMap<String, Vec<Row>>>,

    /// topic slug -> markdown body
    markdown: RwLock<HashMap<String, String>>,
}

impl InMemoryFactStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the table if needed and append rows to it
    pub fn insert_rows(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Register a markdown body for a topic slug
    pub fn set_markdown(&self, slug: &str, body: impl Into<String>) {
        self.markdown.write().insert(slug.to_string(), body.into());
    }

    /// Run `query` synchronously
    pub fn execute(&self, query: &TabularQuery) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read();
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| StorageError::UnknownTable(query.table.clone()))?;

        let matching = rows
            .iter()
            .filter(|row| query.filters.iter().all(|p| p.accepts(row)));

        let mut out = match &query.selection {
            Selection::Distinct(columns) => {
                let mut seen: Vec<Row> = Vec::new();
                for row in matching {
                    let projected = project(row, columns);
                    if !seen.contains(&projected) {
                        seen.push(projected);
                    }
                }
                seen
            },
            Selection::Sum {
                group_by,
                column,
                multiplier,
                alias,
            } => {
                // Vec keeps first-seen group order for unordered queries
                let mut groups: Vec<(Row, Option<f64>)> = Vec::new();
                let mut index: HashMap<Vec<String>, usize> = HashMap::new();
                for row in matching {
                    let key_row = project(row, group_by);
                    let key: Vec<String> = group_by
                        .iter()
                        .map(|c| format!("{:?}", key_row.get(c)))
                        .collect();
                    let cell = row.get(column);
                    let value = match cell {
                        Value::Null => None,
                        other => Some(other.as_f64().ok_or_else(|| {
                            StorageError::malformed(
                                &query.table,
                                format!("non-numeric value {:?} in column {}", other, column),
                            )
                        })?),
                    };
                    let slot = *index.entry(key).or_insert_with(|| {
                        groups.push((key_row, None));
                        groups.len() - 1
                    });
                    if let Some(v) = value {
                        let acc = &mut groups[slot].1;
                        *acc = Some(acc.unwrap_or(0.0) + v * multiplier);
                    }
                }
                groups
                    .into_iter()
                    .map(|(mut row, sum)| {
                        row.insert(alias.clone(), sum);
                        row
                    })
                    .collect()
            },
        };

        if !query.order_by.is_empty() {
            out.sort_by(|a, b| {
                for term in &query.order_by {
                    let ord = a.get(&term.column).sort_cmp(b.get(&term.column));
                    let ord = match term.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }
}

fn project(row: &Row, columns: &[String]) -> Row {
    columns.iter().fold(Row::new(), |acc, c| acc.with(c.clone(), row.get(c).clone()))
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    async fn query(&self, query: &TabularQuery) -> Result<Vec<Row>, StorageError> {
        self.execute(query)
    }
}

#[async_trait]
impl TextLookup for InMemoryFactStore {
    async fn markdown(&self, slug: &str) -> Result<Option<String>, StorageError> {
        Ok(self.markdown.read().get(slug).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::query::Predicate;

    fn store() -> InMemoryFactStore {
        let store = InMemoryFactStore::new();
        store.insert_rows(
            "energy",
            vec![
                Row::new().with("group_name", "World").with("family", "Oil").with("year", 2015).with("energy", 10.0),
                Row::new().with("group_name", "World").with("family", "Oil").with("year", 2015).with("energy", 2.0),
                Row::new().with("group_name", "World").with("family", "Gas").with("year", 2016).with("energy", 5.0),
                Row::new().with("group_name", "World").with("family", "Coal").with("year", 2016).with("energy", Value::Null),
            ],
        );
        store
    }

    #[test]
    fn test_grouped_sum_with_multiplier() {
        let rows = store()
            .execute(
                &TabularQuery::sum("energy", ["family", "year"], "energy", 2.0, "energy")
                    .order_by("family", Direction::Asc),
            )
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("family").as_str(), Some("Coal"));
        assert!(rows[0].get("energy").is_null());
        assert_eq!(rows[1].get("energy").as_f64(), Some(10.0));
        assert_eq!(rows[2].get("energy").as_f64(), Some(24.0));
    }

    #[test]
    fn test_distinct_order_limit_offset() {
        let rows = store()
            .execute(
                &TabularQuery::distinct("energy", ["family"])
                    .filter(Predicate::not_null("energy"))
                    .order_by("family", Direction::Desc)
                    .offset(1)
                    .limit(1),
            )
            .unwrap();
        assert_eq!(rows, vec![Row::new().with("family", "Gas")]);
    }

    #[test]
    fn test_unknown_table() {
        let err = store()
            .execute(&TabularQuery::distinct("nope", ["year"]))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownTable(_)));
    }

    #[test]
    fn test_non_numeric_measure_is_malformed() {
        let store = store();
        store.insert_rows("bad", vec![Row::new().with("v", "abc")]);
        let err = store
            .execute(&TabularQuery::sum("bad", Vec::<String>::new(), "v", 1.0, "v"))
            .unwrap_err();
        assert!(matches!(err, StorageError::MalformedRow { .. }));
    }
}
