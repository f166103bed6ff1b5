//! Tabular query model
//!
//! The subset of relational querying the engine needs: equality / set /
//! range / null predicates, grouped `SUM(column) * multiplier`, distinct
//! projections, ordering and limit/offset. Backends translate a
//! [`TabularQuery`] into their own dialect; [`super::InMemoryFactStore`]
//! evaluates it directly.

use std::cmp::Ordering;
use std::collections::BTreeMap;

// ============================================================================
// Values
// ============================================================================

/// A cell of a fact row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL or absent column
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer (years, counts)
    Int(i64),
    /// Floating point measure
    Float(f64),
    /// Text (names, labels, units)
    Text(String),
}

static NULL: Value = Value::Null;

impl Value {
    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of `Int` and `Float`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of `Int` (and of integral `Float`s)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Borrow `Text`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render as an axis label (`Int` and `Text` only)
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Total order used by `ORDER BY`: nulls first, numbers numerically,
    /// then booleans, then text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Bool(_) => 2,
                Value::Text(_) => 3,
            }
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.total_cmp(&y)
            },
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    fn matches(&self, filter: &FilterValue) -> bool {
        match (self, filter) {
            (Value::Text(a), FilterValue::Text(b)) => a == b,
            (Value::Int(a), FilterValue::Int(b)) => a == b,
            (Value::Float(a), FilterValue::Int(b)) => *a == *b as f64,
            (Value::Bool(a), FilterValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    /// Text literal
    Text(String),
    /// Integer literal
    Int(i64),
    /// Boolean literal
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<&String> for FilterValue {
    fn from(v: &String) -> Self {
        FilterValue::Text(v.clone())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A result or fact row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    /// Empty row
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Set a column
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Cell for `column`, `Null` when absent
    pub fn get(&self, column: &str) -> &Value {
        self.0.get(column).unwrap_or(&NULL)
    }

    /// Column names present in the row
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// Query
// ============================================================================

/// Row predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `column = value`
    Eq {
        /// Column
        column: String,
        /// Literal
        value: FilterValue,
    },
    /// `column = value OR column IS NULL`
    EqOrNull {
        /// Column
        column: String,
        /// Literal
        value: FilterValue,
    },
    /// `column IN (values)`
    In {
        /// Column
        column: String,
        /// Accepted literals
        values: Vec<FilterValue>,
    },
    /// `column NOT IN (values)` (nulls pass)
    NotIn {
        /// Column
        column: String,
        /// Rejected literals
        values: Vec<FilterValue>,
    },
    /// `column BETWEEN low AND high`, inclusive
    Between {
        /// Column
        column: String,
        /// Lower bound
        low: i64,
        /// Upper bound
        high: i64,
    },
    /// `column IS NOT NULL`
    NotNull {
        /// Column
        column: String,
    },
}

impl Predicate {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Predicate::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// `column IN (values)`
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column NOT IN (values)`
    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Predicate::NotIn {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column BETWEEN low AND high`
    pub fn between(column: impl Into<String>, low: i64, high: i64) -> Self {
        Predicate::Between {
            column: column.into(),
            low,
            high,
        }
    }

    /// `column IS NOT NULL`
    pub fn not_null(column: impl Into<String>) -> Self {
        Predicate::NotNull {
            column: column.into(),
        }
    }

    /// Column the predicate reads
    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::EqOrNull { column, .. }
            | Predicate::In { column, .. }
            | Predicate::NotIn { column, .. }
            | Predicate::Between { column, .. }
            | Predicate::NotNull { column } => column,
        }
    }

    /// Evaluate against a row
    pub fn accepts(&self, row: &Row) -> bool {
        let cell = row.get(self.column());
        match self {
            Predicate::Eq { value, .. } => cell.matches(value),
            Predicate::EqOrNull { value, .. } => cell.is_null() || cell.matches(value),
            Predicate::In { values, .. } => values.iter().any(|v| cell.matches(v)),
            Predicate::NotIn { values, .. } => !values.iter().any(|v| cell.matches(v)),
            Predicate::Between { low, high, .. } => cell
                .as_i64()
                .map(|v| v >= *low && v <= *high)
                .unwrap_or(false),
            Predicate::NotNull { .. } => !cell.is_null(),
        }
    }
}

/// What the query returns
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Distinct combinations of the listed columns
    Distinct(Vec<String>),
    /// `SELECT group_by..., SUM(column) * multiplier AS alias GROUP BY group_by...`
    ///
    /// The sum of a group whose cells are all null is null.
    Sum {
        /// Grouping columns
        group_by: Vec<String>,
        /// Measure column
        column: String,
        /// Applied to every summed value
        multiplier: f64,
        /// Output column name of the sum
        alias: String,
    },
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// One `ORDER BY` term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Column (or sum alias)
    pub column: String,
    /// Direction
    pub direction: Direction,
}

/// A query against one fact table
#[derive(Debug, Clone, PartialEq)]
pub struct TabularQuery {
    /// Table name
    pub table: String,
    /// Conjunction of predicates
    pub filters: Vec<Predicate>,
    /// Projection / aggregation
    pub selection: Selection,
    /// Ordering, applied after aggregation
    pub order_by: Vec<OrderBy>,
    /// Rows to skip
    pub offset: Option<usize>,
    /// Maximum rows returned
    pub limit: Option<usize>,
}

impl TabularQuery {
    /// Distinct projection of `columns` from `table`
    pub fn distinct<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            filters: Vec::new(),
            selection: Selection::Distinct(columns.into_iter().map(Into::into).collect()),
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Grouped sum of `column * multiplier` over `table`
    pub fn sum<I, S>(
        table: impl Into<String>,
        group_by: I,
        column: impl Into<String>,
        multiplier: f64,
        alias: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            filters: Vec::new(),
            selection: Selection::Sum {
                group_by: group_by.into_iter().map(Into::into).collect(),
                column: column.into(),
                multiplier,
                alias: alias.into(),
            },
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Add a predicate
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Add several predicates
    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.filters.extend(predicates);
        self
    }

    /// Add an `ORDER BY` term
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    /// Set `LIMIT`
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set `OFFSET`
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let row = Row::new()
            .with("group_name", "France")
            .with("year", 2016)
            .with("including_lucf", Value::Null);

        assert!(Predicate::eq("group_name", "France").accepts(&row));
        assert!(!Predicate::eq("group_name", "Spain").accepts(&row));
        assert!(Predicate::is_in("group_name", ["Spain", "France"]).accepts(&row));
        assert!(Predicate::not_in("group_name", ["LUCF"]).accepts(&row));
        assert!(Predicate::between("year", 2015, 2016).accepts(&row));
        assert!(!Predicate::between("year", 2017, 2018).accepts(&row));
        assert!(!Predicate::not_null("including_lucf").accepts(&row));
        assert!(Predicate::EqOrNull {
            column: "including_lucf".to_string(),
            value: FilterValue::Bool(false),
        }
        .accepts(&row));
        // absent columns read as null
        assert!(!Predicate::not_null("missing").accepts(&row));
    }

    #[test]
    fn test_sort_order() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Float(2.5),
            Value::Null,
            Value::Int(3),
            Value::Text("a".into()),
            Value::Int(1),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int(1),
                Value::Float(2.5),
                Value::Int(3),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ]
        );
    }
}
