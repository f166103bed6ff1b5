//! Ranking Engine
//!
//! Computes the quick-select suggestions attached to ranked dimensions: the
//! N groups with the largest and the smallest value at the latest period
//! present under the request's filters.
//!
//! Input rows are the grouped sums `(group, period, value)` of the ranking
//! query. Rows with a null or non-finite value never compete. Ties are broken
//! by group name ascending, so the output is a pure function of the rows.

use crate::color::hashed_color;
use crate::config::RankingSettings;
use crate::storage::Row;
use crate::types::{GroupType, MultiSelect, NameColor};
use std::cmp::Ordering;

/// Top and bottom groups at the latest period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Latest period seen among the candidates
    pub latest: Option<i64>,
    /// Largest values first
    pub top: Vec<String>,
    /// Smallest values first
    pub bottom: Vec<String>,
}

/// Rank groups of `rows`
///
/// Without a `period_column` every row competes (periodless tables).
pub fn rank(
    rows: &[Row],
    group_column: &str,
    period_column: Option<&str>,
    value_column: &str,
    n: usize,
) -> Ranking {
    let candidates: Vec<(&Row, &str, f64)> = rows
        .iter()
        .filter_map(|row| {
            let group = row.get(group_column).as_str()?;
            let value = row.get(value_column).as_f64().filter(|v| v.is_finite())?;
            Some((row, group, value))
        })
        .collect();

    let latest = period_column.and_then(|column| {
        candidates
            .iter()
            .filter_map(|(row, _, _)| row.get(column).as_i64())
            .max()
    });

    let mut scored: Vec<(&str, f64)> = candidates
        .iter()
        .filter(|(row, _, _)| match (period_column, latest) {
            (Some(column), Some(latest)) => row.get(column).as_i64() == Some(latest),
            _ => true,
        })
        .map(|(_, group, value)| (*group, *value))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top = scored.iter().take(n).map(|(g, _)| g.to_string()).collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    let bottom = scored.iter().take(n).map(|(g, _)| g.to_string()).collect();

    Ranking {
        latest,
        top,
        bottom,
    }
}

/// Display names of the two quick-select lists
pub fn labels(scope: GroupType, has_period: bool) -> (String, String) {
    let suffix = if has_period { " (based on last year)" } else { "" };
    (
        format!("Quickselect top {}{}", scope.plural(), suffix),
        format!("Quickselect flop {}{}", scope.plural(), suffix),
    )
}

/// Quick-select lists for a ranked dimension
pub fn quick_selects(
    rows: &[Row],
    group_column: &str,
    period_column: Option<&str>,
    value_column: &str,
    settings: &RankingSettings,
) -> Vec<MultiSelect> {
    let ranking = rank(rows, group_column, period_column, value_column, settings.top_n);
    let (top_label, flop_label) = labels(settings.group_type, period_column.is_some());
    vec![
        MultiSelect {
            name: top_label,
            data: colored(&ranking.top),
        },
        MultiSelect {
            name: flop_label,
            data: colored(&ranking.bottom),
        },
    ]
}

fn colored(names: &[String]) -> Vec<NameColor> {
    names
        .iter()
        .map(|name| NameColor {
            name: name.clone(),
            color: hashed_color(name),
        })
        .collect()
}

/// Descending order of two values, nulls last
pub fn value_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Value;

    fn row(group: &str, year: i64, value: Option<f64>) -> Row {
        Row::new()
            .with("group_name", group)
            .with("year", year)
            .with("value", value)
    }

    #[test]
    fn test_latest_period_only() {
        let rows = vec![
            row("France", 2016, Some(100.0)),
            row("France", 2017, Some(1.0)),
            row("Spain", 2017, Some(2.0)),
            row("Italy", 2017, Some(3.0)),
        ];
        let ranking = rank(&rows, "group_name", Some("year"), "value", 2);
        assert_eq!(ranking.latest, Some(2017));
        assert_eq!(ranking.top, vec!["Italy", "Spain"]);
        assert_eq!(ranking.bottom, vec!["France", "Spain"]);
    }

    #[test]
    fn test_nulls_excluded() {
        let rows = vec![
            row("France", 2017, None),
            row("Spain", 2017, Some(2.0)),
            row("Chad", 2018, None),
        ];
        let ranking = rank(&rows, "group_name", Some("year"), "value", 10);
        // a null-only period does not become the latest
        assert_eq!(ranking.latest, Some(2017));
        assert_eq!(ranking.top, vec!["Spain"]);
        assert_eq!(ranking.bottom, vec!["Spain"]);
    }

    #[test]
    fn test_ties_by_name() {
        let rows = vec![
            row("Spain", 2017, Some(5.0)),
            row("Austria", 2017, Some(5.0)),
            row("Chad", 2017, Some(5.0)),
        ];
        let ranking = rank(&rows, "group_name", Some("year"), "value", 2);
        assert_eq!(ranking.top, vec!["Austria", "Chad"]);
        assert_eq!(ranking.bottom, vec!["Austria", "Chad"]);

        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(rank(&reversed, "group_name", Some("year"), "value", 2), ranking);
    }

    #[test]
    fn test_periodless() {
        let rows = vec![
            Row::new().with("country", "France").with("value", 3.0),
            Row::new().with("country", "Spain").with("value", 4.0),
            Row::new().with("country", Value::Null).with("value", 9.0),
        ];
        let ranking = rank(&rows, "country", None, "value", 10);
        assert_eq!(ranking.latest, None);
        assert_eq!(ranking.top, vec!["Spain", "France"]);
    }

    #[test]
    fn test_labels() {
        let settings = RankingSettings::default();
        let selects = quick_selects(
            &[row("France", 2017, Some(1.0))],
            "group_name",
            Some("year"),
            "value",
            &settings,
        );
        assert_eq!(selects[0].name, "Quickselect top countries (based on last year)");
        assert_eq!(selects[1].name, "Quickselect flop countries (based on last year)");
        assert_eq!(selects[0].data[0].color, hashed_color("France"));

        let (top, _) = labels(GroupType::Zone, false);
        assert_eq!(top, "Quickselect top zones");
    }

    #[test]
    fn test_value_order() {
        let mut values = vec![Some(1.0), None, Some(3.0)];
        values.sort_by(|a, b| value_order(*a, *b));
        assert_eq!(values, vec![Some(3.0), Some(1.0), None]);
    }
}
