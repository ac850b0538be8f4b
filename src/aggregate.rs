//! # Data Binding & Aggregation Engine
//!
//! Turns flat dataset rows into chart-ready aggregates. A binding names a
//! dataset, a label field, a value field, and an aggregation method; the
//! engine groups rows by the label field's string value (first-seen order)
//! and reduces each group's parsed values with the chosen method.
//!
//! The engine never fetches data. Rows arrive through the [`DatasetSource`]
//! port, already materialized, and the whole computation is synchronous and
//! pure.
//!
//! Coercion is deliberately lenient, matching the product's established
//! behavior: labels that are null, `false`, `0`, or empty strings skip the
//! row entirely; values that fail to parse as numbers count as `0`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A dataset row: field name to primitive value.
pub type Row = serde_json::Map<String, Value>;

/// Port to the external dataset store. The aggregation engine consumes
/// already-fetched rows; this trait is how the export layer obtains them.
pub trait DatasetSource {
    fn fetch_rows(&self, dataset_id: &str, limit: usize) -> Result<Vec<Row>>;
}

/// How a group's values are reduced to a single number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Avg,
    Count,
    Max,
    Min,
}

/// The association of a section with a dataset's fields and a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBinding {
    pub dataset_id: String,
    pub label_field: String,
    pub value_field: String,
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl DataBinding {
    /// A binding is complete iff dataset, label field, and value field are
    /// all set. Incomplete bindings never produce aggregates.
    pub fn is_complete(&self) -> bool {
        !self.dataset_id.is_empty()
            && !self.label_field.is_empty()
            && !self.value_field.is_empty()
    }

    /// Run the engine over `rows`, or yield nothing for an incomplete
    /// binding.
    pub fn bind(&self, rows: &[Row]) -> Option<BindingSummary> {
        if !self.is_complete() {
            return None;
        }
        Some(summarize(
            rows,
            &self.label_field,
            &self.value_field,
            self.aggregation,
        ))
    }
}

/// One grouped, summarized (label, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    pub name: String,
    /// The selected statistic, rounded to 2 decimal places.
    pub value: f64,
}

/// A presentation-ready table row derived from one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTableRow {
    pub label: String,
    /// The group value with thousands grouping, e.g. `1,234.5`.
    pub formatted_value: String,
    /// The group's rounded percentage of the sum of all groups' selected
    /// values, e.g. `86%`.
    pub share: String,
}

/// The first raw parsed values seen for one group, used for inline trend
/// previews. Independent of the aggregation method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparklineSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// How many raw values a sparkline keeps per group.
pub const SPARKLINE_LEN: usize = 7;

/// Everything the engine derives from one pass over the rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingSummary {
    pub points: Vec<AggregatedPoint>,
    pub table: Vec<DerivedTableRow>,
    pub sparklines: Vec<SparklineSeries>,
}

impl BindingSummary {
    /// An empty summary means the consuming section falls back to its
    /// built-in placeholder content.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

struct Group {
    sum: f64,
    count: usize,
    min: f64,
    max: f64,
    raw: Vec<f64>,
}

impl Group {
    fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: 0.0,
            max: 0.0,
            raw: Vec::new(),
        }
    }

    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
        if self.raw.len() < SPARKLINE_LEN {
            self.raw.push(value);
        }
    }

    fn select(&self, method: Aggregation) -> f64 {
        match method {
            Aggregation::Sum => self.sum,
            Aggregation::Avg => {
                if self.count == 0 {
                    0.0
                } else {
                    self.sum / self.count as f64
                }
            }
            Aggregation::Count => self.count as f64,
            Aggregation::Max => self.max,
            Aggregation::Min => self.min,
        }
    }
}

/// Group and reduce rows. See the module docs for the coercion policy.
///
/// Group order is the first-seen order of distinct label values; the share
/// column is computed against the sum of all groups' *selected* values, not
/// raw row counts.
pub fn summarize(
    rows: &[Row],
    label_field: &str,
    value_field: &str,
    method: Aggregation,
) -> BindingSummary {
    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let Some(label) = row.get(label_field).and_then(label_text) else {
            continue;
        };
        let value = row.get(value_field).map(coerce_number).unwrap_or(0.0);

        let idx = *index.entry(label.clone()).or_insert_with(|| {
            names.push(label);
            groups.push(Group::new());
            groups.len() - 1
        });
        groups[idx].push(value);
    }

    let points: Vec<AggregatedPoint> = names
        .into_iter()
        .zip(groups.iter())
        .map(|(name, group)| AggregatedPoint {
            name,
            value: round2(group.select(method)),
        })
        .collect();

    let total: f64 = points.iter().map(|p| p.value).sum();
    let table = points
        .iter()
        .map(|p| DerivedTableRow {
            label: p.name.clone(),
            formatted_value: format_grouped(p.value),
            share: format!("{}%", share_percent(p.value, total)),
        })
        .collect();

    let sparklines = points
        .iter()
        .zip(groups)
        .map(|(p, group)| SparklineSeries {
            name: p.name.clone(),
            values: group.raw,
        })
        .collect();

    BindingSummary {
        points,
        table,
        sparklines,
    }
}

/// Points-only convenience over [`summarize`].
pub fn aggregate(
    rows: &[Row],
    label_field: &str,
    value_field: &str,
    method: Aggregation,
) -> Vec<AggregatedPoint> {
    summarize(rows, label_field, value_field, method).points
}

/// The string form of a label value, or `None` for falsy values (which
/// skip the row).
fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(0.0);
            if f == 0.0 || f.is_nan() {
                None
            } else {
                Some(n.to_string())
            }
        }
        Value::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        // Arrays and objects are truthy; stringify them as-is.
        other => Some(other.to_string()),
    }
}

/// Lenient numeric coercion: numbers pass through, strings are parsed,
/// everything else (and parse failures) becomes 0.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn share_percent(value: f64, total: f64) -> i64 {
    if total == 0.0 {
        0
    } else {
        (value / total * 100.0).round() as i64
    }
}

/// Thousands-grouped display form of a 2-decimal value, trailing zeros
/// trimmed: `1234567.5` → `1,234,567.5`, `30.0` → `30`.
fn format_grouped(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let int_part = cents / 100;
    let frac = cents % 100;

    let digits = int_part.to_string();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if frac != 0 {
        if frac % 10 == 0 {
            out.push_str(&format!(".{}", frac / 10));
        } else {
            out.push_str(&format!(".{:02}", frac));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[(&str, &str)]) -> Vec<Row> {
        values
            .iter()
            .map(|(region, sales)| {
                let Value::Object(map) = json!({ "region": region, "sales": sales }) else {
                    unreachable!()
                };
                map
            })
            .collect()
    }

    #[test]
    fn test_sum_and_avg_per_group() {
        let rows = rows(&[("N", "10"), ("N", "20"), ("S", "5")]);

        let sum = aggregate(&rows, "region", "sales", Aggregation::Sum);
        assert_eq!(sum.len(), 2);
        assert_eq!((sum[0].name.as_str(), sum[0].value), ("N", 30.0));
        assert_eq!((sum[1].name.as_str(), sum[1].value), ("S", 5.0));

        let avg = aggregate(&rows, "region", "sales", Aggregation::Avg);
        assert_eq!((avg[0].name.as_str(), avg[0].value), ("N", 15.0));
        assert_eq!((avg[1].name.as_str(), avg[1].value), ("S", 5.0));
    }

    #[test]
    fn test_grouping_completeness() {
        // Per-group counts must add up to the number of rows with a
        // truthy label.
        let mut data = rows(&[("a", "1"), ("b", "2"), ("a", "3"), ("c", "x")]);
        let Value::Object(no_label) = json!({ "region": "", "sales": "9" }) else {
            unreachable!()
        };
        data.push(no_label);

        let counts = aggregate(&data, "region", "sales", Aggregation::Count);
        let grouped: f64 = counts.iter().map(|p| p.value).sum();
        assert_eq!(grouped, 4.0);
    }

    #[test]
    fn test_avg_consistency() {
        let data = rows(&[("a", "3"), ("a", "4"), ("b", "10"), ("b", "0")]);
        let sums = aggregate(&data, "region", "sales", Aggregation::Sum);
        let counts = aggregate(&data, "region", "sales", Aggregation::Count);
        let avgs = aggregate(&data, "region", "sales", Aggregation::Avg);
        for i in 0..avgs.len() {
            assert_eq!(avgs[i].value, sums[i].value / counts[i].value);
        }
    }

    #[test]
    fn test_falsy_labels_skip_rows() {
        let data: Vec<Row> = [
            json!({ "k": null, "v": 1 }),
            json!({ "k": false, "v": 1 }),
            json!({ "k": 0, "v": 1 }),
            json!({ "k": "", "v": 1 }),
            json!({ "v": 1 }),
            json!({ "k": "kept", "v": 1 }),
        ]
        .into_iter()
        .map(|v| {
            let Value::Object(map) = v else { unreachable!() };
            map
        })
        .collect();

        let points = aggregate(&data, "k", "v", Aggregation::Count);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "kept");
        assert_eq!(points[0].value, 1.0);
    }

    #[test]
    fn test_non_numeric_values_coerce_to_zero() {
        let data = rows(&[("a", "oops"), ("a", "2.5")]);
        let sum = aggregate(&data, "region", "sales", Aggregation::Sum);
        assert_eq!(sum[0].value, 2.5);
        let min = aggregate(&data, "region", "sales", Aggregation::Min);
        assert_eq!(min[0].value, 0.0);
    }

    #[test]
    fn test_empty_rows_yield_empty_summary() {
        let summary = summarize(&[], "region", "sales", Aggregation::Sum);
        assert!(summary.is_empty());
        assert!(summary.table.is_empty());
        assert!(summary.sparklines.is_empty());
    }

    #[test]
    fn test_incomplete_binding_never_aggregates() {
        let binding = DataBinding {
            dataset_id: "ds-1".to_string(),
            label_field: "region".to_string(),
            value_field: String::new(),
            aggregation: Aggregation::Sum,
        };
        assert!(!binding.is_complete());
        assert!(binding.bind(&rows(&[("N", "10")])).is_none());
    }

    #[test]
    fn test_share_against_selected_totals() {
        let data = rows(&[("N", "10"), ("N", "20"), ("S", "5")]);
        let summary = summarize(&data, "region", "sales", Aggregation::Sum);
        // Total 35: N = round(30/35*100) = 86%, S = round(5/35*100) = 14%.
        assert_eq!(summary.table[0].share, "86%");
        assert_eq!(summary.table[1].share, "14%");
    }

    #[test]
    fn test_sparklines_cap_at_seven_raw_values() {
        let data = rows(&[
            ("a", "1"),
            ("a", "2"),
            ("a", "3"),
            ("a", "4"),
            ("a", "5"),
            ("a", "6"),
            ("a", "7"),
            ("a", "8"),
        ]);
        // Raw values, not aggregates; method must not matter.
        for method in [Aggregation::Sum, Aggregation::Max] {
            let summary = summarize(&data, "region", "sales", method);
            assert_eq!(
                summary.sparklines[0].values,
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
            );
        }
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let data = rows(&[("a", "1"), ("a", "1"), ("a", "1")]);
        let Value::Object(extra) = json!({ "region": "a", "sales": "0.1" }) else {
            unreachable!()
        };
        let mut data = data;
        data.push(extra);
        let avg = aggregate(&data, "region", "sales", Aggregation::Avg);
        // 3.1 / 4 = 0.775 → 0.78
        assert_eq!(avg[0].value, 0.78);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(1234567.5), "1,234,567.5");
        assert_eq!(format_grouped(30.0), "30");
        assert_eq!(format_grouped(-1234.56), "-1,234.56");
        assert_eq!(format_grouped(0.05), "0.05");
    }
}
