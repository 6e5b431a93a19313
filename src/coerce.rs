//! Value coercion shared by every renderer: numeric conversion, cell text and
//! row ordering.

use std::borrow::Borrow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::spec::{Row, SortOrder};

/// Coerce a cell to a finite number.
///
/// Strings are trimmed and parsed; the empty string is not numeric. Booleans
/// count as 1/0. Null, missing and non-finite values yield `None`.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn field_number(row: &Row, field: &str) -> Option<f64> {
    to_number(row.get(field))
}

/// True when a cell is missing or explicitly null.
pub fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Plain string form of a value, the way a popup or lookup key shows it.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => number_string(f),
            None => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Shortest decimal form, without a trailing ".0" on integral values.
pub fn number_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Table cell text: blank for null/missing, grouped digits for numbers,
/// string form for everything else.
pub fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => format_grouped(f),
            None => n.to_string(),
        },
        Some(other) => display_string(other),
    }
}

/// en-US style grouping with at most three fraction digits.
pub fn format_grouped(n: f64) -> String {
    if !n.is_finite() {
        return if n.is_nan() {
            "NaN".to_string()
        } else if n > 0.0 {
            "∞".to_string()
        } else {
            "-∞".to_string()
        };
    }

    // No fraction digits survive past 1e15; scaling by 1000 can overflow.
    let rounded = if n.abs() >= 1e15 {
        n
    } else {
        (n * 1000.0).round() / 1000.0
    };
    if rounded == 0.0 {
        return "0".to_string();
    }

    let fixed = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 4);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

// Rank of a value kind within the sort order: numbers (and booleans) first,
// then strings, then anything structured.
fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) | Value::Object(_) => 3,
    }
}

fn scalar_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Total order over cell values used for every sort in the crate.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (kind_rank(a), kind_rank(b)) {
        (1, 1) => scalar_number(a).total_cmp(&scalar_number(b)),
        (2, 2) => a.as_str().unwrap_or("").cmp(b.as_str().unwrap_or("")),
        (3, 3) => a.to_string().cmp(&b.to_string()),
        (ra, rb) => ra.cmp(&rb),
    }
}

/// Order rows by `field`.
///
/// Rows whose field is null or missing stay at their input index. The other
/// rows are stably sorted and fill the remaining slots, so ties and null rows
/// both keep their relative input order.
pub fn sort_rows<'a, R>(rows: &'a [R], field: &str, order: SortOrder) -> Vec<&'a R>
where
    R: Borrow<Row>,
{
    let keyed: Vec<(usize, &Value)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| match row.borrow().get(field) {
            Some(v) if !v.is_null() => Some((i, v)),
            _ => None,
        })
        .collect();

    let mut sorted = keyed.clone();
    sorted.sort_by(|(_, a), (_, b)| {
        let ord = compare_values(a, b);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let mut out: Vec<&R> = rows.iter().collect();
    for ((slot, _), (src, _)) in keyed.iter().zip(sorted.iter()) {
        out[*slot] = &rows[*src];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(Some(&json!(4))), Some(4.0));
        assert_eq!(to_number(Some(&json!(" 2.5 "))), Some(2.5));
        assert_eq!(to_number(Some(&json!(true))), Some(1.0));
        assert_eq!(to_number(Some(&json!("N/A"))), None);
        assert_eq!(to_number(Some(&json!(""))), None);
        assert_eq!(to_number(Some(&json!("inf"))), None);
        assert_eq!(to_number(Some(&Value::Null)), None);
        assert_eq!(to_number(None), None);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(1234567.0), "1,234,567");
        assert_eq!(format_grouped(1234.5678), "1,234.568");
        assert_eq!(format_grouped(-9876.5), "-9,876.5");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(0.0001), "0");
        assert_eq!(format_grouped(100000.0), "100,000");
        assert_eq!(format_grouped(1e15), "1,000,000,000,000,000");
        let huge = format_grouped(-(2f64.powi(1020)));
        assert!(huge.starts_with("-11,235,582,092"));
        assert_eq!(huge.chars().filter(|c| c.is_ascii_digit()).count(), 308);
        assert!(!huge.contains('∞') && !huge.contains("inf"));
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(None), "");
        assert_eq!(format_cell(Some(&Value::Null)), "");
        assert_eq!(format_cell(Some(&json!(12000))), "12,000");
        assert_eq!(format_cell(Some(&json!("12000"))), "12000");
        assert_eq!(format_cell(Some(&json!(false))), "false");
    }

    #[test]
    fn test_display_string() {
        assert_eq!(display_string(&json!(4.0)), "4");
        assert_eq!(display_string(&json!(4.25)), "4.25");
        assert_eq!(display_string(&json!("Mon")), "Mon");
        assert_eq!(display_string(&Value::Null), "null");
    }

    #[test]
    fn test_compare_values_mixed_kinds() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(99), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Greater);
    }

    #[test]
    fn test_sort_rows_desc() {
        let rows = vec![
            row(json!({"k": "a", "count": 4})),
            row(json!({"k": "b", "count": 9})),
            row(json!({"k": "c", "count": 7})),
        ];
        let sorted = sort_rows(&rows, "count", SortOrder::Desc);
        let keys: Vec<&str> = sorted.iter().map(|r| r["k"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_rows_nulls_keep_position() {
        let rows = vec![
            row(json!({"k": "a", "n": 3})),
            row(json!({"k": "b"})),
            row(json!({"k": "c", "n": 1})),
            row(json!({"k": "d", "n": null})),
            row(json!({"k": "e", "n": 2})),
        ];
        let sorted = sort_rows(&rows, "n", SortOrder::Asc);
        let keys: Vec<&str> = sorted.iter().map(|r| r["k"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["c", "b", "e", "d", "a"]);
    }

    #[test]
    fn test_sort_rows_is_stable_for_ties() {
        let rows = vec![
            row(json!({"k": "a", "n": 1})),
            row(json!({"k": "b", "n": 1})),
            row(json!({"k": "c", "n": 0})),
        ];
        let desc = sort_rows(&rows, "n", SortOrder::Desc);
        let keys: Vec<&str> = desc.iter().map(|r| r["k"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
