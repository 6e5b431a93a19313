use std::io::Read;

use anyhow::{anyhow, Result};
use serde_json::{Number, Value};

use crate::spec::Row;

/// Read CSV records as rows keyed by header. Numeric cells become numbers and
/// blank cells become null; everything else stays text.
pub fn rows_from_csv<R: Read>(reader: R) -> crate::error::Result<Vec<Row>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.clone(), cell_value(cell)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    match cell.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(cell.to_string()),
    }
}

/// Rows from a JSON array of objects.
pub fn rows_from_json(value: &Value) -> Result<Vec<Row>> {
    let array = value
        .as_array()
        .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

    array
        .iter()
        .map(|item| {
            item.as_object()
                .cloned()
                .ok_or_else(|| anyhow!("Items in array must be objects"))
        })
        .collect()
}
