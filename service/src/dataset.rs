use crate::adapter::AdapterError;
use crate::{DatasetInfo, Unit};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// The first CSV column, either epoch milliseconds or plain numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum XValues {
    Timestamps(Vec<i64>),
    Numbers(Vec<f64>),
}

impl XValues {
    pub fn len(&self) -> usize {
        match self {
            XValues::Timestamps(v) => v.len(),
            XValues::Numbers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_time(&self) -> bool {
        matches!(self, XValues::Timestamps(_))
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        match self {
            XValues::Timestamps(v) => v.get(idx).map(|t| *t as f64),
            XValues::Numbers(v) => v.get(idx).copied(),
        }
    }

    fn reverse(&mut self) {
        match self {
            XValues::Timestamps(v) => v.reverse(),
            XValues::Numbers(v) => v.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub filename: Option<String>,
    pub time_column: String,
    pub x: XValues,
    pub columns: Vec<Column>,
    pub unit: Unit,
}

impl RawDataset {
    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            time_column: self.time_column.clone(),
            value_columns: self.columns.iter().map(|c| c.name.clone()).collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

pub fn load_csv(path: &Path) -> Result<RawDataset, AdapterError> {
    let file = std::fs::File::open(path)?;
    let mut dataset = read_csv(file)?;
    dataset.filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);

    log::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

pub fn read_csv<R: Read>(reader: R) -> Result<RawDataset, AdapterError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AdapterError::ParseError(e.to_string()))?
        .clone();

    let mut header_iter = headers.iter();
    let time_column = header_iter
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AdapterError::ParseError("CSV has no header row".to_string()))?
        .to_string();
    let mut columns: Vec<Column> = header_iter
        .map(|name| Column {
            name: name.to_string(),
            values: Vec::new(),
        })
        .collect();

    if columns.is_empty() {
        return Err(AdapterError::ParseError(
            "CSV needs at least one value column".to_string(),
        ));
    }

    let mut raw_x = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AdapterError::ParseError(e.to_string()))?;
        let mut cells = record.iter();
        raw_x.push(cells.next().unwrap_or_default().to_string());

        for column in &mut columns {
            let value = cells
                .next()
                .and_then(|cell| cell.parse::<f64>().ok())
                .unwrap_or(f64::NAN);
            column.values.push(value);
        }
    }

    let mut x = parse_x(&raw_x)?;
    let unit = infer_unit(&x);

    let descending = match (x.get(0), x.get(x.len().saturating_sub(1))) {
        (Some(first), Some(last)) => first > last,
        _ => false,
    };
    if descending {
        x.reverse();
        for column in &mut columns {
            column.values.reverse();
        }
    }

    Ok(RawDataset {
        filename: None,
        time_column,
        x,
        columns,
        unit,
    })
}

fn parse_x(cells: &[String]) -> Result<XValues, AdapterError> {
    if let Some(timestamps) = cells
        .iter()
        .map(|cell| parse_timestamp(cell))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(XValues::Timestamps(timestamps));
    }

    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.parse::<f64>().map_err(|_| {
                AdapterError::ParseError(format!("Row {}: `{cell}` is neither a time nor a number", row + 1))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(XValues::Numbers)
}

/// Epoch milliseconds. Bare numbers are not treated as timestamps.
fn parse_timestamp(cell: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cell, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

fn infer_unit(x: &XValues) -> Unit {
    match x {
        XValues::Timestamps(ts) if ts.len() >= 2 => {
            let delta_secs = (ts[1] - ts[0]).abs() as f64 / 1_000.0;
            match Unit::from_seconds(delta_secs) {
                Unit::Number => Unit::Second,
                unit => unit,
            }
        }
        XValues::Timestamps(_) => Unit::Day,
        XValues::Numbers(_) => Unit::Number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_dates_infer_day_unit() {
        let csv = "date,price,volume\n2024-01-01,10,100\n2024-01-02,11,90\n2024-01-03,12,80\n";
        let dataset = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(dataset.time_column, "date");
        assert_eq!(dataset.unit, Unit::Day);
        assert!(dataset.x.is_time());
        assert_eq!(dataset.column("price").unwrap().values, vec![10.0, 11.0, 12.0]);
        assert_eq!(
            dataset.info().value_columns,
            vec!["price".to_string(), "volume".to_string()]
        );
    }

    #[test]
    fn descending_rows_are_reversed() {
        let csv = "t,v\n2024/01/03 00:00:00,3\n2024/01/02 00:00:00,2\n2024/01/01 00:00:00,1\n";
        let dataset = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(dataset.column("v").unwrap().values, vec![1.0, 2.0, 3.0]);
        let first = dataset.x.get(0).unwrap();
        let last = dataset.x.get(2).unwrap();
        assert!(first < last);
    }

    #[test]
    fn numeric_x_and_bad_cells() {
        let csv = "x,y\n0,1.5\n1,oops\n2,3\n";
        let dataset = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(dataset.unit, Unit::Number);
        assert_eq!(dataset.x, XValues::Numbers(vec![0.0, 1.0, 2.0]));
        assert!(dataset.column("y").unwrap().values[1].is_nan());
    }

    #[test]
    fn hourly_rfc3339() {
        let csv = "ts,v\n2024-03-01T00:00:00Z,1\n2024-03-01T01:00:00Z,2\n";
        assert_eq!(read_csv(csv.as_bytes()).unwrap().unit, Unit::Hour);
    }

    #[test]
    fn rejects_single_column() {
        assert!(matches!(
            read_csv("only\n1\n2\n".as_bytes()),
            Err(AdapterError::ParseError(_))
        ));
    }

    #[test]
    fn load_from_disk_keeps_filename() {
        let path = std::env::temp_dir().join(format!("trendsketch-{}.csv", std::process::id()));
        std::fs::write(&path, "x,y\n0,1\n1,2\n").unwrap();

        let dataset = load_csv(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(dataset.len(), 2);
        assert!(dataset.filename.unwrap().starts_with("trendsketch-"));
    }
}
