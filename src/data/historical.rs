use std::{fs, path::Path};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::{
    constants::env::MIN_PRICES,
    error::{Result, TradingError},
    types::Data,
};

const CLOSE_COLUMN: &str = "Close";
const DATE_COLUMN: &str = "Date";

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(value, format) {
            return Some(date_time);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_close(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

/// Closing prices from a CSV file, oldest first.
///
/// A `Close` column is required. When a `Date` column is present, rows with an
/// unreadable date are dropped and the rest are sorted chronologically. Rows whose
/// close is not a positive number are dropped.
pub fn load_prices(path: &Path) -> Result<Data> {
    if !path.exists() || fs::metadata(path)?.len() == 0 {
        return Err(TradingError::MissingInput(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let close_index = column(&headers, CLOSE_COLUMN).ok_or_else(|| {
        TradingError::InvalidInput(format!("CSV must contain a column named \"{CLOSE_COLUMN}\""))
    })?;
    let date_index = column(&headers, DATE_COLUMN);

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;

        let date = match date_index {
            Some(index) => match record.get(index).and_then(parse_date) {
                Some(date) => Some(date),
                None => {
                    dropped += 1;
                    continue;
                }
            },
            None => None,
        };

        match record.get(close_index).and_then(parse_close) {
            Some(close) => rows.push((date, close)),
            None => dropped += 1,
        }
    }

    if date_index.is_some() {
        rows.sort_by_key(|(date, _)| *date);
    }

    if dropped > 0 {
        debug!(dropped, "dropped unusable price rows");
    }
    if rows.len() < MIN_PRICES {
        return Err(TradingError::InvalidInput(
            "Insufficient usable rows in CSV after cleaning".to_string(),
        ));
    }

    info!(path = %path.display(), rows = rows.len(), "loaded prices");
    Ok(rows.into_iter().map(|(_, close)| close).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_close_column_in_file_order_without_dates() {
        let (_dir, path) = write_csv("Open,Close\n1,10.5\n2,11\n3,9.25\n");
        assert_eq!(load_prices(&path).unwrap(), vec![10.5, 11.0, 9.25]);
    }

    #[test]
    fn sorts_by_date_and_drops_bad_rows() {
        let (_dir, path) = write_csv(
            "Date,Close\n\
             2024-01-03,12\n\
             not a date,99\n\
             2024-01-01,10\n\
             2024-01-02,n/a\n\
             2024-01-04,-5\n\
             2024-01-02 00:00:00,11\n",
        );
        assert_eq!(load_prices(&path).unwrap(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn missing_close_column_is_invalid() {
        let (_dir, path) = write_csv("Date,Open\n2024-01-01,1\n2024-01-02,2\n");
        assert!(matches!(
            load_prices(&path),
            Err(TradingError::InvalidInput(message)) if message.contains("Close")
        ));
    }

    #[test]
    fn too_few_rows_is_invalid() {
        let (_dir, path) = write_csv("Close\n10\nabc\n");
        assert!(matches!(load_prices(&path), Err(TradingError::InvalidInput(_))));
    }

    #[test]
    fn missing_or_empty_file_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_prices(&dir.path().join("nope.csv")),
            Err(TradingError::MissingInput(_))
        ));

        let (_dir, path) = write_csv("");
        assert!(matches!(load_prices(&path), Err(TradingError::MissingInput(_))));
    }

    #[test]
    fn parses_common_date_formats() {
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("03/01/2024").is_some());
        assert!(parse_date("2024-03-01 09:30:00").is_some());
        assert!(parse_date("2024-03-01T09:30:00Z").is_some());
        assert!(parse_date("yesterday").is_none());
    }
}
