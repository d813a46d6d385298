use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{OrthoError, Result};

/// One GPS fix from a flight log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightLogPoint {
    pub timestamp_ms: f64,
    /// WGS84 degrees.
    pub latitude: f64,
    /// WGS84 degrees.
    pub longitude: f64,
    pub altitude: Option<f64>,
}

struct Columns {
    timestamp: usize,
    latitude: usize,
    longitude: usize,
    altitude: Option<usize>,
}

impl Columns {
    fn from_header(header: &str, path: &Path) -> Result<Self> {
        let names: Vec<String> = split_row(header)
            .iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        let find = |name: &str| names.iter().position(|n| n == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| OrthoError::FlightLog {
                path: path.to_path_buf(),
                line: 1,
                message: format!("missing required column '{name}'"),
            })
        };

        Ok(Self {
            timestamp: require("timestamp_ms")?,
            latitude: require("latitude")?,
            longitude: require("longitude")?,
            altitude: find("altitude"),
        })
    }
}

/// Split one CSV record. Fields may be double-quoted, with commas inside
/// quotes kept and `""` read as a literal quote. Records cannot span lines.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Parse CSV text with at least `timestamp_ms`, `latitude`, `longitude`
/// columns. Header names are matched case-insensitively; other columns are
/// ignored and blank lines skipped. `path` is only used in error messages.
pub fn parse_flight_log(text: &str, path: &Path) -> Result<Vec<FlightLogPoint>> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns = Columns::from_header(header.trim_start_matches('\u{feff}'), path)?;

    let mut points = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let fields = split_row(line);
        let field = |col: usize, name: &str| -> Result<f64> {
            let raw = fields.get(col).map(String::as_str).unwrap_or("");
            raw.parse::<f64>().map_err(|_| OrthoError::FlightLog {
                path: path.to_path_buf(),
                line: line_no,
                message: format!("invalid {name} value '{raw}'"),
            })
        };

        let altitude = match columns.altitude {
            Some(col) if fields.get(col).is_some_and(|v| !v.is_empty()) => {
                Some(field(col, "altitude")?)
            }
            _ => None,
        };

        points.push(FlightLogPoint {
            timestamp_ms: field(columns.timestamp, "timestamp_ms")?,
            latitude: field(columns.latitude, "latitude")?,
            longitude: field(columns.longitude, "longitude")?,
            altitude,
        });
    }

    Ok(points)
}

pub fn read_flight_log(path: &Path) -> Result<Vec<FlightLogPoint>> {
    let text = std::fs::read_to_string(path)?;
    parse_flight_log(&text, path)
}

/// CSV files in `dir`, sorted by filename.
pub fn list_flight_logs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Merge every flight log in `dir` and sort by timestamp.
///
/// The sort is stable, so duplicate timestamps keep file order. An
/// unreadable directory yields no records.
pub fn load_flight_logs(dir: &Path) -> Result<Vec<FlightLogPoint>> {
    let files = match list_flight_logs(dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read flight log directory");
            return Ok(Vec::new());
        }
    };

    let mut points = Vec::new();
    for file in &files {
        let mut records = read_flight_log(file)?;
        debug!(file = %file.display(), records = records.len(), "Read flight log");
        points.append(&mut records);
    }

    sort_flight_log(&mut points);
    Ok(points)
}

pub fn sort_flight_log(points: &mut [FlightLogPoint]) {
    points.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_case_insensitive_and_extra_columns_ignored() {
        let text = "Speed,Longitude,TIMESTAMP_MS,Latitude\n3.5,20.0,0,10.0\n4.0,20.001,1000,10.001\n";
        let points = parse_flight_log(text, Path::new("log.csv")).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].timestamp_ms, 1000.0);
        assert_eq!(points[1].longitude, 20.001);
        assert_eq!(points[1].altitude, None);
    }

    #[test]
    fn altitude_is_optional_per_row() {
        let text = "timestamp_ms,latitude,longitude,altitude\n0,1,2,100\n5,1,2,\n";
        let points = parse_flight_log(text, Path::new("log.csv")).unwrap();
        assert_eq!(points[0].altitude, Some(100.0));
        assert_eq!(points[1].altitude, None);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_flight_log("timestamp_ms,latitude\n0,1\n", Path::new("a.csv")).unwrap_err();
        assert!(err.to_string().contains("longitude"), "got: {err}");
    }

    #[test]
    fn bad_value_reports_line() {
        let text = "timestamp_ms,latitude,longitude\n0,1,2\n\n7,north,2\n";
        match parse_flight_log(text, Path::new("a.csv")) {
            Err(OrthoError::FlightLog { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn quoted_fields_keep_their_commas() {
        let text = "timestamp_ms,note,latitude,longitude\n\
                    0,\"takeoff, pad \"\"A\"\"\",\"10.5\",20.25\n";
        let points = parse_flight_log(text, Path::new("log.csv")).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].latitude, 10.5);
        assert_eq!(points[0].longitude, 20.25);
        assert_eq!(
            split_row(r#"1,"a, b","say ""hi""""#),
            vec!["1", "a, b", r#"say "hi""#]
        );
    }

    #[test]
    fn empty_text_has_no_records() {
        assert!(parse_flight_log("", Path::new("a.csv")).unwrap().is_empty());
    }
}
