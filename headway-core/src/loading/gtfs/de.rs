use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::Error;
use crate::Secs;

/// Deserializes one GTFS CSV file. A malformed row is fatal: a feed that
/// cannot be parsed completely cannot be routed on.
pub fn deserialize_gtfs_file<T>(path: &Path) -> Result<Vec<T>, Error>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        )
    })?;
    let records = csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(records)
}

/// Like [`deserialize_gtfs_file`], but an absent file is an empty list.
/// Only `stops.txt` and `stop_times.txt` are mandatory.
pub fn deserialize_optional_gtfs_file<T>(path: &Path) -> Result<Vec<T>, Error>
where
    T: for<'de> serde::Deserialize<'de>,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    deserialize_gtfs_file(path)
}

/// Parses `HH:MM:SS` to seconds since midnight. A leading space is
/// tolerated (some feeds pad single-digit hours) and hours may exceed 24
/// for wraparound service.
pub fn parse_clock_time(raw: &str) -> Result<Secs, Error> {
    let trimmed = raw.trim_start_matches(' ');
    let mut parts = trimmed.split(':');
    let (h, m, s) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => return Err(Error::InvalidTime(raw.to_string())),
    };
    let hours: Secs = h.parse().map_err(|_| Error::InvalidTime(raw.to_string()))?;
    let minutes: Secs = m.parse().map_err(|_| Error::InvalidTime(raw.to_string()))?;
    let seconds: Secs = s.parse().map_err(|_| Error::InvalidTime(raw.to_string()))?;
    if minutes >= 60 || seconds >= 60 {
        return Err(Error::InvalidTime(raw.to_string()));
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Parses a GTFS `YYYYMMDD` date.
pub fn parse_gtfs_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| Error::InvalidDate(raw.to_string()))
}
