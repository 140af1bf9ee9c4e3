use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use thiserror::Error;
use tzf_rs::DefaultFinder;

/// Format name that selects lenient ISO 8601 parsing instead of a strftime
/// pattern.
pub const ISO8601: &str = "ISO8601";

#[derive(Debug, Error, PartialEq)]
pub enum TemporalError {
    #[error("Time column {column} is not a datetime column: cannot parse {value:?} as {format}")]
    TimeColumnType {
        column: String,
        value: String,
        format: String,
    },
    #[error(
        "{id} has no temporal information. Provide datetime, start_datetime and end_datetime, collection_date or a time column"
    )]
    Missing { id: String },
}

/// Declared time information of a source or collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFields {
    pub datetime: Option<DateTime<Utc>>,
    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,
}

impl TimeFields {
    pub fn range(&self) -> Option<TimeRange> {
        match (self.start_datetime, self.end_datetime) {
            (Some(start), Some(end)) => Some(TimeRange { start, end }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn instant(at: DateTime<Utc>) -> Self {
        TimeRange { start: at, end: at }
    }

    pub fn union(self, other: TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Time stamped on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemTime {
    pub datetime: DateTime<Utc>,
    pub range: TimeRange,
}

static TIMEZONES: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

/// IANA timezone covering a WGS84 position, UTC where none does.
pub fn timezone_at(lon: f64, lat: f64) -> Tz {
    TIMEZONES.get_tz_name(lon, lat).parse().unwrap_or(Tz::UTC)
}

/// Converts a local wall clock reading to UTC. Readings skipped by a daylight
/// saving change are moved past the gap.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, timezone: Tz) -> DateTime<Utc> {
    let local = date.and_time(time);
    timezone
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| timezone.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| local.and_utc())
}

/// Resolves the time of one item. Explicit start and end win, then an explicit
/// datetime, then the extent of the data's time column.
pub fn resolve_item_time(
    id: &str,
    fields: &TimeFields,
    column_range: Option<TimeRange>,
) -> Result<ItemTime, TemporalError> {
    if let Some(range) = fields.range() {
        return Ok(ItemTime {
            datetime: fields.datetime.unwrap_or(range.end),
            range,
        });
    }
    if let Some(datetime) = fields.datetime {
        return Ok(ItemTime {
            datetime,
            range: TimeRange::instant(datetime),
        });
    }
    match column_range {
        Some(range) => Ok(ItemTime {
            datetime: range.end,
            range,
        }),
        None => Err(TemporalError::Missing { id: id.to_string() }),
    }
}

/// Resolves a collection interval. An explicit interval is used verbatim and
/// item ranges are only consulted without one. With neither, the interval is
/// the current instant.
pub fn resolve_collection_range<I>(fields: &TimeFields, items: I) -> TimeRange
where
    I: IntoIterator<Item = TimeRange>,
{
    if let Some(range) = fields.range() {
        return range;
    }
    if let Some(datetime) = fields.datetime {
        return TimeRange::instant(datetime);
    }
    items
        .into_iter()
        .reduce(TimeRange::union)
        .unwrap_or_else(|| TimeRange::instant(Utc::now()))
}

/// Min/max of a time column. Every non-empty value must parse with `format`.
pub fn column_range<'a, I>(
    column: &str,
    values: I,
    format: &str,
) -> Result<Option<TimeRange>, TemporalError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut range: Option<TimeRange> = None;
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let parsed =
            parse_timestamp(value, format).ok_or_else(|| TemporalError::TimeColumnType {
                column: column.to_string(),
                value: value.to_string(),
                format: format.to_string(),
            })?;
        let instant = TimeRange::instant(parsed);
        range = Some(range.map_or(instant, |r| r.union(instant)));
    }
    Ok(range)
}

/// Parses a timestamp either leniently as ISO 8601 or with a strftime
/// pattern. Timestamps without an offset are read as UTC.
pub fn parse_timestamp(value: &str, format: &str) -> Option<DateTime<Utc>> {
    if format.eq_ignore_ascii_case(ISO8601) {
        return parse_iso8601(value);
    }
    if let Ok(dt) = DateTime::parse_from_str(value, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn de_opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_iso8601(raw.trim())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}"))),
    }
}
