//! JSON shapes of persisted documents and their conversion to the domain model.
//!
//! Availability is stored per weekday in 12-hour form (`"09:00"` + `"am"`);
//! booking start times are stored in 24-hour form (`"14:00"`).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::lifecycle::{validate_duration, validate_stars};
use crate::engine::ValidationError;
use crate::model::*;
use crate::time::{format_24h, from_minutes, parse_24h, to_minutes};

#[derive(Debug)]
pub enum RecordError {
    Json(serde_json::Error),
    Invalid(ValidationError),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Json(e) => write!(f, "malformed record: {e}"),
            RecordError::Invalid(e) => write!(f, "invalid record: {e}"),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Json(e) => Some(e),
            RecordError::Invalid(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(e: serde_json::Error) -> Self {
        RecordError::Json(e)
    }
}

impl From<ValidationError> for RecordError {
    fn from(e: ValidationError) -> Self {
        RecordError::Invalid(e)
    }
}

// ── Weekly availability ─────────────────────────────────────────

/// One weekday as stored. Every field is optional on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(alias = "inicio")]
    pub start: Option<String>,
    #[serde(alias = "inicioPeriodo")]
    pub start_period: Option<String>,
    #[serde(alias = "fin")]
    pub end: Option<String>,
    #[serde(alias = "finPeriodo")]
    pub end_period: Option<String>,
}

impl DayRecord {
    pub fn from_interval(interval: Interval) -> Self {
        let (start, start_period) = from_minutes(interval.start);
        let (end, end_period) = from_minutes(interval.end);
        Self {
            start: Some(start),
            start_period: Some(start_period.to_string()),
            end: Some(end),
            end_period: Some(end_period.to_string()),
        }
    }

    /// `Ok(None)` if any field is missing; `Err` if present but unusable.
    pub fn to_interval(&self) -> Result<Option<Interval>, ValidationError> {
        let (Some(start), Some(start_period), Some(end), Some(end_period)) = (
            self.start.as_deref(),
            self.start_period.as_deref(),
            self.end.as_deref(),
            self.end_period.as_deref(),
        ) else {
            return Ok(None);
        };
        let start = to_minutes(start, start_period.parse()?)?;
        let end = to_minutes(end, end_period.parse()?)?;
        Interval::new(start, end).map(Some)
    }
}

/// Stored weekly map: weekday key to entry, `null` for days off.
pub type WeeklyRecord = BTreeMap<String, Option<DayRecord>>;

/// Build availability from a stored map.
///
/// Entries with a missing field are skipped quietly; entries that are present
/// but malformed or inverted, and unknown day keys, are skipped with a warning.
pub fn availability_from_record(record: &WeeklyRecord) -> WeeklyAvailability {
    let mut weekly = WeeklyAvailability::default();
    for (key, entry) in record {
        let Some(day) = Day::from_key(key) else {
            tracing::warn!("ignoring availability for unknown day {key:?}");
            continue;
        };
        let Some(entry) = entry else { continue };
        match entry.to_interval() {
            Ok(interval) => weekly.set(day, interval),
            Err(e) => tracing::warn!("ignoring {} availability: {e}", day.as_str()),
        }
    }
    weekly
}

/// All seven days, days off as `null`.
pub fn availability_to_record(weekly: &WeeklyAvailability) -> WeeklyRecord {
    Day::ALL
        .iter()
        .map(|&day| (day.as_str().to_string(), weekly.get(day).map(DayRecord::from_interval)))
        .collect()
}

pub fn parse_availability(json: &str) -> Result<WeeklyAvailability, RecordError> {
    let record: WeeklyRecord = serde_json::from_str(json)?;
    Ok(availability_from_record(&record))
}

pub fn availability_json(weekly: &WeeklyAvailability) -> Result<String, RecordError> {
    Ok(serde_json::to_string(&availability_to_record(weekly))?)
}

// ── Booking ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: Ulid,
    pub requester_id: Ulid,
    pub provider_id: Ulid,
    pub date: NaiveDate,
    /// 24-hour `HH:MM`.
    pub start_time: String,
    pub duration_hours: u32,
    pub place: String,
    #[serde(default)]
    pub message: String,
    pub state: BookingState,
    #[serde(default)]
    pub rated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u8>,
}

impl From<&BookingRequest> for BookingRecord {
    fn from(b: &BookingRequest) -> Self {
        Self {
            id: b.id,
            requester_id: b.requester_id,
            provider_id: b.provider_id,
            date: b.date,
            start_time: format_24h(b.start_time),
            duration_hours: b.duration_hours,
            place: b.place.clone(),
            message: b.message.clone(),
            state: b.state,
            rated: b.is_rated(),
            stars: b.rating,
        }
    }
}

impl TryFrom<BookingRecord> for BookingRequest {
    type Error = ValidationError;

    /// A `rated` flag without stars cannot be represented and is refused.
    fn try_from(r: BookingRecord) -> Result<Self, Self::Error> {
        validate_duration(r.duration_hours)?;
        let rating = match (r.rated, r.stars) {
            (_, Some(stars)) => Some(validate_stars(stars)?),
            (true, None) => return Err(ValidationError::EmptyField("stars")),
            (false, None) => None,
        };
        Ok(BookingRequest {
            id: r.id,
            requester_id: r.requester_id,
            provider_id: r.provider_id,
            date: r.date,
            start_time: parse_24h(&r.start_time)?,
            duration_hours: r.duration_hours,
            place: r.place,
            message: r.message,
            state: r.state,
            rating,
        })
    }
}

pub fn parse_booking(json: &str) -> Result<BookingRequest, RecordError> {
    let record: BookingRecord = serde_json::from_str(json)?;
    Ok(BookingRequest::try_from(record)?)
}

pub fn booking_json(booking: &BookingRequest) -> Result<String, RecordError> {
    Ok(serde_json::to_string(&BookingRecord::from(booking))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spanish_availability_document() {
        let doc = json!({
            "lunes": { "inicio": "09:00", "inicioPeriodo": "am", "fin": "12:00", "finPeriodo": "pm" },
            "martes": null,
            "miercoles": { "inicio": "02:00", "inicioPeriodo": "PM", "fin": "06:30", "finPeriodo": "p.m." },
            "jueves": { "inicio": "10:00" },
        });
        let weekly = parse_availability(&doc.to_string()).unwrap();
        let monday = weekly.get(Day::Monday).unwrap();
        assert_eq!((monday.start.minutes(), monday.end.minutes()), (540, 720));
        let wednesday = weekly.get(Day::Wednesday).unwrap();
        assert_eq!((wednesday.start.minutes(), wednesday.end.minutes()), (840, 1110));
        assert_eq!(weekly.get(Day::Tuesday), None);
        assert_eq!(weekly.get(Day::Thursday), None);
    }

    #[test]
    fn bad_entries_are_skipped_not_fatal() {
        let doc = json!({
            "monday": { "start": "10:00", "startPeriod": "pm", "end": "02:00", "endPeriod": "am" },
            "tuesday": { "start": "25:00", "startPeriod": "am", "end": "11:00", "endPeriod": "am" },
            "funday": { "start": "09:00", "startPeriod": "am", "end": "10:00", "endPeriod": "am" },
            "friday": { "start": "09:00", "startPeriod": "am", "end": "10:00", "endPeriod": "am" },
        });
        let weekly = parse_availability(&doc.to_string()).unwrap();
        assert_eq!(weekly.iter().map(|(d, _)| d).collect::<Vec<_>>(), vec![Day::Friday]);
    }

    #[test]
    fn availability_written_as_twelve_hour_with_all_days() {
        let interval = crate::time::parse_range("13:15 - 18:00").unwrap();
        let weekly = WeeklyAvailability::default().with(Day::Saturday, interval);
        let record = availability_to_record(&weekly);
        assert_eq!(record.len(), 7);
        assert_eq!(record["monday"], None);
        assert_eq!(
            record["saturday"],
            Some(DayRecord {
                start: Some("01:15".into()),
                start_period: Some("pm".into()),
                end: Some("06:00".into()),
                end_period: Some("pm".into()),
            })
        );
        let back = parse_availability(&availability_json(&weekly).unwrap()).unwrap();
        assert_eq!(back, weekly);
    }

    fn booking_doc() -> serde_json::Value {
        json!({
            "id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
            "requesterId": "01BX5ZZKBKACTAV9WEVGEMMVRY",
            "providerId": "01BX5ZZKBKACTAV9WEVGEMMVRZ",
            "date": "2024-06-01",
            "startTime": "14:00",
            "durationHours": 2,
            "place": "Library",
            "state": "aceptada",
        })
    }

    #[test]
    fn booking_document_reads_source_state_names() {
        let booking = parse_booking(&booking_doc().to_string()).unwrap();
        assert_eq!(booking.state, BookingState::Accepted);
        assert_eq!(booking.start_time.minutes(), 14 * 60);
        assert_eq!(booking.message, "");
        assert_eq!(booking.rating, None);

        let written: serde_json::Value =
            serde_json::from_str(&booking_json(&booking).unwrap()).unwrap();
        assert_eq!(written["state"], "accepted");
        assert_eq!(written["startTime"], "14:00");
        assert_eq!(written["rated"], false);
        assert!(written.get("stars").is_none());
    }

    #[test]
    fn booking_document_validation() {
        let mut doc = booking_doc();
        doc["durationHours"] = json!(0);
        assert!(matches!(
            parse_booking(&doc.to_string()),
            Err(RecordError::Invalid(ValidationError::InvalidDuration(0)))
        ));
        doc["durationHours"] = json!(u32::MAX);
        assert!(matches!(
            parse_booking(&doc.to_string()),
            Err(RecordError::Invalid(ValidationError::InvalidDuration(u32::MAX)))
        ));

        let mut doc = booking_doc();
        doc["rated"] = json!(true);
        assert!(matches!(
            parse_booking(&doc.to_string()),
            Err(RecordError::Invalid(ValidationError::EmptyField("stars")))
        ));

        doc["stars"] = json!(4);
        assert_eq!(parse_booking(&doc.to_string()).unwrap().rating, Some(4));

        let mut doc = booking_doc();
        doc["startTime"] = json!("2pm");
        assert!(matches!(
            parse_booking(&doc.to_string()),
            Err(RecordError::Invalid(ValidationError::InvalidTimeFormat(_)))
        ));

        assert!(matches!(parse_booking("{"), Err(RecordError::Json(_))));
    }
}
