use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::ValidationError;

/// Minutes since midnight, `0..=1439`. Built only through the codec in [`crate::time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct TimeOfDay(u16);

pub const MINUTES_PER_DAY: u16 = 24 * 60;

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// `None` when `minutes` falls outside a single day.
    pub fn new(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }
}

impl TryFrom<u16> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        Self::new(minutes).ok_or_else(|| ValidationError::InvalidTimeFormat(minutes.to_string()))
    }
}

impl From<TimeOfDay> for u16 {
    fn from(t: TimeOfDay) -> u16 {
        t.0
    }
}

/// 12-hour clock marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Am,
    Pm,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Am => "am",
            Period::Pm => "pm",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open interval `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Deserialize)]
struct RawInterval {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TryFrom<RawInterval> for Interval {
    type Error = ValidationError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    /// Ranges that wrap past midnight are rejected, not split.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvertedInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    #[serde(alias = "lunes")]
    Monday,
    #[serde(alias = "martes")]
    Tuesday,
    #[serde(alias = "miercoles")]
    Wednesday,
    #[serde(alias = "jueves")]
    Thursday,
    #[serde(alias = "viernes")]
    Friday,
    #[serde(alias = "sabado")]
    Saturday,
    #[serde(alias = "domingo")]
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }

    /// Parse a persisted map key, English or the source-domain Spanish name.
    pub fn from_key(key: &str) -> Option<Day> {
        let day = match key.trim().to_lowercase().as_str() {
            "monday" | "lunes" => Day::Monday,
            "tuesday" | "martes" => Day::Tuesday,
            "wednesday" | "miercoles" | "miércoles" => Day::Wednesday,
            "thursday" | "jueves" => Day::Thursday,
            "friday" | "viernes" => Day::Friday,
            "saturday" | "sabado" | "sábado" => Day::Saturday,
            "sunday" | "domingo" => Day::Sunday,
            _ => return None,
        };
        Some(day)
    }
}

/// One optional interval per weekday. `None` means unavailable that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    days: [Option<Interval>; 7],
}

impl WeeklyAvailability {
    pub fn get(&self, day: Day) -> Option<Interval> {
        self.days[day.index()]
    }

    pub fn set(&mut self, day: Day, interval: Option<Interval>) {
        self.days[day.index()] = interval;
    }

    pub fn with(mut self, day: Day, interval: Interval) -> Self {
        self.set(day, Some(interval));
        self
    }

    /// Days with a declared interval, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = (Day, Interval)> + '_ {
        Day::ALL
            .iter()
            .filter_map(|&day| self.get(day).map(|interval| (day, interval)))
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }
}

/// Named canonical search windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Morning, Shift::Afternoon, Shift::Evening];

    pub fn interval(self) -> Interval {
        let (start, end) = match self {
            Shift::Morning => (6 * 60, 12 * 60),
            Shift::Afternoon => (12 * 60, 18 * 60),
            Shift::Evening => (18 * 60, 23 * 60 + 59),
        };
        Interval {
            start: TimeOfDay(start),
            end: TimeOfDay(end),
        }
    }
}

/// What the requester is looking for: a shift or a validated custom range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchWindow {
    Shift(Shift),
    Custom(Interval),
}

impl SearchWindow {
    /// Parse `HH:MM - HH:MM` (24-hour). This is the only way text reaches the matcher.
    pub fn parse_custom(text: &str) -> Result<Self, ValidationError> {
        crate::time::parse_range(text).map(SearchWindow::Custom)
    }

    pub fn interval(&self) -> Interval {
        match self {
            SearchWindow::Shift(shift) => shift.interval(),
            SearchWindow::Custom(interval) => *interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "aceptada")]
    Accepted,
    #[serde(alias = "rechazada")]
    Rejected,
    #[serde(alias = "concluida")]
    Completed,
}

impl BookingState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingState::Rejected | BookingState::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingState::Pending => "pending",
            BookingState::Accepted => "accepted",
            BookingState::Rejected => "rejected",
            BookingState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn target(self) -> BookingState {
        match self {
            Decision::Accept => BookingState::Accepted,
            Decision::Reject => BookingState::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: Ulid,
    pub requester_id: Ulid,
    pub provider_id: Ulid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub duration_hours: u32,
    pub place: String,
    pub message: String,
    /// Persisted state. Listings show [`crate::engine::effective_state`] instead.
    pub state: BookingState,
    /// Stars given by the requester; `Some` once rated.
    pub rating: Option<u8>,
}

impl BookingRequest {
    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }
}

/// Input for a new request, before an id and state are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub requester_id: Ulid,
    pub provider_id: Ulid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub duration_hours: u32,
    pub place: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Provider,
    Requester,
}

/// The slice of a user record that matching and listings read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Ulid,
    pub role: Role,
    pub name: String,
    /// Free text, searched by the text and hobby filters.
    pub interests: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub rating: f32,
    pub availability: WeeklyAvailability,
    pub push_token: Option<String>,
}

impl Profile {
    pub fn new(id: Ulid, role: Role, name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            name: name.into(),
            interests: String::new(),
            gender: None,
            birth_date: None,
            phone: None,
            rating: 0.0,
            availability: WeeklyAvailability::default(),
            push_token: None,
        }
    }
}

/// Journal record format. Flat, one variant per store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProfileSaved { profile: Profile },
    BookingCreated { booking: BookingRequest },
    BookingDecided { id: Ulid, state: BookingState },
    BookingRated { id: Ulid, stars: u8 },
}

/// Emitted by the service after a write has been persisted; drives notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Requested {
        booking_id: Ulid,
        provider_id: Ulid,
        requester_name: String,
        date: NaiveDate,
    },
    Decided {
        booking_id: Ulid,
        requester_id: Ulid,
        state: BookingState,
    },
}

// ── View types ───────────────────────────────────────────────────

/// Display data for the other party of a booking.
#[derive(Debug, Clone, PartialEq)]
pub struct Counterparty {
    pub id: Ulid,
    pub name: String,
    pub phone: String,
    pub rating: f32,
}

impl Counterparty {
    pub const UNKNOWN_NAME: &'static str = "Unknown user";

    pub fn placeholder(id: Ulid) -> Self {
        Self {
            id,
            name: Self::UNKNOWN_NAME.to_string(),
            phone: String::new(),
            rating: 0.0,
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            phone: profile.phone.clone().unwrap_or_default(),
            rating: profile.rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingView {
    pub booking: BookingRequest,
    pub counterparty: Counterparty,
    /// Effective state at the time the view was built.
    pub state: BookingState,
}
