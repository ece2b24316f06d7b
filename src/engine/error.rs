use ulid::Ulid;

use crate::model::{BookingState, TimeOfDay};
use crate::store::StoreError;

/// Malformed user input. Raised at the boundary, before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidTimeFormat(String),
    InvalidRangeFormat(String),
    InvertedInterval { start: TimeOfDay, end: TimeOfDay },
    InvalidDuration(u32),
    InvalidRating(u8),
    EmptyField(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidTimeFormat(text) => write!(f, "invalid time format: {text:?}"),
            ValidationError::InvalidRangeFormat(text) => {
                write!(f, "invalid range format: {text:?} (expected HH:MM - HH:MM, 24h)")
            }
            ValidationError::InvertedInterval { start, end } => write!(
                f,
                "interval must start before it ends: [{}, {})",
                start.minutes(),
                end.minutes()
            ),
            ValidationError::InvalidDuration(hours) => {
                write!(f, "duration must be between 1 and 24 hours, got {hours}")
            }
            ValidationError::InvalidRating(stars) => {
                write!(f, "rating must be between 1 and 5 stars, got {stars}")
            }
            ValidationError::EmptyField(field) => write!(f, "{field} must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Illegal move in the booking state machine. Nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    InvalidTransition { from: BookingState, to: BookingState },
    NotCompleted(BookingState),
    AlreadyRated(Ulid),
    Forbidden { actor: Ulid, booking: Ulid },
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::InvalidTransition { from, to } => {
                write!(f, "invalid transition: {from} -> {to}")
            }
            TransitionError::NotCompleted(state) => {
                write!(f, "only completed bookings can be rated (state: {state})")
            }
            TransitionError::AlreadyRated(id) => write!(f, "booking {id} was already rated"),
            TransitionError::Forbidden { actor, booking } => {
                write!(f, "{actor} is not allowed to act on booking {booking}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Error returned by service operations invoked by a user.
///
/// Notification failures never appear here; the dispatcher logs them.
#[derive(Debug)]
pub enum BookingError {
    Validation(ValidationError),
    Transition(TransitionError),
    NotFound(Ulid),
    PersistenceFailure(StoreError),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Validation(e) => write!(f, "{e}"),
            BookingError::Transition(e) => write!(f, "{e}"),
            BookingError::NotFound(id) => write!(f, "not found: {id}"),
            BookingError::PersistenceFailure(e) => write!(f, "could not save changes: {e}"),
        }
    }
}

impl std::error::Error for BookingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookingError::Validation(e) => Some(e),
            BookingError::Transition(e) => Some(e),
            BookingError::NotFound(_) => None,
            BookingError::PersistenceFailure(e) => Some(e),
        }
    }
}

impl BookingError {
    /// Persistence failures are the only ones worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::PersistenceFailure(_))
    }
}

impl From<ValidationError> for BookingError {
    fn from(e: ValidationError) -> Self {
        BookingError::Validation(e)
    }
}

impl From<TransitionError> for BookingError {
    fn from(e: TransitionError) -> Self {
        BookingError::Transition(e)
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => BookingError::NotFound(id),
            other => BookingError::PersistenceFailure(other),
        }
    }
}
