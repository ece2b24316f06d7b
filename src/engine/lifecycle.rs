use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use ulid::Ulid;

use crate::model::*;

use super::{TransitionError, ValidationError};

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

/// Longest booking a request may ask for.
pub const MAX_DURATION_HOURS: u32 = 24;

/// Wall-clock "now" in the local calendar, which is how booking dates are entered.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn validate_duration(hours: u32) -> Result<u32, ValidationError> {
    if (1..=MAX_DURATION_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ValidationError::InvalidDuration(hours))
    }
}

/// `None` only at the very end of the calendar range.
pub fn start_instant(booking: &BookingRequest) -> Option<NaiveDateTime> {
    booking
        .date
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::minutes(i64::from(booking.start_time.minutes())))
}

/// `date + start_time + duration_hours`. May fall on the next calendar day;
/// `None` if it falls past the last representable instant.
pub fn end_instant(booking: &BookingRequest) -> Option<NaiveDateTime> {
    start_instant(booking)?.checked_add_signed(Duration::hours(i64::from(booking.duration_hours)))
}

/// The state to show and act on at `now`.
///
/// Completion is never stored by a user action: an accepted booking reads as
/// completed once `now` is strictly past its end. Every listing and the rating
/// path go through here. A booking whose end cannot be represented never completes.
pub fn effective_state(booking: &BookingRequest, now: NaiveDateTime) -> BookingState {
    match booking.state {
        BookingState::Accepted if end_instant(booking).is_some_and(|end| now > end) => {
            BookingState::Completed
        }
        state => state,
    }
}

/// Pending is the only state a decision can leave.
pub fn transition(from: BookingState, decision: Decision) -> Result<BookingState, TransitionError> {
    match from {
        BookingState::Pending => Ok(decision.target()),
        _ => Err(TransitionError::InvalidTransition {
            from,
            to: decision.target(),
        }),
    }
}

/// Provider's accept/reject. Returns the new state without mutating `booking`.
pub fn decide(
    booking: &BookingRequest,
    actor: Ulid,
    decision: Decision,
) -> Result<BookingState, TransitionError> {
    if actor != booking.provider_id {
        return Err(TransitionError::Forbidden {
            actor,
            booking: booking.id,
        });
    }
    transition(booking.state, decision)
}

pub fn validate_stars(stars: u8) -> Result<u8, ValidationError> {
    if (MIN_STARS..=MAX_STARS).contains(&stars) {
        Ok(stars)
    } else {
        Err(ValidationError::InvalidRating(stars))
    }
}

/// Completed+unrated → Completed+rated, once, by the requester.
pub fn check_can_rate(
    booking: &BookingRequest,
    actor: Ulid,
    now: NaiveDateTime,
) -> Result<(), TransitionError> {
    if actor != booking.requester_id {
        return Err(TransitionError::Forbidden {
            actor,
            booking: booking.id,
        });
    }
    if booking.is_rated() {
        return Err(TransitionError::AlreadyRated(booking.id));
    }
    match effective_state(booking, now) {
        BookingState::Completed => Ok(()),
        state => Err(TransitionError::NotCompleted(state)),
    }
}
