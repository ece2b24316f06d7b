use chrono::NaiveDateTime;
use ulid::Ulid;

use crate::model::*;
use crate::store::{BookingPatch, Repository};

use super::lifecycle::{self, validate_duration, validate_stars};
use super::{BookingError, BookingService, ValidationError};

fn validate_new_booking(new: &NewBooking) -> Result<(), ValidationError> {
    validate_duration(new.duration_hours)?;
    if new.place.trim().is_empty() {
        return Err(ValidationError::EmptyField("place"));
    }
    Ok(())
}

impl<R: Repository> BookingService<R> {
    /// Store a new pending request and tell the provider about it.
    pub async fn create_request(&self, new: NewBooking) -> Result<BookingRequest, BookingError> {
        validate_new_booking(&new)?;
        self.repo.get_profile(Role::Provider, new.provider_id).await?;
        let requester = self.counterparty(Role::Requester, new.requester_id).await;

        let booking = BookingRequest {
            id: Ulid::new(),
            requester_id: new.requester_id,
            provider_id: new.provider_id,
            date: new.date,
            start_time: new.start_time,
            duration_hours: new.duration_hours,
            place: new.place.trim().to_string(),
            message: new.message,
            state: BookingState::Pending,
            rating: None,
        };
        self.repo
            .insert_booking(booking.clone())
            .await
            .map_err(BookingError::PersistenceFailure)?;

        tracing::info!(
            "booking {} requested: requester {} -> provider {} on {}",
            booking.id,
            booking.requester_id,
            booking.provider_id,
            booking.date
        );
        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        self.emit(LifecycleEvent::Requested {
            booking_id: booking.id,
            provider_id: booking.provider_id,
            requester_name: requester.name,
            date: booking.date,
        });
        Ok(booking)
    }

    /// Provider accepts or rejects a pending request. Returns the new state.
    pub async fn decide(
        &self,
        id: Ulid,
        actor: Ulid,
        decision: Decision,
    ) -> Result<BookingState, BookingError> {
        let booking = self.repo.get_booking(id).await?;
        let next = match lifecycle::decide(&booking, actor, decision) {
            Ok(next) => next,
            Err(e) => {
                tracing::info!("booking {id}: {e}");
                return Err(e.into());
            }
        };

        self.repo
            .update_booking(id, BookingPatch::State(next))
            .await
            .map_err(BookingError::PersistenceFailure)?;

        tracing::info!("booking {id}: {} -> {next}", booking.state);
        metrics::counter!(crate::observability::TRANSITIONS_TOTAL, "to" => next.as_str())
            .increment(1);
        self.emit(LifecycleEvent::Decided {
            booking_id: id,
            requester_id: booking.requester_id,
            state: next,
        });
        Ok(next)
    }

    /// Requester rates a completed booking, once.
    pub async fn rate(
        &self,
        id: Ulid,
        actor: Ulid,
        stars: u8,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        let stars = validate_stars(stars)?;
        let booking = self.repo.get_booking(id).await?;
        if let Err(e) = lifecycle::check_can_rate(&booking, actor, now) {
            tracing::info!("booking {id}: rating refused: {e}");
            return Err(e.into());
        }

        self.repo
            .update_booking(id, BookingPatch::Rating(stars))
            .await
            .map_err(BookingError::PersistenceFailure)?;

        tracing::info!("booking {id} rated {stars}/5");
        metrics::counter!(crate::observability::RATINGS_TOTAL).increment(1);
        Ok(())
    }
}
