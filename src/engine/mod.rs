pub mod availability;
mod error;
pub mod filter;
pub mod lifecycle;
mod mutations;
pub mod optimistic;
mod queries;

pub use availability::{is_available, matching_days};
pub use error::{BookingError, TransitionError, ValidationError};
pub use filter::{filter, AgeRange, FilterSpec, HOBBY_CATALOG};
pub use lifecycle::{effective_state, local_now};
pub use optimistic::{OptimisticList, ProviderInbox, StateChange, Ticket};
pub use queries::{sort_by_date_desc, sort_inbox, state_weight};

use std::sync::Arc;

use tokio::sync::mpsc;
use ulid::Ulid;

use crate::model::*;
use crate::store::{Repository, StoreError};

/// Orchestrates repository reads/writes and the booking state machine.
///
/// Every write is persisted before the matching [`LifecycleEvent`] is queued,
/// and queuing never waits: a full or closed channel drops the event with a
/// warning instead of holding up the caller.
pub struct BookingService<R: Repository> {
    repo: Arc<R>,
    events: mpsc::Sender<LifecycleEvent>,
}

impl<R: Repository> Clone for BookingService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            events: self.events.clone(),
        }
    }
}

impl<R: Repository> BookingService<R> {
    pub fn new(repo: Arc<R>, events: mpsc::Sender<LifecycleEvent>) -> Self {
        Self { repo, events }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Queue an event for the dispatcher. Called only after persistence succeeded.
    fn emit(&self, event: LifecycleEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                metrics::counter!(crate::observability::EVENTS_DROPPED_TOTAL, "reason" => "full")
                    .increment(1);
                tracing::warn!("lifecycle queue full, dropping {event:?}");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                metrics::counter!(crate::observability::EVENTS_DROPPED_TOTAL, "reason" => "closed")
                    .increment(1);
                tracing::debug!("dispatcher gone, dropping {event:?}");
            }
        }
    }

    /// Display data for the other side of a booking. Never fails: a missing or
    /// unreadable profile becomes [`Counterparty::placeholder`].
    async fn counterparty(&self, role: Role, id: Ulid) -> Counterparty {
        match self.repo.get_profile(role, id).await {
            Ok(profile) => Counterparty::from_profile(&profile),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!("no {role:?} profile {id}, using placeholder");
                Counterparty::placeholder(id)
            }
            Err(e) => {
                tracing::warn!("counterparty lookup {id} failed: {e}");
                Counterparty::placeholder(id)
            }
        }
    }
}
