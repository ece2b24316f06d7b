use std::collections::HashMap;

use chrono::NaiveDateTime;
use ulid::Ulid;

use crate::model::*;
use crate::store::Repository;

use super::lifecycle::effective_state;
use super::queries::sort_inbox;
use super::{BookingError, BookingService};

/// A state change shown to the user before the store has confirmed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub booking_id: Ulid,
    pub state: BookingState,
}

/// Handle for one applied change; pass it back to [`OptimisticList::confirm`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Ticket {
    seq: u64,
    booking_id: Ulid,
}

impl Ticket {
    pub fn booking_id(&self) -> Ulid {
        self.booking_id
    }
}

/// View-facing booking list with apply / confirm / revert.
///
/// Keeps a last-known-good copy of every entry. A failed write restores the
/// entry from that copy rather than from whatever the caller thinks the old
/// value was, so overlapping changes to one entry cannot resurrect a stale state.
pub struct OptimisticList {
    items: Vec<BookingView>,
    known_good: HashMap<Ulid, BookingView>,
    order: fn(&mut [BookingView]),
    next_seq: u64,
}

impl OptimisticList {
    pub fn new(order: fn(&mut [BookingView])) -> Self {
        Self {
            items: Vec::new(),
            known_good: HashMap::new(),
            order,
            next_seq: 0,
        }
    }

    /// Ordered the way a provider inbox is.
    pub fn inbox() -> Self {
        Self::new(sort_inbox)
    }

    pub fn items(&self) -> &[BookingView] {
        &self.items
    }

    pub fn get(&self, booking_id: Ulid) -> Option<&BookingView> {
        self.items.iter().find(|v| v.booking.id == booking_id)
    }

    /// Swap in a freshly loaded list; every entry becomes known-good.
    pub fn replace_all(&mut self, mut views: Vec<BookingView>) {
        (self.order)(&mut views);
        self.known_good = views.iter().map(|v| (v.booking.id, v.clone())).collect();
        self.items = views;
    }

    /// Show `change` immediately, resolved at `now` the same way a refresh
    /// would. `None` if the booking is not in the list.
    pub fn apply(&mut self, change: StateChange, now: NaiveDateTime) -> Option<Ticket> {
        let view = self
            .items
            .iter_mut()
            .find(|v| v.booking.id == change.booking_id)?;
        view.booking.state = change.state;
        view.state = effective_state(&view.booking, now);
        (self.order)(&mut self.items);

        self.next_seq += 1;
        Some(Ticket {
            seq: self.next_seq,
            booking_id: change.booking_id,
        })
    }

    /// Settle an applied change with the outcome of its write.
    ///
    /// Success promotes the visible entry to known-good. Failure puts the
    /// known-good entry back, re-sorts, and hands the error back unchanged.
    pub fn confirm<T, E: std::fmt::Display>(
        &mut self,
        ticket: Ticket,
        result: Result<T, E>,
    ) -> Result<T, E> {
        let id = ticket.booking_id;
        match &result {
            Ok(_) => {
                if let Some(view) = self.get(id).cloned() {
                    self.known_good.insert(id, view);
                }
            }
            Err(e) => {
                tracing::warn!("reverting booking {id} (change #{}): {e}", ticket.seq);
                metrics::counter!(crate::observability::OPTIMISTIC_REVERTS_TOTAL).increment(1);
                if let Some(good) = self.known_good.get(&id).cloned()
                    && let Some(view) = self.items.iter_mut().find(|v| v.booking.id == id)
                {
                    *view = good;
                }
                (self.order)(&mut self.items);
            }
        }
        result
    }
}

/// A provider's inbox wired to the service: apply, persist, confirm.
pub struct ProviderInbox<R: Repository> {
    service: BookingService<R>,
    provider_id: Ulid,
    list: OptimisticList,
}

impl<R: Repository> ProviderInbox<R> {
    pub fn new(service: BookingService<R>, provider_id: Ulid) -> Self {
        Self {
            service,
            provider_id,
            list: OptimisticList::inbox(),
        }
    }

    pub fn items(&self) -> &[BookingView] {
        self.list.items()
    }

    pub async fn refresh(&mut self, now: NaiveDateTime) -> Result<(), BookingError> {
        let views = self.service.provider_inbox(self.provider_id, now).await?;
        self.list.replace_all(views);
        Ok(())
    }

    /// Accept or reject. The entry flips at once and is reverted if the write fails.
    pub async fn decide(
        &mut self,
        booking_id: Ulid,
        decision: Decision,
        now: NaiveDateTime,
    ) -> Result<BookingState, BookingError> {
        let change = StateChange {
            booking_id,
            state: decision.target(),
        };
        let ticket = self.list.apply(change, now);
        let result = self.service.decide(booking_id, self.provider_id, decision).await;
        match ticket {
            Some(ticket) => self.list.confirm(ticket, result),
            None => result,
        }
    }
}
