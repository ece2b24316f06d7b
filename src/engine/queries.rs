use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use futures::future::join_all;
use ulid::Ulid;

use crate::model::*;
use crate::store::{BookingQuery, Repository};

use super::filter::{filter, FilterSpec};
use super::lifecycle::effective_state;
use super::{BookingError, BookingService};

/// Inbox sort key: what still needs an answer comes first.
pub fn state_weight(state: BookingState) -> u8 {
    match state {
        BookingState::Pending => 1,
        BookingState::Accepted => 2,
        BookingState::Rejected => 3,
        BookingState::Completed => 4,
    }
}

/// Provider inbox order: state weight, then most recent date first.
pub fn sort_inbox(views: &mut [BookingView]) {
    views.sort_by_key(|v| (state_weight(v.state), Reverse(v.booking.date), v.booking.id));
}

/// Requester list order: most recent date first.
pub fn sort_by_date_desc(views: &mut [BookingView]) {
    views.sort_by_key(|v| (Reverse(v.booking.date), v.booking.id));
}

impl<R: Repository> BookingService<R> {
    /// Resolve every counterparty concurrently and attach the effective state.
    async fn build_views(
        &self,
        bookings: Vec<BookingRequest>,
        other_side: Role,
        now: NaiveDateTime,
    ) -> Vec<BookingView> {
        let lookups = bookings.iter().map(|b| {
            let id = match other_side {
                Role::Provider => b.provider_id,
                Role::Requester => b.requester_id,
            };
            self.counterparty(other_side, id)
        });
        let counterparties = join_all(lookups).await;

        bookings
            .into_iter()
            .zip(counterparties)
            .map(|(booking, counterparty)| BookingView {
                state: effective_state(&booking, now),
                booking,
                counterparty,
            })
            .collect()
    }

    pub async fn provider_inbox(
        &self,
        provider_id: Ulid,
        now: NaiveDateTime,
    ) -> Result<Vec<BookingView>, BookingError> {
        let bookings = self.repo.query_bookings(&BookingQuery::provider(provider_id)).await?;
        let mut views = self.build_views(bookings, Role::Requester, now).await;
        sort_inbox(&mut views);
        Ok(views)
    }

    pub async fn requester_bookings(
        &self,
        requester_id: Ulid,
        now: NaiveDateTime,
    ) -> Result<Vec<BookingView>, BookingError> {
        let bookings = self
            .repo
            .query_bookings(&BookingQuery::requester(requester_id))
            .await?;
        let mut views = self.build_views(bookings, Role::Provider, now).await;
        sort_by_date_desc(&mut views);
        Ok(views)
    }

    /// Accepted bookings grouped by day, each day in start-time order.
    pub async fn provider_calendar(
        &self,
        provider_id: Ulid,
        now: NaiveDateTime,
    ) -> Result<BTreeMap<NaiveDate, Vec<BookingView>>, BookingError> {
        let query = BookingQuery::provider(provider_id).with_state(BookingState::Accepted);
        let bookings = self.repo.query_bookings(&query).await?;
        let views = self.build_views(bookings, Role::Requester, now).await;

        let mut calendar: BTreeMap<NaiveDate, Vec<BookingView>> = BTreeMap::new();
        for view in views {
            calendar.entry(view.booking.date).or_default().push(view);
        }
        for day in calendar.values_mut() {
            day.sort_by_key(|v| (v.booking.start_time, v.booking.id));
        }
        Ok(calendar)
    }

    /// Providers matching `query`, best rated first.
    pub async fn search(
        &self,
        query: &FilterSpec,
        today: NaiveDate,
    ) -> Result<Vec<Profile>, BookingError> {
        let providers = self.repo.list_providers().await?;
        let total = providers.len();
        let found = filter(providers, query, today);
        tracing::debug!("search kept {}/{total} providers", found.len());
        Ok(found)
    }
}
