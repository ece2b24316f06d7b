use std::io;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use ulid::Ulid;

use crate::journal::Journal;
use crate::model::*;

#[derive(Debug)]
pub enum StoreError {
    NotFound(Ulid),
    Journal(String),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "record not found: {id}"),
            StoreError::Journal(e) => write!(f, "journal error: {e}"),
            StoreError::Unavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Equality predicate over the indexed booking fields. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingQuery {
    pub provider_id: Option<Ulid>,
    pub requester_id: Option<Ulid>,
    pub state: Option<BookingState>,
}

impl BookingQuery {
    pub fn provider(id: Ulid) -> Self {
        Self {
            provider_id: Some(id),
            ..Default::default()
        }
    }

    pub fn requester(id: Ulid) -> Self {
        Self {
            requester_id: Some(id),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: BookingState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn matches(&self, booking: &BookingRequest) -> bool {
        self.provider_id.is_none_or(|id| id == booking.provider_id)
            && self.requester_id.is_none_or(|id| id == booking.requester_id)
            && self.state.is_none_or(|s| s == booking.state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPatch {
    State(BookingState),
    Rating(u8),
}

/// Document-store contract the booking core depends on.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn get_profile(&self, role: Role, id: Ulid) -> Result<Profile, StoreError>;
    /// Providers, highest rating first.
    async fn list_providers(&self) -> Result<Vec<Profile>, StoreError>;
    async fn save_profile(&self, profile: Profile) -> Result<(), StoreError>;
    async fn get_booking(&self, id: Ulid) -> Result<BookingRequest, StoreError>;
    async fn query_bookings(&self, query: &BookingQuery) -> Result<Vec<BookingRequest>, StoreError>;
    async fn insert_booking(&self, booking: BookingRequest) -> Result<(), StoreError>;
    async fn update_booking(&self, id: Ulid, patch: BookingPatch) -> Result<(), StoreError>;
}

// ── Group-commit journal writer ──────────────────────────

struct JournalAppend {
    event: Event,
    response: oneshot::Sender<io::Result<()>>,
}

/// Owns the journal. Drains every append already queued, commits once, and
/// answers the whole batch with the same result.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalAppend>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        metrics::histogram!(crate::observability::JOURNAL_BATCH_SIZE).record(batch.len() as f64);
        let started = std::time::Instant::now();
        let result = commit_batch(&mut journal, &batch);
        metrics::histogram!(crate::observability::JOURNAL_COMMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            tracing::error!("journal {} commit failed: {e}", journal.path().display());
        }

        for append in batch {
            let r = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = append.response.send(r);
        }
    }
}

/// All or nothing: on any failure the journal is cut back to its pre-batch
/// length so replay never sees a write its caller was told had failed.
fn commit_batch(journal: &mut Journal, batch: &[JournalAppend]) -> io::Result<()> {
    let result = batch
        .iter()
        .try_for_each(|append| journal.append_buffered(&append.event))
        .and_then(|()| journal.commit());
    if result.is_err()
        && let Err(e) = journal.rollback()
    {
        tracing::error!("journal {} rollback failed: {e}", journal.path().display());
    }
    result
}

// ── In-memory store with optional journal ────────────────

pub struct Store {
    providers: DashMap<Ulid, Profile>,
    requesters: DashMap<Ulid, Profile>,
    bookings: DashMap<Ulid, BookingRequest>,
    journal_tx: Option<mpsc::Sender<JournalAppend>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Store {
    /// Volatile store; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            providers: DashMap::new(),
            requesters: DashMap::new(),
            bookings: DashMap::new(),
            journal_tx: None,
        }
    }

    /// Replay the journal at `path` and keep appending to it. Must run inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let (journal, events) = Journal::open(path)?;
        let mut store = Self::in_memory();
        for event in &events {
            store.apply(event);
        }
        tracing::info!(
            "journal {}: replayed {} events ({} bookings)",
            path.display(),
            events.len(),
            store.bookings.len()
        );

        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(journal_writer_loop(journal, rx));
        store.journal_tx = Some(tx);
        Ok(store)
    }

    fn profiles(&self, role: Role) -> &DashMap<Ulid, Profile> {
        match role {
            Role::Provider => &self.providers,
            Role::Requester => &self.requesters,
        }
    }

    /// Apply a journal record to the maps. Records naming unknown bookings are ignored.
    fn apply(&self, event: &Event) {
        match event {
            Event::ProfileSaved { profile } => {
                self.profiles(profile.role).insert(profile.id, profile.clone());
            }
            Event::BookingCreated { booking } => {
                self.bookings.insert(booking.id, booking.clone());
            }
            Event::BookingDecided { id, state } => {
                if let Some(mut booking) = self.bookings.get_mut(id) {
                    booking.state = *state;
                }
            }
            Event::BookingRated { id, stars } => {
                if let Some(mut booking) = self.bookings.get_mut(id) {
                    booking.rating = Some(*stars);
                }
            }
        }
    }

    async fn journal_append(&self, event: &Event) -> Result<(), StoreError> {
        let Some(tx) = &self.journal_tx else {
            return Ok(());
        };
        let (response, rx) = oneshot::channel();
        tx.send(JournalAppend {
            event: event.clone(),
            response,
        })
        .await
        .map_err(|_| StoreError::Journal("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Journal("journal writer dropped response".into()))?
            .map_err(|e| StoreError::Journal(e.to_string()))
    }

    /// Journal first, then apply. A failed append leaves memory untouched.
    async fn persist(&self, event: Event) -> Result<(), StoreError> {
        self.journal_append(&event).await?;
        self.apply(&event);
        Ok(())
    }
}

#[async_trait]
impl Repository for Store {
    async fn get_profile(&self, role: Role, id: Ulid) -> Result<Profile, StoreError> {
        self.profiles(role)
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_providers(&self) -> Result<Vec<Profile>, StoreError> {
        let mut providers: Vec<Profile> = self.providers.iter().map(|e| e.value().clone()).collect();
        providers.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)));
        Ok(providers)
    }

    async fn save_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.persist(Event::ProfileSaved { profile }).await
    }

    async fn get_booking(&self, id: Ulid) -> Result<BookingRequest, StoreError> {
        self.bookings
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn query_bookings(&self, query: &BookingQuery) -> Result<Vec<BookingRequest>, StoreError> {
        let mut found: Vec<BookingRequest> = self
            .bookings
            .iter()
            .filter(|e| query.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|b| b.id);
        Ok(found)
    }

    async fn insert_booking(&self, booking: BookingRequest) -> Result<(), StoreError> {
        self.persist(Event::BookingCreated { booking }).await
    }

    async fn update_booking(&self, id: Ulid, patch: BookingPatch) -> Result<(), StoreError> {
        if !self.bookings.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        let event = match patch {
            BookingPatch::State(state) => Event::BookingDecided { id, state },
            BookingPatch::Rating(stars) => Event::BookingRated { id, stars },
        };
        self.persist(event).await
    }
}
