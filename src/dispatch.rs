use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use ulid::Ulid;

use crate::model::{BookingState, LifecycleEvent, Role};
use crate::notify::{Notifier, NotifyError, PushMessage};
use crate::store::{Repository, StoreError};

/// Who a lifecycle event is addressed to.
pub fn recipient(event: &LifecycleEvent) -> (Role, Ulid) {
    match event {
        LifecycleEvent::Requested { provider_id, .. } => (Role::Provider, *provider_id),
        LifecycleEvent::Decided { requester_id, .. } => (Role::Requester, *requester_id),
    }
}

/// Push payload for `event`, addressed to `token`.
pub fn compose(event: &LifecycleEvent, token: &str) -> PushMessage {
    let (title, body, metadata) = match event {
        LifecycleEvent::Requested {
            booking_id,
            requester_name,
            date,
            ..
        } => (
            "New opportunity".to_string(),
            format!("{requester_name} wants to book you on {date}"),
            BTreeMap::from([("bookingId".to_string(), booking_id.to_string())]),
        ),
        LifecycleEvent::Decided {
            booking_id, state, ..
        } => {
            let (title, body) = match state {
                BookingState::Accepted => ("Request accepted", "Your booking request was accepted"),
                BookingState::Rejected => ("Request rejected", "Your booking request was declined"),
                _ => ("Request updated", "Your booking request changed"),
            };
            (
                title.to_string(),
                body.to_string(),
                BTreeMap::from([
                    ("bookingId".to_string(), booking_id.to_string()),
                    ("type".to_string(), "state_change".to_string()),
                    ("state".to_string(), state.as_str().to_string()),
                ]),
            )
        }
    };
    PushMessage {
        token: token.to_string(),
        title,
        body,
        metadata,
    }
}

fn failure_label(e: &NotifyError) -> &'static str {
    match e {
        NotifyError::MissingToken(_) => "missing_token",
        NotifyError::RecipientNotFound(_) => "recipient_not_found",
        NotifyError::Delivery(_) => "delivery",
    }
}

/// Turns lifecycle events into push messages. Failures are logged and
/// counted, never reported back to whoever caused the event.
pub struct Dispatcher<R: Repository, N: Notifier> {
    repo: Arc<R>,
    notifier: Arc<N>,
}

impl<R: Repository, N: Notifier> Dispatcher<R, N> {
    pub fn new(repo: Arc<R>, notifier: Arc<N>) -> Self {
        Self { repo, notifier }
    }

    /// Resolve the recipient's token and send exactly one message.
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let (role, id) = recipient(event);
        let profile = match self.repo.get_profile(role, id).await {
            Ok(profile) => profile,
            Err(StoreError::NotFound(_)) => return Err(NotifyError::RecipientNotFound(id)),
            Err(e) => return Err(NotifyError::Delivery(format!("recipient lookup: {e}"))),
        };
        let token = profile
            .push_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(NotifyError::MissingToken(id))?;
        self.notifier.dispatch(compose(event, token)).await
    }

    /// Drain `rx` until every sender is gone.
    pub async fn run(self, mut rx: mpsc::Receiver<LifecycleEvent>) {
        while let Some(event) = rx.recv().await {
            match self.handle(&event).await {
                Ok(()) => {
                    metrics::counter!(crate::observability::NOTIFICATIONS_SENT_TOTAL).increment(1);
                }
                Err(e) => {
                    metrics::counter!(
                        crate::observability::NOTIFICATIONS_FAILED_TOTAL,
                        "reason" => failure_label(&e)
                    )
                    .increment(1);
                    warn!("notification for {event:?} not sent: {e}");
                }
            }
        }
        info!("lifecycle channel closed, dispatcher stopping");
    }
}
