use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_test::{assert_err, assert_ok};
use ulid::Ulid;

use tandem::config::Config;
use tandem::engine::{BookingError, FilterSpec, ProviderInbox, TransitionError};
use tandem::model::*;
use tandem::runtime::Runtime;
use tandem::store::Repository;
use tandem::time;

// ── Test infrastructure ──────────────────────────────────────

fn test_data_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tandem_int_test_{name}_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

struct People {
    provider: Profile,
    requester: Profile,
}

async fn seed(rt: &Runtime) -> People {
    let mut provider = Profile::new(Ulid::new(), Role::Provider, "Ana");
    provider.interests = "Hiking, Coffee".into();
    provider.push_token = Some("device-ana".into());
    provider.rating = 4.8;
    provider.availability = WeeklyAvailability::default().with(
        Day::Saturday,
        Interval::new(
            time::to_minutes("02:00", Period::Pm).unwrap(),
            time::to_minutes("06:00", Period::Pm).unwrap(),
        )
        .unwrap(),
    );
    let mut requester = Profile::new(Ulid::new(), Role::Requester, "Carlos");
    requester.push_token = Some("device-carlos".into());

    assert_ok!(rt.store.save_profile(provider.clone()).await);
    assert_ok!(rt.store.save_profile(requester.clone()).await);
    People {
        provider,
        requester,
    }
}

fn on(day: u32, hh: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hh, 0, 0)
        .unwrap()
}

async fn recv<T: Clone>(rx: &mut tokio::sync::broadcast::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for push")
        .unwrap()
}

// ── Flows ────────────────────────────────────────────────────

#[tokio::test]
async fn search_request_accept_complete_rate() {
    let rt = assert_ok!(Runtime::start(&Config::default()));
    let people = seed(&rt).await;
    let mut ana_device = rt.hub.subscribe("device-ana");
    let mut carlos_device = rt.hub.subscribe("device-carlos");

    // Carlos finds Ana with an afternoon custom range
    let query = FilterSpec {
        text: Some("coffee".into()),
        window: Some(SearchWindow::parse_custom("15:00 - 16:00").unwrap()),
        ..Default::default()
    };
    let found = assert_ok!(rt.service.search(&query, on(1, 0).date()).await);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, people.provider.id);

    let booking = assert_ok!(
        rt.service
            .create_request(NewBooking {
                requester_id: people.requester.id,
                provider_id: people.provider.id,
                date: on(1, 0).date(),
                start_time: time::parse_24h("14:00").unwrap(),
                duration_hours: 2,
                place: "Central park".into(),
                message: "Walk and coffee".into(),
            })
            .await
    );
    let push = recv(&mut ana_device).await;
    assert_eq!(push.title, "New opportunity");
    assert_eq!(push.metadata["bookingId"], booking.id.to_string());

    // Ana accepts from her inbox
    let mut inbox = ProviderInbox::new(rt.service.clone(), people.provider.id);
    assert_ok!(inbox.refresh(on(1, 9)).await);
    assert_eq!(inbox.items().len(), 1);
    assert_eq!(inbox.items()[0].counterparty.name, "Carlos");
    let state = assert_ok!(inbox.decide(booking.id, Decision::Accept, on(1, 9)).await);
    assert_eq!(state, BookingState::Accepted);

    let push = recv(&mut carlos_device).await;
    assert_eq!(push.title, "Request accepted");
    assert_eq!(push.metadata["type"], "state_change");

    // Mid-session it is still accepted and cannot be rated
    let during = assert_ok!(rt.service.requester_bookings(people.requester.id, on(1, 15)).await);
    assert_eq!(during[0].state, BookingState::Accepted);
    let err = assert_err!(rt.service.rate(booking.id, people.requester.id, 5, on(1, 15)).await);
    assert!(matches!(
        err,
        BookingError::Transition(TransitionError::NotCompleted(BookingState::Accepted))
    ));

    // After 16:00 it reads as completed and takes one rating
    let after = assert_ok!(rt.service.requester_bookings(people.requester.id, on(1, 17)).await);
    assert_eq!(after[0].state, BookingState::Completed);
    assert_ok!(rt.service.rate(booking.id, people.requester.id, 5, on(1, 17)).await);
    let err = assert_err!(rt.service.rate(booking.id, people.requester.id, 3, on(1, 18)).await);
    assert!(matches!(err, BookingError::Transition(TransitionError::AlreadyRated(_))));

    let calendar = assert_ok!(rt.service.provider_calendar(people.provider.id, on(1, 17)).await);
    assert_eq!(calendar[&on(1, 0).date()].len(), 1);

    drop(inbox);
    rt.shutdown().await;
}

#[tokio::test]
async fn rejected_request_notifies_and_stays_rejected() {
    let rt = assert_ok!(Runtime::start(&Config::default()));
    let people = seed(&rt).await;
    let mut carlos_device = rt.hub.subscribe("device-carlos");

    let booking = assert_ok!(
        rt.service
            .create_request(NewBooking {
                requester_id: people.requester.id,
                provider_id: people.provider.id,
                date: on(2, 0).date(),
                start_time: time::parse_24h("10:00").unwrap(),
                duration_hours: 1,
                place: "Museum".into(),
                message: String::new(),
            })
            .await
    );
    assert_ok!(
        rt.service
            .decide(booking.id, people.provider.id, Decision::Reject)
            .await
    );
    assert_eq!(recv(&mut carlos_device).await.title, "Request rejected");

    let later = assert_ok!(rt.service.provider_inbox(people.provider.id, on(30, 0)).await);
    assert_eq!(later[0].state, BookingState::Rejected);
    rt.shutdown().await;
}

#[tokio::test]
async fn journal_survives_restart() {
    let dir = test_data_dir("restart");
    let config = Config {
        data_dir: Some(dir),
        ..Default::default()
    };

    let (people, booking) = {
        let rt = assert_ok!(Runtime::start(&config));
        let people = seed(&rt).await;
        let booking = assert_ok!(
            rt.service
                .create_request(NewBooking {
                    requester_id: people.requester.id,
                    provider_id: people.provider.id,
                    date: on(3, 0).date(),
                    start_time: time::parse_24h("18:30").unwrap(),
                    duration_hours: 3,
                    place: "Cinema".into(),
                    message: String::new(),
                })
                .await
        );
        assert_ok!(
            rt.service
                .decide(booking.id, people.provider.id, Decision::Accept)
                .await
        );
        assert_ok!(rt.service.rate(booking.id, people.requester.id, 4, on(4, 12)).await);
        rt.shutdown().await;
        (people, booking)
    };

    let rt = assert_ok!(Runtime::start(&config));
    let restored = assert_ok!(rt.store.get_booking(booking.id).await);
    assert_eq!(restored.state, BookingState::Accepted);
    assert_eq!(restored.rating, Some(4));
    let provider = assert_ok!(rt.store.get_profile(Role::Provider, people.provider.id).await);
    assert_eq!(provider.availability, people.provider.availability);

    let inbox = assert_ok!(rt.service.provider_inbox(people.provider.id, on(4, 12)).await);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].state, BookingState::Completed);
    assert!(inbox[0].booking.is_rated());
    rt.shutdown().await;
}
