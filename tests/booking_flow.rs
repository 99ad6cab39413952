//! End-to-end booking flows through the public API only.

use std::sync::Arc;

use chrono::NaiveDate;
use ulid::Ulid;

use parlor::model::*;
use parlor::{BookingError, Engine};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
}

fn booking(barber_id: Ulid, service_id: Ulid, start: Minutes) -> BookingRequest {
    BookingRequest {
        barber_id,
        service_id,
        date: day(),
        start,
        client_name: "Ana".into(),
        client_email: "ana@example.com".into(),
        notes: None,
    }
}

#[tokio::test]
async fn full_shop_lifecycle() {
    let engine = Engine::with_log_mailer();
    let admin = Actor::admin(Ulid::new());
    let client = Actor::client(Ulid::new());

    // Set up the catalog and the roster.
    let cut = engine
        .add_service(&admin, "Classic cut".into(), "Scissors and clippers".into(), 30, 18.0)
        .unwrap();
    let barber_user = Ulid::new();
    let barber = engine.promote_to_barber(&admin, barber_user).unwrap();

    // A fresh day offers the full default grid.
    let slots = engine.available_slots(barber.id, day()).await.unwrap();
    assert_eq!(slots.len(), 18);
    assert_eq!(slots[0], parse_hhmm("09:00").unwrap());

    // Book the first advertised slot and walk it through its life.
    let appt = engine.book(&client, booking(barber.id, cut.id, slots[0])).await.unwrap();
    assert_eq!(appt.status, AppointmentStatus::Pending);

    let appt = engine
        .set_status(&Actor::barber(barber_user), appt.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();
    let appt = engine
        .set_status(&Actor::barber(barber_user), appt.id, AppointmentStatus::Completed)
        .await
        .unwrap();
    assert_eq!(appt.status, AppointmentStatus::Completed);

    engine.rate(&client, appt.id, 5, Some("sharp fade".into())).await.unwrap();
    let rated = engine.get_barber(barber.id).await.unwrap();
    assert_eq!(rated.rating, 5.0);
    assert_eq!(rated.ratings_count, 1);

    // The completed visit no longer occupies its slot.
    let slots = engine.available_slots(barber.id, day()).await.unwrap();
    assert!(slots.contains(&parse_hhmm("09:00").unwrap()));
}

#[tokio::test(flavor = "multi_thread")]
async fn double_booking_race_admits_exactly_one() {
    let engine = Arc::new(Engine::with_log_mailer());
    let admin = Actor::admin(Ulid::new());
    let cut = engine
        .add_service(&admin, "Classic cut".into(), "".into(), 30, 18.0)
        .unwrap();
    let barber = engine.promote_to_barber(&admin, Ulid::new()).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let req = booking(barber.id, cut.id, parse_hhmm("11:00").unwrap());
        handles.push(tokio::spawn(async move {
            engine.book(&Actor::client(Ulid::new()), req).await
        }));
    }

    let mut ok = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(BookingError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn demotion_cascade_preserves_history() {
    let engine = Engine::with_log_mailer();
    let admin = Actor::admin(Ulid::new());
    let client = Actor::client(Ulid::new());
    let cut = engine
        .add_service(&admin, "Classic cut".into(), "".into(), 30, 18.0)
        .unwrap();
    let barber = engine.promote_to_barber(&admin, Ulid::new()).unwrap();

    let done = engine
        .book(&client, booking(barber.id, cut.id, parse_hhmm("09:00").unwrap()))
        .await
        .unwrap();
    engine.set_status(&admin, done.id, AppointmentStatus::Confirmed).await.unwrap();
    engine.set_status(&admin, done.id, AppointmentStatus::Completed).await.unwrap();
    engine.rate(&client, done.id, 4, None).await.unwrap();

    let upcoming = engine
        .book(&client, booking(barber.id, cut.id, parse_hhmm("10:00").unwrap()))
        .await
        .unwrap();
    engine
        .set_status(&admin, upcoming.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();

    assert_eq!(engine.demote_barber(&admin, barber.id).await.unwrap(), 1);

    let upcoming = engine.get_appointment(&client, upcoming.id).await.unwrap();
    assert_eq!(upcoming.status, AppointmentStatus::Cancelled);
    let done = engine.get_appointment(&client, done.id).await.unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);
    assert_eq!(done.rating, Some(4));

    assert!(matches!(
        engine.get_barber(barber.id).await,
        Err(BookingError::NotFound(_))
    ));
}
