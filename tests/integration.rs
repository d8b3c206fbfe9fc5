use std::sync::Arc;

use carrier_dispatch::clock::ManualClock;
use carrier_dispatch::engine::dispatcher::DispatchEngine;
use carrier_dispatch::engine::queue::enqueue_order;
use carrier_dispatch::engine::runner::{run_dispatch_loop, DispatchOutcome};
use carrier_dispatch::fixture::Fixture;
use carrier_dispatch::geo::GeoPoint;
use carrier_dispatch::models::carrier::{Carrier, CarrierProfile};
use carrier_dispatch::models::commercial::CommercialCarrier;
use carrier_dispatch::models::order::{Order, OrderStatus};
use carrier_dispatch::models::volunteer::VolunteerCarrier;
use carrier_dispatch::state::DispatchState;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};

fn engine() -> DispatchEngine {
    DispatchEngine::new(Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap(),
    )))
}

fn profile(id: &str, lat: f64, lng: f64) -> CarrierProfile {
    CarrierProfile::new(id, id, format!("{id}@example.com"), "hash", GeoPoint::new(lat, lng))
}

fn volunteer(id: &str, radius_km: f64) -> Carrier {
    VolunteerCarrier::new(profile(id, 41.15, -8.61), radius_km, 15.0).into()
}

fn hauler(id: &str, rate: f64, capacity: usize) -> Carrier {
    CommercialCarrier::new(profile(id, 41.14, -8.62), "505050505", rate, capacity, 50.0).into()
}

fn order(id: &str) -> Order {
    Order::new(id, GeoPoint::new(41.16, -8.62), GeoPoint::new(41.17, -8.60))
}

async fn next_outcome(rx: &mut broadcast::Receiver<DispatchOutcome>) -> DispatchOutcome {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("dispatch outcome in time")
        .expect("outcome channel open")
}

fn setup(engine: DispatchEngine) -> (Arc<DispatchState>, broadcast::Receiver<DispatchOutcome>) {
    let (state, rx) = DispatchState::new(engine, 64, 64);
    let state = Arc::new(state);
    let outcomes = state.outcome_tx.subscribe();
    tokio::spawn(run_dispatch_loop(state.clone(), rx));
    (state, outcomes)
}

#[tokio::test]
async fn loop_prefers_free_volunteer_over_paid_hauler() {
    let engine = engine();
    engine.register_carrier(hauler("t1", 1.2, 3)).unwrap();
    engine.register_carrier(volunteer("v1", 25.0)).unwrap();
    let (state, mut outcomes) = setup(engine);

    enqueue_order(&state, order("e1")).await.unwrap();

    match next_outcome(&mut outcomes).await {
        DispatchOutcome::Assigned(result) => {
            assert_eq!(result.carrier_id, "v1");
            assert_eq!(result.order_id, "e1");
            assert_eq!(result.price, 0.0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn loop_falls_back_to_hauler_once_volunteer_is_busy() {
    let engine = engine();
    engine.register_carrier(hauler("t1", 1.2, 3)).unwrap();
    engine.register_carrier(volunteer("v1", 25.0)).unwrap();
    let (state, mut outcomes) = setup(engine);

    enqueue_order(&state, order("e1")).await.unwrap();
    enqueue_order(&state, order("e2")).await.unwrap();

    let first = next_outcome(&mut outcomes).await;
    let second = next_outcome(&mut outcomes).await;

    match (first, second) {
        (DispatchOutcome::Assigned(a), DispatchOutcome::Assigned(b)) => {
            assert_eq!(a.carrier_id, "v1");
            assert_eq!(b.carrier_id, "t1");
            assert!(b.price > 0.0);
            assert_eq!(b.price, 1.2 * b.distance_km);
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }

    let (holder, held) = state.engine.locate_order("e2").unwrap();
    assert_eq!(holder, "t1");
    assert_eq!(held.status, OrderStatus::InTransit);
}

#[tokio::test]
async fn order_out_of_every_radius_is_reported_unassigned() {
    let engine = engine();
    engine.register_carrier(volunteer("v1", 1.0)).unwrap();
    let (state, mut outcomes) = setup(engine);

    let far = Order::new("e-far", GeoPoint::new(38.72, -9.14), GeoPoint::new(38.73, -9.15));
    enqueue_order(&state, far).await.unwrap();

    match next_outcome(&mut outcomes).await {
        DispatchOutcome::Unassigned { order_id, .. } => assert_eq!(order_id, "e-far"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(state.engine.carrier("v1").unwrap().is_free());
}

#[tokio::test]
async fn order_queued_twice_is_only_dispatched_once() {
    let engine = engine();
    engine.register_carrier(hauler("t1", 1.2, 3)).unwrap();
    engine.register_carrier(volunteer("v1", 25.0)).unwrap();
    let (state, mut outcomes) = setup(engine);

    enqueue_order(&state, order("e1")).await.unwrap();
    enqueue_order(&state, order("e1")).await.unwrap();

    assert!(matches!(
        next_outcome(&mut outcomes).await,
        DispatchOutcome::Assigned(_)
    ));
    match next_outcome(&mut outcomes).await {
        DispatchOutcome::Unassigned { order_id, .. } => assert_eq!(order_id, "e1"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let holders = state
        .engine
        .carriers()
        .iter()
        .filter(|carrier| carrier.holds_order("e1"))
        .count();
    assert_eq!(holders, 1);
}

#[tokio::test]
async fn enqueue_rejects_orders_that_are_not_pending() {
    let (state, _outcomes) = setup(engine());
    let mut delivered = order("e1");
    delivered.status = OrderStatus::Delivered;

    assert!(enqueue_order(&state, delivered).await.is_err());
    assert_eq!(state.engine.metrics().orders_in_queue.get(), 0);
}

#[tokio::test]
async fn full_assign_and_complete_cycle() {
    let engine = engine();
    engine.register_carrier(volunteer("v1", 25.0)).unwrap();
    let (state, mut outcomes) = setup(engine);

    enqueue_order(&state, order("e1")).await.unwrap();
    assert!(matches!(
        next_outcome(&mut outcomes).await,
        DispatchOutcome::Assigned(_)
    ));

    let delivered = state.engine.complete("e1", "v1").unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].status, OrderStatus::Delivered);

    enqueue_order(&state, order("e2")).await.unwrap();
    match next_outcome(&mut outcomes).await {
        DispatchOutcome::Assigned(result) => assert_eq!(result.carrier_id, "v1"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn fixture_snapshots_register_and_dispatch() {
    let raw = json!({
        "carriers": [
            {
                "type": "volunteer",
                "id": "v1",
                "name": "Rui",
                "email": "rui@example.com",
                "credential_hash": "h1",
                "home": { "lat": 41.15, "lng": -8.61 },
                "service_radius_km": 20.0,
                "average_speed_kmh": 15.0
            },
            {
                "type": "commercial",
                "id": "t1",
                "name": "Norte Express",
                "email": "ops@norte.example",
                "credential_hash": "h2",
                "home": { "lat": 41.14, "lng": -8.62 },
                "tax_id": "505050505",
                "rate_per_km": 1.1,
                "pickup_capacity": 4,
                "average_speed_kmh": 0.0,
                "ratings": [4, 5]
            }
        ],
        "orders": [
            {
                "id": "e1",
                "store": { "lat": 41.16, "lng": -8.62 },
                "customer": { "lat": 41.17, "lng": -8.60 }
            }
        ]
    })
    .to_string();

    let fixture = Fixture::from_json(&raw).unwrap();
    assert_eq!(fixture.orders[0].status, OrderStatus::Pending);

    let engine = engine();
    for carrier in fixture.carriers {
        engine.register_carrier(carrier).unwrap();
    }

    let hauler = engine.carrier("t1").unwrap();
    assert!(hauler.is_free());
    assert_eq!(hauler.profile().ratings(), &[4, 5]);

    let result = engine.assign(&fixture.orders[0], "t1").unwrap();
    assert_eq!(result.estimated_minutes, None);
    assert!(result.price > 0.0);
}

#[test]
fn malformed_fixture_is_an_error() {
    assert!(Fixture::from_json("{\"carriers\": [{\"type\": \"drone\"}]}").is_err());
}

#[test]
fn metrics_expose_dispatch_counters() {
    let engine = engine();
    engine.register_carrier(volunteer("v1", 25.0)).unwrap();
    engine.assign(&order("e1"), "v1").unwrap();
    engine.complete("e1", "v1").unwrap();

    let text = engine.metrics().encode().unwrap();
    assert!(text.contains("assignments_total"));
    assert!(text.contains("deliveries_total"));
    assert!(text.contains("carrier_utilization"));
}
