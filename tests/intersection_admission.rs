use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use traffic_junction::{
    Intersection, IntersectionId, JunctionError, SignalTiming, StreetId, TrafficLightPhase,
    VehicleId,
};

/// A light that will not change on its own during a test.
fn frozen_timing() -> SignalTiming {
    SignalTiming::with_cycle(60_000, 60_000)
}

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn vehicles_are_granted_in_arrival_order() {
    let intersection = Arc::new(
        Intersection::with_phase(IntersectionId(0, 0), TrafficLightPhase::Green, frozen_timing())
            .unwrap(),
    );
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut drivers = Vec::new();
    for (queued, name) in ["A", "B", "C"].into_iter().enumerate() {
        let driver_intersection = Arc::clone(&intersection);
        let order = Arc::clone(&order);
        let vehicle = VehicleId(queued as u64);
        drivers.push(thread::spawn(move || {
            driver_intersection.add_vehicle_to_queue(vehicle).unwrap();
            order.lock().unwrap().push(name);
            thread::sleep(Duration::from_millis(5));
            driver_intersection.vehicle_has_left(vehicle);
        }));
        wait_until("vehicle to queue", || intersection.queue_len() == queued + 1);
    }

    intersection.simulate();
    for driver in drivers {
        driver.join().unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
    assert_eq!(intersection.queue_len(), 0);
    assert!(!intersection.is_blocked());
}

#[test]
fn only_one_vehicle_is_inside_at_a_time() {
    let intersection = Arc::new(
        Intersection::with_phase(IntersectionId(1, 1), TrafficLightPhase::Green, frozen_timing())
            .unwrap(),
    );
    intersection.simulate();

    let inside = Arc::new(AtomicUsize::new(0));
    let most_inside = Arc::new(AtomicUsize::new(0));
    let drivers: Vec<_> = (0..8)
        .map(|n| {
            let intersection = Arc::clone(&intersection);
            let inside = Arc::clone(&inside);
            let most_inside = Arc::clone(&most_inside);
            thread::spawn(move || {
                let vehicle = VehicleId(n);
                intersection.add_vehicle_to_queue(vehicle).unwrap();
                let now_inside = inside.fetch_add(1, Ordering::SeqCst) + 1;
                most_inside.fetch_max(now_inside, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                inside.fetch_sub(1, Ordering::SeqCst);
                intersection.vehicle_has_left(vehicle);
            })
        })
        .collect();

    for driver in drivers {
        driver.join().unwrap();
    }
    assert_eq!(most_inside.load(Ordering::SeqCst), 1);
}

#[test]
fn vehicle_granted_on_red_waits_for_green() {
    let intersection =
        Arc::new(Intersection::new(IntersectionId(0, 1), frozen_timing()).unwrap());
    intersection.simulate();

    let (done_tx, done_rx) = unbounded();
    let driver = {
        let intersection = Arc::clone(&intersection);
        thread::spawn(move || {
            let report = intersection.add_vehicle_to_queue(VehicleId(1)).unwrap();
            done_tx.send(report).unwrap();
            intersection.vehicle_has_left(VehicleId(1));
        })
    };

    wait_until("grant", || intersection.is_blocked());
    assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

    intersection.traffic_light().toggle();
    let report = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(report.entered_on_red);
    assert!(report.green_wait >= Duration::from_millis(20));
    driver.join().unwrap();
}

#[test]
fn next_vehicle_waits_for_departure() {
    let intersection = Arc::new(
        Intersection::with_phase(IntersectionId(2, 0), TrafficLightPhase::Green, frozen_timing())
            .unwrap(),
    );
    intersection.simulate();

    intersection.add_vehicle_to_queue(VehicleId(1)).unwrap();
    let (done_tx, done_rx) = unbounded();
    let second = {
        let intersection = Arc::clone(&intersection);
        thread::spawn(move || {
            intersection.add_vehicle_to_queue(VehicleId(2)).unwrap();
            done_tx.send(()).unwrap();
        })
    };

    wait_until("second vehicle to queue", || intersection.queue_len() == 1);
    assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

    intersection.vehicle_has_left(VehicleId(1));
    assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok());
    second.join().unwrap();
    intersection.vehicle_has_left(VehicleId(2));
}

#[test]
fn shutdown_releases_every_blocked_vehicle() {
    let intersection =
        Arc::new(Intersection::new(IntersectionId(3, 3), frozen_timing()).unwrap());
    intersection.simulate();

    let drivers: Vec<_> = (0..3)
        .map(|n| {
            let intersection = Arc::clone(&intersection);
            thread::spawn(move || intersection.add_vehicle_to_queue(VehicleId(n)))
        })
        .collect();

    wait_until("queue to fill", || {
        intersection.is_blocked() && intersection.queue_len() == 2
    });
    intersection.shutdown();

    for driver in drivers {
        assert!(matches!(driver.join().unwrap(), Err(JunctionError::Closed)));
    }
    assert!(!intersection.is_blocked());

    // Late arrivals are refused rather than left hanging.
    assert!(matches!(
        intersection.add_vehicle_to_queue(VehicleId(9)),
        Err(JunctionError::Closed)
    ));
}

#[test]
fn simulate_twice_is_harmless() {
    let intersection = Intersection::with_phase(
        IntersectionId(0, 2),
        TrafficLightPhase::Green,
        frozen_timing(),
    )
    .unwrap();
    intersection.simulate();
    intersection.simulate();

    for n in 0..3 {
        intersection.add_vehicle_to_queue(VehicleId(n)).unwrap();
        intersection.vehicle_has_left(VehicleId(n));
    }
    intersection.shutdown();
}

#[test]
fn outgoing_streets_never_include_the_incoming_one() {
    let intersection = Intersection::new(IntersectionId(0, 0), frozen_timing()).unwrap();
    let streets: Vec<_> = (10..15).map(StreetId).collect();
    for street in &streets {
        intersection.add_street(*street);
    }

    for incoming in &streets {
        let outgoing = intersection.query_streets(*incoming);
        assert_eq!(outgoing.len(), streets.len() - 1);
        assert!(!outgoing.contains(incoming));
    }
}

#[test]
fn abandoned_waiter_does_not_wedge_the_intersection() {
    let intersection = Arc::new(
        Intersection::with_phase(IntersectionId(1, 2), TrafficLightPhase::Green, frozen_timing())
            .unwrap(),
    );
    let abandoned = intersection.request_entry(VehicleId(1));

    let (done_tx, done_rx) = unbounded();
    let driver = {
        let intersection = Arc::clone(&intersection);
        thread::spawn(move || {
            let report = intersection.add_vehicle_to_queue(VehicleId(2)).unwrap();
            done_tx.send(report.vehicle).unwrap();
            intersection.vehicle_has_left(VehicleId(2));
        })
    };
    wait_until("both vehicles to queue", || intersection.queue_len() == 2);

    drop(abandoned);
    intersection.simulate();

    assert_eq!(
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        VehicleId(2)
    );
    driver.join().unwrap();
    wait_until("intersection to clear", || !intersection.is_blocked());
    assert_eq!(intersection.queue_len(), 0);
}

#[test]
fn inverted_cycle_bounds_are_refused_up_front() {
    let result = Intersection::new(IntersectionId(0, 0), SignalTiming::with_cycle(60, 40));
    assert!(matches!(result, Err(JunctionError::InvalidConfig(_))));
}

#[tokio::test]
async fn entry_works_from_inside_an_async_runtime() {
    let intersection = Intersection::with_phase(
        IntersectionId(2, 2),
        TrafficLightPhase::Green,
        frozen_timing(),
    )
    .unwrap();
    intersection.simulate();

    let report = intersection.add_vehicle_to_queue(VehicleId(1)).unwrap();
    assert!(!report.entered_on_red);
    intersection.vehicle_has_left(VehicleId(1));
    intersection.shutdown();
}
