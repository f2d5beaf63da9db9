use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use traffic_junction::{SignalTiming, TrafficLight, TrafficLightPhase};

fn released_by_one_green(waiters: usize) {
    let light = Arc::new(
        TrafficLight::new("broadcast", SignalTiming::with_cycle(60_000, 60_000)).unwrap(),
    );
    let (released_tx, released_rx) = unbounded();

    let handles: Vec<_> = (0..waiters)
        .map(|n| {
            let light = Arc::clone(&light);
            let released_tx = released_tx.clone();
            thread::spawn(move || {
                light.wait_for_green().unwrap();
                released_tx.send(n).unwrap();
            })
        })
        .collect();

    // Nobody gets through while the light is red.
    assert!(released_rx.recv_timeout(Duration::from_millis(50)).is_err());

    light.toggle();
    let mut released: Vec<_> = (0..waiters)
        .map(|_| released_rx.recv_timeout(Duration::from_secs(1)).unwrap())
        .collect();
    released.sort_unstable();
    assert_eq!(released, (0..waiters).collect::<Vec<_>>());

    for handle in handles {
        handle.join().unwrap();
    }
    // Each waiter was released once.
    assert!(released_rx.try_recv().is_err());
}

#[test]
fn three_waiters_all_released_by_a_single_green() {
    released_by_one_green(3);
}

#[test]
fn many_waiters_all_released_by_a_single_green() {
    released_by_one_green(32);
}

#[test]
fn phases_alternate_within_the_configured_interval() {
    let light = TrafficLight::new("cycle", SignalTiming::with_cycle(40, 60)).unwrap();
    let changes = light.subscribe();
    light.simulate();

    let observed: Vec<_> = (0..5)
        .map(|_| changes.recv_timeout(Duration::from_secs(2)).unwrap())
        .collect();
    light.shutdown();

    let mut expected = TrafficLightPhase::Red;
    for change in &observed {
        expected = expected.toggled();
        assert_eq!(change.phase, expected);
        assert!(
            change.held_for >= Duration::from_millis(40),
            "phase held only {:?}",
            change.held_for
        );
        // Upper bound leaves room for poll granularity and a busy scheduler.
        assert!(
            change.held_for < Duration::from_millis(400),
            "phase held {:?}",
            change.held_for
        );
    }
}

#[test]
fn each_subscriber_sees_every_change() {
    let light = TrafficLight::new("fanout", SignalTiming::with_cycle(60_000, 60_000)).unwrap();
    let first = light.subscribe();
    let second = light.subscribe();

    light.toggle();
    light.toggle();

    for subscriber in [first, second] {
        let phases: Vec<_> = subscriber.try_iter().map(|c| c.phase).collect();
        assert_eq!(phases, vec![TrafficLightPhase::Green, TrafficLightPhase::Red]);
    }
}
