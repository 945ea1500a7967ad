use std::time::Duration;

use pipepair::{
    clamp_pairs, Coordinator, Error, Event, EventSink, ExitStatus, Role, Settings, MAX_PAIRS,
};
use tokio::sync::mpsc::UnboundedReceiver;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quick() -> Settings {
    Settings::default().with_send_delay(Duration::ZERO)
}

fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// (pair id, sum) of every consumer, sorted by pair id
fn final_sums(events: &[Event]) -> Vec<(usize, i64)> {
    let mut sums: Vec<(usize, i64)> = events
        .iter()
        .filter_map(|e| match e {
            Event::FinalSum { pair, sum, .. } => Some((*pair, *sum)),
            _ => None,
        })
        .collect();
    sums.sort_unstable();
    sums
}

fn spawned(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Spawned(_)))
        .count()
}

#[tokio::test]
async fn test_basic_demo_sums_to_15() {
    init_logging();
    let (events, mut rx) = EventSink::channel();
    let coordinator = Coordinator::new(quick(), events);

    let summary = coordinator.run_basic_demo().await.unwrap();

    assert_eq!(summary.reaped.len(), 2);
    assert_eq!(summary.reaped[0].unit.role, Role::Producer);
    assert_eq!(summary.reaped[1].unit.role, Role::Consumer);
    assert!(summary.all_succeeded());

    let events = drain(&mut rx);
    assert_eq!(final_sums(&events), vec![(0, 15)]);
    assert_eq!(spawned(&events), 2);

    // Nothing left behind: every end closed, every unit reaped
    assert_eq!(coordinator.open_descriptors(), 0);
    assert_eq!(coordinator.live_units(), 0);
}

#[tokio::test]
async fn test_basic_demo_with_delay() {
    let (events, mut rx) = EventSink::channel();
    let settings = Settings::default().with_send_delay(Duration::from_millis(5));
    let coordinator = Coordinator::new(settings, events);

    coordinator.run_basic_demo().await.unwrap();
    assert_eq!(final_sums(&drain(&mut rx)), vec![(0, 15)]);
}

#[tokio::test]
async fn test_multiple_pairs_cover_disjoint_ranges() {
    let (events, mut rx) = EventSink::channel();
    let coordinator = Coordinator::new(quick(), events);

    let summary = coordinator.run_multiple_pairs(2).await.unwrap();

    // Spawn order: producer, consumer per pair
    let roles: Vec<(Role, usize)> = summary
        .reaped
        .iter()
        .map(|r| (r.unit.role, r.unit.pair))
        .collect();
    assert_eq!(
        roles,
        vec![
            (Role::Producer, 0),
            (Role::Consumer, 0),
            (Role::Producer, 1),
            (Role::Consumer, 1),
        ]
    );
    assert!(summary.all_succeeded());

    let events = drain(&mut rx);
    assert_eq!(final_sums(&events), vec![(1, 15), (2, 40)]);
    assert_eq!(events.last(), Some(&Event::AllPairsCompleted));
    assert_eq!(coordinator.open_descriptors(), 0);
    assert_eq!(coordinator.live_units(), 0);
}

#[tokio::test]
async fn test_pair_count_above_cap_is_clamped() {
    let (events, mut rx) = EventSink::channel();
    let coordinator = Coordinator::new(quick(), events);

    let summary = coordinator.run_multiple_pairs(10).await.unwrap();
    assert_eq!(summary.reaped.len(), MAX_PAIRS * 2);

    assert_eq!(
        final_sums(&drain(&mut rx)),
        vec![(1, 15), (2, 40), (3, 65), (4, 90), (5, 115)]
    );
}

#[tokio::test]
async fn test_negative_pair_count_spawns_nothing() {
    let (events, mut rx) = EventSink::channel();
    let coordinator = Coordinator::new(quick(), events);

    let summary = coordinator.run_multiple_pairs(-3).await.unwrap();
    assert!(summary.reaped.is_empty());

    let events = drain(&mut rx);
    assert_eq!(spawned(&events), 0);
    assert_eq!(
        events,
        vec![Event::Starting { pairs: 0 }, Event::AllPairsCompleted]
    );
}

#[test]
fn test_clamp_pairs() {
    assert_eq!(clamp_pairs(-3), 0);
    assert_eq!(clamp_pairs(0), 0);
    assert_eq!(clamp_pairs(3), 3);
    assert_eq!(clamp_pairs(5), 5);
    assert_eq!(clamp_pairs(10), 5);
    assert_eq!(clamp_pairs(i32::MAX), 5);
}

#[tokio::test]
async fn test_descriptor_exhaustion_spawns_nothing() {
    init_logging();
    let (events, mut rx) = EventSink::channel();
    // One descriptor: the read end gets it, the write end cannot
    let coordinator = Coordinator::new(quick().with_max_descriptors(1), events);

    let err = coordinator.run_basic_demo().await.unwrap_err();
    assert!(matches!(err, Error::Resource(_)));

    assert_eq!(spawned(&drain(&mut rx)), 0);
    assert_eq!(coordinator.open_descriptors(), 0);
    assert_eq!(coordinator.live_units(), 0);
}

#[tokio::test]
async fn test_consumer_spawn_failure_reaps_producer() {
    init_logging();
    let (events, mut rx) = EventSink::channel();
    let settings = Settings::default()
        .with_send_delay(Duration::from_millis(20))
        .with_max_units(1);
    let coordinator = Coordinator::new(settings, events);

    let err = coordinator.run_basic_demo().await.unwrap_err();
    match err {
        Error::Spawn(e) => assert_eq!(e.role, Role::Consumer),
        Error::Resource(e) => panic!("unexpected resource error: {e}"),
    }

    let events = drain(&mut rx);
    let reaped: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Reaped { unit, status } => Some((unit.role, *status)),
            _ => None,
        })
        .collect();
    // With its reader gone the producer cannot deliver and gives up
    assert_eq!(reaped, vec![(Role::Producer, ExitStatus::Exited(1))]);

    assert_eq!(coordinator.open_descriptors(), 0);
    assert_eq!(coordinator.live_units(), 0);
}

#[tokio::test]
async fn test_multi_pair_aborts_on_resource_failure() {
    let (events, mut rx) = EventSink::channel();
    // Room for exactly one pipe; the second pair cannot get one while the
    // first pair's units still hold their ends
    let settings = Settings::default()
        .with_send_delay(Duration::from_millis(50))
        .with_max_descriptors(2);
    let coordinator = Coordinator::new(settings, events);

    let err = coordinator.run_multiple_pairs(2).await.unwrap_err();
    assert!(matches!(err, Error::Resource(_)));

    let events = drain(&mut rx);
    assert_eq!(spawned(&events), 2);
    assert!(!events.contains(&Event::AllPairsCompleted));
}

#[tokio::test]
async fn test_multi_pair_aborts_on_spawn_failure() {
    let (events, mut rx) = EventSink::channel();
    let settings = quick().with_max_units(3);
    let coordinator = Coordinator::new(settings, events);

    let err = coordinator.run_multiple_pairs(2).await.unwrap_err();
    match err {
        Error::Spawn(e) => {
            assert_eq!(e.role, Role::Consumer);
            assert_eq!(e.limit, 3);
        }
        Error::Resource(e) => panic!("unexpected resource error: {e}"),
    }
    assert_eq!(spawned(&drain(&mut rx)), 3);
}
