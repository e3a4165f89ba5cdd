use netsim_core::*;
use rand::prelude::*;

#[test]
fn test_random_schedule_fires_in_time_then_insertion_order() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut s = Scheduler::new();
    let mut expected = Vec::new();
    for seq in 0..500u32 {
        // coarse times so that plenty of ties occur
        let time = rng.gen_range(0..50u64) * 1_000;
        s.schedule(time, seq, EventKind::MobilityTick).unwrap();
        expected.push((time, seq));
    }
    expected.sort();

    let mut fired = Vec::new();
    s.run(50_000, |_, e| fired.push((e.time, e.node_id)));
    assert_eq!(fired, expected);
}

#[test]
fn test_events_beyond_stop_are_truncated() {
    let mut s = Scheduler::new();
    for t in [secs(1.0), secs(2.0), secs(10.0), secs(10.5), secs(11.0)] {
        s.schedule(t, 0, EventKind::MobilityTick).unwrap();
    }
    let fired = s.run(secs(10.0), |_, _| {});
    assert_eq!(fired, 3);
    assert_eq!(s.now(), secs(10.0));

    // truncated events are gone for good
    assert_eq!(s.run(secs(20.0), |_, _| {}), 0);
}

#[test]
fn test_no_retroactive_scheduling() {
    let mut s = Scheduler::new();
    s.run(secs(3.0), |_, _| {});
    assert!(matches!(
        s.schedule(secs(2.0), 0, EventKind::MobilityTick),
        Err(SchedulingError::PastDeadline { .. })
    ));
    assert!(s.schedule(secs(3.0), 0, EventKind::MobilityTick).is_ok());
}

#[test]
fn test_cancelled_app_start_never_reaches_the_app() {
    let mut h = crate::common::TestHarness::new();
    let (start, _) = h.sim.app_window(1).expect("client installed");
    let start = start.expect("start queued");
    assert!(h.sim.scheduler_mut().cancel(start));

    h.run();
    assert!(h.app_events(1).iter().all(|(kind, _)| kind != "app-start"));
    assert_eq!(h.sim.apps()[1].packets_sent(), 0);
    assert!(!h.sim.scheduler_mut().cancel(start));
}

#[test]
fn test_event_for_missing_app_is_still_traced() {
    let mut h = crate::common::TestHarness::new();
    h.sim
        .scheduler_mut()
        .schedule(secs(1.5), 0, EventKind::AppStart { app: 9 })
        .unwrap();
    let fired = h.run();

    let orphan: Vec<&TraceRecord> = h
        .sim
        .trace()
        .of_kind("app-start")
        .filter(|r| r.time == secs(1.5))
        .collect();
    assert_eq!(orphan.len(), 1);
    assert_eq!(orphan[0].payload["app"], 9);
    assert_eq!(orphan[0].payload["skipped"], true);
    assert_eq!(fired as usize, h.sim.trace().len());
}
