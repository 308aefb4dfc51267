//! Crisis scheduling: cooldown suppression, clustering, guaranteed event.

use longpath_core::{
    config::{ClusterConfig, GuaranteedEvent},
    rng::{RngBank, StreamSlot},
    scheduler::{inject_guaranteed_event, CrisisEvent, CrisisScheduler, Severity},
};

const HORIZON: usize = 40 * 252;

fn rng(seed: u64, index: u64) -> longpath_core::rng::PathRng {
    let bank = RngBank::new(seed);
    bank.for_stage(bank.path_key(0, index), StreamSlot::CrisisSchedule)
}

#[test]
fn forced_major_blocks_every_event_until_cooldown_ends() {
    let cluster = ClusterConfig { boost_period: 300, cooldown_period: 756 };
    // Rates far above the calibrated ones so suppression is actually tested.
    let scheduler = CrisisScheduler::new(0.02, 0.02, 3.0, &cluster).unwrap();
    let forced = [CrisisEvent::major(100)];

    for index in 0..200 {
        let events = scheduler.schedule_with_forced(HORIZON, &forced, &mut rng(17, index));
        assert!(events.contains(&CrisisEvent::major(100)), "forced event missing (path {index})");
        for e in &events {
            if e.day >= 100 && e.day < 100 + cluster.cooldown_period {
                assert_eq!(
                    *e,
                    CrisisEvent::major(100),
                    "event {e:?} fired inside the cooldown window (path {index})"
                );
            }
        }
    }
}

#[test]
fn cooldown_holds_when_boost_outlasts_it() {
    let cluster = ClusterConfig::default();
    let scheduler = CrisisScheduler::new(0.01, 0.01, 8.7, &cluster).unwrap();

    for index in 0..100 {
        let events = scheduler.schedule(HORIZON, &mut rng(3, index));
        for (i, e) in events.iter().enumerate() {
            if e.severity != Severity::Major {
                continue;
            }
            let blocked = events[i + 1..]
                .iter()
                .find(|later| later.day > e.day && later.day < e.day + cluster.cooldown_period);
            assert!(blocked.is_none(), "{blocked:?} fired within cooldown of {e:?}");
        }
    }
}

#[test]
fn events_resume_after_cooldown() {
    let cluster = ClusterConfig { boost_period: 300, cooldown_period: 756 };
    let scheduler = CrisisScheduler::new(0.05, 0.0, 1.0, &cluster).unwrap();
    let events = scheduler.schedule_with_forced(HORIZON, &[CrisisEvent::major(100)], &mut rng(9, 0));
    assert!(
        events.iter().any(|e| e.day >= 856),
        "no event after the cooldown despite a 5% daily rate"
    );
}

#[test]
fn zero_rates_schedule_nothing() {
    let scheduler = CrisisScheduler::new(0.0, 0.0, 8.7, &ClusterConfig::default()).unwrap();
    for index in 0..20 {
        assert!(scheduler.schedule(HORIZON, &mut rng(1, index)).is_empty());
    }
}

#[test]
fn schedules_are_sorted_and_unique() {
    let scheduler = CrisisScheduler::new(0.01, 0.005, 8.7, &ClusterConfig::default()).unwrap();
    for index in 0..50 {
        let events = scheduler.schedule(HORIZON, &mut rng(4, index));
        assert!(events.windows(2).all(|w| w[0] < w[1]), "unsorted or duplicated: {events:?}");
        assert!(events.iter().all(|e| e.day < HORIZON));
    }
}

#[test]
fn invalid_rates_rejected() {
    let cluster = ClusterConfig::default();
    assert!(CrisisScheduler::new(1.5, 0.0, 1.0, &cluster).is_err());
    assert!(CrisisScheduler::new(0.0, f64::NAN, 1.0, &cluster).is_err());
    assert!(CrisisScheduler::new(0.0, 0.0, 0.0, &cluster).is_err());
}

#[test]
fn guaranteed_event_lands_in_window() {
    let window = GuaranteedEvent::default();
    for index in 0..100 {
        let mut events = vec![CrisisEvent::major(5000)];
        inject_guaranteed_event(&mut events, &window, HORIZON, &mut rng(8, index));
        assert_eq!(events.len(), 2);
        let injected = events[0];
        assert_eq!(injected.severity, Severity::Minor);
        assert!((252..1260).contains(&injected.day), "day {} outside [252, 1260)", injected.day);
        assert!(events.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn guaranteed_event_clipped_to_horizon() {
    let window = GuaranteedEvent::default();
    let mut events = Vec::new();
    inject_guaranteed_event(&mut events, &window, 100, &mut rng(8, 0));
    assert!(events.is_empty(), "event injected past a 100-day horizon");

    inject_guaranteed_event(&mut events, &window, 300, &mut rng(8, 0));
    assert_eq!(events.len(), 1);
    assert!((252..300).contains(&events[0].day));
}
