//! Crisis event scheduler.
//!
//! One Bernoulli draw per severity class per day, with self-exciting
//! rates: an event multiplies its own class's rate by k for
//! `boost_period` days. A major event also opens a cooldown window during
//! which both classes are suppressed entirely.
//!
//! Both draws are taken every day, whether or not a class can fire, so the
//! number of values consumed from the stream depends only on the horizon.

use crate::{
    config::{ClusterConfig, GuaranteedEvent},
    error::{SimError, SimResult},
    params::ProcessParameters,
    rng::PathRng,
    types::TradingDay,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
}

/// Ordered by day, then severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrisisEvent {
    pub day: TradingDay,
    pub severity: Severity,
}

impl CrisisEvent {
    pub fn minor(day: TradingDay) -> Self {
        Self { day, severity: Severity::Minor }
    }

    pub fn major(day: TradingDay) -> Self {
        Self { day, severity: Severity::Major }
    }
}

#[derive(Debug, Clone)]
pub struct CrisisScheduler {
    minor_rate: f64,
    major_rate: f64,
    boost_k: f64,
    boost_period: usize,
    cooldown_period: usize,
}

/// Exclusive end days of the three active windows.
#[derive(Default)]
struct WindowState {
    minor_boosted_until: TradingDay,
    major_boosted_until: TradingDay,
    major_cooldown_until: TradingDay,
}

impl WindowState {
    fn fire(&mut self, event: CrisisEvent, cluster: &CrisisScheduler) {
        match event.severity {
            Severity::Minor => {
                self.minor_boosted_until = event.day + cluster.boost_period;
            }
            Severity::Major => {
                self.major_boosted_until = event.day + cluster.boost_period;
                self.major_cooldown_until = event.day + cluster.cooldown_period;
            }
        }
    }
}

impl CrisisScheduler {
    pub fn new(
        minor_rate: f64,
        major_rate: f64,
        boost_k: f64,
        cluster: &ClusterConfig,
    ) -> SimResult<Self> {
        for (field, rate) in [("minor_rate", minor_rate), ("major_rate", major_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimError::config(
                    field,
                    format!("daily probability must lie in [0, 1], got {rate}"),
                ));
            }
        }
        if !(boost_k.is_finite() && boost_k > 0.0) {
            return Err(SimError::config("cluster_boost_k", format!("must be positive, got {boost_k}")));
        }
        Ok(Self {
            minor_rate,
            major_rate,
            boost_k,
            boost_period: cluster.boost_period,
            cooldown_period: cluster.cooldown_period,
        })
    }

    pub fn from_parameters(params: &ProcessParameters, cluster: &ClusterConfig) -> SimResult<Self> {
        Self::new(
            params.minor_daily_rate(),
            params.major_daily_rate(),
            params.cluster_boost_k,
            cluster,
        )
    }

    /// Sorted events over days `0..horizon`.
    pub fn schedule(&self, horizon: usize, rng: &mut PathRng) -> Vec<CrisisEvent> {
        self.schedule_with_forced(horizon, &[], rng)
    }

    /// Like [`schedule`](Self::schedule), but `forced` events fire
    /// unconditionally on their day, before that day's draws, and open
    /// their boost/cooldown windows exactly as a drawn event would.
    pub fn schedule_with_forced(
        &self,
        horizon: usize,
        forced: &[CrisisEvent],
        rng: &mut PathRng,
    ) -> Vec<CrisisEvent> {
        let mut forced: Vec<CrisisEvent> = forced.iter().copied().filter(|e| e.day < horizon).collect();
        forced.sort();
        let mut forced = forced.into_iter().peekable();

        let mut state = WindowState::default();
        let mut events = Vec::new();

        for day in 0..horizon {
            while let Some(event) = forced.next_if(|e| e.day == day) {
                state.fire(event, self);
                events.push(event);
            }

            let (minor_today, major_today) = if day < state.major_cooldown_until {
                (0.0, 0.0)
            } else {
                (
                    self.boosted(self.minor_rate, day < state.minor_boosted_until),
                    self.boosted(self.major_rate, day < state.major_boosted_until),
                )
            };

            let minor_fires = rng.chance(minor_today);
            let major_fires = rng.chance(major_today);
            if minor_fires {
                let event = CrisisEvent::minor(day);
                state.fire(event, self);
                events.push(event);
            }
            if major_fires {
                let event = CrisisEvent::major(day);
                state.fire(event, self);
                events.push(event);
            }
        }

        events.sort();
        events.dedup();
        events
    }

    fn boosted(&self, base: f64, in_window: bool) -> f64 {
        if in_window {
            base * self.boost_k
        } else {
            base
        }
    }
}

/// Add one event at a uniformly random day of the configured early window,
/// then restore sorted, de-duplicated order. The window is clipped to the
/// horizon; nothing is injected if it falls entirely outside.
pub fn inject_guaranteed_event(
    events: &mut Vec<CrisisEvent>,
    guaranteed: &GuaranteedEvent,
    horizon: usize,
    rng: &mut PathRng,
) {
    let latest = guaranteed.latest_day.min(horizon);
    if guaranteed.earliest_day >= latest {
        return;
    }
    let day = rng.int_range(guaranteed.earliest_day, latest);
    events.push(CrisisEvent { day, severity: guaranteed.severity });
    events.sort();
    events.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StreamSlot};

    fn rng(index: u64) -> PathRng {
        let bank = RngBank::new(5);
        bank.for_stage(bank.path_key(1, index), StreamSlot::CrisisSchedule)
    }

    #[test]
    fn zero_rates_produce_no_events() {
        let scheduler = CrisisScheduler::new(0.0, 0.0, 10.0, &ClusterConfig::default()).unwrap();
        assert!(scheduler.schedule(10_080, &mut rng(0)).is_empty());
    }

    #[test]
    fn certain_rates_fire_every_day_outside_cooldown() {
        let cluster = ClusterConfig { boost_period: 5, cooldown_period: 10 };
        let scheduler = CrisisScheduler::new(1.0, 0.0, 1.0, &cluster).unwrap();
        let events = scheduler.schedule(50, &mut rng(1));
        assert_eq!(events.len(), 50);
        assert!(events.iter().all(|e| e.severity == Severity::Minor));
    }

    #[test]
    fn events_are_sorted_and_unique() {
        let scheduler =
            CrisisScheduler::new(0.01, 0.005, 3.0, &ClusterConfig { boost_period: 50, cooldown_period: 20 }).unwrap();
        let events = scheduler.schedule(10_080, &mut rng(2));
        assert!(events.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn guaranteed_event_lands_in_window() {
        let guaranteed = GuaranteedEvent::default();
        for i in 0..200 {
            let mut events = vec![CrisisEvent::major(5000)];
            inject_guaranteed_event(&mut events, &guaranteed, 10_080, &mut rng(i));
            assert_eq!(events.len(), 2);
            let injected = events[0];
            assert_eq!(injected.severity, Severity::Minor);
            assert!((252..1260).contains(&injected.day));
        }
    }

    #[test]
    fn guaranteed_event_skipped_when_window_is_past_horizon() {
        let mut events = Vec::new();
        inject_guaranteed_event(&mut events, &GuaranteedEvent::default(), 200, &mut rng(3));
        assert!(events.is_empty());
    }

    #[test]
    fn rates_above_one_are_rejected() {
        assert!(CrisisScheduler::new(1.5, 0.0, 1.0, &ClusterConfig::default()).is_err());
    }
}
