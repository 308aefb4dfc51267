//! Path statistics on hand-built paths with known answers.

use longpath_core::{
    pipeline::PathSimulator,
    rng::RngBank,
    stats::{count_lost_periods, max_drawdown, spread, PathStatistics},
    CalibratedParameters, EngineConfig,
};

/// 100 → 50 linearly over 300 days, then flat at 50.
fn decline_then_flat(flat_days: usize) -> Vec<f64> {
    let mut prices: Vec<f64> = (0..=300).map(|d| 100.0 - 50.0 * d as f64 / 300.0).collect();
    prices.extend(std::iter::repeat(50.0).take(flat_days));
    prices
}

#[test]
fn decline_then_flat_has_lost_years() {
    let prices = decline_then_flat(2000);
    let lost = count_lost_periods(&prices, 1.0);
    assert!(lost >= 1, "a qualifying drought exists but none was counted");
    assert!(lost <= prices.len() / 252, "{lost} lost years in {} days", prices.len());
}

#[test]
fn monotone_path_has_no_lost_periods() {
    let prices: Vec<f64> = (0..(30 * 252)).map(|d| 1.0 + d as f64 * 1e-3).collect();
    let stats = PathStatistics::from_path(&prices);
    assert_eq!(stats.lost_year_count, 0);
    assert_eq!(stats.lost_five_year_count, 0);
    assert_eq!(stats.lost_decade_count, 0);
    assert_eq!(stats.max_drawdown, 0.0);
}

#[test]
fn drought_one_day_longer_than_a_year_counts_once() {
    let mut prices = vec![1.0];
    prices.extend(std::iter::repeat(0.9).take(253));
    prices.push(1.0);
    assert_eq!(count_lost_periods(&prices, 1.0), 1);
}

#[test]
fn long_drought_counts_once_per_full_period() {
    // 25 years below the initial peak: two whole decades.
    let mut prices = vec![1.0];
    prices.extend(std::iter::repeat(0.8).take(25 * 252));
    assert_eq!(count_lost_periods(&prices, 10.0), 2);
}

#[test]
fn drawdown_of_known_path() {
    assert!((max_drawdown(&[100.0, 50.0, 100.0]) - 0.5).abs() < 1e-12);
    assert!((max_drawdown(&[1.0, 2.0, 1.5, 3.0, 0.75]) - 0.75).abs() < 1e-12);
    assert_eq!(max_drawdown(&[5.0]), 0.0);
}

#[test]
fn simulated_drawdowns_lie_in_unit_interval() {
    let config = EngineConfig::default_test();
    let params = config.process_parameters(CalibratedParameters::new(0.05, 0.25, 0.5));
    let bank = RngBank::new(config.master_seed);
    let simulator = PathSimulator::new(&config, params, bank).unwrap();
    for i in 0..50 {
        let stats = PathStatistics::from_path(&simulator.simulate(bank.path_key(2, i)).prices);
        assert!(
            (0.0..1.0).contains(&stats.max_drawdown),
            "drawdown {} outside [0, 1) on path {i}",
            stats.max_drawdown
        );
        assert!(stats.max_daily_drop >= 0.0);
        assert!(stats.annualized_volatility > 0.0);
    }
}

#[test]
fn spread_of_final_prices() {
    // P5 = 1.2, P95 = 4.8, mean = 3 over [1..5].
    let finals = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert!((spread(&finals) - 1.2).abs() < 1e-12);
}
