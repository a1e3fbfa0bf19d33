use crate::{matched_config, speed_bundles};
use approx::assert_abs_diff_eq;
use kinematic_filters::fusion::trackers::speed;
use kinematic_filters::prelude::*;
use pretty_env_logger::try_init;
use rstest::*;

#[fixture]
fn bundles() -> (SpeedSimulatorConfig, Vec<Measurements>) {
    let _ = try_init().is_err();
    speed_bundles(1000, 0)
}

#[rstest]
fn speed_filter_is_consistent(bundles: (SpeedSimulatorConfig, Vec<Measurements>)) {
    let (sim, bundles) = bundles;
    let mut tracker = speed::tracker_1(&matched_config(&sim)).unwrap();

    let sigma = sim.position_variance.sqrt();
    let mut updates = 0;
    for (i, m) in bundles.iter().enumerate() {
        let Some(update) = tracker.update(m).unwrap() else {
            continue;
        };
        updates += 1;
        if i < 20 {
            continue;
        }
        let truth = m.true_data.unwrap();
        let error = (update.position - truth.position).norm();
        assert!(error < 5.0 * sigma, "position error {error} at {i}");
        assert!(!update.gated);
        assert_eq!(update.channels, Some(ChannelSet::PositionSpeed));
    }
    assert_eq!(updates, bundles.len());

    let consistency = tracker.consistency();
    println!("{}", tracker.consistency_string());

    // Innovations of a consistent filter are white, so the NIS sum is chi-squared
    assert_eq!(consistency.nis.is_consistent(), Some(true));
    assert!(tracker.consistency_string().contains("NIS; count = 999"));
    assert_abs_diff_eq!(consistency.nis.expected_mean().unwrap(), 3.0);

    // Estimation errors are correlated in time, so only the mean of the NEES is checked
    let nees_position = consistency.nees_position.mean().unwrap();
    assert!((1.5..2.6).contains(&nees_position), "NEES position {nees_position}");
    let nees_speed = consistency.nees_speed.mean().unwrap();
    assert!((0.6..1.5).contains(&nees_speed), "NEES speed {nees_speed}");
}

#[rstest]
fn mismatched_noise_is_detected(bundles: (SpeedSimulatorConfig, Vec<Measurements>)) {
    let (sim, bundles) = bundles;
    // Claimed position variance one hundred times too small
    let bundles = bundles
        .into_iter()
        .map(|mut m| {
            if let Some(position) = m.position.as_mut() {
                position.variance = position.variance.map(|v| v / 100.0);
            }
            m
        })
        .collect::<Vec<_>>();
    let mut tracker = speed::tracker_1(&matched_config(&sim)).unwrap();
    for m in &bundles {
        tracker.update(m).unwrap();
    }
    assert_eq!(tracker.consistency().nis.is_consistent(), Some(false));
    assert!(tracker
        .consistency_string()
        .lines()
        .any(|line| line.contains("NIS") && line.ends_with("fail")));
}
