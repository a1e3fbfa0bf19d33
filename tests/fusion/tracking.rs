use crate::{matched_config, speed_bundles};
use kinematic_filters::fusion::trackers::speed;
use kinematic_filters::linalg::Vector2;
use kinematic_filters::prelude::*;
use pretty_env_logger::try_init;
use rstest::*;

#[fixture]
fn bundles() -> (SpeedSimulatorConfig, Vec<Measurements>) {
    let _ = try_init().is_err();
    speed_bundles(200, 11)
}

#[rstest]
fn reset_after_gap(bundles: (SpeedSimulatorConfig, Vec<Measurements>)) {
    let (sim, bundles) = bundles;
    let mut tracker = speed::tracker_1(&matched_config(&sim)).unwrap();

    // Drop twenty one seconds of data
    let kept = bundles
        .iter()
        .enumerate()
        .filter(|(i, _)| !(100..121).contains(i))
        .map(|(_, m)| m)
        .collect::<Vec<_>>();

    let mut resets = Vec::new();
    let mut nones = Vec::new();
    for (i, m) in kept.iter().enumerate() {
        match tracker.update(m).unwrap() {
            Some(update) if update.reset => resets.push(i),
            Some(_) => {}
            None => nones.push(i),
        }
    }
    // The first bundle and the first one after the gap reset the filter
    assert!(nones.is_empty());
    assert_eq!(resets, vec![0, 100]);
}

#[rstest]
fn non_increasing_time_is_an_error(bundles: (SpeedSimulatorConfig, Vec<Measurements>)) {
    let (sim, bundles) = bundles;
    let mut tracker = AnyTracker::new(TrackerKind::Speed1, &matched_config(&sim)).unwrap();
    for m in &bundles[..10] {
        tracker.update(m).unwrap();
    }
    let err = tracker.update(&bundles[5]).unwrap_err();
    assert_eq!(
        err,
        FilterError::NonIncreasingTime {
            from: bundles[9].epoch,
            to: bundles[5].epoch
        }
    );
    println!("{err}");
}

#[rstest]
fn outliers_are_gated(bundles: (SpeedSimulatorConfig, Vec<Measurements>)) {
    let (sim, mut bundles) = bundles;
    let config = TrackerConfig::builder()
        .process_noise(sim.process_noise())
        .gate(6.0)
        .build();
    let mut tracker = speed::tracker_1(&config).unwrap();

    let mut outliers = 0;
    for (i, m) in bundles.iter_mut().enumerate() {
        if i > 10 && i % 25 == 0 {
            if let Some(position) = m.position.as_mut() {
                position.value += Vector2::new(100.0, -100.0);
                outliers += 1;
            }
        }
    }

    let mut gated = 0;
    for m in &bundles {
        if let Some(update) = tracker.update(m).unwrap() {
            if update.gated {
                gated += 1;
                let truth = m.true_data.unwrap().position;
                // The estimate is the prediction, far from the outlier
                assert!((update.position - truth).norm() < 10.0);
            }
        }
    }
    assert_eq!(gated, outliers);
    assert_eq!(
        tracker.consistency().nis.count(),
        bundles.len() - 1 - outliers
    );
}

#[rstest]
fn positions_without_variance(bundles: (SpeedSimulatorConfig, Vec<Measurements>)) {
    let (sim, bundles) = bundles;
    let mut tracker = speed::tracker_1(&matched_config(&sim)).unwrap();
    // Without a variance, positions cannot reset the filter: only the speed is usable
    for m in &bundles[..20] {
        let mut m = m.clone();
        if let Some(position) = m.position.as_mut() {
            position.variance = None;
        }
        assert_eq!(tracker.update(&m).unwrap(), None);
    }
    let reset = tracker.update(&bundles[20]).unwrap().unwrap();
    assert!(reset.reset);
    assert!((reset.position - bundles[20].position.unwrap().value).norm() < 1e-9);
}
