use kinematic_filters::fusion::trackers::direction;
use kinematic_filters::linalg::Vector2;
use kinematic_filters::prelude::*;
use pretty_env_logger::try_init;
use rstest::*;
use std::f64::consts::PI;

#[fixture]
fn start() -> Epoch {
    let _ = try_init().is_err();
    Epoch::from_gregorian_tai_at_midnight(2024, 1, 1)
}

/// Heading west, so that the measured direction keeps crossing the -pi/pi seam.
fn westward(t: f64) -> (Vector2<f64>, Vector2<f64>) {
    let position = Vector2::new(-10.0 * t, 0.5 * t.sin());
    let velocity = Vector2::new(-10.0, 0.5 * t.cos());
    (position, velocity)
}

#[rstest]
fn direction_across_the_seam(start: Epoch) {
    let config = TrackerConfig::builder()
        .process_noise(
            ProcessNoise::builder()
                .position(NoiseModel::Discrete { variance: 1.0 })
                .angle(NoiseModel::Discrete { variance: 1e-6 })
                .build(),
        )
        .standing_detection(false)
        .build();
    let mut tracker = direction::tracker_1_0(&config).unwrap();

    let mut crossings = 0;
    let mut last_direction: Option<f64> = None;
    for k in 0..120 {
        let t = f64::from(k);
        let (position, velocity) = westward(t);
        let measured = Angle::of_vector(velocity.x, velocity.y).radians();
        if let Some(last) = last_direction {
            if last.signum() != measured.signum() {
                crossings += 1;
            }
        }
        last_direction = Some(measured);

        let m = Measurements::new(start + t.seconds())
            .with_position(position, Some(Vector2::new(1.0, 1.0)))
            .with_speed(velocity.norm(), 0.01)
            .with_direction(measured, 1.0_f64.to_radians().powi(2));

        let Some(update) = tracker.update(&m).unwrap() else {
            continue;
        };
        if update.reset || k < 20 {
            continue;
        }
        // The sensor angle is zero and must stay so, whatever the side of the seam
        let angle = update.angle.unwrap();
        assert!(angle.abs() < 5.0_f64.to_radians(), "angle {angle} at {k}");
        assert!(!update.gated);
        let heading = Angle::of_vector(
            tracker.filter().velocity().unwrap().x,
            tracker.filter().velocity().unwrap().y,
        );
        let error = heading - Angle::from_radians(PI);
        assert!(error.degrees().abs() < 5.0, "heading {heading} at {k}");
    }
    assert!(crossings > 10);
    // Without true data, only the NIS is accumulated
    assert!(tracker.consistency().nees_position.is_empty());
    assert!(!tracker.consistency().nis.is_empty());
}
