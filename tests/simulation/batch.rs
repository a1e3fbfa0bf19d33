use kinematic_filters::prelude::*;
use pretty_env_logger::try_init;
use rstest::*;
use std::fs;

#[fixture]
fn scenarios() -> Vec<ScenarioConfig> {
    let _ = try_init().is_err();
    let speed_data = SpeedSimulatorConfig::builder().count(300).build();
    let tracker = TrackerConfig::builder()
        .process_noise(speed_data.process_noise())
        .standing_detection(false)
        .build();
    let trajectory = SimulatorConfig::builder()
        .count(600)
        .speed_min(10.0)
        .speed_max(10.0)
        .build();

    let mut scenarios = Vec::new();
    for (i, kind) in [TrackerKind::Speed1, TrackerKind::Position1, TrackerKind::Speed2]
        .into_iter()
        .enumerate()
    {
        scenarios.push(
            ScenarioConfig::builder()
                .name(format!("{kind} on a line"))
                .kind(kind)
                .tracker(tracker.clone())
                .data(ScenarioData::Speed(speed_data.clone()))
                .seed(i as u64)
                .build(),
        );
    }
    scenarios.push(
        ScenarioConfig::builder()
            .name("position on a trajectory")
            .kind(TrackerKind::Position2)
            .data(ScenarioData::Trajectory(trajectory.clone()))
            .seed(7)
            .build(),
    );
    scenarios.push(
        ScenarioConfig::builder()
            .name("direction on a trajectory")
            .kind(TrackerKind::Direction11)
            .data(ScenarioData::Trajectory(trajectory))
            .seed(8)
            .build(),
    );
    scenarios
}

#[rstest]
fn batch_is_deterministic(scenarios: Vec<ScenarioConfig>) {
    let first = run_batch(&scenarios);
    let second = run_batch(&scenarios);
    assert_eq!(first.len(), scenarios.len());
    assert_eq!(first, second);

    for (scenario, report) in scenarios.iter().zip(&first) {
        let report = report.as_ref().unwrap();
        println!("{report}");
        assert_eq!(report.name, scenario.name);
        assert_eq!(report.kind, scenario.kind);
        assert_eq!(report.seed, scenario.seed);
        assert!(report.resets >= 1);
        assert!(report.estimates > report.resets);
        assert!(!report.check_string.is_empty());

        // Every tracker stays close to the truth, and its covariance accounts for its errors
        let sigma = match &scenario.data {
            ScenarioData::Speed(config) => config.position_variance.sqrt(),
            ScenarioData::Trajectory(config) => config.position_variance.sqrt(),
        };
        let rms = report.position_rms.unwrap();
        assert!(rms < 1.5 * sigma, "{}: position RMS {rms}", report.name);
        let nees = report.consistency.nees_position.mean().unwrap();
        assert!(nees < 10.0, "{}: NEES position {nees}", report.name);
    }

    // Same data, different seeds
    let speed1 = first[0].as_ref().unwrap();
    let speed2 = first[2].as_ref().unwrap();
    assert_ne!(speed1.position_rms, speed2.position_rms);
}

#[rstest]
fn scenarios_from_file(scenarios: Vec<ScenarioConfig>) {
    let path = std::env::temp_dir().join(format!("kinematic-filters-{}.yaml", std::process::id()));
    fs::write(&path, serde_yaml::to_string(&scenarios).unwrap()).unwrap();

    let loaded = ScenarioConfig::load_many(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(loaded, scenarios);

    assert!(ScenarioConfig::load_many(path).is_err());
}
