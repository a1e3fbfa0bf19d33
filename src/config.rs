/*
    Kinematic filters, recursive estimation of planar motion
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::errors::{FilterError, InvalidParameterSnafu};
use crate::filter::checks::{check_fading_memory, check_gate, check_variance};
use crate::models::{Init, ProcessNoise};
use crate::time::{Duration, Epoch};
use serde::de::DeserializeOwned;
use serde::{Deserialize as _, Deserializer, Serializer};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::str::FromStr;
use typed_builder::TypedBuilder;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: io::Error },
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseError { source: serde_yaml::Error },
    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl From<FilterError> for ConfigError {
    fn from(e: FilterError) -> Self {
        Self::InvalidConfig { msg: e.to_string() }
    }
}

pub trait ConfigRepr: Debug + Sized + serde::Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a map of names to "selves" from the provided path to a yaml
    fn load_named<P>(path: P) -> Result<BTreeMap<String, Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds "Self" from the provided string of a yaml
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}

pub(crate) fn epoch_to_str<S>(epoch: &Epoch, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{epoch}"))
}

/// A deserializer from Epoch string
pub(crate) fn epoch_from_str<'de, D>(deserializer: D) -> Result<Epoch, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Epoch::from_str(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn duration_to_str<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{duration}"))
}

/// A deserializer from Duration string
pub(crate) fn duration_from_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Duration::from_str(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn maybe_duration_to_str<S>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if let Some(duration) = duration {
        duration_to_str(duration, serializer)
    } else {
        serializer.serialize_none()
    }
}

pub(crate) fn maybe_duration_from_str<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => Duration::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Default variance of the sensor angle estimated at reset, (20 deg)^2.
pub const ANGLE_ESTIMATION_VARIANCE: f64 = 0.121_846_967_914_683_43;

/// Construction parameters of a tracker.
///
/// Every field has a default, so a YAML configuration only needs to list what differs, e.g.
/// ```yaml
/// queue_size: 5
/// reset_dt: 10 s
/// linear_dt: 2 s
/// gate: 5.0
/// process_noise:
///   position: !Continuous
///     spectral_density: 0.5
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of positions kept in the lookback queue
    #[builder(default = 3)]
    pub queue_size: usize,
    /// Gap since the last accepted update after which the filter is reset
    #[serde(
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    #[builder(default = Duration::from_seconds(10.0))]
    pub reset_dt: Duration,
    /// Largest time step of the updates accumulated into the NIS
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub linear_dt: Option<Duration>,
    /// Mahalanobis distance beyond which an update is rejected
    #[builder(default, setter(strip_option))]
    pub gate: Option<f64>,
    #[builder(default = 1.0)]
    pub fading_memory_alpha: f64,
    /// Spread of the sigma points of the UKF trackers
    #[builder(default = 1.0)]
    pub sigma_points_alpha: f64,
    /// H infinity parameter of the EKF trackers, the Kalman gain is used if None
    #[builder(default, setter(strip_option))]
    pub theta: Option<f64>,
    #[builder(default)]
    pub process_noise: ProcessNoise,
    #[builder(default)]
    pub init: Init,
    /// Variance of the sensor angle estimated at reset from the measured directions (rad^2)
    #[builder(default = ANGLE_ESTIMATION_VARIANCE)]
    pub angle_estimation_variance: f64,
    /// Whether the direction trackers replace the update by a zero velocity while standing
    #[builder(default = true)]
    pub standing_detection: bool,
}

impl TrackerConfig {
    /// Checks every parameter, the sigma points spread is checked when the filter is built.
    pub fn validate(&self) -> Result<(), FilterError> {
        ensure!(
            self.queue_size > 0,
            InvalidParameterSnafu {
                param: "queue size",
                value: self.queue_size as f64
            }
        );
        ensure!(
            self.reset_dt.to_seconds() > 0.0,
            InvalidParameterSnafu {
                param: "reset dt (s)",
                value: self.reset_dt.to_seconds()
            }
        );
        if let Some(linear_dt) = self.linear_dt {
            ensure!(
                linear_dt.to_seconds() > 0.0,
                InvalidParameterSnafu {
                    param: "linear dt (s)",
                    value: linear_dt.to_seconds()
                }
            );
        }
        if let Some(theta) = self.theta {
            ensure!(
                theta.is_finite() && theta >= 0.0,
                InvalidParameterSnafu {
                    param: "H infinity theta",
                    value: theta
                }
            );
        }
        check_gate(self.gate)?;
        check_variance("angle estimation", self.angle_estimation_variance)?;
        check_fading_memory(self.fading_memory_alpha)?;
        self.process_noise.position.validate()?;
        for model in [self.process_noise.angle, self.process_noise.angle_r]
            .into_iter()
            .flatten()
        {
            model.validate()?;
        }
        self.init.validate()
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for TrackerConfig {}

#[cfg(test)]
mod ut_config {
    use super::*;
    use crate::models::NoiseModel;
    use crate::time::TimeUnits;

    #[test]
    fn defaults() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.queue_size, 3);
        assert_eq!(cfg.reset_dt, 10.seconds());
        assert_eq!(cfg.linear_dt, None);
        assert_eq!(
            cfg.process_noise.position,
            NoiseModel::Continuous {
                spectral_density: 4.0
            }
        );
        assert!(
            (cfg.angle_estimation_variance - 20_f64.to_radians().powi(2)).abs() < 1e-15,
            "{}",
            cfg.angle_estimation_variance
        );
        assert!(cfg.validate().is_ok());

        let cfg = TrackerConfig::builder().angle_estimation_variance(-1.0).build();
        assert_eq!(
            cfg.validate(),
            Err(FilterError::InvalidVariance {
                what: "angle estimation",
                value: -1.0
            })
        );

        let cfg = TrackerConfig::builder().gate(0.0).build();
        assert_eq!(
            cfg.validate(),
            Err(FilterError::InvalidParameter {
                param: "gate",
                value: 0.0
            })
        );
        let cfg = TrackerConfig::builder().fading_memory_alpha(0.9).build();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn serde_tracker_config() {
        let cfg = TrackerConfig::builder()
            .queue_size(5)
            .linear_dt(2.seconds())
            .gate(5.0)
            .process_noise(
                ProcessNoise::builder()
                    .position(NoiseModel::Continuous {
                        spectral_density: 0.5,
                    })
                    .build(),
            )
            .build();
        let serialized = serde_yaml::to_string(&cfg).unwrap();
        println!("{serialized}");
        let deserd: TrackerConfig = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(deserd, cfg);

        let partial = TrackerConfig::loads("queue_size: 4\nreset_dt: 30 s\n").unwrap();
        assert_eq!(partial.queue_size, 4);
        assert_eq!(partial.reset_dt, 30.seconds());
        assert_eq!(partial.init, Init::default());

        assert!(TrackerConfig::loads("reset_dt: forever").is_err());
        assert!(TrackerConfig::load("/this/file/does/not/exist.yaml").is_err());
    }
}
