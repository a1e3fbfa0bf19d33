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

//! Turns time-tagged bundles of measurements into resets, predictions and updates of a filter.
//!
//! A [`Tracker`] owns one [`KinematicFilter`] and applies the fusion policy: it buffers positions for the
//! lookback fit, resets the filter after long gaps, predicts then updates with every usable channel in a
//! single stacked update, and accumulates the NEES and NIS statistics when the true trajectory is known.

mod measurement;
pub use measurement::{Measurement, Measurements, PositionMeasurement, Reading, TrueData};

mod queue;
pub use queue::{AngleEstimate, LinearFit, MeasurementQueue};

mod engine;
pub use engine::{EkfFilter, KinematicFilter, UkfFilter, UpdateOutcome};

mod tracker;
pub use tracker::{TrackUpdate, Tracker};

/// Constructors of the trackers of each motion type.
pub mod trackers;
pub use trackers::{AnyTracker, TrackerKind};
