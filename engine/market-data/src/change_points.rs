//! Change-Point Provider
//!
//! Serves the structural break found by the offline Bayesian analysis of the
//! Brent series. The values are fixed until the model output is wired in.

use serde::Serialize;

/// A detected shift in the mean price level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePoint {
    /// Date of the break, `YYYY-MM-DD`
    pub date: &'static str,
    pub description: &'static str,
    pub mean_before: f64,
    pub mean_after: f64,
    /// Percentage change from `mean_before` to `mean_after`
    pub shift_pct: f64,
}

static DETECTED: [ChangePoint; 1] = [ChangePoint {
    date: "2014-11-05",
    description: "OPEC maintains production → 2014–2016 oil glut",
    mean_before: 102.97,
    mean_after: 62.17,
    shift_pct: -39.6,
}];

/// All detected change points, oldest first
pub fn detected_change_points() -> &'static [ChangePoint] {
    &DETECTED
}
