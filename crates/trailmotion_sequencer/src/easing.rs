// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves applied to the motion ratio.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Maps a linear time ratio in `[0, 1)` to an eased distance ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Easing {
    /// No easing
    #[default]
    Linear,
    /// jQuery-style swing (half cosine)
    Swing,
    /// Quadratic ease-in
    EaseInQuad,
    /// Quadratic ease-out
    EaseOutQuad,
    /// Quadratic ease-in-out
    EaseInOutQuad,
    /// Cubic ease-in
    EaseInCubic,
    /// Cubic ease-out
    EaseOutCubic,
    /// Cubic ease-in-out
    EaseInOutCubic,
    /// Sine ease-in-out
    EaseInOutSine,
    /// One-dimensional cubic bezier from 0 to 1 with two inner control values
    Bezier {
        /// First inner control value
        p1: f64,
        /// Second inner control value
        p2: f64,
    },
}

impl Easing {
    /// Apply the curve to `t`
    pub fn apply(&self, t: f64) -> f64 {
        match *self {
            Easing::Linear => t,
            Easing::Swing => 0.5 - (t * PI).cos() / 2.0,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::Bezier { p1, p2 } => bezier(0.0, p1, p2, 1.0, t),
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::Swing => "swing",
            Easing::EaseInQuad => "easeInQuad",
            Easing::EaseOutQuad => "easeOutQuad",
            Easing::EaseInOutQuad => "easeInOutQuad",
            Easing::EaseInCubic => "easeInCubic",
            Easing::EaseOutCubic => "easeOutCubic",
            Easing::EaseInOutCubic => "easeInOutCubic",
            Easing::EaseInOutSine => "easeInOutSine",
            Easing::Bezier { .. } => "bezier",
        }
    }
}

fn bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    p0 * mt3 + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t3
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::Swing,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInOutSine,
        Easing::Bezier { p1: 0.25, p2: 0.75 },
    ];

    #[test]
    fn test_endpoints_are_fixed() {
        for easing in ALL {
            assert_relative_eq!(easing.apply(0.0), 0.0, epsilon = 1e-12);
            assert_relative_eq!(easing.apply(1.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_symmetric_curves_hit_midpoint() {
        for easing in [Easing::Linear, Easing::Swing, Easing::EaseInOutQuad, Easing::EaseInOutCubic, Easing::EaseInOutSine] {
            assert_relative_eq!(easing.apply(0.5), 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ease_in_lags_linear() {
        assert!(Easing::EaseInQuad.apply(0.3) < 0.3);
        assert!(Easing::EaseOutQuad.apply(0.3) > 0.3);
    }
}
