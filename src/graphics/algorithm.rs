//! Resampling strategies used when compositing the internal buffer.
//!
//! The set is closed and ordered. Cycling walks it in declaration order and
//! wraps back to the first entry, which is what the settings surface uses
//! for its "next algorithm" buttons.

use std::fmt;
use std::str::FromStr;

/// GL enum value for `GL_NEAREST`.
pub const GL_NEAREST: u32 = 0x2600;
/// GL enum value for `GL_LINEAR`.
pub const GL_LINEAR: u32 = 0x2601;

/// Resampling filter applied when the internal buffer is drawn onto the
/// output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalingAlgorithm {
    /// Nearest-neighbor (sharp, pixelated)
    Nearest = 0,
    /// Bilinear (smooth)
    Linear = 1,
}

impl ScalingAlgorithm {
    /// Every algorithm in cycling order.
    pub const ALL: [ScalingAlgorithm; 2] = [ScalingAlgorithm::Nearest, ScalingAlgorithm::Linear];

    /// The algorithm after `self`, wrapping after the last one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Nearest => Self::Linear,
            Self::Linear => Self::Nearest,
        }
    }

    /// GL texture filter constant for this algorithm.
    #[must_use]
    pub const fn gl_filter(self) -> u32 {
        match self {
            Self::Nearest => GL_NEAREST,
            Self::Linear => GL_LINEAR,
        }
    }

    /// Upper-case name, also used as the persisted value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "NEAREST",
            Self::Linear => "LINEAR",
        }
    }

    /// Translation key for the settings surface.
    #[must_use]
    pub const fn translation_key(self) -> &'static str {
        match self {
            Self::Nearest => "resolutioncontrol.settings.main.nearest",
            Self::Linear => "resolutioncontrol.settings.main.linear",
        }
    }
}

impl fmt::Display for ScalingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scaling algorithm: {0:?} (expected nearest or linear)")]
pub struct ParseAlgorithmError(pub String);

impl FromStr for ScalingAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "linear" | "bilinear" => Ok(Self::Linear),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_next_wraps() {
        assert_eq!(ScalingAlgorithm::Nearest.next(), ScalingAlgorithm::Linear);
        assert_eq!(ScalingAlgorithm::Linear.next(), ScalingAlgorithm::Nearest);
    }

    #[test]
    fn test_all_matches_next_order() {
        for (i, alg) in ScalingAlgorithm::ALL.iter().enumerate() {
            let expected = ScalingAlgorithm::ALL[(i + 1) % ScalingAlgorithm::ALL.len()];
            assert_eq!(alg.next(), expected);
        }
    }

    #[test]
    fn test_gl_filters() {
        assert_eq!(ScalingAlgorithm::Nearest.gl_filter(), 0x2600);
        assert_eq!(ScalingAlgorithm::Linear.gl_filter(), 0x2601);
    }

    #[rstest]
    #[case("nearest", ScalingAlgorithm::Nearest)]
    #[case("NEAREST", ScalingAlgorithm::Nearest)]
    #[case(" Linear ", ScalingAlgorithm::Linear)]
    #[case("bilinear", ScalingAlgorithm::Linear)]
    fn test_parse(#[case] input: &str, #[case] expected: ScalingAlgorithm) {
        assert_eq!(input.parse::<ScalingAlgorithm>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "lanczos".parse::<ScalingAlgorithm>().unwrap_err();
        assert_eq!(err, ParseAlgorithmError("lanczos".to_string()));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for alg in ScalingAlgorithm::ALL {
            assert_eq!(alg.to_string().parse::<ScalingAlgorithm>().unwrap(), alg);
        }
    }

    proptest! {
        #[test]
        fn prop_cycle_returns_after_set_length(start in 0usize..2, laps in 1usize..5) {
            let start = ScalingAlgorithm::ALL[start];
            let mut alg = start;
            for _ in 0..(laps * ScalingAlgorithm::ALL.len()) {
                alg = alg.next();
            }
            prop_assert_eq!(alg, start);
        }
    }
}
