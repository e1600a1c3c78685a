use std::fmt;
use std::str::FromStr;

use crate::detection::domain::face_detector::DetectError;

/// Sensitivity knobs of the cascade detector.
///
/// Two named profiles exist: [`DetectorTuning::strict`] for presence checks
/// and [`DetectorTuning::loose`] for exhaustive extraction. The loose
/// profile accepts weaker cascade responses and steps the image pyramid in
/// smaller increments, so it yields more raw candidates; the sharpness
/// filter downstream is expected to weed out the extra false positives.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorTuning {
    /// Minimum cascade score for a window to count as a face.
    pub score_thresh: f64,
    /// Ratio between successive pyramid levels, in `(0, 1)`.
    pub pyramid_scale_factor: f32,
    /// Sliding window step in pixels, both axes.
    pub slide_window_step: u32,
}

impl DetectorTuning {
    /// Presence-check profile: pyramid step 1.1, high score threshold.
    pub fn strict() -> Self {
        Self {
            score_thresh: 2.0,
            pyramid_scale_factor: 1.0 / 1.1,
            slide_window_step: 4,
        }
    }

    /// Extraction profile: pyramid step 1.05, lower score threshold.
    pub fn loose() -> Self {
        Self {
            score_thresh: 1.0,
            pyramid_scale_factor: 1.0 / 1.05,
            slide_window_step: 4,
        }
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if !(self.pyramid_scale_factor > 0.0 && self.pyramid_scale_factor < 1.0) {
            return Err(DetectError::InvalidTuning(format!(
                "pyramid scale factor must be in (0, 1), got {}",
                self.pyramid_scale_factor
            )));
        }
        if self.slide_window_step == 0 {
            return Err(DetectError::InvalidTuning(
                "slide window step must be positive".to_string(),
            ));
        }
        if !self.score_thresh.is_finite() {
            return Err(DetectError::InvalidTuning(format!(
                "score threshold must be finite, got {}",
                self.score_thresh
            )));
        }
        Ok(())
    }
}

/// Named profile selector, parsed from configuration strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuningProfile {
    Strict,
    Loose,
}

impl TuningProfile {
    pub fn tuning(self) -> DetectorTuning {
        match self {
            TuningProfile::Strict => DetectorTuning::strict(),
            TuningProfile::Loose => DetectorTuning::loose(),
        }
    }
}

impl FromStr for TuningProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(TuningProfile::Strict),
            "loose" => Ok(TuningProfile::Loose),
            other => Err(format!(
                "tuning profile must be 'strict' or 'loose', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for TuningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningProfile::Strict => write!(f, "strict"),
            TuningProfile::Loose => write!(f, "loose"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_loose_is_more_permissive_than_strict() {
        let strict = DetectorTuning::strict();
        let loose = DetectorTuning::loose();
        assert!(loose.score_thresh < strict.score_thresh);
        assert!(loose.pyramid_scale_factor > strict.pyramid_scale_factor);
    }

    #[test]
    fn test_profiles_are_valid() {
        assert!(DetectorTuning::strict().validate().is_ok());
        assert!(DetectorTuning::loose().validate().is_ok());
    }

    #[rstest]
    #[case::zero_factor(0.0, 4, 2.0)]
    #[case::unit_factor(1.0, 4, 2.0)]
    #[case::zero_step(0.8, 0, 2.0)]
    #[case::nan_thresh(0.8, 4, f64::NAN)]
    fn test_invalid_tuning_rejected(#[case] factor: f32, #[case] step: u32, #[case] thresh: f64) {
        let tuning = DetectorTuning {
            score_thresh: thresh,
            pyramid_scale_factor: factor,
            slide_window_step: step,
        };
        assert!(matches!(
            tuning.validate(),
            Err(DetectError::InvalidTuning(_))
        ));
    }

    #[rstest]
    #[case("strict", TuningProfile::Strict)]
    #[case("LOOSE", TuningProfile::Loose)]
    fn test_profile_from_str(#[case] input: &str, #[case] expected: TuningProfile) {
        assert_eq!(input.parse::<TuningProfile>().unwrap(), expected);
    }

    #[test]
    fn test_profile_from_str_rejects_unknown() {
        assert!("medium".parse::<TuningProfile>().is_err());
    }

    #[test]
    fn test_profile_maps_to_tuning() {
        assert_eq!(TuningProfile::Strict.tuning(), DetectorTuning::strict());
        assert_eq!(TuningProfile::Loose.to_string(), "loose");
    }
}
