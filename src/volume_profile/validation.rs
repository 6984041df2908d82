use super::structs::Profile;

/// Relative tolerance for floating point volume comparisons
const VOLUME_TOLERANCE: f64 = 1e-9;

/// Structural problems a computed profile can exhibit
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileValidationError {
    /// POC row is not part of the value area
    PocOutsideValueArea { poc_index: usize },
    /// VAH priced below VAL
    InvertedValueArea { vah: f64, val: f64 },
    /// Value area holds more than its target while containing rows beyond the POC
    ValueAreaOvershoot { volume: f64, target: f64 },
    /// Value area rows do not form one contiguous block
    NonContiguousValueArea { missing_index: usize },
    /// Another row holds more volume than the POC
    PocNotMaximum { poc_volume: f64, max_volume: f64 },
    /// Rows are not contiguous and ascending
    RowGap { index: usize },
}

impl std::fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PocOutsideValueArea { poc_index } => {
                write!(f, "POC row {} is outside the value area", poc_index)
            }
            Self::InvertedValueArea { vah, val } => {
                write!(f, "VAH {} is below VAL {}", vah, val)
            }
            Self::ValueAreaOvershoot { volume, target } => {
                write!(f, "Value area volume {} exceeds target {}", volume, target)
            }
            Self::NonContiguousValueArea { missing_index } => {
                write!(f, "Value area skips row {}", missing_index)
            }
            Self::PocNotMaximum { poc_volume, max_volume } => {
                write!(f, "POC volume {} is below maximum row volume {}", poc_volume, max_volume)
            }
            Self::RowGap { index } => write!(f, "Row {} does not start where the previous row ends", index),
        }
    }
}

impl std::error::Error for ProfileValidationError {}

#[derive(Debug, Clone, Default)]
pub struct ProfileValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ProfileValidationError>,
    pub warnings: Vec<String>,
}

pub struct ProfileValidator;

impl ProfileValidator {
    /// Check the structural invariants of a computed profile
    pub fn validate(profile: &Profile) -> ProfileValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if !profile.is_in_value_area(profile.poc.index) {
            errors.push(ProfileValidationError::PocOutsideValueArea {
                poc_index: profile.poc.index,
            });
        }

        if profile.vah.price_level < profile.val.price_level {
            errors.push(ProfileValidationError::InvertedValueArea {
                vah: profile.vah.price_level,
                val: profile.val.price_level,
            });
        }

        let tolerance = VOLUME_TOLERANCE * profile.total_volume.max(1.0);
        if profile.value_area_rows.len() > 1 && profile.value_area_volume > profile.target_volume + tolerance {
            errors.push(ProfileValidationError::ValueAreaOvershoot {
                volume: profile.value_area_volume,
                target: profile.target_volume,
            });
        }

        for pair in profile.value_area_rows.windows(2) {
            if pair[1] != pair[0] + 1 {
                errors.push(ProfileValidationError::NonContiguousValueArea {
                    missing_index: pair[0] + 1,
                });
                break;
            }
        }

        let max_volume = profile.rows.iter().map(|r| r.total_volume).fold(0.0, f64::max);
        if profile.poc.total_volume < max_volume {
            errors.push(ProfileValidationError::PocNotMaximum {
                poc_volume: profile.poc.total_volume,
                max_volume,
            });
        }

        for (i, pair) in profile.rows.windows(2).enumerate() {
            let gap = (pair[1].price_low - pair[0].price_high).abs();
            if gap > VOLUME_TOLERANCE * pair[0].price_high.abs().max(1.0) {
                errors.push(ProfileValidationError::RowGap { index: i + 1 });
                break;
            }
        }

        // Zero-range bars carry volume that no row receives
        let missing = profile.input_volume - profile.total_volume;
        if missing.abs() > tolerance {
            warnings.push(format!(
                "distributed volume {:.6} differs from input volume {:.6}",
                profile.total_volume, profile.input_volume
            ));
        }
        if profile.total_volume <= 0.0 {
            warnings.push("profile has no distributable volume".to_string());
        }
        if profile.rows.len() == 1 {
            warnings.push("single-row profile".to_string());
        }

        ProfileValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;
    use crate::volume_profile::calculator::calculate_profile;
    use crate::volume_profile::structs::FrvpConfig;

    fn sample_profile() -> Profile {
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let mid = 50.0 + (i % 9) as f64;
                Bar::new(i * 60, mid, mid + 1.5, mid - 1.5, mid + 0.5, 100.0 + i as f64)
            })
            .collect();
        calculate_profile(&bars, &FrvpConfig::default()).unwrap()
    }

    #[test]
    fn test_computed_profile_is_valid() {
        let profile = sample_profile();
        let result = ProfileValidator::validate(&profile);
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_detects_poc_outside_value_area() {
        let mut profile = sample_profile();
        profile.value_area_rows.retain(|&i| i != profile.poc.index);
        let result = ProfileValidator::validate(&profile);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ProfileValidationError::PocOutsideValueArea { .. })));
    }

    #[test]
    fn test_detects_inverted_value_area() {
        let mut profile = sample_profile();
        std::mem::swap(&mut profile.vah, &mut profile.val);
        let result = ProfileValidator::validate(&profile);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ProfileValidationError::InvertedValueArea { .. })));
    }

    #[test]
    fn test_volume_loss_is_a_warning() {
        let mut profile = sample_profile();
        profile.input_volume += 25.0;
        let result = ProfileValidator::validate(&profile);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
