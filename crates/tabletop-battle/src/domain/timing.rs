//! Turn timing arithmetic.

/// Number of upcoming turns kept in the timeline while anyone is in battle.
pub const TIMELINE_LENGTH: usize = 12;

/// Speed assumed for a character whose roster entry carries none.
pub const DEFAULT_SPEED: i64 = 10;

/// Returns when turn `turn_number` of a character with `speed` is due.
///
/// Lower is sooner. Speeds below 1 are clamped to 1.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn timing(turn_number: u32, speed: i64) -> f64 {
    f64::from(turn_number) * 1000.0 / speed.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_scales_turn_number_by_inverse_speed() {
        assert!((timing(1, 10) - 100.0).abs() < f64::EPSILON);
        assert!((timing(3, 20) - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timing_is_strictly_increasing_in_turn_number() {
        for speed in [1, 3, 7, 10, 20, 99, 1000] {
            for turn in 1..50 {
                assert!(timing(turn + 1, speed) > timing(turn, speed));
            }
        }
    }

    #[test]
    fn test_higher_speed_is_strictly_sooner_for_same_turn() {
        for turn in 1..20 {
            for speed in 1..200 {
                assert!(timing(turn, speed + 1) < timing(turn, speed));
            }
        }
    }

    #[test]
    fn test_non_positive_speed_is_clamped_to_one() {
        assert!((timing(2, 0) - 2000.0).abs() < f64::EPSILON);
        assert!((timing(2, -15) - 2000.0).abs() < f64::EPSILON);
    }
}
