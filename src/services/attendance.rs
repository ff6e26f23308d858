//! Weighted attendance math.
//!
//! A respondent's likelihood is a value in [0,1]; 1 means a firm "yes".
//! Progress is the weighted sum expressed as a percentage of the threshold
//! and is always computed on read, never stored.

/// Progress toward the threshold, in percent. Not clamped; a popular game can
/// exceed 100. A threshold of zero (or less) reports 0 rather than dividing.
pub fn progress(likelihoods: &[f64], threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 0.0;
    }
    let total: f64 = likelihoods.iter().sum();
    total / threshold * 100.0
}

pub fn has_minimum(likelihoods: &[f64], threshold: f64) -> bool {
    progress(likelihoods, threshold) >= 100.0
}

/// True when an insert moved the weighted sum from below the threshold to at
/// or above it. Both sums must come from the same transaction as the insert
/// so that concurrent joins near the threshold produce exactly one crossing.
pub fn crossed(sum_before: f64, sum_after: f64, threshold: f64) -> bool {
    threshold > 0.0 && sum_before < threshold && sum_after >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_weighted_percentage() {
        assert_eq!(progress(&[1.0], 2.0), 50.0);
        assert_eq!(progress(&[1.0, 1.0], 2.0), 100.0);
        assert_eq!(progress(&[0.5, 0.5, 0.5], 2.0), 75.0);
    }

    #[test]
    fn progress_can_exceed_hundred() {
        assert_eq!(progress(&[1.0, 1.0, 1.0], 2.0), 150.0);
        assert!(has_minimum(&[1.0, 1.0, 1.0], 2.0));
    }

    #[test]
    fn zero_threshold_reports_zero_progress() {
        assert_eq!(progress(&[1.0, 1.0], 0.0), 0.0);
        assert_eq!(progress(&[], -1.0), 0.0);
        assert!(!has_minimum(&[1.0], 0.0));
    }

    #[test]
    fn minimum_reached_exactly_at_threshold() {
        assert!(!has_minimum(&[1.0, 0.9], 2.0));
        assert!(has_minimum(&[1.0, 1.0], 2.0));
        assert!(has_minimum(&[0.5, 0.5, 0.5, 0.5], 2.0));
    }

    #[test]
    fn crossing_happens_once() {
        // threshold 2: first firm yes does not cross, the second does
        assert!(!crossed(0.0, 1.0, 2.0));
        assert!(crossed(1.0, 2.0, 2.0));
        // already above: no further crossings
        assert!(!crossed(2.0, 3.0, 2.0));
    }

    #[test]
    fn crossing_with_fractional_likelihoods() {
        assert!(!crossed(1.0, 1.5, 2.0));
        assert!(crossed(1.5, 2.5, 2.0));
        assert!(!crossed(0.0, 1.0, 0.0));
    }
}
