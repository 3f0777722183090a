use serde::Serialize;

/// Threshold used when an event does not configure one.
pub const DEFAULT_MIN_ATTENDANCE_PERCENT: f64 = 80.0;

/// Outcome of the certificate check for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub percent: i64,
    pub eligible: bool,
}

/// Attendance percentage and certificate eligibility.
///
/// With no configured sessions the percentage is 0. Otherwise it is rounded
/// half-up to the nearest integer, so 79.6% counts as 80%. The threshold is
/// inclusive, and the final activity only gates events that require it.
/// Inputs are not range-checked; event configuration is validated on entry.
pub fn compute_eligibility(
    attendance_count: i64,
    total_sessions: i64,
    min_percent_for_certificate: f64,
    requires_final_activity: bool,
    final_activity_submitted: bool,
) -> Eligibility {
    let percent = attendance_percent(attendance_count, total_sessions);
    let attendance_ok = percent as f64 >= min_percent_for_certificate;

    Eligibility {
        percent,
        eligible: attendance_ok && (!requires_final_activity || final_activity_submitted),
    }
}

fn attendance_percent(attendance_count: i64, total_sessions: i64) -> i64 {
    if total_sessions <= 0 {
        return 0;
    }
    let ratio = 100.0 * attendance_count as f64 / total_sessions as f64;
    (ratio + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sessions() {
        assert_eq!(
            compute_eligibility(5, 0, 80.0, false, false),
            Eligibility { percent: 0, eligible: false }
        );
        assert_eq!(compute_eligibility(5, -3, 0.0, false, false).percent, 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(
            compute_eligibility(4, 5, 80.0, false, false),
            Eligibility { percent: 80, eligible: true }
        );
        assert_eq!(
            compute_eligibility(3, 5, 80.0, false, false),
            Eligibility { percent: 60, eligible: false }
        );
    }

    #[test]
    fn test_final_activity_gate() {
        let missing = compute_eligibility(10, 10, 80.0, true, false);
        assert_eq!(missing.percent, 100);
        assert!(!missing.eligible);

        assert!(compute_eligibility(10, 10, 80.0, true, true).eligible);
        assert!(compute_eligibility(10, 10, 80.0, false, false).eligible);
        assert!(!compute_eligibility(3, 10, 80.0, true, true).eligible);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(compute_eligibility(8, 10, 80.0, false, false).percent, 80);

        let rounded_up = compute_eligibility(796, 1000, 80.0, false, false);
        assert_eq!(rounded_up.percent, 80);
        assert!(rounded_up.eligible);

        assert_eq!(compute_eligibility(794, 1000, 80.0, false, false).percent, 79);
        assert_eq!(compute_eligibility(1, 8, 0.0, false, false).percent, 13);
        assert_eq!(compute_eligibility(2, 3, 0.0, false, false).percent, 67);
    }

    #[test]
    fn test_no_bounds_checks() {
        assert_eq!(compute_eligibility(12, 10, 80.0, false, false).percent, 120);
        assert!(!compute_eligibility(10, 10, 150.0, false, false).eligible);
        assert!(compute_eligibility(0, 10, -5.0, false, false).eligible);
    }
}
