// src/utils/cooldown.rs

use chrono::NaiveDate;

use crate::error::AppError;

/// Whether enough days have passed since the last attempt for a new one.
pub fn cooldown_elapsed(last_attempt: NaiveDate, today: NaiveDate, cooldown_in_days: i32) -> bool {
    (today - last_attempt).num_days() >= cooldown_in_days as i64
}

/// The cooldown gate: no previous attempt always passes; otherwise the
/// configured number of days must have elapsed.
///
/// The denial reports the configured cooldown length, not the remaining
/// wait. That mirrors the platform's established UX.
pub fn check_cooldown(
    last_attempt: Option<NaiveDate>,
    today: NaiveDate,
    cooldown_in_days: i32,
) -> Result<(), AppError> {
    match last_attempt {
        Some(last) if !cooldown_elapsed(last, today, cooldown_in_days) => {
            Err(AppError::Forbidden(format!(
                "You must wait for {} days since last attempt",
                cooldown_in_days
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn no_previous_attempt_always_passes() {
        assert!(check_cooldown(None, day("2024-06-01"), 7).is_ok());
    }

    #[test]
    fn attempt_inside_cooldown_is_rejected_with_configured_days() {
        let today = day("2024-06-04");
        let last = day("2024-06-01"); // 3 days ago, cooldown 7

        let err = check_cooldown(Some(last), today, 7).unwrap_err();
        match err {
            AppError::Forbidden(msg) => {
                assert_eq!(msg, "You must wait for 7 days since last attempt")
            }
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn attempt_at_cooldown_boundary_is_accepted() {
        let last = day("2024-06-01");
        // Day 8 after a 7-day cooldown is allowed; day 6 is not.
        assert!(check_cooldown(Some(last), last + Duration::days(8), 7).is_ok());
        assert!(check_cooldown(Some(last), last + Duration::days(7), 7).is_ok());
        assert!(check_cooldown(Some(last), last + Duration::days(6), 7).is_err());
    }

    #[test]
    fn cooldown_is_monotonic_in_elapsed_days() {
        let last = day("2024-06-01");
        let mut previous_allowed = false;
        for elapsed in 0..20 {
            let allowed = cooldown_elapsed(last, last + Duration::days(elapsed), 7);
            // Once allowed, it stays allowed.
            assert!(!previous_allowed || allowed);
            previous_allowed = allowed;
        }
    }

    #[test]
    fn zero_cooldown_never_blocks() {
        let last = day("2024-06-01");
        assert!(check_cooldown(Some(last), last, 0).is_ok());
    }
}
