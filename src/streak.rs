//! Study streak calculation
//!
//! A day is active when at least one session starts on that UTC calendar
//! date. The walk goes backward from today: an inactive today is skipped,
//! the first inactive day after that ends the walk.
//!
//! `longest_streak` is the longest run seen during this one walk, so it never
//! exceeds `current_streak`. Older, longer runs behind a gap are not counted.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::models::StudySession;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_maintained: bool,
}

/// Distinct UTC start dates of the given sessions
pub fn active_days(sessions: &[StudySession]) -> HashSet<NaiveDate> {
    sessions.iter().map(|s| s.start_time.date_naive()).collect()
}

/// Walk back from `today` over at most `lookback_days` days
pub fn calculate_streak(today: NaiveDate, active: &HashSet<NaiveDate>, lookback_days: u32) -> StreakState {
    let mut current = 0u32;
    let mut longest = 0u32;

    for offset in 0..lookback_days {
        let Some(day) = today.checked_sub_days(Days::new(offset as u64)) else {
            break;
        };

        if active.contains(&day) {
            current += 1;
            longest = longest.max(current);
        } else if offset > 0 {
            break;
        }
    }

    StreakState {
        current_streak: current,
        longest_streak: longest,
        streak_maintained: current > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_no_sessions() {
        let state = calculate_streak(day(15), &HashSet::new(), DEFAULT_LOOKBACK_DAYS);
        assert_eq!(state, StreakState::default());
        assert!(!state.streak_maintained);
    }

    #[test]
    fn test_inactive_today_keeps_prior_run() {
        let active: HashSet<_> = [day(13), day(14)].into_iter().collect();
        let state = calculate_streak(day(15), &active, DEFAULT_LOOKBACK_DAYS);
        assert_eq!(state.current_streak, 2);
        assert_eq!(state.longest_streak, 2);
        assert!(state.streak_maintained);
    }

    #[test]
    fn test_gap_ends_walk_and_hides_older_run() {
        // Today plus yesterday, then a gap, then a longer run
        let active: HashSet<_> = [day(15), day(14), day(10), day(9), day(8), day(7)]
            .into_iter()
            .collect();
        let state = calculate_streak(day(15), &active, DEFAULT_LOOKBACK_DAYS);
        assert_eq!(state.current_streak, 2);
        assert_eq!(state.longest_streak, 2);
    }

    #[test]
    fn test_lookback_bounds_the_walk() {
        let active: HashSet<_> = (1..=15).map(day).collect();
        let state = calculate_streak(day(15), &active, 5);
        assert_eq!(state.current_streak, 5);
    }

    #[test]
    fn test_two_day_gap_before_today_is_zero() {
        let active: HashSet<_> = [day(12)].into_iter().collect();
        let state = calculate_streak(day(15), &active, DEFAULT_LOOKBACK_DAYS);
        assert_eq!(state.current_streak, 0);
    }
}
