use chrono::{Datelike, Duration as ChronoDuration, NaiveDateTime, NaiveTime, Weekday};
use std::time::Duration;

/// When a scheduled task should run.
///
/// Wall-clock variants are evaluated against the bot's local time (see
/// `Scheduler::new`), so "Monday 18:00" means 18:00 in `BOT_TIMEZONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSchedule {
    /// Run right away, then every `interval` plus up to `jitter` extra.
    Every { interval: Duration, jitter: Duration },
    /// Run once a day at a fixed local time.
    DailyAt { time: NaiveTime },
    /// Run once a week on `weekday` at a fixed local time.
    WeeklyAt { weekday: Weekday, time: NaiveTime },
}

impl TaskSchedule {
    pub fn every(interval: Duration) -> Self {
        Self::Every {
            interval,
            jitter: Duration::ZERO,
        }
    }

    pub fn every_with_jitter(interval: Duration, jitter: Duration) -> Self {
        Self::Every { interval, jitter }
    }

    /// Interval tasks fire on startup; calendar tasks wait for their slot.
    pub fn runs_on_start(&self) -> bool {
        matches!(self, Self::Every { .. })
    }

    /// Delay from `now` (local wall clock) until the next run.
    ///
    /// `jitter_sample` must be in `[0, 1)`; it is ignored by calendar schedules.
    pub fn next_delay(&self, now: NaiveDateTime, jitter_sample: f64) -> Duration {
        match *self {
            Self::Every { interval, jitter } => {
                let sample = jitter_sample.clamp(0.0, 1.0);
                interval + jitter.mul_f64(sample)
            }
            Self::DailyAt { time } => {
                let mut candidate = now.date().and_time(time);
                if candidate <= now {
                    candidate += ChronoDuration::days(1);
                }
                (candidate - now).to_std().unwrap_or_default()
            }
            Self::WeeklyAt { weekday, time } => {
                let today = now.weekday().num_days_from_monday() as i64;
                let target = weekday.num_days_from_monday() as i64;
                let days_ahead = (target - today).rem_euclid(7);

                let mut candidate =
                    (now.date() + ChronoDuration::days(days_ahead)).and_time(time);
                if candidate <= now {
                    candidate += ChronoDuration::days(7);
                }
                (candidate - now).to_std().unwrap_or_default()
            }
        }
    }
}

/// Parse a `HH:MM` wall-clock time as typed by an admin.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn every_adds_scaled_jitter() {
        let schedule =
            TaskSchedule::every_with_jitter(Duration::from_secs(3600), Duration::from_secs(60));
        let now = at(2024, 1, 1, 0, 0);

        assert_eq!(schedule.next_delay(now, 0.0), Duration::from_secs(3600));
        assert_eq!(schedule.next_delay(now, 0.5), Duration::from_secs(3630));
        assert!(schedule.next_delay(now, 0.999) < Duration::from_secs(3660));
    }

    #[test]
    fn daily_rolls_over_to_tomorrow_once_slot_passed() {
        let schedule = TaskSchedule::DailyAt {
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };

        let before = at(2024, 3, 10, 11, 30);
        assert_eq!(schedule.next_delay(before, 0.0), Duration::from_secs(30 * 60));

        let exactly = at(2024, 3, 10, 12, 0);
        assert_eq!(
            schedule.next_delay(exactly, 0.0),
            Duration::from_secs(24 * 3600)
        );

        let after = at(2024, 3, 10, 13, 0);
        assert_eq!(
            schedule.next_delay(after, 0.0),
            Duration::from_secs(23 * 3600)
        );
    }

    #[test]
    fn weekly_targets_next_matching_weekday() {
        let schedule = TaskSchedule::WeeklyAt {
            weekday: Weekday::Mon,
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        };

        // 2024-01-01 was a Monday.
        let monday_morning = at(2024, 1, 1, 9, 0);
        assert_eq!(
            schedule.next_delay(monday_morning, 0.0),
            Duration::from_secs(9 * 3600)
        );

        let monday_evening = at(2024, 1, 1, 19, 0);
        assert_eq!(
            schedule.next_delay(monday_evening, 0.0),
            Duration::from_secs((6 * 24 + 23) * 3600)
        );

        let saturday = at(2024, 1, 6, 18, 0);
        assert_eq!(
            schedule.next_delay(saturday, 0.0),
            Duration::from_secs(2 * 24 * 3600)
        );
    }

    #[test]
    fn only_interval_schedules_fire_on_start() {
        assert!(TaskSchedule::every(Duration::from_secs(5)).runs_on_start());
        assert!(!TaskSchedule::DailyAt {
            time: NaiveTime::from_hms_opt(1, 0, 0).unwrap()
        }
        .runs_on_start());
    }

    #[test]
    fn clock_time_parsing() {
        assert_eq!(
            parse_clock_time("14:30"),
            NaiveTime::from_hms_opt(14, 30, 0)
        );
        assert_eq!(parse_clock_time(" 7:05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_clock_time("24:00"), None);
        assert_eq!(parse_clock_time("12:60"), None);
        assert_eq!(parse_clock_time("noon"), None);
    }
}
