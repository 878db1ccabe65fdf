use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// The weekly call slot: weekday + wall-clock time in a fixed IANA timezone.
#[derive(Debug, Clone, Copy)]
pub struct CallSchedule {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
    pub tz: Tz,
}

impl CallSchedule {
    /// Nearest strictly-future occurrence of the configured weekday and time.
    ///
    /// If `now` is on the target weekday at or past the target time, the
    /// result is next week's occurrence, never today's already-passed one.
    pub fn next_occurrence(&self, now: DateTime<Tz>) -> DateTime<Tz> {
        let days_ahead = (self.weekday.num_days_from_monday() as i64
            - now.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let date = now.date_naive() + Duration::days(days_ahead);
        let occurrence = at_local(self.tz, date, self.hour, self.minute);
        if occurrence > now {
            occurrence
        } else {
            at_local(self.tz, date + Duration::days(7), self.hour, self.minute)
        }
    }
}

/// Resolve a wall-clock time in `tz`, shifting forward out of a DST gap if
/// the requested time does not exist on that date.
fn at_local(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> DateTime<Tz> {
    let mut naive = date
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| date.and_hms_opt(0, 0, 0).expect("midnight always exists"));
    loop {
        if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
            return dt;
        }
        naive += Duration::hours(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Reminder sent this many hours before the occurrence.
    Reminder(i64),
    /// Look for the call recording and announce it.
    RecordingCheck,
}

/// One-shot, in-memory only. The whole set is discarded and recomputed from
/// "now" on every process start and after every completed cycle.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub kind: JobKind,
    pub fire_at: DateTime<Utc>,
}

/// Derive the job set for the next occurrence: one reminder per configured
/// lead time, plus the recording check at noon the day after the call
/// (local noon, regardless of the call's own minute). Jobs are keyed by
/// name, so a duplicate lead time overwrites rather than duplicates.
pub fn build_jobs(
    schedule: &CallSchedule,
    reminder_hours: &[i64],
    now: DateTime<Utc>,
) -> (DateTime<Tz>, Vec<Job>) {
    let occurrence = schedule.next_occurrence(now.with_timezone(&schedule.tz));

    let mut jobs: BTreeMap<String, Job> = BTreeMap::new();
    for &hours in reminder_hours {
        let name = format!("reminder-{hours}h");
        jobs.insert(
            name.clone(),
            Job {
                name,
                kind: JobKind::Reminder(hours),
                fire_at: (occurrence - Duration::hours(hours)).with_timezone(&Utc),
            },
        );
    }

    let check_at = at_local(
        schedule.tz,
        occurrence.date_naive() + Duration::days(1),
        12,
        0,
    );
    jobs.insert(
        "recording-check".to_string(),
        Job {
            name: "recording-check".to_string(),
            kind: JobKind::RecordingCheck,
            fire_at: check_at.with_timezone(&Utc),
        },
    );

    let mut jobs: Vec<Job> = jobs.into_values().collect();
    jobs.sort_by_key(|j| j.fire_at);
    (occurrence, jobs)
}

/// Run the one-shot job set forever: rebuild from the current instant, fire
/// each job in order, then recompute for the following week. Jobs whose fire
/// time already passed at rebuild are missed for this cycle, not replayed.
/// Action failures are logged and never abort the loop.
pub async fn run<F, Fut>(schedule: CallSchedule, reminder_hours: Vec<i64>, on_fire: F)
where
    F: Fn(JobKind) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    loop {
        let built_at = Utc::now();
        let (occurrence, jobs) = build_jobs(&schedule, &reminder_hours, built_at);
        tracing::info!(
            "Next call: {}",
            occurrence.format("%A %Y-%m-%d %H:%M %Z")
        );
        for job in &jobs {
            tracing::info!(
                "Scheduled job: {} at {}",
                job.name,
                job.fire_at.with_timezone(&schedule.tz).format("%Y-%m-%d %H:%M %Z")
            );
        }

        for job in jobs {
            if job.fire_at <= built_at {
                tracing::warn!("Job {} already in the past, skipping this cycle", job.name);
                continue;
            }
            let wait = (job.fire_at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            tracing::info!("Job fired: {}", job.name);
            if let Err(e) = on_fire(job.kind).await {
                tracing::error!("Job {} failed: {e:#}", job.name);
            }
        }
        // The recording check is always in the future at rebuild, so every
        // cycle makes progress and this loop cannot spin.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Europe::Berlin;

    fn thursday_17() -> CallSchedule {
        CallSchedule {
            weekday: Weekday::Thu,
            hour: 17,
            minute: 0,
            tz: Berlin,
        }
    }

    fn berlin(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Berlin.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_monday_morning_resolves_to_same_week() {
        // 2026-08-24 is a Monday
        let now = berlin(2026, 8, 24, 9, 0);
        let next = thursday_17().next_occurrence(now);
        assert_eq!(next, berlin(2026, 8, 27, 17, 0));
        assert_eq!(next.weekday(), Weekday::Thu);
    }

    #[test]
    fn test_exact_slot_rolls_to_next_week() {
        let now = berlin(2026, 8, 27, 17, 0);
        let next = thursday_17().next_occurrence(now);
        assert_eq!(next, berlin(2026, 9, 3, 17, 0));
    }

    #[test]
    fn test_one_minute_before_is_today() {
        let now = berlin(2026, 8, 27, 16, 59);
        let next = thursday_17().next_occurrence(now);
        assert_eq!(next, berlin(2026, 8, 27, 17, 0));
    }

    #[test]
    fn test_just_past_slot_rolls_over() {
        let now = berlin(2026, 8, 27, 17, 1);
        let next = thursday_17().next_occurrence(now);
        assert_eq!(next, berlin(2026, 9, 3, 17, 0));
    }

    #[test]
    fn test_always_future_and_within_a_week() {
        let schedule = thursday_17();
        for day in 1..=14 {
            for hour in [0, 8, 16, 17, 18, 23] {
                let now = berlin(2026, 8, day, hour, 30);
                let next = schedule.next_occurrence(now);
                assert!(next > now, "not in the future for {now}");
                assert!(next - now <= Duration::days(7), "more than 7d ahead for {now}");
                assert_eq!(next.weekday(), Weekday::Thu);
                assert_eq!(next.hour(), 17);
                assert_eq!(next.minute(), 0);
                assert_eq!(next.second(), 0);
            }
        }
    }

    #[test]
    fn test_reminder_offsets() {
        let now = berlin(2026, 8, 24, 9, 0).with_timezone(&Utc);
        let (occurrence, jobs) = build_jobs(&thursday_17(), &[72, 24, 1], now);
        assert_eq!(jobs.len(), 4);

        let fire = |name: &str| {
            jobs.iter()
                .find(|j| j.name == name)
                .unwrap_or_else(|| panic!("missing job {name}"))
                .fire_at
        };
        let occ_utc = occurrence.with_timezone(&Utc);
        assert_eq!(fire("reminder-72h"), occ_utc - Duration::hours(72));
        assert_eq!(fire("reminder-24h"), occ_utc - Duration::hours(24));
        assert_eq!(fire("reminder-1h"), occ_utc - Duration::hours(1));

        // 72h before Thursday 17:00 is Monday 17:00, same week
        let reminder_local = fire("reminder-72h").with_timezone(&Berlin);
        assert_eq!(reminder_local, berlin(2026, 8, 24, 17, 0));
    }

    #[test]
    fn test_recording_check_is_next_day_noon_regardless_of_minute() {
        let schedule = CallSchedule {
            weekday: Weekday::Thu,
            hour: 17,
            minute: 45,
            tz: Berlin,
        };
        let now = berlin(2026, 8, 24, 9, 0).with_timezone(&Utc);
        let (_, jobs) = build_jobs(&schedule, &[72, 24, 1], now);
        let check = jobs
            .iter()
            .find(|j| j.name == "recording-check")
            .unwrap()
            .fire_at
            .with_timezone(&Berlin);
        assert_eq!(check, berlin(2026, 8, 28, 12, 0));
    }

    #[test]
    fn test_duplicate_lead_times_collapse() {
        let now = berlin(2026, 8, 24, 9, 0).with_timezone(&Utc);
        let (_, jobs) = build_jobs(&thursday_17(), &[24, 24, 1], now);
        assert_eq!(jobs.len(), 3); // reminder-24h, reminder-1h, recording-check
    }

    #[test]
    fn test_jobs_sorted_by_fire_time() {
        let now = berlin(2026, 8, 24, 9, 0).with_timezone(&Utc);
        let (_, jobs) = build_jobs(&thursday_17(), &[1, 72, 24], now);
        for pair in jobs.windows(2) {
            assert!(pair[0].fire_at <= pair[1].fire_at);
        }
        assert_eq!(jobs.last().unwrap().name, "recording-check");
    }

    #[test]
    fn test_dst_gap_shifts_forward() {
        // Europe/Berlin skips 02:00-03:00 on 2026-03-29 (a Sunday)
        let schedule = CallSchedule {
            weekday: Weekday::Sun,
            hour: 2,
            minute: 30,
            tz: Berlin,
        };
        let now = berlin(2026, 3, 27, 12, 0);
        let next = schedule.next_occurrence(now);
        assert!(next > now);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 29).unwrap());
        assert_eq!(next.hour(), 3); // shifted out of the gap
    }
}
