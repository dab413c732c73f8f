//! Per-contributor aggregates.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::issue::{Severity, User};

/// Number of trailing months tracked in [`Contributor::month_rewards`].
pub const MONTH_WINDOW: usize = 12;

/// One reward credited to a contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub date: DateTime<Utc>,
    pub amount: f64,
    /// Issue the reward was earned on.
    pub issue_url: String,
}

/// Count of fixes per severity band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityHistogram {
    pub info: u32,
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl SeverityHistogram {
    pub fn record(&mut self, severity: Severity) {
        *self.slot(severity) += 1;
    }

    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Info => self.info,
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    /// Sum of `count * severity score` over all bands.
    pub fn weighted_total(&self) -> f64 {
        Severity::ALL
            .into_iter()
            .map(|s| f64::from(self.get(s)) * s.score())
            .sum()
    }

    fn slot(&mut self, severity: Severity) -> &mut u32 {
        match severity {
            Severity::Info => &mut self.info,
            Severity::Low => &mut self.low,
            Severity::Medium => &mut self.medium,
            Severity::High => &mut self.high,
            Severity::Critical => &mut self.critical,
        }
    }

    fn absorb(&mut self, other: &SeverityHistogram) {
        for severity in Severity::ALL {
            *self.slot(severity) += other.get(severity);
        }
    }
}

/// Index of the month bucket `date` falls into, counting back from the
/// month of `now` (0 = current month). `None` outside the trailing window
/// or in the future.
pub fn month_bucket(date: DateTime<Utc>, now: DateTime<Utc>) -> Option<usize> {
    let month_index = |d: DateTime<Utc>| i64::from(d.year()) * 12 + i64::from(d.month0());
    let back = month_index(now) - month_index(date);
    usize::try_from(back).ok().filter(|b| *b < MONTH_WINDOW)
}

/// Statistics for one contributor across every issue they were credited on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub fix_count: u32,
    pub severity: SeverityHistogram,
    /// Severity score averaged over `fix_count`.
    pub mean_severity: f64,
    /// Time from opening to closing of each credited issue, in minutes.
    pub disclosure_minutes: Vec<i64>,
    pub mean_disclosure_minutes: f64,
    /// Population standard deviation of `disclosure_minutes`.
    pub disclosure_std_dev_minutes: f64,
    pub rewards: Vec<RewardEvent>,
    pub reward_sum: f64,
    /// Rewards per month, bucket 0 being the current month.
    pub month_rewards: [f64; MONTH_WINDOW],
}

impl Contributor {
    pub fn new(user: &User) -> Self {
        Self {
            login: user.login.clone(),
            avatar_url: user.avatar_url.clone(),
            html_url: user.html_url.clone(),
            fix_count: 0,
            severity: SeverityHistogram::default(),
            mean_severity: 0.0,
            disclosure_minutes: Vec::new(),
            mean_disclosure_minutes: 0.0,
            disclosure_std_dev_minutes: 0.0,
            rewards: Vec::new(),
            reward_sum: 0.0,
            month_rewards: [0.0; MONTH_WINDOW],
        }
    }

    /// Count one fix, with its severity and disclosure time when known.
    pub fn record_fix(&mut self, severity: Option<Severity>, disclosure_minutes: Option<i64>) {
        self.fix_count += 1;
        if let Some(severity) = severity {
            self.severity.record(severity);
        }
        if let Some(minutes) = disclosure_minutes {
            self.disclosure_minutes.push(minutes);
        }
    }

    /// Credit a reward and feed the month window relative to `now`.
    pub fn add_reward(&mut self, event: RewardEvent, now: DateTime<Utc>) {
        if let Some(bucket) = month_bucket(event.date, now) {
            self.month_rewards[bucket] += event.amount;
        }
        self.reward_sum += event.amount;
        self.rewards.push(event);
    }

    /// Fold another aggregate for the same login into this one.
    ///
    /// Derived statistics must be recomputed afterwards.
    pub fn absorb(&mut self, other: Contributor) {
        if self.avatar_url.is_none() {
            self.avatar_url = other.avatar_url;
        }
        if self.html_url.is_none() {
            self.html_url = other.html_url;
        }
        self.fix_count += other.fix_count;
        self.severity.absorb(&other.severity);
        self.disclosure_minutes.extend(other.disclosure_minutes);
        for (mine, theirs) in self.month_rewards.iter_mut().zip(other.month_rewards) {
            *mine += theirs;
        }
        self.reward_sum += other.reward_sum;
        self.rewards.extend(other.rewards);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_month_bucket_handles_year_rollover() {
        let now = day(2026, 2, 10);
        assert_eq!(month_bucket(day(2026, 2, 1), now), Some(0));
        assert_eq!(month_bucket(day(2026, 1, 31), now), Some(1));
        assert_eq!(month_bucket(day(2025, 12, 15), now), Some(2));
        assert_eq!(month_bucket(day(2025, 3, 1), now), Some(11));
        assert_eq!(month_bucket(day(2025, 2, 28), now), None);
        assert_eq!(month_bucket(day(2026, 3, 1), now), None);
    }

    #[test]
    fn test_add_reward_updates_sum_and_window() {
        let now = day(2026, 5, 20);
        let mut c = Contributor::new(&User::named("alice"));
        c.add_reward(
            RewardEvent {
                date: day(2026, 4, 2),
                amount: 100.0,
                issue_url: "u1".into(),
            },
            now,
        );
        c.add_reward(
            RewardEvent {
                date: day(2024, 4, 2),
                amount: 50.0,
                issue_url: "u2".into(),
            },
            now,
        );
        assert_eq!(c.reward_sum, 150.0);
        assert_eq!(c.month_rewards[1], 100.0);
        assert_eq!(c.month_rewards.iter().sum::<f64>(), 100.0);
        assert_eq!(c.rewards.len(), 2);
    }

    #[test]
    fn test_histogram_weighted_total() {
        let mut h = SeverityHistogram::default();
        h.record(Severity::Low);
        h.record(Severity::Critical);
        h.record(Severity::Info);
        assert_eq!(h.weighted_total(), 11.5);
    }

    #[test]
    fn test_absorb_merges_counts() {
        let now = day(2026, 5, 20);
        let mut a = Contributor::new(&User::named("alice"));
        a.record_fix(Some(Severity::High), Some(60));
        let mut b = Contributor::new(&User {
            login: "alice".into(),
            avatar_url: Some("https://avatars/alice".into()),
            html_url: None,
        });
        b.record_fix(Some(Severity::High), None);
        b.add_reward(
            RewardEvent {
                date: day(2026, 5, 1),
                amount: 10.0,
                issue_url: "u".into(),
            },
            now,
        );
        a.absorb(b);
        assert_eq!(a.fix_count, 2);
        assert_eq!(a.severity.high, 2);
        assert_eq!(a.reward_sum, 10.0);
        assert_eq!(a.month_rewards[0], 10.0);
        assert_eq!(a.avatar_url.as_deref(), Some("https://avatars/alice"));
    }
}
