use chrono::{Days, NaiveDate, TimeZone, Timelike};
use tracing::trace;

use crate::record::UserRecord;

pub const DAILY_WINDOW: usize = 30;
pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: usize,
}

impl HourlyCount {
    pub fn label(&self) -> String {
        format!("{}:00", self.hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AvatarSplit {
    pub with_avatar: usize,
    pub without_avatar: usize,
}

impl AvatarSplit {
    pub fn total(&self) -> usize {
        self.with_avatar + self.without_avatar
    }

    /// Share of records with an avatar, 0.0 for an empty snapshot.
    pub fn ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.with_avatar as f64 / self.total() as f64
        }
    }
}

/// Signups per calendar day for the 30 days ending at `reference_date`, oldest first.
pub fn daily_counts(records: &[UserRecord], reference_date: NaiveDate) -> Vec<DailyCount> {
    let start = reference_date
        .checked_sub_days(Days::new(DAILY_WINDOW as u64 - 1))
        .unwrap_or(NaiveDate::MIN);

    let mut days: Vec<DailyCount> = start
        .iter_days()
        .take(DAILY_WINDOW)
        .map(|date| DailyCount { date, count: 0 })
        .collect();

    for day in records.iter().filter_map(UserRecord::created_day) {
        let offset = day.signed_duration_since(start).num_days();
        if offset >= 0
            && let Some(bucket) = days.get_mut(offset as usize)
        {
            bucket.count += 1;
        }
    }
    days
}

pub fn avatar_split(records: &[UserRecord]) -> AvatarSplit {
    let with_avatar = records.iter().filter(|r| r.has_avatar()).count();
    AvatarSplit {
        with_avatar,
        without_avatar: records.len() - with_avatar,
    }
}

/// Signups per hour of day, with the hour taken in `tz`.
pub fn hourly_signups<Tz: TimeZone>(records: &[UserRecord], tz: &Tz) -> Vec<HourlyCount> {
    let mut hours: Vec<HourlyCount> = (0..HOURS_PER_DAY as u32)
        .map(|hour| HourlyCount { hour, count: 0 })
        .collect();

    for created in records.iter().filter_map(UserRecord::created) {
        let hour = created.with_timezone(tz).hour() as usize;
        hours[hour].count += 1;
    }
    hours
}

/// The `n` most recently created records, newest first.
///
/// Records without a usable timestamp never show up. Equal timestamps keep
/// their input order.
pub fn most_recent(records: &[UserRecord], n: usize) -> Vec<UserRecord> {
    let mut dated: Vec<_> = records
        .iter()
        .filter_map(|r| r.created().map(|created| (created, r)))
        .collect();
    dated.sort_by(|(a, _), (b, _)| b.cmp(a));
    dated.into_iter().take(n).map(|(_, r)| r.clone()).collect()
}

/// Everything the dashboard page shows, derived from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total: usize,
    pub daily: Vec<DailyCount>,
    pub avatars: AvatarSplit,
    pub hourly: Vec<HourlyCount>,
    pub recent: Vec<UserRecord>,
}

impl DashboardSummary {
    pub fn build<Tz: TimeZone>(
        records: &[UserRecord],
        reference_date: NaiveDate,
        tz: &Tz,
        recent_count: usize,
    ) -> Self {
        let summary = DashboardSummary {
            total: records.len(),
            daily: daily_counts(records, reference_date),
            avatars: avatar_split(records),
            hourly: hourly_signups(records, tz),
            recent: most_recent(records, recent_count),
        };
        trace!(
            "Dashboard summary: total {}, last 30 days {}, avatars {:?}",
            summary.total,
            summary.daily.iter().map(|d| d.count).sum::<usize>(),
            summary.avatars
        );
        summary
    }

    pub fn empty(reference_date: NaiveDate) -> Self {
        DashboardSummary::build(&[], reference_date, &chrono::Utc, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::user;
    use chrono::{FixedOffset, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<UserRecord> {
        let mut records = vec![
            user("1", "Ann", "a@x.com", Some("2024-03-30T10:15:00Z")),
            user("2", "Bob", "b@x.com", Some("2024-03-30T23:59:59Z")),
            user("3", "Cid", "c@x.com", Some("2024-03-01T08:00:00Z")),
            user("4", "Dee", "d@x.com", Some("2024-02-29T08:00:00Z")),
            user("5", "Eve", "e@x.com", None),
            user("6", "Fay", "f@x.com", Some("not a date")),
            user("7", "Gus", "g@x.com", Some("2024-04-01T00:00:00Z")),
        ];
        records[0].avatar = Some("https://img/1.png".to_string());
        records[2].avatar = Some("".to_string());
        records[3].avatar = Some("https://img/4.png".to_string());
        records
    }

    #[test]
    fn daily_counts_cover_thirty_consecutive_days() {
        let reference = date(2024, 3, 30);
        let days = daily_counts(&sample(), reference);

        assert_eq!(days.len(), DAILY_WINDOW);
        assert_eq!(days.first().unwrap().date, date(2024, 3, 1));
        assert_eq!(days.last().unwrap().date, reference);
        for pair in days.windows(2) {
            assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
        }

        // 2024-02-29 is one day too old, 2024-04-01 lies in the future
        assert_eq!(days.last().unwrap().count, 2);
        assert_eq!(days.first().unwrap().count, 1);
        assert_eq!(days.iter().map(|d| d.count).sum::<usize>(), 3);
    }

    #[test]
    fn daily_counts_bucket_by_the_timestamps_own_offset() {
        let records = vec![
            user("1", "Ann", "a@x.com", Some("2024-03-01T00:30:00+02:00")),
            user("2", "Bob", "b@x.com", Some("2024-03-01T23:30:00-05:00")),
        ];
        let days = daily_counts(&records, date(2024, 3, 30));
        // Both are 2024-02-29 or 2024-03-02 in UTC, but count on 2024-03-01
        assert_eq!(days[0].date, date(2024, 3, 1));
        assert_eq!(days[0].count, 2);
        assert_eq!(days[1].count, 0);
    }

    #[test]
    fn daily_counts_empty_snapshot_is_all_zero() {
        let days = daily_counts(&[], date(2024, 1, 15));
        assert_eq!(days.len(), DAILY_WINDOW);
        assert!(days.iter().all(|d| d.count == 0));
        assert_eq!(days[0].date, date(2023, 12, 17));
    }

    #[test]
    fn avatar_split_sums_to_record_count() {
        let records = sample();
        let split = avatar_split(&records);
        assert_eq!(split.with_avatar, 2);
        assert_eq!(split.without_avatar, 5);
        assert_eq!(split.total(), records.len());

        assert_eq!(avatar_split(&[]), AvatarSplit::default());
    }

    #[test]
    fn any_non_empty_avatar_counts() {
        let mut blank = user("1", "Ann", "a@x.com", None);
        blank.avatar = Some(" ".to_string());
        let split = avatar_split(&[blank, user("2", "Bob", "b@x.com", None)]);
        assert_eq!(
            split,
            AvatarSplit {
                with_avatar: 1,
                without_avatar: 1
            }
        );
        assert_eq!(AvatarSplit::default().ratio(), 0.0);
    }

    #[test]
    fn hourly_signups_counts_every_parseable_record() {
        let records = sample();
        let hours = hourly_signups(&records, &Utc);

        assert_eq!(hours.len(), HOURS_PER_DAY);
        assert!(hours.iter().enumerate().all(|(i, h)| h.hour == i as u32));
        assert_eq!(hours.iter().map(|h| h.count).sum::<usize>(), 5);
        assert_eq!(hours[8].count, 2);
        assert_eq!(hours[10].count, 1);
        assert_eq!(hours[23].count, 1);
        assert_eq!(hours[0].count, 1);
        assert_eq!(hours[8].label(), "8:00");
    }

    #[test]
    fn hourly_signups_shift_with_time_zone() {
        let records = vec![user("1", "Ann", "a@x.com", Some("2024-03-30T23:30:00Z"))];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let hours = hourly_signups(&records, &plus_two);
        assert_eq!(hours[1].count, 1);
        assert_eq!(hours[23].count, 0);
    }

    #[test]
    fn most_recent_is_newest_first_and_skips_undated() {
        let records = sample();
        let recent = most_recent(&records, 5);
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "2", "1", "3", "4"]);

        for pair in recent.windows(2) {
            assert!(pair[0].created() >= pair[1].created());
        }
        assert_eq!(most_recent(&records, 10).len(), 5);
        assert!(most_recent(&records, 0).is_empty());
    }

    #[test]
    fn most_recent_keeps_input_order_for_ties() {
        let records = vec![
            user("a", "A", "a@x.com", Some("2024-01-01T00:00:00Z")),
            user("b", "B", "b@x.com", Some("2024-01-01T00:00:00Z")),
            user("c", "C", "c@x.com", Some("2024-01-01T01:00:00+01:00")),
        ];
        let ids: Vec<String> = most_recent(&records, 3).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn summary_bundles_all_views() {
        let records = sample();
        let summary = DashboardSummary::build(&records, date(2024, 3, 30), &Utc, 3);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.recent.len(), 3);
        assert_eq!(summary.daily.len(), DAILY_WINDOW);
        assert_eq!(summary.hourly.len(), HOURS_PER_DAY);

        let empty = DashboardSummary::empty(date(2024, 3, 30));
        assert_eq!(empty.total, 0);
        assert_eq!(empty.avatars, AvatarSplit::default());
        assert!(empty.recent.is_empty());
    }
}
