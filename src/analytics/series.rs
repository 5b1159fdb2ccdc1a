//! Daily time series with zero-filled gaps

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::analytics::models::{DailyCount, Timestamped};
use crate::analytics::window::{date_key, Window};

/// Count records per UTC day across the window.
///
/// Records outside the window are ignored. The result has one entry for every
/// calendar day of the window, in ascending order, with zero for quiet days.
pub fn bucket_by_day<T: Timestamped>(records: &[T], window: &Window) -> Vec<DailyCount> {
    let mut per_day: HashMap<String, u64> = HashMap::new();

    for record in records {
        let timestamp = record.timestamp();
        if window.contains(timestamp) {
            *per_day.entry(date_key(timestamp)).or_insert(0) += 1;
        }
    }

    fill_days(window, |key| per_day.get(key).copied().unwrap_or(0))
}

/// Count distinct identifiers per UTC day across the window.
///
/// Same shape as [`bucket_by_day`], but a record only contributes when its
/// identifier has not been seen on that day yet.
pub fn bucket_distinct_by_day<T, K, F>(records: &[T], window: &Window, id_of: F) -> Vec<DailyCount>
where
    T: Timestamped,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut per_day: HashMap<String, HashSet<K>> = HashMap::new();

    for record in records {
        let timestamp = record.timestamp();
        if window.contains(timestamp) {
            per_day
                .entry(date_key(timestamp))
                .or_default()
                .insert(id_of(record));
        }
    }

    fill_days(window, |key| {
        per_day.get(key).map(|ids| ids.len() as u64).unwrap_or(0)
    })
}

fn fill_days<F>(window: &Window, count_for: F) -> Vec<DailyCount>
where
    F: Fn(&str) -> u64,
{
    window
        .days()
        .map(|day| {
            let date = day.format("%Y-%m-%d").to_string();
            let count = count_for(&date);
            DailyCount { date, count }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn may(from: u32, to: u32) -> Window {
        Window::new(
            at(from, 0),
            at(to, 23) + Duration::minutes(59) + Duration::seconds(59),
        )
    }

    #[test]
    fn fills_quiet_days_with_zero() {
        let records = vec![at(1, 9), at(1, 17), at(3, 12)];
        let series = bucket_by_day(&records, &may(1, 4));

        let counts: Vec<_> = series.iter().map(|d| (d.date.as_str(), d.count)).collect();
        assert_eq!(
            counts,
            vec![
                ("2024-05-01", 2),
                ("2024-05-02", 0),
                ("2024-05-03", 1),
                ("2024-05-04", 0),
            ]
        );
    }

    #[test]
    fn ignores_records_outside_the_window() {
        // 2024-05-02 08:00 is on a covered day but before the window opens
        let window = Window::new(at(2, 10), at(3, 23));
        let records = vec![at(2, 8), at(2, 11), at(4, 1)];

        let series = bucket_by_day(&records, &window);
        assert_eq!(series.len(), 2);
        assert_eq!(series.iter().map(|d| d.count).sum::<u64>(), 1);
    }

    #[test]
    fn inverted_window_yields_nothing() {
        let window = Window::new(at(5, 0), at(1, 0));
        assert!(bucket_by_day(&[at(3, 0)], &window).is_empty());
    }

    #[test]
    fn empty_input_is_all_zeros() {
        let series = bucket_by_day::<DateTime<Utc>>(&[], &may(1, 7));
        assert_eq!(series.len(), 7);
        assert!(series.iter().all(|d| d.count == 0));
    }

    #[test]
    fn distinct_variant_deduplicates_within_a_day() {
        let records = vec![(at(1, 1), 7), (at(1, 2), 7), (at(1, 3), 8), (at(2, 1), 7)];

        struct Hit(DateTime<Utc>, i64);
        impl Timestamped for Hit {
            fn timestamp(&self) -> DateTime<Utc> {
                self.0
            }
        }
        let hits: Vec<Hit> = records.into_iter().map(|(t, id)| Hit(t, id)).collect();

        let series = bucket_distinct_by_day(&hits, &may(1, 2), |hit| hit.1);
        assert_eq!(series[0].count, 2);
        assert_eq!(series[1].count, 1);
    }
}
