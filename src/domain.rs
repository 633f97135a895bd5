use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{self, format_date, original_date, parse_date, revisit_dates};

// Completions this recent still hide the whole problem from due listings.
const GRACE_PERIOD_DAYS: i64 = 1;

#[derive(Debug)]
pub enum TrackerError {
    InvalidDate(String),
    NotFound(u32),
    NoData,
    NoProblems,
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::InvalidDate(text) => {
                write!(f, "invalid date '{text}': use MM/DD/YYYY or MM/DD/YY")
            }
            TrackerError::NotFound(number) => write!(f, "problem {number} not found"),
            TrackerError::NoData => write!(f, "no data available for statistics"),
            TrackerError::NoProblems => write!(f, "no problems found for statistics"),
        }
    }
}

impl std::error::Error for TrackerError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisitEntry {
    pub number: u32,
    pub revisit: u8,
    #[serde(default)]
    pub completed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "dates::mmddyyyy_opt"
    )]
    pub completed_date: Option<NaiveDate>,
}

/// Date key (MM/DD/YYYY) to the revisit entries falling due that day, in
/// append order. A key with no entries is pruned immediately; algorithms
/// never rely on the map's lexicographic key order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub dates: BTreeMap<String, Vec<RevisitEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueItem {
    pub date: NaiveDate,
    pub number: u32,
    pub revisit: u8,
}

#[derive(Debug, Clone, Default)]
pub struct DueReport {
    pub due: Vec<DueItem>,
    pub overdue: Vec<DueItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    Completed { date: NaiveDate, revisit: u8 },
    AlreadyDone { date: NaiveDate },
}

#[derive(Debug, Clone)]
pub struct StatsReport {
    pub total_problems: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub range: u64,
    pub mode: Option<u64>,
    pub series: Vec<(NaiveDate, u64)>,
    pub y_upper: u64,
}

impl Store {
    /// Schedules one revisit entry per offset date, creating date keys as
    /// needed. Adding the same number again yields an independent schedule.
    pub fn add_problem(
        &mut self,
        number: u32,
        initial: NaiveDate,
        extended: bool,
    ) -> Vec<NaiveDate> {
        let schedule = revisit_dates(initial, extended);

        for (index, revisit_date) in schedule.iter().enumerate() {
            self.dates
                .entry(format_date(*revisit_date))
                .or_default()
                .push(RevisitEntry {
                    number,
                    revisit: (index + 1) as u8,
                    completed: false,
                    completed_date: None,
                });
        }

        schedule
    }

    pub fn due_today(&self, today: NaiveDate) -> DueReport {
        let mut in_grace: HashSet<u32> = HashSet::new();
        for entries in self.dates.values() {
            for entry in entries {
                if !entry.completed {
                    continue;
                }
                if let Some(done) = entry.completed_date {
                    if (today - done).num_days() <= GRACE_PERIOD_DAYS {
                        in_grace.insert(entry.number);
                    }
                }
            }
        }

        let mut pending: Vec<DueItem> = Vec::new();
        for (key, entries) in &self.dates {
            let Ok(date) = parse_date(key) else { continue };
            if date > today {
                continue;
            }
            for entry in entries {
                if !entry.completed && !in_grace.contains(&entry.number) {
                    pending.push(DueItem {
                        date,
                        number: entry.number,
                        revisit: entry.revisit,
                    });
                }
            }
        }

        // Oldest outstanding obligation per problem: earliest date wins,
        // lowest revisit index on ties.
        pending.sort_by_key(|item| (item.date, item.revisit));
        let mut seen: HashSet<u32> = HashSet::new();
        pending.retain(|item| seen.insert(item.number));

        let (mut due, mut overdue): (Vec<DueItem>, Vec<DueItem>) =
            pending.into_iter().partition(|item| item.date == today);
        due.sort_by_key(|item| item.number);
        overdue.sort_by_key(|item| (item.date, item.number));

        DueReport { due, overdue }
    }

    /// Marks the oldest eligible revisit of `number` as done today. Entries
    /// scheduled after `today` are not eligible. Ties on the same date go to
    /// the lowest revisit index, then append order.
    pub fn mark_done(
        &mut self,
        today: NaiveDate,
        number: u32,
    ) -> Result<MarkOutcome, TrackerError> {
        let mut candidates: Vec<(NaiveDate, u8, String, usize)> = Vec::new();
        for (key, entries) in &self.dates {
            let Ok(date) = parse_date(key) else { continue };
            if date > today {
                continue;
            }
            for (index, entry) in entries.iter().enumerate() {
                if entry.number == number {
                    candidates.push((date, entry.revisit, key.clone(), index));
                }
            }
        }

        let Some((date, revisit, key, index)) = candidates
            .into_iter()
            .min_by_key(|(date, revisit, _, index)| (*date, *revisit, *index))
        else {
            return Err(TrackerError::NotFound(number));
        };

        let entry = self
            .dates
            .get_mut(&key)
            .and_then(|entries| entries.get_mut(index))
            .ok_or(TrackerError::NotFound(number))?;

        if entry.completed {
            return Ok(MarkOutcome::AlreadyDone { date });
        }

        entry.completed = true;
        entry.completed_date = Some(today);
        Ok(MarkOutcome::Completed { date, revisit })
    }

    /// Removes every entry for `number` on every date and prunes emptied
    /// keys. Returns how many entries were removed.
    pub fn delete_problem(&mut self, number: u32) -> usize {
        let mut removed = 0;
        self.dates.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.number != number);
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }

    /// Reconstructs each problem's original attempt day from its earliest
    /// recorded revisit, then builds a gap-free per-day series from `start`
    /// (or the first attempt day) through `today`.
    pub fn compute_stats(
        &self,
        start: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<StatsReport, TrackerError> {
        if self.dates.is_empty() {
            return Err(TrackerError::NoData);
        }

        let mut first_revisits: HashMap<u32, (u8, NaiveDate)> = HashMap::new();
        for (key, entries) in &self.dates {
            let Ok(date) = parse_date(key) else { continue };
            for entry in entries {
                let candidate = (entry.revisit, date);
                first_revisits
                    .entry(entry.number)
                    .and_modify(|current| {
                        if candidate < *current {
                            *current = candidate;
                        }
                    })
                    .or_insert(candidate);
            }
        }

        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for (revisit, date) in first_revisits.values() {
            *per_day.entry(original_date(*date, *revisit)).or_insert(0) += 1;
        }

        let Some(first_day) = per_day.keys().next().copied() else {
            return Err(TrackerError::NoProblems);
        };
        let first_day = start.unwrap_or(first_day);

        let mut series: Vec<(NaiveDate, u64)> = Vec::new();
        let mut day = first_day;
        while day <= today {
            series.push((day, per_day.get(&day).copied().unwrap_or(0)));
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        if series.is_empty() {
            return Err(TrackerError::NoData);
        }

        let counts: Vec<u64> = series.iter().map(|(_, count)| *count).collect();
        let mean = counts.iter().sum::<u64>() as f64 / counts.len() as f64;
        let max = counts.iter().copied().max().unwrap_or(0);
        let min = counts.iter().copied().min().unwrap_or(0);

        Ok(StatsReport {
            total_problems: first_revisits.len(),
            mean,
            median: median(&counts),
            std_dev: sample_std_dev(&counts, mean),
            range: max - min,
            mode: mode(&counts),
            series,
            y_upper: (max / 10 + 1) * 10,
        })
    }
}

fn median(counts: &[u64]) -> f64 {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

fn sample_std_dev(counts: &[u64], mean: f64) -> f64 {
    if counts.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = counts
        .iter()
        .map(|&count| {
            let delta = count as f64 - mean;
            delta * delta
        })
        .sum();
    (sum_sq / (counts.len() - 1) as f64).sqrt()
}

// None when several values tie for the highest frequency (no unique mode).
fn mode(counts: &[u64]) -> Option<u64> {
    let mut frequencies: HashMap<u64, usize> = HashMap::new();
    for &count in counts {
        *frequencies.entry(count).or_insert(0) += 1;
    }

    let best = frequencies.values().copied().max()?;
    let mut modes = frequencies
        .iter()
        .filter(|&(_, &frequency)| frequency == best)
        .map(|(&value, _)| value);
    let candidate = modes.next()?;
    if modes.next().is_some() {
        None
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::dates::parse_date;

    use super::{MarkOutcome, RevisitEntry, Store, TrackerError};

    fn date(text: &str) -> NaiveDate {
        parse_date(text).expect("test date should parse")
    }

    fn entry(number: u32, revisit: u8) -> RevisitEntry {
        RevisitEntry {
            number,
            revisit,
            completed: false,
            completed_date: None,
        }
    }

    #[test]
    fn add_problem_creates_one_entry_per_offset() {
        let mut store = Store::default();
        store.add_problem(42, date("06/01/2024"), false);

        let mut indices = Vec::new();
        for entries in store.dates.values() {
            for entry in entries {
                assert_eq!(entry.number, 42);
                assert!(!entry.completed);
                assert!(entry.completed_date.is_none());
                indices.push(entry.revisit);
            }
        }
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(store.dates.contains_key("06/04/2024"));
        assert!(store.dates.contains_key("06/15/2024"));
        assert!(store.dates.contains_key("07/01/2024"));
    }

    #[test]
    fn add_problem_extended_creates_six_entries() {
        let mut store = Store::default();
        store.add_problem(7, date("06/01/2024"), true);

        let total: usize = store.dates.values().map(Vec::len).sum();
        assert_eq!(total, 6);
        assert!(store.dates.contains_key("06/01/2025"));
    }

    #[test]
    fn due_today_lists_first_revisit_on_its_day() {
        let mut store = Store::default();
        store.add_problem(42, date("06/01/2024"), false);

        let report = store.due_today(date("06/04/2024"));
        assert_eq!(report.due.len(), 1);
        assert_eq!(report.due[0].number, 42);
        assert_eq!(report.due[0].revisit, 1);
        assert!(report.overdue.is_empty());
    }

    #[test]
    fn grace_period_suppresses_whole_problem() {
        let mut store = Store::default();
        store.add_problem(42, date("06/01/2024"), false);
        let outcome = store
            .mark_done(date("06/04/2024"), 42)
            .expect("entry should be eligible");
        assert_eq!(
            outcome,
            MarkOutcome::Completed {
                date: date("06/04/2024"),
                revisit: 1
            }
        );

        let same_day = store.due_today(date("06/04/2024"));
        assert!(same_day.due.is_empty() && same_day.overdue.is_empty());

        let next_day = store.due_today(date("06/05/2024"));
        assert!(next_day.due.is_empty() && next_day.overdue.is_empty());

        // Grace expired, but revisit #2 (06/15) is not yet due either.
        let after_grace = store.due_today(date("06/06/2024"));
        assert!(after_grace.due.is_empty() && after_grace.overdue.is_empty());
    }

    #[test]
    fn grace_period_hides_entries_on_other_dates_too() {
        let mut store = Store::default();
        store
            .dates
            .entry("06/01/2024".to_string())
            .or_default()
            .push(entry(9, 1));
        store
            .dates
            .entry("06/04/2024".to_string())
            .or_default()
            .push(RevisitEntry {
                number: 9,
                revisit: 2,
                completed: true,
                completed_date: Some(date("06/04/2024")),
            });

        // The overdue #1 entry is hidden while #2's completion is fresh.
        let report = store.due_today(date("06/04/2024"));
        assert!(report.due.is_empty() && report.overdue.is_empty());

        let later = store.due_today(date("06/06/2024"));
        assert_eq!(later.overdue.len(), 1);
        assert_eq!(later.overdue[0].revisit, 1);
    }

    #[test]
    fn due_today_keeps_only_oldest_obligation_per_problem() {
        let mut store = Store::default();
        store
            .dates
            .entry("06/01/2024".to_string())
            .or_default()
            .push(entry(5, 1));
        store
            .dates
            .entry("06/03/2024".to_string())
            .or_default()
            .push(entry(5, 2));
        store
            .dates
            .entry("06/03/2024".to_string())
            .or_default()
            .push(entry(2, 1));

        let report = store.due_today(date("06/03/2024"));
        let mut numbers: Vec<u32> = report
            .due
            .iter()
            .chain(report.overdue.iter())
            .map(|item| item.number)
            .collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![2, 5]);

        // Problem 5's oldest obligation is the overdue #1, not today's #2.
        assert_eq!(report.overdue[0].number, 5);
        assert_eq!(report.overdue[0].revisit, 1);
        assert_eq!(report.due[0].number, 2);
    }

    #[test]
    fn due_today_sorts_overdue_by_date_then_number() {
        let mut store = Store::default();
        store
            .dates
            .entry("06/02/2024".to_string())
            .or_default()
            .push(entry(8, 1));
        store
            .dates
            .entry("06/01/2024".to_string())
            .or_default()
            .push(entry(9, 1));
        store
            .dates
            .entry("06/01/2024".to_string())
            .or_default()
            .push(entry(3, 1));

        let report = store.due_today(date("06/10/2024"));
        let order: Vec<u32> = report.overdue.iter().map(|item| item.number).collect();
        assert_eq!(order, vec![3, 9, 8]);
    }

    #[test]
    fn mark_done_fails_when_no_entry_is_eligible() {
        let mut store = Store::default();
        assert!(matches!(
            store.mark_done(date("06/01/2024"), 42),
            Err(TrackerError::NotFound(42))
        ));

        // Future-scheduled entries are not eligible yet.
        store.add_problem(42, date("06/01/2024"), false);
        assert!(matches!(
            store.mark_done(date("06/02/2024"), 42),
            Err(TrackerError::NotFound(42))
        ));
    }

    #[test]
    fn mark_done_prefers_lowest_revisit_on_same_date() {
        let mut store = Store::default();
        store
            .dates
            .entry("06/01/2024".to_string())
            .or_default()
            .push(entry(4, 2));
        store
            .dates
            .entry("06/01/2024".to_string())
            .or_default()
            .push(entry(4, 1));

        let outcome = store
            .mark_done(date("06/01/2024"), 4)
            .expect("entry should be eligible");
        assert_eq!(
            outcome,
            MarkOutcome::Completed {
                date: date("06/01/2024"),
                revisit: 1
            }
        );
    }

    #[test]
    fn mark_done_twice_reports_already_done_without_mutation() {
        let mut store = Store::default();
        store.add_problem(42, date("06/01/2024"), false);
        store
            .mark_done(date("06/04/2024"), 42)
            .expect("entry should be eligible");

        let outcome = store
            .mark_done(date("06/05/2024"), 42)
            .expect("lookup should succeed");
        assert_eq!(
            outcome,
            MarkOutcome::AlreadyDone {
                date: date("06/04/2024")
            }
        );

        let first = &store.dates["06/04/2024"][0];
        assert_eq!(first.completed_date, Some(date("06/04/2024")));
    }

    #[test]
    fn delete_problem_removes_entries_and_prunes_keys() {
        let mut store = Store::default();
        store.add_problem(42, date("06/01/2024"), false);
        store.add_problem(7, date("06/01/2024"), false);

        assert_eq!(store.delete_problem(42), 3);
        assert_eq!(store.delete_problem(42), 0);

        for entries in store.dates.values() {
            assert!(!entries.is_empty());
            assert!(entries.iter().all(|entry| entry.number == 7));
        }
    }

    #[test]
    fn stats_fails_on_empty_store() {
        let store = Store::default();
        assert!(matches!(
            store.compute_stats(None, date("06/01/2024")),
            Err(TrackerError::NoData)
        ));
    }

    #[test]
    fn stats_buckets_attempts_and_fills_gaps() {
        let mut store = Store::default();
        store.add_problem(1, date("06/01/2024"), false);
        store.add_problem(2, date("06/01/2024"), false);

        let report = store
            .compute_stats(None, date("06/05/2024"))
            .expect("stats should be available");

        assert_eq!(report.total_problems, 2);
        let counts: Vec<u64> = report.series.iter().map(|(_, count)| *count).collect();
        assert_eq!(counts, vec![2, 0, 0, 0, 0]);
        assert_eq!(report.series[0].0, date("06/01/2024"));
        assert_eq!(report.series[4].0, date("06/05/2024"));

        assert!((report.mean - 0.4).abs() < 1e-9);
        assert_eq!(report.median, 0.0);
        assert!((report.std_dev - 0.8f64.sqrt()).abs() < 1e-9);
        assert_eq!(report.range, 2);
        assert_eq!(report.mode, Some(0));
        assert_eq!(report.y_upper, 10);
    }

    #[test]
    fn stats_honors_explicit_start_date() {
        let mut store = Store::default();
        store.add_problem(1, date("06/03/2024"), false);

        let report = store
            .compute_stats(Some(date("06/01/2024")), date("06/04/2024"))
            .expect("stats should be available");
        assert_eq!(report.series.len(), 4);
        assert_eq!(report.series[0], (date("06/01/2024"), 0));
        assert_eq!(report.series[2], (date("06/03/2024"), 1));
    }

    #[test]
    fn stats_reports_no_unique_mode_on_frequency_tie() {
        let mut store = Store::default();
        store.add_problem(1, date("06/01/2024"), false);

        // Two days, counts [1, 0]: both values appear once.
        let report = store
            .compute_stats(None, date("06/02/2024"))
            .expect("stats should be available");
        assert_eq!(report.mode, None);
        assert_eq!(report.median, 0.5);
        assert_eq!(report.range, 1);
    }

    #[test]
    fn stats_y_axis_bound_is_next_multiple_of_ten() {
        let mut store = Store::default();
        for number in 1..=10 {
            store.add_problem(number, date("06/01/2024"), false);
        }

        let report = store
            .compute_stats(None, date("06/01/2024"))
            .expect("stats should be available");
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.y_upper, 20);
        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.mode, Some(10));
    }

    #[test]
    fn stats_uses_smallest_revisit_index_to_recover_attempt_day() {
        let mut store = Store::default();
        // Only revisits #2 and #3 remain recorded for this problem.
        store
            .dates
            .entry("06/15/2024".to_string())
            .or_default()
            .push(entry(3, 2));
        store
            .dates
            .entry("07/01/2024".to_string())
            .or_default()
            .push(entry(3, 3));

        let report = store
            .compute_stats(None, date("06/01/2024"))
            .expect("stats should be available");
        // 06/15 minus the 14-day offset for revisit #2.
        assert_eq!(report.series[0], (date("06/01/2024"), 1));
    }
}
