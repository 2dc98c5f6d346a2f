use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::Observation;

/// Observations keyed and ordered by report time. A report time appears at
/// most once; the first observation stored for a time is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: BTreeMap<OffsetDateTime, Observation>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from observations in any order. Later duplicates are dropped.
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut dataset = Dataset::new();
        dataset.merge(observations);
        dataset
    }

    /// Store `observation` unless its report time is already present.
    /// Returns whether it was stored.
    pub fn insert(&mut self, observation: Observation) -> bool {
        match self.records.entry(observation.report_time) {
            Entry::Vacant(slot) => {
                slot.insert(observation);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Insert every observation whose report time is new, returning how many were added.
    pub fn merge<I>(&mut self, observations: I) -> usize
    where
        I: IntoIterator<Item = Observation>,
    {
        observations
            .into_iter()
            .map(|observation| self.insert(observation))
            .filter(|added| *added)
            .count()
    }

    pub fn contains(&self, report_time: &OffsetDateTime) -> bool {
        self.records.contains_key(report_time)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Observations in ascending report time.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Observation> {
        self.records.values()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.records.values().next()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.records.values().next_back()
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.records.into_values().collect()
    }
}

/// Combine a prior dataset with freshly fetched observations.
///
/// Existing records are never replaced; a fetched record is added only when
/// no existing record shares its report time. The result iterates in
/// ascending report time regardless of the input order.
pub fn merge_observations(existing: Dataset, fetched: Vec<Observation>) -> Dataset {
    if existing.is_empty() {
        return Dataset::from_observations(fetched);
    }
    let mut merged = existing;
    merged.merge(fetched);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    fn observation(report_time: OffsetDateTime, raw: &str, speed: u32) -> Observation {
        Observation {
            report_time,
            fetch_time: datetime!(2024-04-02 19:00:00 UTC),
            raw_text: raw.to_string(),
            wind_direction: None,
            wind_speed: Some(speed),
            wind_gust: None,
        }
    }

    fn times(dataset: &Dataset) -> Vec<OffsetDateTime> {
        dataset.iter().map(|o| o.report_time).collect()
    }

    #[test]
    fn keeps_existing_record_on_collision() {
        let t1 = datetime!(2024-04-02 12:53:00 -05:00);
        let t2 = datetime!(2024-04-02 13:53:00 -05:00);
        let existing = Dataset::from_observations(vec![observation(t1, "kept", 10)]);

        let merged = merge_observations(
            existing,
            vec![
                observation(t1, "replacement", 30),
                observation(t2, "new", 12),
            ],
        );

        assert_eq!(merged.len(), 2);
        let first = merged.first().unwrap();
        assert_eq!(first.raw_text, "kept");
        assert_eq!(first.wind_speed, Some(10));
        assert_eq!(merged.last().unwrap().raw_text, "new");
    }

    #[test]
    fn first_merge_sorts_fetched_records() {
        let base = datetime!(2024-04-02 08:53:00 -05:00);
        let fetched = vec![
            observation(base + Duration::hours(2), "c", 3),
            observation(base, "a", 1),
            observation(base + Duration::hours(1), "b", 2),
        ];

        let merged = merge_observations(Dataset::new(), fetched);

        assert_eq!(
            times(&merged),
            vec![base, base + Duration::hours(1), base + Duration::hours(2)]
        );
    }

    #[test]
    fn merging_same_fetch_twice_is_stable() {
        let base = datetime!(2024-04-02 08:53:00 -05:00);
        let fetched: Vec<_> = (0..5)
            .map(|h| observation(base + Duration::hours(h), "x", h as u32))
            .collect();

        let once = merge_observations(Dataset::new(), fetched.clone());
        let twice = merge_observations(once.clone(), fetched);

        assert_eq!(once.len(), 5);
        assert_eq!(once, twice);
    }

    #[test]
    fn count_grows_by_new_timestamps_only() {
        let base = datetime!(2024-04-02 08:53:00 -05:00);
        let hour = |h| base + Duration::hours(h);
        let stored = (0..3).map(|h| observation(hour(h), "old", 1));
        let mut dataset = Dataset::from_observations(stored);

        let fetched = (2..6).map(|h| observation(hour(h), "new", 2));
        let added = dataset.merge(fetched);

        assert_eq!(added, 3);
        assert_eq!(dataset.len(), 6);
    }

    #[test]
    fn dedups_on_instant_not_offset() {
        let utc = datetime!(2024-04-02 18:53:00 UTC);
        let local = datetime!(2024-04-02 13:53:00 -05:00);
        let mut dataset = Dataset::from_observations(vec![observation(utc, "utc", 1)]);

        assert!(!dataset.insert(observation(local, "local", 2)));
        assert!(dataset.contains(&local));
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn duplicates_within_one_fetch_keep_first() {
        let t = datetime!(2024-04-02 13:53:00 -05:00);
        let merged = merge_observations(
            Dataset::new(),
            vec![observation(t, "first", 1), observation(t, "second", 2)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.first().unwrap().raw_text, "first");
    }

    #[test]
    fn empty_inputs() {
        let merged = merge_observations(Dataset::new(), vec![]);
        assert!(merged.is_empty());
        assert!(merged.first().is_none());
        assert!(merged.into_observations().is_empty());
    }
}
