use crate::data::ingest::{self, RawRecord};
use crate::prelude::Result as AppResult;
use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("unexpected level={0}, supported levels are 0 (country), 1 (state/province), 2 (sub-division)")]
    UnsupportedLevel(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Confirmed,
    Deaths,
}

/// Administrative key below the date: country, state/province, sub-division.
/// Missing components are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AdminKey {
    pub admin0: String,
    pub admin1: String,
    pub admin2: String,
}

impl AdminKey {
    fn name_at(&self, level: u8) -> Option<&str> {
        match level {
            0 => Some(&self.admin0),
            1 => Some(&self.admin1),
            2 => Some(&self.admin2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseRecord {
    pub confirmed: f64,
    pub deaths: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CaseRecord {
    pub fn field(&self, field: TargetField) -> f64 {
        match field {
            TargetField::Confirmed => self.confirmed,
            TargetField::Deaths => self.deaths,
        }
    }
}

#[derive(Default, Clone, Copy)]
struct FieldAvg {
    sum: f64,
    count: u32,
}

impl FieldAvg {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Default, Clone, Copy)]
struct RecordAvg {
    confirmed: FieldAvg,
    deaths: FieldAvg,
    latitude: FieldAvg,
    longitude: FieldAvg,
}

/// Combined per-date index of regional case records. One record per
/// (date, admin0, admin1, admin2); duplicate raw rows are averaged in.
pub struct CaseDataset {
    by_date: BTreeMap<NaiveDate, BTreeMap<AdminKey, CaseRecord>>,
    all_dates: Vec<NaiveDate>,
}

impl CaseDataset {
    pub fn load(world_path: &Path, usa_path: &Path) -> AppResult<Self> {
        let mut records = ingest::read_world_csv(world_path)?;
        records.extend(ingest::read_usa_csv(usa_path)?);
        let dataset = Self::from_records(records);
        tracing::info!(
            "indexed {} records across {} dates",
            dataset.by_date.values().map(BTreeMap::len).sum::<usize>(),
            dataset.all_dates.len()
        );
        Ok(dataset)
    }

    pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut averages: BTreeMap<NaiveDate, BTreeMap<AdminKey, RecordAvg>> = BTreeMap::new();
        for record in records {
            let key = AdminKey {
                admin0: record.admin0,
                admin1: record.admin1,
                admin2: record.admin2,
            };
            let avg = averages
                .entry(record.date)
                .or_default()
                .entry(key)
                .or_default();
            avg.confirmed.push(record.confirmed);
            avg.deaths.push(record.deaths);
            avg.latitude.push(record.latitude);
            avg.longitude.push(record.longitude);
        }

        let by_date: BTreeMap<NaiveDate, BTreeMap<AdminKey, CaseRecord>> = averages
            .into_iter()
            .map(|(date, keyed)| {
                let keyed = keyed
                    .into_iter()
                    .map(|(key, avg)| {
                        let record = CaseRecord {
                            confirmed: avg.confirmed.mean().unwrap_or(0.0),
                            deaths: avg.deaths.mean().unwrap_or(0.0),
                            latitude: avg.latitude.mean(),
                            longitude: avg.longitude.mean(),
                        };
                        (key, record)
                    })
                    .collect();
                (date, keyed)
            })
            .collect();
        let all_dates = by_date.keys().copied().collect();

        Self { by_date, all_dates }
    }

    /// Sorted, deduplicated list of every recorded date.
    pub fn all_dates(&self) -> &[NaiveDate] {
        &self.all_dates
    }

    /// Largest recorded date not after `query`, clamped to the earliest
    /// recorded date. `None` only for an empty dataset.
    pub fn closest_prior_date(&self, query: NaiveDate) -> Option<NaiveDate> {
        let idx = self.all_dates.partition_point(|date| *date <= query);
        if idx == 0 {
            self.all_dates.first().copied()
        } else {
            Some(self.all_dates[idx - 1])
        }
    }

    /// Sums `field` per location name at `level` for the given date.
    ///
    /// With `locations`, every requested non-empty name gets an entry (zero
    /// when nothing matched); without, all distinct names present at that
    /// level and date are enumerated. Empty names, which stand for "no
    /// sub-division", are skipped.
    pub fn aggregate(
        &self,
        locations: Option<&[String]>,
        date: NaiveDate,
        level: u8,
        field: TargetField,
    ) -> Result<BTreeMap<String, f64>, DatasetError> {
        validate_level(level)?;

        let mut totals = BTreeMap::new();
        if let Some(locations) = locations {
            for location in locations {
                if !location.is_empty() {
                    totals.insert(location.clone(), 0.0);
                }
            }
        }
        let Some(records) = self.by_date.get(&date) else {
            return Ok(totals);
        };

        let filter: Option<HashSet<&str>> =
            locations.map(|names| names.iter().map(String::as_str).collect());
        for (key, record) in records {
            let Some(name) = key.name_at(level) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if let Some(filter) = &filter {
                if !filter.contains(name) {
                    continue;
                }
            }
            *totals.entry(name.to_string()).or_insert(0.0) += record.field(field);
        }

        Ok(totals)
    }

    /// Distinct non-empty names at `level`, taken from the earliest recorded
    /// date. This is the known-region list handed to the shape matcher.
    pub fn locations_at_level(&self, level: u8) -> Result<Vec<String>, DatasetError> {
        validate_level(level)?;
        let Some(records) = self.by_date.values().next() else {
            return Ok(Vec::new());
        };
        Ok(records
            .keys()
            .filter_map(|key| key.name_at(level))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unique()
            .sorted()
            .collect())
    }

    /// Largest single-record value of `field` at `date`, before any
    /// aggregation. Normalizer for the log color scale.
    pub fn max_field_at(&self, date: NaiveDate, field: TargetField) -> f64 {
        self.by_date
            .get(&date)
            .map(|records| {
                records
                    .values()
                    .map(|record| record.field(field))
                    .fold(0.0, f64::max)
            })
            .unwrap_or(0.0)
    }
}

fn validate_level(level: u8) -> Result<(), DatasetError> {
    if level > 2 {
        Err(DatasetError::UnsupportedLevel(level))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn rec(d: u32, admin0: &str, admin1: &str, admin2: &str, confirmed: f64) -> RawRecord {
        RawRecord {
            date: day(d),
            admin0: admin0.to_string(),
            admin1: admin1.to_string(),
            admin2: admin2.to_string(),
            latitude: None,
            longitude: None,
            confirmed: Some(confirmed),
            deaths: Some(confirmed / 10.0),
        }
    }

    #[test]
    fn duplicate_rows_are_averaged() {
        let dataset = CaseDataset::from_records([
            rec(1, "Italy", "", "", 10.0),
            rec(1, "Italy", "", "", 20.0),
        ]);
        let totals = dataset
            .aggregate(None, day(1), 0, TargetField::Confirmed)
            .unwrap();
        assert_eq!(totals["Italy"], 15.0);
    }

    #[test]
    fn closest_prior_date_clamps_and_matches() {
        let dataset =
            CaseDataset::from_records([rec(1, "Italy", "", "", 1.0), rec(5, "Italy", "", "", 2.0)]);
        assert_eq!(dataset.closest_prior_date(day(3)), Some(day(1)));
        assert_eq!(dataset.closest_prior_date(day(5)), Some(day(5)));
        assert_eq!(dataset.closest_prior_date(day(9)), Some(day(5)));
        // Before the earliest recorded date, clamp to it.
        assert_eq!(
            dataset.closest_prior_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            Some(day(1))
        );
    }

    #[test]
    fn closest_prior_date_is_monotonic() {
        let dataset = CaseDataset::from_records([
            rec(2, "Italy", "", "", 1.0),
            rec(7, "Italy", "", "", 2.0),
            rec(19, "Italy", "", "", 3.0),
        ]);
        let queries: Vec<NaiveDate> = (1..25).map(day).collect();
        for pair in queries.windows(2) {
            let earlier = dataset.closest_prior_date(pair[0]).unwrap();
            let later = dataset.closest_prior_date(pair[1]).unwrap();
            assert!(earlier <= later);
        }
    }

    #[test]
    fn country_aggregate_sums_province_rows() {
        let dataset = CaseDataset::from_records([
            rec(1, "Australia", "New South Wales", "", 6.0),
            rec(1, "Australia", "Victoria", "", 4.0),
        ]);
        let totals = dataset
            .aggregate(None, day(1), 0, TargetField::Confirmed)
            .unwrap();
        assert_eq!(totals["Australia"], 10.0);
    }

    #[test]
    fn aggregate_skips_empty_names() {
        let dataset = CaseDataset::from_records([
            rec(1, "Italy", "", "", 5.0),
            rec(1, "Australia", "Victoria", "", 4.0),
        ]);
        let totals = dataset
            .aggregate(None, day(1), 1, TargetField::Confirmed)
            .unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals["Victoria"], 4.0);
    }

    #[test]
    fn aggregate_zero_fills_requested_locations() {
        let dataset = CaseDataset::from_records([rec(1, "Italy", "", "", 5.0)]);
        let locations = vec!["Italy".to_string(), "Spain".to_string()];
        let totals = dataset
            .aggregate(Some(locations.as_slice()), day(1), 0, TargetField::Confirmed)
            .unwrap();
        assert_eq!(totals["Italy"], 5.0);
        assert_eq!(totals["Spain"], 0.0);
    }

    #[test]
    fn aggregate_rejects_unsupported_level() {
        let dataset = CaseDataset::from_records([rec(1, "Italy", "", "", 5.0)]);
        assert_eq!(
            dataset.aggregate(None, day(1), 7, TargetField::Confirmed),
            Err(DatasetError::UnsupportedLevel(7))
        );
    }

    #[test]
    fn locations_come_from_earliest_date() {
        let dataset = CaseDataset::from_records([
            rec(1, "Italy", "", "", 1.0),
            rec(1, "Australia", "", "", 1.0),
            rec(5, "Zimbabwe", "", "", 1.0),
        ]);
        assert_eq!(
            dataset.locations_at_level(0).unwrap(),
            vec!["Australia".to_string(), "Italy".to_string()]
        );
    }

    #[test]
    fn max_field_is_per_record_not_aggregated() {
        let dataset = CaseDataset::from_records([
            rec(1, "Australia", "New South Wales", "", 6.0),
            rec(1, "Australia", "Victoria", "", 4.0),
            rec(1, "Italy", "", "", 5.0),
        ]);
        assert_eq!(dataset.max_field_at(day(1), TargetField::Confirmed), 6.0);
        assert_eq!(dataset.max_field_at(day(9), TargetField::Confirmed), 0.0);
    }
}
