use crate::data::dataset::{CaseDataset, DatasetError, TargetField};
use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct RegionProjection {
    pub region: String,
    pub confirmed: f64,
    pub deaths: f64,
    pub death_ratio: f64,
    pub growth_rate: f64,
    pub projected: f64,
}

/// The `count` regions with the most confirmed cases at `date`, each with a
/// doubling-based growth rate and the confirmed count projected
/// `horizon_days` out.
pub fn top_regions_with_projection(
    dataset: &CaseDataset,
    date: NaiveDate,
    level: u8,
    count: usize,
    horizon_days: f64,
) -> Result<Vec<RegionProjection>, DatasetError> {
    let confirmed = dataset.aggregate(None, date, level, TargetField::Confirmed)?;
    let deaths = dataset.aggregate(None, date, level, TargetField::Deaths)?;

    let top: Vec<(String, f64)> = confirmed
        .iter()
        .map(|(name, value)| (name.clone(), *value))
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .take(count)
        .collect();

    let rates = growth_rates(dataset, &top, level)?;

    Ok(top
        .into_iter()
        .map(|(region, now)| {
            let dead = deaths.get(&region).copied().unwrap_or(0.0);
            let rate = rates.get(&region).copied().unwrap_or(0.0);
            RegionProjection {
                death_ratio: if now > 0.0 { dead / now } else { 0.0 },
                growth_rate: rate,
                projected: ((rate * horizon_days + 1.0) * now).round(),
                confirmed: now,
                deaths: dead,
                region,
            }
        })
        .collect())
}

/// Walks the recorded dates backwards until each region's latest count is at
/// least double the count at that date, `i` steps back; the rate is
/// ratio / (2 i).
fn growth_rates(
    dataset: &CaseDataset,
    top: &[(String, f64)],
    level: u8,
) -> Result<BTreeMap<String, f64>, DatasetError> {
    let latest: BTreeMap<&str, f64> = top
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    let mut pending: Vec<String> = top.iter().map(|(name, _)| name.clone()).collect();
    let mut rates = BTreeMap::new();

    for (i, date) in dataset.all_dates().iter().rev().enumerate() {
        if pending.is_empty() {
            break;
        }
        if i == 0 {
            continue;
        }
        let at_date =
            dataset.aggregate(Some(pending.as_slice()), *date, level, TargetField::Confirmed)?;
        pending.retain(|region| {
            let now = latest.get(region.as_str()).copied().unwrap_or(0.0);
            let then = at_date.get(region).copied().unwrap_or(0.0);
            // A region that was at zero has certainly doubled by this point.
            let ratio = if then > 0.0 { now / then } else { 2.0 };
            if ratio >= 2.0 {
                rates.insert(region.clone(), ratio / (2.0 * i as f64));
                false
            } else {
                true
            }
        });
    }

    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ingest::RawRecord;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn rec(d: u32, admin0: &str, confirmed: f64, deaths: f64) -> RawRecord {
        RawRecord {
            date: day(d),
            admin0: admin0.to_string(),
            admin1: String::new(),
            admin2: String::new(),
            latitude: None,
            longitude: None,
            confirmed: Some(confirmed),
            deaths: Some(deaths),
        }
    }

    #[test]
    fn growth_rate_finds_the_doubling_point() {
        // 40 today, 30 one step back, 20 two steps back: doubled at i = 2.
        let dataset = CaseDataset::from_records([
            rec(1, "Italy", 10.0, 1.0),
            rec(2, "Italy", 20.0, 2.0),
            rec(3, "Italy", 30.0, 3.0),
            rec(4, "Italy", 40.0, 4.0),
        ]);
        let top = top_regions_with_projection(&dataset, day(4), 0, 10, 5.0).unwrap();
        assert_eq!(top.len(), 1);
        let italy = &top[0];
        // ratio 2.0 at i = 2, so the rate is 2 / 4.
        assert!((italy.growth_rate - 0.5).abs() < 1e-9);
        // (0.5 * 5 + 1) * 40 = 140.
        assert_eq!(italy.projected, 140.0);
        assert!((italy.death_ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn regions_are_ranked_by_confirmed_count() {
        let dataset = CaseDataset::from_records([
            rec(1, "Italy", 10.0, 0.0),
            rec(1, "Spain", 50.0, 0.0),
            rec(2, "Italy", 40.0, 0.0),
            rec(2, "Spain", 120.0, 0.0),
        ]);
        let top = top_regions_with_projection(&dataset, day(2), 0, 1, 5.0).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].region, "Spain");
    }

    #[test]
    fn never_doubling_region_projects_flat() {
        let dataset = CaseDataset::from_records([
            rec(1, "Italy", 100.0, 0.0),
            rec(2, "Italy", 101.0, 0.0),
            rec(3, "Italy", 102.0, 0.0),
        ]);
        let top = top_regions_with_projection(&dataset, day(3), 0, 10, 5.0).unwrap();
        assert_eq!(top[0].growth_rate, 0.0);
        assert_eq!(top[0].projected, 102.0);
    }
}
