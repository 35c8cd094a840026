use crate::prelude::*;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::Path;

/// One remapped row before key-level averaging. Counts stay optional so that
/// blank cells are excluded from the average instead of dragging it to zero.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub admin0: String,
    pub admin1: String,
    pub admin2: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub confirmed: Option<f64>,
    pub deaths: Option<f64>,
}

// Date,Country/Region,Province/State,Lat,Long,Confirmed,Recovered,Deaths
#[derive(Debug, Deserialize)]
struct WorldRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Country/Region")]
    country: String,
    #[serde(rename = "Province/State")]
    province: Option<String>,
    #[serde(rename = "Lat")]
    lat: Option<f64>,
    #[serde(rename = "Long")]
    long: Option<f64>,
    #[serde(rename = "Confirmed")]
    confirmed: Option<f64>,
    #[serde(rename = "Deaths")]
    deaths: Option<f64>,
}

// UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,
// Combined_Key,Population,Date,Confirmed,Deaths
#[derive(Debug, Deserialize)]
struct UsaRow {
    #[serde(rename = "Country_Region")]
    country: String,
    #[serde(rename = "Province_State")]
    state: Option<String>,
    #[serde(rename = "Admin2")]
    county: Option<String>,
    #[serde(rename = "Lat")]
    lat: Option<f64>,
    #[serde(rename = "Long_")]
    long: Option<f64>,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Confirmed")]
    confirmed: Option<f64>,
    #[serde(rename = "Deaths")]
    deaths: Option<f64>,
}

pub fn read_world_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open world data {}", path.display()))?;
    let records = world_records(io::BufReader::new(file))?;
    tracing::info!("read {} world rows from {}", records.len(), path.display());
    Ok(records)
}

pub fn read_usa_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open US data {}", path.display()))?;
    let records = usa_records(io::BufReader::new(file))?;
    tracing::info!("read {} US rows from {}", records.len(), path.display());
    Ok(records)
}

fn world_records<R: io::Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize() {
        let row: WorldRow = row?;
        records.push(RawRecord {
            date: parse_date(&row.date)?,
            admin0: row.country,
            admin1: row.province.unwrap_or_default(),
            admin2: String::new(),
            latitude: row.lat,
            longitude: row.long,
            confirmed: row.confirmed,
            deaths: row.deaths,
        });
    }
    Ok(records)
}

fn usa_records<R: io::Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize() {
        let row: UsaRow = row?;
        records.push(RawRecord {
            date: parse_date(&row.date)?,
            admin0: row.country,
            admin1: row.state.unwrap_or_default(),
            admin2: row.county.unwrap_or_default(),
            latitude: row.lat,
            longitude: row.long,
            confirmed: row.confirmed,
            deaths: row.deaths,
        });
    }
    Ok(records)
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%y"))
        .with_context(|| format!("unparseable date '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_rows_are_remapped() {
        let csv = "\
Date,Country/Region,Province/State,Lat,Long,Confirmed,Recovered,Deaths
2020-03-01,Afghanistan,,33.0,65.0,1,0,0
2020-03-01,Australia,New South Wales,-33.87,151.21,6,2,1
";
        let records = world_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].admin0, "Afghanistan");
        assert_eq!(records[0].admin1, "");
        assert_eq!(records[0].admin2, "");
        assert_eq!(records[0].confirmed, Some(1.0));
        assert_eq!(records[1].admin1, "New South Wales");
        assert_eq!(records[1].deaths, Some(1.0));
        assert_eq!(
            records[1].date,
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
    }

    #[test]
    fn usa_rows_are_remapped() {
        let csv = "\
UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,Population,Date,Confirmed,Deaths
84001001,US,USA,840,1001.0,Autauga,Alabama,US,32.53,-86.64,\"Autauga, Alabama, US\",55869,2020-04-01,12,1
";
        let records = usa_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].admin0, "US");
        assert_eq!(records[0].admin1, "Alabama");
        assert_eq!(records[0].admin2, "Autauga");
        assert_eq!(records[0].confirmed, Some(12.0));
    }

    #[test]
    fn blank_counts_stay_absent() {
        let csv = "\
Date,Country/Region,Province/State,Lat,Long,Confirmed,Recovered,Deaths
2020-01-22,Japan,,36.0,138.0,,,
";
        let records = world_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].confirmed, None);
        assert_eq!(records[0].deaths, None);
    }

    #[test]
    fn slash_dates_parse_too() {
        assert_eq!(
            parse_date("4/12/20").unwrap(),
            NaiveDate::from_ymd_opt(2020, 4, 12).unwrap()
        );
        assert!(parse_date("April 2020").is_err());
    }
}
