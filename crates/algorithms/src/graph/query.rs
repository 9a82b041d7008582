//! Image collection queries
//!
//! A collection is never fetched whole: it is filtered by date and region,
//! optionally cloud-masked scene by scene, then reduced to one image.

use aridex_core::{Error, Region, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open date interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = Error;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::config(
                "date range",
                format!("start {} must be before end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// The calendar month named by `YYYY-MM`, ending on the first of the next.
    pub fn month(month: &str) -> Result<Self> {
        let start = parse_date(&format!("{}-01", month))?;
        let end = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        }
        .ok_or_else(|| Error::config("month", format!("no month follows {}", month)))?;
        Self::new(start, end)
    }

    /// The whole calendar year.
    pub fn year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1);
        let end = NaiveDate::from_ymd_opt(year + 1, 1, 1);
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(Error::config("year", format!("{} is out of range", year))),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| Error::config("date", format!("'{}': {}", text, e)))
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Per-scene cloud mask: a pixel survives when every listed bit of the QA
/// band is clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMask {
    pub qa_band: String,
    pub bits: Vec<u8>,
    /// Keep the QA band in the masked scene
    #[serde(default)]
    pub keep_qa: bool,
}

impl SceneMask {
    pub fn new(qa_band: impl Into<String>, bits: Vec<u8>) -> Self {
        Self {
            qa_band: qa_band.into(),
            bits,
            keep_qa: false,
        }
    }

    /// OR of all listed bits
    pub fn bit_mask(&self) -> u64 {
        self.bits.iter().fold(0u64, |acc, &b| acc | (1u64 << b))
    }
}

/// How a filtered collection collapses into one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reducer {
    /// Earliest scene
    #[default]
    First,
    /// Per-pixel maximum over valid samples
    Max,
    /// Per-pixel sum over valid samples
    Sum,
    /// Later scenes drawn on top of earlier ones where valid
    Mosaic,
    /// The scene at a position in date order
    Nth { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_mask: Option<SceneMask>,
    #[serde(default)]
    pub reducer: Reducer,
}

impl CollectionQuery {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            dates: None,
            bounds: None,
            scene_mask: None,
            reducer: Reducer::First,
        }
    }

    pub fn filter_date(mut self, dates: DateRange) -> Self {
        self.dates = Some(dates);
        self
    }

    pub fn filter_bounds(mut self, region: &Region) -> Self {
        self.bounds = Some(region.clone());
        self
    }

    pub fn mask_scenes(mut self, mask: SceneMask) -> Self {
        self.scene_mask = Some(mask);
        self
    }

    pub fn reduce(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }
}

impl fmt::Display for CollectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collection({}", self.dataset)?;
        if let Some(dates) = &self.dates {
            write!(f, ", {}", dates)?;
        }
        if let Some(mask) = &self.scene_mask {
            write!(f, ", {} bits {:?}", mask.qa_band, mask.bits)?;
        }
        write!(f, ").{:?}", self.reducer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_rolls_over_year() {
        let range = DateRange::month("2019-12").unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2019, 12, 1).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn test_end_is_exclusive() {
        let range = DateRange::parse("2017-01-01", "2017-01-18").unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2017, 1, 17).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2017, 1, 18).unwrap()));
    }

    #[test]
    fn test_reversed_range_is_configuration_error() {
        let err = DateRange::parse("2017-03-28", "2017-02-20").unwrap_err();
        assert!(err.is_configuration());

        let json = r#"{"start":"2017-03-28","end":"2017-02-20"}"#;
        assert!(serde_json::from_str::<DateRange>(json).is_err());
    }

    #[test]
    fn test_bad_month_rejected() {
        assert!(DateRange::month("2019-13").is_err());
        assert!(DateRange::month("march").is_err());
    }

    #[test]
    fn test_bit_mask() {
        let mask = SceneMask::new("pixel_qa", vec![3, 4, 5]);
        assert_eq!(mask.bit_mask(), 0b111000);
    }
}
