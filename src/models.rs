use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems with input series that make a chart or indicator impossible.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("series `{0}` has no observations")]
    Empty(String),
    #[error("non-finite close value on {0}")]
    NonFinite(NaiveDate),
    #[error("moving-average window must be at least 1")]
    ZeroWindow,
}

/// One daily observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    /// Traded volume, if the source has it.
    #[serde(default)]
    pub volume: Option<f64>,
}

/// A named, date-ordered price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, sorting by date and keeping the last row for duplicate dates.
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(last) if last.date == p.date => *last = p,
                _ => deduped.push(p),
            }
        }
        Self {
            symbol: symbol.into(),
            points: deduped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Fails on empty series and NaN/infinite closes.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.points.is_empty() {
            return Err(DataError::Empty(self.symbol.clone()));
        }
        if let Some(p) = self.points.iter().find(|p| !p.close.is_finite()) {
            return Err(DataError::NonFinite(p.date));
        }
        Ok(())
    }

    pub fn has_volume(&self) -> bool {
        self.points.iter().any(|p| p.volume.is_some())
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Days since 1970-01-01, the x coordinate used on charts.
pub fn date_to_x(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

/// Inverse of [`date_to_x`], rounding to the nearest day.
pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    epoch().checked_add_signed(chrono::Duration::days(x.round() as i64))
}
