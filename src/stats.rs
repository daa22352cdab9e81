use crate::models::{DataError, PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Summary statistics for one series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub symbol: String,
    pub count: usize,
    pub first: Option<f64>,
    pub last: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Percent change from first to last close.
    pub change_pct: Option<f64>,
}

/// Compute summary statistics over the finite closes of a series.
pub fn summary(series: &PriceSeries) -> Summary {
    let mut vals: Vec<f64> = series
        .points
        .iter()
        .map(|p| p.close)
        .filter(|v| v.is_finite())
        .collect();
    let first = vals.first().copied();
    let last = vals.last().copied();
    vals.sort_by(|a, b| a.total_cmp(b));
    let count = vals.len();
    let min = vals.first().copied();
    let max = vals.last().copied();
    let mean = if count > 0 {
        Some(vals.iter().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    let change_pct = match (first, last) {
        (Some(f), Some(l)) if f != 0.0 => Some((l - f) / f * 100.0),
        _ => None,
    };
    Summary {
        symbol: series.symbol.clone(),
        count,
        first,
        last,
        min,
        max,
        mean,
        median,
        change_pct,
    }
}

/// Trailing simple moving average; the first `window - 1` dates have no value.
pub fn moving_average(
    series: &PriceSeries,
    window: usize,
) -> Result<Vec<(NaiveDate, f64)>, DataError> {
    if window == 0 {
        return Err(DataError::ZeroWindow);
    }
    let pts = &series.points;
    let mut out = Vec::with_capacity(pts.len().saturating_sub(window - 1));
    let mut sum = 0.0;
    for (i, p) in pts.iter().enumerate() {
        sum += p.close;
        if i >= window {
            sum -= pts[i - window].close;
        }
        if i + 1 >= window {
            out.push((p.date, sum / window as f64));
        }
    }
    Ok(out)
}

/// Highest close (earliest date on ties).
pub fn all_time_high(series: &PriceSeries) -> Option<PricePoint> {
    series
        .points
        .iter()
        .copied()
        .reduce(|best, p| if p.close > best.close { p } else { best })
}

/// Lowest and highest closes (earliest date on ties).
pub fn extremes(series: &PriceSeries) -> Option<(PricePoint, PricePoint)> {
    let low = series
        .points
        .iter()
        .copied()
        .reduce(|best, p| if p.close < best.close { p } else { best })?;
    let high = all_time_high(series)?;
    Some((low, high))
}
