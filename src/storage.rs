use crate::models::{PricePoint, PriceSeries};
use crate::viz::LabelPlacement;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Load a price series from CSV with header `date,close[,volume]`
/// (dates as `YYYY-MM-DD`). Rows are sorted by date.
pub fn load_csv<P: AsRef<Path>>(path: P, symbol: &str) -> Result<PriceSeries> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut points = Vec::new();
    for (i, row) in rdr.deserialize::<PricePoint>().enumerate() {
        let p = row.with_context(|| format!("{}: bad row {}", path.display(), i + 2))?;
        points.push(p);
    }
    Ok(PriceSeries::new(symbol, points))
}

/// Save a series as CSV with header.
pub fn save_csv<P: AsRef<Path>>(series: &PriceSeries, path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(["date", "close", "volume"])?;
    for p in &series.points {
        wtr.serialize((p.date.to_string(), p.close, p.volume))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save a series as pretty JSON.
pub fn save_json<P: AsRef<Path>>(series: &PriceSeries, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(series)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save resolved label placements (anchor and final pixel positions) as JSON.
pub fn save_layout_json<P: AsRef<Path>>(placements: &[LabelPlacement], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(placements)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
