use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::America::Los_Angeles;
use tracing_subscriber::EnvFilter;

use razon_dni::client::DeviceSource;
use razon_dni::config::{DeviceConfig, PacingConfig, SessionConfig};
use razon_dni::error::AcquisitionResult;
use razon_dni::pipeline::RazonPipeline;
use razon_dni::timezone::FixedTimezone;
use razon_dni::types::SamplingWindow;

const EXPORT: &str = include_str!("../tests/fixtures/export_2018-04-09.csv");

/// Serves a saved export instead of talking to a device.
#[derive(Debug)]
struct SavedExport;

impl DeviceSource for SavedExport {
    fn fetch_export(&self, _now: NaiveDateTime, _begin: NaiveDate, _end: NaiveDate) -> AcquisitionResult<String> {
        Ok(EXPORT.to_string())
    }

    fn latest_irradiance(&self) -> AcquisitionResult<Option<f64>> {
        Ok(None)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = SessionConfig::new(37.595932, -122.368848, DeviceConfig::new("192.168.15.150"));
    config.pacing = PacingConfig::none();
    let pipeline = RazonPipeline::new(&config, SavedExport, &FixedTimezone(Los_Angeles))
        .context("Failed to set up session")?;

    let day = NaiveDate::from_ymd_opt(2018, 4, 9).context("bad date")?;
    let start = day.and_hms_opt(13, 45, 0).context("bad start")?;
    let end = day.and_hms_opt(16, 0, 0).context("bad end")?;
    let window = SamplingWindow::new(start, end).context("window ends before it starts")?;

    let report = pipeline
        .request_interval(start, &window)
        .context("Failed to sample interval")?;

    println!("=== Cosine-corrected DNI, {} to {} ===", window.start, window.end);
    println!("Panel tilt: {:.1}°  Timezone: {}", config.panel_tilt_deg, pipeline.timezone());
    println!();
    println!("{:<20} {:>8} {:>8} {:>8} {:>10}", "Local time", "Theta", "Phi", "DNI", "Corrected");
    for row in &report.rows {
        let raw = row.sampled.row.irradiance_raw.value();
        match (row.factors, raw, row.corrected_irradiance) {
            (Some(f), Some(raw), Some(corrected)) => println!(
                "{:<20} {:>8.4} {:>8.4} {:>8.1} {:>10.1}",
                row.sampled.corrected_local.to_string(),
                f.theta,
                f.phi,
                raw,
                corrected
            ),
            _ => println!("{:<20} (incomplete reading)", row.sampled.corrected_local.to_string()),
        }
    }
    for diagnostic in &report.diagnostics {
        println!("! {diagnostic}");
    }
    Ok(())
}
