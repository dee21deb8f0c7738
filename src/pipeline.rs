use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::angles::sun_angles;
use crate::client::DeviceSource;
use crate::config::{PacingConfig, SessionConfig};
use crate::cosine::{apply_factors, compute_factors_facing};
use crate::dst;
use crate::error::{PipelineError, PipelineResult};
use crate::ingest::ingest_export;
use crate::sampling::{annotate, sample_interval, sample_trailing};
use crate::timezone::TimezoneResolver;
use crate::types::{
    CorrectedRow, CorrectionFactors, FieldDiagnostic, LatestSample, PanelConfig, SampledRow,
    SamplingWindow, SunAngles,
};

/// Per-row angles and factors, aligned by position with the sampled rows.
pub type FactorTable = Vec<Option<(SunAngles, CorrectionFactors)>>;

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    pub rows: Vec<CorrectedRow>,
    pub diagnostics: Vec<FieldDiagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestReport {
    pub rows: Vec<CorrectedRow>,
    pub diagnostics: Vec<FieldDiagnostic>,
    /// Irradiance from the tracker status page, fetched alongside the export.
    pub status_irradiance: Option<f64>,
}

impl LatestReport {
    /// First fully corrected row, or `None` if the device has no data yet.
    pub fn sample(&self) -> Option<LatestSample> {
        let row = self.rows.first()?;
        let factors = row.factors?;
        Some(LatestSample {
            theta: factors.theta,
            phi: factors.phi,
            time_of_day: row.sampled.row.time_of_day(),
            corrected_irradiance: row.corrected_irradiance?,
        })
    }
}

/// Merges correction factors onto sampled rows by position and applies them.
///
/// There is no join key: `factors[i]` belongs to `rows[i]`, so the tables
/// must have the same length.
pub fn cos_correct(rows: Vec<SampledRow>, factors: FactorTable) -> PipelineResult<Vec<CorrectedRow>> {
    if rows.len() != factors.len() {
        return Err(PipelineError::MisalignedFactors {
            rows: rows.len(),
            factors: factors.len(),
        });
    }
    Ok(rows
        .into_iter()
        .zip(factors)
        .map(|(sampled, computed)| {
            let corrected_irradiance = match (&computed, sampled.row.irradiance_raw.value()) {
                (Some((_, f)), Some(raw)) => Some(apply_factors(raw, f)),
                _ => None,
            };
            CorrectedRow {
                sampled,
                angles: computed.map(|(a, _)| a),
                factors: computed.map(|(_, f)| f),
                corrected_irradiance,
            }
        })
        .collect())
}

/// One configured site: device source, timezone and panel orientation.
#[derive(Debug)]
pub struct RazonPipeline<S> {
    source: S,
    tz: Tz,
    panel: PanelConfig,
    preamble_lines: usize,
    pacing: PacingConfig,
}

impl<S: DeviceSource> RazonPipeline<S> {
    pub fn new<R: TimezoneResolver>(
        config: &SessionConfig,
        source: S,
        resolver: &R,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let tz = match &config.timezone {
            Some(id) => dst::parse_timezone(id)?,
            None => resolver.resolve(config.latitude_deg, config.longitude_deg)?,
        };
        info!(
            "Session at ({}, {}) in {}, panel tilt {}°",
            config.latitude_deg,
            config.longitude_deg,
            tz.name(),
            config.panel_tilt_deg
        );
        Ok(Self {
            source,
            tz,
            panel: config.panel(),
            preamble_lines: config.device.preamble_lines,
            pacing: config.pacing,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn panel(&self) -> &PanelConfig {
        &self.panel
    }

    /// Local wall-clock `now` expressed on the device clock.
    pub fn device_now(&self, now_local: NaiveDateTime) -> PipelineResult<NaiveDateTime> {
        let (device, was_dst) = dst::to_device_clock(now_local, self.tz)?;
        debug!("Device clock for {} is {} (dst: {})", now_local, device, was_dst);
        Ok(device)
    }

    pub fn factor_table(&self, rows: &[SampledRow]) -> FactorTable {
        rows.iter()
            .map(|r| {
                sun_angles(&r.row).map(|a| {
                    let f = compute_factors_facing(
                        a.altitude_rad,
                        a.azimuth_rad,
                        self.panel.tilt_rad,
                        self.panel.azimuth_rad,
                    );
                    (a, f)
                })
            })
            .collect()
    }

    pub fn correct_rows(&self, rows: Vec<SampledRow>) -> PipelineResult<Vec<CorrectedRow>> {
        let factors = self.factor_table(&rows);
        cos_correct(rows, factors)
    }

    /// Fetches every row for the window's dates and returns the corrected
    /// rows that fall inside it.
    pub fn request_interval(
        &self,
        now: NaiveDateTime,
        window: &SamplingWindow,
    ) -> PipelineResult<IntervalReport> {
        let text = self
            .source
            .fetch_export(now, window.start.date(), window.end.date())?;
        let ingested = ingest_export(&text, self.preamble_lines)?;
        pause(self.pacing.interval_pause());
        let sampled = sample_interval(&ingested.table, window, self.tz)?;
        if sampled.is_empty() {
            info!("No rows between {} and {}", window.start, window.end);
        }
        Ok(IntervalReport {
            rows: self.correct_rows(sampled)?,
            diagnostics: ingested.diagnostics,
        })
    }

    /// Rows from the trailing `duration_minutes` up to `now`, compared on the
    /// device clock. `now` must already be on the device clock.
    pub fn request_latest(
        &self,
        now: NaiveDateTime,
        duration_minutes: u32,
    ) -> PipelineResult<LatestReport> {
        let text = self.source.fetch_export(now, now.date(), now.date())?;
        let status_irradiance = self.source.latest_irradiance()?;
        let ingested = ingest_export(&text, self.preamble_lines)?;
        pause(self.pacing.trailing_pause());
        let annotated = annotate(&ingested.table, self.tz)?;
        let sampled = sample_trailing(&annotated, now.time(), duration_minutes, |r| {
            r.row.time_of_day()
        });
        if sampled.is_empty() {
            info!("No data yet for the {} minutes up to {}", duration_minutes, now.time());
        }
        Ok(LatestReport {
            rows: self.correct_rows(sampled)?,
            diagnostics: ingested.diagnostics,
            status_irradiance,
        })
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
