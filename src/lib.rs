pub mod angles;
pub mod client;
pub mod config;
pub mod cosine;
pub mod dst;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod sampling;
pub mod timezone;
pub mod types;

pub use angles::{
    deg_to_rad, normalize_angle, rad_to_deg, solar_altitude, sun_angles, zenith_to_altitude_radians,
};

pub use client::{export_file_name, export_payload, parse_latest_irradiance, DeviceSource, RazonClient};

pub use config::{DeviceConfig, PacingConfig, SessionConfig};

pub use cosine::{apply, apply_factors, compute_factors, compute_factors_facing, DEFAULT_PANEL_AZIMUTH};

pub use dst::{correct, dst_active_at, parse_timezone, to_device_clock, DST_SHIFT_HOURS};

pub use error::{
    AcquisitionError, ConfigError, DstError, IngestError, PipelineError, PipelineResult,
    TimezoneError, TimezoneResult,
};

pub use ingest::{ingest_export, parse_date, parse_time, Ingested, DEFAULT_PREAMBLE_LINES};

pub use pipeline::{cos_correct, FactorTable, IntervalReport, LatestReport, RazonPipeline};

pub use sampling::{annotate, resample_interval, sample_interval, sample_trailing, TrailingWindow};

pub use timezone::{CoordinateResolver, FixedTimezone, TimezoneResolver};

pub use types::{
    Column, CorrectedRow, CorrectionFactors, Field, FieldDiagnostic, LatestSample,
    MeasurementRow, PanelConfig, RowTable, SampledRow, SamplingWindow, SunAngles,
};
