use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures while deciding whether daylight saving applies to a local instant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DstError {
    #[error("Unknown timezone identifier: {0}")]
    UnknownTimezone(String),

    #[error("Local time {local} does not exist in {timezone}")]
    NonexistentLocalTime {
        local: NaiveDateTime,
        timezone: String,
    },

    #[error("Local time {0} is out of the representable range")]
    OutOfRange(NaiveDateTime),
}

pub type DstResult<T> = Result<T, DstError>;

/// Device transport errors. Propagated as-is; nothing here is retried.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Device returned error status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed device response: {0}")]
    MalformedResponse(String),
}

pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export is missing required column {0}")]
    MissingColumn(&'static str),
}

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimezoneError {
    #[error("No timezone found for latitude {lat}, longitude {lon}")]
    NotFound { lat: f64, lon: f64 },

    #[error("Resolved timezone {0} is not a known IANA identifier")]
    Unrecognized(String),
}

pub type TimezoneResult<T> = Result<T, TimezoneError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Dst(#[from] DstError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Timezone(#[from] TimezoneError),

    #[error("Correction factors misaligned with sampled rows: {rows} rows, {factors} factor rows")]
    MisalignedFactors { rows: usize, factors: usize },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
