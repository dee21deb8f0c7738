use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};

/// Columns of a device export that carry numeric readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Time,
    Date,
    IrrDirect,
    SolarAzimuth,
    SolarZenith,
}

impl Column {
    /// Header name as written by the device export.
    pub fn header(self) -> &'static str {
        match self {
            Column::Time => "Time (hh:mm:ss)",
            Column::Date => "Date (yyyy-mm-dd)",
            Column::IrrDirect => "IrrDirect (W/m2)",
            Column::SolarAzimuth => "SolarAzimuth (Degrees)",
            Column::SolarZenith => "SolarZenith (Degrees)",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// A numeric reading that either parsed or kept its original text.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Parsed(f64),
    Unparseable { original: String, column: Column },
}

impl Field {
    pub fn parse(raw: &str, column: Column) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) => Field::Parsed(value),
            Err(_) => Field::Unparseable {
                original: raw.to_string(),
                column,
            },
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Field::Parsed(v) => Some(*v),
            Field::Unparseable { .. } => None,
        }
    }
}

/// One sampled instant as reported by the device (clock never DST-adjusted).
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub naive_local: NaiveDateTime,
    pub irradiance_raw: Field,
    pub solar_azimuth_deg: Field,
    pub solar_zenith_deg: Field,
}

impl MeasurementRow {
    pub fn time_of_day(&self) -> NaiveTime {
        self.naive_local.time()
    }
}

pub type RowTable = Vec<MeasurementRow>;

/// A row that survived windowing, annotated with its corrected local time.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledRow {
    pub row: MeasurementRow,
    /// Position in the table the row was sampled from.
    pub source_index: usize,
    pub corrected_local: NaiveDateTime,
    pub was_dst: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunAngles {
    pub azimuth_rad: f64,
    pub altitude_rad: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionFactors {
    pub cos_theta: f64,
    pub cos_phi: f64,
    pub theta: f64,
    pub phi: f64,
}

/// Final pipeline output row. Angle and correction fields are `None` when
/// one of the readings they depend on was unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedRow {
    pub sampled: SampledRow,
    pub angles: Option<SunAngles>,
    pub factors: Option<CorrectionFactors>,
    pub corrected_irradiance: Option<f64>,
}

/// Inclusive calendar window in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SamplingWindow {
    /// Returns `None` when `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Panel orientation for a session, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelConfig {
    pub latitude_rad: f64,
    pub longitude_rad: f64,
    pub tilt_rad: f64,
    /// Direction the panel faces, clockwise from north.
    pub azimuth_rad: f64,
}

/// Single-sample output: `(theta, phi, time_of_day, corrected_irradiance)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestSample {
    pub theta: f64,
    pub phi: f64,
    pub time_of_day: NaiveTime,
    pub corrected_irradiance: f64,
}

/// Problem found while coercing one field of one export row.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiagnostic {
    /// Data line number within the export, 0-based after the header.
    pub line: usize,
    pub column: Column,
    pub original: String,
    pub row_dropped: bool,
}

impl fmt::Display for FieldDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: couldn't convert {:?} in column {}{}",
            self.line,
            self.original,
            self.column,
            if self.row_dropped { " (row dropped)" } else { "" }
        )
    }
}
