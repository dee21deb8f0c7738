use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::error::{IngestError, IngestResult};
use crate::types::{Column, Field, FieldDiagnostic, MeasurementRow, RowTable};

/// Number of status lines the device writes before the CSV header.
pub const DEFAULT_PREAMBLE_LINES: usize = 5;

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingested {
    pub table: RowTable,
    pub diagnostics: Vec<FieldDiagnostic>,
}

/// Header names accepted for each column, canonical first.
fn aliases(column: Column) -> &'static [&'static str] {
    match column {
        Column::Time => &["Time (hh:mm:ss)", "Time Local ( hh:mm )"],
        Column::Date => &["Date (yyyy-mm-dd)", "Date Local (yyyy-mm-dd)"],
        Column::IrrDirect => &["IrrDirect (W/m2)", "Irrad. (W/m2)"],
        Column::SolarAzimuth => &["SolarAzimuth (Degrees)"],
        Column::SolarZenith => &["SolarZenith (Degrees)"],
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    time: usize,
    date: usize,
    irradiance: usize,
    azimuth: usize,
    zenith: usize,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord) -> IngestResult<Self> {
        let find = |column: Column| {
            headers
                .iter()
                .position(|h| aliases(column).iter().any(|a| a.trim() == h.trim()))
                .ok_or(IngestError::MissingColumn(column.header()))
        };
        Ok(Self {
            time: find(Column::Time)?,
            date: find(Column::Date)?,
            irradiance: find(Column::IrrDirect)?,
            azimuth: find(Column::SolarAzimuth)?,
            zenith: find(Column::SolarZenith)?,
        })
    }
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw.trim(), fmt).ok())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Skips the first `lines` lines of `text`.
fn strip_preamble(text: &str, lines: usize) -> &str {
    let mut rest = text;
    for _ in 0..lines {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

/// Reads a device export into typed rows.
///
/// Rows whose date or time cannot be read are dropped; other unreadable
/// numbers are kept as [`Field::Unparseable`]. Both cases are reported in
/// [`Ingested::diagnostics`].
pub fn ingest_export(text: &str, preamble_lines: usize) -> IngestResult<Ingested> {
    let body = strip_preamble(text, preamble_lines);
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());
    let columns = ColumnIndex::locate(reader.headers()?)?;

    let mut ingested = Ingested::default();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if let Some(row) = read_row(line, &record, &columns, &mut ingested.diagnostics) {
            ingested.table.push(row);
        }
    }

    for diagnostic in &ingested.diagnostics {
        warn!("{}", diagnostic);
    }
    info!(
        "Ingested {} rows ({} field diagnostics)",
        ingested.table.len(),
        ingested.diagnostics.len()
    );
    Ok(ingested)
}

fn read_row(
    line: usize,
    record: &StringRecord,
    columns: &ColumnIndex,
    diagnostics: &mut Vec<FieldDiagnostic>,
) -> Option<MeasurementRow> {
    let get = |idx: usize| record.get(idx).unwrap_or("");

    let time = parse_time(get(columns.time));
    let date = parse_date(get(columns.date));
    let (time, date) = match (time, date) {
        (Some(t), Some(d)) => (t, d),
        (time, date) => {
            if time.is_none() {
                diagnostics.push(dropped(line, Column::Time, get(columns.time)));
            }
            if date.is_none() {
                diagnostics.push(dropped(line, Column::Date, get(columns.date)));
            }
            return None;
        }
    };

    let mut numeric = |column: Column, idx: usize| {
        let field = Field::parse(get(idx), column);
        if let Field::Unparseable { original, column } = &field {
            diagnostics.push(FieldDiagnostic {
                line,
                column: *column,
                original: original.clone(),
                row_dropped: false,
            });
        }
        field
    };

    Some(MeasurementRow {
        naive_local: NaiveDateTime::new(date, time),
        irradiance_raw: numeric(Column::IrrDirect, columns.irradiance),
        solar_azimuth_deg: numeric(Column::SolarAzimuth, columns.azimuth),
        solar_zenith_deg: numeric(Column::SolarZenith, columns.zenith),
    })
}

fn dropped(line: usize, column: Column, original: &str) -> FieldDiagnostic {
    FieldDiagnostic {
        line,
        column,
        original: original.to_string(),
        row_dropped: true,
    }
}
