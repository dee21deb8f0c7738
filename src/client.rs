use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DeviceConfig;
use crate::error::{AcquisitionError, AcquisitionResult};
use crate::types::{Column, Field};

/// Where raw device data comes from.
pub trait DeviceSource {
    /// Raw CSV export covering `[begin, end]`. `now` names the export file.
    fn fetch_export(
        &self,
        now: NaiveDateTime,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> AcquisitionResult<String>;

    /// Most recent irradiance from the tracker status page, if it has one.
    fn latest_irradiance(&self) -> AcquisitionResult<Option<f64>>;
}

impl<T: DeviceSource + ?Sized> DeviceSource for &T {
    fn fetch_export(
        &self,
        now: NaiveDateTime,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> AcquisitionResult<String> {
        (**self).fetch_export(now, begin, end)
    }

    fn latest_irradiance(&self) -> AcquisitionResult<Option<f64>> {
        (**self).latest_irradiance()
    }
}

/// HTTP client for a RaZON device on the local network.
#[derive(Debug, Clone)]
pub struct RazonClient {
    http: Client,
    export_url: String,
    status_url: String,
}

impl RazonClient {
    pub fn new(config: &DeviceConfig) -> AcquisitionResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            export_url: format!("http://{}{}", config.address, config.export_path),
            status_url: format!("http://{}{}", config.address, config.status_path),
        })
    }

    fn get_text(&self, url: &str, form: Option<&[(&str, String)]>) -> AcquisitionResult<String> {
        let mut request = self.http.get(url);
        if let Some(form) = form {
            request = request.form(form);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text()?)
    }
}

/// Export file name the device expects, e.g. `04-09-18.csv`.
pub fn export_file_name(now: NaiveDateTime) -> String {
    format!("{}.csv", now.format("%m-%d-%y"))
}

pub fn export_payload(now: NaiveDateTime, begin: NaiveDate, end: NaiveDate) -> [(&'static str, String); 3] {
    [
        ("beginDate", begin.format("%Y-%m-%d").to_string()),
        ("endDate", end.format("%Y-%m-%d").to_string()),
        ("fileName", export_file_name(now)),
    ]
}

/// Picks the irradiance out of a status body such as
/// `[["2018-04-09", "13:45:00", 812.3, 1, 0]]`: third-from-last element of
/// the first entry. A reading that is missing or not a number is logged and
/// comes back as `None`; only a body that is not a list of entries is an error.
pub fn parse_latest_irradiance(body: &str) -> AcquisitionResult<Option<f64>> {
    let entries: Vec<Vec<Value>> = serde_json::from_str(body.trim())
        .map_err(|e| AcquisitionError::MalformedResponse(e.to_string()))?;
    let Some(first) = entries.first() else {
        return Ok(None);
    };
    let Some(value) = first.len().checked_sub(3).and_then(|idx| first.get(idx)) else {
        warn!("Status entry too short to hold an irradiance: {:?}", first);
        return Ok(None);
    };
    let field = match value {
        Value::String(s) => Field::parse(s, Column::IrrDirect),
        other => Field::parse(&other.to_string(), Column::IrrDirect),
    };
    if let Field::Unparseable { original, column } = &field {
        warn!("Status reading {:?} for {} is not a number", original, column);
    }
    Ok(field.value())
}

impl DeviceSource for RazonClient {
    fn fetch_export(
        &self,
        now: NaiveDateTime,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> AcquisitionResult<String> {
        let payload = export_payload(now, begin, end);
        debug!("Requesting export {} for {} .. {}", payload[2].1, begin, end);
        self.get_text(&self.export_url, Some(payload.as_slice()))
    }

    fn latest_irradiance(&self) -> AcquisitionResult<Option<f64>> {
        let body = self.get_text(&self.status_url, None)?;
        parse_latest_irradiance(&body)
    }
}
