use std::cell::RefCell;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::America::Los_Angeles;
use mockito::Matcher;
use razon_dni::client::{parse_latest_irradiance, DeviceSource, RazonClient};
use razon_dni::config::{DeviceConfig, PacingConfig, SessionConfig};
use razon_dni::cosine::{apply, compute_factors_facing};
use razon_dni::error::{AcquisitionError, AcquisitionResult, PipelineError};
use razon_dni::pipeline::{cos_correct, RazonPipeline};
use razon_dni::timezone::FixedTimezone;
use razon_dni::types::SamplingWindow;

macro_rules! assert_approx {
    ($left:expr, $right:expr, $tol:expr) => {
        let (l, r) = ($left as f64, $right as f64);
        assert!(
            (l - r).abs() <= $tol,
            "assert_approx failed: left={}, right={}, diff={}, tol={}",
            l, r, (l - r).abs(), $tol
        );
    };
}

const EXPORT: &str = include_str!("fixtures/export_2018-04-09.csv");

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

#[derive(Debug)]
struct StubSource {
    export: String,
    status: Option<f64>,
    requests: RefCell<Vec<(NaiveDateTime, NaiveDate, NaiveDate)>>,
}

impl StubSource {
    fn new(export: &str) -> Self {
        Self {
            export: export.to_string(),
            status: Some(852.7),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl DeviceSource for StubSource {
    fn fetch_export(
        &self,
        now: NaiveDateTime,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> AcquisitionResult<String> {
        self.requests.borrow_mut().push((now, begin, end));
        Ok(self.export.clone())
    }

    fn latest_irradiance(&self) -> AcquisitionResult<Option<f64>> {
        Ok(self.status)
    }
}

fn session(address: &str) -> SessionConfig {
    let mut config = SessionConfig::new(37.595932, -122.368848, DeviceConfig::new(address));
    config.timezone = Some("America/Los_Angeles".to_string());
    config.pacing = PacingConfig::none();
    config
}

fn afternoon() -> SamplingWindow {
    SamplingWindow::new(at(2018, 4, 9, 13, 45, 0), at(2018, 4, 9, 16, 0, 0)).unwrap()
}

// ── Construction ──

#[test]
fn test_configured_timezone_wins() {
    let source = StubSource::new(EXPORT);
    let pipeline =
        RazonPipeline::new(&session("razon.local"), &source, &FixedTimezone(chrono_tz::UTC)).unwrap();
    assert_eq!(pipeline.timezone(), Los_Angeles);
}

#[test]
fn test_resolver_used_without_timezone() {
    let mut config = session("razon.local");
    config.timezone = None;
    let pipeline = RazonPipeline::new(&config, StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    assert_eq!(pipeline.timezone(), Los_Angeles);
}

#[test]
fn test_unknown_timezone_rejected() {
    let mut config = session("razon.local");
    config.timezone = Some("Nowhere/Special".to_string());
    let err = RazonPipeline::new(&config, StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap_err();
    assert!(matches!(err, PipelineError::Dst(_)), "{err:?}");
}

#[test]
fn test_device_now_drops_dst_hour() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    assert_eq!(
        pipeline.device_now(at(2018, 4, 9, 14, 46, 0)).unwrap(),
        at(2018, 4, 9, 13, 46, 0)
    );
}

// ── Interval path ──

#[test]
fn test_request_interval_window() {
    let source = StubSource::new(EXPORT);
    let pipeline = RazonPipeline::new(&session("razon.local"), &source, &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_interval(at(2018, 4, 9, 0, 0, 0), &afternoon()).unwrap();

    assert_eq!(report.rows.len(), 12);
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.rows[0].sampled.corrected_local, at(2018, 4, 9, 13, 45, 0));
    assert_eq!(report.rows[11].sampled.corrected_local, at(2018, 4, 9, 16, 0, 0));

    let requests = source.requests.borrow();
    let day = NaiveDate::from_ymd_opt(2018, 4, 9).unwrap();
    assert_eq!(requests.as_slice(), &[(at(2018, 4, 9, 0, 0, 0), day, day)]);
}

#[test]
fn test_request_interval_applies_correction() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_interval(at(2018, 4, 9, 0, 0, 0), &afternoon()).unwrap();
    let panel = *pipeline.panel();

    for row in &report.rows {
        let angles = row.angles.unwrap();
        let factors = row.factors.unwrap();
        let expected = compute_factors_facing(
            angles.altitude_rad,
            angles.azimuth_rad,
            panel.tilt_rad,
            panel.azimuth_rad,
        );
        assert_eq!(factors, expected);
        if let Some(raw) = row.sampled.row.irradiance_raw.value() {
            assert_approx!(
                row.corrected_irradiance.unwrap(),
                apply(raw, factors.cos_theta, factors.cos_phi),
                1e-9
            );
            assert!(row.corrected_irradiance.unwrap() <= raw);
        }
    }
}

#[test]
fn test_unparseable_irradiance_row_survives_without_correction() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_interval(at(2018, 4, 9, 0, 0, 0), &afternoon()).unwrap();
    let row = report
        .rows
        .iter()
        .find(|r| r.sampled.corrected_local == at(2018, 4, 9, 14, 50, 0))
        .unwrap();
    assert!(row.factors.is_some());
    assert_eq!(row.corrected_irradiance, None);
}

#[test]
fn test_request_interval_empty_is_ok() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let window = SamplingWindow::new(at(2018, 4, 10, 13, 45, 0), at(2018, 4, 10, 16, 0, 0)).unwrap();
    let report = pipeline.request_interval(at(2018, 4, 10, 0, 0, 0), &window).unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn test_cos_correct_rejects_misaligned_tables() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_interval(at(2018, 4, 9, 0, 0, 0), &afternoon()).unwrap();
    let sampled: Vec<_> = report.rows.into_iter().map(|r| r.sampled).collect();
    let mut factors = pipeline.factor_table(&sampled);
    factors.pop();
    let err = cos_correct(sampled, factors).unwrap_err();
    assert!(
        matches!(err, PipelineError::MisalignedFactors { rows: 12, factors: 11 }),
        "{err:?}"
    );
}

// ── Latest sample path ──

#[test]
fn test_request_latest_single_sample() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_latest(at(2018, 4, 9, 13, 46, 0), 1).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.status_irradiance, Some(852.7));

    let sample = report.sample().unwrap();
    assert_eq!(sample.time_of_day, NaiveTime::from_hms_opt(13, 46, 0).unwrap());
    let factors = report.rows[0].factors.unwrap();
    assert_eq!(sample.theta, factors.theta);
    assert_eq!(sample.phi, factors.phi);
    assert_approx!(
        sample.corrected_irradiance,
        852.7 * factors.cos_theta * factors.cos_phi,
        1e-9
    );
}

#[test]
fn test_request_latest_keeps_first_row_of_longer_window() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_latest(at(2018, 4, 9, 13, 46, 0), 15).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(
        report.sample().unwrap().time_of_day,
        NaiveTime::from_hms_opt(13, 45, 0).unwrap()
    );
    assert_eq!(report.rows[0].sampled.source_index, 5);
}

#[test]
fn test_request_latest_no_data_yet() {
    let pipeline = RazonPipeline::new(&session("razon.local"), StubSource::new(EXPORT), &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_latest(at(2018, 4, 9, 7, 0, 0), 5).unwrap();
    assert!(report.rows.is_empty());
    assert_eq!(report.sample(), None);
}

// ── HTTP client ──

#[test]
fn test_client_fetch_export_payload() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/loggings/exportdata.csv")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("beginDate".into(), "2018-04-08".into()),
            Matcher::UrlEncoded("endDate".into(), "2018-04-09".into()),
            Matcher::UrlEncoded("fileName".into(), "04-09-18.csv".into()),
        ]))
        .with_status(200)
        .with_body(EXPORT)
        .create();

    let client = RazonClient::new(&DeviceConfig::new(server.host_with_port())).unwrap();
    let text = client
        .fetch_export(
            at(2018, 4, 9, 13, 46, 0),
            NaiveDate::from_ymd_opt(2018, 4, 8).unwrap(),
            NaiveDate::from_ymd_opt(2018, 4, 9).unwrap(),
        )
        .unwrap();
    assert_eq!(text, EXPORT);
    mock.assert();
}

#[test]
fn test_client_error_status() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/loggings/exportdata.csv")
        .with_status(503)
        .create();

    let client = RazonClient::new(&DeviceConfig::new(server.host_with_port())).unwrap();
    let day = NaiveDate::from_ymd_opt(2018, 4, 9).unwrap();
    let err = client.fetch_export(at(2018, 4, 9, 0, 0, 0), day, day).unwrap_err();
    assert!(matches!(err, AcquisitionError::Status { status: 503, .. }), "{err:?}");
}

#[test]
fn test_pipeline_over_http() {
    let mut server = mockito::Server::new();
    let _export = server
        .mock("GET", "/loggings/exportdata.csv")
        .with_body(EXPORT)
        .create();
    let _status = server
        .mock("GET", "/status_trackings/lastirradiance")
        .with_body(r#"[["2018-04-09", "13:46:00", 852.7, 1, 0]]"#)
        .create();

    let config = session(&server.host_with_port());
    let client = RazonClient::new(&config.device).unwrap();
    let pipeline = RazonPipeline::new(&config, client, &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_latest(at(2018, 4, 9, 13, 46, 0), 1).unwrap();
    assert_eq!(report.status_irradiance, Some(852.7));
    assert!(report.sample().is_some());
}

#[test]
fn test_parse_latest_irradiance() {
    assert_eq!(
        parse_latest_irradiance(r#"[["2018-04-09", "13:46:00", 852.7, 1, 0]]"#).unwrap(),
        Some(852.7)
    );
    assert_eq!(
        parse_latest_irradiance(r#"[["2018-04-09", "13:46:00", "852.7", 1, 0]]"#).unwrap(),
        Some(852.7)
    );
    assert_eq!(parse_latest_irradiance("[]").unwrap(), None);
    assert!(matches!(
        parse_latest_irradiance("not a list"),
        Err(AcquisitionError::MalformedResponse(_))
    ));
    assert_eq!(parse_latest_irradiance("[[1, 2]]").unwrap(), None);
}

#[test]
fn test_parse_latest_irradiance_non_numeric_is_none() {
    assert_eq!(
        parse_latest_irradiance(r#"[["2018-04-09", "13:46:00", "N/A", 1, 0]]"#).unwrap(),
        None
    );
    assert_eq!(
        parse_latest_irradiance(r#"[["2018-04-09", "13:46:00", null, 1, 0]]"#).unwrap(),
        None
    );
}

#[test]
fn test_pipeline_over_http_survives_non_numeric_status() {
    let mut server = mockito::Server::new();
    let _export = server
        .mock("GET", "/loggings/exportdata.csv")
        .with_body(EXPORT)
        .create();
    let _status = server
        .mock("GET", "/status_trackings/lastirradiance")
        .with_body(r#"[["2018-04-09","13:46:00","N/A",1,0]]"#)
        .create();

    let config = session(&server.host_with_port());
    let client = RazonClient::new(&config.device).unwrap();
    let pipeline = RazonPipeline::new(&config, client, &FixedTimezone(Los_Angeles)).unwrap();
    let report = pipeline.request_latest(at(2018, 4, 9, 13, 46, 0), 1).unwrap();
    assert_eq!(report.status_irradiance, None);
    assert_eq!(report.rows.len(), 1);
    let sample = report.sample().unwrap();
    assert_eq!(sample.time_of_day, NaiveTime::from_hms_opt(13, 46, 0).unwrap());
}
