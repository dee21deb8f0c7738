use std::sync::OnceLock;

use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::error::{TimezoneError, TimezoneResult};

static TZF_FINDER: OnceLock<DefaultFinder> = OnceLock::new();

/// Produces the IANA zone for a site. Consulted once, when a session is set up.
pub trait TimezoneResolver {
    fn resolve(&self, lat: f64, lon: f64) -> TimezoneResult<Tz>;
}

/// Looks the zone up from coordinates. There is no UTC fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateResolver;

impl TimezoneResolver for CoordinateResolver {
    fn resolve(&self, lat: f64, lon: f64) -> TimezoneResult<Tz> {
        let finder = TZF_FINDER.get_or_init(DefaultFinder::new);
        let name = finder.get_tz_name(lon, lat);
        if name.is_empty() {
            return Err(TimezoneError::NotFound { lat, lon });
        }
        name.parse::<Tz>()
            .map_err(|_| TimezoneError::Unrecognized(name.to_string()))
    }
}

/// Always answers with the same zone.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimezone(pub Tz);

impl TimezoneResolver for FixedTimezone {
    fn resolve(&self, _lat: f64, _lon: f64) -> TimezoneResult<Tz> {
        Ok(self.0)
    }
}
