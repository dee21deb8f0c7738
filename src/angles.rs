use crate::types::{MeasurementRow, SunAngles};

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * (180.0 / std::f64::consts::PI)
}

pub fn normalize_angle(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

pub fn solar_altitude(zenith_angle: f64) -> f64 {
    90.0 - zenith_angle
}

pub fn zenith_to_altitude_radians(zenith_deg: f64) -> f64 {
    deg_to_rad(solar_altitude(zenith_deg))
}

/// Converts a row's reported azimuth/zenith into radians. `None` if either
/// reading failed to parse.
pub fn sun_angles(row: &MeasurementRow) -> Option<SunAngles> {
    let azimuth = row.solar_azimuth_deg.value()?;
    let zenith = row.solar_zenith_deg.value()?;
    Some(SunAngles {
        azimuth_rad: deg_to_rad(azimuth),
        altitude_rad: zenith_to_altitude_radians(zenith),
    })
}
