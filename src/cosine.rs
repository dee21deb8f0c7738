use crate::types::CorrectionFactors;

pub const DEFAULT_PANEL_AZIMUTH: f64 = std::f64::consts::PI;

pub fn compute_factors(
    altitude_rad: f64,
    azimuth_rad: f64,
    panel_tilt_rad: f64,
) -> CorrectionFactors {
    compute_factors_facing(altitude_rad, azimuth_rad, panel_tilt_rad, DEFAULT_PANEL_AZIMUTH)
}

/// Theta is the incidence angle inside the tilt plane, Phi the lateral offset
/// out of it. `cos_theta * cos_phi` equals the cosine of the full incidence
/// angle. Panel azimuth is clockwise from north.
pub fn compute_factors_facing(
    altitude_rad: f64,
    azimuth_rad: f64,
    panel_tilt_rad: f64,
    panel_azimuth_rad: f64,
) -> CorrectionFactors {
    let (sin_alt, cos_alt) = altitude_rad.sin_cos();
    let (sin_az, cos_az) = azimuth_rad.sin_cos();
    let (sin_tilt, cos_tilt) = panel_tilt_rad.sin_cos();
    let (sin_paz, cos_paz) = panel_azimuth_rad.sin_cos();

    // East, north, up
    let sun = [cos_alt * sin_az, cos_alt * cos_az, sin_alt];
    let normal = [sin_tilt * sin_paz, sin_tilt * cos_paz, cos_tilt];
    let lateral = [cos_paz, -sin_paz, 0.0];
    let up_slope = [-cos_tilt * sin_paz, -cos_tilt * cos_paz, sin_tilt];

    let x = dot(&sun, &lateral);
    let y = dot(&sun, &up_slope);
    let z = dot(&sun, &normal);

    let theta = y.atan2(z);
    let phi = x.clamp(-1.0, 1.0).asin();
    CorrectionFactors {
        cos_theta: theta.cos(),
        cos_phi: phi.cos(),
        theta,
        phi,
    }
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

// Not clamped: non-positive means the sun is behind the panel
pub fn apply(raw_irradiance: f64, cos_theta: f64, cos_phi: f64) -> f64 {
    raw_irradiance * cos_theta * cos_phi
}

pub fn apply_factors(raw_irradiance: f64, factors: &CorrectionFactors) -> f64 {
    apply(raw_irradiance, factors.cos_theta, factors.cos_phi)
}
