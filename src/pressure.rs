use crate::config::PressureCalibration;

/// Map a needle angle onto a linear scale from 0 to `max_unit`.
///
/// Angles below `min_angle` read 0, angles above `max_angle` read `max_unit`,
/// anything in between is interpolated and rounded to two decimals. A NaN angle
/// or an empty angle span reads 0.
pub fn angle_to_unit(angle: f64, min_angle: f64, max_angle: f64, max_unit: f64) -> f64 {
    if angle.is_nan() || angle < min_angle {
        return 0.0;
    }
    if angle > max_angle {
        return max_unit;
    }
    let span = max_angle - min_angle;
    if span <= 0.0 {
        return 0.0;
    }
    round2((angle - min_angle) * max_unit / span)
}

pub fn angle_to_psi(
    angle: f64,
    calibration: &PressureCalibration,
    min_angle: Option<f64>,
    max_angle: Option<f64>,
    max_psi: Option<f64>,
) -> f64 {
    angle_to_unit(
        angle,
        min_angle.unwrap_or(calibration.min_angle),
        max_angle.unwrap_or(calibration.max_angle),
        max_psi.unwrap_or(calibration.max_psi),
    )
}

pub fn angle_to_bar(
    angle: f64,
    calibration: &PressureCalibration,
    min_angle: Option<f64>,
    max_angle: Option<f64>,
    max_bar: Option<f64>,
) -> f64 {
    angle_to_unit(
        angle,
        min_angle.unwrap_or(calibration.min_angle),
        max_angle.unwrap_or(calibration.max_angle),
        max_bar.unwrap_or(calibration.max_bar),
    )
}

impl PressureCalibration {
    pub fn psi(&self, angle: f64) -> f64 {
        angle_to_psi(angle, self, None, None, None)
    }

    pub fn bar(&self, angle: f64) -> f64 {
        angle_to_bar(angle, self, None, None, None)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
