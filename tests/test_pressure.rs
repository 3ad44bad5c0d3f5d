//! Angle to pressure conversion.

use gaugewatch::config::PressureCalibration;
use gaugewatch::pressure::{angle_to_bar, angle_to_psi, angle_to_unit};

#[test]
fn test_calibration_endpoints() {
    let cal = PressureCalibration::default();
    assert_eq!(angle_to_psi(30.0, &cal, None, None, None), 0.0);
    assert_eq!(angle_to_psi(295.0, &cal, None, None, None), 58.0);
    assert_eq!(angle_to_bar(30.0, &cal, None, None, None), 0.0);
    assert_eq!(angle_to_bar(295.0, &cal, None, None, None), 4.0);
}

#[test]
fn test_midpoint_reads_half_scale() {
    let cal = PressureCalibration::default();
    assert!((cal.psi(162.5) - 29.0).abs() < 1e-9);
    assert!((cal.bar(162.5) - 2.0).abs() < 1e-9);
}

#[test]
fn test_out_of_range_angles_clamp() {
    let cal = PressureCalibration::default();
    assert_eq!(cal.psi(10.0), 0.0);
    assert_eq!(cal.psi(0.0), 0.0);
    assert_eq!(cal.psi(300.0), 58.0);
    assert_eq!(cal.psi(359.9), 58.0);
    assert_eq!(cal.bar(350.0), 4.0);
}

#[test]
fn test_conversion_is_monotonic() {
    let cal = PressureCalibration::default();
    let mut previous_psi = f64::MIN;
    let mut previous_bar = f64::MIN;
    for tenth in 300..=2950 {
        let angle = tenth as f64 / 10.0;
        let psi = cal.psi(angle);
        let bar = cal.bar(angle);
        assert!(psi >= previous_psi, "psi decreased at {}", angle);
        assert!(bar >= previous_bar, "bar decreased at {}", angle);
        previous_psi = psi;
        previous_bar = bar;
    }
}

#[test]
fn test_results_are_rounded_to_two_decimals() {
    let cal = PressureCalibration::default();
    // (100 - 30) * 58 / 265 = 15.3207...
    assert_eq!(cal.psi(100.0), 15.32);
}

#[test]
fn test_per_call_overrides() {
    let cal = PressureCalibration::default();
    assert_eq!(angle_to_psi(100.0, &cal, Some(0.0), Some(200.0), Some(100.0)), 50.0);
    assert_eq!(angle_to_bar(50.0, &cal, Some(0.0), None, Some(10.0)), 1.69);
}

#[test]
fn test_degenerate_inputs_read_zero() {
    assert_eq!(angle_to_unit(f64::NAN, 30.0, 295.0, 58.0), 0.0);
    assert_eq!(angle_to_unit(100.0, 100.0, 100.0, 58.0), 0.0);
    assert_eq!(angle_to_unit(150.0, 200.0, 100.0, 58.0), 0.0);
}
