//! Source filtering end to end: white noise through a designed lowpass.

mod helpers;

use helpers::*;
use skylark_core::{design_lowpass, Property};

#[test]
fn lowpassed_white_noise_has_a_steep_spectral_tilt() {
    let ctx = test_context_mono();
    let source = ctx.create_direct_source().unwrap();
    let generator = ctx.create_noise_generator(1).unwrap();
    ctx.set_i(generator, Property::NoiseType, 0).unwrap();
    ctx.source_add_generator(source, generator).unwrap();

    let config = design_lowpass(1000.0, 0.7071).unwrap();
    ctx.source_set_filter(source, config).unwrap();

    // Skip the crossfade block, then collect plenty of filtered noise.
    render(&ctx, 2);
    let out = render(&ctx, 40);

    let low_bins = [100.0, 200.0, 300.0, 400.0, 480.0];
    let high_bins = [5000.0, 6500.0, 8000.0, 10_000.0, 13_000.0, 16_000.0];
    let low_energy: f64 = low_bins
        .iter()
        .map(|&f| goertzel_power(&out, f))
        .sum::<f64>()
        / low_bins.len() as f64;
    let high_energy: f64 = high_bins
        .iter()
        .map(|&f| goertzel_power(&out, f))
        .sum::<f64>()
        / high_bins.len() as f64;

    assert!(low_energy > 0.0);
    let tilt_db = 10.0 * (low_energy / high_energy).log10();
    assert!(
        tilt_db >= 20.0,
        "expected at least 20 dB of tilt, got {tilt_db:.1} dB"
    );
}

#[test]
fn unfiltered_white_noise_is_spectrally_flat_by_comparison() {
    let ctx = test_context_mono();
    let source = ctx.create_direct_source().unwrap();
    let generator = ctx.create_noise_generator(1).unwrap();
    ctx.source_add_generator(source, generator).unwrap();

    render(&ctx, 2);
    let out = render(&ctx, 40);

    let low: f64 = [200.0, 300.0, 400.0, 500.0]
        .iter()
        .map(|&f| goertzel_power(&out, f))
        .sum::<f64>();
    let high: f64 = [8000.0, 10_000.0, 12_000.0, 14_000.0]
        .iter()
        .map(|&f| goertzel_power(&out, f))
        .sum::<f64>();
    let tilt_db = 10.0 * (low / high).log10().abs();
    assert!(
        tilt_db < 15.0,
        "white noise should not show a strong tilt, got {tilt_db:.1} dB"
    );
}

#[test]
fn filter_design_errors_surface_as_invalid_argument() {
    assert!(design_lowpass(-5.0, 1.0).is_err());
    assert!(skylark_core::design_highpass(1000.0, f64::NAN).is_err());
    assert!(skylark_core::design_bandpass(0.0, 1.0).is_err());
}
