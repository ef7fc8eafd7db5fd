//! Spatialization end to end: distance models, panning strategies, listener
//! pose.

mod helpers;

use helpers::*;
use skylark_core::{Property, SkylarkEvent};

fn channel(samples: &[f32], which: usize) -> Vec<f32> {
    samples.iter().skip(which).step_by(2).copied().collect()
}

#[test]
fn inverse_distance_at_ten_units_attenuates_to_one_tenth() {
    let ctx = test_context();
    let dc = vec![1.0f32; 100];
    let (source, _generator, _buffer) =
        looping_source(&ctx, &dc, || ctx.create_source3d().unwrap());

    // Listener at the origin facing +Y with +Z up (the default); source 10
    // units to the right on the stereo strategy so gain is directly
    // observable.
    ctx.set_i(source, Property::PannerStrategy, 1).unwrap();
    ctx.set_i(source, Property::DistanceModel, 3).unwrap();
    ctx.set_d(source, Property::DistanceRef, 1.0).unwrap();
    ctx.set_d(source, Property::Rolloff, 1.0).unwrap();
    ctx.set_d3(source, Property::Position, [10.0, 0.0, 0.0]).unwrap();

    // Let the gain fader settle.
    render(&ctx, 3);
    let out = render(&ctx, 4);

    let right = channel(&out, 1);
    let left = channel(&out, 0);
    let mean_right: f64 =
        right.iter().map(|&s| s as f64).sum::<f64>() / right.len() as f64;
    assert!(
        (mean_right - 0.1).abs() < 0.002,
        "effective gain {mean_right}, expected ~0.1"
    );
    // Hard right under the equal-power law: the left gain is cos(pi/2),
    // zero up to f32 rounding.
    assert!(rms(&left) < 1e-6, "hard-right source leaked into the left channel");
}

#[test]
fn equal_power_center_pan_splits_evenly() {
    let ctx = test_context();
    let dc = vec![0.5f32; 100];
    let (source, _generator, _buffer) =
        looping_source(&ctx, &dc, || ctx.create_panned_source().unwrap());
    ctx.set_i(source, Property::PannerStrategy, 1).unwrap();
    ctx.set_d(source, Property::PanningScalar, 0.0).unwrap();

    render(&ctx, 2);
    let out = render(&ctx, 2);
    let expected = 0.5 * std::f64::consts::FRAC_1_SQRT_2;
    for which in 0..2 {
        let level = rms(&channel(&out, which));
        assert!(
            (level - expected).abs() < 1e-3,
            "channel {which} RMS {level}, expected {expected}"
        );
    }
}

#[test]
fn hrtf_panned_source_favors_the_matching_ear() {
    let ctx = test_context();
    let (source, _generator, _buffer) =
        looping_source(&ctx, &sine_440(), || ctx.create_panned_source().unwrap());
    // Default strategy is HRTF; point the source hard right.
    ctx.set_d(source, Property::Azimuth, 90.0).unwrap();

    render(&ctx, 3);
    let out = render(&ctx, 6);
    let left_energy = rms(&channel(&out, 0));
    let right_energy = rms(&channel(&out, 1));
    assert!(
        right_energy > left_energy * 1.5,
        "expected a strong right bias, got L={left_energy} R={right_energy}"
    );

    // Swing to hard left and check the mirror image.
    ctx.set_d(source, Property::Azimuth, 270.0).unwrap();
    render(&ctx, 3);
    let out = render(&ctx, 6);
    let left_energy = rms(&channel(&out, 0));
    let right_energy = rms(&channel(&out, 1));
    assert!(right_energy * 1.5 < left_energy);
}

#[test]
fn moving_the_listener_re_derives_panning() {
    let ctx = test_context();
    let dc = vec![0.8f32; 100];
    let (source, _generator, _buffer) =
        looping_source(&ctx, &dc, || ctx.create_source3d().unwrap());
    ctx.set_i(source, Property::PannerStrategy, 1).unwrap();
    ctx.set_i(source, Property::DistanceModel, 0).unwrap();
    ctx.set_d3(source, Property::Position, [10.0, 0.0, 0.0]).unwrap();

    render(&ctx, 3);
    let out = render(&ctx, 2);
    assert!(rms(&channel(&out, 1)) > rms(&channel(&out, 0)) * 10.0);

    // Turn the listener around (now facing -Y): the source lands on the
    // listener's left.
    ctx.set_d6(
        ctx.context_handle(),
        Property::Orientation,
        [0.0, -1.0, 0.0, 0.0, 0.0, 1.0],
    )
    .unwrap();
    render(&ctx, 3);
    let out = render(&ctx, 2);
    assert!(rms(&channel(&out, 0)) > rms(&channel(&out, 1)) * 10.0);
}

#[test]
fn linear_model_silences_beyond_max_distance() {
    let ctx = test_context();
    let dc = vec![1.0f32; 100];
    let (source, _generator, _buffer) =
        looping_source(&ctx, &dc, || ctx.create_source3d().unwrap());
    ctx.set_i(source, Property::PannerStrategy, 1).unwrap();
    ctx.set_i(source, Property::DistanceModel, 1).unwrap();
    ctx.set_d(source, Property::DistanceMax, 50.0).unwrap();
    ctx.set_d3(source, Property::Position, [0.0, 100.0, 0.0]).unwrap();

    render(&ctx, 3);
    assert!(is_silent(&render(&ctx, 2)));
}

#[test]
fn streaming_semantics_zero_channel_generator_never_contributes() {
    // A buffer generator with no buffer stands in for an unprimed stream:
    // its zero channel count must make the source skip it while other
    // generators keep playing.
    let ctx = test_context();
    let (source, _generator, _buffer) =
        looping_source(&ctx, &sine_440(), || ctx.create_direct_source().unwrap());
    let empty = ctx.create_buffer_generator().unwrap();
    ctx.source_add_generator(source, empty).unwrap();

    let out = render(&ctx, 10);
    let level = rms(&out);
    assert!((level - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
    assert!(std::iter::from_fn(|| ctx.poll_event())
        .all(|e| !matches!(e, SkylarkEvent::Finished { .. })));
}
