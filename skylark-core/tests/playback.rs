//! End-to-end playback scenarios in headless mode.

mod helpers;

use helpers::*;
use skylark_core::config::SR;
use skylark_core::{Property, SkylarkEvent};

#[test]
fn sine_through_direct_source_has_unit_sine_rms() {
    let ctx = test_context();
    let (_source, _generator, _buffer) =
        looping_source(&ctx, &sine_440(), || ctx.create_direct_source().unwrap());

    let out = render(&ctx, 100);
    let level = rms(&out);
    assert!(
        (level - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.007,
        "RMS {level} not within 1% of 0.707"
    );
}

#[test]
fn source_with_no_generators_is_silent() {
    let ctx = test_context();
    let _source = ctx.create_direct_source().unwrap();
    assert!(is_silent(&render(&ctx, 10)));
}

#[test]
fn bufferless_generator_is_skipped() {
    let ctx = test_context();
    let source = ctx.create_direct_source().unwrap();
    let generator = ctx.create_buffer_generator().unwrap();
    ctx.source_add_generator(source, generator).unwrap();
    // Zero declared channels: contributes nothing, breaks nothing.
    assert!(is_silent(&render(&ctx, 10)));
}

#[test]
fn looping_hundred_frame_buffer_emits_seven_loops_in_three_blocks() {
    let ctx = test_context();
    let samples = vec![0.25f32; 100];
    let (_source, generator, _buffer) =
        looping_source(&ctx, &samples, || ctx.create_direct_source().unwrap());

    render(&ctx, 3);

    let mut looped = 0;
    while let Some(event) = ctx.poll_event() {
        match event {
            SkylarkEvent::Looped { generator: g } => {
                assert_eq!(g, generator);
                looped += 1;
            }
            SkylarkEvent::Finished { .. } => panic!("unexpected FINISHED while looping"),
        }
    }
    // 3 * 256 / 100 = 7.68 wraps.
    assert_eq!(looped, 7);
}

#[test]
fn non_looping_buffer_finishes_once_then_goes_silent() {
    let ctx = test_context();
    let buffer = ctx
        .create_buffer_from_samples(&vec![0.5f32; 100], 1, SR)
        .unwrap();
    let generator = ctx.create_buffer_generator().unwrap();
    ctx.set_o(generator, Property::Buffer, Some(buffer)).unwrap();
    let source = ctx.create_direct_source().unwrap();
    ctx.source_add_generator(source, generator).unwrap();

    let first = render(&ctx, 1);
    assert!(!is_silent(&first));
    let rest = render(&ctx, 3);
    assert!(is_silent(&rest));

    let events: Vec<SkylarkEvent> = std::iter::from_fn(|| ctx.poll_event()).collect();
    assert_eq!(
        events,
        vec![SkylarkEvent::Finished { generator }],
        "exactly one FINISHED"
    );
}

#[test]
fn paused_source_is_silent_and_resumes_phase_continuously() {
    let ctx = test_context_mono();
    let ramp: Vec<f32> = (0..SR as usize).map(|i| i as f32).collect();
    let (source, _generator, _buffer) =
        looping_source(&ctx, &ramp, || ctx.create_direct_source().unwrap());

    let before = render(&ctx, 1);
    assert_eq!(before[0], 0.0);
    assert_eq!(before[255], 255.0);

    ctx.source_pause(source).unwrap();
    assert!(is_silent(&render(&ctx, 2)));

    ctx.source_play(source).unwrap();
    let after = render(&ctx, 1);
    // The cursor did not advance while paused.
    assert_eq!(after[0], 256.0);
    assert_eq!(after[255], 511.0);
}

#[test]
fn generator_list_is_ordered_and_deduplicated() {
    let ctx = test_context();
    let source = ctx.create_direct_source().unwrap();
    let g1 = ctx.create_buffer_generator().unwrap();
    let g2 = ctx.create_noise_generator(1).unwrap();
    let g3 = ctx.create_buffer_generator().unwrap();

    ctx.source_add_generator(source, g1).unwrap();
    ctx.source_add_generator(source, g2).unwrap();
    ctx.source_add_generator(source, g1).unwrap(); // duplicate, ignored
    assert_eq!(ctx.source_generator_handles(source).unwrap(), vec![g1, g2]);

    ctx.source_add_generator(source, g3).unwrap();
    ctx.source_remove_generator(source, g3).unwrap();
    assert_eq!(
        ctx.source_generator_handles(source).unwrap(),
        vec![g1, g2],
        "add then remove leaves the list pointwise equal"
    );
}

#[test]
fn pitch_bend_halves_loop_duration() {
    let ctx = test_context();
    let samples = vec![0.1f32; 256];
    let (_source, generator, _buffer) =
        looping_source(&ctx, &samples, || ctx.create_direct_source().unwrap());
    ctx.set_d(generator, Property::PitchBend, 2.0).unwrap();

    render(&ctx, 2);
    let loops = std::iter::from_fn(|| ctx.poll_event())
        .filter(|e| matches!(e, SkylarkEvent::Looped { .. }))
        .count();
    // 2 blocks * 256 frames * bend 2.0 / 256-frame buffer = 4 wraps.
    assert_eq!(loops, 4);
}

#[test]
fn freed_generator_keeps_playing_through_the_deferral_window_then_stops() {
    let ctx = test_context();
    let source = ctx.create_direct_source().unwrap();
    let generator = ctx.create_noise_generator(2).unwrap();
    ctx.source_add_generator(source, generator).unwrap();

    assert!(!is_silent(&render(&ctx, 1)));

    ctx.handle_free(generator).unwrap();
    // Destruction is deferred: the generator must survive the block that
    // was in flight when the handle dropped.
    assert!(!is_silent(&render(&ctx, 1)));
    render(&ctx, 1);
    // By now the deletion drain has run; the arena entry is gone.
    assert!(is_silent(&render(&ctx, 2)));
}

#[test]
fn multichannel_noise_fills_all_channels() {
    let ctx = test_context();
    let source = ctx.create_direct_source().unwrap();
    let generator = ctx.create_noise_generator(2).unwrap();
    ctx.source_add_generator(source, generator).unwrap();

    let out = render(&ctx, 4);
    let left: Vec<f32> = out.iter().step_by(2).copied().collect();
    let right: Vec<f32> = out.iter().skip(1).step_by(2).copied().collect();
    assert!(rms(&left) > 0.1);
    assert!(rms(&right) > 0.1);
    assert_ne!(left, right);
}

#[test]
fn gain_property_scales_output_after_one_block_ramp() {
    let ctx = test_context_mono();
    let dc = vec![1.0f32; 100];
    let (source, _generator, _buffer) =
        looping_source(&ctx, &dc, || ctx.create_direct_source().unwrap());

    render(&ctx, 2);
    ctx.set_d(source, Property::Gain, 0.25).unwrap();
    // One block of linear ramp toward the target...
    render(&ctx, 1);
    // ...then steady state.
    let out = render(&ctx, 1);
    assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
}

#[test]
fn block_counter_advances_per_block() {
    let ctx = test_context();
    assert_eq!(ctx.block_time(), 0);
    render(&ctx, 5);
    assert_eq!(ctx.block_time(), 5);
}
