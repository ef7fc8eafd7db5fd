//! Property system behavior: validation, round-trips, ring semantics.

mod helpers;

use helpers::*;
use skylark_core::config::PROPERTY_RING_CAPACITY;
use skylark_core::{
    last_error_code, Property, PropertyValue, SkylarkError,
};

#[test]
fn position_round_trips_through_the_ring() {
    let ctx = test_context();
    let source = ctx.create_source3d().unwrap();
    let p = [10.0, -2.5, 0.125];
    ctx.set_d3(source, Property::Position, p).unwrap();
    assert_eq!(ctx.get_d3(source, Property::Position).unwrap(), p);
}

#[test]
fn listener_pose_round_trips_on_the_context_handle() {
    let ctx = test_context();
    let listener = ctx.context_handle();
    ctx.set_d3(listener, Property::Position, [1.0, 2.0, 3.0])
        .unwrap();
    ctx.set_d6(listener, Property::Orientation, [0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
        .unwrap();
    assert_eq!(
        ctx.get_d3(listener, Property::Position).unwrap(),
        [1.0, 2.0, 3.0]
    );
    let orientation = ctx.get_d6(listener, Property::Orientation).unwrap();
    assert!((orientation[1] - 1.0).abs() < 1e-9);
    assert!((orientation[5] - 1.0).abs() < 1e-9);
}

#[test]
fn rejected_writes_leave_the_value_unchanged() {
    let ctx = test_context();
    let source = ctx.create_panned_source().unwrap();
    ctx.set_d(source, Property::PanningScalar, 0.5).unwrap();

    let err = ctx
        .set_d(source, Property::PanningScalar, 2.0)
        .unwrap_err();
    assert!(matches!(err, SkylarkError::PropertyOutOfRange(_)));
    assert_eq!(last_error_code(), Some(err.code()));

    assert_eq!(ctx.get_d(source, Property::PanningScalar).unwrap(), 0.5);
}

#[test]
fn unknown_property_and_kind_mismatch_are_rejected() {
    let ctx = test_context();
    let source = ctx.create_direct_source().unwrap();

    let err = ctx.set_d(source, Property::Azimuth, 90.0).unwrap_err();
    assert!(matches!(err, SkylarkError::UnknownProperty(_)));

    let err = ctx
        .set_property(source, Property::Gain, PropertyValue::Int(1))
        .unwrap_err();
    assert!(matches!(err, SkylarkError::PropertyKindMismatch(_)));
}

#[test]
fn buffer_property_requires_a_buffer_handle() {
    let ctx = test_context();
    let generator = ctx.create_buffer_generator().unwrap();
    let not_a_buffer = ctx.create_direct_source().unwrap();
    let err = ctx
        .set_o(generator, Property::Buffer, Some(not_a_buffer))
        .unwrap_err();
    assert!(matches!(err, SkylarkError::HandleTypeMismatch(_)));
}

#[test]
fn invalid_handle_is_reported() {
    let ctx = test_context();
    let bogus = {
        // A handle value that was never allocated.
        let real = ctx.create_direct_source().unwrap();
        ctx.handle_free(real).unwrap();
        real
    };
    let err = ctx.get_d(bogus, Property::Gain).unwrap_err();
    assert!(matches!(err, SkylarkError::InvalidHandle(_)));
}

#[test]
fn ring_and_command_paths_produce_bitwise_identical_audio() {
    let run = |synchronous: bool| -> Vec<f32> {
        let ctx = test_context();
        let (source, generator, _buffer) =
            looping_source(&ctx, &sine_440(), || ctx.create_direct_source().unwrap());
        if synchronous {
            ctx.set_property_sync(source, Property::Gain, PropertyValue::Double(0.35))
                .unwrap();
            ctx.set_property_sync(generator, Property::PitchBend, PropertyValue::Double(1.5))
                .unwrap();
        } else {
            ctx.set_d(source, Property::Gain, 0.35).unwrap();
            ctx.set_d(generator, Property::PitchBend, 1.5).unwrap();
        }
        render(&ctx, 8)
    };
    assert_eq!(run(false), run(true));
}

#[test]
fn ring_overflow_falls_back_without_losing_writes() {
    let ctx = test_context();
    let source = ctx.create_direct_source().unwrap();
    // Flood well past the ring capacity before the engine gets a chance to
    // drain; the excess must take the command path in order.
    let total = PROPERTY_RING_CAPACITY + 64;
    for i in 0..total {
        let value = i as f64 / total as f64;
        ctx.set_d(source, Property::Gain, value).unwrap();
    }
    let expected = (total - 1) as f64 / total as f64;
    assert_eq!(ctx.get_d(source, Property::Gain).unwrap(), expected);
}

#[test]
fn defaults_match_the_documented_values() {
    let ctx = test_context();
    let source = ctx.create_source3d().unwrap();
    assert_eq!(ctx.get_d(source, Property::Gain).unwrap(), 1.0);
    assert_eq!(ctx.get_d(source, Property::DistanceRef).unwrap(), 1.0);
    assert_eq!(ctx.get_d(source, Property::DistanceMax).unwrap(), 50.0);
    assert_eq!(ctx.get_d(source, Property::Rolloff).unwrap(), 1.0);
    // Linear model by default.
    assert_eq!(ctx.get_i(source, Property::DistanceModel).unwrap(), 1);

    let generator = ctx.create_buffer_generator().unwrap();
    assert_eq!(ctx.get_i(generator, Property::Looping).unwrap(), 0);
    assert_eq!(ctx.get_d(generator, Property::PitchBend).unwrap(), 1.0);
    assert_eq!(ctx.get_o(generator, Property::Buffer).unwrap(), None);
}

#[test]
fn context_default_distance_params_seed_new_sources() {
    let ctx = test_context();
    let listener = ctx.context_handle();
    ctx.set_i(listener, Property::DistanceModel, 3).unwrap();
    ctx.set_d(listener, Property::Rolloff, 2.0).unwrap();

    let source = ctx.create_source3d().unwrap();
    assert_eq!(ctx.get_i(source, Property::DistanceModel).unwrap(), 3);
    assert_eq!(ctx.get_d(source, Property::Rolloff).unwrap(), 2.0);
}
