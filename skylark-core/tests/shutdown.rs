//! Shutdown semantics.

mod helpers;

use helpers::*;
use skylark_core::config::BLOCK_SIZE;
use skylark_core::{Property, SkylarkError};

#[test]
fn shutdown_during_playback_terminates_cleanly() {
    let mut ctx = test_context();
    let (source, generator, buffer) =
        looping_source(&ctx, &sine_440(), || ctx.create_direct_source().unwrap());
    render(&ctx, 5);

    // Queue work that will still be pending at shutdown: a property write
    // and a couple of frees.
    ctx.set_d(source, Property::Gain, 0.5).unwrap();
    ctx.handle_free(generator).unwrap();
    ctx.handle_free(buffer).unwrap();

    ctx.shutdown().unwrap();
    // Idempotent.
    ctx.shutdown().unwrap();

    let err = ctx.create_direct_source().unwrap_err();
    assert!(matches!(err, SkylarkError::ShutdownInProgress));
    assert_eq!(err.code(), 11);

    let err = ctx.get_d(source, Property::Gain).unwrap_err();
    assert!(matches!(err, SkylarkError::ShutdownInProgress));

    let mut block = vec![0.0f32; BLOCK_SIZE * 2];
    let err = ctx.generate_block(&mut block).unwrap_err();
    assert!(matches!(err, SkylarkError::ShutdownInProgress));
}

#[test]
fn frees_after_shutdown_report_shutdown_in_progress() {
    let mut ctx = test_context();
    let source = ctx.create_direct_source().unwrap();
    ctx.shutdown().unwrap();
    let err = ctx.handle_free(source).unwrap_err();
    assert!(matches!(err, SkylarkError::ShutdownInProgress));
}

#[test]
fn drop_without_explicit_shutdown_does_not_hang() {
    let ctx = test_context();
    let _ = looping_source(&ctx, &sine_440(), || ctx.create_direct_source().unwrap());
    render(&ctx, 3);
    drop(ctx);
}
