use skylark_core::config::{BLOCK_SIZE, SR};
use skylark_core::{Property, Result, SkylarkContext, SkylarkDesc, SkylarkEvent};
use std::time::Duration;

/// One second of a 440 Hz sine as raw samples.
fn sine_samples() -> Vec<f32> {
    (0..SR as usize)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32).sin() * 0.5)
        .collect()
}

/// Plays a looping tone on a 3D source that orbits the listener.
pub fn run_orbiting_tone() -> Result<()> {
    let ctx = SkylarkContext::new(SkylarkDesc::default())?;
    log::info!("device context up with {} channels", ctx.channels());

    let buffer = ctx.create_buffer_from_samples(&sine_samples(), 1, SR)?;
    let generator = ctx.create_buffer_generator()?;
    ctx.set_o(generator, Property::Buffer, Some(buffer))?;
    ctx.set_i(generator, Property::Looping, 1)?;

    let source = ctx.create_source3d()?;
    ctx.set_i(source, Property::DistanceModel, 3)?; // inverse
    ctx.source_add_generator(source, generator)?;

    log::info!("orbiting for 10 seconds...");
    for step in 0..400 {
        let angle = step as f64 * 0.05;
        let (x, y) = (5.0 * angle.cos(), 5.0 * angle.sin());
        ctx.set_d3(source, Property::Position, [x, y, 0.0])?;
        std::thread::sleep(Duration::from_millis(25));
    }

    ctx.handle_free(source)?;
    ctx.handle_free(generator)?;
    ctx.handle_free(buffer)?;
    Ok(())
}

/// Streams an audio file to the device through an echo send.
pub fn run_file_playback(path: &str) -> Result<()> {
    let ctx = SkylarkContext::new(SkylarkDesc::default())?;
    let generator = ctx.create_streaming_generator(path)?;
    let source = ctx.create_direct_source()?;
    ctx.source_add_generator(source, generator)?;

    let echo = ctx.create_echo()?;
    ctx.echo_set_taps(
        echo,
        &[skylark_core::effects::EchoTapConfig {
            delay: 0.25,
            gain_l: 0.3,
            gain_r: 0.2,
        }],
    )?;
    ctx.effect_connect(source, echo, 0.8, 1)?;

    log::info!("playing {path} (ctrl-c to stop)");
    loop {
        std::thread::sleep(Duration::from_millis(100));
        while let Some(event) = ctx.poll_event() {
            if let SkylarkEvent::Finished { .. } = event {
                log::info!("playback finished");
                // Let the echo tail ring out.
                std::thread::sleep(Duration::from_secs(1));
                return Ok(());
            }
        }
    }
}

/// Renders blocks without a device and reports the output level.
pub fn run_headless_render() -> Result<()> {
    let ctx = SkylarkContext::new_headless(SkylarkDesc::default())?;
    let buffer = ctx.create_buffer_from_samples(&sine_samples(), 1, SR)?;
    let generator = ctx.create_buffer_generator()?;
    ctx.set_o(generator, Property::Buffer, Some(buffer))?;
    ctx.set_i(generator, Property::Looping, 1)?;
    let source = ctx.create_direct_source()?;
    ctx.source_add_generator(source, generator)?;

    let channels = ctx.channels();
    let mut block = vec![0.0f32; BLOCK_SIZE * channels];
    let mut sum_squares = 0.0f64;
    let blocks = 200;
    for _ in 0..blocks {
        ctx.generate_block(&mut block)?;
        sum_squares += block.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
    }
    let rms = (sum_squares / (blocks * block.len()) as f64).sqrt();
    log::info!("rendered {blocks} blocks headless, output RMS {rms:.4}");
    Ok(())
}
