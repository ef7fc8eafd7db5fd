//! Binaural rendering from a parametric HRIR dataset.
//!
//! Each ear hears the source through a fractional delay (the interaural time
//! difference, Woodworth's formula clamped to [`HRTF_MAX_ITD`]) followed by a
//! short FIR that applies the level difference and head-shadow spectral
//! tilt. The dataset is built once at startup on a fixed azimuth/elevation
//! grid; azimuth indexing wraps, so a full turn lands on identical
//! coefficients.
//!
//! When the panning angles change, the renderer runs the old and new
//! coefficient/delay pairs in parallel for exactly [`CROSSFADE_SAMPLES`]
//! samples and blends linearly between them.

use crate::config::{BLOCK_SIZE, CROSSFADE_SAMPLES, HRTF_MAX_ITD, SR};
use crate::dsp::delay::DelayLine;
use std::sync::Arc;

pub(crate) const HRIR_LENGTH: usize = 32;

const AZIMUTH_STEP_DEG: f64 = 5.0;
const AZIMUTH_COUNT: usize = (360.0 / AZIMUTH_STEP_DEG) as usize;
const ELEVATION_STEP_DEG: f64 = 15.0;
const ELEVATION_COUNT: usize = (180.0 / ELEVATION_STEP_DEG) as usize + 1;

const HEAD_RADIUS_M: f64 = 0.15;
const SPEED_OF_SOUND: f64 = 343.0;
/// Maximum interaural level difference at the fully shadowed ear, in dB.
const ILD_MAX_DB: f64 = 12.0;

/// Impulse responses for both ears over the full direction grid.
pub(crate) struct HrirDataset {
    /// `[elevation][azimuth]`, flattened; each entry is `[left, right]`.
    irs: Vec<[[f32; HRIR_LENGTH]; 2]>,
}

impl HrirDataset {
    pub(crate) fn build() -> Arc<Self> {
        let mut irs = Vec::with_capacity(ELEVATION_COUNT * AZIMUTH_COUNT);
        for el_idx in 0..ELEVATION_COUNT {
            let elevation = -90.0 + el_idx as f64 * ELEVATION_STEP_DEG;
            for az_idx in 0..AZIMUTH_COUNT {
                let azimuth = az_idx as f64 * AZIMUTH_STEP_DEG;
                irs.push([
                    ear_ir(azimuth, elevation, -90.0),
                    ear_ir(azimuth, elevation, 90.0),
                ]);
            }
        }
        Arc::new(Self { irs })
    }

    fn index(&self, azimuth: f64, elevation: f64) -> usize {
        let az_idx =
            ((azimuth / AZIMUTH_STEP_DEG).round() as i64).rem_euclid(AZIMUTH_COUNT as i64) as usize;
        let el_idx = (((elevation + 90.0) / ELEVATION_STEP_DEG).round() as i64)
            .clamp(0, ELEVATION_COUNT as i64 - 1) as usize;
        el_idx * AZIMUTH_COUNT + az_idx
    }

    pub(crate) fn ir(&self, azimuth: f64, elevation: f64) -> &[[f32; HRIR_LENGTH]; 2] {
        &self.irs[self.index(azimuth, elevation)]
    }
}

/// Builds one ear's impulse response: a Hann-windowed sinc lowpass whose
/// cutoff and DC gain both track how far the source sits in the head shadow.
fn ear_ir(azimuth_deg: f64, elevation_deg: f64, ear_azimuth_deg: f64) -> [f32; HRIR_LENGTH] {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();
    let ear_az = ear_azimuth_deg.to_radians();

    // 1 when the source is on this ear's axis, -1 on the far side.
    let alignment = el.cos() * (az - ear_az).cos();
    let shadow = ((1.0 - alignment) / 2.0).clamp(0.0, 1.0);

    let gain = 10f64.powf(-ILD_MAX_DB * shadow / 20.0);
    let cutoff_hz = 18_000.0 - 14_000.0 * shadow;
    let fc = cutoff_hz / SR as f64;

    let center = (HRIR_LENGTH / 2) as f64;
    let mut kernel = [0.0f64; HRIR_LENGTH];
    let mut sum = 0.0;
    for (n, tap) in kernel.iter_mut().enumerate() {
        let t = n as f64 - center;
        let sinc = if t.abs() < 1e-12 {
            2.0 * fc
        } else {
            (2.0 * std::f64::consts::PI * fc * t).sin() / (std::f64::consts::PI * t)
        };
        let hann = 0.5
            - 0.5
                * (2.0 * std::f64::consts::PI * n as f64 / (HRIR_LENGTH - 1) as f64)
                    .cos();
        *tap = sinc * hann;
        sum += *tap;
    }

    let mut ir = [0.0f32; HRIR_LENGTH];
    for (out, tap) in ir.iter_mut().zip(kernel.iter()) {
        *out = (tap / sum * gain) as f32;
    }
    ir
}

/// Woodworth interaural time delay in samples for each ear, `[left, right]`.
/// The near ear gets zero extra delay; the far ear is delayed.
fn itd_samples(azimuth_deg: f64, elevation_deg: f64) -> [f32; 2] {
    let lateral = azimuth_deg.to_radians().sin() * elevation_deg.to_radians().cos();
    let theta = lateral.abs().clamp(0.0, 1.0).asin();
    let seconds = HEAD_RADIUS_M / SPEED_OF_SOUND * (theta + lateral.abs());
    let samples = (seconds * SR as f64).min((HRTF_MAX_ITD - 2) as f64) as f32;
    if lateral > 0.0 {
        // Source on the right: left ear hears late.
        [samples, 0.0]
    } else {
        [0.0, samples]
    }
}

/// One ear's render state: fractional delay into the shared input history,
/// then the FIR over the delayed signal.
#[derive(Debug, Clone)]
struct EarRenderer {
    delay: f32,
    ir: [f32; HRIR_LENGTH],
    history: [f32; HRIR_LENGTH],
    position: usize,
}

impl EarRenderer {
    fn new(delay: f32, ir: [f32; HRIR_LENGTH]) -> Self {
        Self {
            delay,
            ir,
            history: [0.0; HRIR_LENGTH],
            position: 0,
        }
    }

    #[inline]
    fn tick(&mut self, line: &DelayLine) -> f32 {
        let delayed = line.read_fractional(self.delay);
        self.position = (self.position + 1) % HRIR_LENGTH;
        self.history[self.position] = delayed;
        let mut acc = 0.0;
        for (k, coefficient) in self.ir.iter().enumerate() {
            acc += coefficient * self.history[(self.position + HRIR_LENGTH - k) % HRIR_LENGTH];
        }
        acc
    }
}

/// Full binaural renderer for one panner lane.
pub(crate) struct HrtfRenderer {
    dataset: Arc<HrirDataset>,
    line: DelayLine,
    current: [EarRenderer; 2],
    previous: Option<[EarRenderer; 2]>,
    crossfade_remaining: usize,
    azimuth: f64,
    elevation: f64,
}

impl HrtfRenderer {
    pub(crate) fn new(dataset: Arc<HrirDataset>) -> Self {
        let irs = *dataset.ir(0.0, 0.0);
        let delays = itd_samples(0.0, 0.0);
        Self {
            current: [
                EarRenderer::new(delays[0], irs[0]),
                EarRenderer::new(delays[1], irs[1]),
            ],
            previous: None,
            crossfade_remaining: 0,
            line: DelayLine::new(HRTF_MAX_ITD * 2),
            azimuth: 0.0,
            elevation: 0.0,
            dataset,
        }
    }

    /// Retargets the renderer. The old coefficient/delay pair keeps running
    /// for the next [`CROSSFADE_SAMPLES`] samples while the new pair fades
    /// in.
    pub(crate) fn set_angles(&mut self, azimuth: f64, elevation: f64) {
        if (azimuth - self.azimuth).abs() < 1e-9 && (elevation - self.elevation).abs() < 1e-9 {
            return;
        }
        self.azimuth = azimuth;
        self.elevation = elevation;

        let irs = *self.dataset.ir(azimuth, elevation);
        let delays = itd_samples(azimuth, elevation);
        let mut fresh = [
            EarRenderer::new(delays[0], irs[0]),
            EarRenderer::new(delays[1], irs[1]),
        ];
        // Seed the new FIRs with the running history so the fade blends two
        // fully warmed-up signals.
        for (new_ear, old_ear) in fresh.iter_mut().zip(self.current.iter()) {
            new_ear.history = old_ear.history;
            new_ear.position = old_ear.position;
        }
        self.previous = Some(std::mem::replace(&mut self.current, fresh));
        self.crossfade_remaining = CROSSFADE_SAMPLES;
    }

    /// Renders `input` (mono, one block) and adds the binaural result into
    /// `dest` (interleaved stereo, one block).
    pub(crate) fn process(&mut self, input: &[f32], dest: &mut [f32]) {
        debug_assert_eq!(input.len(), BLOCK_SIZE);
        debug_assert!(dest.len() >= BLOCK_SIZE * 2);

        for (frame, &sample) in input.iter().enumerate() {
            self.line.write(sample);
            let mut left = self.current[0].tick(&self.line);
            let mut right = self.current[1].tick(&self.line);

            if self.crossfade_remaining > 0 {
                if let Some(previous) = self.previous.as_mut() {
                    let old_left = previous[0].tick(&self.line);
                    let old_right = previous[1].tick(&self.line);
                    let w_new = (CROSSFADE_SAMPLES - self.crossfade_remaining + 1) as f32
                        / CROSSFADE_SAMPLES as f32;
                    let w_old = 1.0 - w_new;
                    left = left * w_new + old_left * w_old;
                    right = right * w_new + old_right * w_old;
                }
                self.crossfade_remaining -= 1;
                if self.crossfade_remaining == 0 {
                    self.previous = None;
                }
            }

            dest[frame * 2] += left;
            dest[frame * 2 + 1] += right;
            self.line.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_impulse(azimuth: f64, elevation: f64) -> (f32, f32) {
        let dataset = HrirDataset::build();
        let mut renderer = HrtfRenderer::new(dataset);
        renderer.set_angles(azimuth, elevation);

        let mut input = vec![0.0f32; BLOCK_SIZE];
        let mut dest = vec![0.0f32; BLOCK_SIZE * 2];
        // Land the impulse after the pan crossfade has finished.
        input[CROSSFADE_SAMPLES] = 1.0;
        renderer.process(&input, &mut dest);
        // A second block to catch delayed tails.
        let silence = vec![0.0f32; BLOCK_SIZE];
        let mut dest2 = vec![0.0f32; BLOCK_SIZE * 2];
        renderer.process(&silence, &mut dest2);
        dest.extend_from_slice(&dest2);

        let mut left = 0.0;
        let mut right = 0.0;
        for frame in dest.chunks_exact(2) {
            left += frame[0] * frame[0];
            right += frame[1] * frame[1];
        }
        (left, right)
    }

    #[test]
    fn front_is_left_right_symmetric() {
        let (left, right) = render_impulse(0.0, 0.0);
        assert!(left > 0.0);
        assert!(left >= right * 0.999 && left <= right * 1.001);
    }

    #[test]
    fn right_hand_source_favors_right_ear() {
        let (left, right) = render_impulse(90.0, 0.0);
        assert!(right > left * 2.0);
    }

    #[test]
    fn left_hand_source_favors_left_ear() {
        let (left, right) = render_impulse(270.0, 0.0);
        assert!(left > right * 2.0);
    }

    #[test]
    fn azimuth_wraps_after_a_full_turn() {
        let (l1, r1) = render_impulse(37.0, 0.0);
        let (l2, r2) = render_impulse(37.0 + 360.0, 0.0);
        // Same grid cell and (up to rounding of the angle itself) the same
        // ITD, so the rendered power matches.
        assert!((l1 - l2).abs() <= l1.abs() * 1e-4);
        assert!((r1 - r2).abs() <= r1.abs() * 1e-4);
    }

    #[test]
    fn itd_is_clamped() {
        let delays = itd_samples(90.0, 0.0);
        assert!(delays[0] <= (HRTF_MAX_ITD - 2) as f32);
        assert_eq!(delays[1], 0.0);
    }
}
