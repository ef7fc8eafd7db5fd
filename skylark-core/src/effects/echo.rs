//! Stereo multi-tap echo.
//!
//! The delay line is sized for five seconds; taps are replaced wholesale by
//! a command from the user thread, and a freshly installed tap set fades in
//! over one block (blending against the previous set) so reconfiguration
//! never clicks.

use crate::config::{BLOCK_SIZE, SR};
use crate::dsp::delay::DelayLine;
use crate::effects::EffectShared;
use crate::error::{Result, SkylarkError};

/// Longest supported tap delay, in samples.
pub(crate) const ECHO_MAX_DELAY: usize = (SR as usize) * 5;

/// One echo tap as configured by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoTapConfig {
    /// Delay in seconds, up to 5.0.
    pub delay: f64,
    pub gain_l: f32,
    pub gain_r: f32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Tap {
    delay_samples: usize,
    gain_l: f32,
    gain_r: f32,
}

pub(crate) struct EchoEffect {
    pub(super) shared: EffectShared,
    pub(super) wet: Vec<f32>,
    line_l: DelayLine,
    line_r: DelayLine,
    taps: Vec<Tap>,
    previous_taps: Option<Vec<Tap>>,
}

impl EchoEffect {
    pub(crate) fn new() -> Self {
        Self {
            shared: EffectShared::new(2),
            wet: vec![0.0; BLOCK_SIZE * 2],
            line_l: DelayLine::new(ECHO_MAX_DELAY),
            line_r: DelayLine::new(ECHO_MAX_DELAY),
            taps: Vec::new(),
            previous_taps: None,
        }
    }

    /// Validates a user tap list and converts it to sample units. Runs on
    /// the user thread; the result is installed via a command.
    pub(crate) fn prepare_taps(configs: &[EchoTapConfig]) -> Result<Vec<Tap>> {
        configs
            .iter()
            .map(|config| {
                let delay_samples = (config.delay * SR as f64).round();
                if !(0.0..=ECHO_MAX_DELAY as f64).contains(&delay_samples) {
                    return Err(SkylarkError::InvalidArgument(format!(
                        "echo tap delay {}s outside [0, 5]",
                        config.delay
                    )));
                }
                if !config.gain_l.is_finite() || !config.gain_r.is_finite() {
                    return Err(SkylarkError::InvalidArgument(
                        "echo tap gains must be finite".into(),
                    ));
                }
                Ok(Tap {
                    delay_samples: delay_samples as usize,
                    gain_l: config.gain_l,
                    gain_r: config.gain_r,
                })
            })
            .collect()
    }

    /// Installs a prepared tap set. The displaced set is returned so the
    /// caller can reclaim it off the audio thread.
    pub(crate) fn install_taps(&mut self, taps: Vec<Tap>) -> Vec<Tap> {
        let old = std::mem::replace(&mut self.taps, taps);
        self.previous_taps = Some(old.clone());
        old
    }

    fn tap_sum(line_l: &DelayLine, line_r: &DelayLine, taps: &[Tap]) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for tap in taps {
            left += line_l.read(tap.delay_samples) * tap.gain_l;
            right += line_r.read(tap.delay_samples) * tap.gain_r;
        }
        (left, right)
    }

    pub(super) fn run_algorithm(&mut self) {
        let input = &self.shared.filtered;
        let fading = self.previous_taps.is_some();

        for frame in 0..BLOCK_SIZE {
            self.line_l.write(input[frame * 2]);
            self.line_r.write(input[frame * 2 + 1]);

            let (mut left, mut right) = Self::tap_sum(&self.line_l, &self.line_r, &self.taps);
            if let Some(previous) = &self.previous_taps {
                let (old_l, old_r) = Self::tap_sum(&self.line_l, &self.line_r, previous);
                let w_new = frame as f32 / BLOCK_SIZE as f32;
                let w_old = 1.0 - w_new;
                left = left * w_new + old_l * w_old;
                right = right * w_new + old_r * w_old;
            }
            self.wet[frame * 2] = left;
            self.wet[frame * 2 + 1] = right;

            self.line_l.advance();
            self.line_r.advance();
        }

        if fading {
            self.previous_taps = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_tap_passes_input_through() {
        let mut echo = EchoEffect::new();
        let taps = EchoEffect::prepare_taps(&[EchoTapConfig {
            delay: 0.0,
            gain_l: 1.0,
            gain_r: 1.0,
        }])
        .unwrap();
        echo.install_taps(taps);

        // Burn the fade-in block.
        echo.shared.filtered.fill(0.0);
        echo.run_algorithm();

        echo.shared.filtered.fill(0.5);
        echo.run_algorithm();
        assert!((echo.wet[0] - 0.5).abs() < 1e-6);
        assert!((echo.wet[BLOCK_SIZE] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delayed_tap_arrives_late() {
        let mut echo = EchoEffect::new();
        let delay_s = 300.0 / SR as f64;
        let taps = EchoEffect::prepare_taps(&[EchoTapConfig {
            delay: delay_s,
            gain_l: 1.0,
            gain_r: 0.0,
        }])
        .unwrap();
        echo.install_taps(taps);
        echo.shared.filtered.fill(0.0);
        echo.run_algorithm();

        // An impulse on the left input...
        echo.shared.filtered.fill(0.0);
        echo.shared.filtered[0] = 1.0;
        echo.run_algorithm();
        assert!(echo.wet.iter().all(|&s| s.abs() < 1e-6));

        // ...emerges 300 samples later, 44 samples into the next block.
        echo.shared.filtered.fill(0.0);
        echo.run_algorithm();
        assert!((echo.wet[44 * 2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_out_of_range_taps() {
        assert!(EchoEffect::prepare_taps(&[EchoTapConfig {
            delay: 6.0,
            gain_l: 1.0,
            gain_r: 1.0,
        }])
        .is_err());
        assert!(EchoEffect::prepare_taps(&[EchoTapConfig {
            delay: 0.1,
            gain_l: f32::NAN,
            gain_r: 1.0,
        }])
        .is_err());
    }
}
