//! Channel count conversion used wherever two buses with different widths
//! meet.
//!
//! Rules: matching counts add straight through; mono broadcasts to every
//! output channel; wider-to-narrower folds channels onto `channel % dst`
//! scaled by `dst / src` so that stereo to mono averages. Narrower-to-wider
//! (other than mono) fills the leading channels and leaves the rest
//! untouched.

/// Mixes `frames` frames of interleaved audio from `src` (with `src_channels`)
/// into `dst` (with `dst_channels`), adding to what is already there.
pub(crate) fn mix_channels(
    frames: usize,
    src: &[f32],
    src_channels: usize,
    dst: &mut [f32],
    dst_channels: usize,
) {
    debug_assert!(src.len() >= frames * src_channels);
    debug_assert!(dst.len() >= frames * dst_channels);

    if src_channels == dst_channels {
        for i in 0..frames * src_channels {
            dst[i] += src[i];
        }
    } else if src_channels == 1 {
        for frame in 0..frames {
            let sample = src[frame];
            let base = frame * dst_channels;
            for ch in 0..dst_channels {
                dst[base + ch] += sample;
            }
        }
    } else if src_channels > dst_channels {
        let weight = dst_channels as f32 / src_channels as f32;
        for frame in 0..frames {
            for ch in 0..src_channels {
                dst[frame * dst_channels + ch % dst_channels] +=
                    src[frame * src_channels + ch] * weight;
            }
        }
    } else {
        for frame in 0..frames {
            for ch in 0..src_channels {
                dst[frame * dst_channels + ch] += src[frame * src_channels + ch];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_broadcasts() {
        let src = [1.0, 2.0];
        let mut dst = [0.0; 4];
        mix_channels(2, &src, 1, &mut dst, 2);
        assert_eq!(dst, [1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn stereo_to_mono_averages() {
        let src = [1.0, 0.0, 0.5, 0.5];
        let mut dst = [0.0; 2];
        mix_channels(2, &src, 2, &mut dst, 1);
        assert_eq!(dst, [0.5, 0.5]);
    }

    #[test]
    fn matching_counts_accumulate() {
        let src = [1.0, 2.0];
        let mut dst = [0.5, 0.5];
        mix_channels(1, &src, 2, &mut dst, 2);
        assert_eq!(dst, [1.5, 2.5]);
    }

    #[test]
    fn upmix_fills_leading_channels() {
        let src = [1.0, 2.0];
        let mut dst = [0.0; 4];
        mix_channels(1, &src, 2, &mut dst, 4);
        assert_eq!(dst, [1.0, 2.0, 0.0, 0.0]);
    }
}
