//! The panner bank: a pool of lanes that spatialize mono inputs into the
//! stereo master bus.
//!
//! Lanes are grouped [`PANNER_MAX_LANES`] per panner; the bank grows by
//! whole panners when a strategy runs out of free slots. A source claims a
//! lane at audio-thread init, writes one mono block into it per iteration,
//! and updates its pan parameters when they change. At the end of the block
//! the bank renders every occupied lane and mixes the stereo result into the
//! engine destination.

use crate::config::{BLOCK_SIZE, PANNER_MAX_LANES};
use crate::dsp::channel_mix::mix_channels;
use crate::spatial::hrtf::{HrirDataset, HrtfRenderer};
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

/// Panning strategies, matching the PANNER_STRATEGY property values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PannerStrategy {
    Hrtf = 0,
    Stereo = 1,
}

impl PannerStrategy {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(PannerStrategy::Hrtf),
            1 => Some(PannerStrategy::Stereo),
            _ => None,
        }
    }
}

/// A claim on one output of the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LaneId {
    pub strategy: PannerStrategy,
    panner: usize,
    lane: usize,
}

struct StereoLane {
    input: Vec<f32>,
    gain_l: f32,
    gain_r: f32,
}

impl StereoLane {
    fn new() -> Self {
        Self {
            input: vec![0.0; BLOCK_SIZE],
            // Equal-power center.
            gain_l: FRAC_PI_4.cos(),
            gain_r: FRAC_PI_4.sin(),
        }
    }

    /// Equal-power pan from a scalar in [-1, 1].
    fn set_scalar(&mut self, scalar: f64) {
        let angle = (scalar.clamp(-1.0, 1.0) as f32 + 1.0) * FRAC_PI_4;
        self.gain_l = angle.cos();
        self.gain_r = angle.sin();
    }

    /// Cosine/sine law from azimuth: the lateral component of the direction
    /// becomes the pan scalar, so sources behind the listener pan to the
    /// same side as sources in front.
    fn set_angles(&mut self, azimuth: f64, _elevation: f64) {
        self.set_scalar(azimuth.to_radians().sin());
    }
}

struct HrtfLane {
    input: Vec<f32>,
    renderer: HrtfRenderer,
}

struct Panner<L> {
    lanes: [Option<L>; PANNER_MAX_LANES],
}

impl<L> Panner<L> {
    fn new() -> Self {
        Self {
            lanes: std::array::from_fn(|_| None),
        }
    }

    fn free_slot(&self) -> Option<usize> {
        self.lanes.iter().position(|l| l.is_none())
    }
}

fn new_hrtf_lane(dataset: Arc<HrirDataset>) -> HrtfLane {
    HrtfLane {
        input: vec![0.0; BLOCK_SIZE],
        renderer: HrtfRenderer::new(dataset),
    }
}

pub(crate) struct PannerBank {
    dataset: Arc<HrirDataset>,
    stereo: Vec<Panner<StereoLane>>,
    hrtf: Vec<Panner<HrtfLane>>,
    /// Stereo mix of every lane, rebuilt each block.
    master: Vec<f32>,
}

impl PannerBank {
    pub(crate) fn new() -> Self {
        Self {
            dataset: HrirDataset::build(),
            stereo: Vec::new(),
            hrtf: Vec::new(),
            master: vec![0.0; BLOCK_SIZE * 2],
        }
    }

    pub(crate) fn allocate_lane(&mut self, strategy: PannerStrategy) -> LaneId {
        match strategy {
            PannerStrategy::Stereo => {
                for (p, panner) in self.stereo.iter_mut().enumerate() {
                    if let Some(slot) = panner.free_slot() {
                        panner.lanes[slot] = Some(StereoLane::new());
                        return LaneId {
                            strategy,
                            panner: p,
                            lane: slot,
                        };
                    }
                }
                let mut panner = Panner::new();
                panner.lanes[0] = Some(StereoLane::new());
                self.stereo.push(panner);
                LaneId {
                    strategy,
                    panner: self.stereo.len() - 1,
                    lane: 0,
                }
            }
            PannerStrategy::Hrtf => {
                let dataset = self.dataset.clone();
                for (p, panner) in self.hrtf.iter_mut().enumerate() {
                    if let Some(slot) = panner.free_slot() {
                        panner.lanes[slot] = Some(new_hrtf_lane(dataset));
                        return LaneId {
                            strategy,
                            panner: p,
                            lane: slot,
                        };
                    }
                }
                let mut panner = Panner::new();
                panner.lanes[0] = Some(new_hrtf_lane(dataset));
                self.hrtf.push(panner);
                LaneId {
                    strategy,
                    panner: self.hrtf.len() - 1,
                    lane: 0,
                }
            }
        }
    }

    pub(crate) fn release_lane(&mut self, id: LaneId) {
        match id.strategy {
            PannerStrategy::Stereo => {
                if let Some(panner) = self.stereo.get_mut(id.panner) {
                    panner.lanes[id.lane] = None;
                }
            }
            PannerStrategy::Hrtf => {
                if let Some(panner) = self.hrtf.get_mut(id.panner) {
                    panner.lanes[id.lane] = None;
                }
            }
        }
    }

    /// The lane's mono write destination for this block.
    pub(crate) fn lane_input_mut(&mut self, id: LaneId) -> Option<&mut [f32]> {
        match id.strategy {
            PannerStrategy::Stereo => self.stereo.get_mut(id.panner)?.lanes[id.lane]
                .as_mut()
                .map(|l| l.input.as_mut_slice()),
            PannerStrategy::Hrtf => self.hrtf.get_mut(id.panner)?.lanes[id.lane]
                .as_mut()
                .map(|l| l.input.as_mut_slice()),
        }
    }

    pub(crate) fn set_lane_angles(&mut self, id: LaneId, azimuth: f64, elevation: f64) {
        match id.strategy {
            PannerStrategy::Stereo => {
                if let Some(lane) = self
                    .stereo
                    .get_mut(id.panner)
                    .and_then(|p| p.lanes[id.lane].as_mut())
                {
                    lane.set_angles(azimuth, elevation);
                }
            }
            PannerStrategy::Hrtf => {
                if let Some(lane) = self
                    .hrtf
                    .get_mut(id.panner)
                    .and_then(|p| p.lanes[id.lane].as_mut())
                {
                    lane.renderer.set_angles(azimuth, elevation);
                }
            }
        }
    }

    pub(crate) fn set_lane_scalar(&mut self, id: LaneId, scalar: f64) {
        match id.strategy {
            PannerStrategy::Stereo => {
                if let Some(lane) = self
                    .stereo
                    .get_mut(id.panner)
                    .and_then(|p| p.lanes[id.lane].as_mut())
                {
                    lane.set_scalar(scalar);
                }
            }
            // Scalar panning on an HRTF lane maps onto the frontal arc.
            PannerStrategy::Hrtf => {
                let azimuth = scalar.clamp(-1.0, 1.0) * 90.0;
                let azimuth = if azimuth < 0.0 { azimuth + 360.0 } else { azimuth };
                self.set_lane_angles(id, azimuth, 0.0);
            }
        }
    }

    /// Renders every occupied lane and mixes the bank's stereo master into
    /// `dest` at the engine channel count. Lane inputs are zeroed afterwards
    /// so an unwritten lane is silent next block.
    pub(crate) fn run(&mut self, channels: usize, dest: &mut [f32]) {
        self.master.fill(0.0);

        for panner in self.stereo.iter_mut() {
            for lane in panner.lanes.iter_mut().flatten() {
                for (frame, &sample) in lane.input.iter().enumerate() {
                    self.master[frame * 2] += sample * lane.gain_l;
                    self.master[frame * 2 + 1] += sample * lane.gain_r;
                }
                lane.input.fill(0.0);
            }
        }
        for panner in self.hrtf.iter_mut() {
            for lane in panner.lanes.iter_mut().flatten() {
                lane.renderer.process(&lane.input, &mut self.master);
                lane.input.fill(0.0);
            }
        }

        mix_channels(BLOCK_SIZE, &self.master, 2, dest, channels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_group_by_panner() {
        let mut bank = PannerBank::new();
        let ids: Vec<LaneId> = (0..PANNER_MAX_LANES + 1)
            .map(|_| bank.allocate_lane(PannerStrategy::Stereo))
            .collect();
        assert!(ids[..PANNER_MAX_LANES].iter().all(|id| id.panner == 0));
        assert_eq!(ids[PANNER_MAX_LANES].panner, 1);
    }

    #[test]
    fn released_lane_is_reused() {
        let mut bank = PannerBank::new();
        let a = bank.allocate_lane(PannerStrategy::Hrtf);
        bank.release_lane(a);
        let b = bank.allocate_lane(PannerStrategy::Hrtf);
        assert_eq!(a, b);
    }

    #[test]
    fn stereo_pan_is_equal_power() {
        let mut bank = PannerBank::new();
        let id = bank.allocate_lane(PannerStrategy::Stereo);
        bank.set_lane_scalar(id, 0.0);
        bank.lane_input_mut(id).unwrap().fill(1.0);

        let mut dest = vec![0.0; BLOCK_SIZE * 2];
        bank.run(2, &mut dest);
        let expected = FRAC_PI_4.cos();
        assert!((dest[0] - expected).abs() < 1e-6);
        assert!((dest[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn hard_right_scalar_silences_left() {
        let mut bank = PannerBank::new();
        let id = bank.allocate_lane(PannerStrategy::Stereo);
        bank.set_lane_scalar(id, 1.0);
        bank.lane_input_mut(id).unwrap().fill(0.5);

        let mut dest = vec![0.0; BLOCK_SIZE * 2];
        bank.run(2, &mut dest);
        assert!(dest[0].abs() < 1e-6);
        assert!((dest[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn unwritten_lane_is_silent_after_run() {
        let mut bank = PannerBank::new();
        let id = bank.allocate_lane(PannerStrategy::Stereo);
        bank.lane_input_mut(id).unwrap().fill(1.0);
        let mut dest = vec![0.0; BLOCK_SIZE * 2];
        bank.run(2, &mut dest);
        dest.fill(0.0);
        bank.run(2, &mut dest);
        assert!(dest.iter().all(|&s| s == 0.0));
    }
}
