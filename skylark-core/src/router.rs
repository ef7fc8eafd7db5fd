//! The audio send matrix: fading edges from source outputs to effect
//! inputs.
//!
//! Edges are owned by the router and keyed `(source, effect)`, kept sorted
//! so one source's outgoing edges form a contiguous run. Endpoints
//! participate by handle only; an edge whose endpoint no longer resolves is
//! pruned at the end of the block, as is an edge that has fully faded to
//! silence.

use crate::config::{BLOCK_SIZE, MAX_CHANNELS};
use crate::dsp::channel_mix::mix_channels;
use crate::dsp::fader::LinearFader;
use crate::effects::EffectState;
use crate::handle::Handle;
use std::collections::BTreeMap;

#[derive(Debug)]
struct Route {
    output: Handle,
    input: Handle,
    fader: LinearFader,
}

pub(crate) struct Router {
    /// Sorted by `(output, input)`.
    routes: Vec<Route>,
    time: u64,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self {
            routes: Vec::new(),
            time: 0,
        }
    }

    fn position(&self, output: Handle, input: Handle) -> std::result::Result<usize, usize> {
        self.routes
            .binary_search_by(|r| (r.output, r.input).cmp(&(output, input)))
    }

    /// Creates or retargets an edge. A new edge fades in from zero; an
    /// existing one fades from its currently driven gain, so hammering on
    /// the configuration still produces reasonable audio.
    pub(crate) fn configure_route(
        &mut self,
        output: Handle,
        input: Handle,
        gain: f32,
        fade_blocks: u64,
    ) {
        let index = match self.position(output, input) {
            Ok(index) => index,
            Err(index) => {
                self.routes.insert(
                    index,
                    Route {
                        output,
                        input,
                        fader: LinearFader::new(0.0),
                    },
                );
                index
            }
        };
        let route = &mut self.routes[index];
        if fade_blocks == 0 {
            route.fader = LinearFader::new(gain);
        } else {
            route.fader.set_value_spanning(self.time, gain, fade_blocks);
        }
    }

    /// Fades an edge out; it is dropped once silent.
    pub(crate) fn remove_route(&mut self, output: Handle, input: Handle, fade_blocks: u64) {
        if self.position(output, input).is_ok() {
            self.configure_route(output, input, 0.0, fade_blocks.max(1));
        }
    }

    pub(crate) fn remove_all_routes(&mut self, output: Handle, fade_blocks: u64) {
        let targets: Vec<Handle> = self
            .routes
            .iter()
            .filter(|r| r.output == output)
            .map(|r| r.input)
            .collect();
        for input in targets {
            self.remove_route(output, input, fade_blocks);
        }
    }

    pub(crate) fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Sends one source block through all of its outgoing edges,
    /// channel-mixing into each live destination effect's input buffer under
    /// the edge's driven gain.
    pub(crate) fn route_audio(
        &self,
        output: Handle,
        block: &[f32],
        channels: usize,
        effects: &mut BTreeMap<Handle, EffectState>,
    ) {
        let start = self
            .routes
            .partition_point(|r| (r.output, r.input) < (output, Handle(0)));
        if start >= self.routes.len() || self.routes[start].output != output {
            return;
        }

        let mut working = [0.0f32; BLOCK_SIZE * MAX_CHANNELS];
        for route in self.routes[start..]
            .iter()
            .take_while(|r| r.output == output)
        {
            let Some(effect) = effects.get_mut(&route.input) else {
                continue;
            };

            let gain_start = route.fader.value_at(self.time as f64);
            let gain_end = route.fader.value_at(self.time as f64 + 1.0);
            let frames = BLOCK_SIZE * channels;
            if gain_start != gain_end {
                for frame in 0..BLOCK_SIZE {
                    let w2 = frame as f32 / BLOCK_SIZE as f32;
                    let gain = gain_start * (1.0 - w2) + gain_end * w2;
                    for channel in 0..channels {
                        let idx = frame * channels + channel;
                        working[idx] = gain * block[idx];
                    }
                }
            } else {
                if gain_end == 0.0 {
                    continue;
                }
                for idx in 0..frames {
                    working[idx] = gain_end * block[idx];
                }
            }

            let (input_buffer, input_channels) = effect.input_mut();
            mix_channels(
                BLOCK_SIZE,
                &working[..frames],
                channels,
                input_buffer,
                input_channels,
            );
        }
    }

    /// Advances router time and prunes edges that are silent-and-settled or
    /// whose endpoints are gone.
    pub(crate) fn finish_block(
        &mut self,
        output_alive: impl Fn(Handle) -> bool,
        input_alive: impl Fn(Handle) -> bool,
    ) {
        self.time += 1;
        let time = self.time;
        self.routes.retain(|r| {
            let settled = r.fader.value_at(time as f64) == 0.0 && !r.fader.is_fading(time);
            !settled && output_alive(r.output) && input_alive(r.input)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_stay_sorted_and_counted() {
        let mut router = Router::new();
        router.configure_route(Handle(5), Handle(9), 1.0, 1);
        router.configure_route(Handle(2), Handle(9), 1.0, 1);
        router.configure_route(Handle(5), Handle(3), 1.0, 1);
        assert_eq!(router.route_count(), 3);
        assert!(router
            .routes
            .windows(2)
            .all(|w| (w[0].output, w[0].input) < (w[1].output, w[1].input)));
    }

    #[test]
    fn removed_route_fades_then_drops() {
        let mut router = Router::new();
        router.configure_route(Handle(1), Handle(2), 1.0, 1);
        router.finish_block(|_| true, |_| true);
        router.remove_route(Handle(1), Handle(2), 1);
        // During the fade-out block the edge still exists.
        assert_eq!(router.route_count(), 1);
        router.finish_block(|_| true, |_| true);
        assert_eq!(router.route_count(), 0);
    }

    #[test]
    fn dead_endpoints_are_pruned() {
        let mut router = Router::new();
        router.configure_route(Handle(1), Handle(2), 1.0, 1);
        router.finish_block(|_| true, |h| h != Handle(2));
        assert_eq!(router.route_count(), 0);
    }
}
