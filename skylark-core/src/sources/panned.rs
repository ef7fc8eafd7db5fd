//! Pan state shared by panned and 3D sources.

use crate::properties::{Property, PropertyValue};
use crate::spatial::panner::{LaneId, PannerBank, PannerStrategy};

pub(crate) struct PannedData {
    strategy: PannerStrategy,
    lane: Option<LaneId>,
    azimuth: f64,
    elevation: f64,
    panning_scalar: f64,
    /// Whichever of scalar / angles was set last wins.
    scalar_panning: bool,
    needs_update: bool,
}

impl PannedData {
    pub(crate) fn new(strategy: PannerStrategy) -> Self {
        Self {
            strategy,
            lane: None,
            azimuth: 0.0,
            elevation: 0.0,
            panning_scalar: 0.0,
            scalar_panning: false,
            needs_update: true,
        }
    }

    pub(crate) fn lane(&self) -> Option<LaneId> {
        self.lane
    }

    /// Claims a lane matching the current strategy, dropping a stale lane
    /// after a strategy change.
    pub(crate) fn ensure_lane(&mut self, panners: &mut PannerBank) {
        if let Some(lane) = self.lane {
            if lane.strategy == self.strategy {
                return;
            }
            panners.release_lane(lane);
            self.lane = None;
        }
        self.lane = Some(panners.allocate_lane(self.strategy));
        self.needs_update = true;
    }

    pub(crate) fn release_lane(&mut self, panners: &mut PannerBank) {
        if let Some(lane) = self.lane.take() {
            panners.release_lane(lane);
        }
    }

    /// Pushes pending pan parameters to the owned lane.
    pub(crate) fn push_params(&mut self, panners: &mut PannerBank) {
        if !self.needs_update {
            return;
        }
        if let Some(lane) = self.lane {
            if self.scalar_panning {
                panners.set_lane_scalar(lane, self.panning_scalar);
            } else {
                panners.set_lane_angles(lane, self.azimuth, self.elevation);
            }
            self.needs_update = false;
        }
    }

    /// Used by 3D sources, which re-derive their angles every block.
    pub(crate) fn set_derived_angles(&mut self, azimuth: f64, elevation: f64) {
        if (azimuth - self.azimuth).abs() > 1e-9 || (elevation - self.elevation).abs() > 1e-9 {
            self.azimuth = azimuth;
            self.elevation = elevation;
            self.scalar_panning = false;
            self.needs_update = true;
        }
    }

    pub(crate) fn apply_property(&mut self, id: Property, value: &PropertyValue) {
        match (id, value) {
            (Property::Azimuth, PropertyValue::Double(v)) => {
                self.azimuth = *v;
                self.scalar_panning = false;
                self.needs_update = true;
            }
            (Property::Elevation, PropertyValue::Double(v)) => {
                self.elevation = *v;
                self.scalar_panning = false;
                self.needs_update = true;
            }
            (Property::PanningScalar, PropertyValue::Double(v)) => {
                self.panning_scalar = *v;
                self.scalar_panning = true;
                self.needs_update = true;
            }
            (Property::PannerStrategy, PropertyValue::Int(v)) => {
                if let Some(strategy) = PannerStrategy::from_i64(*v) {
                    // The lane is reallocated lazily on the next block.
                    self.strategy = strategy;
                }
            }
            _ => {}
        }
    }

    pub(crate) fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        match id {
            Property::Azimuth => Some(PropertyValue::Double(self.azimuth)),
            Property::Elevation => Some(PropertyValue::Double(self.elevation)),
            Property::PanningScalar => Some(PropertyValue::Double(self.panning_scalar)),
            Property::PannerStrategy => Some(PropertyValue::Int(self.strategy as i64)),
            _ => None,
        }
    }
}
