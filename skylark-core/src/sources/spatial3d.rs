//! Fully positional sources: pan angles and attenuation derived from the
//! listener pose every block.

use crate::math::{relative_direction, Pose, Vec3};
use crate::properties::{Property, PropertyValue};
use crate::sources::PannedData;
use crate::spatial::distance::{DistanceModel, DistanceParams};
use crate::spatial::panner::PannerStrategy;

pub(crate) struct SpatialData {
    pub(crate) panned: PannedData,
    position: [f64; 3],
    /// Source orientation (forward then up). Carried for completeness; the
    /// panner only consumes the listener's orientation.
    orientation: [f64; 6],
    pub(crate) distance: DistanceParams,
}

impl SpatialData {
    pub(crate) fn new(strategy: PannerStrategy) -> Self {
        Self {
            panned: PannedData::new(strategy),
            position: [0.0; 3],
            orientation: [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            distance: DistanceParams::default(),
        }
    }

    /// Re-derives azimuth/elevation from the listener and returns the
    /// distance attenuation factor for this block.
    pub(crate) fn update(&mut self, listener: Pose) -> f64 {
        let position = Vec3::new(
            self.position[0] as f32,
            self.position[1] as f32,
            self.position[2] as f32,
        );
        let direction = relative_direction(&listener, position);
        self.panned
            .set_derived_angles(direction.azimuth, direction.elevation);
        self.distance.gain(direction.distance)
    }

    pub(crate) fn apply_property(&mut self, id: Property, value: &PropertyValue) {
        match (id, value) {
            (Property::Position, PropertyValue::Double3(v)) => self.position = *v,
            (Property::Orientation, PropertyValue::Double6(v)) => self.orientation = *v,
            (Property::DistanceModel, PropertyValue::Int(v)) => {
                if let Some(model) = DistanceModel::from_i64(*v) {
                    self.distance.model = model;
                }
            }
            (Property::DistanceRef, PropertyValue::Double(v)) => self.distance.distance_ref = *v,
            (Property::DistanceMax, PropertyValue::Double(v)) => self.distance.distance_max = *v,
            (Property::Rolloff, PropertyValue::Double(v)) => self.distance.rolloff = *v,
            (Property::ClosenessBoost, PropertyValue::Double(v)) => {
                self.distance.closeness_boost = *v
            }
            (Property::ClosenessBoostDistance, PropertyValue::Double(v)) => {
                self.distance.closeness_boost_distance = *v
            }
            _ => self.panned.apply_property(id, value),
        }
    }

    pub(crate) fn fetch_property(&self, id: Property) -> Option<PropertyValue> {
        match id {
            Property::Position => Some(PropertyValue::Double3(self.position)),
            Property::Orientation => Some(PropertyValue::Double6(self.orientation)),
            Property::DistanceModel => Some(PropertyValue::Int(self.distance.model as i64)),
            Property::DistanceRef => Some(PropertyValue::Double(self.distance.distance_ref)),
            Property::DistanceMax => Some(PropertyValue::Double(self.distance.distance_max)),
            Property::Rolloff => Some(PropertyValue::Double(self.distance.rolloff)),
            Property::ClosenessBoost => {
                Some(PropertyValue::Double(self.distance.closeness_boost))
            }
            Property::ClosenessBoostDistance => {
                Some(PropertyValue::Double(self.distance.closeness_boost_distance))
            }
            _ => self.panned.fetch_property(id),
        }
    }
}
