//! Distance attenuation models with WebAudio-style semantics.

/// How gain falls off with distance, matching the DISTANCE_MODEL property
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceModel {
    None = 0,
    Linear = 1,
    Exponential = 2,
    Inverse = 3,
}

impl DistanceModel {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(DistanceModel::None),
            1 => Some(DistanceModel::Linear),
            2 => Some(DistanceModel::Exponential),
            3 => Some(DistanceModel::Inverse),
            _ => None,
        }
    }
}

/// The full set of distance-related parameters carried by 3D sources (and,
/// as defaults for new sources, by the context).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceParams {
    pub model: DistanceModel,
    pub distance_ref: f64,
    pub distance_max: f64,
    pub rolloff: f64,
    /// Extra gain in dB applied within the closeness boost distance.
    pub closeness_boost: f64,
    pub closeness_boost_distance: f64,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self {
            model: DistanceModel::Linear,
            distance_ref: 1.0,
            distance_max: 50.0,
            rolloff: 1.0,
            closeness_boost: 0.0,
            closeness_boost_distance: 0.0,
        }
    }
}

impl DistanceParams {
    /// Attenuation factor for a source `distance` units from the listener.
    pub fn gain(&self, distance: f64) -> f64 {
        let dref = self.distance_ref.max(0.0);
        let dmax = self.distance_max.max(dref);
        let d = distance.clamp(dref, dmax);

        let mut gain = match self.model {
            DistanceModel::None => 1.0,
            DistanceModel::Linear => {
                if dmax <= dref {
                    1.0
                } else {
                    1.0 - self.rolloff * (d - dref) / (dmax - dref)
                }
            }
            DistanceModel::Exponential => {
                if dref <= 0.0 {
                    0.0
                } else {
                    (d / dref).powf(-self.rolloff)
                }
            }
            DistanceModel::Inverse => {
                if dref <= 0.0 {
                    0.0
                } else {
                    dref / (dref + self.rolloff * (d - dref))
                }
            }
        };
        gain = gain.clamp(0.0, 1.0);

        if distance < self.closeness_boost_distance {
            gain *= 10f64.powf(self.closeness_boost / 20.0);
        }
        gain
    }
}
