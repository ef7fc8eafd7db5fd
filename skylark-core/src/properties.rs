//! Property identifiers, tagged values, and the per-kind property tables.
//!
//! Validation is data driven: each object kind exposes a static table of
//! `PropertyDef` entries and a single generic validator interprets it. The
//! audio thread only ever sees values that already passed validation on the
//! user thread.

use crate::buffer::Buffer;
use crate::error::{Result, SkylarkError};
use crate::handle::{Handle, ObjectKind};
use std::sync::Arc;

/// All properties understood by some object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Azimuth,
    Elevation,
    Gain,
    PanningScalar,
    PannerStrategy,
    Position,
    Orientation,
    DistanceModel,
    DistanceRef,
    DistanceMax,
    Rolloff,
    ClosenessBoost,
    ClosenessBoostDistance,
    Buffer,
    Looping,
    NoiseType,
    PitchBend,
    PlaybackPosition,
    T60,
    MeanFreePath,
    LateReflectionsLfRolloff,
    LateReflectionsLfReference,
    LateReflectionsHfRolloff,
    LateReflectionsHfReference,
    LateReflectionsDiffusion,
    LateReflectionsModulationDepth,
    LateReflectionsModulationFrequency,
    LateReflectionsDelay,
    InputFilterEnabled,
    InputFilterCutoff,
}

/// The declared kind of a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Int,
    Double,
    Object,
    Double3,
    Double6,
}

/// A shared-object property value: the referring handle plus the strong
/// reference that travels to the audio thread.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    pub handle: Handle,
    pub buffer: Arc<Buffer>,
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

/// A tagged property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    Object(Option<ObjectValue>),
    Double3([f64; 3]),
    Double6([f64; 6]),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::Object(_) => PropertyKind::Object,
            PropertyValue::Double3(_) => PropertyKind::Double3,
            PropertyValue::Double6(_) => PropertyKind::Double6,
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            PropertyValue::Int(v) => Ok(*v),
            other => Err(SkylarkError::PropertyKindMismatch(format!(
                "expected int, got {:?}",
                other.kind()
            ))),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self {
            PropertyValue::Double(v) => Ok(*v),
            other => Err(SkylarkError::PropertyKindMismatch(format!(
                "expected double, got {:?}",
                other.kind()
            ))),
        }
    }

    pub fn as_double3(&self) -> Result<[f64; 3]> {
        match self {
            PropertyValue::Double3(v) => Ok(*v),
            other => Err(SkylarkError::PropertyKindMismatch(format!(
                "expected double3, got {:?}",
                other.kind()
            ))),
        }
    }

    pub fn as_double6(&self) -> Result<[f64; 6]> {
        match self {
            PropertyValue::Double6(v) => Ok(*v),
            other => Err(SkylarkError::PropertyKindMismatch(format!(
                "expected double6, got {:?}",
                other.kind()
            ))),
        }
    }

    pub fn as_object(&self) -> Result<Option<ObjectValue>> {
        match self {
            PropertyValue::Object(v) => Ok(v.clone()),
            other => Err(SkylarkError::PropertyKindMismatch(format!(
                "expected object, got {:?}",
                other.kind()
            ))),
        }
    }
}

/// One row of a property table.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    pub id: Property,
    pub kind: PropertyKind,
    pub min: f64,
    pub max: f64,
    /// Whether `min` itself is out of range (pitch bend is in (0, 2]).
    pub exclusive_min: bool,
    /// Required kind of the referenced object, for `PropertyKind::Object`.
    pub target: Option<ObjectKind>,
}

const fn int(id: Property, min: f64, max: f64) -> PropertyDef {
    PropertyDef {
        id,
        kind: PropertyKind::Int,
        min,
        max,
        exclusive_min: false,
        target: None,
    }
}

const fn double(id: Property, min: f64, max: f64) -> PropertyDef {
    PropertyDef {
        id,
        kind: PropertyKind::Double,
        min,
        max,
        exclusive_min: false,
        target: None,
    }
}

const fn double3(id: Property) -> PropertyDef {
    PropertyDef {
        id,
        kind: PropertyKind::Double3,
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
        exclusive_min: false,
        target: None,
    }
}

const fn double6(id: Property) -> PropertyDef {
    PropertyDef {
        id,
        kind: PropertyKind::Double6,
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
        exclusive_min: false,
        target: None,
    }
}

const fn object(id: Property, target: ObjectKind) -> PropertyDef {
    PropertyDef {
        id,
        kind: PropertyKind::Object,
        min: 0.0,
        max: 0.0,
        exclusive_min: false,
        target: Some(target),
    }
}

const GAIN: PropertyDef = double(Property::Gain, 0.0, f64::INFINITY);

const DISTANCE_PARAMS: [PropertyDef; 6] = [
    int(Property::DistanceModel, 0.0, 3.0),
    double(Property::DistanceRef, 0.0, f64::INFINITY),
    double(Property::DistanceMax, 0.0, f64::INFINITY),
    double(Property::Rolloff, 0.0, f64::INFINITY),
    double(Property::ClosenessBoost, f64::NEG_INFINITY, f64::INFINITY),
    double(Property::ClosenessBoostDistance, 0.0, f64::INFINITY),
];

static CONTEXT_PROPERTIES: [PropertyDef; 9] = [
    GAIN,
    double3(Property::Position),
    double6(Property::Orientation),
    DISTANCE_PARAMS[0],
    DISTANCE_PARAMS[1],
    DISTANCE_PARAMS[2],
    DISTANCE_PARAMS[3],
    DISTANCE_PARAMS[4],
    DISTANCE_PARAMS[5],
];

static DIRECT_SOURCE_PROPERTIES: [PropertyDef; 1] = [GAIN];

static PANNED_SOURCE_PROPERTIES: [PropertyDef; 5] = [
    GAIN,
    double(Property::Azimuth, 0.0, 360.0),
    double(Property::Elevation, -90.0, 90.0),
    double(Property::PanningScalar, -1.0, 1.0),
    int(Property::PannerStrategy, 0.0, 1.0),
];

static SOURCE3D_PROPERTIES: [PropertyDef; 13] = [
    GAIN,
    double(Property::Azimuth, 0.0, 360.0),
    double(Property::Elevation, -90.0, 90.0),
    double(Property::PanningScalar, -1.0, 1.0),
    int(Property::PannerStrategy, 0.0, 1.0),
    double3(Property::Position),
    double6(Property::Orientation),
    DISTANCE_PARAMS[0],
    DISTANCE_PARAMS[1],
    DISTANCE_PARAMS[2],
    DISTANCE_PARAMS[3],
    DISTANCE_PARAMS[4],
    DISTANCE_PARAMS[5],
];

static BUFFER_GENERATOR_PROPERTIES: [PropertyDef; 4] = [
    object(Property::Buffer, ObjectKind::Buffer),
    int(Property::Looping, 0.0, 1.0),
    PropertyDef {
        id: Property::PitchBend,
        kind: PropertyKind::Double,
        min: 0.0,
        max: 2.0,
        exclusive_min: true,
        target: None,
    },
    double(Property::PlaybackPosition, 0.0, f64::INFINITY),
];

static STREAMING_GENERATOR_PROPERTIES: [PropertyDef; 1] = [int(Property::Looping, 0.0, 1.0)];

static NOISE_GENERATOR_PROPERTIES: [PropertyDef; 1] = [int(Property::NoiseType, 0.0, 2.0)];

static ECHO_PROPERTIES: [PropertyDef; 3] = [
    GAIN,
    int(Property::InputFilterEnabled, 0.0, 1.0),
    double(Property::InputFilterCutoff, 0.0, 22050.0),
];

static REVERB_PROPERTIES: [PropertyDef; 13] = [
    GAIN,
    int(Property::InputFilterEnabled, 0.0, 1.0),
    double(Property::InputFilterCutoff, 0.0, 22050.0),
    double(Property::T60, 0.0, 100.0),
    double(Property::MeanFreePath, 0.0, 0.5),
    double(Property::LateReflectionsLfRolloff, 0.0, 2.0),
    double(Property::LateReflectionsLfReference, 0.0, 22050.0),
    double(Property::LateReflectionsHfRolloff, 0.0, 2.0),
    double(Property::LateReflectionsHfReference, 0.0, 22050.0),
    double(Property::LateReflectionsDiffusion, 0.0, 1.0),
    double(Property::LateReflectionsModulationDepth, 0.0, 0.3),
    double(Property::LateReflectionsModulationFrequency, 0.01, 100.0),
    double(Property::LateReflectionsDelay, 0.0, 0.5),
];

/// The property table for an object kind. Buffers expose no properties.
pub(crate) fn table_for(kind: ObjectKind) -> &'static [PropertyDef] {
    match kind {
        ObjectKind::Context => &CONTEXT_PROPERTIES,
        ObjectKind::Buffer => &[],
        ObjectKind::DirectSource => &DIRECT_SOURCE_PROPERTIES,
        ObjectKind::PannedSource => &PANNED_SOURCE_PROPERTIES,
        ObjectKind::Source3D => &SOURCE3D_PROPERTIES,
        ObjectKind::BufferGenerator => &BUFFER_GENERATOR_PROPERTIES,
        ObjectKind::StreamingGenerator => &STREAMING_GENERATOR_PROPERTIES,
        ObjectKind::NoiseGenerator => &NOISE_GENERATOR_PROPERTIES,
        ObjectKind::EchoEffect => &ECHO_PROPERTIES,
        ObjectKind::ReverbEffect => &REVERB_PROPERTIES,
    }
}

pub(crate) fn lookup(kind: ObjectKind, id: Property) -> Result<&'static PropertyDef> {
    table_for(kind)
        .iter()
        .find(|def| def.id == id)
        .ok_or_else(|| {
            SkylarkError::UnknownProperty(format!("{id:?} is not a property of {kind:?}"))
        })
}

/// Full user-thread validation: presence, kind, range, and target class.
pub(crate) fn validate(kind: ObjectKind, id: Property, value: &PropertyValue) -> Result<()> {
    let def = lookup(kind, id)?;
    if def.kind != value.kind() {
        return Err(SkylarkError::PropertyKindMismatch(format!(
            "{id:?} expects {:?}, got {:?}",
            def.kind,
            value.kind()
        )));
    }
    let check_range = |v: f64| -> Result<()> {
        let below = if def.exclusive_min {
            v <= def.min
        } else {
            v < def.min
        };
        if below || v > def.max || v.is_nan() {
            return Err(SkylarkError::PropertyOutOfRange(format!(
                "{id:?} = {v} outside [{}, {}]",
                def.min, def.max
            )));
        }
        Ok(())
    };
    match value {
        PropertyValue::Int(v) => check_range(*v as f64),
        PropertyValue::Double(v) => check_range(*v),
        PropertyValue::Object(_) | PropertyValue::Double3(_) | PropertyValue::Double6(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_property_is_rejected() {
        let err = validate(
            ObjectKind::DirectSource,
            Property::Azimuth,
            &PropertyValue::Double(10.0),
        )
        .unwrap_err();
        assert!(matches!(err, SkylarkError::UnknownProperty(_)));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let err = validate(
            ObjectKind::PannedSource,
            Property::Azimuth,
            &PropertyValue::Int(3),
        )
        .unwrap_err();
        assert!(matches!(err, SkylarkError::PropertyKindMismatch(_)));
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = validate(
            ObjectKind::PannedSource,
            Property::PanningScalar,
            &PropertyValue::Double(1.5),
        )
        .unwrap_err();
        assert!(matches!(err, SkylarkError::PropertyOutOfRange(_)));
    }

    #[test]
    fn pitch_bend_zero_is_rejected() {
        let err = validate(
            ObjectKind::BufferGenerator,
            Property::PitchBend,
            &PropertyValue::Double(0.0),
        )
        .unwrap_err();
        assert!(matches!(err, SkylarkError::PropertyOutOfRange(_)));
        validate(
            ObjectKind::BufferGenerator,
            Property::PitchBend,
            &PropertyValue::Double(2.0),
        )
        .unwrap();
    }
}
