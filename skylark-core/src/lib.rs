pub mod buffer;
pub mod config;
pub mod context;
pub mod dsp;
pub mod effects;
pub mod error;
pub mod events;
pub mod handle;
pub mod logging;
pub mod math;
pub mod properties;
pub mod spatial;

mod decode;
mod engine;
mod generators;
mod output;
mod router;
mod rt;
mod sources;

pub use buffer::Buffer;
pub use config::SkylarkDesc;
pub use context::{SkylarkClient, SkylarkContext};
pub use dsp::biquad::{design_bandpass, design_highpass, design_lowpass, BiquadConfig};
pub use effects::EchoTapConfig;
pub use error::{last_error_code, last_error_message, Result, SkylarkError};
pub use events::SkylarkEvent;
pub use handle::Handle;
pub use properties::{Property, PropertyValue};
pub use spatial::distance::DistanceModel;
pub use spatial::panner::PannerStrategy;
