#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod atomic;
pub mod baseline;
pub mod calibration;
pub mod node;
pub mod queue;
pub mod sampler;
pub mod schedule;
pub mod sensors;

pub use baseline::{BaselineRecord, BaselineStore};
pub use calibration::{CalibrationState, CalibrationTimer, Phase};
pub use queue::{Persistence, QueueStore, SampleQueue, SampleRecord};
pub use sampler::Sampler;
