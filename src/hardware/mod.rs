//! Hardware Capability Module
//!
//! Enumerates, classifies and validates the compute devices an inference
//! runtime exposes, and gathers host-side evidence for them.

pub mod bounded;
pub mod classifier;
pub mod device;
pub mod enumerator;
pub mod host;
pub mod validator;

pub use classifier::{classify, describe};
pub use device::{Device, DeviceCategory, Validation};
pub use enumerator::enumerate;
pub use host::{HostProbe, HostReport, HostTool};
pub use validator::Validator;
