//! Type definitions for zfmrust

pub mod device_info;
pub mod error;
pub mod image;
pub mod system;
pub mod template;

pub use device_info::DeviceCapabilities;
pub use error::{Error, Result};
pub use image::FingerImage;
pub use system::{PackageSize, StatusRegister, SystemParameters};
pub use template::{SearchMatch, Template};
pub use zfmrust_core::CharBuffer;
