//! # zfmrust
//!
//! Driver for ZFM-20 family optical fingerprint modules over a serial link.
//!
//! ## Features
//!
//! - Type-safe framed protocol implementation
//! - Async/await API using Tokio
//! - Device status codes returned as data, protocol faults as errors
//! - Image and template bulk transfers
//! - Bounded, cancellable enrollment and search workflows
//!
//! ## Quick Start
//!
//! ```no_run
//! use zfmrust::{CancelToken, Device, SerialTransport, TracingObserver};
//!
//! #[tokio::main]
//! async fn main() -> zfmrust::Result<()> {
//!     // Connect to module
//!     let mut device = Device::new(SerialTransport::new("/dev/ttyUSB0", 57_600));
//!     device.connect().await?;
//!
//!     // Enroll a finger into page 1
//!     let state = device.enroll(1, &CancelToken::new(), &TracingObserver).await?;
//!     println!("{}", state);
//!
//!     // Disconnect
//!     device.disconnect().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod observer;
pub mod shared;
pub mod workflow;

#[cfg(test)]
mod testing;

// Re-exports
pub use device::{Device, DeviceSummary};
pub use error::{Error, Result};
pub use observer::{EnrollEvent, EnrollObserver, NullObserver, TracingObserver};
pub use shared::SharedDevice;
pub use workflow::SearchOutcome;

// Re-export protocol and domain types
pub use zfmrust_core::{
    CancelToken, CharBuffer, Command, EnrollFailure, EnrollState, EnrollStep, Outcome, Packet,
    PollOptions, PollOutcome, Presence, RawReply, Session, Status,
};
pub use zfmrust_transport::{MockTransport, SerialTransport, Transport};
pub use zfmrust_types::{
    DeviceCapabilities, FingerImage, PackageSize, SearchMatch, StatusRegister, SystemParameters,
    Template,
};
