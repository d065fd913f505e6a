//! # zfmrust-core
//!
//! Core protocol implementation for ZFM-20 family optical fingerprint modules.
//!
//! This crate provides the low-level protocol primitives, without any I/O:
//! - Frame structure and encoding/decoding
//! - Checksum calculation
//! - Instruction table and confirmation codes
//! - Bulk transfer reassembly
//! - Session bookkeeping
//! - Enrollment state machine and presence polling limits

pub mod checksum;
pub mod command;
pub mod constants;
pub mod enroll;
pub mod error;
pub mod packet;
pub mod poll;
pub mod reply;
pub mod session;
pub mod status;
pub mod transfer;

pub use command::{BulkKind, CharBuffer, Command, Instruction, TemplateRef, Transfer};
pub use enroll::{EnrollFailure, EnrollState, EnrollStep, Enrollment, StepOutcome, Transition};
pub use error::{Error, Result};
pub use packet::{Packet, PacketHeader, PacketType};
pub use poll::{CancelToken, PollOptions, PollOutcome, Presence};
pub use reply::{Outcome, RawReply};
pub use session::{Session, SessionState};
pub use status::Status;
pub use transfer::Reassembler;
