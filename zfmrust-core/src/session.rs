//! Session bookkeeping for one module
//!
//! A session tracks:
//! - Module address (changes after a successful `SetAddr`)
//! - Handshake password (changes after a successful `SetPwd`)
//! - Lifecycle state

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    command::Command,
    constants::{DEFAULT_ADDRESS, DEFAULT_PASSWORD},
    error::{Error, Result},
    packet::Packet,
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport not open
    Closed,

    /// Transport open, hardware info not read yet
    Open,

    /// Hardware info read, ready for commands
    Ready,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    address: AtomicU32,
    password: AtomicU32,
    state: parking_lot::RwLock<SessionState>,
}

impl Session {
    /// Create a closed session for the module at `address`
    pub fn new(address: u32, password: u32) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                address: AtomicU32::new(address),
                password: AtomicU32::new(password),
                state: parking_lot::RwLock::new(SessionState::Closed),
            }),
        }
    }

    /// Current module address
    pub fn address(&self) -> u32 {
        self.inner.address.load(Ordering::Acquire)
    }

    /// Record a new module address
    pub fn set_address(&self, address: u32) {
        self.inner.address.store(address, Ordering::Release);
    }

    /// Current handshake password
    pub fn password(&self) -> u32 {
        self.inner.password.load(Ordering::Acquire)
    }

    /// Record a new handshake password
    pub fn set_password(&self, password: u32) {
        self.inner.password.store(password, Ordering::Release);
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state(), SessionState::Closed)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), SessionState::Ready)
    }

    /// Transport opened
    pub fn open(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Closed {
            return Err(Error::InvalidSessionState(format!(
                "Cannot open from state: {:?}",
                *state
            )));
        }

        *state = SessionState::Open;
        Ok(())
    }

    /// Hardware info read
    pub fn mark_ready(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Open {
            return Err(Error::InvalidSessionState(format!(
                "Cannot become ready from state: {:?}",
                *state
            )));
        }

        *state = SessionState::Ready;
        Ok(())
    }

    /// Close session
    pub fn close(&self) {
        *self.inner.state.write() = SessionState::Closed;
    }

    /// Build the command packet for `command` addressed to this module
    pub fn command_packet(&self, command: &Command) -> Packet {
        Packet::command(self.address(), command.encode_payload())
    }

    /// Check that `packet` came from this module
    ///
    /// `alternate` is accepted too; used while the address is being changed.
    pub fn check_origin(&self, packet: &Packet, alternate: Option<u32>) -> Result<()> {
        let expected = self.address();

        if packet.address == expected || Some(packet.address) == alternate {
            return Ok(());
        }

        Err(Error::AddressMismatch {
            expected,
            actual: packet.address,
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_PASSWORD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;

    #[test]
    fn test_session_new() {
        let session = Session::default();
        assert_eq!(session.address(), 0xFFFF_FFFF);
        assert_eq!(session.password(), 0);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_open());
        assert!(!session.is_ready());
    }

    #[test]
    fn test_session_lifecycle() {
        let session = Session::default();

        session.open().unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert!(session.is_open());
        assert!(!session.is_ready());

        session.mark_ready().unwrap();
        assert!(session.is_ready());

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_invalid_state_transitions() {
        let session = Session::default();

        // Cannot become ready without opening
        assert!(session.mark_ready().is_err());

        // Cannot open twice
        session.open().unwrap();
        assert!(session.open().is_err());
    }

    #[test]
    fn test_command_packet_uses_address() {
        let session = Session::new(0x1234_5678, 0);
        let packet = session.command_packet(&Command::GetImage);

        assert_eq!(packet.address, 0x1234_5678);
        assert_eq!(packet.packet_type, PacketType::Command);
        assert_eq!(&packet.payload[..], &[0x01]);
    }

    #[test]
    fn test_check_origin() {
        let session = Session::new(0x0000_0001, 0);

        let own = Packet::new(0x0000_0001, PacketType::Ack, vec![0x00]);
        let other = Packet::new(0x0000_0002, PacketType::Ack, vec![0x00]);

        assert!(session.check_origin(&own, None).is_ok());
        assert!(matches!(
            session.check_origin(&other, None),
            Err(Error::AddressMismatch { expected: 1, actual: 2 })
        ));
        assert!(session.check_origin(&other, Some(2)).is_ok());
    }

    #[test]
    fn test_session_clone_shares_state() {
        let session1 = Session::default();
        let session2 = session1.clone();

        session1.set_address(0xAABB_CCDD);
        session1.set_password(7);

        assert_eq!(session2.address(), 0xAABB_CCDD);
        assert_eq!(session2.password(), 7);
    }
}
