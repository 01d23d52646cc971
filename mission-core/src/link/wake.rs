//! Wake-on-LAN style packet that brings the camera's radio out of standby.

use super::HardwareId;

/// Leading synchronisation bytes.
pub const SYNC_LEN: usize = 6;
/// Number of times the hardware identifier repeats after the sync stream.
pub const REPETITIONS: usize = 16;
/// Total packet length.
pub const WAKE_PACKET_LEN: usize = SYNC_LEN + REPETITIONS * 6;

const SYNC_BYTE: u8 = 0xFF;

/// Fully built wake packet. Built fresh for every wake.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WakePacket {
    bytes: [u8; WAKE_PACKET_LEN],
}

impl WakePacket {
    #[must_use]
    pub const fn new(target: &HardwareId) -> Self {
        let id = target.bytes();
        let mut bytes = [SYNC_BYTE; WAKE_PACKET_LEN];
        let mut offset = SYNC_LEN;
        while offset < WAKE_PACKET_LEN {
            let mut index = 0;
            while index < id.len() {
                bytes[offset + index] = id[index];
                index += 1;
            }
            offset += id.len();
        }
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; WAKE_PACKET_LEN] {
        &self.bytes
    }
}
