//! Fieldbus object model types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of an SDO entry: object index plus sub-index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectAddress {
    /// Object index
    pub index: u16,
    /// Sub-index
    pub sub_index: u8,
}

impl ObjectAddress {
    /// Create an address.
    pub const fn new(index: u16, sub_index: u8) -> Self {
        Self { index, sub_index }
    }
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}:{:02X}", self.index, self.sub_index)
    }
}

/// EtherCAT application layer state of a slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum SlaveState {
    /// No valid state reported
    #[default]
    None = 0x00,
    /// Init
    Init = 0x01,
    /// Pre-operational
    PreOp = 0x02,
    /// Bootstrap
    Boot = 0x03,
    /// Safe-operational
    SafeOp = 0x04,
    /// Operational
    Op = 0x08,
}

impl SlaveState {
    /// Decode the low nibble of an AL status word.
    pub const fn from_al_status(raw: u16) -> Self {
        match raw & 0x0F {
            0x01 => Self::Init,
            0x02 => Self::PreOp,
            0x03 => Self::Boot,
            0x04 => Self::SafeOp,
            0x08 => Self::Op,
            _ => Self::None,
        }
    }
}

impl fmt::Display for SlaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Init => "INIT",
            Self::PreOp => "PRE-OP",
            Self::Boot => "BOOT",
            Self::SafeOp => "SAFE-OP",
            Self::Op => "OP",
        };
        f.write_str(name)
    }
}

/// CiA 402 modes of operation (object 0x6060).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i8)]
pub enum OperationMode {
    /// Profile position mode
    ProfilePosition = 1,
    /// Profile velocity mode
    ProfileVelocity = 3,
    /// Homing mode
    Homing = 6,
    /// Cyclic synchronous position
    CyclicSyncPosition = 8,
    /// Cyclic synchronous velocity
    CyclicSyncVelocity = 9,
    /// Cyclic synchronous torque
    CyclicSyncTorque = 10,
}

impl OperationMode {
    /// Raw mode code written to the drive.
    #[inline]
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Decode a raw mode code.
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Self::ProfilePosition),
            3 => Some(Self::ProfileVelocity),
            6 => Some(Self::Homing),
            8 => Some(Self::CyclicSyncPosition),
            9 => Some(Self::CyclicSyncVelocity),
            10 => Some(Self::CyclicSyncTorque),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_address_display() {
        assert_eq!(ObjectAddress::new(0x6040, 0).to_string(), "0x6040:00");
        assert_eq!(ObjectAddress::new(0x3142, 3).to_string(), "0x3142:03");
    }

    #[test]
    fn slave_state_decodes_al_status() {
        assert_eq!(SlaveState::from_al_status(0x0004), SlaveState::SafeOp);
        assert_eq!(SlaveState::from_al_status(0x0014), SlaveState::SafeOp);
        assert_eq!(SlaveState::from_al_status(0x0008), SlaveState::Op);
        assert_eq!(SlaveState::from_al_status(0x0007), SlaveState::None);
    }

    #[test]
    fn operation_mode_codes_round_trip() {
        for mode in [
            OperationMode::ProfilePosition,
            OperationMode::ProfileVelocity,
            OperationMode::Homing,
            OperationMode::CyclicSyncPosition,
            OperationMode::CyclicSyncVelocity,
            OperationMode::CyclicSyncTorque,
        ] {
            assert_eq!(OperationMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(OperationMode::ProfilePosition.code(), 1);
        assert_eq!(OperationMode::from_code(2), None);
    }
}
