//! Fieldbus and drive error types.

use crate::fieldbus::types::{ObjectAddress, SlaveState};
use thiserror::Error;

/// Errors reported by a `FieldbusTransport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldbusError {
    /// The slave aborted the SDO transfer
    #[error("SDO abort at {address}: code 0x{code:08X}")]
    SdoAbort {
        /// Object accessed
        address: ObjectAddress,
        /// CANopen abort code
        code: u32,
    },

    /// The SDO transfer did not complete in time
    #[error("SDO timeout at {address}")]
    Timeout {
        /// Object accessed
        address: ObjectAddress,
    },

    /// The slave returned a different number of bytes than expected
    #[error("SDO size mismatch at {address}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Object accessed
        address: ObjectAddress,
        /// Expected byte count
        expected: usize,
        /// Received byte count
        actual: usize,
    },

    /// No slave at the given bus position
    #[error("Slave {0} not found")]
    SlaveNotFound(u16),

    /// Link or master level failure
    #[error("Fieldbus communication error: {0}")]
    Communication(String),

    /// No fieldbus driver registered under the given name
    #[error("Fieldbus driver not found: {0}")]
    DriverNotFound(String),
}

/// Errors reported by the drive controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriveError {
    /// The register access itself failed
    #[error(transparent)]
    Transport(#[from] FieldbusError),

    /// The slave did not confirm safe-operational after a command
    #[error("Slave {slave} not safe after {command} (state {observed})")]
    SlaveUnsafe {
        /// Slave address
        slave: u16,
        /// Command that was issued
        command: &'static str,
        /// State observed when the poll ended
        observed: SlaveState,
    },

    /// Digital input number out of range
    #[error("Invalid digital input {input}")]
    InvalidInput {
        /// Rejected input number
        input: u32,
    },
}

/// Result type for drive operations
pub type DriveResult<T> = Result<T, DriveError>;
