//! Object dictionary addresses used by the drive controller.
//!
//! Indices follow the CiA 402 drive profile; the digital input configuration
//! object is manufacturer specific.

use crate::fieldbus::types::ObjectAddress;

/// Controlword (UNSIGNED16).
pub const CONTROLWORD: ObjectAddress = ObjectAddress::new(0x6040, 0);

/// Modes of operation (INTEGER8).
pub const MODES_OF_OPERATION: ObjectAddress = ObjectAddress::new(0x6060, 0);

/// Position actual value (INTEGER32).
pub const POSITION_ACTUAL: ObjectAddress = ObjectAddress::new(0x6064, 0);

/// Target position (INTEGER32).
pub const TARGET_POSITION: ObjectAddress = ObjectAddress::new(0x607A, 0);

/// Profile velocity (UNSIGNED32).
pub const PROFILE_VELOCITY: ObjectAddress = ObjectAddress::new(0x6081, 0);

/// Target velocity (INTEGER32).
pub const TARGET_VELOCITY: ObjectAddress = ObjectAddress::new(0x60FF, 0);

/// Digital inputs (UNSIGNED32).
pub const DIGITAL_INPUTS: ObjectAddress = ObjectAddress::new(0x60FD, 0);

/// Index of the digital input configuration record; sub-index = input number.
pub const DIGITAL_INPUT_CONFIG_INDEX: u16 = 0x3142;

/// Address of the configuration entry for general purpose input `input`.
pub const fn digital_input_config(input: u8) -> ObjectAddress {
    ObjectAddress::new(DIGITAL_INPUT_CONFIG_INDEX, input)
}
