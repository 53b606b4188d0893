//! CiA 402 controlword bits and command edits.
//!
//! Whole-word commands (`SHUTDOWN`, `SWITCH_ON_COMMAND`, ...) are written as
//! is. Halt, continue, fault reset and stop are read-modify-write edits of the
//! current word, expressed as `CommandEdit` so they can be checked without a
//! transport.

use bitflags::bitflags;

bitflags! {
    /// Controlword (object 0x6040).
    ///
    /// Bits 9..=15 are reserved or manufacturer specific; they are carried
    /// through read-modify-write edits untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlWord: u16 {
        /// Switch on.
        const SWITCH_ON              = 0x0001;
        /// Enable voltage.
        const ENABLE_VOLTAGE         = 0x0002;
        /// Quick stop (active low).
        const QUICK_STOP             = 0x0004;
        /// Enable operation.
        const ENABLE_OPERATION       = 0x0008;
        /// New setpoint (profile position mode).
        const NEW_SETPOINT           = 0x0010;
        /// Change set immediately (profile position mode).
        const CHANGE_SET_IMMEDIATELY = 0x0020;
        /// Relative positioning (profile position mode).
        const ABSOLUTE_RELATIVE      = 0x0040;
        /// Fault reset (rising edge).
        const FAULT_RESET            = 0x0080;
        /// Halt.
        const HALT                   = 0x0100;
    }
}

impl ControlWord {
    /// Shutdown command: transition to "Ready to switch on".
    pub const SHUTDOWN: Self = Self::from_bits_truncate(
        Self::ENABLE_VOLTAGE.bits() | Self::QUICK_STOP.bits(),
    );

    /// Switch-on command: transition to "Switched on".
    pub const SWITCH_ON_COMMAND: Self = Self::from_bits_truncate(
        Self::SHUTDOWN.bits() | Self::SWITCH_ON.bits(),
    );

    /// Enable operation; starts motion in profile velocity mode.
    pub const START_VELOCITY: Self = Self::from_bits_truncate(
        Self::SWITCH_ON_COMMAND.bits() | Self::ENABLE_OPERATION.bits(),
    );

    /// Enable operation with an immediate new setpoint (move now).
    pub const START_POSITION: Self = Self::from_bits_truncate(
        Self::START_VELOCITY.bits()
            | Self::NEW_SETPOINT.bits()
            | Self::CHANGE_SET_IMMEDIATELY.bits(),
    );

    /// Decode a raw controlword, keeping reserved bits.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::from_bits_retain(raw)
    }
}

impl Default for ControlWord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read-modify-write edits applied to the current controlword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandEdit {
    /// Set the halt bit.
    Halt,
    /// Clear the halt bit.
    Continue,
    /// Set the fault reset bit.
    FaultReset,
    /// Clear switch-on and enable-operation (drop to "Ready to switch on").
    Stop,
}

impl CommandEdit {
    /// Bits touched by this edit.
    pub const fn mask(self) -> ControlWord {
        match self {
            Self::Halt | Self::Continue => ControlWord::HALT,
            Self::FaultReset => ControlWord::FAULT_RESET,
            Self::Stop => ControlWord::from_bits_truncate(
                ControlWord::SWITCH_ON.bits() | ControlWord::ENABLE_OPERATION.bits(),
            ),
        }
    }

    /// Whether the edit sets (true) or clears (false) its mask.
    pub const fn sets(self) -> bool {
        matches!(self, Self::Halt | Self::FaultReset)
    }

    /// Apply the edit to `word`; bits outside the mask are preserved.
    pub const fn apply(self, word: ControlWord) -> ControlWord {
        let bits = if self.sets() {
            word.bits() | self.mask().bits()
        } else {
            word.bits() & !self.mask().bits()
        };
        ControlWord::from_bits_retain(bits)
    }

    /// Short name used in log and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Continue => "continue",
            Self::FaultReset => "fault reset",
            Self::Stop => "stop",
        }
    }
}
