//! CiA 402 drive controller.
//!
//! Every state-changing command is a guarded write: the register write is
//! followed by a bounded wait for the slave to report safe-operational. An
//! unconfirmed command is reported as `DriveError::SlaveUnsafe`; it is never
//! retried or rolled back.
//!
//! # Timing
//!
//! | Operation | Fixed delay |
//! |-----------|-------------|
//! | `start_and_enable()` | `ENABLE_SETTLE_DELAY` between shutdown and switch-on |
//! | `halt_and_shutdown()` | `HALT_SETTLE_DELAY` between halt and shutdown |
//! | `target_position()` failure | `FAULT_RECOVERY_DELAY` before the fault reset |

use newton_common::consts::{
    DEFAULT_POSITION_TOLERANCE, DEFAULT_STATE_CHECK_TIMEOUT_US, DIGITAL_INPUT_BIT_OFFSET,
    ENABLE_SETTLE_DELAY, FAULT_RECOVERY_DELAY, HALT_SETTLE_DELAY, SAFETY_CHECK_RETRIES,
};
use newton_common::fieldbus::objects::{
    CONTROLWORD, DIGITAL_INPUTS, MODES_OF_OPERATION, POSITION_ACTUAL, PROFILE_VELOCITY,
    TARGET_POSITION, TARGET_VELOCITY, digital_input_config,
};
use newton_common::fieldbus::{
    AxisConfig, CommandEdit, ControlWord, DriveError, DriveResult, FieldbusError,
    FieldbusTransport, ObjectAddress, OperationMode, SlaveState, within_window,
};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Drives one motor axis through the CiA 402 command sequence.
///
/// Blocking and single-threaded: one caller at a time. Axes on a shared bus
/// each own a clone of an `Arc<Mutex<T>>` transport.
pub struct DriveController<T: FieldbusTransport> {
    transport: T,
    slave: u16,
    target: i32,
    position_tolerance: i32,
    state_check_timeout: Duration,
}

impl<T: FieldbusTransport> DriveController<T> {
    /// Controller for `slave` with default tolerance and state poll timeout.
    pub fn new(transport: T, slave: u16) -> Self {
        Self {
            transport,
            slave,
            target: 0,
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
            state_check_timeout: Duration::from_micros(DEFAULT_STATE_CHECK_TIMEOUT_US),
        }
    }

    /// Controller configured from an `[[axes]]` entry.
    pub fn from_config(transport: T, config: &AxisConfig) -> Self {
        Self {
            position_tolerance: config.position_tolerance,
            state_check_timeout: config.state_check_timeout(),
            ..Self::new(transport, config.slave)
        }
    }

    /// Bus position of the drive.
    pub fn slave(&self) -> u16 {
        self.slave
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Last target passed to `set_target_position`.
    pub fn commanded_target(&self) -> i32 {
        self.target
    }

    /// Arrival window half-width in encoder counts.
    pub fn position_tolerance(&self) -> i32 {
        self.position_tolerance
    }

    /// Replace the arrival window half-width.
    pub fn set_position_tolerance(&mut self, tolerance: i32) {
        self.position_tolerance = tolerance;
    }

    /// Total time a safety confirmation may wait.
    pub fn safety_check_timeout(&self) -> Duration {
        self.state_check_timeout * SAFETY_CHECK_RETRIES
    }

    // ─── Safety ─────────────────────────────────────────────────────

    /// Whether the slave confirms safe-operational within the safety timeout.
    pub fn is_safe(&mut self) -> bool {
        self.observe_state() == SlaveState::SafeOp
    }

    fn observe_state(&mut self) -> SlaveState {
        let timeout = self.safety_check_timeout();
        self.transport
            .poll_slave_state(self.slave, SlaveState::SafeOp, timeout)
    }

    fn confirm_safe(&mut self, command: &'static str) -> DriveResult<()> {
        let observed = self.observe_state();
        if observed != SlaveState::SafeOp {
            error!(
                "Slave {} not safe after {} (state {})",
                self.slave, command, observed
            );
            return Err(DriveError::SlaveUnsafe {
                slave: self.slave,
                command,
                observed,
            });
        }
        Ok(())
    }

    fn guarded_write(
        &mut self,
        command: &'static str,
        address: ObjectAddress,
        data: &[u8],
    ) -> DriveResult<()> {
        debug!("Slave {}: {} -> {}", self.slave, command, address);
        self.transport.sdo_write(self.slave, address, data)?;
        self.confirm_safe(command)
    }

    fn guarded_controlword(&mut self, command: &'static str, word: ControlWord) -> DriveResult<()> {
        self.guarded_write(command, CONTROLWORD, &word.bits().to_le_bytes())
    }

    fn guarded_edit(&mut self, edit: CommandEdit) -> DriveResult<()> {
        let current = self.command_word()?;
        let next = edit.apply(current);
        debug!(
            "Slave {}: {} 0x{:04X} -> 0x{:04X}",
            self.slave,
            edit.name(),
            current.bits(),
            next.bits()
        );
        self.guarded_controlword(edit.name(), next)
    }

    // ─── Register access ────────────────────────────────────────────

    fn read_exact<const N: usize>(&mut self, address: ObjectAddress) -> Result<[u8; N], FieldbusError> {
        let mut buf = [0u8; N];
        let read = self.transport.sdo_read(self.slave, address, &mut buf)?;
        if read != N {
            return Err(FieldbusError::SizeMismatch {
                address,
                expected: N,
                actual: read,
            });
        }
        Ok(buf)
    }

    fn read_i32(&mut self, address: ObjectAddress) -> Result<i32, FieldbusError> {
        self.read_exact::<4>(address).map(i32::from_le_bytes)
    }

    // ─── Power state machine ────────────────────────────────────────

    /// Bring the drive to "Switched on": shutdown, settle, switch on.
    ///
    /// Stops at the first command the slave does not confirm.
    pub fn start_and_enable(&mut self) -> DriveResult<()> {
        info!("Slave {}: enabling", self.slave);
        self.guarded_controlword("shutdown", ControlWord::SHUTDOWN)?;
        thread::sleep(ENABLE_SETTLE_DELAY);
        self.guarded_controlword("switch on", ControlWord::SWITCH_ON_COMMAND)
    }

    /// Drop the new-setpoint bit so the next position start is an edge.
    pub fn new_position_toggle(&mut self) -> DriveResult<()> {
        self.guarded_controlword("new position toggle", ControlWord::SWITCH_ON_COMMAND)
    }

    /// Enable operation with an immediate new setpoint.
    pub fn start_position_mode(&mut self) -> DriveResult<()> {
        self.guarded_controlword("start position", ControlWord::START_POSITION)
    }

    /// Enable operation in profile velocity mode.
    pub fn start_velocity_mode(&mut self) -> DriveResult<()> {
        self.guarded_controlword("start velocity", ControlWord::START_VELOCITY)
    }

    /// Set the halt bit of the current controlword.
    pub fn halt(&mut self) -> DriveResult<()> {
        self.guarded_edit(CommandEdit::Halt)
    }

    /// Clear the halt bit of the current controlword.
    pub fn resume(&mut self) -> DriveResult<()> {
        self.guarded_edit(CommandEdit::Continue)
    }

    /// Clear switch-on and enable-operation of the current controlword.
    pub fn shutdown(&mut self) -> DriveResult<()> {
        self.guarded_edit(CommandEdit::Stop)
    }

    /// Halt, let the axis decelerate, then shut down.
    pub fn halt_and_shutdown(&mut self) -> DriveResult<()> {
        info!("Slave {}: halt and shutdown", self.slave);
        self.halt()?;
        thread::sleep(HALT_SETTLE_DELAY);
        self.shutdown()
    }

    /// Set the fault reset bit of the current controlword.
    ///
    /// Never fails and never waits for a safety confirmation; transport
    /// errors are logged.
    pub fn reset_fault(&mut self) {
        let current = match self.command_word() {
            Ok(word) => word,
            Err(e) => {
                warn!("Slave {}: fault reset could not read controlword: {}", self.slave, e);
                return;
            }
        };
        let next = CommandEdit::FaultReset.apply(current);
        if let Err(e) = self
            .transport
            .sdo_write(self.slave, CONTROLWORD, &next.bits().to_le_bytes())
        {
            warn!("Slave {}: fault reset write failed: {}", self.slave, e);
            return;
        }
        info!("Slave {}: fault reset issued", self.slave);
    }

    // ─── Setpoints ──────────────────────────────────────────────────

    /// Select the mode of operation.
    pub fn set_mode(&mut self, mode: OperationMode) -> DriveResult<()> {
        info!("Slave {}: mode {:?}", self.slave, mode);
        self.guarded_write("set mode", MODES_OF_OPERATION, &mode.code().to_le_bytes())
    }

    /// Store and write the target position.
    pub fn set_target_position(&mut self, position: i32) -> DriveResult<()> {
        self.target = position;
        self.guarded_write("set target position", TARGET_POSITION, &position.to_le_bytes())
    }

    /// Write the target velocity (profile velocity mode).
    pub fn set_target_velocity(&mut self, velocity: i32) -> DriveResult<()> {
        self.guarded_write("set target velocity", TARGET_VELOCITY, &velocity.to_le_bytes())
    }

    /// Write the profile velocity used by position moves.
    pub fn set_profile_velocity(&mut self, velocity: u32) -> DriveResult<()> {
        self.guarded_write(
            "set profile velocity",
            PROFILE_VELOCITY,
            &velocity.to_le_bytes(),
        )
    }

    // ─── Readback ───────────────────────────────────────────────────

    /// Current controlword.
    pub fn command_word(&mut self) -> DriveResult<ControlWord> {
        let raw = self.read_exact::<2>(CONTROLWORD).map(u16::from_le_bytes)?;
        Ok(ControlWord::from_raw(raw))
    }

    /// Position actual value.
    pub fn current_position(&mut self) -> DriveResult<i32> {
        Ok(self.read_i32(POSITION_ACTUAL)?)
    }

    /// Target position held by the drive.
    ///
    /// On a failed read the drive is given `FAULT_RECOVERY_DELAY`, a fault
    /// reset is issued and the read error is returned.
    pub fn target_position(&mut self) -> DriveResult<i32> {
        match self.read_i32(TARGET_POSITION) {
            Ok(position) => Ok(position),
            Err(e) => {
                warn!("Slave {}: target position read failed: {}", self.slave, e);
                thread::sleep(FAULT_RECOVERY_DELAY);
                self.reset_fault();
                Err(e.into())
            }
        }
    }

    /// Whether the actual position is strictly inside the arrival window
    /// around the commanded target.
    pub fn is_operation_complete(&mut self) -> DriveResult<bool> {
        let actual = self.current_position()?;
        Ok(within_window(actual, self.target, self.position_tolerance))
    }

    // ─── Digital inputs ─────────────────────────────────────────────

    /// State of general purpose input `input`.
    ///
    /// # Errors
    /// `DriveError::InvalidInput` if the input's bit lies outside the
    /// 32-bit digital input word.
    pub fn read_digital_input(&mut self, input: u32) -> DriveResult<bool> {
        let bit = input
            .checked_add(DIGITAL_INPUT_BIT_OFFSET)
            .filter(|bit| *bit < u32::BITS)
            .ok_or(DriveError::InvalidInput { input })?;
        let word = self.read_exact::<4>(DIGITAL_INPUTS).map(u32::from_le_bytes)?;
        Ok(word & (1 << bit) != 0)
    }

    /// Assign `function` to general purpose input `input` (numbered from 1).
    pub fn configure_digital_input(&mut self, input: u8, function: u8) -> DriveResult<()> {
        if input < 1 {
            return Err(DriveError::InvalidInput {
                input: u32::from(input),
            });
        }
        debug!("Slave {}: input {} function {}", self.slave, input, function);
        self.transport
            .sdo_write(self.slave, digital_input_config(input), &[function])?;
        Ok(())
    }

    /// Function assigned to general purpose input `input` (numbered from 1).
    pub fn read_digital_input_config(&mut self, input: u8) -> DriveResult<u8> {
        if input < 1 {
            return Err(DriveError::InvalidInput {
                input: u32::from(input),
            });
        }
        let [function] = self.read_exact::<1>(digital_input_config(input))?;
        Ok(function)
    }

    // ─── Sequences ──────────────────────────────────────────────────

    /// Reset faults, select profile position mode, enable, and hold at 0.
    pub fn enable_position_mode(&mut self) -> DriveResult<()> {
        self.reset_fault();
        self.set_mode(OperationMode::ProfilePosition)?;
        self.start_and_enable()?;
        self.set_target_position(0)?;
        self.start_position_mode()
    }

    /// Start an absolute move to `position`.
    pub fn move_to(&mut self, position: i32) -> DriveResult<()> {
        self.new_position_toggle()?;
        self.set_target_position(position)?;
        self.start_position_mode()
    }

    /// Change the profile velocity of a move in progress.
    ///
    /// The axis is halted, the velocity written, and the move restarted
    /// towards the drive's target (or the last commanded one if the target
    /// cannot be read).
    pub fn change_profile_velocity(&mut self, velocity: u32) -> DriveResult<()> {
        let target = match self.target_position() {
            Ok(target) => target,
            Err(e) => {
                warn!(
                    "Slave {}: using commanded target {} ({})",
                    self.slave, self.target, e
                );
                self.target
            }
        };
        self.halt()?;
        self.set_profile_velocity(velocity)?;
        self.move_to(target)
    }

    /// Poll `is_operation_complete` until it holds or `timeout` elapses.
    pub fn wait_for_arrival(&mut self, timeout: Duration, poll_interval: Duration) -> DriveResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_operation_complete()? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(poll_interval);
        }
    }
}
