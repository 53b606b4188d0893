//! Fieldbus transport trait.
//!
//! The transport is the register-level collaborator of the drive controller:
//! SDO reads and writes addressed by slave position and object address, plus
//! a bounded wait for a slave to reach an application layer state. Payloads
//! are little-endian byte slices; typing happens in the drive controller.

use crate::fieldbus::error::FieldbusError;
use crate::fieldbus::types::{ObjectAddress, SlaveState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Register-level access to fieldbus slaves.
///
/// # Timing Contracts
///
/// | Operation | Max Duration | Notes |
/// |-----------|--------------|-------|
/// | `sdo_write()` / `sdo_read()` | transport SDO timeout | Blocking round trip |
/// | `poll_slave_state()` | `timeout` | Returns the last state observed |
pub trait FieldbusTransport: Send {
    /// Write `data` to the object at `address` of `slave`.
    fn sdo_write(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        data: &[u8],
    ) -> Result<(), FieldbusError>;

    /// Read the object at `address` of `slave` into `buf`.
    ///
    /// Returns the number of bytes the slave delivered.
    fn sdo_read(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        buf: &mut [u8],
    ) -> Result<usize, FieldbusError>;

    /// Wait up to `timeout` for `slave` to reach `desired`.
    ///
    /// Returns the state observed when the wait ended; callers compare it
    /// against `desired`.
    fn poll_slave_state(&mut self, slave: u16, desired: SlaveState, timeout: Duration)
    -> SlaveState;
}

impl<T: FieldbusTransport + ?Sized> FieldbusTransport for Box<T> {
    fn sdo_write(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        data: &[u8],
    ) -> Result<(), FieldbusError> {
        (**self).sdo_write(slave, address, data)
    }

    fn sdo_read(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        buf: &mut [u8],
    ) -> Result<usize, FieldbusError> {
        (**self).sdo_read(slave, address, buf)
    }

    fn poll_slave_state(
        &mut self,
        slave: u16,
        desired: SlaveState,
        timeout: Duration,
    ) -> SlaveState {
        (**self).poll_slave_state(slave, desired, timeout)
    }
}

/// A bus shared by several drive controllers.
///
/// Each call holds the bus lock for one round trip only.
impl<T: FieldbusTransport + ?Sized> FieldbusTransport for Arc<Mutex<T>> {
    fn sdo_write(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        data: &[u8],
    ) -> Result<(), FieldbusError> {
        self.lock().sdo_write(slave, address, data)
    }

    fn sdo_read(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        buf: &mut [u8],
    ) -> Result<usize, FieldbusError> {
        self.lock().sdo_read(slave, address, buf)
    }

    fn poll_slave_state(
        &mut self,
        slave: u16,
        desired: SlaveState,
        timeout: Duration,
    ) -> SlaveState {
        self.lock().poll_slave_state(slave, desired, timeout)
    }
}
