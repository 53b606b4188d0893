//! Simulated fieldbus with CiA 402 slaves.
//!
//! Each slave holds a small object dictionary. Writing a controlword with
//! enable-operation and new-setpoint set moves the actual position to the
//! target immediately. Slaves sit in SAFE-OP unless a fault is injected.

use newton_common::fieldbus::objects::{
    CONTROLWORD, DIGITAL_INPUTS, MODES_OF_OPERATION, POSITION_ACTUAL, PROFILE_VELOCITY,
    TARGET_POSITION, TARGET_VELOCITY, digital_input_config,
};
use newton_common::fieldbus::{
    ControlWord, FieldbusError, FieldbusTransport, ObjectAddress, SlaveState,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, trace};

/// CANopen abort code: object does not exist in the dictionary.
pub const ABORT_OBJECT_MISSING: u32 = 0x0602_0000;
/// CANopen abort code: general error.
pub const ABORT_GENERAL: u32 = 0x0800_0000;

/// Number of general purpose inputs with a configuration entry.
const CONFIGURABLE_INPUTS: u8 = 8;

/// One SDO write seen by the simulated bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdoWrite {
    /// Target slave
    pub slave: u16,
    /// Object written
    pub address: ObjectAddress,
    /// Payload
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct SimulatedSlave {
    objects: HashMap<ObjectAddress, Vec<u8>>,
    state: SlaveState,
    unsafe_on: Option<(ObjectAddress, Vec<u8>)>,
    failing_reads: HashSet<ObjectAddress>,
    failing_writes: HashSet<ObjectAddress>,
}

impl SimulatedSlave {
    fn new() -> Self {
        let mut objects = HashMap::new();
        objects.insert(CONTROLWORD, 0u16.to_le_bytes().to_vec());
        objects.insert(MODES_OF_OPERATION, 0i8.to_le_bytes().to_vec());
        objects.insert(POSITION_ACTUAL, 0i32.to_le_bytes().to_vec());
        objects.insert(TARGET_POSITION, 0i32.to_le_bytes().to_vec());
        objects.insert(PROFILE_VELOCITY, 0u32.to_le_bytes().to_vec());
        objects.insert(TARGET_VELOCITY, 0i32.to_le_bytes().to_vec());
        objects.insert(DIGITAL_INPUTS, 0u32.to_le_bytes().to_vec());
        for input in 1..=CONFIGURABLE_INPUTS {
            objects.insert(digital_input_config(input), vec![0]);
        }
        Self {
            objects,
            state: SlaveState::SafeOp,
            unsafe_on: None,
            failing_reads: HashSet::new(),
            failing_writes: HashSet::new(),
        }
    }

    fn apply_controlword(&mut self, data: &[u8]) {
        let Ok(raw) = <[u8; 2]>::try_from(data) else {
            return;
        };
        let word = ControlWord::from_raw(u16::from_le_bytes(raw));
        let moving = word.contains(ControlWord::ENABLE_OPERATION | ControlWord::NEW_SETPOINT)
            && !word.contains(ControlWord::HALT);
        if moving {
            if let Some(target) = self.objects.get(&TARGET_POSITION).cloned() {
                self.objects.insert(POSITION_ACTUAL, target);
            }
        }
    }
}

/// In-memory fieldbus for tests and the simulated station.
#[derive(Debug, Default)]
pub struct SimulatedFieldbus {
    slaves: BTreeMap<u16, SimulatedSlave>,
    writes: Vec<SdoWrite>,
    polls: u64,
}

impl SimulatedFieldbus {
    /// Bus without slaves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with one freshly powered slave at each given address.
    pub fn with_slaves(slaves: &[u16]) -> Self {
        let mut bus = Self::new();
        for &slave in slaves {
            bus.add_slave(slave);
        }
        bus
    }

    /// Attach a slave in SAFE-OP with a zeroed object dictionary.
    pub fn add_slave(&mut self, slave: u16) {
        self.slaves.insert(slave, SimulatedSlave::new());
    }

    /// Force the application layer state of `slave`.
    pub fn set_state(&mut self, slave: u16, state: SlaveState) {
        if let Some(s) = self.slaves.get_mut(&slave) {
            s.state = state;
        }
    }

    /// Drop `slave` to PRE-OP after it receives `data` at `address`.
    pub fn fail_safety_after(&mut self, slave: u16, address: ObjectAddress, data: &[u8]) {
        if let Some(s) = self.slaves.get_mut(&slave) {
            s.unsafe_on = Some((address, data.to_vec()));
        }
    }

    /// Make reads of `address` on `slave` abort.
    pub fn fail_reads(&mut self, slave: u16, address: ObjectAddress) {
        if let Some(s) = self.slaves.get_mut(&slave) {
            s.failing_reads.insert(address);
        }
    }

    /// Make writes of `address` on `slave` abort.
    pub fn fail_writes(&mut self, slave: u16, address: ObjectAddress) {
        if let Some(s) = self.slaves.get_mut(&slave) {
            s.failing_writes.insert(address);
        }
    }

    /// Stop injecting read and write failures on `slave`.
    pub fn clear_failures(&mut self, slave: u16) {
        if let Some(s) = self.slaves.get_mut(&slave) {
            s.failing_reads.clear();
            s.failing_writes.clear();
        }
    }

    /// Store `data` at `address` without logging a write.
    pub fn set_object(&mut self, slave: u16, address: ObjectAddress, data: &[u8]) {
        if let Some(s) = self.slaves.get_mut(&slave) {
            s.objects.insert(address, data.to_vec());
        }
    }

    /// Raw contents of `address` on `slave`.
    pub fn object(&self, slave: u16, address: ObjectAddress) -> Option<&[u8]> {
        self.slaves
            .get(&slave)
            .and_then(|s| s.objects.get(&address))
            .map(Vec::as_slice)
    }

    /// Every successful SDO write, in order.
    pub fn writes(&self) -> &[SdoWrite] {
        &self.writes
    }

    /// Successful controlword writes to `slave`, decoded.
    pub fn controlword_writes(&self, slave: u16) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|w| w.slave == slave && w.address == CONTROLWORD)
            .filter_map(|w| <[u8; 2]>::try_from(w.data.as_slice()).ok())
            .map(u16::from_le_bytes)
            .collect()
    }

    /// Number of state polls served.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl FieldbusTransport for SimulatedFieldbus {
    fn sdo_write(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        data: &[u8],
    ) -> Result<(), FieldbusError> {
        let s = self
            .slaves
            .get_mut(&slave)
            .ok_or(FieldbusError::SlaveNotFound(slave))?;
        if s.failing_writes.contains(&address) {
            return Err(FieldbusError::SdoAbort {
                address,
                code: ABORT_GENERAL,
            });
        }
        if let Some(existing) = s.objects.get(&address) {
            if existing.len() != data.len() {
                return Err(FieldbusError::SizeMismatch {
                    address,
                    expected: existing.len(),
                    actual: data.len(),
                });
            }
        }

        trace!("Sim slave {}: write {} {:02X?}", slave, address, data);
        s.objects.insert(address, data.to_vec());
        if address == CONTROLWORD {
            s.apply_controlword(data);
        }
        if s
            .unsafe_on
            .as_ref()
            .is_some_and(|(a, d)| *a == address && d.as_slice() == data)
        {
            debug!("Sim slave {}: dropping to PRE-OP after {}", slave, address);
            s.state = SlaveState::PreOp;
        }

        self.writes.push(SdoWrite {
            slave,
            address,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn sdo_read(
        &mut self,
        slave: u16,
        address: ObjectAddress,
        buf: &mut [u8],
    ) -> Result<usize, FieldbusError> {
        let s = self
            .slaves
            .get(&slave)
            .ok_or(FieldbusError::SlaveNotFound(slave))?;
        if s.failing_reads.contains(&address) {
            return Err(FieldbusError::SdoAbort {
                address,
                code: ABORT_GENERAL,
            });
        }
        let data = s.objects.get(&address).ok_or(FieldbusError::SdoAbort {
            address,
            code: ABORT_OBJECT_MISSING,
        })?;
        if data.len() > buf.len() {
            return Err(FieldbusError::SizeMismatch {
                address,
                expected: buf.len(),
                actual: data.len(),
            });
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn poll_slave_state(
        &mut self,
        slave: u16,
        _desired: SlaveState,
        _timeout: Duration,
    ) -> SlaveState {
        self.polls += 1;
        self.slaves
            .get(&slave)
            .map_or(SlaveState::None, |s| s.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_slave_rejected() {
        let mut bus = SimulatedFieldbus::new();
        assert_eq!(
            bus.sdo_write(3, CONTROLWORD, &[0, 0]),
            Err(FieldbusError::SlaveNotFound(3))
        );
        assert_eq!(
            bus.poll_slave_state(3, SlaveState::SafeOp, Duration::ZERO),
            SlaveState::None
        );
    }

    #[test]
    fn write_with_wrong_width_rejected() {
        let mut bus = SimulatedFieldbus::with_slaves(&[1]);
        assert!(matches!(
            bus.sdo_write(1, TARGET_POSITION, &[1, 2]),
            Err(FieldbusError::SizeMismatch {
                expected: 4,
                actual: 2,
                ..
            })
        ));
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn start_position_moves_to_target() {
        let mut bus = SimulatedFieldbus::with_slaves(&[1]);
        bus.sdo_write(1, TARGET_POSITION, &500i32.to_le_bytes()).unwrap();
        assert_eq!(bus.object(1, POSITION_ACTUAL), Some(&0i32.to_le_bytes()[..]));
        bus.sdo_write(1, CONTROLWORD, &0x003Fu16.to_le_bytes()).unwrap();
        assert_eq!(bus.object(1, POSITION_ACTUAL), Some(&500i32.to_le_bytes()[..]));
    }

    #[test]
    fn safety_trigger_matches_address_and_value() {
        let mut bus = SimulatedFieldbus::with_slaves(&[1]);
        bus.fail_safety_after(1, CONTROLWORD, &0x0007u16.to_le_bytes());
        bus.sdo_write(1, CONTROLWORD, &0x0006u16.to_le_bytes()).unwrap();
        assert_eq!(
            bus.poll_slave_state(1, SlaveState::SafeOp, Duration::ZERO),
            SlaveState::SafeOp
        );
        bus.sdo_write(1, CONTROLWORD, &0x0007u16.to_le_bytes()).unwrap();
        assert_eq!(
            bus.poll_slave_state(1, SlaveState::SafeOp, Duration::ZERO),
            SlaveState::PreOp
        );
        assert_eq!(bus.controlword_writes(1), vec![0x0006, 0x0007]);
    }

    #[test]
    fn injected_read_failure_aborts() {
        let mut bus = SimulatedFieldbus::with_slaves(&[1]);
        bus.fail_reads(1, TARGET_POSITION);
        let mut buf = [0u8; 4];
        assert!(matches!(
            bus.sdo_read(1, TARGET_POSITION, &mut buf),
            Err(FieldbusError::SdoAbort { .. })
        ));
        bus.clear_failures(1);
        assert_eq!(bus.sdo_read(1, TARGET_POSITION, &mut buf), Ok(4));
    }
}
