/// In-memory Modbus slave image
///
/// [`ModbusRegisterBank`] stores coils, discrete inputs, holding registers and
/// input registers behind shared locks. [`BankClient`] serves a bank through
/// the [`ModbusClient`] trait, so typed reads, writes and poll loops can run
/// in-process: the demo binary and the test suites use it in place of a
/// network transport.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::client::{ClientStats, ModbusClient};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ModbusFunction, RegisterKind, SlaveId};

/// Modbus register bank for storing coils, discrete inputs, holding registers, and input registers
///
/// Cloning is cheap and every clone shares the same storage, so one clone can
/// simulate a changing process while another is served to a client.
/// Unset addresses read as `false` / `0`.
#[derive(Debug, Clone, Default)]
pub struct ModbusRegisterBank {
    coils: Arc<RwLock<HashMap<u16, bool>>>,
    discrete_inputs: Arc<RwLock<HashMap<u16, bool>>>,
    holding_registers: Arc<RwLock<HashMap<u16, u16>>>,
    input_registers: Arc<RwLock<HashMap<u16, u16>>>,
}

impl ModbusRegisterBank {
    /// Create a new register bank with empty data
    pub fn new() -> Self {
        Self::default()
    }

    fn bit_table(&self, kind: RegisterKind) -> ModbusResult<&Arc<RwLock<HashMap<u16, bool>>>> {
        match kind {
            RegisterKind::Coil => Ok(&self.coils),
            RegisterKind::DiscreteInput => Ok(&self.discrete_inputs),
            _ => Err(ModbusError::internal(format!("{} is not a bit table", kind))),
        }
    }

    fn word_table(&self, kind: RegisterKind) -> ModbusResult<&Arc<RwLock<HashMap<u16, u16>>>> {
        match kind {
            RegisterKind::HoldingRegister => Ok(&self.holding_registers),
            RegisterKind::InputRegister => Ok(&self.input_registers),
            _ => Err(ModbusError::internal(format!("{} is not a register table", kind))),
        }
    }

    /// Read `quantity` bits from a coil or discrete input table
    pub fn read_bits(&self, kind: RegisterKind, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        let table = self.bit_table(kind)?
            .read()
            .map_err(|_| ModbusError::internal(format!("Failed to lock {}", kind)))?;
        Ok((0..quantity)
            .map(|i| table.get(&address.wrapping_add(i)).copied().unwrap_or(false))
            .collect())
    }

    /// Read `quantity` words from a holding or input register table
    pub fn read_words(&self, kind: RegisterKind, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        let table = self.word_table(kind)?
            .read()
            .map_err(|_| ModbusError::internal(format!("Failed to lock {}", kind)))?;
        Ok((0..quantity)
            .map(|i| table.get(&address.wrapping_add(i)).copied().unwrap_or(0))
            .collect())
    }

    /// Store bits into any bit table, read-only ones included
    pub fn set_bits(&self, kind: RegisterKind, address: u16, values: &[bool]) -> ModbusResult<()> {
        let mut table = self.bit_table(kind)?
            .write()
            .map_err(|_| ModbusError::internal(format!("Failed to lock {}", kind)))?;
        for (i, &value) in values.iter().enumerate() {
            table.insert(address.wrapping_add(i as u16), value);
        }
        Ok(())
    }

    /// Store words into any register table, read-only ones included
    pub fn set_words(&self, kind: RegisterKind, address: u16, values: &[u16]) -> ModbusResult<()> {
        let mut table = self.word_table(kind)?
            .write()
            .map_err(|_| ModbusError::internal(format!("Failed to lock {}", kind)))?;
        for (i, &value) in values.iter().enumerate() {
            table.insert(address.wrapping_add(i as u16), value);
        }
        Ok(())
    }

    /// Read coils starting at address (function code 0x01)
    pub fn read_01(&self, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_bits(RegisterKind::Coil, address, quantity)
    }

    /// Read discrete inputs starting at address (function code 0x02)
    pub fn read_02(&self, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_bits(RegisterKind::DiscreteInput, address, quantity)
    }

    /// Read holding registers starting at address (function code 0x03)
    pub fn read_03(&self, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.read_words(RegisterKind::HoldingRegister, address, quantity)
    }

    /// Read input registers starting at address (function code 0x04)
    pub fn read_04(&self, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.read_words(RegisterKind::InputRegister, address, quantity)
    }

    /// Write single coil (function code 0x05)
    pub fn write_05(&self, address: u16, value: bool) -> ModbusResult<()> {
        self.set_bits(RegisterKind::Coil, address, &[value])
    }

    /// Write single register (function code 0x06)
    pub fn write_06(&self, address: u16, value: u16) -> ModbusResult<()> {
        self.set_words(RegisterKind::HoldingRegister, address, &[value])
    }

    /// Write multiple coils (function code 0x0F)
    pub fn write_0f(&self, address: u16, values: &[bool]) -> ModbusResult<()> {
        self.set_bits(RegisterKind::Coil, address, values)
    }

    /// Write multiple registers (function code 0x10)
    pub fn write_10(&self, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.set_words(RegisterKind::HoldingRegister, address, values)
    }

    /// Get register bank statistics
    pub fn get_stats(&self) -> ModbusResult<RegisterBankStats> {
        let len = |kind: RegisterKind| -> ModbusResult<usize> {
            let lock_error = || ModbusError::internal(format!("Failed to lock {}", kind));
            if kind.is_bit() {
                Ok(self.bit_table(kind)?.read().map_err(|_| lock_error())?.len())
            } else {
                Ok(self.word_table(kind)?.read().map_err(|_| lock_error())?.len())
            }
        };

        Ok(RegisterBankStats {
            coils_count: len(RegisterKind::Coil)?,
            discrete_inputs_count: len(RegisterKind::DiscreteInput)?,
            holding_registers_count: len(RegisterKind::HoldingRegister)?,
            input_registers_count: len(RegisterKind::InputRegister)?,
        })
    }
}

/// Register bank statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBankStats {
    pub coils_count: usize,
    pub discrete_inputs_count: usize,
    pub holding_registers_count: usize,
    pub input_registers_count: usize,
}

/// Calls a [`BankClient`] keeps; older records are dropped in halves
pub const MAX_CALL_RECORDS: usize = 1024;

/// One primitive operation received by a [`BankClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub function: ModbusFunction,
    pub slave_id: SlaveId,
    pub address: u16,
    pub quantity: u16,
}

/// In-process [`ModbusClient`] backed by a [`ModbusRegisterBank`]
///
/// Answers for a single unit id; any other id fails with
/// `DeviceNotResponding`, except broadcast writes (id 0). Each call can be
/// delayed by a fixed latency on the tokio clock, and the next call can be
/// made to fail with an injected error. The call log keeps at most
/// [`MAX_CALL_RECORDS`] entries.
#[derive(Debug)]
pub struct BankClient {
    bank: ModbusRegisterBank,
    unit_id: SlaveId,
    latency: Duration,
    next_error: Option<ModbusError>,
    reply_shortfall: usize,
    calls: Vec<CallRecord>,
    stats: ClientStats,
}

impl BankClient {
    /// Serve `bank` as unit `unit_id`
    pub fn new(bank: ModbusRegisterBank, unit_id: SlaveId) -> Self {
        Self {
            bank,
            unit_id,
            latency: Duration::ZERO,
            next_error: None,
            reply_shortfall: 0,
            calls: Vec::new(),
            stats: ClientStats::default(),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&mut self, error: ModbusError) {
        self.next_error = Some(error);
    }

    /// Drop `count` elements from every read reply, simulating a
    /// misbehaving transport
    pub fn truncate_replies(&mut self, count: usize) {
        self.reply_shortfall = count;
    }

    /// The shared bank
    pub fn bank(&self) -> &ModbusRegisterBank {
        &self.bank
    }

    /// The most recent primitives received, oldest first
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    async fn begin(&mut self, function: ModbusFunction, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<()> {
        debug!("BankClient {} slave={} address={} quantity={}", function, slave_id, address, quantity);
        if self.calls.len() >= MAX_CALL_RECORDS {
            self.calls.drain(..MAX_CALL_RECORDS / 2);
        }
        self.calls.push(CallRecord { function, slave_id, address, quantity });
        self.stats.requests_sent += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let broadcast_write = slave_id == 0 && function.is_write_function();
        let outcome = match self.next_error.take() {
            Some(error) => Err(error),
            None if slave_id != self.unit_id && !broadcast_write => Err(ModbusError::device_not_responding(slave_id)),
            None => Ok(()),
        };

        match &outcome {
            Ok(()) => self.stats.responses_received += 1,
            Err(ModbusError::Timeout { .. }) => self.stats.timeouts += 1,
            Err(_) => self.stats.errors += 1,
        }
        outcome
    }

    fn shorten<T>(&self, mut reply: Vec<T>) -> Vec<T> {
        let keep = reply.len().saturating_sub(self.reply_shortfall);
        reply.truncate(keep);
        reply
    }
}

#[async_trait]
impl ModbusClient for BankClient {
    async fn read_01(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.begin(ModbusFunction::ReadCoils, slave_id, address, quantity).await?;
        Ok(self.shorten(self.bank.read_01(address, quantity)?))
    }

    async fn read_02(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.begin(ModbusFunction::ReadDiscreteInputs, slave_id, address, quantity).await?;
        Ok(self.shorten(self.bank.read_02(address, quantity)?))
    }

    async fn read_03(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.begin(ModbusFunction::ReadHoldingRegisters, slave_id, address, quantity).await?;
        Ok(self.shorten(self.bank.read_03(address, quantity)?))
    }

    async fn read_04(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.begin(ModbusFunction::ReadInputRegisters, slave_id, address, quantity).await?;
        Ok(self.shorten(self.bank.read_04(address, quantity)?))
    }

    async fn write_05(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
        self.begin(ModbusFunction::WriteSingleCoil, slave_id, address, 1).await?;
        self.bank.write_05(address, value)
    }

    async fn write_06(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        self.begin(ModbusFunction::WriteSingleRegister, slave_id, address, 1).await?;
        self.bank.write_06(address, value)
    }

    async fn write_0f(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        self.begin(ModbusFunction::WriteMultipleCoils, slave_id, address, values.len() as u16).await?;
        self.bank.write_0f(address, values)
    }

    async fn write_10(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.begin(ModbusFunction::WriteMultipleRegisters, slave_id, address, values.len() as u16).await?;
        self.bank.write_10(address, values)
    }

    fn get_stats(&self) -> ClientStats {
        self.stats
    }
}
