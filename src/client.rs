//! Transport capability consumed by the typed layer
//!
//! Framing, CRC, transaction ids and the TCP / serial links live outside this
//! crate. Anything that can perform the eight primitive Modbus operations
//! implements [`ModbusClient`] and can be wrapped in a
//! [`TypedClient`](crate::dispatch::TypedClient).
//!
//! Implementations report failures with the transport family of
//! [`ModbusError`](crate::error::ModbusError) (`Io`, `Connection`, `Timeout`,
//! `Exception`, `Protocol`, `DeviceNotResponding`); the typed layer passes
//! them through unchanged.

use async_trait::async_trait;

use crate::error::ModbusResult;
use crate::protocol::SlaveId;

/// Request counters a client may keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
}

/// Trait defining the interface for Modbus client operations
///
/// This trait provides async methods for all standard Modbus functions,
/// with clear function code references for better understanding.
#[async_trait]
pub trait ModbusClient: Send + Sync {
    /// Read coils (function code 0x01)
    async fn read_01(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>>;

    /// Read discrete inputs (function code 0x02)
    async fn read_02(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>>;

    /// Read holding registers (function code 0x03)
    async fn read_03(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>>;

    /// Read input registers (function code 0x04)
    async fn read_04(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>>;

    /// Write single coil (function code 0x05)
    async fn write_05(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()>;

    /// Write single register (function code 0x06)
    async fn write_06(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()>;

    /// Write multiple coils (function code 0x0F)
    async fn write_0f(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()>;

    /// Write multiple registers (function code 0x10)
    async fn write_10(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()>;

    /// Check if client is connected
    fn is_connected(&self) -> bool {
        true
    }

    /// Request counters, zero when the client does not keep any
    fn get_stats(&self) -> ClientStats {
        ClientStats::default()
    }

    // Descriptive names for the function-code methods
    async fn read_coils(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_01(slave_id, address, quantity).await
    }

    async fn read_discrete_inputs(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_02(slave_id, address, quantity).await
    }

    async fn read_holding_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.read_03(slave_id, address, quantity).await
    }

    async fn read_input_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.read_04(slave_id, address, quantity).await
    }

    async fn write_single_coil(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
        self.write_05(slave_id, address, value).await
    }

    async fn write_single_register(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        self.write_06(slave_id, address, value).await
    }

    async fn write_multiple_coils(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        self.write_0f(slave_id, address, values).await
    }

    async fn write_multiple_registers(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.write_10(slave_id, address, values).await
    }
}

/// Lets a [`TypedClient`](crate::dispatch::TypedClient) borrow a client
/// instead of owning it.
#[async_trait]
impl<'a, C: ModbusClient + ?Sized> ModbusClient for &'a mut C {
    async fn read_01(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        (**self).read_01(slave_id, address, quantity).await
    }

    async fn read_02(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        (**self).read_02(slave_id, address, quantity).await
    }

    async fn read_03(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        (**self).read_03(slave_id, address, quantity).await
    }

    async fn read_04(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        (**self).read_04(slave_id, address, quantity).await
    }

    async fn write_05(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
        (**self).write_05(slave_id, address, value).await
    }

    async fn write_06(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        (**self).write_06(slave_id, address, value).await
    }

    async fn write_0f(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        (**self).write_0f(slave_id, address, values).await
    }

    async fn write_10(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        (**self).write_10(slave_id, address, values).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn get_stats(&self) -> ClientStats {
        (**self).get_stats()
    }
}
