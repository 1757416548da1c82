//! # Typed Read/Write Dispatcher
//!
//! [`TypedClient`] is the single entry point for typed access to the four
//! Modbus tables. Every operation follows the same path:
//!
//! 1. validate the request against the protocol bounds
//!    ([`utils::validation`](crate::utils::validation)),
//! 2. compute the register span of the requested type,
//! 3. perform **exactly one** primitive call on the wrapped
//!    [`ModbusClient`],
//! 4. decode (or, for writes, encode beforehand) with the client's fixed
//!    [`ByteOrderFlags`].
//!
//! A rejected request never reaches the transport. Transport errors are
//! returned unchanged and never retried.
//!
//! ## Example
//!
//! ```rust
//! use voltage_modbus_typed::codec::{ByteOrderFlags, TypedValue, ValueType};
//! use voltage_modbus_typed::dispatch::TypedClient;
//! use voltage_modbus_typed::protocol::RegisterKind;
//! use voltage_modbus_typed::register_bank::{BankClient, ModbusRegisterBank};
//!
//! # #[tokio::main]
//! # async fn main() -> voltage_modbus_typed::ModbusResult<()> {
//! let bank = ModbusRegisterBank::new();
//! bank.write_10(10, &[0x0001, 0x0000, 0x0002, 0x0000])?;
//!
//! let mut client = TypedClient::new(BankClient::new(bank, 1), ByteOrderFlags::default());
//! let values = client.read_values(RegisterKind::HoldingRegister, 1, 10, 2, ValueType::Int32).await?;
//! assert_eq!(values, vec![TypedValue::Int32(1), TypedValue::Int32(2)]);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::client::ModbusClient;
use crate::codec::{self, ByteOrderFlags, RegisterValue, TypedValue, ValueType};
use crate::error::{CodecError, ModbusError, ModbusResult, ValidationError};
use crate::logging::CallbackLogger;
use crate::protocol::{ModbusFunction, RegisterKind, SlaveId};
use crate::utils::{format, logging, validation, OperationTimer};

/// Per-connection settings of a [`TypedClient`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedClientConfig {
    #[serde(default)]
    pub flags: ByteOrderFlags,
}

/// What to read: table, unit, start address, count and optional type
///
/// Without a value type, register tables are read as raw words. For packed
/// types `count` is a byte / character count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTarget {
    pub kind: RegisterKind,
    pub slave_id: SlaveId,
    pub address: u16,
    pub count: u16,
    #[serde(default)]
    pub value_type: Option<ValueType>,
}

impl ReadTarget {
    pub fn new(kind: RegisterKind, slave_id: SlaveId, address: u16, count: u16) -> Self {
        Self { kind, slave_id, address, count, value_type: None }
    }

    /// Interpret the registers as `value_type`
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// One-line description printed above the first sample of a poll
    pub fn header(&self) -> String {
        match self.value_type {
            Some(value_type) => format!(
                "{} from slave {}, address {}, count {} as {}",
                self.kind, self.slave_id, self.address, self.count, value_type
            ),
            None => format!(
                "{} from slave {}, address {}, count {}",
                self.kind, self.slave_id, self.address, self.count
            ),
        }
    }
}

/// Result of [`TypedClient::read`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Reading {
    Bits(Vec<bool>),
    Registers(Vec<u16>),
    Values(Vec<TypedValue>),
}

impl Reading {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Reading::Bits(bits) => serde_json::json!(bits),
            Reading::Registers(words) => serde_json::json!(words),
            Reading::Values(values) => serde_json::Value::Array(values.iter().map(TypedValue::to_json).collect()),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Bits(bits) => f.write_str(&format::bits_to_string(bits)),
            Reading::Registers(words) => {
                let text = words.iter().map(|word| word.to_string()).collect::<Vec<_>>().join(" ");
                f.write_str(&text)
            },
            Reading::Values(values) => {
                let text = values.iter().map(|value| value.to_string()).collect::<Vec<_>>().join(" ");
                f.write_str(&text)
            },
        }
    }
}

/// Values for [`TypedClient::write`]
#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    Bits(Vec<bool>),
    Registers(Vec<u16>),
    Values { values: Vec<TypedValue>, value_type: ValueType },
}

/// Typed access to one Modbus connection
///
/// Owns the client, or borrows it when built from `&mut C`. The byte order
/// flags are fixed for the lifetime of the value.
pub struct TypedClient<C: ModbusClient> {
    client: C,
    flags: ByteOrderFlags,
    logger: Option<CallbackLogger>,
}

impl<C: ModbusClient> TypedClient<C> {
    pub fn new(client: C, flags: ByteOrderFlags) -> Self {
        Self { client, flags, logger: None }
    }

    pub fn from_config(client: C, config: &TypedClientConfig) -> Self {
        Self::new(client, config.flags)
    }

    /// Trace every dispatch through `logger`
    pub fn with_logger(mut self, logger: CallbackLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn flags(&self) -> ByteOrderFlags {
        self.flags
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Read whatever `target` describes
    ///
    /// Bit tables yield [`Reading::Bits`], register tables yield raw words
    /// without a value type and decoded values with one.
    pub async fn read(&mut self, target: &ReadTarget) -> ModbusResult<Reading> {
        let ReadTarget { kind, slave_id, address, count, value_type } = *target;
        if kind.is_bit() {
            if let Some(value_type) = value_type {
                return Err(ValidationError::TargetMismatch {
                    kind,
                    operation: format!("{} read", value_type),
                }.into());
            }
            return Ok(Reading::Bits(self.read_bits(kind, slave_id, address, count).await?));
        }

        match value_type {
            None => Ok(Reading::Registers(self.read_registers(kind, slave_id, address, count).await?)),
            Some(value_type) => Ok(Reading::Values(
                self.read_values(kind, slave_id, address, count, value_type).await?,
            )),
        }
    }

    /// Read coils (0x01) or discrete inputs (0x02)
    pub async fn read_bits(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, count: u16) -> ModbusResult<Vec<bool>> {
        if !kind.is_bit() {
            return Err(ValidationError::TargetMismatch { kind, operation: "bit read".to_string() }.into());
        }
        validation::validate_coil_count(count)?;
        validation::validate_address_range(address, count as u32)?;

        let function = kind.read_function();
        self.trace_request(slave_id, function, address, count);
        let timer = OperationTimer::start(function.name());
        let result = match kind {
            RegisterKind::Coil => self.client.read_01(slave_id, address, count).await,
            _ => self.client.read_02(slave_id, address, count).await,
        };
        let mut bits = self.trace_result(slave_id, function, address, count as usize, timer, result)?;

        // packed replies may round up to a whole byte
        if bits.len() < count as usize {
            return Err(CodecError::WrongBitCount { expected: count as usize, actual: bits.len() }.into());
        }
        bits.truncate(count as usize);

        if let Some(logger) = &self.logger {
            logger.log_bits(slave_id, function, &bits);
        }
        Ok(bits)
    }

    /// Read raw holding (0x03) or input (0x04) registers
    pub async fn read_registers(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        self.check_register_kind(kind, "register read")?;
        validation::validate_register_count(count)?;
        validation::validate_address_range(address, count as u32)?;
        self.read_words(kind, slave_id, address, count, ValueType::UInt16).await
    }

    /// Read and decode typed values
    ///
    /// # Arguments
    ///
    /// * `count` - Elements for numeric types; bytes or characters for
    ///   `Byte`, `AsciiString` and `HexString`; must be 1 for `Bits16`
    ///
    /// # Returns
    ///
    /// `count` values for numeric types, a single value otherwise
    pub async fn read_values(
        &mut self,
        kind: RegisterKind,
        slave_id: SlaveId,
        address: u16,
        count: u16,
        value_type: ValueType,
    ) -> ModbusResult<Vec<TypedValue>> {
        self.check_register_kind(kind, "typed read")?;
        let registers = validation::validate_typed_count(value_type, count)?;
        validation::validate_address_range(address, registers as u32)?;

        let words = self.read_words(kind, slave_id, address, registers, value_type).await?;
        let values = if value_type.is_packed() {
            vec![codec::decode(&words, value_type, count, self.flags)?]
        } else {
            codec::decode_array(&words, value_type, self.flags)?
        };

        if let Some(logger) = &self.logger {
            logger.log_values(slave_id, &values);
        }
        Ok(values)
    }

    /// Read one element of `value_type`
    pub async fn read_value(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, value_type: ValueType) -> ModbusResult<TypedValue> {
        self.read_value_of(kind, slave_id, address, 1, value_type).await
    }

    /// Read `count` native numbers
    pub async fn read_typed<T: RegisterValue>(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, count: u16) -> ModbusResult<Vec<T>> {
        self.check_register_kind(kind, "typed read")?;
        let registers = validation::validate_typed_count(T::VALUE_TYPE, count)?;
        validation::validate_address_range(address, registers as u32)?;

        let words = self.read_words(kind, slave_id, address, registers, T::VALUE_TYPE).await?;
        Ok(codec::decode_values::<T>(&words, self.flags)?)
    }

    /// Read an ASCII string of `chars` characters, trailing NULs trimmed
    pub async fn read_string(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, chars: u16) -> ModbusResult<String> {
        match self.read_value_of(kind, slave_id, address, chars, ValueType::AsciiString).await? {
            TypedValue::Ascii(text) => Ok(text),
            other => Err(ModbusError::internal(format!("Expected text, decoded {:?}", other))),
        }
    }

    /// Read `bytes` bytes rendered as uppercase hex
    pub async fn read_hex(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, bytes: u16) -> ModbusResult<String> {
        match self.read_value_of(kind, slave_id, address, bytes, ValueType::HexString).await? {
            TypedValue::Hex(text) => Ok(text),
            other => Err(ModbusError::internal(format!("Expected hex, decoded {:?}", other))),
        }
    }

    async fn read_value_of(
        &mut self,
        kind: RegisterKind,
        slave_id: SlaveId,
        address: u16,
        count: u16,
        value_type: ValueType,
    ) -> ModbusResult<TypedValue> {
        self.read_values(kind, slave_id, address, count, value_type)
            .await?
            .pop()
            .ok_or_else(|| ModbusError::internal("Decoder returned no value"))
    }

    /// Write to a table, rejecting read-only tables and payloads of the
    /// wrong shape before any transport call
    pub async fn write(&mut self, kind: RegisterKind, slave_id: SlaveId, address: u16, payload: &WritePayload) -> ModbusResult<()> {
        if !kind.is_writable() {
            return Err(ValidationError::ReadOnlyTarget { kind }.into());
        }

        match (kind, payload) {
            (RegisterKind::Coil, WritePayload::Bits(bits)) => self.write_bits(slave_id, address, bits).await,
            (RegisterKind::HoldingRegister, WritePayload::Registers(words)) => {
                self.write_registers(slave_id, address, words).await
            },
            (RegisterKind::HoldingRegister, WritePayload::Values { values, value_type }) => {
                self.write_values(slave_id, address, values, *value_type).await
            },
            (kind, WritePayload::Bits(_)) => Err(ValidationError::TargetMismatch {
                kind,
                operation: "coil write".to_string(),
            }.into()),
            (kind, _) => Err(ValidationError::TargetMismatch {
                kind,
                operation: "register write".to_string(),
            }.into()),
        }
    }

    /// Write coils: one value uses 0x05, more use 0x0F
    pub async fn write_bits(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        validation::validate_write_coil_count(values.len())?;
        validation::validate_address_range(address, values.len() as u32)?;

        let function = RegisterKind::Coil
            .write_function(values.len())
            .ok_or(ValidationError::ReadOnlyTarget { kind: RegisterKind::Coil })?;
        self.trace_request(slave_id, function, address, values.len() as u16);
        if let Some(logger) = &self.logger {
            logger.log_bits(slave_id, function, values);
        }

        let timer = OperationTimer::start(function.name());
        let result = match (function, values) {
            (ModbusFunction::WriteSingleCoil, [value]) => self.client.write_05(slave_id, address, *value).await,
            _ => self.client.write_0f(slave_id, address, values).await,
        };
        self.trace_result(slave_id, function, address, values.len(), timer, result)
    }

    /// Write raw holding registers: one word uses 0x06, more use 0x10
    pub async fn write_registers(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        validation::validate_write_register_count(values.len())?;
        validation::validate_address_range(address, values.len() as u32)?;

        let function = RegisterKind::HoldingRegister
            .write_function(values.len())
            .ok_or(ValidationError::ReadOnlyTarget { kind: RegisterKind::HoldingRegister })?;
        self.trace_request(slave_id, function, address, values.len() as u16);
        if let Some(logger) = &self.logger {
            logger.log_registers(slave_id, function, values);
        }

        let timer = OperationTimer::start(function.name());
        let result = match (function, values) {
            (ModbusFunction::WriteSingleRegister, [value]) => self.client.write_06(slave_id, address, *value).await,
            _ => self.client.write_10(slave_id, address, values).await,
        };
        self.trace_result(slave_id, function, address, values.len(), timer, result)
    }

    /// Encode and write typed values
    ///
    /// The primitive follows the encoded word count: a lone 16-bit value
    /// goes out as 0x06, anything spanning more registers as 0x10.
    pub async fn write_values(&mut self, slave_id: SlaveId, address: u16, values: &[TypedValue], value_type: ValueType) -> ModbusResult<()> {
        if values.is_empty() {
            return Err(ValidationError::EmptyWrite.into());
        }
        if value_type == ValueType::Bits16 && values.len() > 1 {
            return Err(ValidationError::Bits16Count { count: values.len() }.into());
        }

        let words = codec::encode_array(values, value_type, self.flags)?;
        debug!("Encoded {} x {} into {} registers", values.len(), value_type, words.len());
        self.write_registers(slave_id, address, &words).await
    }

    /// Encode and write one value under its own type
    pub async fn write_value(&mut self, slave_id: SlaveId, address: u16, value: &TypedValue) -> ModbusResult<()> {
        self.write_values(slave_id, address, std::slice::from_ref(value), value.value_type()).await
    }

    /// Encode and write native numbers
    pub async fn write_typed<T: RegisterValue>(&mut self, slave_id: SlaveId, address: u16, values: &[T]) -> ModbusResult<()> {
        if values.is_empty() {
            return Err(ValidationError::EmptyWrite.into());
        }
        let words = codec::encode_values(values, self.flags);
        self.write_registers(slave_id, address, &words).await
    }

    /// Write an ASCII string, zero-padded to whole registers
    pub async fn write_string(&mut self, slave_id: SlaveId, address: u16, text: &str) -> ModbusResult<()> {
        self.write_value(slave_id, address, &TypedValue::Ascii(text.to_string())).await
    }

    /// Write bytes given as hex text (any case)
    pub async fn write_hex(&mut self, slave_id: SlaveId, address: u16, text: &str) -> ModbusResult<()> {
        self.write_value(slave_id, address, &TypedValue::Hex(text.to_string())).await
    }

    fn check_register_kind(&self, kind: RegisterKind, operation: &str) -> ModbusResult<()> {
        if kind.is_bit() {
            return Err(ValidationError::TargetMismatch { kind, operation: operation.to_string() }.into());
        }
        Ok(())
    }

    /// The single transport call behind every register read
    async fn read_words(
        &mut self,
        kind: RegisterKind,
        slave_id: SlaveId,
        address: u16,
        registers: u16,
        value_type: ValueType,
    ) -> ModbusResult<Vec<u16>> {
        let function = kind.read_function();
        self.trace_request(slave_id, function, address, registers);
        let timer = OperationTimer::start(function.name());
        let result = match kind {
            RegisterKind::InputRegister => self.client.read_04(slave_id, address, registers).await,
            _ => self.client.read_03(slave_id, address, registers).await,
        };
        let words = self.trace_result(slave_id, function, address, registers as usize, timer, result)?;

        if words.len() != registers as usize {
            return Err(CodecError::WrongRegisterCount {
                value_type,
                expected: registers as usize,
                actual: words.len(),
            }.into());
        }
        if let Some(logger) = &self.logger {
            logger.log_registers(slave_id, function, &words);
        }
        Ok(words)
    }

    fn trace_request(&self, slave_id: SlaveId, function: ModbusFunction, address: u16, quantity: u16) {
        if let Some(logger) = &self.logger {
            logger.log_request(slave_id, function, address, quantity);
        }
    }

    fn trace_result<T>(
        &self,
        slave_id: SlaveId,
        function: ModbusFunction,
        address: u16,
        quantity: usize,
        timer: OperationTimer,
        result: ModbusResult<T>,
    ) -> ModbusResult<T> {
        let duration = timer.stop();
        logging::log_dispatch(slave_id, function, address, quantity, duration, result.is_ok());
        if let (Err(error), Some(logger)) = (&result, &self.logger) {
            logger.log_error(slave_id, function, error);
        }
        result
    }
}

impl<C: ModbusClient> fmt::Debug for TypedClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedClient")
            .field("flags", &self.flags)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register_bank::{BankClient, ModbusRegisterBank};

    fn client_with(words: &[u16], flags: ByteOrderFlags) -> TypedClient<BankClient> {
        let bank = ModbusRegisterBank::new();
        bank.write_10(10, words).unwrap();
        TypedClient::new(BankClient::new(bank, 1), flags)
    }

    fn functions(client: &TypedClient<BankClient>) -> Vec<ModbusFunction> {
        client.client().calls().iter().map(|call| call.function).collect()
    }

    #[tokio::test]
    async fn test_int32_read_spans_registers() {
        let mut client = client_with(&[0x0001, 0x0000, 0x0002, 0x0000], ByteOrderFlags::default());
        let values = client.read_values(RegisterKind::HoldingRegister, 1, 10, 2, ValueType::Int32).await.unwrap();
        assert_eq!(values, vec![TypedValue::Int32(1), TypedValue::Int32(2)]);

        let call = client.client().calls()[0];
        assert_eq!(call.function, ModbusFunction::ReadHoldingRegisters);
        assert_eq!((call.address, call.quantity), (10, 4));
    }

    #[tokio::test]
    async fn test_logger_traces_dispatches() {
        use crate::logging::{LogCallback, LogLevel, LoggingMode};
        use std::sync::{Arc, Mutex};

        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let callback: LogCallback = Box::new(move |level, message| {
            sink.lock().unwrap().push((level, message.to_string()));
        });
        let mut client = client_with(&[0x0001, 0x0000, 0x0002, 0x0000], ByteOrderFlags::default())
            .with_logger(crate::custom_logger!(callback, LogLevel::Debug, LoggingMode::Interpreted));

        client.read_values(RegisterKind::HoldingRegister, 1, 10, 2, ValueType::Int32).await.unwrap();
        {
            let lines = lines.lock().unwrap();
            assert_eq!(lines.len(), 3);
            assert_eq!(
                lines[0].1,
                "Modbus Request -> Slave: 1, Function: Read Holding Registers (0x03), Address: 10, Quantity: 4"
            );
            assert_eq!(
                lines[1].1,
                "Modbus Response <- Slave: 1, Function: Read Holding Registers (0x03), Registers: [1, 0, 2, 0]"
            );
            assert_eq!(lines[2], (LogLevel::Debug, "Decoded <- Slave: 1, Values: [1, 2]".to_string()));
        }

        lines.lock().unwrap().clear();
        client.write_typed::<u16>(1, 20, &[7]).await.unwrap();
        {
            let lines = lines.lock().unwrap();
            assert_eq!(lines.len(), 2);
            assert!(lines[0].1.contains("Write Single Register (0x06), Address: 20, Quantity: 1"));
            assert!(lines[1].1.ends_with("Registers: [7]"));
        }

        lines.lock().unwrap().clear();
        client.client_mut().fail_next(ModbusError::timeout("read", 200));
        assert!(client.read_registers(RegisterKind::HoldingRegister, 1, 10, 1).await.is_err());
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].0, LogLevel::Error);
        assert!(lines[1].1.starts_with("Modbus Error <- Slave: 1, Function: Read Holding Registers (0x03), "));
    }

    #[tokio::test]
    async fn test_flags_apply_to_reads() {
        let mut client = client_with(&[0x0000, 0x0001], ByteOrderFlags::new(false, true));
        let values: Vec<u32> = client.read_typed(RegisterKind::HoldingRegister, 1, 10, 1).await.unwrap();
        assert_eq!(values, vec![1]);

        let mut client = client_with(&[0x1234], ByteOrderFlags::new(true, false));
        let value = client.read_value(RegisterKind::HoldingRegister, 1, 10, ValueType::UInt16).await.unwrap();
        assert_eq!(value, TypedValue::UInt16(0x3412));
    }

    #[tokio::test]
    async fn test_input_registers_use_read_only_primitive() {
        let bank = ModbusRegisterBank::new();
        bank.set_words(RegisterKind::InputRegister, 0, &[0x4142, 0x4300]).unwrap();
        let mut client = TypedClient::new(BankClient::new(bank, 1), ByteOrderFlags::new(true, false));

        let text = client.read_string(RegisterKind::InputRegister, 1, 0, 4).await.unwrap();
        assert_eq!(text, "ABC");
        let hex = client.read_hex(RegisterKind::InputRegister, 1, 0, 3).await.unwrap();
        assert_eq!(hex, "414243");
        assert_eq!(functions(&client), vec![ModbusFunction::ReadInputRegisters; 2]);
    }

    #[tokio::test]
    async fn test_validation_failures_skip_transport() {
        let mut client = client_with(&[], ByteOrderFlags::default());

        let err = client.read_values(RegisterKind::HoldingRegister, 1, 0, 63, ValueType::Int32).await.unwrap_err();
        assert!(matches!(err.as_validation(), Some(ValidationError::TypedRegisterCount { registers: 126, .. })));

        let err = client.read_values(RegisterKind::HoldingRegister, 1, 0, 2, ValueType::Bits16).await.unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::Bits16Count { count: 2 }));

        assert!(client.read_bits(RegisterKind::Coil, 1, 0, 2001).await.unwrap_err().is_validation_error());
        assert!(client.read_bits(RegisterKind::Coil, 1, 0, 0).await.unwrap_err().is_validation_error());
        assert!(client.read_registers(RegisterKind::Coil, 1, 0, 1).await.unwrap_err().is_validation_error());

        let err = client.read_values(RegisterKind::InputRegister, 1, 0xFFFF, 1, ValueType::Float32).await.unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::AddressOverflow { start: 0xFFFF, registers: 2 }));

        let err = client.write_registers(1, 0, &[0; 124]).await.unwrap_err();
        assert!(err.is_validation_error());

        assert_eq!(client.client().call_count(), 0);
    }

    #[tokio::test]
    async fn test_write_primitive_selection() {
        let mut client = client_with(&[], ByteOrderFlags::default());

        client.write_bits(1, 0, &[true]).await.unwrap();
        client.write_bits(1, 0, &[true, false, true]).await.unwrap();
        client.write_registers(1, 0, &[7]).await.unwrap();
        client.write_registers(1, 0, &[7, 8]).await.unwrap();
        client.write_value(1, 20, &TypedValue::Int16(-1)).await.unwrap();
        client.write_value(1, 20, &TypedValue::Int32(-1)).await.unwrap();

        assert_eq!(
            functions(&client),
            vec![
                ModbusFunction::WriteSingleCoil,
                ModbusFunction::WriteMultipleCoils,
                ModbusFunction::WriteSingleRegister,
                ModbusFunction::WriteMultipleRegisters,
                ModbusFunction::WriteSingleRegister,
                ModbusFunction::WriteMultipleRegisters,
            ]
        );
        assert_eq!(client.client().bank().read_03(20, 2).unwrap(), vec![0xFFFF, 0xFFFF]);
    }

    #[tokio::test]
    async fn test_typed_write_round_trip() {
        for flags in ByteOrderFlags::ALL {
            let mut client = client_with(&[], flags);
            client.write_typed(1, 100, &[3.25f64, -0.5]).await.unwrap();
            let back: Vec<f64> = client.read_typed(RegisterKind::HoldingRegister, 1, 100, 2).await.unwrap();
            assert_eq!(back, vec![3.25, -0.5]);

            client.write_string(1, 200, "PUMP-7").await.unwrap();
            assert_eq!(client.read_string(RegisterKind::HoldingRegister, 1, 200, 6).await.unwrap(), "PUMP-7");

            client.write_hex(1, 300, "0a0b0c").await.unwrap();
            assert_eq!(client.read_hex(RegisterKind::HoldingRegister, 1, 300, 3).await.unwrap(), "0A0B0C");
        }
    }

    #[tokio::test]
    async fn test_write_target_checks() {
        let mut client = client_with(&[], ByteOrderFlags::default());

        let err = client
            .write(RegisterKind::InputRegister, 1, 0, &WritePayload::Registers(vec![1]))
            .await
            .unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::ReadOnlyTarget { kind: RegisterKind::InputRegister }));

        let err = client.write(RegisterKind::Coil, 1, 0, &WritePayload::Registers(vec![1])).await.unwrap_err();
        assert!(matches!(err.as_validation(), Some(ValidationError::TargetMismatch { .. })));

        let err = client
            .write(RegisterKind::HoldingRegister, 1, 0, &WritePayload::Values { values: vec![], value_type: ValueType::Int32 })
            .await
            .unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyWrite));
        assert_eq!(client.client().call_count(), 0);

        client.write(RegisterKind::Coil, 1, 4, &WritePayload::Bits(vec![true, true])).await.unwrap();
        assert_eq!(client.read_bits(RegisterKind::Coil, 1, 4, 2).await.unwrap(), vec![true, true]);
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let mut client = client_with(&[], ByteOrderFlags::default());
        let injected = ModbusError::exception(0x03, 0x02);
        client.client_mut().fail_next(injected.clone());

        let err = client.read_registers(RegisterKind::HoldingRegister, 1, 0, 4).await.unwrap_err();
        assert_eq!(err, injected);
        assert_eq!(client.client().call_count(), 1);

        let err = client.read_registers(RegisterKind::HoldingRegister, 2, 0, 4).await.unwrap_err();
        assert_eq!(err, ModbusError::device_not_responding(2));
    }

    #[tokio::test]
    async fn test_short_reply_is_codec_error() {
        let mut client = client_with(&[1, 2, 3, 4], ByteOrderFlags::default());
        client.client_mut().truncate_replies(1);

        let err = client.read_values(RegisterKind::HoldingRegister, 1, 10, 2, ValueType::Int32).await.unwrap_err();
        assert_eq!(
            err,
            ModbusError::Codec(CodecError::WrongRegisterCount { value_type: ValueType::Int32, expected: 4, actual: 3 })
        );

        let err = client.read_bits(RegisterKind::Coil, 1, 0, 8).await.unwrap_err();
        assert!(err.is_codec_error());
    }

    #[tokio::test]
    async fn test_read_target_entry_point() {
        let mut bank_client = BankClient::new(ModbusRegisterBank::new(), 3);
        bank_client.bank().write_0f(0, &[true, false, true]).unwrap();
        bank_client.bank().write_10(0, &[0x4000, 0x3FC0]).unwrap();

        {
            let mut client = TypedClient::new(&mut bank_client, ByteOrderFlags::new(false, true));

            let bits = client.read(&ReadTarget::new(RegisterKind::Coil, 3, 0, 3)).await.unwrap();
            assert_eq!(bits.to_string(), "101");
            assert_eq!(bits.to_json(), serde_json::json!([true, false, true]));

            let raw = client.read(&ReadTarget::new(RegisterKind::HoldingRegister, 3, 0, 2)).await.unwrap();
            assert_eq!(raw, Reading::Registers(vec![0x4000, 0x3FC0]));
            assert_eq!(raw.to_json(), serde_json::json!([16384, 16320]));

            let target = ReadTarget::new(RegisterKind::HoldingRegister, 3, 0, 1).with_type(ValueType::Float32);
            let value = client.read(&target).await.unwrap();
            assert_eq!(value, Reading::Values(vec![TypedValue::Float32(f32::from_bits(0x4000_3FC0))]));
            assert!(target.header().contains("as float"));

            let typed_bits = ReadTarget::new(RegisterKind::Coil, 3, 0, 1).with_type(ValueType::Int16);
            assert!(client.read(&typed_bits).await.unwrap_err().is_validation_error());
        }

        assert_eq!(bank_client.call_count(), 3);
    }

    #[test]
    fn test_config_serde() {
        let config: TypedClientConfig = serde_json::from_str(r#"{"flags":{"swap_words":true}}"#).unwrap();
        assert_eq!(config.flags, ByteOrderFlags::new(false, true));

        let target: ReadTarget = serde_json::from_str(
            r#"{"kind":"input_register","slave_id":1,"address":5,"count":2,"value_type":"float"}"#,
        ).unwrap();
        assert_eq!(target, ReadTarget::new(RegisterKind::InputRegister, 1, 5, 2).with_type(ValueType::Float32));
    }
}
