/// Modbus protocol definitions
///
/// This module contains the Modbus vocabulary the typed layer needs:
/// function codes, exception codes and the four addressable tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::{ModbusError, ModbusResult, ValidationError};

/// Modbus slave/unit identifier
pub type SlaveId = u8;

/// Modbus function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Coils (0x01)
    ReadCoils = 0x01,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = 0x02,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Read Input Registers (0x04)
    ReadInputRegisters = 0x04,
    /// Write Single Coil (0x05)
    WriteSingleCoil = 0x05,
    /// Write Single Register (0x06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils = 0x0F,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = 0x10,
}

impl ModbusFunction {
    /// Convert from u8 to ModbusFunction
    pub fn from_u8(value: u8) -> ModbusResult<Self> {
        match value {
            0x01 => Ok(ModbusFunction::ReadCoils),
            0x02 => Ok(ModbusFunction::ReadDiscreteInputs),
            0x03 => Ok(ModbusFunction::ReadHoldingRegisters),
            0x04 => Ok(ModbusFunction::ReadInputRegisters),
            0x05 => Ok(ModbusFunction::WriteSingleCoil),
            0x06 => Ok(ModbusFunction::WriteSingleRegister),
            0x0F => Ok(ModbusFunction::WriteMultipleCoils),
            0x10 => Ok(ModbusFunction::WriteMultipleRegisters),
            _ => Err(ModbusError::protocol(format!("Invalid function code: 0x{:02X}", value))),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a read function
    pub fn is_read_function(self) -> bool {
        matches!(self,
            ModbusFunction::ReadCoils |
            ModbusFunction::ReadDiscreteInputs |
            ModbusFunction::ReadHoldingRegisters |
            ModbusFunction::ReadInputRegisters
        )
    }

    /// Check if this is a write function
    pub fn is_write_function(self) -> bool {
        !self.is_read_function()
    }

    /// Human-readable name without the code
    pub fn name(self) -> &'static str {
        match self {
            ModbusFunction::ReadCoils => "Read Coils",
            ModbusFunction::ReadDiscreteInputs => "Read Discrete Inputs",
            ModbusFunction::ReadHoldingRegisters => "Read Holding Registers",
            ModbusFunction::ReadInputRegisters => "Read Input Registers",
            ModbusFunction::WriteSingleCoil => "Write Single Coil",
            ModbusFunction::WriteSingleRegister => "Write Single Register",
            ModbusFunction::WriteMultipleCoils => "Write Multiple Coils",
            ModbusFunction::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), *self as u8)
    }
}

/// Modbus exception codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModbusException {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    Acknowledge = 0x05,
    ServerDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetDeviceFailedToRespond = 0x0B,
}

impl ModbusException {
    /// Convert from u8 to ModbusException
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(ModbusException::IllegalFunction),
            0x02 => Some(ModbusException::IllegalDataAddress),
            0x03 => Some(ModbusException::IllegalDataValue),
            0x04 => Some(ModbusException::ServerDeviceFailure),
            0x05 => Some(ModbusException::Acknowledge),
            0x06 => Some(ModbusException::ServerDeviceBusy),
            0x08 => Some(ModbusException::MemoryParityError),
            0x0A => Some(ModbusException::GatewayPathUnavailable),
            0x0B => Some(ModbusException::GatewayTargetDeviceFailedToRespond),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Short name
    pub fn name(self) -> &'static str {
        match self {
            ModbusException::IllegalFunction => "Illegal Function",
            ModbusException::IllegalDataAddress => "Illegal Data Address",
            ModbusException::IllegalDataValue => "Illegal Data Value",
            ModbusException::ServerDeviceFailure => "Slave Device Failure",
            ModbusException::Acknowledge => "Acknowledge",
            ModbusException::ServerDeviceBusy => "Slave Device Busy",
            ModbusException::MemoryParityError => "Memory Parity Error",
            ModbusException::GatewayPathUnavailable => "Gateway Path Unavailable",
            ModbusException::GatewayTargetDeviceFailedToRespond => "Gateway Target Device Failed to Respond",
        }
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ModbusException::IllegalFunction => "The function code received in the query is not an allowable action for the server",
            ModbusException::IllegalDataAddress => "The data address received in the query is not an allowable address for the server",
            ModbusException::IllegalDataValue => "A value contained in the query data field is not an allowable value for server",
            ModbusException::ServerDeviceFailure => "An unrecoverable error occurred while the server was attempting to perform the requested action",
            ModbusException::Acknowledge => "The server has accepted the request and is processing it, but a long duration of time will be required to do so",
            ModbusException::ServerDeviceBusy => "The server is engaged in processing a long-duration program command",
            ModbusException::MemoryParityError => "The server attempted to read record file, but detected a parity error in the memory",
            ModbusException::GatewayPathUnavailable => "Gateway was unable to allocate an internal communication path",
            ModbusException::GatewayTargetDeviceFailedToRespond => "No response was obtained from the target device",
        }
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modbus Exception 0x{:02X}: {}", self.to_u8(), self.description())
    }
}

/// The four Modbus data tables
///
/// Coils and discrete inputs hold single bits, holding and input registers
/// hold 16-bit words. Discrete inputs and input registers are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    Coil,
    DiscreteInput,
    HoldingRegister,
    InputRegister,
}

impl RegisterKind {
    /// Whether the table stores single bits
    pub fn is_bit(self) -> bool {
        matches!(self, RegisterKind::Coil | RegisterKind::DiscreteInput)
    }

    /// Whether the table accepts writes
    pub fn is_writable(self) -> bool {
        matches!(self, RegisterKind::Coil | RegisterKind::HoldingRegister)
    }

    /// Function code used to read this table
    pub fn read_function(self) -> ModbusFunction {
        match self {
            RegisterKind::Coil => ModbusFunction::ReadCoils,
            RegisterKind::DiscreteInput => ModbusFunction::ReadDiscreteInputs,
            RegisterKind::HoldingRegister => ModbusFunction::ReadHoldingRegisters,
            RegisterKind::InputRegister => ModbusFunction::ReadInputRegisters,
        }
    }

    /// Function code used to write `count` elements, `None` for read-only tables
    pub fn write_function(self, count: usize) -> Option<ModbusFunction> {
        match (self, count) {
            (RegisterKind::Coil, 1) => Some(ModbusFunction::WriteSingleCoil),
            (RegisterKind::Coil, _) => Some(ModbusFunction::WriteMultipleCoils),
            (RegisterKind::HoldingRegister, 1) => Some(ModbusFunction::WriteSingleRegister),
            (RegisterKind::HoldingRegister, _) => Some(ModbusFunction::WriteMultipleRegisters),
            _ => None,
        }
    }

    /// Short tag used in configuration and on the console
    pub fn as_str(self) -> &'static str {
        match self {
            RegisterKind::Coil => "coil",
            RegisterKind::DiscreteInput => "discrete_input",
            RegisterKind::HoldingRegister => "holding_register",
            RegisterKind::InputRegister => "input_register",
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterKind::Coil => "Coils",
            RegisterKind::DiscreteInput => "Discrete Inputs",
            RegisterKind::HoldingRegister => "Holding Registers",
            RegisterKind::InputRegister => "Input Registers",
        };
        f.write_str(name)
    }
}

impl FromStr for RegisterKind {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coil" | "coils" => Ok(RegisterKind::Coil),
            "discrete" | "discrete_input" | "discrete_inputs" => Ok(RegisterKind::DiscreteInput),
            "holding" | "holding_register" | "holding_registers" => Ok(RegisterKind::HoldingRegister),
            "input" | "input_register" | "input_registers" => Ok(RegisterKind::InputRegister),
            _ => Err(ValidationError::UnknownRegisterKind { tag: s.to_string() }.into()),
        }
    }
}
