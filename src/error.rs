//! # Error Handling
//!
//! This module defines the error taxonomy shared by every layer of the crate:
//! the bounds validator, the register codec, the typed dispatcher and the poll
//! monitor. Transport errors raised by a [`ModbusClient`](crate::client::ModbusClient)
//! implementation travel through the dispatcher unchanged.
//!
//! ## Error Categories
//!
//! ### Validation Errors
//! - Counts outside the protocol limits (2000 coils, 125 registers per read)
//! - Typed requests whose *register* span exceeds the limit
//! - Bit-array requests for more than one register
//! - Address ranges running past `0xFFFF`
//! - Writes aimed at read-only tables
//!
//! ### Transport Errors
//! - **I/O Errors**: network or serial failures
//! - **Connection Errors**: connection not established or lost
//! - **Timeout Errors**: operation timeouts
//! - **Exception Responses**: Modbus exception codes returned by the slave
//!
//! ### Codec Errors
//! - Register blocks whose length does not match the requested type. The
//!   validator prevents these, so a codec error reaching a caller indicates a
//!   misbehaving transport or a bug.
//!
//! ### Cancellation
//! - The poll monitor was cancelled at the top of an iteration or while
//!   waiting for the next one.
//!
//! ## Usage Example
//!
//! ```rust
//! use voltage_modbus_typed::{ModbusError, ErrorKind};
//! use voltage_modbus_typed::error::ValidationError;
//!
//! fn exit_code_for(error: &ModbusError) -> i32 {
//!     match error.kind() {
//!         ErrorKind::Validation => {
//!             eprintln!("Rejected before sending: {}", error);
//!             2
//!         },
//!         kind => kind.exit_code(),
//!     }
//! }
//!
//! let error = ModbusError::from(ValidationError::Bits16Count { count: 2 });
//! assert_eq!(exit_code_for(&error), 2);
//! ```

use thiserror::Error;

use crate::codec::ValueType;
use crate::protocol::RegisterKind;

/// Result type alias for Modbus operations
///
/// Every fallible operation in the crate returns this type so callers see a
/// single error enum regardless of which layer rejected the request.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Bounds and shape violations detected before any transport call
///
/// Each variant names exactly one violated constraint and carries the
/// offending parameters, so a presentation layer can explain the rejection
/// without parsing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A read or write of zero elements
    #[error("Count must be at least 1")]
    ZeroCount,

    /// Coil / discrete input read above the per-PDU limit
    #[error("Invalid coil count: {count} (must be 1-{max})")]
    CoilCount { count: u16, max: u16 },

    /// Raw register read above the per-PDU limit
    #[error("Invalid register count: {count} (must be 1-{max})")]
    RegisterCount { count: u16, max: u16 },

    /// Typed read whose register span exceeds the per-PDU limit
    ///
    /// The element count may look small; the check is on `registers`.
    #[error("{count} x {value_type} needs {registers} registers (max {max})")]
    TypedRegisterCount { value_type: ValueType, count: u16, registers: u32, max: u16 },

    /// Bit arrays map a single register only
    #[error("Bit array access is limited to one register, requested {count}")]
    Bits16Count { count: usize },

    /// Multiple coil write above the 0x0F limit
    #[error("Invalid coil write count: {count} (must be 1-{max})")]
    WriteCoilCount { count: usize, max: u16 },

    /// Multiple register write above the 0x10 limit
    #[error("Invalid register write count: {count} (must be 1-{max})")]
    WriteRegisterCount { count: usize, max: u16 },

    /// Start address plus span would wrap past 0xFFFF
    #[error("Invalid address: start={start}, registers={registers} exceeds 0xFFFF")]
    AddressOverflow { start: u16, registers: u32 },

    /// Write aimed at discrete inputs or input registers
    #[error("{kind} is read-only")]
    ReadOnlyTarget { kind: RegisterKind },

    /// Bit payload against a register table or vice versa
    #[error("{operation} is not supported on {kind}")]
    TargetMismatch { kind: RegisterKind, operation: String },

    /// Write with no values
    #[error("Write request carries no values")]
    EmptyWrite,

    /// Unrecognized value type tag
    #[error("Unknown value type: {tag}")]
    UnknownValueType { tag: String },

    /// Unrecognized register table tag
    #[error("Unknown register kind: {tag}")]
    UnknownRegisterKind { tag: String },
}

/// Conversion failures between register blocks and typed values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The register block length does not match the value type
    #[error("{value_type} needs {expected} registers, got {actual}")]
    WrongRegisterCount { value_type: ValueType, expected: usize, actual: usize },

    /// A coil / discrete input reply carried fewer bits than requested
    #[error("Expected {expected} bits, got {actual}")]
    WrongBitCount { expected: usize, actual: usize },

    /// A value was encoded under a different type tag
    #[error("Expected a {expected} value, got {actual}")]
    TypeMismatch { expected: ValueType, actual: ValueType },

    /// Characters must fit in one byte
    #[error("Character {ch:?} cannot be stored in a single byte")]
    InvalidCharacter { ch: char },

    /// Malformed hexadecimal text
    #[error("Invalid hex string: {message}")]
    InvalidHex { message: String },

    /// Bit arrays hold exactly 16 bits
    #[error("Bit array must hold 16 bits, got {count}")]
    InvalidBitCount { count: usize },
}

/// Comprehensive Modbus error types
///
/// Transport variants (`Io`, `Connection`, `Timeout`, `Exception`, `Protocol`,
/// `DeviceNotResponding`) are produced by client implementations and never
/// rewritten by this crate. `Validation`, `Codec` and `Cancelled` originate in
/// the crate itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModbusError {
    /// I/O related errors (network, serial)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Connection errors
    ///
    /// Connection not established, refused or lost during an operation.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Timeout errors
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Protocol-level errors reported by the transport
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Modbus exception response
    ///
    /// # Standard Exception Codes
    /// - 0x01: Illegal Function
    /// - 0x02: Illegal Data Address
    /// - 0x03: Illegal Data Value
    /// - 0x04: Slave Device Failure
    /// - 0x05: Acknowledge
    /// - 0x06: Slave Device Busy
    /// - 0x08: Memory Parity Error
    /// - 0x0A: Gateway Path Unavailable
    /// - 0x0B: Gateway Target Device Failed to Respond
    #[error("Modbus exception: function={function:02X}, code={code:02X} ({message})")]
    Exception { function: u8, code: u8, message: String },

    /// Device not responding
    #[error("Device {slave_id} not responding")]
    DeviceNotResponding { slave_id: u8 },

    /// Request rejected by the bounds validator
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Register block could not be converted
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Poll monitor cancelled
    #[error("Cancelled after {iterations} iteration(s)")]
    Cancelled { iterations: u64 },

    /// Internal errors (should not occur in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse error classification for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Transport,
    Codec,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Conventional process exit code for this kind of failure
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Validation => 2,
            ErrorKind::Transport => 3,
            ErrorKind::Codec => 4,
            ErrorKind::Cancelled => 130,
            ErrorKind::Internal => 70,
        }
    }
}

impl ModbusError {
    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create a new timeout error
    ///
    /// # Arguments
    ///
    /// * `operation` - Description of the operation that timed out
    /// * `timeout_ms` - Timeout duration in milliseconds
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol { message: message.into() }
    }

    /// Create a Modbus exception error
    ///
    /// Automatically maps standard exception codes to human-readable messages.
    ///
    /// # Arguments
    ///
    /// * `function` - Original function code that caused the exception
    /// * `code` - Modbus exception code
    pub fn exception(function: u8, code: u8) -> Self {
        let message = match crate::protocol::ModbusException::from_u8(code) {
            Some(exception) => exception.name(),
            None => "Unknown Exception",
        }.to_string();

        Self::Exception { function, code, message }
    }

    /// Create a device not responding error
    pub fn device_not_responding(slave_id: u8) -> Self {
        Self::DeviceNotResponding { slave_id }
    }

    /// Create a cancellation error
    pub fn cancelled(iterations: u64) -> Self {
        Self::Cancelled { iterations }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::Io { .. }
            | Self::Connection { .. }
            | Self::Timeout { .. }
            | Self::Protocol { .. }
            | Self::Exception { .. }
            | Self::DeviceNotResponding { .. } => ErrorKind::Transport,
        }
    }

    /// Check if the error is recoverable (can retry)
    ///
    /// The crate itself never retries; this is a hint for callers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltage_modbus_typed::ModbusError;
    ///
    /// let timeout_error = ModbusError::timeout("read operation", 5000);
    /// assert!(timeout_error.is_recoverable());
    ///
    /// let busy = ModbusError::exception(0x03, 0x06);
    /// assert!(busy.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { .. } => true,
            Self::Connection { .. } => true,
            Self::Timeout { .. } => true,
            Self::DeviceNotResponding { .. } => true,
            Self::Exception { code, .. } => {
                // Acknowledge, Busy
                matches!(code, 0x05 | 0x06)
            },
            _ => false,
        }
    }

    /// Check if the error came from the transport
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltage_modbus_typed::ModbusError;
    ///
    /// let connection_error = ModbusError::connection("Connection refused");
    /// assert!(connection_error.is_transport_error());
    ///
    /// let cancelled = ModbusError::cancelled(3);
    /// assert!(!cancelled.is_transport_error());
    /// ```
    pub fn is_transport_error(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Check if the request was rejected by the bounds validator
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if a register block failed to convert
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    /// Check if the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The validation failure, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Convert from tokio timeout errors
///
/// The timeout duration is unknown at this point; clients that know it
/// should build the error with [`ModbusError::timeout`] instead.
impl From<tokio::time::error::Elapsed> for ModbusError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("Operation timeout", 0)
    }
}

/// Convert from serde JSON errors
impl From<serde_json::Error> for ModbusError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ModbusError::timeout("read_registers", 5000);
        assert!(err.is_recoverable());
        assert!(err.is_transport_error());
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = ModbusError::exception(0x03, 0x02);
        assert!(!err.is_recoverable());
        assert!(err.is_transport_error());

        let err = ModbusError::from(ValidationError::ZeroCount);
        assert!(err.is_validation_error());
        assert!(!err.is_transport_error());
        assert_eq!(err.kind().exit_code(), 2);

        let err = ModbusError::cancelled(4);
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_error_display() {
        let err = ModbusError::from(ValidationError::TypedRegisterCount {
            value_type: ValueType::Int32,
            count: 63,
            registers: 126,
            max: 125,
        });
        let msg = format!("{}", err);
        assert!(msg.contains("63 x int"));
        assert!(msg.contains("126 registers"));

        let err = ModbusError::exception(0x03, 0x02);
        assert!(format!("{}", err).contains("Illegal Data Address"));
    }

    #[test]
    fn test_distinct_validation_variants() {
        let bits = ValidationError::Bits16Count { count: 2 };
        let coils = ValidationError::CoilCount { count: 2001, max: 2000 };
        assert_ne!(bits, coils);

        let err: ModbusError = coils.clone().into();
        assert_eq!(err.as_validation(), Some(&coils));
    }
}
