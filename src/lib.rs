//! # Voltage Modbus Typed - Typed Register Access for Modbus Masters
//!
//! The layer between an application that thinks in numbers and strings and a
//! Modbus link that only moves 16-bit registers and single bits.
//!
//! ## Features
//!
//! - **Typed codecs**: 16/32/64-bit integers, IEEE-754 floats, packed ASCII,
//!   packed bytes, hex strings and 16-bit flag words
//! - **Byte order control**: independent byte swap and word swap flags for
//!   devices with non-standard layouts
//! - **Bounds checking**: every request is validated against the PDU limits
//!   before the link is touched
//! - **Write dispatch**: the single or multiple write primitive is chosen from
//!   the encoded size
//! - **Poll monitor**: repeat a read at a fixed interval with overrun
//!   detection and cooperative cancellation
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Used for |
//! |------|----------|----------|
//! | 0x01 | Read Coils | bit reads |
//! | 0x02 | Read Discrete Inputs | bit reads |
//! | 0x03 | Read Holding Registers | register and typed reads |
//! | 0x04 | Read Input Registers | register and typed reads |
//! | 0x05 | Write Single Coil | one-bit writes |
//! | 0x06 | Write Single Register | one-word writes |
//! | 0x0F | Write Multiple Coils | multi-bit writes |
//! | 0x10 | Write Multiple Registers | multi-word writes |
//!
//! ## Quick Start
//!
//! ```rust
//! use voltage_modbus_typed::{BankClient, ByteOrderFlags, ModbusRegisterBank, ModbusResult, RegisterKind, TypedClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> ModbusResult<()> {
//!     let bank = ModbusRegisterBank::new();
//!     let mut client = TypedClient::new(BankClient::new(bank, 1), ByteOrderFlags::default());
//!
//!     client.write_typed::<f32>(1, 100, &[21.5]).await?;
//!     let values = client.read_typed::<f32>(RegisterKind::HoldingRegister, 1, 100, 1).await?;
//!     assert_eq!(values, vec![21.5]);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │   Application   │    │  Poll Monitor   │
//! └─────────────────┘    └─────────────────┘
//!          │                       │
//! ┌───────────────────────────────────────┐
//! │   Typed Client (validate, dispatch)   │
//! └───────────────────────────────────────┘
//!          │                       │
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Value Codecs   │    │  ModbusClient   │
//! │  (byte order)   │    │   (transport)   │
//! └─────────────────┘    └─────────────────┘
//! ```

/// Core error types and result handling
pub mod error;

/// Function codes, exception codes and register tables
pub mod protocol;

/// Register block <-> typed value conversion
pub mod codec;

/// Transport capability consumed by the typed layer
pub mod client;

/// Validated typed reads and writes
pub mod dispatch;

/// Fixed-interval polling
pub mod monitor;

/// In-memory register tables and a client backed by them
pub mod register_bank;

/// Validation, formatting and performance monitoring
pub mod utils;

/// Callback based request tracing
pub mod logging;

// Re-export main types for convenience
pub use error::{CodecError, ErrorKind, ModbusError, ModbusResult, ValidationError};
pub use protocol::{ModbusException, ModbusFunction, RegisterKind, SlaveId};
pub use codec::{ByteOrderFlags, RegisterValue, TypedValue, ValueType};
pub use client::{ClientStats, ModbusClient};
pub use dispatch::{ReadTarget, Reading, TypedClient, TypedClientConfig, WritePayload};
pub use monitor::{cancel_pair, CancelHandle, CancelToken, MonitorConfig, MonitorState, PollEvent, PollMonitor, PollSource, PollSummary};
pub use register_bank::{BankClient, ModbusRegisterBank, RegisterBankStats};
pub use utils::{OperationTimer, PerformanceMetrics};
pub use logging::{CallbackLogger, LogCallback, LogLevel, LoggingMode};

/// Maximum number of coils or discrete inputs in a single read
pub const MAX_COILS_PER_REQUEST: u16 = 2000;

/// Maximum number of registers in a single read
pub const MAX_REGISTERS_PER_REQUEST: u16 = 125;

/// Maximum number of coils in a single 0x0F write
pub const MAX_WRITE_COILS: u16 = 1968;

/// Maximum number of registers in a single 0x10 write
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Default poll interval (1 second)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Voltage Modbus Typed v{} - typed register access for Modbus masters", VERSION)
}
