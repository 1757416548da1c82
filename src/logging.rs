//! # Callback Logging
//!
//! Request / response tracing for typed operations, routed through a user
//! callback instead of the `log` facade. Useful for consoles and HMIs that
//! want to show every dispatched primitive together with the decoded values.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use voltage_modbus_typed::logging::{CallbackLogger, LogCallback, LogLevel};
//! use voltage_modbus_typed::protocol::ModbusFunction;
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let sink = lines.clone();
//! let callback: LogCallback = Box::new(move |_, message| sink.lock().unwrap().push(message.to_string()));
//!
//! let logger = CallbackLogger::new(Some(callback), LogLevel::Info);
//! logger.log_request(1, ModbusFunction::ReadHoldingRegisters, 10, 4);
//! assert!(lines.lock().unwrap()[0].contains("Address: 10"));
//! ```

use std::sync::Arc;

use crate::codec::TypedValue;
use crate::error::ModbusError;
use crate::protocol::{ModbusFunction, SlaveId};
use crate::utils::format;

/// Log levels for the callback logging system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Error messages
    Error,
    /// Warning messages
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
}

/// How requests and replies are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// PDU bytes and register words in hex only
    Raw,
    /// Field names and decimal values
    Interpreted,
    /// Interpreted at info level, raw at debug level
    Both,
}

impl LogLevel {
    /// Convert log level to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Type alias for log callback functions
///
/// The callback receives a log level and message string
pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Logger that uses callbacks for flexible logging
#[derive(Clone)]
pub struct CallbackLogger {
    callback: Option<Arc<LogCallback>>,
    min_level: LogLevel,
    mode: LoggingMode,
}

impl std::fmt::Debug for CallbackLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackLogger")
            .field("enabled", &self.callback.is_some())
            .field("min_level", &self.min_level)
            .field("mode", &self.mode)
            .finish()
    }
}

impl CallbackLogger {
    /// Create a new callback logger
    pub fn new(callback: Option<LogCallback>, min_level: LogLevel) -> Self {
        Self::with_mode(callback, min_level, LoggingMode::Interpreted)
    }

    /// Create a new callback logger with specific mode
    pub fn with_mode(callback: Option<LogCallback>, min_level: LogLevel, mode: LoggingMode) -> Self {
        Self {
            callback: callback.map(Arc::new),
            min_level,
            mode,
        }
    }

    /// Create a logger with default console output
    pub fn console() -> Self {
        let callback: LogCallback = Box::new(|level, message| {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            match level {
                LogLevel::Error => eprintln!("[{}] ERROR: {}", timestamp, message),
                LogLevel::Warn => eprintln!("[{}] WARN: {}", timestamp, message),
                LogLevel::Info => println!("[{}] INFO: {}", timestamp, message),
                LogLevel::Debug => println!("[{}] DEBUG: {}", timestamp, message),
            }
        });
        Self::new(Some(callback), LogLevel::Info)
    }

    /// Create a logger that outputs nothing (disabled)
    pub fn disabled() -> Self {
        Self::new(None, LogLevel::Error)
    }

    /// Set logging mode
    pub fn set_mode(&mut self, mode: LoggingMode) {
        self.mode = mode;
    }

    /// Get current logging mode
    pub fn get_mode(&self) -> LoggingMode {
        self.mode
    }

    /// Log a message at the specified level
    pub fn log(&self, level: LogLevel, message: &str) {
        if self.should_log(level) {
            if let Some(ref callback) = self.callback {
                callback(level, message);
            }
        }
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn should_log(&self, level: LogLevel) -> bool {
        self.callback.is_some() && level as u8 <= self.min_level as u8
    }

    /// Emit `interpreted` and / or `raw` according to the mode
    fn log_modes(&self, interpreted: impl FnOnce() -> String, raw: impl FnOnce() -> String) {
        match self.mode {
            LoggingMode::Raw => self.info(&raw()),
            LoggingMode::Interpreted => self.info(&interpreted()),
            LoggingMode::Both => {
                self.info(&interpreted());
                self.debug(&raw());
            },
        }
    }

    /// Log a dispatched primitive before it is sent
    pub fn log_request(&self, slave_id: SlaveId, function: ModbusFunction, address: u16, quantity: u16) {
        if !self.should_log(LogLevel::Info) {
            return;
        }
        self.log_modes(
            || format!(
                "Modbus Request -> Slave: {}, Function: {}, Address: {}, Quantity: {}",
                slave_id, function, address, quantity
            ),
            || {
                let mut pdu = vec![function.to_u8()];
                pdu.extend_from_slice(&address.to_be_bytes());
                pdu.extend_from_slice(&quantity.to_be_bytes());
                format!("Modbus Request -> Raw: {} {}", slave_id, hex::encode_upper(pdu))
            },
        );
    }

    /// Log a register reply or the words of a register write
    pub fn log_registers(&self, slave_id: SlaveId, function: ModbusFunction, registers: &[u16]) {
        self.log_modes(
            || format!(
                "Modbus Response <- Slave: {}, Function: {}, Registers: {:?}",
                slave_id, function, &registers[..registers.len().min(8)]
            ),
            || format!("Modbus Response <- Raw: {}", format::registers_to_hex(registers)),
        );
    }

    /// Log a coil / discrete input reply or the bits of a coil write
    pub fn log_bits(&self, slave_id: SlaveId, function: ModbusFunction, bits: &[bool]) {
        self.log_modes(
            || format!(
                "Modbus Response <- Slave: {}, Function: {}, Coils: {:?}",
                slave_id, function, &bits[..bits.len().min(16)]
            ),
            || format!("Modbus Response <- Raw: {}", format::bits_to_string(bits)),
        );
    }

    /// Log decoded values at debug level
    pub fn log_values(&self, slave_id: SlaveId, values: &[TypedValue]) {
        if !self.should_log(LogLevel::Debug) {
            return;
        }
        let rendered = values.iter().map(|value| value.to_string()).collect::<Vec<_>>().join(", ");
        self.debug(&format!("Decoded <- Slave: {}, Values: [{}]", slave_id, rendered));
    }

    /// Log a failed dispatch
    pub fn log_error(&self, slave_id: SlaveId, function: ModbusFunction, error: &ModbusError) {
        self.error(&format!("Modbus Error <- Slave: {}, Function: {}, {}", slave_id, function, error));
    }
}

impl Default for CallbackLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Convenience macro for creating a simple console logger
#[macro_export]
macro_rules! console_logger {
    () => {
        $crate::logging::CallbackLogger::console()
    };
}

/// Convenience macro for creating a custom logger
#[macro_export]
macro_rules! custom_logger {
    ($callback:expr) => {
        $crate::logging::CallbackLogger::new(Some($callback), $crate::logging::LogLevel::Info)
    };
    ($callback:expr, $level:expr) => {
        $crate::logging::CallbackLogger::new(Some($callback), $level)
    };
    ($callback:expr, $level:expr, $mode:expr) => {
        $crate::logging::CallbackLogger::with_mode(Some($callback), $level, $mode)
    };
}
