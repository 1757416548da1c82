/// Utility functions and helpers for typed Modbus operations
///
/// This module contains the bounds validator applied before every transport
/// call, formatting helpers, and the timing primitives used by the poll
/// monitor.

use std::time::Duration;
use tokio::time::Instant;
use log::debug;

/// Performance metrics for Modbus operations
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_duration: Duration,
    pub min_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    pub avg_duration: Duration,
}

impl PerformanceMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful operation
    pub fn record_success(&mut self, duration: Duration) {
        self.successful_requests += 1;
        self.min_duration = Some(self.min_duration.map_or(duration, |min| min.min(duration)));
        self.max_duration = Some(self.max_duration.map_or(duration, |max| max.max(duration)));
        self.record(duration);
    }

    /// Record a failed operation
    pub fn record_failure(&mut self, duration: Duration) {
        self.failed_requests += 1;
        self.record(duration);
    }

    fn record(&mut self, duration: Duration) {
        self.total_requests += 1;
        self.total_duration += duration;
        self.avg_duration = self.total_duration / self.total_requests.min(u32::MAX as u64) as u32;
    }

    /// Get success rate as percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        (self.successful_requests as f64 / self.total_requests as f64) * 100.0
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Timer for measuring operation duration
///
/// Backed by the tokio clock, so a paused test runtime controls it.
pub struct OperationTimer {
    start: Instant,
    operation_name: String,
}

impl OperationTimer {
    /// Start a new timer
    pub fn start(operation_name: &str) -> Self {
        debug!("Starting operation: {}", operation_name);
        Self {
            start: Instant::now(),
            operation_name: operation_name.to_string(),
        }
    }

    /// Time since the timer started, without stopping it
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        debug!("Operation '{}' completed in {:?}", self.operation_name, duration);
        duration
    }
}

/// Request bounds validation
///
/// Every check runs before any transport call. Limits come from the Modbus
/// PDU size: 2000 bits or 125 registers per read, 1968 bits or 123
/// registers per multiple write.
pub mod validation {
    use crate::codec::ValueType;
    use crate::error::{ModbusResult, ValidationError};
    use crate::{MAX_COILS_PER_REQUEST, MAX_REGISTERS_PER_REQUEST, MAX_WRITE_COILS, MAX_WRITE_REGISTERS};

    /// Validate coil / discrete input read count (1-2000)
    pub fn validate_coil_count(count: u16) -> ModbusResult<()> {
        if count == 0 {
            return Err(ValidationError::ZeroCount.into());
        }
        if count > MAX_COILS_PER_REQUEST {
            return Err(ValidationError::CoilCount { count, max: MAX_COILS_PER_REQUEST }.into());
        }
        Ok(())
    }

    /// Validate raw register read count (1-125)
    pub fn validate_register_count(count: u16) -> ModbusResult<()> {
        if count == 0 {
            return Err(ValidationError::ZeroCount.into());
        }
        if count > MAX_REGISTERS_PER_REQUEST {
            return Err(ValidationError::RegisterCount { count, max: MAX_REGISTERS_PER_REQUEST }.into());
        }
        Ok(())
    }

    /// Validate a typed read and return the registers it spans
    ///
    /// # Arguments
    ///
    /// * `value_type` - Requested interpretation
    /// * `count` - Elements for numeric types, bytes / characters for packed types
    ///
    /// # Returns
    ///
    /// Number of registers the request reads, at most 125
    pub fn validate_typed_count(value_type: ValueType, count: u16) -> ModbusResult<u16> {
        if count == 0 {
            return Err(ValidationError::ZeroCount.into());
        }
        if value_type == ValueType::Bits16 && count > 1 {
            return Err(ValidationError::Bits16Count { count: count as usize }.into());
        }

        let registers = value_type.registers_for(count);
        if registers > MAX_REGISTERS_PER_REQUEST as u32 {
            return Err(ValidationError::TypedRegisterCount {
                value_type,
                count,
                registers,
                max: MAX_REGISTERS_PER_REQUEST,
            }.into());
        }
        Ok(registers as u16)
    }

    /// Validate coil write count (1-1968)
    pub fn validate_write_coil_count(count: usize) -> ModbusResult<()> {
        if count == 0 {
            return Err(ValidationError::EmptyWrite.into());
        }
        if count > MAX_WRITE_COILS as usize {
            return Err(ValidationError::WriteCoilCount { count, max: MAX_WRITE_COILS }.into());
        }
        Ok(())
    }

    /// Validate register write count (1-123)
    pub fn validate_write_register_count(count: usize) -> ModbusResult<()> {
        if count == 0 {
            return Err(ValidationError::EmptyWrite.into());
        }
        if count > MAX_WRITE_REGISTERS as usize {
            return Err(ValidationError::WriteRegisterCount { count, max: MAX_WRITE_REGISTERS }.into());
        }
        Ok(())
    }

    /// Validate that `registers` elements starting at `start` stay inside
    /// the 16-bit address space
    pub fn validate_address_range(start: u16, registers: u32) -> ModbusResult<()> {
        if start as u32 + registers > 0x10000 {
            return Err(ValidationError::AddressOverflow { start, registers }.into());
        }
        Ok(())
    }
}

/// Formatting and display utilities
pub mod format {
    use super::*;

    /// Format byte array as hex string
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format register values as hex
    pub fn registers_to_hex(registers: &[u16]) -> String {
        registers.iter()
            .map(|r| format!("{:04X}", r))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format coils as a compact `0`/`1` string, first coil on the left
    pub fn bits_to_string(bits: &[bool]) -> String {
        bits.iter().map(|&bit| if bit { '1' } else { '0' }).collect()
    }

    /// Format duration in a human-readable way
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis < 1000 {
            format!("{}ms", millis)
        } else if millis < 60_000 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            let mins = millis / 60_000;
            let secs = (millis % 60_000) as f64 / 1000.0;
            format!("{}m {:.1}s", mins, secs)
        }
    }

    /// Format performance metrics as a table
    pub fn format_metrics(metrics: &PerformanceMetrics) -> String {
        format!(
            "Poll Metrics:\n\
             ├─ Total Reads: {}\n\
             ├─ Successful: {} ({:.1}%)\n\
             ├─ Failed: {}\n\
             ├─ Average Duration: {}\n\
             ├─ Min Duration: {}\n\
             └─ Max Duration: {}",
            metrics.total_requests,
            metrics.successful_requests,
            metrics.success_rate(),
            metrics.failed_requests,
            format_duration(metrics.avg_duration),
            metrics.min_duration.map_or("N/A".to_string(), format_duration),
            metrics.max_duration.map_or("N/A".to_string(), format_duration),
        )
    }
}

/// Logging utilities
pub mod logging {
    use super::*;
    use crate::protocol::{ModbusFunction, SlaveId};

    /// Initialize simple logger for testing
    pub fn init_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// Trace one dispatched transport call
    pub fn log_dispatch(
        slave_id: SlaveId,
        function: ModbusFunction,
        address: u16,
        quantity: usize,
        duration: Duration,
        success: bool,
    ) {
        let status = if success { "✅" } else { "❌" };
        debug!(
            "{} Slave {} {} @ {} x{} | Duration: {}",
            status,
            slave_id,
            function,
            address,
            quantity,
            format::format_duration(duration)
        );
    }
}
