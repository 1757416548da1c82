//! # Poll Monitor
//!
//! Repeats one read at a fixed wall-clock interval until a repeat count is
//! reached or the caller cancels.
//!
//! Each iteration performs exactly one read through a [`PollSource`], hands
//! the result to an `emit` callback, then waits out whatever is left of the
//! interval, so reads start `interval` apart no matter how long the callback
//! takes. An iteration slower than the interval produces a
//! [`PollEvent::Overrun`] warning and the next read starts at once.
//!
//! Cancellation is cooperative: it is observed before a read starts and
//! during the wait between reads, never in the middle of a read. A read that
//! is itself cancelled reports its own error.
//!
//! ```rust
//! use voltage_modbus_typed::codec::{ByteOrderFlags, ValueType};
//! use voltage_modbus_typed::dispatch::{ReadTarget, TypedClient};
//! use voltage_modbus_typed::monitor::{cancel_pair, MonitorConfig, MonitorState, PollEvent, PollMonitor};
//! use voltage_modbus_typed::protocol::RegisterKind;
//! use voltage_modbus_typed::register_bank::{BankClient, ModbusRegisterBank};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> voltage_modbus_typed::ModbusResult<()> {
//! let mut client = TypedClient::new(BankClient::new(ModbusRegisterBank::new(), 1), ByteOrderFlags::default());
//! let target = ReadTarget::new(RegisterKind::HoldingRegister, 1, 0, 2).with_type(ValueType::Float32);
//!
//! let (_handle, token) = cancel_pair();
//! let mut monitor = PollMonitor::new(MonitorConfig { interval_ms: 10, repeat_count: 3 });
//! let summary = monitor
//!     .run_target(&token, &mut client, target, |event| {
//!         if let PollEvent::Sample { value, .. } = event {
//!             println!("{}", value);
//!         }
//!     })
//!     .await?;
//!
//! assert_eq!(summary.iterations, 3);
//! assert_eq!(monitor.state(), MonitorState::Completed);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::client::ModbusClient;
use crate::dispatch::{ReadTarget, Reading, TypedClient};
use crate::error::{ModbusError, ModbusResult};
use crate::utils::{OperationTimer, PerformanceMetrics};

/// Poll loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Target time between the starts of two reads
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Number of reads, 0 polls until cancelled
    #[serde(default)]
    pub repeat_count: u64,
}

fn default_interval_ms() -> u64 {
    crate::DEFAULT_POLL_INTERVAL_MS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            repeat_count: 0,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn is_bounded(&self) -> bool {
        self.repeat_count > 0
    }
}

/// Lifecycle of a [`PollMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl MonitorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MonitorState::Completed | MonitorState::Cancelled | MonitorState::Failed)
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
            MonitorState::Completed => "completed",
            MonitorState::Cancelled => "cancelled",
            MonitorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bookkeeping of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSession {
    pub interval: Duration,
    /// 0 means unbounded
    pub repeat_count: u64,
    /// Reads left in bounded mode
    pub remaining: u64,
    /// Reads completed
    pub iterations: u64,
    /// Reads that took longer than the interval
    pub overruns: u64,
    pub elapsed_since_start: Duration,
    pub header_printed: bool,
}

impl PollSession {
    fn new(config: &MonitorConfig) -> Self {
        Self {
            interval: config.interval(),
            repeat_count: config.repeat_count,
            remaining: config.repeat_count,
            iterations: 0,
            overruns: 0,
            elapsed_since_start: Duration::ZERO,
            header_printed: false,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.repeat_count > 0
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct PollSummary {
    pub iterations: u64,
    pub overruns: u64,
    pub elapsed: Duration,
    /// Read durations
    pub metrics: PerformanceMetrics,
}

/// Something the monitor reports to its caller
#[derive(Debug)]
pub enum PollEvent<'a, T> {
    /// A read completed. `header` is set on the first sample only;
    /// `elapsed` is the read time.
    Sample {
        iteration: u64,
        header: Option<&'a str>,
        value: &'a T,
        elapsed: Duration,
    },
    /// Read and emit took longer than the interval; no time is left
    /// between reads
    Overrun {
        iteration: u64,
        elapsed: Duration,
        interval: Duration,
    },
}

/// One read per call, performed by the monitor on every iteration
#[async_trait]
pub trait PollSource: Send {
    type Output: Send;

    async fn poll_once(&mut self) -> ModbusResult<Self::Output>;

    /// Text shown above the first sample
    fn header(&self) -> String {
        String::new()
    }
}

/// Polls a [`ReadTarget`] through a borrowed [`TypedClient`]
pub struct TargetPoller<'a, C: ModbusClient> {
    client: &'a mut TypedClient<C>,
    target: ReadTarget,
}

impl<'a, C: ModbusClient> TargetPoller<'a, C> {
    pub fn new(client: &'a mut TypedClient<C>, target: ReadTarget) -> Self {
        Self { client, target }
    }
}

#[async_trait]
impl<'a, C: ModbusClient> PollSource for TargetPoller<'a, C> {
    type Output = Reading;

    async fn poll_once(&mut self) -> ModbusResult<Reading> {
        self.client.read(&self.target).await
    }

    fn header(&self) -> String {
        self.target.header()
    }
}

/// Requests cancellation of every token built from it
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation. Calling it again has no further effect.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// A new token observing this handle
    pub fn token(&self) -> CancelToken {
        CancelToken { receiver: self.sender.subscribe() }
    }
}

/// Observes a [`CancelHandle`]
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested.
    ///
    /// Pends forever if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Build a connected handle and token
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender: Arc::new(sender) }, CancelToken { receiver })
}

/// Fixed-interval poll loop
///
/// The monitor itself is reusable; each [`run`](Self::run) starts a fresh
/// [`PollSession`].
#[derive(Debug)]
pub struct PollMonitor {
    config: MonitorConfig,
    state: MonitorState,
    session: Option<PollSession>,
}

impl PollMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config, state: MonitorState::Idle, session: None }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Bookkeeping of the current or last run
    pub fn session(&self) -> Option<&PollSession> {
        self.session.as_ref()
    }

    /// Poll `source` until the repeat count is reached or `cancel` fires
    ///
    /// # Returns
    ///
    /// * `Ok(PollSummary)` after the last bounded read, state `Completed`
    /// * `Err(ModbusError::Cancelled)` when cancelled before a read or while
    ///   waiting, state `Cancelled`
    /// * the read's own error, unchanged, state `Failed` (or `Cancelled` if
    ///   that error is a cancellation)
    pub async fn run<S, F>(&mut self, cancel: &CancelToken, source: &mut S, mut emit: F) -> ModbusResult<PollSummary>
    where
        S: PollSource + ?Sized,
        F: FnMut(PollEvent<'_, S::Output>),
    {
        let started = Instant::now();
        let header = source.header();
        let mut metrics = PerformanceMetrics::new();
        let mut session = PollSession::new(&self.config);
        self.state = MonitorState::Running;
        info!(
            "Poll monitor started: interval {:?}, repeat {}",
            session.interval,
            if session.is_bounded() { session.repeat_count.to_string() } else { "until cancelled".to_string() }
        );

        let outcome = poll_loop(cancel, source, &header, &mut session, &mut metrics, &mut emit).await;

        session.elapsed_since_start = started.elapsed();
        let iterations = session.iterations;
        let overruns = session.overruns;
        self.session = Some(session);

        match outcome {
            Ok(()) => {
                self.state = MonitorState::Completed;
                info!("Poll monitor completed after {} read(s)", iterations);
                Ok(PollSummary { iterations, overruns, elapsed: started.elapsed(), metrics })
            },
            Err(error) => {
                self.state = if error.is_cancelled() { MonitorState::Cancelled } else { MonitorState::Failed };
                info!("Poll monitor {} after {} read(s): {}", self.state, iterations, error);
                Err(error)
            },
        }
    }

    /// Poll a [`ReadTarget`] through `client`
    pub async fn run_target<C, F>(
        &mut self,
        cancel: &CancelToken,
        client: &mut TypedClient<C>,
        target: ReadTarget,
        emit: F,
    ) -> ModbusResult<PollSummary>
    where
        C: ModbusClient,
        F: FnMut(PollEvent<'_, Reading>),
    {
        let mut poller = TargetPoller::new(client, target);
        self.run(cancel, &mut poller, emit).await
    }
}

async fn poll_loop<S, F>(
    cancel: &CancelToken,
    source: &mut S,
    header: &str,
    session: &mut PollSession,
    metrics: &mut PerformanceMetrics,
    emit: &mut F,
) -> ModbusResult<()>
where
    S: PollSource + ?Sized,
    F: FnMut(PollEvent<'_, S::Output>),
{
    let interval = session.interval;
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return Err(ModbusError::cancelled(session.iterations));
        }

        let iteration_start = Instant::now();
        let timer = OperationTimer::start("poll read");
        let result = source.poll_once().await;
        let read_time = timer.stop();
        let value = match result {
            Ok(value) => {
                metrics.record_success(read_time);
                value
            },
            Err(error) => {
                metrics.record_failure(read_time);
                return Err(error);
            },
        };

        session.iterations += 1;
        let iteration = session.iterations;
        let show_header = !session.header_printed;
        session.header_printed = true;

        emit(PollEvent::Sample {
            iteration,
            header: if show_header { Some(header) } else { None },
            value: &value,
            elapsed: read_time,
        });

        // the interval covers the read and the emit
        let elapsed = iteration_start.elapsed();
        let delay = match interval.checked_sub(elapsed) {
            Some(delay) => delay,
            None => {
                session.overruns += 1;
                warn!("No time between reads: read {} took {:?}, interval is {:?}", iteration, elapsed, interval);
                emit(PollEvent::Overrun { iteration, elapsed, interval });
                Duration::ZERO
            },
        };

        session.elapsed_since_start = started.elapsed();
        if session.is_bounded() {
            session.remaining = session.remaining.saturating_sub(1);
            if session.remaining == 0 {
                return Ok(());
            }
        }

        if !delay.is_zero() {
            debug!("Next read in {:?}", delay);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ModbusError::cancelled(iteration)),
                _ = tokio::time::sleep(delay) => {},
            }
        } else {
            // nothing else suspends when the source never awaits
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts reads and takes `latency` per read
    struct CountingSource {
        latency: Duration,
        reads: u64,
        fail_at: Option<u64>,
    }

    impl CountingSource {
        fn new(latency_ms: u64) -> Self {
            Self { latency: Duration::from_millis(latency_ms), reads: 0, fail_at: None }
        }
    }

    #[async_trait]
    impl PollSource for CountingSource {
        type Output = u64;

        async fn poll_once(&mut self) -> ModbusResult<u64> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.reads += 1;
            if self.fail_at == Some(self.reads) {
                return Err(ModbusError::timeout("read", 200));
            }
            Ok(self.reads)
        }

        fn header(&self) -> String {
            "counter".to_string()
        }
    }

    fn config(interval_ms: u64, repeat_count: u64) -> MonitorConfig {
        MonitorConfig { interval_ms, repeat_count }
    }

    #[tokio::test]
    async fn test_cancel_pair() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(token.is_cancelled());
        assert!(handle.token().is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_token_does_not_fire() {
        let token = CancelToken::never();
        let fired = tokio::time::timeout(Duration::from_secs(60), token.cancelled()).await;
        assert!(fired.is_err());
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run_completes() {
        let mut monitor = PollMonitor::new(config(1000, 3));
        let mut source = CountingSource::new(100);
        let mut headers = Vec::new();
        let mut samples = Vec::new();

        let summary = monitor
            .run(&CancelToken::never(), &mut source, |event| {
                if let PollEvent::Sample { header, value, .. } = event {
                    headers.push(header.map(str::to_string));
                    samples.push(*value);
                }
            })
            .await
            .unwrap();

        assert_eq!(summary.iterations, 3);
        assert_eq!(source.reads, 3);
        assert_eq!(samples, vec![1, 2, 3]);
        assert_eq!(headers, vec![Some("counter".to_string()), None, None]);
        assert_eq!(monitor.state(), MonitorState::Completed);

        let session = monitor.session().unwrap();
        assert_eq!(session.remaining, 0);
        assert!(session.header_printed);
        // two full waits, no wait after the last read
        assert!(summary.elapsed >= Duration::from_millis(2100));
        assert!(summary.elapsed < Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_read() {
        let (handle, token) = cancel_pair();
        handle.cancel();

        let mut monitor = PollMonitor::new(config(1000, 0));
        let mut source = CountingSource::new(10);
        let err = monitor.run(&token, &mut source, |_| {}).await.unwrap_err();

        assert_eq!(err, ModbusError::cancelled(0));
        assert_eq!(source.reads, 0);
        assert_eq!(monitor.state(), MonitorState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_fails_run() {
        let mut monitor = PollMonitor::new(config(100, 0));
        let mut source = CountingSource::new(10);
        source.fail_at = Some(2);

        let err = monitor.run(&CancelToken::never(), &mut source, |_| {}).await.unwrap_err();
        assert_eq!(err, ModbusError::timeout("read", 200));
        assert_eq!(monitor.state(), MonitorState::Failed);
        assert_eq!(monitor.session().unwrap().iterations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let (handle, token) = cancel_pair();
        let mut monitor = PollMonitor::new(config(60_000, 0));
        let mut source = CountingSource::new(5);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            handle.cancel();
        });

        let started = Instant::now();
        let err = monitor.run(&token, &mut source, |_| {}).await.unwrap_err();
        assert_eq!(err, ModbusError::cancelled(2));
        assert_eq!(source.reads, 2);
        // cancelled mid-wait, well before the third read was due
        assert!(started.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_slow_emit_does_not_stretch_interval() {
        let mut monitor = PollMonitor::new(config(120, 3));
        let mut source = CountingSource::new(0);
        let mut sampled_at = Vec::new();

        monitor
            .run(&CancelToken::never(), &mut source, |event| {
                if let PollEvent::Sample { .. } = event {
                    sampled_at.push(std::time::Instant::now());
                    std::thread::sleep(Duration::from_millis(60));
                }
            })
            .await
            .unwrap();

        assert_eq!(sampled_at.len(), 3);
        for pair in sampled_at.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(110), "gap {:?}", gap);
            assert!(gap < Duration::from_millis(170), "gap {:?}", gap);
        }
        assert_eq!(monitor.session().unwrap().overruns, 0);
    }

    #[tokio::test]
    async fn test_emit_longer_than_interval_overruns() {
        let mut monitor = PollMonitor::new(config(20, 2));
        let mut source = CountingSource::new(0);
        let mut overruns = Vec::new();

        let summary = monitor
            .run(&CancelToken::never(), &mut source, |event| match event {
                PollEvent::Sample { .. } => std::thread::sleep(Duration::from_millis(40)),
                PollEvent::Overrun { iteration, elapsed, .. } => overruns.push((iteration, elapsed)),
            })
            .await
            .unwrap();

        assert_eq!(summary.overruns, 2);
        assert_eq!(overruns.len(), 2);
        assert!(overruns.iter().all(|(_, elapsed)| *elapsed >= Duration::from_millis(40)));
    }

    #[tokio::test]
    async fn test_zero_interval_yields_to_canceller() {
        let (handle, token) = cancel_pair();
        let mut monitor = PollMonitor::new(config(0, 0));
        let mut source = CountingSource::new(0);

        tokio::spawn(async move {
            handle.cancel();
        });

        let err = monitor.run(&token, &mut source, |_| {}).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(source.reads >= 1);
        assert_eq!(monitor.state(), MonitorState::Cancelled);
    }

    #[test]
    fn test_config_defaults() {
        let config: MonitorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert!(!config.is_bounded());
        assert!(MonitorState::Failed.is_terminal());
        assert!(!MonitorState::Running.is_terminal());
    }
}
