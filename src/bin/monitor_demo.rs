//! Voltage Modbus Typed monitor demo
//!
//! Polls a simulated device whose holding registers hold a drifting
//! temperature as FLOAT32. Stop with Ctrl+C.
//!
//! Usage: monitor_demo [interval_ms] [repeat_count] [value_type] [swap_bytes] [swap_words] [trace]
//!
//! With `trace` set to `true` every request and reply is printed as well.

use std::time::Duration;

use voltage_modbus_typed::codec::{encode_values, ByteOrderFlags, ValueType};
use voltage_modbus_typed::monitor::{cancel_pair, MonitorConfig, PollEvent, PollMonitor};
use voltage_modbus_typed::{console_logger, BankClient, ModbusRegisterBank, ReadTarget, RegisterKind, TypedClient};

const SLAVE_ID: u8 = 1;
const TEMPERATURE_ADDRESS: u16 = 100;

fn arg_or<T: std::str::FromStr>(index: usize, default: T) -> T {
    std::env::args().nth(index).and_then(|arg| arg.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("🚀 Voltage Modbus Typed Monitor Demo");
    println!("====================================");

    let config = MonitorConfig {
        interval_ms: arg_or(1, voltage_modbus_typed::DEFAULT_POLL_INTERVAL_MS),
        repeat_count: arg_or(2, 0),
    };
    let value_type: ValueType = std::env::args()
        .nth(3)
        .map(|tag| tag.parse())
        .transpose()?
        .unwrap_or(ValueType::Float32);
    let flags = ByteOrderFlags::new(arg_or(4, false), arg_or(5, false));
    println!("Interval: {} ms, repeat: {}, byte order: {}", config.interval_ms, config.repeat_count, flags);

    // Simulated device
    let bank = ModbusRegisterBank::new();
    let device = bank.clone();
    tokio::spawn(async move {
        let mut tick: u32 = 0;
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            let temperature = 21.0 + (tick as f32 * 0.1).sin() * 3.0;
            if let Err(e) = device.write_10(TEMPERATURE_ADDRESS, &encode_values(&[temperature], flags)) {
                eprintln!("❌ Simulator update failed: {}", e);
                break;
            }
            tick = tick.wrapping_add(1);
        }
    });

    let transport = BankClient::new(bank, SLAVE_ID).with_latency(Duration::from_millis(20));
    let mut client = TypedClient::new(transport, flags);
    if arg_or(6, false) {
        client = client.with_logger(console_logger!());
    }
    let target = ReadTarget::new(RegisterKind::HoldingRegister, SLAVE_ID, TEMPERATURE_ADDRESS, 1).with_type(value_type);

    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Received Ctrl+C, stopping monitor...");
            handle.cancel();
        }
    });

    let mut monitor = PollMonitor::new(config);
    let result = monitor
        .run_target(&token, &mut client, target, |event| match event {
            PollEvent::Sample { header, value, .. } => {
                if let Some(header) = header {
                    println!("\n📊 {}", header);
                }
                println!("[{}] {}", chrono::Local::now().format("%H:%M:%S%.3f"), value);
            },
            PollEvent::Overrun { elapsed, interval, .. } => {
                println!("⚠️  Iteration took {:?}, longer than the {:?} interval", elapsed, interval);
            },
        })
        .await;

    println!("📨 {} call(s) in the transport log", client.client().call_count());
    client.client_mut().clear_calls();

    match result {
        Ok(summary) => {
            println!("\n✅ Completed {} read(s) in {:?}", summary.iterations, summary.elapsed);
            println!("{}", voltage_modbus_typed::utils::format::format_metrics(&summary.metrics));
        },
        Err(e) if e.is_cancelled() => println!("✅ {}", e),
        Err(e) => {
            eprintln!("❌ Monitor failed: {}", e);
            std::process::exit(e.kind().exit_code());
        },
    }

    Ok(())
}
