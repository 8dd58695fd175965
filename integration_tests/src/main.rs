//! Integration tests for lora-serial-link firmware.
//!
//! Run after flashing two devices. Each port is the bridged UART of one
//! device; bytes written to one must come out of the other.

mod device;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use device::{list_ports, DeviceClient};
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Two-device integration tests for lora-serial-link firmware")]
struct Args {
    /// Bridged serial port of device A
    #[arg(long, required_unless_present = "list")]
    port_a: Option<String>,

    /// Bridged serial port of device B
    #[arg(long, required_unless_present = "list")]
    port_b: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// List serial ports and exit
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.list {
        for port in list_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let (Some(port_a), Some(port_b)) = (args.port_a, args.port_b) else {
        anyhow::bail!("Both --port-a and --port-b are required");
    };

    println!("{}", "LoRa Serial Link Integration Tests".bold());
    println!("Device A: {}", port_a);
    println!("Device B: {}", port_b);
    println!("Baud: {}", args.baud);
    println!();

    println!("Connecting to devices...");
    let mut device_a = DeviceClient::new(&port_a, args.baud)?;
    let mut device_b = DeviceClient::new(&port_b, args.baud)?;

    // Each device announces itself with a startup packet the other forwards
    println!("Waiting for startup traffic to finish...");
    let drained_a = device_a.drain_buffer(Duration::from_millis(1000))?;
    let drained_b = device_b.drain_buffer(Duration::from_millis(1000))?;
    println!(
        "{} (discarded {} bytes on {}, {} bytes on {})",
        "Connected to both devices!".green(),
        drained_a,
        device_a.name(),
        drained_b,
        device_b.name()
    );

    println!("\nRunning tests...\n");

    let results = run_all_tests(&mut device_a, &mut device_b);
    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
