//! Integration tests for the eggplot listener.
//!
//! Run against a flashed board to exercise the serial protocol end to end.

mod tests;

use clap::Parser;
use colored::Colorize;

use eggplot_host::port::NativePort;
use eggplot_host::Session;

use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "On-device tests for the eggplot listener")]
struct Args {
    /// Serial port of the plotter
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("{}", "Eggplot Integration Tests".bold());
    println!("Port: {}", args.port);
    println!("Baud: {}", args.baud);
    println!();

    println!("Connecting to listener...");
    let port = NativePort::open(&args.port, args.baud)?;
    let mut session = Session::with_port(port);

    // Let the board's bootloader finish chattering before the first sync.
    std::thread::sleep(std::time::Duration::from_secs(1));
    session.synchronize()?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");

    let results = run_all_tests(&mut session);
    print_results(&results);

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
