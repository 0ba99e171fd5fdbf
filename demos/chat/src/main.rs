//! Loopback chat demo.
//!
//! Runs both transfer roles in one process over the in-memory stack:
//! every line typed on stdin is staged on the peripheral, advertised,
//! streamed chunk by chunk to the central, and printed once reassembled.
//! Run with `RUST_LOG`-style verbosity via `--verbose` to watch the
//! individual chunks go by.

use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing::Level;

use gatt_transfer::TransferConfig;
use gatt_transfer::loopback::{DEFAULT_QUEUE_CAPACITY, LoopbackHarness};

#[derive(Debug, Parser)]
#[command(name = "chat", about = "Chunked transfer between two in-process BLE roles")]
struct Args {
    /// Chunk size in bytes
    #[arg(long, default_value_t = gatt_transfer::NOTIFY_MTU)]
    mtu: usize,

    /// Capacity of the simulated notification queue; smaller values force
    /// more backpressure
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue: usize,

    /// Log every chunk as it is sent and received
    #[arg(short, long)]
    verbose: bool,

    /// Message to transfer; reads stdin line by line when omitted
    message: Option<String>,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = TransferConfig::default().with_mtu(args.mtu);
    let mut link = LoopbackHarness::with_queue_capacity(config, args.queue);
    link.power_on();

    if let Some(message) = args.message {
        deliver(&mut link, &message);
        return Ok(());
    }

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        deliver(&mut link, &line?);
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

fn deliver(link: &mut LoopbackHarness, message: &str) {
    match link.transfer(message) {
        Some(received) => println!("<- {received}"),
        None => eprintln!("transfer did not complete"),
    }
}
