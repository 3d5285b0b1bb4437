mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use apollo_vendor::device::{
    sim::{SimulatedBoard, SimulatedEndpoint, TransferOutcome},
    vendor::{
        table::{data_handler, finish_handler, setup_handler},
        VendorRequestCode,
    },
};

fn main() -> Result<()> {
    let args = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    if args.list {
        print_opcode_table();
        return Ok(());
    }

    let request = args.vendor_request()?;
    let board = SimulatedBoard::new();
    let mut dispatcher = board.dispatcher();
    let mut endpoint = SimulatedEndpoint::new();

    info!("Replaying {:?}", request);
    match endpoint.run(&mut dispatcher, &request, args.payload()) {
        TransferOutcome::Completed { response } => {
            println!("completed, {} byte response: {}", response.len(), hex(&response));
            if let Ok(text) = std::str::from_utf8(&response) {
                println!("  as text: {:?}", text);
            }
        }
        TransferOutcome::Stalled { stage } => println!("stalled in the {} stage", stage),
    }

    println!("hardware state: {:#?}", board.state());
    for event in board.events() {
        println!("  {:?}", event);
    }

    Ok(())
}

fn print_opcode_table() {
    let mark = |served: bool| if served { "x" } else { "-" };

    println!("code  {:<24} {:<13} setup data finish", "request", "group");
    for code in VendorRequestCode::ALL {
        println!(
            "{:#04x}  {:<24} {:<13} {:<5} {:<4} {}",
            u8::from(code),
            format!("{:?}", code),
            format!("{:?}", code.group()),
            mark(setup_handler(code).is_some()),
            mark(data_handler(code).is_some()),
            mark(finish_handler(code).is_some()),
        );
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
