use clap::Parser;
use ramp_ai_chunk::extract_units;
use std::fs;
use std::io::{self, Read};
use std::process;

/// A CLI tool to extract Python code units from a file as JSON output.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input Python file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// File path to record as the units' provenance.
    #[arg(short, long)]
    filename: Option<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let source = if let Some(ref input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let filename = args
        .filename
        .or(args.input)
        .unwrap_or_else(|| "<stdin>".to_string());

    let units = extract_units(&source, &filename)?;
    println!("{}", serde_json::to_string_pretty(&units)?);

    Ok(())
}
