use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use fluxcell::{convert, registry::Algorithm};
use tracing_subscriber::EnvFilter;

/// Recover bitcells from a FlashFloppy sample file and write an HFE image.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Little-endian 16-bit flux transition samples.
    #[arg(required_unless_present = "list")]
    samples: Option<PathBuf>,

    /// Directory for the image and data log.
    #[arg(required_unless_present = "list")]
    out_dir: Option<PathBuf>,

    /// Data rate of the written track, in kbps.
    #[arg(required_unless_present = "list", value_parser = clap::value_parser!(u16).range(1..))]
    bitrate_kbps: Option<u16>,

    /// Algorithm, as `name` or `name[key=value,...]`.
    #[arg(required_unless_present = "list")]
    algorithm: Option<String>,

    /// Also write the phase error of each edge as CSV.
    #[arg(long)]
    data_log: bool,

    /// List algorithms and their parameters.
    #[arg(long)]
    list: bool,
}

fn list() {
    println!("Algorithms:");

    for algorithm in Algorithm::ALL {
        println!("\t* {algorithm}");

        for p in algorithm.parameters() {
            let required = if p.required { "required" } else { "" };
            println!("\t\t{:<20}    {:>8}    {}", p.name, required, p.description);
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let (Some(samples), Some(out_dir), Some(bitrate_kbps), Some(algorithm)) =
        (args.samples, args.out_dir, args.bitrate_kbps, args.algorithm)
    else {
        anyhow::bail!("Missing arguments.");
    };

    let image = convert::convert_file(&samples, &out_dir, bitrate_kbps, &algorithm, args.data_log)
        .with_context(|| format!("Failed to convert {}.", samples.display()))?;

    match image {
        Some(path) => println!("Wrote {}", path.display()),
        None => println!("No bitcells decoded, no image written"),
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list {
        list();
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}
