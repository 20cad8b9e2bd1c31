use std::env;
use std::num::ParseIntError;
use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use efas_discharge::{discharge, CdsClient, DataClient};

fn parse_year(raw: &str) -> Result<i32, ParseIntError> {
    raw.parse()
}

fn status_line(year: i32) -> String {
    format!("downloading year {year}")
}

/// Always the full domain: CDS cropping is broken for EFAS 4.0, so the
/// cropped path stays disabled (see discharge::cropped_request).
fn run(client: &impl DataClient, year: i32, out_dir: &Path) -> efas_discharge::Result<String> {
    match discharge::retrieve_full(client, year, out_dir)? {
        Some(result) => Ok(format!(
            "Downloaded {bytes} bytes to {target}",
            bytes = result.size_bytes,
            target = result.target.display()
        )),
        None => Ok(format!(
            "{} already exists, nothing to do",
            discharge::output_filename(year, discharge::Coverage::Full)
        )),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(raw_year) = args.get(1) else {
        eprintln!("Usage: efas-discharge <year>\n\nExample:\n  efas-discharge 2019");
        process::exit(2);
    };

    // Rejected before any client is constructed.
    let year = match parse_year(raw_year) {
        Ok(y) => y,
        Err(_) => {
            eprintln!("not a year: {raw_year}");
            process::exit(2);
        }
    };

    println!("{}", status_line(year));

    let client = match CdsClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("cannot create CDS client: {e}");
            process::exit(1);
        }
    };

    match run(&client, year, Path::new(".")) {
        Ok(line) => println!("{line}"),
        Err(e) => {
            eprintln!("retrieve failed: {e}");
            process::exit(1);
        }
    }
}
