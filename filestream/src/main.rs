use anyhow::Context;
use clap::{Arg, Command};
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> anyhow::Result<bool> {
    let matches = Command::new("File Stream Source")
        .version("0.1")
        .about("Discovers and reads record streams from files in object storage")
        .subcommand_required(true)
        .subcommand(
            Command::new("check")
                .about("Check that every configured stream can be read")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("discover")
                .about("Infer the schema of every configured stream")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("read")
                .about("Read records from the configured streams")
                .arg(config_arg())
                .arg(
                    Arg::new("catalog")
                        .long("catalog")
                        .value_name("FILE")
                        .help("Catalog whose schemas validate records; discovered when omitted"),
                )
                .arg(
                    Arg::new("state")
                        .long("state")
                        .value_name("FILE")
                        .help("Stream state from a previous sync"),
                )
                .arg(
                    Arg::new("stream")
                        .long("stream")
                        .value_name("NAME")
                        .help("Only read this stream"),
                ),
        )
        .get_matches();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let (command, sub_matches) = matches
        .subcommand()
        .context("No subcommand specified. Use --help for usage information.")?;
    let config_path = sub_matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/filestream.toml");

    let succeeded = match command {
        "check" => filestream::run_check(config_path, &mut out)
            .await
            .context("check failed")?,
        "discover" => {
            filestream::run_discover(config_path, &mut out)
                .await
                .context("discover failed")?;
            true
        }
        "read" => {
            filestream::run_read(
                config_path,
                sub_matches.get_one::<String>("catalog").map(|s| s.as_str()),
                sub_matches.get_one::<String>("state").map(|s| s.as_str()),
                sub_matches.get_one::<String>("stream").map(|s| s.as_str()),
                &mut out,
            )
            .await
            .context("read failed")?;
            true
        }
        other => anyhow::bail!("Unknown subcommand: {}", other),
    };

    out.flush()?;
    Ok(succeeded)
}

#[tokio::main]
async fn main() {
    init_tracing();

    match run().await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
