mod cmd;

use anyhow::Result;
use std::env;
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    if let Err(e) = entry() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("OCCLOUD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn entry() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        return cmd::help::run();
    };

    match command.as_str() {
        "login" => cmd::login::run(rest),
        "logout" => cmd::logout::run(rest),
        "accounts" => cmd::accounts::run(rest),
        "ls" => cmd::ls::run(rest),
        "help" | "-h" | "--help" => cmd::help::run(),
        "-V" | "--version" => {
            println!("occloud {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow::anyhow!(
            "unknown command: {other}\nRun `occloud help` for usage"
        )),
    }
}
