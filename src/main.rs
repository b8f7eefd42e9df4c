use clap::Parser;
use std::process;

use milomcp_console::cli::{self, Cli};

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli).await {
        eprintln!("Error ({}): {}", e.kind(), e);
        process::exit(1);
    }
}
