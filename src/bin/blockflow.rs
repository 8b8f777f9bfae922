/// Blockflow CLI
///
/// Runs block projects from JSON with the reference scheduler and core
/// primitives.

use blockflow_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
