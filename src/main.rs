//! mcp-mitm-proxy CLI entry point.

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("error: cli feature not enabled. Build with --features cli");
    std::process::exit(1);
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    use clap::Parser;

    let cli = mcp_mitm_proxy::cli::Cli::parse();
    if let Err(err) = cli.execute().await {
        let exit_code = mcp_mitm_proxy::cli::error::display_error(&err);
        std::process::exit(exit_code);
    }
}
