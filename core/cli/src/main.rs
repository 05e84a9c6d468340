use anyhow::Result;
use hubload_cli::cli::Cli;

fn main() -> Result<()> {
    // Arguments are validated before anything touches the network.
    let cli = Cli::parse();

    // Every step runs in sequence, a single threaded runtime is all we need.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to initialize runtime")
        .block_on(cli.exec())
}
