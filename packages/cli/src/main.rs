use clap::Parser;

use filedoc_cli::Args;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = filedoc_cli::run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
