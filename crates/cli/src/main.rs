use std::{path::Path, process};

use clap::Parser;

mod package;
mod run;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Blockstream - resumable block stream consumer", long_about = None)]
struct Opts {
    #[command(flatten)]
    run: run::RunCommand,
}

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads its env fallbacks
    load_env_file(Path::new("."));

    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    if let Err(e) = opts.run.execute().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Load environment variables from the .env file in `dir`
fn load_env_file(dir: &Path) {
    let env_file_path = dir.join(".env");

    match dotenvy::from_path(&env_file_path) {
        Ok(_) => {
            eprintln!("✓ Loaded environment from {}", env_file_path.display());
        }
        Err(e) if e.not_found() => {
            // .env file not found is fine, just continue silently
        }
        Err(e) => {
            eprintln!(
                "Warning: Failed to load .env file at {}: {}",
                env_file_path.display(),
                e
            );
        }
    }
}
