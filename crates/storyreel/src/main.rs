//! Storyreel CLI binary.
//!
//! Command-line access to the production pipeline:
//! - Run a script through generation and assembly
//! - Validate a script file without spending generation calls
//! - Inspect the persisted manifest of a previous run

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_script, show_manifest, validate_script};

    // Secrets (webhook URLs) come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let directive = if cli.verbose {
        "storyreel=debug"
    } else {
        "storyreel=info"
    };
    storyreel_core::init_telemetry(directive);

    match cli.command {
        Commands::Run {
            script,
            output,
            config,
            reference_dir,
        } => {
            let report = run_script(
                &script,
                output.as_deref(),
                config.as_deref(),
                reference_dir.as_deref(),
            )
            .await?;
            if !matches!(report.status, storyreel_core::RunStatus::Succeeded) {
                eprintln!("run {} {}", report.run_id, report.status);
                std::process::exit(1);
            }
        }

        Commands::Validate { script } => {
            validate_script(&script).await?;
        }

        Commands::Manifest { run_dir } => {
            show_manifest(&run_dir).await?;
        }
    }

    Ok(())
}
