use clap::Parser;
use github_code_sync::{Args, CodeSyncer, SyncError};
use std::error::Error;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize the tracing logger
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let syncer = match CodeSyncer::new(&args) {
        Ok(syncer) => syncer,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    match syncer.run().await {
        Ok(summary) => {
            info!(
                "Synced {} of {} page(s), {} file(s) written to '{}'",
                summary.pages,
                summary.total_pages,
                summary.files_written,
                args.output.display()
            );
            Ok(())
        }
        Err(e) => {
            match &e {
                SyncError::Unauthorized => {
                    error!("GitHub rejected the token; check GITHUB_TOKEN or --token")
                }
                SyncError::RateLimited {
                    reset: Some(reset), ..
                } => error!(
                    "Rate limited until {}; rerun then or pass --wait-on-rate-limit",
                    reset.to_rfc3339()
                ),
                other => error!("Sync failed: {}", other),
            }
            Err(e.into())
        }
    }
}
