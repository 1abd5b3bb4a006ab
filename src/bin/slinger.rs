use anyhow::Result;
use clap::Parser;
use slinger::config::Args;
use slinger::{logging, run};

fn exit_err(msg: impl AsRef<str>, err: impl core::fmt::Display) -> ! {
    tracing::error!("{}: {err}", msg.as_ref());
    std::process::exit(1);
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_level.as_deref());

    match run::run(args).await {
        Ok(stats) => {
            tracing::info!(
                total = stats.total_count,
                "run complete"
            );
            Ok(())
        },
        Err(err) => exit_err("run aborted", err),
    }
}
