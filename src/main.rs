use std::{fs::File, io};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use joint_ledger::{
    config::Cli, deployment::DeploymentInfo, dlq::StdErrDLQ, engine::Engine,
    ingestion::CsvReader, output_repository::CsvOutput, InMemoryCustody, Ledger,
};

#[tokio::main] // using Tokio runtime for async
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    // Set up the components
    let ledger = Ledger::with_policy(InMemoryCustody::open(), cli.approval_policy);
    info!(policy = %ledger.policy(), "ledger instantiated");

    let file = File::open(&cli.input)?;
    let ingestion = CsvReader::new(file)?;

    if let Some(path) = &cli.deployment_info {
        let info = DeploymentInfo::new(&cli.signer);
        info.write_to(path)?;
        info!(address = %info.ledger.address, path = %path.display(), "deployment info written");
    }

    let output = CsvOutput::new(io::stdout().lock());

    // Initialize engine with injected components
    let mut engine = Engine::new(ingestion, output, StdErrDLQ::default(), ledger);

    engine.process().await?;
    engine.flush()?;

    Ok(())
}
