//! `cardgate` binary: runs the gate against the simulated reader and
//! provides the one-shot tag tools.

mod cli;
mod input;
mod logging;

use anyhow::Context;
use cardgate_engine::{
    AbsencePolicy, KeyProvisioning, Orchestrator, ScannerConfig, ToolConfig, provision_key,
    write_text,
};
use cardgate_hardware::mock::{MockReader, MockReaderHandle};
use cardgate_hardware::{AnyCardReader, MifareKey};
use cardgate_storage::{AnyRegistry, Database, DatabaseConfig, MemoryRegistry, SqliteRegistry};
use clap::Parser;
use cli::{Backend, Cli, Commands, ProvisionArgs, RetryArgs, RunArgs, WriteTextArgs};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Operator lines buffered between the stdin thread and the command task.
const INPUT_CAPACITY: usize = 16;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let outcome = match cli.into_command() {
        Commands::Run(args) => run(args).await,
        Commands::ProvisionKey(args) => provision(args).await,
        Commands::WriteText(args) => text(args).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Critical error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let registry = open_registry(&args).await?;
    info!(backend = registry.backend(), "Registry selected");

    let mut scanner = ScannerConfig::default()
        .poll_interval(Duration::from_millis(args.poll_interval_ms))
        .retry(args.retry.policy());
    if let Some(key) = args.auth_key {
        scanner = scanner.auth_key(key);
    }
    if let Some(ms) = args.absence_reset_ms {
        scanner = scanner.absence(AbsencePolicy::ResetAfter(Duration::from_millis(ms)));
    }

    let tags = args
        .present
        .iter()
        .map(|uid| Ok((uid.clone(), uid.to_bytes()?)))
        .collect::<cardgate_core::Result<Vec<_>>>()?;

    let (reader, handle) = MockReader::new();
    let reader = AnyCardReader::Mock(reader);
    info!(device = reader.name(), "Reader selected");

    let lines = input::stdin_lines(INPUT_CAPACITY).context("cannot read operator input")?;
    let orchestrator = Orchestrator::new(reader, registry, lines)
        .scanner_config(scanner)
        .initial_mode(args.start_mode.into());

    let printer = args
        .events_json
        .then(|| tokio::spawn(input::print_events(orchestrator.subscribe())));
    let presenter = tokio::spawn(input::present_tags(
        handle,
        tags,
        Duration::from_secs(args.dwell_secs),
    ));

    info!("Gate running in {} mode, press Ctrl-C to stop", orchestrator.mode().get());
    let result = orchestrator.run(ctrl_c()).await;

    presenter.abort();
    if let Some(printer) = printer {
        // The event channel closes with the orchestrator
        let _ = printer.await;
    }

    result?;
    info!("Gate stopped");
    Ok(())
}

async fn open_registry(args: &RunArgs) -> anyhow::Result<AnyRegistry> {
    match args.backend {
        Backend::Memory => Ok(MemoryRegistry::new().into()),
        Backend::Sqlite => {
            let db = Database::new(DatabaseConfig::new(args.database.clone()))
                .await
                .with_context(|| format!("cannot open database {}", args.database))?;
            Ok(SqliteRegistry::new(db).into())
        }
    }
}

async fn provision(args: ProvisionArgs) -> anyhow::Result<()> {
    let handle = simulated_field(&args.uid)?;
    let mut request = KeyProvisioning::new(args.new_key).trailer_block(args.trailer_block);
    if let Some(key_b) = args.key_b {
        request = request.key_b(key_b);
    }

    let cancel = cancel_on_ctrl_c();
    let uid = provision_key(
        AnyCardReader::Mock(handle.reader()),
        &tool_config(args.key, args.retry),
        &request,
        &cancel,
    )
    .await?;

    info!(uid = %uid, "New key {} installed", args.new_key);
    Ok(())
}

async fn text(args: WriteTextArgs) -> anyhow::Result<()> {
    let handle = simulated_field(&args.uid)?;

    let cancel = cancel_on_ctrl_c();
    let uid = write_text(
        AnyCardReader::Mock(handle.reader()),
        &tool_config(args.key, args.retry),
        args.block,
        &args.text,
        &cancel,
    )
    .await?;

    info!(uid = %uid, "Wrote {:?} to block {}", args.text, args.block);
    Ok(())
}

fn simulated_field(uid: &cardgate_core::CanonicalUid) -> anyhow::Result<MockReaderHandle> {
    let (_, handle) = MockReader::new();
    handle.present_tag(uid.to_bytes()?);
    Ok(handle)
}

fn tool_config(key: Option<MifareKey>, retry: RetryArgs) -> ToolConfig {
    ToolConfig::default()
        .key(key.unwrap_or_default())
        .retry(retry.policy())
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received"),
        Err(e) => {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        ctrl_c().await;
        token.cancel();
    });
    cancel
}
