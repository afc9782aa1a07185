use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use pgcompare::error::Result;
use pgcompare::options::{Options, OutputFormat};
use pgcompare::{logging, Instance, Progress, ReconciliationEngine};

async fn run(options: Options) -> Result<()> {
    let (source_spec, destination_spec) = options.connection_specs()?;
    tracing::debug!(
        source = ?source_spec,
        destination = ?destination_spec,
        "Loaded connection settings"
    );

    let (progress, mut messages) = Progress::channel();
    let printer = tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            eprintln!("{message}");
        }
    });

    let timeout = options.fetch_timeout();
    let source = Instance::postgres(source_spec, timeout);
    let destination = Instance::postgres(destination_spec, timeout);

    let engine = ReconciliationEngine::new(progress).with_fetch_timeout(timeout);
    let result = engine.compare(&source, &destination).await;

    // Fetch tasks abandoned after a failure may still hold a sender.
    drop(engine);
    let _ = tokio::time::timeout(Duration::from_millis(200), printer).await;

    let mut report = result?;
    if options.only_differences {
        report.retain_differences();
    }

    match options.format {
        OutputFormat::Text => println!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = Options::parse();
    logging::init(options.log.as_deref());

    match run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Comparison failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
