//! urltally: reads URLs from stdin, fetches each one with bounded
//! concurrency and reports how often the search pattern appears.
mod logging;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tally_engine::{line_stream, Pipeline, PipelineConfig, PipelineSummary};
use tally_logging::{tally_error, tally_info, tally_warn};
use tokio::io::BufReader;

fn main() -> ExitCode {
    logging::initialize();

    match run() {
        Ok(summary) => {
            if let Some(err) = &summary.tally.input_error {
                tally_warn!("input ended early: {}", err);
            }
            tally_info!(
                "{} urls, {} failed, peak {} in flight, {} executors",
                summary.tally.units,
                summary.tally.failed,
                summary.peak_in_flight,
                summary.executors_spawned
            );
            println!("{}", output::total_line(&summary));
            ExitCode::SUCCESS
        }
        Err(err) => {
            tally_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<PipelineSummary> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        let config = PipelineConfig::default();
        let pipeline = Pipeline::with_http(config, Arc::new(output::StdoutSink))
            .context("failed to set up pipeline")?;

        let lines = line_stream(BufReader::new(tokio::io::stdin()));
        pipeline.run(lines).await.context("pipeline failed")
    })
}
