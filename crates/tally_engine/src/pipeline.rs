use std::io;
use std::sync::Arc;

use futures_util::Stream;
use tally_core::Tally;
use tally_logging::{tally_debug, tally_info};

use crate::{
    AggregateError, Aggregator, ChannelAggregator, ConcurrencyGate, CrossCheckAggregator,
    Dispatcher, FetchError, FetchSettings, Fetcher, FixedPool, GatedSpawnPool, LockedAggregator,
    OccurrenceCounter, PoolStrategy, ProgressSink, ReqwestFetcher, SubstringCounter, Worker,
    WorkerPool,
};

/// Which aggregation strategy folds per-unit counts into the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMode {
    Channel,
    Locked,
    /// Runs the channel and locked strategies side by side and checks they agree.
    #[default]
    CrossCheck,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of units in flight at once.
    pub concurrency: usize,
    pub pattern: String,
    pub pool: PoolStrategy,
    pub aggregation: AggregationMode,
    pub fetch: FetchSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            pattern: "go".to_string(),
            pool: PoolStrategy::default(),
            aggregation: AggregationMode::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidConcurrency);
        }
        if self.pattern.is_empty() {
            return Err(PipelineError::EmptyPattern);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("search pattern must not be empty")]
    EmptyPattern,
    #[error("failed to build fetcher: {0}")]
    Fetcher(#[from] FetchError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub tally: Tally,
    /// Highest number of units holding a gate slot at the same time.
    pub peak_in_flight: usize,
    pub executors_spawned: usize,
}

/// Wires dispatcher, gate, pool and aggregator together for one run.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    counter: Arc<dyn OccurrenceCounter>,
    sink: Arc<dyn ProgressSink>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let counter = Arc::new(SubstringCounter::new(&config.pattern));
        Ok(Self {
            config,
            fetcher,
            counter,
            sink,
        })
    }

    /// Builds a pipeline that fetches over HTTP with `config.fetch`.
    pub fn with_http(
        config: PipelineConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self, PipelineError> {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone())?);
        Self::new(config, fetcher, sink)
    }

    pub fn with_counter(mut self, counter: Arc<dyn OccurrenceCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Processes every URL in `lines` and returns once all of them have reported.
    ///
    /// Input errors end dispatch early but never discard work already admitted;
    /// they are surfaced in `Tally::input_error`.
    pub async fn run<S>(&self, lines: S) -> Result<PipelineSummary, PipelineError>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        let aggregator = self.build_aggregator();
        let worker = Arc::new(Worker::new(
            self.fetcher.clone(),
            self.counter.clone(),
            self.sink.clone(),
        ));
        let gate = ConcurrencyGate::new(self.config.concurrency);
        let mut pool = self.build_pool(worker, aggregator.clone());

        let outcome = Dispatcher::new(&gate, &mut *pool, aggregator.clone())
            .run(lines)
            .await;
        tally_debug!(
            "dispatch stopped after {} units: {:?}",
            outcome.dispatched,
            outcome.stop
        );

        aggregator.input_ended(outcome.stop.error_message());
        pool.drain().await;
        let tally = aggregator.total().await?;

        tally_info!(
            "total={} units={} failed={}",
            tally.total,
            tally.units,
            tally.failed
        );
        Ok(PipelineSummary {
            tally,
            peak_in_flight: gate.peak(),
            executors_spawned: pool.executors_spawned(),
        })
    }

    fn build_aggregator(&self) -> Arc<dyn Aggregator> {
        match self.config.aggregation {
            AggregationMode::Channel => Arc::new(ChannelAggregator::new()),
            AggregationMode::Locked => Arc::new(LockedAggregator::new()),
            AggregationMode::CrossCheck => Arc::new(CrossCheckAggregator::new(
                Arc::new(ChannelAggregator::new()),
                Arc::new(LockedAggregator::new()),
            )),
        }
    }

    fn build_pool(
        &self,
        worker: Arc<Worker>,
        aggregator: Arc<dyn Aggregator>,
    ) -> Box<dyn WorkerPool> {
        match self.config.pool {
            PoolStrategy::GatedSpawn => Box::new(GatedSpawnPool::new(worker, aggregator)),
            PoolStrategy::Fixed => {
                Box::new(FixedPool::new(self.config.concurrency, worker, aggregator))
            }
        }
    }
}
