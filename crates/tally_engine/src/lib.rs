//! Tally engine: bounded-concurrency fetch-and-count pipeline.
mod aggregate;
mod counter;
mod dispatch;
mod fetch;
mod gate;
mod input;
mod pipeline;
mod pool;
mod types;
mod worker;

pub use aggregate::{
    AggregateError, Aggregator, ChannelAggregator, CrossCheckAggregator, LockedAggregator,
};
pub use counter::{OccurrenceCounter, SubstringCounter};
pub use dispatch::{DispatchOutcome, Dispatcher, StopReason};
pub use fetch::{FetchSettings, Fetcher, NullSink, ProgressSink, ReqwestFetcher};
pub use gate::{ConcurrencyGate, GateError, GateSlot};
pub use input::line_stream;
pub use pipeline::{AggregationMode, Pipeline, PipelineConfig, PipelineError, PipelineSummary};
pub use pool::{FixedPool, GatedSpawnPool, PoolStrategy, WorkerPool};
pub use types::{ErrorClass, FailureKind, FetchError, FetchMetadata, FetchOutput, PipelineEvent};
pub use worker::{Admitted, Worker};
