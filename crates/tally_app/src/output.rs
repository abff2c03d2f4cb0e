use tally_engine::{PipelineEvent, PipelineSummary, ProgressSink};

/// Prints one line per counted URL as soon as its worker finishes.
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&self, event: PipelineEvent) {
        if let PipelineEvent::Counted { url, count, .. } = event {
            println!("{}", count_line(&url, count));
        }
    }
}

pub fn count_line(url: &str, count: u64) -> String {
    format!("Count for {url}: {count}")
}

pub fn total_line(summary: &PipelineSummary) -> String {
    format!("Total: {}", summary.tally.total)
}
