/// Position of a unit in the input stream, starting at 1.
pub type Seq = u64;

/// One URL's fetch-and-count task.
///
/// Created by the dispatcher the moment a URL is read and handed to exactly one
/// worker, which consumes it when reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    seq: Seq,
    url: String,
}

impl WorkUnit {
    pub fn new(seq: Seq, url: impl Into<String>) -> Self {
        Self {
            seq,
            url: url.into(),
        }
    }

    pub fn seq(&self) -> Seq {
        self.seq
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Result for a unit whose body was fetched and scanned.
    pub fn counted(self, count: u64) -> PartialResult {
        PartialResult {
            seq: self.seq,
            url: self.url,
            count,
            status: UnitStatus::Counted,
        }
    }

    /// Result for a unit whose fetch or body read failed. Contributes zero.
    pub fn failed(self) -> PartialResult {
        PartialResult {
            seq: self.seq,
            url: self.url,
            count: 0,
            status: UnitStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Counted,
    Failed,
}

/// The single report a work unit produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult {
    pub seq: Seq,
    pub url: String,
    pub count: u64,
    pub status: UnitStatus,
}
