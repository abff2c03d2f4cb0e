use std::fmt;

use tally_core::Seq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A unit's body was fetched and scanned.
    Counted {
        seq: Seq,
        url: String,
        count: u64,
    },
    /// A unit's fetch failed; it contributes zero to the total.
    Failed {
        seq: Seq,
        url: String,
        error: FetchError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind {
            FailureKind::Body | FailureKind::TooLarge { .. } => ErrorClass::Read,
            FailureKind::InvalidUrl
            | FailureKind::HttpStatus(_)
            | FailureKind::RedirectLimitExceeded
            | FailureKind::Network => ErrorClass::Transport,
        }
    }
}

/// Coarse split between failing to get a response and failing to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transport,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    RedirectLimitExceeded,
    TooLarge {
        max_bytes: u64,
        actual: Option<u64>,
    },
    Network,
    Body,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Body => write!(f, "body read error"),
        }
    }
}
