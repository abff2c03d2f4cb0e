pub trait OccurrenceCounter: Send + Sync {
    fn count(&self, body: &[u8]) -> u64;
}

/// Counts non-overlapping occurrences of a fixed byte pattern, scanning left
/// to right. An empty pattern matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringCounter {
    pattern: Vec<u8>,
}

impl SubstringCounter {
    pub fn new(pattern: impl AsRef<[u8]>) -> Self {
        Self {
            pattern: pattern.as_ref().to_vec(),
        }
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }
}

impl OccurrenceCounter for SubstringCounter {
    fn count(&self, body: &[u8]) -> u64 {
        let needle = self.pattern.as_slice();
        if needle.is_empty() || body.len() < needle.len() {
            return 0;
        }
        let mut count = 0;
        let mut pos = 0;
        while pos + needle.len() <= body.len() {
            if &body[pos..pos + needle.len()] == needle {
                count += 1;
                pos += needle.len();
            } else {
                pos += 1;
            }
        }
        count
    }
}
