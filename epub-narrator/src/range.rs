//! Chapter range selection.

use thiserror::Error;

/// Invalid `--start-chapter` / `--end-chapter` combinations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("Start chapter must be at least 1")]
    StartBelowOne,

    #[error("End chapter {end} is before start chapter {start}")]
    EndBeforeStart { start: usize, end: usize },
}

/// What to do with a chapter during the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    /// Before the range: keep scanning
    Skip,
    /// Inside the range
    Process,
    /// Past the range: end the walk
    Stop,
}

/// Inclusive, 1-based range over chapter numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    start: usize,
    end: Option<usize>,
}

impl Default for ChapterRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: None,
        }
    }
}

impl ChapterRange {
    /// Create a range; `end` of `None` means unbounded.
    pub fn new(start: usize, end: Option<usize>) -> Result<Self, RangeError> {
        if start < 1 {
            return Err(RangeError::StartBelowOne);
        }
        if let Some(end) = end {
            if end < start {
                return Err(RangeError::EndBeforeStart { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Decide what to do with chapter `number`.
    ///
    /// Chapter numbers only grow during a walk, so the first chapter past
    /// `end` ends it.
    pub fn decide(&self, number: usize) -> RangeDecision {
        if number < self.start {
            RangeDecision::Skip
        } else if self.end.is_some_and(|end| number > end) {
            RangeDecision::Stop
        } else {
            RangeDecision::Process
        }
    }
}

impl std::fmt::Display for ChapterRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_processes_everything() {
        let range = ChapterRange::default();
        for n in [1, 2, 1000] {
            assert_eq!(range.decide(n), RangeDecision::Process);
        }
    }

    #[test]
    fn test_skip_before_start() {
        let range = ChapterRange::new(3, None).unwrap();
        assert_eq!(range.decide(1), RangeDecision::Skip);
        assert_eq!(range.decide(2), RangeDecision::Skip);
        assert_eq!(range.decide(3), RangeDecision::Process);
        assert_eq!(range.decide(50), RangeDecision::Process);
    }

    #[test]
    fn test_stop_after_end() {
        let range = ChapterRange::new(2, Some(2)).unwrap();
        assert_eq!(range.decide(1), RangeDecision::Skip);
        assert_eq!(range.decide(2), RangeDecision::Process);
        assert_eq!(range.decide(3), RangeDecision::Stop);
    }

    #[test]
    fn test_invalid_ranges() {
        assert_eq!(ChapterRange::new(0, None), Err(RangeError::StartBelowOne));
        assert_eq!(
            ChapterRange::new(5, Some(4)),
            Err(RangeError::EndBeforeStart { start: 5, end: 4 })
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ChapterRange::new(2, Some(7)).unwrap().to_string(), "2-7");
        assert_eq!(ChapterRange::default().to_string(), "1-");
    }
}
