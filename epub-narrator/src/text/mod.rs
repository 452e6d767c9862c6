//! Text processing for synthesis: splitting chapters into segments.

pub mod segmenter;

pub use segmenter::split_chapter;

/// A piece of chapter text sized for one synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Number of the chapter this segment belongs to
    pub chapter: usize,
    /// Position within the chapter, starting at 1
    pub ordinal: usize,
    /// The text content
    pub text: String,
}

impl Segment {
    /// Create a new segment.
    pub fn new(chapter: usize, ordinal: usize, text: String) -> Self {
        Self {
            chapter,
            ordinal,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_creation() {
        let segment = Segment::new(2, 1, "Hello world".to_string());
        assert_eq!(segment.chapter, 2);
        assert_eq!(segment.ordinal, 1);
        assert_eq!(segment.text, "Hello world");
    }
}
