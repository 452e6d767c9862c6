//! Walking content items into numbered chapters.
//!
//! Numbering is only known by scanning from the start: an item whose text is
//! empty is skipped without taking a number. The walk is a single lazy pass,
//! so a consumer that stops early never loads the remaining items.

use crate::epub::{ContentItem, MarkupConverter};
use anyhow::Result;

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 50;

/// Characters that may not appear in an output filename
const UNSAFE_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// A non-empty content item after text extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Position among non-empty items, starting at 1
    pub number: usize,
    /// Filesystem-safe title, at most 50 characters
    pub title: String,
    /// Plain text, trimmed
    pub text: String,
}

impl Chapter {
    /// Length of the text in characters
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Lazy chapter iterator over a sequence of content items
pub struct Chapters<I, C> {
    items: I,
    converter: C,
    next_number: usize,
}

/// Turn content items into chapters, in order.
pub fn extract<I, C>(items: I, converter: C) -> Chapters<I::IntoIter, C>
where
    I: IntoIterator<Item = Result<ContentItem>>,
    C: MarkupConverter,
{
    Chapters {
        items: items.into_iter(),
        converter,
        next_number: 1,
    }
}

impl<I, C> Iterator for Chapters<I, C>
where
    I: Iterator<Item = Result<ContentItem>>,
    C: MarkupConverter,
{
    type Item = Result<Chapter>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match self.items.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };

            if !item.is_document() {
                log::debug!("Skipping non-document item '{}'", item.id);
                continue;
            }

            let extracted = self.converter.convert(&item.markup);
            let text = extracted.text.trim();
            if text.is_empty() {
                log::debug!("Skipping empty item '{}'", item.id);
                continue;
            }

            let number = self.next_number;
            self.next_number += 1;

            return Some(Ok(Chapter {
                number,
                title: chapter_title(extracted.title.as_deref(), number),
                text: text.to_string(),
            }));
        }
    }
}

/// Derive a chapter's display title.
///
/// Uses the embedded title when present, otherwise `Chapter_<number>`;
/// made filesystem-safe, then truncated to 50 characters.
pub fn chapter_title(embedded: Option<&str>, number: usize) -> String {
    let title = match embedded {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => format!("Chapter_{}", number),
    };

    sanitize_filename(&title)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// Replace each of `\ / * ? : " < > |` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::{Extracted, ItemKind};
    use anyhow::anyhow;

    /// Treats markup as already-plain text; a leading "title|" sets the title
    struct PlainConverter;

    impl MarkupConverter for PlainConverter {
        fn convert(&self, markup: &str) -> Extracted {
            match markup.split_once('|') {
                Some((title, text)) => Extracted {
                    text: text.to_string(),
                    title: Some(title.to_string()),
                },
                None => Extracted {
                    text: markup.to_string(),
                    title: None,
                },
            }
        }
    }

    fn docs(texts: &[&str]) -> Vec<Result<ContentItem>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Ok(ContentItem::document(format!("item{}", i), *t)))
            .collect()
    }

    #[test]
    fn test_empty_items_do_not_consume_numbers() {
        let chapters: Vec<Chapter> = extract(docs(&["", "Hello world", "", "More text"]), PlainConverter)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].number, 1);
        assert_eq!(chapters[0].text, "Hello world");
        assert_eq!(chapters[0].title, "Chapter_1");
        assert_eq!(chapters[1].number, 2);
        assert_eq!(chapters[1].text, "More text");
        assert_eq!(chapters[1].title, "Chapter_2");
    }

    #[test]
    fn test_whitespace_only_item_is_empty() {
        let chapters: Vec<Chapter> = extract(docs(&["  \n\t ", "Body"]), PlainConverter)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].number, 1);
    }

    #[test]
    fn test_text_is_trimmed() {
        let chapter = extract(docs(&["\n  Some text.  \n"]), PlainConverter)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(chapter.text, "Some text.");
        assert_eq!(chapter.char_count(), 10);
    }

    #[test]
    fn test_non_document_items_are_skipped() {
        let items = vec![
            Ok(ContentItem {
                id: "style".to_string(),
                kind: ItemKind::Other,
                markup: "body { color: red }".to_string(),
            }),
            Ok(ContentItem::document("ch1", "Story")),
        ];

        let chapters: Vec<Chapter> = extract(items, PlainConverter).collect::<Result<_>>().unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].number, 1);
        assert_eq!(chapters[0].text, "Story");
    }

    #[test]
    fn test_embedded_title_is_used() {
        let chapter = extract(docs(&["The Beginning|Once upon a time."]), PlainConverter)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(chapter.title, "The Beginning");
    }

    #[test]
    fn test_blank_embedded_title_falls_back() {
        let chapter = extract(docs(&["   |Text"]), PlainConverter)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(chapter.title, "Chapter_1");
    }

    #[test]
    fn test_item_errors_are_passed_through() {
        let items = vec![
            Ok(ContentItem::document("ch1", "One")),
            Err(anyhow!("broken spine")),
        ];
        let mut chapters = extract(items, PlainConverter);
        assert!(chapters.next().unwrap().is_ok());
        assert!(chapters.next().unwrap().is_err());
    }

    #[test]
    fn test_extraction_is_lazy() {
        let mut pulled = 0;
        let items = (0..100).map(|i| {
            pulled += 1;
            Ok(ContentItem::document(format!("ch{}", i), "text"))
        });

        let first_two: Vec<Chapter> = extract(items, PlainConverter)
            .take(2)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first_two.len(), 2);
        assert_eq!(pulled, 2);
    }

    #[test]
    fn test_title_only_cover_takes_first_number() {
        use crate::epub::HtmlConverter;

        let items = vec![
            Ok(ContentItem::document(
                "cover",
                "<html><head><title>Cover</title></head>\
                 <body><div><img src=\"cover.jpg\"/></div></body></html>",
            )),
            Ok(ContentItem::document(
                "c1",
                "<html><head><title>One</title></head>\
                 <body><p>Hello world.</p></body></html>",
            )),
        ];

        let chapters: Vec<Chapter> = extract(items, HtmlConverter).collect::<Result<_>>().unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].number, 1);
        assert_eq!(chapters[0].title, "Cover");
        assert_eq!(chapters[0].text, "Cover");
        assert_eq!(chapters[1].number, 2);
        assert_eq!(chapters[1].title, "One");
        assert!(chapters[1].text.ends_with("Hello world."));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Chapter: \"One\"/Two"), "Chapter_ _One__Two");
        assert_eq!(sanitize_filename(r"a\b*c?d<e>f|g"), "a_b_c_d_e_f_g");
        assert_eq!(sanitize_filename("My Title"), "My Title");
    }

    #[test]
    fn test_title_truncated_to_fifty_chars() {
        let long = "é".repeat(80);
        let title = chapter_title(Some(&long), 1);
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_title_sanitized_then_truncated() {
        let title = format!("{}:tail", "a".repeat(49));
        assert_eq!(chapter_title(Some(&title), 3), format!("{}_", "a".repeat(49)));
        assert_eq!(chapter_title(Some("Part: \"Two\""), 2), "Part_ _Two_");
    }
}
