//! Scripture reference parsing.
//!
//! Turns a human-readable reference such as `"Matt 10.1, 5-8"` into an
//! ordered set of verse clauses a [`crate::store::BibleStore`] can resolve.
//! References are assumed to originate from the trusted commemoration/
//! reading tables, never from untrusted input.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static PASSAGE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*;\s*").unwrap());
static RANGE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*").unwrap());
static REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\w\s]+?)\s+(\d.*)$").unwrap());
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d+)\.)?(\d+)(?:-(?:(\d+)\.)?(\d+))?$").unwrap());

/// Books with a single chapter; any numeric chapter prefix the caller
/// supplies for these is ignored and forced to chapter 1.
const CHAPTERLESS_BOOKS: &[&str] = &["Obadiah", "Philemon", "2John", "3John", "Jude"];

/// A single verse, or a verse range possibly spanning two chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerseClause {
    Single { chapter: i32, verse: i32 },
    WithinChapter { chapter: i32, from: i32, to: i32 },
    AcrossChapters {
        chapter_from: i32,
        verse_from: i32,
        chapter_to: i32,
        verse_to: i32,
    },
}

/// One `;`-separated passage: a book name and its verse clauses, in
/// storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageSpec {
    pub book: String,
    pub clauses: Vec<VerseClause>,
}

/// Parses a reference such as `"1 Cor 5.6-8; Gal 3.13-14"` into one
/// [`PassageSpec`] per `;`-separated segment.
///
/// A segment that omits its book name (e.g. the `"5-8"` in
/// `"Matt 1.1-25; 5-8"`) inherits the book from the preceding segment, per
/// the grammar's `Passage := [BookName] Specification`.
pub fn parse(reference: &str) -> Result<Vec<PassageSpec>> {
    let mut passages = Vec::new();
    let mut last_book: Option<String> = None;

    for segment in PASSAGE_SPLIT.split(reference.trim()) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (book, specification) = match REF_RE.captures(segment) {
            Some(captures) => (captures[1].replace(' ', ""), captures[2].to_string()),
            None => {
                let book = last_book.clone().ok_or_else(|| Error::ReferenceParseError {
                    reference: reference.to_string(),
                })?;
                (book, segment.to_string())
            }
        };

        let passage = parse_passage(&book, &specification, reference)?;
        last_book = Some(passage.book.clone());
        passages.push(passage);
    }

    if passages.is_empty() {
        return Err(Error::ReferenceParseError {
            reference: reference.to_string(),
        });
    }

    Ok(passages)
}

fn parse_passage(book: &str, specification: &str, original: &str) -> Result<PassageSpec> {
    let book = book.to_string();
    let chapterless = CHAPTERLESS_BOOKS.contains(&book.as_str());

    let mut clauses = Vec::new();
    // Chapter carried forward across ranges within this passage.
    let mut chapter = 1;

    for range in RANGE_SPLIT.split(specification) {
        let range = range.trim();
        if range.is_empty() {
            continue;
        }
        let m = RANGE_RE
            .captures(range)
            .ok_or_else(|| Error::ReferenceParseError {
                reference: original.to_string(),
            })?;

        let start_chapter: Option<i32> = m.get(1).map(|c| c.as_str().parse().unwrap());
        let start_verse: i32 = m[2].parse().unwrap();
        let end_chapter: Option<i32> = m.get(3).map(|c| c.as_str().parse().unwrap());
        let end_verse: Option<i32> = m.get(4).map(|v| v.as_str().parse().unwrap());

        let default_chapter = if chapterless { 1 } else { start_chapter.unwrap_or(chapter) };

        let clause = match end_verse {
            Some(end_verse) => {
                let to_chapter = if chapterless {
                    1
                } else {
                    end_chapter.unwrap_or(default_chapter)
                };
                if to_chapter != default_chapter {
                    VerseClause::AcrossChapters {
                        chapter_from: default_chapter,
                        verse_from: start_verse,
                        chapter_to: to_chapter,
                        verse_to: end_verse,
                    }
                } else {
                    VerseClause::WithinChapter {
                        chapter: default_chapter,
                        from: start_verse,
                        to: end_verse,
                    }
                }
            }
            None => VerseClause::Single {
                chapter: default_chapter,
                verse: start_verse,
            },
        };
        clauses.push(clause);

        // Remember the most recently used chapter: only updated when this
        // range carried an explicit chapter number, matching the source
        // behavior that a bare verse number never changes the inherited
        // chapter.
        if !chapterless {
            if let Some(end_chapter) = end_chapter {
                chapter = end_chapter;
            } else if let Some(start_chapter) = start_chapter {
                chapter = start_chapter;
            }
        }
    }

    Ok(PassageSpec { book, clauses })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chapter_range() {
        let passages = parse("Matt 1.1-25").unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].book, "Matt");
        assert_eq!(
            passages[0].clauses,
            vec![VerseClause::WithinChapter {
                chapter: 1,
                from: 1,
                to: 25
            }]
        );
    }

    #[test]
    fn cross_chapter_range() {
        let passages = parse("Matt 4.25-5.13").unwrap();
        assert_eq!(
            passages[0].clauses,
            vec![VerseClause::AcrossChapters {
                chapter_from: 4,
                verse_from: 25,
                chapter_to: 5,
                verse_to: 13,
            }]
        );
    }

    #[test]
    fn chapter_inherited_across_ranges() {
        let passages = parse("Matt 10.1, 5-8").unwrap();
        assert_eq!(
            passages[0].clauses,
            vec![
                VerseClause::Single { chapter: 10, verse: 1 },
                VerseClause::WithinChapter { chapter: 10, from: 5, to: 8 },
            ]
        );
    }

    #[test]
    fn bare_verse_does_not_update_chapter_memory() {
        let passages = parse("Mark 15.22, 25, 33-41").unwrap();
        assert_eq!(
            passages[0].clauses,
            vec![
                VerseClause::Single { chapter: 15, verse: 22 },
                VerseClause::Single { chapter: 15, verse: 25 },
                VerseClause::WithinChapter { chapter: 15, from: 33, to: 41 },
            ]
        );
    }

    #[test]
    fn chapterless_book_forces_chapter_one() {
        let passages = parse("Jude 1-10").unwrap();
        assert_eq!(passages[0].book, "Jude");
        assert_eq!(
            passages[0].clauses,
            vec![VerseClause::WithinChapter { chapter: 1, from: 1, to: 10 }]
        );
    }

    #[test]
    fn book_name_carries_across_semicolons() {
        let passages = parse("1 Cor 5.6-8; Gal 3.13-14").unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].book, "1Cor");
        assert_eq!(passages[1].book, "Gal");
    }

    #[test]
    fn book_name_is_inherited_when_a_later_segment_omits_it() {
        let passages = parse("Matt 1.1-25; 5-8").unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].book, "Matt");
        assert_eq!(passages[1].book, "Matt");
        assert_eq!(
            passages[1].clauses,
            vec![VerseClause::WithinChapter { chapter: 1, from: 5, to: 8 }]
        );
    }

    #[test]
    fn leading_segment_without_a_book_is_an_error() {
        assert!(parse("5-8").is_err());
    }

    #[test]
    fn malformed_reference_is_an_error() {
        assert!(parse("not a reference").is_err());
    }
}
