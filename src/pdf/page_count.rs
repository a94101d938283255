//! Page-count detection from raw PDF bytes
//!
//! Works on the byte stream alone so a count is known before any rendering
//! library is involved.

use std::sync::LazyLock;

use regex::bytes::Regex;
use thiserror::Error;

/// Upper bound on a believable page count
pub const MAX_PAGE_COUNT: usize = 5_000;

static COUNT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Count\s+(\d+)").expect("static regex"));

static PAGE_TREE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Pages(?-u:\b)").expect("static regex"));

// `/Type /Page` but not `/Type /Pages`
static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Page(?-u:[^s])").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageCountError {
    #[error("no page-count or page markers found")]
    NoMarkers,

    #[error("implausible page count {0}")]
    TooManyPages(usize),
}

/// Determine how many pages a PDF has
///
/// Only `/Count` entries of page-tree dictionaries (`/Type /Pages`) are
/// read, so outlines don't inflate the total. The largest positive one wins
/// (the root carries the total); without one, page objects are counted.
pub fn detect_page_count(data: &[u8]) -> Result<usize, PageCountError> {
    let from_count = dictionaries(data)
        .iter()
        .filter(|own| PAGE_TREE_MARKER.is_match(own))
        .filter_map(|own| {
            let caps = COUNT_MARKER.captures(own)?;
            let digits = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?;
            digits.parse::<usize>().ok()
        })
        .filter(|count| *count > 0)
        .max();

    let count = match from_count {
        Some(count) => count,
        None => PAGE_MARKER.find_iter(data).count(),
    };

    match count {
        0 => Err(PageCountError::NoMarkers),
        n if n > MAX_PAGE_COUNT => Err(PageCountError::TooManyPages(n)),
        n => Ok(n),
    }
}

/// The direct contents of every `<< ... >>` dictionary
///
/// Nested dictionaries are collected on their own and blanked out of their
/// parent. Stream bodies outside any dictionary are skipped.
fn dictionaries(data: &[u8]) -> Vec<Vec<u8>> {
    let mut closed = Vec::new();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let rest = &data[i..];
        if rest.starts_with(b"<<") {
            open.push(Vec::new());
            i += 2;
        } else if rest.starts_with(b">>") {
            if let Some(own) = open.pop() {
                if let Some(parent) = open.last_mut() {
                    parent.push(b' ');
                }
                closed.push(own);
            }
            i += 2;
        } else if open.is_empty() && starts_stream(data, i) {
            match rest.windows(b"endstream".len()).position(|w| w == b"endstream") {
                Some(end) => i += end + b"endstream".len(),
                None => break,
            }
        } else {
            if let Some(current) = open.last_mut() {
                current.push(data[i]);
            }
            i += 1;
        }
    }

    closed
}

/// `stream` keyword at `i`, not the tail of `endstream`
fn starts_stream(data: &[u8], i: usize) -> bool {
    let rest = &data[i..];
    (rest.starts_with(b"stream\n") || rest.starts_with(b"stream\r"))
        && (i == 0 || !data[i - 1].is_ascii_alphabetic())
}
