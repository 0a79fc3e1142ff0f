use crate::error::IngestError;
use crate::models::{ChunkOptions, ChunkSpan, SplitPolicy};
use regex::Regex;
use std::sync::OnceLock;

/// Collapse whitespace inside each paragraph, keeping blank-line paragraph breaks.
pub fn normalize_whitespace(text: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let words = line.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.extend(words);
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}

pub fn validate_options(options: &ChunkOptions) -> Result<(), IngestError> {
    if options.overlap >= options.min_length {
        return Err(IngestError::InvalidParameters(format!(
            "overlap {} must be smaller than min_length {}",
            options.overlap, options.min_length
        )));
    }

    if options.min_length > options.max_length {
        return Err(IngestError::InvalidParameters(format!(
            "min_length {} exceeds max_length {}",
            options.min_length, options.max_length
        )));
    }

    Ok(())
}

/// Split `text` into overlapping chunks and return only their text.
pub fn chunk(text: &str, options: &ChunkOptions) -> Result<Vec<String>, IngestError> {
    Ok(chunk_spans(text, options)?
        .into_iter()
        .map(|span| span.text)
        .collect())
}

/// Split `text` into chunks of `min_length..=max_length` characters (the last
/// one may be shorter). Each chunk starts `overlap` characters before the end
/// of the previous one.
pub fn chunk_spans(text: &str, options: &ChunkOptions) -> Result<Vec<ChunkSpan>, IngestError> {
    validate_options(options)?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let char_starts = text.char_indices().map(|(byte, _)| byte).collect::<Vec<_>>();
    let total = char_starts.len();
    let boundaries = match options.split_policy {
        SplitPolicy::Sentence => sentence_boundaries(text, &char_starts),
        SplitPolicy::Character => Vec::new(),
    };

    let byte_at = |index: usize| char_starts.get(index).copied().unwrap_or(text.len());
    let span = |start: usize, end: usize| ChunkSpan {
        text: text[byte_at(start)..byte_at(end)].to_string(),
        start,
        end,
    };

    let mut spans = Vec::new();
    let mut start = 0;

    loop {
        if total - start <= options.max_length {
            spans.push(span(start, total));
            break;
        }

        let hard_end = start + options.max_length;
        let end = furthest_boundary(&boundaries, start + options.min_length, hard_end)
            .unwrap_or(hard_end);

        spans.push(span(start, end));
        start = end - options.overlap;
    }

    Ok(spans)
}

fn sentence_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([.!?]["')\]\x{201D}\x{2019}]*)\s"#).expect("sentence regex is valid")
    })
}

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("paragraph regex is valid"))
}

/// Sorted character offsets at which a chunk may end.
fn sentence_boundaries(text: &str, char_starts: &[usize]) -> Vec<usize> {
    let to_char = |byte: usize| char_starts.partition_point(|&start| start < byte);

    let sentence_ends = sentence_end_re()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1).map(|m| m.end()));
    let paragraph_ends = paragraph_break_re()
        .find_iter(text)
        .map(|m| m.start());

    let mut boundaries = sentence_ends
        .chain(paragraph_ends)
        .map(to_char)
        .filter(|&offset| offset > 0)
        .collect::<Vec<_>>();

    boundaries.sort_unstable();
    boundaries.dedup();
    boundaries
}

fn furthest_boundary(boundaries: &[usize], low: usize, high: usize) -> Option<usize> {
    let upper = boundaries.partition_point(|&boundary| boundary <= high);
    boundaries[..upper]
        .last()
        .copied()
        .filter(|&boundary| boundary >= low)
}
