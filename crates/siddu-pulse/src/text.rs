//! Pulse text: `#hashtag` / `@mention` extraction and client-side checks
//! before a pulse is sent.

use regex::Regex;
use serde::{Deserialize, Serialize};
use siddu_api::{ApiError, PulseCreate, Result};

/// Backend limit on pulse text length, in characters.
pub const MAX_PULSE_CHARS: usize = 280;

const HASHTAG_PATTERN: &str = r"#([A-Za-z0-9_]+)";
const MENTION_PATTERN: &str = r"@([A-Za-z0-9]+(?:[A-Za-z0-9\s]*[A-Za-z0-9])?)";

/// A `@Title` reference to a movie inside pulse text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub title: String,
    /// Byte offsets of the whole `@...` match in the source text
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedContent {
    /// Lower-cased, first occurrence order, no duplicates
    pub hashtags: Vec<String>,
    pub mentions: Vec<Mention>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ApiError::Internal {
        message: format!("Failed to compile pattern {}: {}", pattern, e),
    })
}

pub fn parse_pulse_content(text: &str) -> Result<ParsedContent> {
    let hashtag = compile(HASHTAG_PATTERN)?;
    let mention = compile(MENTION_PATTERN)?;

    let mut hashtags: Vec<String> = Vec::new();
    for caps in hashtag.captures_iter(text) {
        let tag = caps[1].to_lowercase();
        if !hashtags.contains(&tag) {
            hashtags.push(tag);
        }
    }

    let mentions = mention
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Mention {
                title: caps[1].trim().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect();

    Ok(ParsedContent { hashtags, mentions })
}

/// Reject a pulse the backend would refuse.
pub fn validate_pulse(body: &PulseCreate) -> Result<()> {
    let text = body.content_text.trim();
    if text.is_empty() {
        return Err(ApiError::invalid_input("Pulse text must not be empty"));
    }
    let length = body.content_text.chars().count();
    if length > MAX_PULSE_CHARS {
        return Err(ApiError::invalid_input(format!(
            "Pulse text is {} characters, the limit is {}",
            length, MAX_PULSE_CHARS
        )));
    }

    if let Some(rating) = body.star_rating {
        if !(1..=5).contains(&rating) {
            return Err(ApiError::invalid_input(format!(
                "Star rating must be between 1 and 5, got {}",
                rating
            )));
        }
        if body.posted_as_role.is_none() || body.linked_movie_id.is_none() {
            return Err(ApiError::invalid_input(
                "A star rating needs a professional role and a linked movie",
            ));
        }
    }
    Ok(())
}

/// Validate and fill `hashtags` from the text when the caller left it empty.
pub fn prepare_pulse(mut body: PulseCreate) -> Result<PulseCreate> {
    validate_pulse(&body)?;
    if body.hashtags.as_ref().map_or(true, Vec::is_empty) {
        let parsed = parse_pulse_content(&body.content_text)?;
        body.hashtags = (!parsed.hashtags.is_empty()).then_some(parsed.hashtags);
    }
    Ok(body)
}
