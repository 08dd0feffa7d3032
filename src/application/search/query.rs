//! Natural-language query parsing and free-text duration extraction.

use once_cell::sync::Lazy;
use regex::Regex;

/// Time bound applied when a query asks for something quick but names no number.
pub const QUICK_MAX_TOTAL_MINUTES: u32 = 30;

const QUICK_WORDS: [&str; 3] = ["quick", "fast", "easy"];

static UNDER_MINUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"under\s+(\d+)\s*(?:min|minutes?)").expect("time bound pattern must be valid")
});
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpt(?:(\d+)h)?(?:(\d+)m)?").expect("ISO duration pattern must be valid")
});
static HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*hours?").expect("hours pattern must be valid"));
static MINUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:min|minutes?)").expect("minutes pattern must be valid")
});
static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)").expect("number pattern must be valid"));

/// Structured view of a search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchConstraints {
    /// Lower-cased, whitespace-split words in query order. Not deduplicated.
    pub tokens: Vec<String>,
    /// Upper bound on a recipe's total time, in minutes.
    pub max_total_time: Option<u32>,
}

impl SearchConstraints {
    /// True if any token occurs as a substring of `text`.
    ///
    /// `text` must already be lower-cased. No tokens means no match.
    pub fn matches(&self, text: &str) -> bool {
        self.tokens.iter().any(|token| text.contains(token.as_str()))
    }

    /// True unless the recipe's total time is known and exceeds the bound.
    pub fn allows_total_time(&self, total_time: Option<&str>) -> bool {
        match (self.max_total_time, total_time.and_then(extract_minutes)) {
            (Some(max), Some(minutes)) => minutes <= max,
            _ => true,
        }
    }
}

/// Extract tokens and a time bound from a free-text query.
///
/// An explicit "under N min" bound always wins over the quick/fast/easy
/// default. "under 0 min" disables the time filter entirely.
pub fn parse_query(query: &str) -> SearchConstraints {
    let lowered = query.to_lowercase();

    let max_total_time = match UNDER_MINUTES.captures(&lowered) {
        // Only digits are captured, so a parse failure is an overflow.
        Some(caps) => {
            Some(caps[1].parse::<u32>().unwrap_or(u32::MAX)).filter(|minutes| *minutes > 0)
        }
        None => QUICK_WORDS
            .iter()
            .any(|word| lowered.contains(word))
            .then_some(QUICK_MAX_TOTAL_MINUTES),
    };

    SearchConstraints {
        tokens: lowered.split_whitespace().map(str::to_string).collect(),
        max_total_time,
    }
}

/// Read a duration in minutes from an upstream time field.
///
/// Formats are tried in order: ISO-8601 (`PT1H30M`), then "N hours" and
/// "N min(utes)" which are summed, then the first integer in the text taken
/// as minutes. The last rule also fires for text that is not a duration at
/// all, so `"serves 4"` reads as four minutes.
pub fn extract_minutes(text: &str) -> Option<u32> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DURATION.captures(&text) {
        let hours = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let minutes = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        if hours.is_some() || minutes.is_some() {
            return Some(
                hours
                    .unwrap_or(0)
                    .saturating_mul(60)
                    .saturating_add(minutes.unwrap_or(0)),
            );
        }
    }

    let hours = first_capture(&HOURS, &text).unwrap_or(0);
    let minutes = first_capture(&MINUTES, &text).unwrap_or(0);
    let total = hours.saturating_mul(60).saturating_add(minutes);
    if total > 0 {
        return Some(total);
    }

    first_capture(&FIRST_NUMBER, &text)
}

fn first_capture(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}
