//! Instruction parser
//!
//! Turns free text such as `"10 to 7hz 1 hr, 4hz 30min"` into segments.
//! Tokens are comma separated, case-insensitive and may contain arbitrary
//! whitespace. Two grammars are accepted:
//!
//! - Stable: `<freq>hz<duration><unit>`
//! - Transition: `<freq>[hz] to <freq>hz<duration><unit>`
//!
//! where `unit` is `hr` or `min`. Tokens that do not match are skipped.

use log::debug;
use serde::Serialize;

use super::segment::{Segment, MS_PER_HOUR, MS_PER_MINUTE};

/// Parsed segments plus the tokens that were skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub segments: Vec<Segment>,
    /// Non-empty tokens that did not match either grammar, trimmed
    pub rejected: Vec<String>,
}

/// Parse instruction text into segments, dropping malformed tokens
///
/// Never fails. An empty result means there is nothing to play; session
/// start treats that as a validation failure.
///
/// # Example
/// ```
/// use binaural::timeline::{parse, Segment};
/// let segments = parse("10 to 7hz 1 hr, 4hz 30min");
/// assert_eq!(segments, vec![
///     Segment::transition(10.0, 7.0, 3_600_000),
///     Segment::stable(4.0, 1_800_000),
/// ]);
/// ```
pub fn parse(text: &str) -> Vec<Segment> {
    parse_report(text).segments
}

/// Parse instruction text and keep track of rejected tokens
pub fn parse_report(text: &str) -> ParseReport {
    let mut report = ParseReport::default();

    for raw in text.split(',') {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_token(trimmed) {
            Some(segment) => report.segments.push(segment),
            None => {
                debug!("Skipping unparsable instruction token '{}'", trimmed);
                report.rejected.push(trimmed.to_string());
            }
        }
    }

    report
}

/// Parse one comma-free token
fn parse_token(token: &str) -> Option<Segment> {
    let compact: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    let mut scanner = Scanner::new(&compact);

    let first = scanner.frequency()?;
    let first_has_hz = scanner.eat("hz");

    let segment = if scanner.eat("to") {
        let second = scanner.frequency()?;
        if !scanner.eat("hz") {
            return None;
        }
        let duration_ms = scanner.duration_ms()?;
        Segment::transition(first, second, duration_ms)
    } else {
        if !first_has_hz {
            return None;
        }
        let duration_ms = scanner.duration_ms()?;
        Segment::stable(first, duration_ms)
    };

    if !scanner.is_done() || !segment.is_valid() {
        return None;
    }
    Some(segment)
}

/// Cursor over a whitespace-free, lowercased token
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn is_done(&self) -> bool {
        self.rest.is_empty()
    }

    fn eat(&mut self, literal: &str) -> bool {
        match self.rest.strip_prefix(literal) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Take a leading run of characters matching `pred`
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        head
    }

    /// Decimal number such as `7`, `7.83` or `.5`
    fn frequency(&mut self) -> Option<f64> {
        let integer = self.take_while(|c| c.is_ascii_digit());
        let fraction = if self.rest.starts_with('.') {
            self.rest = &self.rest[1..];
            Some(self.take_while(|c| c.is_ascii_digit()))
        } else {
            None
        };

        match fraction {
            Some(frac) if integer.is_empty() && frac.is_empty() => None,
            Some(frac) => format!("{}.{}", integer, frac).parse().ok(),
            None if integer.is_empty() => None,
            None => integer.parse().ok(),
        }
    }

    /// Integer duration followed by `hr` or `min`, converted to milliseconds
    fn duration_ms(&mut self) -> Option<u64> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        let amount: u64 = digits.parse().ok()?;
        let multiplier = if self.eat("hr") {
            MS_PER_HOUR
        } else if self.eat("min") {
            MS_PER_MINUTE
        } else {
            return None;
        };
        amount.checked_mul(multiplier)
    }
}
