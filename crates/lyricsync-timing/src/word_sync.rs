//! Synthesized word-by-word highlighting.
//!
//! Line-synced lyrics only say when a line starts. To highlight individual
//! words, the gap until the next line is shared out across the line's tokens
//! by their length, with short pauses after punctuation. The result is a
//! timeline of alternating highlight and pause segments.

use lyricsync_core::LyricLine;
use serde::{Deserialize, Serialize};

/// Gaps longer than this are assumed to contain an instrumental tail.
const LONG_GAP_MS: i64 = 2000;
/// Share of a long gap that may be spent singing.
const SPOKEN_SHARE: f64 = 0.6;
const MAX_WORD_MS: i64 = 350;
const MIN_WORD_MS: i64 = 60;

const COMMA_PAUSE_MS: u32 = 120;
const CLAUSE_PAUSE_MS: u32 = 140;
const SENTENCE_PAUSE_MS: u32 = 180;

const MIN_SCALE: f64 = 0.2;
const MAX_SCALE: f64 = 1.0;

/// Markup wrapped around the highlighted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMarker {
    pub open: String,
    pub close: String,
}

impl HighlightMarker {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    fn wrap(&self, token: &str) -> String {
        format!("{}{token}{}", self.open, self.close)
    }
}

impl Default for HighlightMarker {
    fn default() -> Self {
        Self::new("<color=yellow>", "</color>")
    }
}

/// Timeline for one line.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSyncPlan {
    tokens: Vec<String>,
    pause_ms: Vec<u32>,
    allowed_ms: f64,
    scale: f64,
    /// Cumulative end of each segment: highlight of token `i` at `2i`, the
    /// pause after it at `2i + 1`.
    segment_ends: Vec<f64>,
}

impl WordSyncPlan {
    /// Plan `text` over `interval_ms`, the gap until the next line.
    ///
    /// Returns `None` for a non-positive interval or a line without tokens.
    pub fn build(text: &str, interval_ms: i64) -> Option<Self> {
        if interval_ms <= 0 {
            return None;
        }

        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return None;
        }

        let weights: Vec<usize> = tokens.iter().map(|token| weight(token)).collect();
        let total_weight = weights.iter().sum::<usize>().max(1) as f64;
        let allowed_ms = allowed_window_ms(interval_ms, tokens.len()) as f64;

        let mut highlight_ms: Vec<f64> = weights
            .iter()
            .map(|&w| {
                (allowed_ms * w as f64 / total_weight)
                    .clamp(MIN_WORD_MS as f64, MAX_WORD_MS as f64)
            })
            .collect();
        let pause_ms: Vec<u32> = tokens.iter().map(|token| pause_after(token)).collect();

        let base_total: f64 = highlight_ms.iter().sum();
        let pause_total: f64 = pause_ms.iter().copied().map(f64::from).sum();

        // Pauses keep their length; only highlights shrink.
        let mut scale = 1.0;
        if base_total + pause_total > allowed_ms {
            scale = ((allowed_ms - pause_total) / base_total).clamp(MIN_SCALE, MAX_SCALE);
            for ms in &mut highlight_ms {
                *ms *= scale;
            }
        }

        let mut segment_ends = Vec::with_capacity(tokens.len() * 2);
        let mut acc = 0.0;
        for (highlight, pause) in highlight_ms.iter().zip(&pause_ms) {
            acc += highlight;
            segment_ends.push(acc);
            acc += f64::from(*pause);
            segment_ends.push(acc);
        }

        Some(Self {
            tokens,
            pause_ms,
            allowed_ms,
            scale,
            segment_ends,
        })
    }

    pub fn pause_ms(&self) -> &[u32] {
        &self.pause_ms
    }

    /// Window the highlights and pauses are meant to fit in.
    pub const fn allowed_ms(&self) -> f64 {
        self.allowed_ms
    }

    /// Factor applied to every highlight, in `[0.2, 1.0]`.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub fn segment_ends(&self) -> &[f64] {
        &self.segment_ends
    }

    /// End of the last segment.
    pub fn total_ms(&self) -> f64 {
        self.segment_ends.last().copied().unwrap_or(0.0)
    }

    /// Token highlighted `elapsed_ms` after the line started.
    ///
    /// `None` during pauses, before the line and after the timeline ends.
    pub fn token_at(&self, elapsed_ms: i64) -> Option<usize> {
        if elapsed_ms < 0 || elapsed_ms as f64 >= self.total_ms() {
            return None;
        }

        let elapsed = elapsed_ms as f64;
        let segment = self.segment_ends.iter().position(|&end| end >= elapsed)?;
        (segment % 2 == 0).then_some(segment / 2)
    }

    /// The line with token `index` wrapped in `marker`.
    pub fn render(&self, index: usize, marker: &HighlightMarker) -> String {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                if i == index {
                    marker.wrap(token)
                } else {
                    token.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Word-sync display for `current`, `elapsed_ms` after it started.
///
/// Blank when there is no next line, the lines share a timestamp, or no
/// token is active.
pub fn highlight(
    current: &LyricLine,
    next: Option<&LyricLine>,
    elapsed_ms: i64,
    marker: &HighlightMarker,
) -> String {
    let Some(next) = next else {
        return String::new();
    };

    let interval_ms =
        i64::try_from(next.time_ms.saturating_sub(current.time_ms)).unwrap_or(i64::MAX);
    WordSyncPlan::build(&current.text, interval_ms)
        .and_then(|plan| {
            plan.token_at(elapsed_ms)
                .map(|index| plan.render(index, marker))
        })
        .unwrap_or_default()
}

/// Alphanumeric character count, at least 1.
fn weight(token: &str) -> usize {
    token.chars().filter(|c| c.is_alphanumeric()).count().max(1)
}

fn pause_after(token: &str) -> u32 {
    match token.chars().last() {
        Some(',' | '，' | '、') => COMMA_PAUSE_MS,
        Some(';' | ':' | '；' | '：') => CLAUSE_PAUSE_MS,
        Some('.' | '!' | '?' | '…' | '。' | '！' | '？') => SENTENCE_PAUSE_MS,
        _ => 0,
    }
}

fn allowed_window_ms(interval_ms: i64, token_count: usize) -> i64 {
    if interval_ms <= LONG_GAP_MS {
        return interval_ms;
    }

    let tokens = token_count as i64;
    let by_share = (interval_ms as f64 * SPOKEN_SHARE) as i64;
    let floor = interval_ms.min(tokens * MIN_WORD_MS);
    by_share.min(tokens * MAX_WORD_MS).max(floor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn marker() -> HighlightMarker {
        HighlightMarker::default()
    }

    #[test]
    fn test_blank_without_next_line_or_gap() {
        let current = LyricLine::new(1000, "Hello there");
        assert_eq!(highlight(&current, None, 10, &marker()), "");

        let same_time = LyricLine::new(1000, "Next");
        assert_eq!(highlight(&current, Some(&same_time), 10, &marker()), "");
        assert!(WordSyncPlan::build("   ", 1000).is_none());
    }

    #[test]
    fn test_short_gap_walks_tokens() {
        let current = LyricLine::new(0, "Hello there world");
        let next = LyricLine::new(1500, "Next");

        assert_eq!(
            highlight(&current, Some(&next), 0, &marker()),
            "<color=yellow>Hello</color> there world"
        );
        assert_eq!(
            highlight(&current, Some(&next), 351, &marker()),
            "Hello <color=yellow>there</color> world"
        );
        assert_eq!(
            highlight(&current, Some(&next), 1000, &marker()),
            "Hello there <color=yellow>world</color>"
        );
        // 3 x 350 ms highlights, then nothing
        assert_eq!(highlight(&current, Some(&next), 1050, &marker()), "");
        assert_eq!(highlight(&current, Some(&next), -1, &marker()), "");
    }

    #[test]
    fn test_long_gap_caps_window() {
        let plan = WordSyncPlan::build("far away", 10_000).unwrap();
        assert!((plan.allowed_ms() - 700.0).abs() < f64::EPSILON);
        // "far" gets 300 ms, "away" is capped at 350 ms
        assert!((plan.total_ms() - 650.0).abs() < f64::EPSILON);

        let gap_exactly_threshold = WordSyncPlan::build("far away", 2000).unwrap();
        assert!((gap_exactly_threshold.allowed_ms() - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_punctuation_inserts_blank_pauses() {
        let plan = WordSyncPlan::build("Stop, go.", 1000).unwrap();
        assert_eq!(plan.pause_ms(), &[COMMA_PAUSE_MS, SENTENCE_PAUSE_MS]);
        assert!((plan.scale() - 1.0).abs() < f64::EPSILON);

        assert_eq!(plan.token_at(100), Some(0));
        // inside the comma pause
        assert_eq!(plan.token_at(400), None);
        assert_eq!(plan.token_at(500), Some(1));
    }

    #[test]
    fn test_crowded_line_is_scaled() {
        let plan = WordSyncPlan::build("a b c d e f g h i j", 300).unwrap();
        assert!((plan.scale() - 0.5).abs() < 1e-9);
        assert!((plan.total_ms() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_floor_keeps_pauses() {
        let plan = WordSyncPlan::build("one, two, three, four,", 400).unwrap();
        assert!((plan.scale() - MIN_SCALE).abs() < f64::EPSILON);
        let pauses: u32 = plan.pause_ms().iter().sum();
        assert_eq!(pauses, 4 * COMMA_PAUSE_MS);
        assert!(plan.total_ms() > plan.allowed_ms());
    }

    #[test]
    fn test_weights() {
        assert_eq!(weight("hello,"), 5);
        assert_eq!(weight("..."), 1);
        assert_eq!(weight("愛してる"), 4);
    }

    proptest! {
        #[test]
        fn test_plan_invariants(
            words in prop::collection::vec("[a-zA-Z']{1,8}[,.;!?]?", 1..12),
            interval in 1i64..20_000,
            elapsed in -1_000i64..30_000,
        ) {
            let text = words.join(" ");
            let plan = WordSyncPlan::build(&text, interval).unwrap();
            prop_assert_eq!(&plan, &WordSyncPlan::build(&text, interval).unwrap());

            prop_assert!((MIN_SCALE..=MAX_SCALE).contains(&plan.scale()));
            prop_assert_eq!(plan.segment_ends().len(), words.len() * 2);
            prop_assert!(plan.segment_ends().windows(2).all(|w| w[0] <= w[1]));

            let current = LyricLine::new(5_000, text.clone());
            let next = LyricLine::new(5_000 + interval as u64, "next");
            let shown = highlight(&current, Some(&next), elapsed, &marker());
            prop_assert_eq!(&shown, &highlight(&current, Some(&next), elapsed, &marker()));

            if elapsed < 0 || elapsed as f64 >= plan.total_ms() {
                prop_assert!(shown.is_empty());
            }
            if !shown.is_empty() {
                prop_assert_eq!(shown.matches("<color=yellow>").count(), 1);
                prop_assert_eq!(shown.matches("</color>").count(), 1);
            }
        }
    }
}
