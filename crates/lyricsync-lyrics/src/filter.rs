//! CJK content heuristic.
//!
//! Lyrics whose significant characters are mostly Chinese, Japanese or Korean
//! can be rejected so a later source gets a chance to supply a romanized or
//! translated version.

use lyricsync_core::LyricLine;

/// Share of CJK characters above which a text counts as CJK.
pub const CJK_THRESHOLD: f64 = 0.3;

/// Whether `c` is a CJK unified ideograph, hiragana, katakana or hangul
/// syllable.
pub const fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}'
            | '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | '\u{AC00}'..='\u{D7AF}'
    )
}

/// Characters that count towards the ratio: alphanumerics and anything
/// outside ASCII.
fn is_significant(c: char) -> bool {
    c.is_alphanumeric() || !c.is_ascii()
}

/// Fraction of significant characters in `texts` that are CJK.
///
/// Returns `None` when there are no significant characters at all.
pub fn cjk_ratio<'a>(texts: impl IntoIterator<Item = &'a str>) -> Option<f64> {
    let (mut significant, mut cjk) = (0usize, 0usize);
    for c in texts.into_iter().flat_map(str::chars) {
        if is_significant(c) {
            significant += 1;
            if is_cjk(c) {
                cjk += 1;
            }
        }
    }

    (significant > 0).then(|| cjk as f64 / significant as f64)
}

/// Content filter threaded through every lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentFilter {
    reject_cjk: bool,
}

impl ContentFilter {
    pub const fn new(reject_cjk: bool) -> Self {
        Self { reject_cjk }
    }

    /// A filter that accepts everything.
    pub const fn disabled() -> Self {
        Self { reject_cjk: false }
    }

    /// Whether a candidate's lines should be thrown away: the filter is
    /// enabled and more than [`CJK_THRESHOLD`] of their significant
    /// characters are CJK.
    ///
    /// Only line text is considered, so time tags and metadata do not dilute
    /// the ratio.
    pub fn rejects(&self, lines: &[LyricLine]) -> bool {
        self.reject_cjk
            && cjk_ratio(lines.iter().map(|line| line.text.as_str()))
                .is_some_and(|ratio| ratio > CJK_THRESHOLD)
    }
}
