//! LRC line-tag parser.
//!
//! Every `[mm:ss.xx]` tag on a physical line produces one [`LyricLine`]
//! carrying the text left after all time tags are removed. Metadata tags such
//! as `[ar:Artist]` never produce lines.

use lyricsync_core::{sort_lines, LyricLine};
use tracing::debug;

/// Parse LRC text into time-sorted lines.
///
/// Malformed time tags are skipped. Lines with no text after tag removal are
/// dropped. Lines sharing a timestamp keep their order of appearance.
pub fn parse(raw: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for physical in raw.lines() {
        let (stamps, text) = split_tags(physical);
        if stamps.is_empty() {
            continue;
        }

        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        lines.extend(stamps.into_iter().map(|ms| LyricLine::new(ms, text)));
    }

    sort_lines(&mut lines);
    lines
}

/// Split a physical line into its time tags and the remaining text.
///
/// Bracket groups that are not shaped like a time tag stay in the text.
fn split_tags(line: &str) -> (Vec<u64>, String) {
    let mut stamps = Vec::new();
    let mut text = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        let inner = &after[..close];

        text.push_str(&rest[..open]);
        if is_time_shaped(inner) {
            match parse_timestamp(inner) {
                Some(ms) => stamps.push(ms),
                None => debug!("Skipping malformed time tag [{inner}]"),
            }
        } else {
            text.push('[');
            text.push_str(inner);
            text.push(']');
        }
        rest = &after[close + 1..];
    }

    text.push_str(rest);
    (stamps, text)
}

fn is_time_shaped(inner: &str) -> bool {
    inner.contains(':') && inner.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.')
}

/// Parse `mm:ss`, `mm:ss.f`, `mm:ss.ff`, `mm:ss.fff` (or `:` before the
/// fraction) into milliseconds.
///
/// One fractional digit is tenths, two are hundredths, three are
/// milliseconds.
pub fn parse_timestamp(tag: &str) -> Option<u64> {
    let (minutes, rest) = tag.split_once(':')?;
    let (seconds, fraction) = match rest.split_once(['.', ':']) {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (rest, None),
    };

    if seconds.len() > 2 {
        return None;
    }
    let minutes = parse_digits(minutes)?;
    let seconds = parse_digits(seconds)?;
    if seconds >= 60 {
        return None;
    }

    let fraction_ms = match fraction {
        None => 0,
        Some(f) => {
            let value = parse_digits(f)?;
            match f.len() {
                1 => value * 100,
                2 => value * 10,
                3 => value,
                _ => return None,
            }
        }
    };

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1000)?
        .checked_add(fraction_ms)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
