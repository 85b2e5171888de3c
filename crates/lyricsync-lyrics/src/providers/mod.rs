//! Remote lyrics providers.

mod lrclib;
mod netease;
#[cfg(test)]
mod test_server;

pub use lrclib::LrclibProvider;
pub use netease::NeteaseProvider;

/// Candidates whose duration differs by more than this are tried last.
const DURATION_TOLERANCE_SECS: f64 = 3.0;

/// Order candidates so the ones matching `target_secs` come first, keeping
/// the service's ranking otherwise.
fn prefer_duration<T>(
    candidates: &mut [T],
    target_secs: Option<u64>,
    secs: impl Fn(&T) -> Option<f64>,
) {
    let Some(target) = target_secs else {
        return;
    };
    candidates.sort_by_key(|candidate| {
        !secs(candidate).is_some_and(|d| (d - target as f64).abs() <= DURATION_TOLERANCE_SECS)
    });
}
