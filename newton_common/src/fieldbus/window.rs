//! Position arrival window.

/// Whether `actual` lies strictly inside `target ± tolerance`.
///
/// Both bounds are exclusive: a position exactly `tolerance` counts away from
/// the target has not arrived. Computed in `i64` so targets near the ends of
/// the `i32` range do not wrap.
#[inline]
pub const fn within_window(actual: i32, target: i32, tolerance: i32) -> bool {
    let actual = actual as i64;
    let target = target as i64;
    let tolerance = tolerance as i64;
    target - tolerance < actual && actual < target + tolerance
}
