//! Utility functions shared across modules.

use std::time::Duration;

/// Integer square root by successive approximation over bits 14..0.
///
/// Results saturate at `0x7fff`; negative inputs yield 0.
pub fn isqrt(d: i64) -> i32 {
    let mut ret: i64 = 0;
    for bit in (0..=14).rev() {
        let guess = ret + (1 << bit);
        if guess * guess <= d {
            ret = guess;
        }
    }
    ret as i32
}

/// Ascending in-place sort for the small fixed windows used by the engine.
pub fn sort_small(t: &mut [i32]) {
    for m in 0..t.len() {
        for n in m + 1..t.len() {
            if t[m] > t[n] {
                t.swap(m, n);
            }
        }
    }
}

/// Formats a `std::time::Duration` into a human-readable string using `humantime`.
#[inline]
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}
