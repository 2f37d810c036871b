//! Common helper functions for tests and benchmarks.
use touch_track::config::legacy;
use touch_track::frame::TouchInfo;
use touch_track::{Config, Engine};

// --- Constants ---
/// Bit 12 of a raw `y`: the candidate lies on the key strip.
pub const KEY_BIT: u16 = 0x1000;
pub const PANEL_X: u16 = 16 * 64;
pub const PANEL_Y: u16 = 10 * 64;

// --- Config Creation Helpers ---

/// 16x10 line panel mapped 1:1 onto a 1024x640 screen, no filtering.
pub fn unit_panel() -> Config {
    Config {
        screen_x_max: i32::from(PANEL_X),
        screen_y_max: i32::from(PANEL_Y),
        ..Config::default()
    }
}

/// 16x10 line panel on a 1024x600 screen, so `y` is scaled by 600/640.
pub fn scaled_panel() -> Config {
    Config {
        screen_x_max: 1024,
        screen_y_max: 600,
        ..Config::default()
    }
}

/// Minimal 215-word legacy blob for a 16x10 panel on the given screen with
/// an identity output scale.
pub fn legacy_blob(screen_x: u32, screen_y: u32) -> Vec<u32> {
    let mut w = vec![0u32; legacy::LEN_BASE];
    w[legacy::DRV_NUM] = 16;
    w[legacy::SEN_NUM] = 10;
    w[legacy::DRV_NUM_NOKEY] = 16;
    w[legacy::SEN_NUM_NOKEY] = 10;
    w[legacy::ID_FIRST_COE] = 8;
    w[legacy::ID_SPEED_COE] = 128 * 128;
    w[legacy::ID_STATIC_COE] = 64 * 64;
    w[legacy::AVERAGE] = 4;
    w[legacy::SOFT_AVERAGE] = 3;
    w[legacy::SCREEN_X_MAX] = screen_x;
    w[legacy::SCREEN_Y_MAX] = screen_y;
    w[legacy::POINT_NUM_MAX] = 10;
    w[legacy::MATCH_X] = 4096;
    w[legacy::MATCH_Y] = 4096;
    w
}

// --- Frame Creation Helpers ---

/// Input frame carrying `points` and the given mode bits.
pub fn frame(points: &[(u16, u16)], flags: u32) -> TouchInfo {
    TouchInfo::with_points(points, flags)
}

/// Raw key-strip candidate.
pub fn key(x: u16, y: u16) -> (u16, u16) {
    (x, y | KEY_BIT)
}

/// Evenly spaced positions from `from` to `to` inclusive, `steps + 1` in total.
pub fn drag(from: (u16, u16), to: (u16, u16), steps: u16) -> Vec<(u16, u16)> {
    let lerp = |a: u16, b: u16, k: u16| -> u16 {
        let (a, b, k, n) = (i32::from(a), i32::from(b), i32::from(k), i32::from(steps.max(1)));
        (a + (b - a) * k / n) as u16
    };
    (0..=steps)
        .map(|k| (lerp(from.0, to.0, k), lerp(from.1, to.1, k)))
        .collect()
}

// --- Engine Helpers ---

/// Runs one frame and returns the emitted `(id, x, y)` triples.
pub fn step(engine: &mut Engine, points: &[(u16, u16)], flags: u32) -> Vec<(u16, u16, u16)> {
    let mut info = frame(points, flags);
    engine.alg_id_main(&mut info);
    info.points().collect()
}

/// Runs a sequence of single-finger positions and returns every emitted frame.
pub fn run_path(engine: &mut Engine, path: &[(u16, u16)]) -> Vec<Vec<(u16, u16, u16)>> {
    path.iter().map(|&p| step(engine, &[p], 0)).collect()
}

// --- Replay I/O Helpers ---

/// JSON-lines input for the replay binary.
pub fn frames_jsonl(frames: &[TouchInfo]) -> String {
    let mut out = String::new();
    for f in frames {
        out.push_str(&serde_json::to_string(f).unwrap_or_default());
        out.push('\n');
    }
    out
}

/// Parses the replay binary's stdout into one JSON value per line.
pub fn parse_reports(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}
