// The caller-owned touch record and its JSON-lines encoding for the replay
// binary.

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

use crate::POINT_MAX;

/// One interrupt's worth of touch data, exchanged with the engine in place.
///
/// On input `x`/`y` are raw panel coordinates (bits 12..15 of `y` carry
/// controller flags), `id` is unused or carries pressure, and `finger_num`
/// holds the candidate count in bits 0..7 plus mode bits. On output the
/// arrays hold screen coordinates and IDs for the first `finger_num`
/// entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchInfo {
    pub x: [u16; POINT_MAX],
    pub y: [u16; POINT_MAX],
    pub id: [u16; POINT_MAX],
    pub finger_num: u32,
}

impl TouchInfo {
    /// Builds an input frame from `(x, y)` candidates; extra candidates
    /// beyond `POINT_MAX` are ignored. `flags` is OR-ed into `finger_num`.
    pub fn with_points(points: &[(u16, u16)], flags: u32) -> Self {
        let mut info = TouchInfo::default();
        let n = points.len().min(POINT_MAX);
        for (i, &(x, y)) in points.iter().take(n).enumerate() {
            info.x[i] = x;
            info.y[i] = y;
        }
        info.finger_num = n as u32 | flags;
        info
    }

    /// Number of emitted points after a call to the engine.
    #[inline]
    pub fn count(&self) -> usize {
        (self.finger_num as usize).min(POINT_MAX)
    }

    /// `(id, x, y)` for each emitted point.
    pub fn points(&self) -> impl Iterator<Item = (u16, u16, u16)> + '_ {
        (0..self.count()).map(move |i| (self.id[i], self.x[i], self.y[i]))
    }
}

/// One output line of the replay binary.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportLine {
    #[serde(flatten)]
    pub info: TouchInfo,
    /// Reset-mask token taken after this frame (0 when none).
    pub reset_mask: u32,
    pub near: bool,
    pub pressure: [u32; POINT_MAX],
}

/// Reads the next frame, skipping blank lines. Returns `Ok(None)` on EOF.
pub fn read_frame<R: BufRead>(reader: &mut R, line: &mut String) -> io::Result<Option<TouchInfo>> {
    loop {
        line.clear();
        if reader.read_line(line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
    }
}

/// Writes one report as a single JSON line.
pub fn write_frame<W: Write>(writer: &mut W, report: &ReportLine) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, report).map_err(io::Error::from)?;
    writer.write_all(b"\n")
}
