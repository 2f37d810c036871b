//! Packed 32-bit point record shared by every history ring.
//!
//! Bit layout (LSB first): `y:12, key:1, fill:1, able:1, predict:1, x:12, id:4`.
//! The layout is part of the controller contract, so all access goes through
//! explicit shifts and masks rather than any in-memory aliasing.

use std::fmt;

pub const FLAG_KEY: u32 = 0x1 << 12;
pub const FLAG_FILL: u32 = 0x2 << 12;
pub const FLAG_ABLE: u32 = 0x4 << 12;
pub const FLAG_PREDICT: u32 = 0x8 << 12;
pub const FLAG_COOR: u32 = 0x0fff_0fff;
pub const FLAG_ID: u32 = 0xf000_0000;

/// Identifier given to a candidate that failed the match gate.
pub const ID_NEW: u32 = 0xf;

const COORD_MASK: u32 = 0xfff;
const X_SHIFT: u32 = 16;
const ID_SHIFT: u32 = 28;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Point(u32);

impl Point {
    pub const EMPTY: Point = Point(0);
    /// Prediction written for a slot with no history.
    pub const SENTINEL: Point = Point(FLAG_COOR);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Point(bits)
    }

    /// Packs a raw controller candidate. Bits 12..15 of `y` carry flags and
    /// the `id` nibble may carry pressure.
    #[inline]
    pub const fn from_raw(x: u16, y: u16, id: u16) -> Self {
        Point(((id as u32) << ID_SHIFT) | ((x as u32) << X_SHIFT) | y as u32)
    }

    #[inline]
    pub fn new(x: u32, y: u32) -> Self {
        let mut p = Point(0);
        p.set_x(x);
        p.set_y(y);
        p
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn x(self) -> u32 {
        (self.0 >> X_SHIFT) & COORD_MASK
    }

    #[inline]
    pub fn set_x(&mut self, x: u32) {
        self.0 = (self.0 & !(COORD_MASK << X_SHIFT)) | ((x & COORD_MASK) << X_SHIFT);
    }

    #[inline]
    pub const fn y(self) -> u32 {
        self.0 & COORD_MASK
    }

    #[inline]
    pub fn set_y(&mut self, y: u32) {
        self.0 = (self.0 & !COORD_MASK) | (y & COORD_MASK);
    }

    #[inline]
    pub const fn id(self) -> u32 {
        self.0 >> ID_SHIFT
    }

    #[inline]
    pub fn set_id(&mut self, id: u32) {
        self.0 = (self.0 & !FLAG_ID) | ((id & 0xf) << ID_SHIFT);
    }

    #[inline]
    pub const fn key(self) -> bool {
        self.0 & FLAG_KEY != 0
    }

    #[inline]
    pub fn set_key(&mut self, on: bool) {
        self.set_flag(FLAG_KEY, on);
    }

    #[inline]
    pub const fn fill(self) -> bool {
        self.0 & FLAG_FILL != 0
    }

    #[inline]
    pub fn set_fill(&mut self, on: bool) {
        self.set_flag(FLAG_FILL, on);
    }

    #[inline]
    pub const fn able(self) -> bool {
        self.0 & FLAG_ABLE != 0
    }

    #[inline]
    pub const fn predict(self) -> bool {
        self.0 & FLAG_PREDICT != 0
    }

    #[inline]
    pub fn set_predict(&mut self, on: bool) {
        self.set_flag(FLAG_PREDICT, on);
    }

    /// Keeps only the bits selected by `mask`.
    #[inline]
    pub const fn masked(self, mask: u32) -> Self {
        Point(self.0 & mask)
    }

    #[inline]
    fn set_flag(&mut self, flag: u32, on: bool) {
        if on {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    /// `y` widened to 13 bits so that key points sit outside the panel plane.
    #[inline]
    const fn dis_y(self) -> u32 {
        self.0 & 0x1fff
    }

    /// Squared distance between two points in the 12-bit `x` / 13-bit `y` view.
    pub fn distance(self, other: Point) -> u32 {
        let dx = self.x() as i32 - other.x() as i32;
        let dy = self.dis_y() as i32 - other.dis_y() as i32;
        (dx * dx + dy * dy) as u32
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Point(empty)");
        }
        f.debug_struct("Point")
            .field("id", &self.id())
            .field("x", &self.x())
            .field("y", &self.y())
            .field("key", &self.key())
            .field("fill", &self.fill())
            .field("able", &self.able())
            .field("predict", &self.predict())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_packing_matches_bit_contract() {
        let p = Point::from_raw(0x123, 0x456 | 0x1000, 3);
        assert_eq!(p.bits(), 0x3123_1456);
        assert_eq!(p.x(), 0x123);
        assert_eq!(p.y(), 0x456);
        assert!(p.key());
        assert!(!p.fill());
        assert_eq!(p.id(), 3);
    }

    #[test]
    fn setters_leave_other_fields_alone() {
        let mut p = Point::from_bits(0xffff_ffff);
        p.set_x(0);
        assert_eq!(p.bits(), 0xf000_ffff);
        p.set_y(0);
        assert_eq!(p.bits(), 0xf000_f000);
        p.set_id(0);
        p.set_fill(false);
        assert_eq!(p.bits(), 0x0000_d000);
    }

    #[test]
    fn key_points_are_far_from_panel_points() {
        let mut key = Point::new(10, 10);
        key.set_key(true);
        let plain = Point::new(10, 10);
        assert_eq!(plain.distance(Point::new(13, 14)), 25);
        assert_eq!(key.distance(plain), 4096 * 4096);
    }

    #[test]
    fn sentinel_has_max_coordinates() {
        assert_eq!(Point::SENTINEL.x(), 0xfff);
        assert_eq!(Point::SENTINEL.y(), 0xfff);
        assert_eq!(Point::SENTINEL.id(), 0);
    }
}
