//! Engine configuration and the parser for the controller's opaque config blob.
//!
//! Two blob layouts exist. A first word `<= 0xfff` selects the legacy layout,
//! whose effective length is guessed by probing the tail; anything larger
//! selects the versioned layout, whose second word carries the length.

use serde::Serialize;
use tracing::debug;

use crate::POINT_MAX;

/// Largest blob the parser looks at, in words.
pub const CONFIG_LENGTH: usize = 512;

const LEGACY_FIRST_WORD_MAX: u32 = 0xfff;

/// Word offsets of the legacy layout.
pub mod legacy {
    pub const CORRECT_ABLE: usize = 0;
    pub const DRV_NUM: usize = 1;
    pub const SEN_NUM: usize = 2;
    pub const DRV_NUM_NOKEY: usize = 3;
    pub const SEN_NUM_NOKEY: usize = 4;
    pub const ID_FIRST_COE: usize = 5;
    pub const ID_SPEED_COE: usize = 6;
    pub const ID_STATIC_COE: usize = 7;
    pub const AVERAGE: usize = 8;
    pub const SOFT_AVERAGE: usize = 9;
    pub const REPORT_DELAY: usize = 13;
    pub const SHAKE_MIN: usize = 14;
    pub const SCREEN_Y_MAX: usize = 15;
    pub const SCREEN_X_MAX: usize = 16;
    pub const POINT_NUM_MAX: usize = 17;
    pub const GLOBAL_FLAG: usize = 18;
    pub const MEDIAN_DIS: usize = 19;
    pub const MATCH_Y: usize = 23;
    pub const MATCH_X: usize = 25;
    pub const IGNORE_Y: usize = 27;
    pub const IGNORE_X: usize = 29;
    pub const CORRECT_COE_X: usize = 31;
    pub const CORRECT_COE_Y: usize = 95;
    pub const EDGE_CUT: usize = 159;
    pub const STRETCH: usize = 163;
    pub const SHAKE_ALL: usize = 195;
    pub const RESET_MASK_DIS: usize = 213;
    pub const RESET_MASK_TYPE: usize = 214;
    pub const KEY_MAP_ABLE: usize = 217;
    pub const KEY_RANGE: usize = 218;
    pub const FILTER_ABLE: usize = 242;
    pub const FILTER_COE: usize = 243;
    pub const MULTI_X: usize = 247;
    pub const MULTI_Y: usize = 251;
    pub const DIAGONAL: usize = 255;
    pub const MULTI_GROUP: usize = 256;
    pub const PS_COE: usize = 256 + 64 * 3;
    pub const PR_COE: usize = PS_COE + 32;

    /// Tail lengths tried by the layout checks, longest first.
    pub const LEN_COORD_MULTI: usize = 512;
    pub const LEN_FILTER: usize = 256;
    pub const LEN_KEY_MAP: usize = 241;
    pub const LEN_BASE: usize = 215;
}

/// Word offsets of the versioned layout.
pub mod versioned {
    pub const LENGTH: usize = 0x01;
    pub const GLOBAL_FLAG: usize = 0x10;
    pub const POINT_NUM_MAX: usize = 0x11;
    pub const DRV_SEN: usize = 0x12;
    pub const DRV_SEN_NOKEY: usize = 0x13;
    pub const SCREEN: usize = 0x14;
    pub const AVERAGE: usize = 0x15;
    pub const RESET_MASK_DIS: usize = 0x16;
    pub const RESET_MASK_TYPE: usize = 0x17;
    pub const POINT_REPEAT: usize = 0x18;
    pub const NEAR_SET: usize = 0x19;
    pub const DIAGONAL: usize = 0x1a;
    pub const ID_FIRST_COE: usize = 0x20;
    pub const ID_SPEED_COE: usize = 0x21;
    pub const ID_STATIC_COE: usize = 0x22;
    pub const MATCH_Y: usize = 0x23;
    pub const MATCH_X: usize = 0x24;
    pub const IGNORE_Y: usize = 0x25;
    pub const IGNORE_X: usize = 0x26;
    pub const EDGE_CUT: usize = 0x27;
    pub const REPORT_DELAY: usize = 0x28;
    pub const SHAKE_MIN: usize = 0x29;
    pub const STRETCH: usize = 0x2a;
    pub const SHAKE_ALL: usize = 0x3a;
    pub const REPORT_AHEAD: usize = 0x42;
    pub const KEY_MAP_ABLE: usize = 0x60;
    pub const KEY_RANGE: usize = 0x61;
    pub const CORRECT_ABLE: usize = 0x100;
    pub const MULTI_X: usize = 0x101;
    pub const MULTI_Y: usize = 0x105;
    pub const CORRECT_COE_X: usize = 0x109;
    pub const CORRECT_COE_Y: usize = CORRECT_COE_X + 16;
    pub const MULTI_GROUP: usize = CORRECT_COE_Y + 16;
    pub const FILTER_ABLE: usize = 0x180;
    pub const FILTER_COE: usize = 0x181;
    pub const MEDIAN_DIS: usize = 0x185;
    pub const PS_COE: usize = 0x189;
    pub const PR_COE: usize = PS_COE + 32;
}

/// Which blob layout `Config::from_words` recognised, and how many words it read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// No blob was supplied; built-in defaults are in force.
    Default,
    Legacy { len: usize },
    Versioned { len: usize },
}

impl Layout {
    /// Number of blob words the layout consumes.
    pub fn words(self) -> usize {
        match self {
            Layout::Default => 0,
            Layout::Legacy { len } | Layout::Versioned { len } => len,
        }
    }
}

/// Orientation and feature bits from the `global_flag` word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GlobalFlags(pub u32);

impl GlobalFlags {
    #[inline]
    const fn bit(self, n: u32) -> bool {
        self.0 & (1 << n) != 0
    }

    /// Suppress the whole frame when more fingers than `point_num_max` are live.
    pub const fn over_report_mask(self) -> bool {
        self.bit(0)
    }
    pub const fn opposite_x(self) -> bool {
        self.bit(1)
    }
    pub const fn opposite_y(self) -> bool {
        self.bit(2)
    }
    pub const fn opposite_xy(self) -> bool {
        self.bit(3)
    }
    pub const fn line(self) -> bool {
        self.bit(4)
    }
    pub const fn line_neg(self) -> bool {
        self.bit(5)
    }
    pub const fn line_half(self) -> bool {
        self.bit(6)
    }
    pub const fn middle_drv(self) -> bool {
        self.bit(7)
    }
    /// Enables the proximity ("near") detector.
    pub const fn c2f_able(self) -> bool {
        self.bit(19)
    }
}

/// Complete engine configuration. Every field is public so hosts may build
/// one directly instead of going through a blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub coordinate_correct_able: u32,
    pub drv_num: u32,
    pub sen_num: u32,
    pub drv_num_nokey: u32,
    pub sen_num_nokey: u32,
    pub id_first_coe: u32,
    pub id_speed_coe: u32,
    pub id_static_coe: u32,
    pub average: u32,
    pub soft_average: u32,
    pub report_delay: u32,
    pub report_ahead: u32,
    pub shake_min: u32,
    pub screen_x_max: i32,
    pub screen_y_max: i32,
    pub point_num_max: u32,
    pub global_flag: GlobalFlags,
    pub median_dis: [u8; 4],
    /// `[scale, offset]`, scale in 1/4096 units.
    pub match_x: [i32; 2],
    pub match_y: [i32; 2],
    /// `[top, bottom]` rejection bands in screen units.
    pub ignore_x: [i32; 2],
    pub ignore_y: [i32; 2],
    /// `[left, right, top, bottom]` clip margins in screen units.
    pub edge_cut: [u32; 4],
    pub coordinate_correct_coe_x: [u32; 64],
    pub coordinate_correct_coe_y: [u32; 64],
    pub multi_x_array: [u32; 4],
    pub multi_y_array: [u32; 4],
    pub multi_group: [[u32; 64]; 4],
    /// Four edges (up, down, left, right) of four `{range, coe}` stages.
    pub stretch_array: [u32; 32],
    /// Eight `{dis, coe}` pairs.
    pub shake_all_array: [u32; 16],
    pub reset_mask_dis: u32,
    pub reset_mask_type: u32,
    pub key_map_able: u32,
    /// Eight `{drv_range, sen_range, coord}` triples; ranges pack `min << 16 | max`.
    pub key_range_array: [u32; 24],
    pub filter_able: i32,
    pub filter_coe: [u32; 4],
    pub ps_coe: [[i32; 8]; 4],
    pub pr_coe: [[i32; 8]; 4],
    /// `[normal, near-mode]` merge radius.
    pub point_repeat: [i32; 2],
    /// `[enter, exit]` proximity thresholds.
    pub near_set: [i32; 2],
    pub diagonal: i32,
}

impl Default for Config {
    fn default() -> Self {
        let mut coe = [0u32; 64];
        for (i, c) in coe.iter_mut().take(32).enumerate() {
            *c = i as u32;
        }
        Config {
            coordinate_correct_able: 0,
            drv_num: 16,
            sen_num: 10,
            drv_num_nokey: 16,
            sen_num_nokey: 10,
            id_first_coe: 8,
            id_speed_coe: 128 * 128,
            id_static_coe: 64 * 64,
            average: 3 + 1,
            soft_average: 3,
            report_delay: 0,
            report_ahead: 0x924_9249,
            shake_min: 0,
            screen_x_max: 800,
            screen_y_max: 480,
            point_num_max: POINT_MAX as u32,
            global_flag: GlobalFlags(0),
            median_dis: [0; 4],
            match_x: [4096, 0],
            match_y: [4096, 0],
            ignore_x: [0; 2],
            ignore_y: [0; 2],
            edge_cut: [0; 4],
            coordinate_correct_coe_x: coe,
            coordinate_correct_coe_y: coe,
            multi_x_array: [0; 4],
            multi_y_array: [0; 4],
            multi_group: [[0; 64]; 4],
            stretch_array: [0; 32],
            shake_all_array: [0; 16],
            reset_mask_dis: 0,
            reset_mask_type: 0,
            key_map_able: 0,
            key_range_array: [0; 24],
            filter_able: 0,
            filter_coe: [
                (40 << 6) + 24,
                (16 << 12) + (24 << 6) + 24,
                (16 << 18) + (24 << 12) + (16 << 6) + 8,
                (6 << 24) + (16 << 18) + (24 << 12) + (12 << 6) + 6,
            ],
            ps_coe: [[0; 8]; 4],
            pr_coe: [[0; 8]; 4],
            point_repeat: [32, 96],
            near_set: [0; 2],
            diagonal: 0,
        }
    }
}

impl Config {
    /// Parses a controller blob. Never fails: malformed blobs degrade to a
    /// mostly-zero configuration that `geometry_valid` rejects at run time.
    pub fn from_words(words: &[u32]) -> (Config, Layout) {
        let layout = detect_layout(words);
        let mut conf = [0u32; CONFIG_LENGTH];
        let len = layout.words().min(words.len());
        conf[..len].copy_from_slice(&words[..len]);

        let mut cfg = Config::default();
        match layout {
            Layout::Default => {}
            Layout::Legacy { .. } => cfg.apply_legacy(&conf),
            Layout::Versioned { .. } => cfg.apply_versioned(&conf),
        }
        for v in cfg
            .match_x
            .iter_mut()
            .chain(cfg.match_y.iter_mut())
            .chain(cfg.ignore_x.iter_mut())
            .chain(cfg.ignore_y.iter_mut())
        {
            *v = sign_extend_16(*v);
        }
        cfg.point_num_max = cfg.point_num_max.min(POINT_MAX as u32);

        debug!(
            ?layout,
            drv = cfg.drv_num_nokey,
            sen = cfg.sen_num_nokey,
            screen_x = cfg.screen_x_max,
            screen_y = cfg.screen_y_max,
            filter = cfg.filter_able,
            "Configuration blob parsed"
        );
        (cfg, layout)
    }

    fn apply_legacy(&mut self, conf: &[u32; CONFIG_LENGTH]) {
        use legacy::*;
        self.coordinate_correct_able = conf[CORRECT_ABLE];
        self.drv_num = conf[DRV_NUM];
        self.sen_num = conf[SEN_NUM];
        self.drv_num_nokey = conf[DRV_NUM_NOKEY];
        self.sen_num_nokey = conf[SEN_NUM_NOKEY];
        self.id_first_coe = conf[ID_FIRST_COE];
        self.id_speed_coe = conf[ID_SPEED_COE];
        self.id_static_coe = conf[ID_STATIC_COE];
        self.average = conf[AVERAGE];
        self.soft_average = conf[SOFT_AVERAGE];
        self.report_delay = conf[REPORT_DELAY];
        self.shake_min = conf[SHAKE_MIN];
        self.screen_y_max = conf[SCREEN_Y_MAX] as i32;
        self.screen_x_max = conf[SCREEN_X_MAX] as i32;
        self.point_num_max = conf[POINT_NUM_MAX];
        self.global_flag = GlobalFlags(conf[GLOBAL_FLAG]);
        for i in 0..4 {
            self.median_dis[i] = conf[MEDIAN_DIS + i] as u8;
        }
        for i in 0..2 {
            self.match_y[i] = conf[MATCH_Y + i] as i32;
            self.match_x[i] = conf[MATCH_X + i] as i32;
            self.ignore_y[i] = conf[IGNORE_Y + i] as i32;
            self.ignore_x[i] = conf[IGNORE_X + i] as i32;
        }
        self.coordinate_correct_coe_x
            .copy_from_slice(&conf[CORRECT_COE_X..CORRECT_COE_X + 64]);
        self.coordinate_correct_coe_y
            .copy_from_slice(&conf[CORRECT_COE_Y..CORRECT_COE_Y + 64]);
        self.edge_cut.copy_from_slice(&conf[EDGE_CUT..EDGE_CUT + 4]);
        self.stretch_array.copy_from_slice(&conf[STRETCH..STRETCH + 32]);
        self.shake_all_array
            .copy_from_slice(&conf[SHAKE_ALL..SHAKE_ALL + 16]);
        self.reset_mask_dis = conf[RESET_MASK_DIS];
        self.reset_mask_type = conf[RESET_MASK_TYPE];
        self.key_map_able = conf[KEY_MAP_ABLE];
        self.key_range_array
            .copy_from_slice(&conf[KEY_RANGE..KEY_RANGE + 24]);
        self.filter_able = conf[FILTER_ABLE] as i32;
        self.filter_coe.copy_from_slice(&conf[FILTER_COE..FILTER_COE + 4]);
        self.multi_x_array.copy_from_slice(&conf[MULTI_X..MULTI_X + 4]);
        self.multi_y_array.copy_from_slice(&conf[MULTI_Y..MULTI_Y + 4]);
        self.diagonal = conf[DIAGONAL] as i32;
        for (g, group) in self.multi_group.iter_mut().enumerate() {
            let base = MULTI_GROUP + g * 64;
            group.copy_from_slice(&conf[base..base + 64]);
        }
        for i in 0..32 {
            self.ps_coe[i / 8][i % 8] = conf[PS_COE + i] as i32;
            self.pr_coe[i / 8][i % 8] = conf[PR_COE + i] as i32;
        }
        self.near_set = [0, 0];
    }

    fn apply_versioned(&mut self, conf: &[u32; CONFIG_LENGTH]) {
        use versioned::*;
        self.global_flag = GlobalFlags(conf[GLOBAL_FLAG]);
        self.point_num_max = conf[POINT_NUM_MAX];
        self.drv_num = low16(conf[DRV_SEN]);
        self.sen_num = conf[DRV_SEN] >> 16;
        self.drv_num_nokey = low16(conf[DRV_SEN_NOKEY]);
        self.sen_num_nokey = conf[DRV_SEN_NOKEY] >> 16;
        self.screen_x_max = low16(conf[SCREEN]) as i32;
        self.screen_y_max = (conf[SCREEN] >> 16) as i32;
        self.average = conf[AVERAGE];
        self.reset_mask_dis = conf[RESET_MASK_DIS];
        self.reset_mask_type = conf[RESET_MASK_TYPE];
        self.point_repeat = [
            (conf[POINT_REPEAT] >> 16) as i32,
            low16(conf[POINT_REPEAT]) as i32,
        ];
        self.near_set = [
            (conf[NEAR_SET] >> 16) as i32,
            low16(conf[NEAR_SET]) as i32,
        ];
        self.diagonal = conf[DIAGONAL] as i32;

        self.id_first_coe = conf[ID_FIRST_COE];
        self.id_speed_coe = conf[ID_SPEED_COE];
        self.id_static_coe = conf[ID_STATIC_COE];
        self.match_y = split16(conf[MATCH_Y]);
        self.match_x = split16(conf[MATCH_X]);
        self.ignore_y = split16(conf[IGNORE_Y]);
        self.ignore_x = split16(conf[IGNORE_X]);
        let cut = conf[EDGE_CUT];
        self.edge_cut = [(cut >> 24) & 0xff, (cut >> 16) & 0xff, (cut >> 8) & 0xff, cut & 0xff];
        self.report_delay = conf[REPORT_DELAY];
        self.shake_min = conf[SHAKE_MIN];
        for i in 0..16 {
            self.stretch_array[i * 2] = low16(conf[STRETCH + i]);
            self.stretch_array[i * 2 + 1] = conf[STRETCH + i] >> 16;
        }
        for i in 0..8 {
            self.shake_all_array[i * 2] = low16(conf[SHAKE_ALL + i]);
            self.shake_all_array[i * 2 + 1] = conf[SHAKE_ALL + i] >> 16;
        }
        self.report_ahead = conf[REPORT_AHEAD];

        self.key_map_able = conf[KEY_MAP_ABLE];
        self.key_range_array
            .copy_from_slice(&conf[KEY_RANGE..KEY_RANGE + 24]);

        self.coordinate_correct_able = conf[CORRECT_ABLE];
        self.multi_x_array.copy_from_slice(&conf[MULTI_X..MULTI_X + 4]);
        self.multi_y_array.copy_from_slice(&conf[MULTI_Y..MULTI_Y + 4]);
        for i in 0..64 {
            self.coordinate_correct_coe_x[i] = byte_at(conf, CORRECT_COE_X, i);
            self.coordinate_correct_coe_y[i] = byte_at(conf, CORRECT_COE_Y, i);
        }
        for i in 0..256 {
            self.multi_group[i / 64][i % 64] = byte_at(conf, MULTI_GROUP, i);
        }

        self.filter_able = conf[FILTER_ABLE] as i32;
        self.filter_coe.copy_from_slice(&conf[FILTER_COE..FILTER_COE + 4]);
        for i in 0..4 {
            self.median_dis[i] = conf[MEDIAN_DIS + i] as u8;
        }
        for i in 0..32 {
            self.ps_coe[i / 8][i % 8] = conf[PS_COE + i] as i32;
            self.pr_coe[i / 8][i % 8] = conf[PR_COE + i] as i32;
        }
    }

    /// Panel geometry and screen size are usable; otherwise every frame is dropped.
    pub fn geometry_valid(&self) -> bool {
        self.drv_num != 0
            && self.drv_num_nokey != 0
            && self.sen_num != 0
            && self.sen_num_nokey != 0
            && self.screen_x_max != 0
            && self.screen_y_max != 0
    }

    /// Panel width (drive axis) in 64-per-line units.
    #[inline]
    pub fn panel_x(&self) -> i64 {
        i64::from(self.drv_num_nokey) * 64
    }

    /// Panel height (sense axis) in 64-per-line units.
    #[inline]
    pub fn panel_y(&self) -> i64 {
        i64::from(self.sen_num_nokey) * 64
    }
}

/// Runs the layout checks without building a configuration.
pub fn detect_layout(words: &[u32]) -> Layout {
    let data = padded(words);
    if data[0] <= LEGACY_FIRST_WORD_MAX {
        let len = if has_coord_multi(&data) {
            legacy::LEN_COORD_MULTI
        } else if has_filter(&data) {
            legacy::LEN_FILTER
        } else if has_key_map(&data) {
            legacy::LEN_KEY_MAP
        } else {
            legacy::LEN_BASE
        };
        Layout::Legacy { len }
    } else {
        Layout::Versioned {
            len: (data[versioned::LENGTH] as usize).min(CONFIG_LENGTH),
        }
    }
}

fn padded(words: &[u32]) -> [u32; CONFIG_LENGTH] {
    let mut data = [0u32; CONFIG_LENGTH];
    let n = words.len().min(CONFIG_LENGTH);
    data[..n].copy_from_slice(&words[..n]);
    data
}

/// Multi-segment correction tables: every non-zero descriptor is 64-aligned with
/// a group below 4, and each referenced table holds non-decreasing values below 64.
fn has_coord_multi(data: &[u32; CONFIG_LENGTH]) -> bool {
    let mut n = 0;
    for &word in &data[legacy::MULTI_X..legacy::MULTI_Y + 4] {
        if word == 0 {
            continue;
        }
        if word & 63 != 0 || word >> 16 >= 4 {
            return false;
        }
        n += 1;
    }
    if n == 0 || n > 4 {
        return false;
    }
    data[legacy::MULTI_GROUP..legacy::MULTI_GROUP + n * 64]
        .chunks_exact(64)
        .all(|table| table.iter().all(|&v| v < 64) && table.windows(2).all(|w| w[0] <= w[1]))
}

/// Fixed-filter tail: the signed coefficient bytes sum to `±filter_able`.
fn has_filter(data: &[u32; CONFIG_LENGTH]) -> bool {
    let able = data[legacy::FILTER_ABLE];
    if able <= 1 || data[legacy::DIAGONAL] > 256 {
        return false;
    }
    let sum = data[legacy::FILTER_COE..legacy::FILTER_COE + 4]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .fold(0i32, |acc, b| acc.wrapping_add(i32::from(b as i8))) as u32;
    sum == able || sum.wrapping_add(able) == 0
}

/// Key-map tail: enabled, first key has an emitted coordinate, and every range
/// is ordered `min <= max`.
fn has_key_map(data: &[u32; CONFIG_LENGTH]) -> bool {
    if data[legacy::KEY_MAP_ABLE] != 1 || data[legacy::KEY_RANGE + 2] == 0 {
        return false;
    }
    data[legacy::KEY_RANGE..legacy::KEY_RANGE + 24]
        .chunks_exact(3)
        .all(|key| range_ordered(key[0]) && range_ordered(key[1]))
}

#[inline]
fn range_ordered(word: u32) -> bool {
    word >> 16 <= low16(word)
}

#[inline]
fn low16(word: u32) -> u32 {
    word & 0xffff
}

#[inline]
fn split16(word: u32) -> [i32; 2] {
    [(word >> 16) as i32, low16(word) as i32]
}

#[inline]
fn byte_at(conf: &[u32; CONFIG_LENGTH], base: usize, i: usize) -> u32 {
    (conf[base + i / 4] >> (i % 4 * 8)) & 0xff
}

#[inline]
fn sign_extend_16(v: i32) -> i32 {
    if v & 0x8000 != 0 {
        v | !0xffff
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_legacy() -> Vec<u32> {
        let mut w = vec![0u32; CONFIG_LENGTH];
        w[legacy::DRV_NUM] = 16;
        w[legacy::SEN_NUM] = 10;
        w[legacy::DRV_NUM_NOKEY] = 16;
        w[legacy::SEN_NUM_NOKEY] = 10;
        w[legacy::SCREEN_X_MAX] = 1024;
        w[legacy::SCREEN_Y_MAX] = 600;
        w[legacy::POINT_NUM_MAX] = 10;
        w[legacy::MATCH_X] = 4096;
        w[legacy::MATCH_Y] = 4096;
        w
    }

    #[test]
    fn no_blob_is_default() {
        let cfg = Config::default();
        assert_eq!(cfg.match_x, [4096, 0]);
        assert_eq!((cfg.screen_x_max, cfg.screen_y_max), (800, 480));
        assert_eq!(cfg.point_num_max, 10);
        assert_eq!((cfg.drv_num, cfg.sen_num), (16, 10));
        assert_eq!(cfg.coordinate_correct_coe_x[31], 31);
        assert_eq!(cfg.coordinate_correct_coe_x[32], 0);
        assert!(cfg.geometry_valid());
    }

    #[test]
    fn plain_legacy_blob_reads_base_length() {
        let w = base_legacy();
        assert_eq!(detect_layout(&w), Layout::Legacy { len: 215 });
        let (cfg, _) = Config::from_words(&w);
        assert_eq!(cfg.screen_x_max, 1024);
        assert_eq!(cfg.screen_y_max, 600);
        assert_eq!(cfg.match_x, [4096, 0]);
        // Legacy layout does not carry these; defaults survive.
        assert_eq!(cfg.point_repeat, [32, 96]);
        assert_eq!(cfg.report_ahead, 0x924_9249);
    }

    #[test]
    fn words_past_chosen_length_are_ignored() {
        let mut w = base_legacy();
        w[legacy::KEY_MAP_ABLE] = 1;
        let (cfg, layout) = Config::from_words(&w);
        // First key has no coordinate, so the key-map check fails.
        assert_eq!(layout, Layout::Legacy { len: 215 });
        assert_eq!(cfg.key_map_able, 0);
    }

    #[test]
    fn key_map_check_selects_241() {
        let mut w = base_legacy();
        w[legacy::KEY_MAP_ABLE] = 1;
        w[legacy::KEY_RANGE] = 64;
        w[legacy::KEY_RANGE + 1] = (640 << 16) | 704;
        w[legacy::KEY_RANGE + 2] = (1000 << 16) | 50;
        w[legacy::FILTER_ABLE] = 7;
        let (cfg, layout) = Config::from_words(&w);
        assert_eq!(layout, Layout::Legacy { len: 241 });
        assert_eq!(cfg.key_map_able, 1);
        assert_eq!(cfg.key_range_array[2], (1000 << 16) | 50);
        assert_eq!(cfg.filter_able, 0);
    }

    #[test]
    fn key_map_check_rejects_inverted_range() {
        let mut w = base_legacy();
        w[legacy::KEY_MAP_ABLE] = 1;
        w[legacy::KEY_RANGE] = (64 << 16) | 0;
        w[legacy::KEY_RANGE + 2] = 1;
        assert_eq!(detect_layout(&w), Layout::Legacy { len: 215 });
    }

    #[test]
    fn filter_check_selects_256() {
        let mut w = base_legacy();
        w[legacy::FILTER_ABLE] = 64;
        // ps bytes: 40, 24; pr bytes: 0 → sum 64.
        w[legacy::FILTER_COE] = 40 | (24 << 8);
        w[legacy::DIAGONAL] = 12;
        let (cfg, layout) = Config::from_words(&w);
        assert_eq!(layout, Layout::Legacy { len: 256 });
        assert_eq!(cfg.filter_able, 64);
        assert_eq!(cfg.diagonal, 12);
    }

    #[test]
    fn filter_check_accepts_negated_sum() {
        let mut w = base_legacy();
        w[legacy::FILTER_ABLE] = 2;
        // Two bytes of -1.
        w[legacy::FILTER_COE] = 0xffff;
        assert_eq!(detect_layout(&w), Layout::Legacy { len: 256 });
    }

    #[test]
    fn coord_multi_check_selects_512() {
        let mut w = base_legacy();
        w[legacy::MULTI_X] = 512 | (1 << 16);
        for i in 0..64 {
            w[legacy::MULTI_GROUP + i] = i as u32 / 2;
        }
        // A valid filter tail too; the coord-multi check wins.
        w[legacy::FILTER_ABLE] = 64;
        w[legacy::FILTER_COE] = 64;
        let (cfg, layout) = Config::from_words(&w);
        assert_eq!(layout, Layout::Legacy { len: 512 });
        assert_eq!(cfg.multi_group[0][63], 31);
        assert_eq!(cfg.multi_x_array[0] >> 16, 1);
    }

    #[test]
    fn coord_multi_check_rejects_decreasing_table() {
        let mut w = base_legacy();
        w[legacy::MULTI_Y] = 256;
        w[legacy::MULTI_GROUP] = 5;
        w[legacy::MULTI_GROUP + 1] = 4;
        assert_eq!(detect_layout(&w), Layout::Legacy { len: 215 });
    }

    #[test]
    fn short_blob_is_zero_padded() {
        let (cfg, layout) = Config::from_words(&[0, 16, 10]);
        assert_eq!(layout, Layout::Legacy { len: 215 });
        assert_eq!(cfg.drv_num, 16);
        assert_eq!(cfg.sen_num_nokey, 0);
        assert!(!cfg.geometry_valid());
    }

    #[test]
    fn versioned_blob_unpacks_halves() {
        let mut w = vec![0u32; 0x200];
        w[0] = 0x1234_5678;
        w[versioned::LENGTH] = 0x200;
        w[versioned::DRV_SEN] = (12 << 16) | 20;
        w[versioned::DRV_SEN_NOKEY] = (11 << 16) | 20;
        w[versioned::SCREEN] = (600 << 16) | 1024;
        w[versioned::POINT_REPEAT] = (40 << 16) | 100;
        w[versioned::MATCH_X] = (4096 << 16) | 0xfff0;
        w[versioned::EDGE_CUT] = 0x0102_0304;
        w[versioned::CORRECT_COE_X] = 0x0302_0100;
        w[versioned::FILTER_ABLE] = (-8i32) as u32;
        let (cfg, layout) = Config::from_words(&w);
        assert_eq!(layout, Layout::Versioned { len: 0x200 });
        assert_eq!((cfg.drv_num, cfg.sen_num), (20, 12));
        assert_eq!((cfg.drv_num_nokey, cfg.sen_num_nokey), (20, 11));
        assert_eq!((cfg.screen_x_max, cfg.screen_y_max), (1024, 600));
        assert_eq!(cfg.point_repeat, [40, 100]);
        assert_eq!(cfg.match_x, [4096, -16]);
        assert_eq!(cfg.edge_cut, [1, 2, 3, 4]);
        assert_eq!(&cfg.coordinate_correct_coe_x[..4], &[0, 1, 2, 3]);
        assert_eq!(cfg.filter_able, -8);
    }

    #[test]
    fn versioned_length_is_clamped() {
        let mut w = vec![0u32; 8];
        w[0] = 0x1000;
        w[1] = 0xffff;
        assert_eq!(detect_layout(&w), Layout::Versioned { len: CONFIG_LENGTH });
        // Only eight words exist; the rest read as zero.
        let (cfg, _) = Config::from_words(&w);
        assert_eq!(cfg.drv_num, 0);
    }

    #[test]
    fn parsing_is_deterministic() {
        let w = base_legacy();
        assert_eq!(Config::from_words(&w), Config::from_words(&w));
    }

    #[test]
    fn point_num_max_is_bounded() {
        let mut w = base_legacy();
        w[legacy::POINT_NUM_MAX] = 40;
        let (cfg, _) = Config::from_words(&w);
        assert_eq!(cfg.point_num_max, POINT_MAX as u32);
    }

    #[test]
    fn flags_decode() {
        let f = GlobalFlags(0b1011 | (1 << 19));
        assert!(f.over_report_mask());
        assert!(f.opposite_x());
        assert!(!f.opposite_y());
        assert!(f.opposite_xy());
        assert!(f.c2f_able());
        assert!(!f.line_half());
    }
}
