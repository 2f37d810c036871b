#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use touch_track::{Config, Engine, TouchInfo, POINT_MAX};

// Bound the frames per case to keep runs short.
const MAX_FRAMES: usize = 256;

#[derive(Arbitrary, Debug)]
struct Case {
    config: Option<Vec<u32>>,
    overrides: Option<Overrides>,
    frames: Vec<RawFrame>,
}

/// Geometry and shaping words applied on top of the parsed blob.
#[derive(Arbitrary, Debug)]
struct Overrides {
    drv_num_nokey: u32,
    sen_num_nokey: u32,
    screen_x_max: i32,
    screen_y_max: i32,
    diagonal: i32,
    stretch_array: [u32; 32],
    shake_all_array: [u32; 16],
    filter_able: i32,
}

impl Overrides {
    fn apply(self, base: &Config) -> Option<Config> {
        let cfg = Config {
            drv_num_nokey: self.drv_num_nokey,
            sen_num_nokey: self.sen_num_nokey,
            screen_x_max: self.screen_x_max,
            screen_y_max: self.screen_y_max,
            diagonal: self.diagonal,
            stretch_array: self.stretch_array,
            shake_all_array: self.shake_all_array,
            filter_able: self.filter_able,
            ..base.clone()
        };
        // The engine only runs on geometry a blob could have produced.
        cfg.geometry_valid().then_some(cfg)
    }
}

#[derive(Arbitrary, Debug)]
struct RawFrame {
    x: [u16; POINT_MAX],
    y: [u16; POINT_MAX],
    id: [u16; POINT_MAX],
    finger_num: u32,
}

fuzz_target!(|case: Case| {
    let mut engine = Engine::new();
    engine.data_init(case.config.as_deref());
    if let Some(cfg) = case.overrides.and_then(|o| o.apply(engine.config())) {
        engine = Engine::with_config(cfg);
    }
    let max = engine.config().point_num_max as usize;

    for raw in case.frames.into_iter().take(MAX_FRAMES) {
        let mut info = TouchInfo {
            x: raw.x,
            y: raw.y,
            id: raw.id,
            finger_num: raw.finger_num,
        };
        engine.alg_id_main(&mut info);
        assert!(info.count() <= max);

        let mut pressure = [0; POINT_MAX];
        engine.report_pressure(&mut pressure);
        assert!(pressure[info.count()..].iter().all(|&p| p == 0));
        let _ = engine.mask_tiaoping();
    }
});
