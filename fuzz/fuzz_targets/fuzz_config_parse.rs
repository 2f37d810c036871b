#![no_main]

use libfuzzer_sys::fuzz_target;
use touch_track::config::{detect_layout, Config, Layout};
use touch_track::{Engine, POINT_MAX};

fuzz_target!(|words: Vec<u32>| {
    let (cfg, layout) = Config::from_words(&words);
    assert_eq!(layout, detect_layout(&words));
    assert!(cfg.point_num_max as usize <= POINT_MAX);
    if let Layout::Legacy { len } = layout {
        assert!([512, 256, 241, 215].contains(&len));
    }

    // Any parsed blob must survive initialisation and one frame.
    let mut engine = Engine::new();
    engine.data_init(Some(&words));
    let mut info = touch_track::TouchInfo::with_points(&[(300, 200)], 0);
    engine.alg_id_main(&mut info);
});
