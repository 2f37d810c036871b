use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::io;
use touch_track::config::Config;
use touch_track::logger::FrameInfo;
use touch_track::stats::{Meta, StatsCollector};
use touch_track::{Engine, Layout, TouchInfo};

use test_helpers::*;

/// Five fingers sliding diagonally, one frame per step.
fn five_finger_frames(steps: u16) -> Vec<TouchInfo> {
    (0..steps)
        .map(|k| {
            let points: Vec<_> = (0..5u16).map(|f| (100 + f * 150 + k * 4, 80 + f * 90 + k * 2)).collect();
            frame(&points, 0)
        })
        .collect()
}

fn bench_engine_frame(c: &mut Criterion) {
    let single = frame(&[(512, 320)], 0);
    c.bench_function("engine::alg_id_main_single_touch", |b| {
        let mut engine = Engine::with_config(unit_panel());
        b.iter(|| {
            let mut info = single.clone();
            engine.alg_id_main(black_box(&mut info));
            info
        })
    });

    let frames = five_finger_frames(64);
    c.bench_function("engine::alg_id_main_five_finger_drag", |b| {
        b.iter_batched(
            || Engine::with_config(unit_panel()),
            |mut engine| {
                for f in &frames {
                    let mut info = f.clone();
                    engine.alg_id_main(&mut info);
                }
                engine
            },
            BatchSize::SmallInput,
        )
    });

    let filtered = Config {
        filter_able: -1,
        shake_min: 16,
        report_delay: 0o1111111111,
        ..unit_panel()
    };
    c.bench_function("engine::alg_id_main_five_finger_filtered", |b| {
        b.iter_batched(
            || Engine::with_config(filtered.clone()),
            |mut engine| {
                for f in &frames {
                    let mut info = f.clone();
                    engine.alg_id_main(&mut info);
                }
                engine
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config_parse(c: &mut Criterion) {
    let blob = legacy_blob(1024, 600);
    c.bench_function("config::from_words_legacy", |b| {
        b.iter(|| Config::from_words(black_box(&blob)))
    });
}

fn populated_stats() -> StatsCollector {
    let mut stats = StatsCollector::new();
    for (index, f) in five_finger_frames(200).into_iter().enumerate() {
        stats.record(&FrameInfo {
            index: index as u64,
            candidates: f.count(),
            flags: f.finger_num,
            output: f,
            reset: false,
            reset_mask: 0,
            near: false,
        });
    }
    stats
}

fn bench_stats(c: &mut Criterion) {
    let info = FrameInfo {
        index: 0,
        candidates: 2,
        flags: 2,
        output: frame(&[(100, 100), (200, 200)], 0),
        reset: false,
        reset_mask: 0,
        near: false,
    };
    c.bench_function("stats::record", |b| {
        let mut stats = StatsCollector::new();
        b.iter(|| stats.record(black_box(&info)))
    });

    let stats = populated_stats();
    let meta = Meta {
        config_source: "<default>".into(),
        layout: Layout::Default,
        log_all_frames: false,
        log_interval_us: 0,
    };
    c.bench_function("stats::print_stats_json", |b| {
        b.iter(|| stats.print_stats_json(&meta, None, io::sink()))
    });
}

criterion_group!(benches, bench_engine_frame, bench_config_parse, bench_stats);
criterion_main!(benches);
