use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use rdk_render::{CacheIndex, Renderer as _, SkiaRenderer};

fn prepare_renderer(width: u32, height: u32) -> SkiaRenderer {
    let mut r = SkiaRenderer::new(width, height, 3.0).expect("renderer");
    let center = (width as f32 * 0.5, height as f32 * 0.5);
    r.blit_cached(CacheIndex::FixationCross, center);
    r.blit_cached(CacheIndex::Dot, center);
    r
}

pub fn bench_blit_cached(c: &mut Criterion) {
    const WIDTH: u32 = 1280;
    const HEIGHT: u32 = 720;
    let mut group = c.benchmark_group("blit_cached");

    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    group.bench_function("fixation_center", |b| {
        let mut renderer = prepare_renderer(WIDTH, HEIGHT);
        b.iter(|| renderer.blit_cached(CacheIndex::FixationCross, black_box((640.0, 360.0))));
    });

    group.bench_function("dot_partially_offscreen", |b| {
        let mut renderer = prepare_renderer(WIDTH, HEIGHT);
        b.iter(|| renderer.blit_cached(CacheIndex::Dot, black_box((1278.5, 2.0))));
    });

    group.bench_function("cue_right", |b| {
        let mut renderer = prepare_renderer(WIDTH, HEIGHT);
        b.iter(|| renderer.blit_cached(CacheIndex::CueRight, black_box((720.0, 360.0))));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .confidence_level(0.95)
        .noise_threshold(0.02)
        .significance_level(0.05);
    targets = bench_blit_cached
}

criterion_main!(benches);
