use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rdk_core::{Dot, DotRole, StandardPhase, TrialState};
use rdk_render::{Scene, SkiaRenderer};
use rdk_timing::HighPrecisionTimer;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Dots spread evenly around a ring inside the aperture
fn ring_of_dots(count: usize, radius: f32) -> Vec<Dot> {
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            Dot {
                position: (radius * angle.cos(), radius * angle.sin()),
                heading: (1.0, 0.0),
                role: if i % 2 == 0 { DotRole::Signal } else { DotRole::Noise },
            }
        })
        .collect()
}

fn harness() -> (SkiaRenderer, Vec<u8>, HighPrecisionTimer) {
    let r = SkiaRenderer::new(WIDTH, HEIGHT, 3.0).expect("renderer");
    let fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

pub fn bench_stimulus_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    for count in [20usize, 200] {
        let dots = ring_of_dots(count, 2.0);
        g.bench_function(format!("stimulus_{count}_dots"), |b| {
            b.iter_batched(
                harness,
                |(mut r, mut fb, t)| {
                    let scene = Scene {
                        dots: &dots,
                        trial_state: Some(TrialState::AwaitingStimulus),
                        progress: Some((10, 36)),
                        ..Scene::default()
                    };
                    black_box(r.render_frame(&StandardPhase::Experiment, &scene, &mut fb, &t))
                        .ok();
                },
                BatchSize::LargeInput,
            )
        });
    }

    g.finish();
}

criterion_group!(benches, bench_stimulus_frame);
criterion_main!(benches);
