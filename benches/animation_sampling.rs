use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Quat, Vec3};
use scene_viewer::animation::{AnimationClip, AnimationMixer, Channel, ChannelValues, Interpolation};
use scene_viewer::scene::{ModelInstance, SceneNode, Transform};

/// Chain of `nodes` nodes, each with a translation and a rotation track of `keys` keyframes
fn rig(nodes: usize, keys: usize) -> (ModelInstance, AnimationClip) {
    let scene_nodes = (0..nodes)
        .map(|i| SceneNode {
            name: None,
            parent: i.checked_sub(1),
            transform: Transform::from_translation(Vec3::Y),
        })
        .collect();
    let model = ModelInstance::new("rig", scene_nodes, Vec::new(), Transform::IDENTITY).unwrap();

    let times: Vec<f32> = (0..keys).map(|k| k as f32 / 30.0).collect();
    let channels = (0..nodes)
        .flat_map(|node| {
            let translations = times
                .iter()
                .map(|t| Vec3::new(t.sin(), 1.0, t.cos()))
                .collect();
            let rotations = times
                .iter()
                .map(|t| Quat::from_rotation_y(*t + node as f32))
                .collect();
            [
                Channel {
                    node,
                    interpolation: Interpolation::Linear,
                    times: times.clone(),
                    values: ChannelValues::Translation(translations),
                },
                Channel {
                    node,
                    interpolation: Interpolation::Linear,
                    times: times.clone(),
                    values: ChannelValues::Rotation(rotations),
                },
            ]
        })
        .collect();

    (model, AnimationClip::new("bench", channels))
}

fn bench_channel_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_sample");

    for keys in [8, 64, 512] {
        let (_, clip) = rig(1, keys);
        let channel = clip.channels[1].clone();
        let duration = channel.duration();

        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            let mut t = 0.0f32;
            b.iter(|| {
                t = (t + 0.013) % duration.max(f32::EPSILON);
                black_box(channel.sample(black_box(t)))
            });
        });
    }

    group.finish();
}

fn bench_mixer_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer_tick");

    for nodes in [4, 32, 128] {
        let (mut model, clip) = rig(nodes, 60);
        let mut mixer = AnimationMixer::new(vec![clip]).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, _| {
            b.iter(|| {
                mixer.advance(black_box(1.0 / 60.0));
                mixer.apply(&mut model);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_channel_sample, bench_mixer_tick);
criterion_main!(benches);
