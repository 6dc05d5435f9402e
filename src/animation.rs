use glam::{Quat, Vec3};

use crate::scene::ModelInstance;

/// How values between keyframes are produced.
///
/// Cubic-spline tracks are reduced to their value keys on load and sampled linearly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Translation(v) | Self::Scale(v) => v.len(),
            Self::Rotation(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One animated property of one node
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub node: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

/// Sampled value of a channel at some time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

impl Channel {
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Value at `time`; times outside the track hold the first/last key
    pub fn sample(&self, time: f32) -> Option<Sample> {
        let count = self.times.len().min(self.values.len());
        if count == 0 {
            return None;
        }
        let (i0, i1, alpha) = segment(&self.times[..count], time);
        let alpha = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear => alpha,
        };

        Some(match &self.values {
            ChannelValues::Translation(v) => Sample::Translation(v[i0].lerp(v[i1], alpha)),
            ChannelValues::Scale(v) => Sample::Scale(v[i0].lerp(v[i1], alpha)),
            ChannelValues::Rotation(v) => Sample::Rotation(v[i0].slerp(v[i1], alpha).normalize()),
        })
    }
}

/// Keyframe pair surrounding `time` and the blend between them
fn segment(times: &[f32], time: f32) -> (usize, usize, f32) {
    let last = times.len() - 1;
    if time <= times[0] {
        return (0, 0, 0.0);
    }
    if time >= times[last] {
        return (last, last, 0.0);
    }
    let next = times.partition_point(|&t| t <= time);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let alpha = if span > 0.0 { (time - times[prev]) / span } else { 0.0 };
    (prev, next, alpha)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels.iter().map(Channel::duration).fold(0.0, f32::max);
        Self {
            name: name.into(),
            channels,
            duration,
        }
    }
}

/// Plays every clip of a model, looped, from time zero
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    local_times: Vec<f32>,
    time: f32,
}

impl AnimationMixer {
    /// None when there is nothing to play
    pub fn new(clips: Vec<AnimationClip>) -> Option<Self> {
        if clips.is_empty() {
            return None;
        }
        let local_times = vec![0.0; clips.len()];
        Some(Self {
            clips,
            local_times,
            time: 0.0,
        })
    }

    /// Advance every action, wrapping at its clip's duration
    pub fn advance(&mut self, delta: f32) {
        self.time += delta;
        for (local, clip) in self.local_times.iter_mut().zip(&self.clips) {
            *local = if clip.duration > 0.0 {
                (*local + delta).rem_euclid(clip.duration)
            } else {
                0.0
            };
        }
    }

    /// Write sampled transforms into the model and refresh its world matrices
    pub fn apply(&self, model: &mut ModelInstance) {
        for (clip, &time) in self.clips.iter().zip(&self.local_times) {
            for channel in &clip.channels {
                let (Some(sample), Some(transform)) = (channel.sample(time), model.node_transform_mut(channel.node))
                else {
                    continue;
                };
                match sample {
                    Sample::Translation(t) => transform.translation = t,
                    Sample::Rotation(r) => transform.rotation = r,
                    Sample::Scale(s) => transform.scale = s,
                }
            }
        }
        model.update_world_matrices();
    }

    /// Total time advanced since creation
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn local_time(&self, clip: usize) -> Option<f32> {
        self.local_times.get(clip).copied()
    }
}
