//! Keyframe animation
//!
//! Node TRS channels sampled from a clip, and a looping time cursor that
//! drives the first clip of a model.

use crate::rasterizer::{Quat, Vec3};
use super::model::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

/// Keyframe values for one animated property
#[derive(Debug, Clone)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    fn len(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub node: usize,
    pub interpolation: Interpolation,
    /// Keyframe times in seconds, ascending
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

/// Find the keyframe pair around `t` and the blend factor between them
fn locate(times: &[f32], t: f32) -> (usize, usize, f32) {
    let last = times.len() - 1;
    if t <= times[0] {
        return (0, 0, 0.0);
    }
    if t >= times[last] {
        return (last, last, 0.0);
    }
    // First index with time > t; guaranteed in 1..=last here
    let next = times.partition_point(|&k| k <= t);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let alpha = if span > 0.0 { (t - times[prev]) / span } else { 0.0 };
    (prev, next, alpha)
}

impl Channel {
    /// Write this channel's value at `t` into the target node
    pub fn apply(&self, t: f32, nodes: &mut [Node]) {
        if self.times.is_empty() || self.values.len() < self.times.len() {
            return;
        }
        let Some(node) = nodes.get_mut(self.node) else {
            return;
        };
        let (a, b, alpha) = locate(&self.times, t);
        let alpha = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear => alpha,
        };

        match &self.values {
            ChannelValues::Translation(v) => node.translation = v[a].lerp(v[b], alpha),
            ChannelValues::Scale(v) => node.scale = v[a].lerp(v[b], alpha),
            ChannelValues::Rotation(v) => node.rotation = v[a].slerp(v[b], alpha).normalize(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds; the last keyframe time across all channels
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: String, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0, f32::max);
        Self { name, duration, channels }
    }

    pub fn apply(&self, t: f32, nodes: &mut [Node]) {
        for channel in &self.channels {
            channel.apply(t, nodes);
        }
    }
}

/// Looping time cursor bound to one clip
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    pub clip: usize,
    pub time: f32,
}

impl Mixer {
    pub fn new(clip: usize) -> Self {
        Self { clip, time: 0.0 }
    }

    /// Advance by `dt` seconds, wrapping at the clip's end, and pose the nodes
    pub fn update(&mut self, dt: f32, clips: &[AnimationClip], nodes: &mut [Node]) {
        let Some(clip) = clips.get(self.clip) else {
            return;
        };
        self.time += dt.max(0.0);
        if clip.duration > 0.0 {
            self.time %= clip.duration;
        } else {
            self.time = 0.0;
        }
        clip.apply(self.time, nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_node() -> Vec<Node> {
        vec![Node::default()]
    }

    fn slide(interpolation: Interpolation) -> AnimationClip {
        AnimationClip::new(
            "slide".into(),
            vec![Channel {
                node: 0,
                interpolation,
                times: vec![0.0, 1.0, 2.0],
                values: ChannelValues::Translation(vec![
                    Vec3::ZERO,
                    Vec3::new(10.0, 0.0, 0.0),
                    Vec3::new(10.0, 10.0, 0.0),
                ]),
            }],
        )
    }

    #[test]
    fn test_duration_is_last_key() {
        assert!((slide(Interpolation::Linear).duration - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_linear_between_keys() {
        let mut nodes = one_node();
        slide(Interpolation::Linear).apply(0.5, &mut nodes);
        assert!((nodes[0].translation.x - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_step_holds_previous_key() {
        let mut nodes = one_node();
        slide(Interpolation::Step).apply(1.9, &mut nodes);
        assert!((nodes[0].translation.x - 10.0).abs() < 0.001);
        assert!(nodes[0].translation.y.abs() < 0.001);
    }

    #[test]
    fn test_clamps_outside_range() {
        let mut nodes = one_node();
        slide(Interpolation::Linear).apply(5.0, &mut nodes);
        assert!((nodes[0].translation.y - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_mixer_loops() {
        let clips = vec![slide(Interpolation::Linear)];
        let mut nodes = one_node();
        let mut mixer = Mixer::new(0);
        mixer.update(2.5, &clips, &mut nodes);
        assert!((mixer.time - 0.5).abs() < 0.001);
        assert!((nodes[0].translation.x - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_rotation_channel_slerps() {
        let quarter = Quat::from_axis_angle(Vec3::UP, std::f32::consts::FRAC_PI_2);
        let clip = AnimationClip::new(
            "spin".into(),
            vec![Channel {
                node: 0,
                interpolation: Interpolation::Linear,
                times: vec![0.0, 1.0],
                values: ChannelValues::Rotation(vec![Quat::IDENTITY, quarter]),
            }],
        );
        let mut nodes = one_node();
        clip.apply(0.5, &mut nodes);
        let eighth = Quat::from_axis_angle(Vec3::UP, std::f32::consts::FRAC_PI_4);
        assert!((nodes[0].rotation.y - eighth.y).abs() < 0.001);
    }

    #[test]
    fn test_missing_clip_is_noop() {
        let mut nodes = one_node();
        let mut mixer = Mixer::new(3);
        mixer.update(1.0, &[], &mut nodes);
        assert_eq!(nodes[0].translation, Vec3::ZERO);
    }
}
