use std::rc::Rc;

use super::Prepared;
use crate::animation::OpacityAnimation;
use crate::backend::{KeyPath, KeyframeGroup};
use crate::error::{MotionError, Result};
use crate::node::Node;
use crate::tracks::build_scalar_track;
use crate::types::AnimationId;

/// Sample an opacity animation into a single `opacity` channel.
pub(super) fn prepare(
    id: AnimationId,
    params: &OpacityAnimation,
    duration: f64,
) -> Result<Prepared> {
    let value_fn = params.value_fn.clone().ok_or_else(|| {
        MotionError::missing_target(format!("{id} has no opacity function"))
    })?;

    let track = build_scalar_track(|t| value_fn(t), duration, params.logical_fps)?;
    tracing::debug!(animation = %id, samples = track.values.len(), "built opacity track");

    Ok(Prepared {
        group: KeyframeGroup::from_scalar_track(KeyPath::Opacity, track),
        apply: Rc::new(move |node: &mut dyn Node, t: f64| node.set_opacity(value_fn(t), id)),
    })
}
