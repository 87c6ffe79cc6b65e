use std::rc::Rc;

use super::Prepared;
use crate::animation::TransformAnimation;
use crate::backend::KeyframeGroup;
use crate::error::{MotionError, Result};
use crate::geometry::Point;
use crate::node::Node;
use crate::tracks::build_tracks;
use crate::types::AnimationId;

/// Sample a transform animation into the five transform channels.
pub(super) fn prepare(
    id: AnimationId,
    params: &TransformAnimation,
    duration: f64,
    offset: Point,
) -> Result<Prepared> {
    let value_fn = params.value_fn.clone().ok_or_else(|| {
        MotionError::missing_target(format!("{id} has no transform function"))
    })?;

    let tracks = build_tracks(|t| value_fn(t), duration, offset, params.logical_fps)?;
    let group = KeyframeGroup::from_track_set(&tracks);

    Ok(Prepared {
        group,
        apply: Rc::new(move |node: &mut dyn Node, t: f64| node.set_transform(value_fn(t), id)),
    })
}
