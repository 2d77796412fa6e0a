use glam::Vec3;

use super::scene::{ItemRef, SceneObjectId, SceneObjectKind, SceneWorld};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub object: SceneObjectId,
    pub kind: SceneObjectKind,
    pub distance: f32,
}

/// Nearest object along `ray`, interactive or not. Ties keep the earlier object.
pub fn pick_nearest(world: &SceneWorld, ray: &Ray) -> Option<PickHit> {
    if ray.direction == Vec3::ZERO {
        return None;
    }
    world
        .objects()
        .iter()
        .filter_map(|object| {
            object.quad.intersect(ray).map(|distance| PickHit {
                object: object.id,
                kind: object.kind,
                distance,
            })
        })
        .fold(None, |nearest: Option<PickHit>, hit| match nearest {
            Some(current) if current.distance <= hit.distance => Some(current),
            _ => Some(hit),
        })
}

/// What a click resolved to after interactivity rules were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    AddToCart(ItemRef),
    Select(ItemRef),
    Nothing,
}

pub fn resolve_pick(hit: Option<&PickHit>, cart_enabled: bool) -> PickOutcome {
    match hit.map(|hit| hit.kind) {
        Some(SceneObjectKind::CartControl { item }) if cart_enabled => PickOutcome::AddToCart(item),
        Some(SceneObjectKind::ItemPanel { item }) if !cart_enabled => PickOutcome::Select(item),
        _ => PickOutcome::Nothing,
    }
}

/// Items added to the cart, in click order. Append-only for the session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSelection {
    items: Vec<ItemRef>,
}

impl CartSelection {
    pub fn push(&mut self, item: ItemRef) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[ItemRef] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
