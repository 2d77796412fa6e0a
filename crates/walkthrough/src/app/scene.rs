use std::sync::Arc;

use glam::Vec3;
use thiserror::Error;

use super::picking::Ray;
use super::rendering::text::{render_caption_texture, CaptionStyle};
use super::textures::{TextureRequest, TextureSlot};
use crate::catalog::CatalogItem;

/// Distance kept between the camera and any wall.
pub const WALL_MARGIN: f32 = 0.5;
/// Clamped positions land this far inside the open walk rectangle.
pub const BOUNDARY_INSET: f32 = 1e-3;
pub const PANEL_WIDTH: f32 = 1.5;
pub const PANEL_HEIGHT: f32 = 2.0;
pub const PANEL_CENTER_Y: f32 = 2.5;
/// Offset of item panels in front of the back wall plane.
pub const PANEL_WALL_OFFSET: f32 = 0.05;
pub const LABEL_WIDTH: f32 = 1.2;
pub const LABEL_HEIGHT: f32 = 0.3;
pub const LABEL_CENTER_Y: f32 = 1.2;
pub const LABEL_PANEL_OFFSET: f32 = 0.01;
pub const CART_CONTROL_WIDTH: f32 = 1.0;
pub const CART_CONTROL_HEIGHT: f32 = 0.35;
pub const CART_CONTROL_CENTER_Y: f32 = 0.7;
pub const CART_CONTROL_PANEL_OFFSET: f32 = 0.02;
pub const CART_CONTROL_CAPTION: &str = "ADD TO CART";

pub const BACKGROUND_COLOR: [u8; 4] = [240, 248, 255, 255];
const FLOOR_COLOR: [u8; 4] = [247, 233, 198, 255];
const WALL_COLOR: [u8; 4] = [204, 227, 247, 255];
const CEILING_COLOR: [u8; 4] = [251, 238, 230, 255];
const PANEL_PLACEHOLDER_COLOR: [u8; 4] = [196, 200, 208, 255];
const LABEL_COLOR: [u8; 4] = [255, 255, 255, 255];
const CART_CONTROL_COLOR: [u8; 4] = [46, 160, 92, 255];

const AMBIENT_INTENSITY: f32 = 0.7;
const DIRECTIONAL_INTENSITY: f32 = 0.9;
const DIRECTIONAL_LIGHT_POSITION: Vec3 = Vec3::new(10.0, 20.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoomSpecError {
    #[error("room {dimension} must be finite")]
    NonFinite { dimension: &'static str },
    #[error("room {dimension} must exceed twice the wall margin")]
    TooSmall { dimension: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomSpec {
    width: f32,
    depth: f32,
    height: f32,
}

impl RoomSpec {
    pub fn new(width: f32, depth: f32, height: f32) -> Result<Self, RoomSpecError> {
        for (dimension, value) in [("width", width), ("depth", depth), ("height", height)] {
            if !value.is_finite() {
                return Err(RoomSpecError::NonFinite { dimension });
            }
            if value <= WALL_MARGIN * 2.0 {
                return Err(RoomSpecError::TooSmall { dimension });
            }
        }
        Ok(Self {
            width,
            depth,
            height,
        })
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn walk_bounds(&self) -> WalkBounds {
        WalkBounds {
            min_x: -self.width * 0.5 + WALL_MARGIN,
            max_x: self.width * 0.5 - WALL_MARGIN,
            min_z: -self.depth * 0.5 + WALL_MARGIN,
            max_z: self.depth * 0.5 - WALL_MARGIN,
        }
    }
}

impl Default for RoomSpec {
    fn default() -> Self {
        Self {
            width: 12.0,
            depth: 16.0,
            height: 5.0,
        }
    }
}

/// Walkable floor rectangle (x/z), already shrunk by the wall margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl WalkBounds {
    pub fn contains_strict(&self, x: f32, z: f32) -> bool {
        x > self.min_x && x < self.max_x && z > self.min_z && z < self.max_z
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Nearest point strictly inside the bounds, so a clamped camera can still
    /// step along the wall it was pushed against.
    pub fn clamp(&self, x: f32, z: f32) -> (f32, f32) {
        (
            clamp_open(x, self.min_x, self.max_x),
            clamp_open(z, self.min_z, self.max_z),
        )
    }
}

fn clamp_open(value: f32, min: f32, max: f32) -> f32 {
    let (low, high) = (min + BOUNDARY_INSET, max - BOUNDARY_INSET);
    if low >= high {
        return (min + max) * 0.5;
    }
    value.clamp(low, high)
}

/// Rectangle in world space. `right x up` is the facing normal; texture `u`
/// runs along `right`, `v` runs down `up`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub center: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub half_width: f32,
    pub half_height: f32,
}

impl Quad {
    pub fn new(center: Vec3, right: Vec3, up: Vec3, width: f32, height: f32) -> Self {
        Self {
            center,
            right: right.normalize(),
            up: up.normalize(),
            half_width: width * 0.5,
            half_height: height * 0.5,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.right.cross(self.up)
    }

    pub fn width(&self) -> f32 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }

    /// Corners as top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Vec3; 4] {
        let r = self.right * self.half_width;
        let u = self.up * self.half_height;
        [
            self.center - r + u,
            self.center + r + u,
            self.center + r - u,
            self.center - r - u,
        ]
    }

    /// Ray parameter of the hit, if the ray crosses the rectangle in front of its origin.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let normal = self.normal();
        let denom = ray.direction.dot(normal);
        if denom.abs() <= 1e-6 {
            return None;
        }
        let t = (self.center - ray.origin).dot(normal) / denom;
        if !t.is_finite() || t <= 0.0 {
            return None;
        }
        let local = ray.at(t) - self.center;
        let inside = local.dot(self.right).abs() <= self.half_width + 1e-5
            && local.dot(self.up).abs() <= self.half_height + 1e-5;
        inside.then_some(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneObjectId(pub u32);

/// Index of an item in the catalog snapshot the scene was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Floor,
    Ceiling,
    BackWall,
    LeftWall,
    RightWall,
    FrontWall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObjectKind {
    Surface(SurfaceKind),
    ItemPanel { item: ItemRef },
    ItemLabel { item: ItemRef },
    CartControl { item: ItemRef },
}

impl SceneObjectKind {
    pub fn item(&self) -> Option<ItemRef> {
        match self {
            SceneObjectKind::Surface(_) => None,
            SceneObjectKind::ItemPanel { item }
            | SceneObjectKind::ItemLabel { item }
            | SceneObjectKind::CartControl { item } => Some(*item),
        }
    }

    pub fn is_surface(&self) -> bool {
        matches!(self, SceneObjectKind::Surface(_))
    }

    pub fn is_panel(&self) -> bool {
        matches!(self, SceneObjectKind::ItemPanel { .. })
    }

    pub fn is_label(&self) -> bool {
        matches!(self, SceneObjectKind::ItemLabel { .. })
    }

    pub fn is_cart_control(&self) -> bool {
        matches!(self, SceneObjectKind::CartControl { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: SceneObjectId,
    pub kind: SceneObjectKind,
    pub quad: Quad,
    pub base_color: [u8; 4],
    pub texture: TextureSlot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub directional: f32,
    pub direction_to_light: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: AMBIENT_INTENSITY,
            directional: DIRECTIONAL_INTENSITY,
            direction_to_light: DIRECTIONAL_LIGHT_POSITION.normalize(),
        }
    }
}

impl Lighting {
    /// Flat Lambert factor for a surface facing `normal`, saturating at 1.
    pub fn shade(&self, normal: Vec3) -> f32 {
        let diffuse = normal.dot(self.direction_to_light).max(0.0);
        (self.ambient + self.directional * diffuse).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneLayout {
    pub cart_controls: bool,
}

#[derive(Debug)]
pub struct SceneWorld {
    room: RoomSpec,
    catalog: Arc<[CatalogItem]>,
    objects: Vec<SceneObject>,
    lighting: Lighting,
}

impl SceneWorld {
    pub fn room(&self) -> &RoomSpec {
        &self.room
    }

    pub fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    pub fn item(&self, item: ItemRef) -> Option<&CatalogItem> {
        self.catalog.get(item.0)
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn find_object(&self, id: SceneObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0 as usize).filter(|object| object.id == id)
    }

    pub fn panels(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.kind.is_panel())
    }

    pub fn labels(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.kind.is_label())
    }

    pub fn cart_controls(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects
            .iter()
            .filter(|object| object.kind.is_cart_control())
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.kind.is_surface())
    }

    pub fn surface(&self, kind: SurfaceKind) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|object| object.kind == SceneObjectKind::Surface(kind))
    }

    /// Replaces the texture slot of an already-placed object. Nothing else moves.
    pub(crate) fn set_texture(&mut self, id: SceneObjectId, texture: TextureSlot) -> bool {
        match self.objects.get_mut(id.0 as usize) {
            Some(object) if object.id == id => {
                object.texture = texture;
                true
            }
            _ => false,
        }
    }

    fn push(&mut self, kind: SceneObjectKind, quad: Quad, base_color: [u8; 4], texture: TextureSlot) -> SceneObjectId {
        let id = SceneObjectId(self.objects.len() as u32);
        self.objects.push(SceneObject {
            id,
            kind,
            quad,
            base_color,
            texture,
        });
        id
    }
}

#[derive(Debug)]
pub struct SceneBuild {
    pub world: SceneWorld,
    pub texture_requests: Vec<TextureRequest>,
}

/// X coordinate of the i-th of `item_count` panels spread along the back wall.
pub fn panel_center_x(room: &RoomSpec, item_count: usize, index: usize) -> f32 {
    let spacing = room.width() / (item_count as f32 + 1.0);
    -room.width() * 0.5 + spacing * (index as f32 + 1.0)
}

/// Places the room shell and one panel (+ label, + optional cart control) per item.
/// Pure in `(room, items, layout)`; image textures are returned as requests
/// instead of being loaded here.
pub fn build_scene(room: RoomSpec, items: Arc<[CatalogItem]>, layout: SceneLayout) -> SceneBuild {
    let mut world = SceneWorld {
        room,
        catalog: Arc::clone(&items),
        objects: Vec::with_capacity(6 + items.len() * 3),
        lighting: Lighting::default(),
    };
    push_room_shell(&mut world);

    let panel_z = -room.depth() * 0.5 + PANEL_WALL_OFFSET;
    let mut texture_requests = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_ref = ItemRef(index);
        let x = panel_center_x(&room, items.len(), index);
        let panel_id = world.push(
            SceneObjectKind::ItemPanel { item: item_ref },
            Quad::new(
                Vec3::new(x, PANEL_CENTER_Y, panel_z),
                Vec3::X,
                Vec3::Y,
                PANEL_WIDTH,
                PANEL_HEIGHT,
            ),
            PANEL_PLACEHOLDER_COLOR,
            TextureSlot::Pending,
        );
        texture_requests.push(TextureRequest {
            object: panel_id,
            image_ref: item.image.clone(),
        });

        world.push(
            SceneObjectKind::ItemLabel { item: item_ref },
            Quad::new(
                Vec3::new(x, LABEL_CENTER_Y, panel_z + LABEL_PANEL_OFFSET),
                Vec3::X,
                Vec3::Y,
                LABEL_WIDTH,
                LABEL_HEIGHT,
            ),
            LABEL_COLOR,
            TextureSlot::Ready(Arc::new(render_caption_texture(
                &item.name,
                CaptionStyle::LABEL,
            ))),
        );

        if layout.cart_controls {
            world.push(
                SceneObjectKind::CartControl { item: item_ref },
                Quad::new(
                    Vec3::new(x, CART_CONTROL_CENTER_Y, panel_z + CART_CONTROL_PANEL_OFFSET),
                    Vec3::X,
                    Vec3::Y,
                    CART_CONTROL_WIDTH,
                    CART_CONTROL_HEIGHT,
                ),
                CART_CONTROL_COLOR,
                TextureSlot::Ready(Arc::new(render_caption_texture(
                    CART_CONTROL_CAPTION,
                    CaptionStyle::CART_CONTROL,
                ))),
            );
        }
    }

    SceneBuild {
        world,
        texture_requests,
    }
}

fn push_room_shell(world: &mut SceneWorld) {
    let room = world.room;
    let (w, d, h) = (room.width(), room.depth(), room.height());
    let shell = [
        (
            SurfaceKind::Floor,
            Quad::new(Vec3::ZERO, Vec3::X, Vec3::NEG_Z, w, d),
            FLOOR_COLOR,
        ),
        (
            SurfaceKind::BackWall,
            Quad::new(Vec3::new(0.0, h * 0.5, -d * 0.5), Vec3::X, Vec3::Y, w, h),
            WALL_COLOR,
        ),
        (
            SurfaceKind::LeftWall,
            Quad::new(Vec3::new(-w * 0.5, h * 0.5, 0.0), Vec3::NEG_Z, Vec3::Y, d, h),
            WALL_COLOR,
        ),
        (
            SurfaceKind::RightWall,
            Quad::new(Vec3::new(w * 0.5, h * 0.5, 0.0), Vec3::Z, Vec3::Y, d, h),
            WALL_COLOR,
        ),
        (
            SurfaceKind::FrontWall,
            Quad::new(Vec3::new(0.0, h * 0.5, d * 0.5), Vec3::NEG_X, Vec3::Y, w, h),
            WALL_COLOR,
        ),
        (
            SurfaceKind::Ceiling,
            Quad::new(Vec3::new(0.0, h, 0.0), Vec3::X, Vec3::Z, w, d),
            CEILING_COLOR,
        ),
    ];
    for (kind, quad, color) in shell {
        world.push(SceneObjectKind::Surface(kind), quad, color, TextureSlot::None);
    }
}
