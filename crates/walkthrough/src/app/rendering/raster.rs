use glam::{Mat4, Vec2, Vec3, Vec4};

use super::transform::{ndc_to_screen, Viewport};
use crate::app::camera::CameraState;
use crate::app::scene::{SceneObject, SceneWorld, BACKGROUND_COLOR};

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    view: Vec3,
    uv: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    position: Vec2,
    inv_w: f32,
    uv_over_w: Vec2,
}

/// Software rasterizer for the room's quads: near-plane clipping, depth
/// buffering on `1/w`, perspective-correct texture lookup, flat shading.
#[derive(Debug, Default)]
pub struct Rasterizer {
    depth: Vec<f32>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, frame: &mut [u8], viewport: Viewport, world: &SceneWorld, camera: &CameraState) {
        let pixel_count = viewport.width as usize * viewport.height as usize;
        if viewport.is_empty() || frame.len() < pixel_count * 4 {
            return;
        }
        for pixel in frame[..pixel_count * 4].chunks_exact_mut(4) {
            pixel.copy_from_slice(&BACKGROUND_COLOR);
        }
        self.depth.clear();
        self.depth.resize(pixel_count, 0.0);

        let view = camera.view_matrix();
        let projection = camera.projection().matrix();
        let near = camera.projection().near;
        for object in world.objects() {
            let shade = world.lighting().shade(object.quad.normal());
            self.draw_object(frame, viewport, object, &view, &projection, near, shade);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_object(
        &mut self,
        frame: &mut [u8],
        viewport: Viewport,
        object: &SceneObject,
        view: &Mat4,
        projection: &Mat4,
        near: f32,
        shade: f32,
    ) {
        const CORNER_UVS: [Vec2; 4] = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let corners = object.quad.corners();
        let polygon: Vec<ClipVertex> = corners
            .iter()
            .zip(CORNER_UVS)
            .map(|(corner, uv)| ClipVertex {
                view: view.transform_point3(*corner),
                uv,
            })
            .collect();
        let clipped = clip_near(&polygon, near);
        if clipped.len() < 3 {
            return;
        }
        let projected: Vec<ScreenVertex> = clipped
            .iter()
            .filter_map(|vertex| project(projection, vertex, viewport))
            .collect();
        if projected.len() != clipped.len() {
            return;
        }
        for index in 1..projected.len() - 1 {
            self.fill_triangle(
                frame,
                viewport,
                [projected[0], projected[index], projected[index + 1]],
                object,
                shade,
            );
        }
    }

    fn fill_triangle(
        &mut self,
        frame: &mut [u8],
        viewport: Viewport,
        triangle: [ScreenVertex; 3],
        object: &SceneObject,
        shade: f32,
    ) {
        let [a, b, c] = triangle;
        let area = edge(a.position, b.position, c.position);
        if area.abs() <= f32::EPSILON {
            return;
        }
        let min = a.position.min(b.position).min(c.position);
        let max = a.position.max(b.position).max(c.position);
        let start_x = min.x.floor().max(0.0) as u32;
        let start_y = min.y.floor().max(0.0) as u32;
        let end_x = (max.x.ceil().max(0.0) as u32).min(viewport.width);
        let end_y = (max.y.ceil().max(0.0) as u32).min(viewport.height);

        let texture = object.texture.texture();
        for y in start_y..end_y {
            for x in start_x..end_x {
                let point = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b.position, c.position, point) / area;
                let w1 = edge(c.position, a.position, point) / area;
                let w2 = edge(a.position, b.position, point) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let inv_w = w0 * a.inv_w + w1 * b.inv_w + w2 * c.inv_w;
                let index = y as usize * viewport.width as usize + x as usize;
                if inv_w <= self.depth[index] {
                    continue;
                }
                self.depth[index] = inv_w;

                let color = match texture {
                    Some(texture) => {
                        let uv = (a.uv_over_w * w0 + b.uv_over_w * w1 + c.uv_over_w * w2) / inv_w;
                        texture.sample(uv.x, uv.y)
                    }
                    None => object.base_color,
                };
                let offset = index * 4;
                frame[offset..offset + 4].copy_from_slice(&shaded(color, shade));
            }
        }
    }
}

fn edge(a: Vec2, b: Vec2, point: Vec2) -> f32 {
    (b.x - a.x) * (point.y - a.y) - (b.y - a.y) * (point.x - a.x)
}

fn shaded(color: [u8; 4], shade: f32) -> [u8; 4] {
    let scale = |channel: u8| (channel as f32 * shade).round().clamp(0.0, 255.0) as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), 255]
}

/// Sutherland-Hodgman against the plane `z = -near` in view space.
fn clip_near(polygon: &[ClipVertex], near: f32) -> Vec<ClipVertex> {
    let inside = |vertex: &ClipVertex| vertex.view.z <= -near;
    let mut output = Vec::with_capacity(polygon.len() + 2);
    for (index, current) in polygon.iter().enumerate() {
        let previous = &polygon[(index + polygon.len() - 1) % polygon.len()];
        match (inside(previous), inside(current)) {
            (true, true) => output.push(*current),
            (true, false) => output.push(intersect_near(previous, current, near)),
            (false, true) => {
                output.push(intersect_near(previous, current, near));
                output.push(*current);
            }
            (false, false) => {}
        }
    }
    output
}

fn intersect_near(from: &ClipVertex, to: &ClipVertex, near: f32) -> ClipVertex {
    let t = (-near - from.view.z) / (to.view.z - from.view.z);
    ClipVertex {
        view: from.view.lerp(to.view, t),
        uv: from.uv.lerp(to.uv, t),
    }
}

fn project(projection: &Mat4, vertex: &ClipVertex, viewport: Viewport) -> Option<ScreenVertex> {
    let clip: Vec4 = *projection * vertex.view.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let inv_w = 1.0 / clip.w;
    let ndc = Vec2::new(clip.x * inv_w, clip.y * inv_w);
    Some(ScreenVertex {
        position: ndc_to_screen(ndc, viewport),
        inv_w,
        uv_over_w: vertex.uv * inv_w,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::scene::{build_scene, RoomSpec, SceneLayout};
    use crate::catalog::CatalogItem;

    fn render(items: Vec<CatalogItem>, viewport: Viewport, camera: &CameraState) -> Vec<u8> {
        let build = build_scene(RoomSpec::default(), Arc::from(items), SceneLayout::default());
        let mut frame = vec![0; viewport.width as usize * viewport.height as usize * 4];
        Rasterizer::new().draw(&mut frame, viewport, &build.world, camera);
        frame
    }

    fn pixel(frame: &[u8], viewport: Viewport, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * viewport.width as usize + x as usize) * 4;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    fn camera(viewport: Viewport) -> CameraState {
        let mut camera = CameraState::new(&RoomSpec::default().walk_bounds());
        camera.set_viewport(viewport);
        camera
    }

    #[test]
    fn closed_room_covers_every_pixel() {
        let viewport = Viewport::new(64, 48);
        let frame = render(Vec::new(), viewport, &camera(viewport));
        for y in 0..viewport.height {
            for x in 0..viewport.width {
                assert_ne!(pixel(&frame, viewport, x, y), BACKGROUND_COLOR, "({x}, {y})");
            }
        }
    }

    #[test]
    fn panel_occludes_back_wall() {
        let viewport = Viewport::new(64, 48);
        let camera = camera(viewport);
        let empty = render(Vec::new(), viewport, &camera);
        let with_panel = render(
            vec![CatalogItem::new("Solo", "/solo.png")],
            viewport,
            &camera,
        );
        let build = build_scene(
            RoomSpec::default(),
            Arc::from(vec![CatalogItem::new("Solo", "/solo.png")]),
            SceneLayout::default(),
        );
        let panel = build.world.panels().next().expect("panel");
        let center = camera
            .world_to_screen(panel.quad.center, viewport)
            .expect("panel visible");
        let (x, y) = (center.x as u32, center.y as u32);
        assert_ne!(pixel(&empty, viewport, x, y), pixel(&with_panel, viewport, x, y));
    }

    #[test]
    fn quads_crossing_near_plane_are_clipped_not_dropped() {
        let viewport = Viewport::new(32, 32);
        let mut camera = camera(viewport);
        camera.set_orientation(0.0, -1.4);
        let frame = render(Vec::new(), viewport, &camera);
        let bottom = pixel(&frame, viewport, 16, 31);
        assert_ne!(bottom, BACKGROUND_COLOR);
    }

    #[test]
    fn short_frame_is_left_untouched() {
        let viewport = Viewport::new(16, 16);
        let build = build_scene(RoomSpec::default(), Arc::from(Vec::<CatalogItem>::new()), SceneLayout::default());
        let mut frame = vec![7; 10];
        Rasterizer::new().draw(&mut frame, viewport, &build.world, &camera(viewport));
        assert!(frame.iter().all(|byte| *byte == 7));
    }

    #[test]
    fn clip_near_keeps_inside_vertices() {
        let polygon = [
            ClipVertex { view: Vec3::new(-1.0, 0.0, -2.0), uv: Vec2::ZERO },
            ClipVertex { view: Vec3::new(1.0, 0.0, -2.0), uv: Vec2::X },
            ClipVertex { view: Vec3::new(1.0, 0.0, 1.0), uv: Vec2::ONE },
            ClipVertex { view: Vec3::new(-1.0, 0.0, 1.0), uv: Vec2::Y },
        ];
        let clipped = clip_near(&polygon, 0.1);
        assert_eq!(clipped.len(), 4);
        assert!(clipped.iter().all(|vertex| vertex.view.z <= -0.1 + 1e-5));
    }
}
