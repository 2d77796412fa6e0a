use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use walkthrough::app::{
    draw_frame, FrameSurface, FrameView, InputEvent, ItemRef, MoveAction, PointerButton,
    Rasterizer, RenderError, SceneObjectKind, Texture, TextureLoadError, TextureSlot,
    TextureSource, WALL_MARGIN,
};
use walkthrough::{
    Catalog, CatalogItem, DeviceProfile, FileTextureSource, PickOutcome, SceneEvent, SessionConfig,
    Viewport, WalkthroughSession,
};
use winit::keyboard::KeyCode;

const VIEWPORT: Viewport = Viewport {
    width: 320,
    height: 240,
};

/// Headless surface that rasterizes into a shared buffer.
struct BufferSurface {
    frame: Rc<RefCell<Vec<u8>>>,
    rasterizer: Rasterizer,
}

impl FrameSurface for BufferSurface {
    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.frame
            .borrow_mut()
            .resize(viewport.width as usize * viewport.height as usize * 4, 0);
        Ok(())
    }

    fn draw(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        let mut frame = self.frame.borrow_mut();
        draw_frame(&mut self.rasterizer, frame.as_mut_slice(), view);
        Ok(())
    }
}

struct MissingImages;

impl TextureSource for MissingImages {
    fn load(&mut self, image_ref: &str) -> Result<Texture, TextureLoadError> {
        Err(TextureLoadError::NotFound {
            image_ref: image_ref.to_string(),
        })
    }
}

struct SolidImages;

impl TextureSource for SolidImages {
    fn load(&mut self, _image_ref: &str) -> Result<Texture, TextureLoadError> {
        Ok(Texture::solid(4, 4, [200, 30, 30, 255]))
    }
}

fn demo_items() -> std::sync::Arc<[CatalogItem]> {
    Catalog::demo().shop(None).expect("demo shop").items_arc()
}

fn mount(config: SessionConfig) -> (WalkthroughSession, Rc<RefCell<Vec<u8>>>) {
    mount_with(config, demo_items())
}

fn mount_with(
    config: SessionConfig,
    items: std::sync::Arc<[CatalogItem]>,
) -> (WalkthroughSession, Rc<RefCell<Vec<u8>>>) {
    let frame = Rc::new(RefCell::new(vec![
        0;
        VIEWPORT.width as usize * VIEWPORT.height as usize * 4
    ]));
    let shared = Rc::clone(&frame);
    let mut session = WalkthroughSession::new(config);
    session
        .mount(items, VIEWPORT, move |_| {
            Ok(Box::new(BufferSurface {
                frame: shared,
                rasterizer: Rasterizer::new(),
            }) as Box<dyn FrameSurface>)
        })
        .expect("mount");
    (session, frame)
}

fn screen_center_of(session: &WalkthroughSession, pick: impl Fn(&SceneObjectKind) -> bool) -> Vec2 {
    let world = session.world().expect("world");
    let object = world
        .objects()
        .iter()
        .find(|object| pick(&object.kind))
        .expect("object");
    session
        .camera()
        .world_to_screen(object.quad.center, session.viewport())
        .expect("on screen")
}

fn key(session: &mut WalkthroughSession, code: KeyCode, pressed: bool) {
    session.handle_input(&InputEvent::Key { code, pressed });
}

#[test]
fn demo_catalog_builds_full_storefront() {
    let (session, _) = mount(SessionConfig {
        cart_enabled: true,
        ..SessionConfig::default()
    });
    let world = session.world().expect("world");
    assert_eq!(world.panels().count(), 5);
    assert_eq!(world.labels().count(), 5);
    assert_eq!(world.cart_controls().count(), 5);
    assert_eq!(world.surfaces().count(), 6);
    assert_eq!(session.camera().position(), Vec3::new(0.0, 2.0, 6.0));
    assert_eq!(session.pending_textures(), 5);
}

#[test]
fn holding_advance_walks_to_back_margin_and_stops() {
    let (mut session, _) = mount(SessionConfig::default());
    key(&mut session, KeyCode::KeyW, true);

    let back_limit = -session.config().room.depth() / 2.0 + WALL_MARGIN;
    let mut previous_z = session.camera().position().z;
    for _ in 0..100 {
        session.tick();
        let position = session.camera().position();
        assert!(position.z <= previous_z);
        assert!(position.z > back_limit);
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 2.0);
        previous_z = position.z;
    }
    assert!(previous_z < back_limit + 0.25);

    key(&mut session, KeyCode::KeyW, false);
    session.tick();
    assert_eq!(session.camera().position().z, previous_z);
}

#[test]
fn clicking_first_cart_control_adds_first_item() {
    let (mut session, _) = mount(SessionConfig {
        cart_enabled: true,
        ..SessionConfig::default()
    });
    let target = screen_center_of(&session, |kind| kind.is_cart_control());
    assert!(session.cart().is_empty());

    session.handle_input(&InputEvent::PointerDown {
        button: PointerButton::Primary,
        position: target,
    });
    session.handle_input(&InputEvent::PointerUp {
        button: PointerButton::Primary,
        position: target + Vec2::new(2.0, 1.0),
    });

    assert_eq!(session.cart().len(), 1);
    assert_eq!(session.cart_items()[0].name, "Shirt");
    assert_eq!(
        session.drain_events(),
        vec![SceneEvent::ItemAddedToCart(CatalogItem::new(
            "Shirt",
            "/clothes/shirt.jpg"
        ))]
    );
}

#[test]
fn drag_past_slop_looks_instead_of_clicking() {
    let (mut session, _) = mount(SessionConfig {
        cart_enabled: true,
        ..SessionConfig::default()
    });
    let target = screen_center_of(&session, |kind| kind.is_cart_control());
    session.handle_input(&InputEvent::PointerDown {
        button: PointerButton::Primary,
        position: target,
    });
    let end = target + Vec2::new(40.0, 0.0);
    session.handle_input(&InputEvent::PointerMove { position: end });
    session.handle_input(&InputEvent::PointerUp {
        button: PointerButton::Primary,
        position: end,
    });

    assert!(session.cart().is_empty());
    assert!(session.camera().yaw() < 0.0);
}

#[test]
fn rendered_frame_covers_whole_viewport() {
    let (mut session, frame) = mount(SessionConfig::default());
    assert!(session.render());
    let frame = frame.borrow();
    assert!(frame.chunks_exact(4).all(|pixel| pixel[3] == 255));
}

#[test]
fn failed_textures_keep_panels_pickable_and_loaded_ones_show() {
    let (mut session, _) = mount(SessionConfig::default());
    session.pump_textures(&mut MissingImages, 2);
    session.pump_textures(&mut SolidImages, 8);
    assert_eq!(session.pending_textures(), 0);

    let target = screen_center_of(&session, |kind| kind.is_panel());
    assert!(matches!(session.click_at(target), PickOutcome::Select(_)));
    assert!(session.render());
}

#[test]
fn teardown_releases_everything_and_ignores_late_input() {
    let (mut session, _) = mount(SessionConfig::default());
    key(&mut session, KeyCode::ArrowUp, true);
    session.unmount();

    assert!(!session.has_surface());
    assert!(!session.frame_scheduled());
    assert!(session.controller().listeners().is_empty());
    assert!(!session.render());

    let before = session.camera().position();
    key(&mut session, KeyCode::KeyW, true);
    session.tick();
    assert_eq!(session.camera().position(), before);
}

#[test]
fn switching_to_mobile_keeps_position_and_moves_with_touch_buttons() {
    let (mut session, _) = mount(SessionConfig::default());
    session.set_camera_position(1.0, 2.0);
    session.switch_profile(DeviceProfile::Mobile);
    assert_eq!(session.profile(), DeviceProfile::Mobile);
    assert_eq!(session.camera().position(), Vec3::new(1.0, 2.0, 2.0));

    let layout = session.controller().touch_buttons().expect("touch buttons");
    let advance = layout.buttons()[0].center;
    session.handle_input(&InputEvent::TouchStart {
        id: 1,
        position: advance,
    });
    session.tick();
    let moved = session.camera().position();
    assert!((moved.z - (2.0 - session.config().mobile_move_speed)).abs() < 1e-5);

    session.handle_input(&InputEvent::TouchEnd {
        id: 1,
        position: advance,
    });
    session.tick();
    assert_eq!(session.camera().position(), moved);
}

#[test]
fn escape_is_reported_once_per_press() {
    let (mut session, _) = mount(SessionConfig::default());
    key(&mut session, KeyCode::Escape, true);
    key(&mut session, KeyCode::Escape, true);
    key(&mut session, KeyCode::Escape, false);
    assert_eq!(session.drain_events(), vec![SceneEvent::ExitRequested]);
}

fn movement_key(action: MoveAction) -> KeyCode {
    match action {
        MoveAction::Advance => KeyCode::KeyW,
        MoveAction::Retreat => KeyCode::KeyS,
        MoveAction::StrafeLeft => KeyCode::KeyA,
        MoveAction::StrafeRight => KeyCode::KeyD,
    }
}

#[test]
fn clamped_camera_keeps_walking_along_every_wall() {
    let cases = [
        ((-50.0, 0.0), [MoveAction::Advance, MoveAction::Retreat, MoveAction::StrafeRight]),
        ((50.0, 0.0), [MoveAction::Advance, MoveAction::Retreat, MoveAction::StrafeLeft]),
        ((0.0, -50.0), [MoveAction::StrafeLeft, MoveAction::StrafeRight, MoveAction::Retreat]),
        ((0.0, 50.0), [MoveAction::StrafeLeft, MoveAction::StrafeRight, MoveAction::Advance]),
    ];
    let (mut session, _) = mount(SessionConfig::default());
    let bounds = session.config().room.walk_bounds();

    for ((x, z), actions) in cases {
        for action in actions {
            session.set_camera_position(x, z);
            let before = session.camera().position();
            assert!(bounds.contains_strict(before.x, before.z));

            key(&mut session, movement_key(action), true);
            for _ in 0..3 {
                session.tick();
            }
            key(&mut session, movement_key(action), false);

            let after = session.camera().position();
            assert_ne!(after, before, "{action:?} from clamped ({x}, {z})");
            assert!(bounds.contains_strict(after.x, after.z));
        }
    }
}

#[test]
fn unloadable_image_uri_leaves_its_panel_on_placeholder() {
    let catalog = Catalog::from_json_str(
        r#"[
            { "name": "Shirt", "image": "https://cdn.example.com/shirt.jpg" },
            { "name": "Hat", "image": "/hat.png" }
        ]"#,
    )
    .expect("catalog with uri image");
    let items = catalog.shop(None).expect("shop").items_arc();
    let (mut session, _) = mount_with(SessionConfig::default(), items);

    let assets = tempfile::tempdir().expect("tempdir");
    let mut source = FileTextureSource::new(assets.path());
    session.pump_textures(&mut source, 8);
    assert_eq!(session.pending_textures(), 0);

    let world = session.world().expect("world");
    let panels: Vec<_> = world.panels().collect();
    assert_eq!(panels.len(), 2);
    assert!(panels
        .iter()
        .all(|panel| matches!(panel.texture, TextureSlot::Failed)));

    let target = screen_center_of(&session, |kind| kind.is_panel());
    assert_eq!(session.click_at(target), PickOutcome::Select(ItemRef(0)));
    assert!(session.render());
}
