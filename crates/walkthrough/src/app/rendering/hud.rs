use super::canvas::Canvas;
use super::text::{draw_text, line_advance, text_width, GLYPH_HEIGHT};
use super::HudState;
use crate::app::controller::DeviceProfile;
use crate::app::input::MoveAction;

const HUD_TEXT_SCALE: i32 = 2;
const HUD_MARGIN: i32 = 10;
const HUD_PADDING: i32 = 8;
const HUD_PANEL_COLOR: [u8; 4] = [255, 255, 255, 136];
const HUD_TEXT_COLOR: [u8; 4] = [51, 51, 51, 255];
const BUTTON_FILL_COLOR: [u8; 4] = [255, 255, 255, 217];
const BUTTON_HELD_COLOR: [u8; 4] = [210, 224, 240, 230];
const BUTTON_BORDER_COLOR: [u8; 4] = [51, 51, 51, 255];
const BUTTON_GLYPH_SCALE: i32 = 5;

pub fn controls_hint(profile: DeviceProfile) -> &'static str {
    match profile {
        DeviceProfile::Desktop => "WASD / ARROWS TO MOVE, DRAG TO LOOK, ESC TO EXIT",
        DeviceProfile::DesktopContinuous => "WASD / ARROWS TO MOVE, POINT TO LOOK, CLICK TO ADD",
        DeviceProfile::Mobile => "TOUCH BUTTONS TO MOVE, SWIPE TO LOOK",
    }
}

fn button_glyph(action: MoveAction) -> &'static str {
    match action {
        MoveAction::Advance => "^",
        MoveAction::Retreat => "V",
        MoveAction::StrafeLeft => "<",
        MoveAction::StrafeRight => ">",
    }
}

fn draw_panel(canvas: &mut Canvas<'_>, x: i32, y: i32, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, HUD_TEXT_SCALE))
        .max()
        .unwrap_or(0);
    let height = line_advance(HUD_TEXT_SCALE) * (lines.len() as i32 - 1) + GLYPH_HEIGHT * HUD_TEXT_SCALE;
    canvas.fill_rect(x, y, width + HUD_PADDING * 2, height + HUD_PADDING * 2, HUD_PANEL_COLOR);
    for (index, line) in lines.iter().enumerate() {
        draw_text(
            canvas,
            x + HUD_PADDING,
            y + HUD_PADDING + index as i32 * line_advance(HUD_TEXT_SCALE),
            line,
            HUD_TEXT_SCALE,
            HUD_TEXT_COLOR,
        );
    }
}

pub fn draw_hud(canvas: &mut Canvas<'_>, hud: &HudState) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }

    let mut lines = vec![format!("CONTROLS: {}", controls_hint(hud.profile))];
    if hud.pending_textures > 0 {
        lines.push(format!("LOADING {} IMAGES", hud.pending_textures));
    }
    draw_panel(canvas, HUD_MARGIN, HUD_MARGIN, &lines);

    if let Some(count) = hud.cart_count {
        let line = format!("CART: {count}");
        let x = canvas.width() as i32 - HUD_MARGIN - HUD_PADDING * 2 - text_width(&line, HUD_TEXT_SCALE);
        draw_panel(canvas, x, HUD_MARGIN, &[line]);
    }

    if let Some(layout) = hud.touch_buttons {
        for button in layout.buttons() {
            let (cx, cy) = (button.center.x.round() as i32, button.center.y.round() as i32);
            let radius = button.radius.round() as i32;
            let fill = if hud.held.is_down(button.action) {
                BUTTON_HELD_COLOR
            } else {
                BUTTON_FILL_COLOR
            };
            canvas.fill_circle(cx, cy, radius, BUTTON_BORDER_COLOR);
            canvas.fill_circle(cx, cy, radius - 2, fill);
            let glyph = button_glyph(button.action);
            draw_text(
                canvas,
                cx - text_width(glyph, BUTTON_GLYPH_SCALE) / 2,
                cy - GLYPH_HEIGHT * BUTTON_GLYPH_SCALE / 2,
                glyph,
                BUTTON_GLYPH_SCALE,
                HUD_TEXT_COLOR,
            );
        }
    }
}
