use super::canvas::Canvas;
use crate::app::textures::Texture;

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;

/// Glyphs are 3x5 bitmaps packed row-major into 15 bits, top row in the high bits.
const fn glyph_bits(ch: char) -> u16 {
    match ch {
        'A' => 0b010_101_111_101_101,
        'B' => 0b110_101_110_101_110,
        'C' => 0b011_100_100_100_011,
        'D' => 0b110_101_101_101_110,
        'E' => 0b111_100_110_100_111,
        'F' => 0b111_100_110_100_100,
        'G' => 0b011_100_101_101_011,
        'H' => 0b101_101_111_101_101,
        'I' => 0b111_010_010_010_111,
        'J' => 0b001_001_001_101_010,
        'K' => 0b101_101_110_101_101,
        'L' => 0b100_100_100_100_111,
        'M' => 0b101_111_111_101_101,
        'N' => 0b110_101_101_101_101,
        'O' => 0b010_101_101_101_010,
        'P' => 0b110_101_110_100_100,
        'Q' => 0b010_101_101_110_011,
        'R' => 0b110_101_110_101_101,
        'S' => 0b011_100_010_001_110,
        'T' => 0b111_010_010_010_010,
        'U' => 0b101_101_101_101_111,
        'V' => 0b101_101_101_101_010,
        'W' => 0b101_101_111_111_101,
        'X' => 0b101_101_010_101_101,
        'Y' => 0b101_101_010_010_010,
        'Z' => 0b111_001_010_100_111,
        '0' => 0b111_101_101_101_111,
        '1' => 0b010_110_010_010_111,
        '2' => 0b110_001_010_100_111,
        '3' => 0b110_001_010_001_110,
        '4' => 0b101_101_111_001_001,
        '5' => 0b111_100_110_001_110,
        '6' => 0b011_100_111_101_111,
        '7' => 0b111_001_010_010_010,
        '8' => 0b111_101_111_101_111,
        '9' => 0b111_101_111_001_110,
        ' ' => 0,
        '.' => 0b000_000_000_000_010,
        ',' => 0b000_000_000_010_100,
        '\'' => 0b010_010_000_000_000,
        '-' => 0b000_000_111_000_000,
        '+' => 0b000_010_111_010_000,
        '&' => 0b010_101_010_101_011,
        '/' => 0b001_001_010_100_100,
        ':' => 0b000_010_000_010_000,
        '!' => 0b010_010_010_000_010,
        '(' => 0b001_010_010_010_001,
        ')' => 0b100_010_010_010_100,
        '$' => 0b011_110_010_011_110,
        '^' => 0b010_101_000_000_000,
        '<' => 0b001_010_100_010_001,
        '>' => 0b100_010_001_010_100,
        _ => 0b110_001_010_000_010,
    }
}

fn glyph_for(ch: char) -> u16 {
    glyph_bits(ch.to_ascii_uppercase())
}

pub fn glyph_advance(scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * scale
}

pub fn line_advance(scale: i32) -> i32 {
    (GLYPH_HEIGHT + 2) * scale
}

/// Width in pixels of `text` at `scale`, without trailing spacing.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    count * glyph_advance(scale) - scale
}

pub fn draw_text(canvas: &mut Canvas<'_>, mut x: i32, y: i32, text: &str, scale: i32, color: [u8; 4]) {
    let scale = scale.max(1);
    for ch in text.chars() {
        draw_glyph(canvas, x, y, glyph_for(ch), scale, color);
        x += glyph_advance(scale);
    }
}

fn draw_glyph(canvas: &mut Canvas<'_>, x: i32, y: i32, bits: u16, scale: i32, color: [u8; 4]) {
    for row in 0..GLYPH_HEIGHT {
        for col in 0..GLYPH_WIDTH {
            let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - col);
            if bits & (1 << shift) == 0 {
                continue;
            }
            canvas.fill_rect(x + col * scale, y + row * scale, scale, scale, color);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionStyle {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 4],
    pub foreground: [u8; 4],
    pub max_scale: i32,
}

impl CaptionStyle {
    pub const LABEL: CaptionStyle = CaptionStyle {
        width: 128,
        height: 32,
        background: [255, 255, 255, 255],
        foreground: [34, 34, 34, 255],
        max_scale: 3,
    };

    pub const CART_CONTROL: CaptionStyle = CaptionStyle {
        width: 128,
        height: 44,
        background: [46, 160, 92, 255],
        foreground: [255, 255, 255, 255],
        max_scale: 2,
    };
}

/// Largest scale (down to 1) at which `text` fits `style.width` with a small margin.
pub fn caption_scale(text: &str, style: &CaptionStyle) -> i32 {
    let available = style.width as i32 - 4;
    (1..=style.max_scale.max(1))
        .rev()
        .find(|scale| text_width(text, *scale) <= available)
        .unwrap_or(1)
}

/// Renders `text` centered on a solid background. Text that does not fit at the
/// smallest scale is clipped at the texture edges.
pub fn render_caption_texture(text: &str, style: CaptionStyle) -> Texture {
    let mut texture = Texture::solid(style.width, style.height, style.background);
    let (width, height) = (texture.width(), texture.height());
    let scale = caption_scale(text, &style);
    let x = (width as i32 - text_width(text, scale)) / 2;
    let y = (height as i32 - GLYPH_HEIGHT * scale) / 2;
    let mut canvas = Canvas::new(texture.rgba_mut(), width, height);
    draw_text(&mut canvas, x, y, text, scale, style.foreground);
    texture
}
