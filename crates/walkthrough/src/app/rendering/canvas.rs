/// Mutable view over a tightly packed RGBA8 buffer. All writes are clipped.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let pixel = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?;
        let offset = pixel.checked_mul(4)?;
        (offset.checked_add(4)? <= self.frame.len()).then_some(offset)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x, y)?;
        let mut color = [0; 4];
        color.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(color)
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.byte_offset(x, y) {
            self.frame[offset..offset + 4].copy_from_slice(&color);
        }
    }

    /// Source-over blend of `color` onto the existing pixel.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        let alpha = color[3] as u32;
        if alpha == 255 {
            self.frame[offset..offset + 4].copy_from_slice(&color);
            return;
        }
        if alpha == 0 {
            return;
        }
        let inverse = 255 - alpha;
        for channel in 0..3 {
            let dst = self.frame[offset + channel] as u32;
            let src = color[channel] as u32;
            self.frame[offset + channel] = ((src * alpha + dst * inverse + 127) / 255) as u8;
        }
        self.frame[offset + 3] = 255;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(rect_width).min(self.width as i32);
        let end_y = y.saturating_add(rect_height).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub fn outline_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: [u8; 4]) {
        if rect_width <= 1 || rect_height <= 1 {
            return;
        }
        self.fill_rect(x, y, rect_width, 1, color);
        self.fill_rect(x, y + rect_height - 1, rect_width, 1, color);
        self.fill_rect(x, y + 1, 1, rect_height - 2, color);
        self.fill_rect(x + rect_width - 1, y + 1, 1, rect_height - 2, color);
    }

    pub fn fill_circle(&mut self, center_x: i32, center_y: i32, radius: i32, color: [u8; 4]) {
        if radius <= 0 {
            return;
        }
        let radius_sq = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius_sq {
                    self.blend_pixel(center_x + dx, center_y + dy, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_outside_bounds_are_ignored() {
        let mut frame = vec![0; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4);
        canvas.put_pixel(-1, 0, [255; 4]);
        canvas.put_pixel(4, 0, [255; 4]);
        canvas.fill_rect(-10, -10, 5, 5, [255; 4]);
        canvas.fill_circle(100, 100, 3, [255; 4]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let mut frame = vec![0; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4);
        canvas.fill_rect(2, 2, 10, 10, [9, 9, 9, 255]);
        assert_eq!(canvas.pixel(3, 3), Some([9, 9, 9, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(4, 4), None);
    }

    #[test]
    fn blend_mixes_translucent_colors() {
        let mut frame = vec![0; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        canvas.clear([0, 0, 0, 255]);
        canvas.blend_pixel(0, 0, [255, 255, 255, 128]);
        let [r, g, b, a] = canvas.pixel(0, 0).expect("pixel");
        assert_eq!(a, 255);
        assert!((127..=129).contains(&r));
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn short_buffers_never_panic() {
        let mut frame = vec![0; 7];
        let mut canvas = Canvas::new(&mut frame, 4, 4);
        canvas.clear([1, 1, 1, 1]);
        canvas.fill_rect(0, 0, 4, 4, [255; 4]);
        assert_eq!(canvas.pixel(1, 0), None);
    }
}
