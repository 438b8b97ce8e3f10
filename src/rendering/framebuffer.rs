/// Framebuffer for software rendering
/// Stores color and depth information
///
/// Memory layout:
/// - Hot metadata (width, height) stored first for bounds checking
/// - Color and depth are separate Vecs so either can be cleared or read alone
use glam::Vec4;

/// Depth value of a cleared buffer. Any finite depth passes against it.
pub const CLEAR_DEPTH: f32 = f32::INFINITY;

pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pub color_buffer: Vec<u32>, // ARGB format
    pub depth_buffer: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let pixel_count = width * height;
        Self {
            width,
            height,
            color_buffer: vec![0; pixel_count],
            depth_buffer: vec![CLEAR_DEPTH; pixel_count],
        }
    }

    /// Clear color and depth buffers
    pub fn clear(&mut self, clear_color: u32) {
        self.clear_color(clear_color);
        self.clear_depth();
    }

    pub fn clear_color(&mut self, clear_color: u32) {
        self.color_buffer.fill(clear_color);
    }

    pub fn clear_depth(&mut self) {
        self.depth_buffer.fill(CLEAR_DEPTH);
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Depth at (x, y), or `None` outside the buffer.
    #[inline]
    pub fn depth(&self, x: usize, y: usize) -> Option<f32> {
        self.index(x, y).map(|i| self.depth_buffer[i])
    }

    #[inline]
    pub fn set_depth(&mut self, x: usize, y: usize, depth: f32) {
        if let Some(i) = self.index(x, y) {
            self.depth_buffer[i] = depth;
        }
    }

    #[inline]
    pub fn color(&self, x: usize, y: usize) -> Option<u32> {
        self.index(x, y).map(|i| self.color_buffer[i])
    }

    /// Set pixel without depth test
    #[inline]
    pub fn set_color(&mut self, x: usize, y: usize, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.color_buffer[i] = color;
        }
    }

    /// Set pixel with depth test. Returns true when the pixel was written.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32, depth: f32) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };

        if depth < self.depth_buffer[index] {
            self.color_buffer[index] = color;
            self.depth_buffer[index] = depth;
            true
        } else {
            false
        }
    }

    /// Get color buffer as slice
    pub fn color_buffer_slice(&self) -> &[u32] {
        &self.color_buffer
    }

    /// Row-major RGBA bytes, e.g. for writing an image file.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.color_buffer
            .iter()
            .flat_map(|&c| unpack_rgba(c))
            .collect()
    }

    /// Resize framebuffer. Contents are cleared.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let pixel_count = width * height;
        self.color_buffer.clear();
        self.color_buffer.resize(pixel_count, 0);
        self.depth_buffer.clear();
        self.depth_buffer.resize(pixel_count, CLEAR_DEPTH);
    }
}

/// Pack 8-bit channels into an ARGB u32
#[inline]
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Unpack an ARGB u32 into `[r, g, b, a]`
#[inline]
pub const fn unpack_rgba(c: u32) -> [u8; 4] {
    [(c >> 16) as u8, (c >> 8) as u8, c as u8, (c >> 24) as u8]
}

/// Quantize a shader color. Channels are clamped to [0, 1] and truncated.
#[inline]
pub fn quantize_color(color: Vec4) -> u32 {
    let c = color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
    pack_rgba(c.x as u8, c.y as u8, c.z as u8, c.w as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_depth_accepts_any_finite_depth() {
        let mut fb = Framebuffer::new(4, 4);
        fb.clear(0);
        assert!(fb.set_pixel(1, 1, 0xFFFF0000, 1.0e30));
        assert!(!fb.set_pixel(1, 1, 0xFF00FF00, 2.0e30));
        assert_eq!(fb.color(1, 1), Some(0xFFFF0000));
    }

    #[test]
    fn out_of_bounds_access_is_ignored() {
        let mut fb = Framebuffer::new(2, 2);
        assert!(!fb.set_pixel(2, 0, 0xFFFFFFFF, 0.0));
        fb.set_color(0, 5, 0xFFFFFFFF);
        assert_eq!(fb.depth(3, 3), None);
        assert!(fb.color_buffer.iter().all(|&c| c == 0));
    }

    #[test]
    fn quantize_clamps_out_of_range_channels() {
        let c = quantize_color(Vec4::new(2.0, -1.0, 0.5, 1.0));
        assert_eq!(unpack_rgba(c), [255, 0, 127, 255]);
    }

    #[test]
    fn resize_reallocates_cleared_buffers() {
        let mut fb = Framebuffer::new(2, 2);
        fb.set_pixel(0, 0, 0xFFFFFFFF, 0.5);
        fb.resize(3, 1);
        assert_eq!(fb.color_buffer.len(), 3);
        assert!(fb.depth_buffer.iter().all(|&d| d == CLEAR_DEPTH));
        assert_eq!(fb.to_rgba8().len(), 12);
    }
}
