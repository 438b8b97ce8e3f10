/// Square textures with a contiguous mip chain.
///
/// Level 0 is stored first, followed by every half-resolution level down to
/// 1x1. Texels are 8-bit per channel, row-major within a level.
use crate::error::{Error, Result};
use glam::Vec4;
use std::path::Path;

#[derive(Clone, Debug)]
pub struct Texture {
    side: usize,
    channels: usize,
    data: Vec<u8>,
}

/// Number of texels across all levels of an `side`x`side` chain.
#[inline]
fn chain_texels(side: usize) -> usize {
    let mut total = 0;
    let mut s = side;
    while s > 0 {
        total += s * s;
        s >>= 1;
    }
    total
}

impl Texture {
    /// Build from raw row-major level-0 bytes. Mip levels start zeroed
    /// until [`Texture::compute_mips`] runs.
    pub fn from_raw(side: usize, channels: usize, pixels: &[u8]) -> Result<Self> {
        if side == 0 || !side.is_power_of_two() {
            return Err(Error::InvalidTexture(format!(
                "side {side} is not a power of two"
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(Error::InvalidTexture(format!(
                "{channels} channels, expected 1..=4"
            )));
        }
        let expected = side * side * channels;
        if pixels.len() != expected {
            return Err(Error::InvalidTexture(format!(
                "expected {expected} bytes, got {}",
                pixels.len()
            )));
        }

        let mut data = vec![0u8; chain_texels(side) * channels];
        data[..expected].copy_from_slice(pixels);

        Ok(Self {
            side,
            channels,
            data,
        })
    }

    /// Single-color texture with its mip chain already computed.
    pub fn solid(side: usize, rgba: [u8; 4]) -> Result<Self> {
        let pixels: Vec<u8> = std::iter::repeat(rgba).take(side * side).flatten().collect();
        let mut tex = Self::from_raw(side, 4, &pixels)?;
        tex.compute_mips();
        Ok(tex)
    }

    /// Decode an image file and build its mip chain.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)?;
        if img.width() != img.height() {
            return Err(Error::InvalidTexture(format!(
                "{} is {}x{}, textures must be square",
                path.display(),
                img.width(),
                img.height()
            )));
        }

        let side = img.width() as usize;
        let (channels, bytes) = match img.color().channel_count() {
            1 => (1, img.to_luma8().into_raw()),
            2 => (2, img.to_luma_alpha8().into_raw()),
            3 => (3, img.to_rgb8().into_raw()),
            _ => (4, img.to_rgba8().into_raw()),
        };

        let mut tex = Self::from_raw(side, channels, &bytes)?;
        tex.compute_mips();
        log::debug!(
            "loaded texture {} ({side}x{side}, {channels} channels, {} levels)",
            path.display(),
            tex.level_count()
        );
        Ok(tex)
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Levels including level 0: log2(side) + 1.
    pub fn level_count(&self) -> usize {
        self.side.trailing_zeros() as usize + 1
    }

    pub fn level_side(&self, level: usize) -> usize {
        (self.side >> level).max(1)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset of `level`, found by summing the sizes of the levels
    /// before it.
    fn level_offset(&self, level: usize) -> usize {
        let mut offset = 0;
        let mut s = self.side;
        for _ in 0..level {
            offset += s * s;
            s >>= 1;
        }
        offset * self.channels
    }

    /// Fill every mip level by 2x2 box-filtering the level above it.
    pub fn compute_mips(&mut self) {
        let n = self.channels;
        for level in 1..self.level_count() {
            let src_side = self.level_side(level - 1);
            let dst_side = self.level_side(level);
            let src_off = self.level_offset(level - 1);
            let dst_off = self.level_offset(level);

            let (head, tail) = self.data.split_at_mut(dst_off);
            let src = &head[src_off..];
            let dst = &mut tail[..dst_side * dst_side * n];

            for i in 0..dst_side {
                for j in 0..dst_side {
                    let r0 = 2 * i * src_side;
                    let r1 = (2 * i + 1) * src_side;
                    let (c0, c1) = (2 * j, 2 * j + 1);
                    for k in 0..n {
                        let sum = src[(r0 + c0) * n + k] as u32
                            + src[(r0 + c1) * n + k] as u32
                            + src[(r1 + c0) * n + k] as u32
                            + src[(r1 + c1) * n + k] as u32;
                        dst[(i * dst_side + j) * n + k] = ((sum + 2) / 4) as u8;
                    }
                }
            }
        }
    }

    /// Texel at row `i`, column `j` of `level` as RGBA in [0, 1].
    /// Indices past the level edge are clamped.
    pub fn texel(&self, i: usize, j: usize, level: usize) -> Vec4 {
        let level = level.min(self.level_count() - 1);
        let s = self.level_side(level);
        let (i, j) = (i.min(s - 1), j.min(s - 1));
        let at = self.level_offset(level) + (i * s + j) * self.channels;
        let t = &self.data[at..at + self.channels];

        let f = |b: u8| b as f32 / 255.0;
        match self.channels {
            1 => Vec4::new(f(t[0]), f(t[0]), f(t[0]), 1.0),
            2 => Vec4::new(f(t[0]), f(t[0]), f(t[0]), f(t[1])),
            3 => Vec4::new(f(t[0]), f(t[1]), f(t[2]), 1.0),
            _ => Vec4::new(f(t[0]), f(t[1]), f(t[2]), f(t[3])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_holds_full_chain() {
        let tex = Texture::from_raw(8, 3, &[0; 8 * 8 * 3]).unwrap();
        // 64 + 16 + 4 + 1
        assert_eq!(tex.data().len(), 85 * 3);
        assert_eq!(tex.level_count(), 4);
        assert_eq!(tex.level_side(3), 1);
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(Texture::from_raw(6, 4, &[0; 6 * 6 * 4]).is_err());
        assert!(Texture::from_raw(4, 5, &[0; 4 * 4 * 5]).is_err());
        assert!(Texture::from_raw(4, 4, &[0; 10]).is_err());
    }

    #[test]
    fn box_filter_rounds_average() {
        // 2x2 single channel: 0, 1, 1, 1 -> (3 + 2) / 4 = 1
        let mut tex = Texture::from_raw(2, 1, &[0, 1, 1, 1]).unwrap();
        tex.compute_mips();
        assert_eq!(tex.data()[4], 1);

        let mut tex = Texture::from_raw(2, 1, &[0, 0, 255, 255]).unwrap();
        tex.compute_mips();
        assert_eq!(tex.data()[4], 128);
    }

    #[test]
    fn texel_reads_requested_level() {
        let mut px = vec![0u8; 4 * 4 * 4];
        for p in px.chunks_mut(4) {
            p.copy_from_slice(&[255, 0, 0, 255]);
        }
        let mut tex = Texture::from_raw(4, 4, &px).unwrap();
        assert_eq!(tex.texel(0, 0, 1), Vec4::ZERO);
        tex.compute_mips();
        assert_eq!(tex.texel(0, 0, 2), Vec4::new(1.0, 0.0, 0.0, 1.0));
        // Clamped indices and level
        assert_eq!(tex.texel(9, 9, 9), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }
}
