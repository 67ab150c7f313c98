//! # Colors
//!
//! Layer surfaces store straight (non-premultiplied) 8-bit RGBA, the same layout as the
//! `image` crate's [`image::Rgba<u8>`]. Colors can also be packed into the `0xAARRGGBB`
//! integers used by Android's `Color`, which is how tools typically hand colors over.

/// A straight-alpha RGBA8 color.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct Color([u8; 4]);
impl Color {
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }
    /// Unpack from `0xAARRGGBB`.
    #[must_use]
    pub const fn from_argb(packed: u32) -> Self {
        let [a, r, g, b] = packed.to_be_bytes();
        Self([r, g, b, a])
    }
    /// Pack into `0xAARRGGBB`.
    #[must_use]
    pub const fn to_argb(self) -> u32 {
        let [r, g, b, a] = self.0;
        u32::from_be_bytes([a, r, g, b])
    }
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.alpha() == u8::MAX
    }
    #[must_use]
    pub fn is_transparent(self) -> bool {
        self.alpha() == 0
    }
    #[must_use]
    pub const fn as_array(self) -> [u8; 4] {
        self.0
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}
impl From<image::Rgba<u8>> for Color {
    fn from(value: image::Rgba<u8>) -> Self {
        Self(value.0)
    }
}
impl From<Color> for image::Rgba<u8> {
    fn from(value: Color) -> Self {
        image::Rgba(value.0)
    }
}

#[cfg(test)]
mod test {
    use super::Color;
    #[test]
    fn argb_matches_android_constants() {
        // android.graphics.Color.BLACK and BLUE
        assert_eq!(Color::from_argb(0xFF00_0000), Color::BLACK);
        assert_eq!(Color::from_argb(0xFF00_00FF), Color::BLUE);
        assert_eq!(Color::new(0x12, 0x34, 0x56, 0x78).to_argb(), 0x7812_3456);
    }
    #[test]
    fn opacity_queries() {
        assert!(Color::RED.is_opaque());
        assert!(Color::TRANSPARENT.is_transparent());
        assert!(!Color::new(1, 2, 3, 128).is_opaque());
    }
}
