use crate::{blend::Blend, color::Color};

pub type LayerID = crate::UniqueID<Layer>;

/// A single drawing layer: an owned pixel surface with an identity.
///
/// Not `Clone` - two layers with the same ID in one model would break the
/// current-layer bookkeeping. Use [`Layer::duplicate`] for a copy with a new identity.
pub struct Layer {
    id: LayerID,
    surface: image::RgbaImage,
    pub name: String,
    pub blend: Blend,
    pub visible: bool,
}
impl Layer {
    /// Wrap an existing surface.
    #[must_use]
    pub fn new(surface: image::RgbaImage) -> Self {
        let id = LayerID::next();
        Self {
            name: format!("Layer {}", id.get()),
            id,
            surface,
            blend: Blend::default(),
            visible: true,
        }
    }
    /// A fully transparent layer.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(image::RgbaImage::new(width, height))
    }
    /// Copy the layer's contents and settings under a fresh ID.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut copy = Self::new(self.surface.clone());
        copy.name.clone_from(&self.name);
        copy.blend = self.blend;
        copy.visible = self.visible;
        copy
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn surface(&self) -> &image::RgbaImage {
        &self.surface
    }
    pub fn surface_mut(&mut self) -> &mut image::RgbaImage {
        &mut self.surface
    }
    pub(crate) fn replace_surface(&mut self, surface: image::RgbaImage) -> image::RgbaImage {
        std::mem::replace(&mut self.surface, surface)
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.surface.width()
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.surface.height()
    }
    /// Read a pixel, or None if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.surface.get_pixel_checked(x, y).copied().map(Into::into)
    }
    /// Write a pixel. Returns `false` if out of bounds, leaving the surface untouched.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        match self.surface.get_pixel_mut_checked(x, y) {
            Some(pixel) => {
                *pixel = color.into();
                true
            }
            None => false,
        }
    }
    /// Fill the whole surface with one color.
    pub fn fill(&mut self, color: Color) {
        let color = image::Rgba::from(color);
        self.surface.pixels_mut().for_each(|pixel| *pixel = color);
    }
    /// Memory held by the pixel data, in bytes.
    #[must_use]
    pub fn surface_bytes(&self) -> usize {
        self.surface.as_raw().len()
    }
}
impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.surface.dimensions())
            .field("blend", &self.blend)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}
/// Layers compare by identity, not content.
impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Layer {}
