//! Viewports, pick windows and pick readbacks.
//!
//! Picking re-renders the active volume program into a single texel. Instead of
//! offsetting the viewport (which may not go negative), the full-screen quad's
//! texture coordinates are squeezed onto the centre of the picked pixel, so the
//! pick texel evaluates exactly the fragment the final pass shades there.

use glam::Vec4;

/// A viewport rectangle in target pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport covering a whole `width`x`height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the pixel `(px, py)` lies inside the viewport.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && px - self.x < self.width
            && py - self.y < self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Affine remap of the quad's texture coordinates: `origin + scale * uv`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct PickWindow {
    pub origin: [f32; 2],
    pub scale: f32,
    pub _padding: f32,
}

impl PickWindow {
    /// Identity window used by the final pass.
    pub const FULL: Self = Self {
        origin: [0.0, 0.0],
        scale: 1.0,
        _padding: 0.0,
    };

    /// Window collapsing the quad onto the centre of pixel `(px, py)` of `viewport`.
    ///
    /// Returns `None` when the pixel is outside the viewport.
    #[allow(clippy::cast_precision_loss)]
    pub fn at_pixel(viewport: &Viewport, px: u32, py: u32) -> Option<Self> {
        if viewport.is_empty() || !viewport.contains(px, py) {
            return None;
        }
        let u = ((px - viewport.x) as f32 + 0.5) / viewport.width as f32;
        let v = ((py - viewport.y) as f32 + 0.5) / viewport.height as f32;
        Some(Self {
            origin: [u, v],
            scale: 0.0,
            _padding: 0.0,
        })
    }

    /// Texture coordinate produced for quad coordinate `uv`.
    pub fn apply(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            self.origin[0] + self.scale * uv[0],
            self.origin[1] + self.scale * uv[1],
        ]
    }
}

impl Default for PickWindow {
    fn default() -> Self {
        Self::FULL
    }
}

/// The RGBA8 texel read back from the pick target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PickReadback(pub [u8; 4]);

impl PickReadback {
    pub fn rgba(&self) -> [u8; 4] {
        self.0
    }

    /// Components scaled to `[0, 1]`, the value fed back as `u_picked`.
    pub fn normalized(&self) -> Vec4 {
        Vec4::from_array(self.0.map(f32::from)) / 255.0
    }

    /// True when the picked pixel shows no volume (black color channels).
    pub fn is_background(&self) -> bool {
        self.0[..3].iter().all(|&c| c == 0)
    }
}

impl From<[u8; 4]> for PickReadback {
    fn from(rgba: [u8; 4]) -> Self {
        Self(rgba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_contains() {
        let viewport = Viewport::new(10, 20, 100, 50);
        assert!(viewport.contains(10, 20));
        assert!(viewport.contains(109, 69));
        assert!(!viewport.contains(110, 20));
        assert!(!viewport.contains(9, 30));
        assert!(!viewport.contains(50, 70));
    }

    #[test]
    fn test_pick_window_matches_final_pass_texcoord() {
        let viewport = Viewport::new(10, 20, 100, 50);
        let (px, py) = (35, 44);
        let window = PickWindow::at_pixel(&viewport, px, py).unwrap();

        // the final pass interpolates the quad at the pixel centre
        let centre = [
            (px - viewport.x) as f32 + 0.5,
            (py - viewport.y) as f32 + 0.5,
        ];
        let expected = [centre[0] / 100.0, centre[1] / 50.0];
        let final_uv = PickWindow::FULL.apply(expected);

        // every quad coordinate collapses onto that texcoord
        for uv in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.3, 0.7]] {
            let picked = window.apply(uv);
            assert!((picked[0] - final_uv[0]).abs() < 1e-6);
            assert!((picked[1] - final_uv[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pick_outside_viewport() {
        let viewport = Viewport::new(0, 0, 64, 64);
        assert!(PickWindow::at_pixel(&viewport, 64, 10).is_none());
        assert!(PickWindow::at_pixel(&Viewport::new(0, 0, 0, 10), 0, 0).is_none());
    }

    #[test]
    fn test_readback_normalization() {
        let readback = PickReadback([255, 0, 51, 255]);
        let n = readback.normalized();
        assert!((n.x - 1.0).abs() < 1e-6);
        assert!(n.y.abs() < 1e-6);
        assert!((n.z - 0.2).abs() < 1e-6);
        assert!(!readback.is_background());
        assert!(PickReadback([0, 0, 0, 255]).is_background());
    }
}
