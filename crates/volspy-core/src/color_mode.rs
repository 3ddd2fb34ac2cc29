//! Compositing modes and the active-mode state machine.

use crate::error::{Result, VolspyError};
use crate::shader_parts::{ShaderParts, ADDITIVE_BLEND, MAX_INTENSITY_BLEND, TRANSPARENT_BLEND};

/// One selectable compositing mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMode {
    pub parts: ShaderParts,
    pub description: String,
}

impl ColorMode {
    pub fn new(parts: ShaderParts, description: impl Into<String>) -> Self {
        Self {
            parts,
            description: description.into(),
        }
    }

    /// Default fragments with a custom blend statement.
    pub fn with_blend(blend: &str, description: impl Into<String>) -> Self {
        Self::new(ShaderParts::with_blend(blend), description)
    }

    /// The three built-in modes: transparency, additive, maximum intensity.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::with_blend(TRANSPARENT_BLEND, "Linear transparency blend."),
            Self::with_blend(ADDITIVE_BLEND, "Additive blend."),
            Self::with_blend(MAX_INTENSITY_BLEND, "Maximum-intensity projection."),
        ]
    }
}

/// Ordered, non-empty list of modes with exactly one current entry.
#[derive(Debug, Clone)]
pub struct ColorModes {
    modes: Vec<ColorMode>,
    current: usize,
    pick_index: Option<usize>,
}

impl ColorModes {
    /// Starts at mode 0. `pick_index` selects a dedicated program for pick passes.
    pub fn new(modes: Vec<ColorMode>, pick_index: Option<usize>) -> Result<Self> {
        if modes.is_empty() {
            return Err(VolspyError::EmptyModeList);
        }
        if let Some(index) = pick_index {
            if index >= modes.len() {
                return Err(VolspyError::ModeIndexOutOfRange {
                    index,
                    len: modes.len(),
                });
            }
        }
        Ok(Self {
            modes,
            current: 0,
            pick_index,
        })
    }

    /// Jumps to `index` modulo the mode count, or steps by one when `index` is `None`.
    ///
    /// Returns the new current index.
    pub fn set(&mut self, index: Option<usize>, reverse: bool) -> usize {
        let len = self.modes.len();
        self.current = match index {
            Some(i) => i % len,
            None if reverse => (self.current + len - 1) % len,
            None => (self.current + 1) % len,
        };
        self.current
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_mode(&self) -> &ColorMode {
        &self.modes[self.current]
    }

    /// Index of the program that renders pick passes.
    pub fn pick_index(&self) -> usize {
        self.pick_index.unwrap_or(self.current)
    }

    pub fn modes(&self) -> &[ColorMode] {
        &self.modes
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl Default for ColorModes {
    fn default() -> Self {
        Self {
            modes: ColorMode::defaults(),
            current: 0,
            pick_index: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modes() {
        let modes = ColorModes::default();
        assert_eq!(modes.len(), 3);
        assert_eq!(modes.current(), 0);
        assert_eq!(modes.current_mode().description, "Linear transparency blend.");
        assert_eq!(modes.modes()[2].parts.blend, MAX_INTENSITY_BLEND);
    }

    #[test]
    fn test_reverse_from_first_wraps_to_last() {
        let mut modes = ColorModes::default();
        assert_eq!(modes.set(None, true), 2);
    }

    #[test]
    fn test_direct_index_wraps() {
        let mut modes = ColorModes::default();
        assert_eq!(modes.set(Some(5), false), 2);
        assert_eq!(modes.set(Some(3), true), 0);
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        let mut modes = ColorModes::new(ColorMode::defaults(), None).unwrap();
        modes.set(Some(1), false);
        for _ in 0..modes.len() {
            modes.set(None, false);
        }
        assert_eq!(modes.current(), 1);
    }

    #[test]
    fn test_pick_index() {
        let mut modes = ColorModes::new(ColorMode::defaults(), Some(2)).unwrap();
        modes.set(Some(0), false);
        assert_eq!(modes.pick_index(), 2);

        let mut follow = ColorModes::default();
        follow.set(Some(1), false);
        assert_eq!(follow.pick_index(), 1);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            ColorModes::new(Vec::new(), None),
            Err(VolspyError::EmptyModeList)
        ));
        assert!(matches!(
            ColorModes::new(ColorMode::defaults(), Some(3)),
            Err(VolspyError::ModeIndexOutOfRange { index: 3, len: 3 })
        ));
    }
}
