//! Error type of the facade crate.

use thiserror::Error;
use volspy_render::{RenderError, ScreenshotError};

/// Errors from headless rendering and frame export.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to save frame: {0}")]
    Screenshot(#[from] ScreenshotError),

    /// The target size is zero or exceeds the device limits.
    #[error("invalid frame size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

impl From<volspy_core::VolspyError> for FrameError {
    fn from(e: volspy_core::VolspyError) -> Self {
        Self::Render(e.into())
    }
}

/// A specialized Result type for frame rendering.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
