//! Environment queries consumed by media and container evaluation.
//!
//! The cascade never measures anything itself: viewport geometry, user
//! preferences, and rendered container sizes all come from the embedder
//! through this trait. The defaults model a fixed light-scheme screen so
//! that only geometry has to be provided.

use vellum_dom::NodeId;

/// The rendering environment a document is being resolved against.
pub trait Environment {
    /// Viewport width in CSS pixels.
    fn viewport_width(&self) -> u32;

    /// Viewport height in CSS pixels.
    fn viewport_height(&self) -> u32;

    /// Rendered size of a container-query container, if the layout stage
    /// has measured it. `None` falls back to the viewport.
    fn container_size(&self, element: NodeId) -> Option<(u32, u32)> {
        let _ = element;
        None
    }

    /// The media type being rendered for.
    fn media_type(&self) -> &str {
        "screen"
    }

    /// `prefers-color-scheme` value.
    fn prefers_color_scheme(&self) -> &str {
        "light"
    }

    /// `prefers-reduced-motion` value.
    fn prefers_reduced_motion(&self) -> &str {
        "no-preference"
    }

    /// `prefers-contrast` value.
    fn prefers_contrast(&self) -> &str {
        "no-preference"
    }

    /// `pointer` capability.
    fn pointer(&self) -> &str {
        "fine"
    }

    /// `hover` capability.
    fn hover(&self) -> &str {
        "hover"
    }
}

/// A fixed-size environment with the default preferences.
#[derive(Debug, Clone, Copy)]
pub struct DefaultEnvironment {
    /// Viewport size in CSS pixels.
    pub viewport: (u32, u32),
}

impl DefaultEnvironment {
    /// Create an environment with the given viewport.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: (width, height),
        }
    }
}

impl Default for DefaultEnvironment {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

impl Environment for DefaultEnvironment {
    fn viewport_width(&self) -> u32 {
        self.viewport.0
    }

    fn viewport_height(&self) -> u32 {
        self.viewport.1
    }
}
