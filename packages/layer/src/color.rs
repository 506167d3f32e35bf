//! Rotating layer colors.

use crate::config::ImportConfig;

/// Hands out palette colors in order, wrapping after the last entry.
///
/// Each [`crate::ImportSession`] owns one, so coloring is deterministic per
/// session and independent sessions never interleave.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<String>,
    index: usize,
}

impl ColorAllocator {
    /// Creates an allocator over `palette`, starting at its first color.
    ///
    /// An empty palette falls back to the default one.
    #[must_use]
    pub fn new(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            ImportConfig::default().palette
        } else {
            palette
        };

        Self { palette, index: 0 }
    }

    /// Returns the next color and advances the rotation.
    pub fn next_color(&mut self) -> String {
        let color = self.palette[self.index % self.palette.len()].clone();
        self.index = (self.index + 1) % self.palette.len();
        color
    }

    /// Restarts the rotation at the first color.
    pub const fn reset(&mut self) {
        self.index = 0;
    }

    /// The colors this allocator rotates through.
    #[must_use]
    pub fn palette(&self) -> &[String] {
        &self.palette
    }
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new(ImportConfig::default().palette)
    }
}
