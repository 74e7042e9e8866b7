/// Scroll position captured before older content is prepended to a thread view.
///
/// Rendering surfaces record the container's content height and offset
/// before calling [`crate::ThreadCache::load_older_page`], then feed the new
/// content height back in from the content-prepended callback so the
/// previously visible messages stay where they were.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    scroll_height: f64,
    scroll_top: f64,
}

impl ScrollAnchor {
    pub fn capture(scroll_height: f64, scroll_top: f64) -> Self {
        Self {
            scroll_height,
            scroll_top,
        }
    }

    /// Offset that keeps the anchored content in place after the content grew to `new_height`.
    pub fn restore(&self, new_height: f64) -> f64 {
        (self.scroll_top + (new_height - self.scroll_height)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_shifts_by_height_delta() {
        let anchor = ScrollAnchor::capture(1200.0, 40.0);
        assert_eq!(anchor.restore(2000.0), 840.0);
    }

    #[test]
    fn test_restore_without_growth_keeps_offset() {
        let anchor = ScrollAnchor::capture(800.0, 0.0);
        assert_eq!(anchor.restore(800.0), 0.0);
    }
}
