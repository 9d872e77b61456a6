// src/core/render/image_cache.rs
//
// Per-view bitmap that scrolls horizontally and tracks one contiguous
// valid column range.

use image::{Rgba, RgbaImage};
use log::trace;

use crate::core::audio::Frame;
use crate::core::view::Rect;

/// Cached image for one view.
///
/// The valid area always spans the full image height, so only its left
/// edge and width are tracked. Writing columns is the only way to make
/// part of the image valid.
#[derive(Debug, Clone)]
pub struct ImageCache {
    image: RgbaImage,
    left: i32,
    width: i32,
    start_frame: Frame,
    zoom_level: usize,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            left: 0,
            width: 0,
            start_frame: 0,
            zoom_level: 0,
        }
    }

    pub fn invalidate(&mut self) {
        self.width = 0;
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Reallocate for a new size, dropping all content.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.size() != (width, height) {
            self.image = RgbaImage::new(width, height);
            self.invalidate();
        }
    }

    pub fn valid_left(&self) -> i32 {
        self.left
    }

    pub fn valid_right(&self) -> i32 {
        self.left + self.width
    }

    pub fn valid_area(&self) -> Rect {
        if !self.is_valid() {
            return Rect::default();
        }
        Rect::new(self.left, 0, self.width, self.image.height() as i32)
    }

    pub fn zoom_level(&self) -> usize {
        self.zoom_level
    }

    pub fn set_zoom_level(&mut self, zoom: usize) {
        if self.zoom_level != zoom {
            self.zoom_level = zoom;
            self.invalidate();
        }
    }

    pub fn start_frame(&self) -> Frame {
        self.start_frame
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Move to a new start frame, shifting still-valid pixels with it.
    ///
    /// Content survives only when the move is a whole number of pixels at
    /// the current zoom level and less than the image width.
    pub fn scroll_to(&mut self, new_start_frame: Frame) {
        if new_start_frame == self.start_frame {
            return;
        }
        let zoom = self.zoom_level.max(1) as Frame;
        let delta = self.start_frame - new_start_frame;
        self.start_frame = new_start_frame;

        if !self.is_valid() {
            return;
        }
        if delta % zoom != 0 {
            trace!("ImageCache::scroll_to: fractional pixel move, invalidating");
            self.invalidate();
            return;
        }

        let dx = delta / zoom;
        let w = self.image.width() as i64;
        if dx.abs() >= w {
            self.invalidate();
            return;
        }

        let dx = dx as i32;
        self.shift_pixels(dx);

        let left = (self.left + dx).max(0);
        let right = (self.valid_right() + dx).min(w as i32);
        if right <= left {
            self.invalidate();
        } else {
            self.left = left;
            self.width = right - left;
        }
        trace!(
            "ImageCache::scroll_to: shifted {} px, valid {}..{}",
            dx,
            self.left,
            self.valid_right()
        );
    }

    fn shift_pixels(&mut self, dx: i32) {
        let row_bytes = self.image.width() as usize * 4;
        let shift = dx.unsigned_abs() as usize * 4;
        let buffer: &mut [u8] = &mut self.image;
        for row in buffer.chunks_exact_mut(row_bytes) {
            if dx > 0 {
                row.copy_within(0..row_bytes - shift, shift);
            } else {
                row.copy_within(shift..row_bytes, 0);
            }
        }
    }

    /// Adjust a column range so that, rendered, it stays contiguous with the
    /// valid area and together they cover the original range.
    ///
    /// Returns `(left, width, is_left_of_valid_area)`. A width of zero means
    /// the range is already valid. A range reaching past both ends of the
    /// valid area is cut to its wider uncovered side.
    pub fn adjust_to_touch_valid_area(&self, left: i32, width: i32) -> (i32, i32, bool) {
        if !self.is_valid() {
            return (left, width, false);
        }
        let right = left + width;
        if left < self.left {
            let right_gap = right - self.valid_right();
            if right_gap > self.left - left {
                (self.valid_right(), right_gap, false)
            } else {
                (left, self.left - left, true)
            }
        } else if right <= self.valid_right() {
            (left, 0, false)
        } else {
            let start = self.valid_right();
            (start, right - start, false)
        }
    }

    /// Write one full-height column of pixels. Does not change validity.
    pub fn put_column(&mut self, x: i32, colours: &[Rgba<u8>]) {
        if x < 0 || x as u32 >= self.image.width() {
            return;
        }
        for (y, colour) in colours.iter().enumerate().take(self.image.height() as usize) {
            self.image.put_pixel(x as u32, y as u32, *colour);
        }
    }

    /// Record columns `left..left + width` as valid.
    ///
    /// A range that does not touch the existing valid area replaces it.
    pub fn mark_valid(&mut self, left: i32, width: i32) {
        let w = self.image.width() as i32;
        let left_c = left.max(0);
        let right_c = (left + width).min(w);
        if right_c <= left_c {
            return;
        }
        if self.is_valid() && left_c <= self.valid_right() && right_c >= self.left {
            let new_left = self.left.min(left_c);
            let new_right = self.valid_right().max(right_c);
            self.left = new_left;
            self.width = new_right - new_left;
        } else {
            self.left = left_c;
            self.width = right_c - left_c;
        }
    }

    /// Copy the valid part of `rect` into `target` at the same coordinates.
    /// Returns the region copied.
    pub fn copy_to(&self, target: &mut RgbaImage, rect: Rect) -> Rect {
        let bounds = Rect::new(0, 0, target.width() as i32, target.height() as i32);
        let region = self.valid_area().intersect(&rect).intersect(&bounds);
        if region.is_empty() {
            return region;
        }
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                target.put_pixel(x as u32, y as u32, *self.image.get_pixel(x as u32, y as u32));
            }
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32) -> ImageCache {
        let mut cache = ImageCache::new();
        cache.resize(width, height);
        cache.set_zoom_level(10);
        for x in 0..width as i32 {
            let shade = x as u8;
            cache.put_column(x, &vec![Rgba([shade, 0, 0, 255]); height as usize]);
        }
        cache.mark_valid(0, width as i32);
        cache
    }

    #[test]
    fn test_resize_invalidates() {
        let mut cache = filled(8, 2);
        assert!(cache.is_valid());
        cache.resize(8, 2);
        assert!(cache.is_valid());
        cache.resize(9, 2);
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_scroll_whole_pixels() {
        let mut cache = filled(8, 2);
        // Move forward 3 pixels: content shifts left
        cache.scroll_to(30);
        assert_eq!(cache.valid_area(), Rect::new(0, 0, 5, 2));
        assert_eq!(cache.image().get_pixel(0, 0)[0], 3);

        cache.scroll_to(10);
        assert_eq!(cache.valid_left(), 2);
        assert_eq!(cache.valid_right(), 7);
        assert_eq!(cache.image().get_pixel(2, 1)[0], 3);
    }

    #[test]
    fn test_scroll_fractional_or_far_invalidates() {
        let mut cache = filled(8, 2);
        cache.scroll_to(5);
        assert!(!cache.is_valid());

        let mut cache = filled(8, 2);
        cache.scroll_to(200);
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_adjust_to_touch() {
        let mut cache = filled(20, 2);
        cache.invalidate();
        cache.mark_valid(5, 5);
        assert_eq!(cache.adjust_to_touch_valid_area(0, 3), (0, 5, true));
        assert_eq!(cache.adjust_to_touch_valid_area(6, 2), (6, 0, false));
        assert_eq!(cache.adjust_to_touch_valid_area(15, 3), (10, 8, false));
        // Straddling ranges keep the wider uncovered side
        assert_eq!(cache.adjust_to_touch_valid_area(0, 20), (10, 10, false));
        assert_eq!(cache.adjust_to_touch_valid_area(0, 12), (0, 5, true));
    }

    #[test]
    fn test_mark_valid_merges_or_replaces() {
        let mut cache = filled(20, 1);
        cache.invalidate();
        cache.mark_valid(5, 5);
        cache.mark_valid(10, 3);
        assert_eq!((cache.valid_left(), cache.valid_right()), (5, 13));
        cache.mark_valid(17, 2);
        assert_eq!((cache.valid_left(), cache.valid_right()), (17, 19));
    }
}
