// src/core/view.rs
//
// Display-surface contract: geometry, pixel/frame and pixel/frequency
// mapping, and a hook for scheduling follow-up repaints.

use image::Rgba;
use std::cell::RefCell;

use crate::core::audio::Frame;
use crate::core::scale;

/// Opaque, stable identity of a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

/// Pixel rectangle. Empty when either dimension is not positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Rect::default();
        }
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Bounding rectangle of both.
    pub fn united(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// A display surface a layer paints into.
///
/// Horizontal geometry is a start frame plus a zoom level in frames per
/// pixel. Vertical frequency mapping defaults to the standard linear/log
/// axis over the paint height.
pub trait View {
    fn id(&self) -> ViewId;

    fn paint_width(&self) -> usize;

    fn paint_height(&self) -> usize;

    /// Frame at pixel column 0.
    fn start_frame(&self) -> Frame;

    /// Frames per pixel, at least 1.
    fn zoom_level(&self) -> usize;

    fn frame_for_x(&self, x: i32) -> Frame {
        self.start_frame() + x as Frame * self.zoom_level().max(1) as Frame
    }

    fn x_for_frame(&self, frame: Frame) -> i32 {
        (frame - self.start_frame()).div_euclid(self.zoom_level().max(1) as Frame) as i32
    }

    fn y_for_frequency(&self, frequency: f64, min_f: f64, max_f: f64, logarithmic: bool) -> f64 {
        scale::y_for_frequency(frequency, min_f, max_f, logarithmic, self.paint_height() as f64)
    }

    fn frequency_for_y(&self, y: f64, min_f: f64, max_f: f64, logarithmic: bool) -> f64 {
        scale::frequency_for_y(y, min_f, max_f, logarithmic, self.paint_height() as f64)
    }

    fn foreground(&self) -> Rgba<u8> {
        Rgba([0, 0, 0, 255])
    }

    fn background(&self) -> Rgba<u8> {
        Rgba([255, 255, 255, 255])
    }

    /// Ask the surface to repaint `rect` again soon.
    fn request_repaint(&self, rect: Rect);
}

/// View with no window behind it; repaint requests are queued for the
/// owner to drain.
#[derive(Debug)]
pub struct OffscreenView {
    id: ViewId,
    width: usize,
    height: usize,
    start_frame: Frame,
    zoom_level: usize,
    pending: RefCell<Vec<Rect>>,
}

impl OffscreenView {
    pub fn new(id: u64, width: usize, height: usize, zoom_level: usize) -> Self {
        Self {
            id: ViewId(id),
            width,
            height,
            start_frame: 0,
            zoom_level: zoom_level.max(1),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// View whose width shows `frames` frames starting at `start`.
    pub fn covering(id: u64, start: Frame, frames: usize, width: usize, height: usize) -> Self {
        let zoom = frames.div_ceil(width.max(1)).max(1);
        let mut view = Self::new(id, width, height, zoom);
        view.start_frame = start;
        view
    }

    pub fn set_start_frame(&mut self, frame: Frame) {
        self.start_frame = frame;
    }

    pub fn set_zoom_level(&mut self, zoom: usize) {
        self.zoom_level = zoom.max(1);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    pub fn paint_rect(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    /// Repaint requests received since the last call.
    pub fn take_repaint_requests(&self) -> Vec<Rect> {
        self.pending.take()
    }
}

impl View for OffscreenView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn paint_width(&self) -> usize {
        self.width
    }

    fn paint_height(&self) -> usize {
        self.height
    }

    fn start_frame(&self) -> Frame {
        self.start_frame
    }

    fn zoom_level(&self) -> usize {
        self.zoom_level
    }

    fn request_repaint(&self, rect: Rect) {
        self.pending.borrow_mut().push(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_ops() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
        assert_eq!(a.united(&b), Rect::new(0, 0, 15, 15));
        assert!(a.intersect(&Rect::new(20, 0, 5, 5)).is_empty());
        assert_eq!(Rect::default().united(&a), a);
        assert!(a.contains(9, 0));
        assert!(!a.contains(10, 0));
    }

    #[test]
    fn test_frame_mapping() {
        let mut view = OffscreenView::new(1, 100, 50, 64);
        view.set_start_frame(-128);
        assert_eq!(view.frame_for_x(0), -128);
        assert_eq!(view.frame_for_x(3), 64);
        assert_eq!(view.x_for_frame(64), 3);
        assert_eq!(view.x_for_frame(-129), -1);
    }

    #[test]
    fn test_repaint_queue() {
        let view = OffscreenView::covering(2, 0, 1000, 100, 10);
        assert_eq!(view.zoom_level(), 10);
        view.request_repaint(Rect::new(0, 0, 5, 10));
        assert_eq!(view.take_repaint_requests().len(), 1);
        assert!(view.take_repaint_requests().is_empty());
    }
}
