//! Layers: composition roots that own configuration and per-view render
//! state, and publish change notifications

mod features;
pub mod properties;
pub mod session;
mod spectrogram;

pub use features::{AdjustedFrequencyRange, BinValueRange, SnapType, ValueExtents};
pub use properties::{Property, PropertyKind, PropertyRange};
pub use session::{format_attributes, parse_attributes, Attributes};
pub use spectrogram::SpectrogramLayer;

use image::RgbaImage;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::core::audio::Frame;
use crate::core::render::RenderResult;
use crate::core::view::{Rect, View, ViewId};

/// Notifications a layer publishes to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    /// A display-affecting parameter changed.
    ParametersChanged,
    /// The audio source was replaced or modified.
    ModelReplaced,
    /// The current vertical zoom step changed.
    VerticalZoomChanged,
    /// The transform model was built or discarded.
    SliceableModelReplaced,
    /// Building the transform model failed; published once per failure.
    TransformFailed(String),
}

/// Fan-out of layer events over mpsc channels.
///
/// Subscribers whose receiver has been dropped are forgotten on the next
/// publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<LayerEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<LayerEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: LayerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Capabilities shared by every layer type.
pub trait Layer {
    fn layer_name(&self) -> &str;

    /// Paint `rect` of `view` into `target`.
    fn paint(&mut self, view: &dyn View, target: &mut RgbaImage, rect: Rect) -> RenderResult;

    fn property_names(&self) -> Vec<&'static str>;

    fn property_range_and_value(&self, name: &str) -> Option<PropertyRange>;

    fn property_value_label(&self, name: &str, value: i32) -> Option<String>;

    /// Returns false for an unknown property.
    fn set_property(&mut self, name: &str, value: i32) -> bool;

    fn to_attributes(&self) -> Attributes;

    fn set_attributes(&mut self, attributes: &Attributes);

    fn subscribe(&mut self) -> Receiver<LayerEvent>;

    /// Percentage of the underlying model computed so far.
    fn completion(&self) -> u8;

    fn error(&self) -> Option<&str>;

    fn set_layer_dormant(&mut self, view: ViewId, dormant: bool);

    fn is_layer_dormant(&self, view: ViewId) -> bool;

    fn has_light_background(&self) -> bool {
        false
    }

    /// Snap `frame` to the layer's natural resolution.
    fn snap_to_feature_frame(&self, frame: Frame, snap: SnapType) -> Option<(Frame, usize)>;

    fn feature_description(&mut self, view: &dyn View, x: i32, y: i32) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_drops_closed_subscribers() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);
        bus.publish(LayerEvent::ParametersChanged);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(LayerEvent::ParametersChanged));
    }
}
