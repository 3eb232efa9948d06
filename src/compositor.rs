//! Layer compositing - folding an ordered layer stack into one visible buffer
//!
//! The compositor is a pure function of layer state: it never mutates its
//! inputs and always allocates a fresh output, so compositing the same stack
//! twice yields byte-identical buffers. The engine recomposites eagerly on
//! every mutation rather than tracking dirty rectangles.

use crate::blend::blend_pixel;
use crate::buffer::PixelBuffer;
use crate::model::{Document, Frame, Layer};

/// Composite an ordered layer slice (first = bottom) into a fresh buffer.
///
/// Invisible layers are skipped entirely. For each visible layer, every
/// pixel is blended onto the running result with the layer's blend mode and
/// an effective foreground alpha of `pixel.a * opacity`.
pub fn composite_layers(layers: &[&Layer], width: u32, height: u32) -> PixelBuffer {
    let mut result = PixelBuffer::new(width, height);
    let pixel_count = result.pixel_count();

    for layer in layers {
        if !layer.visible {
            continue;
        }
        let opacity = layer.opacity();
        for i in 0..pixel_count.min(layer.pixels.pixel_count()) {
            let fg = layer.pixels.pixel_at(i);
            if fg[3] == 0 {
                continue;
            }
            let bg = result.pixel_at(i);
            result.set_pixel_at(i, blend_pixel(layer.blend_mode, fg, bg, opacity));
        }
    }

    result
}

/// Composite one frame of a document into a fresh buffer.
pub fn composite_frame(doc: &Document, frame: &Frame) -> PixelBuffer {
    let layers: Vec<&Layer> = frame.layer_order.iter().filter_map(|&id| doc.layer(id)).collect();
    let canvas = doc.canvas();
    composite_layers(&layers, canvas.width, canvas.height)
}
