//! Background worker for quantization, dithering and spritesheet packing
//!
//! The editing engine itself is single-threaded; these are the only
//! operations heavy enough to leave the main loop. Requests carry their
//! pixel buffers by move (no copy across the boundary) plus a reply sender.
//! The protocol is fire-and-forget: a caller that no longer wants the result
//! drops its receiver and the response is discarded. There is no
//! cancellation and no internal timeout; a hung request blocks only the
//! feature that issued it.

use crate::buffer::PixelBuffer;
use crate::quantize::{build_quantized_palette, dither_floyd_steinberg, map_to_palette};
use crate::spritesheet::{pack_spritesheet, SheetSettings, Spritesheet};
use std::sync::mpsc::{sync_channel, Receiver, Sender, SyncSender};
use std::thread::JoinHandle;

/// Bounded depth of the request queue; senders block when it is full.
const REQUEST_QUEUE_DEPTH: usize = 8;

/// A unit of work for the engine worker.
pub enum WorkerRequest {
    /// Quantize a buffer to `palette_size` colors, with or without
    /// Floyd-Steinberg dithering.
    Dither {
        pixels: PixelBuffer,
        palette_size: usize,
        dither: bool,
        reply: Sender<DitherResponse>,
    },
    /// Pack frames into a spritesheet.
    Spritesheet {
        frames: Vec<PixelBuffer>,
        settings: SheetSettings,
        reply: Sender<Spritesheet>,
    },
}

/// Result of a dither request.
pub struct DitherResponse {
    pub pixels: PixelBuffer,
}

/// Handle to the dedicated worker thread. Dropping it closes the queue and
/// joins the thread after in-flight requests drain.
pub struct EngineWorker {
    sender: Option<SyncSender<WorkerRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl EngineWorker {
    /// Spawn the worker thread with a bounded request queue.
    pub fn spawn() -> Self {
        let (sender, receiver) = sync_channel::<WorkerRequest>(REQUEST_QUEUE_DEPTH);
        let handle = std::thread::Builder::new()
            .name("spriteforge-worker".to_string())
            .spawn(move || {
                while let Ok(request) = receiver.recv() {
                    handle_request(request);
                }
            })
            .ok();
        EngineWorker { sender: Some(sender), handle }
    }

    /// Submit a raw request. Blocks while the queue is full; returns false
    /// when the worker is gone.
    pub fn submit(&self, request: WorkerRequest) -> bool {
        match &self.sender {
            Some(sender) => sender.send(request).is_ok(),
            None => false,
        }
    }

    /// Queue a dither job, returning the channel the response will arrive on.
    pub fn request_dither(
        &self,
        pixels: PixelBuffer,
        palette_size: usize,
        dither: bool,
    ) -> Receiver<DitherResponse> {
        let (reply, receiver) = std::sync::mpsc::channel();
        self.submit(WorkerRequest::Dither { pixels, palette_size, dither, reply });
        receiver
    }

    /// Queue a spritesheet job, returning the response channel.
    pub fn request_spritesheet(
        &self,
        frames: Vec<PixelBuffer>,
        settings: SheetSettings,
    ) -> Receiver<Spritesheet> {
        let (reply, receiver) = std::sync::mpsc::channel();
        self.submit(WorkerRequest::Spritesheet { frames, settings, reply });
        receiver
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_request(request: WorkerRequest) {
    match request {
        WorkerRequest::Dither { mut pixels, palette_size, dither, reply } => {
            let palette = build_quantized_palette(&pixels, palette_size);
            if dither {
                dither_floyd_steinberg(&mut pixels, &palette);
            } else {
                map_to_palette(&mut pixels, &palette);
            }
            // Receiver may be gone; fire-and-forget
            let _ = reply.send(DitherResponse { pixels });
        }
        WorkerRequest::Spritesheet { frames, settings, reply } => {
            let _ = reply.send(pack_spritesheet(&frames, &settings));
        }
    }
}
