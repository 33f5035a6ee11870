use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};

use anyhow::{Context, Result};

use super::path::resolve_asset_path;

/// Completion posted by a load worker, drained on the render thread once per
/// frame.
#[derive(Debug)]
pub enum LoadEvent {
    TextureDecoded {
        id: i32,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        nearest: bool,
    },
    TextureFailed {
        id: i32,
        error: String,
    },
    ShaderLoaded {
        id: i32,
        source: String,
    },
    ShaderFailed {
        id: i32,
        error: String,
    },
}

/// A load requested before the GPU device existed. Replayed through the
/// normal load path, in issue order, once the device is ready.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingLoad {
    Texture { id: i32, path: String, nearest: bool },
    Shader { id: i32, path: String },
}

/// Fetch + decode workers and the pre-device pending queue.
///
/// Loads run on detached worker threads; nothing here blocks the caller.
/// Completions of concurrent in-flight loads carry no ordering guarantee.
/// There is no cancellation: once started, a load runs to completion or
/// failure.
pub struct AssetLoader {
    asset_root: String,
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
    pending: VecDeque<PendingLoad>,
}

impl AssetLoader {
    pub fn new(asset_root: impl Into<String>) -> Self {
        let (tx, rx) = channel();
        Self {
            asset_root: asset_root.into(),
            tx,
            rx,
            pending: VecDeque::new(),
        }
    }

    pub fn asset_root(&self) -> &str {
        &self.asset_root
    }

    /// Queues a request issued before device readiness.
    pub fn queue_pending(&mut self, load: PendingLoad) {
        self.pending.push_back(load);
    }

    /// Takes the queued pre-device requests, preserving issue order.
    pub fn drain_pending(&mut self) -> Vec<PendingLoad> {
        self.pending.drain(..).collect()
    }

    /// Collects completions without blocking.
    pub fn poll_events(&self) -> Vec<LoadEvent> {
        self.rx.try_iter().collect()
    }

    /// Starts a texture fetch + decode on a worker thread.
    pub fn start_texture_load(&self, id: i32, path: String, nearest: bool) {
        let tx = self.tx.clone();
        let root = self.asset_root.clone();
        std::thread::spawn(move || {
            let event = match fetch_and_decode_texture(&root, &path) {
                Ok((width, height, pixels)) => LoadEvent::TextureDecoded {
                    id,
                    width,
                    height,
                    pixels,
                    nearest,
                },
                Err(err) => LoadEvent::TextureFailed {
                    id,
                    error: format!("{err:#}"),
                },
            };
            let _ = tx.send(event);
        });
    }

    /// Starts a shader-text fetch on a worker thread.
    pub fn start_shader_load(&self, id: i32, path: String) {
        let tx = self.tx.clone();
        let root = self.asset_root.clone();
        std::thread::spawn(move || {
            let event = match fetch_text(&root, &path) {
                Ok(source) => LoadEvent::ShaderLoaded { id, source },
                Err(err) => LoadEvent::ShaderFailed {
                    id,
                    error: format!("{err:#}"),
                },
            };
            let _ = tx.send(event);
        });
    }

    /// Synchronous text fetch, used for the built-in shader bootstrap at
    /// device-init time.
    pub fn fetch_text_blocking(&self, path: &str) -> Result<String> {
        fetch_text(&self.asset_root, path)
    }
}

fn fetch_text(root: &str, path: &str) -> Result<String> {
    let resolved = resolve_asset_path(path, root)?;
    std::fs::read_to_string(&resolved).with_context(|| format!("failed to read {resolved}"))
}

fn fetch_and_decode_texture(root: &str, path: &str) -> Result<(u32, u32, Vec<u8>)> {
    let resolved = resolve_asset_path(path, root)?;
    let bytes =
        std::fs::read(&resolved).with_context(|| format!("failed to read {resolved}"))?;
    let image = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode {resolved}"))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok((width, height, image.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_queue_drains_in_issue_order() {
        let mut loader = AssetLoader::new("./assets");
        loader.queue_pending(PendingLoad::Texture {
            id: 1,
            path: "a.png".into(),
            nearest: true,
        });
        loader.queue_pending(PendingLoad::Shader {
            id: 4,
            path: "fx.wgsl".into(),
        });
        loader.queue_pending(PendingLoad::Texture {
            id: 2,
            path: "b.png".into(),
            nearest: false,
        });

        let drained = loader.drain_pending();
        assert_eq!(
            drained,
            vec![
                PendingLoad::Texture {
                    id: 1,
                    path: "a.png".into(),
                    nearest: true,
                },
                PendingLoad::Shader {
                    id: 4,
                    path: "fx.wgsl".into(),
                },
                PendingLoad::Texture {
                    id: 2,
                    path: "b.png".into(),
                    nearest: false,
                },
            ]
        );
        assert!(loader.drain_pending().is_empty());
    }

    #[test]
    fn missing_file_reports_failure_event() {
        let loader = AssetLoader::new("./definitely-not-a-dir");
        loader.start_shader_load(9, "nope.wgsl".into());
        // Worker threads are detached; poll until the failure arrives.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let events = loader.poll_events();
            if let Some(LoadEvent::ShaderFailed { id, .. }) = events.first() {
                assert_eq!(*id, 9);
                break;
            }
            assert!(std::time::Instant::now() < deadline, "no completion event");
            std::thread::yield_now();
        }
    }
}
