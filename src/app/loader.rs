//! Asynchronous asset loading.
//!
//! Natively, files are read and decoded on a background thread. On the web,
//! they are fetched by futures running on the browser's event loop. Either
//! way, completions are collected by [`AssetLoader::poll`] on the render
//! thread and turned into [`PendingChange`]s: nothing touches the scene
//! while a frame is being drawn.

use crate::app::pending::{PendingChange, PendingQueue};
use crate::error::{Error, Result};
use crate::resource::{decode_image, TextureColorSpace};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use web_time::{Duration, Instant};

#[cfg(not(target_arch = "wasm32"))]
use std::sync::mpsc;
#[cfg(target_arch = "wasm32")]
use std::{cell::RefCell, rc::Rc};

/// Turns the bytes of a loaded asset into a scene change.
pub type BytesHandler = Box<dyn FnOnce(Vec<u8>) -> Result<Option<PendingChange>>>;

enum Request {
    Image {
        path: PathBuf,
        name: String,
        color_space: TextureColorSpace,
    },
    Bytes {
        id: u64,
        path: PathBuf,
    },
}

enum Loaded {
    Image {
        path: PathBuf,
        name: String,
        color_space: TextureColorSpace,
        image: Result<RgbaImage>,
        elapsed: Duration,
    },
    Bytes {
        id: u64,
        path: PathBuf,
        bytes: Result<Vec<u8>>,
        elapsed: Duration,
    },
}

impl Request {
    #[cfg(not(target_arch = "wasm32"))]
    fn run(self) -> Loaded {
        let start = Instant::now();
        match self {
            Request::Image {
                path,
                name,
                color_space,
            } => {
                let image = read_file(&path).and_then(|bytes| decode_image(&bytes, &path));
                Loaded::Image {
                    path,
                    name,
                    color_space,
                    image,
                    elapsed: start.elapsed(),
                }
            }
            Request::Bytes { id, path } => Loaded::Bytes {
                id,
                bytes: read_file(&path),
                path,
                elapsed: start.elapsed(),
            },
        }
    }

    #[cfg(target_arch = "wasm32")]
    async fn run(self) -> Loaded {
        let start = Instant::now();
        match self {
            Request::Image {
                path,
                name,
                color_space,
            } => {
                let image = fetch_bytes(&path)
                    .await
                    .and_then(|bytes| decode_image(&bytes, &path));
                Loaded::Image {
                    path,
                    name,
                    color_space,
                    image,
                    elapsed: start.elapsed(),
                }
            }
            Request::Bytes { id, path } => Loaded::Bytes {
                id,
                bytes: fetch_bytes(&path).await,
                path,
                elapsed: start.elapsed(),
            },
        }
    }
}

/// Loads textures and raw assets without blocking the render loop.
///
/// Failed loads are logged once at `warn` and dropped: the textures keep
/// their placeholder and byte handlers never run.
pub struct AssetLoader {
    root: PathBuf,
    queue: PendingQueue,
    handlers: HashMap<u64, BytesHandler>,
    next_id: u64,
    in_flight: usize,
    #[cfg(not(target_arch = "wasm32"))]
    worker: Option<Worker>,
    #[cfg(target_arch = "wasm32")]
    completed: Rc<RefCell<Vec<Loaded>>>,
}

#[cfg(not(target_arch = "wasm32"))]
struct Worker {
    requests: mpsc::Sender<Request>,
    results: mpsc::Receiver<Loaded>,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Worker {
    fn spawn() -> Option<Worker> {
        let (requests, request_rx) = mpsc::channel::<Request>();
        let (result_tx, results) = mpsc::channel::<Loaded>();

        let thread = std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    if result_tx.send(request.run()).is_err() {
                        break;
                    }
                }
            });

        match thread {
            Ok(thread) => Some(Worker {
                requests,
                results,
                thread: Some(thread),
            }),
            Err(e) => {
                log::warn!("cannot spawn the asset loader thread ({e}), loading inline");
                None
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the channel ends the thread once its current job is done.
        let (closed, _) = mpsc::channel();
        self.requests = closed;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl AssetLoader {
    /// A loader resolving paths against `root` (a directory natively, a base
    /// URL on the web) and pushing completions onto `queue`.
    pub fn new(root: impl Into<PathBuf>, queue: PendingQueue) -> AssetLoader {
        AssetLoader {
            root: root.into(),
            queue,
            handlers: HashMap::new(),
            next_id: 0,
            in_flight: 0,
            #[cfg(not(target_arch = "wasm32"))]
            worker: Worker::spawn(),
            #[cfg(target_arch = "wasm32")]
            completed: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The queue completions are pushed onto.
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads and decodes the image at `path`, then registers it as texture
    /// `name`.
    pub fn load_texture(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        color_space: TextureColorSpace,
    ) {
        let path = self.root.join(path);
        log::debug!("loading texture `{name}` from {}", path.display());
        self.submit(Request::Image {
            path,
            name: name.to_string(),
            color_space,
        });
    }

    /// Loads the bytes at `path` and hands them to `handler` on the render
    /// thread. A change returned by the handler is queued; an error is
    /// logged.
    pub fn load_bytes<F>(&mut self, path: impl AsRef<Path>, handler: F)
    where
        F: FnOnce(Vec<u8>) -> Result<Option<PendingChange>> + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        let _ = self.handlers.insert(id, Box::new(handler));

        let path = self.root.join(path);
        log::debug!("loading {}", path.display());
        self.submit(Request::Bytes { id, path });
    }

    /// Number of loads submitted and not yet collected by [`AssetLoader::poll`].
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    fn submit(&mut self, request: Request) {
        self.in_flight += 1;

        #[cfg(not(target_arch = "wasm32"))]
        {
            let request = match &self.worker {
                Some(worker) => match worker.requests.send(request) {
                    Ok(()) => return,
                    Err(mpsc::SendError(request)) => request,
                },
                None => request,
            };
            // No worker thread: load synchronously.
            let loaded = request.run();
            self.finish(loaded);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let completed = self.completed.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let loaded = request.run().await;
                completed.borrow_mut().push(loaded);
            });
        }
    }

    /// Collects finished loads and queues the resulting changes. Returns the
    /// number of loads collected.
    pub fn poll(&mut self) -> usize {
        #[cfg(not(target_arch = "wasm32"))]
        let loaded: Vec<Loaded> = match &self.worker {
            Some(worker) => worker.results.try_iter().collect(),
            None => Vec::new(),
        };
        #[cfg(target_arch = "wasm32")]
        let loaded: Vec<Loaded> = self.completed.borrow_mut().drain(..).collect();

        let count = loaded.len();
        for loaded in loaded {
            self.finish(loaded);
        }
        count
    }

    fn finish(&mut self, loaded: Loaded) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match loaded {
            Loaded::Image {
                path,
                name,
                color_space,
                image,
                elapsed,
            } => match image {
                Ok(image) => {
                    log::info!(
                        "loaded texture `{name}` ({}x{}) from {} in {elapsed:.2?}",
                        image.width(),
                        image.height(),
                        path.display()
                    );
                    self.queue.push(PendingChange::Texture {
                        name,
                        image,
                        color_space,
                    });
                }
                Err(e) => log::warn!("{e}; texture `{name}` keeps its placeholder"),
            },
            Loaded::Bytes {
                id,
                path,
                bytes,
                elapsed,
            } => {
                let Some(handler) = self.handlers.remove(&id) else {
                    return;
                };
                let change = bytes.and_then(|bytes| {
                    log::info!(
                        "loaded {} ({} bytes) in {elapsed:.2?}",
                        path.display(),
                        bytes.len()
                    );
                    handler(bytes)
                });
                match change {
                    Ok(Some(change)) => self.queue.push(change),
                    Ok(None) => {}
                    Err(e) => log::warn!("{e}; skipping {}", path.display()),
                }
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(path: &Path) -> Result<Vec<u8>> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let url = path.to_string_lossy();
    let js_err = |e: wasm_bindgen::JsValue| Error::Fetch(format!("{url}: {e:?}"));

    let win = web_sys::window().ok_or_else(|| Error::Fetch("no window".to_string()))?;
    let resp_val = JsFuture::from(win.fetch_with_str(&url)).await.map_err(js_err)?;
    let resp: web_sys::Response = resp_val.dyn_into().map_err(js_err)?;

    if !resp.ok() {
        return Err(Error::Fetch(format!(
            "{url}: HTTP {} {}",
            resp.status(),
            resp.status_text()
        )));
    }

    let buf_promise = resp.array_buffer().map_err(js_err)?;
    let buf_val = JsFuture::from(buf_promise).await.map_err(js_err)?;
    let bytes = js_sys::Uint8Array::new(&buf_val);
    let mut out = vec![0u8; bytes.length() as usize];
    bytes.copy_to(&mut out);
    Ok(out)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::scene::SceneNode3d;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("globe3d-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn wait_for(loader: &mut AssetLoader) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !loader.is_idle() && Instant::now() < deadline {
            let _ = loader.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(loader.is_idle(), "loads did not complete");
    }

    #[test]
    fn decoded_textures_are_queued() {
        let dir = scratch_dir("texture");
        RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(dir.join("red.png"))
            .unwrap();

        let queue = PendingQueue::new();
        let mut loader = AssetLoader::new(&dir, queue.clone());
        loader.load_texture("red.png", "red", TextureColorSpace::Linear);
        assert_eq!(loader.in_flight(), 1);
        wait_for(&mut loader);

        assert_eq!(queue.len(), 1);
        let change = queue.pop().unwrap();
        match change {
            PendingChange::Texture { name, image, .. } => {
                assert_eq!(name, "red");
                assert_eq!(image.dimensions(), (4, 2));
            }
            PendingChange::Insert { .. } => panic!("expected a texture"),
        }
    }

    #[test]
    fn missing_assets_are_skipped() {
        let queue = PendingQueue::new();
        let mut loader = AssetLoader::new(scratch_dir("missing"), queue.clone());
        loader.load_texture("nope.jpg", "nope", TextureColorSpace::Linear);
        loader.load_bytes("nope.ttf", |_| panic!("handler must not run"));
        wait_for(&mut loader);

        assert!(queue.is_empty());
    }

    #[test]
    fn byte_handlers_run_on_the_polling_thread() {
        let dir = scratch_dir("bytes");
        std::fs::write(dir.join("data.bin"), [1u8, 2, 3]).unwrap();

        let root = SceneNode3d::empty();
        let parent = root.clone();
        let queue = PendingQueue::new();
        let mut loader = AssetLoader::new(&dir, queue.clone());
        loader.load_bytes("data.bin", move |bytes| {
            assert_eq!(bytes, vec![1, 2, 3]);
            Ok(Some(PendingChange::Insert {
                parent,
                child: SceneNode3d::empty(),
            }))
        });
        wait_for(&mut loader);

        assert_eq!(queue.apply_all(), 1);
        assert_eq!(root.data().children().len(), 1);
    }

    #[test]
    fn handler_errors_drop_the_change() {
        let dir = scratch_dir("handler-error");
        std::fs::write(dir.join("font.ttf"), b"not a font").unwrap();

        let queue = PendingQueue::new();
        let mut loader = AssetLoader::new(&dir, queue.clone());
        loader.load_bytes("font.ttf", |_| Err(Error::EmptyText));
        wait_for(&mut loader);

        assert!(queue.is_empty());
    }
}
