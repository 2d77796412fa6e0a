use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, warn};

use super::scene::{SceneObjectId, SceneWorld};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Texture {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, TextureLoadError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4));
        if width == 0 || height == 0 || expected != Some(rgba.len()) {
            return Err(TextureLoadError::InvalidDimensions {
                width,
                height,
                byte_len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Fills a `width x height` texture with one color.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub(crate) fn rgba_mut(&mut self) -> &mut [u8] {
        &mut self.rgba
    }

    /// Nearest-neighbour lookup; `u`/`v` are clamped to `[0, 1]`, `v = 0` is the top row.
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
        let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ]
    }
}

/// Texture state of a scene object.
#[derive(Debug, Clone, Default)]
pub enum TextureSlot {
    /// Untextured; drawn with the object's base color.
    #[default]
    None,
    /// Load requested but not finished; drawn with the placeholder color.
    Pending,
    Ready(Arc<Texture>),
    /// Load failed; stays on the placeholder color for the rest of the session.
    Failed,
}

impl TextureSlot {
    pub fn texture(&self) -> Option<&Texture> {
        match self {
            TextureSlot::Ready(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TextureSlot::Pending)
    }
}

#[derive(Debug, Error)]
pub enum TextureLoadError {
    #[error("image reference `{image_ref}` is not a relative asset path")]
    InvalidImageRef { image_ref: String },
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture data {byte_len} bytes does not match {width}x{height} rgba")]
    InvalidDimensions {
        width: u32,
        height: u32,
        byte_len: usize,
    },
    #[error("no image registered for `{image_ref}`")]
    NotFound { image_ref: String },
}

/// Where panel images come from.
pub trait TextureSource {
    fn load(&mut self, image_ref: &str) -> Result<Texture, TextureLoadError>;
}

/// Loads image references as paths under an asset directory.
#[derive(Debug, Clone)]
pub struct FileTextureSource {
    asset_root: PathBuf,
}

impl FileTextureSource {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn resolve_image_path(&self, image_ref: &str) -> Result<PathBuf, TextureLoadError> {
        let relative = normalize_image_ref(image_ref).ok_or_else(|| {
            TextureLoadError::InvalidImageRef {
                image_ref: image_ref.to_string(),
            }
        })?;
        Ok(relative
            .split('/')
            .fold(self.asset_root.clone(), |path, segment| path.join(segment)))
    }
}

impl TextureSource for FileTextureSource {
    fn load(&mut self, image_ref: &str) -> Result<Texture, TextureLoadError> {
        let path = self.resolve_image_path(image_ref)?;
        let image = ImageReader::open(&path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| TextureLoadError::Open {
                path: path.clone(),
                source,
            })?
            .decode()
            .map_err(|source| TextureLoadError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Texture::from_rgba(width, height, image.into_raw())
    }
}

/// Strips one leading `/` and rejects anything that could leave the asset root.
pub fn normalize_image_ref(image_ref: &str) -> Option<&str> {
    let trimmed = image_ref.trim();
    let relative = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if relative.is_empty() || relative.contains('\\') || relative.contains(':') {
        return None;
    }
    let valid = relative
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    valid.then_some(relative)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub object: SceneObjectId,
    pub image_ref: String,
}

/// Loads requested panel images a few per frame and writes results back into
/// the scene. Results are cached by image reference for the queue's lifetime.
#[derive(Debug, Default)]
pub struct TextureQueue {
    pending: VecDeque<TextureRequest>,
    cache: HashMap<String, TextureSlot>,
    warned_image_refs: HashSet<String>,
}

impl TextureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, requests: impl IntoIterator<Item = TextureRequest>) {
        self.pending.extend(requests);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops outstanding requests; their results will never be applied.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Resolves up to `budget` requests and returns how many were applied.
    pub fn pump(&mut self, source: &mut dyn TextureSource, world: &mut SceneWorld, budget: usize) -> usize {
        let mut applied = 0;
        while applied < budget {
            let Some(request) = self.pending.pop_front() else {
                break;
            };
            let slot = match self.cache.get(&request.image_ref) {
                Some(slot) => slot.clone(),
                None => {
                    let slot = match source.load(&request.image_ref) {
                        Ok(texture) => {
                            debug!(
                                image_ref = %request.image_ref,
                                width = texture.width(),
                                height = texture.height(),
                                "texture_loaded"
                            );
                            TextureSlot::Ready(Arc::new(texture))
                        }
                        Err(error) => {
                            self.warn_load_failure_once(&request.image_ref, &error);
                            TextureSlot::Failed
                        }
                    };
                    self.cache.insert(request.image_ref.clone(), slot.clone());
                    slot
                }
            };
            world.set_texture(request.object, slot);
            applied += 1;
        }
        applied
    }

    fn warn_load_failure_once(&mut self, image_ref: &str, error: &TextureLoadError) {
        if self.warned_image_refs.insert(image_ref.to_string()) {
            warn!(
                image_ref,
                reason = %error,
                "texture_load_failed_using_placeholder"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::app::scene::{build_scene, RoomSpec, SceneLayout};
    use crate::catalog::CatalogItem;

    #[derive(Default)]
    struct CountingSource {
        loads: Vec<String>,
    }

    impl TextureSource for CountingSource {
        fn load(&mut self, image_ref: &str) -> Result<Texture, TextureLoadError> {
            self.loads.push(image_ref.to_string());
            if image_ref.contains("missing") {
                return Err(TextureLoadError::NotFound {
                    image_ref: image_ref.to_string(),
                });
            }
            Ok(Texture::solid(2, 2, [10, 20, 30, 255]))
        }
    }

    fn world_with(images: &[&str]) -> (SceneWorld, Vec<TextureRequest>) {
        let items: Arc<[CatalogItem]> = images
            .iter()
            .enumerate()
            .map(|(index, image)| CatalogItem::new(format!("item {index}"), *image))
            .collect::<Vec<_>>()
            .into();
        let build = build_scene(RoomSpec::default(), items, SceneLayout::default());
        (build.world, build.texture_requests)
    }

    #[test]
    fn from_rgba_rejects_mismatched_buffers() {
        assert!(Texture::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Texture::from_rgba(2, 2, vec![0; 15]),
            Err(TextureLoadError::InvalidDimensions { .. })
        ));
        assert!(Texture::from_rgba(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn sample_clamps_and_picks_nearest_texel() {
        let mut rgba = vec![0; 2 * 2 * 4];
        rgba[12..16].copy_from_slice(&[255, 0, 0, 255]);
        let texture = Texture::from_rgba(2, 2, rgba).expect("texture");
        assert_eq!(texture.sample(0.9, 0.9), [255, 0, 0, 255]);
        assert_eq!(texture.sample(2.0, 5.0), [255, 0, 0, 255]);
        assert_eq!(texture.sample(0.1, 0.1), [0, 0, 0, 0]);
        assert_eq!(texture.sample(f32::NAN, 0.0), [0, 0, 0, 0]);
    }

    #[test]
    fn image_refs_are_normalized() {
        assert_eq!(normalize_image_ref("/clothes/shirt.jpg"), Some("clothes/shirt.jpg"));
        assert_eq!(normalize_image_ref("clothes/shirt.jpg"), Some("clothes/shirt.jpg"));
        assert_eq!(normalize_image_ref("../secret.png"), None);
        assert_eq!(normalize_image_ref("a//b.png"), None);
        assert_eq!(normalize_image_ref("C:\\x.png"), None);
        assert_eq!(normalize_image_ref(""), None);
        assert_eq!(normalize_image_ref("/"), None);
    }

    #[test]
    fn pump_respects_budget_and_applies_results() {
        let (mut world, requests) = world_with(&["a.png", "b.png", "c.png"]);
        let mut queue = TextureQueue::new();
        queue.enqueue(requests);
        let mut source = CountingSource::default();

        assert_eq!(queue.pump(&mut source, &mut world, 2), 2);
        assert_eq!(queue.len(), 1);
        let ready = world
            .panels()
            .filter(|panel| matches!(panel.texture, TextureSlot::Ready(_)))
            .count();
        assert_eq!(ready, 2);

        assert_eq!(queue.pump(&mut source, &mut world, 2), 1);
        assert!(queue.is_empty());
        assert!(world.panels().all(|panel| panel.texture.texture().is_some()));
    }

    #[test]
    fn failed_loads_mark_slot_failed_and_are_cached() {
        let (mut world, requests) = world_with(&["missing.png", "missing.png"]);
        let mut queue = TextureQueue::new();
        queue.enqueue(requests);
        let mut source = CountingSource::default();

        queue.pump(&mut source, &mut world, 8);
        assert_eq!(source.loads, vec!["missing.png".to_string()]);
        assert!(world
            .panels()
            .all(|panel| matches!(panel.texture, TextureSlot::Failed)));
    }

    #[test]
    fn cancel_all_leaves_slots_pending() {
        let (mut world, requests) = world_with(&["a.png"]);
        let mut queue = TextureQueue::new();
        queue.enqueue(requests);
        assert_eq!(queue.cancel_all(), 1);

        let mut source = CountingSource::default();
        assert_eq!(queue.pump(&mut source, &mut world, 4), 0);
        assert!(source.loads.is_empty());
        assert!(world.panels().all(|panel| panel.texture.is_pending()));
    }

    #[test]
    fn file_source_decodes_png_under_asset_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("clothes");
        fs::create_dir_all(&dir).expect("create dir");
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        image.save(dir.join("shirt.png")).expect("save png");

        let mut source = FileTextureSource::new(temp.path());
        let texture = source.load("/clothes/shirt.png").expect("load");
        assert_eq!((texture.width(), texture.height()), (3, 2));
        assert_eq!(texture.sample(0.5, 0.5), [1, 2, 3, 255]);

        assert!(matches!(
            source.load("/clothes/absent.png"),
            Err(TextureLoadError::Open { .. })
        ));
        assert!(matches!(
            source.load("../escape.png"),
            Err(TextureLoadError::InvalidImageRef { .. })
        ));
    }

    #[test]
    fn file_source_reports_undecodable_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("broken.png"), b"not an image").expect("write");

        let mut source = FileTextureSource::new(temp.path());
        let error = source.load("broken.png").expect_err("decode should fail");
        assert!(matches!(error, TextureLoadError::Decode { .. }));
    }
}
