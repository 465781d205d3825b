use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use cp_utils::Identifier;
use crossbeam::channel::{Receiver, Sender, unbounded};
use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("texture upload channel for {0} is closed")]
    Disconnected(Identifier),
    #[error("texture store for {0} is poisoned")]
    Poisoned(Identifier),
}

/// Apply-phase half of an atlas: hands the stitched image to the GPU side.
pub trait TextureManager: Send + Sync {
    fn upload(&self, atlas_id: &Identifier, image: RgbaImage) -> Result<(), UploadError>;
}

/// Keeps the latest image per atlas in memory. Used without a renderer.
#[derive(Default)]
pub struct HeadlessTextureManager {
    uploads: Mutex<HashMap<Identifier, Arc<RgbaImage>>>,
}

impl HeadlessTextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, atlas_id: &Identifier) -> Option<Arc<RgbaImage>> {
        self.uploads.lock().ok()?.get(atlas_id).cloned()
    }
}

impl TextureManager for HeadlessTextureManager {
    fn upload(&self, atlas_id: &Identifier, image: RgbaImage) -> Result<(), UploadError> {
        let mut uploads = self
            .uploads
            .lock()
            .map_err(|_| UploadError::Poisoned(atlas_id.clone()))?;
        uploads.insert(atlas_id.clone(), Arc::new(image));
        Ok(())
    }
}

struct AtlasUpload {
    atlas_id: Identifier,
    image: RgbaImage,
}

/// Sends atlases to a Bevy app, where `atlas_upload_tick` turns them into `Image` assets.
#[derive(Clone)]
pub struct BevyTextureManager {
    upload_tx: Sender<AtlasUpload>,
}

impl TextureManager for BevyTextureManager {
    fn upload(&self, atlas_id: &Identifier, image: RgbaImage) -> Result<(), UploadError> {
        self.upload_tx
            .send(AtlasUpload {
                atlas_id: atlas_id.clone(),
                image,
            })
            .map_err(|_| UploadError::Disconnected(atlas_id.clone()))
    }
}

#[derive(Resource)]
pub struct AtlasUploadQueue {
    upload_rx: Receiver<AtlasUpload>,
}

pub fn atlas_texture_channel() -> (BevyTextureManager, AtlasUploadQueue) {
    let (upload_tx, upload_rx) = unbounded::<AtlasUpload>();
    (
        BevyTextureManager { upload_tx },
        AtlasUploadQueue { upload_rx },
    )
}

/// Image handle per atlas id. Handles are reused across reloads.
#[derive(Resource, Default)]
pub struct PaintingAtlasTextures {
    handles: HashMap<Identifier, Handle<Image>>,
}

impl PaintingAtlasTextures {
    pub fn get(&self, atlas_id: &Identifier) -> Option<&Handle<Image>> {
        self.handles.get(atlas_id)
    }
}

pub struct PaintingAtlasPlugin {
    queue: Mutex<Option<AtlasUploadQueue>>,
}

impl PaintingAtlasPlugin {
    pub fn new(queue: AtlasUploadQueue) -> Self {
        Self {
            queue: Mutex::new(Some(queue)),
        }
    }
}

impl Plugin for PaintingAtlasPlugin {
    fn build(&self, app: &mut App) {
        let Some(queue) = self.queue.lock().ok().and_then(|mut queue| queue.take()) else {
            error!("PaintingAtlasPlugin built twice, atlas uploads stay on the first app");
            return;
        };
        app.insert_resource(queue)
            .init_resource::<PaintingAtlasTextures>()
            .add_systems(Update, atlas_upload_tick);
    }
}

pub fn atlas_upload_tick(
    queue: Res<AtlasUploadQueue>,
    mut textures: ResMut<PaintingAtlasTextures>,
    mut images: ResMut<Assets<Image>>,
) {
    while let Ok(upload) = queue.upload_rx.try_recv() {
        let image = to_bevy_image(upload.image);
        if let Some(existing) = textures
            .handles
            .get(&upload.atlas_id)
            .and_then(|handle| images.get_mut(handle))
        {
            *existing = image;
            debug!("replaced atlas texture {}", upload.atlas_id);
            continue;
        }
        let handle = images.add(image);
        debug!("uploaded atlas texture {}", upload.atlas_id);
        textures.handles.insert(upload.atlas_id, handle);
    }
}

fn to_bevy_image(rgba: RgbaImage) -> Image {
    let (width, height) = rgba.dimensions();
    let mut image = Image::new_fill(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    );
    image.data = Some(rgba.into_raw());

    // Nearest filtering, clamped so neighbouring sprites never bleed in.
    let mut sampler = ImageSamplerDescriptor::nearest();
    sampler.address_mode_u = ImageAddressMode::ClampToEdge;
    sampler.address_mode_v = ImageAddressMode::ClampToEdge;
    sampler.address_mode_w = ImageAddressMode::ClampToEdge;
    image.sampler = ImageSampler::Descriptor(sampler);
    image
}
