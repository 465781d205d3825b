use std::collections::HashMap;

use cp_resource::{ResourceError, ResourceManager};
use cp_utils::{
    Identifier, PAINTING_TEXTURES_DIR, TEXTURE_EXTENSION, missing_sprite_id, sprite_atlas_id,
};
use image::{Rgba, RgbaImage, imageops};
use thiserror::Error;
use tracing::{debug, warn};

use crate::sprite::{Sprite, SpriteAtlas};

pub const DEFAULT_MAX_ATLAS_SIZE: u32 = 4096;
const MISSING_TEXTURE_SIZE: u32 = 16;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("could not enumerate atlas sources: {0}")]
    Resources(#[from] ResourceError),
    #[error("sprites need at least a {width}x{height} atlas, the limit is {max}x{max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Prepare-phase half of an atlas: builds the image and the sprite table off the render
/// thread. Uploading is the texture manager's job.
pub trait AtlasStitcher: Send + Sync {
    fn atlas_id(&self) -> &Identifier;

    fn prepare(&self, resources: &dyn ResourceManager) -> Result<PreparedAtlas, StitchError>;
}

/// Stitched atlas waiting for upload.
#[derive(Debug)]
pub struct PreparedAtlas {
    pub atlas: SpriteAtlas,
    pub image: RgbaImage,
}

impl PreparedAtlas {
    /// Shelf-packs `images` plus the placeholder into the smallest power-of-two atlas that
    /// fits within `max_size` on both axes.
    pub fn pack(
        atlas_id: Identifier,
        images: Vec<(Identifier, RgbaImage)>,
        max_size: u32,
    ) -> Result<Self, StitchError> {
        let mut entries: Vec<_> = images
            .into_iter()
            .filter(|(id, _)| {
                let reserved = *id == missing_sprite_id();
                if reserved {
                    warn!("ignoring user sprite {id}, the id is reserved for the placeholder");
                }
                !reserved
            })
            .collect();
        entries.push((missing_sprite_id(), missing_texture()));
        entries.sort_by(|(a_id, a), (b_id, b)| {
            b.height()
                .cmp(&a.height())
                .then(b.width().cmp(&a.width()))
                .then(a_id.cmp(b_id))
        });

        let widest = entries.iter().map(|(_, img)| img.width()).max().unwrap_or(1);
        let tallest = entries.iter().map(|(_, img)| img.height()).max().unwrap_or(1);
        let mut width = widest.max(MISSING_TEXTURE_SIZE).next_power_of_two();
        let mut height = tallest.max(MISSING_TEXTURE_SIZE).next_power_of_two();

        let positions = loop {
            if width > max_size || height > max_size {
                return Err(StitchError::TooLarge {
                    width,
                    height,
                    max: max_size,
                });
            }
            if let Some(positions) = shelf_pack(&entries, width, height) {
                break positions;
            }
            if width <= height {
                width *= 2;
            } else {
                height *= 2;
            }
        };

        let mut image = RgbaImage::new(width, height);
        let mut sprites = HashMap::with_capacity(entries.len());
        let mut missing = None;
        for ((id, source), (x, y)) in entries.into_iter().zip(positions) {
            imageops::replace(&mut image, &source, i64::from(x), i64::from(y));
            let sprite = Sprite::placed(
                id.clone(),
                (x, y),
                (source.width(), source.height()),
                (width, height),
            );
            if id == missing_sprite_id() {
                missing = Some(sprite);
            } else {
                sprites.insert(id, sprite);
            }
        }
        let missing = missing.unwrap_or_else(|| {
            Sprite::placed(
                missing_sprite_id(),
                (0, 0),
                (MISSING_TEXTURE_SIZE, MISSING_TEXTURE_SIZE),
                (width, height),
            )
        });

        debug!(
            "stitched {} sprites into {}x{} atlas {}",
            sprites.len(),
            width,
            height,
            atlas_id
        );
        Ok(Self {
            atlas: SpriteAtlas::new(atlas_id, (width, height), sprites, missing),
            image,
        })
    }
}

/// Rows of sprites, tallest first. Returns one position per entry, or `None` if they do not fit.
fn shelf_pack(
    entries: &[(Identifier, RgbaImage)],
    width: u32,
    height: u32,
) -> Option<Vec<(u32, u32)>> {
    let mut positions = Vec::with_capacity(entries.len());
    let (mut x, mut y, mut shelf_height) = (0u32, 0u32, 0u32);
    for (_, img) in entries {
        let (w, h) = img.dimensions();
        if w > width {
            return None;
        }
        if x + w > width {
            y += shelf_height;
            x = 0;
            shelf_height = 0;
        }
        if y + h > height {
            return None;
        }
        positions.push((x, y));
        x += w;
        shelf_height = shelf_height.max(h);
    }
    Some(positions)
}

/// Magenta and black checkerboard shown for unresolved sprites.
pub fn missing_texture() -> RgbaImage {
    let half = MISSING_TEXTURE_SIZE / 2;
    RgbaImage::from_fn(MISSING_TEXTURE_SIZE, MISSING_TEXTURE_SIZE, |x, y| {
        if (x < half) ^ (y < half) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([248, 0, 248, 255])
        }
    })
}

/// Stitches every `*.png` under `textures/client_paintings/` into one atlas.
/// `<ns>:textures/client_paintings/a/b.png` becomes sprite `<ns>:a/b`.
pub struct SpriteStitcher {
    atlas_id: Identifier,
    source_dir: String,
    max_size: u32,
}

impl SpriteStitcher {
    pub fn new(max_size: u32) -> Self {
        Self {
            atlas_id: sprite_atlas_id(),
            source_dir: PAINTING_TEXTURES_DIR.to_string(),
            max_size,
        }
    }

    fn sprite_id(&self, resource_id: &Identifier) -> Option<Identifier> {
        resource_id
            .strip_path_prefix(&self.source_dir)?
            .strip_extension(TEXTURE_EXTENSION)
    }
}

impl Default for SpriteStitcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATLAS_SIZE)
    }
}

impl AtlasStitcher for SpriteStitcher {
    fn atlas_id(&self) -> &Identifier {
        &self.atlas_id
    }

    fn prepare(&self, resources: &dyn ResourceManager) -> Result<PreparedAtlas, StitchError> {
        let found = resources.find_resources(&self.source_dir, &|id: &Identifier| {
            id.path().ends_with(TEXTURE_EXTENSION)
        })?;

        let mut images = Vec::with_capacity(found.len());
        for (resource_id, resource) in found {
            let Some(sprite_id) = self.sprite_id(&resource_id) else {
                continue;
            };
            let decoded = resource
                .read_bytes()
                .map_err(|e| e.to_string())
                .and_then(|bytes| image::load_from_memory(&bytes).map_err(|e| e.to_string()));
            match decoded {
                Ok(img) => images.push((sprite_id, img.to_rgba8())),
                Err(err) => warn!(
                    "skipping sprite {} from pack {}: {}",
                    resource_id,
                    resource.pack_name(),
                    err
                ),
            }
        }

        PreparedAtlas::pack(self.atlas_id.clone(), images, self.max_size)
    }
}
