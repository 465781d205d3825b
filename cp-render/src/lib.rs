mod sprite;
mod stitcher;
mod upload;

pub use sprite::{Sprite, SpriteAtlas};
pub use stitcher::{
    AtlasStitcher, DEFAULT_MAX_ATLAS_SIZE, PreparedAtlas, SpriteStitcher, StitchError,
    missing_texture,
};
pub use upload::{
    AtlasUploadQueue, BevyTextureManager, HeadlessTextureManager, PaintingAtlasPlugin,
    PaintingAtlasTextures, TextureManager, UploadError, atlas_texture_channel, atlas_upload_tick,
};
