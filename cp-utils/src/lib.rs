use std::path::{Path, PathBuf};

use tracing::debug;

pub mod identifier;
pub mod registry;
pub mod size;
pub mod timing;
pub mod uuid;

pub use identifier::{Identifier, IdentifierError};
pub use registry::{DefaultPaintings, PaintingVariant, vanilla_painting_variants};
pub use size::PaintingSize;
pub use timing::Timing;
pub use uuid::{EntityUuid, UuidParseError};

pub const MOD_NAMESPACE: &str = "clientpaintings";
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Texels along one edge of a painting block.
pub const BLOCK_TEXELS: u32 = 16;

/// Directory (inside every namespace) holding painting definition documents.
pub const DEFINITIONS_DIR: &str = "client_paintings";
pub const DEFINITION_EXTENSION: &str = ".json";

/// Directory (inside every namespace) holding painting images stitched into the atlas.
pub const PAINTING_TEXTURES_DIR: &str = "textures/client_paintings";
pub const TEXTURE_EXTENSION: &str = ".png";

pub const CLIENT_PAINTINGS_ASSETS_ROOT_ENV: &str = "CLIENT_PAINTINGS_ASSETS_ROOT";
pub const CONFIG_FILE_NAME: &str = "client_paintings.toml";

pub fn sprite_atlas_id() -> Identifier {
    Identifier::new_unchecked(MOD_NAMESPACE, "textures/atlas/client_paintings.png")
}

/// Shared back sprite used by paintings that do not declare their own.
pub fn painting_back_id() -> Identifier {
    Identifier::new_unchecked(DEFAULT_NAMESPACE, "painting/back")
}

pub fn missing_sprite_id() -> Identifier {
    Identifier::new_unchecked(DEFAULT_NAMESPACE, "missingno")
}

pub fn reload_listener_id() -> Identifier {
    Identifier::new_unchecked(MOD_NAMESPACE, DEFINITIONS_DIR)
}

pub fn client_paintings_assets_root() -> PathBuf {
    if let Ok(explicit) = std::env::var(CLIENT_PAINTINGS_ASSETS_ROOT_ENV) {
        let path = PathBuf::from(explicit);
        if path.exists() {
            debug!("using assets root from {CLIENT_PAINTINGS_ASSETS_ROOT_ENV}: {:?}", path);
            return path;
        }
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(exe_dir) = exe.parent()
    {
        let sibling_assets = exe_dir.join("assets");
        if sibling_assets.exists() {
            return sibling_assets;
        }
    }

    PathBuf::from("assets")
}

pub fn default_config_path(assets_root: &Path) -> PathBuf {
    assets_root.join(CONFIG_FILE_NAME)
}
