use cp_render::{Sprite, SpriteAtlas};
use cp_utils::{Identifier, PaintingSize, painting_back_id};
use serde::{Deserialize, Serialize};

use crate::loader::DefinitionError;

/// On-disk form of a painting definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintingDefinition {
    pub texture: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<Identifier>,
    pub size: [i64; 2],
}

impl PaintingDefinition {
    pub fn into_descriptor(self, id: Identifier) -> Result<PaintingDescriptor, DefinitionError> {
        let [width, height] = self.size;
        let size = u32::try_from(width)
            .ok()
            .zip(u32::try_from(height).ok())
            .and_then(|(w, h)| PaintingSize::new(w, h))
            .ok_or(DefinitionError::InvalidSize { width, height })?;
        Ok(PaintingDescriptor {
            id,
            texture: self.texture,
            back: self.back,
            size,
        })
    }
}

/// One user painting. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaintingDescriptor {
    id: Identifier,
    texture: Identifier,
    back: Option<Identifier>,
    size: PaintingSize,
}

impl PaintingDescriptor {
    pub fn new(
        id: Identifier,
        texture: Identifier,
        back: Option<Identifier>,
        size: PaintingSize,
    ) -> Self {
        Self {
            id,
            texture,
            back,
            size,
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn texture(&self) -> &Identifier {
        &self.texture
    }

    /// The declared back texture, or the shared `minecraft:painting/back` sprite.
    pub fn back_texture(&self) -> Identifier {
        self.back.clone().unwrap_or_else(painting_back_id)
    }

    pub fn declared_back(&self) -> Option<&Identifier> {
        self.back.as_ref()
    }

    pub fn size(&self) -> PaintingSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixels_x(&self) -> u32 {
        self.size.pixels_x()
    }

    pub fn pixels_y(&self) -> u32 {
        self.size.pixels_y()
    }

    /// Front sprite, or the atlas placeholder when the image is missing.
    pub fn sprite<'a>(&self, atlas: &'a SpriteAtlas) -> &'a Sprite {
        atlas.sprite_or_missing(&self.texture)
    }

    /// `None` means the host should draw its own default back.
    pub fn back_sprite<'a>(&self, atlas: &'a SpriteAtlas) -> Option<&'a Sprite> {
        atlas.sprite(&self.back_texture())
    }

    pub fn to_definition(&self) -> PaintingDefinition {
        PaintingDefinition {
            texture: self.texture.clone(),
            back: self.back.clone(),
            size: [i64::from(self.size.width), i64::from(self.size.height)],
        }
    }
}
