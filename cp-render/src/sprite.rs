use std::collections::HashMap;

use cp_utils::Identifier;

/// One source image placed inside an atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub id: Identifier,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl Sprite {
    pub(crate) fn placed(
        id: Identifier,
        (x, y): (u32, u32),
        (width, height): (u32, u32),
        (atlas_width, atlas_height): (u32, u32),
    ) -> Self {
        let aw = atlas_width as f32;
        let ah = atlas_height as f32;
        Self {
            id,
            x,
            y,
            width,
            height,
            u0: x as f32 / aw,
            v0: y as f32 / ah,
            u1: (x + width) as f32 / aw,
            v1: (y + height) as f32 / ah,
        }
    }

    /// Corner UVs in quad order: bottom-left, bottom-right, top-right, top-left.
    pub fn quad_uvs(&self) -> [[f32; 2]; 4] {
        [
            [self.u0, self.v1],
            [self.u1, self.v1],
            [self.u1, self.v0],
            [self.u0, self.v0],
        ]
    }

    /// Maps a UV inside the source image onto the atlas.
    pub fn interpolate(&self, u: f32, v: f32) -> [f32; 2] {
        [
            self.u0 + (self.u1 - self.u0) * u,
            self.v0 + (self.v1 - self.v0) * v,
        ]
    }
}

/// Sprite table of a stitched atlas. Unknown ids fall back to the placeholder sprite.
#[derive(Debug, Clone)]
pub struct SpriteAtlas {
    id: Identifier,
    width: u32,
    height: u32,
    sprites: HashMap<Identifier, Sprite>,
    missing: Sprite,
}

impl SpriteAtlas {
    pub(crate) fn new(
        id: Identifier,
        (width, height): (u32, u32),
        sprites: HashMap<Identifier, Sprite>,
        missing: Sprite,
    ) -> Self {
        Self {
            id,
            width,
            height,
            sprites,
            missing,
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sprite(&self, id: &Identifier) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    pub fn sprite_or_missing(&self, id: &Identifier) -> &Sprite {
        self.sprites.get(id).unwrap_or(&self.missing)
    }

    pub fn missing(&self) -> &Sprite {
        &self.missing
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.sprites.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn sprite_ids(&self) -> impl Iterator<Item = &Identifier> {
        self.sprites.keys()
    }
}
