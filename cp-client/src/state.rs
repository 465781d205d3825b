use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cp_render::{Sprite, SpriteAtlas};
use cp_utils::{Identifier, PaintingSize};

use crate::painting::PaintingDescriptor;

/// One published generation of user paintings together with the atlas they were
/// validated against. Never mutated after construction; reloads publish a new one.
#[derive(Debug, Default)]
pub struct LiveState {
    by_id: BTreeMap<Identifier, Arc<PaintingDescriptor>>,
    by_size: HashMap<PaintingSize, Vec<Arc<PaintingDescriptor>>>,
    atlas: Option<Arc<SpriteAtlas>>,
}

impl LiveState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I>(paintings: I, atlas: Option<Arc<SpriteAtlas>>) -> Self
    where
        I: IntoIterator<Item = PaintingDescriptor>,
    {
        let by_id: BTreeMap<_, _> = paintings
            .into_iter()
            .map(|painting| (painting.id().clone(), Arc::new(painting)))
            .collect();

        // Identifier order keeps candidate lists identical on every client.
        let mut by_size: HashMap<PaintingSize, Vec<Arc<PaintingDescriptor>>> = HashMap::new();
        for painting in by_id.values() {
            by_size
                .entry(painting.size())
                .or_default()
                .push(Arc::clone(painting));
        }

        Self {
            by_id,
            by_size,
            atlas,
        }
    }

    pub fn get(&self, id: &Identifier) -> Option<&Arc<PaintingDescriptor>> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PaintingDescriptor>> {
        self.by_id.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Identifier> {
        self.by_id.keys()
    }

    /// User paintings of exactly `size`, in identifier order.
    pub fn matching(&self, size: PaintingSize) -> &[Arc<PaintingDescriptor>] {
        self.by_size.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn atlas(&self) -> Option<&Arc<SpriteAtlas>> {
        self.atlas.as_ref()
    }

    pub fn sprite(&self, painting: &PaintingDescriptor) -> Option<&Sprite> {
        self.atlas.as_deref().map(|atlas| painting.sprite(atlas))
    }

    pub fn back_sprite(&self, painting: &PaintingDescriptor) -> Option<&Sprite> {
        self.atlas
            .as_deref()
            .and_then(|atlas| painting.back_sprite(atlas))
    }
}
