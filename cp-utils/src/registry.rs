// Built-in painting variants, as shipped by the 1.19 client registry.
//
// The selection oracle only needs the variant counts per size, but keeping the ids makes the
// table auditable against the game's own registry dump.

use std::collections::HashMap;

use crate::{DEFAULT_NAMESPACE, Identifier, PaintingSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintingVariant {
    pub id: Identifier,
    pub size: PaintingSize,
}

impl PaintingVariant {
    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }
}

const VANILLA_VARIANTS: &[(&str, u32, u32)] = &[
    ("kebab", 1, 1),
    ("aztec", 1, 1),
    ("alban", 1, 1),
    ("aztec2", 1, 1),
    ("bomb", 1, 1),
    ("plant", 1, 1),
    ("wasteland", 1, 1),
    ("pool", 2, 1),
    ("courbet", 2, 1),
    ("sea", 2, 1),
    ("sunset", 2, 1),
    ("creebet", 2, 1),
    ("wanderer", 1, 2),
    ("graham", 1, 2),
    ("match", 2, 2),
    ("bust", 2, 2),
    ("stage", 2, 2),
    ("void", 2, 2),
    ("skull_and_roses", 2, 2),
    ("wither", 2, 2),
    ("fighters", 4, 2),
    ("pointer", 4, 4),
    ("pigscene", 4, 4),
    ("burning_skull", 4, 4),
    ("skeleton", 4, 3),
    ("earth", 2, 2),
    ("wind", 2, 2),
    ("water", 2, 2),
    ("fire", 2, 2),
    ("donkey_kong", 4, 3),
];

/// Registry order of the built-in variants.
pub fn vanilla_painting_variants() -> Vec<PaintingVariant> {
    VANILLA_VARIANTS
        .iter()
        .filter_map(|&(name, width, height)| {
            Some(PaintingVariant {
                id: Identifier::new_unchecked(DEFAULT_NAMESPACE, name),
                size: PaintingSize::new(width, height)?,
            })
        })
        .collect()
}

/// Built-in variants grouped by size. Built once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct DefaultPaintings {
    by_size: HashMap<PaintingSize, Vec<PaintingVariant>>,
}

impl DefaultPaintings {
    pub fn from_variants<I>(variants: I) -> Self
    where
        I: IntoIterator<Item = PaintingVariant>,
    {
        let mut by_size: HashMap<PaintingSize, Vec<PaintingVariant>> = HashMap::new();
        for variant in variants {
            by_size.entry(variant.size).or_default().push(variant);
        }
        Self { by_size }
    }

    pub fn vanilla() -> Self {
        Self::from_variants(vanilla_painting_variants())
    }

    /// Sizes no built-in variant uses yield an empty slice.
    pub fn variants_for(&self, size: PaintingSize) -> &[PaintingVariant] {
        self.by_size.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_size.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_size.is_empty()
    }
}
