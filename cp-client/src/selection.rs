use std::sync::Arc;

use cp_utils::{DefaultPaintings, PaintingSize};

use crate::painting::PaintingDescriptor;
use crate::state::LiveState;

/// Slot for an entity hash among `matching` user paintings and `defaults` built-in ones.
/// Built-in variants keep their share of slots; landing on one yields `None`.
pub fn select_index(hash: i32, matching: usize, defaults: usize) -> Option<usize> {
    if matching == 0 {
        return None;
    }
    let slots = matching + defaults;
    // |i32::MIN| does not fit in an i32.
    let hash = hash.checked_abs().unwrap_or(0) as usize;
    let index = hash % slots;
    (index < matching).then_some(index)
}

/// Picks the user painting drawn for an entity of the given block size, or `None` to keep
/// the built-in variant.
pub fn pick(
    state: &LiveState,
    defaults: &DefaultPaintings,
    hash: i32,
    width: u32,
    height: u32,
) -> Option<Arc<PaintingDescriptor>> {
    if state.is_empty() {
        return None;
    }
    let size = PaintingSize::new(width, height)?;
    let matching = state.matching(size);
    let index = select_index(hash, matching.len(), defaults.variants_for(size).len())?;
    matching.get(index).cloned()
}
