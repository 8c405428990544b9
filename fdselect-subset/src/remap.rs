//! remap: old font DICT index -> new font DICT index
//!
//! Only the old side is given, the new side is assigned incrementally in the
//! order indices are added. Modelled on Harfbuzz hb_inc_bimap_t: <https://github.com/harfbuzz/harfbuzz/blob/b5a65e0f20c30a7f13b2f6619479a6d666e603e0/src/hb-bimap.hh#L97>

use core::slice::Iter;
use std::collections::TryReserveError;

use fnv::FnvHashMap;

/// Renumbering of the font DICTs that survive a subset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FdRemap {
    forw_map: FnvHashMap<u16, u16>,
    back_map: Vec<u16>,
}

impl FdRemap {
    /// Create an empty map with room for `capacity` entries, failing instead
    /// of aborting when the memory is not available.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut this = Self::default();
        this.forw_map.try_reserve(capacity)?;
        this.back_map.try_reserve_exact(capacity)?;
        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.back_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.back_map.is_empty()
    }

    /// Add a mapping for `old` if it is unknown, assigning the next free new
    /// index. Returns the new index.
    pub fn add(&mut self, old: u16) -> u16 {
        match self.forw_map.get(&old) {
            Some(&new) => new,
            None => {
                // at most u16::MAX + 1 distinct keys exist
                let new = self.back_map.len() as u16;
                self.forw_map.insert(old, new);
                self.back_map.push(old);
                new
            }
        }
    }

    pub fn get(&self, old: u16) -> Option<u16> {
        self.forw_map.get(&old).copied()
    }

    pub fn get_backward(&self, new: u16) -> Option<u16> {
        self.back_map.get(new as usize).copied()
    }

    /// The retained old indices, ordered by their new index.
    pub fn keys(&self) -> Iter<'_, u16> {
        self.back_map.iter()
    }
}

#[cfg(test)]
mod test {
    use super::FdRemap;

    #[test]
    fn test_remap() {
        let mut remap = FdRemap::default();

        assert_eq!(remap.add(13), 0);
        assert_eq!(remap.add(8), 1);
        assert_eq!(remap.add(10), 2);
        assert_eq!(remap.add(8), 1);
        assert_eq!(remap.add(7), 3);
        assert_eq!(remap.len(), 4);
        assert_eq!(remap.get(7), Some(3));
        assert_eq!(remap.get(9), None);
        assert_eq!(remap.get_backward(0), Some(13));
        assert_eq!(remap.get_backward(4), None);
        assert_eq!(remap.keys().copied().collect::<Vec<_>>(), [13, 8, 10, 7]);
    }

    #[test]
    fn reserve() {
        let remap = FdRemap::try_with_capacity(300).unwrap();
        assert!(remap.is_empty());
        assert!(FdRemap::try_with_capacity(usize::MAX).is_err());
    }
}
