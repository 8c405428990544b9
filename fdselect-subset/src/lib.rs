//! Subsetting of the CFF/CFF2 FDSelect table.
//!
//! Given the glyphs retained by a subset, [`plan_subset_fdselect`] works out
//! which font DICTs are still referenced, how to renumber them, and which
//! FDSelect format is smallest; [`serialize_fdselect`] then writes it.
//! [`subset_fdselect`] strings the two together for a [`Plan`].
mod cff;
mod fdselect;
mod parsing_util;
mod remap;
pub mod serialize;

pub use cff::CffFdSelect;
pub use fdselect::{
    format0_size, format3_size, format4_size, plan_subset_fdselect, serialize_fdselect, FdRange,
    FdSelectFormat, FdSelectPlan, FdSelectSource, PlannedFdSelect, FDSELECT_HEADER_SIZE,
};
pub use parsing_util::populate_gids;
pub use remap::FdRemap;

use serialize::{SerializeErrorFlags, Serializer};
use skrifa::raw::{
    collections::IntSet, tables::postscript, types::GlyphId, FontRef, ReadError, TableProvider,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("Invalid input gid {0}")]
    InvalidGid(String),

    #[error("Invalid gid range {start}-{end}")]
    InvalidGidRange { start: u32, end: u32 },

    #[error("Error reading font: {0}")]
    Read(ReadError),

    #[error("Error reading CFF data: {0}")]
    Cff(postscript::Error),

    #[error("The font has no CFF or CFF2 table")]
    NoCffTable,

    #[error("Failed to allocate a font DICT map for {requested} entries")]
    AllocationFailed { requested: usize },

    #[error("Serializing FDSelect failed: {0}")]
    SerializeFailed(SerializeErrorFlags),
}

/// The glyphs retained by a subset, in new glyph order.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    /// old gid for each new gid, indexed by new gid
    pub new_to_old_gid_list: Vec<GlyphId>,
}

impl Plan {
    /// Retain `input_gids` of a font with `font_num_glyphs` glyphs.
    ///
    /// `.notdef` is always retained and glyphs the font doesn't have are
    /// dropped. New glyph ids follow the order of the old ones.
    pub fn new(input_gids: &IntSet<GlyphId>, font_num_glyphs: usize) -> Self {
        let mut glyphset = IntSet::empty();
        if font_num_glyphs > 0 {
            glyphset.insert(GlyphId::NOTDEF);
        }
        glyphset.extend(
            input_gids
                .iter()
                .take_while(|gid| (gid.to_u32() as usize) < font_num_glyphs),
        );
        Plan {
            new_to_old_gid_list: glyphset.iter().collect(),
        }
    }

    /// Build a plan for `font`, using the glyph count from its `maxp` table.
    pub fn from_font(
        input_gids: &IntSet<GlyphId>,
        font: &FontRef,
    ) -> Result<Self, SubsetError> {
        let maxp = font.maxp().map_err(SubsetError::Read)?;
        Ok(Self::new(input_gids, maxp.num_glyphs() as usize))
    }

    pub fn num_output_glyphs(&self) -> usize {
        self.new_to_old_gid_list.len()
    }
}

/// Result of subsetting FDSelect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FdSelectSubset {
    /// The subset retains no glyphs.
    Empty,
    /// All font DICTs are still referenced; FDSelect and FDArray don't need
    /// to be rebuilt.
    Unchanged,
    /// A new FDSelect and the renumbering to apply to FDArray.
    Subset {
        format: u8,
        data: Vec<u8>,
        fd_map: FdRemap,
    },
}

/// Plan and write the FDSelect for the glyphs retained by `plan`.
pub fn subset_fdselect(
    src: &impl FdSelectSource,
    fd_count: u32,
    plan: &Plan,
) -> Result<FdSelectSubset, SubsetError> {
    let glyphs = &plan.new_to_old_gid_list;
    let fdselect_plan = match plan_subset_fdselect(glyphs, fd_count, src)? {
        PlannedFdSelect::Empty => return Ok(FdSelectSubset::Empty),
        PlannedFdSelect::Unchanged => return Ok(FdSelectSubset::Unchanged),
        PlannedFdSelect::Rebuild(fdselect_plan) => fdselect_plan,
    };

    let Ok(buf_size) = u32::try_from(fdselect_plan.size) else {
        return Err(SubsetError::SerializeFailed(
            SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM,
        ));
    };
    let mut s = Serializer::new(buf_size);
    if let Err(e) = serialize_fdselect(&mut s, glyphs, src, &fdselect_plan) {
        log::warn!("Serializing FDSelect failed with error {e}");
        return Err(SubsetError::SerializeFailed(e));
    }
    let data = s.copy_bytes().map_err(SubsetError::SerializeFailed)?;

    Ok(FdSelectSubset::Subset {
        format: fdselect_plan.format.format(),
        data,
        fd_map: fdselect_plan.fd_map,
    })
}

/// Subset the FDSelect of `font` for `plan`.
pub fn subset_font_fdselect(
    font: &FontRef,
    plan: &Plan,
) -> Result<FdSelectSubset, SubsetError> {
    let src = CffFdSelect::new(font)?;
    log::info!(
        "Subsetting FDSelect of {} table with {} font DICTs",
        if src.is_cff2() { "CFF2" } else { "CFF" },
        src.fd_count()
    );
    subset_fdselect(&src, src.fd_count(), plan)
}
