//! Plan and serialize a subset FDSelect.
//!
//! FDSelect maps every glyph of a CID-keyed CFF (or a CFF2) font to one of
//! the font DICTs in the FDArray. After subsetting, only the font DICTs that
//! are still referenced survive, renumbered contiguously, and the table is
//! rewritten in whichever of the three formats is smallest.
//!
//! See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=28>
//! and <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#fdselect>.
//!
//! reference: hb_plan_subset_cff_fdselect() and hb_serialize_cff_fdselect() in harfbuzz
//! <https://github.com/harfbuzz/harfbuzz/blob/main/src/hb-subset-cff-common.cc>

use skrifa::raw::{
    collections::IntSet,
    tables::postscript::FdSelect,
    types::{FixedSize, GlyphId, Scalar},
};

use crate::remap::FdRemap;
use crate::serialize::{SerializeErrorFlags, Serializer};
use crate::SubsetError;

/// Size of the format field that starts every FDSelect.
pub const FDSELECT_HEADER_SIZE: usize = 1;

const FORMAT3_NUM_RANGES_SIZE: usize = 2;
const FORMAT3_RANGE_SIZE: usize = 3;
const FORMAT3_SENTINEL_SIZE: usize = 2;

const FORMAT4_NUM_RANGES_SIZE: usize = 4;
const FORMAT4_RANGE_SIZE: usize = 6;
const FORMAT4_SENTINEL_SIZE: usize = 4;

/// Format 3 stores font DICT indices in a single byte.
const MAX_NARROW_FD_COUNT: u32 = 0xFF;
/// Format 3 stores glyph ids, including the sentinel, in 16 bits.
const MAX_NARROW_NUM_GLYPHS: usize = 0xFFFF;

/// Lookup of the original font DICT for an original glyph.
pub trait FdSelectSource {
    /// Returns the font DICT index of `gid`.
    ///
    /// Glyphs the source doesn't cover belong to font DICT 0, the same
    /// fallback used when a font has no FDSelect at all.
    fn fd_index(&self, gid: GlyphId) -> u16;

    /// Returns `true` if the source is stored in format 4, the only format
    /// that can address more than 256 font DICTs.
    fn is_wide(&self) -> bool;
}

impl FdSelectSource for FdSelect<'_> {
    fn fd_index(&self, gid: GlyphId) -> u16 {
        self.font_index(gid).unwrap_or(0)
    }

    fn is_wide(&self) -> bool {
        matches!(self, FdSelect::Format4(_))
    }
}

/// A run of consecutive new glyphs that share one font DICT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FdRange {
    /// First new glyph id of the run.
    pub first: u32,
    /// Font DICT index in the original font.
    pub fd: u16,
}

/// The encodings an FDSelect can be written in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FdSelectFormat {
    /// One byte per glyph.
    Format0,
    /// 16-bit range count and first glyph, 8-bit font DICT index.
    Format3(Vec<FdRange>),
    /// 32-bit range count and first glyph, 16-bit font DICT index.
    Format4(Vec<FdRange>),
}

impl FdSelectFormat {
    /// The value of the format field.
    pub fn format(&self) -> u8 {
        match self {
            FdSelectFormat::Format0 => 0,
            FdSelectFormat::Format3(_) => 3,
            FdSelectFormat::Format4(_) => 4,
        }
    }

    /// Ranges to write, empty for format 0.
    pub fn ranges(&self) -> &[FdRange] {
        match self {
            FdSelectFormat::Format0 => &[],
            FdSelectFormat::Format3(ranges) | FdSelectFormat::Format4(ranges) => ranges,
        }
    }
}

/// A subset FDSelect that needs to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FdSelectPlan {
    /// Number of font DICTs still referenced by the subset glyphs.
    pub subset_fd_count: u32,
    /// Exact size in bytes of the serialized table, header included.
    pub size: usize,
    pub format: FdSelectFormat,
    /// old -> new font DICT index, new indices follow the order of old ones.
    pub fd_map: FdRemap,
}

/// Outcome of planning a subset FDSelect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedFdSelect {
    /// No glyphs are retained, there is nothing to write.
    Empty,
    /// Every font DICT is still in use, FDSelect and FDArray can be kept
    /// (modulo glyph renumbering, which the caller handles).
    Unchanged,
    /// FDSelect must be rewritten.
    Rebuild(FdSelectPlan),
}

impl PlannedFdSelect {
    /// Number of font DICTs the subset references.
    pub fn subset_fd_count(&self, fd_count: u32) -> u32 {
        match self {
            PlannedFdSelect::Empty => 0,
            PlannedFdSelect::Unchanged => fd_count,
            PlannedFdSelect::Rebuild(plan) => plan.subset_fd_count,
        }
    }
}

pub fn format0_size(num_glyphs: usize) -> usize {
    FDSELECT_HEADER_SIZE + num_glyphs
}

pub fn format3_size(num_ranges: usize) -> usize {
    FDSELECT_HEADER_SIZE
        + FORMAT3_NUM_RANGES_SIZE
        + FORMAT3_RANGE_SIZE * num_ranges
        + FORMAT3_SENTINEL_SIZE
}

pub fn format4_size(num_ranges: usize) -> usize {
    FDSELECT_HEADER_SIZE
        + FORMAT4_NUM_RANGES_SIZE
        + FORMAT4_RANGE_SIZE * num_ranges
        + FORMAT4_SENTINEL_SIZE
}

/// Determine the most compact FDSelect for the glyphs of a subset.
///
/// `glyphs` lists the retained original glyph ids in new glyph order, and
/// `fd_count` is the number of font DICTs in the original FDArray.
///
/// # Panics
///
/// More than 255 font DICTs can only be written in format 4, and the source
/// is required to already be in that format. A narrower source referencing
/// that many font DICTs is a caller bug.
pub fn plan_subset_fdselect(
    glyphs: &[GlyphId],
    fd_count: u32,
    src: &impl FdSelectSource,
) -> Result<PlannedFdSelect, SubsetError> {
    let num_glyphs = glyphs.len();
    if num_glyphs == 0 {
        return Ok(PlannedFdSelect::Empty);
    }

    let mut fds = IntSet::<u16>::empty();
    let mut ranges = Vec::new();
    let mut prev_fd = None;
    for (new_gid, old_gid) in glyphs.iter().enumerate() {
        let fd = src.fd_index(*old_gid);
        fds.insert(fd);

        if prev_fd != Some(fd) {
            prev_fd = Some(fd);
            ranges.push(FdRange {
                first: new_gid as u32,
                fd,
            });
        }
    }

    let subset_fd_count = fds.len() as u32;
    if subset_fd_count == fd_count {
        log::debug!("FDSelect: all {fd_count} font DICTs retained, no need to subset");
        return Ok(PlannedFdSelect::Unchanged);
    }

    let mut fd_map = new_fd_map(fd_count as usize)?;
    for fd in fds.iter() {
        fd_map.add(fd);
    }
    debug_assert_eq!(fd_map.len() as u32, subset_fd_count);

    let (format, size) = if subset_fd_count > MAX_NARROW_FD_COUNT {
        assert!(
            src.is_wide(),
            "{subset_fd_count} font DICTs retained but the source FDSelect is not format 4"
        );
        let size = format4_size(ranges.len());
        (FdSelectFormat::Format4(ranges), size)
    } else {
        let dense_size = format0_size(num_glyphs);
        let ranges_size = format3_size(ranges.len());

        // format 3 can't address glyphs beyond 16 bits
        if dense_size <= ranges_size || num_glyphs > MAX_NARROW_NUM_GLYPHS {
            (FdSelectFormat::Format0, dense_size)
        } else {
            (FdSelectFormat::Format3(ranges), ranges_size)
        }
    };

    log::info!(
        "FDSelect: {subset_fd_count} of {fd_count} font DICTs retained, format {} ({size} bytes)",
        format.format(),
    );
    log::debug!("FDSelect ranges: {:?}", format.ranges());

    Ok(PlannedFdSelect::Rebuild(FdSelectPlan {
        subset_fd_count,
        size,
        format,
        fd_map,
    }))
}

fn new_fd_map(capacity: usize) -> Result<FdRemap, SubsetError> {
    FdRemap::try_with_capacity(capacity)
        .map_err(|_| SubsetError::AllocationFailed { requested: capacity })
}

/// Write a subset FDSelect planned by [`plan_subset_fdselect`].
///
/// `glyphs` and `src` must be the ones the plan was made from.
pub fn serialize_fdselect(
    s: &mut Serializer,
    glyphs: &[GlyphId],
    src: &impl FdSelectSource,
    plan: &FdSelectPlan,
) -> Result<(), SerializeErrorFlags> {
    s.embed(plan.format.format())?;
    let body_size = plan
        .size
        .checked_sub(FDSELECT_HEADER_SIZE)
        .ok_or_else(|| s.set_err(SerializeErrorFlags::SERIALIZE_ERROR_OTHER))?;

    match &plan.format {
        FdSelectFormat::Format0 => serialize_format0(s, glyphs, src, &plan.fd_map, body_size),
        FdSelectFormat::Format3(ranges) => serialize_ranges::<u16, u8>(
            s,
            glyphs.len(),
            ranges,
            &plan.fd_map,
            body_size,
        ),
        FdSelectFormat::Format4(ranges) => serialize_ranges::<u32, u16>(
            s,
            glyphs.len(),
            ranges,
            &plan.fd_map,
            body_size,
        ),
    }
}

fn serialize_format0(
    s: &mut Serializer,
    glyphs: &[GlyphId],
    src: &impl FdSelectSource,
    fd_map: &FdRemap,
    size: usize,
) -> Result<(), SerializeErrorFlags> {
    if size != glyphs.len() {
        return Err(s.set_err(SerializeErrorFlags::SERIALIZE_ERROR_OTHER));
    }
    let fds_pos = s.allocate_size(size, false)?;
    for (new_gid, old_gid) in glyphs.iter().enumerate() {
        let fd = new_fd::<u8>(s, fd_map, src.fd_index(*old_gid))?;
        s.copy_assign(fds_pos + new_gid, fd);
    }
    Ok(())
}

/// Shared by formats 3 and 4, which differ only in field widths.
fn serialize_ranges<G, F>(
    s: &mut Serializer,
    num_glyphs: usize,
    ranges: &[FdRange],
    fd_map: &FdRemap,
    size: usize,
) -> Result<(), SerializeErrorFlags>
where
    G: Scalar + FixedSize + TryFrom<usize>,
    F: Scalar + FixedSize + TryFrom<u16>,
{
    let range_size = G::RAW_BYTE_LEN + F::RAW_BYTE_LEN;
    if size != G::RAW_BYTE_LEN + range_size * ranges.len() + G::RAW_BYTE_LEN {
        return Err(s.set_err(SerializeErrorFlags::SERIALIZE_ERROR_OTHER));
    }
    let start = s.allocate_size(size, false)?;

    let num_ranges: G = narrow(s, ranges.len())?;
    s.copy_assign(start, num_ranges);
    let mut pos = start + G::RAW_BYTE_LEN;
    for range in ranges {
        let first: G = narrow(s, range.first as usize)?;
        let fd: F = new_fd(s, fd_map, range.fd)?;
        s.copy_assign(pos, first);
        s.copy_assign(pos + G::RAW_BYTE_LEN, fd);
        pos += range_size;
    }
    // sentinel
    let num_glyphs: G = narrow(s, num_glyphs)?;
    s.copy_assign(pos, num_glyphs);
    Ok(())
}

fn new_fd<F: TryFrom<u16>>(
    s: &mut Serializer,
    fd_map: &FdRemap,
    old_fd: u16,
) -> Result<F, SerializeErrorFlags> {
    let Some(fd) = fd_map.get(old_fd) else {
        return Err(s.set_err(SerializeErrorFlags::SERIALIZE_ERROR_OTHER));
    };
    F::try_from(fd).map_err(|_| s.set_err(SerializeErrorFlags::SERIALIZE_ERROR_INT_OVERFLOW))
}

fn narrow<T: TryFrom<usize>>(s: &mut Serializer, value: usize) -> Result<T, SerializeErrorFlags> {
    T::try_from(value).map_err(|_| s.set_err(SerializeErrorFlags::SERIALIZE_ERROR_INT_OVERFLOW))
}
