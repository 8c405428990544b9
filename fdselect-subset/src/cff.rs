//! Find the FDSelect and FDArray of a font's CFF or CFF2 table.

use skrifa::raw::{
    tables::postscript::{dict, Error, FdSelect, Index},
    types::GlyphId,
    FontData, FontRead, FontRef, ReadError, TableProvider,
};

use crate::fdselect::FdSelectSource;
use crate::SubsetError;

/// The glyph to font DICT mapping of a CFF/CFF2 font.
#[derive(Clone)]
pub struct CffFdSelect<'a> {
    fd_select: Option<FdSelect<'a>>,
    fd_count: u32,
    is_cff2: bool,
}

impl<'a> CffFdSelect<'a> {
    /// Read the mapping from `font`, choosing CFF2 over CFF.
    pub fn new(font: &FontRef<'a>) -> Result<Self, SubsetError> {
        match font.cff2() {
            Ok(cff2) => {
                let table_data = cff2.offset_data().as_bytes();
                return Self::from_top_dict(table_data, cff2.top_dict_data(), true)
                    .map_err(SubsetError::Cff);
            }
            Err(ReadError::TableIsMissing(_)) => {}
            Err(e) => return Err(SubsetError::Read(e)),
        }
        let cff = font.cff().map_err(|e| match e {
            ReadError::TableIsMissing(_) => SubsetError::NoCffTable,
            e => SubsetError::Read(e),
        })?;
        // "The Name INDEX in the CFF data must contain only one entry"
        // <https://learn.microsoft.com/en-us/typography/opentype/spec/cff>
        let top_dict_data = cff.top_dicts().get(0).map_err(SubsetError::Cff)?;
        Self::from_top_dict(cff.offset_data().as_bytes(), top_dict_data, false)
            .map_err(SubsetError::Cff)
    }

    /// Read the mapping from a Top DICT. Offsets in the DICT are relative to
    /// `table_data`.
    pub fn from_top_dict(
        table_data: &'a [u8],
        top_dict_data: &'a [u8],
        is_cff2: bool,
    ) -> Result<Self, Error> {
        // fonts without an FDArray (non CID-keyed CFF) have a single
        // implicit font DICT
        let mut fd_count = 1;
        let mut fd_select = None;
        for entry in dict::entries(top_dict_data, None) {
            match entry? {
                dict::Entry::FdArrayOffset(offset) => {
                    let fd_array =
                        Index::new(table_data.get(offset..).unwrap_or_default(), is_cff2)?;
                    fd_count = fd_array.count().max(1);
                }
                dict::Entry::FdSelectOffset(offset) => {
                    fd_select = Some(FdSelect::read(FontData::new(
                        table_data.get(offset..).unwrap_or_default(),
                    ))?);
                }
                _ => {}
            }
        }
        Ok(Self {
            fd_select,
            fd_count,
            is_cff2,
        })
    }

    /// Number of font DICTs in the FDArray.
    pub fn fd_count(&self) -> u32 {
        self.fd_count
    }

    pub fn fd_select(&self) -> Option<&FdSelect<'a>> {
        self.fd_select.as_ref()
    }

    pub fn is_cff2(&self) -> bool {
        self.is_cff2
    }
}

impl FdSelectSource for CffFdSelect<'_> {
    fn fd_index(&self, gid: GlyphId) -> u16 {
        self.fd_select
            .as_ref()
            .map(|fd_select| fd_select.fd_index(gid))
            .unwrap_or(0)
    }

    fn is_wide(&self) -> bool {
        self.fd_select
            .as_ref()
            .is_some_and(|fd_select| fd_select.is_wide())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // DICT operands in the range -107..=107 are encoded as a single byte + 139
    fn operand(value: u8) -> u8 {
        value + 139
    }

    const FD_ARRAY_OP: [u8; 2] = [12, 36];
    const FD_SELECT_OP: [u8; 2] = [12, 37];
    const CHARSTRINGS_OP: u8 = 17;

    fn cid_keyed_cff() -> (Vec<u8>, Vec<u8>) {
        let mut table = vec![0_u8; 20];
        // FDArray: CFF INDEX with 3 one-byte entries
        table.extend([0, 3, 1, 1, 2, 3, 4, 0xAA, 0xBB, 0xCC]);
        // FDSelect at 30: format 3, gids 0..5 -> 0, 5..8 -> 2
        table.extend([3, 0, 2, 0, 0, 0, 0, 5, 2, 0, 8]);

        let top_dict = vec![
            operand(0),
            CHARSTRINGS_OP,
            operand(20),
            FD_ARRAY_OP[0],
            FD_ARRAY_OP[1],
            operand(30),
            FD_SELECT_OP[0],
            FD_SELECT_OP[1],
        ];
        (table, top_dict)
    }

    #[test]
    fn read_cid_keyed_top_dict() {
        let (table, top_dict) = cid_keyed_cff();
        let fds = CffFdSelect::from_top_dict(&table, &top_dict, false).unwrap();
        assert_eq!(fds.fd_count(), 3);
        assert!(!fds.is_cff2());
        assert!(!fds.is_wide());
        assert!(matches!(fds.fd_select(), Some(FdSelect::Format3(_))));

        let mapped: Vec<_> = (0..8).map(|gid| fds.fd_index(GlyphId::new(gid))).collect();
        assert_eq!(mapped, [0, 0, 0, 0, 0, 2, 2, 2]);
    }

    #[test]
    fn cff2_without_fdselect() {
        let mut table = vec![0_u8; 10];
        // FDArray: CFF2 INDEX (32-bit count) with 2 one-byte entries
        table.extend([0, 0, 0, 2, 1, 1, 2, 3, 0xAA, 0xBB]);
        let top_dict = [operand(10), FD_ARRAY_OP[0], FD_ARRAY_OP[1]];

        let fds = CffFdSelect::from_top_dict(&table, &top_dict, true).unwrap();
        assert_eq!(fds.fd_count(), 2);
        assert!(fds.is_cff2());
        assert!(fds.fd_select().is_none());
        assert_eq!(fds.fd_index(GlyphId::new(7)), 0);
    }

    #[test]
    fn name_keyed_cff() {
        let top_dict = [operand(0), CHARSTRINGS_OP];
        let fds = CffFdSelect::from_top_dict(&[0; 4], &top_dict, false).unwrap();
        assert_eq!(fds.fd_count(), 1);
        assert!(fds.fd_select().is_none());
        assert!(!fds.is_wide());
    }

    /// A font whose table directory holds the single table `tag`.
    fn font_with_table(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut font = b"OTTO".to_vec();
        // numTables, searchRange, entrySelector, rangeShift
        font.extend([0, 1, 0, 16, 0, 0, 0, 0]);
        font.extend(tag);
        // checksum, offset, length
        font.extend([0; 4]);
        font.extend(28_u32.to_be_bytes());
        font.extend((data.len() as u32).to_be_bytes());
        font.extend(data);
        font
    }

    #[test]
    fn broken_cff2_is_a_read_error() {
        // too short for the CFF2 header
        let data = font_with_table(b"CFF2", &[2, 0]);
        let font = FontRef::new(&data).unwrap();
        assert!(matches!(
            CffFdSelect::new(&font),
            Err(SubsetError::Read(_))
        ));
    }

    #[test]
    fn missing_cff_tables() {
        let data = font_with_table(b"glyf", &[0; 4]);
        let font = FontRef::new(&data).unwrap();
        assert!(matches!(
            CffFdSelect::new(&font),
            Err(SubsetError::NoCffTable)
        ));
    }

    #[test]
    fn bad_fdselect_offset() {
        // points at a format byte that doesn't exist
        let top_dict = [operand(2), FD_SELECT_OP[0], FD_SELECT_OP[1]];
        assert!(CffFdSelect::from_top_dict(&[0, 0, 7, 0], &top_dict, false).is_err());
    }
}
