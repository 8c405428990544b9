//! command line input parsing util functions
use skrifa::raw::{collections::IntSet, types::GlyphId};

use crate::SubsetError;

/// Parse a comma separated list of glyph ids and inclusive ranges, such as
/// `1,5,7-9`. The special string `*` selects every glyph.
pub fn populate_gids(gid_str: &str) -> Result<IntSet<GlyphId>, SubsetError> {
    if gid_str.trim() == "*" {
        return Ok(IntSet::<GlyphId>::all());
    }

    let mut result = IntSet::empty();
    if gid_str.is_empty() {
        return Ok(result);
    }
    for gid in gid_str.split(',').map(str::trim) {
        if gid.is_empty() {
            continue;
        }
        if let Some((start, end)) = gid.split_once('-') {
            let start = parse_gid(start)?;
            let end = parse_gid(end)?;
            if start > end {
                return Err(SubsetError::InvalidGidRange { start, end });
            }
            result.extend((start..=end).map(GlyphId::new));
        } else {
            result.insert(GlyphId::new(parse_gid(gid)?));
        }
    }
    Ok(result)
}

fn parse_gid(raw: &str) -> Result<u32, SubsetError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| SubsetError::InvalidGid(raw.to_owned()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_populate_gids() {
        let input = "1,5,7";
        let output = populate_gids(input).unwrap();
        assert_eq!(output.len(), 3);
        assert!(output.contains(GlyphId::new(1)));
        assert!(output.contains(GlyphId::new(5)));
        assert!(output.contains(GlyphId::new(7)));

        let output = populate_gids("*").unwrap();
        assert!(output.contains(GlyphId::new(1)));
        assert!(output.contains(GlyphId::new(0)));
        assert!(output.contains(GlyphId::new(7)));

        assert!(populate_gids("").unwrap().is_empty());
    }

    #[test]
    fn gid_ranges() {
        let output = populate_gids("3-5, 10,").unwrap();
        assert_eq!(
            output.iter().collect::<Vec<_>>(),
            [3, 4, 5, 10].map(GlyphId::new)
        );
    }

    #[test]
    fn invalid_gids() {
        assert!(matches!(
            populate_gids("1,x"),
            Err(SubsetError::InvalidGid(gid)) if gid == "x"
        ));
        assert!(matches!(
            populate_gids("9-2"),
            Err(SubsetError::InvalidGidRange { start: 9, end: 2 })
        ));
        assert!(matches!(
            populate_gids("-4"),
            Err(SubsetError::InvalidGid(_))
        ));
    }
}
