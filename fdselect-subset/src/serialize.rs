//! serializer
//! a fixed capacity writer modelled on the Harfbuzz Serializer: <https://github.com/harfbuzz/harfbuzz/blob/5e32b5ca8fe430132b87c0eee6a1c056d37c35eb/src/hb-serialize.hh>
//!
//! Only the flat "allocate then fill" part is needed for FDSelect, which has
//! no offsets to resolve, so there is no object graph here.

use skrifa::raw::types::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializeErrorFlags(u16);

impl SerializeErrorFlags {
    pub const SERIALIZE_ERROR_NONE: Self = Self(0x0000);
    pub const SERIALIZE_ERROR_OTHER: Self = Self(0x0001);
    pub const SERIALIZE_ERROR_OUT_OF_ROOM: Self = Self(0x0004);
    pub const SERIALIZE_ERROR_INT_OVERFLOW: Self = Self(0x0008);

    /// Returns `true` if every flag set in `other` is also set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SerializeErrorFlags {
    fn default() -> Self {
        Self::SERIALIZE_ERROR_NONE
    }
}

impl std::ops::BitOrAssign for SerializeErrorFlags {
    /// Adds the set of flags.
    #[inline]
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::Not for SerializeErrorFlags {
    type Output = bool;
    #[inline]
    fn not(self) -> bool {
        self == SerializeErrorFlags::SERIALIZE_ERROR_NONE
    }
}

impl std::fmt::Display for SerializeErrorFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (Self::SERIALIZE_ERROR_OTHER, "other"),
            (Self::SERIALIZE_ERROR_OUT_OF_ROOM, "out of room"),
            (Self::SERIALIZE_ERROR_INT_OVERFLOW, "int overflow"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// A big-endian writer into a buffer of fixed capacity.
///
/// Space is handed out front to back by [`allocate_size`](Self::allocate_size);
/// callers keep the returned position and fill the region with
/// [`copy_assign`](Self::copy_assign). Errors are sticky: once any flag is
/// set, every later allocation fails with the same flags.
#[derive(Default)]
pub struct Serializer {
    end: usize,
    head: usize,
    errors: SerializeErrorFlags,

    data: Vec<u8>,
}

impl Serializer {
    pub fn new(size: u32) -> Self {
        let buf_size = size as usize;
        Serializer {
            data: vec![0; buf_size],
            end: buf_size,
            ..Default::default()
        }
    }

    /// Embed a single Scalar type
    pub fn embed(&mut self, obj: impl Scalar) -> Result<usize, SerializeErrorFlags> {
        let raw = obj.to_raw();
        let bytes = raw.as_ref();
        let size = bytes.len();

        let ret = self.allocate_size(size, false)?;
        self.data[ret..ret + size].copy_from_slice(bytes);
        Ok(ret)
    }

    /// Reserve `size` bytes and return the position of the first one.
    ///
    /// If `clear` is set the region is zeroed, otherwise it keeps whatever a
    /// previous pass left there.
    pub fn allocate_size(
        &mut self,
        size: usize,
        clear: bool,
    ) -> Result<usize, SerializeErrorFlags> {
        if self.in_error() {
            return Err(self.errors);
        }

        if size > u32::MAX as usize || self.end - self.head < size {
            return Err(self.set_err(SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM));
        }

        let ret = self.head;
        if clear {
            self.data[ret..ret + size].fill(0);
        }
        self.head += size;
        Ok(ret)
    }

    /// Write `obj` at an already allocated position.
    pub fn copy_assign(&mut self, pos: usize, obj: impl Scalar) {
        let raw = obj.to_raw();
        let bytes = raw.as_ref();
        let Some(dst) = self.data.get_mut(pos..pos + bytes.len()) else {
            self.set_err(SerializeErrorFlags::SERIALIZE_ERROR_OTHER);
            return;
        };
        dst.copy_from_slice(bytes);
    }

    /// Number of bytes written so far.
    pub fn allocated(&self) -> usize {
        self.head
    }

    pub fn successful(&self) -> bool {
        !self.errors
    }

    pub fn in_error(&self) -> bool {
        !!self.errors
    }

    pub fn ran_out_of_room(&self) -> bool {
        self.errors
            .contains(SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM)
    }

    pub fn errors(&self) -> SerializeErrorFlags {
        self.errors
    }

    pub fn set_err(&mut self, error_type: SerializeErrorFlags) -> SerializeErrorFlags {
        self.errors |= error_type;
        self.errors
    }

    pub fn copy_bytes(mut self) -> Result<Vec<u8>, SerializeErrorFlags> {
        if !self.successful() {
            return Err(self.errors);
        }
        self.data.truncate(self.head);
        Ok(self.data)
    }
}

#[cfg(test)]
mod test {
    use skrifa::raw::types::{Offset16, Uint24};

    use super::*;

    // test Serializer::embed() works for different Scalar types
    #[test]
    fn test_serializer_embed() {
        let mut s = Serializer::new(2);
        let gid = 1_u32;
        //fail when out of room
        assert_eq!(
            s.embed(gid),
            Err(SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM)
        );

        let mut s = Serializer::new(16);
        assert_eq!(s.embed(gid), Ok(0));

        let offset = Offset16::new(20);
        assert_eq!(s.embed(offset), Ok(4));

        let n = Uint24::new(30);
        assert_eq!(s.embed(n), Ok(6));
        assert_eq!(s.allocated(), 9);

        let out = s.copy_bytes().unwrap();
        assert_eq!(out, [0, 0, 0, 1, 0, 20, 0, 0, 30]);
    }

    #[test]
    fn errors_are_sticky() {
        let mut s = Serializer::new(4);
        assert_eq!(s.allocate_size(3, false), Ok(0));
        assert_eq!(
            s.allocate_size(2, false),
            Err(SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM)
        );
        assert!(s.ran_out_of_room());
        // one byte would fit, but the serializer is already in error
        assert_eq!(
            s.allocate_size(1, false),
            Err(SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM)
        );
        assert_eq!(
            s.copy_bytes(),
            Err(SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM)
        );
    }

    #[test]
    fn copy_assign_into_allocated_region() {
        let mut s = Serializer::new(8);
        let pos = s.allocate_size(6, true).unwrap();
        s.copy_assign(pos, 0x0102_u16);
        s.copy_assign(pos + 2, 0x03040506_u32);
        assert!(s.successful());
        assert_eq!(s.copy_bytes().unwrap(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn copy_assign_out_of_bounds() {
        let mut s = Serializer::new(2);
        s.allocate_size(2, false).unwrap();
        s.copy_assign(1, 7_u16);
        assert_eq!(s.errors(), SerializeErrorFlags::SERIALIZE_ERROR_OTHER);
    }

    #[test]
    fn flags_display() {
        let mut flags = SerializeErrorFlags::SERIALIZE_ERROR_OUT_OF_ROOM;
        flags |= SerializeErrorFlags::SERIALIZE_ERROR_INT_OVERFLOW;
        assert_eq!(flags.to_string(), "out of room | int overflow");
        assert_eq!(SerializeErrorFlags::default().to_string(), "none");
    }
}
