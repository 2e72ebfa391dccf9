use std::{fmt, mem, ptr::NonNull};

/// Size in bytes of every block header. Tooling reading our dumps assumes
/// a block starts exactly this many bytes before the address we hand out.
pub const HEADER_SIZE: usize = 100;

/// Every block size is a multiple of this.
pub const ALIGNMENT: usize = 8;

/// Alignment of the payload we hand out. Regions start on a page boundary and
/// every block size is a multiple of [`ALIGNMENT`], so headers are always 8-byte
/// aligned and the payload right after the 100 byte header is only 4-byte aligned.
pub const PAYLOAD_ALIGN: usize = 1 << HEADER_SIZE.trailing_zeros();

/// Capacity of the block name, NUL terminator included.
pub const NAME_LEN: usize = 32;

const PADDING: usize =
    HEADER_SIZE - NAME_LEN - mem::size_of::<bool>() - mem::size_of::<u64>() - 3 * mem::size_of::<usize>();

/// Metadata placed in front of every block. The fields of the block are its
/// metadata, content is placed after this header.
///
/// ```text
/// +---------------------+ <------+
/// |     name (32b)      |        |
/// +---------------------+        |
/// |        size         |        |
/// +---------------------+        |
/// |    is_free (1b)     |        |
/// +---------------------+        | -> Header (100 bytes)
/// |      region_id      |        |
/// +---------------------+        |
/// |     next / prev     |        |
/// +---------------------+        |
/// |       padding       |        |
/// +---------------------+ <------+
/// |       Content       |        |
/// |         ...         |        | -> Addressable content
/// |                     |        |
/// +---------------------+ <------+
/// ```
///
/// `size` covers the header too, so the next block of the same region
/// starts at `address + size`.
#[repr(C, packed)]
pub(crate) struct Header {
    name: [u8; NAME_LEN],
    size: usize,
    is_free: bool,
    region_id: u64,
    next: Option<BlockPtr>,
    prev: Option<BlockPtr>,
    _padding: [u8; PADDING],
}

const _: () = assert!(mem::size_of::<Header>() == HEADER_SIZE);

/// Handle to a [`Header`] living inside one of our regions.
///
/// A `BlockPtr` can only be built from memory that already holds a header
/// (see [`BlockPtr::write`] and [`BlockPtr::from_payload`]), which is what makes
/// the accessors below safe to call. All the raw reads and writes to block
/// headers in the allocator go through here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct BlockPtr(NonNull<Header>);

impl BlockPtr {
    /// Writes a fresh free header of `size` bytes at `addr`, unlinked and unnamed.
    ///
    /// **SAFETY**: `addr` must be 8-byte aligned and valid for `size` bytes of
    /// writes, and `size` must be at least [`HEADER_SIZE`].
    pub unsafe fn write(addr: NonNull<u8>, size: usize, region_id: u64) -> Self {
        let header = addr.cast::<Header>();

        unsafe {
            header.as_ptr().write(Header {
                name: [0; NAME_LEN],
                size,
                is_free: true,
                region_id,
                next: None,
                prev: None,
                _padding: [0; PADDING],
            });
        }

        Self(header)
    }

    /// Recovers the block from the address we gave to the user.
    ///
    /// **SAFETY**: `payload` must have been returned by [`BlockPtr::payload`] on a
    /// block that is still linked.
    pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
        unsafe { Self(payload.sub(HEADER_SIZE).cast()) }
    }

    #[inline]
    pub fn payload(self) -> NonNull<u8> {
        unsafe { self.0.cast::<u8>().add(HEADER_SIZE) }
    }

    #[inline]
    pub fn as_non_null(self) -> NonNull<u8> {
        self.0.cast()
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Address right after the last byte of this block.
    #[inline]
    pub fn end(self) -> usize {
        self.addr() + self.size()
    }

    #[inline]
    pub fn size(self) -> usize {
        unsafe { (*self.0.as_ptr()).size }
    }

    /// Usable bytes after the header.
    #[inline]
    pub fn capacity(self) -> usize {
        self.size() - HEADER_SIZE
    }

    #[inline]
    pub fn set_size(self, size: usize) {
        unsafe { (*self.0.as_ptr()).size = size }
    }

    #[inline]
    pub fn is_free(self) -> bool {
        unsafe { (*self.0.as_ptr()).is_free }
    }

    #[inline]
    pub fn set_free(self, is_free: bool) {
        unsafe { (*self.0.as_ptr()).is_free = is_free }
    }

    #[inline]
    pub fn region_id(self) -> u64 {
        unsafe { (*self.0.as_ptr()).region_id }
    }

    #[inline]
    pub fn next(self) -> Option<BlockPtr> {
        unsafe { (*self.0.as_ptr()).next }
    }

    #[inline]
    pub fn set_next(self, next: Option<BlockPtr>) {
        unsafe { (*self.0.as_ptr()).next = next }
    }

    #[inline]
    pub fn prev(self) -> Option<BlockPtr> {
        unsafe { (*self.0.as_ptr()).prev }
    }

    #[inline]
    pub fn set_prev(self, prev: Option<BlockPtr>) {
        unsafe { (*self.0.as_ptr()).prev = prev }
    }

    /// Whether `other` is the same region as this block.
    #[inline]
    pub fn same_region(self, other: BlockPtr) -> bool {
        self.region_id() == other.region_id()
    }

    pub fn name(self) -> Name {
        Name(unsafe { (*self.0.as_ptr()).name })
    }

    pub fn set_name(self, name: Name) {
        unsafe { (*self.0.as_ptr()).name = name.0 }
    }
}

/// Fixed size, NUL terminated block name. Formatting into it never allocates,
/// which matters because we build these while holding the heap lock.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Name([u8; NAME_LEN]);

impl Name {
    /// The default label, `Allocation N`.
    pub fn allocation(id: u64) -> Self {
        let mut name = Self([0; NAME_LEN]);
        let _ = fmt::write(&mut Writer { name: &mut name, len: 0 }, format_args!("Allocation {id}"));
        name
    }

    /// Takes as much of `label` as fits, cutting on a UTF-8 boundary.
    pub fn from_label(label: &str) -> Self {
        let mut name = Self([0; NAME_LEN]);
        let mut len = label.len().min(NAME_LEN - 1);
        while !label.is_char_boundary(len) {
            len -= 1;
        }
        name.0[..len].copy_from_slice(&label.as_bytes()[..len]);
        name
    }

    /// Copies a C string label, cutting it to fit.
    #[cfg(feature = "capi")]
    pub fn from_bytes(label: &[u8]) -> Self {
        let mut name = Self([0; NAME_LEN]);
        let len = label.len().min(NAME_LEN - 1);
        name.0[..len].copy_from_slice(&label[..len]);
        name
    }

    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        &self.0[..len]
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.as_bytes().utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

struct Writer<'a> {
    name: &'a mut Name,
    len: usize,
}

impl fmt::Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = NAME_LEN - 1 - self.len;
        let take = s.len().min(room);
        self.name.0[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;

        if take < s.len() { Err(fmt::Error) } else { Ok(()) }
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::Scratch, *};
    use std::str;

    #[test]
    fn header_is_one_hundred_bytes() {
        assert_eq!(mem::size_of::<Header>(), 100);
        assert_eq!(HEADER_SIZE, 100);
        assert_eq!(PAYLOAD_ALIGN, 4);
    }

    #[test]
    fn payload_maps_back_to_header() {
        let mut scratch = Scratch::new(512);
        let block = scratch.block(0, 512, 3);

        assert_eq!(block.payload().as_ptr() as usize, block.addr() + HEADER_SIZE);
        assert_eq!(block.end(), block.addr() + 512);
        assert_eq!(block.capacity(), 512 - HEADER_SIZE);

        let back = unsafe { BlockPtr::from_payload(block.payload()) };
        assert!(back == block);
        assert_eq!(back.region_id(), 3);
        assert!(back.is_free());
    }

    #[test]
    fn fields_round_trip_through_packed_header() {
        let mut scratch = Scratch::new(1024);
        let a = scratch.block(0, 200, 1);
        let b = scratch.block(200, 824, 1);

        a.set_next(Some(b));
        b.set_prev(Some(a));
        a.set_free(false);
        a.set_size(208);

        assert!(a.next() == Some(b));
        assert!(b.prev() == Some(a));
        assert!(a.prev().is_none());
        assert!(!a.is_free());
        assert_eq!(a.size(), 208);
    }

    #[test]
    fn allocation_label() {
        assert_eq!(Name::allocation(0).as_bytes(), b"Allocation 0");
        assert_eq!(Name::allocation(42).to_string(), "Allocation 42");
    }

    #[test]
    fn long_names_are_cut() {
        let name = Name::from_label("a name that is much longer than thirty one bytes");
        assert_eq!(name.as_bytes().len(), NAME_LEN - 1);

        // 'é' is two bytes, it must not be split in half.
        let name = Name::from_label("ééééééééééééééééé");
        assert_eq!(name.as_bytes().len(), 30);
        assert!(str::from_utf8(name.as_bytes()).is_ok());
    }

    #[test]
    fn names_are_stored_in_the_header() {
        let mut scratch = Scratch::new(256);
        let block = scratch.block(0, 256, 0);

        assert_eq!(block.name().as_bytes(), b"");
        block.set_name(Name::from_label("cache"));
        assert_eq!(block.name().to_string(), "cache");
    }
}
