use crate::block::BlockPtr;

/// Doubly linked list of every block of every region, in the order regions
/// were created and blocks were split.
///
/// The list is intrusive: the `next` and `prev` links live inside each
/// [`crate::block::Header`]. Because we are the actual memory allocator, the
/// list can not make allocations itself, so the caller always hands it a block
/// that is already written in place.
///
/// ```text
/// +----------------------------------+      +---------------------------+
/// | +-------+    +-------+    +-------+ |      | +-------+    +-------+    |
/// | | Block | <> | Block | <> | Block | | <--> | | Block | <> | Block |    |
/// | +-------+    +-------+    +-------+ |      | +-------+    +-------+    |
/// +----------- region 0 ----------------+      +-------- region 1 ---------+
/// ```
pub(crate) struct BlockList {
    head: Option<BlockPtr>,
    tail: Option<BlockPtr>,
    len: usize,
}

pub(crate) struct Iter {
    current: Option<BlockPtr>,
    remaining: usize,
}

impl BlockList {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[cfg(test)]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    #[inline]
    pub fn first(&self) -> Option<BlockPtr> {
        self.head
    }

    #[cfg(test)]
    #[inline]
    pub fn last(&self) -> Option<BlockPtr> {
        self.tail
    }

    #[cfg(test)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Links `block` at the end of the list.
    pub fn append(&mut self, block: BlockPtr) {
        block.set_prev(self.tail);
        block.set_next(None);

        match self.tail {
            Some(tail) => tail.set_next(Some(block)),
            None => self.head = Some(block),
        }

        self.tail = Some(block);
        self.len += 1;
    }

    /// Links `block` right after `anchor`, which must already be in the list.
    pub fn insert_after(&mut self, anchor: BlockPtr, block: BlockPtr) {
        let next = anchor.next();

        block.set_prev(Some(anchor));
        block.set_next(next);

        match next {
            Some(next) => next.set_prev(Some(block)),
            None => self.tail = Some(block),
        }

        anchor.set_next(Some(block));
        self.len += 1;
    }

    /// Unlinks `block`, fixing head and tail when it was at either end.
    pub fn remove(&mut self, block: BlockPtr) {
        let prev = block.prev();
        let next = block.next();

        match prev {
            Some(prev) => prev.set_next(next),
            None => self.head = next,
        }

        match next {
            Some(next) => next.set_prev(prev),
            None => self.tail = prev,
        }

        block.set_prev(None);
        block.set_next(None);
        self.len -= 1;
    }

    pub fn iter(&self) -> Iter {
        Iter {
            current: self.head,
            remaining: self.len,
        }
    }
}

impl Iterator for Iter {
    type Item = BlockPtr;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.current?;

        self.current = block.next();
        self.remaining -= 1;

        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> IntoIterator for &'a BlockList {
    type Item = BlockPtr;
    type IntoIter = Iter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
