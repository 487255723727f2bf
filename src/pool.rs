use std::{marker::PhantomData, ptr::NonNull, slice};

use log::{debug, warn};

use crate::{
  align::{align_down, checked_align_up, is_aligned},
  block::FreeBlock,
  config::{PoolConfig, TailPolicy},
  error::{PoolError, Result},
  free_list::FreeList,
  registry::PoolId,
  stats::PoolStats,
};

/// Control block of one pool: a fixed region of caller-owned memory.
///
/// ```text
///   start                                   cursor              start + size
///   ├──────────┬────────┬──────────┬────────┼────────────────────┤
///   │  used    │  free  │   used   │  free  │     untouched      │
///   └──────────┴────────┴──────────┴────────┴────────────────────┘
///              └─ free list (sorted, coalesced) ┘
/// ```
///
/// Allocation first searches the free list and only then bumps `cursor`.
/// The pool borrows its storage for `'a` and never frees or clears it.
#[derive(Debug)]
pub struct Pool<'a> {
  id: PoolId,
  start: NonNull<u8>,
  size: usize,
  cursor: usize,
  free_list: FreeList,
  config: PoolConfig,
  _storage: PhantomData<&'a mut [u8]>,
}

// The pool holds the only borrow of its storage.
unsafe impl Send for Pool<'_> {}

impl<'a> Pool<'a> {
  /// Takes the first `size` bytes of `storage`, rounded down to the
  /// granularity.
  ///
  /// # Errors
  ///
  /// Returns `InvalidArgument` for empty storage, a zero size, a size larger
  /// than the storage, or a size that rounds down to zero.
  pub(crate) fn new(
    id: PoolId,
    storage: &'a mut [u8],
    size: usize,
    config: PoolConfig,
  ) -> Result<Self> {
    if storage.is_empty() {
      return Err(PoolError::invalid("storage must not be empty"));
    }
    if size == 0 {
      return Err(PoolError::invalid("pool size must be > 0"));
    }
    if size > storage.len() {
      return Err(PoolError::invalid("pool size exceeds storage length"));
    }

    let size = align_down(size, config.granularity);
    if size == 0 {
      return Err(PoolError::invalid("pool size is smaller than the granularity"));
    }

    Ok(Self {
      id,
      start: NonNull::from(storage).cast(),
      size,
      cursor: 0,
      free_list: FreeList::new(),
      config,
      _storage: PhantomData,
    })
  }

  pub fn id(&self) -> PoolId {
    self.id
  }

  pub fn start(&self) -> NonNull<u8> {
    self.start
  }

  /// Usable size, a multiple of the granularity.
  pub fn size(&self) -> usize {
    self.size
  }

  /// Offset of the bump high-water mark.
  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn free_list(&self) -> &FreeList {
    &self.free_list
  }

  /// Offset of `ptr` from the pool start, if it points inside the pool.
  pub fn offset_of(
    &self,
    ptr: NonNull<u8>,
  ) -> Option<usize> {
    let offset = (ptr.as_ptr() as usize).checked_sub(self.start.as_ptr() as usize)?;
    (offset < self.size).then_some(offset)
  }

  /// Hands out `size` bytes, rounded up to the granularity.
  ///
  /// The free list is searched first (first fit, lowest address); if nothing
  /// fits, the block is bumped from `cursor`. Returned memory is not cleared.
  ///
  /// # Errors
  ///
  /// - `InvalidArgument` if `size` is zero or overflows when aligned.
  /// - `OutOfMemory` if neither the free list nor the tail can hold the block.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size == 0 {
      return Err(PoolError::invalid("allocation size must be > 0"));
    }
    let aligned = checked_align_up(size, self.config.granularity)
      .ok_or(PoolError::invalid("allocation size overflows when aligned"))?;

    let offset = match self.free_list.take_first_fit(aligned) {
      Some(offset) => offset,
      None => {
        if aligned > self.size - self.cursor {
          return Err(PoolError::OutOfMemory {
            requested: aligned,
            available: self.size - self.cursor,
          });
        }
        let offset = self.cursor;
        self.cursor += aligned;
        offset
      }
    };

    debug!(
      "pool {}: allocated {size} bytes ({aligned} aligned) at offset {offset:#x}, cursor {:#x}",
      self.id, self.cursor
    );

    // Safety: offset + aligned <= size <= storage length.
    Ok(unsafe { self.start.add(offset) })
  }

  /// Returns a block obtained from [`Pool::allocate`] and merges it with any
  /// adjacent free space.
  ///
  /// `size` is the size passed to `allocate`; it is rounded up the same way.
  ///
  /// # Errors
  ///
  /// - `InvalidArgument` if `size` is zero or the block would run past the
  ///   end of the pool.
  /// - `ForeignPointer` if `ptr` lies outside the pool, is not on a
  ///   granularity boundary, or reaches beyond anything ever handed out.
  /// - `DoubleFree` if any part of the block is already free.
  pub fn release(
    &mut self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> Result<()> {
    if size == 0 {
      return Err(PoolError::invalid("release size must be > 0"));
    }

    let addr = ptr.as_ptr() as usize;
    let Some(offset) = self.offset_of(ptr) else {
      warn!("pool {}: rejected release of foreign address {addr:#x}", self.id);
      return Err(PoolError::ForeignPointer { addr });
    };
    if !is_aligned(offset, self.config.granularity) {
      warn!("pool {}: rejected release of unaligned offset {offset:#x}", self.id);
      return Err(PoolError::ForeignPointer { addr });
    }

    let aligned = checked_align_up(size, self.config.granularity)
      .ok_or(PoolError::invalid("release size overflows when aligned"))?;
    if aligned > self.size - offset {
      warn!(
        "pool {}: rejected release of {offset:#x}+{aligned}, past the pool end",
        self.id
      );
      return Err(PoolError::invalid("released block extends past the end of the pool"));
    }
    if offset + aligned > self.cursor {
      warn!(
        "pool {}: rejected release of {offset:#x}+{aligned}, never allocated",
        self.id
      );
      return Err(PoolError::ForeignPointer { addr });
    }

    let merged = self
      .free_list
      .insert(FreeBlock::new(offset, aligned))
      .inspect_err(|_| warn!("pool {}: double free at offset {offset:#x}", self.id))?;

    if self.config.tail_policy == TailPolicy::Retract && merged.end() == self.cursor {
      self.free_list.pop_tail_at(self.cursor);
      self.cursor = merged.offset;
    }

    debug!(
      "pool {}: released {aligned} bytes at offset {offset:#x}, cursor {:#x}, {} free blocks",
      self.id,
      self.cursor,
      self.free_list.len()
    );

    Ok(())
  }

  /// Forgets every outstanding allocation at once.
  pub fn reset(&mut self) {
    self.cursor = 0;
    self.free_list.clear();
    debug!("pool {}: reset", self.id);
  }

  pub fn stats(&self) -> PoolStats {
    let free_in_list = self.free_list.total_bytes();

    PoolStats {
      size: self.size,
      cursor: self.cursor,
      free_blocks: self.free_list.len(),
      free_bytes_in_list: free_in_list,
      largest_free_block: self.free_list.largest().max(self.size - self.cursor),
      available: (self.size - self.cursor) + free_in_list,
      allocated: self.cursor - free_in_list,
    }
  }

  /// Raw view of the managed region, for dumps and inspection.
  ///
  /// Do not write through a pointer from [`Pool::allocate`] while the returned
  /// slice is alive.
  pub fn contents(&self) -> &[u8] {
    // Safety: start..start + size lies inside the storage borrowed for 'a.
    unsafe { slice::from_raw_parts(self.start.as_ptr(), self.size) }
  }
}
