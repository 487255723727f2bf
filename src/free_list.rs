use log::trace;

use crate::{
  block::FreeBlock,
  error::{PoolError, Result},
};

/// Address-ordered list of free blocks.
///
/// Entries never overlap and are never adjacent: every insertion merges with
/// its neighbours, so each entry is a maximal run of free bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FreeList {
  blocks: Vec<FreeBlock>,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { blocks: Vec::new() }
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &FreeBlock> {
    self.blocks.iter()
  }

  pub fn as_slice(&self) -> &[FreeBlock] {
    &self.blocks
  }

  pub fn total_bytes(&self) -> usize {
    self.blocks.iter().map(|block| block.length).sum()
  }

  pub fn largest(&self) -> usize {
    self.blocks.iter().map(|block| block.length).max().unwrap_or(0)
  }

  pub fn last(&self) -> Option<&FreeBlock> {
    self.blocks.last()
  }

  pub fn clear(&mut self) {
    self.blocks.clear();
  }

  /// Carves `size` bytes from the front of the lowest-addressed entry that is
  /// large enough and returns their offset.
  pub fn take_first_fit(
    &mut self,
    size: usize,
  ) -> Option<usize> {
    let index = self.blocks.iter().position(|block| block.length >= size)?;
    let block = &mut self.blocks[index];
    let offset = block.offset;

    if block.length == size {
      self.blocks.remove(index);
      trace!("free list: took whole block {offset:#x}+{size}");
    } else {
      block.offset += size;
      block.length -= size;
      trace!(
        "free list: carved {size} bytes at {offset:#x}, {} left at {:#x}",
        block.length, block.offset
      );
    }

    Some(offset)
  }

  /// Inserts `new` at its sorted position and merges it with the entries on
  /// either side. Returns the merged block.
  ///
  /// # Errors
  ///
  /// Returns `DoubleFree` if `new` overlaps an entry already in the list. The
  /// list is left untouched in that case.
  pub fn insert(
    &mut self,
    new: FreeBlock,
  ) -> Result<FreeBlock> {
    let index = self.blocks.partition_point(|block| block.offset < new.offset);

    let prev = index.checked_sub(1).map(|i| self.blocks[i]);
    let next = self.blocks.get(index).copied();

    if prev.is_some_and(|prev| prev.overlaps(&new)) || next.is_some_and(|next| next.overlaps(&new)) {
      return Err(PoolError::DoubleFree { offset: new.offset });
    }

    let merge_prev = prev.is_some_and(|prev| prev.precedes(&new));
    let merge_next = next.is_some_and(|next| new.precedes(&next));

    let merged = match (merge_prev, merge_next) {
      (true, true) => {
        let next_len = self.blocks.remove(index).length;
        let prev = &mut self.blocks[index - 1];
        prev.length += new.length + next_len;
        *prev
      }
      (true, false) => {
        let prev = &mut self.blocks[index - 1];
        prev.length += new.length;
        *prev
      }
      (false, true) => {
        let next = &mut self.blocks[index];
        next.offset = new.offset;
        next.length += new.length;
        *next
      }
      (false, false) => {
        self.blocks.insert(index, new);
        new
      }
    };

    if merge_prev || merge_next {
      trace!(
        "free list: coalesced {:#x}+{} into {:#x}+{}",
        new.offset, new.length, merged.offset, merged.length
      );
    }

    Ok(merged)
  }

  /// Removes and returns the highest entry if it ends exactly at `end`.
  pub fn pop_tail_at(
    &mut self,
    end: usize,
  ) -> Option<FreeBlock> {
    if self.last()?.end() == end {
      self.blocks.pop()
    } else {
      None
    }
  }
}
