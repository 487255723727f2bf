//! Occupancy snapshots. Diagnostic display only; never use these values to
//! decide where to allocate.

use std::fmt;

/// Point-in-time accounting of one pool, in bytes unless noted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
  pub size: usize,
  pub cursor: usize,
  /// Number of entries in the free list.
  pub free_blocks: usize,
  pub free_bytes_in_list: usize,
  /// Largest single request that could succeed right now.
  pub largest_free_block: usize,
  pub available: usize,
  pub allocated: usize,
}

impl fmt::Display for PoolStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "{}/{} bytes allocated, cursor {}, {} free blocks ({} bytes), largest free {}",
      self.allocated,
      self.size,
      self.cursor,
      self.free_blocks,
      self.free_bytes_in_list,
      self.largest_free_block
    )
  }
}
