/// A run of free bytes inside a pool, addressed by offset from the pool start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeBlock {
  pub offset: usize,
  pub length: usize,
}

impl FreeBlock {
  pub const fn new(
    offset: usize,
    length: usize,
  ) -> Self {
    Self { offset, length }
  }

  /// One past the last byte of the block.
  #[inline]
  pub const fn end(&self) -> usize {
    self.offset + self.length
  }

  /// `true` when `next` starts exactly where `self` ends.
  #[inline]
  pub const fn precedes(
    &self,
    next: &FreeBlock,
  ) -> bool {
    self.end() == next.offset
  }

  #[inline]
  pub const fn overlaps(
    &self,
    other: &FreeBlock,
  ) -> bool {
    self.offset < other.end() && other.offset < self.end()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_adjacency() {
    let a = FreeBlock::new(0, 12);
    let b = FreeBlock::new(12, 28);
    let c = FreeBlock::new(44, 4);

    assert!(a.precedes(&b));
    assert!(!b.precedes(&a));
    assert!(!b.precedes(&c));
    assert_eq!(b.end(), 40);
  }

  #[test]
  fn test_overlap() {
    let a = FreeBlock::new(8, 8);

    assert!(a.overlaps(&FreeBlock::new(8, 8)));
    assert!(a.overlaps(&FreeBlock::new(4, 8)));
    assert!(a.overlaps(&FreeBlock::new(12, 16)));
    assert!(a.overlaps(&FreeBlock::new(0, 32)));
    assert!(!a.overlaps(&FreeBlock::new(0, 8)));
    assert!(!a.overlaps(&FreeBlock::new(16, 8)));
  }
}
