use std::{fmt, ptr::NonNull};

use log::debug;

use crate::{
  config::PoolConfig,
  error::{PoolError, Result},
  pool::Pool,
};

/// Stable handle to a registered pool.
///
/// The generation changes every time a slot is reused, so a handle to a
/// destroyed pool never resolves to the pool that replaced it. A slot whose
/// generation is exhausted is retired instead of reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolId {
  index: usize,
  generation: u32,
}

impl PoolId {
  pub(crate) const fn new(
    index: usize,
    generation: u32,
  ) -> Self {
    Self { index, generation }
  }

  pub fn index(&self) -> usize {
    self.index
  }
}

impl fmt::Display for PoolId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "#{}.{}", self.index, self.generation)
  }
}

#[derive(Debug)]
struct Entry<'a> {
  pool: Pool<'a>,
  next: usize,
  prev: usize,
}

#[derive(Debug, Default)]
struct Slot<'a> {
  generation: u32,
  entry: Option<Entry<'a>>,
}

/// Set of live pools, kept as a circular doubly-linked ring.
///
/// ```text
///        head
///         │
///         ▼
///   ┌──▶ P0 ──▶ P1 ──▶ P2 ──┐
///   │                       │
///   └───────────────────────┘   (prev links run the other way)
/// ```
///
/// Pools live in an arena and the ring links are slot indices. New pools are
/// spliced in just before the head, i.e. at the tail of the walk.
#[derive(Debug, Default)]
pub struct PoolRegistry<'a> {
  slots: Vec<Slot<'a>>,
  vacant: Vec<usize>,
  head: Option<usize>,
  count: usize,
  config: PoolConfig,
}

impl<'a> PoolRegistry<'a> {
  /// Registry with word granularity and [`TailPolicy::Keep`](crate::TailPolicy::Keep).
  pub fn new() -> Self {
    Self::default()
  }

  /// # Errors
  ///
  /// Returns `InvalidArgument` if `config` does not validate.
  pub fn with_config(config: PoolConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      config,
      ..Self::default()
    })
  }

  /// Number of live pools. Diagnostics only.
  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn head(&self) -> Option<PoolId> {
    self.head.map(|index| self.id_at(index))
  }

  /// Registers a pool over the first `size` bytes of `storage`.
  ///
  /// `size` is rounded down to the granularity. The storage stays borrowed
  /// until the registry is dropped, even after [`destroy_pool`](Self::destroy_pool).
  ///
  /// # Errors
  ///
  /// Returns `InvalidArgument` for empty storage, a zero size, a size larger
  /// than the storage, or a size that rounds down to zero.
  pub fn create_pool(
    &mut self,
    storage: &'a mut [u8],
    size: usize,
  ) -> Result<PoolId> {
    let index = self.vacant.last().copied().unwrap_or(self.slots.len());
    let generation = self.slots.get(index).map_or(0, |slot| slot.generation);
    let id = PoolId::new(index, generation);

    let pool = Pool::new(id, storage, size, self.config)?;
    let pool_size = pool.size();

    let (next, prev) = match self.head {
      None => (index, index),
      Some(head) => (head, self.entry(head).prev),
    };

    if index == self.slots.len() {
      self.slots.push(Slot::default());
    } else {
      self.vacant.pop();
    }
    self.slots[index].entry = Some(Entry { pool, next, prev });

    match self.head {
      None => self.head = Some(index),
      Some(_) => {
        self.entry_mut(next).prev = index;
        self.entry_mut(prev).next = index;
      }
    }
    self.count += 1;

    debug!("registry: created pool {id} of {pool_size} bytes, {} live", self.count);

    Ok(id)
  }

  /// Unlinks a pool from the ring. The caller's storage is left as is.
  ///
  /// # Errors
  ///
  /// Returns `NotFound` if `id` is not a live pool of this registry.
  pub fn destroy_pool(
    &mut self,
    id: PoolId,
  ) -> Result<()> {
    if !self.contains(id) {
      return Err(PoolError::NotFound { id });
    }

    let entry = self.entry(id.index);
    let (next, prev) = (entry.next, entry.prev);

    if next == id.index {
      self.head = None;
    } else {
      self.entry_mut(prev).next = next;
      self.entry_mut(next).prev = prev;
      if self.head == Some(id.index) {
        self.head = Some(next);
      }
    }

    let slot = &mut self.slots[id.index];
    slot.entry = None;
    match slot.generation.checked_add(1) {
      Some(generation) => {
        slot.generation = generation;
        self.vacant.push(id.index);
      }
      // Out of generations: the slot is never handed out again.
      None => debug!("registry: retired slot {}", id.index),
    }
    self.count -= 1;

    debug!("registry: destroyed pool {id}, {} live", self.count);

    Ok(())
  }

  pub fn contains(
    &self,
    id: PoolId,
  ) -> bool {
    self.pool(id).is_some()
  }

  pub fn pool(
    &self,
    id: PoolId,
  ) -> Option<&Pool<'a>> {
    let slot = self.slots.get(id.index)?;
    if slot.generation != id.generation {
      return None;
    }
    slot.entry.as_ref().map(|entry| &entry.pool)
  }

  pub fn pool_mut(
    &mut self,
    id: PoolId,
  ) -> Option<&mut Pool<'a>> {
    let slot = self.slots.get_mut(id.index)?;
    if slot.generation != id.generation {
      return None;
    }
    slot.entry.as_mut().map(|entry| &mut entry.pool)
  }

  /// See [`Pool::allocate`].
  ///
  /// # Errors
  ///
  /// Returns `InvalidArgument` for an unknown pool, otherwise whatever the
  /// pool returns.
  pub fn allocate(
    &mut self,
    id: PoolId,
    size: usize,
  ) -> Result<NonNull<u8>> {
    self
      .pool_mut(id)
      .ok_or(PoolError::invalid("unknown pool"))?
      .allocate(size)
  }

  /// See [`Pool::release`].
  ///
  /// # Errors
  ///
  /// Returns `InvalidArgument` for an unknown pool, otherwise whatever the
  /// pool returns.
  pub fn release(
    &mut self,
    id: PoolId,
    ptr: NonNull<u8>,
    size: usize,
  ) -> Result<()> {
    self
      .pool_mut(id)
      .ok_or(PoolError::invalid("unknown pool"))?
      .release(ptr, size)
  }

  /// Walks the ring forward from the head, visiting every live pool once.
  pub fn iter(&self) -> Iter<'_, 'a> {
    Iter {
      registry: self,
      next: self.head,
      remaining: self.count,
    }
  }

  fn id_at(
    &self,
    index: usize,
  ) -> PoolId {
    PoolId::new(index, self.slots[index].generation)
  }

  // Callers only pass indices taken from live ring links.
  fn entry(
    &self,
    index: usize,
  ) -> &Entry<'a> {
    match &self.slots[index].entry {
      Some(entry) => entry,
      None => unreachable!("ring link to vacant slot {index}"),
    }
  }

  fn entry_mut(
    &mut self,
    index: usize,
  ) -> &mut Entry<'a> {
    match &mut self.slots[index].entry {
      Some(entry) => entry,
      None => unreachable!("ring link to vacant slot {index}"),
    }
  }
}

pub struct Iter<'r, 'a> {
  registry: &'r PoolRegistry<'a>,
  next: Option<usize>,
  remaining: usize,
}

impl<'r, 'a> Iterator for Iter<'r, 'a> {
  type Item = &'r Pool<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    let entry = self.registry.entry(self.next?);
    self.next = Some(entry.next);
    self.remaining -= 1;
    Some(&entry.pool)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl<'r, 'a> IntoIterator for &'r PoolRegistry<'a> {
  type Item = &'r Pool<'a>;
  type IntoIter = Iter<'r, 'a>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

#[cfg(test)]
mod tests {
  use test_log::test;

  use super::*;
  use crate::config::TailPolicy;

  fn registry<'a>() -> PoolRegistry<'a> {
    PoolRegistry::with_config(PoolConfig::default().with_granularity(4)).unwrap()
  }

  /// Checks both link directions and returns the forward walk.
  fn assert_ring(registry: &PoolRegistry<'_>) -> Vec<PoolId> {
    let Some(head) = registry.head else {
      assert_eq!(registry.len(), 0);
      return Vec::new();
    };

    let mut forward = vec![head];
    let mut index = registry.entry(head).next;
    while index != head {
      forward.push(index);
      assert!(forward.len() <= registry.len(), "forward walk does not close");
      index = registry.entry(index).next;
    }

    let mut backward = vec![head];
    let mut index = registry.entry(head).prev;
    while index != head {
      backward.push(index);
      assert!(backward.len() <= registry.len(), "backward walk does not close");
      index = registry.entry(index).prev;
    }
    backward[1..].reverse();

    assert_eq!(forward.len(), registry.len());
    assert_eq!(forward, backward);

    forward.into_iter().map(|index| registry.id_at(index)).collect()
  }

  #[test]
  fn test_first_pool_is_singleton_ring() {
    let mut storage = [0u8; 50];
    let mut registry = registry();

    let id = registry.create_pool(&mut storage, 50).unwrap();

    let entry = registry.entry(id.index());
    assert_eq!(entry.next, id.index());
    assert_eq!(entry.prev, id.index());
    assert_eq!(registry.head(), Some(id));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.pool(id).unwrap().size(), 48);
  }

  #[test]
  fn test_new_pools_are_spliced_before_head() {
    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    let mut c = [0u8; 16];
    let mut registry = registry();

    let pa = registry.create_pool(&mut a, 16).unwrap();
    let pb = registry.create_pool(&mut b, 16).unwrap();
    let pc = registry.create_pool(&mut c, 16).unwrap();

    assert_eq!(registry.head(), Some(pa));
    assert_eq!(assert_ring(&registry), vec![pa, pb, pc]);
    assert_eq!(
      registry.iter().map(|pool| pool.id()).collect::<Vec<_>>(),
      vec![pa, pb, pc]
    );
  }

  #[test]
  fn test_create_rejects_invalid_storage() {
    let mut empty: [u8; 0] = [];
    let mut small = [0u8; 3];
    let mut storage = [0u8; 8];
    let mut registry = registry();

    for result in [
      registry.create_pool(&mut empty, 0),
      registry.create_pool(&mut small, 3),
      registry.create_pool(&mut storage, 0),
    ] {
      assert!(matches!(result, Err(PoolError::InvalidArgument { .. })));
    }

    assert!(registry.is_empty());
    assert_eq!(registry.head(), None);
  }

  #[test]
  fn test_create_rejects_size_beyond_storage() {
    let mut storage = [0u8; 8];
    let mut registry = registry();

    assert!(matches!(
      registry.create_pool(&mut storage, 9),
      Err(PoolError::InvalidArgument { .. })
    ));
    assert!(registry.is_empty());
  }

  #[test]
  fn test_destroy_relinks_neighbours() {
    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    let mut c = [0u8; 16];
    let mut d = [0u8; 16];
    let mut registry = registry();

    let pa = registry.create_pool(&mut a, 16).unwrap();
    let pb = registry.create_pool(&mut b, 16).unwrap();
    let pc = registry.create_pool(&mut c, 16).unwrap();
    let pd = registry.create_pool(&mut d, 16).unwrap();

    registry.destroy_pool(pc).unwrap();
    assert_eq!(assert_ring(&registry), vec![pa, pb, pd]);

    registry.destroy_pool(pa).unwrap();
    assert_eq!(registry.head(), Some(pb));
    assert_eq!(assert_ring(&registry), vec![pb, pd]);

    registry.destroy_pool(pd).unwrap();
    assert_eq!(assert_ring(&registry), vec![pb]);

    registry.destroy_pool(pb).unwrap();
    assert_eq!(assert_ring(&registry), vec![]);
    assert!(registry.is_empty());
    assert_eq!(registry.iter().count(), 0);
  }

  #[test]
  fn test_destroy_unknown_pool_is_not_found() {
    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    let mut registry = registry();

    let pa = registry.create_pool(&mut a, 16).unwrap();
    let pb = registry.create_pool(&mut b, 16).unwrap();
    registry.destroy_pool(pb).unwrap();

    assert_eq!(registry.destroy_pool(pb), Err(PoolError::NotFound { id: pb }));

    let bogus = PoolId::new(42, 0);
    assert_eq!(
      registry.destroy_pool(bogus),
      Err(PoolError::NotFound { id: bogus })
    );

    assert_eq!(assert_ring(&registry), vec![pa]);
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn test_slot_reuse_bumps_generation() {
    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    let mut registry = registry();

    let pa = registry.create_pool(&mut a, 16).unwrap();
    registry.destroy_pool(pa).unwrap();
    let pb = registry.create_pool(&mut b, 16).unwrap();

    assert_eq!(pa.index(), pb.index());
    assert_ne!(pa, pb);
    assert!(!registry.contains(pa));
    assert!(registry.contains(pb));
    assert!(matches!(
      registry.allocate(pa, 4),
      Err(PoolError::InvalidArgument { .. })
    ));
  }

  #[test]
  fn test_ring_closure_under_churn() {
    let mut storages: Vec<[u8; 8]> = vec![[0u8; 8]; 12];
    let mut registry = registry();
    let mut live = Vec::new();

    for (i, storage) in storages.iter_mut().enumerate() {
      live.push(registry.create_pool(storage, 8).unwrap());
      if i % 3 == 2 {
        let victim = live.remove(i % live.len());
        registry.destroy_pool(victim).unwrap();
      }
      let ring = assert_ring(&registry);
      assert_eq!(ring.len(), live.len());
      for id in &live {
        assert!(ring.contains(id));
      }
    }
  }

  #[test]
  fn test_pools_are_independent() {
    let mut a = [0u8; 16];
    let mut b = [0u8; 32];
    let mut registry = registry();

    let pa = registry.create_pool(&mut a, 16).unwrap();
    let pb = registry.create_pool(&mut b, 32).unwrap();

    registry.allocate(pa, 16).unwrap();
    assert!(matches!(
      registry.allocate(pa, 4),
      Err(PoolError::OutOfMemory { .. })
    ));

    let ptr = registry.allocate(pb, 8).unwrap();
    assert_eq!(registry.pool(pb).unwrap().cursor(), 8);

    assert!(matches!(
      registry.release(pa, ptr, 8),
      Err(PoolError::ForeignPointer { .. })
    ));
    registry.release(pb, ptr, 8).unwrap();
    assert_eq!(registry.pool(pb).unwrap().free_list().len(), 1);
  }

  #[test]
  fn test_config_is_shared_by_pools() {
    let config = PoolConfig::default()
      .with_granularity(8)
      .with_tail_policy(TailPolicy::Retract);
    let mut storage = [0u8; 30];
    let mut registry = PoolRegistry::with_config(config).unwrap();

    let id = registry.create_pool(&mut storage, 30).unwrap();
    let ptr = registry.allocate(id, 3).unwrap();
    assert_eq!(registry.pool(id).unwrap().size(), 24);
    assert_eq!(registry.pool(id).unwrap().cursor(), 8);

    registry.release(id, ptr, 3).unwrap();
    assert_eq!(registry.pool(id).unwrap().cursor(), 0);

    assert!(PoolRegistry::with_config(PoolConfig::default().with_granularity(6)).is_err());
  }

  #[test]
  fn test_exhausted_slot_is_retired() {
    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    let mut c = [0u8; 16];
    let mut registry = registry();

    let pa = registry.create_pool(&mut a, 16).unwrap();
    registry.destroy_pool(pa).unwrap();
    registry.slots[pa.index()].generation = u32::MAX;

    let pb = registry.create_pool(&mut b, 16).unwrap();
    assert_eq!(pb.index(), pa.index());
    registry.destroy_pool(pb).unwrap();
    assert!(registry.vacant.is_empty());

    let pc = registry.create_pool(&mut c, 16).unwrap();
    assert_ne!(pc.index(), pb.index());
    assert!(!registry.contains(pb));
    assert_eq!(registry.destroy_pool(pb), Err(PoolError::NotFound { id: pb }));
    assert_eq!(assert_ring(&registry), vec![pc]);
  }

  mod properties {
    use proptest::prelude::*;

    use super::super::*;
    use super::assert_ring;

    proptest! {
      #![proptest_config(ProptestConfig::with_cases(128))]

      #[test]
      fn create_destroy_sequences_keep_ring_closed(
        ops in prop::collection::vec((any::<bool>(), any::<usize>()), 1..64),
      ) {
        let mut storages = vec![[0u8; 8]; 64];
        let mut spare = storages.iter_mut();
        let mut registry = PoolRegistry::with_config(PoolConfig::default().with_granularity(4)).unwrap();
        let mut live: Vec<PoolId> = Vec::new();
        let mut dead: Vec<PoolId> = Vec::new();

        for (create, pick) in ops {
          if create || live.is_empty() {
            let Some(storage) = spare.next() else { break };
            let id = registry.create_pool(storage, 8).unwrap();
            prop_assert!(!live.contains(&id));
            live.push(id);
          } else {
            let id = live.remove(pick % live.len());
            registry.destroy_pool(id).unwrap();
            dead.push(id);
          }

          let ring = assert_ring(&registry);
          prop_assert_eq!(ring.len(), live.len());
          prop_assert_eq!(registry.len(), live.len());
          for id in &live {
            prop_assert!(ring.contains(id));
          }
          for id in &dead {
            prop_assert!(!registry.contains(*id));
            prop_assert_eq!(registry.destroy_pool(*id), Err(PoolError::NotFound { id: *id }));
          }
        }
      }
    }
  }
}
