//! Lock-protected registry for callers that share pools across threads.
//!
//! One mutex covers the ring and every pool in it, so ring splices and
//! allocate/release calls are serialized against each other. Operations never
//! block on anything but that lock.

use std::{
  ptr::NonNull,
  sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
  config::PoolConfig,
  error::{PoolError, Result},
  registry::{PoolId, PoolRegistry},
  stats::PoolStats,
};

#[derive(Debug, Default)]
pub struct SharedPoolRegistry<'a> {
  inner: Mutex<PoolRegistry<'a>>,
}

impl<'a> SharedPoolRegistry<'a> {
  pub fn new(registry: PoolRegistry<'a>) -> Self {
    Self {
      inner: Mutex::new(registry),
    }
  }

  /// # Errors
  ///
  /// Returns `InvalidArgument` if `config` does not validate.
  pub fn with_config(config: PoolConfig) -> Result<Self> {
    PoolRegistry::with_config(config).map(Self::new)
  }

  /// Exclusive access to the whole registry for multi-step work.
  ///
  /// Every operation leaves the registry consistent before returning, so a
  /// lock poisoned by a panicking caller is taken over rather than propagated.
  pub fn lock(&self) -> MutexGuard<'_, PoolRegistry<'a>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// See [`PoolRegistry::create_pool`].
  ///
  /// # Errors
  ///
  /// Same as [`PoolRegistry::create_pool`].
  pub fn create_pool(
    &self,
    storage: &'a mut [u8],
    size: usize,
  ) -> Result<PoolId> {
    self.lock().create_pool(storage, size)
  }

  /// See [`PoolRegistry::destroy_pool`].
  ///
  /// # Errors
  ///
  /// Same as [`PoolRegistry::destroy_pool`].
  pub fn destroy_pool(
    &self,
    id: PoolId,
  ) -> Result<()> {
    self.lock().destroy_pool(id)
  }

  /// See [`PoolRegistry::allocate`].
  ///
  /// # Errors
  ///
  /// Same as [`PoolRegistry::allocate`].
  pub fn allocate(
    &self,
    id: PoolId,
    size: usize,
  ) -> Result<NonNull<u8>> {
    self.lock().allocate(id, size)
  }

  /// See [`PoolRegistry::release`].
  ///
  /// # Errors
  ///
  /// Same as [`PoolRegistry::release`].
  pub fn release(
    &self,
    id: PoolId,
    ptr: NonNull<u8>,
    size: usize,
  ) -> Result<()> {
    self.lock().release(id, ptr, size)
  }

  /// # Errors
  ///
  /// Returns `NotFound` if `id` is not a live pool.
  pub fn stats(
    &self,
    id: PoolId,
  ) -> Result<PoolStats> {
    self
      .lock()
      .pool(id)
      .map(|pool| pool.stats())
      .ok_or(PoolError::NotFound { id })
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  pub fn into_inner(self) -> PoolRegistry<'a> {
    self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
  }
}
