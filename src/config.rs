use crate::{
  align::WORD,
  error::{PoolError, Result},
};

/// What a release does when the freed region ends at the bump cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TailPolicy {
  /// Leave the cursor where it is; the free list serves the space later.
  #[default]
  Keep,
  /// Move the cursor back over the freed tail instead of listing it.
  Retract,
}

/// Settings shared by every pool of a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
  /// Allocation unit in bytes. Must be a nonzero power of two.
  pub granularity: usize,
  pub tail_policy: TailPolicy,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      granularity: WORD,
      tail_policy: TailPolicy::Keep,
    }
  }
}

impl PoolConfig {
  pub fn with_granularity(
    mut self,
    granularity: usize,
  ) -> Self {
    self.granularity = granularity;
    self
  }

  pub fn with_tail_policy(
    mut self,
    tail_policy: TailPolicy,
  ) -> Self {
    self.tail_policy = tail_policy;
    self
  }

  /// # Errors
  ///
  /// Returns `InvalidArgument` if the granularity is zero or not a power of two.
  pub fn validate(&self) -> Result<()> {
    if !self.granularity.is_power_of_two() {
      return Err(PoolError::invalid("granularity must be a nonzero power of two"));
    }
    Ok(())
  }
}
