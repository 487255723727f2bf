use thiserror::Error;

use crate::registry::PoolId;

/// Errors returned by pool and registry operations.
///
/// A failing call never leaves a partial mutation behind.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
  #[error("invalid argument: {reason}")]
  InvalidArgument { reason: &'static str },

  #[error("out of memory (requested: {requested} bytes, available: {available} bytes)")]
  OutOfMemory { requested: usize, available: usize },

  #[error("double free detected at offset {offset:#x}")]
  DoubleFree { offset: usize },

  #[error("address {addr:#x} was not allocated from this pool")]
  ForeignPointer { addr: usize },

  #[error("pool {id} is not registered")]
  NotFound { id: PoolId },
}

impl PoolError {
  pub(crate) const fn invalid(reason: &'static str) -> Self {
    PoolError::InvalidArgument { reason }
  }
}

pub type Result<T> = core::result::Result<T, PoolError>;
