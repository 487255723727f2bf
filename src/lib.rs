//! # poolalloc - Fixed-Region Memory Pools
//!
//! This crate carves caller-supplied byte regions into blocks. Each region is
//! a **pool** with its own bump cursor and free list, and every pool lives in
//! a **registry** that keeps them on a circular ring.
//!
//! ## Overview
//!
//! ```text
//!   One pool over a caller buffer:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                        CALLER STORAGE                                │
//!   │                                                                      │
//!   │   ┌─────┬──────┬─────┬─────────┬──────────────────────────────────┐  │
//!   │   │ A1  │ free │ A3  │  free   │           untouched              │  │
//!   │   └─────┴──────┴─────┴─────────┴──────────────────────────────────┘  │
//!   │         ▲            ▲         ▲                                  ▲  │
//!   │         └─ free list ┘         │                                  │  │
//!   │                              Cursor                          Pool end│
//!   │                           (bump mark)                                │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation: first fit in the free list, else bump the cursor.
//!   Release: insert into the free list, merge with both neighbours.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   poolalloc
//!   ├── align      - Granularity rounding (align!, align_up, align_down)
//!   ├── block      - Free block descriptor
//!   ├── free_list  - Sorted, coalescing free list
//!   ├── pool       - Pool control block, allocate/release
//!   ├── registry   - Arena of pools linked as a ring
//!   ├── sync       - Mutex-wrapped registry for shared use
//!   ├── config     - Granularity and tail policy
//!   ├── stats      - Occupancy snapshots
//!   └── error      - PoolError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use poolalloc::{PoolConfig, PoolError, PoolRegistry};
//!
//! let mut storage = [0u8; 50];
//! let config = PoolConfig::default().with_granularity(4);
//! let mut registry = PoolRegistry::with_config(config).unwrap();
//!
//! let pool = registry.create_pool(&mut storage, 50).unwrap();
//!
//! let first = registry.allocate(pool, 10).unwrap(); // 12 bytes at offset 0
//! let _second = registry.allocate(pool, 25).unwrap(); // 28 bytes at offset 12
//! assert!(matches!(
//!     registry.allocate(pool, 20),
//!     Err(PoolError::OutOfMemory { .. })
//! ));
//!
//! registry.release(pool, first, 10).unwrap();
//! assert_eq!(registry.allocate(pool, 10).unwrap(), first);
//! ```
//!
//! ## Ownership
//!
//! ```text
//!   caller buffer ──&'a mut──▶ Pool<'a> ──owned by──▶ PoolRegistry<'a>
//!                                 │
//!                                 └──▶ NonNull<u8> handles (caller owns
//!                                      until released to the same pool)
//! ```
//!
//! The registry borrows each buffer for its whole lifetime and never frees,
//! resizes or clears it. Destroying a pool only unlinks it.
//!
//! ## Limitations
//!
//! - **Fixed regions**: pools never grow
//! - **First fit only**: no best-fit or size classes
//! - **Single-threaded core**: share through [`SharedPoolRegistry`]
//! - **Size on release**: callers pass the size they allocated with
//!
//! ## Safety
//!
//! Allocation handles are raw pointers. Writing through them is `unsafe` and
//! must stay within the aligned size that was requested.

pub mod align;
mod block;
mod config;
mod error;
mod free_list;
mod pool;
mod registry;
mod stats;
mod sync;

pub use block::FreeBlock;
pub use config::{PoolConfig, TailPolicy};
pub use error::{PoolError, Result};
pub use free_list::FreeList;
pub use pool::Pool;
pub use registry::{Iter, PoolId, PoolRegistry};
pub use stats::PoolStats;
pub use sync::SharedPoolRegistry;
