/// Machine word size, the default allocation granularity.
pub const WORD: usize = core::mem::size_of::<usize>();

/// Rounds a size up to the machine word, or to an explicit power-of-two
/// granularity.
///
/// # Examples
///
/// ```rust
/// use poolalloc::align;
///
/// match core::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
///
/// assert_eq!(align!(10, 4), 12);
/// assert_eq!(align!(25, 4), 28);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align!($value, $crate::align::WORD)
  };
  ($value:expr, $granularity:expr) => {
    ($value + $granularity - 1) & !($granularity - 1)
  };
}

/// Smallest multiple of `granularity` that is `>= size`.
#[inline]
pub const fn align_up(
  size: usize,
  granularity: usize,
) -> usize {
  debug_assert!(granularity.is_power_of_two());
  align!(size, granularity)
}

/// Same as [`align_up`], but `None` when the result does not fit in a `usize`.
#[inline]
pub const fn checked_align_up(
  size: usize,
  granularity: usize,
) -> Option<usize> {
  debug_assert!(granularity.is_power_of_two());
  match size.checked_add(granularity - 1) {
    Some(bumped) => Some(bumped & !(granularity - 1)),
    None => None,
  }
}

/// Largest multiple of `granularity` that is `<= size`.
#[inline]
pub const fn align_down(
  size: usize,
  granularity: usize,
) -> usize {
  debug_assert!(granularity.is_power_of_two());
  size & !(granularity - 1)
}

#[inline]
pub const fn is_aligned(
  value: usize,
  granularity: usize,
) -> bool {
  value & (granularity - 1) == 0
}
