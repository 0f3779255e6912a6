/// Native alignment unit: the width of a pointer on the target.
pub const WORD: usize = core::mem::size_of::<usize>();

/// Rounds `value` up to the next multiple of [`WORD`].
///
/// # Examples
///
/// ```rust
/// use rarena::align;
///
/// match rarena::WORD {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align::align_up($value)
  };
}

/// `const` form of [`align!`]. The caller guarantees `value + WORD - 1`
/// does not overflow.
pub const fn align_up(value: usize) -> usize {
  (value + WORD - 1) & !(WORD - 1)
}
