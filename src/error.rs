use thiserror::Error;

/// Failures reported by [`Arena`](crate::Arena) operations.
///
/// Every variant leaves the chunk chain exactly as it was before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// Requested size is zero or larger than any chunk could ever hold.
  #[error("invalid allocation size {requested}: must be between 1 and {max} bytes")]
  InvalidSize { requested: usize, max: usize },

  /// No free chunk is large enough for the (aligned) request.
  #[error("out of memory: no free chunk can hold {requested} bytes")]
  OutOfMemory { requested: usize },

  /// Pointer is null, outside the arena, or not the payload start of a chunk.
  #[error("invalid argument: {address:#x} is not a payload pointer of this arena")]
  InvalidArgument { address: usize },

  /// Chunk behind the pointer is already free.
  #[error("double free of chunk at offset {offset}")]
  DoubleFree { offset: usize },

  /// The chain no longer partitions the arena.
  #[error("corrupted chunk at offset {offset}: {reason}")]
  CorruptedChunk { offset: usize, reason: Corruption },
}

/// What was wrong with a chunk reported as [`AllocError::CorruptedChunk`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
  /// The header or its payload reaches past the end of the arena.
  #[error("header or payload extends past the arena end")]
  OutOfBounds,
  /// `next` is not the offset right after this chunk's payload.
  #[error("next link does not point at the following boundary")]
  BrokenLink,
  /// The status word holds neither the free nor the allocated tag.
  #[error("status word is neither free nor allocated")]
  UnknownStatus,
  /// The size word is not a multiple of [`WORD`](crate::WORD).
  #[error("size is not a multiple of the word size")]
  Misaligned,
  /// The chunk has no successor but stops short of the arena end.
  #[error("last chunk ends before the arena end")]
  Truncated,
}

impl AllocError {
  pub(crate) const fn corrupted(
    offset: usize,
    reason: Corruption,
  ) -> Self {
    AllocError::CorruptedChunk { offset, reason }
  }
}
