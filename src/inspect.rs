use core::{fmt, iter::FusedIterator};

use crate::{
  align::WORD,
  arena::Arena,
  chunk::{HEADER_SIZE, Header, Status},
  error::{AllocError, Corruption},
};

/// Read-only view of one chunk, as seen by [`Arena::inspect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
  /// Offset of the chunk header from the arena base.
  pub offset: usize,
  /// Address of the chunk header.
  pub address: usize,
  /// Usable payload bytes.
  pub size: usize,
  /// Free or allocated.
  pub status: Status,
}

impl ChunkInfo {
  pub(crate) fn new(
    base: usize,
    offset: usize,
    header: &Header,
  ) -> Self {
    Self {
      offset,
      address: base + offset,
      size: header.size,
      status: header.status,
    }
  }

  /// Shorthand for `status == Status::Free`.
  pub const fn is_free(&self) -> bool {
    matches!(self.status, Status::Free)
  }

  /// Offset of the first payload byte.
  pub const fn payload_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// Offset one past the last payload byte.
  pub const fn end(&self) -> usize {
    self.offset + HEADER_SIZE + self.size
  }
}

/// Validating walk over the raw chain.
///
/// Each step checks that the chunk lies inside the arena and that its link
/// points at the boundary right after it. The walk stops at the first
/// violation.
pub(crate) struct Walk<'a, const C: usize> {
  arena: &'a Arena<C>,
  cursor: Option<usize>,
}

impl<const C: usize> Walk<'_, C> {
  fn step(
    &self,
    offset: usize,
  ) -> Result<Header, AllocError> {
    let header = self.arena.read_header(offset)?;

    if header.size % WORD != 0 {
      return Err(AllocError::corrupted(offset, Corruption::Misaligned));
    }

    let end = (offset + HEADER_SIZE)
      .checked_add(header.size)
      .filter(|end| *end <= C)
      .ok_or(AllocError::corrupted(offset, Corruption::OutOfBounds))?;

    match header.next {
      Some(next) if next != end || end == C => Err(AllocError::corrupted(offset, Corruption::BrokenLink)),
      None if end != C => Err(AllocError::corrupted(offset, Corruption::Truncated)),
      _ => Ok(header),
    }
  }
}

impl<const C: usize> Iterator for Walk<'_, C> {
  type Item = Result<(usize, Header), AllocError>;

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.cursor.take()?;

    Some(self.step(offset).map(|header| {
      self.cursor = header.next;
      (offset, header)
    }))
  }
}

/// Iterator returned by [`Arena::inspect`].
///
/// Yields every chunk in chain order. A corrupted chain yields one
/// [`AllocError::CorruptedChunk`] and then ends.
pub struct Chunks<'a, const C: usize> {
  base: usize,
  walk: Walk<'a, C>,
}

impl<const C: usize> Iterator for Chunks<'_, C> {
  type Item = Result<ChunkInfo, AllocError>;

  fn next(&mut self) -> Option<Self::Item> {
    let base = self.base;

    self
      .walk
      .next()
      .map(|step| step.map(|(offset, header)| ChunkInfo::new(base, offset, &header)))
  }
}

impl<const C: usize> FusedIterator for Chunks<'_, C> {}

/// Occupancy summary of an arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
  /// Arena size in bytes, headers included.
  pub capacity: usize,
  /// Chunks in the chain, free and allocated.
  pub chunks: usize,
  /// Chunks currently free.
  pub free_chunks: usize,
  /// Payload bytes across free chunks.
  pub free_bytes: usize,
  /// Payload bytes across allocated chunks, rounding included.
  pub allocated_bytes: usize,
  /// Payload size of the biggest free chunk; no larger request can succeed.
  pub largest_free: usize,
}

impl Stats {
  /// Bytes spent on headers.
  pub const fn overhead(&self) -> usize {
    self.chunks * HEADER_SIZE
  }
}

impl<const C: usize> Arena<C> {
  /// Walks the chain from the first chunk, without mutating anything.
  pub fn inspect(&self) -> Chunks<'_, C> {
    Chunks {
      base: self.base().addr(),
      walk: self.walk(),
    }
  }

  pub(crate) fn walk(&self) -> Walk<'_, C> {
    Walk {
      arena: self,
      cursor: Some(0),
    }
  }

  /// Checks that the chain still partitions the arena exactly.
  pub fn verify(&self) -> Result<(), AllocError> {
    self.walk().try_for_each(|step| step.map(drop))
  }

  /// Summarizes the chain in one walk.
  pub fn stats(&self) -> Result<Stats, AllocError> {
    self.inspect().try_fold(
      Stats {
        capacity: C,
        ..Stats::default()
      },
      |mut stats, chunk| {
        let chunk = chunk?;

        stats.chunks += 1;
        if chunk.is_free() {
          stats.free_chunks += 1;
          stats.free_bytes += chunk.size;
          stats.largest_free = stats.largest_free.max(chunk.size);
        } else {
          stats.allocated_bytes += chunk.size;
        }

        Ok(stats)
      },
    )
  }
}

impl<const C: usize> fmt::Display for Arena<C> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for chunk in self.inspect() {
      match chunk {
        Ok(chunk) => writeln!(
          f,
          "Start: {:#x} | Size: {} | Free: {}",
          chunk.address,
          chunk.size,
          if chunk.is_free() { "Yes" } else { "No" }
        )?,
        Err(err) => writeln!(f, "{err}")?,
      }
    }

    Ok(())
  }
}
