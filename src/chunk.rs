use crate::align::WORD;

/// Bytes of in-band metadata in front of every chunk payload.
///
/// A header is three native words: payload size, status tag and the
/// offset of the next header (or [`NO_NEXT`] for the last chunk).
pub const HEADER_SIZE: usize = 3 * WORD;

/// Offset stored in the `next` word of the last chunk.
const NO_NEXT: usize = usize::MAX;

const FREE_TAG: usize = 0xF4EE;
const ALLOCATED_TAG: usize = 0xA110C;

/// Whether a chunk's payload is available or handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
  /// Available to the next fitting request.
  Free,
  /// Owned by a caller until released.
  Allocated,
}

impl Status {
  const fn tag(self) -> usize {
    match self {
      Status::Free => FREE_TAG,
      Status::Allocated => ALLOCATED_TAG,
    }
  }

  const fn from_tag(tag: usize) -> Option<Self> {
    match tag {
      FREE_TAG => Some(Status::Free),
      ALLOCATED_TAG => Some(Status::Allocated),
      _ => None,
    }
  }
}

/// Decoded chunk header. `next` is a byte offset into the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
  pub size: usize,
  pub status: Status,
  pub next: Option<usize>,
}

/// Why a header could not be decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UnknownStatus;

impl Header {
  pub const fn new(
    size: usize,
    status: Status,
    next: Option<usize>,
  ) -> Self {
    Self { size, status, next }
  }

  pub const fn is_free(&self) -> bool {
    matches!(self.status, Status::Free)
  }

  pub const fn encode(&self) -> [u8; HEADER_SIZE] {
    let next = match self.next {
      Some(offset) => offset,
      None => NO_NEXT,
    };
    let words = [self.size, self.status.tag(), next];

    let mut bytes = [0u8; HEADER_SIZE];
    let mut w = 0;
    while w < words.len() {
      let word = words[w].to_ne_bytes();
      let mut i = 0;
      while i < WORD {
        bytes[w * WORD + i] = word[i];
        i += 1;
      }
      w += 1;
    }
    bytes
  }

  pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, UnknownStatus> {
    let mut words = [0usize; 3];
    for (word, raw) in words.iter_mut().zip(bytes.chunks_exact(WORD)) {
      let mut buf = [0u8; WORD];
      buf.copy_from_slice(raw);
      *word = usize::from_ne_bytes(buf);
    }

    let status = Status::from_tag(words[1]).ok_or(UnknownStatus)?;
    let next = match words[2] {
      NO_NEXT => None,
      offset => Some(offset),
    };

    Ok(Self::new(words[0], status, next))
  }
}
