use core::{cell::UnsafeCell, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  align,
  align::WORD,
  chunk::{HEADER_SIZE, Header, Status},
  error::{AllocError, Corruption},
  inspect::ChunkInfo,
};

/// Arena capacity used when no capacity is named.
pub const DEFAULT_CAPACITY: usize = 10240;

#[repr(C, align(16))]
struct Memory<const C: usize>([u8; C]);

/// A fixed-capacity byte arena carved into a chain of chunks.
///
/// Every chunk is an in-band [`HEADER_SIZE`]-byte header followed by its
/// payload. The chain always partitions the whole buffer: chunk `i + 1`
/// starts right where chunk `i` ends and the last chunk ends at `C`.
///
/// Payload pointers returned by [`Arena::allocate`] point into the arena's
/// own storage, so they are only meaningful while the arena stays where it
/// is. Keep the arena in a `static` (see [`LockedArena`](crate::LockedArena))
/// or behind a reference for as long as pointers are outstanding.
///
/// `allocate` and `release` take `&self`, so payload pointers stay usable
/// across later calls. Only [`Arena::init`] needs `&mut self`, and it
/// invalidates every pointer anyway.
pub struct Arena<const C: usize = DEFAULT_CAPACITY> {
  memory: UnsafeCell<Memory<C>>,
}

impl<const C: usize> Arena<C> {
  /// Creates an arena holding a single free chunk of `C - HEADER_SIZE` bytes.
  pub const fn new() -> Self {
    const {
      assert!(
        C % WORD == 0 && C >= HEADER_SIZE + WORD,
        "arena capacity must be a word multiple with room for one header and one word"
      )
    };

    let mut bytes = [0u8; C];
    let header = Self::fresh_header().encode();
    let mut i = 0;
    while i < HEADER_SIZE {
      bytes[i] = header[i];
      i += 1;
    }

    Self {
      memory: UnsafeCell::new(Memory(bytes)),
    }
  }

  const fn fresh_header() -> Header {
    Header::new(C - HEADER_SIZE, Status::Free, None)
  }

  /// Resets the arena to a single free chunk.
  ///
  /// This is destructive: every pointer handed out before the call is
  /// invalidated.
  pub fn init(&mut self) {
    self.write_header(0, &Self::fresh_header());
    debug!("arena reset: {} bytes, one free chunk of {} bytes", C, C - HEADER_SIZE);
  }

  /// Total bytes managed, headers included.
  pub const fn capacity(&self) -> usize {
    C
  }

  /// Bytes of metadata in front of every payload.
  pub const fn header_size(&self) -> usize {
    HEADER_SIZE
  }

  /// Largest request that can ever succeed, i.e. on a fresh arena.
  pub const fn max_request(&self) -> usize {
    C - HEADER_SIZE
  }

  /// Allocates `requested_size` bytes from the first free chunk that fits.
  ///
  /// The size is rounded up to the word size. If the chosen chunk has room
  /// for another header plus at least one byte past the request it is
  /// split, otherwise the whole chunk is handed out.
  pub fn allocate(
    &self,
    requested_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let max = self.max_request();
    if requested_size == 0 || requested_size > max {
      return Err(AllocError::InvalidSize {
        requested: requested_size,
        max,
      });
    }

    let size = align!(requested_size);

    let (offset, mut header) = self
      .find_free_chunk(size)?
      .ok_or(AllocError::OutOfMemory {
        requested: requested_size,
      })?;

    if header.size > size + HEADER_SIZE {
      let split = offset + HEADER_SIZE + size;
      let remainder = Header::new(header.size - size - HEADER_SIZE, Status::Free, header.next);
      self.write_header(split, &remainder);

      trace!(
        "split chunk at offset {offset}: {size} bytes taken, {} bytes free at offset {split}",
        remainder.size
      );

      header.size = size;
      header.next = Some(split);
    }

    header.status = Status::Allocated;
    self.write_header(offset, &header);

    debug!(
      "allocated {requested_size} bytes in chunk at offset {offset} ({} usable)",
      header.size
    );

    Ok(self.payload_ptr(offset + HEADER_SIZE))
  }

  /// Returns the chunk behind `ptr` to the arena and merges every run of
  /// adjacent free chunks.
  ///
  /// `ptr` must be a payload pointer returned by [`Arena::allocate`] that
  /// has not been released since. Anything else is rejected without
  /// touching the chain.
  pub fn release(
    &self,
    ptr: *mut u8,
  ) -> Result<(), AllocError> {
    let (offset, mut header) = self
      .locate(ptr)
      .and_then(|found| self.verify().map(|()| found))
      .inspect_err(|err| warn!("release of {ptr:p} rejected: {err}"))?;

    if header.is_free() {
      warn!("release of {ptr:p} rejected: chunk at offset {offset} is already free");
      return Err(AllocError::DoubleFree { offset });
    }

    header.status = Status::Free;
    self.write_header(offset, &header);

    let merged = self.coalesce()?;

    debug!(
      "released chunk at offset {offset} ({} bytes), merged {merged} chunk(s)",
      header.size
    );

    Ok(())
  }

  /// Resolves a payload pointer to the chunk that owns it.
  pub fn chunk_of(
    &self,
    ptr: *const u8,
  ) -> Result<ChunkInfo, AllocError> {
    let (offset, header) = self.locate(ptr)?;
    Ok(ChunkInfo::new(self.base().addr(), offset, &header))
  }

  /// Copies payload bytes of the allocated chunk behind `ptr`, starting
  /// `at` bytes into the payload, into `buf`.
  pub fn read_payload(
    &self,
    ptr: *const u8,
    at: usize,
    buf: &mut [u8],
  ) -> Result<(), AllocError> {
    let start = self.payload_range(ptr, at, buf.len())?;

    // Safety: `payload_range` checked that `start..start + buf.len()` lies
    // inside an allocated payload, and `buf` is caller memory.
    unsafe { core::ptr::copy_nonoverlapping(self.base().add(start), buf.as_mut_ptr(), buf.len()) };
    Ok(())
  }

  /// Copies `data` into the allocated chunk behind `ptr`, starting `at`
  /// bytes into the payload.
  pub fn write_payload(
    &self,
    ptr: *const u8,
    at: usize,
    data: &[u8],
  ) -> Result<(), AllocError> {
    let start = self.payload_range(ptr, at, data.len())?;

    // Safety: as in `read_payload`; payload bytes never overlap a header.
    unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), self.base().add(start), data.len()) };
    Ok(())
  }

  /// Raw base of the buffer. Every access to the arena goes through it so
  /// no reference to the buffer outlives a single call.
  pub(crate) fn base(&self) -> *mut u8 {
    self.memory.get().cast::<u8>()
  }

  pub(crate) fn read_header(
    &self,
    offset: usize,
  ) -> Result<Header, AllocError> {
    offset
      .checked_add(HEADER_SIZE)
      .filter(|end| *end <= C)
      .ok_or(AllocError::corrupted(offset, Corruption::OutOfBounds))?;

    // Safety: `offset + HEADER_SIZE <= C` was checked above.
    let bytes = unsafe { self.base().add(offset).cast::<[u8; HEADER_SIZE]>().read() };

    Header::decode(&bytes).map_err(|_| AllocError::corrupted(offset, Corruption::UnknownStatus))
  }

  /// Callers only pass offsets that were read from a verified chain.
  fn write_header(
    &self,
    offset: usize,
    header: &Header,
  ) {
    debug_assert!(offset + HEADER_SIZE <= C);

    // Safety: the offset lies on a boundary of the verified chain, so the
    // header fits inside the buffer.
    unsafe {
      self
        .base()
        .add(offset)
        .cast::<[u8; HEADER_SIZE]>()
        .write(header.encode())
    };
  }

  fn payload_ptr(
    &self,
    payload: usize,
  ) -> NonNull<u8> {
    // Safety: `payload < C` and the base of a live buffer is never null.
    unsafe { NonNull::new_unchecked(self.base().add(payload)) }
  }

  fn find_free_chunk(
    &self,
    size: usize,
  ) -> Result<Option<(usize, Header)>, AllocError> {
    for chunk in self.walk() {
      let (offset, header) = chunk?;

      if header.is_free() && header.size >= size {
        return Ok(Some((offset, header)));
      }
    }

    Ok(None)
  }

  /// Finds the chunk whose payload starts exactly at `ptr`.
  fn locate(
    &self,
    ptr: *const u8,
  ) -> Result<(usize, Header), AllocError> {
    let address = ptr.addr();
    let invalid = AllocError::InvalidArgument { address };

    let payload = address
      .checked_sub(self.base().addr())
      .filter(|payload| (HEADER_SIZE..C).contains(payload))
      .ok_or(invalid)?;
    let target = payload - HEADER_SIZE;

    for chunk in self.walk() {
      let (offset, header) = chunk?;

      if offset == target {
        return Ok((offset, header));
      }
      if offset > target {
        break;
      }
    }

    Err(invalid)
  }

  /// Arena offset of byte `at` of the allocated payload behind `ptr`, once
  /// `len` bytes from there are known to fit.
  fn payload_range(
    &self,
    ptr: *const u8,
    at: usize,
    len: usize,
  ) -> Result<usize, AllocError> {
    let (offset, header) = self.locate(ptr)?;

    if header.is_free() {
      return Err(AllocError::InvalidArgument { address: ptr.addr() });
    }

    let requested = at.saturating_add(len);
    if requested > header.size {
      return Err(AllocError::InvalidSize {
        requested,
        max: header.size,
      });
    }

    Ok(offset + HEADER_SIZE + at)
  }

  /// Merges every run of adjacent free chunks in one pass over the chain.
  ///
  /// The cursor stays put after a merge so the grown chunk is tested again
  /// against its new successor.
  fn coalesce(&self) -> Result<usize, AllocError> {
    let mut merged = 0;
    let mut offset = 0;
    let mut current = self.read_header(offset)?;

    while let Some(next_offset) = current.next {
      let next = self.read_header(next_offset)?;

      if current.is_free() && next.is_free() {
        current.size += HEADER_SIZE + next.size;
        current.next = next.next;
        self.write_header(offset, &current);
        merged += 1;

        trace!("merged chunk at offset {next_offset} into chunk at offset {offset}");
      } else {
        offset = next_offset;
        current = next;
      }
    }

    Ok(merged)
  }
}

impl<const C: usize> Default for Arena<C> {
  fn default() -> Self {
    Self::new()
  }
}
