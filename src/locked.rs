use core::{
  alloc::{GlobalAlloc, Layout},
  ptr,
};

use log::warn;
use spin::{Mutex, MutexGuard};

use crate::{
  align::WORD,
  arena::{Arena, DEFAULT_CAPACITY},
};

/// An [`Arena`] behind a spin lock, usable from several threads and as a
/// `#[global_allocator]`.
///
/// Every operation holds the lock for its whole duration. Pointers stay
/// valid because the arena lives inside `self`, which a global allocator
/// keeps in a `static`.
///
/// ```rust,ignore
/// #[global_allocator]
/// static HEAP: rarena::LockedArena = rarena::LockedArena::new();
/// ```
///
/// The arena emits `log` records while the lock is held. When it is the
/// global allocator, install no logger that allocates, or the allocation
/// re-enters the lock and spins forever.
pub struct LockedArena<const C: usize = DEFAULT_CAPACITY> {
  arena: Mutex<Arena<C>>,
}

impl<const C: usize> LockedArena<C> {
  /// Creates a locked, already initialized arena. Usable in a `static`.
  pub const fn new() -> Self {
    Self {
      arena: Mutex::new(Arena::new()),
    }
  }

  /// Spins until the arena is free, then hands it out for any number of
  /// operations under one lock.
  pub fn lock(&self) -> MutexGuard<'_, Arena<C>> {
    self.arena.lock()
  }

  /// See [`Arena::init`].
  pub fn init(&self) {
    self.lock().init();
  }
}

impl<const C: usize> Default for LockedArena<C> {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl<const C: usize> GlobalAlloc for LockedArena<C> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > WORD {
      return ptr::null_mut();
    }

    self
      .lock()
      .allocate(layout.size())
      .map_or(ptr::null_mut(), |payload| payload.as_ptr())
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    let result = self.lock().release(ptr);

    // No error channel and no unwinding allowed here, so the rejection is
    // only reported. The guard is already dropped.
    if let Err(err) = result {
      warn!("dealloc of {ptr:p} ({} bytes) ignored: {err}", layout.size());
    }
  }
}
