//! # rarena - A Fixed-Capacity First-Fit Allocator
//!
//! This crate provides a self-hosted **free-list allocator** that serves
//! every request from one statically sized byte arena. It never asks the
//! operating system or a system allocator for memory, which makes it usable
//! on embedded targets, in teaching kernels and inside sandboxes.
//!
//! ## Overview
//!
//! The arena is cut into chunks. Each chunk starts with a small header
//! followed by its payload, and the headers form a chain that covers the
//! whole arena, free and allocated chunks alike:
//!
//! ```text
//!   Arena (capacity C):
//!
//!   ┌────────┬──────────┬────────┬──────────┬────────┬────────────────────┐
//!   │ header │ payload  │ header │ payload  │ header │      payload       │
//!   │ ALLOC  │  200 B   │ ALLOC  │  104 B   │  FREE  │    remaining       │
//!   └────────┴──────────┴────────┴──────────┴────────┴────────────────────┘
//!   ▲ base     ▲                                                         ▲
//!              └── pointer returned to the user                    base + C
//!
//!   Σ (HEADER_SIZE + size) over all chunks == C, always.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rarena
//!   ├── align      - Word size and the align! macro
//!   ├── chunk      - In-band chunk header and its byte layout
//!   ├── error      - AllocError / Corruption
//!   ├── arena      - Arena: init, allocate, release
//!   ├── inspect    - Read-only chain walk, verification, stats
//!   └── locked     - LockedArena: spin-locked arena and GlobalAlloc
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rarena::Arena;
//!
//! let arena: Arena = Arena::new();
//!
//! let ptr = arena.allocate(200)?;
//! arena.write_payload(ptr.as_ptr(), 0, &[0xAB; 200])?;
//!
//! arena.release(ptr.as_ptr())?;
//! assert_eq!(arena.stats()?.chunks, 1);
//! # Ok::<(), rarena::AllocError>(())
//! ```
//!
//! ## How It Works
//!
//! **Allocation** rounds the request up to the word size and walks the
//! chain from the start. The first free chunk that is large enough wins.
//! If it has room for another header plus some payload past the request,
//! it is split:
//!
//! ```text
//!   before:  ┌────────┬──────────────────────────────────────┐
//!            │  FREE  │               size                   │
//!            └────────┴──────────────────────────────────────┘
//!
//!   after:   ┌────────┬───────────┬────────┬─────────────────┐
//!            │ ALLOC  │  aligned  │  FREE  │ size - aligned  │
//!            │        │   size    │        │   - HEADER_SIZE │
//!            └────────┴───────────┴────────┴─────────────────┘
//! ```
//!
//! **Release** marks the chunk free and makes one pass over the chain,
//! folding every free chunk into a free predecessor. A run of any length
//! collapses in that single pass, so no two neighbouring chunks are ever
//! both free once `release` returns.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`Arena`] has no internal locking; wrap it in
//!   [`LockedArena`] to share it.
//! - **Word alignment only**: payloads are aligned to `usize`, nothing more.
//! - **No resizing**: there is no `realloc`.
//!
//! ## Safety
//!
//! All bookkeeping uses offsets into the arena's own buffer, and every
//! pointer passed to [`Arena::release`] is checked against the chain before
//! anything is written. The buffer lives in an `UnsafeCell` and is only
//! touched through one raw base pointer, so `allocate` and `release` take
//! `&self` and never invalidate payload pointers handed out earlier.
//! Dereferencing a returned pointer is up to the caller;
//! [`Arena::read_payload`] and [`Arena::write_payload`] offer checked
//! copies instead.

pub mod align;
mod arena;
mod chunk;
mod error;
mod inspect;
mod locked;

pub use align::WORD;
pub use arena::{Arena, DEFAULT_CAPACITY};
pub use chunk::{HEADER_SIZE, Status};
pub use error::{AllocError, Corruption};
pub use inspect::{ChunkInfo, Chunks, Stats};
pub use locked::LockedArena;
