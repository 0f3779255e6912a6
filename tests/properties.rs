use std::ptr::{self, NonNull};

use rarena::{AllocError, Arena, ChunkInfo, Corruption, HEADER_SIZE, Status, WORD, align};

const C: usize = rarena::DEFAULT_CAPACITY;

fn chain<const N: usize>(arena: &Arena<N>) -> Vec<ChunkInfo> {
  arena.inspect().collect::<Result<_, _>>().unwrap()
}

fn assert_partition<const N: usize>(arena: &Arena<N>) {
  let total: usize = chain(arena).iter().map(|chunk| HEADER_SIZE + chunk.size).sum();
  assert_eq!(total, N);
}

fn assert_no_adjacent_free<const N: usize>(arena: &Arena<N>) {
  for pair in chain(arena).windows(2) {
    assert!(
      !(pair[0].is_free() && pair[1].is_free()),
      "free chunks at offsets {} and {} were left unmerged",
      pair[0].offset,
      pair[1].offset
    );
  }
}

/// Small deterministic generator so the mixed workload is reproducible.
struct Lcg(u64);

impl Lcg {
  fn next(&mut self) -> u64 {
    self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    self.0 >> 33
  }
}

#[test]
fn partition_and_coalescing_hold_under_mixed_workload() {
  let arena: Arena = Arena::new();
  let mut live: Vec<NonNull<u8>> = Vec::new();
  let mut rng = Lcg(0x5EED);

  for _ in 0..2000 {
    if live.is_empty() || rng.next() % 3 != 0 {
      let size = (rng.next() % 300 + 1) as usize;
      match arena.allocate(size) {
        Ok(ptr) => live.push(ptr),
        Err(err) => assert_eq!(err, AllocError::OutOfMemory { requested: size }),
      }
    } else {
      let victim = live.swap_remove(rng.next() as usize % live.len());
      arena.release(victim.as_ptr()).unwrap();
      assert_no_adjacent_free(&arena);
    }

    assert_partition(&arena);
  }

  for ptr in live.drain(..) {
    arena.release(ptr.as_ptr()).unwrap();
  }

  let chunks = chain(&arena);
  assert_eq!(chunks.len(), 1);
  assert_eq!(chunks[0].size, C - HEADER_SIZE);
}

#[test]
fn fresh_arena_has_one_free_chunk() {
  let mut arena: Arena = Arena::new();
  arena.allocate(64).unwrap();
  arena.init();

  let chunks = chain(&arena);

  assert_eq!(chunks.len(), 1);
  assert_eq!(chunks[0].status, Status::Free);
  assert_eq!(chunks[0].size, C - HEADER_SIZE);
  assert_eq!(arena.header_size(), HEADER_SIZE);
  assert_eq!(arena.capacity(), C);
}

#[test]
fn allocation_takes_an_aligned_chunk() {
  for n in [1, 7, 8, 9, 200, 1000, C - HEADER_SIZE] {
    let arena: Arena = Arena::new();

    let ptr = arena.allocate(n).unwrap();
    let chunk = arena.chunk_of(ptr.as_ptr()).unwrap();

    assert_eq!(chunk.size, align!(n));
    assert_eq!(chunk.status, Status::Allocated);
    assert_eq!(chunk.address + HEADER_SIZE, ptr.as_ptr().addr());
  }
}

#[test]
fn out_of_range_sizes_are_rejected_without_side_effects() {
  let arena: Arena = Arena::new();
  arena.allocate(32).unwrap();
  let before = chain(&arena);

  let max = C - HEADER_SIZE;
  assert_eq!(
    arena.allocate(0),
    Err(AllocError::InvalidSize { requested: 0, max })
  );
  assert_eq!(
    arena.allocate(max + 1),
    Err(AllocError::InvalidSize {
      requested: max + 1,
      max
    })
  );
  assert_eq!(
    arena.allocate(usize::MAX),
    Err(AllocError::InvalidSize {
      requested: usize::MAX,
      max
    })
  );

  assert_eq!(chain(&arena), before);
}

#[test]
fn exhausted_arena_reports_out_of_memory() {
  let arena: Arena = Arena::new();

  let err = loop {
    if let Err(err) = arena.allocate(WORD) {
      break err;
    }
  };

  assert_eq!(err, AllocError::OutOfMemory { requested: WORD });
  assert_eq!(arena.stats().unwrap().free_bytes, 0);

  let before = chain(&arena);
  assert_eq!(arena.allocate(1), Err(AllocError::OutOfMemory { requested: 1 }));
  assert_eq!(chain(&arena), before);
  assert_partition(&arena);
}

#[test]
fn released_region_is_reused_first() {
  let arena: Arena = Arena::new();

  let p1 = arena.allocate(200).unwrap();
  let _p2 = arena.allocate(100).unwrap();
  arena.release(p1.as_ptr()).unwrap();

  for k in [1, 100, 200] {
    let reused = arena.allocate(k).unwrap();
    assert_eq!(reused, p1);
    arena.release(reused.as_ptr()).unwrap();
  }
}

fn three_allocated(arena: &Arena) -> [NonNull<u8>; 3] {
  [
    arena.allocate(40).unwrap(),
    arena.allocate(56).unwrap(),
    arena.allocate(24).unwrap(),
  ]
}

#[test]
fn coalescing_is_order_independent() {
  let forward: Arena = Arena::new();
  let [a, b, c] = three_allocated(&forward);
  forward.release(a.as_ptr()).unwrap();
  forward.release(b.as_ptr()).unwrap();

  let backward: Arena = Arena::new();
  let [a2, b2, _] = three_allocated(&backward);
  backward.release(b2.as_ptr()).unwrap();
  backward.release(a2.as_ptr()).unwrap();

  let merged = chain(&forward);
  assert_eq!(merged[0].size, 40 + 56 + HEADER_SIZE);
  assert_eq!(merged[0].status, Status::Free);
  assert_eq!(merged[1].status, Status::Allocated);
  assert_eq!(forward.chunk_of(c.as_ptr()).unwrap(), merged[1]);

  let shape = |chunks: Vec<ChunkInfo>| {
    chunks
      .into_iter()
      .map(|chunk| (chunk.offset, chunk.size, chunk.status))
      .collect::<Vec<_>>()
  };
  assert_eq!(shape(merged), shape(chain(&backward)));
}

#[test]
fn live_payloads_survive_release_and_reuse_of_a_neighbour() {
  let arena: Arena = Arena::new();

  let first = arena.allocate(64).unwrap().as_ptr();
  let second = arena.allocate(64).unwrap().as_ptr();

  unsafe {
    for i in 0..64 {
      first.add(i).write(i as u8);
      second.add(i).write(0xC0 | (i as u8 & 0x0F));
    }
  }

  arena.release(first).unwrap();
  let reused = arena.allocate(32).unwrap().as_ptr();
  assert_eq!(reused, first);

  unsafe {
    reused.write_bytes(0xEE, 32);

    for i in 0..64 {
      assert_eq!(second.add(i).read(), 0xC0 | (i as u8 & 0x0F));
    }
  }

  arena.release(second).unwrap();
  arena.release(reused).unwrap();
  assert_eq!(chain(&arena).len(), 1);
}

#[test]
fn double_free_is_detected() {
  let arena: Arena = Arena::new();

  let ptr = arena.allocate(64).unwrap();
  arena.allocate(64).unwrap();
  arena.release(ptr.as_ptr()).unwrap();
  let before = chain(&arena);

  assert_eq!(
    arena.release(ptr.as_ptr()),
    Err(AllocError::DoubleFree { offset: 0 })
  );
  assert_eq!(chain(&arena), before);
  assert_partition(&arena);
}

#[test]
fn null_release_leaves_the_chain_alone() {
  let arena: Arena = Arena::new();
  let ptr = arena.allocate(48).unwrap();
  arena.write_payload(ptr.as_ptr(), 0, &[0x5A; 48]).unwrap();
  let before = (chain(&arena), arena.to_string());

  assert_eq!(
    arena.release(ptr::null_mut()),
    Err(AllocError::InvalidArgument { address: 0 })
  );

  assert_eq!((chain(&arena), arena.to_string()), before);
  let mut contents = [0u8; 48];
  arena.read_payload(ptr.as_ptr(), 0, &mut contents).unwrap();
  assert_eq!(contents, [0x5A; 48]);
}

#[test]
fn overrun_into_a_header_is_reported_as_corruption() {
  let arena: Arena = Arena::new();

  let ptr = arena.allocate(16).unwrap();
  unsafe { ptr.as_ptr().add(16).write_bytes(0xFF, HEADER_SIZE) };

  let corrupted_at = 16 + HEADER_SIZE;
  assert!(matches!(
    arena.verify(),
    Err(AllocError::CorruptedChunk { offset, .. }) if offset == corrupted_at
  ));
  assert!(matches!(
    arena.allocate(8),
    Err(AllocError::CorruptedChunk { .. })
  ));
  assert!(matches!(
    arena.release(ptr.as_ptr()),
    Err(AllocError::CorruptedChunk { .. })
  ));

  let first = arena.inspect().next().unwrap().unwrap();
  assert_eq!(first.status, Status::Allocated);
}

#[test]
fn truncated_chain_is_reported() {
  let arena: Arena<256> = Arena::new();

  let ptr = arena.allocate(8).unwrap();
  // Shrink the free tail so it no longer reaches the arena end.
  unsafe { ptr.as_ptr().add(8).cast::<usize>().write_unaligned(WORD) };

  assert_eq!(
    arena.verify(),
    Err(AllocError::CorruptedChunk {
      offset: HEADER_SIZE + 8,
      reason: Corruption::Truncated
    })
  );
  assert_eq!(arena.inspect().count(), 2);
  assert!(arena.inspect().nth(1).unwrap().is_err());
}
