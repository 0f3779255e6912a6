use rarena::{Arena, HEADER_SIZE};

/// Prints every chunk of the arena, in chain order.
fn print_chain(
  label: &str,
  arena: &Arena,
) {
  println!("\n[{label}]");
  print!("{arena}");
}

fn main() -> Result<(), rarena::AllocError> {
  // RUST_LOG=rarena=trace shows every split and merge.
  env_logger::init();

  let mut arena: Arena = Arena::new();
  arena.init();

  println!(
    "capacity = {} bytes, header = {} bytes",
    arena.capacity(),
    HEADER_SIZE
  );
  print_chain("initial", &arena);

  // --------------------------------------------------------------------
  // 1) Allocate 200 bytes. The single free chunk is split in two.
  // --------------------------------------------------------------------
  let first = arena.allocate(200)?;
  print_chain("after allocating 200 bytes", &arena);

  // --------------------------------------------------------------------
  // 2) Allocate 100 bytes. Rounded up to the word size.
  // --------------------------------------------------------------------
  let second = arena.allocate(100)?;
  print_chain("after allocating 100 bytes", &arena);

  // --------------------------------------------------------------------
  // 3) Write through the raw pointer and through the checked copy.
  // --------------------------------------------------------------------
  unsafe { first.as_ptr().write_bytes(0xAB, 200) };
  arena.write_payload(second.as_ptr(), 0, &0xDEADBEEFu32.to_ne_bytes())?;
  let mut head = [0u8; 4];
  arena.read_payload(second.as_ptr(), 0, &mut head)?;
  println!("\nsecond payload starts with 0x{:X}", u32::from_ne_bytes(head));

  // --------------------------------------------------------------------
  // 4) Release both. The three chunks collapse back into one.
  // --------------------------------------------------------------------
  arena.release(first.as_ptr())?;
  arena.release(second.as_ptr())?;
  print_chain("after releasing both", &arena);

  // --------------------------------------------------------------------
  // 5) Releasing again is reported, not ignored.
  // --------------------------------------------------------------------
  if let Err(err) = arena.release(first.as_ptr()) {
    println!("\nsecond release refused: {err}");
  }

  println!("\n{:?}", arena.stats()?);

  Ok(())
}
