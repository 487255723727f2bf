use std::ptr;

use poolalloc::{Pool, PoolConfig, PoolRegistry};

/// Prints the region ten bytes per row, dots for anything non-printable.
fn dump(pool: &Pool<'_>) {
  for row in pool.contents().chunks(10) {
    let line: Vec<String> = row
      .iter()
      .map(|&b| {
        if b.is_ascii_graphic() || b == b' ' {
          (b as char).to_string()
        } else {
          ".".to_string()
        }
      })
      .collect();
    println!("{}", line.join(" "));
  }
}

fn main() -> poolalloc::Result<()> {
  env_logger::init();

  let mut storage = [0u8; 50];

  // Four-byte granularity, as on a 32-bit target.
  let config = PoolConfig::default().with_granularity(4);
  let mut registry = PoolRegistry::with_config(config)?;

  let id = registry.create_pool(&mut storage, 50)?;
  println!("Created pool {id}, usable size {} bytes", pool(&registry, id).size());
  println!("Initial cursor offset: {}", pool(&registry, id).cursor());

  // --------------------------------------------------------------------
  // 1) Three allocations. The third does not fit behind the cursor.
  // --------------------------------------------------------------------
  let mut blocks = Vec::new();
  for (size, fill) in [(10, b'A'), (25, b'B'), (20, b'C')] {
    match registry.allocate(id, size) {
      Ok(block) => {
        let pool = pool(&registry, id);
        println!(
          "Allocated {size} bytes at offset: {}",
          pool.offset_of(block).unwrap_or_default()
        );
        println!("New cursor offset: {}", pool.cursor());
        // Safety: the block holds at least `size` bytes and nothing else uses it.
        unsafe { ptr::write_bytes(block.as_ptr(), fill, size) };
        blocks.push((block, size));
      }
      Err(err) => println!("Failed to allocate {size} bytes (expected): {err}"),
    }
  }

  println!("\nContents of the pool after allocations:");
  dump(pool(&registry, id));
  println!("{}", pool(&registry, id).stats());

  // --------------------------------------------------------------------
  // 2) Release both blocks. They merge into one free run, so the 20 byte
  //    request that failed above now succeeds from the free list.
  // --------------------------------------------------------------------
  for (block, size) in blocks {
    registry.release(id, block, size)?;
  }
  println!("\nAfter release: {}", pool(&registry, id).stats());

  let block = registry.allocate(id, 20)?;
  println!(
    "Allocated 20 bytes at offset: {}",
    pool(&registry, id).offset_of(block).unwrap_or_default()
  );

  // --------------------------------------------------------------------
  // 3) A second release of the same block is refused.
  // --------------------------------------------------------------------
  registry.release(id, block, 20)?;
  if let Err(err) = registry.release(id, block, 20) {
    println!("Second release refused: {err}");
  }

  registry.destroy_pool(id)?;
  println!("\nDestroyed pool {id}, {} pools left", registry.len());

  Ok(())
}

fn pool<'r, 'a>(
  registry: &'r PoolRegistry<'a>,
  id: poolalloc::PoolId,
) -> &'r Pool<'a> {
  match registry.pool(id) {
    Some(pool) => pool,
    None => unreachable!("pool {id} is live for the whole demo"),
  }
}
