//! External sort example for planetcore
//!
//! This example demonstrates:
//! - Sorting more records than fit in the sort buffer
//! - Ordering by a custom comparator
//! - Releasing spill files
//!
//! Run with `RUST_LOG=debug` to see chunks being spilled and merged.

use planetcore::{BincodeCodec, ExternalSorter, SortOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct Way {
    id: i64,
    tile: u32,
    nodes: Vec<i64>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    // Keep at most 10,000 ways in memory
    let options = SortOptions::new().buffer_capacity(10_000).fan_out(4);

    // Order ways by tile, then id
    let mut sorter = ExternalSorter::new(
        options,
        Arc::new(BincodeCodec::<Way>::new()),
        Arc::new(|a: &Way, b: &Way| (a.tile, a.id).cmp(&(b.tile, b.id))),
    )?;

    println!("Adding ways...");
    for id in (0..100_000i64).rev() {
        let tile = ((id * 7919) % 64) as u32;
        sorter.add(Way { id, tile, nodes: vec![id * 10, id * 10 + 1] })?;
    }
    println!("Added {} ways in {} chunks", sorter.len(), sorter.chunk_count());

    let mut per_tile = [0u64; 64];
    let mut first = None;
    for way in sorter.iterate()? {
        let way = way?;
        first.get_or_insert(way.id);
        per_tile[way.tile as usize] += 1;
    }
    println!("First way in tile order: {:?}", first);
    println!("Ways in tile 0: {}", per_tile[0]);

    // Remove spill files
    sorter.release();
    println!("Done");

    Ok(())
}
