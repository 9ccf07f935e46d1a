use memarena::{
    Arena, ArenaError, BlockPtr,
    block::header_size,
    config::{HEADER_SIZE, MAX_ARENA_SIZE, MAX_BLOCK_SIZE, MAX_FREE_COUNT, MIN_SPLIT_REMAINDER},
};

fn offsets(arena: &Arena, region: usize) -> Vec<(usize, usize, bool)> {
    arena.regions()[region]
        .blocks()
        .map(|b| (b.offset, b.header.block_size.get(), b.header.used))
        .collect()
}

#[test]
fn three_blocks_then_reuse_freed_slot() {
    let mut arena = Arena::create(1024).unwrap();
    assert_eq!(header_size(), 8);

    let a = arena.alloc(64).unwrap();
    let b = arena.alloc(64).unwrap();
    let c = arena.alloc(64).unwrap();

    assert_eq!(arena.regions()[0].offset(), 240);
    assert_eq!(arena.regions()[0].space(), 1024 - 240);

    arena.free(b).unwrap();

    assert_eq!(arena.regions()[0].space(), 1024 - 160);
    assert_eq!(arena.regions()[0].free_count(), 1);

    let d = arena.alloc(64).unwrap();

    assert_eq!(d, b);
    assert_eq!(arena.block_size(d), Ok(80));
    assert_eq!(arena.regions()[0].offset(), 240);
    assert_eq!(arena.regions()[0].blocks().count(), 3);
    assert_eq!(arena.as_ptr(d), arena.as_ptr(b));
    assert_ne!(a, c);
}

#[test]
fn writes_do_not_corrupt_neighbours() {
    let mut arena = Arena::create(4096).unwrap();
    let sizes = [1, 7, 8, 9, 15, 16, 17, 100, 255];

    let ptrs: Vec<BlockPtr> = sizes.iter().map(|s| arena.alloc(*s).unwrap()).collect();
    for (i, ptr) in ptrs.iter().enumerate() {
        arena.data_mut(*ptr).unwrap().fill(i as u8 + 1);
    }

    for i in (0..ptrs.len()).step_by(2) {
        arena.free(ptrs[i]).unwrap();
    }

    for i in (1..ptrs.len()).step_by(2) {
        let data = arena.data(ptrs[i]).unwrap();
        assert_eq!(data.len(), sizes[i]);
        assert!(data.iter().all(|b| *b == i as u8 + 1));
        assert_eq!(arena.data_size(ptrs[i]), Ok(sizes[i]));
        assert_eq!(arena.is_block_free(ptrs[i]), Ok(false));
    }
}

#[test]
fn blocks_tile_the_used_range() {
    let mut arena = Arena::create(2048).unwrap();

    for size in [3, 30, 300, 1, 64, 65] {
        arena.alloc(size).unwrap();
    }

    let blocks = offsets(&arena, 0);
    let mut expected = HEADER_SIZE;
    for (offset, block_size, used) in &blocks {
        assert_eq!(*offset, expected);
        assert!(*used);
        expected += block_size;
    }

    let total: usize = blocks.iter().map(|b| b.1).sum();
    assert_eq!(total, arena.regions()[0].offset());
}

#[test]
fn reset_empties_every_region() {
    let mut arena = Arena::create(128).unwrap();
    let first = arena.alloc(40).unwrap();
    for _ in 0..5 {
        arena.alloc(40).unwrap();
    }
    assert_eq!(arena.region_count(), 3);

    arena.reset();

    for region in arena.regions() {
        assert_eq!(region.offset(), 0);
        assert_eq!(region.space(), 128);
    }
    assert_eq!(arena.region_count(), 3);

    arena.reset();
    assert_eq!(arena.regions()[0].offset(), 0);

    assert_eq!(arena.alloc(40).unwrap(), first);
}

#[test]
fn freed_run_coalesces_and_is_reused() {
    let mut arena = Arena::create(4096).unwrap();

    let ptrs: Vec<_> = (0..MAX_FREE_COUNT + 1).map(|_| arena.alloc(24).unwrap()).collect();
    let offset = arena.regions()[0].offset();

    for ptr in &ptrs[..MAX_FREE_COUNT] {
        arena.free(*ptr).unwrap();
    }

    assert_eq!(arena.regions()[0].free_count(), 0);
    let blocks = offsets(&arena, 0);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0], (HEADER_SIZE, 32 * MAX_FREE_COUNT, false));

    let merged = arena.alloc(32 * MAX_FREE_COUNT - HEADER_SIZE).unwrap();

    assert_eq!(merged, ptrs[0]);
    assert_eq!(arena.regions()[0].offset(), offset);
    assert_eq!(arena.region_count(), 1);
}

#[test]
fn overflow_chains_one_child() {
    let mut arena = Arena::create(256).unwrap();

    // 56 + 8 = 64 bytes per block, four fit in a region.
    let parent: Vec<_> = (0..4).map(|_| arena.alloc(56).unwrap()).collect();
    for (i, ptr) in parent.iter().enumerate() {
        arena.data_mut(*ptr).unwrap().fill(0x10 + i as u8);
    }
    assert_eq!(arena.region_count(), 1);
    assert_eq!(arena.regions()[0].offset(), 256);

    let child = arena.alloc(56).unwrap();
    let next = arena.alloc(56).unwrap();

    assert_eq!(arena.region_count(), 2);
    assert_eq!(child.region(), 1);
    assert_eq!(next.region(), 1);
    assert_eq!(arena.regions()[1].size(), 256);
    assert_eq!(arena.regions()[1].offset(), 128);

    for (i, ptr) in parent.iter().enumerate() {
        assert_eq!(ptr.region(), 0);
        assert!(arena.data(*ptr).unwrap().iter().all(|b| *b == 0x10 + i as u8));
    }
}

#[test]
fn parent_reuse_is_preferred_over_child() {
    let mut arena = Arena::create(128).unwrap();
    let a = arena.alloc(56).unwrap();
    arena.alloc(56).unwrap();
    arena.alloc(56).unwrap();
    assert_eq!(arena.region_count(), 2);

    arena.free(a).unwrap();

    assert_eq!(arena.alloc(56).unwrap(), a);
    assert_eq!(arena.region_count(), 2);
}

#[test]
fn raw_pointers_survive_chain_growth() {
    let mut arena = Arena::create(64).unwrap();
    let first = arena.alloc(8).unwrap();
    let raw = arena.as_ptr(first).unwrap();

    for _ in 0..64 {
        arena.alloc(8).unwrap();
    }

    assert!(arena.region_count() > 16);
    assert_eq!(arena.as_ptr(first).unwrap(), raw);
}

#[test]
fn split_threshold() {
    let mut arena = Arena::create(1024).unwrap();

    // A 96 byte free block.
    let big = arena.alloc(88).unwrap();
    arena.alloc(8).unwrap();
    arena.free(big).unwrap();

    // 96 - 48 = 48 >= MIN_SPLIT_REMAINDER: split.
    let used = arena.alloc(40).unwrap();
    assert_eq!(used, big);
    assert_eq!(
        offsets(&arena, 0)[..2],
        [(HEADER_SIZE, 48, true), (48 + HEADER_SIZE, 48, false)]
    );
    assert!(48 >= MIN_SPLIT_REMAINDER);

    // 48 - 32 = 16 < MIN_SPLIT_REMAINDER: the whole block is taken.
    let tail = arena.alloc(24).unwrap();
    assert_eq!(tail.offset(), 48 + HEADER_SIZE);
    assert_eq!(arena.block_size(tail), Ok(48));
    assert_eq!(arena.data_size(tail), Ok(24));
    assert_eq!(arena.regions()[0].blocks().count(), 3);
}

#[test]
fn boundaries() {
    assert_eq!(Arena::create(0).err(), Some(ArenaError::InvalidSize { size: 0 }));
    assert_eq!(
        Arena::create(MAX_ARENA_SIZE + 1).err(),
        Some(ArenaError::InvalidSize {
            size: MAX_ARENA_SIZE + 1
        })
    );

    let mut arena = Arena::create(MAX_ARENA_SIZE).unwrap();
    assert_eq!(arena.alloc(0), Err(ArenaError::InvalidSize { size: 0 }));
    assert!(matches!(
        arena.alloc(MAX_BLOCK_SIZE),
        Err(ArenaError::BlockTooLarge { .. })
    ));
    assert!(matches!(
        arena.alloc(MAX_ARENA_SIZE),
        Err(ArenaError::AllocationTooLarge { .. })
    ));
    assert_eq!(arena.regions()[0].offset(), 0);
    assert_eq!(arena.regions()[0].space(), MAX_ARENA_SIZE);

    // The largest request a region can take.
    let whole = arena.alloc(MAX_ARENA_SIZE - HEADER_SIZE).unwrap();
    assert_eq!(arena.regions()[0].space(), 0);
    arena.free(whole).unwrap();
}

#[test]
fn freed_data_is_zeroed_before_reuse() {
    let mut arena = Arena::create(256).unwrap();
    let a = arena.alloc(32).unwrap();
    arena.data_mut(a).unwrap().fill(0xFF);
    arena.free(a).unwrap();

    let b = arena.alloc(32).unwrap();

    assert_eq!(a, b);
    assert!(arena.data(b).unwrap().iter().all(|byte| *byte == 0));
}

#[test]
fn delete_releases_whole_chain() {
    let mut arena = Arena::create(64).unwrap();
    for _ in 0..10 {
        arena.alloc(40).unwrap();
    }
    assert_eq!(arena.region_count(), 10);

    arena.delete();
}
