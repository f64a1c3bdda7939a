use super::indexing::{placement_from_index, Composition};
use super::testing::{values_for, write_database, FixtureContent, FixturePartition};
use super::*;
use tempfile::tempdir;

fn kings_only(black: u8, white: u8, side: Color) -> Composition {
    Composition {
        black_men: 0,
        black_kings: black,
        white_men: 0,
        white_kings: white,
        black_rank: 0,
        white_rank: 0,
        side,
    }
}

fn small_config() -> EgdbConfig {
    EgdbConfig {
        cache_mb: 0,
        preload: false,
    }
}

fn mixed_verdicts(p: &Placement) -> u8 {
    if p.white_kings >= 1 << 24 {
        return 1;
    }
    ((p.black_kings.trailing_zeros() + 2 * p.white_kings.trailing_zeros()) % 3) as u8
}

fn drawish_verdicts(p: &Placement) -> u8 {
    if p.black_kings & 0x0F00_0000 != 0 {
        2
    } else {
        1
    }
}

fn write_three_piece_db(dir: &Path) -> (Vec<u8>, Vec<u8>) {
    let black_to_move = kings_only(2, 1, Color::Black);
    let white_to_move = kings_only(2, 1, Color::White);
    let a = values_for(&black_to_move, mixed_verdicts);
    let b = values_for(&white_to_move, drawish_verdicts);
    write_database(
        dir,
        "db3",
        &[
            FixturePartition {
                composition: black_to_move,
                content: FixtureContent::Values(a.clone()),
            },
            FixturePartition {
                composition: white_to_move,
                content: FixtureContent::Values(b.clone()),
            },
        ],
    )
    .unwrap();
    (a, b)
}

fn two_kings_board() -> Board {
    Board::from_bitmasks(0, 1 << 13, 0, 1 << 29)
}

#[test]
fn test_constant_partition_needs_no_disk() {
    let dir = tempdir().unwrap();
    write_database(
        dir.path(),
        "db2",
        &[FixturePartition {
            composition: kings_only(1, 1, Color::Black),
            content: FixtureContent::Constant('='),
        }],
    )
    .unwrap();

    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    assert_eq!(egdb.max_pieces(), 2);
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::Draw);
    // White to move is stored colour-reversed in the same partition.
    assert_eq!(egdb.lookup(&two_kings_board(), Color::White), Verdict::Draw);
    let stats = egdb.stats();
    assert_eq!(stats.constant_hits, 2);
    assert_eq!(stats.disk_reads, 0);
}

#[test]
fn test_block_partitions_decode_every_index() {
    let dir = tempdir().unwrap();
    let (a, b) = write_three_piece_db(dir.path());
    let cpr_len = fs::metadata(dir.path().join("db3.cpr")).unwrap().len();
    assert!(cpr_len >= 3 * BLOCK_SIZE as u64, "fixture should span several blocks");

    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    assert_eq!(egdb.max_pieces(), 3);
    for (side, values) in [(Color::Black, &a), (Color::White, &b)] {
        let composition = kings_only(2, 1, side);
        for (index, &digit) in values.iter().enumerate() {
            let placement = placement_from_index(&composition, index as u64).unwrap();
            let verdict = egdb.lookup(&placement.to_board(), side);
            assert_eq!(verdict, Verdict::from_digit(digit), "{side:?} index {index}");
        }
    }
    let stats = egdb.stats();
    assert!(stats.disk_reads <= cpr_len / BLOCK_SIZE as u64);
    assert!(stats.cache_hits > 0);
}

#[test]
fn test_colour_reversed_query_matches_stored_side() {
    let dir = tempdir().unwrap();
    let (a, _) = write_three_piece_db(dir.path());
    let mut egdb = Egdb::initialize(dir.path(), &small_config());

    let composition = kings_only(2, 1, Color::Black);
    for index in [0u64, 17, 4_000, 9_999, 14_879] {
        let stored = placement_from_index(&composition, index).unwrap();
        let expected = Verdict::from_digit(a[index as usize]);
        assert_eq!(egdb.lookup(&stored.to_board(), Color::Black), expected);
        // One black king against two white kings, white to move.
        let reversed = stored.mirrored().to_board();
        assert_eq!(egdb.lookup(&reversed, Color::White), expected);
    }
}

#[test]
fn test_repeat_lookup_hits_cache() {
    let dir = tempdir().unwrap();
    write_three_piece_db(dir.path());
    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    let board = Board::from_bitmasks(0, 0b11, 0, 1 << 31);
    let first = egdb.lookup(&board, Color::Black);
    assert!(first.is_known());
    assert_eq!(egdb.lookup(&board, Color::Black), first);
    let stats = egdb.stats();
    assert_eq!((stats.disk_reads, stats.cache_hits), (1, 1));
}

#[test]
fn test_preload_serves_lookups_from_memory() {
    let dir = tempdir().unwrap();
    write_three_piece_db(dir.path());
    let config = EgdbConfig {
        cache_mb: 0,
        preload: true,
    };
    let mut egdb = Egdb::initialize(dir.path(), &config);
    let board = Board::from_bitmasks(0, 0b11, 0, 1 << 31);
    assert!(egdb.lookup(&board, Color::White).is_known());
    assert_eq!(egdb.stats().disk_reads, 0);
    assert_eq!(egdb.stats().cache_hits, 1);
}

#[test]
fn test_malformed_record_is_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("db2.cpr"), b"").unwrap();
    fs::write(
        dir.path().join("db2.idx"),
        "BASE0,1,0,1,0,0,b:?\nBASE0,1,0,1,0,0,q:=\nBASE0,1,0,1,0,0,b:+\nBASE0,2,0,1,0,0,b:-\n",
    )
    .unwrap();
    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    assert_eq!(egdb.max_pieces(), 2);
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::Win);
}

#[test]
fn test_missing_directory_disables_engine() {
    let dir = tempdir().unwrap();
    let mut egdb = Egdb::initialize(&dir.path().join("absent"), &EgdbConfig::default());
    assert_eq!(egdb.max_pieces(), 0);
    assert!(!egdb.is_enabled());
    assert_eq!(egdb.cache_capacity(), 0);
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::NotAvailable);

    let empty = tempdir().unwrap();
    fs::write(empty.path().join("notes.txt"), "not a database").unwrap();
    assert_eq!(Egdb::initialize(empty.path(), &EgdbConfig::default()).max_pieces(), 0);
}

#[test]
fn test_too_many_pieces_is_not_available() {
    let dir = tempdir().unwrap();
    write_database(
        dir.path(),
        "db2",
        &[FixturePartition {
            composition: kings_only(1, 1, Color::Black),
            content: FixtureContent::Constant('='),
        }],
    )
    .unwrap();
    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    let board = Board::from_bitmasks(0, 0b11, 0, 1 << 29);
    assert_eq!(egdb.lookup(&board, Color::Black), Verdict::NotAvailable);
    assert_eq!(egdb.lookup(&Board::initial(), Color::Black), Verdict::NotAvailable);
}

#[test]
fn test_missing_partition_is_unknown() {
    let dir = tempdir().unwrap();
    write_database(
        dir.path(),
        "db2",
        &[FixturePartition {
            composition: kings_only(1, 1, Color::Black),
            content: FixtureContent::Constant('='),
        }],
    )
    .unwrap();
    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    let man_against_king = Board::from_bitmasks(1 << 9, 0, 0, 1 << 29);
    assert_eq!(egdb.lookup(&man_against_king, Color::Black), Verdict::Unknown);
}

#[test]
fn test_short_read_is_unknown() {
    let dir = tempdir().unwrap();
    let composition = kings_only(1, 1, Color::Black);
    write_database(
        dir.path(),
        "db2",
        &[FixturePartition {
            composition,
            content: FixtureContent::Values(values_for(&composition, mixed_verdicts)),
        }],
    )
    .unwrap();
    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    assert_eq!(egdb.max_pieces(), 2);

    // Truncated after the index was checked against the file length.
    File::create(dir.path().join("db2.cpr")).unwrap();
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::Unknown);
    assert_eq!(egdb.stats().disk_reads, 0);
}

#[test]
fn test_partition_past_end_of_file_is_skipped() {
    let dir = tempdir().unwrap();
    let (a, _) = write_three_piece_db(dir.path());
    fs::write(dir.path().join("db2.cpr"), vec![0u8; BLOCK_SIZE]).unwrap();
    // Block 1 would be the first block of db3 in the shared id space.
    fs::write(dir.path().join("db2.idx"), "BASE0,1,0,1,0,0,b:1/0\n").unwrap();

    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    assert_eq!(egdb.max_pieces(), 3);
    let kings = kings_only(2, 1, Color::Black);
    for index in [0u64, 1_000, 2_000] {
        let placement = placement_from_index(&kings, index).unwrap();
        assert_eq!(
            egdb.lookup(&placement.to_board(), Color::Black),
            Verdict::from_digit(a[index as usize])
        );
    }
    let before = egdb.stats();
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::Unknown);
    let after = egdb.stats();
    assert_eq!((after.cache_hits, after.disk_reads), (before.cache_hits, before.disk_reads));
}

#[test]
fn test_reinitialisation_replaces_databases() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    for (dir, verdict) in [(&first, '='), (&second, '+')] {
        write_database(
            dir.path(),
            "db2",
            &[FixturePartition {
                composition: kings_only(1, 1, Color::Black),
                content: FixtureContent::Constant(verdict),
            }],
        )
        .unwrap();
    }

    let mut egdb = Egdb::initialize(first.path(), &small_config());
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::Draw);
    egdb = Egdb::initialize(second.path(), &small_config());
    assert_eq!(egdb.stats(), EgdbStats::default());
    assert_eq!(egdb.lookup(&two_kings_board(), Color::Black), Verdict::Win);
}

#[test]
fn test_split_files_share_block_id_space() {
    let dir = tempdir().unwrap();
    let (a, _) = write_three_piece_db(dir.path());
    let man = Composition {
        black_men: 1,
        black_kings: 1,
        white_men: 0,
        white_kings: 1,
        black_rank: 2,
        white_rank: 0,
        side: Color::Black,
    };
    let split_values = values_for(&man, |p| if p.white_kings & 1 != 0 { 0 } else { 2 });
    write_database(
        dir.path(),
        "db3-1101",
        &[FixturePartition {
            composition: man,
            content: FixtureContent::Values(split_values.clone()),
        }],
    )
    .unwrap();

    let mut egdb = Egdb::initialize(dir.path(), &small_config());
    let kings = kings_only(2, 1, Color::Black);
    for index in [0u64, 5_000, 14_000] {
        let placement = placement_from_index(&kings, index).unwrap();
        assert_eq!(
            egdb.lookup(&placement.to_board(), Color::Black),
            Verdict::from_digit(a[index as usize])
        );
    }
    for (index, &digit) in split_values.iter().enumerate() {
        if let Some(placement) = placement_from_index(&man, index as u64) {
            assert_eq!(egdb.lookup(&placement.to_board(), Color::Black), Verdict::from_digit(digit));
        }
    }
}

#[test]
fn test_database_file_names() {
    assert_eq!(database_pieces("db2.cpr"), Some(2));
    assert_eq!(database_pieces("db8-2220.cpr"), Some(8));
    assert_eq!(database_pieces("db9.cpr"), None);
    assert_eq!(database_pieces("db1.cpr"), None);
    assert_eq!(database_pieces("db6-22.cpr"), None);
    assert_eq!(database_pieces("db6.idx"), None);
    assert_eq!(database_pieces("readme.cpr"), None);
}

#[test]
fn test_cache_floor_scales_with_pieces() {
    assert_eq!(cache_floor(4), CACHE_FLOOR_SMALL);
    assert_eq!(cache_floor(7), CACHE_FLOOR_SEVEN);
    assert_eq!(cache_floor(8), CACHE_FLOOR_EIGHT);

    let dir = tempdir().unwrap();
    write_three_piece_db(dir.path());
    let egdb = Egdb::initialize(dir.path(), &EgdbConfig { cache_mb: 2, preload: false });
    assert_eq!(egdb.cache_capacity(), 2048);

    let huge = EgdbConfig {
        cache_mb: usize::MAX,
        preload: false,
    };
    assert_eq!(Egdb::initialize(dir.path(), &huge).cache_capacity(), usize::MAX);
}
