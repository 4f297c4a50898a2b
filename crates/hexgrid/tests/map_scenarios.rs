mod common;

use common::{loaded, manager, scenery, Lcg, LAMP, ROCK, WALL_PAIR};
use hexgrid::map::SceneryRecord;
use hexgrid::{FieldFlags, Hex, HexManager, MapBlob, MapCache};
use tempfile::TempDir;

fn flag_snapshot(manager: &HexManager) -> Vec<(Hex, FieldFlags)> {
    manager
        .grid()
        .iter()
        .map(|(hex, field)| (hex, field.flags()))
        .collect()
}

fn light_snapshot(manager: &HexManager, center: Hex, radius: u32) -> Vec<(Hex, [u8; 3])> {
    let topology = manager.topology();
    manager
        .grid()
        .iter()
        .filter(|(hex, _)| topology.distance(center, *hex) <= radius)
        .map(|(hex, _)| (hex, manager.light_at(hex)))
        .collect()
}

#[test]
fn large_empty_map_paths_and_picks() {
    let mut manager = loaded(&MapBlob::new(1, 400, 400));
    let (from, to) = (Hex::new(0, 0), Hex::new(10, 10));
    let path = manager.find_path(from, to, 0, None).expect("open map path");
    // (0,0) -> (10,10) spans fifteen hex steps in this coordinate system.
    assert_eq!(path.steps.len(), 15);
    assert_eq!(path.steps.len() as u32, manager.topology().distance(from, to));

    manager.rebuild_map(to);
    let (x, y) = manager.hex_screen_position(to).expect("target is on screen");
    assert_eq!(manager.hex_at_pixel(x, y), Some(to));
}

#[test]
fn wall_block_lines_come_and_go_with_the_wall() {
    let mut blob = MapBlob::new(2, 20, 20);
    blob.walls.push(scenery(WALL_PAIR, 5, 5));
    let mut manager = loaded(&blob);
    let pair = [Hex::new(5, 5), Hex::new(6, 5)];
    for hex in pair {
        assert!(manager.grid().field(hex).flags().is_not_passed, "{hex:?}");
    }

    let wall = manager
        .items_at(Hex::new(5, 5))
        .first()
        .map(|item| item.id)
        .expect("wall placed");
    manager.erase_item(wall).expect("wall erased");
    for hex in pair {
        assert!(!manager.grid().field(hex).flags().is_not_passed, "{hex:?}");
    }
}

#[test]
fn lamp_light_stays_within_its_radius() {
    let mut blob = MapBlob::new(3, 30, 30);
    blob.scenery.push(scenery(LAMP, 5, 5));
    let mut manager = loaded(&blob);
    manager.rebuild_map(Hex::new(5, 5));
    assert_eq!(manager.light_at(Hex::new(10, 10)), [0, 0, 0]);
    assert!(manager.light_at(Hex::new(5, 6))[0] > 0);
}

#[test]
fn overlapping_lamps_take_the_channel_maximum() {
    let white = scenery(LAMP, 10, 10);
    let red = SceneryRecord {
        light_color: 0xFF_00_00,
        light_distance: 4,
        light_intensity: 100,
        ..scenery(LAMP, 12, 10)
    };
    let center = Hex::new(11, 10);
    let lit = |records: &[SceneryRecord]| {
        let mut blob = MapBlob::new(4, 30, 30);
        blob.scenery.extend_from_slice(records);
        let mut manager = loaded(&blob);
        manager.rebuild_map(center);
        light_snapshot(&manager, center, 6)
    };

    let only_white = lit(&[white]);
    let only_red = lit(&[red]);
    let both = lit(&[white, red]);
    assert!(both.iter().any(|(_, rgb)| rgb.iter().any(|channel| *channel > 0)));
    for ((hex, combined), ((_, a), (_, b))) in both.iter().zip(only_white.iter().zip(&only_red)) {
        for channel in 0..3 {
            assert_eq!(combined[channel], a[channel].max(b[channel]), "{hex:?} channel {channel}");
        }
    }
}

#[test]
fn visible_hexes_round_trip_through_pixels() {
    let mut manager = loaded(&MapBlob::new(5, 100, 100));
    let center = Hex::new(50, 50);
    manager.rebuild_map(center);
    let topology = manager.topology();
    let hexes: Vec<Hex> = manager
        .grid()
        .iter()
        .map(|(hex, _)| hex)
        .filter(|hex| topology.distance(center, *hex) <= 8)
        .collect();
    assert!(!hexes.is_empty());
    for hex in hexes {
        let (x, y) = manager.hex_screen_position(hex).expect("visible");
        assert_eq!(manager.hex_at_pixel(x, y), Some(hex));
    }
}

#[test]
fn reloading_a_map_rebuilds_the_same_grid() {
    let mut rng = Lcg::new(99);
    let mut blob = MapBlob::new(6, 40, 40);
    for _ in 0..30 {
        let (x, y) = (rng.next(40) as u16, rng.next(40) as u16);
        blob.walls.push(scenery(WALL_PAIR, x, y));
    }
    for proto in [ROCK, LAMP, LAMP, ROCK, LAMP] {
        let (x, y) = (rng.next(40) as u16, rng.next(40) as u16);
        blob.scenery.push(scenery(proto, x, y));
    }

    let mut manager = loaded(&blob);
    let flags = flag_snapshot(&manager);
    let lights = manager.light_sources();
    manager.unload_map();
    assert!(!manager.is_map_loaded());

    manager.load_map(&blob).expect("second load");
    assert_eq!(flag_snapshot(&manager), flags);
    assert_eq!(manager.light_sources(), lights);
}

#[test]
fn cached_blob_loads_like_the_original() {
    let dir = TempDir::new().expect("temp dir");
    let cache = MapCache::new(dir.path());
    let mut blob = MapBlob::new(8, 25, 25);
    blob.walls.push(scenery(WALL_PAIR, 3, 3));
    blob.scenery.push(scenery(LAMP, 12, 12));
    let hashes = cache.store(8, &blob.encode()).expect("stored");
    assert!(cache.is_current(8, &hashes.combined).expect("hash readable"));

    let direct = loaded(&blob);
    let mut cached = manager();
    cached.load_cached_map(&cache, 8).expect("cached load");
    assert_eq!(cached.map_pid(), 8);
    assert_eq!(flag_snapshot(&cached), flag_snapshot(&direct));
    assert!(cached.load_cached_map(&cache, 9).is_err());
}
