use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use hexgrid::{
    BulletTrace, Capabilities, CritterFind, DrawList, DrawSubject, Hex, HexManager, HexMask,
    HexSettings, MapBlob, MapHashes, ProtoRegistry, SpriteTable,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub settings: Option<PathBuf>,
    pub protos: Option<PathBuf>,
    pub sprites: Option<PathBuf>,
    pub hex_mask: Option<PathBuf>,
    pub editing: bool,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Info { map: PathBuf },
    Hash { map: PathBuf },
    Path { map: PathBuf, from: Hex, to: Hex, cut: Option<u32> },
    Trace { map: PathBuf, from: Hex, to: Hex },
    Light { map: PathBuf, center: Hex, radius: u32 },
    Draw { map: PathBuf, center: Option<Hex> },
}

#[derive(Debug, Serialize)]
struct MapSummary {
    map_pid: u32,
    width: u16,
    height: u16,
    tiles: usize,
    roofs: usize,
    walls: usize,
    scenery: usize,
    items: usize,
    light_sources: usize,
    view_rows: i32,
    view_cols: i32,
    tiles_drawn: usize,
    main_drawn: usize,
    roofs_drawn: usize,
}

/// Parses a hex written as `x,y`.
pub fn parse_hex(raw: &str) -> Result<Hex, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("invalid hex '{raw}' (expected x,y)"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u16>()
            .map_err(|_| format!("invalid hex '{raw}' (coordinates must be u16)"))
    };
    Ok(Hex::new(parse(x)?, parse(y)?))
}

pub fn run<W: Write>(kind: CommandKind, opts: &CommonOptions, stdout: &mut W) -> Result<(), String> {
    match kind {
        CommandKind::Info { map } => {
            let blob = read_blob(&map)?;
            let manager = load_manager(opts, &blob)?;
            let summary = MapSummary {
                map_pid: blob.proto_id,
                width: blob.width,
                height: blob.height,
                tiles: blob.tiles.iter().filter(|tile| !tile.is_roof).count(),
                roofs: blob.tiles.iter().filter(|tile| tile.is_roof).count(),
                walls: blob.walls.len(),
                scenery: blob.scenery.len(),
                items: manager.items().count(),
                light_sources: manager.light_sources().len(),
                view_rows: manager.view().rows(),
                view_cols: manager.view().cols(),
                tiles_drawn: manager.tiles_draw_list().len(),
                main_drawn: manager.main_draw_list().len(),
                roofs_drawn: manager.roofs_draw_list().len(),
            };
            if opts.json {
                let text = serde_json::to_string_pretty(&summary)
                    .map_err(|error| format!("failed to encode map summary: {error}"))?;
                write_line(stdout, &text)
            } else {
                write_line(
                    stdout,
                    &format!(
                        "map {} {}x{}: tiles={} roofs={} walls={} scenery={} items={} lights={}",
                        summary.map_pid,
                        summary.width,
                        summary.height,
                        summary.tiles,
                        summary.roofs,
                        summary.walls,
                        summary.scenery,
                        summary.items,
                        summary.light_sources
                    ),
                )?;
                write_line(
                    stdout,
                    &format!(
                        "view {}x{} cells, drawn: tiles={} main={} roofs={}",
                        summary.view_cols,
                        summary.view_rows,
                        summary.tiles_drawn,
                        summary.main_drawn,
                        summary.roofs_drawn
                    ),
                )
            }
        }
        CommandKind::Hash { map } => {
            let bytes = read_bytes(&map)?;
            let hashes = MapHashes::compute(&bytes)
                .map_err(|error| format!("failed to hash map '{}': {error}", map.display()))?;
            for (section, digest) in [
                ("tiles", &hashes.tiles),
                ("walls", &hashes.walls),
                ("scenery", &hashes.scenery),
                ("combined", &hashes.combined),
            ] {
                write_line(stdout, &format!("{section} {digest}"))?;
            }
            Ok(())
        }
        CommandKind::Path { map, from, to, cut } => {
            let mut manager = load_manager(opts, &read_blob(&map)?)?;
            match manager.find_path(from, to, 0, cut) {
                Some(path) => {
                    let dirs = path
                        .steps
                        .iter()
                        .map(u8::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    write_line(
                        stdout,
                        &format!("end {} steps {}: {dirs}", format_hex(path.end), path.steps.len()),
                    )
                }
                None => write_line(stdout, "no path"),
            }
        }
        CommandKind::Trace { map, from, to } => {
            let mut manager = load_manager(opts, &read_blob(&map)?)?;
            let trace = BulletTrace {
                check_passed: true,
                ..BulletTrace::new(from, to)
            };
            let report = manager.trace_bullet(&trace, Some(CritterFind::ALL));
            write_line(
                stdout,
                &format!(
                    "block {} pre_block {} passed {}",
                    format_hex(report.outcome.block),
                    format_hex(report.outcome.pre_block),
                    report.outcome.passed.len()
                ),
            )
        }
        CommandKind::Light { map, center, radius } => {
            let mut manager = load_manager(opts, &read_blob(&map)?)?;
            if !manager.grid().contains(center) {
                return Err(format!("hex {} is outside the map", format_hex(center)));
            }
            manager.rebuild_map(center);
            let topology = manager.topology();
            for hex in hexes_around(&manager, center, radius) {
                if topology.distance(center, hex) > radius {
                    continue;
                }
                let [r, g, b] = manager.light_at(hex);
                write_line(stdout, &format!("{} {r} {g} {b}", format_hex(hex)))?;
            }
            Ok(())
        }
        CommandKind::Draw { map, center } => {
            let mut manager = load_manager(opts, &read_blob(&map)?)?;
            if let Some(center) = center {
                if !manager.grid().contains(center) {
                    return Err(format!("hex {} is outside the map", format_hex(center)));
                }
                manager.rebuild_map(center);
            }
            for (name, list) in [
                ("tiles", manager.tiles_draw_list()),
                ("main", manager.main_draw_list()),
                ("roofs", manager.roofs_draw_list()),
            ] {
                write_draw_list(stdout, name, list)?;
            }
            Ok(())
        }
    }
}

fn load_manager(opts: &CommonOptions, blob: &MapBlob) -> Result<HexManager, String> {
    let settings = match &opts.settings {
        Some(path) => HexSettings::from_json_file(path).map_err(|error| error.to_string())?,
        None => HexSettings::default(),
    };
    let protos = match &opts.protos {
        Some(path) => ProtoRegistry::from_json_file(path).map_err(|error| error.to_string())?,
        None => ProtoRegistry::new(),
    };
    let sprites = match &opts.sprites {
        Some(path) => load_sprites(path)?,
        None => SpriteTable::new(),
    };
    let capabilities = Capabilities {
        editing_features: opts.editing,
        ..Capabilities::default()
    };
    let mut manager = HexManager::new(settings, capabilities, protos, Box::new(sprites))
        .map_err(|error| error.to_string())?;

    if let Some(path) = &opts.hex_mask {
        let settings = manager.settings();
        let mask = HexMask::from_png(path, settings.hex_width as u32, settings.hex_height as u32)
            .map_err(|error| error.to_string())?;
        manager.set_hex_mask(Some(mask));
    }

    manager
        .load_map(blob)
        .map_err(|error| format!("failed to load map {}: {error}", blob.proto_id))?;
    info!(
        map_pid = blob.proto_id,
        items = manager.items().count(),
        "hexview_map_ready"
    );
    Ok(manager)
}

fn load_sprites(path: &Path) -> Result<SpriteTable, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("failed to read sprite table '{}': {error}", path.display()))?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        format!(
            "invalid sprite table '{}' at {}: {}",
            path.display(),
            error.path(),
            error.inner()
        )
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|error| format!("failed to read map '{}': {error}", path.display()))
}

fn read_blob(path: &Path) -> Result<MapBlob, String> {
    let bytes = read_bytes(path)?;
    MapBlob::decode(&bytes, None)
        .map_err(|error| format!("failed to decode map '{}': {error}", path.display()))
}

fn hexes_around(manager: &HexManager, center: Hex, radius: u32) -> Vec<Hex> {
    let radius = radius as i32;
    let (cx, cy) = (i32::from(center.x), i32::from(center.y));
    let mut hexes = Vec::new();
    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            if let Some(hex) = manager.grid().hex_at(x, y) {
                hexes.push(hex);
            }
        }
    }
    hexes
}

fn write_draw_list<W: Write>(stdout: &mut W, name: &str, list: &DrawList) -> Result<(), String> {
    write_line(stdout, &format!("{name} {}", list.len()))?;
    for entry in list.entries() {
        let subject = match entry.subject {
            DrawSubject::Tile { layer } => format!("tile/{layer}"),
            DrawSubject::Roof { layer, roof_group } => format!("roof/{layer}/{roof_group}"),
            DrawSubject::Item(id) => format!("item/{}", id.0),
            DrawSubject::Critter(id) => format!("critter/{}", id.0),
            DrawSubject::Track(kind) => format!("track/{kind}"),
        };
        write_line(
            stdout,
            &format!(
                "  {subject} hex {} at {},{} order {} sprite {}",
                format_hex(entry.hex),
                entry.screen_x,
                entry.screen_y,
                entry.order.0,
                entry.sprite.0
            ),
        )?;
    }
    Ok(())
}

fn format_hex(hex: Hex) -> String {
    format!("{},{}", hex.x, hex.y)
}

fn write_line<W: Write>(stdout: &mut W, line: &str) -> Result<(), String> {
    writeln!(stdout, "{line}").map_err(|error| format!("failed to write output: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexgrid::map::{SceneryRecord, TileRecord};
    use tempfile::TempDir;

    fn write_map(dir: &TempDir) -> PathBuf {
        let mut blob = MapBlob::new(12, 30, 30);
        blob.tiles.push(TileRecord {
            hex_x: 4,
            hex_y: 4,
            ..TileRecord::default()
        });
        blob.tiles.push(TileRecord {
            hex_x: 4,
            hex_y: 4,
            is_roof: true,
            ..TileRecord::default()
        });
        blob.scenery.push(SceneryRecord::default());
        let path = dir.path().join("12.fomap");
        fs::write(&path, blob.encode()).expect("write map");
        path
    }

    fn run_to_string(kind: CommandKind, opts: &CommonOptions) -> String {
        let mut out = Vec::new();
        run(kind, opts, &mut out).expect("command runs");
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn parse_hex_accepts_pairs_only() {
        assert_eq!(parse_hex("3,17"), Ok(Hex::new(3, 17)));
        assert_eq!(parse_hex(" 3 , 4"), Ok(Hex::new(3, 4)));
        assert!(parse_hex("3").is_err());
        assert!(parse_hex("-1,2").is_err());
        assert!(parse_hex("70000,2").is_err());
    }

    #[test]
    fn info_reports_section_counts() {
        let dir = TempDir::new().expect("temp dir");
        let map = write_map(&dir);
        let text = run_to_string(CommandKind::Info { map: map.clone() }, &CommonOptions::default());
        assert!(text.starts_with("map 12 30x30: tiles=1 roofs=1 walls=0 scenery=1 items=0"));

        let opts = CommonOptions {
            json: true,
            ..CommonOptions::default()
        };
        let json: serde_json::Value =
            serde_json::from_str(&run_to_string(CommandKind::Info { map }, &opts)).expect("json");
        assert_eq!(json["map_pid"], 12);
        assert_eq!(json["roofs"], 1);
    }

    #[test]
    fn hash_prints_every_section() {
        let dir = TempDir::new().expect("temp dir");
        let map = write_map(&dir);
        let text = run_to_string(CommandKind::Hash { map }, &CommonOptions::default());
        let sections: Vec<_> = text
            .lines()
            .filter_map(|line| line.split_once(' ').map(|(name, _)| name))
            .collect();
        assert_eq!(sections, ["tiles", "walls", "scenery", "combined"]);
    }

    #[test]
    fn path_prints_the_end_and_steps() {
        let dir = TempDir::new().expect("temp dir");
        let map = write_map(&dir);
        let text = run_to_string(
            CommandKind::Path {
                map,
                from: Hex::new(5, 5),
                to: Hex::new(9, 5),
                cut: None,
            },
            &CommonOptions::default(),
        );
        assert!(text.starts_with("end 9,5 steps 4:"), "{text}");
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = TempDir::new().expect("temp dir");
        let mut out = Vec::new();
        let error = run(
            CommandKind::Hash {
                map: dir.path().join("missing.fomap"),
            },
            &CommonOptions::default(),
            &mut out,
        )
        .expect_err("missing map");
        assert!(error.contains("failed to read map"));

        let map = write_map(&dir);
        let opts = CommonOptions {
            sprites: Some(dir.path().join("missing.json")),
            ..CommonOptions::default()
        };
        let error = run(CommandKind::Info { map }, &opts, &mut out).expect_err("missing sprites");
        assert!(error.contains("failed to read sprite table"));
    }
}
