//! Integration tests for butterfly-place
//!
//! Fixture files are written into temporary directories; the library entry
//! points and the compiled binary run against them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use butterfly_place::{
    generate_sensors, generate_trips, FeasibilityPolicy, HeightDefaults, PlacementConfig, Spacing,
    SpacingPolicy, TraversalOptions,
};
use tempfile::TempDir;

const NET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.9">
    <edge id=":j1_0" function="internal">
        <lane id=":j1_0_0" index="0" speed="13.89" length="3.00" shape="120,0 120,1"/>
    </edge>
    <edge id="1" from="j0" to="j1">
        <lane id="1_0" index="0" speed="13.89" length="120.00" shape="0.00,0.00 120.00,0.00"/>
    </edge>
    <edge id="-1" from="j1" to="j0">
        <lane id="-1_0" index="0" speed="13.89" length="120.00" shape="120.00,3.20 0.00,3.20"/>
    </edge>
    <edge id="2" from="j1" to="j2">
        <lane id="2_0" index="0" speed="13.89" length="60.00" shape="120.00,0.00 120.00,60.00"/>
    </edge>
    <connection from="1" to="2" tl="j1"/>
    <connection from="2" to="-1"/>
    <connection from="-1" to="1"/>
</net>
"#;

fn write_fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn run_binary(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_butterfly-place"))
        .args(args)
        .output()
        .expect("failed to spawn butterfly-place")
}

fn trip_positions(trips: &str) -> Vec<(String, String)> {
    trips
        .lines()
        .filter(|l| l.trim_start().starts_with("<trip "))
        .map(|l| {
            let attr = |name: &str| {
                let key = format!("{name}=\"");
                let start = l.find(&key).unwrap() + key.len();
                let end = start + l[start..].find('"').unwrap();
                l[start..end].to_string()
            };
            (attr("from"), attr("departPos"))
        })
        .collect()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_fixed_trips_carry_spillover() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "map.net.xml", NET);
    let dest = dir.path().join("map.trips.xml");

    let outcome = generate_trips(
        &net,
        &dest,
        &PlacementConfig::default(),
        &TraversalOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.covered_edge_count(), 2);

    let trips = fs::read_to_string(&dest).unwrap();
    assert!(trips.contains(r#"<vType id="car""#));
    assert_eq!(
        trip_positions(&trips),
        vec![
            ("1".to_string(), "1".to_string()),
            ("1".to_string(), "51".to_string()),
            ("1".to_string(), "101".to_string()),
            ("2".to_string(), "31".to_string()),
        ]
    );
}

#[test]
fn test_random_trips_reproducible_with_seed() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "map.net.xml", NET);
    let mut config = PlacementConfig::random();
    config.seed = Some(7);

    let first = dir.path().join("a.trips.xml");
    let second = dir.path().join("b.trips.xml");
    generate_trips(&net, &first, &config, &TraversalOptions::default()).unwrap();
    generate_trips(&net, &second, &config, &TraversalOptions::default()).unwrap();

    let a = fs::read_to_string(&first).unwrap();
    assert_eq!(a, fs::read_to_string(&second).unwrap());

    // every step is 10..=14 and stops before length - 10
    let positions = trip_positions(&a);
    assert!(!positions.is_empty());
    assert!(positions.iter().all(|(edge, _)| edge != "-1"));
    for (edge, pos) in positions {
        let pos: i64 = pos.parse().unwrap();
        let limit = if edge == "1" { 110 } else { 50 };
        assert!(pos >= 1 && pos < limit, "{edge} at {pos}");
    }
}

#[test]
fn test_speed_check_rejects_slow_network() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "slow.net.xml", &NET.replace("13.89", "8.00"));
    let dest = dir.path().join("slow.trips.xml");

    let config = PlacementConfig {
        spacing: SpacingPolicy::default(),
        feasibility: FeasibilityPolicy::with_speed_check(),
        ..Default::default()
    };
    let outcome = generate_trips(&net, &dest, &config, &TraversalOptions::default()).unwrap();
    assert!(outcome.records.is_empty());
    assert!(fs::read_to_string(&dest).unwrap().ends_with("</routes>\n"));
}

#[test]
fn test_sensors_at_traffic_lights() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "map.net.xml", NET);
    let dest = dir.path().join("sensors.ns2");

    let count = generate_sensors(&net, &dest, 6.0, 5).unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        "$node_(5) set X_ 120.0\n$node_(5) set Y_ 0.0\n$node_(5) set Z_ 6.0\n$ns_ at 0.0 \"$node_(5) setdest 120.0 0.0 6.0\"\n"
    );
}

#[test]
fn test_poly_pipeline() {
    let dir = TempDir::new().unwrap();
    let poly = write_fixture(
        &dir,
        "poly.xml",
        r#"<additional>
    <poly id="10" type="building" color="1,0,0" fill="1" layer="-1.00" shape="0,0 10,0 10,8 0,8"/>
    <poly id="11#1" type="building" color="1,0,0" fill="1" layer="-1.00" shape="0,0 1,1"/>
    <poly id="12" type="water" color="0,0,1" fill="1" layer="-1.00" shape="0,0 1,1"/>
</additional>"#,
    );
    let osm = write_fixture(
        &dir,
        "map.osm",
        r#"<osm>
    <way id="10">
        <tag k="building" v="yes"/>
        <tag k="name" v="Town Hall"/>
        <tag k="building:levels" v="2"/>
    </way>
</osm>"#,
    );

    let pruned = dir.path().join("pruned.xml");
    let stats = butterfly_place::prune_poly_file(&poly, &pruned).unwrap();
    assert_eq!((stats.kept, stats.removed), (1, 2));

    let enriched = dir.path().join("3Dpoly.xml");
    let (stats, mean) =
        butterfly_place::enrich_poly_file(&osm, &pruned, &enriched, HeightDefaults::default())
            .unwrap();
    assert_eq!((stats.total, stats.enriched), (1, 1));
    assert!((mean.unwrap() - 5.4).abs() < 1e-9);
    assert!(fs::read_to_string(&enriched)
        .unwrap()
        .contains(r#"height="5.4" shape="0,0 10,0 10,8 0,8 ""#));

    let code = dir.path().join("buildings.cc");
    let count = butterfly_place::export_buildings(&osm, &pruned, Some(code.as_path())).unwrap();
    assert_eq!(count, 1);
    let code = fs::read_to_string(&code).unwrap();
    assert!(code.contains("Ptr<Building> TownHall = CreateObject <Building> ();"));
    assert!(code.contains("\tdouble y_max = 5.4;"));
    assert!(code.contains("TownHall->SetNFloors (2);"));
}

#[test]
fn test_binary_version() {
    let output = run_binary(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_help_lists_subcommands() {
    let output = run_binary(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["trips", "sensors", "prune-poly", "enrich-poly", "buildings"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

#[test]
fn test_binary_trips() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "map.net.xml", NET);
    let dest = dir.path().join("out.trips.xml");

    let output = run_binary(&[
        "trips",
        "-n",
        path_str(&net),
        "-o",
        path_str(&dest),
        "-d",
        "25",
        "--start",
        "half",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // edge 1: 60, 85, 110 then 15 carried onto edge 2: 15, 40
    let trips = fs::read_to_string(&dest).unwrap();
    let positions: Vec<String> = trip_positions(&trips).into_iter().map(|(_, p)| p).collect();
    assert_eq!(positions, vec!["60", "85", "110", "15", "40"]);
}

#[test]
fn test_binary_config_file() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "map.net.xml", NET);
    let config = write_fixture(
        &dir,
        "config.json",
        r#"{"spacing": {"spacing": {"uniform": {"min_step": 10, "max_step": 10}}}, "seed": 1}"#,
    );
    let dest = dir.path().join("out.trips.xml");

    let output = run_binary(&[
        "trips",
        "-n",
        path_str(&net),
        "-o",
        path_str(&dest),
        "-c",
        path_str(&config),
    ]);
    assert!(output.status.success());

    let config: PlacementConfig =
        PlacementConfig::from_json_file(&dir.path().join("config.json")).unwrap();
    assert_eq!(
        config.spacing.spacing,
        Spacing::Uniform {
            min_step: 10,
            max_step: 10
        }
    );

    // constant 10 m steps below length - 10
    let positions: Vec<String> = trip_positions(&fs::read_to_string(&dest).unwrap())
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    assert_eq!(
        positions,
        vec!["1", "11", "21", "31", "41", "51", "61", "71", "81", "91", "101", "1", "11", "21", "31", "41"]
    );
}

#[test]
fn test_binary_unknown_class_suggests() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "map.net.xml", NET);
    let dest = dir.path().join("out.trips.xml");

    let output = run_binary(&[
        "trips",
        "-n",
        path_str(&net),
        "-o",
        path_str(&dest),
        "--classes",
        "pasenger",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean 'passenger'"), "stderr: {stderr}");
}

#[test]
fn test_binary_missing_network_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_binary(&[
        "trips",
        "-n",
        path_str(&dir.path().join("absent.net.xml")),
        "-o",
        path_str(&dir.path().join("out.trips.xml")),
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_binary_prune_poly_keeps_input() {
    let dir = TempDir::new().unwrap();
    let raw = r#"<additional>
    <poly id="1" type="building" layer="-1.00" shape="0,0 1,1"/>
    <poly id="2" type="water" layer="-1.00" shape="0,0 1,1"/>
</additional>"#;
    let poly = write_fixture(&dir, "poly.xml", raw);

    let output = run_binary(&["prune-poly", path_str(&poly)]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(fs::read_to_string(&poly).unwrap(), raw);

    let dest = dir.path().join("pruned.xml");
    let output = run_binary(&["prune-poly", path_str(&poly), "-o", path_str(&dest)]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&poly).unwrap(), raw);
    let pruned = fs::read_to_string(&dest).unwrap();
    assert!(pruned.contains(r#"id="1""#));
    assert!(!pruned.contains("water"));
}

#[test]
fn test_binary_random_config_checks_speed() {
    let dir = TempDir::new().unwrap();
    let net = write_fixture(&dir, "slow.net.xml", &NET.replace("13.89", "8.00"));
    let config = write_fixture(
        &dir,
        "config.json",
        r#"{"spacing": {"spacing": {"uniform": {"min_step": 10, "max_step": 14}}}, "seed": 3}"#,
    );
    let dest = dir.path().join("out.trips.xml");

    let output = run_binary(&[
        "trips",
        "-n",
        path_str(&net),
        "-o",
        path_str(&dest),
        "-c",
        path_str(&config),
    ]);
    assert!(output.status.success());
    assert!(trip_positions(&fs::read_to_string(&dest).unwrap()).is_empty());

    let output = run_binary(&[
        "trips",
        "-n",
        path_str(&net),
        "-o",
        path_str(&dest),
        "-c",
        path_str(&config),
        "--no-speed-check",
    ]);
    assert!(output.status.success());
    assert!(!trip_positions(&fs::read_to_string(&dest).unwrap()).is_empty());
}
