use approx::assert_relative_eq;
use waymark_geometry::{
    catmull_rom_segments, generate_curve_points, generate_path_points,
    generate_path_points_with, ArcTable, LatLng, PathError, Point2, SampledPath,
    SamplingConfig,
};
use waymark_test_fixtures as fixtures;

fn load(name: &str) -> Vec<LatLng> {
    fixtures::paths::load(name).expect("path fixture")
}

fn straight_distance(a: LatLng, b: LatLng) -> f64 {
    Point2::from(a).distance(Point2::from(b))
}

/// Distance of `p` from the infinite line through `a` and `b`.
fn perpendicular_distance(p: LatLng, a: LatLng, b: LatLng) -> f64 {
    let (p, a, b) = (Point2::from(p), Point2::from(a), Point2::from(b));
    let d = b - a;
    let cross = d.x * (p.y - a.y) - d.y * (p.x - a.x);
    cross.abs() / a.distance(b)
}

fn assert_same_point(a: LatLng, b: LatLng) {
    assert_relative_eq!(a.latitude, b.latitude, epsilon = 1e-9);
    assert_relative_eq!(a.longitude, b.longitude, epsilon = 1e-9);
}

#[test]
fn straight_two_points_returns_endpoints() {
    let wps = load("seattle-portland");
    let out = generate_path_points(&wps, false, None).unwrap();

    assert_eq!(out.path, wps);
    assert_relative_eq!(out.length, straight_distance(wps[0], wps[1]), epsilon = 1e-12);
}

#[test]
fn straight_explicit_count_is_evenly_spaced() {
    let wps = load("seattle-portland");
    let out = generate_path_points(&wps, false, Some(5)).unwrap();

    assert_eq!(out.len(), 5);
    assert_eq!(out.path[0], wps[0]);
    assert_eq!(out.path[4], wps[1]);
    let step = out.length / 4.0;
    for pair in out.path.windows(2) {
        assert_relative_eq!(straight_distance(pair[0], pair[1]), step, epsilon = 1e-9);
        assert!(perpendicular_distance(pair[1], wps[0], wps[1]) < 1e-9);
    }
}

#[test]
fn curved_two_points_bows_away_from_the_chord() {
    let wps = load("seattle-portland");
    let straight = generate_path_points(&wps, false, None).unwrap();
    let curved = generate_path_points(&wps, true, None).unwrap();

    assert!(curved.len() >= 15);
    assert!(curved.len() > straight.len());
    assert_eq!(curved.path[0], wps[0]);
    assert_same_point(*curved.path.last().unwrap(), wps[1]);
    assert!(curved.length > straight.length);

    let max_offset = curved
        .path
        .iter()
        .map(|&p| perpendicular_distance(p, wps[0], wps[1]))
        .fold(0.0, f64::max);
    assert!(max_offset > 0.0, "curve should leave the straight segment");
}

#[test]
fn curved_bulge_leans_toward_increasing_latitude() {
    let a = LatLng::new(0.0, 0.0);
    let b = LatLng::new(0.0, 10.0);
    let out = generate_path_points(&[a, b], true, None).unwrap();
    let mid = out.path[out.len() / 2];
    assert!(mid.latitude > 0.0);
}

#[test]
fn meridian_segment_still_bows() {
    let wps = load("meridian");
    let out = generate_path_points(&wps, true, None).unwrap();
    let bowed = out
        .path
        .iter()
        .any(|&p| perpendicular_distance(p, wps[0], wps[1]) > 1e-6);
    assert!(bowed);
}

#[test]
fn curved_many_points_keeps_endpoints_and_control_count() {
    let wps = load("pacific-coast");
    let out = generate_path_points(&wps, true, None).unwrap();

    assert_eq!(out.path[0], wps[0]);
    assert_same_point(*out.path.last().unwrap(), *wps.last().unwrap());

    // The curve is the plain fit through the waypoints: no synthetic control points.
    let control: Vec<Point2> = wps.iter().copied().map(Point2::from).collect();
    let segs = catmull_rom_segments(&control, SamplingConfig::default().alpha);
    assert_eq!(segs.len(), wps.len() - 1);
    let expected = ArcTable::from_segments(&segs, SamplingConfig::default().flatten_steps);
    assert_relative_eq!(out.length, expected.total_length(), epsilon = 1e-12);

    let derived = ((out.length * 2.5).ceil() as usize).max(15);
    assert_eq!(out.len(), derived);
}

#[test]
fn curved_samples_are_equally_spaced_along_the_curve() {
    let wps = load("pacific-coast");
    let out = generate_path_points(&wps, true, Some(40)).unwrap();
    assert_eq!(out.len(), 40);
    let step = out.length / 39.0;
    for pair in out.path.windows(2) {
        // chords are never longer than the arc they cut
        assert!(straight_distance(pair[0], pair[1]) <= step + 1e-9);
    }
}

#[test]
fn generator_is_deterministic() {
    let wps = load("pacific-coast");
    let first = generate_path_points(&wps, true, None).unwrap();
    let second = generate_path_points(&wps, true, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(generate_curve_points(&wps).unwrap(), first);
}

#[test]
fn input_slice_is_not_modified() {
    let wps = load("seattle-portland");
    let before = wps.clone();
    let _ = generate_path_points(&wps, true, None).unwrap();
    assert_eq!(wps, before);
}

#[test]
fn coincident_waypoints_degrade_to_repeated_point() {
    let wps = load("coincident");
    let out = generate_path_points(&wps, true, None).unwrap();

    assert_eq!(out.length, 0.0);
    assert_eq!(out.len(), 15);
    assert!(out.path.iter().all(|&p| p == wps[0]));

    let straight = generate_path_points(&wps, false, Some(6)).unwrap();
    assert_eq!(straight.len(), 6);
    assert!(straight.path.iter().all(|&p| p == wps[0]));
}

#[test]
fn single_sample_uses_zero_interval() {
    let wps = load("seattle-portland");
    let out = generate_path_points(&wps, true, Some(1)).unwrap();
    assert_eq!(out.path, vec![wps[0]]);
}

#[test]
fn rejects_bad_input() {
    let one = [LatLng::new(1.0, 1.0)];
    assert_eq!(
        generate_path_points(&one, true, None),
        Err(PathError::TooFewWaypoints { count: 1 })
    );

    let nan = [LatLng::new(1.0, 1.0), LatLng::new(f64::NAN, 2.0)];
    assert_eq!(
        generate_path_points(&nan, false, None),
        Err(PathError::NonFiniteWaypoint { index: 1 })
    );
}

#[test]
fn overflowing_length_is_rejected() {
    let far = [LatLng::new(-1e308, 0.0), LatLng::new(1e308, 0.0)];
    assert_eq!(
        generate_path_points(&far, false, None),
        Err(PathError::NonFiniteLength)
    );
    assert_eq!(
        generate_path_points(&far, true, None),
        Err(PathError::NonFiniteLength)
    );
}

#[test]
fn custom_config_changes_density() {
    let wps = load("pacific-coast");
    let cfg = SamplingConfig {
        density: 10.0,
        ..SamplingConfig::default()
    };
    let dense: SampledPath = generate_path_points_with(&cfg, &wps, true, None).unwrap();
    let normal = generate_path_points(&wps, true, None).unwrap();
    assert!(dense.len() > normal.len());
    assert_relative_eq!(dense.length, normal.length, epsilon = 1e-12);
}
