use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lane_motion_counter::capture::{FrameSource, SyntheticSource};
use lane_motion_counter::detection::{ChangeMap, DetectionRegion, LaneMonitor};

fn frame_pair() -> (lane_motion_counter::Frame, lane_motion_counter::Frame) {
    let region = DetectionRegion::new(570, 650, 200, 20);
    let mut source = SyntheticSource::for_regions(1920, 1080, &[region], 200);
    // Skip ahead until the vehicle is on screen
    let frames: Vec<_> = std::iter::from_fn(|| source.next_frame().ok().flatten())
        .skip(60)
        .take(2)
        .collect();
    let mut frames = frames.into_iter();
    match (frames.next(), frames.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => panic!("synthetic source produced too few frames"),
    }
}

fn bench_change_map(c: &mut Criterion) {
    let (previous, current) = frame_pair();

    c.bench_function("change_map_1080p", |b| {
        b.iter(|| ChangeMap::compute(black_box(&previous), black_box(&current), 30))
    });
}

fn bench_lane_evaluate(c: &mut Criterion) {
    let (previous, current) = frame_pair();
    let map = ChangeMap::compute(&previous, &current, 30).unwrap();
    let mut lane = LaneMonitor::new(DetectionRegion::new(570, 650, 200, 20), 5000).unwrap();

    c.bench_function("lane_evaluate_200x20", |b| {
        b.iter(|| lane.evaluate(black_box(&map)))
    });
}

criterion_group!(benches, bench_change_map, bench_lane_evaluate);
criterion_main!(benches);
