use super::*;
use crate::Producer;
use crate::source::generator::GeneratorSource;
use crate::split::splitter::verify_partition;
use crate::stream::sink::InMemoryRegionSink;

fn r(index: &[i64], size: &[u64]) -> Region {
    Region::new(index, size).unwrap()
}

#[test]
fn piece_count_stacks_along_slowest_axis() {
    let largest = r(&[0, 0, 0], &[4, 4, 10]);
    let plan = StreamingController::new(StreamingOpts::pieces(3))
        .plan(&largest, 4)
        .unwrap();
    let depths: Vec<u64> = plan.iter().map(|p| p.extent(2)).collect();
    assert_eq!(depths, vec![3, 3, 4]);
    verify_partition(&largest, &plan).unwrap();
}

#[test]
fn budget_packs_whole_planes() {
    // One plane is 4 * 4 * 2 bytes = 32 bytes.
    let largest = r(&[0, 0, 5], &[4, 4, 7]);
    let plan = StreamingController::new(StreamingOpts::budget(100))
        .plan(&largest, 2)
        .unwrap();
    let starts: Vec<i64> = plan.iter().map(|p| p.start(2)).collect();
    let depths: Vec<u64> = plan.iter().map(|p| p.extent(2)).collect();
    assert_eq!(starts, vec![5, 8, 11]);
    assert_eq!(depths, vec![3, 3, 1]);
    verify_partition(&largest, &plan).unwrap();
}

#[test]
fn tiny_budget_falls_back_to_single_planes() {
    let largest = r(&[0, 0], &[8, 3]);
    let plan = StreamingController::new(StreamingOpts::budget(1))
        .plan(&largest, 8)
        .unwrap();
    assert_eq!(plan.len(), 3);
    assert!(plan.iter().all(|p| p.extent(1) == 1));
}

#[test]
fn no_limit_means_one_piece() {
    let largest = r(&[0, 0], &[8, 3]);
    let plan = StreamingController::default().plan(&largest, 8).unwrap();
    assert_eq!(plan, vec![largest]);
}

#[test]
fn explicit_axis_and_bad_axis() {
    let largest = r(&[0, 0], &[6, 3]);
    let opts = StreamingOpts {
        axis: Some(0),
        ..StreamingOpts::pieces(2)
    };
    let plan = StreamingController::new(opts).plan(&largest, 1).unwrap();
    assert_eq!(plan, vec![r(&[0, 0], &[3, 3]), r(&[3, 0], &[3, 3])]);

    let opts = StreamingOpts {
        axis: Some(2),
        ..StreamingOpts::default()
    };
    let err = StreamingController::new(opts).plan(&largest, 1).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn options_from_json() {
    let opts = StreamingOpts::from_json_str(r#"{"number_of_pieces": 4}"#).unwrap();
    assert_eq!(opts.number_of_pieces, Some(4));
    assert!(opts.release_after_commit);
    assert!(StreamingOpts::from_json_str(r#"{"number_of_pieces": 0}"#).is_err());
    assert!(StreamingOpts::from_json_str(r#"{"memory_budget_bytes": "lots"}"#).is_err());
}

#[test]
fn streams_generator_into_sink() {
    let largest = r(&[0, 0], &[5, 7]);
    let src = Producer::new(GeneratorSource::new(largest.clone(), |idx: &[i64]| {
        (idx[0] * 100 + idx[1]) as i64
    }))
    .unwrap();
    let out = src.primary_output();

    let mut sink = InMemoryRegionSink::<i64>::new();
    let stats = StreamingController::new(StreamingOpts::pieces(3))
        .stream(&out, &mut sink)
        .unwrap();

    assert_eq!(stats.pieces, 3);
    assert_eq!(stats.samples_committed, 35);
    assert_eq!(stats.producers_executed, 3);
    assert!(sink.is_finished());
    assert_eq!(sink.pieces().len(), 3);
    let buf = sink.buffer().unwrap();
    assert_eq!(buf.region(), &largest);
    assert_eq!(buf.get(&[4, 6]), Some(406));
    assert_eq!(buf.get(&[0, 0]), Some(0));

    // Buffer released after the last piece; no request was set, so none is left behind.
    assert!(out.buffered_region().is_empty());
    assert_eq!(out.requested_region(), largest);
}

#[test]
fn caller_request_survives_streaming() {
    let largest = r(&[0, 0], &[4, 6]);
    let src = Producer::new(GeneratorSource::new(largest.clone(), |idx: &[i64]| {
        (idx[0] + 10 * idx[1]) as i32
    }))
    .unwrap();
    let out = src.primary_output();
    out.update_output_information().unwrap();
    let corner = r(&[1, 2], &[2, 2]);
    out.set_requested_region(corner.clone()).unwrap();

    let mut sink = InMemoryRegionSink::<i32>::new();
    StreamingController::new(StreamingOpts::pieces(2))
        .stream(&out, &mut sink)
        .unwrap();
    assert_eq!(sink.buffer().unwrap().region(), &largest);
    assert_eq!(out.requested_region(), corner);

    out.update().unwrap();
    assert_eq!(out.buffered_region(), corner);
    assert_eq!(out.view::<i32>().unwrap().as_slice(), &[21, 22, 31, 32]);
}

#[test]
fn imported_object_streams_without_release() {
    let region = r(&[0], &[6]);
    let obj = DataObject::from_samples(region.clone(), vec![1u8, 2, 3, 4, 5, 6]).unwrap();
    let mut sink = InMemoryRegionSink::<u8>::new();
    StreamingController::new(StreamingOpts::pieces(4))
        .stream(&obj, &mut sink)
        .unwrap();
    assert_eq!(sink.pieces().len(), 4);
    assert_eq!(sink.buffer().unwrap().as_slice(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(obj.buffered_region(), region);
}
