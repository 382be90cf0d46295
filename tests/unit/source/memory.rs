use super::*;
use crate::Producer;
use crate::foundation::core::Region;
use crate::split::dispatch::ThreadingOpts;

fn ramp(region: &Region) -> PixelBuffer<u16> {
    let n = region.number_of_samples() as usize;
    PixelBuffer::from_vec(region.clone(), (0..n as u16).collect()).unwrap()
}

#[test]
fn serves_requested_sub_region() {
    let full = Region::new(&[0, 0], &[4, 3]).unwrap();
    let src = Producer::new(MemorySource::new(ramp(&full))).unwrap();
    src.set_threading(ThreadingOpts::with_threads(2));
    let out = src.primary_output();
    out.update_output_information().unwrap();
    assert_eq!(out.largest_possible_region(), full);

    let part = Region::new(&[1, 1], &[2, 2]).unwrap();
    out.set_requested_region(part.clone()).unwrap();
    out.update().unwrap();

    let view = out.view::<u16>().unwrap();
    assert_eq!(view.region(), &part);
    assert_eq!(view.as_slice(), &[5, 6, 9, 10]);
}

#[test]
fn spacing_flows_into_output_info() {
    let full = Region::new(&[0, 0], &[2, 2]).unwrap();
    let src = Producer::new(MemorySource::new(ramp(&full))).unwrap();
    assert!(src.set(|s| &mut s.spacing, vec![0.5, 2.0]));
    let out = src.primary_output();
    out.update_output_information().unwrap();
    assert_eq!(out.info().spacing.as_slice(), &[0.5, 2.0]);
}

#[test]
fn invalid_spacing_fails_information_pass() {
    let full = Region::new(&[0], &[3]).unwrap();
    let src = Producer::new(MemorySource::new(ramp(&full))).unwrap();
    src.set(|s| &mut s.spacing, vec![0.0]);
    let err = src.update_output_information().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn replacing_buffer_recomputes() {
    let full = Region::new(&[0], &[3]).unwrap();
    let src = Producer::new(MemorySource::new(ramp(&full))).unwrap();
    let out = src.primary_output();
    out.update().unwrap();

    src.configure(|s| {
        s.set_buffer(PixelBuffer::from_vec(full.clone(), vec![7u16, 8, 9]).unwrap())
    });
    let stats = out.update().unwrap();
    assert_eq!(stats.producers_executed, 1);
    assert_eq!(out.view::<u16>().unwrap().as_slice(), &[7, 8, 9]);
}
