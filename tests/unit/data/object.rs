use super::*;

fn r(index: &[i64], size: &[u64]) -> Region {
    Region::new(index, size).unwrap()
}

#[test]
fn new_object_is_empty_and_unstamped() {
    let obj = DataObject::new::<f32>();
    assert_eq!(obj.dimension(), 0);
    assert!(obj.largest_possible_region().is_empty());
    assert!(obj.buffered_region().is_empty());
    assert!(obj.update_time().is_zero());
    assert!(!obj.has_source());
    assert_eq!(obj.sample_size(), 4);
}

#[test]
fn requested_region_must_fit_largest() {
    let obj = DataObject::new::<u8>();
    obj.set_largest_possible_region(r(&[0, 0], &[8, 8]));
    assert_eq!(obj.requested_region(), r(&[0, 0], &[8, 8]));

    obj.set_requested_region(r(&[2, 2], &[4, 4])).unwrap();
    assert_eq!(obj.requested_region(), r(&[2, 2], &[4, 4]));

    let err = obj.set_requested_region(r(&[6, 6], &[4, 4])).unwrap_err();
    assert!(err.is_invalid_region());
    assert_eq!(obj.requested_region(), r(&[2, 2], &[4, 4]));
}

#[test]
fn buffered_region_reallocates_storage() {
    let obj = DataObject::new::<u16>();
    obj.set_buffered_region(r(&[0], &[5])).unwrap();
    assert_eq!(obj.view::<u16>().unwrap().as_slice().len(), 5);
    obj.set_buffered_region(r(&[0], &[2])).unwrap();
    assert_eq!(obj.view::<u16>().unwrap().as_slice().len(), 2);
}

#[test]
fn from_samples_is_buffered_and_current() {
    let obj = DataObject::from_samples(r(&[0, 0], &[2, 2]), vec![1i32, 2, 3, 4]).unwrap();
    assert_eq!(obj.buffered_region(), obj.largest_possible_region());
    assert!(!obj.update_time().is_zero());
    assert_eq!(obj.view::<i32>().unwrap().get(&[1, 0]), Some(2));
}

#[test]
fn view_with_wrong_type_is_configuration_error() {
    let obj = DataObject::new::<u8>();
    assert!(obj.view::<f64>().unwrap_err().is_configuration());
}

#[test]
fn modified_advances_mtime_and_pipeline_mtime() {
    let obj = DataObject::new::<u8>();
    let before = obj.mtime();
    obj.modified();
    assert!(obj.mtime() > before);
    assert_eq!(obj.pipeline_mtime(), obj.mtime());
}

#[test]
fn release_data_invalidates_buffer() {
    let obj = DataObject::from_samples(r(&[0], &[3]), vec![1u8, 2, 3]).unwrap();
    obj.release_data();
    assert!(obj.buffered_region().is_empty());
    assert_eq!(obj.buffered_region().dimension(), 1);
    assert!(obj.update_time().is_zero());
    assert!(obj.view::<u8>().unwrap().as_slice().is_empty());
}

#[test]
fn image_info_validates_spacing_and_origin() {
    let info = ImageInfo::new(r(&[0, 0], &[4, 4]));
    assert_eq!(info.spacing.as_slice(), &[1.0, 1.0]);
    assert!(info.clone().with_spacing(&[1.0]).unwrap_err().is_configuration());
    assert!(info.clone().with_spacing(&[1.0, 0.0]).unwrap_err().is_configuration());
    let info = info.with_spacing(&[0.5, 2.0]).unwrap().with_origin(&[-1.0, 3.0]).unwrap();
    assert_eq!(info.origin.as_slice(), &[-1.0, 3.0]);
}

#[test]
fn only_caller_requests_are_demanded() {
    let obj = DataObject::new::<u8>();
    obj.set_largest_possible_region(r(&[0], &[10]));
    assert_eq!(obj.demanded_region(), r(&[0], &[10]));

    obj.store_requested_region(r(&[2], &[3]));
    assert_eq!(obj.requested_region(), r(&[2], &[3]));
    assert_eq!(obj.demanded_region(), r(&[0], &[10]));

    obj.set_requested_region(r(&[4], &[1])).unwrap();
    assert_eq!(obj.demanded_region(), r(&[4], &[1]));

    obj.set_requested_region_to_largest_possible_region();
    assert_eq!(obj.requested_region(), r(&[0], &[10]));
    assert_eq!(obj.demanded_region(), r(&[0], &[10]));
}
