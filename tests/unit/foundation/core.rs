use super::*;

fn r(index: &[i64], size: &[u64]) -> Region {
    Region::new(index, size).unwrap()
}

#[test]
fn new_rejects_mismatched_axes() {
    let err = Region::new(&[0, 0], &[4]).unwrap_err();
    assert!(err.is_configuration());
    assert!(Region::new(&[], &[]).unwrap_err().is_configuration());
}

#[test]
fn sample_count_and_emptiness() {
    let a = r(&[2, -1], &[3, 4]);
    assert_eq!(a.number_of_samples(), 12);
    assert!(!a.is_empty());
    assert!(r(&[0, 0], &[3, 0]).is_empty());
    assert!(Region::default().is_empty());
    assert_eq!(Region::default().number_of_samples(), 0);
}

#[test]
fn intersect_overlapping_and_disjoint() {
    let a = r(&[0, 0], &[4, 4]);
    let b = r(&[2, 1], &[4, 2]);
    assert_eq!(a.intersect(&b).unwrap(), r(&[2, 1], &[2, 2]));

    let c = r(&[10, 10], &[2, 2]);
    let i = a.intersect(&c).unwrap();
    assert!(i.is_empty());
    assert_eq!(i.dimension(), 2);
}

#[test]
fn intersect_reports_dimension_mismatch() {
    let a = r(&[0, 0], &[4, 4]);
    let b = r(&[0], &[4]);
    assert!(a.intersect(&b).unwrap_err().is_configuration());
}

#[test]
fn contains_handles_edges_and_empty() {
    let a = r(&[0, 0], &[4, 4]);
    assert!(a.contains(&a));
    assert!(a.contains(&r(&[1, 1], &[3, 3])));
    assert!(!a.contains(&r(&[1, 1], &[4, 3])));
    assert!(!a.contains(&r(&[-1, 0], &[1, 1])));
    assert!(a.contains(&r(&[100, 100], &[0, 0])));
    assert!(!a.contains(&r(&[0], &[1])));
}

#[test]
fn bounding_union_covers_both() {
    let a = r(&[0, 0], &[2, 2]);
    let b = r(&[3, 1], &[1, 4]);
    let u = a.bounding_union(&b).unwrap();
    assert_eq!(u, r(&[0, 0], &[4, 5]));
    assert_eq!(a.bounding_union(&Region::empty(2)).unwrap(), a);
}

#[test]
fn padded_grows_both_sides() {
    let a = r(&[2, 2], &[2, 3]);
    assert_eq!(a.padded(&[1, 2]).unwrap(), r(&[1, 0], &[4, 7]));
    assert!(a.padded(&[1]).unwrap_err().is_configuration());
}

#[test]
fn offset_is_row_major_axis_zero_fastest() {
    let a = r(&[1, 1], &[3, 2]);
    assert_eq!(a.offset_of(&[1, 1]), Some(0));
    assert_eq!(a.offset_of(&[3, 1]), Some(2));
    assert_eq!(a.offset_of(&[1, 2]), Some(3));
    assert_eq!(a.offset_of(&[4, 1]), None);
}

#[test]
fn iter_visits_every_index_in_offset_order() {
    let a = r(&[-1, 5, 0], &[2, 3, 2]);
    let all: Vec<_> = a.iter().collect();
    assert_eq!(all.len() as u64, a.number_of_samples());
    for (i, idx) in all.iter().enumerate() {
        assert_eq!(a.offset_of(idx), Some(i));
    }
    assert_eq!(r(&[0], &[0]).iter().count(), 0);
}

#[test]
fn display_lists_index_and_size() {
    let a = r(&[1, 2], &[3, 4]);
    assert_eq!(a.to_string(), "[index=[1, 2], size=[3, 4]]");
}

#[test]
fn serde_roundtrip_preserves_region() {
    let a = r(&[1, -2, 3], &[4, 5, 6]);
    let json = serde_json::to_string(&a).unwrap();
    let back: Region = serde_json::from_str(&json).unwrap();
    assert_eq!(a, back);
}

#[test]
fn new_rejects_sample_counts_beyond_u64() {
    let huge = 1u64 << 32;
    assert!(Region::from_size(&[huge, huge - 1]).is_ok());
    let err = Region::from_size(&[huge, huge, 2]).unwrap_err();
    assert!(err.is_invalid_region());
}

#[test]
fn padded_reports_overflow_instead_of_wrapping() {
    let edge = r(&[i64::MIN + 1], &[4]);
    assert!(edge.padded(&[2]).unwrap_err().is_invalid_region());
    assert!(r(&[0], &[4]).padded(&[u64::MAX]).unwrap_err().is_invalid_region());
    let far = r(&[i64::MAX - 8], &[4]);
    assert!(far.padded(&[8]).unwrap_err().is_invalid_region());
}

#[test]
fn bounding_union_rejects_uncountable_result() {
    let huge = 1u64 << 32;
    let a = r(&[0, 0], &[1, huge]);
    let b = r(&[(huge as i64) - 1, 0], &[2, huge]);
    assert!(a.bounding_union(&b).unwrap_err().is_invalid_region());
}

#[test]
fn deserialize_validates_regions() {
    let err = serde_json::from_str::<Region>(r#"{"index":[0,0],"size":[1]}"#).unwrap_err();
    assert!(err.to_string().contains("region index has 2 axes but size has 1"));
    let back: Region = serde_json::from_str(r#"{"index":[],"size":[]}"#).unwrap();
    assert_eq!(back, Region::default());
}
