use super::*;
use crate::data::buffer::Tile;

fn r(index: &[i64], size: &[u64]) -> Region {
    Region::new(index, size).unwrap()
}

#[test]
fn copy_first_input_fills_every_output() {
    let inputs = vec![Some(ImageInfo::new(r(&[0, 0], &[3, 3]))), None];
    let mut outputs = vec![ImageInfo::default(); 2];
    InformationContext::new(&inputs, &mut outputs)
        .copy_first_input()
        .unwrap();
    assert!(outputs.iter().all(|o| o.largest == r(&[0, 0], &[3, 3])));
}

#[test]
fn copy_first_input_rejects_mixed_dimensions() {
    let inputs = vec![
        Some(ImageInfo::new(r(&[0, 0], &[3, 3]))),
        Some(ImageInfo::new(r(&[0], &[3]))),
    ];
    let mut outputs = vec![ImageInfo::default()];
    let err = InformationContext::new(&inputs, &mut outputs)
        .copy_first_input()
        .unwrap_err();
    assert!(err.is_configuration());

    let none: Vec<Option<ImageInfo>> = vec![None];
    let err = InformationContext::new(&none, &mut outputs)
        .copy_first_input()
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn output_request_is_clipped_per_input() {
    let mut req = RequestContext::new(
        r(&[2], &[10]),
        vec![Some(r(&[0], &[8])), None, Some(r(&[4], &[20]))],
    );
    req.copy_output_to_inputs().unwrap();
    assert_eq!(
        req.into_requests(),
        vec![Some(r(&[2], &[6])), None, Some(r(&[4], &[8]))]
    );
}

#[test]
fn input_request_must_fit_input() {
    let mut req = RequestContext::new(r(&[0], &[4]), vec![Some(r(&[0], &[4]))]);
    let err = req.set_input_requested(0, r(&[-1], &[6])).unwrap_err();
    assert!(err.is_invalid_region());
    assert!(req.set_input_requested(1, r(&[0], &[1])).unwrap_err().is_configuration());

    let padded = req.clip_to_input(0, &r(&[-1], &[6])).unwrap();
    req.set_input_requested(0, padded).unwrap();
    assert_eq!(req.into_requests(), vec![Some(r(&[0], &[4]))]);
}

#[test]
fn tiles_are_typed() {
    let tile: Box<dyn AnyTile> = Box::new(Tile::<u8>::new(r(&[0], &[2])).unwrap());
    let mut tiles = OutputTiles::new(r(&[0], &[2]), vec![tile]);
    assert_eq!(tiles.len(), 1);
    assert!(tiles.tile::<f32>(0).unwrap_err().is_configuration());
    assert!(tiles.tile::<u8>(1).unwrap_err().is_configuration());
    tiles.tile::<u8>(0).unwrap().set(&[1], 7).unwrap();
    assert_eq!(tiles.tile::<u8>(0).unwrap().as_slice(), &[0, 7]);
}

#[test]
fn stage_inputs_report_missing_slots() {
    let obj = Arc::new(DataObject::from_samples(r(&[0], &[2]), vec![1i16, 2]).unwrap());
    let slots = vec![None, Some(obj)];
    let inputs = StageInputs::new(&slots);
    assert_eq!(inputs.len(), 2);
    assert!(inputs.object(0).unwrap_err().is_configuration());
    assert_eq!(inputs.image::<i16>(1).unwrap().as_slice(), &[1, 2]);
    assert!(inputs.image::<u8>(1).is_err());
}
