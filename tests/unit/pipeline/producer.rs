use super::*;
use crate::foundation::error::GridflowError;

fn r(index: &[i64], size: &[u64]) -> Region {
    Region::new(index, size).unwrap()
}

struct Fill {
    value: Property<i32>,
}

impl Stage for Fill {
    fn name(&self) -> &'static str {
        "fill"
    }

    fn required_inputs(&self) -> usize {
        0
    }

    fn make_outputs(&self) -> Vec<DataObject> {
        vec![DataObject::new::<i32>()]
    }

    fn generate_output_information(&self, info: &mut InformationContext<'_>) -> GridflowResult<()> {
        info.set_all_outputs(&ImageInfo::new(Region::new(&[0, 0], &[2, 4])?));
        Ok(())
    }

    fn generate_data(&self, _inputs: &StageInputs<'_>, outputs: &mut OutputTiles) -> GridflowResult<()> {
        let v = *self.value.get();
        let tile = outputs.tile::<i32>(0)?;
        if v < 0 && tile.region().start(1) == 2 {
            return Err(GridflowError::compute("row 2 refused"));
        }
        tile.fill_with(|_| Ok(v))
    }
}

struct NoOutputs;

impl Stage for NoOutputs {
    fn make_outputs(&self) -> Vec<DataObject> {
        Vec::new()
    }

    fn generate_data(&self, _inputs: &StageInputs<'_>, _outputs: &mut OutputTiles) -> GridflowResult<()> {
        Ok(())
    }
}

fn fill(value: i32) -> Producer<Fill> {
    Producer::new(Fill {
        value: Property::new(value),
    })
    .unwrap()
}

#[test]
fn stage_without_outputs_is_rejected() {
    let Err(err) = Producer::new(NoOutputs) else {
        panic!("a stage without outputs must be rejected");
    };
    assert!(err.is_configuration());
}

#[test]
fn outputs_point_back_at_producer() {
    let p = fill(1);
    let out = p.primary_output();
    assert!(out.has_source());
    assert_eq!(out.source().map(|(node, idx)| (node.id(), idx)), Some((p.id(), 0)));
    assert!(p.output(1).unwrap_err().is_configuration());

    drop(p);
    assert!(!out.has_source());
}

#[test]
fn reconnecting_same_input_keeps_stamp() {
    let a = Arc::new(DataObject::new::<i32>());
    let b = Arc::new(DataObject::new::<i32>());
    let p = fill(0);

    p.set_input(0, &a);
    let t = p.mtime();
    p.set_input(0, &a);
    assert_eq!(p.mtime(), t);

    p.set_input(2, &b);
    assert!(p.mtime() > t);
    assert_eq!(p.number_of_inputs(), 3);
    assert!(p.input(1).is_none());

    p.clear_input(2);
    assert_eq!(p.number_of_inputs(), 1);
    assert!(Arc::ptr_eq(&p.input(0).unwrap(), &a));
}

#[test]
fn property_set_stamps_only_on_change() {
    let p = fill(3);
    let t = p.mtime();
    assert!(!p.set(|s| &mut s.value, 3));
    assert_eq!(p.mtime(), t);
    assert!(p.set(|s| &mut s.value, 4));
    assert!(p.mtime() > t);
    assert_eq!(*p.stage().value.get(), 4);

    let t = p.mtime();
    p.configure(|_| ());
    assert!(p.mtime() > t);

    let t = p.mtime();
    p.set_threading(ThreadingOpts::sequential());
    assert_eq!(p.mtime(), t);
    assert!(!p.threading().parallel);
}

#[test]
fn failed_worker_keeps_sibling_tiles() {
    let p = fill(-1);
    p.set_threading(ThreadingOpts::with_threads(4));
    let out = p.primary_output();
    out.set_buffered_region(r(&[0, 0], &[2, 4])).unwrap();

    let err = p.inner.generate_data().unwrap_err();
    assert!(err.is_compute());

    let view = out.view::<i32>().unwrap();
    assert_eq!(view.as_slice(), &[-1, -1, -1, -1, 0, 0, -1, -1]);
}

#[test]
fn handle_reaches_same_node() {
    let p = fill(9);
    let h: ProducerHandle = p.clone().into();
    assert_eq!(h.id(), p.id());
    assert_eq!(h.name(), "fill");
    assert_eq!(h.required_inputs(), 0);
    assert!(Arc::ptr_eq(&h.primary_output(), &p.primary_output()));

    let stats = h.update().unwrap();
    assert_eq!(stats.producers_executed, 1);
    assert_eq!(p.primary_output().view::<i32>().unwrap().get(&[1, 3]), Some(9));
}
