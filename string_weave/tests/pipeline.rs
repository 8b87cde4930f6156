mod common;

use std::sync::Mutex;

use common::{banded_target, scratch_dir};
use string_weave::{
    compute,
    verboser::{Logger, Message, Silent},
    ChordCache, Evaluator, Layout, Ramp, Solver, Step,
};

#[test]
fn band_is_covered_by_strings() {
    let _ = env_logger::builder().is_test(true).try_init();
    let target = banded_target(16, 2);
    let solution = compute(&target, 24, Ramp::<f64>::default(), None, &Logger).unwrap();

    let pegs = solution.pegs();
    assert_eq!(pegs[0], 0);
    assert!(pegs.len() > 1);
    assert!(pegs.iter().all(|&peg| peg < 24));
    assert!(pegs.windows(2).all(|pair| pair[0] != pair[1]));
    assert_eq!(solution.layout(), Layout::new(16, 24).unwrap());

    // The drawn walk must hit the band harder than the white rows.
    let image = solution.build_image();
    let dark_in_band = (0..32).filter(|&x| image.get_pixel(x, 16).0 == [0]).count();
    let dark_on_top = (0..32).filter(|&x| image.get_pixel(x, 1).0 == [0]).count();
    assert!(dark_in_band > dark_on_top);
}

#[test]
fn single_and_double_precision_agree_on_a_simple_target() {
    let target = banded_target(10, 2);
    let single = compute(&target, 12, Step::<f32>::new(1.0, 60.0).unwrap(), None, &Silent).unwrap();
    let double = compute(&target, 12, Step::<f64>::new(1.0, 60.0).unwrap(), None, &Silent).unwrap();
    assert!(single.pegs().len() > 1);
    assert!(double.pegs().len() > 1);
    assert_eq!(single.layout(), double.layout());
}

#[test]
fn cached_table_gives_the_same_walk() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = scratch_dir("pipeline");
    let cache = ChordCache::new(&dir);
    let target = banded_target(12, 2);
    let ramp = Ramp::<f64>::new(1.0, 30.0, 2.0, 0.0).unwrap();

    let loads = Mutex::new(Vec::new());
    let stores = Mutex::new(Vec::new());
    let record = |message: Message<'_>| match message {
        Message::LoadingCache(path) => loads.lock().unwrap().push(path.to_owned()),
        Message::StoringCache(path) => stores.lock().unwrap().push(path.to_owned()),
        _ => {}
    };

    let fresh = compute(&target, 16, ramp, Some(&cache), &record).unwrap();
    assert!(loads.lock().unwrap().is_empty());
    assert_eq!(stores.lock().unwrap().len(), 1);

    let cached = compute(&target, 16, ramp, Some(&cache), &record).unwrap();
    assert_eq!(loads.lock().unwrap().len(), 1);
    assert_eq!(stores.lock().unwrap().len(), 1);
    assert_eq!(fresh, cached);

    let stored = stores.lock().unwrap()[0].clone();
    assert_eq!(stored.file_name().unwrap(), "12_16_ramp-1-30-2-0_f64.bin");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn solver_steps_match_solve() {
    let target = banded_target(8, 1);
    let layout = Layout::new(8, 10).unwrap();
    let table = Evaluator::new(layout, Ramp::<f64>::default(), &Silent).evaluate(&Silent);

    let mut stepped = Solver::new(&table, &target).unwrap();
    while stepped.step().is_some() {}
    let solved = Solver::new(&table, &target).unwrap().solve(&Silent);
    assert_eq!(stepped.sequence(), solved.pegs());
}
