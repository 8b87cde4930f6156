mod common;

use std::fs;

use common::scratch_dir;
use string_weave::{
    cache::{self, CacheKey},
    verboser::Silent,
    ChordCache, Evaluator, Layout, Ramp,
};

#[test]
fn wide_table_survives_the_disk() {
    let _ = env_logger::builder().is_test(true).try_init();
    // 200 x 200 pixels need 32 bit indexes.
    let layout = Layout::new(100, 6).unwrap();
    assert!(layout.wide_indices());
    let ramp = Ramp::<f64>::default();
    let table = Evaluator::new(layout, ramp, &Silent).evaluate(&Silent);

    let dir = scratch_dir("wide");
    let cache = ChordCache::new(&dir);
    let key = CacheKey::new(layout, &ramp);
    cache.store(&key, &table, &Silent).unwrap();

    let path = cache.path(&key);
    assert!(path.exists());
    assert!(!path.with_extension("bin.partial").exists());
    assert_eq!(cache.load(&key, &Silent).unwrap(), Some(table));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn corrupt_file_is_an_error_not_a_rebuild() {
    let layout = Layout::new(5, 5).unwrap();
    let ramp = Ramp::<f64>::default();
    let table = Evaluator::new(layout, ramp, &Silent).evaluate(&Silent);

    let dir = scratch_dir("corrupt");
    let cache = ChordCache::new(&dir);
    let key = CacheKey::new(layout, &ramp);
    let mut bytes = cache::write(&table).unwrap();
    bytes.truncate(bytes.len() - 1);
    fs::create_dir_all(&dir).unwrap();
    fs::write(cache.path(&key), &bytes).unwrap();

    assert!(matches!(
        cache.load_or_evaluate(layout, ramp, &Silent),
        Err(cache::Error::Truncated)
    ));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_loads_as_none() {
    let dir = scratch_dir("missing");
    let cache = ChordCache::new(&dir);
    let key = CacheKey::new(Layout::new(4, 4).unwrap(), &Ramp::<f64>::default());
    assert!(cache.load(&key, &Silent).unwrap().is_none());
}
