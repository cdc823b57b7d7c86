use std::sync::Arc;
use std::thread;

use interop_core::{init, Config, ConversionRegistry, Factor, SparseMatrix};
use interop_testkit::fixtures::sparse_6x6;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn sealed_registry_is_shared_across_threads() {
    assert_send_sync::<ConversionRegistry>();
    let registry = init(&Config::default()).unwrap();
    let lifted = registry.lift(sparse_6x6().unwrap()).unwrap();

    thread::scope(|s| {
        for t in 0..8_i32 {
            let registry = &registry;
            let lifted = lifted.share();
            s.spawn(move || {
                for _ in 0..50 {
                    let m: SparseMatrix = registry.project(&lifted).unwrap();
                    assert_eq!(m.nnz(), 6);
                    let values: Vec<i32> = registry.project(&registry.lift(vec![t, t + 1]).unwrap()).unwrap();
                    assert_eq!(values, vec![t, t + 1]);
                }
            });
        }
    });
    assert!(!lifted.is_shared());
}

#[test]
fn arc_registry_outlives_its_creator() {
    let registry = Arc::new(init(&Config::default()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let labels = vec![Some(format!("l{}", i % 2)), None];
                let lifted = registry.lift(Factor::from_labels(&labels)).unwrap();
                let back: Factor = registry.project(&lifted).unwrap();
                back.len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
}
