//! Concurrent access to a shared registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use vhost_registry::vhosts::{Vhost, VhostError, Vhosts};

const THREADS: usize = 32;

#[test]
fn test_concurrent_distinct_adds() {
    let vhosts = Vhosts::new();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for i in 0..THREADS {
            let vhosts = &vhosts;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                vhosts
                    .add(Vhost::unlinked(format!("host-{i}.com"), "", ""))
                    .unwrap();
            });
        }
    });

    assert_eq!(vhosts.number_of_vhosts(), THREADS);
    assert_eq!(vhosts.version(), THREADS as u64);
    for i in 0..THREADS {
        assert!(vhosts.get(&format!("host-{i}.com")).is_some());
    }
}

#[test]
fn test_concurrent_duplicate_adds() {
    let vhosts = Vhosts::new();
    let barrier = Barrier::new(THREADS);
    let successes = AtomicUsize::new(0);
    let duplicates = AtomicUsize::new(0);

    thread::scope(|s| {
        for i in 0..THREADS {
            let (vhosts, barrier) = (&vhosts, &barrier);
            let (successes, duplicates) = (&successes, &duplicates);
            s.spawn(move || {
                barrier.wait();
                match vhosts.add(Vhost::unlinked("same.com", "", format!("w{i}"))) {
                    Ok(()) => successes.fetch_add(1, Ordering::SeqCst),
                    Err(VhostError::AlreadyExists(_)) => duplicates.fetch_add(1, Ordering::SeqCst),
                    Err(e) => panic!("unexpected error: {e}"),
                };
            });
        }
    });

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(duplicates.load(Ordering::SeqCst), THREADS - 1);
    assert_eq!(vhosts.number_of_vhosts(), 1);
}

#[test]
fn test_readers_see_consistent_snapshots() {
    let vhosts = Vhosts::new();
    vhosts.add(Vhost::unlinked("anchor.com", "", "")).unwrap();

    thread::scope(|s| {
        let writer = &vhosts;
        s.spawn(move || {
            for i in 0..200 {
                let host = format!("churn-{i}.com");
                writer.add(Vhost::unlinked(host.clone(), "", "")).unwrap();
                writer.remove(&host).unwrap();
            }
        });

        for _ in 0..4 {
            let reader = &vhosts;
            s.spawn(move || {
                for _ in 0..200 {
                    let names = reader.vhostnames();
                    assert_eq!(names[0], "anchor.com");
                    assert!(names.len() <= 2);
                    assert!(reader.get("anchor.com").is_some());
                }
            });
        }
    });

    assert_eq!(vhosts.vhostnames(), vec!["anchor.com"]);
    assert_eq!(vhosts.version(), 401);
}
