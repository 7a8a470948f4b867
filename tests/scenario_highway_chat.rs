//! S1: two highways chat through a channel (spec §8).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use carriageway::error::SourceLocation;
use carriageway::highway::{Highway, HighwayConfig};

fn small_highway() -> Highway {
    Highway::new(HighwayConfig {
        capacity: 2,
        ..HighwayConfig::default()
    })
}

#[test]
fn two_highways_ping_pong_two_hundred_times() {
    let a = small_highway();
    let b = small_highway();
    let counter = Arc::new(AtomicU32::new(0));
    let rounds_left = Arc::new(AtomicU32::new(100));

    fn post_round(from: Highway, to: Highway, counter: Arc<AtomicU32>, rounds_left: Arc<AtomicU32>) {
        let next_from = to.clone();
        let next_to = from.clone();
        from.execute(SourceLocation::new(file!(), line!()), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            if rounds_left.fetch_sub(1, Ordering::SeqCst) > 1 {
                post_round(next_from.clone(), next_to.clone(), counter.clone(), rounds_left.clone());
            }
        });
    }

    post_round(a.clone(), b.clone(), counter.clone(), rounds_left.clone());

    loop {
        a.flush_tasks();
        b.flush_tasks();
        if rounds_left.load(Ordering::SeqCst) == 0 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    assert_eq!(counter.load(Ordering::SeqCst), 200);
    a.destroy();
    b.destroy();
}
