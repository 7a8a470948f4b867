//! S2: sticky replay (spec §8).

use std::sync::{Arc, Mutex};

use carriageway::channel::{DirectInline, StickyPublisher};
use carriageway::highway::{Highway, HighwayConfig};

#[test]
fn sticky_publisher_replays_last_value_to_each_new_subscriber() {
    let highway = Highway::new(HighwayConfig::default());
    let publisher: StickyPublisher<u32> = StickyPublisher::new(highway.clone());

    publisher.publish(42);

    let record: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let r = record.clone();
    publisher.subscribe(Arc::new(DirectInline::new(move |v| {
        r.lock().unwrap().push(v);
        true
    })));
    highway.flush_tasks();
    assert_eq!(*record.lock().unwrap(), vec![42]);

    publisher.publish(43);
    highway.flush_tasks();
    assert_eq!(*record.lock().unwrap(), vec![42, 43]);

    let second: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let s = second.clone();
    publisher.subscribe(Arc::new(DirectInline::new(move |v| {
        s.lock().unwrap().push(v);
        true
    })));
    highway.flush_tasks();
    assert_eq!(*second.lock().unwrap(), vec![43]);

    highway.destroy();
}
