//! S3: if/else split by label (spec §8).

use std::sync::Arc;

use carriageway::graph::{Node, ResultNode};

const EVEN: i32 = 0;
const ODD: i32 = 1;

#[test]
fn node_routes_even_and_odd_to_separate_result_nodes() {
    let node = Arc::new(Node::<u32, bool>::new(1, |x, _label, outputs| {
        let label = if x % 2 == 0 { EVEN } else { ODD };
        outputs.publish(label, true);
    }));
    let even_result = ResultNode::<bool>::new(2);
    let odd_result = ResultNode::<bool>::new(3);

    node.connect_to_direct_channel(EVEN, even_result.clone());
    node.connect_to_direct_channel(ODD, odd_result.clone());

    let input = node.input(0);
    for x in [0u32, 1, 2, 3] {
        input.send(x);
    }

    assert!(even_result.has_result());
    assert!(odd_result.has_result());
    assert_eq!(even_result.get_result(), true);
    assert_eq!(odd_result.get_result(), true);
}
