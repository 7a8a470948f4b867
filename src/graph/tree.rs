//! [`ExecutionTree`]: an id-keyed registry of nodes, supporting dynamic
//! reconfiguration while the graph is running (spec §4.7).

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use super::node::ErasedNode;

/// Owns every node in a graph by integer id. Nodes themselves stay
/// typed (`Arc<Node<In, Out>>` / `Arc<ResultNode<T>>`) in the caller's
/// hands; the tree only needs the type-erased view to allocate ids and
/// to remove a node by id from code that doesn't know its type (spec
/// §9's "label maps are integer-keyed, values are boxed subscriptions
/// with erased delivery types matched at connect time" applied one
/// level up, to the node registry itself).
///
/// Because every publish this crate performs routes through a
/// highway's single-threaded dispatch or a synchronous direct call, a
/// remove that runs concurrently with an in-flight publish either
/// completes before or after that publish's delivery attempt, never
/// mid-delivery: [`super::node::Node::mark_removed`] only gates the
/// *next* attempted delivery.
#[derive(Default)]
pub struct ExecutionTree {
    nodes: Mutex<HashMap<i32, Arc<dyn ErasedNode>>>,
    next_id: AtomicI32,
}

impl ExecutionTree {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Allocates an id no node in this tree has used yet.
    pub fn generate_node_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers `node` under its own `node_id`. Replaces anything
    /// previously registered at that id.
    pub fn add_node(&self, node: Arc<dyn ErasedNode>) {
        self.nodes.lock().unwrap().insert(node.node_id(), node);
    }

    pub fn get_node(&self, node_id: i32) -> Option<Arc<dyn ErasedNode>> {
        self.nodes.lock().unwrap().get(&node_id).cloned()
    }

    /// Marks the node removed (so its input endpoints stop accepting
    /// deliveries) and drops the tree's registry entry for it. Any
    /// `Arc` clones held by upstream publishers keep the node alive
    /// until their next failed delivery prunes them.
    pub fn remove_node(&self, node_id: i32) -> bool {
        let removed = self.nodes.lock().unwrap().remove(&node_id);
        match removed {
            Some(node) => {
                node.mark_removed();
                true
            }
            None => false,
        }
    }

    pub fn remove_all(&self) {
        let mut guard = self.nodes.lock().unwrap();
        for node in guard.values() {
            node.mark_removed();
        }
        guard.clear();
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Node;

    #[test]
    fn generated_ids_are_unique() {
        let tree = ExecutionTree::new();
        let a = tree.generate_node_id();
        let b = tree.generate_node_id();
        assert_ne!(a, b);
    }

    #[test]
    fn remove_node_marks_it_removed_and_drops_it_from_the_tree() {
        let tree = ExecutionTree::new();
        let id = tree.generate_node_id();
        let node = Arc::new(Node::<u32, u32>::new(id, |_, _, _| {}));
        tree.add_node(node.clone());
        assert_eq!(tree.node_count(), 1);

        assert!(tree.remove_node(id));
        assert_eq!(tree.node_count(), 0);

        let input = node.input(0);
        assert!(!input.send(1));
    }

    #[test]
    fn remove_all_clears_the_registry() {
        let tree = ExecutionTree::new();
        for _ in 0..3 {
            let id = tree.generate_node_id();
            tree.add_node(Arc::new(Node::<u32, u32>::new(id, |_, _, _| {})));
        }
        tree.remove_all();
        assert_eq!(tree.node_count(), 0);
    }
}
