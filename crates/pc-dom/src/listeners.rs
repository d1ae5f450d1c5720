//! Native event listener storage

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{Event, NodeId};

/// Callback attached to a node for one event type
pub type NativeListener = Rc<dyn Fn(&mut Event)>;

/// Identity of one attached listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) struct ListenerEntry {
    id: ListenerId,
    event_type: String,
    pub capture: bool,
    pub callback: NativeListener,
    /// Set on removal so an in-flight dispatch snapshot skips the entry
    pub removed: Rc<Cell<bool>>,
}

impl Clone for ListenerEntry {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            event_type: self.event_type.clone(),
            capture: self.capture,
            callback: Rc::clone(&self.callback),
            removed: Rc::clone(&self.removed),
        }
    }
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// Listeners per node, in registration order
#[derive(Debug, Default)]
pub(crate) struct ListenerMap {
    next_id: u64,
    by_node: HashMap<NodeId, Vec<ListenerEntry>>,
}

impl ListenerMap {
    pub fn add(
        &mut self,
        node: NodeId,
        event_type: &str,
        capture: bool,
        callback: NativeListener,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.by_node.entry(node).or_default().push(ListenerEntry {
            id,
            event_type: event_type.to_string(),
            capture,
            callback,
            removed: Rc::new(Cell::new(false)),
        });
        id
    }

    pub fn remove(&mut self, node: NodeId, event_type: &str, id: ListenerId, capture: bool) -> bool {
        let Some(entries) = self.by_node.get_mut(&node) else {
            return false;
        };
        let Some(index) = entries
            .iter()
            .position(|e| e.id == id && e.capture == capture && e.event_type == event_type)
        else {
            return false;
        };

        let entry = entries.remove(index);
        entry.removed.set(true);
        if entries.is_empty() {
            self.by_node.remove(&node);
        }
        true
    }

    /// Copy of the listeners for `event_type`, safe to iterate while the map changes
    pub fn snapshot(&self, node: NodeId, event_type: &str) -> Vec<ListenerEntry> {
        self.by_node
            .get(&node)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.event_type == event_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self, node: NodeId, event_type: &str) -> usize {
        self.by_node
            .get(&node)
            .map(|entries| entries.iter().filter(|e| e.event_type == event_type).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_requires_matching_capture() {
        let mut map = ListenerMap::default();
        let id = map.add(NodeId(1), "click", true, Rc::new(|_: &mut Event| {}));

        assert!(!map.remove(NodeId(1), "click", id, false));
        assert_eq!(map.count(NodeId(1), "click"), 1);
        assert!(map.remove(NodeId(1), "click", id, true));
        assert_eq!(map.count(NodeId(1), "click"), 0);
    }

    #[test]
    fn test_snapshot_marks_removed() {
        let mut map = ListenerMap::default();
        let id = map.add(NodeId(1), "click", false, Rc::new(|_: &mut Event| {}));
        map.add(NodeId(1), "keyup", false, Rc::new(|_: &mut Event| {}));

        let snapshot = map.snapshot(NodeId(1), "click");
        assert_eq!(snapshot.len(), 1);
        map.remove(NodeId(1), "click", id, false);
        assert!(snapshot[0].removed.get());
    }
}
