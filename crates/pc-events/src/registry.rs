//! Handler registry
//!
//! Element identity -> event type key -> registrations, in insertion order.
//! Element identities and handler sequence numbers come from one counter.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use pc_dom::{Element, ListenerId, WeakElement};

use crate::Callback;

/// Handler identity: the registration's namespace plus a sequence number.
/// Textual form is `<namespace>::<seq>`, or just `<seq>` without namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerUid {
    namespace: Option<String>,
    seq: u64,
}

impl HandlerUid {
    /// Uid text with the trailing `::<seq>` removed
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => ns.clone(),
            None => self.seq.to_string(),
        }
    }
}

impl fmt::Display for HandlerUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}::{}", ns, self.seq),
            None => write!(f, "{}", self.seq),
        }
    }
}

/// One bound callback
#[derive(Debug)]
pub(crate) struct Registration {
    pub uid: HandlerUid,
    pub callable: Callback,
    pub selector: Option<String>,
    /// Shared with the native listener wrapper
    pub one_off: Rc<Cell<bool>>,
    pub listener: ListenerId,
}

impl Registration {
    /// Registered with a selector, hence in the capture phase
    pub fn is_delegated(&self) -> bool {
        self.selector.is_some()
    }

    fn is_binding(&self, callable: &Callback, selector: Option<&str>) -> bool {
        self.callable.same(callable) && self.selector.as_deref() == selector
    }
}

/// Registrations of one element, keyed by type
#[derive(Debug)]
pub(crate) struct ElementEntry {
    owner: WeakElement,
    types: HashMap<String, Vec<Registration>>,
}

#[derive(Debug)]
pub(crate) struct Registry {
    next_uid: u64,
    elements: HashMap<u64, ElementEntry>,
}

impl Registry {
    /// Empty registry; the shared counter starts at 1
    pub fn new() -> Self {
        Self {
            next_uid: 1,
            elements: HashMap::new(),
        }
    }

    fn bump(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Identity of `element`, assigned on first use
    pub fn element_uid(&mut self, element: &Element) -> u64 {
        if let Some(uid) = element.event_uid() {
            return uid;
        }
        let uid = self.bump();
        element.set_event_uid(uid);
        uid
    }

    /// Fresh handler uid carrying `namespace`
    pub fn next_handler_uid(&mut self, namespace: Option<String>) -> HandlerUid {
        HandlerUid {
            namespace,
            seq: self.bump(),
        }
    }

    /// Registration bound to `callable`/`selector` under `type_key`
    pub fn find(
        &self,
        element: u64,
        type_key: &str,
        callable: &Callback,
        selector: Option<&str>,
    ) -> Option<&Registration> {
        self.bucket(element, type_key)?
            .iter()
            .find(|r| r.is_binding(callable, selector))
    }

    /// Append a registration for `owner`, whose identity is `element`
    pub fn insert(&mut self, owner: &Element, element: u64, type_key: &str, registration: Registration) {
        self.elements
            .entry(element)
            .or_insert_with(|| ElementEntry {
                owner: owner.downgrade(),
                types: HashMap::new(),
            })
            .types
            .entry(type_key.to_string())
            .or_default()
            .push(registration);
    }

    /// Detach the entries of elements whose document is gone.
    /// Returned so callers can drop them with no registry borrow held.
    pub fn prune(&mut self) -> Vec<ElementEntry> {
        let dead: Vec<u64> = self
            .elements
            .iter()
            .filter(|(_, entry)| entry.owner.upgrade().is_none())
            .map(|(&uid, _)| uid)
            .collect();
        if !dead.is_empty() {
            tracing::debug!("Pruning handlers of {} dropped element(s)", dead.len());
        }
        dead.iter().filter_map(|uid| self.elements.remove(uid)).collect()
    }

    fn bucket(&self, element: u64, type_key: &str) -> Option<&Vec<Registration>> {
        self.elements.get(&element)?.types.get(type_key)
    }

    fn take_where(
        &mut self,
        element: u64,
        type_key: &str,
        pred: impl Fn(&Registration) -> bool,
    ) -> Option<Registration> {
        let types = &mut self.elements.get_mut(&element)?.types;
        let bucket = types.get_mut(type_key)?;
        let index = bucket.iter().position(pred)?;
        let registration = bucket.remove(index);

        if bucket.is_empty() {
            types.remove(type_key);
        }
        if types.is_empty() {
            self.elements.remove(&element);
        }
        Some(registration)
    }

    /// Remove the registration bound to `callable`/`selector`
    pub fn take_binding(
        &mut self,
        element: u64,
        type_key: &str,
        callable: &Callback,
        selector: Option<&str>,
    ) -> Option<Registration> {
        self.take_where(element, type_key, |r| r.is_binding(callable, selector))
    }

    /// Remove the registration with `uid`
    pub fn take_uid(&mut self, element: u64, type_key: &str, uid: &HandlerUid) -> Option<Registration> {
        self.take_where(element, type_key, |r| r.uid == *uid)
    }

    /// Registrations under one type key
    pub fn bucket_len(&self, element: u64, type_key: &str) -> usize {
        self.bucket(element, type_key).map_or(0, Vec::len)
    }

    /// Type keys with at least one registration
    pub fn types(&self, element: u64) -> Vec<String> {
        self.elements
            .get(&element)
            .map(|entry| entry.types.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Uids in a bucket, safe to iterate while removing
    pub fn snapshot(&self, element: u64, type_key: &str) -> Vec<HandlerUid> {
        self.bucket(element, type_key)
            .map(|bucket| bucket.iter().map(|r| r.uid.clone()).collect())
            .unwrap_or_default()
    }

    /// Registrations of `element` across all types
    pub fn len(&self, element: u64) -> usize {
        self.elements
            .get(&element)
            .map_or(0, |entry| entry.types.values().map(Vec::len).sum())
    }

    /// Elements with at least one registration
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_dom::Document;

    fn registration(registry: &mut Registry, ns: Option<&str>, cb: &Callback) -> Registration {
        Registration {
            uid: registry.next_handler_uid(ns.map(str::to_string)),
            callable: cb.clone(),
            selector: None,
            one_off: Rc::new(Cell::new(false)),
            listener: dummy_listener(),
        }
    }

    fn dummy_listener() -> ListenerId {
        let doc = Document::empty("about:blank");
        doc.root().add_event_listener("x", Rc::new(|_| {}), false)
    }

    #[test]
    fn test_uid_text() {
        let mut registry = Registry::new();
        let plain = registry.next_handler_uid(None);
        let named = registry.next_handler_uid(Some("menu.open".into()));

        assert_eq!(plain.to_string(), "1");
        assert_eq!(plain.key(), "1");
        assert_eq!(named.to_string(), "menu.open::2");
        assert_eq!(named.key(), "menu.open");
    }

    #[test]
    fn test_element_uid_is_stable() {
        let doc = Document::new("about:blank");
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let mut registry = Registry::new();

        let first = registry.element_uid(&a);
        assert_eq!(registry.element_uid(&a), first);
        assert_ne!(registry.element_uid(&b), first);
    }

    #[test]
    fn test_find_and_take() {
        let mut registry = Registry::new();
        let cb = Callback::new(|_, _| {});
        let other = Callback::new(|_, _| {});
        let doc = Document::new("about:blank");
        let owner = doc.create_element("div");
        let reg = registration(&mut registry, Some("ns"), &cb);
        let uid = reg.uid.clone();
        registry.insert(&owner, 7, "click", reg);

        assert!(registry.find(7, "click", &cb, None).is_some());
        assert!(registry.find(7, "click", &cb, Some(".x")).is_none());
        assert!(registry.find(7, "click", &other, None).is_none());
        assert_eq!(registry.len(7), 1);

        assert!(registry.take_uid(7, "click", &uid).is_some());
        assert_eq!(registry.bucket_len(7, "click"), 0);
        assert!(registry.types(7).is_empty());
    }

    #[test]
    fn test_prune_drops_entries_of_dead_documents() {
        let mut registry = Registry::new();
        let cb = Callback::new(|_, _| {});
        let live_doc = Document::new("about:blank");
        let live = live_doc.create_element("div");

        {
            let doc = Document::new("about:blank");
            let owner = doc.create_element("div");
            let reg = registration(&mut registry, None, &cb);
            registry.insert(&owner, 1, "click", reg);
        }
        let reg = registration(&mut registry, None, &cb);
        registry.insert(&live, 2, "click", reg);

        assert_eq!(registry.element_count(), 2);
        let stale = registry.prune();
        assert_eq!(stale.len(), 1);
        assert_eq!(registry.element_count(), 1);
        assert_eq!(registry.len(2), 1);
    }
}
