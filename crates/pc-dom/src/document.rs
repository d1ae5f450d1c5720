//! Document - High-level document API
//!
//! `Document` and `Element` are cheap reference-counted handles. Callbacks run
//! with no tree or listener borrow held, so handlers may freely mutate the DOM
//! or their own listeners while an event is being dispatched.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::listeners::ListenerMap;
use crate::{
    DOMTokenList, DomError, DomResult, DomTree, Event, EventPhase, ListenerId, NativeListener,
    NodeId, SelectorError, SelectorList,
};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

struct DocumentInner {
    id: u64,
    url: String,
    tree: RefCell<DomTree>,
    listeners: RefCell<ListenerMap>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

/// HTML Document
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    /// Create a document with the `html`/`head`/`body` skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Fresh nodes into a fresh tree cannot violate hierarchy rules
        let root = tree.root();
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self::from_parts(url, tree, html, head, body)
    }

    /// Create a document with no structure below the document node
    pub fn empty(url: &str) -> Self {
        Self::from_parts(url, DomTree::new(), NodeId::NONE, NodeId::NONE, NodeId::NONE)
    }

    fn from_parts(url: &str, tree: DomTree, html: NodeId, head: NodeId, body: NodeId) -> Self {
        let id = NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Created document {} ({})", id, url);
        Self {
            inner: Rc::new(DocumentInner {
                id,
                url: url.to_string(),
                tree: RefCell::new(tree),
                listeners: RefCell::new(ListenerMap::default()),
                html,
                head,
                body,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Wrap a node of this document in a handle
    pub fn element(&self, id: NodeId) -> Option<Element> {
        self.with_tree(|tree| tree.get(id).is_some())
            .then(|| Element { doc: self.clone(), id })
    }

    /// Handle on the document node itself
    pub fn root(&self) -> Element {
        Element { doc: self.clone(), id: NodeId::ROOT }
    }

    pub fn document_element(&self) -> Option<Element> {
        self.element(self.inner.html)
    }

    pub fn head(&self) -> Option<Element> {
        self.element(self.inner.head)
    }

    pub fn body(&self) -> Option<Element> {
        self.element(self.inner.body)
    }

    /// Create a detached element
    pub fn create_element(&self, tag_name: &str) -> Element {
        let id = self.inner.tree.borrow_mut().create_element(tag_name);
        Element { doc: self.clone(), id }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        let found = self.with_tree(|tree| {
            tree.descendants(tree.root()).into_iter().find(|&n| {
                tree.get(n)
                    .and_then(|node| node.as_element())
                    .is_some_and(|e| e.id.as_deref() == Some(id))
            })
        })?;
        self.element(found)
    }

    /// Run `f` with shared access to the tree
    pub fn with_tree<R>(&self, f: impl FnOnce(&DomTree) -> R) -> R {
        f(&self.inner.tree.borrow())
    }

    /// Run `f` with exclusive access to the tree
    pub fn with_tree_mut<R>(&self, f: impl FnOnce(&mut DomTree) -> R) -> R {
        f(&mut self.inner.tree.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn dispatch(&self, target: NodeId, event: &mut Event) -> bool {
        let path: Vec<NodeId> = self.with_tree(|tree| {
            std::iter::once(target).chain(tree.ancestors(target)).collect()
        });

        tracing::trace!(
            "Dispatching '{}' on {:?} (path length {})",
            event.event_type(),
            target,
            path.len()
        );
        event.begin_dispatch(Element { doc: self.clone(), id: target });

        // Capture: root down to the target's parent
        for &node in path.iter().skip(1).rev() {
            if event.is_propagation_stopped() {
                break;
            }
            self.invoke(node, event, EventPhase::Capturing, true);
        }

        // Target: capture listeners first, then the rest
        if !event.is_propagation_stopped() {
            self.invoke(target, event, EventPhase::AtTarget, true);
            if !event.is_immediate_propagation_stopped() {
                self.invoke(target, event, EventPhase::AtTarget, false);
            }
        }

        // Bubble: parent up to the root
        if event.bubbles() {
            for &node in path.iter().skip(1) {
                if event.is_propagation_stopped() {
                    break;
                }
                self.invoke(node, event, EventPhase::Bubbling, false);
            }
        }

        event.end_dispatch();
        !event.is_default_prevented()
    }

    fn invoke(&self, node: NodeId, event: &mut Event, phase: EventPhase, capture: bool) {
        let listeners = self.inner.listeners.borrow().snapshot(node, event.event_type());
        if listeners.is_empty() {
            return;
        }

        event.enter(Element { doc: self.clone(), id: node }, phase);
        for listener in listeners {
            if listener.capture != capture || listener.removed.get() {
                continue;
            }
            (listener.callback)(event);
            if event.is_immediate_propagation_stopped() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

/// Handle on a node of a [`Document`]. Equality is node identity.
#[derive(Clone)]
pub struct Element {
    doc: Document,
    id: NodeId,
}

impl Element {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn same_document(&self, other: &Element) -> DomResult<()> {
        if self.doc.ptr_eq(&other.doc) {
            Ok(())
        } else {
            Err(DomError::WrongDocument)
        }
    }

    /// Lowercased tag name; empty for non-element nodes
    pub fn tag_name(&self) -> String {
        self.doc.with_tree(|tree| {
            tree.get(self.id)
                .and_then(|n| n.as_element())
                .map(|e| e.tag_name.clone())
                .unwrap_or_default()
        })
    }

    pub fn is_element(&self) -> bool {
        self.doc
            .with_tree(|tree| tree.get(self.id).is_some_and(|n| n.is_element()))
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.doc.with_tree(|tree| {
            tree.get(self.id)
                .and_then(|n| n.as_element())
                .and_then(|e| e.get_attr(&name.to_ascii_lowercase()).map(str::to_string))
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> DomResult<()> {
        self.doc.with_tree_mut(|tree| {
            let elem = tree
                .get_mut(self.id)
                .ok_or(DomError::NotFound(self.id))?
                .as_element_mut()
                .ok_or(DomError::InvalidNodeType)?;
            elem.set_attr(name, value);
            Ok(())
        })
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.doc.with_tree_mut(|tree| {
            tree.get_mut(self.id)
                .and_then(|n| n.as_element_mut())
                .and_then(|e| e.remove_attr(name))
        })
    }

    pub fn class_list(&self) -> DOMTokenList {
        self.doc.with_tree(|tree| {
            tree.get(self.id)
                .and_then(|n| n.as_element())
                .map(|e| e.classes.clone())
                .unwrap_or_default()
        })
    }

    /// Apply `f` to the class list and write it back to the `class` attribute
    fn update_classes<R>(&self, f: impl FnOnce(&mut DOMTokenList) -> R) -> Option<R> {
        self.doc.with_tree_mut(|tree| {
            let elem = tree.get_mut(self.id)?.as_element_mut()?;
            let result = f(&mut elem.classes);
            elem.sync_class_attr();
            Some(result)
        })
    }

    pub fn add_class(&self, class: &str) -> bool {
        self.update_classes(|c| c.add(class)).unwrap_or(false)
    }

    pub fn remove_class(&self, class: &str) -> bool {
        self.update_classes(|c| c.remove(class)).unwrap_or(false)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().contains(class)
    }

    /// Append a text node child
    pub fn append_text(&self, text: &str) -> DomResult<()> {
        self.doc.with_tree_mut(|tree| {
            let node = tree.create_text(text);
            tree.append_child(self.id, node)
        })
    }

    pub fn text_content(&self) -> String {
        self.doc.with_tree(|tree| {
            std::iter::once(self.id)
                .chain(tree.descendants(self.id))
                .filter_map(|n| tree.get(n).and_then(|node| node.as_text()))
                .collect()
        })
    }

    pub fn append_child(&self, child: &Element) -> DomResult<()> {
        self.same_document(child)?;
        self.doc.with_tree_mut(|tree| tree.append_child(self.id, child.id))
    }

    pub fn insert_before(&self, child: &Element, reference: Option<&Element>) -> DomResult<()> {
        self.same_document(child)?;
        if let Some(reference) = reference {
            self.same_document(reference)?;
        }
        self.doc
            .with_tree_mut(|tree| tree.insert_before(self.id, child.id, reference.map(|r| r.id)))
    }

    pub fn remove_child(&self, child: &Element) -> DomResult<()> {
        self.same_document(child)?;
        self.doc.with_tree_mut(|tree| tree.remove_child(self.id, child.id))
    }

    /// Detach this node from its parent, if any
    pub fn remove(&self) {
        self.doc.with_tree_mut(|tree| tree.detach(self.id));
    }

    /// Parent of any kind, including the document node
    pub fn parent_node(&self) -> Option<Element> {
        let parent = self.doc.with_tree(|tree| tree.parent(self.id))?;
        Some(Element { doc: self.doc.clone(), id: parent })
    }

    pub fn parent_element(&self) -> Option<Element> {
        self.parent_node().filter(Element::is_element)
    }

    /// Element children in order
    pub fn children(&self) -> Vec<Element> {
        let ids: Vec<NodeId> = self.doc.with_tree(|tree| {
            tree.children(self.id)
                .filter(|&c| tree.get(c).is_some_and(|n| n.is_element()))
                .collect()
        });
        ids.into_iter()
            .map(|id| Element { doc: self.doc.clone(), id })
            .collect()
    }

    /// Inclusive containment, as `Node.contains`
    pub fn contains(&self, other: &Element) -> bool {
        self.doc.ptr_eq(&other.doc) && self.doc.with_tree(|tree| tree.contains(self.id, other.id))
    }

    /// Matching descendants in document order, evaluated against the live tree
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let ids = self.doc.with_tree(|tree| list.query_all(tree, self.id));
        Ok(ids
            .into_iter()
            .map(|id| Element { doc: self.doc.clone(), id })
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let id = self.doc.with_tree(|tree| list.query_first(tree, self.id));
        Ok(id.map(|id| Element { doc: self.doc.clone(), id }))
    }

    pub fn matches(&self, selector: &str) -> Result<bool, SelectorError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.doc.with_tree(|tree| list.matches(tree, self.id)))
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, selector: &str) -> Result<Option<Element>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        let found = self.doc.with_tree(|tree| {
            std::iter::once(self.id)
                .chain(tree.ancestors(self.id))
                .find(|&n| list.matches(tree, n))
        });
        Ok(found.map(|id| Element { doc: self.doc.clone(), id }))
    }

    /// Attach a native listener. Every call attaches a new listener.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: NativeListener,
        capture: bool,
    ) -> ListenerId {
        self.doc
            .inner
            .listeners
            .borrow_mut()
            .add(self.id, event_type, capture, listener)
    }

    /// Detach a native listener; the capture flag must match the one used to add it
    pub fn remove_event_listener(&self, event_type: &str, id: ListenerId, capture: bool) -> bool {
        self.doc
            .inner
            .listeners
            .borrow_mut()
            .remove(self.id, event_type, id, capture)
    }

    /// Number of native listeners attached for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.doc.inner.listeners.borrow().count(self.id, event_type)
    }

    /// Synchronously dispatch `event` with this node as target.
    /// Returns false if a listener prevented the default action.
    pub fn dispatch_event(&self, event: &mut Event) -> bool {
        self.doc.dispatch(self.id, event)
    }

    /// Dispatch a bubbling, cancelable `click`
    pub fn click(&self) -> bool {
        self.dispatch_event(&mut Event::bubbling("click"))
    }

    pub fn event_uid(&self) -> Option<u64> {
        self.doc
            .with_tree(|tree| tree.get(self.id).and_then(|n| n.event_uid))
    }

    pub fn set_event_uid(&self, uid: u64) {
        self.doc.with_tree_mut(|tree| {
            if let Some(node) = tree.get_mut(self.id) {
                node.event_uid = Some(uid);
            }
        });
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            doc: Rc::downgrade(&self.doc.inner),
            id: self.id,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc.ptr_eq(&other.doc)
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.doc.inner.id.hash(state);
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Debug may run while the tree is mutably borrowed
        let label = self.doc.inner.tree.try_borrow().ok().and_then(|tree| {
            let node = tree.get(self.id)?;
            if node.is_document() {
                return Some("#document".to_string());
            }
            let elem = node.as_element()?;
            let mut label = elem.tag_name.clone();
            if let Some(id) = &elem.id {
                label.push('#');
                label.push_str(id);
            }
            for class in elem.classes.iter() {
                label.push('.');
                label.push_str(class);
            }
            Some(label)
        });

        match label {
            Some(label) => write!(f, "Element({label}, {:?})", self.id),
            None => write!(f, "Element({:?})", self.id),
        }
    }
}

/// Non-owning element handle
#[derive(Clone)]
pub struct WeakElement {
    doc: Weak<DocumentInner>,
    id: NodeId,
}

impl WeakElement {
    pub fn upgrade(&self) -> Option<Element> {
        let inner = self.doc.upgrade()?;
        Some(Element {
            doc: Document { inner },
            id: self.id,
        })
    }
}

impl std::fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakElement({:?})", self.id)
    }
}
