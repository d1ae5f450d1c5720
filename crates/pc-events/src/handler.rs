//! Delegated event dispatcher
//!
//! One dispatcher per thread. Every `on`/`one` attaches exactly one native
//! listener; the registry remembers which caller callback it stands for so
//! `off` can find it again.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::{Rc, Weak};

use pc_dom::{Element, Event, EventInit, FieldValue, NativeListener};

use crate::registry::{HandlerUid, Registration, Registry};
use crate::{Binding, Config, EventError, ResolvedType, TypeArg};

thread_local! {
    static INSTANCE: OnceCell<EventHandler> = const { OnceCell::new() };
}

/// Handle on the thread's dispatcher. Clones share the same registry.
#[derive(Clone)]
pub struct EventHandler {
    registry: Rc<RefCell<Registry>>,
    config: Rc<Config>,
}

impl EventHandler {
    /// Create the thread's dispatcher with `config`.
    ///
    /// Fails if the dispatcher already exists, whether from an earlier
    /// `init` or from [`EventHandler::instance`].
    pub fn init(config: Config) -> Result<Self, EventError> {
        INSTANCE.with(|cell| {
            let handler = Self::create(config);
            cell.set(handler.clone())
                .map_err(|_| EventError::AlreadyInitialized)?;
            Ok(handler)
        })
    }

    /// The thread's dispatcher, created with the default configuration on first use
    pub fn instance() -> Self {
        INSTANCE.with(|cell| cell.get_or_init(|| Self::create(Config::default())).clone())
    }

    fn create(config: Config) -> Self {
        tracing::debug!(
            "Creating event handler ({} native events, {} custom events)",
            config.native_events.len(),
            config.custom_events.len()
        );
        Self {
            registry: Rc::new(RefCell::new(Registry::new())),
            config: Rc::new(config),
        }
    }

    /// Configuration the dispatcher was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Forget registrations of elements whose document has been dropped
    fn prune(&self) {
        let stale = self.registry.borrow_mut().prune();
        drop(stale);
    }

    /// Attach a persistent handler
    pub fn on<'e, 't>(
        &self,
        element: impl Into<Option<&'e Element>>,
        event_type: impl Into<TypeArg<'t>>,
        binding: impl Into<Binding>,
    ) {
        self.add(element.into(), event_type.into(), binding.into(), false);
    }

    /// Attach a handler that removes itself on its first matching dispatch
    pub fn one<'e, 't>(
        &self,
        element: impl Into<Option<&'e Element>>,
        event_type: impl Into<TypeArg<'t>>,
        binding: impl Into<Binding>,
    ) {
        self.add(element.into(), event_type.into(), binding.into(), true);
    }

    fn add(&self, element: Option<&Element>, event_type: TypeArg<'_>, binding: Binding, one_off: bool) {
        let (Some(element), Some(original)) = (element, event_type.as_name()) else {
            return;
        };
        self.prune();
        let resolved = ResolvedType::resolve(original, &self.config);
        let mut registry = self.registry.borrow_mut();
        let element_uid = registry.element_uid(element);

        if let Some(existing) = registry.find(
            element_uid,
            &resolved.type_key,
            binding.callable(),
            binding.selector(),
        ) {
            existing.one_off.set(existing.one_off.get() && one_off);
            tracing::trace!("Handler {} already bound for '{}'", existing.uid, original);
            return;
        }

        let uid = registry.next_handler_uid(resolved.namespace.clone());
        let one_off = Rc::new(Cell::new(one_off));
        let listener = self.wrap(element, &resolved, &binding, &uid, &one_off);
        let capture = binding.selector().is_some();
        let listener = element.add_event_listener(&resolved.type_key, listener, capture);

        tracing::debug!(
            "Bound handler {} to {:?} for '{}' (type {}, selector {:?})",
            uid,
            element,
            original,
            resolved.type_key,
            binding.selector()
        );
        registry.insert(
            element,
            element_uid,
            &resolved.type_key,
            Registration {
                uid,
                callable: binding.callable().clone(),
                selector: binding.selector().map(str::to_string),
                one_off,
                listener,
            },
        );
    }

    /// Build the native listener standing in for `binding`
    fn wrap(
        &self,
        element: &Element,
        resolved: &ResolvedType,
        binding: &Binding,
        uid: &HandlerUid,
        one_off: &Rc<Cell<bool>>,
    ) -> NativeListener {
        let owner = element.downgrade();
        let registry = Rc::downgrade(&self.registry);
        let type_key = resolved.type_key.clone();
        let pseudo = resolved.pseudo;
        let callback = binding.callable().clone();
        let selector = binding.selector().map(str::to_string);
        let uid = uid.clone();
        let one_off = Rc::clone(one_off);

        Rc::new(move |event: &mut Event| {
            let Some(owner) = owner.upgrade() else {
                return;
            };
            let context = match &selector {
                None => owner.clone(),
                Some(selector) => match delegate_match(&owner, selector, event) {
                    Some(matched) => matched,
                    None => return,
                },
            };
            event.hydrate("delegateTarget", &context);

            if pseudo && !crosses_boundary(event) {
                return;
            }
            if one_off.get() {
                release(&registry, &owner, &type_key, &uid);
            }
            callback.call(&context, event);
        })
    }

    /// Remove handlers by type and namespace.
    ///
    /// `.ns` removes every handler on the element whose uid mentions `ns`.
    /// A concrete type removes its whole bucket, narrowed to the requested
    /// namespace when one is given.
    pub fn off<'e, 't>(&self, element: impl Into<Option<&'e Element>>, event_type: impl Into<TypeArg<'t>>) {
        let element: Option<&Element> = element.into();
        let event_type: TypeArg<'_> = event_type.into();
        let (Some(element), Some(original)) = (element, event_type.as_name()) else {
            return;
        };
        self.prune();
        let Some(element_uid) = element.event_uid() else {
            return;
        };
        let resolved = ResolvedType::resolve(original, &self.config);

        if resolved.is_namespace_only() {
            let namespace = &original[1..];
            let types = self.registry.borrow().types(element_uid);
            for type_key in types {
                self.remove_where(element, element_uid, &type_key, |uid| {
                    uid.to_string().contains(namespace)
                });
            }
        }

        let in_namespace = resolved.in_namespace();
        self.remove_where(element, element_uid, &resolved.type_key, |uid| {
            !in_namespace || original.contains(&uid.key())
        });
    }

    /// Remove the single handler bound with `binding`'s callback and selector
    pub fn off_binding<'e, 't>(
        &self,
        element: impl Into<Option<&'e Element>>,
        event_type: impl Into<TypeArg<'t>>,
        binding: impl Into<Binding>,
    ) {
        let element: Option<&Element> = element.into();
        let event_type: TypeArg<'_> = event_type.into();
        let (Some(element), Some(original)) = (element, event_type.as_name()) else {
            return;
        };
        let Some(element_uid) = element.event_uid() else {
            return;
        };
        let resolved = ResolvedType::resolve(original, &self.config);
        let binding = binding.into();

        let removed = self.registry.borrow_mut().take_binding(
            element_uid,
            &resolved.type_key,
            binding.callable(),
            binding.selector(),
        );
        if let Some(registration) = removed {
            detach(element, &resolved.type_key, &registration);
        }
    }

    fn remove_where(
        &self,
        element: &Element,
        element_uid: u64,
        type_key: &str,
        pred: impl Fn(&HandlerUid) -> bool,
    ) {
        let uids = self.registry.borrow().snapshot(element_uid, type_key);
        for uid in uids.iter().filter(|uid| pred(uid)) {
            let removed = self
                .registry
                .borrow_mut()
                .take_uid(element_uid, type_key, uid);
            if let Some(registration) = removed {
                detach(element, type_key, &registration);
            }
        }
    }

    /// Dispatch a bubbling, cancelable event of `event_type` on `element`
    pub fn trigger<'e, 't>(
        &self,
        element: impl Into<Option<&'e Element>>,
        event_type: impl Into<TypeArg<'t>>,
    ) -> Option<Event> {
        self.trigger_with(element, event_type, std::iter::empty::<(&str, FieldValue)>())
    }

    /// Like [`EventHandler::trigger`], assigning `fields` onto the event first.
    ///
    /// Read-only native fields are shadowed rather than assigned, see
    /// [`Event::hydrate`].
    pub fn trigger_with<'e, 't, K, V>(
        &self,
        element: impl Into<Option<&'e Element>>,
        event_type: impl Into<TypeArg<'t>>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Option<Event>
    where
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        let element: Option<&Element> = element.into();
        let event_type: TypeArg<'_> = event_type.into();
        let (Some(element), Some(event_type)) = (element, event_type.as_name()) else {
            return None;
        };

        let mut event = Event::new(
            event_type,
            EventInit {
                bubbles: true,
                cancelable: true,
            },
        );
        for (key, value) in fields {
            event.hydrate(key.as_ref(), value);
        }

        tracing::trace!("Triggering '{}' on {:?}", event_type, element);
        element.dispatch_event(&mut event);
        Some(event)
    }

    /// Elements that currently have at least one handler
    pub fn element_count(&self) -> usize {
        self.prune();
        self.registry.borrow().element_count()
    }

    /// Handlers currently bound to `element`, across all types
    pub fn handler_count(&self, element: &Element) -> usize {
        element
            .event_uid()
            .map_or(0, |uid| self.registry.borrow().len(uid))
    }

    /// Handlers currently bound to `element` under the type `event_type` resolves to
    pub fn handler_count_for(&self, element: &Element, event_type: &str) -> usize {
        let Some(uid) = element.event_uid() else {
            return 0;
        };
        let resolved = ResolvedType::resolve(event_type, &self.config);
        self.registry.borrow().bucket_len(uid, &resolved.type_key)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("registry", &Rc::as_ptr(&self.registry))
            .finish()
    }
}

fn detach(element: &Element, type_key: &str, registration: &Registration) {
    element.remove_event_listener(type_key, registration.listener, registration.is_delegated());
    tracing::debug!("Removed handler {} from {:?} ({})", registration.uid, element, type_key);
}

/// Drop a one-off registration before its callback runs
fn release(registry: &Weak<RefCell<Registry>>, owner: &Element, type_key: &str, uid: &HandlerUid) {
    let (Some(registry), Some(element_uid)) = (registry.upgrade(), owner.event_uid()) else {
        return;
    };
    let removed = registry.borrow_mut().take_uid(element_uid, type_key, uid);
    if let Some(registration) = removed {
        detach(owner, type_key, &registration);
    }
}

/// Innermost node between the target and `owner` (exclusive) that matches
/// `selector` right now
fn delegate_match(owner: &Element, selector: &str, event: &Event) -> Option<Element> {
    let candidates = match owner.query_selector_all(selector) {
        Ok(candidates) => candidates,
        Err(err) => {
            tracing::warn!("Invalid delegation selector '{}': {}", selector, err);
            return None;
        }
    };
    if candidates.is_empty() {
        return None;
    }

    let mut node = event.target().cloned();
    while let Some(current) = node {
        if current == *owner {
            break;
        }
        if candidates.contains(&current) {
            tracing::trace!("Delegation '{}' matched {:?}", selector, current);
            return Some(current);
        }
        node = current.parent_node();
    }
    None
}

/// Pointer crossed into or out of the delegate target's subtree
fn crosses_boundary(event: &Event) -> bool {
    let Some(related) = event.related_target() else {
        return true;
    };
    match event.delegate_target() {
        Some(delegate) => related != delegate && !delegate.contains(related),
        None => true,
    }
}
