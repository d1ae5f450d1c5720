//! PC Events - Delegated event dispatcher
//!
//! jQuery-style `on`/`one`/`off`/`trigger` on top of [`pc_dom`]:
//! - namespaces: `click.menu.open`, removable in bulk with `off(el, ".menu")`
//! - pseudo-events: `mouseenter`/`mouseleave` on top of `mouseover`/`mouseout`
//! - delegation: one capture listener on an ancestor, matched against a
//!   selector re-evaluated on every dispatch
//!
//! Binding the same callback twice to the same element, type and selector
//! attaches a single native listener.
//!
//! ```
//! use pc_dom::Document;
//! use pc_events::{Binding, Callback};
//!
//! let doc = Document::new("about:blank");
//! let list = doc.create_element("ul");
//! doc.body().unwrap().append_child(&list).unwrap();
//!
//! let select = Callback::new(|item, _event| {
//!     item.add_class("selected");
//! });
//! pc_events::on(&list, "click.menu", Binding::delegated("li", &select));
//!
//! let item = doc.create_element("li");
//! list.append_child(&item).unwrap();
//! item.click();
//! assert!(item.has_class("selected"));
//!
//! pc_events::off(&list, ".menu");
//! ```

mod callback;
mod config;
mod error;
mod handler;
mod normalize;
mod registry;

pub use callback::{Binding, Callback};
pub use config::{Config, CUSTOM_EVENTS, NATIVE_EVENTS};
pub use error::EventError;
pub use handler::EventHandler;
pub use normalize::{base_type, namespace_of, ResolvedType, TypeArg};
pub use registry::HandlerUid;

use pc_dom::{Element, Event, FieldValue};

/// Attach a persistent handler through the thread's dispatcher
pub fn on<'e, 't>(
    element: impl Into<Option<&'e Element>>,
    event_type: impl Into<TypeArg<'t>>,
    binding: impl Into<Binding>,
) {
    EventHandler::instance().on(element, event_type, binding)
}

/// Attach a single-shot handler through the thread's dispatcher
pub fn one<'e, 't>(
    element: impl Into<Option<&'e Element>>,
    event_type: impl Into<TypeArg<'t>>,
    binding: impl Into<Binding>,
) {
    EventHandler::instance().one(element, event_type, binding)
}

/// Remove handlers by type and/or namespace
pub fn off<'e, 't>(element: impl Into<Option<&'e Element>>, event_type: impl Into<TypeArg<'t>>) {
    EventHandler::instance().off(element, event_type)
}

/// Remove the handler bound with `binding`
pub fn off_binding<'e, 't>(
    element: impl Into<Option<&'e Element>>,
    event_type: impl Into<TypeArg<'t>>,
    binding: impl Into<Binding>,
) {
    EventHandler::instance().off_binding(element, event_type, binding)
}

/// Dispatch a bubbling, cancelable event; `None` if nothing was dispatched
pub fn trigger<'e, 't>(
    element: impl Into<Option<&'e Element>>,
    event_type: impl Into<TypeArg<'t>>,
) -> Option<Event> {
    EventHandler::instance().trigger(element, event_type)
}

/// Dispatch with extra fields assigned onto the event
pub fn trigger_with<'e, 't, K, V>(
    element: impl Into<Option<&'e Element>>,
    event_type: impl Into<TypeArg<'t>>,
    fields: impl IntoIterator<Item = (K, V)>,
) -> Option<Event>
where
    K: AsRef<str>,
    V: Into<FieldValue>,
{
    EventHandler::instance().trigger_with(element, event_type, fields)
}
