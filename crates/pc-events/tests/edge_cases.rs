//! Edge case tests for pc-events
//!
//! Re-entrant calls from inside handlers, one-off handlers that do not
//! match, namespace string matching quirks and handles that outlive their
//! document.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pc_dom::{Document, Element};
use pc_events::{Binding, Callback, EventHandler};

fn counter() -> (Rc<Cell<u32>>, Callback) {
    let count = Rc::new(Cell::new(0));
    let seen = count.clone();
    (count, Callback::new(move |_, _| seen.set(seen.get() + 1)))
}

fn attached(doc: &Document, tag: &str, parent: &Element) -> Element {
    let el = doc.create_element(tag);
    parent.append_child(&el).unwrap();
    el
}

// ============================================================================
// RE-ENTRANCY
// ============================================================================

#[test]
fn test_handler_removes_itself() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let count = Rc::new(Cell::new(0));

    let seen = count.clone();
    pc_events::on(
        &button,
        "click.self",
        Callback::new(move |this, _| {
            seen.set(seen.get() + 1);
            pc_events::off(this, ".self");
        }),
    );

    button.click();
    button.click();
    assert_eq!(count.get(), 1);
    assert_eq!(EventHandler::instance().handler_count(&button), 0);
}

#[test]
fn test_handler_removes_later_sibling() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let (later, cb_later) = counter();

    pc_events::on(
        &button,
        "click",
        Callback::new(|this, _| pc_events::off(this, "click.later")),
    );
    pc_events::on(&button, "click.later", &cb_later);

    button.click();
    assert_eq!(later.get(), 0);
}

#[test]
fn test_handler_registers_during_dispatch() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let (added, cb_added) = counter();

    pc_events::one(
        &button,
        "click",
        Callback::new(move |this, _| pc_events::on(this, "click", &cb_added)),
    );

    button.click();
    assert_eq!(added.get(), 0);
    button.click();
    assert_eq!(added.get(), 1);
}

#[test]
fn test_handler_triggers_nested_event() {
    let doc = Document::new("about:blank");
    let form = attached(&doc, "form", &doc.body().unwrap());
    let (saved, cb_saved) = counter();

    pc_events::on(&form, "offer-saved", &cb_saved);
    pc_events::on(
        &form,
        "submit",
        Callback::new(|this, event| {
            event.prevent_default();
            pc_events::trigger(this, "offer-saved");
        }),
    );

    let submit = pc_events::trigger(&form, "submit").unwrap();
    assert!(submit.is_default_prevented());
    assert_eq!(saved.get(), 1);
}

// ============================================================================
// ONE-OFF
// ============================================================================

#[test]
fn test_delegated_one_waits_for_a_match() {
    let doc = Document::new("about:blank");
    let list = attached(&doc, "ul", &doc.body().unwrap());
    let plain = attached(&doc, "li", &list);
    let item = attached(&doc, "li", &list);
    item.add_class("item");
    let (count, cb) = counter();

    pc_events::one(&list, "click", Binding::delegated(".item", &cb));
    plain.click();
    assert_eq!(EventHandler::instance().handler_count(&list), 1);

    item.click();
    item.click();
    assert_eq!(count.get(), 1);
    assert_eq!(EventHandler::instance().handler_count(&list), 0);
}

#[test]
fn test_filtered_pseudo_event_keeps_one_off() {
    let doc = Document::new("about:blank");
    let panel = attached(&doc, "div", &doc.body().unwrap());
    let inner = attached(&doc, "span", &panel);
    let (count, cb) = counter();

    pc_events::one(&panel, "mouseenter", &cb);
    pc_events::trigger_with(&panel, "mouseover", [("relatedTarget", &inner)]);
    assert_eq!(EventHandler::instance().handler_count(&panel), 1);

    pc_events::trigger(&panel, "mouseover");
    assert_eq!(count.get(), 1);
    assert_eq!(EventHandler::instance().handler_count(&panel), 0);
}

#[test]
fn test_one_shared_callback_on_two_elements() {
    let doc = Document::new("about:blank");
    let body = doc.body().unwrap();
    let a = attached(&doc, "button", &body);
    let b = attached(&doc, "button", &body);
    let (count, cb) = counter();

    pc_events::one(&a, "click", &cb);
    pc_events::one(&b, "click", &cb);
    a.click();
    a.click();
    b.click();
    assert_eq!(count.get(), 2);
}

// ============================================================================
// NAMESPACES
// ============================================================================

#[test]
fn test_multi_segment_namespace() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let (count, cb) = counter();

    pc_events::on(&button, "click.menu.open", &cb);
    pc_events::off(&button, ".menu.open");
    button.click();
    assert_eq!(count.get(), 0);
}

#[test]
fn test_namespace_fragment_matches_by_containment() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let (_, cb) = counter();

    pc_events::on(&button, "click.tooltip", &cb);
    pc_events::on(&button, "focus.tool", &cb);
    pc_events::off(&button, ".tool");
    assert_eq!(EventHandler::instance().handler_count(&button), 0);
}

#[test]
fn test_longer_namespace_request_covers_shorter() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let (short, cb_short) = counter();
    let (long, cb_long) = counter();

    pc_events::on(&button, "click.menu", &cb_short);
    pc_events::on(&button, "click.menu.open", &cb_long);

    pc_events::off(&button, "click.menu");
    button.click();
    assert_eq!((short.get(), long.get()), (0, 1));

    pc_events::on(&button, "click.menu", &cb_short);
    pc_events::off(&button, "click.menu.open");
    button.click();
    assert_eq!((short.get(), long.get()), (0, 1));
}

#[test]
fn test_custom_event_keeps_namespace_in_type() {
    let doc = Document::new("about:blank");
    let el = attached(&doc, "div", &doc.body().unwrap());
    let (count, cb) = counter();

    pc_events::on(&el, "offer-saved.form", &cb);
    pc_events::trigger(&el, "offer-saved");
    assert_eq!(count.get(), 0);

    pc_events::trigger(&el, "offer-saved.form");
    assert_eq!(count.get(), 1);
}

#[test]
fn test_namespaced_trigger_dispatches_literal_type() {
    let doc = Document::new("about:blank");
    let el = attached(&doc, "div", &doc.body().unwrap());
    let (count, cb) = counter();

    pc_events::on(&el, "click.menu", &cb);
    let event = pc_events::trigger(&el, "click.menu").unwrap();
    assert_eq!(event.event_type(), "click.menu");
    assert_eq!(count.get(), 0);

    pc_events::trigger(&el, "click");
    assert_eq!(count.get(), 1);
}

#[test]
fn test_empty_namespace() {
    let doc = Document::new("about:blank");
    let button = attached(&doc, "button", &doc.body().unwrap());
    let (count, cb) = counter();

    pc_events::on(&button, "click.", &cb);
    assert_eq!(button.listener_count("click"), 1);
    button.click();
    assert_eq!(count.get(), 1);
}

#[test]
fn test_off_on_unregistered_element() {
    let doc = Document::new("about:blank");
    let el = attached(&doc, "div", &doc.body().unwrap());
    let (_, cb) = counter();

    pc_events::off(&el, "click");
    pc_events::off(&el, ".ns");
    pc_events::off_binding(&el, "click", &cb);
    assert_eq!(el.event_uid(), None);
}

// ============================================================================
// LIFETIMES
// ============================================================================

#[test]
fn test_registry_does_not_keep_document_alive() {
    let (count, cb) = counter();
    let weak = {
        let doc = Document::new("about:blank");
        let button = attached(&doc, "button", &doc.body().unwrap());
        pc_events::on(&button, "click", &cb);
        button.downgrade()
    };

    assert!(weak.upgrade().is_none());
    assert_eq!(count.get(), 0);
}

#[test]
fn test_registry_forgets_handlers_of_dropped_documents() {
    let marker = Rc::new(());
    {
        let doc = Document::new("about:blank");
        let button = attached(&doc, "button", &doc.body().unwrap());
        let held = marker.clone();
        pc_events::on(&button, "click", Callback::new(move |_, _| {
            let _ = &held;
        }));
    }
    assert_eq!(Rc::strong_count(&marker), 2);

    let doc = Document::new("about:blank");
    let other = attached(&doc, "button", &doc.body().unwrap());
    let (_, cb) = counter();
    pc_events::on(&other, "click", &cb);

    assert_eq!(Rc::strong_count(&marker), 1);
    assert_eq!(EventHandler::instance().element_count(), 1);
}

#[test]
fn test_detached_element_keeps_handlers() {
    let doc = Document::new("about:blank");
    let body = doc.body().unwrap();
    let button = attached(&doc, "button", &body);
    let (count, cb) = counter();

    pc_events::on(&button, "click", &cb);
    button.remove();
    button.click();
    body.append_child(&button).unwrap();
    button.click();
    assert_eq!(count.get(), 2);
}

#[test]
fn test_elements_in_separate_documents_are_separate() {
    let a = Document::new("about:blank");
    let b = Document::new("about:blank");
    let (count, cb) = counter();

    pc_events::on(&a.body().unwrap(), "click", &cb);
    pc_events::on(&b.body().unwrap(), "click", &cb);
    assert_ne!(a.body().unwrap().event_uid(), b.body().unwrap().event_uid());

    pc_events::off(&a.body().unwrap(), "click");
    b.body().unwrap().click();
    a.body().unwrap().click();
    assert_eq!(count.get(), 1);
}

#[test]
fn test_shared_handler_instances() {
    let handler = EventHandler::instance();
    let doc = Document::new("about:blank");
    let el = attached(&doc, "div", &doc.body().unwrap());
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();

    handler.on(&el, "click", Callback::new(move |_, e| sink.borrow_mut().push(e.event_type().to_string())));
    pc_events::trigger(&el, "click");
    assert_eq!(*log.borrow(), vec!["click".to_string()]);
}
