//! DOM Events
//!
//! A native event plus an extension bag for caller-defined fields.
//! Native fields that are read-only cannot be assigned; hydrating one of them
//! installs an accessor override instead (see [`Event::hydrate`]).

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Element;

/// Native fields that refuse direct assignment
pub const READ_ONLY_FIELDS: &[&str] = &[
    "type",
    "target",
    "currentTarget",
    "srcElement",
    "eventPhase",
    "bubbles",
    "cancelable",
    "defaultPrevented",
    "composed",
    "isTrusted",
    "timeStamp",
];

/// Event phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

/// Event construction options
#[derive(Debug, Clone, Copy, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
}

/// Value stored in an event field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Element(Element),
    Data(serde_json::Value),
}

impl FieldValue {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(v) => Some(v),
            Self::Element(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(|v| v.as_str())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(|v| v.as_bool())
    }
}

impl From<Element> for FieldValue {
    fn from(e: Element) -> Self {
        Self::Element(e)
    }
}

impl From<&Element> for FieldValue {
    fn from(e: &Element) -> Self {
        Self::Element(e.clone())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Data(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Data(s.into())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Data(s.into())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Data(b.into())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Data(n.into())
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Data(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Data(n.into())
    }
}

/// Outcome of [`Event::hydrate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Stored as a writable own field
    Assigned,
    /// Field was read-only; a read-only accessor now shadows it
    Shadowed,
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    target: Option<Element>,
    current_target: Option<Element>,
    phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    time_stamp: f64,
    fields: HashMap<String, FieldValue>,
    accessors: HashMap<String, FieldValue>,
}

impl Event {
    pub fn new(event_type: &str, init: EventInit) -> Self {
        let time_stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
            * 1000.0;

        Self {
            event_type: event_type.to_string(),
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            time_stamp,
            fields: HashMap::new(),
            accessors: HashMap::new(),
        }
    }

    /// Bubbling, cancelable event (what UI input and synthetic triggers use)
    pub fn bubbling(event_type: &str) -> Self {
        Self::new(event_type, EventInit { bubbles: true, cancelable: true })
    }

    /// Builder form of [`Event::hydrate`]
    pub fn with_field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.hydrate(key, value);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn target(&self) -> Option<&Element> {
        self.target.as_ref()
    }

    pub fn current_target(&self) -> Option<&Element> {
        self.current_target.as_ref()
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn time_stamp(&self) -> f64 {
        self.time_stamp
    }

    /// `relatedTarget` own field, when it holds an element
    pub fn related_target(&self) -> Option<&Element> {
        self.fields.get("relatedTarget").and_then(FieldValue::as_element)
    }

    /// `delegateTarget` own field, when it holds an element
    pub fn delegate_target(&self) -> Option<&Element> {
        self.fields.get("delegateTarget").and_then(FieldValue::as_element)
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped = true;
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    /// Assign `key` on the event.
    ///
    /// Writable keys land in the extension bag. `cancelBubble` and
    /// `returnValue` are writable natives and act on propagation and the
    /// default action. Read-only natives cannot be assigned, so a read-only
    /// accessor returning `value` is installed in their place.
    pub fn hydrate(&mut self, key: &str, value: impl Into<FieldValue>) -> Hydration {
        let value = value.into();

        if READ_ONLY_FIELDS.contains(&key) {
            self.accessors.insert(key.to_string(), value);
            return Hydration::Shadowed;
        }

        match key {
            "cancelBubble" => {
                if value.as_bool() == Some(true) {
                    self.stop_propagation();
                }
            }
            "returnValue" => {
                if value.as_bool() == Some(false) {
                    self.prevent_default();
                }
            }
            _ => {
                self.fields.insert(key.to_string(), value);
            }
        }
        Hydration::Assigned
    }

    /// Read a field the way script would: accessor overrides first, then
    /// native fields, then the extension bag.
    pub fn field(&self, key: &str) -> Option<FieldValue> {
        if let Some(value) = self.accessors.get(key) {
            return Some(value.clone());
        }

        let data = |v: serde_json::Value| Some(FieldValue::Data(v));
        match key {
            "type" => data(self.event_type.clone().into()),
            "target" | "srcElement" => self.target.clone().map(FieldValue::Element),
            "currentTarget" => self.current_target.clone().map(FieldValue::Element),
            "eventPhase" => data((self.phase as u8).into()),
            "bubbles" => data(self.bubbles.into()),
            "cancelable" => data(self.cancelable.into()),
            "defaultPrevented" => data(self.default_prevented.into()),
            "composed" | "isTrusted" => data(false.into()),
            "timeStamp" => data(self.time_stamp.into()),
            "cancelBubble" => data(self.propagation_stopped.into()),
            "returnValue" => data((!self.default_prevented).into()),
            _ => self.fields.get(key).cloned(),
        }
    }

    pub(crate) fn begin_dispatch(&mut self, target: Element) {
        self.target = Some(target);
    }

    pub(crate) fn enter(&mut self, current: Element, phase: EventPhase) {
        self.current_target = Some(current);
        self.phase = phase;
    }

    /// Propagation flags only live for one dispatch
    pub(crate) fn end_dispatch(&mut self) {
        self.current_target = None;
        self.phase = EventPhase::None;
        self.propagation_stopped = false;
        self.immediate_propagation_stopped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut event = Event::new("load", EventInit::default());
        event.prevent_default();
        assert!(!event.is_default_prevented());

        let mut event = Event::bubbling("submit");
        event.prevent_default();
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_hydrate_writable_field() {
        let mut event = Event::bubbling("custom-event");
        assert_eq!(event.hydrate("detail", "x"), Hydration::Assigned);
        assert_eq!(event.field("detail").as_ref().and_then(FieldValue::as_str), Some("x"));
    }

    #[test]
    fn test_hydrate_read_only_field_is_shadowed() {
        let mut event = Event::bubbling("click");
        assert_eq!(event.hydrate("type", "other"), Hydration::Shadowed);
        assert_eq!(event.field("type").as_ref().and_then(FieldValue::as_str), Some("other"));
        // The native type used for dispatch is untouched
        assert_eq!(event.event_type(), "click");
    }

    #[test]
    fn test_hydrate_writable_natives() {
        let mut event = Event::bubbling("click")
            .with_field("returnValue", false)
            .with_field("cancelBubble", true);
        assert!(event.is_default_prevented());
        assert!(event.is_propagation_stopped());
        assert_eq!(event.field("returnValue").and_then(|v| v.as_bool()), Some(false));

        event.stop_immediate_propagation();
        assert!(event.is_immediate_propagation_stopped());
    }
}
