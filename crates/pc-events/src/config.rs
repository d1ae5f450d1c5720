//! Dispatcher Configuration

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::EventError;

/// Event names registered under their namespace-stripped base name.
/// Any other name is registered under the caller's untouched string.
pub const NATIVE_EVENTS: &[&str] = &[
    "click",
    "dblclick",
    "mouseup",
    "mousedown",
    "contextmenu",
    "mousewheel",
    "DOMMouseScroll",
    "mouseover",
    "mouseout",
    "mousemove",
    "selectstart",
    "selectend",
    "keydown",
    "keypress",
    "keyup",
    "orientationchange",
    "touchstart",
    "touchmove",
    "touchend",
    "touchcancel",
    "pointerdown",
    "pointermove",
    "pointerup",
    "pointerleave",
    "pointercancel",
    "gesturestart",
    "gesturechange",
    "gestureend",
    "focus",
    "blur",
    "change",
    "reset",
    "select",
    "submit",
    "focusin",
    "focusout",
    "load",
    "unload",
    "beforeunload",
    "resize",
    "move",
    "DOMContentLoaded",
    "readystatechange",
    "error",
    "abort",
    "scroll",
];

/// Pseudo-events and the native event each one is built on
pub const CUSTOM_EVENTS: &[(&str, &str)] = &[("mouseenter", "mouseover"), ("mouseleave", "mouseout")];

/// Dispatcher configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Native event allow-list
    pub native_events: HashSet<String>,

    /// Pseudo-event name -> underlying native event
    pub custom_events: HashMap<String, String>,
}

impl Config {
    /// Parse a JSON override; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Name is on the native allow-list
    pub fn is_native(&self, name: &str) -> bool {
        self.native_events.contains(name)
    }

    /// Native event a pseudo-event maps to
    pub fn custom_target(&self, name: &str) -> Option<&str> {
        self.custom_events.get(name).map(String::as_str)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            native_events: NATIVE_EVENTS.iter().map(|s| s.to_string()).collect(),
            custom_events: CUSTOM_EVENTS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}
