//! Caller callbacks and how they are bound

use std::rc::Rc;

use pc_dom::{Element, Event};

type CallbackFn = dyn Fn(&Element, &mut Event);

/// Caller callback. Identity is the allocation: clones compare equal,
/// two separately created callbacks never do.
#[derive(Clone)]
pub struct Callback(Rc<CallbackFn>);

impl Callback {
    /// The element argument is the execution context: the bound element for
    /// direct bindings, the matched descendant for delegated ones.
    pub fn new(f: impl Fn(&Element, &mut Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Same underlying closure
    pub fn same(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn call(&self, context: &Element, event: &mut Event) {
        (self.0)(context, event)
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// How a callback is attached to an element
#[derive(Debug, Clone)]
pub enum Binding {
    /// Runs for events reaching the element itself
    Direct(Callback),
    /// Runs for events whose target sits inside a descendant matching `selector`
    Delegated { selector: String, callback: Callback },
}

impl Binding {
    pub fn delegated(selector: impl Into<String>, callback: &Callback) -> Self {
        Self::Delegated {
            selector: selector.into(),
            callback: callback.clone(),
        }
    }

    /// Callback identity used for dedup and removal
    pub fn callable(&self) -> &Callback {
        match self {
            Self::Direct(callback) | Self::Delegated { callback, .. } => callback,
        }
    }

    /// Delegation selector, `None` for direct bindings
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Direct(_) => None,
            Self::Delegated { selector, .. } => Some(selector),
        }
    }
}

impl From<Callback> for Binding {
    fn from(callback: Callback) -> Self {
        Self::Direct(callback)
    }
}

impl From<&Callback> for Binding {
    fn from(callback: &Callback) -> Self {
        Self::Direct(callback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_follows_allocation() {
        let a = Callback::new(|_, _| {});
        let b = Callback::new(|_, _| {});
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_binding_accessors() {
        let cb = Callback::new(|_, _| {});
        let direct = Binding::from(&cb);
        assert!(direct.selector().is_none());
        assert!(direct.callable().same(&cb));

        let delegated = Binding::delegated(".item", &cb);
        assert_eq!(delegated.selector(), Some(".item"));
        assert!(delegated.callable().same(&cb));
    }
}
