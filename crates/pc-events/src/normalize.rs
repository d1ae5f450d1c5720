//! Event type and namespace normalization

use crate::Config;

/// Event-type argument as handed in by callers.
///
/// Only string-like values name an event; anything else makes the call a
/// silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeArg<'a> {
    Name(&'a str),
    Invalid,
}

impl<'a> TypeArg<'a> {
    pub fn as_name(self) -> Option<&'a str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Invalid => None,
        }
    }
}

impl<'a> From<&'a str> for TypeArg<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for TypeArg<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

impl<'a> From<Option<&'a str>> for TypeArg<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(Self::Invalid, Self::Name)
    }
}

macro_rules! invalid_type_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TypeArg<'_> {
                fn from(_: $ty) -> Self {
                    Self::Invalid
                }
            }
        )*
    };
}

invalid_type_arg!(i32, i64, u32, u64, usize, f64, bool, ());

/// Event type after namespace stripping and pseudo-event mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Caller's untouched string, e.g. `click.menu.open`
    pub original: String,
    /// Type used for the native listener and the registry bucket
    pub type_key: String,
    /// Everything after the first dot, e.g. `menu.open`
    pub namespace: Option<String>,
    /// Base type is a pseudo-event (`mouseenter`/`mouseleave`)
    pub pseudo: bool,
}

impl ResolvedType {
    pub fn resolve(original: &str, config: &Config) -> Self {
        let base = base_type(original);
        let mapped = config.custom_target(base).unwrap_or(base);
        let type_key = if config.is_native(mapped) { mapped } else { original };

        Self {
            original: original.to_string(),
            type_key: type_key.to_string(),
            namespace: namespace_of(original).map(str::to_string),
            pseudo: config.custom_target(base).is_some(),
        }
    }

    /// Request names a namespace on top of a recognized type
    pub fn in_namespace(&self) -> bool {
        self.type_key != self.original
    }

    /// Request is a bare namespace such as `.menu`
    pub fn is_namespace_only(&self) -> bool {
        self.original.starts_with('.')
    }
}

/// Text before the first dot
pub fn base_type(original: &str) -> &str {
    original.split_once('.').map_or(original, |(base, _)| base)
}

/// Text after the first dot, `None` if absent or empty
pub fn namespace_of(original: &str) -> Option<&str> {
    original
        .split_once('.')
        .map(|(_, ns)| ns)
        .filter(|ns| !ns.is_empty())
}
