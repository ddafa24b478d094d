//! Dynamic values exported by loaded modules.
//!
//! Module exports are untyped, so filters are evaluated against [`Value`],
//! a small dynamic model with JavaScript-like semantics: objects and functions
//! are shared references with interior-mutable property maps, everything else
//! is a plain value. Cloning a reference value shares its identity.

use std::{collections::BTreeMap, fmt, sync::Arc};

use parking_lot::RwLock;

/// Own-property map of an object or function.
pub type Props = BTreeMap<String, Value>;

/// A dynamically typed export value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value. Returned for missing properties.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// String.
    String(Arc<str>),
    /// Plain or class-instance object.
    Object(Object),
    /// Callable with inspectable source text.
    Function(Function),
}

/// Shared object reference.
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

/// Storage behind an [`Object`].
struct ObjectInner {
    /// Display name of the constructor, for class instances.
    class_name: Option<Arc<str>>,
    /// Own properties.
    props: RwLock<Props>,
}

/// Shared function reference.
#[derive(Clone)]
pub struct Function(Arc<FunctionInner>);

/// Storage behind a [`Function`].
struct FunctionInner {
    /// Function name.
    name: Arc<str>,
    /// Serialized source text.
    source: Arc<str>,
    /// Own (static) properties.
    props: RwLock<Props>,
}

impl Object {
    /// Constructor display name, if this object is a class instance.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.0.class_name.as_deref()
    }
}

impl Function {
    /// Declared name of the function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Serialized source text of the function.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0.source
    }
}

impl Value {
    /// Build a plain object from key/value pairs.
    pub fn object<I, K>(props: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object(Object(Arc::new(ObjectInner {
            class_name: None,
            props: RwLock::new(props.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        })))
    }

    /// Build an instance of a named class, e.g. a store.
    pub fn instance<I, K>(class_name: &str, props: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object(Object(Arc::new(ObjectInner {
            class_name: Some(Arc::from(class_name)),
            props: RwLock::new(props.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        })))
    }

    /// Build a function from its name and serialized source.
    pub fn function(name: &str, source: &str) -> Self {
        Self::Function(Function(Arc::new(FunctionInner {
            name: Arc::from(name),
            source: Arc::from(source),
            props: RwLock::new(Props::new()),
        })))
    }

    /// Property lookup. Missing keys and primitives yield [`Value::Undefined`].
    #[must_use]
    pub fn get(&self, key: &str) -> Self {
        self.props()
            .and_then(|props| props.read().get(key).cloned())
            .unwrap_or_default()
    }

    /// True when `key` is present with a value other than `Undefined`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        !self.get(key).is_undefined()
    }

    /// Set a property. Returns false for primitives, which carry no properties.
    pub fn set(&self, key: impl Into<String>, value: Self) -> bool {
        match self.props() {
            Some(props) => {
                props.write().insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    /// Builder-style [`Value::set`].
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: Self) -> Self {
        self.set(key, value);
        self
    }

    /// Own property names, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.props()
            .map(|props| props.read().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of own properties.
    #[must_use]
    pub fn own_props(&self) -> Vec<(String, Self)> {
        self.props()
            .map(|props| {
                props
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy the own properties of `source` onto `self`, overwriting existing keys.
    pub fn assign_from(&self, source: &Self) {
        let Some(target) = self.props() else { return };
        let copied = source.own_props();
        let mut guard = target.write();
        guard.extend(copied);
    }

    /// JavaScript truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// True for [`Value::Undefined`].
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Borrow the function, if this value is callable.
    #[must_use]
    pub const fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Constructor display name of a class instance.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Object(o) => o.class_name(),
            _ => None,
        }
    }

    /// Reference identity for objects and functions; always false for primitives.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        match (a, b) {
            (Self::Object(x), Self::Object(y)) => Arc::ptr_eq(&x.0, &y.0),
            (Self::Function(x), Self::Function(y)) => Arc::ptr_eq(&x.0, &y.0),
            _ => false,
        }
    }

    /// Property storage for reference values.
    fn props(&self) -> Option<&RwLock<Props>> {
        match self {
            Self::Object(o) => Some(&o.0.props),
            Self::Function(f) => Some(&f.0.props),
            _ => None,
        }
    }
}

/// Strict equality: primitives compare by value, references by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            _ => Self::ptr_eq(self, other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow: reference values may be cyclic.
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(o) => f
                .debug_struct("Object")
                .field("class", &o.class_name())
                .field("keys", &self.keys())
                .finish(),
            Self::Function(func) => f
                .debug_struct("Function")
                .field("name", &func.name())
                .field("keys", &self.keys())
                .finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(Arc::from(value))
    }
}
