//! Reusable predicates over module exports.
//!
//! A [`Filter`] pairs the predicate with a description of the arguments it
//! was built from. The description is diagnostic only; it shows up in log
//! lines, errors and the search history.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::value::Value;

/// Source of fresh filter identities.
static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a filter instance. Clones share it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u64);

/// Constructor a filter was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Every named property is defined.
    Props,
    /// Callable whose source contains every substring.
    Code,
    /// Class instance with the given constructor name.
    StoreName,
    /// Code match that also looks through memo/forward-ref wrappers.
    ComponentCode,
    /// Caller-supplied predicate.
    Custom,
}

impl FilterKind {
    /// Short name used in descriptions.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Props => "byProps",
            Self::Code => "byCode",
            Self::StoreName => "byStoreName",
            Self::ComponentCode => "componentByCode",
            Self::Custom => "custom",
        }
    }
}

/// Predicate signature wrapped by [`Filter`].
type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// A tagged predicate over export values.
#[derive(Clone)]
pub struct Filter {
    /// Instance identity, used to key pending subscriptions.
    id: FilterId,
    /// Constructor used.
    kind: FilterKind,
    /// Construction arguments, for diagnostics.
    args: Arc<[String]>,
    /// The predicate itself.
    eval: Arc<Predicate>,
}

impl Filter {
    /// Wrap an arbitrary predicate, tagging it with `label` for diagnostics.
    pub fn custom<F>(label: &str, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::tagged(FilterKind::Custom, vec![label.to_string()], predicate)
    }

    /// True iff every named property is defined on the candidate.
    pub fn by_props<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let wanted = names.clone();
        Self::tagged(FilterKind::Props, names, move |v| {
            wanted.iter().all(|name| v.has(name))
        })
    }

    /// True iff the candidate is callable and its source contains every substring.
    pub fn by_code<I, S>(code: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let code: Vec<String> = code.into_iter().map(Into::into).collect();
        let wanted = code.clone();
        Self::tagged(FilterKind::Code, code, move |v| code_matches(&wanted, v))
    }

    /// True iff the candidate's constructor display name equals `name`.
    pub fn by_store_name(name: &str) -> Self {
        let wanted = name.to_string();
        Self::tagged(FilterKind::StoreName, vec![name.to_string()], move |v| {
            v.class_name() == Some(wanted.as_str())
        })
    }

    /// Code match that unwraps one level of component wrapping.
    ///
    /// Memo wrappers are inspected through `.type.render` or `.type`,
    /// forward-ref wrappers through `.render`. Only values tagged with
    /// `$$typeof` are treated as wrappers.
    pub fn by_component_code<I, S>(code: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let code: Vec<String> = code.into_iter().map(Into::into).collect();
        let wanted = code.clone();
        Self::tagged(FilterKind::ComponentCode, code, move |v| {
            if code_matches(&wanted, v) {
                return true;
            }
            if !v.has("$$typeof") {
                return false;
            }
            let inner = v.get("type");
            if inner.is_truthy() {
                let render = inner.get("render");
                return if render.is_truthy() {
                    code_matches(&wanted, &render)
                } else {
                    code_matches(&wanted, &inner)
                };
            }
            let render = v.get("render");
            render.is_truthy() && code_matches(&wanted, &render)
        })
    }

    /// Evaluate the predicate.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        (self.eval)(value)
    }

    /// Instance identity.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Constructor used.
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Construction arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build a filter with a fresh identity.
    fn tagged<F>(kind: FilterKind, args: Vec<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            id: FilterId(NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            args: args.into(),
            eval: Arc::new(predicate),
        }
    }
}

/// Callable whose source contains all of `code`.
fn code_matches(code: &[String], value: &Value) -> bool {
    value
        .as_function()
        .is_some_and(|f| code.iter().all(|c| f.source().contains(c.as_str())))
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind.label(), self.args)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
