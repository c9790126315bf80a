use std::collections::HashMap;
use std::hash::Hash;

use crate::BindError;

/// A single formal parameter: its name and optional default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param<V> {
    pub name: String,
    pub default: Option<V>,
}

impl<V> Param<V> {
    /// A parameter that must be supplied by the caller.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter that falls back to `default` when omitted.
    pub fn optional(name: impl Into<String>, default: V) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// The declared parameter list of a memoized function.
///
/// A `Signature` is built once, when the function is wrapped, and is used to
/// normalize every call into a [`CacheKey`]: arguments passed by keyword and
/// omitted optional arguments are resolved to the same positional-equivalent
/// form as a fully positional call.
///
/// # Examples
///
/// ```
/// use memoscope_core::{CallArgs, Signature};
///
/// let sig: Signature<i64> = Signature::new().required("x").optional("y", 10);
///
/// let positional = sig.derive_key(&CallArgs::new().arg(1).arg(10));
/// let keyword = sig.derive_key(&CallArgs::new().kwarg("x", 1));
/// assert_eq!(positional, keyword);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature<V> {
    params: Vec<Param<V>>,
}

impl<V> Default for Signature<V> {
    fn default() -> Self {
        Self { params: Vec::new() }
    }
}

impl<V> Signature<V> {
    /// An empty signature (a function without parameters).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a required parameter.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::required(name));
        self
    }

    /// Appends an optional parameter with its default value.
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<V>) -> Self {
        self.params.push(Param::optional(name, default.into()));
        self
    }

    pub fn params(&self) -> &[Param<V>] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

impl<V: Clone> Signature<V> {
    /// Derives the cache key of a call.
    ///
    /// The key is the positional arguments as given, followed by one slot for
    /// every formal parameter not covered positionally: the keyword argument of
    /// that name, else the declared default, else `None`.
    ///
    /// No arity validation is performed. Keyword arguments that name no formal
    /// parameter do not take part in the key, and surplus positional
    /// arguments lengthen it.
    pub fn derive_key(&self, args: &CallArgs<V>) -> CacheKey<V> {
        let covered = args.positional.len();
        let mut slots = Vec::with_capacity(covered.max(self.params.len()));
        slots.extend(args.positional.iter().cloned().map(Some));
        slots.extend(self.params.iter().skip(covered).map(|param| {
            args.keyword
                .get(&param.name)
                .or(param.default.as_ref())
                .cloned()
        }));
        CacheKey { slots }
    }

    /// Resolves a call into exactly one value per formal parameter.
    ///
    /// Unlike [`derive_key`](Self::derive_key) this validates the call: it is
    /// meant for target functions that want Python-like argument handling.
    pub fn bind(&self, args: &CallArgs<V>) -> Result<Vec<V>, BindError> {
        if args.positional.len() > self.params.len() {
            return Err(BindError::TooManyPositional {
                expected: self.params.len(),
                given: args.positional.len(),
            });
        }

        for name in args.keyword.keys() {
            match self.position(name) {
                None => {
                    return Err(BindError::UnexpectedKeyword { name: name.clone() });
                }
                Some(index) if index < args.positional.len() => {
                    return Err(BindError::DuplicateArgument { name: name.clone() });
                }
                Some(_) => {}
            }
        }

        let mut bound = args.positional.clone();
        for param in &self.params[args.positional.len()..] {
            let value = args
                .keyword
                .get(&param.name)
                .or(param.default.as_ref())
                .cloned()
                .ok_or_else(|| BindError::MissingArgument {
                    name: param.name.clone(),
                })?;
            bound.push(value);
        }
        Ok(bound)
    }
}

/// The arguments of one call: positional values plus keyword values by name.
///
/// # Examples
///
/// ```
/// use memoscope_core::CallArgs;
///
/// let args: CallArgs<i64> = CallArgs::new().arg(1).kwarg("scale", 3);
/// assert_eq!(args.positional(), &[1]);
/// assert_eq!(args.keyword("scale"), Some(&3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgs<V> {
    positional: Vec<V>,
    keyword: HashMap<String, V>,
}

impl<V> Default for CallArgs<V> {
    fn default() -> Self {
        Self {
            positional: Vec::new(),
            keyword: HashMap::new(),
        }
    }
}

impl<V> CallArgs<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<V>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing an earlier one of the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<V>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[V] {
        &self.positional
    }

    pub fn keyword(&self, name: &str) -> Option<&V> {
        self.keyword.get(name)
    }

    pub fn keywords(&self) -> &HashMap<String, V> {
        &self.keyword
    }
}

impl<V> From<Vec<V>> for CallArgs<V> {
    fn from(positional: Vec<V>) -> Self {
        Self {
            positional,
            keyword: HashMap::new(),
        }
    }
}

/// Canonical, hashable form of a call's effective arguments.
///
/// Each slot holds the effective value of one argument in declaration order;
/// `None` marks a required parameter the call did not supply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey<V> {
    slots: Vec<Option<V>>,
}

impl<V> CacheKey<V> {
    pub fn slots(&self) -> &[Option<V>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether every slot holds a value.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

impl<V: Clone + Hash + Eq> From<Vec<V>> for CacheKey<V> {
    fn from(values: Vec<V>) -> Self {
        Self {
            slots: values.into_iter().map(Some).collect(),
        }
    }
}
