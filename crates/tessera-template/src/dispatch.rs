/*
 * dispatch.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Collaborator dispatch.
//!
//! Method-call placeholders (`::~Target->method(args)~::`) never reach into
//! the host application by name. Instead the caller hands the renderer a
//! [`Dispatcher`], usually a [`Registry`] populated at startup with the
//! collaborators templates are allowed to call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::value::Value;

/// A named capability that templates can invoke.
pub trait Collaborator: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Invoke `method` with positional arguments.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError>;
}

/// Trait for resolving and invoking collaborator methods.
pub trait Dispatcher: Sync {
    /// Invoke `method` on the collaborator registered as `target`.
    fn resolve(&self, target: &str, method: &str, args: &[Value]) -> Result<Value, DispatchError>;

    /// Invoke `method` on the result of a previous call.
    fn chain(&self, prior: Value, method: &str, args: &[Value]) -> Result<Value, DispatchError>;
}

/// Trait for looking up default asset references used as fallbacks.
pub trait AssetResolver: Sync {
    /// Default reference for an asset kind (e.g. `"file"`, `"image"`).
    fn default_for(&self, kind: &str) -> String;
}

/// Dispatcher with nothing registered. Every call fails.
#[derive(Debug, Clone, Default)]
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn resolve(&self, target: &str, _method: &str, _args: &[Value]) -> Result<Value, DispatchError> {
        Err(DispatchError::UnknownTarget {
            target: target.to_string(),
        })
    }

    fn chain(&self, prior: Value, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        chain_on_object(prior, method, args)
    }
}

fn chain_on_object(prior: Value, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
    match prior {
        Value::Object(obj) => obj.invoke(method, args),
        _ => Err(DispatchError::NotChainable {
            method: method.to_string(),
        }),
    }
}

/// Capability table mapping collaborator names to implementations.
#[derive(Clone, Default)]
pub struct Registry {
    collaborators: HashMap<String, Arc<dyn Collaborator>>,
    scalar_methods: Option<Arc<dyn Collaborator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collaborator under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        collaborator: impl Collaborator + 'static,
    ) -> &mut Self {
        self.collaborators
            .insert(name.into(), Arc::new(collaborator));
        self
    }

    /// Collaborator used when a chain's first result is a plain value.
    ///
    /// The prior value is passed as the first argument.
    pub fn with_scalar_methods(mut self, collaborator: impl Collaborator + 'static) -> Self {
        self.scalar_methods = Some(Arc::new(collaborator));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Collaborator>> {
        self.collaborators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collaborators.contains_key(name)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.collaborators.keys().collect();
        names.sort();
        f.debug_struct("Registry")
            .field("collaborators", &names)
            .field(
                "scalar_methods",
                &self.scalar_methods.as_ref().map(|c| c.name().to_string()),
            )
            .finish()
    }
}

impl Dispatcher for Registry {
    fn resolve(&self, target: &str, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let collaborator = self
            .collaborators
            .get(target)
            .ok_or_else(|| DispatchError::UnknownTarget {
                target: target.to_string(),
            })?;
        collaborator.invoke(method, args)
    }

    fn chain(&self, prior: Value, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        match (&prior, &self.scalar_methods) {
            (Value::Object(_), _) | (_, None) => chain_on_object(prior, method, args),
            (_, Some(scalar)) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(prior);
                full.extend_from_slice(args);
                scalar.invoke(method, &full)
            }
        }
    }
}

/// Collaborator backed by a table of closures, one per method.
///
/// Handy for small capabilities and for tests.
#[derive(Clone)]
pub struct FnCollaborator {
    name: String,
    methods: HashMap<String, Arc<dyn Fn(&[Value]) -> Result<Value, DispatchError> + Send + Sync>>,
}

impl FnCollaborator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }
}

impl Collaborator for FnCollaborator {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let f = self
            .methods
            .get(method)
            .ok_or_else(|| DispatchError::UnknownMethod {
                target: self.name.clone(),
                method: method.to_string(),
            })?;
        f(args)
    }
}

/// Default image used when nothing better is configured.
pub const DEFAULT_ASSET: &str = "/images/default.png";

/// Asset resolver backed by a kind → reference map.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    defaults: HashMap<String, String>,
    fallback: String,
}

impl Default for StaticAssets {
    fn default() -> Self {
        Self {
            defaults: HashMap::new(),
            fallback: DEFAULT_ASSET.to_string(),
        }
    }
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default for `kind`.
    pub fn add(&mut self, kind: impl Into<String>, reference: impl Into<String>) -> &mut Self {
        self.defaults.insert(kind.into(), reference.into());
        self
    }

    /// Reference used for kinds without an explicit entry.
    pub fn with_fallback(mut self, reference: impl Into<String>) -> Self {
        self.fallback = reference.into();
        self
    }

    /// Create a resolver with the given defaults.
    pub fn with_defaults(
        defaults: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut assets = Self::new();
        for (kind, reference) in defaults {
            assets.add(kind, reference);
        }
        assets
    }
}

impl AssetResolver for StaticAssets {
    fn default_for(&self, kind: &str) -> String {
        self.defaults
            .get(kind)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> FnCollaborator {
        FnCollaborator::new("Text").method("upper", |args| {
            Ok(Value::string(
                args.first().map(Value::render).unwrap_or_default().to_uppercase(),
            ))
        })
    }

    #[test]
    fn test_registry_resolve() {
        let mut registry = Registry::new();
        registry.register("Text", text());

        let result = registry
            .resolve("Text", "upper", &[Value::string("abc")])
            .unwrap();
        assert_eq!(result, Value::string("ABC"));
    }

    #[test]
    fn test_registry_unknown_target_and_method() {
        let mut registry = Registry::new();
        registry.register("Text", text());

        assert_eq!(
            registry.resolve("Nope", "upper", &[]),
            Err(DispatchError::UnknownTarget {
                target: "Nope".to_string()
            })
        );
        assert_eq!(
            registry.resolve("Text", "lower", &[]),
            Err(DispatchError::UnknownMethod {
                target: "Text".to_string(),
                method: "lower".to_string()
            })
        );
    }

    #[test]
    fn test_chain_on_object() {
        let registry = Registry::new();
        let obj = Value::Object(Arc::new(text()));
        let result = registry
            .chain(obj, "upper", &[Value::string("x")])
            .unwrap();
        assert_eq!(result, Value::string("X"));
    }

    #[test]
    fn test_chain_on_scalar_uses_scalar_methods() {
        let registry = Registry::new().with_scalar_methods(text());
        let result = registry.chain(Value::string("hi"), "upper", &[]).unwrap();
        assert_eq!(result, Value::string("HI"));

        let bare = Registry::new();
        assert!(matches!(
            bare.chain(Value::string("hi"), "upper", &[]),
            Err(DispatchError::NotChainable { .. })
        ));
    }

    #[test]
    fn test_static_assets() {
        let assets = StaticAssets::with_defaults([("image", "/img/none.svg")]);
        assert_eq!(assets.default_for("image"), "/img/none.svg");
        assert_eq!(assets.default_for("file"), DEFAULT_ASSET);
    }
}
