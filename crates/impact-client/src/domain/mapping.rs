//! Characteristic mapper.
//!
//! Declares how a domain type becomes an outbound query. A type registers
//! an emitter name plus an ordered list of field rules; evaluating the rules
//! against an instance yields `(emitter, params)`.
//!
//! ```
//! use impact_client::domain::{Mappable, MappingRegistry, ParamValue, ProvideOptions};
//! use impact_client::params;
//!
//! struct MyCar { make: String, year: i64 }
//!
//! impl Mappable for MyCar {
//!     fn characteristic(&self, accessor: &str) -> Option<ParamValue> {
//!         match accessor {
//!             "make" => Some(self.make.as_str().into()),
//!             "model_year" => Some(self.year.into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let registry = MappingRegistry::new();
//! registry
//!     .register::<MyCar>("Automobile", |r| {
//!         r.provide("make", ProvideOptions::default().rename("vehicle_make"));
//!         r.provide("model_year", ProvideOptions::default().rename("year"));
//!     })
//!     .unwrap();
//!
//! let car = MyCar { make: "Nissan".into(), year: 2006 };
//! let (emitter, params) = registry.to_query(&car, params! {}).unwrap();
//! assert_eq!(emitter, "Automobile");
//! assert_eq!(params["vehicle_make"], ParamValue::from("Nissan"));
//! ```

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::naming::normalize_emitter;
use crate::domain::value::{insert_flat, ParamValue, Params};
use crate::error::MappingError;

/// A domain type that can be turned into a query.
///
/// `characteristic` is the default resolver used by rules registered
/// without a custom function: it returns the value of the named accessor.
pub trait Mappable: Send + Sync + 'static {
    fn characteristic(&self, _accessor: &str) -> Option<ParamValue> {
        None
    }
}

/// Custom resolver for one field rule
pub type ResolverFn<T> = Arc<dyn Fn(&T) -> Option<ParamValue> + Send + Sync>;

/// How a rule obtains its value
pub enum Resolver<T> {
    /// Call [`Mappable::characteristic`] with the source accessor name
    Accessor,
    /// Call a registered function
    Custom(ResolverFn<T>),
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        match self {
            Resolver::Accessor => Resolver::Accessor,
            Resolver::Custom(f) => Resolver::Custom(Arc::clone(f)),
        }
    }
}

/// Options for [`Registrar::provide`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvideOptions {
    rename: Option<String>,
    key: Option<String>,
}

impl ProvideOptions {
    /// Send the value under a different characteristic name
    pub fn rename(mut self, output_name: impl Into<String>) -> Self {
        self.rename = Some(output_name.into());
        self
    }

    /// Nest the value under `name[key]`, e.g. an IATA code instead of a name
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// One field rule
pub struct FieldRule<T> {
    pub source_accessor: String,
    pub output_name: String,
    pub nested_key: Option<String>,
    pub resolver: Resolver<T>,
}

impl<T: Mappable> FieldRule<T> {
    /// Parameter key this rule writes: `output_name` or `output_name[nested_key]`
    pub fn param_key(&self) -> String {
        match &self.nested_key {
            Some(key) => format!("{}[{}]", self.output_name, key),
            None => self.output_name.clone(),
        }
    }

    fn resolve(&self, instance: &T) -> Option<ParamValue> {
        match &self.resolver {
            Resolver::Accessor => instance.characteristic(&self.source_accessor),
            Resolver::Custom(f) => f(instance),
        }
    }
}

impl<T> fmt::Debug for FieldRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("source_accessor", &self.source_accessor)
            .field("output_name", &self.output_name)
            .field("nested_key", &self.nested_key)
            .field("custom", &matches!(self.resolver, Resolver::Custom(_)))
            .finish()
    }
}

/// Registered mapping for one type
pub struct MappingSpec<T> {
    emitter: String,
    rules: Vec<FieldRule<T>>,
}

impl<T: Mappable> MappingSpec<T> {
    pub fn emitter(&self) -> &str {
        &self.emitter
    }

    pub fn rules(&self) -> &[FieldRule<T>] {
        &self.rules
    }

    /// Evaluate every rule in registration order, skip blank values, then
    /// apply `overrides` (override wins on key collision).
    ///
    /// Nested maps from either side are stored under flat bracket keys, so
    /// an override `{"airline": {"iata_code": ..}}` replaces the value of a
    /// rule keyed `airline[iata_code]`.
    pub fn evaluate(&self, instance: &T, overrides: &Params) -> (String, Params) {
        let mut params = Params::new();
        for rule in &self.rules {
            match rule.resolve(instance) {
                Some(value) if !value.is_blank() => {
                    insert_flat(&mut params, rule.param_key(), value);
                }
                _ => {}
            }
        }
        for (key, value) in overrides {
            insert_flat(&mut params, key.clone(), value.clone());
        }
        (self.emitter.clone(), params)
    }
}

/// Collects field rules while a type is being registered
pub struct Registrar<T> {
    rules: Vec<FieldRule<T>>,
}

impl<T: Mappable> Registrar<T> {
    fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Provide the value of `accessor` via [`Mappable::characteristic`]
    pub fn provide(&mut self, accessor: &str, options: ProvideOptions) -> &mut Self {
        self.push(accessor, options, Resolver::Accessor)
    }

    /// Provide a value computed by `resolver`
    pub fn provide_with<F>(&mut self, accessor: &str, options: ProvideOptions, resolver: F) -> &mut Self
    where
        F: Fn(&T) -> Option<ParamValue> + Send + Sync + 'static,
    {
        self.push(accessor, options, Resolver::Custom(Arc::new(resolver)))
    }

    fn push(&mut self, accessor: &str, options: ProvideOptions, resolver: Resolver<T>) -> &mut Self {
        let rule = FieldRule {
            source_accessor: accessor.to_string(),
            output_name: options.rename.unwrap_or_else(|| accessor.to_string()),
            nested_key: options.key,
            resolver,
        };
        // Re-providing an accessor replaces its rule in place
        match self.rules.iter_mut().find(|r| r.source_accessor == accessor) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }
}

struct RegisteredSpec {
    emitter: String,
    type_name: &'static str,
    spec: Arc<dyn Any + Send + Sync>,
}

/// Registry of mapping specs, keyed by type.
///
/// Owned by the application and shared via `Arc`.
#[derive(Default)]
pub struct MappingRegistry {
    specs: RwLock<HashMap<TypeId, RegisteredSpec>>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the mapping for `T`.
    ///
    /// The emitter name is normalized to singular CamelCase. Re-registering
    /// a type replaces its whole rule set; the last registration wins even
    /// when the emitter changes.
    pub fn register<T: Mappable>(
        &self,
        emitter: &str,
        build: impl FnOnce(&mut Registrar<T>),
    ) -> Result<(), MappingError> {
        let emitter = normalize_emitter(emitter);
        if emitter.is_empty() {
            return Err(MappingError::InvalidEmitter(emitter));
        }

        let mut registrar = Registrar::<T>::new();
        build(&mut registrar);

        let type_name = std::any::type_name::<T>();
        let rule_count = registrar.rules.len();
        let spec = MappingSpec {
            emitter: emitter.clone(),
            rules: registrar.rules,
        };

        let mut specs = self.specs.write();
        if let Some(previous) = specs.get(&TypeId::of::<T>()) {
            if previous.emitter != emitter {
                warn!(
                    type_name,
                    previous = %previous.emitter,
                    emitter = %emitter,
                    "Replacing mapping with a different emitter"
                );
            }
        }
        specs.insert(
            TypeId::of::<T>(),
            RegisteredSpec {
                emitter: emitter.clone(),
                type_name,
                spec: Arc::new(spec),
            },
        );

        debug!(type_name, emitter = %emitter, rules = rule_count, "Registered mapping");
        Ok(())
    }

    /// Mapping spec for `T`, if registered
    pub fn spec_for<T: Mappable>(&self) -> Option<Arc<MappingSpec<T>>> {
        let specs = self.specs.read();
        let entry = specs.get(&TypeId::of::<T>())?;
        Arc::clone(&entry.spec).downcast::<MappingSpec<T>>().ok()
    }

    pub fn is_registered<T: Mappable>(&self) -> bool {
        self.specs.read().contains_key(&TypeId::of::<T>())
    }

    /// Emitter registered for `T`
    pub fn emitter_for<T: Mappable>(&self) -> Option<String> {
        self.specs
            .read()
            .get(&TypeId::of::<T>())
            .map(|entry| entry.emitter.clone())
    }

    /// Names of all registered types with their emitters
    pub fn registrations(&self) -> Vec<(&'static str, String)> {
        let mut out: Vec<_> = self
            .specs
            .read()
            .values()
            .map(|entry| (entry.type_name, entry.emitter.clone()))
            .collect();
        out.sort();
        out
    }

    /// Map `instance` to `(emitter, params)`, applying `overrides` last
    pub fn to_query<T: Mappable>(&self, instance: &T, overrides: Params) -> Result<(String, Params), MappingError> {
        let spec = self.spec_for::<T>().ok_or(MappingError::Unregistered {
            type_name: std::any::type_name::<T>(),
        })?;
        Ok(spec.evaluate(instance, &overrides))
    }
}
