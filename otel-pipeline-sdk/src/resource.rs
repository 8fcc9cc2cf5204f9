//! Process identity and instrumentation scope.
//!
//! Both are shared by every record they describe, so records hold them behind
//! an `Arc`. The encoder groups a batch by these two values.
use crate::common::{Key, KeyValue, Value};
use std::borrow::Cow;
use std::sync::Arc;

/// An immutable set of attributes describing the entity producing telemetry.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Resource {
    attrs: Vec<KeyValue>,
    schema_url: Option<Cow<'static, str>>,
}

impl Resource {
    /// A resource with no attributes.
    pub fn empty() -> Self {
        Resource::default()
    }

    /// Start building a resource.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource::default(),
        }
    }

    /// The value of `key`, if present.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.attrs.iter().find(|kv| &kv.key == key).map(|kv| &kv.value)
    }

    /// Attributes in insertion order, unique by key.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.attrs.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// `true` when there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Schema url, if set.
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }
}

/// Builder for [`Resource`]. Later attributes overwrite earlier ones with the same key.
#[derive(Debug)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    /// Add a single attribute.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        match self.resource.attrs.iter_mut().find(|e| e.key == kv.key) {
            Some(existing) => existing.value = kv.value,
            None => self.resource.attrs.push(kv),
        }
        self
    }

    /// Add several attributes.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(self, kvs: T) -> Self {
        kvs.into_iter().fold(self, |builder, kv| builder.with_attribute(kv))
    }

    /// Shorthand for the `service.name` attribute.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new("service.name", name))
    }

    /// Set the schema url.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.resource.schema_url = Some(schema_url.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> Resource {
        self.resource
    }
}

/// Information about the library producing the telemetry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InstrumentationScope {
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
    schema_url: Option<Cow<'static, str>>,
    attributes: Vec<KeyValue>,
}

impl InstrumentationScope {
    /// Start building a scope named `name`.
    pub fn builder<T: Into<Cow<'static, str>>>(name: T) -> InstrumentationScopeBuilder {
        InstrumentationScopeBuilder {
            name: name.into(),
            version: None,
            schema_url: None,
            attributes: Vec::new(),
        }
    }

    /// Returns the instrumentation library name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instrumentation library version.
    #[inline]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the schema url.
    #[inline]
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }

    /// Returns the scope attributes.
    #[inline]
    pub fn attributes(&self) -> impl Iterator<Item = &KeyValue> {
        self.attributes.iter()
    }
}

/// Configuration options for [`InstrumentationScope`].
#[derive(Debug)]
pub struct InstrumentationScopeBuilder {
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
    schema_url: Option<Cow<'static, str>>,
    attributes: Vec<KeyValue>,
}

impl InstrumentationScopeBuilder {
    /// Configure the version for the instrumentation scope
    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Configure the Schema URL for the instrumentation scope
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    /// Configure the attributes for the instrumentation scope
    pub fn with_attributes<I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        self.attributes = attributes.into_iter().collect();
        self
    }

    /// Create a new [`InstrumentationScope`] from this configuration
    pub fn build(self) -> InstrumentationScope {
        InstrumentationScope {
            name: self.name,
            version: self.version,
            schema_url: self.schema_url,
            attributes: self.attributes,
        }
    }

    /// Create a shared [`InstrumentationScope`] from this configuration
    pub fn build_shared(self) -> Arc<InstrumentationScope> {
        Arc::new(self.build())
    }
}
