//! In-memory page fixtures shared by the unit tests.

use std::collections::HashMap;

use crate::bridge::introspection::{
    CapabilityProxy, CapabilityWrapper, IntrospectionError, MetaInfo,
};
use crate::bridge::locator::Locator;
use crate::bridge::value::{FunctionRef, HostObject, HostValue};

/// A flat list of page objects matched by member equality.
///
/// The `occurrence` key is ignored by the matcher so locators can be passed
/// through unmodified.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    objects: Vec<HostValue>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, object: HostObject) -> Self {
        self.objects.push(HostValue::object(object));
        self
    }

    pub fn with_value(mut self, value: HostValue) -> Self {
        self.objects.push(value);
        self
    }

    pub fn objects(&self) -> &[HostValue] {
        &self.objects
    }

    pub fn find(&self, locator: &Locator) -> Vec<HostValue> {
        self.objects
            .iter()
            .filter(|object| {
                locator
                    .iter()
                    .filter(|(key, _)| key.as_str() != "occurrence")
                    .all(|(key, expected)| object.get_member(key).same_ref(expected))
            })
            .cloned()
            .collect()
    }

    /// A finder closure over a snapshot of the page.
    pub fn finder(&self) -> impl Fn(&Locator) -> Vec<HostValue> + Send + Sync + 'static {
        let page = self.clone();
        move |locator: &Locator| page.find(locator)
    }
}

/// Wrapping capability driven by tables.
#[derive(Debug, Clone, Default)]
pub struct FakeWrapper {
    meta: HashMap<String, MetaInfo>,
    members: HashMap<String, HostValue>,
    failing: bool,
    unwrappable: bool,
}

impl FakeWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe(mut self, name: &str, info: MetaInfo) -> Self {
        self.meta.insert(name.to_string(), info);
        self
    }

    pub fn with_member(mut self, name: &str, function: FunctionRef) -> Self {
        self.members.insert(name.to_string(), HostValue::Function(function));
        self
    }

    pub fn with_value(mut self, name: &str, value: HostValue) -> Self {
        self.members.insert(name.to_string(), value);
        self
    }

    /// `meta_info` raises for every member.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// `wrap` refuses every object.
    pub fn unwrappable(mut self) -> Self {
        self.unwrappable = true;
        self
    }
}

struct FakeProxy<'a> {
    wrapper: &'a FakeWrapper,
}

impl CapabilityProxy for FakeProxy<'_> {
    fn meta_info(&self, name: &str) -> Result<MetaInfo, IntrospectionError> {
        if self.wrapper.failing {
            return Err(IntrospectionError::Failed(format!("metaInfo({name}) raised")));
        }
        self.wrapper
            .meta
            .get(name)
            .cloned()
            .ok_or_else(|| IntrospectionError::NotDescribed(name.to_string()))
    }

    fn member(&self, name: &str) -> Option<HostValue> {
        self.wrapper.members.get(name).cloned()
    }
}

impl CapabilityWrapper for FakeWrapper {
    fn wrap<'a>(
        &'a self,
        _object: &HostValue,
    ) -> Result<Box<dyn CapabilityProxy + 'a>, IntrospectionError> {
        if self.unwrappable {
            return Err(IntrospectionError::Unavailable("fake".to_string()));
        }
        Ok(Box::new(FakeProxy { wrapper: self }))
    }
}
