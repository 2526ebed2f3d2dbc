//! # Model Binding
//!
//! Object schemas tagged with `x-model` hand their unmarshalled properties
//! to a [`ModelFactory`], which decides what a named domain object looks
//! like. The default [`DynamicModelFactory`] wraps them in a [`Model`].

use std::collections::BTreeMap;

use oasu_core::{Model, NativeValue};

/// Builds named domain objects from unmarshalled property maps.
pub trait ModelFactory: Send + Sync {
    /// Bind `properties` to the model called `name`.
    fn create(&self, properties: BTreeMap<String, NativeValue>, name: &str) -> NativeValue;
}

/// Produces [`NativeValue::Model`] values carrying the model name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicModelFactory;

impl ModelFactory for DynamicModelFactory {
    fn create(&self, properties: BTreeMap<String, NativeValue>, name: &str) -> NativeValue {
        NativeValue::Model(Model {
            name: name.to_string(),
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_model_keeps_name_and_properties() {
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), NativeValue::String("Rex".to_string()));
        let model = DynamicModelFactory.create(props, "Pet");
        match model {
            NativeValue::Model(m) => {
                assert_eq!(m.name, "Pet");
                assert_eq!(m.get("name"), Some(&NativeValue::String("Rex".to_string())));
            }
            other => panic!("expected a model, got {other:?}"),
        }
    }
}
