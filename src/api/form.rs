//! Purpose: Input capability for the publish flow.
//! Exports: `FormSource`, `StaticForm`.
//! Invariants: Values are read at publish time, never cached by the publisher.

/// Supplies the three publish inputs. Implementations may return different values per call.
pub trait FormSource: Send + Sync {
    fn resource_type(&self) -> String;
    fn source_url(&self) -> String;
    fn endpoint_url(&self) -> String;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StaticForm {
    pub resource_type: String,
    pub source_url: String,
    pub endpoint_url: String,
}

impl StaticForm {
    pub fn new(
        resource_type: impl Into<String>,
        source_url: impl Into<String>,
        endpoint_url: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            source_url: source_url.into(),
            endpoint_url: endpoint_url.into(),
        }
    }
}

impl FormSource for StaticForm {
    fn resource_type(&self) -> String {
        self.resource_type.clone()
    }

    fn source_url(&self) -> String {
        self.source_url.clone()
    }

    fn endpoint_url(&self) -> String {
        self.endpoint_url.clone()
    }
}
