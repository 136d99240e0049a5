//! Resource descriptors for proxy-mode invocation.

use serde::{Deserialize, Serialize};

use crate::producer::ResponseType;

/// How a positional parameter binds into the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamBinding {
    /// Substituted into a `{name}` placeholder of the operation path.
    Path(String),
    Query(String),
    Header(String),
    /// Serialized as the request entity.
    Body,
}

/// A single remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub params: Vec<ParamBinding>,
    /// Media type sent as `Accept`.
    #[serde(default)]
    pub produces: Option<String>,
    /// Media type sent as `Content-Type` for the body parameter.
    #[serde(default)]
    pub consumes: Option<String>,
    #[serde(default = "default_returns")]
    pub returns: ResponseType,
}

fn default_returns() -> ResponseType {
    ResponseType::Json
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            path: path.into(),
            params: Vec::new(),
            produces: None,
            consumes: None,
            returns: default_returns(),
        }
    }

    pub fn param(mut self, binding: ParamBinding) -> Self {
        self.params.push(binding);
        self
    }

    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces = Some(media_type.into());
        self
    }

    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes = Some(media_type.into());
        self
    }

    pub fn returns(mut self, response_type: ResponseType) -> Self {
        self.returns = response_type;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A named remote resource and the operations it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    /// Resource path appended to the address; may contain placeholders.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    /// Find an operation by name and number of parameters.
    pub fn find_operation(&self, name: &str, arity: usize) -> Option<&OperationDescriptor> {
        self.operations
            .iter()
            .find(|op| op.name == name && op.arity() == arity)
    }
}
