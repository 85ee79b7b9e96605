//! Item store contract

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::attribute::{AttributeValue, Item};
use crate::expression::{ExpressionContext, ExpressionError};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The conditional request failed")]
    ConditionalCheckFailed,

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Scalar types usable as key attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    S,
    N,
    B,
}

impl ScalarType {
    pub fn matches(self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (ScalarType::S, AttributeValue::S { .. })
                | (ScalarType::N, AttributeValue::N { .. })
                | (ScalarType::B, AttributeValue::B { .. })
        )
    }
}

/// A key attribute and its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: ScalarType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, attribute_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Primary key layout of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    pub fn new(partition_key: KeyAttribute, sort_key: Option<KeyAttribute>) -> Self {
        Self {
            partition_key,
            sort_key,
        }
    }

    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.partition_key.name == name || self.sort_key.as_ref().is_some_and(|k| k.name == name)
    }
}

/// `#name` and `:value` substitutions for an expression
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl Placeholders {
    pub fn context(&self) -> ExpressionContext<'_> {
        ExpressionContext::new(&self.names, &self.values)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }
}

macro_rules! placeholder_builders {
    ($ty:ty) => {
        impl $ty {
            /// Bind a `#name` placeholder
            #[must_use]
            pub fn name(mut self, placeholder: &str, attribute: &str) -> Self {
                self.placeholders
                    .names
                    .insert(placeholder.to_string(), attribute.to_string());
                self
            }

            /// Bind a `:value` placeholder
            #[must_use]
            pub fn value(mut self, placeholder: &str, value: AttributeValue) -> Self {
                self.placeholders
                    .values
                    .insert(placeholder.to_string(), value);
                self
            }
        }
    };
}

/// Write a whole item, optionally guarded by a condition
#[derive(Debug, Clone)]
pub struct PutItemInput {
    pub item: Item,
    pub condition_expression: Option<String>,
    pub placeholders: Placeholders,
}

impl PutItemInput {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            condition_expression: None,
            placeholders: Placeholders::default(),
        }
    }

    #[must_use]
    pub fn condition(mut self, expression: &str) -> Self {
        self.condition_expression = Some(expression.to_string());
        self
    }
}

placeholder_builders!(PutItemInput);

/// Fetch the items of one partition that satisfy a key condition and an
/// optional filter
#[derive(Debug, Clone)]
pub struct QueryInput {
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub consistent_read: bool,
    pub placeholders: Placeholders,
}

impl QueryInput {
    pub fn new(key_condition_expression: &str) -> Self {
        Self {
            key_condition_expression: key_condition_expression.to_string(),
            filter_expression: None,
            consistent_read: false,
            placeholders: Placeholders::default(),
        }
    }

    #[must_use]
    pub fn filter(mut self, expression: &str) -> Self {
        self.filter_expression = Some(expression.to_string());
        self
    }

    #[must_use]
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }
}

placeholder_builders!(QueryInput);

/// Query result. `scanned_count` counts items matched by the key condition
/// before the filter ran.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub items: Vec<Item>,
    pub count: usize,
    pub scanned_count: usize,
}

/// Remove one item by full primary key, optionally guarded by a condition
#[derive(Debug, Clone)]
pub struct DeleteItemInput {
    pub key: Item,
    pub condition_expression: Option<String>,
    pub placeholders: Placeholders,
}

impl DeleteItemInput {
    pub fn new(key: Item) -> Self {
        Self {
            key,
            condition_expression: None,
            placeholders: Placeholders::default(),
        }
    }

    #[must_use]
    pub fn condition(mut self, expression: &str) -> Self {
        self.condition_expression = Some(expression.to_string());
        self
    }
}

placeholder_builders!(DeleteItemInput);

/// Keyed item store with DynamoDB semantics
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Short backend name, e.g. "memory"
    fn name(&self) -> &'static str;

    fn key_schema(&self) -> &KeySchema;

    /// Put an item, replacing any item with the same key. Fails with
    /// `ConditionalCheckFailed` when the condition does not hold.
    async fn put_item(&self, input: PutItemInput) -> Result<(), StoreError>;

    /// Query a single partition. Items come back in ascending sort key order.
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError>;

    /// Delete an item and return what was removed, if anything
    async fn delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError>;
}
