//! Item storage for SecretShare
//!
//! A small DynamoDB-shaped contract (put, query, conditional delete) with two
//! backends: an in-memory store for development and tests, and a DynamoDB
//! table accessed through the AWS SDK.

pub mod attribute;
pub mod dynamodb;
pub mod expression;
pub mod memory;
pub mod traits;


pub use attribute::{AttributeValue, Item};
pub use dynamodb::DynamoDbStore;
pub use expression::ExpressionError;
pub use memory::MemoryStore;
pub use traits::{
    DeleteItemInput, ItemStore, KeyAttribute, KeySchema, Placeholders, PutItemInput, QueryInput,
    QueryOutput, ScalarType, StoreError,
};
