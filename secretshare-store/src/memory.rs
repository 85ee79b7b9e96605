//! In-memory item store

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Ordering;
use tracing::debug;

use crate::attribute::{compare, AttributeValue, Item};
use crate::expression::{
    evaluate_condition, evaluate_key_conditions, parse_condition, parse_key_condition,
    ComparisonOp, Condition, ExpressionContext, KeyCondition,
};
use crate::traits::{
    DeleteItemInput, ItemStore, KeyAttribute, KeySchema, PutItemInput, QueryInput, QueryOutput,
    StoreError,
};

/// Canonical form of a key value, so `{"N": "1.0"}` and `{"N": "1"}` collide
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyPart(String);

impl KeyPart {
    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::S { S } => Some(Self(format!("S:{}", S))),
            AttributeValue::N { N } => {
                let n: f64 = N.trim().parse().ok()?;
                Some(Self(format!("N:{}", n)))
            }
            AttributeValue::B { B } => Some(Self(format!("B:{}", B))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PrimaryKey {
    partition: KeyPart,
    sort: Option<KeyPart>,
}

/// DashMap-backed store for development and tests. Items never expire on their
/// own, so expired records stay in memory until deleted; readers are expected
/// to filter on an expiry attribute.
pub struct MemoryStore {
    schema: KeySchema,
    items: DashMap<PrimaryKey, Item>,
}

impl MemoryStore {
    pub fn new(schema: KeySchema) -> Self {
        Self {
            schema,
            items: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn key_part(attribute: &KeyAttribute, item: &Item) -> Result<KeyPart, StoreError> {
        let value = item.get(&attribute.name).ok_or_else(|| {
            StoreError::Validation(format!(
                "One of the required keys was not given a value: {}",
                attribute.name
            ))
        })?;

        if !attribute.attribute_type.matches(value) {
            return Err(StoreError::Validation(format!(
                "Type mismatch for key {}: expected {:?}, got {}",
                attribute.name,
                attribute.attribute_type,
                value.type_name()
            )));
        }

        KeyPart::from_value(value).ok_or_else(|| {
            StoreError::Validation(format!("Invalid key value for {}", attribute.name))
        })
    }

    fn primary_key(&self, item: &Item) -> Result<PrimaryKey, StoreError> {
        let partition = Self::key_part(&self.schema.partition_key, item)?;
        let sort = self
            .schema
            .sort_key
            .as_ref()
            .map(|attribute| Self::key_part(attribute, item))
            .transpose()?;

        Ok(PrimaryKey { partition, sort })
    }

    /// Extract the partition value a key condition pins down with `=`
    fn partition_from_conditions(
        &self,
        conditions: &[KeyCondition],
        ctx: &ExpressionContext,
    ) -> Result<KeyPart, StoreError> {
        let mut partition = None;

        for cond in conditions {
            let name = ctx.resolve_name(cond.attribute())?;
            if !self.schema.is_key_attribute(&name) {
                return Err(StoreError::Validation(format!(
                    "Query key condition not supported on non-key attribute: {}",
                    name
                )));
            }

            if name == self.schema.partition_key.name {
                match cond {
                    KeyCondition::Compare {
                        op: ComparisonOp::Eq,
                        value,
                        ..
                    } => {
                        let value = ctx.resolve_value(value)?;
                        partition = KeyPart::from_value(value);
                    }
                    _ => {
                        return Err(StoreError::Validation(
                            "Query key condition must use = on the partition key".to_string(),
                        ))
                    }
                }
            }
        }

        partition.ok_or_else(|| {
            StoreError::Validation("Query condition missed key schema element".to_string())
        })
    }

    fn check(
        condition: Option<&Condition>,
        item: &Item,
        ctx: &ExpressionContext,
    ) -> Result<(), StoreError> {
        match condition {
            Some(cond) if !evaluate_condition(cond, item, ctx)? => {
                Err(StoreError::ConditionalCheckFailed)
            }
            _ => Ok(()),
        }
    }

    fn sort_order(&self, a: &Item, b: &Item) -> Ordering {
        let Some(sort_key) = &self.schema.sort_key else {
            return Ordering::Equal;
        };
        match (a.get(&sort_key.name), b.get(&sort_key.name)) {
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn key_schema(&self) -> &KeySchema {
        &self.schema
    }

    async fn put_item(&self, input: PutItemInput) -> Result<(), StoreError> {
        let key = self.primary_key(&input.item)?;
        let condition = parse_condition(input.condition_expression.as_deref().unwrap_or(""))?;
        let ctx = input.placeholders.context();

        match self.items.entry(key) {
            Entry::Occupied(mut entry) => {
                Self::check(condition.as_ref(), entry.get(), &ctx)?;
                entry.insert(input.item);
            }
            Entry::Vacant(entry) => {
                Self::check(condition.as_ref(), &Item::new(), &ctx)?;
                entry.insert(input.item);
            }
        }

        debug!(items = self.items.len(), "Put item");
        Ok(())
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let key_conditions = parse_key_condition(&input.key_condition_expression)?;
        let filter = parse_condition(input.filter_expression.as_deref().unwrap_or(""))?;
        let ctx = input.placeholders.context();

        let partition = self.partition_from_conditions(&key_conditions, &ctx)?;

        let mut matched = Vec::new();
        for entry in self.items.iter() {
            if entry.key().partition != partition {
                continue;
            }
            if evaluate_key_conditions(&key_conditions, entry.value(), &ctx)? {
                matched.push(entry.value().clone());
            }
        }
        let scanned_count = matched.len();

        let mut items = Vec::with_capacity(matched.len());
        for item in matched {
            match &filter {
                Some(cond) if !evaluate_condition(cond, &item, &ctx)? => {}
                _ => items.push(item),
            }
        }
        items.sort_by(|a, b| self.sort_order(a, b));

        Ok(QueryOutput {
            count: items.len(),
            scanned_count,
            items,
        })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError> {
        if input
            .key
            .keys()
            .any(|name| !self.schema.is_key_attribute(name))
        {
            return Err(StoreError::Validation(
                "The provided key element does not match the schema".to_string(),
            ));
        }

        let key = self.primary_key(&input.key)?;
        let condition = parse_condition(input.condition_expression.as_deref().unwrap_or(""))?;
        let ctx = input.placeholders.context();

        // The shard lock is held from the check to the removal, so two deletes
        // guarded by attribute_exists cannot both succeed.
        match self.items.entry(key) {
            Entry::Occupied(entry) => {
                Self::check(condition.as_ref(), entry.get(), &ctx)?;
                Ok(Some(entry.remove()))
            }
            Entry::Vacant(_) => {
                Self::check(condition.as_ref(), &Item::new(), &ctx)?;
                Ok(None)
            }
        }
    }
}
