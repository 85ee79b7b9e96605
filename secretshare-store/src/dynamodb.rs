//! DynamoDB-backed item store

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue as SdkValue, BillingMode, KeySchemaElement, KeyType,
    ReturnValue, ScalarAttributeType, TableStatus, TimeToLiveSpecification,
};
use aws_sdk_dynamodb::Client;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::attribute::{AttributeValue, Item};
use crate::traits::{
    DeleteItemInput, ItemStore, KeyAttribute, KeySchema, Placeholders, PutItemInput, QueryInput,
    QueryOutput, ScalarType, StoreError,
};

/// How many times `ensure_table` polls for the table to become active
const TABLE_READY_ATTEMPTS: u32 = 30;

/// Store backed by a DynamoDB table
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
    schema: KeySchema,
}

impl DynamoDbStore {
    pub fn new(client: Client, table_name: impl Into<String>, schema: KeySchema) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            schema,
        }
    }

    /// Build a client from the default AWS credential chain. `endpoint_url`
    /// points the client at DynamoDB Local or another compatible endpoint.
    pub async fn connect(
        region: Option<&str>,
        endpoint_url: Option<&str>,
        table_name: impl Into<String>,
        schema: KeySchema,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(endpoint_url) = endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let config = loader.load().await;

        Self::new(Client::new(&config), table_name, schema)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table if it does not exist, wait for it to become active and
    /// enable TTL on `ttl_attribute`.
    pub async fn ensure_table(&self, ttl_attribute: Option<&str>) -> Result<(), StoreError> {
        let mut key_schema = vec![key_element(&self.schema.partition_key, KeyType::Hash)?];
        let mut definitions = vec![attribute_definition(&self.schema.partition_key)?];
        if let Some(sort_key) = &self.schema.sort_key {
            key_schema.push(key_element(sort_key, KeyType::Range)?);
            definitions.push(attribute_definition(sort_key)?);
        }

        let created = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(definitions))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match created {
            Ok(_) => info!(table = %self.table_name, "Created table"),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_resource_in_use_exception() {
                    debug!(table = %self.table_name, "Table already exists");
                } else {
                    return Err(backend_error(&err));
                }
            }
        }

        self.wait_for_active().await?;

        if let Some(attribute) = ttl_attribute {
            self.enable_ttl(attribute).await?;
        }

        Ok(())
    }

    async fn wait_for_active(&self) -> Result<(), StoreError> {
        for attempt in 1..=TABLE_READY_ATTEMPTS {
            let described = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(|e| backend_error(&e))?;

            let status = described.table().and_then(|t| t.table_status());
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }

            if attempt % 10 == 0 {
                warn!(attempt, table = %self.table_name, "Still waiting for table to become active");
            }
            sleep(Duration::from_millis(200)).await;
        }

        Err(StoreError::Backend(format!(
            "Table {} did not become active after {} attempts",
            self.table_name, TABLE_READY_ATTEMPTS
        )))
    }

    async fn enable_ttl(&self, attribute: &str) -> Result<(), StoreError> {
        let spec = TimeToLiveSpecification::builder()
            .attribute_name(attribute)
            .enabled(true)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let result = self
            .client
            .update_time_to_live()
            .table_name(&self.table_name)
            .time_to_live_specification(spec)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(table = %self.table_name, attribute, "Enabled TTL");
                Ok(())
            }
            Err(err) if err.message().is_some_and(|m| m.contains("already enabled")) => {
                debug!(table = %self.table_name, "TTL already enabled");
                Ok(())
            }
            Err(err) => Err(backend_error(&err)),
        }
    }
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    fn name(&self) -> &'static str {
        "dynamodb"
    }

    fn key_schema(&self) -> &KeySchema {
        &self.schema
    }

    async fn put_item(&self, input: PutItemInput) -> Result<(), StoreError> {
        let (names, values) = placeholders_to_sdk(&input.placeholders);

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_to_sdk(&input.item)))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_conditional_check_failed_exception() {
                    Err(StoreError::ConditionalCheckFailed)
                } else {
                    Err(backend_error(&err))
                }
            }
        }
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let (names, values) = placeholders_to_sdk(&input.placeholders);
        let mut output = QueryOutput::default();
        let mut start_key = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(&input.key_condition_expression)
                .set_filter_expression(input.filter_expression.clone())
                .set_expression_attribute_names(names.clone())
                .set_expression_attribute_values(values.clone())
                .consistent_read(input.consistent_read)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| backend_error(&e))?;

            for item in page.items() {
                output.items.push(item_from_sdk(item)?);
            }
            output.count += usize::try_from(page.count()).unwrap_or(0);
            output.scanned_count += usize::try_from(page.scanned_count()).unwrap_or(0);

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(output)
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError> {
        let (names, values) = placeholders_to_sdk(&input.placeholders);

        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(item_to_sdk(&input.key)))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .return_values(ReturnValue::AllOld)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes().map(item_from_sdk).transpose(),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_conditional_check_failed_exception() {
                    Err(StoreError::ConditionalCheckFailed)
                } else {
                    Err(backend_error(&err))
                }
            }
        }
    }
}

fn backend_error(err: &(dyn std::error::Error + 'static)) -> StoreError {
    StoreError::Backend(DisplayErrorContext(err).to_string())
}

fn key_element(attribute: &KeyAttribute, key_type: KeyType) -> Result<KeySchemaElement, StoreError> {
    KeySchemaElement::builder()
        .attribute_name(&attribute.name)
        .key_type(key_type)
        .build()
        .map_err(|e| StoreError::Backend(e.to_string()))
}

fn attribute_definition(attribute: &KeyAttribute) -> Result<AttributeDefinition, StoreError> {
    let attribute_type = match attribute.attribute_type {
        ScalarType::S => ScalarAttributeType::S,
        ScalarType::N => ScalarAttributeType::N,
        ScalarType::B => ScalarAttributeType::B,
    };

    AttributeDefinition::builder()
        .attribute_name(&attribute.name)
        .attribute_type(attribute_type)
        .build()
        .map_err(|e| StoreError::Backend(e.to_string()))
}

type SdkNames = Option<HashMap<String, String>>;
type SdkValues = Option<HashMap<String, SdkValue>>;

fn placeholders_to_sdk(placeholders: &Placeholders) -> (SdkNames, SdkValues) {
    let names = (!placeholders.names.is_empty()).then(|| placeholders.names.clone());
    let values = (!placeholders.values.is_empty()).then(|| {
        placeholders
            .values
            .iter()
            .map(|(k, v)| (k.clone(), value_to_sdk(v)))
            .collect()
    });
    (names, values)
}

fn item_to_sdk(item: &Item) -> HashMap<String, SdkValue> {
    item.iter()
        .map(|(k, v)| (k.clone(), value_to_sdk(v)))
        .collect()
}

fn item_from_sdk(item: &HashMap<String, SdkValue>) -> Result<Item, StoreError> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), value_from_sdk(v)?)))
        .collect()
}

fn value_to_sdk(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S { S } => SdkValue::S(S.clone()),
        AttributeValue::N { N } => SdkValue::N(N.clone()),
        // Undecodable base64 is stored as its raw bytes
        AttributeValue::B { B } => {
            SdkValue::B(Blob::new(BASE64.decode(B).unwrap_or_else(|_| B.clone().into_bytes())))
        }
        AttributeValue::BOOL { BOOL } => SdkValue::Bool(*BOOL),
        AttributeValue::NULL { NULL } => SdkValue::Null(*NULL),
        AttributeValue::L { L } => SdkValue::L(L.iter().map(value_to_sdk).collect()),
        AttributeValue::M { M } => SdkValue::M(
            M.iter()
                .map(|(k, v)| (k.clone(), value_to_sdk(v)))
                .collect(),
        ),
        AttributeValue::SS { SS } => SdkValue::Ss(SS.clone()),
        AttributeValue::NS { NS } => SdkValue::Ns(NS.clone()),
    }
}

fn value_from_sdk(value: &SdkValue) -> Result<AttributeValue, StoreError> {
    Ok(match value {
        SdkValue::S(s) => AttributeValue::S { S: s.clone() },
        SdkValue::N(n) => AttributeValue::N { N: n.clone() },
        SdkValue::B(b) => AttributeValue::B {
            B: BASE64.encode(b.as_ref()),
        },
        SdkValue::Bool(b) => AttributeValue::BOOL { BOOL: *b },
        SdkValue::Null(n) => AttributeValue::NULL { NULL: *n },
        SdkValue::L(list) => AttributeValue::L {
            L: list.iter().map(value_from_sdk).collect::<Result<_, _>>()?,
        },
        SdkValue::M(map) => AttributeValue::M {
            M: item_from_sdk(map)?,
        },
        SdkValue::Ss(ss) => AttributeValue::SS { SS: ss.clone() },
        SdkValue::Ns(ns) => AttributeValue::NS { NS: ns.clone() },
        other => {
            return Err(StoreError::Serialization(format!(
                "Unsupported attribute value: {:?}",
                other
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversion() {
        let original = AttributeValue::number(1_700_000_000);
        let sdk = value_to_sdk(&original);
        assert_eq!(sdk, SdkValue::N("1700000000".to_string()));
        assert_eq!(value_from_sdk(&sdk).unwrap(), original);
    }

    #[test]
    fn test_binary_goes_through_base64() {
        let sdk = SdkValue::B(Blob::new(vec![0u8, 1, 2, 255]));
        let value = value_from_sdk(&sdk).unwrap();
        assert_eq!(value, AttributeValue::B { B: "AAEC/w==".to_string() });
        assert_eq!(value_to_sdk(&value), sdk);
    }

    #[test]
    fn test_nested_item_conversion() {
        let item: Item = serde_json::from_value(serde_json::json!({
            "SecretID": {"S": "abc"},
            "tags": {"SS": ["a", "b"]},
            "meta": {"M": {"read": {"BOOL": false}, "none": {"NULL": true}}},
            "list": {"L": [{"N": "1"}, {"S": "x"}]}
        }))
        .unwrap();

        let sdk = item_to_sdk(&item);
        assert_eq!(sdk.get("SecretID"), Some(&SdkValue::S("abc".to_string())));
        assert_eq!(item_from_sdk(&sdk).unwrap(), item);
    }

    #[test]
    fn test_placeholders_omitted_when_empty() {
        let (names, values) = placeholders_to_sdk(&Placeholders::default());
        assert!(names.is_none());
        assert!(values.is_none());
    }

    #[test]
    fn test_binary_set_is_unsupported() {
        let sdk = SdkValue::Bs(vec![Blob::new(vec![1u8])]);
        assert!(matches!(
            value_from_sdk(&sdk),
            Err(StoreError::Serialization(_))
        ));
    }
}
