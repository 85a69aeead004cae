use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;

use crate::common::errors::Error;
use crate::common::UserProfile;

const USER_KEY_ATTRIBUTE: &str = "ID";

/// Read-only view of the users collection.
#[async_trait]
pub trait UserStore {
    /// Looks up one user record by identifier. `None` means no such record
    /// exists.
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, Error>;
}

#[derive(Clone)]
pub struct DynamoUserStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoUserStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl UserStore for DynamoUserStore {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, Error> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(USER_KEY_ATTRIBUTE, AttributeValue::S(user_id.into()))
            .send()
            .await
            .map_err(|err| Error::Store {
                user_id: user_id.into(),
                source: Box::new(err),
            })?;

        let item = match output.item {
            Some(item) => item,
            None => return Ok(None),
        };

        let profile = from_item(item).map_err(|err| Error::Store {
            user_id: user_id.into(),
            source: Box::new(err),
        })?;

        Ok(Some(profile))
    }
}
