//! Trigger CRUD. Thin wrappers over the request layer; the transaction core
//! does not depend on these.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::client::Client;
use crate::http::documents::Resource;
use crate::http::links::{trigger_link, triggers_link};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "triggerOperation", default)]
    pub trigger_operation: String,
    #[serde(rename = "triggerType", default)]
    pub trigger_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Triggers {
    #[serde(rename = "_rid", default)]
    pub rid: String,
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "Triggers", default)]
    pub triggers: Vec<Trigger>,
}

#[derive(Serialize)]
struct TriggerBody<'a> {
    id: &'a str,
    body: &'a str,
    #[serde(rename = "triggerOperation")]
    trigger_operation: &'a str,
    #[serde(rename = "triggerType")]
    trigger_type: &'a str,
}

impl Client {
    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/create-a-trigger>.
    pub async fn create_trigger(
        &self,
        db_name: &str,
        coll_name: &str,
        trigger: &Trigger,
        cancel: Option<CancellationToken>,
    ) -> Result<Trigger, Error> {
        let body = serde_json::to_vec(&TriggerBody {
            id: &trigger.resource.id,
            body: &trigger.body,
            trigger_operation: &trigger.trigger_operation,
            trigger_type: &trigger.trigger_type,
        })?;
        let response = self
            .call(
                Method::POST,
                &triggers_link(db_name, coll_name),
                Some(body),
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/replace-a-trigger>.
    pub async fn replace_trigger(
        &self,
        db_name: &str,
        coll_name: &str,
        trigger: &Trigger,
        cancel: Option<CancellationToken>,
    ) -> Result<Trigger, Error> {
        let body = serde_json::to_vec(&TriggerBody {
            id: &trigger.resource.id,
            body: &trigger.body,
            trigger_operation: &trigger.trigger_operation,
            trigger_type: &trigger.trigger_type,
        })?;
        let response = self
            .call(
                Method::PUT,
                &trigger_link(db_name, coll_name, &trigger.resource.id),
                Some(body),
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }

    pub async fn delete_trigger(
        &self,
        db_name: &str,
        coll_name: &str,
        trigger_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let response = self
            .call(
                Method::DELETE,
                &trigger_link(db_name, coll_name, trigger_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()
    }

    pub async fn list_triggers(
        &self,
        db_name: &str,
        coll_name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Triggers, Error> {
        let response = self
            .call(
                Method::GET,
                &triggers_link(db_name, coll_name),
                None,
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }
}
