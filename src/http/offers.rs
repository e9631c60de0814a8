//! Offer (provisioned throughput) operations. Thin wrappers over the
//! request layer; the transaction core does not depend on these.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::client::Client;
use crate::http::documents::Resource;
use crate::http::links::offer_link;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Offer {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(rename = "offerVersion", default)]
    pub offer_version: String,
    #[serde(rename = "offerType", default)]
    pub offer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<OfferThroughputContent>,
    #[serde(rename = "offerResourceId", default)]
    pub offer_resource_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferThroughputContent {
    #[serde(rename = "offerThroughput")]
    pub offer_throughput: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Offers {
    #[serde(rename = "_rid", default)]
    pub rid: String,
    #[serde(rename = "_count", default)]
    pub count: i32,
    #[serde(rename = "Offers", default)]
    pub offers: Vec<Offer>,
}

/// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/replace-an-offer>.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaceOfferOptions {
    #[serde(rename = "offerVersion")]
    pub offer_version: String,
    #[serde(rename = "offerType", skip_serializing_if = "String::is_empty")]
    pub offer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<OfferThroughputContent>,
    /// Self link of the resource the offer applies to.
    #[serde(rename = "resource")]
    pub resource_self_link: String,
    #[serde(rename = "offerResourceId")]
    pub offer_resource_id: String,
    pub id: String,
    #[serde(rename = "_rid")]
    pub rid: String,
}

impl Client {
    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/get-an-offer>.
    pub async fn get_offer(
        &self,
        offer_id: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Offer, Error> {
        let response = self
            .call(Method::GET, &offer_link(offer_id), None, Default::default(), cancel)
            .await?;
        response.check()?;
        response.json()
    }

    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/list-offers>.
    pub async fn list_offers(&self, cancel: Option<CancellationToken>) -> Result<Offers, Error> {
        let response = self
            .call(Method::GET, &offer_link(""), None, Default::default(), cancel)
            .await?;
        response.check()?;
        response.json()
    }

    /// See <https://docs.microsoft.com/en-us/rest/api/cosmos-db/replace-an-offer>.
    pub async fn replace_offer(
        &self,
        options: &ReplaceOfferOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<Offer, Error> {
        let body = serde_json::to_vec(options)?;
        let response = self
            .call(
                Method::PUT,
                &offer_link(&options.rid),
                Some(body),
                Default::default(),
                cancel,
            )
            .await?;
        response.check()?;
        response.json()
    }
}
