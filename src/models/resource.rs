use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::serde_helpers::record_key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalResource {
    #[serde(with = "record_key")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Book,
    Article,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(url)]
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}
