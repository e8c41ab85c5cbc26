use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::resource::{CreateResourceRequest, ExternalResource},
    services::store::Store,
};

/// 外部学习资源库（书籍、文章、视频）
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn Store>,
}

impl ResourceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<ExternalResource>> {
        self.store.list_resources().await
    }

    pub async fn create(&self, request: CreateResourceRequest) -> Result<ExternalResource> {
        request.validate()?;
        let resource = ExternalResource {
            id: Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description,
            url: request.url,
            resource_type: request.resource_type,
        };
        let resource = self.store.insert_resource(&resource).await?;
        info!("Added resource {} ({:?})", resource.id, resource.resource_type);
        Ok(resource)
    }

    pub async fn delete(&self, resource_id: &str) -> Result<()> {
        if !self.store.delete_resource(resource_id).await? {
            return Err(AppError::not_found("Resource"));
        }
        info!("Deleted resource {}", resource_id);
        Ok(())
    }
}
