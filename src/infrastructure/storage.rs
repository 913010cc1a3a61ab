use crate::config::AppConfig;
use crate::services::storage::{LocalStorageService, StorageService};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Arc<LocalStorageService>> {
    info!(
        "📁 Local Storage: uploads={} processed={}",
        config.upload_dir.display(),
        config.processed_dir.display()
    );

    let storage = LocalStorageService::new(&config.upload_dir, &config.processed_dir);
    storage.ensure_dirs().await?;

    Ok(Arc::new(storage))
}
