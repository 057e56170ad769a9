//! Resource metadata persistence
//!

use std::time::Duration;

use chrono::Utc;
use portal_shared::error::PortalError;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection,
    EntityTrait, QueryOrder,
};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{entity::resource, migration::Migrator};

pub const MEMORY_DB_URL: &str = "sqlite::memory:";
pub const NOT_FOUND_MESSAGE: &str = "Resource not found.";

/// Open the database at `db_url` and bring the schema up to date.
pub async fn start_db(db_url: &str) -> Result<DatabaseConnection, PortalError> {
    debug!("Opening Database: {db_url}");

    let mut options = ConnectOptions::new(db_url);
    options
        .sqlx_logging_level(log::LevelFilter::Trace)
        .sqlx_slow_statements_logging_settings(log::LevelFilter::Warn, Duration::from_millis(500));
    // every pooled connection to an in-memory sqlite db gets its own empty db
    if db_url.contains(":memory:") || db_url.contains("mode=memory") {
        options.max_connections(1).min_connections(1);
    }

    let conn = Database::connect(options).await.map_err(|err| {
        error!("Failed to connect to {}: {:?}", db_url, err);
        PortalError::StorageError(format!("connection failed: {err}"))
    })?;

    Migrator::up(&conn, None).await.map_err(|err| {
        error!("Failed to run migrations: {:?}", err);
        PortalError::StorageError(format!("migration failed: {err}"))
    })?;

    Ok(conn)
}

/// The persistent set of [resource::Model] records
#[derive(Clone, Debug)]
pub struct ResourceStore {
    conn: DatabaseConnection,
}

impl ResourceStore {
    pub async fn connect(db_url: &str) -> Result<Self, PortalError> {
        Ok(Self::from_connection(start_db(db_url).await?))
    }

    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// All resources, newest upload first.
    pub async fn list(&self) -> Result<Vec<resource::Model>, PortalError> {
        resource::Entity::find()
            .order_by_desc(resource::Column::UploadDate)
            .all(&self.conn)
            .await
            .inspect_err(|err| error!("Failed to list resources: {:?}", err))
            .map_err(PortalError::from)
    }

    pub async fn create(
        &self,
        title: &str,
        filename: &str,
        mime_type: &str,
    ) -> Result<resource::Model, PortalError> {
        let new_resource = resource::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            filename: Set(filename.to_string()),
            mime_type: Set(mime_type.to_string()),
            upload_date: Set(Utc::now()),
        };

        let saved = new_resource
            .insert(&self.conn)
            .await
            .inspect_err(|err| error!("Failed to save resource: {:?}", err))?;
        debug!("Created resource {} ({})", saved.id, saved.filename);
        Ok(saved)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<resource::Model, PortalError> {
        resource::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .inspect_err(|err| error!("Failed to get resource {}: {:?}", id, err))?
            .ok_or_else(|| {
                debug!("Resource {} not found", id);
                PortalError::NotFound(NOT_FOUND_MESSAGE.to_string())
            })
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), PortalError> {
        let res = resource::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .inspect_err(|err| error!("Failed to delete resource {}: {:?}", id, err))?;

        if res.rows_affected == 0 {
            debug!("Resource {} not found for deletion", id);
            return Err(PortalError::NotFound(NOT_FOUND_MESSAGE.to_string()));
        }
        debug!("Deleted resource {}", id);
        Ok(())
    }
}
