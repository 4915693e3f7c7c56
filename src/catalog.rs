//! The managed entity catalogue and its stores.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::entity::{Host, OAuthClient, Tenant, User};
use crate::store::{SqliteVersionedStore, StoreContext, StoreError, VersionedStore};

/// One store per managed entity.
#[derive(Clone)]
pub struct Stores {
    pub tenants: Arc<dyn VersionedStore<Tenant>>,
    pub hosts: Arc<dyn VersionedStore<Host>>,
    pub oauth_clients: Arc<dyn VersionedStore<OAuthClient>>,
    pub users: Arc<dyn VersionedStore<User>>,
}

impl Stores {
    /// SQLite stores over one pool, with every table created.
    pub async fn sqlite(pool: SqlitePool, context: &StoreContext) -> Result<Self, StoreError> {
        let tenants = SqliteVersionedStore::<Tenant>::new(pool.clone(), context.clone());
        let hosts = SqliteVersionedStore::<Host>::new(pool.clone(), context.clone());
        let oauth_clients = SqliteVersionedStore::<OAuthClient>::new(pool.clone(), context.clone());
        let users = SqliteVersionedStore::<User>::new(pool, context.clone());

        tenants.init_schema().await?;
        hosts.init_schema().await?;
        oauth_clients.init_schema().await?;
        users.init_schema().await?;
        info!(namespace = %context.namespace, "entity tables ready");

        Ok(Self {
            tenants: Arc::new(tenants),
            hosts: Arc::new(hosts),
            oauth_clients: Arc::new(oauth_clients),
            users: Arc::new(users),
        })
    }
}
