use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::{
    auth::{Role, TokenKeys},
    config::Settings,
    store::{MarketStore, NewUser, PgStore},
};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn MarketStore>,
    tokens: Arc<TokenKeys>,
    strict_bearer: bool,
}

impl AppState {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&settings.database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        Ok(Self::from_parts(
            Arc::new(PgStore::new(pool)),
            Arc::new(TokenKeys::new(
                &settings.jwt_secret,
                settings.token_ttl_hours,
            )),
            settings.strict_bearer,
        ))
    }

    pub fn from_parts(
        store: Arc<dyn MarketStore>,
        tokens: Arc<TokenKeys>,
        strict_bearer: bool,
    ) -> Self {
        Self {
            store,
            tokens,
            strict_bearer,
        }
    }

    /// Creates the configured admin account when no admin exists yet.
    pub async fn ensure_seed_admin(&self, settings: &Settings) -> Result<()> {
        let Some(seed) = settings.seed_admin.as_ref() else {
            return Ok(());
        };

        if self.store.has_admin().await? {
            return Ok(());
        }

        let password_hash = crate::web::auth::hash_password(&seed.password)
            .map_err(|err| anyhow!("failed to hash seed admin password: {err}"))?;

        let created = self
            .store
            .create_user(NewUser {
                name: "Administrator".to_string(),
                email: seed.email.clone(),
                password_hash,
                role: Role::Admin,
            })
            .await
            .context("failed to insert seed admin user")?;

        match created {
            Some(admin) => info!(email = %admin.email, "seeded admin user"),
            None => info!(email = %seed.email, "seed admin email already registered; skipping"),
        }

        Ok(())
    }

    pub fn store(&self) -> &dyn MarketStore {
        self.store.as_ref()
    }

    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }

    pub fn strict_bearer(&self) -> bool {
        self.strict_bearer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SeedAdmin, store::memory::MemoryStore};

    fn settings_with_seed() -> Settings {
        Settings {
            database_url: "postgres://unused".into(),
            port: 0,
            jwt_secret: "secret".into(),
            token_ttl_hours: 1,
            strict_bearer: false,
            seed_admin: Some(SeedAdmin {
                email: "admin@example.com".into(),
                password: "change-me".into(),
            }),
        }
    }

    #[tokio::test]
    async fn seeds_admin_once() {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::from_parts(store.clone(), Arc::new(TokenKeys::new("s", 1)), false);
        let settings = settings_with_seed();

        state.ensure_seed_admin(&settings).await.unwrap();
        state.ensure_seed_admin(&settings).await.unwrap();

        assert!(store.has_admin().await.unwrap());
        let creds = store
            .find_credentials("admin@example.com")
            .await
            .unwrap()
            .expect("seeded");
        assert!(crate::web::auth::verify_password("change-me", &creds.password_hash));
    }
}
