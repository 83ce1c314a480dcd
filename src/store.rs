use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    applications::{ApplicationStatus, SellerApplication, SellerApplicationDraft},
    auth::{Credentials, Principal, Role},
};

/// Account fields needed to create a user.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Persistence seam for principals and seller applications.
///
/// Everything here is read-mostly; implementations must be shareable across
/// requests.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Principal view of a user. Never includes the password hash.
    async fn find_principal(&self, id: Uuid) -> Result<Option<Principal>>;

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>>;

    /// Returns `None` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<Option<Principal>>;

    async fn has_admin(&self) -> Result<bool>;

    /// Stores a pending application. Returns `None` when the user already has
    /// one pending.
    async fn insert_application(
        &self,
        user_id: Uuid,
        details: &SellerApplicationDraft,
    ) -> Result<Option<SellerApplication>>;

    async fn applications_for(&self, user_id: Uuid) -> Result<Vec<SellerApplication>>;

    async fn list_applications(&self) -> Result<Vec<SellerApplication>>;
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Principal {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| anyhow!("user {} has unknown role {:?}", row.id, row.role))?;
        Ok(Principal {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    id: Uuid,
    password_hash: String,
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    user_id: Uuid,
    business_name: String,
    business_type: String,
    description: String,
    address: String,
    city: String,
    state: String,
    pincode: String,
    gst_number: String,
    bank_account: String,
    ifsc_code: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for SellerApplication {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        let status = ApplicationStatus::parse(&row.status).ok_or_else(|| {
            anyhow!("application {} has unknown status {:?}", row.id, row.status)
        })?;
        Ok(SellerApplication {
            id: row.id,
            user_id: row.user_id,
            details: SellerApplicationDraft {
                business_name: row.business_name,
                business_type: row.business_type,
                description: row.description,
                address: row.address,
                city: row.city,
                state: row.state,
                pincode: row.pincode,
                gst_number: row.gst_number,
                bank_account: row.bank_account,
                ifsc_code: row.ifsc_code,
            },
            status,
            created_at: row.created_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

const APPLICATION_COLUMNS: &str = "id, user_id, business_name, business_type, description, address, city, state, pincode, gst_number, bank_account, ifsc_code, status, created_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn find_principal(&self, id: Uuid) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch user by id")?;

        row.map(Principal::try_from).transpose()
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            "SELECT id, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch user credentials")?;

        Ok(row.map(|row| Credentials {
            id: row.id,
            password_hash: row.password_hash,
        }))
    }

    async fn create_user(&self, user: NewUser) -> Result<Option<Principal>> {
        let result = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, email, role, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Principal::try_from(row).map(Some),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn has_admin(&self) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await
            .context("failed to verify admin presence")
    }

    async fn insert_application(
        &self,
        user_id: Uuid,
        details: &SellerApplicationDraft,
    ) -> Result<Option<SellerApplication>> {
        let result = sqlx::query_as::<_, ApplicationRow>(&format!(
            "INSERT INTO seller_applications
                 (id, user_id, business_name, business_type, description, address, city, state,
                  pincode, gst_number, bank_account, ifsc_code, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&details.business_name)
        .bind(&details.business_type)
        .bind(&details.description)
        .bind(&details.address)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.pincode)
        .bind(&details.gst_number)
        .bind(&details.bank_account)
        .bind(&details.ifsc_code)
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => SellerApplication::try_from(row).map(Some),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("failed to insert seller application"),
        }
    }

    async fn applications_for(&self, user_id: Uuid) -> Result<Vec<SellerApplication>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM seller_applications
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load seller applications for user")?;

        rows.into_iter().map(SellerApplication::try_from).collect()
    }

    async fn list_applications(&self) -> Result<Vec<SellerApplication>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM seller_applications ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to load seller applications")?;

        rows.into_iter().map(SellerApplication::try_from).collect()
    }
}
