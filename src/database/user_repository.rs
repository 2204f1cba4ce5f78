use crate::database::error::DatabaseError;
use crate::database::models::{NewUser, User};
use crate::database::pg_store::PgStore;
use crate::database::repository::{RepoResult, UserRepository};
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub balance: BigDecimal,
    pub level: String,
    pub total_deposits: BigDecimal,
    pub total_withdrawn: BigDecimal,
    pub referral_code: String,
    pub referred_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            balance: row.balance,
            level: row.level,
            total_deposits: row.total_deposits,
            total_withdrawn: row.total_withdrawn,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            created_at: row.created_at,
        }
    }
}

pub(crate) const USER_COLUMNS: &str = "id, username, balance, level, total_deposits, \
     total_withdrawn, referral_code, referred_by, created_at";

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        // The id is drawn first so the referral code can be written in the same insert.
        let sql = format!(
            "WITH next AS (SELECT nextval(pg_get_serial_sequence('users', 'id')) AS id) \
             INSERT INTO users (id, username, referral_code, referred_by) \
             SELECT id, $1, 'REF' || id, $2 FROM next \
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(user.referred_by)
            .fetch_one(&self.pool)
            .await
            .map(User::from)
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_user(&self, user_id: i64) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(User::from))
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_user_by_referral_code(&self, code: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE referral_code = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(User::from))
            .map_err(DatabaseError::from_sqlx)
    }

    async fn list_referrals(&self, user_id: i64) -> RepoResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE referred_by = $1 ORDER BY id",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(User::from).collect())
            .map_err(DatabaseError::from_sqlx)
    }
}
