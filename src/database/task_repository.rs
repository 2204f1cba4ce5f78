use crate::database::error::DatabaseError;
use crate::database::models::{Task, UserTask};
use crate::database::pg_store::PgStore;
use crate::database::repository::{RepoResult, TaskRepository};
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: String,
    investment_required: BigDecimal,
    reward: BigDecimal,
    duration_minutes: i32,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            description: row.description,
            investment_required: row.investment_required,
            reward: row.reward,
            duration_minutes: row.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct UserTaskRow {
    id: i64,
    user_id: i64,
    task_id: i64,
    status: String,
    started_at: chrono::DateTime<chrono::Utc>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<UserTaskRow> for UserTask {
    type Error = DatabaseError;

    fn try_from(row: UserTaskRow) -> Result<Self, Self::Error> {
        Ok(UserTask {
            id: row.id,
            user_id: row.user_id,
            task_id: row.task_id,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        sqlx::query_as::<_, TaskRow>(
            "SELECT id, title, description, investment_required, reward, duration_minutes
             FROM tasks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Task::from).collect())
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_task(&self, task_id: i64) -> RepoResult<Option<Task>> {
        sqlx::query_as::<_, TaskRow>(
            "SELECT id, title, description, investment_required, reward, duration_minutes
             FROM tasks WHERE id = $1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(Task::from))
        .map_err(DatabaseError::from_sqlx)
    }

    async fn start_user_task(&self, user_id: i64, task_id: i64) -> RepoResult<UserTask> {
        let row = sqlx::query_as::<_, UserTaskRow>(
            "INSERT INTO user_tasks (user_id, task_id, status)
             VALUES ($1, $2, 'pending')
             RETURNING id, user_id, task_id, status, started_at, completed_at",
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        row.try_into()
    }
}
