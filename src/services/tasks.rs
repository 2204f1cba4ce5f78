use tracing::info;

use crate::database::models::{Task, UserTask};
use crate::database::repository::SharedStore;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError};

pub struct TaskService {
    store: SharedStore,
}

impl TaskService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list_tasks(&self) -> AppResult<Vec<Task>> {
        Ok(self.store.list_tasks().await?)
    }

    pub async fn start_task(&self, user_id: i64, task_id: i64) -> AppResult<UserTask> {
        if self.store.find_task(task_id).await?.is_none() {
            return Err(AppError::new(AppErrorKind::Domain(DomainError::TaskNotFound {
                task_id,
            })));
        }

        let user_task = self.store.start_user_task(user_id, task_id).await?;
        info!(user_id, task_id, user_task_id = user_task.id, "task started");
        Ok(user_task)
    }
}
