use tracing::info;

use crate::database::models::{NewUser, User};
use crate::database::repository::SharedStore;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError, ValidationError};

const MAX_USERNAME_LEN: usize = 64;

pub struct UserService {
    store: SharedStore,
}

impl UserService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Register a user, optionally attached to the owner of `referral_code`.
    pub async fn register(&self, username: &str, referral_code: Option<&str>) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::MissingField {
                    field: "username".to_string(),
                },
            )));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::validation(
                "username",
                format!("must be at most {} characters", MAX_USERNAME_LEN),
            ));
        }

        let referred_by = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => match self.store.find_user_by_referral_code(code).await? {
                Some(referrer) => Some(referrer.id),
                None => {
                    return Err(AppError::new(AppErrorKind::Validation(
                        ValidationError::InvalidReferralCode {
                            code: code.to_string(),
                        },
                    )))
                }
            },
            None => None,
        };

        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                referred_by,
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    AppError::new(AppErrorKind::Domain(DomainError::UsernameTaken {
                        username: username.to_string(),
                    }))
                } else {
                    e.into()
                }
            })?;

        info!(user_id = user.id, referred_by = ?user.referred_by, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::new(AppErrorKind::Domain(DomainError::UserNotFound { user_id })))
    }
}
