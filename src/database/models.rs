//! Persistent entities shared by every store backend.

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_USER_LEVEL: &str = "Bronze";

/// Referral codes are derived from the user id.
pub fn referral_code_for(user_id: i64) -> String {
    format!("REF{}", user_id)
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DatabaseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(DatabaseError::new(DatabaseErrorKind::Unknown {
                        message: format!("invalid {} value: {}", stringify!($name), other),
                    })),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TaskReward,
    ReferralBonus,
}

string_enum!(TransactionType {
    Deposit => "deposit",
    Withdrawal => "withdrawal",
    TaskReward => "task_reward",
    ReferralBonus => "referral_bonus",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

string_enum!(TransactionStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

string_enum!(WithdrawalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserTaskStatus {
    Pending,
    Completed,
}

string_enum!(UserTaskStatus {
    Pending => "pending",
    Completed => "completed",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub balance: BigDecimal,
    pub level: String,
    pub total_deposits: BigDecimal,
    pub total_withdrawn: BigDecimal,
    pub referral_code: String,
    pub referred_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub referred_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub investment_required: BigDecimal,
    pub reward: BigDecimal,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTask {
    pub id: i64,
    pub user_id: i64,
    pub task_id: i64,
    pub status: UserTaskStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub kind: TransactionType,
    pub amount: BigDecimal,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalRequest {
    pub id: i64,
    pub user_id: i64,
    pub amount: BigDecimal,
    pub withdrawal_address: String,
    pub status: WithdrawalStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawalRequest {
    pub user_id: i64,
    pub amount: BigDecimal,
    pub withdrawal_address: String,
}

/// Admin verdict on a pending withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawalDecision {
    pub approve: bool,
    pub admin_notes: Option<String>,
}

/// Result of applying a [`WithdrawalDecision`] atomically.
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalOutcome {
    Processed(WithdrawalRequest),
    NotFound,
    AlreadyProcessed(WithdrawalStatus),
    /// Approval refused because the balance no longer covers the amount
    InsufficientBalance {
        available: BigDecimal,
        required: BigDecimal,
    },
}

/// Order → user mapping recorded when a deposit order is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOrderRecord {
    pub order_id: String,
    pub user_id: i64,
    pub transaction_id: Option<i64>,
    pub amount: BigDecimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentOrder {
    pub order_id: String,
    pub user_id: i64,
    pub transaction_id: Option<i64>,
    pub amount: BigDecimal,
    pub currency: String,
}

/// A verified deposit to apply to the ledger.
#[derive(Debug, Clone)]
pub struct DepositCredit {
    pub order_id: String,
    pub user_id: i64,
    pub amount: BigDecimal,
    pub transaction_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreditOutcome {
    Credited {
        user_id: i64,
        new_balance: BigDecimal,
        new_total_deposits: BigDecimal,
    },
    /// The order id was already recorded as processed; nothing changed.
    AlreadyProcessed,
    UnknownUser,
}
