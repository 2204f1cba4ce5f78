//! Storage seams. Every backend implements the full set; services depend on [`Store`].

use crate::database::error::DatabaseError;
use crate::database::models::{
    CreditOutcome, DepositCredit, NewPaymentOrder, NewTransaction, NewUser, NewWithdrawalRequest,
    PaymentOrderRecord, Task, Transaction, TransactionStatus, User, UserTask, WithdrawalDecision,
    WithdrawalOutcome, WithdrawalRequest,
};
use async_trait::async_trait;
use std::sync::Arc;

pub type RepoResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user with a zero balance; the referral code is derived from the new id.
    /// A taken username surfaces as a unique violation.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    async fn find_user(&self, user_id: i64) -> RepoResult<Option<User>>;

    async fn find_user_by_referral_code(&self, code: &str) -> RepoResult<Option<User>>;

    /// Users whose `referred_by` is `user_id`.
    async fn list_referrals(&self, user_id: i64) -> RepoResult<Vec<User>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list_tasks(&self) -> RepoResult<Vec<Task>>;

    async fn find_task(&self, task_id: i64) -> RepoResult<Option<Task>>;

    async fn start_user_task(&self, user_id: i64, task_id: i64) -> RepoResult<UserTask>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create_transaction(&self, tx: NewTransaction) -> RepoResult<Transaction>;

    /// Newest first.
    async fn list_transactions(&self, user_id: i64) -> RepoResult<Vec<Transaction>>;

    async fn update_transaction_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> RepoResult<Option<Transaction>>;
}

#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    async fn create_withdrawal_request(
        &self,
        request: NewWithdrawalRequest,
    ) -> RepoResult<WithdrawalRequest>;

    /// Newest first.
    async fn list_withdrawal_requests(&self, user_id: i64) -> RepoResult<Vec<WithdrawalRequest>>;

    /// Every user's requests, newest first.
    async fn list_all_withdrawal_requests(&self) -> RepoResult<Vec<WithdrawalRequest>>;

    /// Apply an admin decision. Approval debits the balance, adds to
    /// `total_withdrawn` and records a completed withdrawal transaction,
    /// all or nothing.
    async fn process_withdrawal(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> RepoResult<WithdrawalOutcome>;
}

#[async_trait]
pub trait PaymentOrderRepository: Send + Sync {
    async fn record_payment_order(&self, order: NewPaymentOrder)
        -> RepoResult<PaymentOrderRecord>;

    async fn find_payment_order(&self, order_id: &str) -> RepoResult<Option<PaymentOrderRecord>>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Credit a deposit exactly once per order id.
    ///
    /// The processed-order marker and the balance increment commit together;
    /// a second call for the same order id returns [`CreditOutcome::AlreadyProcessed`].
    async fn credit_deposit(&self, credit: DepositCredit) -> RepoResult<CreditOutcome>;

    async fn is_order_processed(&self, order_id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Everything a service may need from storage.
pub trait Store:
    UserRepository
    + TaskRepository
    + TransactionRepository
    + WithdrawalRepository
    + PaymentOrderRepository
    + LedgerRepository
    + StoreHealth
{
}

impl<T> Store for T where
    T: UserRepository
        + TaskRepository
        + TransactionRepository
        + WithdrawalRepository
        + PaymentOrderRepository
        + LedgerRepository
        + StoreHealth
{
}

pub type SharedStore = Arc<dyn Store>;
