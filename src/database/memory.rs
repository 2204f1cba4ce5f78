//! In-process store for local runs and tests.
//!
//! All state sits behind one `RwLock`; every mutation that touches more than
//! one collection happens under a single write guard, so it is atomic with
//! respect to other requests.

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::models::{
    referral_code_for, CreditOutcome, DepositCredit, NewPaymentOrder, NewTransaction, NewUser,
    NewWithdrawalRequest, PaymentOrderRecord, Task, Transaction, TransactionStatus,
    TransactionType, User, UserTask, UserTaskStatus, WithdrawalDecision, WithdrawalOutcome,
    WithdrawalRequest, WithdrawalStatus, DEFAULT_USER_LEVEL,
};
use crate::database::repository::{
    LedgerRepository, PaymentOrderRepository, RepoResult, StoreHealth, TaskRepository,
    TransactionRepository, UserRepository, WithdrawalRepository,
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    user_tasks: BTreeMap<i64, UserTask>,
    transactions: BTreeMap<i64, Transaction>,
    withdrawals: BTreeMap<i64, WithdrawalRequest>,
    payment_orders: HashMap<String, PaymentOrderRecord>,
    processed_orders: HashSet<String>,
    next_user_id: i64,
    next_task_id: i64,
    next_user_task_id: i64,
    next_transaction_id: i64,
    next_withdrawal_id: i64,
}

impl MemoryState {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn insert_transaction(&mut self, tx: NewTransaction) -> Transaction {
        let id = Self::next_id(&mut self.next_transaction_id);
        let transaction = Transaction {
            id,
            user_id: tx.user_id,
            kind: tx.kind,
            amount: tx.amount,
            status: tx.status,
            created_at: Utc::now(),
        };
        self.transactions.insert(id, transaction.clone());
        transaction
    }
}

pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store seeded with the default task catalogue.
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        for (title, description, investment, reward, minutes) in [
            ("Basic Survey", "Complete a simple market research survey", 10, 12, 5),
            (
                "Product Review",
                "Write a detailed product review",
                50,
                65,
                15,
            ),
        ] {
            let id = MemoryState::next_id(&mut state.next_task_id);
            state.tasks.insert(
                id,
                Task {
                    id,
                    title: title.to_string(),
                    description: description.to_string(),
                    investment_required: BigDecimal::from(investment),
                    reward: BigDecimal::from(reward),
                    duration_minutes: minutes,
                },
            );
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Overwrite a user's balance. Test and fixture helper.
    pub async fn set_balance(&self, user_id: i64, balance: BigDecimal) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::not_found("User", user_id))?;
        user.balance = balance;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.username == new_user.username)
        {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation {
                constraint: "users_username_key".to_string(),
            }));
        }
        if let Some(referrer) = new_user.referred_by {
            if !state.users.contains_key(&referrer) {
                return Err(DatabaseError::new(DatabaseErrorKind::ForeignKeyViolation {
                    message: format!("referrer {} does not exist", referrer),
                }));
            }
        }

        let id = MemoryState::next_id(&mut state.next_user_id);
        let user = User {
            id,
            username: new_user.username,
            balance: BigDecimal::from(0),
            level: DEFAULT_USER_LEVEL.to_string(),
            total_deposits: BigDecimal::from(0),
            total_withdrawn: BigDecimal::from(0),
            referral_code: referral_code_for(id),
            referred_by: new_user.referred_by,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: i64) -> RepoResult<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_referral_code(&self, code: &str) -> RepoResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn list_referrals(&self, user_id: i64) -> RepoResult<Vec<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|u| u.referred_by == Some(user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        Ok(self.state.read().await.tasks.values().cloned().collect())
    }

    async fn find_task(&self, task_id: i64) -> RepoResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&task_id).cloned())
    }

    async fn start_user_task(&self, user_id: i64, task_id: i64) -> RepoResult<UserTask> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&task_id) {
            return Err(DatabaseError::not_found("Task", task_id));
        }
        let id = MemoryState::next_id(&mut state.next_user_task_id);
        let user_task = UserTask {
            id,
            user_id,
            task_id,
            status: UserTaskStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
        };
        state.user_tasks.insert(id, user_task.clone());
        Ok(user_task)
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn create_transaction(&self, tx: NewTransaction) -> RepoResult<Transaction> {
        Ok(self.state.write().await.insert_transaction(tx))
    }

    async fn list_transactions(&self, user_id: i64) -> RepoResult<Vec<Transaction>> {
        // Ids grow monotonically, so reverse id order is newest first.
        Ok(self
            .state
            .read()
            .await
            .transactions
            .values()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_transaction_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> RepoResult<Option<Transaction>> {
        let mut state = self.state.write().await;
        Ok(state.transactions.get_mut(&transaction_id).map(|tx| {
            tx.status = status;
            tx.clone()
        }))
    }
}

#[async_trait]
impl WithdrawalRepository for MemoryStore {
    async fn create_withdrawal_request(
        &self,
        request: NewWithdrawalRequest,
    ) -> RepoResult<WithdrawalRequest> {
        let mut state = self.state.write().await;
        let id = MemoryState::next_id(&mut state.next_withdrawal_id);
        let withdrawal = WithdrawalRequest {
            id,
            user_id: request.user_id,
            amount: request.amount,
            withdrawal_address: request.withdrawal_address,
            status: WithdrawalStatus::Pending,
            admin_notes: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        state.withdrawals.insert(id, withdrawal.clone());
        Ok(withdrawal)
    }

    async fn list_withdrawal_requests(&self, user_id: i64) -> RepoResult<Vec<WithdrawalRequest>> {
        Ok(self
            .state
            .read()
            .await
            .withdrawals
            .values()
            .rev()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all_withdrawal_requests(&self) -> RepoResult<Vec<WithdrawalRequest>> {
        Ok(self
            .state
            .read()
            .await
            .withdrawals
            .values()
            .rev()
            .cloned()
            .collect())
    }

    async fn process_withdrawal(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> RepoResult<WithdrawalOutcome> {
        let mut state = self.state.write().await;

        let (user_id, amount) = match state.withdrawals.get(&withdrawal_id) {
            None => return Ok(WithdrawalOutcome::NotFound),
            Some(w) if w.status != WithdrawalStatus::Pending => {
                return Ok(WithdrawalOutcome::AlreadyProcessed(w.status))
            }
            Some(w) => (w.user_id, w.amount.clone()),
        };

        if decision.approve {
            let user = state
                .users
                .get_mut(&user_id)
                .ok_or_else(|| DatabaseError::not_found("User", user_id))?;
            if user.balance < amount {
                return Ok(WithdrawalOutcome::InsufficientBalance {
                    available: user.balance.clone(),
                    required: amount,
                });
            }
            user.balance -= &amount;
            user.total_withdrawn += &amount;

            state.insert_transaction(NewTransaction {
                user_id,
                kind: TransactionType::Withdrawal,
                amount,
                status: TransactionStatus::Completed,
            });
        }

        let withdrawal = state
            .withdrawals
            .get_mut(&withdrawal_id)
            .ok_or_else(|| DatabaseError::not_found("WithdrawalRequest", withdrawal_id))?;
        withdrawal.status = if decision.approve {
            WithdrawalStatus::Approved
        } else {
            WithdrawalStatus::Rejected
        };
        withdrawal.admin_notes = decision.admin_notes;
        withdrawal.processed_at = Some(Utc::now());

        Ok(WithdrawalOutcome::Processed(withdrawal.clone()))
    }
}

#[async_trait]
impl PaymentOrderRepository for MemoryStore {
    async fn record_payment_order(
        &self,
        order: NewPaymentOrder,
    ) -> RepoResult<PaymentOrderRecord> {
        let mut state = self.state.write().await;
        if state.payment_orders.contains_key(&order.order_id) {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation {
                constraint: "payment_orders_pkey".to_string(),
            }));
        }
        let record = PaymentOrderRecord {
            order_id: order.order_id,
            user_id: order.user_id,
            transaction_id: order.transaction_id,
            amount: order.amount,
            currency: order.currency,
            created_at: Utc::now(),
        };
        state
            .payment_orders
            .insert(record.order_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_payment_order(&self, order_id: &str) -> RepoResult<Option<PaymentOrderRecord>> {
        Ok(self.state.read().await.payment_orders.get(order_id).cloned())
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn credit_deposit(&self, credit: DepositCredit) -> RepoResult<CreditOutcome> {
        let mut state = self.state.write().await;

        if state.processed_orders.contains(&credit.order_id) {
            return Ok(CreditOutcome::AlreadyProcessed);
        }

        let Some(user) = state.users.get_mut(&credit.user_id) else {
            return Ok(CreditOutcome::UnknownUser);
        };
        user.balance += &credit.amount;
        user.total_deposits += &credit.amount;
        let outcome = CreditOutcome::Credited {
            user_id: user.id,
            new_balance: user.balance.clone(),
            new_total_deposits: user.total_deposits.clone(),
        };

        state.processed_orders.insert(credit.order_id);
        if let Some(tx) = credit
            .transaction_id
            .and_then(|id| state.transactions.get_mut(&id))
        {
            tx.status = TransactionStatus::Completed;
        }

        Ok(outcome)
    }

    async fn is_order_processed(&self, order_id: &str) -> RepoResult<bool> {
        Ok(self.state.read().await.processed_orders.contains(order_id))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Arc;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                referred_by: None,
            })
            .await
            .unwrap();
        (store, user)
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn new_users_get_defaults() {
        let (_, user) = store_with_user().await;
        assert_eq!(user.balance, BigDecimal::from(0));
        assert_eq!(user.level, "Bronze");
        assert_eq!(user.referral_code, format!("REF{}", user.id));
    }

    #[tokio::test]
    async fn duplicate_username_is_unique_violation() {
        let (store, _) = store_with_user().await;
        let err = store
            .create_user(NewUser {
                username: "alice".to_string(),
                referred_by: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn seeded_tasks_are_listed() {
        let store = MemoryStore::new();
        let tasks = store.list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Basic Survey");
        assert_eq!(tasks[1].reward, BigDecimal::from(65));
    }

    #[tokio::test]
    async fn credit_is_applied_once_per_order() {
        let (store, user) = store_with_user().await;
        let credit = DepositCredit {
            order_id: "1_1_aaaaaaaa".to_string(),
            user_id: user.id,
            amount: dec("25.00"),
            transaction_id: None,
        };

        let first = store.credit_deposit(credit.clone()).await.unwrap();
        assert!(matches!(first, CreditOutcome::Credited { .. }));
        let second = store.credit_deposit(credit).await.unwrap();
        assert_eq!(second, CreditOutcome::AlreadyProcessed);

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.balance, dec("25"));
        assert_eq!(user.total_deposits, dec("25"));
    }

    #[tokio::test]
    async fn concurrent_credits_apply_once() {
        let (store, user) = store_with_user().await;
        let store = Arc::new(store);
        let user_id = user.id;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .credit_deposit(DepositCredit {
                            order_id: "1_1_bbbbbbbb".to_string(),
                            user_id,
                            amount: dec("10"),
                            transaction_id: None,
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut credited = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CreditOutcome::Credited { .. }) {
                credited += 1;
            }
        }
        assert_eq!(credited, 1);
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.balance, dec("10"));
    }

    #[tokio::test]
    async fn credit_for_unknown_user_changes_nothing() {
        let store = MemoryStore::new();
        let outcome = store
            .credit_deposit(DepositCredit {
                order_id: "99_1_cccccccc".to_string(),
                user_id: 99,
                amount: dec("5"),
                transaction_id: None,
            })
            .await
            .unwrap();
        assert_eq!(outcome, CreditOutcome::UnknownUser);
        assert!(!store.is_order_processed("99_1_cccccccc").await.unwrap());
    }

    #[tokio::test]
    async fn approval_debits_and_records_transaction() {
        let (store, user) = store_with_user().await;
        store.set_balance(user.id, dec("100")).await.unwrap();
        let request = store
            .create_withdrawal_request(NewWithdrawalRequest {
                user_id: user.id,
                amount: dec("40"),
                withdrawal_address: "TXYZ".to_string(),
            })
            .await
            .unwrap();

        let outcome = store
            .process_withdrawal(
                request.id,
                WithdrawalDecision {
                    approve: true,
                    admin_notes: Some("ok".to_string()),
                },
            )
            .await
            .unwrap();
        let WithdrawalOutcome::Processed(processed) = outcome else {
            panic!("expected processed outcome, got {:?}", outcome);
        };
        assert_eq!(processed.status, WithdrawalStatus::Approved);
        assert!(processed.processed_at.is_some());

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.balance, dec("60"));
        assert_eq!(user.total_withdrawn, dec("40"));

        let txs = store.list_transactions(user.id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TransactionType::Withdrawal);
        assert_eq!(txs[0].status, TransactionStatus::Completed);

        let again = store
            .process_withdrawal(
                request.id,
                WithdrawalDecision {
                    approve: false,
                    admin_notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            again,
            WithdrawalOutcome::AlreadyProcessed(WithdrawalStatus::Approved)
        );
    }

    #[tokio::test]
    async fn approval_refused_when_balance_is_short() {
        let (store, user) = store_with_user().await;
        store.set_balance(user.id, dec("10")).await.unwrap();
        let request = store
            .create_withdrawal_request(NewWithdrawalRequest {
                user_id: user.id,
                amount: dec("40"),
                withdrawal_address: "TXYZ".to_string(),
            })
            .await
            .unwrap();

        let outcome = store
            .process_withdrawal(
                request.id,
                WithdrawalDecision {
                    approve: true,
                    admin_notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WithdrawalOutcome::InsufficientBalance {
                available: dec("10"),
                required: dec("40"),
            }
        );

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.balance, dec("10"));
        let pending = store.list_withdrawal_requests(user.id).await.unwrap();
        assert_eq!(pending[0].status, WithdrawalStatus::Pending);
    }

    #[tokio::test]
    async fn transactions_are_newest_first() {
        let (store, user) = store_with_user().await;
        for amount in ["1", "2", "3"] {
            store
                .create_transaction(NewTransaction {
                    user_id: user.id,
                    kind: TransactionType::Deposit,
                    amount: dec(amount),
                    status: TransactionStatus::Pending,
                })
                .await
                .unwrap();
        }
        let txs = store.list_transactions(user.id).await.unwrap();
        let amounts: Vec<_> = txs.iter().map(|t| t.amount.clone()).collect();
        assert_eq!(amounts, vec![dec("3"), dec("2"), dec("1")]);
    }
}
