use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::database::repository::SharedStore;
use crate::error::AppResult;

/// Aggregates over a user's direct referrals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamStats {
    pub total_team_members: usize,
    pub total_team_deposits: BigDecimal,
    pub total_team_withdrawn: BigDecimal,
}

pub struct TeamService {
    store: SharedStore,
}

impl TeamService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn stats(&self, user_id: i64) -> AppResult<TeamStats> {
        let referrals = self.store.list_referrals(user_id).await?;
        let zero = BigDecimal::from(0);

        Ok(TeamStats {
            total_team_members: referrals.len(),
            total_team_deposits: referrals
                .iter()
                .fold(zero.clone(), |acc, u| acc + &u.total_deposits),
            total_team_withdrawn: referrals
                .iter()
                .fold(zero, |acc, u| acc + &u.total_withdrawn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{DepositCredit, NewUser};
    use crate::database::repository::{LedgerRepository, UserRepository};
    use std::sync::Arc;

    async fn user(store: &MemoryStore, name: &str, referred_by: Option<i64>) -> i64 {
        store
            .create_user(NewUser {
                username: name.to_string(),
                referred_by,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn sums_direct_referrals_only() {
        let store = Arc::new(MemoryStore::new());
        let leader = user(&store, "leader", None).await;
        let a = user(&store, "a", Some(leader)).await;
        let b = user(&store, "b", Some(leader)).await;
        // Second-level referral is not part of the leader's team.
        let c = user(&store, "c", Some(a)).await;

        for (order, user_id, amount) in [("o1", a, 30), ("o2", b, 12), ("o3", c, 99)] {
            store
                .credit_deposit(DepositCredit {
                    order_id: order.to_string(),
                    user_id,
                    amount: BigDecimal::from(amount),
                    transaction_id: None,
                })
                .await
                .unwrap();
        }

        let stats = TeamService::new(store).stats(leader).await.unwrap();
        assert_eq!(stats.total_team_members, 2);
        assert_eq!(stats.total_team_deposits, BigDecimal::from(42));
        assert_eq!(stats.total_team_withdrawn, BigDecimal::from(0));
    }
}
