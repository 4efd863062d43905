use std::collections::BTreeSet;

use crate::domain::{AccountId, Money, Principal, WithdrawalId};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub owners: BTreeSet<Principal>, // fixed at creation, 1..MAX_OWNERS members
    pub balance: Money,              // funds currently in custody for this account
    pub withdraw_requests: Vec<WithdrawRequest>, // append-only, index == WithdrawalId
}

impl Account {
    pub fn new(id: AccountId, owners: BTreeSet<Principal>) -> Self {
        Self {
            id,
            owners,
            balance: Money::ZERO,
            withdraw_requests: Vec::new(),
        }
    }

    pub fn is_owner(&self, principal: &Principal) -> bool {
        self.owners.contains(principal)
    }

    pub fn request(&self, withdrawal_id: WithdrawalId) -> Option<&WithdrawRequest> {
        usize::try_from(withdrawal_id)
            .ok()
            .and_then(|idx| self.withdraw_requests.get(idx))
    }

    pub fn request_mut(&mut self, withdrawal_id: WithdrawalId) -> Option<&mut WithdrawRequest> {
        usize::try_from(withdrawal_id)
            .ok()
            .and_then(|idx| self.withdraw_requests.get_mut(idx))
    }

    pub fn next_withdrawal_id(&self) -> WithdrawalId {
        self.withdraw_requests.len() as WithdrawalId
    }

    pub fn executed_requests(&self) -> usize {
        self.withdraw_requests.iter().filter(|r| r.approved).count()
    }
}

#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub account_id: AccountId,
    pub user: Principal, // requester, the only principal allowed to execute
    pub amount: Money,
    pub approvals: BTreeSet<Principal>, // co-owners only, never `user`
    pub approved: bool,                 // set once executed
}

impl WithdrawRequest {
    pub fn new(account_id: AccountId, user: Principal, amount: Money) -> Self {
        Self {
            account_id,
            user,
            amount,
            approvals: BTreeSet::new(),
            approved: false,
        }
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }
}
