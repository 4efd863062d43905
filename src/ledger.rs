use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::domain::{
    Account, AccountId, ApprovalPolicy, Custody, Error, MAX_OWNERS, Money, Principal,
    WithdrawRequest, WithdrawalId,
};

/// Joint-custody accounts and their withdrawal requests.
///
/// Every mutating call validates fully before touching state, so a rejected
/// call leaves the ledger (and the custody behind it) exactly as it was.
#[derive(Debug)]
pub struct Ledger<C: Custody> {
    accounts: Vec<Account>,
    owner_index: HashMap<Principal, Vec<AccountId>>,
    policy: ApprovalPolicy,
    custody: C,
}

impl<C: Custody> Ledger<C> {
    pub fn new(custody: C) -> Self {
        Self::with_policy(custody, ApprovalPolicy::default())
    }

    pub fn with_policy(custody: C, policy: ApprovalPolicy) -> Self {
        Self {
            accounts: Vec::new(),
            owner_index: HashMap::new(),
            policy,
            custody,
        }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn create_account(
        &mut self,
        caller: &Principal,
        other_owners: &[Principal],
    ) -> Result<AccountId, Error> {
        let count = other_owners.len() + 1;
        if count > MAX_OWNERS {
            return Err(Error::OwnerLimit { count });
        }

        let mut owners = BTreeSet::from([caller.clone()]);
        for owner in other_owners {
            if !owners.insert(owner.clone()) {
                return Err(Error::DuplicateOwner(owner.clone()));
            }
        }

        let id = self.accounts.len() as AccountId;
        for owner in &owners {
            self.owner_index.entry(owner.clone()).or_default().push(id);
        }
        self.accounts.push(Account::new(id, owners));

        info!(account_id = id, %caller, owners = count, "account created");
        Ok(id)
    }

    /// Accounts `caller` co-owns, in creation order.
    pub fn get_accounts(&self, caller: &Principal) -> &[AccountId] {
        let ids = self
            .owner_index
            .get(caller)
            .map(Vec::as_slice)
            .unwrap_or_default();
        debug!(%caller, accounts = ids.len(), "accounts queried");
        ids
    }

    /// Credits `amount` after pulling it from the caller's wallet. Returns the
    /// new balance.
    pub fn deposit(
        &mut self,
        caller: &Principal,
        account_id: AccountId,
        amount: Money,
    ) -> Result<Money, Error> {
        let account = self.owned_account(caller, account_id)?;
        if amount.is_zero() {
            return Err(Error::invalid_amount(amount, "deposit must be positive"));
        }
        let balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| Error::invalid_amount(amount, "balance would overflow"))?;

        self.custody.transfer_in(caller, amount)?;
        self.accounts[account_id as usize].balance = balance;

        info!(account_id, %caller, %amount, %balance, "deposit credited");
        Ok(balance)
    }

    pub fn request_withdrawal(
        &mut self,
        caller: &Principal,
        account_id: AccountId,
        amount: Money,
    ) -> Result<WithdrawalId, Error> {
        let account = self.owned_account(caller, account_id)?;
        if amount.is_zero() {
            return Err(Error::invalid_amount(amount, "withdrawal must be positive"));
        }
        if amount > account.balance {
            return Err(Error::invalid_amount(
                amount,
                format!("exceeds balance {}", account.balance),
            ));
        }

        let account = &mut self.accounts[account_id as usize];
        let withdrawal_id = account.next_withdrawal_id();
        account
            .withdraw_requests
            .push(WithdrawRequest::new(account_id, caller.clone(), amount));

        info!(account_id, withdrawal_id, %caller, %amount, "withdrawal requested");
        Ok(withdrawal_id)
    }

    /// Records `caller`'s consent. Returns the approval count afterwards.
    pub fn approve_withdrawal(
        &mut self,
        caller: &Principal,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    ) -> Result<usize, Error> {
        let account = self.owned_account(caller, account_id)?;
        let request = Self::request_in(account, withdrawal_id)?;

        if request.approved {
            return Err(Error::AlreadyExecuted {
                account_id,
                withdrawal_id,
            });
        }
        if request.user == *caller {
            return Err(Error::unauthorized(
                caller,
                "requester cannot approve their own withdrawal",
            ));
        }
        if request.approvals.contains(caller) {
            return Err(Error::DuplicateApproval {
                approver: caller.clone(),
                account_id,
                withdrawal_id,
            });
        }

        let request = self.request_mut(account_id, withdrawal_id)?;
        request.approvals.insert(caller.clone());
        let approvals = request.approval_count();

        info!(account_id, withdrawal_id, %caller, approvals, "withdrawal approved");
        Ok(approvals)
    }

    pub fn get_approvals(
        &self,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    ) -> Result<usize, Error> {
        let approvals = self.withdraw_request(account_id, withdrawal_id)?.approval_count();
        debug!(account_id, withdrawal_id, approvals, "approvals queried");
        Ok(approvals)
    }

    /// Executes an approved request and pays its amount to the requester.
    ///
    /// The debit is staged first and reverted if the payout fails.
    pub fn withdraw(
        &mut self,
        caller: &Principal,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    ) -> Result<Money, Error> {
        let account = self.account(account_id)?;
        let request = Self::request_in(account, withdrawal_id)?;

        if request.user != *caller {
            return Err(Error::unauthorized(
                caller,
                "only the requester may execute a withdrawal",
            ));
        }
        if request.approved {
            return Err(Error::AlreadyExecuted {
                account_id,
                withdrawal_id,
            });
        }
        let required = self.policy.required_approvals(account.owners.len());
        if request.approval_count() < required {
            return Err(Error::InsufficientApprovals {
                approvals: request.approval_count(),
                required,
            });
        }
        let amount = request.amount;
        let balance = account
            .balance
            .checked_sub(amount)
            .ok_or(Error::InsufficientFunds {
                balance: account.balance,
                requested: amount,
            })?;

        let previous = self.stage_execution(account_id, withdrawal_id, balance);
        if let Err(e) = self.custody.transfer_out(caller, amount) {
            self.revert_execution(account_id, withdrawal_id, previous);
            warn!(account_id, withdrawal_id, %caller, %amount, error = %e, "payout failed, withdrawal reverted");
            return Err(e.into());
        }

        info!(account_id, withdrawal_id, %caller, %amount, %balance, "withdrawal executed");
        Ok(amount)
    }

    pub fn account(&self, account_id: AccountId) -> Result<&Account, Error> {
        usize::try_from(account_id)
            .ok()
            .and_then(|idx| self.accounts.get(idx))
            .ok_or(Error::AccountNotFound(account_id))
    }

    pub fn withdraw_request(
        &self,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    ) -> Result<&WithdrawRequest, Error> {
        Self::request_in(self.account(account_id)?, withdrawal_id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn total_balance(&self) -> Money {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    fn owned_account(&self, caller: &Principal, account_id: AccountId) -> Result<&Account, Error> {
        let account = self.account(account_id)?;
        if !account.is_owner(caller) {
            return Err(Error::unauthorized(
                caller,
                format!("not an owner of account {}", account_id),
            ));
        }
        Ok(account)
    }

    fn request_in(
        account: &Account,
        withdrawal_id: WithdrawalId,
    ) -> Result<&WithdrawRequest, Error> {
        account
            .request(withdrawal_id)
            .ok_or(Error::WithdrawalNotFound {
                account_id: account.id,
                withdrawal_id,
            })
    }

    fn request_mut(
        &mut self,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    ) -> Result<&mut WithdrawRequest, Error> {
        self.accounts
            .get_mut(account_id as usize)
            .ok_or(Error::AccountNotFound(account_id))?
            .request_mut(withdrawal_id)
            .ok_or(Error::WithdrawalNotFound {
                account_id,
                withdrawal_id,
            })
    }

    // Callers have already validated both ids.
    fn stage_execution(
        &mut self,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
        balance: Money,
    ) -> Money {
        let account = &mut self.accounts[account_id as usize];
        let previous = std::mem::replace(&mut account.balance, balance);
        account.withdraw_requests[withdrawal_id as usize].approved = true;
        previous
    }

    fn revert_execution(
        &mut self,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
        previous: Money,
    ) {
        let account = &mut self.accounts[account_id as usize];
        account.balance = previous;
        account.withdraw_requests[withdrawal_id as usize].approved = false;
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::custody::InMemoryCustody;
    use crate::domain::{ErrorKind, TransferError};

    fn p(id: &str) -> Principal {
        Principal::new(id).unwrap()
    }

    fn funded_ledger() -> Ledger<InMemoryCustody> {
        let mut custody = InMemoryCustody::new();
        for id in ["owner", "addr1", "addr2", "addr3", "addr4"] {
            custody.fund(&p(id), Money(1_000)).unwrap();
        }
        Ledger::new(custody)
    }

    /// `owners` total owners, `deposit` paid in by "owner", then one request
    /// by "owner" per entry of `withdrawals`.
    fn ledger_with_account(owners: usize, deposit: u64, withdrawals: &[u64]) -> Ledger<InMemoryCustody> {
        let mut ledger = funded_ledger();
        let others: Vec<Principal> = ["addr1", "addr2", "addr3"]
            .iter()
            .take(owners - 1)
            .map(|id| p(id))
            .collect();
        ledger.create_account(&p("owner"), &others).unwrap();
        if deposit > 0 {
            ledger.deposit(&p("owner"), 0, Money(deposit)).unwrap();
        }
        for amount in withdrawals {
            ledger.request_withdrawal(&p("owner"), 0, Money(*amount)).unwrap();
        }
        ledger
    }

    #[test]
    fn creates_single_double_and_triple_owner_accounts() {
        let mut ledger = funded_ledger();

        ledger.create_account(&p("owner"), &[]).unwrap();
        ledger.create_account(&p("owner"), &[p("addr1")]).unwrap();
        ledger
            .create_account(&p("owner"), &[p("addr1"), p("addr2")])
            .unwrap();

        assert_eq!(ledger.get_accounts(&p("owner")), &[0, 1, 2]);
        assert_eq!(ledger.get_accounts(&p("addr1")), &[1, 2]);
        assert_eq!(ledger.get_accounts(&p("addr2")), &[2]);
        assert!(ledger.get_accounts(&p("addr3")).is_empty());
    }

    #[test]
    fn rejects_quad_owner_account() {
        let mut ledger = funded_ledger();

        let err = ledger
            .create_account(&p("owner"), &[p("addr1"), p("addr2"), p("addr3")])
            .unwrap_err();

        assert!(matches!(err, Error::OwnerLimit { count: 4 }));
        assert_eq!(ledger.accounts().count(), 0);
        assert!(ledger.get_accounts(&p("owner")).is_empty());
    }

    #[test]
    fn rejects_duplicate_owners() {
        let mut ledger = funded_ledger();

        let self_listed = ledger.create_account(&p("owner"), &[p("owner")]).unwrap_err();
        let listed_twice = ledger
            .create_account(&p("owner"), &[p("addr1"), p("addr1")])
            .unwrap_err();

        assert_eq!(self_listed.kind(), ErrorKind::OwnerLimit);
        assert!(matches!(listed_twice, Error::DuplicateOwner(ref o) if *o == p("addr1")));
        assert!(ledger.get_accounts(&p("addr1")).is_empty());
    }

    #[test]
    fn account_ids_are_sequential() {
        let mut ledger = funded_ledger();

        let first = ledger.create_account(&p("addr1"), &[]).unwrap();
        let second = ledger.create_account(&p("addr2"), &[]).unwrap();

        assert_eq!((first, second), (0, 1));
        assert_eq!(ledger.account(1).unwrap().owners, BTreeSet::from([p("addr2")]));
    }

    #[test]
    fn owner_deposit_moves_value_into_custody() {
        let mut ledger = ledger_with_account(1, 0, &[]);

        let balance = ledger.deposit(&p("owner"), 0, Money(100)).unwrap();

        assert_eq!(balance, Money(100));
        assert_eq!(ledger.account(0).unwrap().balance, Money(100));
        assert_eq!(ledger.custody().held(), Money(100));
        assert_eq!(ledger.custody().wallet(&p("owner")), Money(900));
    }

    #[test]
    fn non_owner_deposit_is_rejected() {
        let mut ledger = ledger_with_account(1, 0, &[]);

        let err = ledger.deposit(&p("addr1"), 0, Money(100)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(ledger.account(0).unwrap().balance, Money::ZERO);
        assert_eq!(ledger.custody().wallet(&p("addr1")), Money(1_000));
        assert_eq!(ledger.custody().held(), Money::ZERO);
    }

    #[test]
    fn deposit_validation_failures() {
        let mut ledger = ledger_with_account(1, 0, &[]);

        assert_eq!(
            ledger.deposit(&p("owner"), 7, Money(1)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ledger.deposit(&p("owner"), 0, Money::ZERO).unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
        assert!(matches!(
            ledger.deposit(&p("owner"), 0, Money(1_001)).unwrap_err(),
            Error::Transfer(TransferError::InsufficientWallet { .. })
        ));
        assert_eq!(ledger.account(0).unwrap().balance, Money::ZERO);
    }

    #[test]
    fn deposit_overflow_leaves_balance_and_custody_untouched() {
        let mut ledger = Ledger::new(InMemoryCustody::open());
        ledger.create_account(&p("owner"), &[]).unwrap();
        ledger.deposit(&p("owner"), 0, Money(u64::MAX - 1)).unwrap();

        let err = ledger.deposit(&p("owner"), 0, Money(5)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert_eq!(ledger.account(0).unwrap().balance, Money(u64::MAX - 1));
        assert_eq!(ledger.custody().held(), Money(u64::MAX - 1));
    }

    #[test]
    fn request_withdrawal_checks_owner_and_balance() {
        let mut ledger = ledger_with_account(1, 100, &[]);

        assert_eq!(
            ledger
                .request_withdrawal(&p("owner"), 0, Money(101))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(
            ledger
                .request_withdrawal(&p("owner"), 0, Money::ZERO)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(
            ledger
                .request_withdrawal(&p("addr1"), 0, Money(100))
                .unwrap_err()
                .kind(),
            ErrorKind::Authorization
        );
        assert!(ledger.account(0).unwrap().withdraw_requests.is_empty());

        assert_eq!(ledger.request_withdrawal(&p("owner"), 0, Money(100)).unwrap(), 0);
        assert_eq!(ledger.account(0).unwrap().balance, Money(100));
    }

    #[test]
    fn sequential_requests_get_distinct_ids() {
        let mut ledger = ledger_with_account(1, 100, &[]);

        let first = ledger.request_withdrawal(&p("owner"), 0, Money(90)).unwrap();
        let second = ledger.request_withdrawal(&p("owner"), 0, Money(10)).unwrap();
        // Outstanding requests are not reserved against the balance.
        let third = ledger.request_withdrawal(&p("owner"), 0, Money(100)).unwrap();

        assert_eq!((first, second, third), (0, 1, 2));
        let request = ledger.withdraw_request(0, 1).unwrap();
        assert_eq!((request.account_id, request.amount), (0, Money(10)));
        assert_eq!(request.user, p("owner"));
    }

    #[test]
    fn co_owner_approves_once() {
        let mut ledger = ledger_with_account(2, 100, &[100]);

        assert_eq!(ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap(), 1);
        assert_eq!(ledger.get_approvals(0, 0).unwrap(), 1);

        let err = ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateApproval);
        assert_eq!(ledger.get_approvals(0, 0).unwrap(), 1);
    }

    #[test]
    fn requester_and_outsiders_cannot_approve() {
        let mut ledger = ledger_with_account(2, 100, &[100]);

        let own = ledger.approve_withdrawal(&p("owner"), 0, 0).unwrap_err();
        let outsider = ledger.approve_withdrawal(&p("addr2"), 0, 0).unwrap_err();

        assert_eq!(own.kind(), ErrorKind::Authorization);
        assert_eq!(outsider.kind(), ErrorKind::Authorization);
        assert_eq!(ledger.get_approvals(0, 0).unwrap(), 0);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut ledger = ledger_with_account(2, 100, &[100]);

        assert_eq!(ledger.get_approvals(0, 1).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(ledger.get_approvals(1, 0).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            ledger.approve_withdrawal(&p("addr1"), 0, 9).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ledger.withdraw(&p("owner"), 0, 9).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn requester_withdraws_approved_request_exactly_once() {
        let mut ledger = ledger_with_account(2, 200, &[100]);
        ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap();

        assert_eq!(ledger.withdraw(&p("owner"), 0, 0).unwrap(), Money(100));
        assert_eq!(ledger.account(0).unwrap().balance, Money(100));
        assert_eq!(ledger.custody().held(), Money(100));
        assert_eq!(ledger.custody().wallet(&p("owner")), Money(900));
        assert!(ledger.withdraw_request(0, 0).unwrap().approved);

        let err = ledger.withdraw(&p("owner"), 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExecuted);
        assert_eq!(ledger.account(0).unwrap().balance, Money(100));

        let err = ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExecuted);
    }

    #[test]
    fn only_requester_may_execute() {
        let mut ledger = ledger_with_account(2, 200, &[100]);
        ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap();

        let err = ledger.withdraw(&p("addr1"), 0, 0).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(ledger.account(0).unwrap().balance, Money(200));
        assert!(!ledger.withdraw_request(0, 0).unwrap().approved);
    }

    #[test]
    fn execution_waits_for_every_co_owner() {
        let mut ledger = ledger_with_account(3, 100, &[40]);

        let err = ledger.withdraw(&p("owner"), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientApprovals {
                approvals: 0,
                required: 2
            }
        ));

        ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap();
        assert_eq!(
            ledger.withdraw(&p("owner"), 0, 0).unwrap_err().kind(),
            ErrorKind::InsufficientApprovals
        );

        ledger.approve_withdrawal(&p("addr2"), 0, 0).unwrap();
        assert_eq!(ledger.withdraw(&p("owner"), 0, 0).unwrap(), Money(40));
    }

    #[test]
    fn single_owner_executes_without_approvals() {
        let mut ledger = ledger_with_account(1, 100, &[60]);

        assert_eq!(ledger.withdraw(&p("owner"), 0, 0).unwrap(), Money(60));
        assert_eq!(ledger.account(0).unwrap().balance, Money(40));
    }

    #[test]
    fn configured_threshold_unlocks_earlier() {
        let mut custody = InMemoryCustody::new();
        custody.fund(&p("owner"), Money(100)).unwrap();
        let policy = ApprovalPolicy::AtLeast(NonZeroUsize::new(1).unwrap());
        let mut ledger = Ledger::with_policy(custody, policy);
        ledger
            .create_account(&p("owner"), &[p("addr1"), p("addr2")])
            .unwrap();
        ledger.deposit(&p("owner"), 0, Money(100)).unwrap();
        ledger.request_withdrawal(&p("owner"), 0, Money(100)).unwrap();

        ledger.approve_withdrawal(&p("addr2"), 0, 0).unwrap();

        assert_eq!(ledger.withdraw(&p("owner"), 0, 0).unwrap(), Money(100));
    }

    #[test]
    fn execution_revalidates_balance() {
        let mut ledger = ledger_with_account(1, 100, &[90, 20]);

        ledger.withdraw(&p("owner"), 0, 0).unwrap();
        let err = ledger.withdraw(&p("owner"), 0, 1).unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientFunds {
                balance: Money(10),
                requested: Money(20)
            }
        ));
        assert!(!ledger.withdraw_request(0, 1).unwrap().approved);
        assert_eq!(ledger.account(0).unwrap().balance, Money(10));
    }

    #[test]
    fn failed_payout_rolls_back_execution() {
        let mut ledger = ledger_with_account(2, 100, &[100]);
        ledger.approve_withdrawal(&p("addr1"), 0, 0).unwrap();
        ledger.custody_mut().refuse_payouts_to(&p("owner"));

        let err = ledger.withdraw(&p("owner"), 0, 0).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(ledger.account(0).unwrap().balance, Money(100));
        assert!(!ledger.withdraw_request(0, 0).unwrap().approved);
        assert_eq!(ledger.custody().held(), Money(100));
        assert_eq!(ledger.custody().wallet(&p("owner")), Money(900));

        ledger.custody_mut().accept_payouts_to(&p("owner"));
        assert_eq!(ledger.withdraw(&p("owner"), 0, 0).unwrap(), Money(100));
        assert_eq!(ledger.custody().wallet(&p("owner")), Money(1_000));
    }

    #[test]
    fn total_balance_spans_accounts() {
        let mut ledger = ledger_with_account(1, 100, &[]);
        ledger.create_account(&p("addr1"), &[]).unwrap();
        ledger.deposit(&p("addr1"), 1, Money(25)).unwrap();

        assert_eq!(ledger.total_balance(), Money(125));
        assert_eq!(ledger.total_balance(), ledger.custody().held());
    }
}
