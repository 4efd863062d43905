use crate::domain::{AccountId, Money, Principal, WithdrawalId};

/// One call against the ledger, as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateAccount {
        caller: Principal,
        other_owners: Vec<Principal>,
    },
    Deposit {
        caller: Principal,
        account_id: AccountId,
        amount: Money,
    },
    RequestWithdrawal {
        caller: Principal,
        account_id: AccountId,
        amount: Money,
    },
    ApproveWithdrawal {
        caller: Principal,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    },
    Withdraw {
        caller: Principal,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    },
    GetAccounts {
        caller: Principal,
    },
    GetApprovals {
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    },
}

/// What a successfully applied command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AccountCreated(AccountId),
    Deposited { account_id: AccountId, balance: Money },
    WithdrawalRequested(WithdrawalId),
    Approved { approvals: usize },
    Withdrawn { amount: Money },
    Accounts(Vec<AccountId>),
    Approvals(usize),
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Command::CreateAccount {
                caller,
                other_owners,
            } => {
                let owners: Vec<&str> = other_owners.iter().map(Principal::as_str).collect();
                write!(f, "create,caller={},owners={}", caller, owners.join(";"))
            }
            Command::Deposit {
                caller,
                account_id,
                amount,
            } => write!(f, "deposit,caller={},account={},amount={}", caller, account_id, amount),
            Command::RequestWithdrawal {
                caller,
                account_id,
                amount,
            } => write!(f, "request,caller={},account={},amount={}", caller, account_id, amount),
            Command::ApproveWithdrawal {
                caller,
                account_id,
                withdrawal_id,
            } => write!(
                f,
                "approve,caller={},account={},request={}",
                caller, account_id, withdrawal_id
            ),
            Command::Withdraw {
                caller,
                account_id,
                withdrawal_id,
            } => write!(
                f,
                "withdraw,caller={},account={},request={}",
                caller, account_id, withdrawal_id
            ),
            Command::GetAccounts { caller } => write!(f, "accounts,caller={}", caller),
            Command::GetApprovals {
                account_id,
                withdrawal_id,
            } => write!(f, "approvals,account={},request={}", account_id, withdrawal_id),
        }
    }
}
