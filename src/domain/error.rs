use crate::domain::{AccountId, Money, Principal, WithdrawalId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Output failed with: {0}")]
    Output(String),

    #[error("{caller} is not authorized: {reason}")]
    Unauthorized { caller: Principal, reason: String },

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Withdrawal {withdrawal_id} not found on account {account_id}")]
    WithdrawalNotFound {
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    },

    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Money, reason: String },

    #[error("{approver} already approved withdrawal {withdrawal_id} on account {account_id}")]
    DuplicateApproval {
        approver: Principal,
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    },

    #[error("Withdrawal {withdrawal_id} on account {account_id} was already executed")]
    AlreadyExecuted {
        account_id: AccountId,
        withdrawal_id: WithdrawalId,
    },

    #[error("Withdrawal has {approvals} of {required} required approvals")]
    InsufficientApprovals { approvals: usize, required: usize },

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    #[error("An account holds at most {max} owners, got {count}", max = crate::domain::MAX_OWNERS)]
    OwnerLimit { count: usize },

    #[error("Owner {0} listed more than once")]
    DuplicateOwner(Principal),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Categories callers match on when the exact variant does not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    NotFound,
    InvalidAmount,
    DuplicateApproval,
    AlreadyExecuted,
    InsufficientApprovals,
    InsufficientFunds,
    OwnerLimit,
    Transfer,
    Driver,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized { .. } => ErrorKind::Authorization,
            Error::AccountNotFound(_) | Error::WithdrawalNotFound { .. } => ErrorKind::NotFound,
            Error::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Error::DuplicateApproval { .. } => ErrorKind::DuplicateApproval,
            Error::AlreadyExecuted { .. } => ErrorKind::AlreadyExecuted,
            Error::InsufficientApprovals { .. } => ErrorKind::InsufficientApprovals,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::OwnerLimit { .. } | Error::DuplicateOwner(_) => ErrorKind::OwnerLimit,
            Error::Transfer(_) => ErrorKind::Transfer,
            Error::IO(_) | Error::Ingestion(_) | Error::Output(_) => ErrorKind::Driver,
        }
    }

    pub(crate) fn unauthorized(caller: &Principal, reason: impl Into<String>) -> Self {
        Error::Unauthorized {
            caller: caller.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_amount(amount: Money, reason: impl Into<String>) -> Self {
        Error::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }
}

/// Failure reported by the external value-transfer primitive. A failed
/// transfer has moved nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("{principal} holds {available}, cannot transfer {requested}")]
    InsufficientWallet {
        principal: Principal,
        available: Money,
        requested: Money,
    },

    #[error("Custody holds {held}, cannot pay out {requested}")]
    InsufficientCustody { held: Money, requested: Money },

    #[error("{0} refused the payout")]
    Refused(Principal),

    #[error("Transfer of {0} overflows the receiving balance")]
    Overflow(Money),
}
