pub mod config;
pub mod custody;
pub mod deployment;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod ledger;
pub mod output_repository;

pub use custody::InMemoryCustody;
pub use domain::{
    Account, AccountId, ApprovalPolicy, Custody, Error, ErrorKind, Money, Principal,
    TransferError, WithdrawRequest, WithdrawalId,
};
pub use ledger::Ledger;
