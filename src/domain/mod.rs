pub mod account;
pub mod command;
pub mod error;
pub mod money;
pub mod policy;
pub mod principal;
pub mod traits;

pub use account::{Account, WithdrawRequest};
pub use command::{Command, Outcome};
pub use error::{Error, ErrorKind, TransferError};
pub use money::Money;
pub use policy::ApprovalPolicy;
pub use principal::Principal;
pub use traits::{CommandStream, Custody, DeadLetterQueue, OutputRepository};

pub type AccountId = u64;
pub type WithdrawalId = u64;

/// Owner-set ceiling, creator included.
pub const MAX_OWNERS: usize = 3;
