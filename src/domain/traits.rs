use futures::Stream;

use crate::domain::{Account, Command, Error, Money, Principal, TransferError};

pub trait CommandStream {
    type CmdStream: Stream<Item = Result<Command, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::CmdStream;
}

pub trait DeadLetterQueue {
    fn report(&mut self, command: Option<&Command>, error: &Error);
}

pub trait OutputRepository {
    fn flush<'a>(&mut self, accounts: impl Iterator<Item = &'a Account>) -> Result<(), Error>;
}

/// The external value-transfer primitive. Each call is atomic: on `Err`
/// nothing moved.
pub trait Custody {
    fn transfer_in(&mut self, from: &Principal, amount: Money) -> Result<(), TransferError>;

    fn transfer_out(&mut self, to: &Principal, amount: Money) -> Result<(), TransferError>;
}
