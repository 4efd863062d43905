use crate::domain::{
    Command, Custody, Error, Outcome,
    traits::{CommandStream, DeadLetterQueue, OutputRepository},
};
use crate::ledger::Ledger;

use futures::StreamExt;
use tracing::info;

#[derive(Debug)]
pub struct Engine<I, O, D, C>
where
    I: CommandStream,
    O: OutputRepository,
    D: DeadLetterQueue,
    C: Custody,
{
    ingestion: I,
    output_repository: O,
    dlq: D,
    ledger: Ledger<C>,
}

impl<I, O, D, C> Engine<I, O, D, C>
where
    I: CommandStream,
    O: OutputRepository,
    D: DeadLetterQueue,
    C: Custody,
{
    pub fn new(ingestion: I, output_repository: O, dlq: D, ledger: Ledger<C>) -> Self {
        Self {
            ingestion,
            output_repository,
            dlq,
            ledger,
        }
    }

    /// Applies every command in stream order. Rejected commands go to the
    /// dead-letter queue; they never stop the run.
    pub async fn process(&mut self) -> Result<(), Error> {
        let mut res = self.ingestion.stream();
        let (mut applied, mut rejected) = (0usize, 0usize);

        while let Some(cmd) = res.next().await {
            match cmd {
                Ok(cmd) => match self.apply_command(&cmd) {
                    Ok(outcome) => {
                        applied += 1;
                        info!(command = %cmd, ?outcome, "command applied");
                    }
                    Err(e) => {
                        rejected += 1;
                        self.dlq.report(Some(&cmd), &e);
                    }
                },
                Err(e) => {
                    rejected += 1;
                    self.dlq.report(None, &e);
                }
            }
        }

        info!(applied, rejected, "command stream drained");
        Ok(())
    }

    pub fn apply_command(&mut self, cmd: &Command) -> Result<Outcome, Error> {
        let ledger = &mut self.ledger;

        match cmd {
            Command::CreateAccount {
                caller,
                other_owners,
            } => ledger
                .create_account(caller, other_owners)
                .map(Outcome::AccountCreated),
            Command::Deposit {
                caller,
                account_id,
                amount,
            } => ledger
                .deposit(caller, *account_id, *amount)
                .map(|balance| Outcome::Deposited {
                    account_id: *account_id,
                    balance,
                }),
            Command::RequestWithdrawal {
                caller,
                account_id,
                amount,
            } => ledger
                .request_withdrawal(caller, *account_id, *amount)
                .map(Outcome::WithdrawalRequested),
            Command::ApproveWithdrawal {
                caller,
                account_id,
                withdrawal_id,
            } => ledger
                .approve_withdrawal(caller, *account_id, *withdrawal_id)
                .map(|approvals| Outcome::Approved { approvals }),
            Command::Withdraw {
                caller,
                account_id,
                withdrawal_id,
            } => ledger
                .withdraw(caller, *account_id, *withdrawal_id)
                .map(|amount| Outcome::Withdrawn { amount }),
            Command::GetAccounts { caller } => {
                Ok(Outcome::Accounts(ledger.get_accounts(caller).to_vec()))
            }
            Command::GetApprovals {
                account_id,
                withdrawal_id,
            } => ledger
                .get_approvals(*account_id, *withdrawal_id)
                .map(Outcome::Approvals),
        }
    }

    pub fn ledger(&self) -> &Ledger<C> {
        &self.ledger
    }

    pub fn dlq(&self) -> &D {
        &self.dlq
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.output_repository.flush(self.ledger.accounts())
    }
}
