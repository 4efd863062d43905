use std::io::Write;

use serde::Serialize;

use crate::domain::{Account, AccountId, Error, Money, OutputRepository, Principal};

/// Writes the final account report as CSV.
#[derive(Debug)]
pub struct CsvOutput<W: Write> {
    writer: W,
}

impl<W: Write> CsvOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[derive(Debug, Serialize)]
struct ReportRow {
    account: AccountId,
    owners: String,
    balance: Money,
    requests: usize,
    executed: usize,
}

impl From<&Account> for ReportRow {
    fn from(account: &Account) -> Self {
        let owners: Vec<&str> = account.owners.iter().map(Principal::as_str).collect();
        Self {
            account: account.id,
            owners: owners.join(";"),
            balance: account.balance,
            requests: account.withdraw_requests.len(),
            executed: account.executed_requests(),
        }
    }
}

impl<W: Write> OutputRepository for CsvOutput<W> {
    fn flush<'a>(&mut self, accounts: impl Iterator<Item = &'a Account>) -> Result<(), Error> {
        // Header written by hand so an empty ledger still gets one.
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.writer);
        wtr.write_record(["account", "owners", "balance", "requests", "executed"])
            .map_err(|e| Error::Output(e.to_string()))?;

        for account in accounts {
            wtr.serialize(ReportRow::from(account))
                .map_err(|e| Error::Output(e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
