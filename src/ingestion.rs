use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::traits::CommandStream;
use crate::domain::{AccountId, Command, Error, Money, Principal, WithdrawalId};

pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    caller: Option<Principal>,
    #[serde(default)]
    account: Option<AccountId>,
    #[serde(default)]
    request: Option<WithdrawalId>,
    #[serde(default)]
    amount: Option<Money>,
    #[serde(default)]
    owners: Option<String>,
}

fn required<T>(value: Option<T>, column: &str, kind: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::Ingestion(format!("`{}` row is missing `{}`", kind, column)))
}

fn parse_owners(raw: Option<String>) -> Result<Vec<Principal>, Error> {
    let raw = raw.unwrap_or_default();
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Principal::new(s).ok_or_else(|| Error::Ingestion(format!("Invalid owner: {}", s)))
        })
        .collect()
}

impl TryFrom<CsvRow> for Command {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let kind = row.kind.trim().to_ascii_lowercase();
        let k = kind.as_str();

        let command = match k {
            "create" => Command::CreateAccount {
                caller: required(row.caller, "caller", k)?,
                other_owners: parse_owners(row.owners)?,
            },
            "deposit" => Command::Deposit {
                caller: required(row.caller, "caller", k)?,
                account_id: required(row.account, "account", k)?,
                amount: required(row.amount, "amount", k)?,
            },
            "request" => Command::RequestWithdrawal {
                caller: required(row.caller, "caller", k)?,
                account_id: required(row.account, "account", k)?,
                amount: required(row.amount, "amount", k)?,
            },
            "approve" => Command::ApproveWithdrawal {
                caller: required(row.caller, "caller", k)?,
                account_id: required(row.account, "account", k)?,
                withdrawal_id: required(row.request, "request", k)?,
            },
            "withdraw" => Command::Withdraw {
                caller: required(row.caller, "caller", k)?,
                account_id: required(row.account, "account", k)?,
                withdrawal_id: required(row.request, "request", k)?,
            },
            "accounts" => Command::GetAccounts {
                caller: required(row.caller, "caller", k)?,
            },
            "approvals" => Command::GetApprovals {
                account_id: required(row.account, "account", k)?,
                withdrawal_id: required(row.request, "request", k)?,
            },
            other => {
                return Err(Error::Ingestion(format!(
                    "Invalid command type: {}",
                    other
                )));
            }
        };

        Ok(command)
    }
}

impl<R: Read + Send + 'static> CommandStream for CsvReader<R> {
    type CmdStream = Pin<Box<dyn Stream<Item = Result<Command, Error>> + Send>>;

    fn stream(&mut self) -> Self::CmdStream {
        let reader = match self.reader.take() {
            Some(r) => r,
            // Already consumed.
            None => return Box::pin(stream::iter(Vec::<Result<Command, Error>>::new())),
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Command::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}
