use std::path::Path;

use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, Principal};

/// Public operation signatures of the ledger.
pub const INTERFACE: &[&str] = &[
    "createAccount(caller, otherOwners: principal[]) -> accountId",
    "getAccounts(caller) -> accountId[]",
    "deposit(caller, accountId, amount)",
    "requestWithdrawl(caller, accountId, amount) -> withdrawalId",
    "approvedWithdrawl(caller, accountId, withdrawalId)",
    "getApprovals(accountId, withdrawalId) -> count",
    "withdraw(caller, accountId, withdrawalId)",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub ledger: LedgerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub address: String,
    pub signer: String,
    pub interface: Vec<String>,
}

impl DeploymentInfo {
    /// Describes a freshly instantiated ledger under a random 20-byte address.
    pub fn new(signer: &Principal) -> Self {
        let mut raw = [0u8; 20];
        OsRng.fill_bytes(&mut raw);

        Self {
            ledger: LedgerInfo {
                address: format!("0x{}", hex::encode(raw)),
                signer: signer.to_string(),
                interface: INTERFACE.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)
            .map_err(|e| Error::Output(e.to_string()))?;
        String::from_utf8(out).map_err(|e| Error::Output(e.to_string()))
    }

    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
