use std::collections::{HashMap, HashSet};

use crate::domain::{Custody, Money, Principal, TransferError};

/// External wallets plus the pool of value held by the ledger.
#[derive(Default, Debug)]
pub struct InMemoryCustody {
    wallets: HashMap<Principal, Money>,
    held: Money,
    open: bool,
    refusing: HashSet<Principal>,
}

impl InMemoryCustody {
    /// Wallets start empty; deposits need prior `fund` calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wallets are unbounded sources of value. Payouts still accumulate in
    /// the recipient's wallet.
    pub fn open() -> Self {
        Self {
            open: true,
            ..Self::default()
        }
    }

    pub fn fund(&mut self, principal: &Principal, amount: Money) -> Result<(), TransferError> {
        let wallet = self.wallets.entry(principal.clone()).or_default();
        *wallet = wallet
            .checked_add(amount)
            .ok_or(TransferError::Overflow(amount))?;
        Ok(())
    }

    /// Makes every later payout to `principal` fail.
    pub fn refuse_payouts_to(&mut self, principal: &Principal) {
        self.refusing.insert(principal.clone());
    }

    pub fn accept_payouts_to(&mut self, principal: &Principal) {
        self.refusing.remove(principal);
    }

    pub fn wallet(&self, principal: &Principal) -> Money {
        self.wallets.get(principal).copied().unwrap_or_default()
    }

    pub fn held(&self) -> Money {
        self.held
    }
}

impl Custody for InMemoryCustody {
    fn transfer_in(&mut self, from: &Principal, amount: Money) -> Result<(), TransferError> {
        let held = self
            .held
            .checked_add(amount)
            .ok_or(TransferError::Overflow(amount))?;

        if !self.open {
            let available = self.wallet(from);
            let remaining =
                available
                    .checked_sub(amount)
                    .ok_or_else(|| TransferError::InsufficientWallet {
                        principal: from.clone(),
                        available,
                        requested: amount,
                    })?;
            self.wallets.insert(from.clone(), remaining);
        }

        self.held = held;
        Ok(())
    }

    fn transfer_out(&mut self, to: &Principal, amount: Money) -> Result<(), TransferError> {
        if self.refusing.contains(to) {
            return Err(TransferError::Refused(to.clone()));
        }

        let held = self
            .held
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientCustody {
                held: self.held,
                requested: amount,
            })?;
        let wallet = self
            .wallet(to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow(amount))?;

        self.wallets.insert(to.clone(), wallet);
        self.held = held;
        Ok(())
    }
}
