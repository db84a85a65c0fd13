use async_trait::async_trait;
use treasure_protocol::entrypoint::TREASURY_PAYOUT;
use treasure_protocol::*;

use super::*;

/// Treasury that pays rewards through the contract's treasury-only
/// `treasury_payout` entrypoint, using a ledger handle signed by the treasury
/// account.
#[derive(Clone, Debug)]
pub struct ContractTreasury<L> {
    ledger: L,
    contract: ContractId,
}

impl<L: Ledger> ContractTreasury<L> {
    pub fn new(ledger: L, contract: ContractId) -> Self {
        Self { ledger, contract }
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn into_inner(self) -> L {
        self.ledger
    }
}

#[async_trait(?Send)]
impl<L: Ledger> Treasury for ContractTreasury<L> {
    async fn payout(
        &self,
        contract: &ContractId,
        recipient: &AccountId,
        loc: Location,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        if *contract != self.contract {
            return Err(LedgerError::rejected(
                TREASURY_PAYOUT,
                format!("treasury is bound to {}, not {}", self.contract, contract),
            ));
        }

        log::debug!("treasury paying {} to {} for {}", amount, recipient, loc);
        let args = vec![serde_json::Value::String(recipient.to_string()), loc.to_value()];
        let result = self
            .ledger
            .call_entrypoint(TREASURY_PAYOUT, args, CallOptions::paying(amount))
            .await?;
        Ok(Receipt {
            tx_hash: result.tx_hash,
        })
    }
}
