use async_trait::async_trait;
use core::cell::RefCell;
use hashbrown::{HashMap, HashSet};
use serde::Deserialize;
use serde_json::Value;
use std::rc::Rc;
use treasure_protocol::entrypoint::*;
use treasure_protocol::*;

use super::*;

/// Pseudo-entrypoint name used to journal and fault balance queries.
pub const BALANCE_QUERY: &str = "get_balance";

/// In-process stand-in for a deployed treasure hunt contract and the accounts
/// around it.
///
/// Every account sees the same chain through its own [`MemoryLedger`] handle.
/// Calls are journaled, and faults can be injected per entrypoint.
#[derive(Clone, Debug)]
pub struct MemoryChain {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Debug)]
struct Inner {
    contract: ContractState,
    journal: Vec<JournalEntry>,
    faults: HashMap<String, Fault>,
    index_lag: usize,
    tx_counter: u64,
}

#[derive(Clone, Debug)]
struct ContractState {
    id: ContractId,
    treasury: AccountId,
    reveal_fee: Amount,
    reward: Amount,
    pool: Amount,
    balances: HashMap<AccountId, Amount>,
    treasures: HashSet<Location>,
    /// Reveals in submission order.
    revealed: Vec<(Location, bool)>,
    paid: HashSet<Location>,
}

#[derive(Clone, Debug)]
struct Fault {
    error: LedgerError,
    sticky: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JournalEntry {
    pub caller: AccountId,
    pub entrypoint: String,
    pub args: Vec<Value>,
    pub options: CallOptions,
}

impl MemoryChain {
    pub fn new(id: ContractId, treasury: AccountId, reveal_fee: Amount, reward: Amount) -> Self {
        let contract = ContractState {
            id,
            treasury,
            reveal_fee,
            reward,
            pool: Amount::zero(),
            balances: HashMap::new(),
            treasures: HashSet::new(),
            revealed: Vec::new(),
            paid: HashSet::new(),
        };
        Self {
            inner: Rc::new(RefCell::new(Inner {
                contract,
                journal: Vec::new(),
                faults: HashMap::new(),
                index_lag: 0,
                tx_counter: 0,
            })),
        }
    }

    /// Handle acting as `account`.
    pub fn connect(&self, account: AccountId) -> MemoryLedger {
        MemoryLedger {
            chain: self.clone(),
            caller: account,
        }
    }

    pub fn contract_id(&self) -> ContractId {
        self.inner.borrow().contract.id.clone()
    }

    pub fn treasury(&self) -> AccountId {
        self.inner.borrow().contract.treasury.clone()
    }

    pub fn fund(&self, account: &AccountId, amount: Amount) {
        let mut inner = self.inner.borrow_mut();
        let balance = inner.contract.balances.entry(account.clone()).or_default();
        *balance = balance.checked_add(amount).unwrap_or(*balance);
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.inner.borrow().contract.balance_of(account)
    }

    /// Fees collected by the contract.
    pub fn pool(&self) -> Amount {
        self.inner.borrow().contract.pool
    }

    pub fn treasures(&self) -> HashSet<Location> {
        self.inner.borrow().contract.treasures.clone()
    }

    pub fn revealed(&self) -> RevealedMap {
        self.inner.borrow().contract.revealed.iter().copied().collect()
    }

    /// Fail every call to `entrypoint` with `error` until cleared.
    pub fn fail_always(&self, entrypoint: &str, error: LedgerError) {
        self.set_fault(entrypoint, error, true);
    }

    /// Fail only the next call to `entrypoint`.
    pub fn fail_once(&self, entrypoint: &str, error: LedgerError) {
        self.set_fault(entrypoint, error, false);
    }

    pub fn clear_faults(&self) {
        self.inner.borrow_mut().faults.clear();
    }

    /// Leave the most recent `lag` reveals out of `get_revealed`, like an
    /// indexer that has not caught up yet.
    pub fn set_index_lag(&self, lag: usize) {
        self.inner.borrow_mut().index_lag = lag;
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.inner.borrow().journal.clone()
    }

    pub fn calls_to(&self, entrypoint: &str) -> usize {
        self.inner
            .borrow()
            .journal
            .iter()
            .filter(|entry| entry.entrypoint == entrypoint)
            .count()
    }

    fn set_fault(&self, entrypoint: &str, error: LedgerError, sticky: bool) {
        self.inner
            .borrow_mut()
            .faults
            .insert(entrypoint.to_string(), Fault { error, sticky });
    }

    fn record(&self, caller: &AccountId, entrypoint: &str, args: &[Value], options: &CallOptions) -> Result<(), LedgerError> {
        let mut inner = self.inner.borrow_mut();
        inner.journal.push(JournalEntry {
            caller: caller.clone(),
            entrypoint: entrypoint.to_string(),
            args: args.to_vec(),
            options: options.clone(),
        });

        let Some(fault) = inner.faults.get(entrypoint).cloned() else {
            return Ok(());
        };
        if !fault.sticky {
            inner.faults.remove(entrypoint);
        }
        log::debug!("injected fault on {}: {}", entrypoint, fault.error);
        Err(fault.error)
    }

    fn execute(&self, caller: &AccountId, name: &str, args: Vec<Value>, options: CallOptions) -> Result<CallResult, LedgerError> {
        self.record(caller, name, &args, &options)?;

        let mut inner = self.inner.borrow_mut();
        if options.static_call {
            // dry run against a scratch copy
            let mut scratch = inner.contract.clone();
            let decoded = scratch.dispatch(caller, name, &args, &options, inner.index_lag)?;
            return Ok(CallResult::value(decoded));
        }

        let index_lag = inner.index_lag;
        let decoded = inner.contract.dispatch(caller, name, &args, &options, index_lag)?;
        if is_stateful(name) {
            inner.tx_counter += 1;
            Ok(CallResult::transaction(format!("th_mem{}", inner.tx_counter), decoded))
        } else {
            Ok(CallResult::value(decoded))
        }
    }
}

fn is_stateful(name: &str) -> bool {
    matches!(name, SET_TREASURES | REVEAL | RESET_GAME | TREASURY_PAYOUT)
}

fn arg<'a, T: Deserialize<'a>>(name: &str, args: &'a [Value], index: usize) -> Result<T, LedgerError> {
    let value = args
        .get(index)
        .ok_or_else(|| LedgerError::rejected(name, format!("missing argument {index}")))?;
    T::deserialize(value).map_err(|e| LedgerError::rejected(name, format!("bad argument {index}: {e}")))
}

impl ContractState {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(account);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                needed: amount,
                available,
            })?;
        self.balances.insert(account.clone(), remaining);
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, amount: Amount) {
        let balance = self.balances.entry(account.clone()).or_default();
        *balance = balance.checked_add(amount).unwrap_or(*balance);
    }

    fn dispatch(
        &mut self,
        caller: &AccountId,
        name: &str,
        args: &[Value],
        options: &CallOptions,
        index_lag: usize,
    ) -> Result<Value, LedgerError> {
        match name {
            SET_TREASURES => {
                let treasures: Vec<Location> = arg(name, args, 0)?;
                self.treasures = treasures.into_iter().collect();
                self.revealed.clear();
                self.paid.clear();
                Ok(Value::Null)
            }
            REVEAL => {
                let loc: Location = arg(name, args, 0)?;
                if self.treasures.is_empty() {
                    return Err(LedgerError::rejected(name, "treasures are not set"));
                }
                if options.amount != Some(self.reveal_fee) {
                    return Err(LedgerError::rejected(
                        name,
                        format!("reveal fee must be exactly {}", self.reveal_fee),
                    ));
                }
                if self.revealed.iter().any(|&(revealed, _)| revealed == loc) {
                    return Err(LedgerError::rejected(name, format!("{loc} already revealed")));
                }
                self.debit(caller, self.reveal_fee)?;
                self.pool = self.pool.checked_add(self.reveal_fee).unwrap_or(self.pool);
                self.revealed.push((loc, self.treasures.contains(&loc)));
                Ok(Value::Null)
            }
            REVEALED_AT => {
                let loc: Location = arg(name, args, 0)?;
                self.revealed
                    .iter()
                    .find(|&&(revealed, _)| revealed == loc)
                    .map(|&(_, is_treasure)| Value::Bool(is_treasure))
                    .ok_or_else(|| LedgerError::rejected(name, format!("{loc} not revealed")))
            }
            GET_REVEALED => {
                let visible = self.revealed.len().saturating_sub(index_lag);
                let map: RevealedMap = self.revealed[..visible].iter().copied().collect();
                Ok(map.to_value())
            }
            GET_REVEAL_FEE => Ok(self.reveal_fee.to_value()),
            GET_REWARD_AMOUNT => Ok(self.reward.to_value()),
            RESET_GAME => {
                self.treasures.clear();
                self.revealed.clear();
                self.paid.clear();
                Ok(Value::Null)
            }
            TREASURY_PAYOUT => {
                let recipient: AccountId = arg(name, args, 0)?;
                let loc: Location = arg(name, args, 1)?;
                if *caller != self.treasury {
                    return Err(LedgerError::rejected(name, "only the treasury may pay out"));
                }
                if !self.revealed.contains(&(loc, true)) {
                    return Err(LedgerError::rejected(name, format!("{loc} is not a revealed treasure")));
                }
                if self.paid.contains(&loc) {
                    return Err(LedgerError::rejected(name, format!("{loc} already paid out")));
                }
                let amount = options
                    .amount
                    .filter(|amount| !amount.is_zero())
                    .ok_or_else(|| LedgerError::rejected(name, "payout amount missing"))?;
                self.debit(caller, amount)?;
                self.credit(&recipient, amount);
                self.paid.insert(loc);
                Ok(Value::Null)
            }
            _ => Err(LedgerError::rejected(name, "unknown entrypoint")),
        }
    }
}

/// [`MemoryChain`] as seen from one account.
#[derive(Clone, Debug)]
pub struct MemoryLedger {
    chain: MemoryChain,
    caller: AccountId,
}

impl MemoryLedger {
    pub fn account(&self) -> &AccountId {
        &self.caller
    }

    pub fn chain(&self) -> &MemoryChain {
        &self.chain
    }
}

#[async_trait(?Send)]
impl Ledger for MemoryLedger {
    async fn call_entrypoint(
        &self,
        name: &str,
        args: Vec<Value>,
        options: CallOptions,
    ) -> Result<CallResult, LedgerError> {
        self.chain.execute(&self.caller, name, args, options)
    }

    async fn get_balance(&self, account: &AccountId) -> Result<Amount, LedgerError> {
        self.chain.record(&self.caller, BALANCE_QUERY, &[], &CallOptions::default())?;
        Ok(self.chain.balance_of(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    fn chain() -> (MemoryChain, AccountId) {
        let treasury = AccountId::parse("ak_treasury").unwrap();
        let chain = MemoryChain::new(
            ContractId::parse("ct_hunt").unwrap(),
            treasury.clone(),
            Amount::from(10u64),
            Amount::from(100u64),
        );
        chain.fund(&treasury, Amount::from(1_000u64));
        (chain, treasury)
    }

    fn call(ledger: &MemoryLedger, name: &str, args: Vec<Value>, options: CallOptions) -> Result<CallResult, LedgerError> {
        block_on(ledger.call_entrypoint(name, args, options))
    }

    #[test]
    fn reveal_charges_exact_fee_once() {
        let (chain, _) = chain();
        let player = AccountId::parse("ak_player").unwrap();
        chain.fund(&player, Amount::from(25u64));
        let ledger = chain.connect(player.clone());
        let loc = Location::new(1, 1);
        call(&ledger, SET_TREASURES, vec![json!([loc])], CallOptions::default()).unwrap();

        let wrong_fee = call(&ledger, REVEAL, vec![loc.to_value()], CallOptions::paying(Amount::from(9u64)));
        assert!(matches!(wrong_fee, Err(LedgerError::Rejected { .. })));

        let ok = call(&ledger, REVEAL, vec![loc.to_value()], CallOptions::paying(Amount::from(10u64))).unwrap();
        assert!(ok.tx_hash.is_some());
        assert_eq!(chain.balance_of(&player), Amount::from(15u64));
        assert_eq!(chain.pool(), Amount::from(10u64));

        let again = call(&ledger, REVEAL, vec![loc.to_value()], CallOptions::paying(Amount::from(10u64)));
        assert!(matches!(again, Err(LedgerError::Rejected { .. })));
        assert_eq!(chain.balance_of(&player), Amount::from(15u64));
    }

    #[test]
    fn reveal_without_funds_fails() {
        let (chain, _) = chain();
        let ledger = chain.connect(AccountId::parse("ak_broke").unwrap());
        call(&ledger, SET_TREASURES, vec![json!([{ "x": 0, "y": 0 }])], CallOptions::default()).unwrap();

        let res = call(&ledger, REVEAL, vec![json!({ "x": 1, "y": 0 })], CallOptions::paying(Amount::from(10u64)));

        assert!(matches!(res, Err(LedgerError::InsufficientFunds { .. })));
        assert!(chain.revealed().is_empty());
    }

    #[test]
    fn static_calls_leave_state_untouched() {
        let (chain, _) = chain();
        let player = AccountId::parse("ak_player").unwrap();
        chain.fund(&player, Amount::from(10u64));
        let ledger = chain.connect(player.clone());
        call(&ledger, SET_TREASURES, vec![json!([{ "x": 0, "y": 0 }])], CallOptions::default()).unwrap();

        let options = CallOptions {
            amount: Some(Amount::from(10u64)),
            static_call: true,
        };
        call(&ledger, REVEAL, vec![json!({ "x": 0, "y": 0 })], options).unwrap();

        assert!(chain.revealed().is_empty());
        assert_eq!(chain.balance_of(&player), Amount::from(10u64));
    }

    #[test]
    fn payout_is_treasury_only_and_once() {
        let (chain, treasury) = chain();
        let player = AccountId::parse("ak_player").unwrap();
        chain.fund(&player, Amount::from(10u64));
        let loc = Location::new(0, 0);
        let ledger = chain.connect(player.clone());
        call(&ledger, SET_TREASURES, vec![json!([loc])], CallOptions::default()).unwrap();
        call(&ledger, REVEAL, vec![loc.to_value()], CallOptions::paying(Amount::from(10u64))).unwrap();
        let args = vec![json!("ak_player"), loc.to_value()];

        let by_player = call(&ledger, TREASURY_PAYOUT, args.clone(), CallOptions::paying(Amount::from(100u64)));
        assert!(by_player.is_err());

        let treasury_ledger = chain.connect(treasury.clone());
        call(&treasury_ledger, TREASURY_PAYOUT, args.clone(), CallOptions::paying(Amount::from(100u64))).unwrap();
        assert_eq!(chain.balance_of(&player), Amount::from(100u64));
        assert_eq!(chain.balance_of(&treasury), Amount::from(900u64));

        assert!(call(&treasury_ledger, TREASURY_PAYOUT, args, CallOptions::paying(Amount::from(100u64))).is_err());
    }

    #[test]
    fn faults_and_index_lag() {
        let (chain, _) = chain();
        let player = AccountId::parse("ak_player").unwrap();
        chain.fund(&player, Amount::from(100u64));
        let ledger = chain.connect(player);
        call(&ledger, SET_TREASURES, vec![json!([{ "x": 0, "y": 0 }])], CallOptions::default()).unwrap();

        chain.fail_once(GET_REVEAL_FEE, LedgerError::Network("timeout".into()));
        assert!(call(&ledger, GET_REVEAL_FEE, vec![], CallOptions::static_call()).is_err());
        let fee = call(&ledger, GET_REVEAL_FEE, vec![], CallOptions::static_call()).unwrap();
        assert_eq!(decode_amount(&fee.decoded, "reveal fee"), Ok(Amount::from(10u64)));

        call(&ledger, REVEAL, vec![json!({ "x": 2, "y": 2 })], CallOptions::paying(Amount::from(10u64))).unwrap();
        chain.set_index_lag(1);
        let map = call(&ledger, GET_REVEALED, vec![], CallOptions::static_call()).unwrap();
        assert_eq!(decode_revealed_map(&map.decoded).unwrap().get(Location::new(2, 2)), None);
        assert_eq!(chain.calls_to(GET_REVEAL_FEE), 2);
    }
}
