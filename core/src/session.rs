use core::cell::{Cell, RefCell};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use treasure_protocol::entrypoint::*;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// No treasures placed yet, or the round was reset.
    AwaitingPlacement,
    Active,
    /// A bomb was revealed.
    Over,
}

impl RoundStatus {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl Default for RoundStatus {
    fn default() -> Self {
        Self::AwaitingPlacement
    }
}

#[derive(Clone, Debug)]
struct Round {
    board: Board,
    bombs: HashSet<Location>,
    status: RoundStatus,
    /// Bumped on every placement and reset so late settlements can tell they
    /// belong to an earlier round.
    generation: u64,
}

/// One player's treasure hunt against one contract instance.
///
/// All operations take `&self` so reveals of different tiles can be driven
/// concurrently from the same task; the board, round status and in-flight set
/// are only borrowed between ledger calls, never across them.
pub struct HuntSession<L, T> {
    config: HuntConfig,
    ledger: L,
    treasury: T,
    player: AccountId,
    contract: ContractId,
    round: RefCell<Round>,
    in_flight: InFlight,
    sampler: RefCell<LocationSampler>,
    balance: Cell<Option<Amount>>,
}

impl<L: Ledger, T: Treasury> HuntSession<L, T> {
    pub fn new(
        config: HuntConfig,
        ledger: L,
        treasury: T,
        player: AccountId,
        contract: ContractId,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let size = config.size();
        log::info!(
            "session for {} on {}, {}x{} board, {} bombs",
            player,
            contract,
            size.0,
            size.1,
            config.bomb_count
        );
        Ok(Self {
            round: RefCell::new(Round {
                board: Board::new(size),
                bombs: HashSet::new(),
                status: RoundStatus::default(),
                generation: 0,
            }),
            in_flight: InFlight::default(),
            sampler: RefCell::new(LocationSampler::new(seed, size)),
            balance: Cell::new(None),
            config,
            ledger,
            treasury,
            player,
            contract,
        })
    }

    /// Ends the session and hands back the ledger and treasury handles.
    pub fn dispose(self) -> (L, T) {
        log::info!("session for {} disposed", self.player);
        (self.ledger, self.treasury)
    }

    pub fn config(&self) -> &HuntConfig {
        &self.config
    }

    pub fn player(&self) -> &AccountId {
        &self.player
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn status(&self) -> RoundStatus {
        self.round.borrow().status
    }

    pub fn board(&self) -> Board {
        self.round.borrow().board.clone()
    }

    pub fn cell(&self, loc: Location) -> Result<CellState> {
        self.round.borrow().board.get(loc)
    }

    pub fn bombs(&self) -> HashSet<Location> {
        self.round.borrow().bombs.clone()
    }

    /// Last balance seen by the session.
    pub fn balance(&self) -> Option<Amount> {
        self.balance.get()
    }

    pub fn settlement_phase(&self, loc: Location) -> Option<SettlementPhase> {
        self.in_flight.phase(loc)
    }

    pub async fn refresh_balance(&self) -> Result<Amount> {
        let balance = self
            .ledger
            .get_balance(&self.player)
            .await
            .map_err(HuntError::BalanceQuery)?;
        self.balance.set(Some(balance));
        Ok(balance)
    }

    /// Places `count` treasures on the ledger and starts a new round.
    ///
    /// Bombs are only drawn once the ledger accepted the treasures; if it did
    /// not, the board, bombs and status are left as they were.
    pub async fn place_treasures(&self, count: CellCount) -> Result<Vec<Location>> {
        self.config.check_fits(count)?;

        let treasures = self.sampler.borrow_mut().sample_distinct(count, &HashSet::new())?;
        let encoded = Value::Array(treasures.iter().map(|loc| loc.to_value()).collect());
        self.ledger
            .call_entrypoint(SET_TREASURES, vec![encoded], CallOptions::default())
            .await
            .map_err(|err| {
                log::error!("placing {} treasures failed: {}", count, err);
                HuntError::Placement(err)
            })?;

        let treasure_set: HashSet<_> = treasures.iter().copied().collect();
        let bombs = self
            .sampler
            .borrow_mut()
            .sample_distinct(self.config.bomb_count, &treasure_set)?;

        let mut round = self.round.borrow_mut();
        round.board.reset(self.config.size());
        round.bombs = bombs.into_iter().collect();
        round.status = RoundStatus::Active;
        round.generation += 1;
        log::info!(
            "round {} started with {} treasures and {} bombs",
            round.generation,
            treasures.len(),
            round.bombs.len()
        );
        Ok(treasures)
    }

    /// Places the configured number of treasures.
    pub async fn start_round(&self) -> Result<Vec<Location>> {
        self.place_treasures(self.config.treasure_count).await
    }

    pub async fn reset_round(&self) -> Result<()> {
        self.ledger
            .call_entrypoint(RESET_GAME, Vec::new(), CallOptions::default())
            .await
            .map_err(HuntError::Reset)?;

        let mut round = self.round.borrow_mut();
        round.board.reset(self.config.size());
        round.bombs.clear();
        round.status = RoundStatus::AwaitingPlacement;
        round.generation += 1;
        log::info!("round reset, awaiting treasure placement");
        Ok(())
    }

    /// Reveals one tile and settles it.
    ///
    /// Bombs are resolved locally before anything is paid. Otherwise the
    /// reveal fee is paid on chain and the outcome is then read back with a
    /// separate query; the reveal transaction's own result is never used as
    /// the outcome. Treasures are paid out by the treasury, and the player's
    /// balance is refreshed last on a best-effort basis.
    ///
    /// Failures carry the step they happened in. [`HuntError::RevealTx`] is
    /// safe to retry. After [`HuntError::ResolutionQuery`] the fee may have
    /// been spent even though the tile stays unrevealed, so a retry may pay
    /// twice or be rejected by the ledger. [`HuntError::Payout`] leaves the
    /// tile shown as a treasure.
    pub async fn reveal_tile(&self, loc: Location) -> Result<RevealReport> {
        let (ticket, generation) = self.begin_reveal(loc)?;

        // bomb check, local only
        if let Some(report) = self.check_bomb(&ticket, generation) {
            return Ok(report);
        }

        ticket.advance(SettlementPhase::AwaitingChainReveal);
        self.submit_reveal(loc)
            .await
            .map_err(|source| ticket.fail(HuntError::RevealTx { location: loc, source }))?;

        ticket.advance(SettlementPhase::AwaitingResolution);
        let is_treasure = self
            .resolve(loc)
            .await
            .map_err(|source| ticket.fail(HuntError::ResolutionQuery { location: loc, source }))?;

        let outcome = if is_treasure {
            ticket.advance(SettlementPhase::TreasureConfirmed);
            RevealOutcome::Treasure
        } else {
            ticket.advance(SettlementPhase::EmptyConfirmed);
            RevealOutcome::Empty
        };
        self.settle_board(loc, outcome, generation);

        let payout = if is_treasure {
            ticket.advance(SettlementPhase::AwaitingPayout);
            let payout = self.pay_reward(loc).await;
            if payout.is_ok() {
                ticket.advance(SettlementPhase::PayoutConfirmed);
            }
            payout
        } else {
            Ok(())
        };

        // runs whether or not the payout went through
        ticket.advance(SettlementPhase::RefreshingBalance);
        let new_balance = match self.refresh_balance().await {
            Ok(balance) => Some(balance),
            Err(err) => {
                log::warn!("{}: {}", loc, err);
                None
            }
        };

        payout.map_err(|err| ticket.fail(err))?;
        ticket.advance(SettlementPhase::Settled);
        log::info!("{}: settled as {:?}", ticket.loc(), outcome);
        Ok(RevealReport { outcome, new_balance })
    }

    fn begin_reveal(&self, loc: Location) -> Result<(SettlementTicket<'_>, u64)> {
        let round = self.round.borrow();
        if !round.status.is_active() {
            return Err(HuntError::RoundNotActive);
        }
        if !round.board.get(loc)?.is_unrevealed() {
            return Err(HuntError::AlreadyRevealed(loc));
        }
        let ticket = self.in_flight.begin(loc)?;
        Ok((ticket, round.generation))
    }

    fn check_bomb(&self, ticket: &SettlementTicket<'_>, generation: u64) -> Option<RevealReport> {
        let loc = ticket.loc();
        let mut round = self.round.borrow_mut();
        if round.generation != generation || !round.bombs.contains(&loc) {
            return None;
        }

        if let Err(err) = round.board.set(loc, CellState::Bomb) {
            log::warn!("{}: could not mark bomb: {}", loc, err);
        }
        round.status = RoundStatus::Over;
        ticket.advance(SettlementPhase::BombResolved);
        log::info!("{}: bomb hit, round over", loc);
        Some(RevealReport {
            outcome: RevealOutcome::BombHit,
            new_balance: None,
        })
    }

    async fn submit_reveal(&self, loc: Location) -> core::result::Result<(), LedgerError> {
        let fee = match self.config.reveal_fee_override {
            Some(fee) => fee,
            None => self.query_amount(GET_REVEAL_FEE, "reveal fee").await?,
        };
        log::debug!("{}: paying reveal fee {}", loc, fee);
        let result = self
            .ledger
            .call_entrypoint(REVEAL, vec![loc.to_value()], CallOptions::paying(fee))
            .await?;
        log::debug!("{}: reveal accepted in {:?}", loc, result.tx_hash);
        Ok(())
    }

    async fn resolve(&self, loc: Location) -> core::result::Result<bool, ResolutionFailure> {
        let direct = match self
            .ledger
            .call_entrypoint(REVEALED_AT, vec![loc.to_value()], CallOptions::static_call())
            .await
        {
            Ok(result) => decode_bool(&result.decoded).map_err(ResolutionFailure::from),
            Err(err) => Err(err.into()),
        };
        let err = match direct {
            Ok(is_treasure) => return Ok(is_treasure),
            Err(err) => err,
        };

        log::debug!("{}: revealed_at unavailable ({}), scanning revealed map", loc, err);
        let result = self
            .ledger
            .call_entrypoint(GET_REVEALED, Vec::new(), CallOptions::static_call())
            .await?;
        let map = decode_revealed_map(&result.decoded)?;
        resolve_from_map(&map, loc, self.config.assume_consistent_index)
    }

    fn settle_board(&self, loc: Location, outcome: RevealOutcome, generation: u64) {
        let mut round = self.round.borrow_mut();
        if round.generation != generation {
            log::warn!(
                "{}: resolved as {:?} after the round changed, board left untouched",
                loc,
                outcome
            );
            return;
        }
        if let Err(err) = round.board.set(loc, outcome.cell_state()) {
            log::warn!("{}: could not settle board: {}", loc, err);
        }
    }

    async fn pay_reward(&self, loc: Location) -> Result<()> {
        let payout_err = |source: LedgerError| HuntError::Payout { location: loc, source };
        let reward = match self.config.reward_override {
            Some(reward) => reward,
            None => self
                .query_amount(GET_REWARD_AMOUNT, "reward amount")
                .await
                .map_err(payout_err)?,
        };

        let receipt = self
            .treasury
            .payout(&self.contract, &self.player, loc, reward)
            .await
            .map_err(payout_err)?;
        log::info!("{}: reward of {} paid in {:?}", loc, reward, receipt.tx_hash);
        Ok(())
    }

    async fn query_amount(&self, entrypoint: &str, label: &'static str) -> core::result::Result<Amount, LedgerError> {
        let result = self
            .ledger
            .call_entrypoint(entrypoint, Vec::new(), CallOptions::static_call())
            .await?;
        Ok(decode_amount(&result.decoded, label)?)
    }
}
