//! Boundary between the game loop and the wallet collaborators
//!
//! A run starts only after the token spend resolves, and a finished run's
//! score can be claimed as an NFT at most once per account. The wallet,
//! token contract and NFT contract live behind [`PaymentGate`] and
//! [`ScoreMinter`].
//!
//! Both async operations come in two halves (`begin_payment` /
//! `finish_payment`, `prepare_claim` / `complete_claim`) so a host that
//! shares the session between callbacks never has to hold it across an
//! await. [`Session::pay_to_start`] and [`Session::claim`] compose the halves.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use crate::error::{ArcadeError, AuthorizationError, CommandError};
use crate::highscores::BestScore;
use crate::settings::Settings;
use crate::sim::{
    Engine, FrameScheduler, FrameToken, Game, GamePhase, LoopHooks, PaidTicket, Runner,
    StepOutcome,
};
use crate::storage::KeyValueStore;

/// Token spend collaborator (wallet + token contract)
pub trait PaymentGate {
    /// Spend `amount` tokens from `account` to pay for one run
    fn spend(
        &self,
        account: &str,
        amount: u32,
    ) -> impl Future<Output = Result<(), AuthorizationError>>;
}

/// NFT mint collaborator (wallet + NFT contract)
pub trait ScoreMinter {
    /// Mint the NFT for `score` to `account`
    fn mint(
        &self,
        account: &str,
        score: u32,
    ) -> impl Future<Output = Result<(), AuthorizationError>>;
}

/// Scores already claimed, per account
///
/// Accounts compare case-insensitively (hex addresses).
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    claimed: BTreeMap<String, BTreeSet<u32>>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(account: &str) -> String {
        account.to_lowercase()
    }

    pub fn is_claimed(&self, account: &str, score: u32) -> bool {
        self.claimed
            .get(&Self::key(account))
            .is_some_and(|scores| scores.contains(&score))
    }

    /// Returns false if the score was already recorded
    pub fn record(&mut self, account: &str, score: u32) -> bool {
        self.claimed.entry(Self::key(account)).or_default().insert(score)
    }

    /// Claimed scores of one account, ascending
    pub fn claimed(&self, account: &str) -> Vec<u32> {
        self.claimed
            .get(&Self::key(account))
            .map(|scores| scores.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// A token spend the session is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub account: String,
    pub amount: u32,
}

/// A mint the session has approved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub account: String,
    pub score: u32,
}

/// Forwards notifications and remembers the game over
struct Tap<'a> {
    inner: &'a mut dyn LoopHooks,
    game_over: Option<u32>,
}

impl LoopHooks for Tap<'_> {
    fn on_score_changed(&mut self, score: u32) {
        self.inner.on_score_changed(score);
    }

    fn on_game_over(&mut self, final_score: u32) {
        self.game_over = Some(final_score);
        self.inner.on_game_over(final_score);
    }
}

/// One game instance as the surrounding application sees it
pub struct Session<G: Game, S: FrameScheduler> {
    runner: Runner<G, S>,
    store: Box<dyn KeyValueStore>,
    settings: Settings,
    best: BestScore,
    account: Option<String>,
    paying: bool,
    claiming: Option<u32>,
    final_score: Option<u32>,
}

impl<G: Game, S: FrameScheduler> Session<G, S> {
    pub fn new(game: G, scheduler: S, store: Box<dyn KeyValueStore>, settings: Settings) -> Self {
        let best = BestScore::load(store.as_ref(), game.variant());
        Self {
            runner: Runner::new(Engine::new(game), scheduler),
            store,
            settings,
            best,
            account: None,
            paying: false,
            claiming: None,
            final_score: None,
        }
    }

    pub fn connect(&mut self, account: impl Into<String>) {
        let account = account.into();
        log::info!("Wallet connected: {}", account);
        self.account = Some(account);
    }

    pub fn disconnect(&mut self) {
        if self.account.take().is_some() {
            log::info!("Wallet disconnected");
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn engine(&self) -> &Engine<G> {
        self.runner.engine()
    }

    pub fn phase(&self) -> GamePhase {
        self.runner.engine().phase()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        self.runner.scheduler_mut()
    }

    /// Frame the session is waiting for
    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.runner.pending()
    }

    pub fn payment_in_flight(&self) -> bool {
        self.paying
    }

    /// Score of the last run that ended on its own, if any
    pub fn final_score(&self) -> Option<u32> {
        self.final_score
    }

    pub fn best_score(&self) -> u32 {
        self.best.value()
    }

    pub fn queue_input(&mut self, input: G::Input) {
        self.runner.engine_mut().queue_input(input);
    }

    /// Translate and queue a `KeyboardEvent.code`; returns whether it was used
    pub fn handle_key(&mut self, code: &str) -> bool {
        let input = self.runner.engine().game().map_key(code);
        if let Some(input) = input {
            self.queue_input(input);
        }
        input.is_some()
    }

    pub fn handle_pointer(&mut self, x: f32, y: f32) -> bool {
        let input = self.runner.engine().game().map_pointer(x, y);
        if let Some(input) = input {
            self.queue_input(input);
        }
        input.is_some()
    }

    /// First half of pay-to-start: validate and mark the payment in flight
    pub fn begin_payment(&mut self) -> Result<PaymentRequest, ArcadeError> {
        let account = self
            .account
            .clone()
            .ok_or(AuthorizationError::WalletNotConnected)?;
        if self.paying {
            log::warn!("Payment rejected: another payment is in flight");
            return Err(CommandError::PaymentInFlight.into());
        }
        if self.phase() == GamePhase::Running {
            log::warn!("Payment rejected: a run is in progress");
            return Err(CommandError::AlreadyRunning.into());
        }

        self.paying = true;
        let amount = self.settings.game_cost;
        log::info!("Requesting {} token(s) from {} to play", amount, account);
        Ok(PaymentRequest { account, amount })
    }

    /// Second half of pay-to-start: start the run if the spend succeeded
    ///
    /// Only valid after [`Session::begin_payment`]. On failure the previous
    /// world is left untouched.
    pub fn finish_payment(
        &mut self,
        result: Result<(), AuthorizationError>,
        seed: u64,
    ) -> Result<(), ArcadeError> {
        if !self.paying {
            log::warn!("Payment result ignored: no payment was requested");
            return Err(CommandError::NoPaymentInFlight.into());
        }
        self.paying = false;
        if let Err(e) = result {
            log::warn!("Payment failed: {}", e);
            return Err(e.into());
        }

        self.runner.begin(PaidTicket::new(), self.settings.seed_or(seed))?;
        self.final_score = None;
        Ok(())
    }

    /// Pay for a run through `gate`, then start it
    pub async fn pay_to_start<P: PaymentGate>(&mut self, gate: &P, seed: u64) -> Result<(), ArcadeError> {
        let request = self.begin_payment()?;
        let result = gate.spend(&request.account, request.amount).await;
        self.finish_payment(result, seed)
    }

    /// Host callback for a scheduled frame
    pub fn on_frame(&mut self, token: FrameToken, now_ms: f64, hooks: &mut dyn LoopHooks) -> StepOutcome {
        let mut tap = Tap {
            inner: hooks,
            game_over: None,
        };
        let outcome = self.runner.on_frame(token, now_ms, &mut tap);
        if let Some(score) = tap.game_over {
            self.on_terminal(score);
        }
        outcome
    }

    fn on_terminal(&mut self, score: u32) {
        self.final_score = Some(score);
        if let Err(e) = self.best.submit(score, self.store.as_mut()) {
            log::warn!("Could not save best score: {}", e);
        }
    }

    /// Tear the run down; the pending frame is cancelled and no hook fires
    pub fn stop(&mut self) -> bool {
        self.runner.stop()
    }

    pub fn reset(&mut self) -> Result<(), CommandError> {
        self.runner.engine_mut().reset()?;
        self.final_score = None;
        Ok(())
    }

    pub fn can_claim(&self, ledger: &ClaimLedger) -> bool {
        match (self.final_score, self.account.as_deref()) {
            (Some(score), Some(account)) => {
                self.phase() == GamePhase::Over
                    && score > 0
                    && self.claiming.is_none()
                    && !ledger.is_claimed(account, score)
            }
            _ => false,
        }
    }

    pub fn claim_in_flight(&self) -> Option<u32> {
        self.claiming
    }

    /// First half of a claim: every local guard, no collaborator call
    ///
    /// Marks the claim in flight until [`Session::complete_claim`].
    pub fn prepare_claim(&mut self, ledger: &ClaimLedger, score: u32) -> Result<ClaimRequest, ArcadeError> {
        if let Some(pending) = self.claiming {
            log::warn!("Claim rejected: score {} is still being minted", pending);
            return Err(CommandError::ClaimInFlight(pending).into());
        }
        if self.phase() != GamePhase::Over || score == 0 || self.final_score != Some(score) {
            log::warn!("Claim rejected: score {} is not claimable", score);
            return Err(CommandError::NothingToClaim(score).into());
        }
        let account = self
            .account
            .clone()
            .ok_or(AuthorizationError::WalletNotConnected)?;
        if ledger.is_claimed(&account, score) {
            log::warn!("Claim rejected: score {} already claimed by {}", score, account);
            return Err(CommandError::AlreadyClaimed(score).into());
        }
        self.claiming = Some(score);
        Ok(ClaimRequest { account, score })
    }

    /// Second half of a claim: record the score if the mint succeeded
    pub fn complete_claim(
        &mut self,
        ledger: &mut ClaimLedger,
        request: ClaimRequest,
        result: Result<(), AuthorizationError>,
    ) -> Result<(), ArcadeError> {
        self.claiming = None;
        if let Err(e) = result {
            log::warn!("Mint for score {} failed: {}", request.score, e);
            return Err(e.into());
        }
        ledger.record(&request.account, request.score);
        log::info!("Score {} claimed by {}", request.score, request.account);
        Ok(())
    }

    /// Mint the NFT for the finished run's `score` through `minter`
    pub async fn claim<M: ScoreMinter>(
        &mut self,
        ledger: &mut ClaimLedger,
        minter: &M,
        score: u32,
    ) -> Result<(), ArcadeError> {
        let request = self.prepare_claim(ledger, score)?;
        let result = minter.mint(&request.account, request.score).await;
        self.complete_claim(ledger, request, result)
    }
}
