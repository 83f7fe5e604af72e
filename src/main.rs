//! Dragon Arcade entry point
//!
//! The browser build mounts one game on the page and talks to the wallet
//! through a small JS shim. The native build is a headless demo: it pays
//! from a fake wallet, lets the autopilot play and claims the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::future::Future;
    use std::rc::{Rc, Weak};

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    use dragon_arcade::bridge::ClaimLedger;
    use dragon_arcade::games::{Car, Dragon, Paddle, Snake};
    use dragon_arcade::sim::{FrameScheduler, FrameToken, Game, GamePhase, LoopHooks};
    use dragon_arcade::storage::{KeyValueStore, LocalStorage, MemoryStore};
    use dragon_arcade::{
        AuthorizationError, PaymentGate, ScoreMinter, Session, Settings, Tuning, Variant,
    };

    // The page provides `window.arcadeWallet` (account, spend, mint) and
    // `window.arcadeRender` (draws one world snapshot)
    #[wasm_bindgen(inline_js = "
        export function wallet_account() {
            const wallet = window.arcadeWallet;
            return wallet && wallet.account ? wallet.account() : null;
        }

        export async function spend_tokens(account, amount) {
            await window.arcadeWallet.spend(account, amount);
        }

        export async function mint_score(account, score) {
            await window.arcadeWallet.mint(account, score);
        }

        export function render_world(variant, json) {
            if (window.arcadeRender) {
                window.arcadeRender(variant, JSON.parse(json));
            }
        }
    ")]
    extern "C" {
        fn wallet_account() -> Option<String>;
        #[wasm_bindgen(catch)]
        async fn spend_tokens(account: &str, amount: u32) -> Result<JsValue, JsValue>;
        #[wasm_bindgen(catch)]
        async fn mint_score(account: &str, score: u32) -> Result<JsValue, JsValue>;
        fn render_world(variant: &str, json: &str);
    }

    /// EIP-1193 "user rejected request"
    const USER_REJECTED: f64 = 4001.0;

    fn authorization_error(err: JsValue) -> AuthorizationError {
        let field = |name: &str| js_sys::Reflect::get(&err, &JsValue::from_str(name)).ok();
        if field("code").and_then(|c| c.as_f64()) == Some(USER_REJECTED) {
            return AuthorizationError::Cancelled;
        }
        let message = err
            .as_string()
            .or_else(|| field("message").and_then(|m| m.as_string()))
            .unwrap_or_else(|| "unknown wallet error".to_string());
        AuthorizationError::Rejected(message)
    }

    /// Wallet reached through the page shim
    struct BrowserWallet;

    impl PaymentGate for BrowserWallet {
        fn spend(
            &self,
            account: &str,
            amount: u32,
        ) -> impl Future<Output = Result<(), AuthorizationError>> {
            let account = account.to_string();
            async move {
                spend_tokens(&account, amount)
                    .await
                    .map(|_| ())
                    .map_err(authorization_error)
            }
        }
    }

    impl ScoreMinter for BrowserWallet {
        fn mint(
            &self,
            account: &str,
            score: u32,
        ) -> impl Future<Output = Result<(), AuthorizationError>> {
            let account = account.to_string();
            async move {
                mint_score(&account, score)
                    .await
                    .map(|_| ())
                    .map_err(authorization_error)
            }
        }
    }

    /// `requestAnimationFrame` behind the frame scheduler
    struct RafScheduler {
        next: u64,
        current: Option<(FrameToken, i32)>,
        fire: Rc<dyn Fn(FrameToken, f64)>,
    }

    impl RafScheduler {
        fn new(fire: Rc<dyn Fn(FrameToken, f64)>) -> Self {
            Self {
                next: 0,
                current: None,
                fire,
            }
        }
    }

    impl FrameScheduler for RafScheduler {
        fn request(&mut self) -> FrameToken {
            self.next += 1;
            let token = FrameToken(self.next);
            let fire = self.fire.clone();
            let callback = Closure::once_into_js(move |now: f64| fire(token, now));
            match web_sys::window()
                .and_then(|w| w.request_animation_frame(callback.unchecked_ref()).ok())
            {
                Some(handle) => self.current = Some((token, handle)),
                None => log::error!("requestAnimationFrame failed"),
            }
            token
        }

        fn cancel(&mut self, token: FrameToken) {
            if let Some((current, handle)) = self.current {
                if current == token {
                    if let Some(window) = web_sys::window() {
                        let _ = window.cancel_animation_frame(handle);
                    }
                    self.current = None;
                }
            }
        }
    }

    type Shared<G> = Rc<RefCell<Session<G, RafScheduler>>>;

    fn element(id: &str) -> Option<web_sys::Element> {
        web_sys::window()?.document()?.get_element_by_id(id)
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = element(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        if let Some(el) = element(id) {
            let _ = el.set_attribute("class", if hidden { "hidden" } else { "" });
        }
    }

    /// HUD updates driven by the loop
    struct HudHooks;

    impl LoopHooks for HudHooks {
        fn on_score_changed(&mut self, score: u32) {
            set_text("score", &score.to_string());
        }

        fn on_game_over(&mut self, final_score: u32) {
            set_text("final-score", &final_score.to_string());
            set_hidden("game-over", false);
        }
    }

    fn draw<G: Game>(session: &Session<G, RafScheduler>, ledger: &ClaimLedger) {
        match serde_json::to_string(session.engine().world()) {
            Ok(json) => render_world(session.engine().game().variant().as_str(), &json),
            Err(e) => log::error!("Could not encode world: {}", e),
        }
        set_text("best-score", &session.best_score().to_string());
        set_hidden("claim-btn", !session.can_claim(ledger));
    }

    fn on_frame<G: Game>(session: &RefCell<Session<G, RafScheduler>>, ledger: &RefCell<ClaimLedger>, token: FrameToken, now: f64) {
        let mut session = session.borrow_mut();
        if session.settings().autopilot && session.phase() == GamePhase::Running {
            let input = session.engine().game().autopilot(session.engine().world());
            if let Some(input) = input {
                session.queue_input(input);
            }
        }
        session.on_frame(token, now, &mut HudHooks);
        draw(&session, &ledger.borrow());
    }

    fn sync_wallet<G: Game>(session: &Shared<G>) {
        match wallet_account() {
            Some(account) if session.borrow().account() != Some(account.as_str()) => {
                session.borrow_mut().connect(account)
            }
            Some(_) => {}
            None => session.borrow_mut().disconnect(),
        }
    }

    fn start_paid_run<G: Game + 'static>(session: Shared<G>) {
        sync_wallet(&session);
        let begun = session.borrow_mut().begin_payment();
        let request = match begun {
            Ok(request) => request,
            Err(e) => {
                set_text("message", &e.to_string());
                return;
            }
        };
        set_text("message", "Waiting for payment...");

        spawn_local(async move {
            let result = BrowserWallet.spend(&request.account, request.amount).await;
            let seed = js_sys::Date::now() as u64;
            let started = session.borrow_mut().finish_payment(result, seed);
            match started {
                Ok(()) => {
                    set_text("message", "");
                    set_text("score", "0");
                    set_hidden("game-over", true);
                }
                Err(e) => set_text("message", &e.to_string()),
            }
        });
    }

    fn claim_score<G: Game + 'static>(session: Shared<G>, ledger: Rc<RefCell<ClaimLedger>>) {
        sync_wallet(&session);
        let prepared = {
            let mut session = session.borrow_mut();
            let score = session.final_score().unwrap_or(0);
            session.prepare_claim(&ledger.borrow(), score)
        };
        let request = match prepared {
            Ok(request) => request,
            Err(e) => {
                set_text("message", &e.to_string());
                return;
            }
        };
        set_text("message", "Minting score NFT...");

        spawn_local(async move {
            let result = BrowserWallet.mint(&request.account, request.score).await;
            let score = request.score;
            let done = session
                .borrow_mut()
                .complete_claim(&mut ledger.borrow_mut(), request, result);
            match done {
                Ok(()) => set_text("message", &format!("Score {} claimed!", score)),
                Err(e) => set_text("message", &e.to_string()),
            }
            draw(&session.borrow(), &ledger.borrow());
        });
    }

    fn mount<G: Game + 'static>(game: G, store: Box<dyn KeyValueStore>, settings: Settings) {
        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");
        let variant = game.variant();
        let ledger = Rc::new(RefCell::new(ClaimLedger::new()));

        let session: Shared<G> = Rc::new_cyclic(|weak: &Weak<RefCell<Session<G, RafScheduler>>>| {
            let weak = weak.clone();
            let frame_ledger = ledger.clone();
            let fire: Rc<dyn Fn(FrameToken, f64)> = Rc::new(move |token: FrameToken, now: f64| {
                if let Some(session) = weak.upgrade() {
                    on_frame(&session, &frame_ledger, token, now);
                }
            });
            RefCell::new(Session::new(game, RafScheduler::new(fire), store, settings))
        });
        sync_wallet(&session);
        draw(&session.borrow(), &ledger.borrow());

        // Keyboard: game controls, Space/Enter pays for a run when idle
        {
            let session = session.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let code = event.code();
                let running = {
                    let mut s = session.borrow_mut();
                    if s.handle_key(&code) {
                        event.prevent_default();
                    }
                    s.phase() == GamePhase::Running
                };
                if !running && (code == "Space" || code == "Enter") {
                    event.prevent_default();
                    start_paid_run(session.clone());
                }
            });
            let _ = document.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(canvas) = document.get_element_by_id("canvas") {
            {
                let session = session.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::MouseEvent| {
                    let (x, y) = (event.offset_x() as f32, event.offset_y() as f32);
                    session.borrow_mut().handle_pointer(x, y);
                });
                let _ = canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
                closure.forget();
            }

            // Only the paddle follows the pointer continuously
            if variant == Variant::Paddle {
                let session = session.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::MouseEvent| {
                    let (x, y) = (event.offset_x() as f32, event.offset_y() as f32);
                    session.borrow_mut().handle_pointer(x, y);
                });
                let _ = canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }

        if let Some(btn) = document.get_element_by_id("play-btn") {
            let session = session.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                start_paid_run(session.clone());
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("claim-btn") {
            let session = session.clone();
            let ledger = ledger.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                claim_score(session.clone(), ledger.clone());
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Leaving the page tears the run down; no frame fires afterwards
        {
            let session = session.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                session.borrow_mut().stop();
            });
            let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        log::info!("{} mounted", variant);
    }

    /// `?game=car` picks the game; dragon otherwise
    fn query_variant() -> Variant {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok())
            .and_then(|params| params.get("game"))
            .and_then(|name| Variant::from_name(&name))
            .unwrap_or(Variant::Dragon)
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        let store: Box<dyn KeyValueStore> = match LocalStorage::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("{}; scores will not persist", e);
                Box::new(MemoryStore::new())
            }
        };
        let settings = Settings::load(store.as_ref());
        if let Ok(level) = settings.log_level.parse::<log::LevelFilter>() {
            log::set_max_level(level);
        }

        let tuning = Tuning::default();
        match query_variant() {
            Variant::Dragon => mount(Dragon::from_tuning(&tuning), store, settings),
            Variant::Car => mount(Car::from_tuning(&tuning), store, settings),
            Variant::Snake => mount(Snake::from_tuning(&tuning), store, settings),
            Variant::Paddle => mount(Paddle::from_tuning(&tuning), store, settings),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::cell::Cell;
    use std::future::{Future, ready};
    use std::path::PathBuf;

    use dragon_arcade::consts::FRAME_MS;
    use dragon_arcade::error::ConfigError;
    use dragon_arcade::games::{Car, Dragon, Paddle, Snake};
    use dragon_arcade::leaderboard::{self, SortKey, UserRecord};
    use dragon_arcade::sim::{Game, GamePhase, LogHooks, ManualScheduler, StepOutcome};
    use dragon_arcade::storage::{JsonFileStore, KeyValueStore};
    use dragon_arcade::{
        ArcadeError, AuthorizationError, ClaimLedger, PaymentGate, ScoreMinter, Session, Settings,
        Tuning, Variant,
    };

    const USAGE: &str =
        "usage: dragon-arcade [dragon|car|snake|paddle] [--tuning FILE] [--store FILE] [--frames N]";
    const DEMO_ACCOUNT: &str = "0xdemo000000000000000000000000000000000001";
    const DEMO_BALANCE: u32 = 10;
    const DEFAULT_FRAMES: u64 = 60 * 60;

    struct Args {
        variant: Variant,
        tuning: Option<PathBuf>,
        store: PathBuf,
        frames: u64,
    }

    impl Args {
        fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ConfigError> {
            let mut parsed = Self {
                variant: Variant::Dragon,
                tuning: None,
                store: PathBuf::from("dragon-arcade.json"),
                frames: DEFAULT_FRAMES,
            };
            while let Some(arg) = args.next() {
                let mut value = || {
                    args.next()
                        .ok_or_else(|| ConfigError::Argument(format!("{} needs a value\n{}", arg, USAGE)))
                };
                match arg.as_str() {
                    "--tuning" => parsed.tuning = Some(PathBuf::from(value()?)),
                    "--store" => parsed.store = PathBuf::from(value()?),
                    "--frames" => {
                        let raw = value()?;
                        parsed.frames = raw
                            .parse()
                            .map_err(|_| ConfigError::Argument(format!("--frames {}", raw)))?;
                    }
                    name if !name.starts_with('-') => {
                        parsed.variant = Variant::from_name(name)
                            .ok_or_else(|| ConfigError::UnknownVariant(name.to_string()))?;
                    }
                    other => return Err(ConfigError::Argument(format!("{}\n{}", other, USAGE))),
                }
            }
            Ok(parsed)
        }
    }

    /// Wallet with a fixed token balance that signs everything
    struct DemoWallet {
        balance: Cell<u32>,
    }

    impl PaymentGate for DemoWallet {
        fn spend(
            &self,
            account: &str,
            amount: u32,
        ) -> impl Future<Output = Result<(), AuthorizationError>> {
            let balance = self.balance.get();
            let result = if balance < amount {
                Err(AuthorizationError::InsufficientBalance {
                    required: amount,
                    balance,
                })
            } else {
                self.balance.set(balance - amount);
                log::info!("{} spent {} token(s), {} left", account, amount, balance - amount);
                Ok(())
            };
            ready(result)
        }
    }

    impl ScoreMinter for DemoWallet {
        fn mint(
            &self,
            account: &str,
            score: u32,
        ) -> impl Future<Output = Result<(), AuthorizationError>> {
            log::info!("Minted score NFT {} to {}", score, account);
            ready(Ok(()))
        }
    }

    fn play<G: Game>(game: G, store: Box<dyn KeyValueStore>, settings: Settings, frames: u64) -> Result<(), ArcadeError> {
        let variant = game.variant();
        let wallet = DemoWallet {
            balance: Cell::new(DEMO_BALANCE),
        };
        let mut session = Session::new(game, ManualScheduler::new(), store, settings);
        session.connect(DEMO_ACCOUNT);
        log::info!("{}: best score so far {}", variant, session.best_score());

        pollster::block_on(session.pay_to_start(&wallet, rand::random()))?;

        let mut hooks = LogHooks;
        let mut now = 0.0;
        for _ in 0..frames {
            // Whole milliseconds so a 60 Hz gate accepts every frame
            now += FRAME_MS.ceil();
            // Headless: the autopilot is the only player
            let input = session.engine().game().autopilot(session.engine().world());
            if let Some(input) = input {
                session.queue_input(input);
            }
            let Some(token) = session.scheduler_mut().pop_due() else {
                break;
            };
            match session.on_frame(token, now, &mut hooks) {
                StepOutcome::Finished(cause) => {
                    log::info!("{}: run ended ({:?})", variant, cause);
                    break;
                }
                StepOutcome::Faulted(fault) => return Err(fault.into()),
                _ => {}
            }
        }

        if session.phase() == GamePhase::Running {
            log::info!("{}: frame limit reached at score {}", variant, session.engine().score());
            session.stop();
            return Ok(());
        }

        let mut ledger = ClaimLedger::new();
        if let Some(score) = session.final_score().filter(|_| session.can_claim(&ledger)) {
            pollster::block_on(session.claim(&mut ledger, &wallet, score))?;
        }

        let scores = ledger.claimed(DEMO_ACCOUNT);
        let records = [UserRecord {
            address: DEMO_ACCOUNT.to_string(),
            total_nfts: scores.len() as u32,
            scores,
        }];
        for entry in leaderboard::rank(&records, SortKey::TotalNfts, Some(DEMO_ACCOUNT)) {
            log::info!(
                "#{} {} nfts={} unique={} {:?}",
                entry.rank,
                entry.short_address(),
                entry.total_nfts,
                entry.unique_scores,
                entry.scores
            );
        }
        log::info!("{}: best score {}", variant, session.best_score());
        Ok(())
    }

    pub fn run() -> Result<(), ArcadeError> {
        let args = Args::parse(std::env::args().skip(1))?;
        let mut store = JsonFileStore::open(&args.store)?;
        let settings = Settings::load(&store).with_env();

        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
        )
        .init();
        log::info!("Dragon Arcade (native) starting, store {}", store.path().display());

        settings.save(&mut store)?;
        let tuning = match &args.tuning {
            Some(path) => Tuning::load_file(path)?,
            None => Tuning::default(),
        };

        let store: Box<dyn KeyValueStore> = Box::new(store);
        match args.variant {
            Variant::Dragon => play(Dragon::from_tuning(&tuning), store, settings, args.frames),
            Variant::Car => play(Car::from_tuning(&tuning), store, settings, args.frames),
            Variant::Snake => play(Snake::from_tuning(&tuning), store, settings, args.frames),
            Variant::Paddle => play(Paddle::from_tuning(&tuning), store, settings, args.frames),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(args: &[&str]) -> Result<Args, ConfigError> {
            Args::parse(args.iter().map(|s| s.to_string()))
        }

        #[test]
        fn test_defaults() {
            let args = parse(&[]).unwrap();
            assert_eq!(args.variant, Variant::Dragon);
            assert_eq!(args.frames, DEFAULT_FRAMES);
            assert!(args.tuning.is_none());
        }

        #[test]
        fn test_flags_and_variant() {
            let args = parse(&["snake", "--frames", "120", "--store", "x.json"]).unwrap();
            assert_eq!(args.variant, Variant::Snake);
            assert_eq!(args.frames, 120);
            assert_eq!(args.store, PathBuf::from("x.json"));
        }

        #[test]
        fn test_bad_input() {
            assert!(matches!(parse(&["tetris"]), Err(ConfigError::UnknownVariant(_))));
            assert!(matches!(parse(&["--frames"]), Err(ConfigError::Argument(_))));
            assert!(matches!(parse(&["--frames", "many"]), Err(ConfigError::Argument(_))));
            assert!(matches!(parse(&["--volume", "3"]), Err(ConfigError::Argument(_))));
        }

        #[test]
        fn test_demo_wallet_runs_dry() {
            let wallet = DemoWallet {
                balance: Cell::new(1),
            };
            assert_eq!(pollster::block_on(wallet.spend("0x1", 1)), Ok(()));
            assert_eq!(
                pollster::block_on(wallet.spend("0x1", 1)),
                Err(AuthorizationError::InsufficientBalance {
                    required: 1,
                    balance: 0
                })
            );
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = native::run() {
        // The logger may not be up yet
        eprintln!("error: {}", e);
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
