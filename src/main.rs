//! Rocket Discount entry point
//!
//! On the web this wires the page's buttons and labels to the round engine.
//! Natively it flies a few scripted rounds and logs them.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlButtonElement, HtmlElement};

    use rocket_discount::sim::{EngineEvent, EnginePhase, RoundEngine, Snapshot};
    use rocket_discount::{EngineConfig, LogObserver, Observer, Preset, format_percent};

    /// Game instance holding the engine
    struct Game {
        engine: RoundEngine,
    }

    /// Mirrors engine state into the DOM
    struct DomObserver {
        document: Document,
    }

    impl DomObserver {
        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn set_enabled(&self, id: &str, enabled: bool) {
            if let Some(btn) = self
                .document
                .get_element_by_id(id)
                .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok())
            {
                btn.set_disabled(!enabled);
            }
        }

        fn set_visible(&self, id: &str, visible: bool) {
            if let Some(el) = self
                .document
                .get_element_by_id(id)
                .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            {
                let display = if visible { "block" } else { "none" };
                let _ = el.style().set_property("display", display);
            }
        }

        fn status_text(snapshot: &Snapshot) -> String {
            match snapshot.phase {
                EnginePhase::Idle => "Press Ignite to launch".to_string(),
                EnginePhase::Countdown => "Press Ignite to join this flight".to_string(),
                EnginePhase::Active if snapshot.player_joined => {
                    "Cash out before it blows!".to_string()
                }
                EnginePhase::Active => "Spectating - join the next flight".to_string(),
                EnginePhase::Crashed => match snapshot.crash_point {
                    Some(point) => format!("Crashed at {}", format_percent(point)),
                    None => "Crashed!".to_string(),
                },
                EnginePhase::CashedOut => {
                    format!("Locked in {}", format_percent(snapshot.discount))
                }
            }
        }

        fn render(&self, snapshot: &Snapshot) {
            let discount = format_percent(snapshot.discount);
            self.set_text("ship-discount", &discount);
            self.set_text("current-discount", &format!("Current: {}", discount));
            self.set_text(
                "discount-display",
                &format!("Total: {}", format_percent(snapshot.accumulated_discount)),
            );
            self.set_text("status", &Self::status_text(snapshot));

            match snapshot.countdown_remaining {
                Some(secs) => {
                    self.set_text("countdown", &secs.to_string());
                    self.set_visible("countdown", true);
                }
                None => self.set_visible("countdown", false),
            }
            self.set_visible("explosion", snapshot.crashed);

            self.set_enabled("ignite", snapshot.can_ignite);
            self.set_enabled("cashout", snapshot.can_cash_out);
        }
    }

    impl Observer for DomObserver {
        fn notify(&mut self, _event: &EngineEvent, snapshot: &Snapshot) {
            self.render(snapshot);
        }
    }

    /// Config from `data-config` (JSON) or `data-preset` on the game container
    fn load_config(document: &Document) -> EngineConfig {
        let container = document.get_element_by_id("game-container");

        if let Some(json) = container.as_ref().and_then(|el| el.get_attribute("data-config")) {
            match EngineConfig::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded config from page");
                    return config;
                }
                Err(e) => log::warn!("Ignoring page config: {}", e),
            }
        }

        let preset = container
            .and_then(|el| el.get_attribute("data-preset"))
            .and_then(|name| Preset::from_str(&name))
            .unwrap_or_default();
        log::info!("Using {} preset", preset.as_str());
        EngineConfig::from_preset(preset)
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Rocket Discount starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let seed = js_sys::Date::now() as u64;
        let mut engine = match RoundEngine::new(load_config(&document), seed) {
            Ok(engine) => engine,
            Err(e) => {
                log::error!("Bad config ({}), falling back to Classic", e);
                RoundEngine::new(EngineConfig::default(), seed).expect("Classic config is valid")
            }
        };
        log::info!("Engine initialized with seed: {}", seed);

        let dom = DomObserver {
            document: document.clone(),
        };
        dom.render(&engine.snapshot());
        engine.subscribe(Box::new(dom));
        engine.subscribe(Box::new(LogObserver));
        engine.start(js_sys::Date::now());

        let game = Rc::new(RefCell::new(Game { engine }));

        setup_buttons(&document, game.clone());
        setup_keyboard(game.clone());

        request_animation_frame(game);

        log::info!("Rocket Discount running!");
    }

    fn on_click(document: &Document, id: &str, handler: impl FnMut(web_sys::MouseEvent) + 'static) {
        if let Some(btn) = document.get_element_by_id(id) {
            let closure = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(handler);
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            on_click(document, "ignite", move |_event| {
                game.borrow_mut().engine.ignite(js_sys::Date::now());
            });
        }
        on_click(document, "cashout", move |_event| {
            game.borrow_mut().engine.cash_out(js_sys::Date::now());
        });
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let mut g = game.borrow_mut();
            let now = js_sys::Date::now();
            match event.key().as_str() {
                " " => {
                    // Space does whatever is legal right now
                    if g.engine.can_ignite() {
                        g.engine.ignite(now);
                    } else {
                        g.engine.cash_out(now);
                    }
                }
                "Enter" | "c" | "C" => {
                    g.engine.cash_out(now);
                }
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |_time: f64| {
            game_loop(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>) {
        // Engine timers run on wall-clock time, not the frame timestamp
        game.borrow_mut().engine.advance(js_sys::Date::now());
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Rocket Discount (native) starting...");
    log::info!("Native mode flies a scripted demo - run with `trunk serve` for the web version");

    if let Err(e) = run_demo() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Fly a handful of rounds, cashing out at a fixed target
#[cfg(not(target_arch = "wasm32"))]
fn run_demo() -> Result<(), rocket_discount::ConfigError> {
    use rocket_discount::sim::{EnginePhase, RoundEngine};
    use rocket_discount::{EngineConfig, LogObserver, Preset, format_percent};

    const DEMO_ROUNDS: u32 = 8;
    const CASH_OUT_AT: f64 = 1.5;

    let mut engine = RoundEngine::new(EngineConfig::from_preset(Preset::Classic), 2024)?;
    engine.subscribe(Box::new(LogObserver));
    let tick = engine.config().tick_interval_ms;
    let mut now = 0.0;

    for _ in 0..DEMO_ROUNDS {
        engine.ignite(now);
        while engine.phase() == EnginePhase::Active {
            now += tick;
            engine.advance(now);
            if engine.snapshot().discount >= CASH_OUT_AT {
                engine.cash_out(now);
            }
        }
        // Wait out the re-arm delay
        while engine.phase() != EnginePhase::Idle {
            let Some(due) = engine.next_due() else { break };
            now = due;
            engine.advance(now);
        }
    }

    let history = &engine.session().history;
    println!("\nFlew {} rounds", engine.session().rounds_played);
    println!("  crashes:      {}", history.crash_count());
    println!(
        "  best cashout: {}",
        history.best_cash_out().map_or("-".to_string(), format_percent)
    );
    println!("  total banked: {}", format_percent(engine.accumulated_discount()));
    Ok(())
}
