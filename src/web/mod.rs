//! Browser shell: builds the page, forwards input and timer firings into the
//! `Session`, and carries out the effects it returns.

mod render;
mod timers;

use std::cell::{Cell, RefCell};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement, HtmlInputElement,
    window,
};

use crate::config::GameConfig;
use crate::game::{Effect, Input, Mode, Outcome, Phase, Session, Viewport};
use crate::ranking::{LocalStorageRankingStore, MemoryRankingStore, RankingStore};

pub use render::GridLayout;
use timers::{Timeout, TimerSet};

const MAX_ARENA_WIDTH: f64 = 900.0;
const MAX_ARENA_HEIGHT: f64 = 600.0;

/// Handles to the DOM nodes the renderer updates.
struct Dom {
    document: Document,
    title: HtmlElement,
    controls: HtmlElement,
    countdown: HtmlElement,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    hud: HtmlElement,
    progress_bar: HtmlElement,
    attempts: HtmlElement,
    latest: HtmlElement,
    result: HtmlElement,
    result_text: HtmlElement,
    rankings: HtmlElement,
}

struct App {
    session: Session,
    timers: TimerSet,
    store: Box<dyn RankingStore>,
    rng: StdRng,
    dom: Dom,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
    static RESIZE_BOUND: Cell<bool> = const { Cell::new(false) };
}

pub fn start(config: GameConfig) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let store: Box<dyn RankingStore> = if LocalStorageRankingStore::is_available() {
        Box::new(LocalStorageRankingStore::new(config.ranking_storage_key.clone()))
    } else {
        warn!("localStorage unavailable, rankings kept in memory only");
        Box::new(MemoryRankingStore::new())
    };
    let dom = build_dom(&doc)?;
    let viewport = arena_viewport();
    dom.canvas.set_width(viewport.width as u32);
    dom.canvas.set_height(viewport.height as u32);

    let session = Session::new(config, viewport, store.load());
    let app = App {
        session,
        timers: TimerSet::default(),
        store,
        rng: StdRng::from_entropy(),
        dom,
    };
    app.render();
    APP.with(|cell| {
        // Replacing a previous app drops its timers.
        *cell.borrow_mut() = Some(app);
    });

    attach_listeners(&doc)?;
    Ok(())
}

/// Feed one input through the session, apply its effects and redraw.
fn dispatch(input: Input) {
    APP.with(|cell| {
        let mut guard = cell.borrow_mut();
        let Some(app) = guard.as_mut() else {
            return;
        };
        let now = performance_now();
        let effects = app.session.dispatch(input, now, &mut app.rng);
        app.apply(effects);
        app.render();
    });
}

impl App {
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Schedule { slot, delay_ms } => {
                    debug!(?slot, delay_ms, "timer armed");
                    match Timeout::new(delay_ms, move || dispatch(Input::Timer(slot))) {
                        Ok(t) => self.timers.schedule(slot, t),
                        Err(e) => warn!(?slot, error = ?e, "could not arm timer"),
                    }
                }
                Effect::Cancel(slot) => self.timers.cancel(slot),
                Effect::Alert(msg) => {
                    if let Some(w) = window() {
                        w.alert_with_message(&msg).ok();
                    }
                }
                Effect::Reload => {
                    self.timers.clear();
                    if let Some(w) = window() {
                        w.location().reload().ok();
                    }
                }
                Effect::Navigate(url) => {
                    self.timers.clear();
                    if let Some(w) = window() {
                        w.location().set_href(&url).ok();
                    }
                }
                Effect::SaveRankings(entries) => {
                    if let Err(e) = self.store.save(&entries) {
                        warn!(error = %e, "rankings not saved");
                    }
                }
            }
        }
    }

    fn render(&self) {
        let dom = &self.dom;
        let session = &self.session;
        let phase = session.phase();
        let viewport = session.viewport();

        set_visible(&dom.title, !matches!(phase, Phase::Countdown(_)));
        set_visible(&dom.controls, matches!(phase, Phase::Idle | Phase::Finished(_)));

        match phase {
            Phase::Countdown(cd) => {
                set_visible(&dom.countdown, true);
                dom.countdown.set_text_content(Some(&cd.value.to_string()));
                let opacity = if cd.fading { "0" } else { "1" };
                dom.countdown.style().set_property("opacity", opacity).ok();
            }
            _ => set_visible(&dom.countdown, false),
        }

        render::clear(&dom.ctx, viewport);
        set_visible(&dom.canvas, matches!(phase, Phase::Active(_)));
        if let Some(eng) = session.reaction() {
            let cfg = session.config();
            let layout = GridLayout::new(viewport, cfg.grid_side(), cfg.grid_tiles);
            render::draw_grid(&dom.ctx, &layout, eng);
        }

        match session.accuracy() {
            Some(eng) => {
                if let Err(e) = render::draw_target(&dom.ctx, eng, session.config().target_radius_px) {
                    warn!(error = ?e, "target not drawn");
                }
                set_visible(&dom.hud, true);
                let pct = eng.remaining_fraction(performance_now()) * 100.0;
                dom.progress_bar.style().set_property("width", &format!("{pct:.1}%")).ok();
                let last = eng
                    .last_score()
                    .map(|s| format!(" | Last score: {s:.2}"))
                    .unwrap_or_default();
                dom.attempts.set_text_content(Some(&format!(
                    "Attempts left: {}{}",
                    eng.remaining_attempts(),
                    last
                )));
            }
            None => set_visible(&dom.hud, false),
        }

        let latest = match phase {
            Phase::Active(_) => session.reaction().and_then(|e| e.latest_reaction_ms()),
            Phase::Finished(Outcome::Reaction { latest_ms, .. }) => Some(*latest_ms),
            _ => None,
        };
        match latest {
            Some(ms) => {
                set_visible(&dom.latest, true);
                dom.latest.set_text_content(Some(&format!("Reaction time: {ms:.2}ms")));
            }
            None => set_visible(&dom.latest, false),
        }

        match session.outcome() {
            Some(outcome) => {
                set_visible(&dom.result, true);
                dom.result_text.set_text_content(Some(&outcome.message()));
            }
            None => set_visible(&dom.result, false),
        }

        self.render_rankings();
    }

    fn render_rankings(&self) {
        let list = &self.dom.rankings;
        list.set_inner_html("");
        for (i, entry) in self.session.rankings().iter().enumerate() {
            if let Ok(li) = self.dom.document.create_element("li") {
                li.set_text_content(Some(&entry.display_line(i + 1)));
                list.append_child(&li).ok();
            }
        }
    }
}

fn on_canvas_click(x: f64, y: f64) {
    let input = APP.with(|cell| {
        let guard = cell.borrow();
        let app = guard.as_ref()?;
        let session = &app.session;
        let input = match session.mode()? {
            Mode::Reaction => {
                session.reaction()?;
                let cfg = session.config();
                GridLayout::new(session.viewport(), cfg.grid_side(), cfg.grid_tiles)
                    .tile_at(x, y)
                    .map(Input::TileClick)
            }
            Mode::Accuracy => {
                let eng = session.accuracy()?;
                eng.hits(x, y, session.config().target_radius_px)
                    .then_some(Input::TargetClick { x, y })
            }
        };
        input
    });
    if let Some(input) = input {
        dispatch(input);
    }
}

fn attach_listeners(doc: &Document) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;

    on_click(doc, "rl-start-reaction", {
        let doc = doc.clone();
        move || {
            let identifier = doc
                .get_element_by_id("rl-id")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                .map(|input| input.value())
                .unwrap_or_default();
            dispatch(Input::Start { mode: Mode::Reaction, identifier });
        }
    })?;
    on_click(doc, "rl-start-accuracy", || {
        dispatch(Input::Start { mode: Mode::Accuracy, identifier: String::new() })
    })?;
    on_click(doc, "rl-home", || dispatch(Input::GoHome))?;

    // Canvas clicks are resolved to a tile or target hit before dispatching.
    {
        let canvas = doc
            .get_element_by_id("rl-arena")
            .ok_or_else(|| JsValue::from_str("missing arena canvas"))?;
        let closure = Closure::wrap(Box::new(move |evt: web_sys::MouseEvent| {
            on_canvas_click(evt.offset_x() as f64, evt.offset_y() as f64);
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    bind_resize(&win)?;
    Ok(())
}

/// Keeps the accuracy play area in sync with the window size. The listener
/// outlives page rebuilds, so it is attached once per thread; returns whether
/// this call attached it.
fn bind_resize(win: &web_sys::Window) -> Result<bool, JsValue> {
    if RESIZE_BOUND.with(Cell::get) {
        return Ok(false);
    }
    {
        let closure = Closure::wrap(Box::new(move || {
            let viewport = arena_viewport();
            APP.with(|cell| {
                if let Some(app) = cell.borrow().as_ref() {
                    app.dom.canvas.set_width(viewport.width as u32);
                    app.dom.canvas.set_height(viewport.height as u32);
                }
            });
            dispatch(Input::Resize(viewport));
        }) as Box<dyn FnMut()>);
        win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    RESIZE_BOUND.with(|bound| bound.set(true));
    Ok(true)
}

fn on_click<F>(doc: &Document, id: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut() + 'static,
{
    let el = doc
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))?;
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
    el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn build_dom(doc: &Document) -> Result<Dom, JsValue> {
    let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;
    // Re-entering start_app rebuilds the page from scratch.
    if let Some(old) = doc.get_element_by_id("rl-root") {
        old.remove();
    }
    let root = element(doc, "div", "rl-root", "display:flex; flex-direction:column; align-items:center; justify-content:center; min-height:100vh; font-family:sans-serif; gap:16px;")?;
    body.append_child(&root)?;

    let title = element(doc, "h1", "rl-title", "font-size:2.25rem; font-weight:bold; margin:0;")?;
    title.set_text_content(Some("Reaction Speed Test"));
    root.append_child(&title)?;

    let controls = element(doc, "div", "rl-controls", "display:flex; gap:8px; align-items:center;")?;
    let id_input: HtmlInputElement = element(doc, "input", "rl-id", "border:2px solid #d1d5db; border-radius:4px; padding:8px 16px;")?.dyn_into()?;
    id_input.set_placeholder("Enter your ID");
    controls.append_child(&id_input)?;
    let start_reaction = button(doc, "rl-start-reaction", "Reaction test", "#3b82f6")?;
    controls.append_child(&start_reaction)?;
    let start_accuracy = button(doc, "rl-start-accuracy", "Accuracy test", "#8b5cf6")?;
    controls.append_child(&start_accuracy)?;
    root.append_child(&controls)?;

    let countdown = element(doc, "div", "rl-countdown", "font-size:6rem; font-weight:bold; transition:opacity 0.4s;")?;
    root.append_child(&countdown)?;

    let hud = element(doc, "div", "rl-hud", "width:min(900px, 90vw);")?;
    let track = element(doc, "div", "rl-progress", "height:10px; background:#e5e7eb; border-radius:5px; overflow:hidden;")?;
    let progress_bar = element(doc, "div", "rl-progress-bar", "height:100%; width:100%; background:#22c55e;")?;
    track.append_child(&progress_bar)?;
    hud.append_child(&track)?;
    let attempts = element(doc, "p", "rl-attempts", "margin:6px 0 0;")?;
    hud.append_child(&attempts)?;
    root.append_child(&hud)?;

    let canvas: HtmlCanvasElement = element(doc, "canvas", "rl-arena", "cursor:pointer;")?.dyn_into()?;
    root.append_child(&canvas)?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let latest = element(doc, "p", "rl-latest", "margin:0;")?;
    root.append_child(&latest)?;

    let result = element(doc, "div", "rl-result", "display:flex; flex-direction:column; align-items:center; gap:8px;")?;
    let result_text = element(doc, "p", "rl-result-text", "margin:0;")?;
    result.append_child(&result_text)?;
    let home = button(doc, "rl-home", "Go home", "#22c55e")?;
    result.append_child(&home)?;
    root.append_child(&result)?;

    let ranking_box = element(doc, "div", "rl-ranking-box", "")?;
    let heading = element(doc, "h2", "rl-ranking-title", "font-size:1.5rem; font-weight:bold;")?;
    heading.set_text_content(Some("Rankings"));
    ranking_box.append_child(&heading)?;
    let rankings = element(doc, "ul", "rl-rankings", "list-style:none; padding:0;")?;
    ranking_box.append_child(&rankings)?;
    root.append_child(&ranking_box)?;

    Ok(Dom {
        document: doc.clone(),
        title,
        controls,
        countdown,
        canvas,
        ctx,
        hud,
        progress_bar,
        attempts,
        latest,
        result,
        result_text,
        rankings,
    })
}

fn element(doc: &Document, tag: &str, id: &str, style: &str) -> Result<HtmlElement, JsValue> {
    let el: Element = doc.create_element(tag)?;
    el.set_id(id);
    if !style.is_empty() {
        el.set_attribute("style", style)?;
    }
    el.dyn_into::<HtmlElement>().map_err(JsValue::from)
}

fn button(doc: &Document, id: &str, label: &str, color: &str) -> Result<HtmlElement, JsValue> {
    let style = format!(
        "background:{color}; color:#fff; font-weight:bold; padding:8px 16px; border:none; border-radius:4px; cursor:pointer;"
    );
    let b = element(doc, "button", id, &style)?;
    b.set_text_content(Some(label));
    Ok(b)
}

fn set_visible(el: &HtmlElement, visible: bool) {
    let style = el.style();
    if visible {
        style.remove_property("display").ok();
    } else {
        style.set_property("display", "none").ok();
    }
}

fn arena_viewport() -> Viewport {
    let dim = |v: Option<f64>, max: f64| v.map(|v| (v * 0.9).min(max)).unwrap_or(max);
    let win = window();
    let width = win.as_ref().and_then(|w| w.inner_width().ok()).and_then(|v| v.as_f64());
    let height = win.as_ref().and_then(|w| w.inner_height().ok()).and_then(|v| v.as_f64());
    Viewport::new(dim(width, MAX_ARENA_WIDTH), dim(height.map(|h| h * 0.7), MAX_ARENA_HEIGHT))
}

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn restarting_keeps_a_single_resize_listener() {
        start(GameConfig::default()).unwrap();
        start(GameConfig::default()).unwrap();
        let win = window().unwrap();
        assert!(!bind_resize(&win).unwrap());
        assert!(RESIZE_BOUND.with(Cell::get));
    }

    #[wasm_bindgen_test]
    fn page_rebuild_leaves_one_root_with_all_buttons() {
        let doc = window().unwrap().document().unwrap();
        build_dom(&doc).unwrap();
        let dom = build_dom(&doc).unwrap();
        assert_eq!(doc.query_selector_all("#rl-root").unwrap().length(), 1);
        assert_eq!(dom.controls.child_element_count(), 3);
        for id in ["rl-start-reaction", "rl-start-accuracy", "rl-home"] {
            let el = doc.get_element_by_id(id).unwrap();
            assert_eq!(el.tag_name(), "BUTTON");
        }
    }
}
