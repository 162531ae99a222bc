//! JsMentionEditor - the mention editor wrapper for JavaScript.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, HtmlTextAreaElement};

use mention_editor_browser::{EditorHandle, MentionEditor};
use mention_editor_core::{
    FetchRequest, Generation, MentionConfig, MentionToken, ResolveError, StoredContent,
    clamp_to_viewport, reannotate as reannotate_text, run_fetch,
};

use crate::observer::{Callbacks, JsObserver, JsSuggestionSource};
use crate::types::{
    JsCaretRect, JsFetchRequest, JsMentionToken, JsPopupPlacement, JsStoredContent,
    generation_from_js,
};

/// A mention editor exposed to JavaScript.
///
/// Create it once, register callbacks, then mount it on a textarea or any
/// element to make contenteditable. Remounting detaches the previous
/// element.
#[wasm_bindgen]
pub struct JsMentionEditor {
    callbacks: Rc<RefCell<Callbacks>>,
    config: MentionConfig,
    handle: Option<Rc<dyn EditorHandle>>,
}

#[wasm_bindgen]
impl JsMentionEditor {
    /// Create an editor. `config` is an optional partial `MentionConfig`
    /// object; missing fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsMentionEditor, JsError> {
        let config: MentionConfig = if config.is_undefined() || config.is_null() {
            MentionConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
        };
        config.validate()?;
        Ok(Self {
            callbacks: Rc::new(RefCell::new(Callbacks::default())),
            config,
            handle: None,
        })
    }

    // === Callbacks ===

    /// `(mentions: MentionToken[]) => void`
    #[wasm_bindgen(js_name = onMentionsChange)]
    pub fn on_mentions_change(&self, f: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().on_mentions_change = f;
    }

    /// `(text: string) => void`
    #[wasm_bindgen(js_name = onTextChange)]
    pub fn on_text_change(&self, f: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().on_text_change = f;
    }

    /// `(queryText: string, anchor: CaretRect) => void`
    #[wasm_bindgen(js_name = onTriggerDetected)]
    pub fn on_trigger_detected(&self, f: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().on_trigger_detected = f;
    }

    /// `() => void`
    #[wasm_bindgen(js_name = onTriggerDismissed)]
    pub fn on_trigger_dismissed(&self, f: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().on_trigger_dismissed = f;
    }

    /// `(candidates: MentionToken[], highlighted: number | null) => void`
    #[wasm_bindgen(js_name = onSuggestions)]
    pub fn on_suggestions(&self, f: Option<js_sys::Function>) {
        self.callbacks.borrow_mut().on_suggestions = f;
    }

    // === Mounting ===

    /// Mount on a textarea. Its current value becomes the initial text.
    #[wasm_bindgen(js_name = mountTextarea)]
    pub fn mount_textarea(&mut self, element: HtmlTextAreaElement) -> Result<(), JsError> {
        self.unmount();
        let observer = JsObserver::new(self.callbacks.clone());
        let editor = MentionEditor::textarea(element, observer, self.config.clone())?;
        self.handle = Some(Rc::new(editor));
        tracing::debug!(target: "mention::js", "mounted on textarea");
        Ok(())
    }

    /// Mount on an element, making it contenteditable.
    #[wasm_bindgen(js_name = mountContentEditable)]
    pub fn mount_content_editable(&mut self, element: HtmlElement) -> Result<(), JsError> {
        self.unmount();
        let observer = JsObserver::new(self.callbacks.clone());
        let editor = MentionEditor::content_editable(element, observer, self.config.clone())?;
        self.handle = Some(Rc::new(editor));
        tracing::debug!(target: "mention::js", "mounted on contenteditable");
        Ok(())
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    /// Detach all listeners. The element keeps its content.
    #[wasm_bindgen]
    pub fn unmount(&mut self) {
        if self.handle.take().is_some() {
            tracing::debug!(target: "mention::js", "unmounted");
        }
    }

    // === Suggestions ===

    /// Start a fetch for the active query, if any. Pass the returned
    /// generation back to `receiveSuggestions` or `failSuggestions`.
    #[wasm_bindgen(js_name = beginFetch)]
    pub fn begin_fetch(&self) -> Result<Option<JsFetchRequest>, JsError> {
        let request = self.handle()?.begin_fetch()?;
        Ok(request.as_ref().map(JsFetchRequest::from))
    }

    /// Deliver candidates for a fetch. Returns false when the fetch was
    /// superseded and the candidates were dropped.
    #[wasm_bindgen(js_name = receiveSuggestions)]
    pub fn receive_suggestions(&self, generation: f64, candidates: JsValue) -> Result<bool, JsError> {
        let generation = parse_generation(generation)?;
        let candidates: Vec<JsMentionToken> = serde_wasm_bindgen::from_value(candidates)
            .map_err(|e| JsError::new(&format!("Invalid candidates: {}", e)))?;
        let candidates = candidates.into_iter().map(MentionToken::from).collect();
        Ok(self.handle()?.receive_suggestions(generation, Ok(candidates))?)
    }

    /// Report a failed fetch. The popup closes without candidates.
    #[wasm_bindgen(js_name = failSuggestions)]
    pub fn fail_suggestions(&self, generation: f64, message: &str) -> Result<bool, JsError> {
        let generation = parse_generation(generation)?;
        Ok(self
            .handle()?
            .receive_suggestions(generation, Err(ResolveError::from(message)))?)
    }

    /// Run a fetch for the active query through `resolver`, a function
    /// `(queryText) => MentionToken[] | Promise<MentionToken[]>`.
    #[wasm_bindgen(js_name = fetchWith)]
    pub fn fetch_with(&self, resolver: js_sys::Function) -> Result<(), JsError> {
        let handle = self.handle()?;
        let Some(request) = handle.begin_fetch()? else {
            return Ok(());
        };
        spawn_fetch(Rc::downgrade(handle), JsSuggestionSource::new(resolver), request);
        Ok(())
    }

    /// Replace the active query with `candidate`. Returns the new mention's
    /// key.
    #[wasm_bindgen]
    pub fn select(&self, candidate: JsMentionToken) -> Result<String, JsError> {
        let key = self.handle()?.select(candidate.into())?;
        Ok(key.to_string())
    }

    #[wasm_bindgen(js_name = highlightNext)]
    pub fn highlight_next(&self) -> Result<(), JsError> {
        Ok(self.handle()?.highlight_next()?)
    }

    #[wasm_bindgen(js_name = highlightPrev)]
    pub fn highlight_prev(&self) -> Result<(), JsError> {
        Ok(self.handle()?.highlight_prev()?)
    }

    /// Close the popup without selecting.
    #[wasm_bindgen]
    pub fn dismiss(&self) -> Result<(), JsError> {
        Ok(self.handle()?.dismiss()?)
    }

    /// Popup position for `anchor` within the current viewport, using the
    /// configured popup size.
    #[wasm_bindgen(js_name = placePopup)]
    pub fn place_popup(&self, anchor: JsCaretRect) -> Result<JsPopupPlacement, JsError> {
        let window = web_sys::window().ok_or_else(|| JsError::new("no window"))?;
        let width = window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let height = window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Ok(clamp_to_viewport(anchor.into(), self.config.popup, width, height).into())
    }

    // === Content ===

    /// Current text plus mention spans, ready to persist.
    #[wasm_bindgen(js_name = getStored)]
    pub fn get_stored(&self) -> Result<JsStoredContent, JsError> {
        Ok(self.handle()?.stored()?.into())
    }

    /// Replace the content with previously stored text and mentions.
    #[wasm_bindgen(js_name = setStored)]
    pub fn set_stored(&self, content: JsStoredContent) -> Result<(), JsError> {
        Ok(self.handle()?.load(&StoredContent::from(content))?)
    }

    /// Re-read the element after the host changed it directly.
    #[wasm_bindgen]
    pub fn sync(&self) -> Result<(), JsError> {
        self.handle()?.sync();
        Ok(())
    }
}

impl JsMentionEditor {
    fn handle(&self) -> Result<&Rc<dyn EditorHandle>, JsError> {
        self.handle
            .as_ref()
            .ok_or_else(|| JsError::new("editor is not mounted"))
    }
}

fn parse_generation(value: f64) -> Result<Generation, JsError> {
    generation_from_js(value).ok_or_else(|| JsError::new(&format!("Invalid generation: {}", value)))
}

fn spawn_fetch(handle: Weak<dyn EditorHandle>, source: JsSuggestionSource, request: FetchRequest) {
    wasm_bindgen_futures::spawn_local(async move {
        let (generation, result) = run_fetch(&source, request).await;
        let Some(handle) = handle.upgrade() else {
            return;
        };
        if let Err(e) = handle.receive_suggestions(generation, result) {
            tracing::warn!(target: "mention::fetch", generation = generation.0, error = %e, "dropping results");
        }
    });
}

/// Rebuild mention spans for `text` from the tokens the host already knows
/// about, e.g. when only plain text was persisted.
#[wasm_bindgen]
pub fn reannotate(text: &str, known: JsValue) -> Result<JsStoredContent, JsError> {
    let known: Vec<JsMentionToken> = serde_wasm_bindgen::from_value(known)
        .map_err(|e| JsError::new(&format!("Invalid tokens: {}", e)))?;
    let known: Vec<MentionToken> = known.into_iter().map(MentionToken::from).collect();
    Ok(reannotate_text(text, &known).into())
}
