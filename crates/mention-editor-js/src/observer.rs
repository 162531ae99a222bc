//! Bridges session output and suggestion fetching to JavaScript functions.

use std::cell::RefCell;
use std::rc::Rc;

use mention_editor_core::{CaretRect, MentionObserver, MentionToken, ResolveError, SuggestionSource};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::types::{JsCaretRect, JsMentionToken};

/// Host callbacks. Any of them may be unset.
#[derive(Default)]
pub struct Callbacks {
    pub on_mentions_change: Option<js_sys::Function>,
    pub on_text_change: Option<js_sys::Function>,
    pub on_trigger_detected: Option<js_sys::Function>,
    pub on_trigger_dismissed: Option<js_sys::Function>,
    pub on_suggestions: Option<js_sys::Function>,
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(target: "mention::js", error = %e, "failed to serialize callback argument");
        JsValue::UNDEFINED
    })
}

fn tokens_to_js(tokens: &[MentionToken]) -> JsValue {
    let tokens: Vec<JsMentionToken> = tokens.iter().map(JsMentionToken::from).collect();
    to_js(&tokens)
}

fn report(name: &str, result: Result<JsValue, JsValue>) {
    if let Err(e) = result {
        tracing::warn!(target: "mention::js", callback = name, error = ?e, "callback threw");
    }
}

/// [`MentionObserver`] that forwards to shared [`Callbacks`].
///
/// Each callback runs in its own microtask, after the editor has finished
/// handling the event, so callbacks may call back into the editor. Order is
/// preserved.
pub struct JsObserver {
    callbacks: Rc<RefCell<Callbacks>>,
}

impl JsObserver {
    pub fn new(callbacks: Rc<RefCell<Callbacks>>) -> Self {
        Self { callbacks }
    }

    fn dispatch(
        &self,
        name: &'static str,
        pick: fn(&Callbacks) -> Option<&js_sys::Function>,
        args: js_sys::Array,
    ) {
        let callbacks = self.callbacks.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let f = pick(&callbacks.borrow()).cloned();
            if let Some(f) = f {
                report(name, f.apply(&JsValue::NULL, &args));
            }
        });
    }
}

impl MentionObserver for JsObserver {
    fn on_mentions_change(&mut self, mentions: &[MentionToken]) {
        self.dispatch(
            "onMentionsChange",
            |c| c.on_mentions_change.as_ref(),
            js_sys::Array::of1(&tokens_to_js(mentions)),
        );
    }

    fn on_text_change(&mut self, text: &str) {
        self.dispatch(
            "onTextChange",
            |c| c.on_text_change.as_ref(),
            js_sys::Array::of1(&JsValue::from_str(text)),
        );
    }

    fn on_trigger_detected(&mut self, query_text: &str, anchor: CaretRect) {
        self.dispatch(
            "onTriggerDetected",
            |c| c.on_trigger_detected.as_ref(),
            js_sys::Array::of2(
                &JsValue::from_str(query_text),
                &to_js(&JsCaretRect::from(anchor)),
            ),
        );
    }

    fn on_trigger_dismissed(&mut self) {
        self.dispatch(
            "onTriggerDismissed",
            |c| c.on_trigger_dismissed.as_ref(),
            js_sys::Array::new(),
        );
    }

    fn on_suggestions(&mut self, candidates: &[MentionToken], highlighted: Option<usize>) {
        let highlighted = highlighted
            .map(|i| JsValue::from_f64(i as f64))
            .unwrap_or(JsValue::NULL);
        self.dispatch(
            "onSuggestions",
            |c| c.on_suggestions.as_ref(),
            js_sys::Array::of2(&tokens_to_js(candidates), &highlighted),
        );
    }
}

/// [`SuggestionSource`] backed by a JS function `(query) => tokens` that may
/// return a Promise.
pub struct JsSuggestionSource {
    resolver: js_sys::Function,
}

impl JsSuggestionSource {
    pub fn new(resolver: js_sys::Function) -> Self {
        Self { resolver }
    }
}

fn resolve_error(e: JsValue) -> ResolveError {
    ResolveError(
        e.as_string()
            .or_else(|| {
                e.dyn_ref::<js_sys::Error>()
                    .map(|err| String::from(err.message()))
            })
            .unwrap_or_else(|| format!("{:?}", e)),
    )
}

impl SuggestionSource for JsSuggestionSource {
    async fn resolve(&self, query_text: &str) -> Result<Vec<MentionToken>, ResolveError> {
        let value = self
            .resolver
            .call1(&JsValue::NULL, &JsValue::from_str(query_text))
            .map_err(resolve_error)?;
        let value = match value.dyn_into::<js_sys::Promise>() {
            Ok(promise) => JsFuture::from(promise).await.map_err(resolve_error)?,
            Err(value) => value,
        };
        let tokens: Vec<JsMentionToken> = serde_wasm_bindgen::from_value(value)
            .map_err(|e| ResolveError(format!("invalid candidates: {}", e)))?;
        Ok(tokens.into_iter().map(MentionToken::from).collect())
    }
}
