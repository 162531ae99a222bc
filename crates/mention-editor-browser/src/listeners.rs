//! DOM listeners that feed a shared session.
//!
//! Everything attached here is detached again when [`SurfaceListeners`] is
//! dropped. Handlers borrow the session with `try_borrow_mut`: an event that
//! arrives while the session is already borrowed (an observer callback
//! re-entering the page) is skipped and logged, and the next event catches
//! up because edits are derived from DOM state rather than deltas.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use mention_editor_core::{KeydownResult, MentionError, MentionObserver, MentionSession, Result};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{InputEvent, KeyboardEvent, MutationObserver, MutationObserverInit};

use crate::events::{
    BeforeInputContext, BeforeInputResult, handle_beforeinput, handle_keydown_event, key_from_event,
};
use crate::surface::DomSurface;

pub type SharedSession<S, O> = Rc<RefCell<MentionSession<S, O>>>;

type MutationCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

/// Listeners attached to one surface element.
pub struct SurfaceListeners {
    _listeners: Vec<EventListener>,
    mutations: Option<(MutationObserver, MutationCallback)>,
}

impl Drop for SurfaceListeners {
    fn drop(&mut self) {
        if let Some((observer, _)) = &self.mutations {
            observer.disconnect();
        }
        tracing::debug!(target: "mention::listeners", "detached surface listeners");
    }
}

/// Read the element back and hand the derived edits to the session.
pub fn sync_edits<S, O>(session: &SharedSession<S, O>)
where
    S: DomSurface,
    O: MentionObserver,
{
    let Ok(mut session) = session.try_borrow_mut() else {
        tracing::debug!(target: "mention::listeners", "session busy, skipping edit sync");
        return;
    };
    let (events, caret) = session.surface_mut().read_edits();
    session.handle_edit(&events, caret);
}

/// Read the DOM caret and report it to the session.
pub fn sync_caret<S, O>(session: &SharedSession<S, O>)
where
    S: DomSurface,
    O: MentionObserver,
{
    let Ok(mut session) = session.try_borrow_mut() else {
        return;
    };
    if let Some(caret) = session.surface().read_caret() {
        session.handle_caret_moved(caret);
    }
}

/// Attach input, keyboard, caret, and focus listeners to the session's
/// surface element.
pub fn attach<S, O>(session: &SharedSession<S, O>) -> Result<SurfaceListeners>
where
    S: DomSurface + 'static,
    O: MentionObserver + 'static,
{
    let (element, observe_mutations) = {
        let s = session
            .try_borrow()
            .map_err(|_| MentionError::dom("session busy while attaching listeners"))?;
        (s.surface().element().clone(), s.surface().observes_mutations())
    };

    let mut listeners = Vec::new();

    let handle = session.clone();
    listeners.push(EventListener::new(&element, "input", move |_| {
        sync_edits(&handle);
    }));

    let handle = session.clone();
    listeners.push(EventListener::new_with_options(
        &element,
        "keydown",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if event.is_composing() {
                return;
            }
            let Ok(mut session) = handle.try_borrow_mut() else {
                return;
            };
            let selection = session.surface().read_selection();
            let (key, modifiers) = key_from_event(event);
            if handle_keydown_event(&mut *session, &key, modifiers, selection) == KeydownResult::Handled {
                event.prevent_default();
            }
        },
    ));

    // Edits report their own caret; only caret-only moves need a keyup sync.
    let handle = session.clone();
    listeners.push(EventListener::new(&element, "keyup", move |event| {
        let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        if key_from_event(event).0.is_navigation() {
            sync_caret(&handle);
        }
    }));

    let handle = session.clone();
    listeners.push(EventListener::new(&element, "click", move |_| {
        sync_caret(&handle);
    }));

    let handle = session.clone();
    listeners.push(EventListener::new(&element, "blur", move |_| {
        if let Ok(mut session) = handle.try_borrow_mut() {
            session.blur();
        }
    }));

    let mut mutations = None;
    if observe_mutations {
        let handle = session.clone();
        let root = element.clone();
        listeners.push(EventListener::new_with_options(
            &element,
            "beforeinput",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<InputEvent>() else {
                    return;
                };
                let Ok(mut session) = handle.try_borrow_mut() else {
                    return;
                };
                let ctx = BeforeInputContext::from_event(event, &root);
                let caret = session
                    .surface()
                    .read_caret()
                    .unwrap_or_else(|| session.surface().caret());
                tracing::trace!(target: "mention::listeners", input_type = ?ctx.input_type, caret, "beforeinput");
                if handle_beforeinput(&mut *session, &ctx, caret) == BeforeInputResult::Handled {
                    event.prevent_default();
                }
            },
        ));

        let handle = session.clone();
        let callback: MutationCallback =
            Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
                sync_edits(&handle);
            }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| MentionError::dom(format!("MutationObserver::new failed: {:?}", e)))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_character_data(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&element, &init)
            .map_err(|e| MentionError::dom(format!("observe failed: {:?}", e)))?;
        mutations = Some((observer, callback));
    }

    tracing::debug!(target: "mention::listeners", observe_mutations, "attached surface listeners");
    Ok(SurfaceListeners {
        _listeners: listeners,
        mutations,
    })
}
