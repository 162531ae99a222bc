//! Mention session: the one state machine driving a surface.
//!
//! The session owns a surface, a suggestion lifecycle, and an observer. Hosts
//! feed it edit events, caret moves, and key presses; it keeps the surface's
//! mentions valid, tracks the active query, and reports changes through
//! [`MentionObserver`].

use crate::actions::{Key, KeydownResult, Modifiers};
use crate::config::MentionConfig;
use crate::error::{MentionError, ResolveError, Result};
use crate::events::EditEvent;
use crate::lifecycle::{FetchRequest, Generation, SuggestionLifecycle, Transition};
use crate::stored::StoredContent;
use crate::surface::MentionSurface;
use crate::types::{CaretRect, MentionToken, NodeKey, Query};

/// Receives session output. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait MentionObserver {
    /// The set of mentions changed. Called with all mentions in order.
    fn on_mentions_change(&mut self, mentions: &[MentionToken]) {}

    /// The serialized plain text changed.
    fn on_text_change(&mut self, text: &str) {}

    /// A query opened or its text changed. `anchor` is the viewport caret
    /// rect at the trigger character.
    fn on_trigger_detected(&mut self, query_text: &str, anchor: CaretRect) {}

    fn on_trigger_dismissed(&mut self) {}

    /// New candidates arrived or the highlight moved.
    fn on_suggestions(&mut self, candidates: &[MentionToken], highlighted: Option<usize>) {}
}

impl MentionObserver for () {}

/// Drives one [`MentionSurface`].
pub struct MentionSession<S, O = ()> {
    surface: S,
    observer: O,
    lifecycle: SuggestionLifecycle,
    config: MentionConfig,
    last_text: String,
    last_keys: Vec<NodeKey>,
}

impl<S: MentionSurface, O: MentionObserver> MentionSession<S, O> {
    pub fn new(surface: S, observer: O, config: MentionConfig) -> Self {
        let last_text = surface.serialize();
        let last_keys = surface.mentions().iter().map(|m| m.key).collect();
        Self {
            surface,
            observer,
            lifecycle: SuggestionLifecycle::new(config.max_suggestions),
            config,
            last_text,
            last_keys,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn lifecycle(&self) -> &SuggestionLifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &MentionConfig {
        &self.config
    }

    pub fn active_query(&self) -> Option<&Query> {
        self.lifecycle.query()
    }

    pub fn stored(&self) -> StoredContent {
        self.surface.stored()
    }

    /// Apply observed edits, then re-evaluate the trigger at `caret`.
    pub fn handle_edit(&mut self, events: &[EditEvent], caret: usize) {
        for event in events {
            self.surface.apply_edit(event);
        }
        self.surface.set_caret(caret);
        self.emit_changes();
        self.refresh_trigger();
    }

    /// The caret moved without changing content.
    pub fn handle_caret_moved(&mut self, caret: usize) {
        self.surface.set_caret(caret);
        self.refresh_trigger();
    }

    pub fn handle_keydown(&mut self, key: &Key, modifiers: Modifiers) -> KeydownResult {
        let showing = self.lifecycle.is_active() && !self.lifecycle.candidates().is_empty();
        match key {
            Key::ArrowDown if showing => {
                self.highlight_next();
                KeydownResult::Handled
            }
            Key::ArrowUp if showing => {
                self.highlight_prev();
                KeydownResult::Handled
            }
            Key::Enter | Key::Tab if showing && !modifiers.any() => {
                let Some(candidate) = self.lifecycle.highlighted_candidate().cloned() else {
                    return KeydownResult::NotHandled;
                };
                match self.select(candidate) {
                    Ok(_) => KeydownResult::Handled,
                    Err(err) => {
                        tracing::debug!(target: "mention::session", error = %err, "keyboard selection failed");
                        KeydownResult::NotHandled
                    }
                }
            }
            Key::Escape if self.lifecycle.is_active() => {
                self.dismiss();
                KeydownResult::Handled
            }
            Key::Backspace if !modifiers.any() => match self.delete_at_caret() {
                Some(_) => KeydownResult::Handled,
                None => KeydownResult::NotHandled,
            },
            _ => KeydownResult::NotHandled,
        }
    }

    /// Move the highlight down, wrapping at the end.
    pub fn highlight_next(&mut self) {
        if self.lifecycle.highlight_next().is_some() {
            self.emit_suggestions();
        }
    }

    pub fn highlight_prev(&mut self) {
        if self.lifecycle.highlight_prev().is_some() {
            self.emit_suggestions();
        }
    }

    /// Remove the mention ending at the caret as one step.
    pub fn delete_at_caret(&mut self) -> Option<MentionToken> {
        let removed = self.surface.delete_at_boundary()?;
        tracing::debug!(target: "mention::session", id = %removed.id, "atomic delete");
        self.emit_changes();
        self.refresh_trigger();
        Some(removed)
    }

    /// Issue a fetch for the active query.
    pub fn begin_fetch(&mut self) -> Option<FetchRequest> {
        self.lifecycle.begin_fetch()
    }

    /// Deliver fetch results. Returns false when they were stale.
    pub fn receive_suggestions(
        &mut self,
        generation: Generation,
        result: std::result::Result<Vec<MentionToken>, ResolveError>,
    ) -> bool {
        let accepted = self.lifecycle.accept_results(generation, result);
        if accepted {
            self.emit_suggestions();
        }
        accepted
    }

    /// Materialize `candidate` over the active query.
    pub fn select(&mut self, candidate: MentionToken) -> Result<NodeKey> {
        let query = self
            .lifecycle
            .query()
            .cloned()
            .ok_or(MentionError::NoActiveQuery)?;

        let key = match self.surface.insert_token(candidate, &query) {
            Ok(key) => key,
            Err(err) => {
                tracing::debug!(target: "mention::session", error = %err, "selection against stale query");
                self.refresh_trigger();
                return Err(err);
            }
        };

        self.lifecycle.resolve();
        tracing::debug!(target: "mention::session", %key, "mention selected");
        self.emit_changes();
        self.observer.on_trigger_dismissed();
        Ok(key)
    }

    pub fn dismiss(&mut self) {
        if self.lifecycle.dismiss() == Transition::Dismissed {
            self.observer.on_trigger_dismissed();
        }
    }

    /// The surface lost focus.
    pub fn blur(&mut self) {
        self.dismiss();
    }

    /// Replace the surface content.
    pub fn load(&mut self, content: &StoredContent) -> Result<()> {
        self.surface.load(content)?;
        self.dismiss();
        self.emit_changes();
        Ok(())
    }

    fn refresh_trigger(&mut self) {
        let detected = self.surface.detect_trigger(self.config.trigger);
        match self.lifecycle.observe(detected) {
            Transition::Opened(query) | Transition::Updated(query) => {
                let anchor = self.anchor_for(&query);
                self.observer
                    .on_trigger_detected(&query.query_text, anchor);
            }
            Transition::Dismissed => self.observer.on_trigger_dismissed(),
            Transition::Unchanged | Transition::Resolved(_) => {}
        }
    }

    fn anchor_for(&self, query: &Query) -> CaretRect {
        self.surface
            .measure_caret(query.trigger_offset, self.config.caret_min_height)
            .unwrap_or_else(|err| {
                tracing::warn!(target: "mention::geometry", error = %err, "caret measurement failed, anchoring at surface origin");
                self.surface.origin()
            })
    }

    fn emit_changes(&mut self) {
        let text = self.surface.serialize();
        if text != self.last_text {
            self.observer.on_text_change(&text);
            self.last_text = text;
        }

        let mentions = self.surface.mentions();
        let keys: Vec<NodeKey> = mentions.iter().map(|m| m.key).collect();
        if keys != self.last_keys {
            tracing::trace!(target: "mention::session", count = keys.len(), "mentions changed");
            let tokens: Vec<MentionToken> = mentions.into_iter().map(|m| m.token).collect();
            self.observer.on_mentions_change(&tokens);
            self.last_keys = keys;
        }
    }

    fn emit_suggestions(&mut self) {
        self.observer.on_suggestions(
            self.lifecycle.candidates(),
            self.lifecycle.highlighted(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::diff_text;
    use crate::geometry::{BoxMetrics, CaretLayout, MonospaceLayout};
    use crate::surface::{LinearSurface, TreeSurface};
    use crate::text::EditorRope;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Mentions(Vec<String>),
        Text(String),
        Detected(String, CaretRect),
        Dismissed,
        Suggestions(usize, Option<usize>),
    }

    #[derive(Default)]
    struct Recorder(Vec<Seen>);

    impl Recorder {
        fn take(&mut self) -> Vec<Seen> {
            std::mem::take(&mut self.0)
        }
    }

    impl MentionObserver for Recorder {
        fn on_mentions_change(&mut self, mentions: &[MentionToken]) {
            self.0.push(Seen::Mentions(
                mentions.iter().map(|m| m.id.to_string()).collect(),
            ));
        }
        fn on_text_change(&mut self, text: &str) {
            self.0.push(Seen::Text(text.to_string()));
        }
        fn on_trigger_detected(&mut self, query_text: &str, anchor: CaretRect) {
            self.0.push(Seen::Detected(query_text.to_string(), anchor));
        }
        fn on_trigger_dismissed(&mut self) {
            self.0.push(Seen::Dismissed);
        }
        fn on_suggestions(&mut self, candidates: &[MentionToken], highlighted: Option<usize>) {
            self.0.push(Seen::Suggestions(candidates.len(), highlighted));
        }
    }

    fn linear_session() -> MentionSession<LinearSurface, Recorder> {
        MentionSession::new(
            LinearSurface::new(MonospaceLayout::new(10.0, 20.0)),
            Recorder::default(),
            MentionConfig::default(),
        )
    }

    /// Simulate a textarea: diff the new value against the session's text.
    fn observe<S: MentionSurface>(session: &mut MentionSession<S, Recorder>, value: &str, caret: usize) {
        let events = diff_text(&session.surface().serialize(), value, Some(caret));
        session.handle_edit(&events, caret);
    }

    fn candidates() -> Vec<MentionToken> {
        vec![
            MentionToken::person("41", "Jane Doe"),
            MentionToken::person("42", "Jane Smith"),
        ]
    }

    #[test]
    fn test_typing_opens_query_with_anchor() {
        let mut session = linear_session();
        observe(&mut session, "hello @", 7);
        assert_eq!(
            session.observer_mut().take(),
            vec![
                Seen::Text("hello @".into()),
                Seen::Detected("".into(), CaretRect::new(0.0, 60.0, 20.0)),
            ]
        );

        observe(&mut session, "hello @ja", 9);
        assert_eq!(
            session.observer_mut().take(),
            vec![
                Seen::Text("hello @ja".into()),
                Seen::Detected("ja".into(), CaretRect::new(0.0, 60.0, 20.0)),
            ]
        );

        observe(&mut session, "hello @ja ", 10);
        assert_eq!(
            session.observer_mut().take(),
            vec![Seen::Text("hello @ja ".into()), Seen::Dismissed]
        );
    }

    #[test]
    fn test_reobserving_same_state_is_silent() {
        let mut session = linear_session();
        observe(&mut session, "hi @a", 5);
        session.observer_mut().take();

        observe(&mut session, "hi @a", 5);
        session.handle_caret_moved(5);
        assert!(session.observer_mut().take().is_empty());
    }

    #[test]
    fn test_keyboard_selection() {
        let mut session = linear_session();
        observe(&mut session, "hello @ja", 9);
        let request = session.begin_fetch().unwrap();
        assert!(session.receive_suggestions(request.generation, Ok(candidates())));
        session.observer_mut().take();

        assert_eq!(
            session.handle_keydown(&Key::ArrowDown, Modifiers::NONE),
            KeydownResult::Handled
        );
        assert_eq!(
            session.handle_keydown(&Key::Enter, Modifiers::NONE),
            KeydownResult::Handled
        );

        assert_eq!(session.surface().serialize(), "hello Jane Smith ");
        assert_eq!(session.surface().caret(), 17);
        assert_eq!(
            session.observer_mut().take(),
            vec![
                Seen::Suggestions(2, Some(1)),
                Seen::Text("hello Jane Smith ".into()),
                Seen::Mentions(vec!["42".into()]),
                Seen::Dismissed,
            ]
        );
        assert!(session.active_query().is_none());
    }

    #[test]
    fn test_stale_fetch_discarded_in_session() {
        let mut session = linear_session();
        observe(&mut session, "@py", 3);
        let stale = session.begin_fetch().unwrap();
        observe(&mut session, "@pyt", 4);
        session.observer_mut().take();

        assert!(!session.receive_suggestions(stale.generation, Ok(candidates())));
        assert!(session.observer_mut().take().is_empty());
        assert!(session.lifecycle().candidates().is_empty());
    }

    #[test]
    fn test_failed_fetch_shows_nothing() {
        let mut session = linear_session();
        observe(&mut session, "@x", 2);
        let request = session.begin_fetch().unwrap();
        session.observer_mut().take();

        assert!(session.receive_suggestions(request.generation, Err("timeout".into())));
        assert_eq!(session.observer_mut().take(), vec![Seen::Suggestions(0, None)]);
        // Enter with nothing to pick falls through to the host.
        assert_eq!(
            session.handle_keydown(&Key::Enter, Modifiers::NONE),
            KeydownResult::NotHandled
        );
    }

    #[test]
    fn test_backspace_deletes_mention_whole() {
        let mut session = MentionSession::new(
            TreeSurface::new(MonospaceLayout::default()),
            Recorder::default(),
            MentionConfig::default(),
        );
        observe(&mut session, "hi @j", 5);
        session.select(MentionToken::person("42", "Jane Smith")).unwrap();
        session.handle_caret_moved(13);
        session.observer_mut().take();

        assert_eq!(
            session.handle_keydown(&Key::Backspace, Modifiers::NONE),
            KeydownResult::Handled
        );
        assert_eq!(session.surface().serialize(), "hi  ");
        assert_eq!(
            session.observer_mut().take(),
            vec![Seen::Text("hi  ".into()), Seen::Mentions(vec![])]
        );

        // Plain backspace elsewhere is left to the host.
        assert_eq!(
            session.handle_keydown(&Key::Backspace, Modifiers::NONE),
            KeydownResult::NotHandled
        );
    }

    #[test]
    fn test_escape_and_blur_dismiss() {
        let mut session = linear_session();
        observe(&mut session, "@a", 2);
        session.observer_mut().take();

        assert_eq!(
            session.handle_keydown(&Key::Escape, Modifiers::NONE),
            KeydownResult::Handled
        );
        assert_eq!(session.observer_mut().take(), vec![Seen::Dismissed]);
        assert_eq!(
            session.handle_keydown(&Key::Escape, Modifiers::NONE),
            KeydownResult::NotHandled
        );

        observe(&mut session, "@ab", 3);
        session.blur();
        assert_eq!(
            session.observer_mut().take(),
            vec![
                Seen::Text("@ab".into()),
                Seen::Detected("ab".into(), CaretRect::new(0.0, 0.0, 20.0)),
                Seen::Dismissed,
            ]
        );
    }

    #[test]
    fn test_select_without_query_fails() {
        let mut session = linear_session();
        assert_eq!(
            session.select(MentionToken::person("1", "Ann")),
            Err(MentionError::NoActiveQuery)
        );
    }

    struct BrokenLayout;

    impl CaretLayout for BrokenLayout {
        fn marker_rect(&self, _text: &str, _offset: usize) -> Result<CaretRect> {
            Err(MentionError::geometry("not laid out"))
        }

        fn box_metrics(&self) -> Result<BoxMetrics> {
            Ok(BoxMetrics {
                origin_top: 100.0,
                origin_left: 50.0,
                ..BoxMetrics::default()
            })
        }
    }

    #[test]
    fn test_geometry_failure_falls_back_to_surface_origin() {
        let mut session = MentionSession::new(
            LinearSurface::<EditorRope, BrokenLayout>::new(BrokenLayout),
            Recorder::default(),
            MentionConfig::default(),
        );
        observe(&mut session, "@a", 2);
        assert_eq!(
            session.observer_mut().take(),
            vec![
                Seen::Text("@a".into()),
                Seen::Detected("a".into(), CaretRect::new(100.0, 50.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_load_reports_content() {
        let mut session = linear_session();
        let stored = StoredContent {
            text: "hey Ann".into(),
            mentions: vec![crate::stored::StoredMention {
                id: "1".into(),
                display_name: "Ann".into(),
                entity_type: crate::types::EntityType::Person,
                image_url: None,
                start: 4,
                end: 7,
            }],
        };
        session.load(&stored).unwrap();
        assert_eq!(
            session.observer_mut().take(),
            vec![Seen::Text("hey Ann".into()), Seen::Mentions(vec!["1".into()])]
        );
        assert_eq!(session.stored(), stored);
    }
}
