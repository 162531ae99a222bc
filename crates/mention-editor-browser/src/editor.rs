//! A mounted mention editor: session, surface, and listeners together.

use std::cell::RefCell;
use std::rc::Rc;

use mention_editor_core::{
    FetchRequest, Generation, MentionConfig, MentionError, MentionObserver, MentionSession,
    MentionToken, NodeKey, ResolveError, Result, StoredContent, SuggestionSource, run_fetch,
};
use web_sys::{HtmlElement, HtmlTextAreaElement};

use crate::contenteditable::ContentEditableSurface;
use crate::listeners::{self, SharedSession, SurfaceListeners};
use crate::surface::DomSurface;
use crate::textarea::TextareaSurface;

/// Session plus the DOM listeners driving it. Dropping the editor detaches
/// every listener; the element keeps its content.
pub struct MentionEditor<S, O> {
    session: SharedSession<S, O>,
    _listeners: SurfaceListeners,
}

impl<O: MentionObserver + 'static> MentionEditor<TextareaSurface, O> {
    /// Mount on a textarea. Its current value becomes the initial text.
    pub fn textarea(element: HtmlTextAreaElement, observer: O, config: MentionConfig) -> Result<Self> {
        config.validate()?;
        let surface = TextareaSurface::new(element, &config.mirror_id_prefix);
        Self::mount(surface, observer, config)
    }
}

impl<O: MentionObserver + 'static> MentionEditor<ContentEditableSurface, O> {
    /// Mount on any element, making it contenteditable.
    pub fn content_editable(element: HtmlElement, observer: O, config: MentionConfig) -> Result<Self> {
        config.validate()?;
        let surface = ContentEditableSurface::new(element)?;
        Self::mount(surface, observer, config)
    }
}

impl<S, O> MentionEditor<S, O>
where
    S: DomSurface + 'static,
    O: MentionObserver + 'static,
{
    pub fn mount(surface: S, observer: O, config: MentionConfig) -> Result<Self> {
        let session = Rc::new(RefCell::new(MentionSession::new(surface, observer, config)));
        let listeners = listeners::attach(&session)?;
        Ok(Self {
            session,
            _listeners: listeners,
        })
    }

    pub fn session(&self) -> &SharedSession<S, O> {
        &self.session
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut MentionSession<S, O>) -> T) -> Result<T> {
        let mut session = self
            .session
            .try_borrow_mut()
            .map_err(|_| MentionError::dom("mention session is busy"))?;
        Ok(f(&mut session))
    }

    /// Fetch candidates for the active query from `source` in the
    /// background. Results for a superseded query are dropped.
    pub fn fetch_with<Src>(&self, source: Rc<Src>) -> Result<()>
    where
        Src: SuggestionSource + 'static,
    {
        let Some(request) = self.with_session(|s| s.begin_fetch())? else {
            return Ok(());
        };
        let session = Rc::downgrade(&self.session);
        wasm_bindgen_futures::spawn_local(async move {
            let (generation, result) = run_fetch(&*source, request).await;
            let Some(session) = session.upgrade() else {
                return;
            };
            match session.try_borrow_mut() {
                Ok(mut session) => {
                    session.receive_suggestions(generation, result);
                }
                Err(_) => {
                    tracing::warn!(target: "mention::fetch", generation = generation.0, "session busy, dropping results");
                }
            };
        });
        Ok(())
    }
}

/// Object-safe view of a mounted editor, independent of its surface kind.
pub trait EditorHandle {
    fn begin_fetch(&self) -> Result<Option<FetchRequest>>;

    fn receive_suggestions(
        &self,
        generation: Generation,
        result: std::result::Result<Vec<MentionToken>, ResolveError>,
    ) -> Result<bool>;

    fn select(&self, candidate: MentionToken) -> Result<NodeKey>;

    fn highlight_next(&self) -> Result<()>;

    fn highlight_prev(&self) -> Result<()>;

    fn dismiss(&self) -> Result<()>;

    fn stored(&self) -> Result<StoredContent>;

    fn load(&self, content: &StoredContent) -> Result<()>;

    /// Re-read the element, e.g. after the host changed it directly.
    fn sync(&self);

    fn element(&self) -> Result<HtmlElement>;
}

impl<S, O> EditorHandle for MentionEditor<S, O>
where
    S: DomSurface + 'static,
    O: MentionObserver + 'static,
{
    fn begin_fetch(&self) -> Result<Option<FetchRequest>> {
        self.with_session(|s| s.begin_fetch())
    }

    fn receive_suggestions(
        &self,
        generation: Generation,
        result: std::result::Result<Vec<MentionToken>, ResolveError>,
    ) -> Result<bool> {
        self.with_session(|s| s.receive_suggestions(generation, result))
    }

    fn select(&self, candidate: MentionToken) -> Result<NodeKey> {
        self.with_session(|s| s.select(candidate))?
    }

    fn highlight_next(&self) -> Result<()> {
        self.with_session(|s| s.highlight_next())
    }

    fn highlight_prev(&self) -> Result<()> {
        self.with_session(|s| s.highlight_prev())
    }

    fn dismiss(&self) -> Result<()> {
        self.with_session(|s| s.dismiss())
    }

    fn stored(&self) -> Result<StoredContent> {
        let session = self
            .session
            .try_borrow()
            .map_err(|_| MentionError::dom("mention session is busy"))?;
        Ok(session.stored())
    }

    fn load(&self, content: &StoredContent) -> Result<()> {
        self.with_session(|s| s.load(content))?
    }

    fn sync(&self) {
        listeners::sync_edits(&self.session);
    }

    fn element(&self) -> Result<HtmlElement> {
        let session = self
            .session
            .try_borrow()
            .map_err(|_| MentionError::dom("mention session is busy"))?;
        Ok(session.surface().element().clone())
    }
}
