//! Suggestion lifecycle: the state machine between detecting a query and
//! materializing a mention.
//!
//! Every change to the query (and every dismissal) bumps a generation
//! counter. Fetches carry the generation they were issued under, and results
//! for anything but the current generation are dropped.

use std::future::Future;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use web_time::Instant;

use crate::error::ResolveError;
use crate::types::{MentionToken, Query};

/// Monotonic counter identifying one version of the active query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    fn bump(&mut self) {
        self.0 += 1;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Querying(Query),
    /// A fetch was issued for `query` under `generation`.
    Resolving { query: Query, generation: Generation },
}

/// What an observation did to the lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Opened(Query),
    Updated(Query),
    Dismissed,
    Resolved(Query),
}

/// A fetch the caller should perform, tagged with its generation.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub generation: Generation,
    pub query_text: SmolStr,
    pub issued_at: Instant,
}

/// Resolves a query string into candidate mentions.
///
/// Implementations typically hit the network; the lifecycle only cares
/// about the eventual result.
pub trait SuggestionSource {
    fn resolve(
        &self,
        query_text: &str,
    ) -> impl Future<Output = Result<Vec<MentionToken>, ResolveError>>;
}

/// Run a fetch request against a source, keeping its generation attached.
pub async fn run_fetch<S: SuggestionSource + ?Sized>(
    source: &S,
    request: FetchRequest,
) -> (Generation, Result<Vec<MentionToken>, ResolveError>) {
    let result = source.resolve(&request.query_text).await;
    tracing::trace!(
        target: "mention::lifecycle",
        generation = request.generation.0,
        elapsed_ms = request.issued_at.elapsed().as_millis() as u64,
        "fetch finished"
    );
    (request.generation, result)
}

/// Query state, candidates, and highlight for one surface.
#[derive(Clone, Debug)]
pub struct SuggestionLifecycle {
    state: LifecycleState,
    generation: Generation,
    candidates: Vec<MentionToken>,
    highlighted: Option<usize>,
    max_suggestions: usize,
}

impl SuggestionLifecycle {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            state: LifecycleState::Idle,
            generation: Generation::default(),
            candidates: Vec::new(),
            highlighted: None,
            max_suggestions,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn query(&self) -> Option<&Query> {
        match &self.state {
            LifecycleState::Idle => None,
            LifecycleState::Querying(query) | LifecycleState::Resolving { query, .. } => Some(query),
        }
    }

    pub fn is_active(&self) -> bool {
        self.query().is_some()
    }

    pub fn candidates(&self) -> &[MentionToken] {
        &self.candidates
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_candidate(&self) -> Option<&MentionToken> {
        self.candidates.get(self.highlighted?)
    }

    /// Feed the latest trigger detection result.
    pub fn observe(&mut self, detected: Option<Query>) -> Transition {
        let current = self.query().cloned();
        let transition = match (current, detected) {
            (None, None) => Transition::Unchanged,
            (Some(_), None) => return self.dismiss(),
            (Some(current), Some(query)) if current == query => Transition::Unchanged,
            (Some(current), Some(query)) if current.trigger_offset == query.trigger_offset => {
                self.generation.bump();
                self.highlighted = (!self.candidates.is_empty()).then_some(0);
                self.state = LifecycleState::Querying(query.clone());
                Transition::Updated(query)
            }
            (_, Some(query)) => {
                self.generation.bump();
                self.clear_candidates();
                self.state = LifecycleState::Querying(query.clone());
                Transition::Opened(query)
            }
        };
        if transition != Transition::Unchanged {
            tracing::debug!(
                target: "mention::lifecycle",
                generation = self.generation.0,
                ?transition,
                "lifecycle transition"
            );
        }
        transition
    }

    /// Issue a fetch for the current query.
    pub fn begin_fetch(&mut self) -> Option<FetchRequest> {
        let query = self.query()?.clone();
        let generation = self.generation;
        let request = FetchRequest {
            generation,
            query_text: query.query_text.clone(),
            issued_at: Instant::now(),
        };
        self.state = LifecycleState::Resolving { query, generation };
        tracing::debug!(target: "mention::lifecycle", generation = generation.0, query = %request.query_text, "begin fetch");
        Some(request)
    }

    /// Apply fetch results if they belong to the current generation.
    ///
    /// Returns false (and changes nothing) for stale results. A failed fetch
    /// yields an empty candidate list.
    pub fn accept_results(
        &mut self,
        generation: Generation,
        result: Result<Vec<MentionToken>, ResolveError>,
    ) -> bool {
        let current = matches!(
            &self.state,
            LifecycleState::Resolving { generation: g, .. } if *g == generation && generation == self.generation
        );
        if !current {
            tracing::debug!(
                target: "mention::lifecycle",
                stale = generation.0,
                current = self.generation.0,
                "discarding stale suggestions"
            );
            return false;
        }

        let mut candidates = match result {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(target: "mention::lifecycle", error = %err, "suggestion resolution failed");
                Vec::new()
            }
        };
        candidates.truncate(self.max_suggestions);
        self.highlighted = (!candidates.is_empty()).then_some(0);
        self.candidates = candidates;
        true
    }

    /// The user picked a candidate: close the query.
    pub fn resolve(&mut self) -> Transition {
        let Some(query) = self.query().cloned() else {
            return Transition::Unchanged;
        };
        self.reset();
        tracing::debug!(target: "mention::lifecycle", generation = self.generation.0, "query resolved");
        Transition::Resolved(query)
    }

    pub fn dismiss(&mut self) -> Transition {
        if !self.is_active() {
            return Transition::Unchanged;
        }
        self.reset();
        tracing::debug!(target: "mention::lifecycle", generation = self.generation.0, "query dismissed");
        Transition::Dismissed
    }

    /// Move the highlight down, wrapping around.
    pub fn highlight_next(&mut self) -> Option<usize> {
        let len = self.candidates.len();
        if len == 0 {
            return None;
        }
        self.highlighted = Some(self.highlighted.map_or(0, |i| (i + 1) % len));
        self.highlighted
    }

    /// Move the highlight up, wrapping around.
    pub fn highlight_prev(&mut self) -> Option<usize> {
        let len = self.candidates.len();
        if len == 0 {
            return None;
        }
        self.highlighted = Some(self.highlighted.map_or(len - 1, |i| (i + len - 1) % len));
        self.highlighted
    }

    fn reset(&mut self) {
        self.state = LifecycleState::Idle;
        self.generation.bump();
        self.clear_candidates();
    }

    fn clear_candidates(&mut self) {
        self.candidates.clear();
        self.highlighted = None;
    }
}
