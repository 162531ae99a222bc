//! Types exposed to JavaScript via wasm-bindgen.

use mention_editor_core::{
    CaretRect, EntityType, FetchRequest, Generation, MentionToken, PopupPlacement, StoredContent,
    StoredMention,
};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum JsEntityType {
    Person,
    Project,
}

impl From<EntityType> for JsEntityType {
    fn from(t: EntityType) -> Self {
        match t {
            EntityType::Person => Self::Person,
            EntityType::Project => Self::Project,
        }
    }
}

impl From<JsEntityType> for EntityType {
    fn from(t: JsEntityType) -> Self {
        match t {
            JsEntityType::Person => Self::Person,
            JsEntityType::Project => Self::Project,
        }
    }
}

/// A mention candidate or materialized mention.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsMentionToken {
    pub id: String,
    pub display_name: String,
    pub entity_type: JsEntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&MentionToken> for JsMentionToken {
    fn from(token: &MentionToken) -> Self {
        Self {
            id: token.id.to_string(),
            display_name: token.display_name.to_string(),
            entity_type: token.entity_type.into(),
            image_url: token.image_url.clone(),
        }
    }
}

impl From<JsMentionToken> for MentionToken {
    fn from(token: JsMentionToken) -> Self {
        let out = MentionToken::new(token.id, token.display_name, token.entity_type.into());
        match token.image_url {
            Some(url) => out.with_image(url),
            None => out,
        }
    }
}

/// Viewport caret rect in CSS pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsCaretRect {
    pub top: f64,
    pub left: f64,
    pub height: f64,
}

impl From<CaretRect> for JsCaretRect {
    fn from(rect: CaretRect) -> Self {
        Self {
            top: rect.top,
            left: rect.left,
            height: rect.height,
        }
    }
}

impl From<JsCaretRect> for CaretRect {
    fn from(rect: JsCaretRect) -> Self {
        CaretRect::new(rect.top, rect.left, rect.height)
    }
}

/// Where to draw the suggestion popup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct JsPopupPlacement {
    pub top: f64,
    pub left: f64,
    /// Whether the popup was flipped above the caret.
    pub above: bool,
}

impl From<PopupPlacement> for JsPopupPlacement {
    fn from(p: PopupPlacement) -> Self {
        Self {
            top: p.top,
            left: p.left,
            above: p.above,
        }
    }
}

/// A fetch the host should run, tagged with the generation that must be
/// passed back with its results. Generations are JS numbers, exact up to
/// 2^53.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsFetchRequest {
    pub generation: f64,
    pub query_text: String,
}

impl From<&FetchRequest> for JsFetchRequest {
    fn from(req: &FetchRequest) -> Self {
        Self {
            generation: req.generation.0 as f64,
            query_text: req.query_text.to_string(),
        }
    }
}

/// Generation from a JS number. None unless it is a non-negative integer
/// within the exactly representable range.
pub fn generation_from_js(value: f64) -> Option<Generation> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= MAX_SAFE)
        .then(|| Generation(value as u64))
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsStoredMention {
    pub id: String,
    pub display_name: String,
    pub entity_type: JsEntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub start: usize,
    pub end: usize,
}

/// Plain text plus mention spans, as persisted by the host.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsStoredContent {
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<JsStoredMention>,
}

impl From<StoredContent> for JsStoredContent {
    fn from(content: StoredContent) -> Self {
        Self {
            text: content.text,
            mentions: content
                .mentions
                .into_iter()
                .map(|m| JsStoredMention {
                    id: m.id.to_string(),
                    display_name: m.display_name.to_string(),
                    entity_type: m.entity_type.into(),
                    image_url: m.image_url,
                    start: m.start,
                    end: m.end,
                })
                .collect(),
        }
    }
}

impl From<JsStoredContent> for StoredContent {
    fn from(content: JsStoredContent) -> Self {
        StoredContent {
            text: content.text,
            mentions: content
                .mentions
                .into_iter()
                .map(|m| StoredMention {
                    id: m.id.into(),
                    display_name: m.display_name.into(),
                    entity_type: m.entity_type.into(),
                    image_url: m.image_url,
                    start: m.start,
                    end: m.end,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mention_editor_core::SuggestionLifecycle;

    #[test]
    fn test_generation_survives_past_u32() {
        let past_u32 = Generation(u64::from(u32::MAX) + 2);
        let js = past_u32.0 as f64;
        assert_eq!(generation_from_js(js), Some(past_u32));
        // The u32-wrapped value names a different fetch.
        assert_ne!(generation_from_js(1.0), Some(past_u32));
    }

    #[test]
    fn test_generation_from_js_rejects_non_integers() {
        assert_eq!(generation_from_js(-1.0), None);
        assert_eq!(generation_from_js(1.5), None);
        assert_eq!(generation_from_js(f64::NAN), None);
        assert_eq!(generation_from_js(2f64.powi(60)), None);
        assert_eq!(generation_from_js(0.0), Some(Generation(0)));
    }

    #[test]
    fn test_fetch_request_roundtrips_through_js_number() {
        let mut lifecycle = SuggestionLifecycle::new(5);
        lifecycle.observe(Some(mention_editor_core::Query::new("py", 0)));
        let request = lifecycle.begin_fetch().unwrap();
        let js = JsFetchRequest::from(&request);
        assert_eq!(js.query_text, "py");
        assert_eq!(generation_from_js(js.generation), Some(request.generation));
    }
}
