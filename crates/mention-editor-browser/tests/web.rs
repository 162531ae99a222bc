//! WASM browser tests for mention-editor-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use mention_editor_browser::cursor::{dom_position_to_offset, offset_to_dom_position};
use mention_editor_browser::dom_sync::{read_tree, render_tree};
use mention_editor_browser::{
    BeforeInputContext, BeforeInputResult, ContentEditableSurface, DomSurface, EditorHandle,
    InputType, Key, KeydownResult, MentionConfig, MentionEditor, MentionSession, MentionSurface,
    MentionToken, MentionTree, Modifiers, NodeKey, StoredContent, TextareaSurface,
    TrackedMention, TreeNode, handle_beforeinput, handle_keydown_event, parse_browser_input_type,
};
use web_sys::{HtmlElement, HtmlTextAreaElement, Node};

fn jane() -> MentionToken {
    MentionToken::person("42", "Jane Smith")
}

fn make_div() -> HtmlElement {
    let document = gloo_utils::document();
    let div: HtmlElement = document.create_element("div").unwrap().unchecked_into();
    document.body().unwrap().append_child(&div).unwrap();
    div
}

fn make_textarea(value: &str) -> HtmlTextAreaElement {
    let document = gloo_utils::document();
    let textarea: HtmlTextAreaElement = document.create_element("textarea").unwrap().unchecked_into();
    textarea.set_value(value);
    document.body().unwrap().append_child(&textarea).unwrap();
    textarea
}

/// "hi " + Jane Smith + " and"
fn sample_tree() -> MentionTree {
    MentionTree::from_nodes(vec![
        TreeNode::text("hi "),
        TreeNode::mention(NodeKey(0), jane()),
        TreeNode::text(" and"),
    ])
}

fn sample_stored() -> StoredContent {
    StoredContent::new(
        "hi Jane Smith and",
        &[TrackedMention::new(NodeKey(0), jane(), 3)],
    )
}

/// Put a collapsed window selection at a raw DOM position.
fn place_caret(node: &Node, offset: u32) {
    let window = web_sys::window().unwrap();
    let range = window.document().unwrap().create_range().unwrap();
    range.set_start(node, offset).unwrap();
    range.collapse_with_to_start(true);
    let selection = window.get_selection().unwrap().unwrap();
    selection.remove_all_ranges().unwrap();
    selection.add_range(&range).unwrap();
}

fn mention_count(element: &HtmlElement) -> u32 {
    element
        .query_selector_all("[data-mention-key]")
        .unwrap()
        .length()
}

// === InputType parsing tests ===

#[wasm_bindgen_test]
fn test_parse_input_types() {
    assert_eq!(parse_browser_input_type("insertText"), InputType::InsertText);
    assert_eq!(
        parse_browser_input_type("deleteContentBackward"),
        InputType::DeleteContentBackward
    );
    match parse_browser_input_type("unknownType") {
        InputType::Unknown(s) => assert_eq!(s, "unknownType"),
        _ => panic!("Expected Unknown variant"),
    }
}

// === DOM sync and cursor mapping ===

#[wasm_bindgen_test]
fn test_render_then_read_tree() {
    let div = make_div();
    let tree = sample_tree();
    render_tree(&div, &tree).unwrap();

    assert_eq!(div.text_content().unwrap(), "hi Jane Smith and");
    assert_eq!(mention_count(&div), 1);
    let span = div.query_selector("[data-mention-key]").unwrap().unwrap();
    assert_eq!(span.get_attribute("contenteditable").as_deref(), Some("false"));
    assert_eq!(span.get_attribute("data-mention-key").as_deref(), Some("m0"));

    assert_eq!(read_tree(&div, &tree), tree);
}

#[wasm_bindgen_test]
fn test_read_tree_rekeys_duplicate_spans() {
    let div = make_div();
    let tree = sample_tree();
    render_tree(&div, &tree).unwrap();
    let copy = div.query_selector("[data-mention-key]").unwrap().unwrap();
    div.append_child(&copy.clone_node_with_deep(true).unwrap())
        .unwrap();

    let observed = read_tree(&div, &tree);
    let keys = observed.mention_keys();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[wasm_bindgen_test]
fn test_dom_offset_mapping() {
    let div = make_div();
    render_tree(&div, &sample_tree()).unwrap();
    let children = div.child_nodes();
    let first = children.item(0).unwrap();
    let span = children.item(1).unwrap();
    let last = children.item(2).unwrap();

    assert_eq!(dom_position_to_offset(&div, &first, 2), Some(2));
    assert_eq!(dom_position_to_offset(&div, &last, 1), Some(14));
    // Between children: before the mention, after it.
    assert_eq!(dom_position_to_offset(&div, &div, 1), Some(3));
    assert_eq!(dom_position_to_offset(&div, &div, 2), Some(13));
    // Inside the mention snaps to its end.
    let inner = span.first_child().unwrap();
    assert_eq!(dom_position_to_offset(&div, &inner, 4), Some(13));

    // The boundary before the mention resolves into the text node.
    let (node, offset) = offset_to_dom_position(&div, 3);
    assert!(node.is_same_node(Some(&first)));
    assert_eq!(offset, 3);
    // Strictly inside the mention snaps past it.
    let (node, offset) = offset_to_dom_position(&div, 5);
    let div_node: &Node = &div;
    assert!(node.is_same_node(Some(div_node)));
    assert_eq!(offset, 2);
}

#[wasm_bindgen_test]
fn test_block_wrapped_lines_count_one_break() {
    let div = make_div();
    div.set_inner_html("hello<div>@ja</div>");
    let line: Node = div.last_child().unwrap();
    let typed = line.first_child().unwrap();

    let tree = read_tree(&div, &MentionTree::new());
    assert_eq!(tree.extract_plain_text(), "hello\n@ja");
    assert_eq!(dom_position_to_offset(&div, &typed, 3), Some(9));
    assert_eq!(dom_position_to_offset(&div, &line, 0), Some(6));
    assert_eq!(dom_position_to_offset(&div, &div, 2), Some(9));

    let (node, offset) = offset_to_dom_position(&div, 9);
    assert!(node.is_same_node(Some(&typed)));
    assert_eq!(offset, 3);
    // The break itself resolves to the end of the previous line.
    let (node, offset) = offset_to_dom_position(&div, 5);
    assert!(node.is_same_node(div.first_child().as_ref()));
    assert_eq!(offset, 5);
}

#[wasm_bindgen_test]
fn test_empty_block_placeholder_break_counts_nothing() {
    let div = make_div();
    div.set_inner_html("hello<div><br></div>");
    let line: Node = div.last_child().unwrap();

    assert_eq!(read_tree(&div, &MentionTree::new()).extract_plain_text(), "hello\n");
    assert_eq!(dom_position_to_offset(&div, &line, 0), Some(6));
    assert_eq!(dom_position_to_offset(&div, &line, 1), Some(6));
}

// === Contenteditable surface ===

#[wasm_bindgen_test]
fn test_trigger_on_block_wrapped_line() {
    let div = make_div();
    let mut surface = ContentEditableSurface::new(div.clone()).unwrap();
    surface.load(&StoredContent::plain("hello")).unwrap();
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    // What Chrome leaves behind after Enter and typing "@ja".
    div.set_inner_html("hello<div>@ja</div>");
    let typed = div.last_child().unwrap().first_child().unwrap();
    place_caret(&typed, 3);

    let (events, caret) = session.surface_mut().read_edits();
    assert_eq!(caret, 9);
    session.handle_edit(&events, caret);
    assert_eq!(
        session.active_query().map(|q| q.query_text.as_str()),
        Some("ja")
    );

    session.select(jane()).unwrap();
    assert_eq!(session.surface().serialize(), "hello\nJane Smith ");
    assert_eq!(mention_count(&div), 1);
}

#[wasm_bindgen_test]
fn test_beforeinput_paragraph_inserts_plain_newline() {
    let div = make_div();
    let mut surface = ContentEditableSurface::new(div.clone()).unwrap();
    surface.load(&StoredContent::plain("hello")).unwrap();
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    let ctx = BeforeInputContext {
        input_type: InputType::InsertParagraph,
        data: None,
        target_range: None,
        is_composing: false,
    };
    assert_eq!(
        handle_beforeinput(&mut session, &ctx, 5),
        BeforeInputResult::Handled
    );
    assert_eq!(session.surface().serialize(), "hello\n");
    assert_eq!(div.query_selector_all("div, p").unwrap().length(), 0);
    assert_eq!(div.style().get_property_value("white-space").unwrap(), "pre-wrap");

    // The filler break is invisible to the model and to caret mapping.
    let tree = session.surface().tree().clone();
    assert_eq!(read_tree(&div, &tree), tree);
    let (again, _) = session.surface_mut().read_edits();
    assert!(again.is_empty());
    let (node, offset) = offset_to_dom_position(&div, 6);
    assert!(node.is_same_node(div.first_child().as_ref()));
    assert_eq!(offset, 6);
}

#[wasm_bindgen_test]
fn test_contenteditable_typing_and_selection() {
    let div = make_div();
    let mut surface = ContentEditableSurface::new(div.clone()).unwrap();
    surface.load(&sample_stored()).unwrap();
    assert_eq!(mention_count(&div), 1);

    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    // The user types into the trailing text node.
    div.last_child().unwrap().set_text_content(Some(" and @ap"));
    let (events, caret) = session.surface_mut().read_edits();
    assert!(!events.is_empty());
    assert_eq!(caret, 21);
    session.handle_edit(&events, caret);
    assert_eq!(
        session.active_query().map(|q| q.query_text.as_str()),
        Some("ap")
    );

    // Reading the same DOM again derives nothing.
    let (again, _) = session.surface_mut().read_edits();
    assert!(again.is_empty());

    session.select(MentionToken::project("7", "Apollo")).unwrap();
    assert_eq!(session.surface().serialize(), "hi Jane Smith and Apollo ");
    assert_eq!(mention_count(&div), 2);
    assert!(session.active_query().is_none());
}

#[wasm_bindgen_test]
fn test_contenteditable_removed_span_deletes_mention() {
    let div = make_div();
    let mut surface = ContentEditableSurface::new(div.clone()).unwrap();
    surface.load(&sample_stored()).unwrap();
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    let span = div.query_selector("[data-mention-key]").unwrap().unwrap();
    span.remove();
    let (events, caret) = session.surface_mut().read_edits();
    session.handle_edit(&events, caret);

    assert_eq!(session.surface().serialize(), "hi  and");
    assert!(session.surface().mentions().is_empty());
}

#[wasm_bindgen_test]
fn test_beforeinput_backspace_after_mention() {
    let div = make_div();
    let mut surface = ContentEditableSurface::new(div.clone()).unwrap();
    surface
        .load(&StoredContent::new(
            "hi Jane Smith",
            &[TrackedMention::new(NodeKey(0), jane(), 3)],
        ))
        .unwrap();
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    let ctx = BeforeInputContext {
        input_type: InputType::DeleteContentBackward,
        data: None,
        target_range: None,
        is_composing: false,
    };
    let result = handle_beforeinput(&mut session, &ctx, 13);
    assert_eq!(result, BeforeInputResult::Handled);
    assert_eq!(session.surface().serialize(), "hi ");
    assert_eq!(mention_count(&div), 0);
}

#[wasm_bindgen_test]
fn test_beforeinput_composition_and_formatting() {
    let div = make_div();
    let surface = ContentEditableSurface::new(div).unwrap();
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    let composing = BeforeInputContext {
        input_type: InputType::InsertText,
        data: Some("x".to_string()),
        target_range: None,
        is_composing: true,
    };
    assert_eq!(
        handle_beforeinput(&mut session, &composing, 0),
        BeforeInputResult::PassThrough
    );

    let bold = BeforeInputContext {
        input_type: InputType::parse("formatBold"),
        data: None,
        target_range: None,
        is_composing: false,
    };
    assert_eq!(
        handle_beforeinput(&mut session, &bold, 0),
        BeforeInputResult::Handled
    );
    assert_eq!(session.surface().serialize(), "");
}

// === Textarea surface ===

#[wasm_bindgen_test]
fn test_textarea_select_writes_value_and_caret() {
    let textarea = make_textarea("hi @ja");
    textarea.set_selection_range(6, 6).unwrap();
    let surface = TextareaSurface::new(textarea.clone(), "test-mirror");
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    let (events, caret) = session.surface_mut().read_edits();
    assert!(events.is_empty());
    assert_eq!(caret, 6);
    session.handle_edit(&events, caret);
    assert_eq!(
        session.active_query().map(|q| q.query_text.as_str()),
        Some("ja")
    );

    session.select(jane()).unwrap();
    assert_eq!(textarea.value(), "hi Jane Smith ");
    assert_eq!(textarea.selection_start().unwrap(), Some(14));
    assert_eq!(session.stored().mentions.len(), 1);
}

#[wasm_bindgen_test]
fn test_backspace_over_selection_is_left_to_browser() {
    let textarea = make_textarea("");
    let mut surface = TextareaSurface::new(textarea.clone(), "test-mirror");
    surface
        .load(&StoredContent::new(
            "Jane Smith hello",
            &[TrackedMention::new(NodeKey(0), jane(), 0)],
        ))
        .unwrap();
    let mut session = MentionSession::new(surface, (), MentionConfig::default());

    // " hello" selected, starting right at the mention's end.
    textarea.set_selection_range(10, 16).unwrap();
    let selection = session.surface().read_selection();
    assert_eq!(selection, Some(10..16));
    let result = handle_keydown_event(&mut session, &Key::Backspace, Modifiers::NONE, selection);
    assert_eq!(result, KeydownResult::NotHandled);
    assert_eq!(session.surface().mentions().len(), 1);
    assert_eq!(textarea.value(), "Jane Smith hello");

    // Collapsed at the same spot, the mention goes as one step.
    textarea.set_selection_range(10, 10).unwrap();
    let selection = session.surface().read_selection();
    let result = handle_keydown_event(&mut session, &Key::Backspace, Modifiers::NONE, selection);
    assert_eq!(result, KeydownResult::Handled);
    assert!(session.surface().mentions().is_empty());
    assert_eq!(textarea.value(), " hello");
}

#[wasm_bindgen_test]
fn test_textarea_mirror_measures_and_cleans_up() {
    let textarea = make_textarea("hello @");
    let surface = TextareaSurface::new(textarea, "caret-mirror");

    let rect = surface.measure_caret(6, 16.0).unwrap();
    assert!(rect.top.is_finite());
    assert!(rect.left.is_finite());
    assert!(rect.height >= 16.0);

    let leftover = gloo_utils::document()
        .query_selector("[id^='caret-mirror']")
        .unwrap();
    assert!(leftover.is_none());
}

// === Mounted editor ===

#[wasm_bindgen_test]
fn test_mount_and_load_through_handle() {
    let div = make_div();
    let editor = MentionEditor::content_editable(div.clone(), (), MentionConfig::default()).unwrap();
    let handle: &dyn EditorHandle = &editor;

    handle.load(&sample_stored()).unwrap();
    assert_eq!(handle.stored().unwrap(), sample_stored());
    assert_eq!(mention_count(&div), 1);
    let div_node: &Node = &div;
    assert!(handle.element().unwrap().is_same_node(Some(div_node)));

    drop(editor);
    assert_eq!(div.text_content().unwrap(), "hi Jane Smith and");
}

#[wasm_bindgen_test]
fn test_mount_rejects_invalid_config() {
    let config = MentionConfig {
        trigger: ' ',
        ..MentionConfig::default()
    };
    assert!(MentionEditor::textarea(make_textarea(""), (), config).is_err());
}
