// Character style commands and toolbar state

use rowedit::richtext::inline_style::BlockKind;
use rowedit::richtext::style::{StyleDelta, StyleProperty};
use rowedit::{Range, RowEditor, TitleLevel};

fn editor_with_selection(markup: &str, from: (usize, usize), to: (usize, usize)) -> RowEditor {
    let mut editor = RowEditor::from_markup(markup);
    let doc = editor.document();
    let range = Range::from_boundaries(
        doc.boundary_at(from.0, from.1).unwrap(),
        doc.boundary_at(to.0, to.1).unwrap(),
    );
    editor.select(range);
    editor
}

#[test]
fn bold_across_rows() {
    let mut editor = editor_with_selection("<div>123456</div><div>abcdef</div>", (0, 2), (1, 3));
    editor.bold(true).unwrap();
    insta::assert_snapshot!(
        editor.to_markup(),
        @r#"<div>12<span style="font-weight: bold;">3456</span></div><div><span style="font-weight: bold;">abc</span>def</div>"#
    );
    assert!(editor.active_status().bold);
}

#[test]
fn apply_then_remove_restores_shape() {
    let original = "<div>123456</div><div>abcdef</div>";
    let mut editor = editor_with_selection(original, (0, 2), (1, 3));
    editor.italic(true).unwrap();
    editor.italic(false).unwrap();
    insta::assert_snapshot!(editor.to_markup(), @"<div>123456</div><div>abcdef</div>");
}

#[test]
fn overlapping_styles_merge_and_intersect() {
    let mut editor = editor_with_selection("<div>abcdef</div>", (0, 0), (0, 4));
    editor.bold(true).unwrap();

    let doc = editor.document();
    let range = Range::from_boundaries(doc.boundary_at(0, 2).unwrap(), doc.boundary_at(0, 6).unwrap());
    editor.select(range);
    editor.italic(true).unwrap();

    insta::assert_snapshot!(
        editor.to_markup(),
        @r#"<div><span style="font-weight: bold;">ab</span><span style="font-weight: bold; font-style: italic;">cd</span><span style="font-style: italic;">ef</span></div>"#
    );
    let status = editor.active_status();
    assert!(status.italic);
    assert!(!status.bold);
}

#[test]
fn remove_style_set_by_enclosing_span() {
    let mut editor = editor_with_selection(
        r#"<div><span style="font-weight: bold;">a<span style="font-style: italic;">bc</span></span></div>"#,
        (0, 1),
        (0, 3),
    );
    assert!(editor.check_active_status().bold);

    editor.bold(false).unwrap();
    insta::assert_snapshot!(
        editor.to_markup(),
        @r#"<div><span style="font-weight: bold;">a</span><span style="font-style: italic;">bc</span></div>"#
    );
    let status = editor.active_status();
    assert!(!status.bold);
    assert!(status.italic);

    editor.bold(true).unwrap();
    insta::assert_snapshot!(
        editor.to_markup(),
        @r#"<div><span style="font-weight: bold;">a</span><span style="font-weight: bold; font-style: italic;">bc</span></div>"#
    );
    assert!(editor.active_status().bold);
}

#[test]
fn format_text_with_combined_delta() {
    let mut editor = editor_with_selection("<div>abc</div>", (0, 0), (0, 3));
    let delta = StyleDelta::new()
        .set(StyleProperty::Color, "red")
        .set(StyleProperty::FontWeight, "bold");
    editor.format_text(&delta).unwrap();
    insta::assert_snapshot!(
        editor.to_markup(),
        @r#"<div><span style="font-weight: bold; color: red;">abc</span></div>"#
    );

    editor
        .format_text(&StyleDelta::new().unset(StyleProperty::Color))
        .unwrap();
    insta::assert_snapshot!(
        editor.to_markup(),
        @r#"<div><span style="font-weight: bold;">abc</span></div>"#
    );
}

#[test]
fn title_levels() {
    let mut editor = editor_with_selection(
        r#"<div>a<span style="font-weight: bold;">b</span></div><div>c</div>"#,
        (0, 0),
        (1, 1),
    );
    editor.title(Some(TitleLevel::H1));
    insta::assert_snapshot!(editor.to_markup(), @"<div><h1>ab</h1></div><div><h1>c</h1></div>");
    assert_eq!(editor.active_status().block_kind, Some(BlockKind::Title(TitleLevel::H1)));

    editor.title(None);
    insta::assert_snapshot!(editor.to_markup(), @"<div>ab</div><div>c</div>");
    assert_eq!(editor.active_status().block_kind, Some(BlockKind::Paragraph));
}
