use uuid::Uuid;

use super::*;
use crate::model::{Page, ShapeDetails};

const HOME: u128 = 1000;
const OTHER: u128 = 2000;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn doc_with(home: Vec<Button>, other: Vec<Button>) -> CanvasDoc {
    let mut doc = CanvasDoc::new();
    doc.load_pages(vec![
        Page { buttons: home, ..Page::new(id(HOME), "home", 0) },
        Page { buttons: other, ..Page::new(id(OTHER), "other", 1) },
    ]);
    doc
}

fn plain(n: u128) -> Button {
    Button::new(id(n), id(HOME))
}

fn page_button(n: u128, target: u128) -> Button {
    let mut button = plain(n);
    button.kind = ButtonKind::Page;
    button.action = ButtonAction::Page { target_page: id(target) };
    button
}

fn clicks(doc: &CanvasDoc, n: u128) -> u64 {
    doc.button(&id(n)).map_or(0, |b| b.clicks)
}

// =============================================================
// Edit mode
// =============================================================

#[test]
fn edit_click_selects_then_deselects() {
    let mut doc = doc_with(vec![plain(1), plain(2)], vec![]);
    let mut selection = None;

    assert_eq!(dispatch(&mut doc, &mut selection, &id(1), Mode::Edit), vec![Action::SelectionChanged(Some(id(1)))]);
    assert_eq!(dispatch(&mut doc, &mut selection, &id(2), Mode::Edit), vec![Action::SelectionChanged(Some(id(2)))]);
    assert_eq!(dispatch(&mut doc, &mut selection, &id(2), Mode::Edit), vec![Action::SelectionChanged(None)]);
    assert_eq!(selection, None);
    assert_eq!(clicks(&doc, 1), 0);
    assert_eq!(clicks(&doc, 2), 0);
}

#[test]
fn edit_click_on_unknown_button_does_nothing() {
    let mut doc = doc_with(vec![plain(1)], vec![]);
    let mut selection = Some(id(1));
    assert!(dispatch(&mut doc, &mut selection, &id(9), Mode::Edit).is_empty());
    assert_eq!(selection, Some(id(1)));
}

// =============================================================
// Live mode
// =============================================================

#[test]
fn live_click_counts_and_reports_new_total() {
    let mut doc = doc_with(vec![plain(1)], vec![]);
    let mut selection = None;
    dispatch(&mut doc, &mut selection, &id(1), Mode::Live);
    let actions = dispatch(&mut doc, &mut selection, &id(1), Mode::Live);

    let expected = PartialButton { clicks: Some(2), ..Default::default() };
    assert_eq!(actions, vec![Action::ButtonUpdated { id: id(1), fields: expected }]);
    assert_eq!(selection, None);
}

#[test]
fn live_click_never_touches_other_buttons() {
    let mut doc = doc_with(vec![page_button(1, OTHER), plain(2)], vec![plain(3)]);
    let before_two = doc.button(&id(2)).cloned();
    let before_three = doc.button(&id(3)).cloned();

    activate(&mut doc, &id(1));

    assert_eq!(doc.button(&id(2)).cloned(), before_two);
    assert_eq!(doc.button(&id(3)).cloned(), before_three);
}

#[test]
fn page_button_navigates() {
    let mut doc = doc_with(vec![page_button(1, OTHER)], vec![]);
    let actions = activate(&mut doc, &id(1));
    assert_eq!(actions.last(), Some(&Action::NavigateTo(id(OTHER))));
    assert_eq!(clicks(&doc, 1), 1);
}

#[test]
fn missing_target_page_still_counts() {
    let mut doc = doc_with(vec![page_button(1, 7777)], vec![]);
    let actions = activate(&mut doc, &id(1));
    assert_eq!(actions.len(), 1);
    assert_eq!(clicks(&doc, 1), 1);
}

#[test]
fn kind_and_payload_must_agree() {
    let mut button = plain(1);
    button.kind = ButtonKind::File;
    button.action = ButtonAction::Page { target_page: id(OTHER) };
    let mut doc = doc_with(vec![button], vec![]);
    let actions = activate(&mut doc, &id(1));
    assert!(!actions.iter().any(|a| matches!(a, Action::NavigateTo(_))));
}

#[test]
fn hidden_button_is_not_activated() {
    let mut button = plain(1);
    button.is_active = false;
    let mut doc = doc_with(vec![button], vec![]);
    assert!(activate(&mut doc, &id(1)).is_empty());
    assert_eq!(clicks(&doc, 1), 0);
}

// =============================================================
// Viewers
// =============================================================

#[test]
fn media_button_opens_viewer() {
    let mut button = plain(1);
    button.kind = ButtonKind::StandaloneMedia;
    button.action = ButtonAction::Media { url: "https://cdn/clip.mp4".into(), media_type: "video".into() };
    let mut doc = doc_with(vec![button], vec![]);

    let actions = activate(&mut doc, &id(1));
    assert!(actions.contains(&Action::OpenViewer {
        url: "https://cdn/clip.mp4".into(),
        kind: ViewerKind::Media { media_type: "video".into() },
    }));
}

#[test]
fn file_button_opens_viewer_with_file_details() {
    let mut button = plain(1);
    button.kind = ButtonKind::File;
    button.action =
        ButtonAction::File { url: "https://cdn/a.pdf".into(), file_name: "a.pdf".into(), file_type: "pdf".into() };
    let mut doc = doc_with(vec![button], vec![]);

    let actions = activate(&mut doc, &id(1));
    assert!(actions.contains(&Action::OpenViewer {
        url: "https://cdn/a.pdf".into(),
        kind: ViewerKind::File { file_name: "a.pdf".into(), file_type: "pdf".into() },
    }));
}

#[test]
fn blank_media_url_opens_nothing() {
    let mut button = plain(1);
    button.kind = ButtonKind::Media;
    button.action = ButtonAction::Media { url: "  ".into(), media_type: "image".into() };
    let mut doc = doc_with(vec![button], vec![]);

    let actions = activate(&mut doc, &id(1));
    assert_eq!(actions.len(), 1);
    assert_eq!(clicks(&doc, 1), 1);
}

// =============================================================
// Shapes and links
// =============================================================

#[test]
fn shape_runs_its_embedded_action() {
    let mut button = plain(1);
    button.kind = ButtonKind::Shape;
    button.shape_details = Some(ShapeDetails {
        action: ButtonAction::Page { target_page: id(OTHER) },
        ..Default::default()
    });
    let mut doc = doc_with(vec![button], vec![]);

    let actions = activate(&mut doc, &id(1));
    assert!(actions.contains(&Action::NavigateTo(id(OTHER))));
}

#[test]
fn shape_without_details_only_counts() {
    let mut button = plain(1);
    button.kind = ButtonKind::Shape;
    let mut doc = doc_with(vec![button], vec![]);
    assert_eq!(activate(&mut doc, &id(1)).len(), 1);
}

#[test]
fn linked_button_adds_scroll_hint() {
    let mut button = plain(1);
    button.linked_button_id = Some(id(3));
    let mut doc = doc_with(vec![button], vec![Button::new(id(3), id(OTHER))]);

    let actions = activate(&mut doc, &id(1));
    assert!(actions.contains(&Action::ScrollTo { page: id(OTHER), button: id(3) }));
    assert_eq!(clicks(&doc, 3), 0);
}

#[test]
fn dangling_link_is_skipped() {
    let mut button = plain(1);
    button.linked_button_id = Some(id(404));
    let mut doc = doc_with(vec![button], vec![]);

    let actions = activate(&mut doc, &id(1));
    assert!(!actions.iter().any(|a| matches!(a, Action::ScrollTo { .. })));
    assert_eq!(clicks(&doc, 1), 1);
}
