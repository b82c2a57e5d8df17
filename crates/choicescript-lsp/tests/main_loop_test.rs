//! Integration tests driving the main loop state with in-memory channels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use choicescript_lsp::main_loop::{Event, MainLoopState};
use choicescript_lsp::{ChoiceScriptSettings, ConfigStore, LanguageService};
use crossbeam_channel::Receiver;
use lsp_server::{Message, Notification, Request, RequestId};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument,
    Notification as _, PublishDiagnostics,
};
use lsp_types::request::{HoverRequest, Request as _};
use lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, HoverParams, Position, PublishDiagnosticsParams,
    TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem,
    TextDocumentPositionParams, Uri, VersionedTextDocumentIdentifier,
};

const URI: &str = "file:///nonexistent-game/chapter1.txt";

// ============================================================================
// Helper Functions
// ============================================================================

fn settings(dir: &tempfile::TempDir) -> ChoiceScriptSettings {
    let mut settings = ChoiceScriptSettings::default();
    settings.diagnostics.spellcheck.user_dictionary_path = Some(dir.path().join("user.txt"));
    settings
}

fn setup(dir: &tempfile::TempDir) -> (MainLoopState, Receiver<Message>) {
    let config = Arc::new(ConfigStore::new(settings(dir)));
    let service = LanguageService::new("choicescript", config).unwrap();
    let (sender, receiver) = crossbeam_channel::unbounded();
    (MainLoopState::new(sender, service), receiver)
}

fn uri() -> Uri {
    URI.parse().unwrap()
}

fn notify<P: serde::Serialize>(state: &mut MainLoopState, method: &str, params: P) {
    let notif = Notification::new(method.to_string(), params);
    state.handle_event(Event::Message(Message::Notification(notif)));
}

fn open(state: &mut MainLoopState, text: &str) {
    open_uri(state, &uri(), text);
}

fn open_uri(state: &mut MainLoopState, uri: &Uri, text: &str) {
    notify(
        state,
        DidOpenTextDocument::METHOD,
        DidOpenTextDocumentParams {
            text_document: TextDocumentItem::new(
                uri.clone(),
                "choicescript".to_string(),
                1,
                text.to_string(),
            ),
        },
    );
}

fn close_uri(state: &mut MainLoopState, uri: &Uri) {
    notify(
        state,
        DidCloseTextDocument::METHOD,
        DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier::new(uri.clone()),
        },
    );
}

fn change(state: &mut MainLoopState, version: i32, text: &str) {
    change_uri(state, &uri(), version, text);
}

fn change_uri(state: &mut MainLoopState, uri: &Uri, version: i32, text: &str) {
    notify(
        state,
        DidChangeTextDocument::METHOD,
        DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier::new(uri.clone(), version),
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.to_string(),
            }],
        },
    );
}

/// Drain outgoing messages, keeping published diagnostics.
fn published(receiver: &Receiver<Message>) -> Vec<PublishDiagnosticsParams> {
    receiver
        .try_iter()
        .filter_map(|msg| match msg {
            Message::Notification(notif) if notif.method == PublishDiagnostics::METHOD => {
                serde_json::from_value(notif.params).ok()
            }
            _ => None,
        })
        .collect()
}

fn hover_request(state: &mut MainLoopState, id: i32) {
    let params = HoverParams {
        text_document_position_params: TextDocumentPositionParams::new(
            TextDocumentIdentifier::new(uri()),
            Position::new(1, 7),
        ),
        work_done_progress_params: Default::default(),
    };
    let req = Request::new(RequestId::from(id), HoverRequest::METHOD.to_string(), params);
    state.handle_event(Event::Message(Message::Request(req)));
}

fn response(receiver: &Receiver<Message>) -> lsp_server::Response {
    receiver
        .try_iter()
        .find_map(|msg| match msg {
            Message::Response(resp) => Some(resp),
            _ => None,
        })
        .unwrap()
}

// ============================================================================
// Document lifecycle
// ============================================================================

#[test]
fn test_open_publishes_once() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);

    open(&mut state, "*goto_scene nonexistent\n");

    let published = published(&receiver);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].uri, uri());
    assert_eq!(published[0].version, Some(1));
    assert_eq!(published[0].diagnostics.len(), 1);
}

#[test]
fn test_burst_of_changes_publishes_once() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    open(&mut state, "Start.\n");
    published(&receiver);

    for version in 2..=6 {
        change(&mut state, version, &format!("*goto_scene nowhere{version}\n"));
    }
    assert!(published(&receiver).is_empty());
    assert!(state.next_deadline().is_some());

    state.handle_event(Event::Tick(Instant::now() + Duration::from_secs(2)));

    let published = published(&receiver);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].version, Some(6));
    assert!(published[0].diagnostics[0].message.contains("nowhere6"));
    assert!(state.next_deadline().is_none());
}

#[test]
fn test_close_clears_and_cancels() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    open(&mut state, "*goto_scene nonexistent\n");
    change(&mut state, 2, "*goto_scene elsewhere\n");
    published(&receiver);

    close_uri(&mut state, &uri());

    let closed = published(&receiver);
    assert_eq!(closed.len(), 1);
    assert!(closed[0].diagnostics.is_empty());

    state.handle_event(Event::Tick(Instant::now() + Duration::from_secs(2)));
    assert!(published(&receiver).is_empty());
    assert!(state.service().index().get(&uri()).is_none());
}

/// A game directory on disk with two scenes, chapter1 jumping into chapter2.
fn write_project(dir: &tempfile::TempDir) -> (Uri, Uri) {
    let game = dir.path().join("game");
    std::fs::create_dir(&game).unwrap();
    std::fs::write(game.join("chapter1.txt"), "*goto_scene chapter2 fight\n").unwrap();
    std::fs::write(game.join("chapter2.txt"), "*label fight\nSwords!\n").unwrap();

    let file_uri = |name: &str| -> Uri {
        format!("file://{}", game.join(name).display()).parse().unwrap()
    };
    (file_uri("chapter1.txt"), file_uri("chapter2.txt"))
}

fn codes_for(published: &[PublishDiagnosticsParams], uri: &Uri) -> Vec<String> {
    published
        .iter()
        .filter(|params| params.uri == *uri)
        .flat_map(|params| &params.diagnostics)
        .filter_map(|d| match &d.code {
            Some(lsp_types::NumberOrString::String(code)) => Some(code.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_closed_scene_falls_back_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    let (chapter1, chapter2) = write_project(&dir);

    open_uri(&mut state, &chapter1, "*goto_scene chapter2 fight\n");
    open_uri(&mut state, &chapter2, "*label fight\nSwords!\n");
    assert!(codes_for(&published(&receiver), &chapter1).is_empty());

    close_uri(&mut state, &chapter2);
    let after_close = published(&receiver);
    assert!(after_close.iter().any(|params| params.uri == chapter1));
    assert!(codes_for(&after_close, &chapter1).is_empty());

    change_uri(&mut state, &chapter1, 2, "The end.\n*goto_scene chapter2 fight\n");
    state.handle_event(Event::Tick(Instant::now() + Duration::from_secs(2)));

    let after_edit = published(&receiver);
    assert!(after_edit.iter().any(|params| params.uri == chapter1));
    assert!(codes_for(&after_edit, &chapter1).is_empty());
    assert_eq!(state.service().index().get(&chapter2).unwrap().version, 0);
}

#[test]
fn test_closing_deleted_scene_updates_project() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    let (chapter1, chapter2) = write_project(&dir);

    open_uri(&mut state, &chapter1, "*goto_scene chapter2 fight\n");
    open_uri(&mut state, &chapter2, "*label fight\nSwords!\n");
    published(&receiver);

    std::fs::remove_file(dir.path().join("game").join("chapter2.txt")).unwrap();
    close_uri(&mut state, &chapter2);

    assert!(state.service().index().get(&chapter2).is_none());
    assert_eq!(
        codes_for(&published(&receiver), &chapter1),
        vec!["unresolvedScene"]
    );
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_configuration_change_republishes() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    open(&mut state, "We saw teh castle.\n");
    assert_eq!(published(&receiver)[0].diagnostics.len(), 1);

    let mut disabled = settings(&dir);
    disabled.diagnostics.spellcheck.enabled = false;
    notify(
        &mut state,
        DidChangeConfiguration::METHOD,
        DidChangeConfigurationParams {
            settings: serde_json::json!({ "choicescript": disabled }),
        },
    );

    let republished = published(&receiver);
    assert_eq!(republished.len(), 1);
    assert!(republished[0].diagnostics.is_empty());
    assert!(!state.service().config().get().diagnostics.spellcheck.enabled);
}

#[test]
fn test_disabled_provider_answers_null() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    open(&mut state, "*create points 0\n*set points + 1\n");
    published(&receiver);

    let mut mode = state.service().config().get().mode.clone();
    mode.hovers = false;
    state.service().config().set_mode_configuration(mode);
    state.drain_config_events();
    published(&receiver);

    hover_request(&mut state, 7);
    let resp = response(&receiver);
    assert_eq!(resp.id, RequestId::from(7));
    assert_eq!(resp.result, Some(serde_json::Value::Null));
}

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_hover_request() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);
    open(&mut state, "*create points 0\n*set points + 1\n");
    published(&receiver);

    hover_request(&mut state, 1);
    let resp = response(&receiver);
    assert!(resp.error.is_none());
    let text = resp.result.unwrap().to_string();
    assert!(text.contains("points"));
}

#[test]
fn test_unknown_request_is_method_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, receiver) = setup(&dir);

    let req = Request::new(
        RequestId::from(3),
        "choicescript/unknown".to_string(),
        serde_json::Value::Null,
    );
    state.handle_event(Event::Message(Message::Request(req)));

    let error = response(&receiver).error.unwrap();
    assert_eq!(error.code, lsp_server::ErrorCode::MethodNotFound as i32);
}

#[test]
fn test_exit_notification() {
    let dir = tempfile::tempdir().unwrap();
    let (mut state, _receiver) = setup(&dir);
    assert!(!state.exit_requested());

    notify(&mut state, "exit", serde_json::Value::Null);
    assert!(state.exit_requested());
}
