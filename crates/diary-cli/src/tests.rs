use clap::Parser;
use diary_core::actions::Action;
use diary_core::config::DiaryConfig;
use diary_core::models::{NoteId, NoteRecord};
use diary_core::render::{RenderedList, Viewer};
use pretty_assertions::assert_eq;

use crate::cli::{AdminCommands, Cli, Commands, CompletionShell};
use crate::commands::common::{
    default_editor, normalize_content, normalize_note_identifier, resolve_note_ref, row_text,
};
use crate::commands::completions::{completion_script, run_completions};
use crate::commands::config::ConfigUpdate;
use crate::commands::export::Delivery;
use crate::error::CliError;

fn record(id: &str, text: &str, lock: Option<&str>) -> NoteRecord {
    NoteRecord {
        id: NoteId::from(id),
        owner_id: "u1".to_string(),
        owner_email: "a@example.com".to_string(),
        text: text.to_string(),
        color: None,
        lock: lock.map(diary_core::lock::Lock::from_passphrase),
        created_at: None,
    }
}

fn rendered() -> RenderedList {
    let mut list = RenderedList::new(Viewer::Owner);
    list.replace(&[
        record("aaa111", "first", None),
        record("aaa222", "second", Some("pw")),
        record("bbb333", "third", None),
    ]);
    list
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn normalize_note_identifier_rejects_empty() {
    assert!(matches!(
        normalize_note_identifier("   "),
        Err(CliError::EmptyNoteId)
    ));
    assert_eq!(normalize_note_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn resolve_note_ref_supports_row_number_exact_and_prefix() {
    let list = rendered();

    assert_eq!(resolve_note_ref(&list, "#1").unwrap().as_str(), "aaa111");
    assert_eq!(resolve_note_ref(&list, "#3").unwrap().as_str(), "bbb333");
    assert_eq!(resolve_note_ref(&list, "aaa222").unwrap().as_str(), "aaa222");
    assert_eq!(resolve_note_ref(&list, "bb").unwrap().as_str(), "bbb333");
}

#[test]
fn resolve_note_ref_rejects_ambiguous_prefix() {
    let error = resolve_note_ref(&rendered(), "aaa").unwrap_err();
    let CliError::AmbiguousNoteId(message) = error else {
        panic!("expected ambiguity, got {error:?}");
    };
    assert!(message.contains("matches 2 notes"));
}

#[test]
fn resolve_note_ref_rejects_missing_rows() {
    let list = rendered();
    for raw in ["#0", "#4", "#x", "zzz"] {
        assert!(
            matches!(resolve_note_ref(&list, raw), Err(CliError::NoteNotFound(_))),
            "{raw} should not resolve"
        );
    }
}

#[test]
fn row_text_hides_locked_notes() {
    let list = rendered();
    assert_eq!(row_text(&list, &NoteId::from("aaa111")).as_deref(), Some("first"));
    assert_eq!(row_text(&list, &NoteId::from("aaa222")), None);
    assert_eq!(row_text(&list, &NoteId::from("nope")), None);
}

#[test]
fn bare_words_are_quick_capture() {
    let cli = Cli::try_parse_from(["diary", "dear", "diary"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.note, vec!["dear", "diary"]);
}

#[test]
fn login_requires_email_unless_google() {
    assert!(Cli::try_parse_from(["diary", "login"]).is_err());
    assert!(Cli::try_parse_from(["diary", "login", "--google"]).is_ok());
    assert!(Cli::try_parse_from(["diary", "login", "--google", "--email", "a@b.c"]).is_err());

    let cli = Cli::try_parse_from(["diary", "login", "--email", "a@b.c"]).unwrap();
    let Some(Commands::Login {
        email,
        password,
        google,
    }) = cli.command
    else {
        panic!("expected login");
    };
    assert_eq!(email.as_deref(), Some("a@b.c"));
    assert_eq!(password, None);
    assert!(!google);
}

#[test]
fn yes_flag_is_global() {
    let cli = Cli::try_parse_from(["diary", "delete", "abc", "-y"]).unwrap();
    assert!(cli.yes);
    assert!(matches!(cli.command, Some(Commands::Delete { id }) if id == "abc"));
}

#[test]
fn add_accepts_lock_and_color() {
    let cli = Cli::try_parse_from([
        "diary", "add", "--lock", "pw", "--color", "#ffeeaa", "secret", "words",
    ])
    .unwrap();
    let Some(Commands::Add {
        content,
        lock,
        color,
    }) = cli.command
    else {
        panic!("expected add");
    };
    assert_eq!(content, vec!["secret", "words"]);
    assert_eq!(lock.as_deref(), Some("pw"));
    assert_eq!(color.as_deref(), Some("#ffeeaa"));
}

#[test]
fn admin_list_filters_by_email() {
    let cli = Cli::try_parse_from(["diary", "admin", "list", "--email", "bob", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Admin {
            command: AdminCommands::List { email: Some(ref email), json: true }
        }) if email == "bob"
    ));
}

#[test]
fn delivery_picks_single_or_collection_action() {
    assert_eq!(Delivery::Pdf.action(true), Action::ExportPdf);
    assert_eq!(Delivery::Pdf.action(false), Action::ExportAllPdf);
    assert_eq!(Delivery::Print.action(true), Action::Print);
    assert_eq!(Delivery::Print.action(false), Action::PrintAll);
    assert_eq!(Delivery::Share.action(true), Action::Share);
    assert_eq!(Delivery::Share.action(false), Action::ShareAll);
}

#[test]
fn config_update_overrides_only_given_values() {
    let existing = DiaryConfig {
        supabase_url: Some("https://old.supabase.co".to_string()),
        admin_email: "old@example.com".to_string(),
        ..DiaryConfig::default()
    };
    let updated = ConfigUpdate {
        admin_email: Some("  boss@example.com ".to_string()),
        search_debounce_ms: Some(400),
        ..ConfigUpdate::default()
    }
    .apply(existing);

    assert_eq!(updated.supabase_url.as_deref(), Some("https://old.supabase.co"));
    assert_eq!(updated.admin_email, "boss@example.com");
    assert_eq!(updated.search_debounce_ms, 400);
    assert_eq!(updated.supabase_anon_key, None);
}

#[test]
fn run_completions_creates_missing_folders() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("completions").join("diary.bash");

    run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("_diary()"));
    assert!(script.contains("complete -F _diary"));
}

#[test]
fn completion_scripts_target_the_diary_binary() {
    let zsh = String::from_utf8(completion_script(CompletionShell::Zsh)).unwrap();
    assert!(zsh.starts_with("#compdef diary"));

    let fish = String::from_utf8(completion_script(CompletionShell::Fish)).unwrap();
    assert!(fish.contains("complete -c diary"));
}
