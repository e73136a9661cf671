//! Interactive session: one long-lived app reacting to typed events, live
//! search through the debouncer, and identity changes pushed by the provider.

use std::io::{self, Write};

use diary_core::actions::{Action, ActionInput};
use diary_core::app::{Surface, DELETE_CONFIRMATION, EMOJI_BAR, UNLOCK_PROMPT};
use diary_core::debounce::Debouncer;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::account::role_label;
use super::common::{
    admin_list, owner_list, resolve_note_ref, ListSelector, Session, SessionOptions,
};
use crate::error::CliError;
use crate::surface::ListOutput;

/// Form fields settable with `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    Password,
    AdminEmail,
    AdminPassword,
    Text,
    Passphrase,
    Color,
}

impl FormField {
    pub const ALL: [Self; 8] = [
        Self::Name,
        Self::Email,
        Self::Password,
        Self::AdminEmail,
        Self::AdminPassword,
        Self::Text,
        Self::Passphrase,
        Self::Color,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
            Self::AdminEmail => "admin-email",
            Self::AdminPassword => "admin-password",
            Self::Text => "text",
            Self::Passphrase => "passphrase",
            Self::Color => "color",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Help,
    Quit,
    List,
    Emoji,
    Set {
        field: FormField,
        value: String,
    },
    Action {
        action: Action,
        note: Option<String>,
        value: Option<String>,
    },
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

/// Parse one shell line: a built-in, `set <field> <value>`, or
/// `<action> [note] [value]`. Note-targeting actions take the note
/// reference as their first word; the rest of the line is the value.
pub fn parse_shell_line(line: &str) -> Result<ShellCommand, String> {
    let (head, rest) = split_word(line.trim_end());
    let command = match head {
        "" => ShellCommand::Empty,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        "list" | "ls" => ShellCommand::List,
        "emoji" => ShellCommand::Emoji,
        "set" => {
            let (field, value) = split_word(rest);
            let field = FormField::parse(field).ok_or_else(|| {
                if field.is_empty() {
                    "Usage: set <field> <value>".to_string()
                } else {
                    format!("Unknown field: {field}")
                }
            })?;
            ShellCommand::Set {
                field,
                value: value.to_string(),
            }
        }
        name => {
            let action = name.parse::<Action>().map_err(|error| error.to_string())?;
            let (note, rest) = if action.targets_note() {
                let (note, rest) = split_word(rest);
                if note.is_empty() {
                    return Err(format!("Usage: {name} <note> [value]"));
                }
                (Some(note.to_string()), rest)
            } else {
                (None, rest)
            };
            ShellCommand::Action {
                action,
                note,
                value: (!rest.is_empty()).then(|| rest.to_string()),
            }
        }
    };
    Ok(command)
}

/// `insert-emoji 3` picks the third entry of the bar.
pub fn resolve_emoji(value: &str) -> String {
    value
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| EMOJI_BAR.get(index))
        .map_or_else(|| value.to_string(), |emoji| (*emoji).to_string())
}

pub fn help_text() -> String {
    let mut lines = vec![
        "Commands:".to_string(),
        "  list | emoji | help | quit".to_string(),
        format!(
            "  set <{}> <value>",
            FormField::ALL.map(FormField::name).join("|")
        ),
        "Actions (note refs: #N, id, or id prefix):".to_string(),
    ];
    for action in Action::ALL {
        if action.targets_note() {
            lines.push(format!("  {} <note> [value]", action.name()));
        } else {
            lines.push(format!("  {} [value]", action.name()));
        }
    }
    lines.join("\n")
}

fn print_prompt() {
    print!("diary> ");
    let _ = io::stdout().flush();
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn read_answer(lines: &mut StdinLines, prompt: &str) -> Result<Option<String>, CliError> {
    print!("{prompt} ");
    io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim_end_matches('\r').to_string()))
}

pub async fn run_shell(options: &SessionOptions) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.surface.set_announce_views(true);
    session.surface.set_list_output(ListOutput::Text);

    println!("Signed in: {}", role_label(session.app.role()));
    match session.app.role() {
        diary_core::Role::User => session.surface.render_list(session.app.my_notes()),
        diary_core::Role::Administrator => session.surface.render_list(session.app.all_notes()),
        diary_core::Role::Anonymous => {}
    }
    println!("Type `help` for commands.");

    let delay = session.config.search_debounce();
    let mut search = Debouncer::<String>::new(delay);
    let mut admin_search = Debouncer::<String>::new(delay);
    let mut identity_rx = session.app.subscribe();
    identity_rx.borrow_and_update();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_shell_line(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(command) => {
                        handle_command(&mut session, &mut lines, &search, &admin_search, command)
                            .await?;
                    }
                    Err(message) => println!("{message}"),
                }
                print_prompt();
            }
            Some(query) = search.next() => {
                let _ = session.perform(Action::Search, ActionInput::value(query)).await;
                print_prompt();
            }
            Some(query) = admin_search.next() => {
                let _ = session.perform(Action::AdminSearch, ActionInput::value(query)).await;
                print_prompt();
            }
            changed = identity_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                identity_rx.borrow_and_update();
                session.app.refresh_identity().await;
            }
        }
    }
    println!();
    Ok(())
}

async fn handle_command(
    session: &mut Session,
    lines: &mut StdinLines,
    search: &Debouncer<String>,
    admin_search: &Debouncer<String>,
    command: ShellCommand,
) -> Result<(), CliError> {
    match command {
        ShellCommand::Empty | ShellCommand::Quit => {}
        ShellCommand::Help => println!("{}", help_text()),
        ShellCommand::List => match session.app.role() {
            diary_core::Role::Administrator => {
                session.surface.render_list(session.app.all_notes());
            }
            _ => session.surface.render_list(session.app.my_notes()),
        },
        ShellCommand::Emoji => {
            let bar = EMOJI_BAR
                .iter()
                .enumerate()
                .map(|(index, emoji)| format!("{}:{emoji}", index + 1))
                .collect::<Vec<_>>();
            println!("{}", bar.join("  "));
        }
        ShellCommand::Set { field, value } => set_field(session, field, value),
        ShellCommand::Action {
            action: Action::Search,
            value,
            ..
        } => search.push(value.unwrap_or_default()),
        ShellCommand::Action {
            action: Action::AdminSearch,
            value,
            ..
        } => admin_search.push(value.unwrap_or_default()),
        ShellCommand::Action {
            action,
            note,
            value,
        } => run_action(session, lines, action, note, value).await?,
    }
    Ok(())
}

fn set_field(session: &mut Session, field: FormField, value: String) {
    match field {
        FormField::Name => session.app.auth_form_mut().name = value,
        FormField::Email => session.app.auth_form_mut().email = value,
        FormField::Password => session.app.auth_form_mut().password = value,
        FormField::AdminEmail => session.app.auth_form_mut().admin_email = value,
        FormField::AdminPassword => session.app.auth_form_mut().admin_password = value,
        FormField::Text => session.app.note_form_mut().text = value,
        FormField::Passphrase => session.app.note_form_mut().passphrase = value,
        FormField::Color => session.app.note_form_mut().color = value,
    }
}

async fn run_action(
    session: &mut Session,
    lines: &mut StdinLines,
    action: Action,
    note: Option<String>,
    mut value: Option<String>,
) -> Result<(), CliError> {
    let mut input = ActionInput::none();
    if let Some(raw) = note {
        let list: ListSelector = if matches!(
            action,
            Action::AdminEdit | Action::AdminSave | Action::AdminDelete
        ) {
            admin_list
        } else {
            owner_list
        };
        match resolve_note_ref(list(session), &raw) {
            Ok(id) => input.note = Some(id),
            Err(error) => {
                println!("{error}");
                return Ok(());
            }
        }
    }

    match action {
        Action::Delete | Action::AdminDelete => {
            let answer = read_answer(lines, &format!("{DELETE_CONFIRMATION} [y/N]")).await?;
            let confirmed = answer.is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"));
            session.surface.preset_confirmation(confirmed);
        }
        Action::Unlock if value.is_none() => {
            match read_answer(lines, UNLOCK_PROMPT).await? {
                Some(passphrase) if !passphrase.is_empty() => value = Some(passphrase),
                _ => return Ok(()),
            }
        }
        Action::InsertEmoji => value = value.map(|value| resolve_emoji(&value)),
        _ => {}
    }

    input.value = value;
    // Failures are already on screen.
    let _ = session.perform(action, input).await;
    Ok(())
}
