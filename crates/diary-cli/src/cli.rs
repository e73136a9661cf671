use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "diary")]
#[command(about = "A private diary with an administrator panel, from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Answer yes to confirmations (e.g. delete)
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Quick capture: diary "dear diary..."
    #[arg(trailing_var_arg = true)]
    pub note: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and sign in
    Signup {
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Prompted for when omitted
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
    },
    /// Sign in with email/password, or with Google
    Login {
        #[arg(long, value_name = "EMAIL", required_unless_present = "google")]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
        /// Sign in through Google instead
        #[arg(long, conflicts_with_all = ["email", "password"])]
        google: bool,
    },
    /// Sign in as the configured administrator
    AdminLogin {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Prompted for when omitted
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Write a new note
    #[command(alias = "new")]
    Add {
        /// Note text (stdin or $EDITOR when omitted)
        content: Vec<String>,
        /// Lock the note with a passphrase
        #[arg(long, value_name = "PASSPHRASE")]
        lock: Option<String>,
        /// Background color tag
        #[arg(long, value_name = "COLOR")]
        color: Option<String>,
    },
    /// List your notes, newest first
    List {
        /// Only notes containing this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only notes written on this day (YYYY-MM-DD)
        #[arg(short, long, value_name = "DATE")]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New text ($EDITOR when omitted)
        content: Vec<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Show the text of a locked note
    Unlock {
        /// Note ID or unique ID prefix
        id: String,
        /// Prompted for when omitted
        #[arg(long, value_name = "PASSPHRASE")]
        passphrase: Option<String>,
    },
    /// Save a note, or all visible notes, as PDF
    Export {
        /// Note ID or unique ID prefix (all visible notes when omitted)
        id: Option<String>,
        /// Directory for the PDF (current directory when omitted)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Open a printable view of a note, or all visible notes
    Print {
        /// Note ID or unique ID prefix (all visible notes when omitted)
        id: Option<String>,
    },
    /// Copy a note, or all visible notes, for sharing
    Share {
        /// Note ID or unique ID prefix (all visible notes when omitted)
        id: Option<String>,
    },
    /// Administrator panel
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Interactive session with live search
    Shell,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List every note, optionally filtered by author email
    List {
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the text of any note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New text ($EDITOR when omitted)
        content: Vec<String>,
    },
    /// Delete any note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Address that gets the administrator panel
        #[arg(long, value_name = "EMAIL")]
        admin_email: Option<String>,
        /// Quiet period before a search runs
        #[arg(long, value_name = "MS")]
        search_debounce_ms: Option<u64>,
    },
    /// Print the effective configuration
    Show,
}
