//! Export and share helpers over the rendered list.
//!
//! Platform capabilities sit behind small traits so each front end can
//! provide whatever it actually has. A missing share sheet or clipboard is
//! represented by `None` and the helpers fall through to the next option.

mod pdf;

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Identity, NoteId};
use crate::render::{RenderedList, RowBody};

pub use pdf::{render_pdf, PdfLayout};

pub const ENTRY_SEPARATOR: &str = "----------------------";
pub const DOCUMENT_TITLE: &str = "My Diary";
pub const NOTE_SHARE_TITLE: &str = "My Diary Note";
pub const COLLECTION_SHARE_TITLE: &str = "My Diary Notes";

/// Native share sheet.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    /// `Err` means the user dismissed the sheet or sharing failed.
    async fn share(&self, title: &str, text: &str) -> std::result::Result<(), String>;
}

/// System clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> std::result::Result<(), String>;
}

/// Last resort when no clipboard is reachable: put the text somewhere the
/// user can copy it by hand.
pub trait ManualCopy: Send + Sync {
    fn present(&self, text: &str);
}

/// Destination for generated files such as PDFs.
pub trait FileSaver: Send + Sync {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Opens a printable document.
pub trait PrintDialog: Send + Sync {
    fn print(&self, html: &str) -> Result<()>;
}

/// Capabilities available to a front end.
#[derive(Clone)]
pub struct Platform {
    pub share: Option<Arc<dyn ShareSheet>>,
    pub clipboard: Option<Arc<dyn Clipboard>>,
    pub manual_copy: Arc<dyn ManualCopy>,
    pub files: Arc<dyn FileSaver>,
    pub printer: Arc<dyn PrintDialog>,
}

/// How a share request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Cancelled,
    Copied,
    ManuallyCopied,
}

impl ShareOutcome {
    /// Message to surface to the user, if any.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Shared => None,
            Self::Cancelled => Some("Share canceled or not supported."),
            Self::Copied | Self::ManuallyCopied => {
                Some("Copied to clipboard (share not supported on this device).")
            }
        }
    }
}

/// Concatenate the currently visible, unlocked rows.
///
/// Locked rows are skipped. The header names `viewer_email`, or `User` when
/// no email is known.
#[must_use]
pub fn collect_visible(list: &RenderedList, viewer_email: Option<&str>) -> String {
    let email = viewer_email
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .unwrap_or("User");

    let mut output = format!("Diary - {email}\n\n");
    for row in list.rows() {
        let RowBody::Text(text) = &row.body else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        let _ = writeln!(output, "[{}]", row.header());
        let _ = writeln!(output, "{text}");
        let _ = writeln!(output, "{ENTRY_SEPARATOR}");
    }
    output
}

/// Render `text` as a PDF and hand it to the platform's file saver.
pub fn export_pdf(text: &str, file_name: &str, files: &dyn FileSaver) -> Result<PathBuf> {
    let bytes = render_pdf(text, &PdfLayout::default());
    let path = files.save(file_name, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved pdf");
    Ok(path)
}

/// HTML print document holding `text` verbatim.
#[must_use]
pub fn print_document(text: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{DOCUMENT_TITLE}</title></head>\
         <body><pre style=\"white-space: pre-wrap;\">{}</pre></body></html>",
        escape_html(text)
    )
}

/// Open a print view for `text`.
pub fn print_view(text: &str, printer: &dyn PrintDialog) -> Result<()> {
    printer.print(&print_document(text))
}

/// Share `text` natively under `title`, else copy it to the clipboard, else
/// fall back to manual copy.
pub async fn share_or_copy(title: &str, text: &str, platform: &Platform) -> ShareOutcome {
    if let Some(share) = &platform.share {
        return match share.share(title, text).await {
            Ok(()) => ShareOutcome::Shared,
            Err(reason) => {
                debug!(%reason, "share sheet dismissed");
                ShareOutcome::Cancelled
            }
        };
    }
    copy_text(text, platform).await
}

/// Copy `text` with the best available mechanism.
pub async fn copy_text(text: &str, platform: &Platform) -> ShareOutcome {
    if let Some(clipboard) = &platform.clipboard {
        match clipboard.write_text(text).await {
            Ok(()) => return ShareOutcome::Copied,
            Err(reason) => warn!(%reason, "clipboard write failed; falling back to manual copy"),
        }
    }
    platform.manual_copy.present(text);
    ShareOutcome::ManuallyCopied
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// `diary-<local part>.pdf`, or `diary-me.pdf` without an email.
#[must_use]
pub fn collection_file_name(identity: Option<&Identity>) -> String {
    let stem = identity
        .and_then(Identity::email_local_part)
        .map(sanitize_file_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "me".to_string());
    format!("diary-{stem}.pdf")
}

/// `note-<id>.pdf`
#[must_use]
pub fn note_file_name(id: &NoteId) -> String {
    format!("note-{}.pdf", sanitize_file_stem(id.as_str()))
}

fn sanitize_file_stem(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording capability fakes shared with app tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Recorder {
        pub shared: Mutex<Vec<(String, String)>>,
        pub copied: Mutex<Vec<String>>,
        pub manual: Mutex<Vec<String>>,
        pub saved: Mutex<Vec<(String, Vec<u8>)>>,
        pub printed: Mutex<Vec<String>>,
        pub share_fails: bool,
        pub clipboard_fails: bool,
    }

    #[async_trait]
    impl ShareSheet for Recorder {
        async fn share(&self, title: &str, text: &str) -> std::result::Result<(), String> {
            if self.share_fails {
                return Err("AbortError".to_string());
            }
            self.shared
                .lock()
                .unwrap()
                .push((title.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl Clipboard for Recorder {
        async fn write_text(&self, text: &str) -> std::result::Result<(), String> {
            if self.clipboard_fails {
                return Err("denied".to_string());
            }
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl ManualCopy for Recorder {
        fn present(&self, text: &str) {
            self.manual.lock().unwrap().push(text.to_string());
        }
    }

    impl FileSaver for Recorder {
        fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
            self.saved
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(file_name))
        }
    }

    impl PrintDialog for Recorder {
        fn print(&self, html: &str) -> Result<()> {
            self.printed.lock().unwrap().push(html.to_string());
            Ok(())
        }
    }

    /// Platform backed by `recorder`, with share and clipboard toggled.
    pub fn platform(recorder: &Arc<Recorder>, share: bool, clipboard: bool) -> Platform {
        Platform {
            share: share.then(|| Arc::clone(recorder) as Arc<dyn ShareSheet>),
            clipboard: clipboard.then(|| Arc::clone(recorder) as Arc<dyn Clipboard>),
            manual_copy: Arc::clone(recorder) as Arc<dyn ManualCopy>,
            files: Arc::clone(recorder) as Arc<dyn FileSaver>,
            printer: Arc::clone(recorder) as Arc<dyn PrintDialog>,
        }
    }
}
