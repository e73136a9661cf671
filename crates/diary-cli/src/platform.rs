//! Desktop capabilities for exports: the system clipboard, files and a
//! browser-based print view.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use diary_core::export::{Clipboard, FileSaver, ManualCopy, Platform, PrintDialog};
use diary_core::Result;

/// The native clipboard through `arboard`.
pub struct SystemClipboard {
    inner: Arc<Mutex<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new(clipboard: arboard::Clipboard) -> Self {
        Self {
            inner: Arc::new(Mutex::new(clipboard)),
        }
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> std::result::Result<(), String> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut clipboard = inner
                .lock()
                .map_err(|_| "clipboard lock poisoned".to_string())?;
            clipboard.set_text(text).map_err(|error| error.to_string())
        })
        .await
        .map_err(|error| error.to_string())?
    }
}

/// Wraps a freshly opened clipboard, or `None` when the session has none
/// (headless, SSH), so copies fall through to manual copy.
pub fn system_clipboard(
    opened: std::result::Result<arboard::Clipboard, arboard::Error>,
) -> Option<Arc<dyn Clipboard>> {
    match opened {
        Ok(clipboard) => Some(Arc::new(SystemClipboard::new(clipboard))),
        Err(error) => {
            tracing::debug!("Clipboard unavailable: {}", error);
            None
        }
    }
}

/// Prints the text so it can be copied from the terminal.
pub struct StdoutManualCopy;

impl ManualCopy for StdoutManualCopy {
    fn present(&self, text: &str) {
        println!("----- copy below -----\n{text}\n----- copy above -----");
    }
}

/// Writes files into a fixed directory.
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

type Opener = fn(&Path) -> std::io::Result<()>;

fn open_in_browser(path: &Path) -> std::io::Result<()> {
    open::that(path)
}

/// Writes the print document to a temp file and opens it in the browser,
/// where the system print dialog is one shortcut away.
pub struct BrowserPrint {
    dir: PathBuf,
    opener: Opener,
}

impl BrowserPrint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_opener(dir, open_in_browser)
    }

    fn with_opener(dir: impl Into<PathBuf>, opener: Opener) -> Self {
        Self {
            dir: dir.into(),
            opener,
        }
    }

    fn write_view(&self, html: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "diary-print-{}.html",
            chrono::Utc::now().timestamp_millis()
        ));
        std::fs::write(&path, html)?;
        Ok(path)
    }
}

impl PrintDialog for BrowserPrint {
    fn print(&self, html: &str) -> Result<()> {
        let path = self.write_view(html)?;
        match (self.opener)(&path) {
            Ok(()) => println!("Opened print view {}", path.display()),
            Err(error) => {
                tracing::warn!("Failed to open print view: {}", error);
                println!("Print view written to {}", path.display());
            }
        }
        Ok(())
    }
}

/// Capabilities for the terminal: no native share sheet.
pub fn terminal_platform(output_dir: PathBuf) -> Platform {
    Platform {
        share: None,
        clipboard: system_clipboard(arboard::Clipboard::new()),
        manual_copy: Arc::new(StdoutManualCopy),
        files: Arc::new(DirectorySaver::new(output_dir)),
        printer: Arc::new(BrowserPrint::new(std::env::temp_dir())),
    }
}
