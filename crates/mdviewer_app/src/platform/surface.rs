use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mdviewer_core::AppViewModel;
use mdviewer_engine::{SafeMarkup, Surface};
use mdviewer_logging::{viewer_debug, viewer_error};
use tempfile::NamedTempFile;

const CLEAR_AND_HOME: &str = "\x1b[2J\x1b[H";

/// Draws the plain-text rendition of the document, then the status line.
pub struct TerminalSurface<W: Write> {
    out: W,
    document: String,
    status: String,
    offset: usize,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            document: String::new(),
            status: String::new(),
            offset: 0,
        }
    }

    fn redraw(&mut self) {
        if let Err(err) = self.draw() {
            viewer_error!("terminal write failed: {}", err);
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        write!(self.out, "{CLEAR_AND_HOME}")?;
        for line in self.document.lines().skip(self.offset) {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "-- {}", self.status)?;
        self.out.flush()
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    // Drawn by the `scroll_to_top` that follows every presented render.
    fn present(&mut self, markup: &SafeMarkup) {
        self.document = markup.text().to_string();
    }

    fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.redraw();
    }

    fn show_status(&mut self, view: &AppViewModel) {
        self.status = view.status_text();
        self.offset = view.scroll_offset as usize;
        self.redraw();
    }
}

/// Keeps an HTML file in sync with the displayed document.
///
/// Every write goes to a temp file in the target's directory that is then
/// renamed over the target, so a browser reloading the page never sees a
/// half-written file.
pub struct HtmlFileSurface {
    target: PathBuf,
    body: String,
    status: String,
}

impl HtmlFileSurface {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            body: String::new(),
            status: String::new(),
        }
    }

    fn publish(&self) {
        match write_atomically(&self.target, &self.page()) {
            Ok(()) => viewer_debug!("wrote {:?}", self.target),
            Err(err) => viewer_error!("cannot write {:?}: {}", self.target, err),
        }
    }

    fn page(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}\n<footer><small>{status}</small></footer>\n</body>\n</html>\n",
            title = escape(&self.status),
            body = self.body,
            status = escape(&self.status),
        )
    }
}

impl Surface for HtmlFileSurface {
    fn present(&mut self, markup: &SafeMarkup) {
        self.body = markup.html().to_string();
        self.publish();
    }

    // A rewritten page opens at the top.
    fn scroll_to_top(&mut self) {}

    fn show_status(&mut self, view: &AppViewModel) {
        let status = view.status_text();
        if status != self.status {
            self.status = status;
            self.publish();
        }
    }
}

fn write_atomically(target: &Path, content: &str) -> io::Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(target).map_err(|err| err.error)?;
    Ok(())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
