use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("document too large (max {max_bytes} bytes, actual {actual})")]
    TooLarge { max_bytes: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub max_input_bytes: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_input_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Rendered document, safe to hand to a presentation surface.
///
/// Raw HTML from the source has been escaped and script-capable link
/// targets removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeMarkup {
    html: String,
    text: String,
}

impl SafeMarkup {
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Plain-text rendition for surfaces that cannot show markup.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Converts document source into displayable markup. Must be pure.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str) -> Result<SafeMarkup, RenderError>;
}

#[derive(Debug, Default, Clone)]
pub struct MarkdownRenderer {
    settings: RenderSettings,
}

impl MarkdownRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &str) -> Result<SafeMarkup, RenderError> {
        if source.len() > self.settings.max_input_bytes {
            return Err(RenderError::TooLarge {
                max_bytes: self.settings.max_input_bytes,
                actual: source.len(),
            });
        }

        let events: Vec<Event<'_>> = Parser::new_ext(source, Options::all())
            .map(sanitize)
            .collect();

        let mut html_output = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut html_output, events.iter().cloned());

        Ok(SafeMarkup {
            html: html_output,
            text: plain_text(&events),
        })
    }
}

fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        // Shown as literal text instead of being interpreted.
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url, false),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url, true),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>, image: bool) -> CowStr<'_> {
    // Browsers ignore embedded whitespace and control characters in schemes.
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();

    let blocked = scheme.starts_with("javascript:")
        || scheme.starts_with("vbscript:")
        || (scheme.starts_with("data:") && !(image && scheme.starts_with("data:image/")));

    if blocked {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

fn plain_text(events: &[Event<'_>]) -> String {
    let mut out = String::new();
    let mut heading: Option<(HeadingLevel, usize)> = None;

    for event in events {
        match event {
            Event::Text(text) | Event::Code(text) | Event::InlineMath(text) => out.push_str(text),
            Event::DisplayMath(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("----\n\n"),
            Event::TaskListMarker(done) => out.push_str(if *done { "[x] " } else { "[ ] " }),
            Event::Start(Tag::Heading { level, .. }) => heading = Some((*level, out.len())),
            Event::Start(Tag::Item) => out.push_str("* "),
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, start)) = heading.take() {
                    let width = out[start..].chars().count().max(1);
                    let rule = if level == HeadingLevel::H1 { '=' } else { '-' };
                    out.push('\n');
                    out.extend(std::iter::repeat(rule).take(width));
                }
                out.push_str("\n\n");
            }
            Event::End(TagEnd::Paragraph | TagEnd::CodeBlock) => out.push_str("\n\n"),
            Event::End(TagEnd::Item | TagEnd::TableRow | TagEnd::TableHead) => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push('\t'),
            _ => {}
        }
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

#[cfg(test)]
mod tests {
    use super::{MarkdownRenderer, RenderError, RenderSettings, Renderer};

    fn render(source: &str) -> super::SafeMarkup {
        MarkdownRenderer::default().render(source).expect("render ok")
    }

    #[test]
    fn heading_and_body() {
        let markup = render("# Title\n\nBody\n");
        assert!(markup.html().contains("<h1>Title</h1>"));
        assert!(markup.html().contains("<p>Body</p>"));
        assert_eq!(markup.text(), "Title\n=====\n\nBody");
    }

    #[test]
    fn raw_html_is_escaped() {
        let markup = render("<script>alert(1)</script>\n\nhi <b>there</b>\n");
        assert!(!markup.html().contains("<script>"));
        assert!(markup.html().contains("&lt;script&gt;"));
        assert!(!markup.html().contains("<b>"));
    }

    #[test]
    fn script_links_are_neutralized() {
        let markup = render("[x](javascript:alert(1)) [y]( JaVaScRiPt:alert(2)) [z](https://example.com)\n");
        assert!(!markup.html().to_ascii_lowercase().contains("javascript:"));
        assert!(markup.html().contains("href=\"https://example.com\""));
    }

    #[test]
    fn data_images_allowed_but_data_links_blocked() {
        let markup = render("![i](data:image/png;base64,AAAA) [d](data:text/html;base64,AAAA)\n");
        assert!(markup.html().contains("src=\"data:image/png;base64,AAAA\""));
        assert!(!markup.html().contains("data:text/html"));
    }

    #[test]
    fn oversized_input_fails() {
        let renderer = MarkdownRenderer::new(RenderSettings { max_input_bytes: 4 });
        assert_eq!(
            renderer.render("# Title\n"),
            Err(RenderError::TooLarge {
                max_bytes: 4,
                actual: 8,
            })
        );
    }

    #[test]
    fn list_items_in_text() {
        let markup = render("* one\n* two\n");
        assert_eq!(markup.text(), "* one\n* two");
    }
}
