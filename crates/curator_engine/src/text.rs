use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;

/// Renders the text a reader would see for `element`, roughly like `innerText`:
/// whitespace is collapsed, block elements start on a new line and
/// scripting or template content is skipped.
pub fn visible_text(element: ElementRef) -> String {
    let mut ctx = TextContext::default();
    visit_children(element, &mut ctx);
    ctx.into_text()
}

fn visit_node(node: NodeRef<'_, Node>, ctx: &mut TextContext) {
    match node.value() {
        Node::Text(text) => ctx.append_text(text),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, ctx);
            }
        }
        _ => {
            for child in node.children() {
                visit_node(child, ctx);
            }
        }
    }
}

fn visit_element(element: ElementRef, ctx: &mut TextContext) {
    let tag = element.value().name().to_ascii_lowercase();
    match tag.as_str() {
        "script" | "style" | "noscript" | "template" | "svg" => {}
        "br" => ctx.ensure_newline(),
        "p" | "div" | "section" | "article" | "header" | "footer" | "li" | "ul" | "ol" | "h1"
        | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "figure" | "figcaption" | "tr" => {
            ctx.ensure_newline();
            visit_children(element, ctx);
            ctx.ensure_newline();
        }
        _ => visit_children(element, ctx),
    }
}

fn visit_children(element: ElementRef, ctx: &mut TextContext) {
    for child in element.children() {
        visit_node(child, ctx);
    }
}

#[derive(Default)]
struct TextContext {
    builder: String,
    last_char: Option<char>,
}

impl TextContext {
    fn into_text(self) -> String {
        self.builder
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if self.last_char == Some(' ') || self.last_char == Some('\n') {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn ensure_newline(&mut self) {
        if self.last_char == Some('\n') || self.builder.is_empty() {
            return;
        }
        self.push_char('\n');
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::visible_text;

    fn first(html: &str, sel: &str) -> String {
        let doc = Html::parse_fragment(html);
        let selector = Selector::parse(sel).unwrap();
        let element = doc.select(&selector).next().unwrap();
        visible_text(element)
    }

    #[test]
    fn collapses_whitespace_and_breaks_blocks() {
        let text = first(
            "<div id=x><span>Hello\n   world</span><p>Second   line</p></div>",
            "#x",
        );
        assert_eq!(text, "Hello world\nSecond line");
    }

    #[test]
    fn skips_script_and_style() {
        let text = first(
            "<div id=x>keep<script>var a = 1;</script><style>.a{}</style> this</div>",
            "#x",
        );
        assert_eq!(text, "keep this");
    }

    #[test]
    fn br_starts_new_line() {
        assert_eq!(first("<span id=x>a<br>b</span>", "#x"), "a\nb");
    }
}
