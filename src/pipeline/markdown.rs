use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Options, Parser, Tag};
use regex::Regex;

static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>|<!--.*?-->").expect("valid html tag regex"));
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

fn push_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn push_block_break(out: &mut String) {
    push_newline(out);
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}

pub fn to_plain_text(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_TABLES);

    let mut out = String::with_capacity(markdown.len());
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Item) => push_newline(&mut out),
            Event::Start(Tag::TableCell) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\t');
                }
            }
            Event::Start(_) => {}
            Event::End(tag) => match tag {
                Tag::Paragraph
                | Tag::Heading(..)
                | Tag::BlockQuote
                | Tag::CodeBlock(_)
                | Tag::List(_)
                | Tag::Table(_) => push_block_break(&mut out),
                Tag::TableRow | Tag::TableHead => push_newline(&mut out),
                _ => {}
            },
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::Html(html) => out.push_str(&HTML_TAG_RE.replace_all(&html, "")),
            Event::SoftBreak | Event::HardBreak | Event::Rule => push_newline(&mut out),
            Event::TaskListMarker(checked) => out.push_str(if checked { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(_) => {}
        }
    }

    let collapsed = BLANK_LINES_RE.replace_all(&out, "\n\n");
    collapsed.trim().to_string()
}
