//! Markdown-to-tree building over the pulldown-cmark event stream.
//!
//! Supported constructs build real blocks; everything else (tables,
//! footnotes, math, images, raw HTML) degrades to its text content. The
//! builder tracks open containers on a stack; a mismatched stack at the end
//! of the stream reports `ParseIncomplete` so the caller can fall back.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use smol_str::SmolStr;

use crate::span::{Link, Marks, Span};
use crate::tree::{Block, DocTree, ListBlock, ListItem};

/// The event stream ended with open containers; the tree is unusable.
#[derive(Debug)]
pub(crate) struct ParseIncomplete;

pub(crate) fn parse_document(source: &str) -> Result<DocTree, ParseIncomplete> {
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH);
    let mut builder = TreeBuilder::default();
    for event in parser {
        builder.event(event);
    }
    builder.finish()
}

enum Container {
    Quote(Vec<Block>),
    List(ListBlock),
    Item(ListItem),
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Block>,
    containers: Vec<Container>,
    run: Vec<Span>,
    marks: Marks,
    link: Option<Link>,
    /// (language, accumulated code) while inside a code block.
    code: Option<(SmolStr, String)>,
    broken: bool,
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, code)) = &mut self.code {
                    code.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(text) => {
                self.run.push(Span {
                    text: text.to_string(),
                    marks: self.marks | Marks::CODE,
                    link: self.link.clone(),
                });
            }
            Event::SoftBreak | Event::HardBreak => self.push_text("\n"),
            Event::Rule => self.push_block(Block::Rule),
            Event::InlineHtml(html) => match html.trim() {
                "<u>" => self.marks.insert(Marks::UNDERLINE),
                "</u>" => self.marks.remove(Marks::UNDERLINE),
                // Other inline tags vanish; their inner text still arrives
                // as Text events.
                _ => {}
            },
            Event::Html(html) => {
                let text = strip_tags(&html);
                if !text.trim().is_empty() {
                    self.push_block(Block::paragraph(text.trim().to_string()));
                }
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => self.push_text(&math),
            Event::FootnoteReference(name) => self.push_text(&name),
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " });
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Heading { .. } => {}
            Tag::BlockQuote(_) => {
                self.flush_run_into_item();
                self.containers.push(Container::Quote(Vec::new()));
            }
            Tag::List(start) => {
                self.flush_run_into_item();
                self.containers.push(Container::List(ListBlock {
                    ordered: start.is_some(),
                    start: start.unwrap_or(1),
                    items: Vec::new(),
                }));
            }
            Tag::Item => self.containers.push(Container::Item(ListItem {
                spans: Vec::new(),
                nested: None,
            })),
            Tag::CodeBlock(kind) => {
                self.flush_run_into_item();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => SmolStr::new(lang.as_ref()),
                    CodeBlockKind::Indented => SmolStr::default(),
                };
                self.code = Some((language, String::new()));
            }
            Tag::Emphasis => self.marks.insert(Marks::ITALIC),
            Tag::Strong => self.marks.insert(Marks::BOLD),
            Tag::Strikethrough => self.marks.insert(Marks::STRIKE),
            Tag::Link {
                dest_url, title, ..
            } => {
                self.link = Some(if title.is_empty() {
                    Link::new(dest_url.as_ref())
                } else {
                    Link::with_title(dest_url.as_ref(), title.as_ref())
                });
            }
            // Images degrade to their alt text, which flows as Text events.
            Tag::Image { .. } => {}
            // Tables, footnote definitions, and anything else: the text
            // content flows through; the structure is dropped.
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_run_as_paragraph(),
            TagEnd::Heading(level) => {
                let spans = std::mem::take(&mut self.run);
                self.push_block(Block::Heading {
                    level: level as u8,
                    spans,
                });
            }
            TagEnd::BlockQuote(_) => match self.containers.pop() {
                Some(Container::Quote(blocks)) => self.push_block(Block::Quote { blocks }),
                other => self.misnested(other),
            },
            TagEnd::List(_) => match self.containers.pop() {
                Some(Container::List(list)) => match self.containers.last_mut() {
                    Some(Container::Item(item)) => match &mut item.nested {
                        Some(existing) => existing.items.extend(list.items),
                        none => *none = Some(list),
                    },
                    _ => self.push_block(Block::List(list)),
                },
                other => self.misnested(other),
            },
            TagEnd::Item => {
                // Tight-list items carry bare text with no paragraph events.
                self.flush_run_into_item();
                match self.containers.pop() {
                    Some(Container::Item(item)) => match self.containers.last_mut() {
                        Some(Container::List(list)) => list.items.push(item),
                        _ => {
                            self.broken = true;
                        }
                    },
                    other => self.misnested(other),
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    self.push_block(Block::Code { language, code });
                }
            }
            TagEnd::Emphasis => self.marks.remove(Marks::ITALIC),
            TagEnd::Strong => self.marks.remove(Marks::BOLD),
            TagEnd::Strikethrough => self.marks.remove(Marks::STRIKE),
            TagEnd::Link => self.link = None,
            TagEnd::Image => {}
            // Degraded structures: flush accumulated text at row boundaries
            // so table content at least survives as paragraphs.
            TagEnd::TableHead | TagEnd::TableRow => self.flush_run_as_paragraph(),
            _ => {}
        }
    }

    fn misnested(&mut self, popped: Option<Container>) {
        if let Some(container) = popped {
            self.containers.push(container);
        }
        self.broken = true;
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let span = Span {
            text: text.to_string(),
            marks: self.marks,
            link: self.link.clone(),
        };
        // Extend the previous span when the style is unchanged.
        if let Some(last) = self.run.last_mut() {
            if last.marks == span.marks && last.link == span.link {
                last.text.push_str(&span.text);
                return;
            }
        }
        self.run.push(span);
    }

    /// Move pending inline content into the innermost open list item.
    fn flush_run_into_item(&mut self) {
        if self.run.is_empty() {
            return;
        }
        if let Some(Container::Item(item)) = self.containers.last_mut() {
            item.spans.append(&mut self.run);
        }
    }

    fn flush_run_as_paragraph(&mut self) {
        let mut spans = std::mem::take(&mut self.run);
        if let Some(Container::Item(item)) = self.containers.last_mut() {
            // Paragraph inside a list item (loose list): fold into the item
            // run with a soft-break separator.
            if !item.spans.is_empty() && !spans.is_empty() {
                item.spans.push(Span::text("\n"));
            }
            item.spans.append(&mut spans);
            return;
        }
        self.push_block(Block::Paragraph { spans });
    }

    fn push_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Quote(blocks)) => blocks.push(block),
            Some(Container::Item(item)) => match block {
                Block::List(list) => match &mut item.nested {
                    Some(existing) => existing.items.extend(list.items),
                    none => *none = Some(list),
                },
                other => {
                    // Non-list block inside an item degrades to text.
                    let text = other.plain_text();
                    if !text.is_empty() {
                        if !item.spans.is_empty() {
                            item.spans.push(Span::text("\n"));
                        }
                        item.spans.push(Span::text(text));
                    }
                }
            },
            Some(Container::List(_)) | None => self.root.push(block),
        }
    }

    fn finish(mut self) -> Result<DocTree, ParseIncomplete> {
        if !self.run.is_empty() {
            self.flush_run_as_paragraph();
        }
        if self.broken || !self.containers.is_empty() || self.code.is_some() {
            return Err(ParseIncomplete);
        }
        Ok(DocTree::from_blocks(self.root))
    }
}

/// Drop anything inside angle brackets, keeping text content.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
