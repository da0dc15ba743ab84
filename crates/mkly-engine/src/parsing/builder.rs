use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    document::{Block, Document, LineCol, SourceComment},
    kit::{ContentMode, KitRegistry},
};

use super::{
    ParseOptions,
    directives::{DirectiveKind, OpenDirective, join_body, push_raw, valid_key},
    tokenizer::{TokenKind, TokenizedLine},
};

/// Whether a `mixed` block is still reading properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Properties,
    Content,
}

/// A block whose lines are still being absorbed.
#[derive(Debug)]
struct OpenBlock {
    block: Block,
    mode: ContentMode,
    phase: Phase,
    lines: Vec<String>,
    end: LineCol,
}

impl OpenBlock {
    fn new(block_type: String, label: Option<String>, mode: ContentMode, t: &TokenizedLine) -> Self {
        let start = LineCol {
            line: t.line,
            column: t.column,
        };
        let mut block = Block::new(block_type);
        block.label = label;
        block.verbatim = mode == ContentMode::Verbatim;
        block.position.start = start;
        Self {
            block,
            mode,
            phase: Phase::Properties,
            lines: vec![],
            end: LineCol {
                line: t.line,
                column: t.end_column,
            },
        }
    }

    fn touch(&mut self, t: &TokenizedLine) {
        self.end = LineCol {
            line: t.line,
            column: t.end_column,
        };
    }

    fn into_block(mut self) -> Block {
        self.block.content = join_body(&self.lines);
        self.block.position.end = self.end;
        self.block
    }
}

/// The innermost thing currently absorbing lines.
#[derive(Debug)]
enum Leaf {
    None,
    Block(OpenBlock),
    Directive(OpenDirective),
}

/// Stack machine turning a token stream into a [`Document`].
///
/// Containers live on an explicit stack and stay open until their closing
/// marker; every other block is a leaf that ends at the next marker.
pub struct BlockBuilder<'r> {
    registry: &'r KitRegistry,
    options: ParseOptions,
    containers: Vec<OpenBlock>,
    leaf: Leaf,
    doc: Document,
    diags: Diagnostics,
}

impl<'r> BlockBuilder<'r> {
    pub fn new(registry: &'r KitRegistry, options: ParseOptions) -> Self {
        Self {
            registry,
            options,
            containers: vec![],
            leaf: Leaf::None,
            doc: Document::new(),
            diags: Diagnostics::new(),
        }
    }

    pub fn push(&mut self, t: &TokenizedLine) {
        match &t.kind {
            TokenKind::BlockStart { block_type, label } => {
                self.open(block_type, label.clone(), t);
            }
            TokenKind::BlockEnd { block_type } => self.close(block_type, t),
            _ => self.absorb(t),
        }
    }

    pub fn finish(mut self) -> (Document, Vec<Diagnostic>) {
        // EOF closes everything silently
        self.flush_leaf();
        while let Some(container) = self.containers.pop() {
            self.attach(container.into_block());
        }
        (self.doc, self.diags.into_vec())
    }

    fn open(&mut self, block_type: &str, label: Option<String>, t: &TokenizedLine) {
        self.flush_leaf();

        if let Some(kind) = DirectiveKind::from_name(block_type) {
            self.leaf = Leaf::Directive(OpenDirective::new(kind, label, t.line));
            return;
        }

        let (mode, container) = match self.registry.block_type(block_type) {
            Some(def) => (def.content_mode, def.container),
            None => {
                self.diags.push(
                    Diagnostic::warning(format!("Unknown block type \"{block_type}\""), t.line)
                        .with_block_type(block_type),
                );
                (ContentMode::Mixed, false)
            }
        };

        let open = OpenBlock::new(block_type.to_string(), label, mode, t);
        if container {
            self.containers.push(open);
        } else {
            self.leaf = Leaf::Block(open);
        }
    }

    fn close(&mut self, block_type: &str, t: &TokenizedLine) {
        match &mut self.leaf {
            Leaf::Block(open) if open.block.block_type == block_type => {
                open.touch(t);
                self.flush_leaf();
                return;
            }
            Leaf::Directive(open) if open.kind().name() == block_type => {
                self.flush_leaf();
                return;
            }
            _ => {}
        }

        if self
            .containers
            .last()
            .is_some_and(|c| c.block.block_type == block_type)
        {
            self.flush_leaf();
            if let Some(mut container) = self.containers.pop() {
                container.touch(t);
                self.attach(container.into_block());
            }
            return;
        }

        self.diags.push(
            Diagnostic::warning(
                format!("Closing marker \"--- /{block_type}\" has no matching opening block"),
                t.line,
            )
            .with_block_type(block_type),
        );
    }

    fn absorb(&mut self, t: &TokenizedLine) {
        if let TokenKind::Comment { text } = &t.kind {
            let raw_body = matches!(&self.leaf, Leaf::Block(open) if open.mode == ContentMode::Verbatim);
            if !raw_body {
                self.record_comment(text);
            }
        }

        match &mut self.leaf {
            Leaf::Directive(open) => {
                open.absorb(t, &mut self.diags);
                return;
            }
            Leaf::Block(open) => {
                absorb_into(open, t, self.registry, self.options, &mut self.diags);
                return;
            }
            Leaf::None => {}
        }

        match self.containers.last_mut() {
            Some(open) => absorb_into(open, t, self.registry, self.options, &mut self.diags),
            None => {
                if matches!(t.kind, TokenKind::Text | TokenKind::Property { .. }) {
                    self.diags.push(Diagnostic::warning(
                        "Content outside of any block is ignored",
                        t.line,
                    ));
                }
            }
        }
    }

    fn record_comment(&mut self, text: &str) {
        if !self.containers.is_empty() {
            return;
        }
        let pending = matches!(self.leaf, Leaf::Block(_)) as usize;
        self.doc.comments.push(SourceComment {
            before_block: self.doc.blocks.len() + pending,
            text: text.to_string(),
        });
    }

    fn flush_leaf(&mut self) {
        match std::mem::replace(&mut self.leaf, Leaf::None) {
            Leaf::None => {}
            Leaf::Block(open) => self.attach(open.into_block()),
            Leaf::Directive(open) => open.finish(&mut self.doc, self.registry, &mut self.diags),
        }
    }

    fn attach(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(parent) => {
                if block.position.end > parent.end {
                    parent.end = block.position.end;
                }
                parent.block.children.push(block);
            }
            None => self.doc.blocks.push(block),
        }
    }
}

fn absorb_into(
    open: &mut OpenBlock,
    t: &TokenizedLine,
    registry: &KitRegistry,
    options: ParseOptions,
    diags: &mut Diagnostics,
) {
    match (&t.kind, open.mode) {
        (TokenKind::Comment { .. }, ContentMode::Verbatim) => {
            push_raw(&mut open.lines, &t.raw);
        }
        (TokenKind::Comment { .. }, _) => return,
        (TokenKind::Blank, ContentMode::Mixed) if open.phase == Phase::Properties => {
            open.phase = Phase::Content;
            return;
        }
        (TokenKind::Blank, ContentMode::Properties) => return,
        (TokenKind::Blank, _) => {
            push_raw(&mut open.lines, &t.raw);
            return;
        }
        (TokenKind::Property { key, value }, ContentMode::Properties) => {
            accept_property(open, key, value, t.line, registry, diags);
        }
        (TokenKind::Property { key, value }, ContentMode::Mixed)
            if open.phase == Phase::Properties =>
        {
            accept_property(open, key, value, t.line, registry, diags);
        }
        (_, ContentMode::Properties) => {
            diags.push(
                Diagnostic::warning(
                    format!(
                        "Unexpected content in properties-only block \"{}\"",
                        open.block.block_type
                    ),
                    t.line,
                )
                .with_block_type(open.block.block_type.clone()),
            );
            return;
        }
        (_, ContentMode::Mixed) => {
            if open.phase == Phase::Properties {
                open.phase = Phase::Content;
                if options.strict_mixed_separation && !open.block.properties.is_empty() {
                    diags.push(
                        Diagnostic::warning(
                            "Missing blank line between properties and content",
                            t.line,
                        )
                        .with_block_type(open.block.block_type.clone()),
                    );
                }
            }
            push_raw(&mut open.lines, &t.raw);
        }
        _ => push_raw(&mut open.lines, &t.raw),
    }
    open.touch(t);
}

fn accept_property(
    open: &mut OpenBlock,
    key: &str,
    value: &str,
    line: usize,
    registry: &KitRegistry,
    diags: &mut Diagnostics,
) {
    let block_type = open.block.block_type.as_str();
    if !valid_key(key, block_type, line, diags) {
        return;
    }
    if let Some(def) = registry
        .block_type(block_type)
        .and_then(|d| d.property_def(key))
        && !def.shape.accepts(value)
    {
        diags.push(
            Diagnostic::error(
                format!(
                    "Property \"{key}\" on {block_type} must be {}, got \"{value}\"",
                    def.shape.describe()
                ),
                line,
            )
            .with_block_type(block_type)
            .with_property(key),
        );
        return;
    }
    open.block
        .properties
        .insert(key.to_string(), value.to_string());
}
