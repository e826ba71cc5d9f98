//! Bidirectional conversion between the document tree and markdown source.
//!
//! Both directions are total: `to_rich` falls back to wrapping the raw source
//! in a single paragraph when the builder cannot assemble a tree, and
//! `to_markdown` falls back to the tree's concatenated plain text if the
//! writer fails. Round-trips are idempotent for the supported construct set;
//! anything else degrades to its nearest textual approximation.

mod parser;
mod writer;


use crate::tree::DocTree;

/// Serialize a document tree to markdown source. Never fails.
pub fn to_markdown(tree: &DocTree) -> String {
    match writer::write_document(tree) {
        Ok(md) => md,
        Err(_) => {
            tracing::warn!("markdown writer failed, falling back to plain text");
            tree.blocks
                .iter()
                .map(|b| b.plain_text())
                .collect::<Vec<_>>()
                .join("\n\n")
        }
    }
}

/// Parse markdown source into a document tree. Never fails.
pub fn to_rich(source: &str) -> DocTree {
    if source.trim().is_empty() {
        return DocTree::new();
    }
    match parser::parse_document(source) {
        Ok(tree) => tree,
        Err(_) => {
            tracing::warn!("markdown parse incomplete, wrapping source in a paragraph");
            DocTree::from_blocks(vec![crate::tree::Block::paragraph(source)])
        }
    }
}
