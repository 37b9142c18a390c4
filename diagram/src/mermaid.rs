//! Mermaid flowchart statements
//!
//! Node shapes tell entity kinds apart:
//!
//! | kind | shape |
//! |---|---|
//! | commit | `abcd(((abcd)))` |
//! | tree | `abcd{abcd}` |
//! | blob | `abcd[abcd]` |
//! | branch, remote ref | `main[[main]]` |
//! | HEAD | `HEAD{{HEAD}}` |
//! | index | `Index[(index)]` |
//! | placeholder | `empty((empty))` |
//!
//! Repeating a node id is harmless, so every statement carries its shapes
//! inline instead of declaring nodes up front.
//!
//! Labels holding characters Mermaid reads as syntax are written quoted,
//! e.g. `abcd["abcd fn main()"]`; everything else is written bare.

use std::borrow::Cow;
use std::fmt;

pub const DIAGRAM_OPEN: &str = "```mermaid";
pub const DIAGRAM_CLOSE: &str = "```";
pub const GRAPH_DIRECTION: &str = "graph LR";

/// Characters that end or reshape a bare label
const LABEL_SYNTAX: &[char] = &['(', ')', '[', ']', '{', '}', '<', '>', '|', '"', ';', '#'];

pub const HEAD_ID: &str = "HEAD";
pub const INDEX_ID: &str = "Index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub fill: &'static str,
    pub stroke: Option<&'static str>,
    pub color: &'static str,
}

pub const INDEX_HIGHLIGHT: Highlight = Highlight {
    fill: "#e3f542",
    stroke: Some("#333"),
    color: "#000000",
};

pub const HEAD_HIGHLIGHT: Highlight = Highlight {
    fill: "#266e38",
    stroke: Some("#333"),
    color: "#ffffff",
};

pub const REMOTE_HIGHLIGHT: Highlight = Highlight {
    fill: "#1cb8e8",
    stroke: None,
    color: "#000000",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Id only, the shape comes from another statement
    Bare,
    Commit,
    Tree,
    Blob,
    Ref,
    Head,
    Index,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: Shape,
}

impl Node {
    fn shaped(id: impl Into<String>, label: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape,
        }
    }

    pub fn bare(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::shaped(id.clone(), id, Shape::Bare)
    }

    pub fn commit(short: &str) -> Self {
        Self::shaped(short, short, Shape::Commit)
    }

    pub fn tree(short: &str) -> Self {
        Self::shaped(short, short, Shape::Tree)
    }

    /// Blob node, with the preview appended to the label when present
    pub fn blob(short: &str, preview: Option<&str>) -> Self {
        let label = match preview {
            Some(text) => format!("{} {}", short, text),
            None => short.to_string(),
        };
        Self::shaped(short, label, Shape::Blob)
    }

    pub fn reference(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::shaped(id, label, Shape::Ref)
    }

    pub fn head() -> Self {
        Self::shaped(HEAD_ID, HEAD_ID, Shape::Head)
    }

    pub fn index() -> Self {
        Self::shaped(INDEX_ID, "index", Shape::Index)
    }

    pub fn placeholder() -> Self {
        Self::shaped("empty", "empty", Shape::Placeholder)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.shape {
            Shape::Bare => return f.write_str(&self.id),
            Shape::Commit => ("(((", ")))"),
            Shape::Tree => ("{", "}"),
            Shape::Blob => ("[", "]"),
            Shape::Ref => ("[[", "]]"),
            Shape::Head => ("{{", "}}"),
            Shape::Index => ("[(", ")]"),
            Shape::Placeholder => ("((", "))"),
        };
        write!(f, "{}{}{}{}", self.id, open, label_text(&self.label), close)
    }
}

/// `text` as it can appear inside a shape or on an edge
pub fn label_text(text: &str) -> Cow<'_, str> {
    if !text.contains(LABEL_SYNTAX) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(format!("\"{}\"", text.replace('"', "#quot;")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    /// `-->`
    Solid,
    /// `-.->`, used for commit history
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Node(Node),
    Edge {
        from: Node,
        to: Node,
        label: Option<String>,
        style: EdgeStyle,
    },
    Style {
        id: String,
        highlight: Highlight,
    },
    SubgraphStart(String),
    SubgraphEnd,
}

impl Statement {
    pub fn edge(from: Node, to: Node) -> Self {
        Statement::Edge {
            from,
            to,
            label: None,
            style: EdgeStyle::Solid,
        }
    }

    pub fn labeled_edge(from: Node, label: impl Into<String>, to: Node) -> Self {
        Statement::Edge {
            from,
            to,
            label: Some(label.into()),
            style: EdgeStyle::Solid,
        }
    }

    pub fn history_edge(from: Node, to: Node) -> Self {
        Statement::Edge {
            from,
            to,
            label: None,
            style: EdgeStyle::Dotted,
        }
    }

    pub fn style(id: impl Into<String>, highlight: Highlight) -> Self {
        Statement::Style {
            id: id.into(),
            highlight,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Node(node) => write!(f, "{}", node),
            Statement::Edge {
                from,
                to,
                label,
                style,
            } => match (style, label) {
                (EdgeStyle::Solid, None) => write!(f, "{}-->{}", from, to),
                (EdgeStyle::Solid, Some(label)) => {
                    write!(f, "{}--{}-->{}", from, label_text(label), to)
                }
                (EdgeStyle::Dotted, None) => write!(f, "{}-.->{}", from, to),
                (EdgeStyle::Dotted, Some(label)) => {
                    write!(f, "{}-.{}.->{}", from, label_text(label), to)
                }
            },
            Statement::Style { id, highlight } => {
                write!(f, "style {} fill:{}", id, highlight.fill)?;
                if let Some(stroke) = highlight.stroke {
                    write!(f, ",stroke:{}", stroke)?;
                }
                write!(f, ",color:{}", highlight.color)
            }
            Statement::SubgraphStart(name) => write!(f, "subgraph {}", name),
            Statement::SubgraphEnd => f.write_str("end"),
        }
    }
}
