//! Presentation templates for the run log.
//!
//! A small subset of the doctemplate syntax:
//!
//! - `$count$` interpolates the number of records.
//! - `$for(records)$ ... $endfor$` repeats its body once per record, oldest first.
//! - Inside the loop, `$it.field$` (or `$records.field$`) interpolates one of
//!   `revision`, `author`, `message`, `status`, `file`.
//! - `$$` is a literal dollar sign.
//!
//! Every interpolated value is HTML-escaped. Templates are validated when compiled, so
//! rendering itself cannot fail.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::TemplateError;
use crate::run_log::RunRecord;

/// Used when no template file sits next to the log.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/report.html");

const LOOP_COLLECTION: &str = "records";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Literal(String),
    Count,
    Field(String),
    ForRecords(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut root: Vec<Node> = Vec::new();
        let mut body: Option<Vec<Node>> = None;
        let mut literal = String::new();
        let mut pos = 0;

        while pos < source.len() {
            let rest = &source[pos..];
            let Some(start) = rest.find('$') else {
                literal.push_str(rest);
                break;
            };
            literal.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            if after.starts_with('$') {
                literal.push('$');
                pos += start + 2;
                continue;
            }
            let end = after
                .find('$')
                .ok_or(TemplateError::Unterminated(pos + start))?;
            let tag = &after[..end];
            pos += start + end + 2;

            flush(&mut literal, &mut root, &mut body);
            if let Some(collection) = tag.strip_prefix("for(").and_then(|t| t.strip_suffix(')')) {
                if collection != LOOP_COLLECTION {
                    return Err(TemplateError::UnknownCollection(collection.to_string()));
                }
                if body.is_some() {
                    return Err(TemplateError::NestedFor);
                }
                body = Some(Vec::new());
            } else if tag == "endfor" {
                let nodes = body.take().ok_or(TemplateError::UnexpectedEndFor)?;
                root.push(Node::ForRecords(nodes));
            } else {
                let node = variable(tag, body.is_some())?;
                push(node, &mut root, &mut body);
            }
        }

        flush(&mut literal, &mut root, &mut body);
        if body.is_some() {
            return Err(TemplateError::UnclosedFor(LOOP_COLLECTION.to_string()));
        }
        Ok(Self { nodes: root })
    }

    /// Read the template at `path`, falling back to [`DEFAULT_TEMPLATE`] when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, TemplateError> {
        match std::fs::read_to_string(path) {
            Ok(source) => {
                debug!(path = %path.display(), "Loaded presentation template");
                Self::compile(&source)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Template not found, using built-in default");
                Self::compile(DEFAULT_TEMPLATE)
            }
            Err(e) => Err(TemplateError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    pub fn render(&self, records: &[RunRecord]) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, records, None, &mut out);
        out
    }
}

fn flush(literal: &mut String, root: &mut Vec<Node>, body: &mut Option<Vec<Node>>) {
    if !literal.is_empty() {
        push(Node::Literal(std::mem::take(literal)), root, body);
    }
}

fn push(node: Node, root: &mut Vec<Node>, body: &mut Option<Vec<Node>>) {
    match body {
        Some(nodes) => nodes.push(node),
        None => root.push(node),
    }
}

fn variable(tag: &str, in_loop: bool) -> Result<Node, TemplateError> {
    if tag == "count" {
        return Ok(Node::Count);
    }
    let field = tag
        .strip_prefix("it.")
        .or_else(|| tag.strip_prefix("records."));
    match field {
        Some(field) if in_loop => {
            if RunRecord::FIELDS.contains(&field) {
                Ok(Node::Field(field.to_string()))
            } else {
                Err(TemplateError::UnknownField(field.to_string()))
            }
        }
        _ => Err(TemplateError::UnknownVariable(tag.to_string())),
    }
}

fn render_nodes(nodes: &[Node], records: &[RunRecord], current: Option<&RunRecord>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Count => out.push_str(&records.len().to_string()),
            Node::Field(name) => {
                if let Some(value) = current.and_then(|r| r.field(name)) {
                    escape_html(&value, out);
                }
            }
            Node::ForRecords(body) => {
                for record in records {
                    render_nodes(body, records, Some(record), out);
                }
            }
        }
    }
}

fn escape_html(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::Revision;

    fn record(revision: u64, status: &str) -> RunRecord {
        RunRecord {
            revision: Revision::Number(revision),
            author: "dawuss".into(),
            message: "Added <figure> & caption".into(),
            status: status.into(),
            file: format!("report-{revision}.pdf"),
        }
    }

    #[test]
    fn renders_loop_in_order_with_escaping() {
        let template =
            Template::compile("$count$:$for(records)$[$it.revision$ $records.status$ $it.message$]$endfor$")
                .unwrap();
        let out = template.render(&[record(41, "ok"), record(42, "ERROR: Build failed.")]);
        assert_eq!(
            out,
            "2:[41 ok Added &lt;figure&gt; &amp; caption][42 ERROR: Build failed. Added &lt;figure&gt; &amp; caption]"
        );
    }

    #[test]
    fn empty_log_renders_without_rows() {
        let template = Template::compile("<ul>$for(records)$<li>$it.file$</li>$endfor$</ul>").unwrap();
        assert_eq!(template.render(&[]), "<ul></ul>");
    }

    #[test]
    fn double_dollar_is_literal() {
        let template = Template::compile("costs $$5").unwrap();
        assert_eq!(template.render(&[]), "costs $5");
    }

    #[test]
    fn compile_errors() {
        assert_eq!(Template::compile("a $count"), Err(TemplateError::Unterminated(2)));
        assert_eq!(
            Template::compile("$author$"),
            Err(TemplateError::UnknownVariable("author".into()))
        );
        assert_eq!(
            Template::compile("$it.author$"),
            Err(TemplateError::UnknownVariable("it.author".into()))
        );
        assert_eq!(
            Template::compile("$for(records)$$it.date$$endfor$"),
            Err(TemplateError::UnknownField("date".into()))
        );
        assert_eq!(
            Template::compile("$for(people)$$endfor$"),
            Err(TemplateError::UnknownCollection("people".into()))
        );
        assert_eq!(Template::compile("$endfor$"), Err(TemplateError::UnexpectedEndFor));
        assert_eq!(
            Template::compile("$for(records)$"),
            Err(TemplateError::UnclosedFor("records".into()))
        );
        assert_eq!(
            Template::compile("$for(records)$$for(records)$$endfor$$endfor$"),
            Err(TemplateError::NestedFor)
        );
    }

    #[test]
    fn default_template_compiles() {
        let template = Template::compile(DEFAULT_TEMPLATE).unwrap();
        let html = template.render(&[record(57, "ok")]);
        assert!(html.contains("<td>57</td>"));
        assert!(html.contains("report-57.pdf"));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let template = Template::load_or_default(&dir.path().join("template.html")).unwrap();
        assert_eq!(template, Template::compile(DEFAULT_TEMPLATE).unwrap());
    }
}
