//! GML export – serialize a co-occurrence graph as (gzip-compressed) GML.
//!
//! ```text
//! CooccurrenceGraph → write_gml() → fish_network.gml.gz
//!   → networkx.read_gml(), Gephi, Cytoscape, or read_gml() below
//! ```
//!
//! The layout follows what `networkx.write_gml` emits for an undirected
//! graph: one `node` block per node (`id`, `label`) in insertion order, then
//! one `edge` block per edge carrying `source`, `target` and `weight`.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::network::CooccurrenceGraph;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while reading GML back.
#[derive(Debug, Error)]
pub enum GmlError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("{section} block is missing '{key}'")]
    MissingKey { section: &'static str, key: &'static str },

    #[error("edge refers to unknown node id {0}")]
    UnknownNode(i64),

    #[error("edge weight {0} is not a non-negative integer")]
    InvalidWeight(String),

    #[error("no top-level 'graph' block")]
    NoGraph,
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write `graph` to `path`, gzip-compressed when the name ends in `.gz`.
pub fn write_gml(graph: &CooccurrenceGraph, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let compressed = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

    if compressed {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_gml_to(graph, &mut encoder)?;
        encoder
            .finish()
            .context("finishing gzip stream")?
            .flush()
            .context("flushing output")?;
    } else {
        let mut writer = BufWriter::new(file);
        write_gml_to(graph, &mut writer)?;
        writer.flush().context("flushing output")?;
    }

    log::info!(
        "Graph saved to '{}' ({} nodes, {} edges)",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(())
}

/// Serialize `graph` as plain GML text.
pub fn write_gml_to(graph: &CooccurrenceGraph, writer: &mut dyn Write) -> std::io::Result<()> {
    writeln!(writer, "graph [")?;
    for (id, label) in graph.nodes().iter().enumerate() {
        writeln!(writer, "  node [")?;
        writeln!(writer, "    id {id}")?;
        writeln!(writer, "    label \"{}\"", escape(label))?;
        writeln!(writer, "  ]")?;
    }
    for edge in graph.edges() {
        writeln!(writer, "  edge [")?;
        writeln!(writer, "    source {}", edge.a)?;
        writeln!(writer, "    target {}", edge.b)?;
        writeln!(writer, "    weight {}", edge.weight)?;
        writeln!(writer, "  ]")?;
    }
    writeln!(writer, "]")
}

/// GML strings cannot hold `"`; use HTML entities like networkx does.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => out.push_str(&format!("&#{};", c as u32)),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "quot" => Some('"'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            _ => entity
                .strip_prefix('#')
                .and_then(|n| n.parse::<u32>().ok())
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Read a GML file, transparently decompressing gzip input.
pub fn read_gml(path: &Path) -> Result<CooccurrenceGraph> {
    let mut raw = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut raw))
        .with_context(|| format!("reading {}", path.display()))?;

    let text = if raw.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(raw.as_slice())
            .read_to_string(&mut text)
            .context("decompressing gzip stream")?;
        text
    } else {
        String::from_utf8(raw).context("GML is not valid UTF-8")?
    };

    let graph = parse_gml(&text).with_context(|| format!("parsing {}", path.display()))?;
    log::info!(
        "Read {} nodes and {} edges from '{}'",
        graph.node_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(graph)
}

#[derive(Debug, Clone, PartialEq)]
enum GmlValue {
    Int(i64),
    Real(f64),
    Str(String),
    List(Vec<(String, GmlValue)>),
}

impl GmlValue {
    fn as_int(&self) -> Option<i64> {
        match self {
            GmlValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Key(String),
    Int(i64),
    Real(f64),
    Str(String),
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, GmlError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut line = 1;

    while let Some(&(start, c)) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while chars.peek().is_some_and(|&(_, c)| c != '\n') {
                    chars.next();
                }
            }
            '[' => {
                tokens.push((line, Token::Open));
                chars.next();
            }
            ']' => {
                tokens.push((line, Token::Close));
                chars.next();
            }
            '"' => {
                chars.next();
                let opened = line;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\n')) => {
                            line += 1;
                            value.push('\n');
                        }
                        Some((_, c)) => value.push(c),
                        None => {
                            return Err(GmlError::Syntax {
                                line: opened,
                                message: "unterminated string".to_string(),
                            });
                        }
                    }
                }
                tokens.push((opened, Token::Str(unescape(&value))));
            }
            _ => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || c == '[' || c == ']' || c == '"' {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let word = &text[start..end];
                let token = if let Ok(i) = word.parse::<i64>() {
                    Token::Int(i)
                } else if word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
                    Token::Key(word.to_string())
                } else if let Ok(f) = word.parse::<f64>() {
                    Token::Real(f)
                } else {
                    return Err(GmlError::Syntax {
                        line,
                        message: format!("unexpected '{word}'"),
                    });
                };
                tokens.push((line, token));
            }
        }
    }
    Ok(tokens)
}

/// Parse `key value` pairs until a closing bracket (or end of input at the
/// top level).
fn parse_list<I>(tokens: &mut std::iter::Peekable<I>, nested: bool) -> Result<Vec<(String, GmlValue)>, GmlError>
where
    I: Iterator<Item = (usize, Token)>,
{
    let mut items = Vec::new();
    loop {
        let Some((line, token)) = tokens.next() else {
            if nested {
                return Err(GmlError::Syntax {
                    line: 0,
                    message: "missing ']'".to_string(),
                });
            }
            return Ok(items);
        };
        let key = match token {
            Token::Close if nested => return Ok(items),
            Token::Key(key) => key,
            other => {
                return Err(GmlError::Syntax {
                    line,
                    message: format!("expected a key, found {other:?}"),
                });
            }
        };
        let value = match tokens.next() {
            Some((_, Token::Open)) => GmlValue::List(parse_list(tokens, true)?),
            Some((_, Token::Int(i))) => GmlValue::Int(i),
            Some((_, Token::Real(f))) => GmlValue::Real(f),
            Some((_, Token::Str(s))) => GmlValue::Str(s),
            Some((line, other)) => {
                return Err(GmlError::Syntax {
                    line,
                    message: format!("'{key}' has no value, found {other:?}"),
                });
            }
            None => {
                return Err(GmlError::Syntax {
                    line,
                    message: format!("'{key}' has no value"),
                });
            }
        };
        items.push((key, value));
    }
}

fn lookup<'a>(items: &'a [(String, GmlValue)], key: &str) -> Option<&'a GmlValue> {
    items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Parse GML text into a graph.  Labels become node identifiers; a node
/// without a label is named after its numeric id.
pub fn parse_gml(text: &str) -> Result<CooccurrenceGraph, GmlError> {
    let mut tokens = tokenize(text)?.into_iter().peekable();
    let top = parse_list(&mut tokens, false)?;
    let Some(GmlValue::List(body)) = lookup(&top, "graph") else {
        return Err(GmlError::NoGraph);
    };

    let mut graph = CooccurrenceGraph::new();
    let mut labels = std::collections::HashMap::new();

    for (key, value) in body {
        if key != "node" {
            continue;
        }
        let GmlValue::List(fields) = value else { continue };
        let id = lookup(fields, "id")
            .and_then(GmlValue::as_int)
            .ok_or(GmlError::MissingKey { section: "node", key: "id" })?;
        let label = match lookup(fields, "label") {
            Some(GmlValue::Str(s)) => s.clone(),
            _ => id.to_string(),
        };
        graph.add_node(&label);
        labels.insert(id, label);
    }

    for (key, value) in body {
        if key != "edge" {
            continue;
        }
        let GmlValue::List(fields) = value else { continue };
        let endpoint = |name: &'static str| -> Result<String, GmlError> {
            let id = lookup(fields, name)
                .and_then(GmlValue::as_int)
                .ok_or(GmlError::MissingKey { section: "edge", key: name })?;
            labels.get(&id).cloned().ok_or(GmlError::UnknownNode(id))
        };
        let source = endpoint("source")?;
        let target = endpoint("target")?;
        let weight = match lookup(fields, "weight") {
            None => 1,
            Some(GmlValue::Int(w)) => u32::try_from(*w).map_err(|_| GmlError::InvalidWeight(w.to_string()))?,
            Some(GmlValue::Real(w)) if w.fract() == 0.0 && *w >= 0.0 && *w <= u32::MAX as f64 => *w as u32,
            Some(other) => return Err(GmlError::InvalidWeight(format!("{other:?}"))),
        };
        graph.add_edge(&source, &target, weight);
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> CooccurrenceGraph {
        let mut g = CooccurrenceGraph::new();
        g.add_edge("1_1", "2_2", 1);
        g.add_edge("2_2", "150.5_-20.25", 7);
        g
    }

    #[test]
    fn writes_networkx_layout() {
        let mut out = Vec::new();
        write_gml_to(&sample_graph(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("graph [\n  node [\n    id 0\n    label \"1_1\"\n  ]\n"));
        assert!(text.contains("  edge [\n    source 1\n    target 2\n    weight 7\n  ]\n"));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn parse_recovers_written_graph() {
        let g = sample_graph();
        let mut out = Vec::new();
        write_gml_to(&g, &mut out).unwrap();
        let parsed = parse_gml(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(parsed, g);
    }

    #[test]
    fn gzip_file_is_compressed_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.gml.gz");
        write_gml(&sample_graph(), &path).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));
        assert_eq!(read_gml(&path).unwrap(), sample_graph());
    }

    #[test]
    fn labels_with_quotes_survive() {
        let mut g = CooccurrenceGraph::new();
        g.add_edge("a\"b", "c&d", 2);
        g.add_edge("c&d", "ñ", 3);
        let mut out = Vec::new();
        write_gml_to(&g, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("label \"a&quot;b\""));
        assert!(text.contains("label \"&#241;\""));
        assert_eq!(parse_gml(&text).unwrap(), g);
    }

    #[test]
    fn parses_foreign_gml() {
        let text = r#"
            # written elsewhere
            graph [
              directed 0
              node [ id 10 label "x" ]
              node [ id 20 ]
              edge [ source 10 target 20 weight 2.0 ]
              edge [ source 20 target 20 ]
            ]
        "#;
        let g = parse_gml(text).unwrap();
        assert_eq!(g.weight("x", "20"), Some(2));
        assert_eq!(g.weight("20", "20"), Some(1));
    }

    #[test]
    fn rejects_dangling_edges() {
        let text = "graph [ node [ id 0 label \"a\" ] edge [ source 0 target 5 ] ]";
        assert!(matches!(parse_gml(text), Err(GmlError::UnknownNode(5))));
        assert!(matches!(parse_gml("node [ id 0 ]"), Err(GmlError::NoGraph)));
        assert!(matches!(parse_gml("graph [ node [ id 0 "), Err(GmlError::Syntax { .. })));
    }
}
