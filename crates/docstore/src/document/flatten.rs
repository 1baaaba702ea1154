//! Flattening records into attribute triples and inflating them back.
//!
//! Every leaf becomes one triple. Every nested mapping or sequence also gets a
//! marker triple so empty collections survive the round trip and the shape of
//! a record can be validated on the way back. The root mapping has no marker.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DocumentError, ValueError};
use crate::types::{Record, Value};

use super::codec::{decode_scalar, encode_scalar, Datatype, StoredValue};
use super::path::{compare_paths, escape_segment, join, parse_index, split_path};

/// One row of `doc_values` for a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    /// Escaped, dot-joined path from the record root.
    pub attribute: String,
    /// Stored value.
    pub value: StoredValue,
    /// Datatype tag.
    pub datatype: Datatype,
}

impl Triple {
    /// Creates a triple.
    pub fn new(attribute: impl Into<String>, value: StoredValue, datatype: Datatype) -> Self {
        Self {
            attribute: attribute.into(),
            value,
            datatype,
        }
    }
}

/// Flattens a record depth-first.
pub fn flatten(record: &Record) -> Result<Vec<Triple>, ValueError> {
    let mut out = Vec::new();
    for (key, value) in record {
        flatten_value(escape_segment(key), value, &mut out)?;
    }
    Ok(out)
}

fn flatten_value(path: String, value: &Value, out: &mut Vec<Triple>) -> Result<(), ValueError> {
    match value {
        Value::Mapping(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            out.push(Triple::new(
                path.clone(),
                StoredValue::Text(serde_json::Value::from(keys).to_string()),
                Datatype::Mapping,
            ));
            for (key, child) in map {
                flatten_value(join(&path, &escape_segment(key)), child, out)?;
            }
        }
        Value::Sequence(items) => {
            out.push(Triple::new(
                path.clone(),
                StoredValue::Text(items.len().to_string()),
                Datatype::Sequence,
            ));
            for (index, child) in items.iter().enumerate() {
                flatten_value(join(&path, &index.to_string()), child, out)?;
            }
        }
        scalar => {
            let (stored, datatype) = encode_scalar(scalar, &path)?;
            out.push(Triple::new(path, stored, datatype));
        }
    }
    Ok(())
}

enum Node {
    Leaf(Value),
    Mapping {
        declared: Option<Vec<String>>,
        children: BTreeMap<String, Node>,
    },
    Sequence {
        len: usize,
        children: BTreeMap<usize, Node>,
    },
}

/// Rebuilds a record from its triples.
///
/// The triples may arrive in any order.
pub fn inflate(key: &str, mut triples: Vec<Triple>) -> Result<Record, DocumentError> {
    triples.sort_by(|a, b| compare_paths(&a.attribute, &b.attribute));

    let inconsistent = |path: &str, message: String| DocumentError::InconsistentPathSet {
        key: key.to_string(),
        path: path.to_string(),
        message,
    };

    let mut root = Node::Mapping {
        declared: None,
        children: BTreeMap::new(),
    };

    for triple in triples {
        let segments = split_path(&triple.attribute);
        let Some((last, parents)) = segments.split_last() else {
            continue;
        };

        let mut current = &mut root;
        for segment in parents {
            current = descend(current, segment)
                .map_err(|message| inconsistent(&triple.attribute, message))?;
        }

        let node = build_node(triple.value, triple.datatype)
            .map_err(|message| inconsistent(&triple.attribute, message))?;

        let duplicate = match current {
            Node::Mapping { children, .. } => children.insert(last.clone(), node).is_some(),
            Node::Sequence { children, .. } => {
                let index = parse_index(last).ok_or_else(|| {
                    inconsistent(
                        &triple.attribute,
                        format!("'{last}' is not a sequence index"),
                    )
                })?;
                children.insert(index, node).is_some()
            }
            Node::Leaf(_) => {
                return Err(inconsistent(
                    &triple.attribute,
                    "value nested under a leaf".to_string(),
                ));
            }
        };
        if duplicate {
            return Err(inconsistent(&triple.attribute, "duplicate path".to_string()));
        }
    }

    match finish(root, None).map_err(|(path, message)| inconsistent(&path, message))? {
        Value::Mapping(map) => Ok(map),
        _ => Err(inconsistent("", "root is not a mapping".to_string())),
    }
}

/// Path of a child segment; `None` is the record root.
fn child_path(parent: Option<&str>, segment: &str) -> String {
    match parent {
        Some(parent) => join(parent, segment),
        None => segment.to_string(),
    }
}

fn descend<'a>(node: &'a mut Node, segment: &str) -> Result<&'a mut Node, String> {
    let child = match node {
        Node::Mapping { children, .. } => children.get_mut(segment),
        Node::Sequence { children, .. } => {
            let index =
                parse_index(segment).ok_or_else(|| format!("'{segment}' is not a sequence index"))?;
            children.get_mut(&index)
        }
        Node::Leaf(_) => return Err("value nested under a leaf".to_string()),
    };
    child.ok_or_else(|| format!("missing container marker for '{segment}'"))
}

fn build_node(value: StoredValue, datatype: Datatype) -> Result<Node, String> {
    match datatype {
        Datatype::Mapping => {
            let text = value.as_text().ok_or("mapping marker is not text")?;
            let declared: Vec<String> = serde_json::from_str(text)
                .map_err(|e| format!("unreadable mapping marker: {e}"))?;
            Ok(Node::Mapping {
                declared: Some(declared),
                children: BTreeMap::new(),
            })
        }
        Datatype::Sequence => {
            let len = value
                .as_text()
                .and_then(|t| t.trim().parse::<usize>().ok())
                .ok_or("unreadable sequence marker")?;
            Ok(Node::Sequence {
                len,
                children: BTreeMap::new(),
            })
        }
        Datatype::RowId => Err("row identifiers are not document values".to_string()),
        scalar => decode_scalar(value, scalar)
            .map(Node::Leaf)
            .map_err(|e| e.to_string()),
    }
}

fn finish(node: Node, path: Option<String>) -> Result<Value, (String, String)> {
    match node {
        Node::Leaf(value) => Ok(value),
        Node::Mapping { declared, children } => {
            if let Some(declared) = declared {
                let declared: BTreeSet<&String> = declared.iter().collect();
                let present: BTreeSet<&String> = children.keys().collect();
                if declared != present {
                    return Err((
                        path.unwrap_or_default(),
                        format!(
                            "declared keys {:?} differ from children present {:?}",
                            declared, present
                        ),
                    ));
                }
            }
            let mut map = BTreeMap::new();
            for (key, child) in children {
                let child = finish(child, Some(child_path(path.as_deref(), &escape_segment(&key))))?;
                map.insert(key, child);
            }
            Ok(Value::Mapping(map))
        }
        Node::Sequence { len, children } => {
            let contiguous = children.len() == len
                && children.keys().next_back().is_none_or(|last| *last + 1 == len);
            if !contiguous {
                return Err((
                    path.unwrap_or_default(),
                    format!(
                        "sequence declares {len} elements but holds indices {:?}",
                        children.keys().collect::<Vec<_>>()
                    ),
                ));
            }
            let mut items = Vec::with_capacity(len);
            for (index, child) in children {
                items.push(finish(child, Some(child_path(path.as_deref(), &index.to_string())))?);
            }
            Ok(Value::Sequence(items))
        }
    }
}

/// Restricts a record to the given attribute paths.
///
/// A path that runs through a sequence keeps the whole sequence. Paths that
/// do not exist in the record are ignored.
pub fn project(record: &Record, allow_list: &[String]) -> Record {
    let mut out = Record::new();
    for path in allow_list {
        copy_path(record, &split_path(path), &mut out);
    }
    out
}

fn copy_path(src: &BTreeMap<String, Value>, segments: &[String], dst: &mut BTreeMap<String, Value>) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = src.get(first) else {
        return;
    };
    match value {
        Value::Mapping(inner) if !rest.is_empty() => {
            let mut projected = match dst.remove(first) {
                Some(Value::Mapping(existing)) => existing,
                Some(other) => {
                    dst.insert(first.clone(), other);
                    return;
                }
                None => BTreeMap::new(),
            };
            copy_path(inner, rest, &mut projected);
            if !projected.is_empty() {
                dst.insert(first.clone(), Value::Mapping(projected));
            }
        }
        _ => {
            dst.insert(first.clone(), value.clone());
        }
    }
}
