//! GraphML reader and writer
//!
//! Node data keys: `type`, `canonical_key`, `label`, `role_labels` and
//! `evidence` (JSON-encoded lists), `properties` (JSON-encoded object).
//! Edges carry one data key named `type`. The reader resolves key ids
//! through the `<key>` declarations, so files that use other ids for the
//! same attribute names load too.

use super::ExportError;
use crate::graph::{Edge, KnowledgeGraph, Node, NodeId, NodeType, Properties, PropertyValue, Relationship, UNKNOWN_KEY};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const DEFAULT_GRAPH_ID: &str = "rxngraph";

const NODE_KEYS: [&str; 6] = ["type", "canonical_key", "label", "role_labels", "evidence", "properties"];
const EDGE_TYPE_KEY: &str = "edge_type";

/// Serialize a graph as GraphML into `inner`.
pub fn write<W: Write>(graph: &KnowledgeGraph, inner: W) -> Result<(), ExportError> {
    let mut writer = Writer::new_with_indent(inner, b' ', 2);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("graphml");
    root.push_attribute(("xmlns", GRAPHML_NS));
    emit(&mut writer, Event::Start(root))?;

    for key in NODE_KEYS {
        declare_key(&mut writer, key, "node", key)?;
    }
    declare_key(&mut writer, EDGE_TYPE_KEY, "edge", "type")?;

    let mut graph_start = BytesStart::new("graph");
    graph_start.push_attribute(("id", graph.metadata.name.as_deref().unwrap_or(DEFAULT_GRAPH_ID)));
    graph_start.push_attribute(("edgedefault", "directed"));
    emit(&mut writer, Event::Start(graph_start))?;

    for node in graph.nodes.values() {
        let mut start = BytesStart::new("node");
        start.push_attribute(("id", node.id.as_str()));
        emit(&mut writer, Event::Start(start))?;

        let label = node
            .property("label")
            .and_then(PropertyValue::as_str)
            .unwrap_or(&node.canonical_key);
        write_data(&mut writer, "type", node.node_type.as_str())?;
        write_data(&mut writer, "canonical_key", &node.canonical_key)?;
        write_data(&mut writer, "label", label)?;
        write_data(&mut writer, "role_labels", &serde_json::to_string(&node.role_labels)?)?;
        write_data(&mut writer, "evidence", &serde_json::to_string(&node.evidence)?)?;
        write_data(&mut writer, "properties", &serde_json::to_string(&node.properties)?)?;

        emit(&mut writer, Event::End(BytesEnd::new("node")))?;
    }

    for (index, edge) in graph.edges.iter().enumerate() {
        let mut start = BytesStart::new("edge");
        start.push_attribute(("id", format!("e{}", index).as_str()));
        start.push_attribute(("source", edge.source.as_str()));
        start.push_attribute(("target", edge.target.as_str()));
        emit(&mut writer, Event::Start(start))?;
        write_data(&mut writer, EDGE_TYPE_KEY, edge.relationship.as_str())?;
        emit(&mut writer, Event::End(BytesEnd::new("edge")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("graph")))?;
    emit(&mut writer, Event::End(BytesEnd::new("graphml")))?;
    writer
        .into_inner()
        .flush()
        .map_err(|e| ExportError::Xml(e.to_string()))
}

pub fn to_string(graph: &KnowledgeGraph) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write(graph, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ExportError::Xml(e.to_string()))
}

pub fn save(graph: &KnowledgeGraph, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    write(graph, BufWriter::new(file)).map_err(|err| match err {
        ExportError::Xml(reason) => ExportError::io(path, std::io::Error::other(reason)),
        other => other,
    })
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), ExportError> {
    writer.write_event(event).map_err(|e| ExportError::Xml(e.to_string()))
}

fn declare_key<W: Write>(writer: &mut Writer<W>, id: &str, target: &str, name: &str) -> Result<(), ExportError> {
    let mut key = BytesStart::new("key");
    key.push_attribute(("id", id));
    key.push_attribute(("for", target));
    key.push_attribute(("attr.name", name));
    key.push_attribute(("attr.type", "string"));
    emit(writer, Event::Empty(key))
}

fn write_data<W: Write>(writer: &mut Writer<W>, key: &str, value: &str) -> Result<(), ExportError> {
    let mut start = BytesStart::new("data");
    start.push_attribute(("key", key));
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new("data")))
}

enum Element {
    Node { id: String },
    Edge { source: String, target: String },
}

struct Pending {
    element: Element,
    fields: BTreeMap<String, String>,
}

/// Parse GraphML from a buffered reader.
pub fn read<R: BufRead>(inner: R) -> Result<KnowledgeGraph, ExportError> {
    let mut reader = Reader::from_reader(inner);
    let mut buf = Vec::new();

    let mut graph = KnowledgeGraph::new();
    let mut key_names: HashMap<String, String> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut current: Option<Pending> = None;
    let mut data_key: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"graph" => graph.metadata.name = attribute(&e, b"id")?,
                b"key" => {
                    let id = required(&e, b"id", "key")?;
                    let name = attribute(&e, b"attr.name")?.unwrap_or_else(|| id.clone());
                    key_names.insert(id, name);
                }
                b"node" => current = Some(pending_node(&e)?),
                b"edge" => current = Some(pending_edge(&e)?),
                b"data" => {
                    let key = required(&e, b"key", "data")?;
                    data_key = Some(key_names.get(&key).cloned().unwrap_or(key));
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"key" => {
                    let id = required(&e, b"id", "key")?;
                    let name = attribute(&e, b"attr.name")?.unwrap_or_else(|| id.clone());
                    key_names.insert(id, name);
                }
                b"node" => {
                    let pending = pending_node(&e)?;
                    finish(pending, &mut graph, &mut edges)?;
                }
                b"edge" => {
                    let pending = pending_edge(&e)?;
                    finish(pending, &mut graph, &mut edges)?;
                }
                b"data" => {
                    let key = required(&e, b"key", "data")?;
                    let key = key_names.get(&key).cloned().unwrap_or(key);
                    if let Some(pending) = current.as_mut() {
                        pending.fields.insert(key, String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if data_key.is_some() {
                    let raw = String::from_utf8_lossy(&e);
                    let unescaped = unescape(&raw).map_err(|e| ExportError::Xml(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if data_key.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if data_key.is_some() {
                    let name = String::from_utf8_lossy(&e);
                    let resolved = resolve_reference(&name)
                        .ok_or_else(|| ExportError::Malformed(format!("unknown entity reference &{};", name)))?;
                    text.push(resolved);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"data" => {
                    if let (Some(key), Some(pending)) = (data_key.take(), current.as_mut()) {
                        pending.fields.insert(key, std::mem::take(&mut text));
                    }
                }
                b"node" | b"edge" => {
                    if let Some(pending) = current.take() {
                        finish(pending, &mut graph, &mut edges)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExportError::Xml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    for edge in edges {
        if !graph.contains_node(&edge.source) || !graph.contains_node(&edge.target) {
            return Err(ExportError::Malformed(format!("edge {} references a missing node", edge)));
        }
        graph.add_edge(edge);
    }
    Ok(graph)
}

pub fn from_str(text: &str) -> Result<KnowledgeGraph, ExportError> {
    read(text.as_bytes())
}

pub fn load(path: &Path) -> Result<KnowledgeGraph, ExportError> {
    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
    read(BufReader::new(file))
}

fn pending_node(e: &BytesStart<'_>) -> Result<Pending, ExportError> {
    Ok(Pending {
        element: Element::Node {
            id: required(e, b"id", "node")?,
        },
        fields: BTreeMap::new(),
    })
}

fn pending_edge(e: &BytesStart<'_>) -> Result<Pending, ExportError> {
    Ok(Pending {
        element: Element::Edge {
            source: required(e, b"source", "edge")?,
            target: required(e, b"target", "edge")?,
        },
        fields: BTreeMap::new(),
    })
}

fn finish(pending: Pending, graph: &mut KnowledgeGraph, edges: &mut Vec<Edge>) -> Result<(), ExportError> {
    let Pending { element, mut fields } = pending;
    match element {
        Element::Node { id } => {
            let node_type: NodeType = fields
                .get("type")
                .ok_or_else(|| ExportError::Malformed(format!("node {} has no type", id)))?
                .parse()
                .map_err(ExportError::Malformed)?;
            let canonical_key = fields
                .remove("canonical_key")
                .unwrap_or_else(|| UNKNOWN_KEY.to_string());
            let role_labels: Vec<String> = json_field(&fields, "role_labels")?.unwrap_or_default();
            let evidence: BTreeSet<String> = json_field(&fields, "evidence")?.unwrap_or_default();
            let properties: Option<Properties> = json_field(&fields, "properties")?;

            let mut node = Node::new(NodeId::from_string(id), node_type, canonical_key).with_role_labels(role_labels);
            node.evidence = evidence;
            match properties {
                Some(properties) => node.properties = properties,
                None => {
                    if let Some(label) = fields.remove("label") {
                        node = node.with_property("label", label);
                    }
                }
            }
            graph.add_node(node);
        }
        Element::Edge { source, target } => {
            let relationship: Relationship = fields
                .get("type")
                .ok_or_else(|| ExportError::Malformed(format!("edge {} -> {} has no type", source, target)))?
                .parse()
                .map_err(ExportError::Malformed)?;
            edges.push(Edge::new(NodeId::from_string(source), NodeId::from_string(target), relationship));
        }
    }
    Ok(())
}

fn json_field<T: serde::de::DeserializeOwned>(
    fields: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ExportError> {
    match fields.get(key).map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| ExportError::Malformed(format!("data key '{}': {}", key, e))),
    }
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ExportError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ExportError::Xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw).map_err(|err| ExportError::Xml(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required(e: &BytesStart<'_>, name: &[u8], element: &str) -> Result<String, ExportError> {
    attribute(e, name)?.ok_or_else(|| {
        ExportError::Malformed(format!(
            "<{}> without {} attribute",
            element,
            String::from_utf8_lossy(name)
        ))
    })
}

fn resolve_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
