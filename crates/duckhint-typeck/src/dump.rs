//! Graph dumps for debugging.
//!
//! A [`GraphDump`] lists nodes with their edges and inferred types. It
//! serializes to JSON for external viewers and renders as one line per
//! node through `Display`:
//!
//! ```text
//! #0 literal: String (literal)
//! #2 local_read x [#1]: String (literal)
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::Provenance;
use crate::ir::{NodeId, NodeKind};
use crate::resolve::Resolver;

#[derive(Clone, Debug, Serialize)]
pub struct NodeDump {
    pub id: NodeId,
    pub kind: &'static str,
    /// Method, variable, field, or constant name, where the kind has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub deps: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[u32; 2]>,
    pub ty: String,
    pub reason: String,
    pub provenance: Provenance,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct GraphDump {
    pub nodes: Vec<NodeDump>,
}

impl GraphDump {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn name_of(kind: &NodeKind) -> Option<String> {
    match kind {
        NodeKind::LocalWrite { name, .. }
        | NodeKind::LocalRead { name, .. }
        | NodeKind::FieldWrite { name, .. }
        | NodeKind::FieldRead { name, .. }
        | NodeKind::Param { name, .. }
        | NodeKind::Constant { name, .. } => Some(name.clone()),
        NodeKind::Call(call) => Some(format!(".{}", call.method)),
        NodeKind::Def(def) => Some(def.name.clone()),
        NodeKind::SelfRef { owner, .. } => Some(owner.clone()),
        NodeKind::Literal { .. }
        | NodeKind::BlockParam { .. }
        | NodeKind::Merge { .. }
        | NodeKind::Return { .. } => None,
    }
}

/// Infer and describe each live node of `ids`, in the given order.
pub fn dump_nodes(resolver: &mut Resolver<'_>, ids: impl IntoIterator<Item = NodeId>) -> GraphDump {
    let graph = resolver.env().graph;
    let nodes = ids
        .into_iter()
        .filter_map(|id| {
            let node = graph.get(id)?;
            let inference = resolver.infer(id);
            Some(NodeDump {
                id,
                kind: node.kind.label(),
                name: name_of(&node.kind),
                deps: graph.dependencies(id),
                range: node.range.map(|r| [r.start().into(), r.end().into()]),
                ty: inference.ty.to_string(),
                reason: inference.reason.to_string(),
                provenance: inference.provenance,
            })
        })
        .collect();
    GraphDump { nodes }
}

impl fmt::Display for NodeDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id.0, self.kind)?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        if !self.deps.is_empty() {
            let deps: Vec<String> = self.deps.iter().map(|d| format!("#{}", d.0)).collect();
            write!(f, " [{}]", deps.join(", "))?;
        }
        write!(f, ": {} ({})", self.ty, self.reason)
    }
}

impl fmt::Display for GraphDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}
