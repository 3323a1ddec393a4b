//! The IR node graph.
//!
//! Program elements are nodes in an arena owned by [`IrGraph`] and
//! addressed by [`NodeId`]. Each node kind carries typed edges to the nodes
//! its type depends on. Nodes are immutable once added; the only mutable
//! state is the append-only called-method list of each variable, stored
//! per [`VarId`] so that every read of a variable observes the calls made
//! through any of its reads.

use duckhint_common::{FileId, SourceLoc};
use rowan::TextRange;
use serde::Serialize;

use crate::ty::{ParamKind, Ty};

/// A unique identifier for an IR node. Ids are never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// A local variable or parameter slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub u32);

/// A method observed being called on a variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CalledMethod {
    pub name: String,
    /// Positional argument count at the call site, when it is fixed
    /// (no splats).
    pub arity: Option<usize>,
}

impl CalledMethod {
    pub fn new(name: impl Into<String>, arity: Option<usize>) -> Self {
        CalledMethod { name: name.into(), arity }
    }

    /// A call whose argument count should not constrain candidates.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

/// Whether a field belongs to instances or to the type itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    Instance,
    Class,
}

/// The value a literal node was written with, beyond its stored type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralValue {
    /// Nothing beyond the stored type.
    Opaque,
    /// A symbol literal; the name is usable as a shape key.
    Symbol(String),
    /// An array literal's element expressions.
    Array(Vec<NodeId>),
    /// A hash literal's entries.
    Hash(Vec<(HashKey, NodeId)>),
}

/// The key of one hash-literal entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashKey {
    Symbol(String),
    Expr(NodeId),
}

/// A block attached to a call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockBody {
    /// Block parameter nodes, in order.
    pub params: Vec<NodeId>,
    /// Every statement of the body.
    pub body: Vec<NodeId>,
    /// The expression whose value the block yields.
    pub result: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallNode {
    pub method: String,
    pub receiver: Option<NodeId>,
    pub args: Vec<NodeId>,
    pub block: Option<BlockBody>,
    /// A block is passed, with or without a literal body (`&blk` passes
    /// one without).
    pub has_block: bool,
}

impl CallNode {
    pub fn new(method: impl Into<String>, receiver: Option<NodeId>, args: Vec<NodeId>) -> Self {
        CallNode {
            method: method.into(),
            receiver,
            args,
            block: None,
            has_block: false,
        }
    }

    pub fn with_block(mut self, block: BlockBody) -> Self {
        self.block = Some(block);
        self.has_block = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefNode {
    pub name: String,
    pub owner: String,
    pub params: Vec<NodeId>,
    /// The captured return expression: the join of every value the method
    /// can produce.
    pub ret: Option<NodeId>,
    pub body: Vec<NodeId>,
    /// Defined on the type itself rather than on instances.
    pub singleton: bool,
}

/// One variant per program element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Literal {
        ty: Ty,
        value: LiteralValue,
    },
    LocalWrite {
        name: String,
        var: VarId,
        value: Option<NodeId>,
    },
    LocalRead {
        name: String,
        var: VarId,
        write: Option<NodeId>,
    },
    /// Assignment to an instance or class field of `owner`.
    FieldWrite {
        scope: FieldScope,
        owner: String,
        name: String,
        value: Option<NodeId>,
    },
    /// A field read. Without a direct `write` edge the writer is looked up
    /// by `(owner, name)` in the field registry at inference time.
    FieldRead {
        scope: FieldScope,
        owner: String,
        name: String,
        write: Option<NodeId>,
    },
    Param {
        name: String,
        kind: ParamKind,
        default: Option<NodeId>,
        var: VarId,
    },
    Constant {
        name: String,
        /// The value an alias constant was assigned from.
        target: Option<NodeId>,
    },
    Call(CallNode),
    /// The `index`-th parameter of the block attached to `call`.
    BlockParam {
        index: usize,
        call: NodeId,
    },
    /// A control-flow join.
    Merge {
        branches: Vec<NodeId>,
    },
    Def(DefNode),
    SelfRef {
        owner: String,
        singleton: bool,
    },
    Return {
        value: Option<NodeId>,
    },
}

impl NodeKind {
    pub fn literal(ty: Ty) -> Self {
        NodeKind::Literal { ty, value: LiteralValue::Opaque }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        NodeKind::Literal {
            ty: Ty::symbol(),
            value: LiteralValue::Symbol(name.into()),
        }
    }

    /// The node ids this kind stores. Deferred field lookups are not
    /// edges; they are resolved through the registry. A block parameter's
    /// stored edge is its call, which is not what the resolver consults;
    /// [`IrGraph::dependencies`] is the authoritative answer.
    pub(crate) fn edges(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Literal { value, .. } => match value {
                LiteralValue::Opaque | LiteralValue::Symbol(_) => Vec::new(),
                LiteralValue::Array(elems) => elems.clone(),
                LiteralValue::Hash(entries) => entries
                    .iter()
                    .flat_map(|(key, value)| {
                        let key = match key {
                            HashKey::Expr(id) => Some(*id),
                            HashKey::Symbol(_) => None,
                        };
                        key.into_iter().chain(std::iter::once(*value))
                    })
                    .collect(),
            },
            NodeKind::LocalWrite { value, .. } | NodeKind::FieldWrite { value, .. } => {
                value.iter().copied().collect()
            }
            NodeKind::LocalRead { write, .. } | NodeKind::FieldRead { write, .. } => {
                write.iter().copied().collect()
            }
            NodeKind::Param { default, .. } => default.iter().copied().collect(),
            NodeKind::Constant { target, .. } => target.iter().copied().collect(),
            NodeKind::Call(call) => call
                .receiver
                .iter()
                .chain(call.args.iter())
                .chain(call.block.as_ref().and_then(|b| b.result.as_ref()))
                .copied()
                .collect(),
            NodeKind::BlockParam { call, .. } => vec![*call],
            NodeKind::Merge { branches } => branches.clone(),
            NodeKind::Def(def) => def.ret.iter().copied().collect(),
            NodeKind::SelfRef { .. } => Vec::new(),
            NodeKind::Return { value } => value.iter().copied().collect(),
        }
    }

    /// Short kind name for dumps and logs.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Literal { .. } => "literal",
            NodeKind::LocalWrite { .. } => "local_write",
            NodeKind::LocalRead { .. } => "local_read",
            NodeKind::FieldWrite { scope: FieldScope::Instance, .. } => "ivar_write",
            NodeKind::FieldWrite { scope: FieldScope::Class, .. } => "cvar_write",
            NodeKind::FieldRead { scope: FieldScope::Instance, .. } => "ivar_read",
            NodeKind::FieldRead { scope: FieldScope::Class, .. } => "cvar_read",
            NodeKind::Param { .. } => "param",
            NodeKind::Constant { .. } => "constant",
            NodeKind::Call(_) => "call",
            NodeKind::BlockParam { .. } => "block_param",
            NodeKind::Merge { .. } => "merge",
            NodeKind::Def(_) => "def",
            NodeKind::SelfRef { .. } => "self",
            NodeKind::Return { .. } => "return",
        }
    }
}

/// A node with its identity and origin.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub file: Option<FileId>,
    pub range: Option<TextRange>,
    pub kind: NodeKind,
}

impl Node {
    pub fn loc(&self) -> Option<SourceLoc> {
        Some(SourceLoc {
            file: self.file?,
            range: self.range?,
        })
    }
}

#[derive(Clone, Debug)]
struct VarInfo {
    id: VarId,
    name: String,
    file: Option<FileId>,
    called: Vec<CalledMethod>,
}

// ── Graph ──────────────────────────────────────────────────────────────

/// Arena of IR nodes and variable slots.
///
/// Ids come from monotonic counters and are never reused, so a stale id
/// resolves to "missing" rather than to an unrelated node. Storage holds
/// live entries only, sorted by id; removing a file releases its nodes
/// and variables.
#[derive(Debug, Default)]
pub struct IrGraph {
    nodes: Vec<Node>,
    vars: Vec<VarInfo>,
    next_node: u32,
    next_var: u32,
}

impl IrGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node that belongs to no file.
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.add_in(None, None, kind)
    }

    /// Add a node attributed to `file`, optionally at `range`.
    pub fn add_in(
        &mut self,
        file: Option<FileId>,
        range: Option<TextRange>,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.push(Node { id, file, range, kind });
        id
    }

    /// The id the next added node will get, for builders that need a
    /// forward edge (a block parameter names its call before the call
    /// exists).
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next_node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let i = self.nodes.binary_search_by_key(&id, |n| n.id).ok()?;
        Some(&self.nodes[i])
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(|n| &n.kind)
    }

    /// The nodes the resolver consults for `id`. A block parameter
    /// depends on the receiver of its call rather than on the call
    /// itself; every other kind depends on the edges it stores.
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            Some(NodeKind::BlockParam { call, .. }) => match self.kind(*call) {
                Some(NodeKind::Call(c)) => c.receiver.into_iter().collect(),
                _ => Vec::new(),
            },
            Some(kind) => kind.edges(),
            None => Vec::new(),
        }
    }

    /// Create a variable slot.
    pub fn new_var(&mut self, name: impl Into<String>, file: Option<FileId>) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        self.vars.push(VarInfo {
            id,
            name: name.into(),
            file,
            called: Vec::new(),
        });
        id
    }

    pub fn var_name(&self, var: VarId) -> Option<&str> {
        self.var_info(var).map(|v| v.name.as_str())
    }

    /// Record a method called on `var`. Identical entries are kept once.
    pub fn record_call(&mut self, var: VarId, call: CalledMethod) {
        let Ok(i) = self.vars.binary_search_by_key(&var, |v| v.id) else {
            return;
        };
        let info = &mut self.vars[i];
        if !info.called.contains(&call) {
            info.called.push(call);
        }
    }

    /// Methods observed being called on `var`, in first-seen order.
    pub fn called_methods(&self, var: VarId) -> &[CalledMethod] {
        self.var_info(var).map(|v| v.called.as_slice()).unwrap_or(&[])
    }

    fn var_info(&self, var: VarId) -> Option<&VarInfo> {
        let i = self.vars.binary_search_by_key(&var, |v| v.id).ok()?;
        Some(&self.vars[i])
    }

    /// Drop every node and variable attributed to `file`. Returns the
    /// number of nodes removed.
    pub fn remove_file(&mut self, file: FileId) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.file != Some(file));
        self.vars.retain(|v| v.file != Some(file));
        shrink_if_sparse(&mut self.nodes);
        shrink_if_sparse(&mut self.vars);
        before - self.nodes.len()
    }

    /// Drop everything. Ids restart from zero.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Live nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn nodes_in_file(&self, file: FileId) -> impl Iterator<Item = &Node> {
        self.iter().filter(move |n| n.file == Some(file))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node entries the arena has room for without reallocating.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// The innermost node whose range covers `offset` in `file`.
    pub fn node_at(&self, file: FileId, offset: u32) -> Option<NodeId> {
        self.nodes_in_file(file)
            .filter_map(|n| n.loc().filter(|loc| loc.contains(file, offset)).map(|loc| (n.id, loc)))
            .min_by_key(|(id, loc)| (loc.range.len(), std::cmp::Reverse(*id)))
            .map(|(id, _)| id)
    }
}

/// Give memory back once most of an arena has been removed.
fn shrink_if_sparse<T>(items: &mut Vec<T>) {
    if items.capacity() > 4 * items.len().max(16) {
        items.shrink_to(2 * items.len());
    }
}
