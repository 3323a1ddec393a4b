//! Inference outcomes with reasons and provenance.
//!
//! Inference never fails. Every query produces an [`Inference`]: the type,
//! a [`Reason`] explaining how it was reached (or why nothing was), and a
//! [`Provenance`] tag for tooling. Cycles, missing edges, registry misses,
//! and empty provider answers all become `Ty::Unknown` with a reason.

use std::fmt;

use serde::Serialize;

use crate::ir::NodeId;
use crate::ty::{ParamKind, Ty};

/// Where a guessed type came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Written directly in the source.
    Literal,
    /// Derived from project-defined methods, fields, or types.
    Project,
    /// Taken from the signature catalogue.
    Catalogue,
    /// Guessed from usage (duck typing, joins).
    Heuristic,
    /// Nothing is known.
    Unknown,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Literal => "literal",
            Provenance::Project => "project",
            Provenance::Catalogue => "catalogue",
            Provenance::Heuristic => "heuristic",
            Provenance::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Why a node has the type it has.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reason {
    /// The node is a literal.
    Literal,
    /// The node re-entered itself while being inferred.
    CircularReference,
    /// The node id does not name a live node.
    DanglingNode(NodeId),
    /// The dependency chain exceeded the configured depth.
    DepthLimit,
    /// A write with no value, or a read with no writer.
    Unassigned { name: String },
    /// No writer for a field, neither linked nor registered.
    NoFieldWriter { owner: String, name: String },
    /// A parameter whose kind fixes its type (`*rest`, `**opts`, `&blk`, `...`).
    ParamKind(ParamKind),
    /// A parameter without a default and without usable call evidence.
    UntypedParam { name: String },
    /// The receiver type was guessed from the methods called on it.
    DuckTyped { methods: Vec<String>, candidates: usize },
    /// More types respond to the methods than is useful.
    AmbiguousDuckType { methods: Vec<String>, candidates: usize },
    /// No type responds to every method.
    NoDuckCandidate { methods: Vec<String> },
    /// A constant that names a type or module.
    TypeReference { name: String },
    /// A constant the code index does not know.
    UnresolvedConstant { name: String },
    /// `T.new` and friends.
    Constructor { name: String },
    /// Return type of a project-defined method.
    ProjectMethod { owner: String, method: String, singleton: bool },
    /// Return type of a project-defined top-level function.
    TopLevelFunction { name: String },
    /// A call dispatched on each member of a union receiver.
    UnionReceiver { method: String, members: usize },
    /// Return type from the catalogue.
    CatalogueMethod { owner: String, method: String },
    /// The return type of a callable value.
    CallableResult,
    /// A literal key read out of a hash shape.
    ShapeField { key: String },
    /// A literal key absent from a hash shape.
    ShapeMissingKey { key: String },
    /// A block parameter template from the catalogue.
    BlockParam { owner: String, method: String, index: usize },
    /// A block parameter whose call has no typed receiver.
    BlockParamWithoutReceiver { method: String },
    /// No block parameter template at this position.
    NoBlockParam { method: String, index: usize },
    /// Nothing is known about the receiver of a call.
    UntypedReceiver { method: String },
    /// No definition anywhere for the method.
    NoSuchMethod { owner: Option<String>, method: String },
    /// A join of several branches.
    BranchJoin { branches: usize },
    /// An initializer yields its receiver.
    Initializer,
    /// A method with an empty body yields nil.
    EmptyBody,
    /// A method whose return expression was not captured.
    NoReturnValue { method: String },
    /// `self` in an instance or type-level context.
    SelfReference,
    /// `return` without a value.
    ImplicitNil,
    /// A node kind reached the resolver somewhere it cannot be handled.
    Unsupported(&'static str),
}

fn dotted(methods: &[String]) -> String {
    methods
        .iter()
        .map(|m| format!(".{}", m))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Literal => write!(f, "literal"),
            Reason::CircularReference => write!(f, "circular reference"),
            Reason::DanglingNode(id) => write!(f, "dangling node #{}", id.0),
            Reason::DepthLimit => write!(f, "inference depth limit"),
            Reason::Unassigned { name } => write!(f, "`{}` is never assigned", name),
            Reason::NoFieldWriter { owner, name } => {
                write!(f, "no assignment to `{}` in {}", name, owner)
            }
            Reason::ParamKind(kind) => {
                let kind = match kind {
                    ParamKind::Required => "required",
                    ParamKind::Optional => "optional",
                    ParamKind::Rest => "rest",
                    ParamKind::Keyword => "keyword",
                    ParamKind::KeywordRest => "keyword rest",
                    ParamKind::Block => "block",
                    ParamKind::Forwarding => "forwarding",
                };
                write!(f, "{} parameter", kind)
            }
            Reason::UntypedParam { name } => {
                write!(f, "parameter `{}` has no default and no usable calls", name)
            }
            Reason::DuckTyped { methods, candidates } => write!(
                f,
                "duck typed from {} ({} candidate{})",
                dotted(methods),
                candidates,
                if *candidates == 1 { "" } else { "s" }
            ),
            Reason::AmbiguousDuckType { methods, candidates } => write!(
                f,
                "{} types respond to {}; too ambiguous",
                candidates,
                dotted(methods)
            ),
            Reason::NoDuckCandidate { methods } => {
                write!(f, "no type responds to {}", dotted(methods))
            }
            Reason::TypeReference { name } => write!(f, "constant `{}` names a type", name),
            Reason::UnresolvedConstant { name } => write!(f, "unresolved constant `{}`", name),
            Reason::Constructor { name } => write!(f, "constructed by {}.new", name),
            Reason::ProjectMethod { owner, method, singleton } => {
                let sep = if *singleton { "." } else { "#" };
                write!(f, "defined at {}{}{}", owner, sep, method)
            }
            Reason::TopLevelFunction { name } => write!(f, "defined at top level as `{}`", name),
            Reason::UnionReceiver { method, members } => {
                write!(f, "joined .{} over {} receiver types", method, members)
            }
            Reason::CatalogueMethod { owner, method } => {
                write!(f, "signature of {}#{}", owner, method)
            }
            Reason::CallableResult => write!(f, "result of a callable"),
            Reason::ShapeField { key } => write!(f, "shape field :{}", key),
            Reason::ShapeMissingKey { key } => write!(f, "shape has no key :{}", key),
            Reason::BlockParam { owner, method, index } => {
                write!(f, "block parameter {} of {}#{}", index, owner, method)
            }
            Reason::BlockParamWithoutReceiver { method } => {
                write!(f, "block of .{} has no typed receiver", method)
            }
            Reason::NoBlockParam { method, index } => {
                write!(f, "no block parameter {} for .{}", index, method)
            }
            Reason::UntypedReceiver { method } => {
                write!(f, "receiver of .{} has no known type", method)
            }
            Reason::NoSuchMethod { owner: Some(owner), method } => {
                write!(f, "no method {}#{}", owner, method)
            }
            Reason::NoSuchMethod { owner: None, method } => write!(f, "no method `{}`", method),
            Reason::BranchJoin { branches } => write!(f, "join of {} branches", branches),
            Reason::Initializer => write!(f, "initializer returns its receiver"),
            Reason::EmptyBody => write!(f, "empty body"),
            Reason::NoReturnValue { method } => {
                write!(f, "no return value captured for `{}`", method)
            }
            Reason::SelfReference => write!(f, "self"),
            Reason::ImplicitNil => write!(f, "return without value"),
            Reason::Unsupported(what) => write!(f, "unsupported {}", what),
        }
    }
}

/// The result of inferring one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inference {
    pub ty: Ty,
    pub reason: Reason,
    pub provenance: Provenance,
}

impl Inference {
    pub fn new(ty: Ty, reason: Reason, provenance: Provenance) -> Self {
        Inference { ty, reason, provenance }
    }

    /// Nothing is known, for the given reason.
    pub fn unknown(reason: Reason) -> Self {
        Self::new(Ty::Unknown, reason, Provenance::Unknown)
    }

    pub fn literal(ty: Ty) -> Self {
        Self::new(ty, Reason::Literal, Provenance::Literal)
    }

    pub fn is_unknown(&self) -> bool {
        self.ty.is_unknown()
    }

    /// Keep the reason and provenance, replace the type.
    pub fn with_ty(self, ty: Ty) -> Self {
        Inference { ty, ..self }
    }
}
