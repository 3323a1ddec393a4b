//! The indexing session.
//!
//! A [`Session`] owns the mutable state of one analysis: interned files,
//! the IR graph, the registries, and the memo cache. All of it sits behind
//! a single lock, so re-indexing a file and answering queries are
//! serialized. Any re-index clears the whole memo cache.

use std::path::Path;
use std::sync::Arc;

use duckhint_common::{FileId, FileTable, InferConfig};
use parking_lot::Mutex;
use rowan::{TextRange, TextSize};

use crate::dump::{self, GraphDump};
use crate::error::Inference;
use crate::ir::{CalledMethod, FieldScope, IrGraph, NodeId, NodeKind, VarId};
use crate::ports::{CodeIndex, SignatureProvider, Simplifier};
use crate::registry::Registries;
use crate::resolve::{Env, InferCache, Resolver};
use crate::simplify::NoopSimplifier;
use crate::ty::MethodSig;

pub type SharedIndex = Arc<dyn CodeIndex + Send + Sync>;
pub type SharedSignatures = Arc<dyn SignatureProvider + Send + Sync>;
pub type SharedSimplifier = Arc<dyn Simplifier + Send + Sync>;

#[derive(Debug, Default)]
struct Inner {
    files: FileTable,
    graph: IrGraph,
    registries: Registries,
    cache: InferCache,
}

pub struct Session {
    config: InferConfig,
    index: SharedIndex,
    signatures: SharedSignatures,
    simplifier: SharedSimplifier,
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new(index: SharedIndex, signatures: SharedSignatures, config: InferConfig) -> Self {
        Session {
            config,
            index,
            signatures,
            simplifier: Arc::new(NoopSimplifier),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_simplifier(mut self, simplifier: SharedSimplifier) -> Self {
        self.simplifier = simplifier;
        self
    }

    pub fn config(&self) -> &InferConfig {
        &self.config
    }

    /// Rebuild the IR of `path`. The file's previous nodes and registry
    /// entries are dropped and the memo cache is cleared before `build`
    /// runs.
    #[tracing::instrument(level = "debug", skip(self, build), fields(path = %path.display()))]
    pub fn index_file<R>(&self, path: &Path, build: impl FnOnce(&mut FileBuilder<'_>) -> R) -> R {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let file = inner.files.intern(path);
        let nodes = inner.graph.remove_file(file);
        let entries = inner.registries.remove_file(file);
        let cached = inner.cache.footprint();
        inner.cache.clear();
        tracing::debug!(
            %file,
            nodes,
            entries,
            cached,
            capacity = inner.graph.capacity(),
            "dropped previous file contents"
        );

        let mut builder = FileBuilder {
            file,
            graph: &mut inner.graph,
            registries: &mut inner.registries,
        };
        build(&mut builder)
    }

    /// Forget everything indexed from `path`. Returns whether the file was
    /// known.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn remove_file(&self, path: &Path) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(file) = inner.files.get(path) else {
            return false;
        };
        inner.graph.remove_file(file);
        inner.registries.remove_file(file);
        inner.cache.clear();
        true
    }

    /// Drop all state. Node ids handed out before are no longer valid.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn reset(&self) {
        *self.inner.lock() = Inner::default();
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.inner.lock().files.get(path)
    }

    /// Number of live nodes across all files.
    pub fn node_count(&self) -> usize {
        self.inner.lock().graph.len()
    }

    /// Number of memoized results.
    pub fn cached_count(&self) -> usize {
        self.inner.lock().cache.len()
    }

    /// Run `f` with a resolver over the current state, holding the lock.
    pub fn with_resolver<R>(&self, f: impl FnOnce(&mut Resolver<'_>) -> R) -> R {
        let mut guard = self.inner.lock();
        let Inner { graph, registries, cache, .. } = &mut *guard;
        let env = Env::new(
            graph,
            registries,
            &*self.index,
            &*self.signatures,
            &self.config,
        )
        .with_simplifier(&*self.simplifier);
        let mut resolver = Resolver::new(env, cache);
        f(&mut resolver)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn infer(&self, id: NodeId) -> Inference {
        self.with_resolver(|r| r.infer(id))
    }

    pub fn signature_of(&self, def: NodeId) -> Option<MethodSig> {
        self.with_resolver(|r| r.signature_of(def))
    }

    /// Hover text for a node: `def name: signature` for definitions, the
    /// rendered type otherwise.
    pub fn hover(&self, id: NodeId) -> Option<String> {
        self.with_resolver(|r| {
            let graph = r.env().graph;
            match &graph.get(id)?.kind {
                NodeKind::Def(def) => {
                    let sig = r.signature_of(id)?;
                    let prefix = if def.singleton { "self." } else { "" };
                    Some(format!("def {}{}: {}", prefix, def.name, sig))
                }
                _ => Some(r.infer(id).ty.to_string()),
            }
        })
    }

    /// Hover text for the innermost node at `offset` in `path`.
    pub fn hover_at(&self, path: &Path, offset: u32) -> Option<String> {
        let file = self.file_id(path)?;
        let id = self.inner.lock().graph.node_at(file, offset)?;
        self.hover(id)
    }

    /// Dump every node of `path` with its inferred type.
    pub fn dump_file(&self, path: &Path) -> Option<GraphDump> {
        let file = self.file_id(path)?;
        Some(self.with_resolver(|r| {
            let graph = r.env().graph;
            let ids: Vec<NodeId> = graph.nodes_in_file(file).map(|n| n.id).collect();
            dump::dump_nodes(r, ids)
        }))
    }
}

// ── File Builder ───────────────────────────────────────────────────────

/// Adds one file's nodes and registrations to a session.
pub struct FileBuilder<'s> {
    file: FileId,
    graph: &'s mut IrGraph,
    registries: &'s mut Registries,
}

impl FileBuilder<'_> {
    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn graph(&self) -> &IrGraph {
        &*self.graph
    }

    /// The id the next added node will get.
    pub fn next_id(&self) -> NodeId {
        self.graph.next_id()
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.graph.add_in(Some(self.file), None, kind)
    }

    /// Add a node covering `start..end` of the file.
    pub fn add_at(&mut self, start: u32, end: u32, kind: NodeKind) -> NodeId {
        let range = TextRange::new(TextSize::from(start), TextSize::from(end));
        self.graph.add_in(Some(self.file), Some(range), kind)
    }

    pub fn new_var(&mut self, name: impl Into<String>) -> VarId {
        self.graph.new_var(name, Some(self.file))
    }

    pub fn record_call(&mut self, var: VarId, call: CalledMethod) {
        self.graph.record_call(var, call);
    }

    /// Register a definition node under its owner. Returns false if `def`
    /// is not a definition.
    pub fn register_method(&mut self, def: NodeId) -> bool {
        match self.graph.kind(def) {
            Some(NodeKind::Def(d)) => {
                self.registries.methods.register_def(d, def, Some(self.file));
                true
            }
            _ => false,
        }
    }

    pub fn register_function(&mut self, name: &str, def: NodeId) {
        self.registries.methods.register_function(name, def, Some(self.file));
    }

    /// Register a field writer. Returns whether it is now the field's type
    /// source; later writers take over only once earlier files are removed.
    pub fn register_field(&mut self, scope: FieldScope, owner: &str, name: &str, write: NodeId) -> bool {
        self.registries
            .fields_mut(scope)
            .register(owner, name, write, Some(self.file))
    }
}
