//! Per-type lookup tables for project-defined methods and fields.
//!
//! Registries map `(owner, name)` to the IR node that defines or first
//! assigns the member. Lookups try the owner itself, then walk the ancestor
//! chain supplied by the [`CodeIndex`]. Entries remember the file they came
//! from so a re-indexed file can be dropped without rebuilding the rest.
//! Every registration is kept, not only the winning one: when the file
//! holding the winner goes away, the next registration in line takes over.

use duckhint_common::FileId;
use rustc_hash::FxHashMap;

use crate::ir::{DefNode, FieldScope, NodeId};
use crate::ports::CodeIndex;

/// Which of several registrations of a key answers lookups.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Overwrite {
    /// The latest registration answers; a redefinition shadows earlier ones.
    LastWins,
    /// The earliest live registration answers.
    FirstWins,
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    node: NodeId,
    file: Option<FileId>,
}

/// A two-level `owner -> name -> registrations` table. Registrations of
/// one key are kept in the order they were made.
#[derive(Debug)]
pub struct ScopedRegistry {
    policy: Overwrite,
    by_owner: FxHashMap<String, FxHashMap<String, Vec<Entry>>>,
}

impl ScopedRegistry {
    pub fn new(policy: Overwrite) -> Self {
        ScopedRegistry { policy, by_owner: FxHashMap::default() }
    }

    /// Register `node` for `(owner, name)`. Returns whether it now answers
    /// lookups for the key.
    pub fn register(&mut self, owner: &str, name: &str, node: NodeId, file: Option<FileId>) -> bool {
        let entries = self
            .by_owner
            .entry(owner.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default();
        entries.push(Entry { node, file });
        match self.policy {
            Overwrite::LastWins => true,
            Overwrite::FirstWins => entries.len() == 1,
        }
    }

    /// Exact lookup on `owner` only.
    pub fn get(&self, owner: &str, name: &str) -> Option<NodeId> {
        let entries = self.by_owner.get(owner)?.get(name)?;
        let entry = match self.policy {
            Overwrite::LastWins => entries.last(),
            Overwrite::FirstWins => entries.first(),
        };
        entry.map(|e| e.node)
    }

    /// Lookup on `owner`, then on each ancestor in order. Without an index
    /// only `owner` is consulted.
    pub fn lookup(&self, owner: &str, name: &str, index: Option<&dyn CodeIndex>) -> Option<NodeId> {
        if let Some(node) = self.get(owner, name) {
            return Some(node);
        }
        let index = index?;
        index
            .ancestors_of(owner)
            .iter()
            .filter(|ancestor| ancestor.as_str() != owner)
            .find_map(|ancestor| {
                let hit = self.get(ancestor, name);
                if hit.is_some() {
                    tracing::trace!(owner, name, ancestor = %ancestor, "registry hit via ancestor");
                }
                hit
            })
    }

    /// Drop every registration made from `file`. Returns how many went.
    pub fn remove_file(&mut self, file: FileId) -> usize {
        let mut removed = 0;
        for members in self.by_owner.values_mut() {
            for entries in members.values_mut() {
                let before = entries.len();
                entries.retain(|e| e.file != Some(file));
                removed += before - entries.len();
            }
            members.retain(|_, entries| !entries.is_empty());
        }
        self.by_owner.retain(|_, members| !members.is_empty());
        removed
    }

    pub fn clear(&mut self) {
        self.by_owner.clear();
    }

    /// Number of keys with at least one registration.
    pub fn len(&self) -> usize {
        self.by_owner.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Methods ────────────────────────────────────────────────────────────

/// Owner key under which top-level functions are stored.
const TOP_LEVEL: &str = "";

/// Project-defined methods. A redefinition shadows the earlier one.
#[derive(Debug)]
pub struct MethodRegistry {
    instance: ScopedRegistry,
    singleton: ScopedRegistry,
    functions: ScopedRegistry,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    pub fn new() -> Self {
        MethodRegistry {
            instance: ScopedRegistry::new(Overwrite::LastWins),
            singleton: ScopedRegistry::new(Overwrite::LastWins),
            functions: ScopedRegistry::new(Overwrite::LastWins),
        }
    }

    /// Register a definition under its owner and level.
    pub fn register_def(&mut self, def: &DefNode, node: NodeId, file: Option<FileId>) {
        self.register(&def.owner, &def.name, def.singleton, node, file);
    }

    pub fn register(
        &mut self,
        owner: &str,
        name: &str,
        singleton: bool,
        node: NodeId,
        file: Option<FileId>,
    ) {
        let table = if singleton { &mut self.singleton } else { &mut self.instance };
        table.register(owner, name, node, file);
    }

    /// Register a top-level function.
    pub fn register_function(&mut self, name: &str, node: NodeId, file: Option<FileId>) {
        self.functions.register(TOP_LEVEL, name, node, file);
    }

    pub fn lookup(
        &self,
        owner: &str,
        name: &str,
        singleton: bool,
        index: Option<&dyn CodeIndex>,
    ) -> Option<NodeId> {
        let table = if singleton { &self.singleton } else { &self.instance };
        table.lookup(owner, name, index)
    }

    pub fn lookup_function(&self, name: &str) -> Option<NodeId> {
        self.functions.get(TOP_LEVEL, name)
    }

    pub fn remove_file(&mut self, file: FileId) -> usize {
        self.instance.remove_file(file)
            + self.singleton.remove_file(file)
            + self.functions.remove_file(file)
    }

    pub fn clear(&mut self) {
        self.instance.clear();
        self.singleton.clear();
        self.functions.clear();
    }

    pub fn len(&self) -> usize {
        self.instance.len() + self.singleton.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Fields ─────────────────────────────────────────────────────────────

/// Field writers. The first live assignment of a field is its type
/// source; later ones wait in line behind it.
#[derive(Debug)]
pub struct FieldRegistry {
    table: ScopedRegistry,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistry {
    pub fn new() -> Self {
        FieldRegistry { table: ScopedRegistry::new(Overwrite::FirstWins) }
    }

    pub fn register(&mut self, owner: &str, name: &str, node: NodeId, file: Option<FileId>) -> bool {
        self.table.register(owner, name, node, file)
    }

    pub fn lookup(&self, owner: &str, name: &str, index: Option<&dyn CodeIndex>) -> Option<NodeId> {
        self.table.lookup(owner, name, index)
    }

    pub fn remove_file(&mut self, file: FileId) -> usize {
        self.table.remove_file(file)
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// All registries of one indexing session.
#[derive(Debug, Default)]
pub struct Registries {
    pub methods: MethodRegistry,
    pub ivars: FieldRegistry,
    pub cvars: FieldRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self, scope: FieldScope) -> &FieldRegistry {
        match scope {
            FieldScope::Instance => &self.ivars,
            FieldScope::Class => &self.cvars,
        }
    }

    pub fn fields_mut(&mut self, scope: FieldScope) -> &mut FieldRegistry {
        match scope {
            FieldScope::Instance => &mut self.ivars,
            FieldScope::Class => &mut self.cvars,
        }
    }

    pub fn remove_file(&mut self, file: FileId) -> usize {
        self.methods.remove_file(file) + self.ivars.remove_file(file) + self.cvars.remove_file(file)
    }

    pub fn clear(&mut self) {
        self.methods.clear();
        self.ivars.clear();
        self.cvars.clear();
    }
}
