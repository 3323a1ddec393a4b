//! An in-memory [`CodeIndex`].
//!
//! Hosts that have no richer program database can describe the type
//! hierarchy directly: classes with superclasses, modules, mixins, and the
//! methods each defines. Lookups follow the same ancestor order the
//! language uses for method dispatch.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::CalledMethod;
use crate::ports::{CodeIndex, ConstantKind};
use crate::ty::{names, Arity};

#[derive(Clone, Debug)]
struct TypeEntry {
    kind: ConstantKind,
    superclass: Option<String>,
    includes: Vec<String>,
    extends: Vec<String>,
    /// Instance methods, with their arity when it is known.
    methods: FxHashMap<String, Option<Arity>>,
    singleton_methods: FxHashSet<String>,
}

impl TypeEntry {
    fn new(kind: ConstantKind, superclass: Option<String>) -> Self {
        TypeEntry {
            kind,
            superclass,
            includes: Vec::new(),
            extends: Vec::new(),
            methods: FxHashMap::default(),
            singleton_methods: FxHashSet::default(),
        }
    }
}

/// A type hierarchy held in hash maps. Types are reported in definition
/// order.
#[derive(Clone, Debug, Default)]
pub struct MemoryIndex {
    types: FxHashMap<String, TypeEntry>,
    order: Vec<String>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that already knows the core class hierarchy.
    pub fn with_core_types() -> Self {
        let mut index = Self::new();
        index.define_class(names::OBJECT, None);
        index.define_class("Numeric", Some(names::OBJECT));
        index.define_class(names::INTEGER, Some("Numeric"));
        index.define_class(names::FLOAT, Some("Numeric"));
        for name in [
            names::NIL,
            names::TRUE,
            names::FALSE,
            names::STRING,
            names::SYMBOL,
            names::ARRAY,
            names::HASH,
            names::RANGE,
            names::PROC,
        ] {
            index.define_class(name, Some(names::OBJECT));
        }
        index
    }

    fn entry(&mut self, name: &str, kind: ConstantKind) -> &mut TypeEntry {
        if !self.types.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.types
            .entry(name.to_string())
            .or_insert_with(|| TypeEntry::new(kind, None))
    }

    /// Define (or reopen) a class. A reopening without a superclass keeps
    /// the earlier one.
    pub fn define_class(&mut self, name: &str, superclass: Option<&str>) -> &mut Self {
        let entry = self.entry(name, ConstantKind::Type);
        entry.kind = ConstantKind::Type;
        if let Some(sup) = superclass {
            entry.superclass = Some(sup.to_string());
        }
        self
    }

    pub fn define_module(&mut self, name: &str) -> &mut Self {
        self.entry(name, ConstantKind::Module).kind = ConstantKind::Module;
        self
    }

    /// Mix `module` into instances of `target`.
    pub fn include(&mut self, target: &str, module: &str) -> &mut Self {
        let entry = self.entry(target, ConstantKind::Type);
        if !entry.includes.iter().any(|m| m == module) {
            entry.includes.push(module.to_string());
        }
        self
    }

    /// Mix `module`'s methods into `target` itself.
    pub fn extend(&mut self, target: &str, module: &str) -> &mut Self {
        let entry = self.entry(target, ConstantKind::Type);
        if !entry.extends.iter().any(|m| m == module) {
            entry.extends.push(module.to_string());
        }
        self
    }

    /// Record an instance method. `arity` is `None` when the parameter
    /// list is not known.
    pub fn define_method(&mut self, owner: &str, name: &str, arity: Option<Arity>) -> &mut Self {
        self.entry(owner, ConstantKind::Type)
            .methods
            .insert(name.to_string(), arity);
        self
    }

    pub fn define_singleton_method(&mut self, owner: &str, name: &str) -> &mut Self {
        self.entry(owner, ConstantKind::Type)
            .singleton_methods
            .insert(name.to_string());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// `type_name` followed by its ancestors.
    fn lineage(&self, type_name: &str) -> Vec<String> {
        let mut out = vec![type_name.to_string()];
        out.extend(self.ancestors_of(type_name));
        out
    }

    /// The nearest definition of instance method `name` on `type_name` or
    /// its ancestors. `None` if nothing defines it; `Some(None)` if it is
    /// defined with an unknown arity.
    fn find_method(&self, type_name: &str, name: &str) -> Option<Option<Arity>> {
        self.lineage(type_name)
            .iter()
            .find_map(|t| self.types.get(t).and_then(|e| e.methods.get(name).copied()))
    }

    fn responds_to(&self, type_name: &str, call: &CalledMethod) -> bool {
        match self.find_method(type_name, &call.name) {
            None => false,
            Some(None) => true,
            Some(Some(arity)) => call.arity.map_or(true, |n| arity.accepts(n)),
        }
    }
}

impl CodeIndex for MemoryIndex {
    /// Included modules (most recent first), then the superclass and its
    /// own ancestors. `type_name` itself is not listed.
    fn ancestors_of(&self, type_name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(type_name.to_string());
        let mut current = self.types.get(type_name);
        while let Some(entry) = current {
            for module in entry.includes.iter().rev() {
                if seen.insert(module.clone()) {
                    out.push(module.clone());
                }
            }
            current = match &entry.superclass {
                Some(sup) if seen.insert(sup.clone()) => {
                    out.push(sup.clone());
                    self.types.get(sup)
                }
                _ => None,
            };
        }
        out
    }

    fn constant_kind(&self, name: &str) -> Option<ConstantKind> {
        self.types.get(name).map(|e| e.kind)
    }

    fn type_method_owner(&self, type_name: &str, method: &str) -> Option<String> {
        let mut seen = FxHashSet::default();
        let mut current = Some(type_name);
        while let Some(name) = current {
            if !seen.insert(name) {
                break;
            }
            let entry = self.types.get(name)?;
            if entry.singleton_methods.contains(method) {
                return Some(name.to_string());
            }
            if let Some(module) = entry
                .extends
                .iter()
                .rev()
                .find(|m| self.find_method(m, method).is_some())
            {
                return Some(module.clone());
            }
            current = entry.superclass.as_deref();
        }
        None
    }

    fn find_types_defining_methods(&self, methods: &[CalledMethod]) -> Vec<String> {
        if methods.is_empty() {
            return Vec::new();
        }
        self.order
            .iter()
            .filter(|name| {
                self.types
                    .get(name.as_str())
                    .is_some_and(|e| e.kind == ConstantKind::Type)
            })
            .filter(|name| methods.iter().all(|call| self.responds_to(name, call)))
            .cloned()
            .collect()
    }
}
