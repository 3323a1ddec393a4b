//! The inference engine.
//!
//! [`Resolver`] computes an [`Inference`] for any node by dispatching on
//! its kind and pulling on the nodes it depends on. Results are memoized
//! per [`NodeId`] in an [`InferCache`] owned by the caller. A node that is
//! re-entered while still being inferred short-circuits to `Unknown` with
//! reason "circular reference", so every query terminates.
//!
//! The resolver reads the graph and registries through an [`Env`] and
//! never mutates them; the cache is the only state it writes.

use duckhint_common::InferConfig;
use rustc_hash::FxHashMap;

use crate::duck;
use crate::error::{Inference, Provenance, Reason};
use crate::ir::{
    CallNode, CalledMethod, DefNode, HashKey, IrGraph, LiteralValue, Node, NodeId, NodeKind, VarId,
};
use crate::ports::{CodeIndex, SignatureProvider, Simplifier};
use crate::registry::Registries;
use crate::simplify::NoopSimplifier;
use crate::ty::{names, vars, MethodSig, ParamKind, ParamSig, Subst, Ty};

/// Upper bound on `A = B` alias hops followed when resolving a type
/// reference.
const MAX_ALIAS_HOPS: usize = 16;

/// Everything a resolver reads.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub graph: &'a IrGraph,
    pub registries: &'a Registries,
    pub index: &'a dyn CodeIndex,
    pub signatures: &'a dyn SignatureProvider,
    pub simplifier: &'a dyn Simplifier,
    pub config: &'a InferConfig,
}

impl<'a> Env<'a> {
    /// An environment without a simplifier.
    pub fn new(
        graph: &'a IrGraph,
        registries: &'a Registries,
        index: &'a dyn CodeIndex,
        signatures: &'a dyn SignatureProvider,
        config: &'a InferConfig,
    ) -> Self {
        Env { graph, registries, index, signatures, simplifier: &NoopSimplifier, config }
    }

    pub fn with_simplifier(self, simplifier: &'a dyn Simplifier) -> Self {
        Env { simplifier, ..self }
    }
}

// ── Cache ──────────────────────────────────────────────────────────────

/// Memo state of one node.
#[derive(Clone, Debug, Default)]
pub enum Slot {
    #[default]
    NotStarted,
    InProgress,
    Done(Inference),
}

static NOT_STARTED: Slot = Slot::NotStarted;

/// Per-node memo table. Holds entries only for nodes queried since the
/// last `clear`, whatever their ids.
#[derive(Debug, Default)]
pub struct InferCache {
    slots: FxHashMap<NodeId, Slot>,
}

impl InferCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, id: NodeId) -> &Slot {
        self.slots.get(&id).unwrap_or(&NOT_STARTED)
    }

    /// The finished result for `id`, if any.
    pub fn get(&self, id: NodeId) -> Option<&Inference> {
        match self.slot(id) {
            Slot::Done(inference) => Some(inference),
            _ => None,
        }
    }

    fn set(&mut self, id: NodeId, slot: Slot) {
        match slot {
            Slot::NotStarted => {
                self.slots.remove(&id);
            }
            slot => {
                self.slots.insert(id, slot);
            }
        }
    }

    /// Forget every result.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of finished results.
    pub fn len(&self) -> usize {
        self.slots.values().filter(|s| matches!(s, Slot::Done(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots held, finished or in progress.
    pub fn footprint(&self) -> usize {
        self.slots.len()
    }
}

// ── Resolver ───────────────────────────────────────────────────────────

/// Computes types for nodes on demand.
pub struct Resolver<'a> {
    env: Env<'a>,
    cache: &'a mut InferCache,
    depth: usize,
    /// Depth-limit cut-offs seen so far. A result computed while this
    /// grew depends on where the query started and is not memoized.
    depth_cutoffs: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(env: Env<'a>, cache: &'a mut InferCache) -> Self {
        Resolver { env, cache, depth: 0, depth_cutoffs: 0 }
    }

    pub fn env(&self) -> Env<'a> {
        self.env
    }

    /// Infer the type of `id`. Never fails; unresolvable input yields
    /// `Unknown` with a reason.
    pub fn infer(&mut self, id: NodeId) -> Inference {
        match self.cache.slot(id) {
            Slot::Done(inference) => return inference.clone(),
            Slot::InProgress => {
                tracing::debug!(node = id.0, "cycle detected");
                return Inference::unknown(Reason::CircularReference);
            }
            Slot::NotStarted => {}
        }
        let graph = self.env.graph;
        let Some(node) = graph.get(id) else {
            return Inference::unknown(Reason::DanglingNode(id));
        };
        if self.depth >= self.env.config.max_depth {
            tracing::debug!(node = id.0, depth = self.depth, "depth limit reached");
            self.depth_cutoffs += 1;
            return Inference::unknown(Reason::DepthLimit);
        }

        tracing::trace!(node = id.0, kind = node.kind.label(), "infer");
        self.cache.set(id, Slot::InProgress);
        self.depth += 1;
        let cutoffs = self.depth_cutoffs;
        let inference = self.dispatch(node);
        self.depth -= 1;

        let ty = self.env.simplifier.simplify(inference.ty);
        let inference = Inference { ty, ..inference };
        if self.depth_cutoffs == cutoffs {
            self.cache.set(id, Slot::Done(inference.clone()));
        } else {
            tracing::trace!(node = id.0, "result cut off by depth limit; not memoized");
            self.cache.set(id, Slot::NotStarted);
        }
        inference
    }

    pub fn infer_ty(&mut self, id: NodeId) -> Ty {
        self.infer(id).ty
    }

    /// The signature of a method definition: each parameter's inferred
    /// type and the inferred return type, with `self` bound to the owner.
    pub fn signature_of(&mut self, def_id: NodeId) -> Option<MethodSig> {
        let graph = self.env.graph;
        let NodeKind::Def(def) = graph.kind(def_id)? else {
            return None;
        };
        let mut params = Vec::with_capacity(def.params.len());
        for &param in &def.params {
            if let Some(NodeKind::Param { name, kind, .. }) = graph.kind(param) {
                params.push(ParamSig::new(name.clone(), *kind, self.infer_ty(param)));
            }
        }
        let owner = if def.singleton {
            Ty::singleton(&def.owner)
        } else {
            Ty::instance(&def.owner)
        };
        let mut subst = Subst::new();
        subst.set_self(owner);
        let ret = self.infer_ty(def_id).substitute(&subst).into_owned();
        Some(MethodSig::new(params, ret))
    }

    fn dispatch(&mut self, node: &'a Node) -> Inference {
        match &node.kind {
            NodeKind::Literal { ty, value } => self.infer_literal(ty, value),
            NodeKind::LocalWrite { name, value, .. } | NodeKind::FieldWrite { name, value, .. } => {
                match value {
                    Some(value) => self.infer(*value),
                    None => Inference::unknown(Reason::Unassigned { name: name.clone() }),
                }
            }
            NodeKind::LocalRead { name, var, write } => {
                let inference = match write {
                    Some(write) => self.infer(*write),
                    None => Inference::unknown(Reason::Unassigned { name: name.clone() }),
                };
                self.or_duck_typed(inference, *var)
            }
            NodeKind::FieldRead { scope, owner, name, write } => {
                let writer = (*write).or_else(|| {
                    self.env.registries.fields(*scope).lookup(owner, name, Some(self.env.index))
                });
                match writer {
                    Some(writer) => self.infer(writer),
                    None => Inference::unknown(Reason::NoFieldWriter {
                        owner: owner.clone(),
                        name: name.clone(),
                    }),
                }
            }
            NodeKind::Param { name, kind, default, var } => {
                self.infer_param(name, *kind, *default, *var)
            }
            NodeKind::Constant { name, target } => match target {
                Some(target) => self.infer(*target),
                None if self.env.index.constant_kind(name).is_some() => Inference::new(
                    Ty::singleton(name.clone()),
                    Reason::TypeReference { name: name.clone() },
                    Provenance::Project,
                ),
                None => Inference::unknown(Reason::UnresolvedConstant { name: name.clone() }),
            },
            NodeKind::Call(call) => self.infer_call(call),
            NodeKind::BlockParam { index, call } => self.infer_block_param(*index, *call),
            NodeKind::Merge { branches } => self.infer_merge(branches),
            NodeKind::Def(def) => self.infer_def(def),
            NodeKind::SelfRef { owner, singleton } => {
                let ty = if *singleton {
                    Ty::singleton(owner.clone())
                } else {
                    Ty::instance(owner.clone())
                };
                Inference::new(ty, Reason::SelfReference, Provenance::Project)
            }
            NodeKind::Return { value } => match value {
                Some(value) => self.infer(*value),
                None => Inference::new(Ty::nil(), Reason::ImplicitNil, Provenance::Project),
            },
        }
    }

    // ── Literals ───────────────────────────────────────────────────────

    fn infer_literal(&mut self, ty: &Ty, value: &'a LiteralValue) -> Inference {
        match value {
            LiteralValue::Array(elems) if !elems.is_empty() => {
                let tys = elems.iter().map(|e| self.infer_ty(*e)).collect();
                Inference::literal(Ty::tuple(tys))
            }
            LiteralValue::Hash(entries) if !entries.is_empty() => {
                let symbol_keys: Option<Vec<&String>> = entries
                    .iter()
                    .map(|(key, _)| match key {
                        HashKey::Symbol(name) => Some(name),
                        HashKey::Expr(_) => None,
                    })
                    .collect();
                let ty = match symbol_keys {
                    Some(keys) => {
                        let fields: Vec<(String, Ty)> = keys
                            .into_iter()
                            .zip(entries)
                            .map(|(key, (_, value))| (key.clone(), self.infer_ty(*value)))
                            .collect();
                        Ty::shape(fields)
                    }
                    None => {
                        let mut keys = Vec::with_capacity(entries.len());
                        let mut values = Vec::with_capacity(entries.len());
                        for (key, value) in entries {
                            keys.push(match key {
                                HashKey::Symbol(_) => Ty::symbol(),
                                HashKey::Expr(id) => self.infer_ty(*id),
                            });
                            values.push(self.infer_ty(*value));
                        }
                        Ty::hash(Ty::union(keys), Ty::union(values))
                    }
                };
                Inference::literal(ty)
            }
            _ => Inference::literal(ty.clone()),
        }
    }

    // ── Variables & Parameters ─────────────────────────────────────────

    /// Fall back to duck typing on the methods called through `var` when
    /// `inference` found nothing.
    fn or_duck_typed(&self, inference: Inference, var: VarId) -> Inference {
        if !inference.is_unknown() {
            return inference;
        }
        let called = self.env.graph.called_methods(var);
        if called.is_empty() {
            return inference;
        }
        let guess = duck::guess(&self.env, called);
        if guess.is_unknown() {
            inference
        } else {
            tracing::debug!(var = self.env.graph.var_name(var), ty = %guess.ty, "read duck typed");
            guess
        }
    }

    fn infer_param(
        &mut self,
        name: &str,
        kind: ParamKind,
        default: Option<NodeId>,
        var: VarId,
    ) -> Inference {
        let fixed = match kind {
            ParamKind::Rest => Some(Ty::array(Ty::Unknown)),
            ParamKind::KeywordRest => Some(Ty::hash(Ty::symbol(), Ty::Unknown)),
            ParamKind::Block => Some(Ty::instance(names::PROC)),
            ParamKind::Forwarding => Some(Ty::ForwardingArgs),
            ParamKind::Required | ParamKind::Optional | ParamKind::Keyword => None,
        };
        if let Some(ty) = fixed {
            return Inference::new(ty, Reason::ParamKind(kind), Provenance::Project);
        }

        let from_default = default.map(|d| self.infer(d));
        if let Some(inference) = from_default.as_ref().filter(|i| !i.is_unknown()) {
            return inference.clone();
        }
        let called = self.env.graph.called_methods(var);
        if !called.is_empty() {
            let guess = duck::guess(&self.env, called);
            if !guess.is_unknown() || from_default.is_none() {
                return guess;
            }
        }
        from_default
            .unwrap_or_else(|| Inference::unknown(Reason::UntypedParam { name: name.to_string() }))
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn infer_call(&mut self, call: &'a CallNode) -> Inference {
        if let Some(type_name) = call.receiver.and_then(|r| self.type_reference(r)) {
            let args = self.arg_types(call);
            let receiver = Ty::singleton(type_name.clone());
            return match self.type_level_call(&type_name, call, &args) {
                Some(found) if !found.is_unknown() => found,
                pending => self.fallback_call(call, &args, Some(&receiver), false, pending),
            };
        }

        let args = self.arg_types(call);
        let Some(receiver) = call.receiver else {
            return self.fallback_call(call, &args, None, false, None);
        };

        let mut receiver_ty = self.infer_ty(receiver);
        let mut guessed = false;
        if receiver_ty.is_unknown() {
            let guess = duck::guess(&self.env, &[CalledMethod::named(call.method.as_str())]);
            if !guess.is_unknown() {
                tracing::debug!(method = %call.method, receiver = %guess.ty, "receiver duck typed");
                receiver_ty = guess.ty;
                guessed = true;
            }
        }

        let pending = self.dispatch_on(&receiver_ty, call, &args);
        if let Some(found) = pending.as_ref().filter(|f| !f.is_unknown()) {
            let mut found = found.clone();
            if guessed {
                found.provenance = Provenance::Heuristic;
            }
            return found;
        }
        let tried_catch_all = matches!(receiver_ty, Ty::Union(_))
            || (receiver_ty.nominal_name().is_some() && !matches!(receiver_ty, Ty::Singleton(_)));
        self.fallback_call(call, &args, Some(&receiver_ty), tried_catch_all, pending)
    }

    fn arg_types(&mut self, call: &CallNode) -> Vec<Ty> {
        call.args.iter().map(|a| self.infer_ty(*a)).collect()
    }

    /// The type name a receiver refers to when it is a constant, following
    /// alias assignments.
    fn type_reference(&mut self, receiver: NodeId) -> Option<String> {
        let graph = self.env.graph;
        let mut current = receiver;
        for _ in 0..MAX_ALIAS_HOPS {
            match graph.kind(current)? {
                NodeKind::Constant { name, target: None } => return Some(name.clone()),
                NodeKind::Constant { target: Some(target), .. } => current = *target,
                _ if current == receiver => return None,
                _ => {
                    return match self.infer_ty(current) {
                        Ty::Singleton(name) => Some(name),
                        _ => None,
                    }
                }
            }
        }
        None
    }

    /// Dispatch on an already-typed receiver. `Some` with a known type is
    /// an answer; `Some` with `Unknown` is a project definition that could
    /// not be inferred; `None` means nothing was found.
    fn dispatch_on(&mut self, receiver: &Ty, call: &'a CallNode, args: &[Ty]) -> Option<Inference> {
        match receiver {
            Ty::Union(members) => {
                let found: Vec<Ty> = members
                    .iter()
                    .filter(|m| !m.is_unknown())
                    .filter_map(|m| self.dispatch_on(m, call, args))
                    .map(|inference| inference.ty)
                    .filter(|ty| !ty.is_unknown())
                    .collect();
                if found.is_empty() {
                    return None;
                }
                Some(Inference::new(
                    Ty::union(found),
                    Reason::UnionReceiver { method: call.method.clone(), members: members.len() },
                    Provenance::Heuristic,
                ))
            }
            Ty::Singleton(name) => self.type_level_call(name, call, args),
            Ty::Shape(fields) if call.method == "[]" && call.args.len() == 1 => {
                match self.symbol_arg(call) {
                    Some(key) => Some(match fields.get(key) {
                        Some(ty) => Inference::new(
                            ty.clone(),
                            Reason::ShapeField { key: key.to_string() },
                            Provenance::Literal,
                        ),
                        None => Inference::new(
                            Ty::nil(),
                            Reason::ShapeMissingKey { key: key.to_string() },
                            Provenance::Literal,
                        ),
                    }),
                    None => self.instance_call(names::HASH, receiver, call, args),
                }
            }
            Ty::Method(sig) if call.method == "call" => Some(Inference::new(
                (*sig.ret).clone(),
                Reason::CallableResult,
                Provenance::Heuristic,
            )),
            _ => {
                let name = receiver.nominal_name()?.to_string();
                self.instance_call(&name, receiver, call, args)
            }
        }
    }

    /// The symbol named by a call's single literal argument.
    fn symbol_arg(&self, call: &CallNode) -> Option<&'a str> {
        let graph = self.env.graph;
        match graph.kind(*call.args.first()?)? {
            NodeKind::Literal { value: LiteralValue::Symbol(name), .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// An instance call on a receiver of nominal type `name`: project
    /// method, then the catalogue for `name`, then the catch-all type.
    fn instance_call(
        &mut self,
        name: &str,
        receiver: &Ty,
        call: &'a CallNode,
        args: &[Ty],
    ) -> Option<Inference> {
        let registries = self.env.registries;
        let project = registries
            .methods
            .lookup(name, &call.method, false, Some(self.env.index))
            .map(|def| self.project_result(def, &call.method, false, receiver));
        if let Some(found) = project.as_ref().filter(|f| !f.is_unknown()) {
            return Some(found.clone());
        }
        let config = self.env.config;
        let catch_all = config.catch_all_type.as_str();
        self.catalogue_call(name, Some(receiver), call, args, false)
            .or_else(|| {
                if name == catch_all {
                    None
                } else {
                    self.catalogue_call(catch_all, Some(receiver), call, args, false)
                }
            })
            .or(project)
    }

    /// A call on the type `name` itself.
    fn type_level_call(&mut self, name: &str, call: &'a CallNode, args: &[Ty]) -> Option<Inference> {
        if self.env.config.is_constructor(&call.method) {
            let ty = match name {
                names::ARRAY => Ty::array(Ty::Unknown),
                names::HASH => Ty::hash(Ty::Unknown, Ty::Unknown),
                names::RANGE => Ty::range(Ty::Unknown),
                _ => Ty::instance(name),
            };
            return Some(Inference::new(
                ty,
                Reason::Constructor { name: name.to_string() },
                Provenance::Project,
            ));
        }

        let index = self.env.index;
        let registries = self.env.registries;
        let owner = index
            .type_method_owner(name, &call.method)
            .unwrap_or_else(|| name.to_string());
        let def = registries
            .methods
            .lookup(&owner, &call.method, true, Some(index))
            .or_else(|| {
                // Methods of an extended module are its instance methods.
                (owner != name)
                    .then(|| registries.methods.lookup(&owner, &call.method, false, Some(index)))
                    .flatten()
            });
        let receiver = Ty::singleton(name);
        let project = def.map(|def| self.project_result(def, &call.method, true, &receiver));
        if let Some(found) = project.as_ref().filter(|f| !f.is_unknown()) {
            return Some(found.clone());
        }
        self.catalogue_call(name, Some(&receiver), call, args, true).or(project)
    }

    /// The result of project method `def`, with `self` bound to the
    /// receiver.
    fn project_result(
        &mut self,
        def: NodeId,
        method: &str,
        singleton: bool,
        receiver: &Ty,
    ) -> Inference {
        let inference = self.infer(def);
        if inference.is_unknown() {
            return inference;
        }
        let owner = match self.env.graph.kind(def) {
            Some(NodeKind::Def(d)) => d.owner.clone(),
            _ => receiver.nominal_name().unwrap_or_default().to_string(),
        };
        let mut subst = Subst::new();
        subst.set_self(receiver.clone());
        let ty = inference.ty.substitute(&subst).into_owned();
        Inference::new(
            ty,
            Reason::ProjectMethod { owner, method: method.to_string(), singleton },
            Provenance::Project,
        )
    }

    /// Ask the catalogue for `owner#method` (or `owner.method`), then bind
    /// the receiver's variables, `self`, and the block result.
    fn catalogue_call(
        &mut self,
        owner: &str,
        receiver: Option<&Ty>,
        call: &'a CallNode,
        args: &[Ty],
        type_level: bool,
    ) -> Option<Inference> {
        let signatures = self.env.signatures;
        let raw = if type_level {
            signatures.type_level_return_type_of(owner, &call.method, args)
        } else {
            signatures.return_type_of(owner, &call.method, args)
        };
        if raw.is_unknown() {
            return None;
        }
        let ty = if raw.has_placeholders() {
            let subst = self.call_subst(receiver, call);
            raw.substitute(&subst).erase_placeholders().into_owned()
        } else {
            raw
        };
        Some(Inference::new(
            ty,
            Reason::CatalogueMethod { owner: owner.to_string(), method: call.method.clone() },
            Provenance::Catalogue,
        ))
    }

    /// Bindings for a call: the receiver's container variables and `self`,
    /// plus `U` when a block body is attached. An empty block yields nil.
    fn call_subst(&mut self, receiver: Option<&Ty>, call: &CallNode) -> Subst {
        let mut subst = match receiver {
            Some(ty) if !ty.is_unknown() => Subst::for_receiver(ty),
            _ => Subst::new(),
        };
        if let Some(block) = &call.block {
            let result = match block.result {
                Some(result) => Some(self.infer_ty(result)),
                None if block.body.is_empty() => Some(Ty::nil()),
                None => None,
            };
            if let Some(result) = result {
                subst.bind(vars::BLOCK_RESULT, result);
            }
        }
        subst
    }

    /// Last resort: a top-level function, then the catch-all type.
    fn fallback_call(
        &mut self,
        call: &'a CallNode,
        args: &[Ty],
        receiver: Option<&Ty>,
        tried_catch_all: bool,
        pending: Option<Inference>,
    ) -> Inference {
        // Top-level functions are private methods of every object, so an
        // unresolved receiver call can land on one too.
        if let Some(def) = self.env.registries.methods.lookup_function(&call.method) {
            let inference = self.infer(def);
            if !inference.is_unknown() {
                return Inference::new(
                    inference.ty,
                    Reason::TopLevelFunction { name: call.method.clone() },
                    Provenance::Project,
                );
            }
        }
        if !tried_catch_all {
            let catch_all = self.env.config.catch_all_type.clone();
            if let Some(found) = self.catalogue_call(&catch_all, receiver, call, args, false) {
                return found;
            }
        }
        if let Some(pending) = pending {
            return pending;
        }
        let method = call.method.clone();
        match receiver {
            Some(ty) if ty.is_unknown() => Inference::unknown(Reason::UntypedReceiver { method }),
            Some(ty) => Inference::unknown(Reason::NoSuchMethod {
                owner: Some(ty.nominal_name().map_or_else(|| ty.to_string(), str::to_string)),
                method,
            }),
            None => Inference::unknown(Reason::NoSuchMethod { owner: None, method }),
        }
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    fn infer_block_param(&mut self, index: usize, call_id: NodeId) -> Inference {
        let graph = self.env.graph;
        let Some(NodeKind::Call(call)) = graph.kind(call_id) else {
            return Inference::unknown(Reason::Unsupported("block parameter outside a call"));
        };
        let method = call.method.clone();
        let Some(receiver) = call.receiver else {
            return Inference::unknown(Reason::BlockParamWithoutReceiver { method });
        };
        let receiver_ty = self.infer_ty(receiver);
        if receiver_ty.is_unknown() {
            return Inference::unknown(Reason::BlockParamWithoutReceiver { method });
        }

        let declared = call.block.as_ref().map_or(0, |b| b.params.len());
        let found: Vec<(String, Ty)> = receiver_ty
            .members()
            .iter()
            .filter_map(|member| self.block_param_of(member, &method, index, declared))
            .collect();
        let Some(owner) = found.first().map(|(owner, _)| owner.clone()) else {
            return Inference::unknown(Reason::NoBlockParam { method, index });
        };
        Inference::new(
            Ty::union(found.into_iter().map(|(_, ty)| ty)),
            Reason::BlockParam { owner, method, index },
            Provenance::Catalogue,
        )
    }

    /// The `index`-th block parameter type `receiver.method` yields, and
    /// the type whose template supplied it.
    fn block_param_of(
        &self,
        receiver: &Ty,
        method: &str,
        index: usize,
        declared: usize,
    ) -> Option<(String, Ty)> {
        let signatures = self.env.signatures;
        let mut owner = receiver.nominal_name()?.to_string();
        let mut templates = signatures.block_param_types_of(&owner, method);
        if templates.is_empty() {
            owner = self.env.config.catch_all_type.clone();
            templates = signatures.block_param_types_of(&owner, method);
        }
        let subst = Subst::for_receiver(receiver);
        let resolve = |t: &Ty| t.substitute(&subst).erase_placeholders().into_owned();

        let ty = match templates.as_slice() {
            [] => return None,
            // One yielded value spread over several declared parameters.
            [single] if declared > 1 => match resolve(single) {
                Ty::Tuple(elems) => elems.get(index).cloned().unwrap_or_else(Ty::nil),
                Ty::Array(elem) => *elem,
                other if index == 0 => other,
                _ => Ty::nil(),
            },
            templates => resolve(templates.get(index)?),
        };
        Some((owner, ty))
    }

    // ── Joins & Definitions ────────────────────────────────────────────

    fn infer_merge(&mut self, branches: &[NodeId]) -> Inference {
        match branches {
            [] => Inference::unknown(Reason::BranchJoin { branches: 0 }),
            [only] => self.infer(*only),
            _ => {
                let results: Vec<Inference> = branches.iter().map(|b| self.infer(*b)).collect();
                let first = results[0].provenance;
                let provenance = if results.iter().all(|r| r.provenance == first) {
                    first
                } else {
                    Provenance::Heuristic
                };
                Inference::new(
                    Ty::union(results.into_iter().map(|r| r.ty)),
                    Reason::BranchJoin { branches: branches.len() },
                    provenance,
                )
            }
        }
    }

    fn infer_def(&mut self, def: &'a DefNode) -> Inference {
        if !def.singleton && self.env.config.is_initializer(&def.name) {
            return Inference::new(Ty::SelfTy, Reason::Initializer, Provenance::Project);
        }
        if def.body.is_empty() {
            return Inference::new(Ty::nil(), Reason::EmptyBody, Provenance::Project);
        }
        match def.ret {
            Some(ret) => self.infer(ret),
            None => Inference::unknown(Reason::NoReturnValue { method: def.name.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::core_catalogue;
    use crate::ir::BlockBody;
    use crate::ports::{NoIndex, NoSignatures};

    fn infer_in(graph: &IrGraph, id: NodeId) -> Inference {
        let registries = Registries::new();
        let config = InferConfig::default();
        let catalogue = core_catalogue();
        let env = Env::new(graph, &registries, &NoIndex, &catalogue, &config);
        let mut cache = InferCache::new();
        Resolver::new(env, &mut cache).infer(id)
    }

    #[test]
    fn literal_keeps_stored_type() {
        let mut g = IrGraph::new();
        let lit = g.add(NodeKind::literal(Ty::string()));
        let inference = infer_in(&g, lit);
        assert_eq!(inference.ty, Ty::string());
        assert_eq!(inference.reason, Reason::Literal);
        assert_eq!(inference.provenance, Provenance::Literal);
    }

    #[test]
    fn array_literal_becomes_tuple() {
        let mut g = IrGraph::new();
        let a = g.add(NodeKind::literal(Ty::integer()));
        let b = g.add(NodeKind::literal(Ty::string()));
        let arr = g.add(NodeKind::Literal {
            ty: Ty::array(Ty::Unknown),
            value: LiteralValue::Array(vec![a, b]),
        });
        assert_eq!(infer_in(&g, arr).ty.to_string(), "[Integer, String]");
    }

    #[test]
    fn mixed_key_hash_literal_is_generic() {
        let mut g = IrGraph::new();
        let k = g.add(NodeKind::literal(Ty::string()));
        let v1 = g.add(NodeKind::literal(Ty::integer()));
        let v2 = g.add(NodeKind::literal(Ty::float()));
        let hash = g.add(NodeKind::Literal {
            ty: Ty::hash(Ty::Unknown, Ty::Unknown),
            value: LiteralValue::Hash(vec![(HashKey::Symbol("a".into()), v1), (HashKey::Expr(k), v2)]),
        });
        assert_eq!(
            infer_in(&g, hash).ty.to_string(),
            "Hash[Symbol | String, Integer | Float]"
        );
    }

    #[test]
    fn dangling_node() {
        let g = IrGraph::new();
        let inference = infer_in(&g, NodeId(7));
        assert!(inference.is_unknown());
        assert_eq!(inference.reason.to_string(), "dangling node #7");
    }

    #[test]
    fn fixed_parameter_kinds() {
        let mut g = IrGraph::new();
        let param = |g: &mut IrGraph, kind: ParamKind| {
            let var = g.new_var("p", None);
            g.add(NodeKind::Param { name: "p".into(), kind, default: None, var })
        };
        let rest = param(&mut g, ParamKind::Rest);
        let kwrest = param(&mut g, ParamKind::KeywordRest);
        let block = param(&mut g, ParamKind::Block);
        let fwd = param(&mut g, ParamKind::Forwarding);
        let plain = param(&mut g, ParamKind::Required);
        assert_eq!(infer_in(&g, rest).ty.to_string(), "Array[untyped]");
        assert_eq!(infer_in(&g, kwrest).ty.to_string(), "Hash[Symbol, untyped]");
        assert_eq!(infer_in(&g, block).ty.to_string(), "Proc");
        assert_eq!(infer_in(&g, fwd).ty, Ty::ForwardingArgs);
        assert_eq!(
            infer_in(&g, plain).reason,
            Reason::UntypedParam { name: "p".into() }
        );
    }

    #[test]
    fn optional_parameter_uses_default() {
        let mut g = IrGraph::new();
        let default = g.add(NodeKind::literal(Ty::integer()));
        let var = g.new_var("n", None);
        let param = g.add(NodeKind::Param {
            name: "n".into(),
            kind: ParamKind::Optional,
            default: Some(default),
            var,
        });
        assert_eq!(infer_in(&g, param).ty, Ty::integer());
    }

    #[test]
    fn return_and_empty_merge() {
        let mut g = IrGraph::new();
        let ret = g.add(NodeKind::Return { value: None });
        let merge = g.add(NodeKind::Merge { branches: vec![] });
        assert!(infer_in(&g, ret).ty.is_nil());
        assert!(infer_in(&g, merge).is_unknown());
    }

    #[test]
    fn self_reference_by_level() {
        let mut g = IrGraph::new();
        let inst = g.add(NodeKind::SelfRef { owner: "User".into(), singleton: false });
        let sing = g.add(NodeKind::SelfRef { owner: "User".into(), singleton: true });
        assert_eq!(infer_in(&g, inst).ty, Ty::instance("User"));
        assert_eq!(infer_in(&g, sing).ty, Ty::singleton("User"));
    }

    #[test]
    fn callable_receiver_answers_call() {
        let mut g = IrGraph::new();
        let f = g.add(NodeKind::literal(Ty::method(Vec::new(), Ty::string())));
        let call = g.add(NodeKind::Call(CallNode::new("call", Some(f), vec![])));
        let inference = infer_in(&g, call);
        assert_eq!(inference.ty, Ty::string());
        assert_eq!(inference.reason, Reason::CallableResult);
    }

    #[test]
    fn empty_block_binds_nil() {
        let mut g = IrGraph::new();
        let recv = g.add(NodeKind::literal(Ty::array(Ty::integer())));
        let call = g.add(NodeKind::Call(
            CallNode::new("map", Some(recv), vec![]).with_block(BlockBody::default()),
        ));
        assert_eq!(infer_in(&g, call).ty.to_string(), "Array[nil]");
    }

    #[test]
    fn unbound_block_result_is_erased() {
        let mut g = IrGraph::new();
        let recv = g.add(NodeKind::literal(Ty::array(Ty::integer())));
        let mut node = CallNode::new("map", Some(recv), vec![]);
        node.has_block = true;
        let call = g.add(NodeKind::Call(node));
        assert_eq!(infer_in(&g, call).ty.to_string(), "Array[untyped]");
    }

    #[test]
    fn catch_all_for_instances() {
        let mut g = IrGraph::new();
        let recv = g.add(NodeKind::literal(Ty::instance("Widget")));
        let call = g.add(NodeKind::Call(CallNode::new("dup", Some(recv), vec![])));
        let inference = infer_in(&g, call);
        assert_eq!(inference.ty, Ty::instance("Widget"));
        assert_eq!(
            inference.reason,
            Reason::CatalogueMethod { owner: "Object".into(), method: "dup".into() }
        );
    }

    #[test]
    fn missing_method_reason() {
        let mut g = IrGraph::new();
        let recv = g.add(NodeKind::literal(Ty::instance("Widget")));
        let call = g.add(NodeKind::Call(CallNode::new("frobnicate", Some(recv), vec![])));
        assert_eq!(infer_in(&g, call).reason.to_string(), "no method Widget#frobnicate");
        let bare = g.add(NodeKind::Call(CallNode::new("frobnicate", None, vec![])));
        assert_eq!(infer_in(&g, bare).reason.to_string(), "no method `frobnicate`");
    }

    #[test]
    fn depth_limit_applies() {
        let mut g = IrGraph::new();
        let mut prev = g.add(NodeKind::literal(Ty::string()));
        for _ in 0..10 {
            prev = g.add(NodeKind::Return { value: Some(prev) });
        }
        let registries = Registries::new();
        let config = InferConfig { max_depth: 4, ..InferConfig::default() };
        let env = Env::new(&g, &registries, &NoIndex, &NoSignatures, &config);
        let mut cache = InferCache::new();
        let inference = Resolver::new(env, &mut cache).infer(prev);
        assert_eq!(inference.reason, Reason::DepthLimit);
    }

    #[test]
    fn cache_slots() {
        let mut g = IrGraph::new();
        let lit = g.add(NodeKind::literal(Ty::string()));
        let registries = Registries::new();
        let config = InferConfig::default();
        let env = Env::new(&g, &registries, &NoIndex, &NoSignatures, &config);
        let mut cache = InferCache::new();
        assert!(matches!(cache.slot(lit), Slot::NotStarted));
        Resolver::new(env, &mut cache).infer(lit);
        assert!(matches!(cache.slot(lit), Slot::Done(_)));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
