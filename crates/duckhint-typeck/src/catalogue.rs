//! In-memory signature catalogue.
//!
//! [`Catalogue`] implements [`SignatureProvider`] from registered method
//! signatures and block-parameter templates, with fallback through a
//! parent map. [`core_catalogue`] seeds the core types (Object, numbers,
//! String, Symbol, Array, Hash, Range, Proc) using the container
//! variables `Elem`, `K`, `V` and the block-result variable `U`.

use rustc_hash::FxHashMap;

use crate::ports::SignatureProvider;
use crate::ty::{names, vars, MethodSig, ParamKind, ParamSig, Ty};

/// Overloads and block templates for one method.
#[derive(Clone, Debug, Default)]
pub struct CatalogueEntry {
    pub overloads: Vec<MethodSig>,
    pub block_params: Vec<Ty>,
}

type MethodTable = FxHashMap<String, FxHashMap<String, CatalogueEntry>>;

/// A signature provider backed by hash maps.
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    instance: MethodTable,
    singleton: MethodTable,
    parents: FxHashMap<String, String>,
}

/// Upper bound on parent hops, in case the parent map has a loop.
const MAX_PARENT_DEPTH: usize = 32;

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an overload of instance method `owner#name`.
    pub fn add_method(&mut self, owner: &str, name: &str, sig: MethodSig) -> &mut Self {
        entry_mut(&mut self.instance, owner, name).overloads.push(sig);
        self
    }

    /// Add an overload of type-level method `owner.name`.
    pub fn add_type_method(&mut self, owner: &str, name: &str, sig: MethodSig) -> &mut Self {
        entry_mut(&mut self.singleton, owner, name).overloads.push(sig);
        self
    }

    /// Set the types `owner#name` yields to its block.
    pub fn set_block_params(&mut self, owner: &str, name: &str, params: Vec<Ty>) -> &mut Self {
        entry_mut(&mut self.instance, owner, name).block_params = params;
        self
    }

    /// Make lookups on `child` fall back to `parent`.
    pub fn set_parent(&mut self, child: &str, parent: &str) -> &mut Self {
        self.parents.insert(child.to_string(), parent.to_string());
        self
    }

    fn find<'a>(&'a self, table: &'a MethodTable, owner: &str, name: &str) -> Option<&'a CatalogueEntry> {
        let mut current = owner;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Some(entry) = table.get(current).and_then(|methods| methods.get(name)) {
                return Some(entry);
            }
            current = self.parents.get(current)?;
        }
        None
    }
}

fn entry_mut<'a>(table: &'a mut MethodTable, owner: &str, name: &str) -> &'a mut CatalogueEntry {
    table
        .entry(owner.to_string())
        .or_default()
        .entry(name.to_string())
        .or_default()
}

/// Pick the overload for a call with `args`: the first whose arity fits
/// and whose positional parameter types agree with the known argument
/// types, else the first whose arity fits, else the first.
fn select_overload<'a>(overloads: &'a [MethodSig], args: &[Ty]) -> Option<&'a MethodSig> {
    let fitting: Vec<&MethodSig> =
        overloads.iter().filter(|sig| sig.arity().accepts(args.len())).collect();
    fitting
        .iter()
        .copied()
        .find(|sig| args_agree(sig, args))
        .or_else(|| fitting.first().copied())
        .or_else(|| overloads.first())
}

fn args_agree(sig: &MethodSig, args: &[Ty]) -> bool {
    let positional = sig
        .params
        .iter()
        .filter(|p| matches!(p.kind, ParamKind::Required | ParamKind::Optional));
    positional.zip(args).all(|(param, arg)| type_agrees(&param.ty, arg))
}

fn type_agrees(param: &Ty, arg: &Ty) -> bool {
    match (param, arg) {
        (Ty::Unknown | Ty::Var(_) | Ty::SelfTy, _) | (_, Ty::Unknown) => true,
        _ => param == arg || (param.nominal_name().is_some() && param.nominal_name() == arg.nominal_name()),
    }
}

impl SignatureProvider for Catalogue {
    fn return_type_of(&self, type_name: &str, method: &str, args: &[Ty]) -> Ty {
        self.find(&self.instance, type_name, method)
            .and_then(|entry| select_overload(&entry.overloads, args))
            .map(|sig| (*sig.ret).clone())
            .unwrap_or(Ty::Unknown)
    }

    fn type_level_return_type_of(&self, type_name: &str, method: &str, args: &[Ty]) -> Ty {
        self.find(&self.singleton, type_name, method)
            .and_then(|entry| select_overload(&entry.overloads, args))
            .map(|sig| (*sig.ret).clone())
            .unwrap_or(Ty::Unknown)
    }

    fn signatures_of(&self, type_name: &str, method: &str) -> Vec<MethodSig> {
        self.find(&self.instance, type_name, method)
            .map(|entry| entry.overloads.clone())
            .unwrap_or_default()
    }

    fn block_param_types_of(&self, type_name: &str, method: &str) -> Vec<Ty> {
        self.find(&self.instance, type_name, method)
            .map(|entry| entry.block_params.clone())
            .unwrap_or_default()
    }
}

// ── Core Catalogue ─────────────────────────────────────────────────────

fn sig0(ret: Ty) -> MethodSig {
    MethodSig::new(Vec::new(), ret)
}

fn sig1(arg: Ty, ret: Ty) -> MethodSig {
    MethodSig::new(vec![ParamSig::required("arg", arg)], ret)
}

fn sig2(a: Ty, b: Ty, ret: Ty) -> MethodSig {
    MethodSig::new(vec![ParamSig::required("a", a), ParamSig::required("b", b)], ret)
}

fn sig_opt(arg: Ty, ret: Ty) -> MethodSig {
    MethodSig::new(vec![ParamSig::optional("arg", arg)], ret)
}

fn sig_rest(arg: Ty, ret: Ty) -> MethodSig {
    MethodSig::new(vec![ParamSig::rest("args", arg)], ret)
}

fn elem() -> Ty {
    Ty::var(vars::ELEM)
}

fn key() -> Ty {
    Ty::var(vars::KEY)
}

fn value() -> Ty {
    Ty::var(vars::VALUE)
}

fn block_result() -> Ty {
    Ty::var(vars::BLOCK_RESULT)
}

fn untyped() -> Ty {
    Ty::Unknown
}

/// A catalogue of the core types' most common methods.
pub fn core_catalogue() -> Catalogue {
    let mut c = Catalogue::new();

    // ── Hierarchy ───────────────────────────────────────────────────

    for ty in [
        names::NIL,
        names::TRUE,
        names::FALSE,
        "Numeric",
        names::STRING,
        names::SYMBOL,
        names::ARRAY,
        names::HASH,
        names::RANGE,
        names::PROC,
    ] {
        c.set_parent(ty, names::OBJECT);
    }
    c.set_parent(names::INTEGER, "Numeric");
    c.set_parent(names::FLOAT, "Numeric");

    register_object(&mut c);
    register_numbers(&mut c);
    register_strings(&mut c);
    register_array(&mut c);
    register_hash(&mut c);
    register_range(&mut c);

    c.add_method(names::PROC, "call", sig_rest(untyped(), untyped()));
    c.add_method(names::PROC, "arity", sig0(Ty::integer()));
    c.add_method(names::NIL, "to_a", sig0(Ty::array(untyped())));
    c.add_method(names::NIL, "to_s", sig0(Ty::string()));

    c
}

fn register_object(c: &mut Catalogue) {
    let o = names::OBJECT;
    c.add_method(o, "to_s", sig0(Ty::string()));
    c.add_method(o, "inspect", sig0(Ty::string()));
    c.add_method(o, "nil?", sig0(Ty::bool()));
    c.add_method(o, "frozen?", sig0(Ty::bool()));
    c.add_method(o, "is_a?", sig1(untyped(), Ty::bool()));
    c.add_method(o, "respond_to?", sig1(Ty::symbol(), Ty::bool()));
    c.add_method(o, "==", sig1(untyped(), Ty::bool()));
    c.add_method(o, "!=", sig1(untyped(), Ty::bool()));
    c.add_method(o, "!", sig0(Ty::bool()));
    c.add_method(o, "hash", sig0(Ty::integer()));
    c.add_method(o, "object_id", sig0(Ty::integer()));
    c.add_method(o, "dup", sig0(Ty::SelfTy));
    c.add_method(o, "clone", sig0(Ty::SelfTy));
    c.add_method(o, "freeze", sig0(Ty::SelfTy));
    c.add_method(o, "tap", sig0(Ty::SelfTy));
    c.set_block_params(o, "tap", vec![Ty::SelfTy]);
    c.add_method(o, "then", sig0(block_result()));
    c.set_block_params(o, "then", vec![Ty::SelfTy]);

    // Kernel functions are reachable from anywhere through Object.
    c.add_method(o, "puts", sig_rest(untyped(), Ty::nil()));
    c.add_method(o, "print", sig_rest(untyped(), Ty::nil()));
    c.add_method(o, "p", sig_rest(untyped(), untyped()));
    c.add_method(o, "require", sig1(Ty::string(), Ty::bool()));
    c.add_method(o, "require_relative", sig1(Ty::string(), Ty::bool()));
    c.add_method(
        o,
        "format",
        MethodSig::new(
            vec![ParamSig::required("fmt", Ty::string()), ParamSig::rest("args", untyped())],
            Ty::string(),
        ),
    );
    c.add_method(o, "rand", sig0(Ty::float()));
    c.add_method(o, "rand", sig1(Ty::integer(), Ty::integer()));
    c.add_method(o, "gets", sig0(Ty::optional(Ty::string())));
    c.add_method(o, "sleep", sig_opt(untyped(), Ty::integer()));
    c.add_method(o, "lambda", sig0(Ty::instance(names::PROC)));
    c.add_method(o, "proc", sig0(Ty::instance(names::PROC)));
    c.add_method(o, "Integer", sig1(untyped(), Ty::integer()));
    c.add_method(o, "Float", sig1(untyped(), Ty::float()));
    c.add_method(o, "String", sig1(untyped(), Ty::string()));
    c.add_method(o, "Array", sig1(untyped(), Ty::array(untyped())));
}

fn register_numbers(c: &mut Catalogue) {
    let i = names::INTEGER;
    for op in ["+", "-", "*", "/", "%", "**"] {
        c.add_method(i, op, sig1(Ty::integer(), Ty::integer()));
        c.add_method(i, op, sig1(Ty::float(), Ty::float()));
    }
    for op in ["<", ">", "<=", ">="] {
        c.add_method("Numeric", op, sig1(untyped(), Ty::bool()));
    }
    c.add_method(i, "to_s", sig_opt(Ty::integer(), Ty::string()));
    c.add_method(i, "to_i", sig0(Ty::integer()));
    c.add_method(i, "to_f", sig0(Ty::float()));
    c.add_method(i, "succ", sig0(Ty::integer()));
    c.add_method(i, "abs", sig0(Ty::integer()));
    c.add_method(i, "zero?", sig0(Ty::bool()));
    c.add_method(i, "even?", sig0(Ty::bool()));
    c.add_method(i, "odd?", sig0(Ty::bool()));
    c.add_method(i, "times", sig0(Ty::integer()));
    c.set_block_params(i, "times", vec![Ty::integer()]);
    c.add_method(i, "upto", sig1(Ty::integer(), Ty::integer()));
    c.set_block_params(i, "upto", vec![Ty::integer()]);

    let f = names::FLOAT;
    for op in ["+", "-", "*", "/"] {
        c.add_method(f, op, sig1(untyped(), Ty::float()));
    }
    c.add_method(f, "round", sig0(Ty::integer()));
    c.add_method(f, "round", sig1(Ty::integer(), Ty::float()));
    c.add_method(f, "floor", sig0(Ty::integer()));
    c.add_method(f, "ceil", sig0(Ty::integer()));
    c.add_method(f, "to_i", sig0(Ty::integer()));
    c.add_method(f, "to_f", sig0(Ty::float()));
}

fn register_strings(c: &mut Catalogue) {
    let s = names::STRING;
    c.add_method(s, "+", sig1(Ty::string(), Ty::string()));
    c.add_method(s, "*", sig1(Ty::integer(), Ty::string()));
    c.add_method(s, "<<", sig1(untyped(), Ty::string()));
    for m in ["upcase", "downcase", "capitalize", "strip", "chomp", "reverse", "squeeze"] {
        c.add_method(s, m, sig0(Ty::string()));
    }
    c.add_method(s, "length", sig0(Ty::integer()));
    c.add_method(s, "size", sig0(Ty::integer()));
    c.add_method(s, "to_i", sig0(Ty::integer()));
    c.add_method(s, "to_f", sig0(Ty::float()));
    c.add_method(s, "to_s", sig0(Ty::string()));
    c.add_method(s, "to_sym", sig0(Ty::symbol()));
    c.add_method(s, "empty?", sig0(Ty::bool()));
    c.add_method(s, "include?", sig1(Ty::string(), Ty::bool()));
    c.add_method(s, "start_with?", sig_rest(Ty::string(), Ty::bool()));
    c.add_method(s, "end_with?", sig_rest(Ty::string(), Ty::bool()));
    c.add_method(s, "split", sig_opt(untyped(), Ty::array(Ty::string())));
    c.add_method(s, "chars", sig0(Ty::array(Ty::string())));
    c.add_method(s, "lines", sig0(Ty::array(Ty::string())));
    c.add_method(s, "[]", sig1(untyped(), Ty::optional(Ty::string())));
    c.add_method(s, "gsub", sig2(untyped(), Ty::string(), Ty::string()));
    c.add_method(s, "sub", sig2(untyped(), Ty::string(), Ty::string()));
    c.add_method(s, "each_char", sig0(Ty::SelfTy));
    c.set_block_params(s, "each_char", vec![Ty::string()]);

    let y = names::SYMBOL;
    c.add_method(y, "to_s", sig0(Ty::string()));
    c.add_method(y, "to_sym", sig0(Ty::symbol()));
    c.add_method(y, "to_proc", sig0(Ty::instance(names::PROC)));
    c.add_method(y, "length", sig0(Ty::integer()));
}

fn register_array(c: &mut Catalogue) {
    let a = names::ARRAY;
    let elems = || Ty::array(elem());

    c.add_type_method(a, "new", sig0(Ty::array(untyped())));
    c.add_type_method(a, "new", sig2(Ty::integer(), untyped(), Ty::array(untyped())));

    c.add_method(a, "each", sig0(Ty::SelfTy));
    c.set_block_params(a, "each", vec![elem()]);
    c.add_method(a, "each_with_index", sig0(Ty::SelfTy));
    c.set_block_params(a, "each_with_index", vec![elem(), Ty::integer()]);
    for m in ["map", "collect", "flat_map"] {
        c.add_method(a, m, sig0(Ty::array(block_result())));
        c.set_block_params(a, m, vec![elem()]);
    }
    for m in ["select", "filter", "reject", "sort_by"] {
        c.add_method(a, m, sig0(elems()));
        c.set_block_params(a, m, vec![elem()]);
    }
    for m in ["find", "detect"] {
        c.add_method(a, m, sig0(Ty::optional(elem())));
        c.set_block_params(a, m, vec![elem()]);
    }
    for m in ["any?", "all?", "none?"] {
        c.add_method(a, m, sig0(Ty::bool()));
        c.set_block_params(a, m, vec![elem()]);
    }
    c.add_method(a, "group_by", sig0(Ty::hash(block_result(), elems())));
    c.set_block_params(a, "group_by", vec![elem()]);
    c.add_method(a, "partition", sig0(Ty::tuple(vec![elems(), elems()])));
    c.set_block_params(a, "partition", vec![elem()]);
    c.add_method(a, "each_slice", sig1(Ty::integer(), Ty::nil()));
    c.set_block_params(a, "each_slice", vec![elems()]);

    for m in ["first", "last", "pop", "shift", "min", "max", "sample"] {
        c.add_method(a, m, sig0(Ty::optional(elem())));
    }
    c.add_method(a, "first", sig1(Ty::integer(), elems()));
    c.add_method(a, "last", sig1(Ty::integer(), elems()));
    c.add_method(a, "[]", sig1(Ty::integer(), Ty::optional(elem())));
    c.add_method(a, "[]", sig2(Ty::integer(), Ty::integer(), Ty::optional(elems())));
    c.add_method(a, "fetch", sig1(Ty::integer(), elem()));
    c.add_method(a, "<<", sig1(elem(), Ty::SelfTy));
    c.add_method(a, "push", sig_rest(elem(), Ty::SelfTy));
    for m in ["size", "length", "count"] {
        c.add_method(a, m, sig0(Ty::integer()));
    }
    c.add_method(a, "empty?", sig0(Ty::bool()));
    c.add_method(a, "include?", sig1(elem(), Ty::bool()));
    c.add_method(a, "join", sig_opt(Ty::string(), Ty::string()));
    for m in ["sort", "reverse", "uniq", "compact", "to_a", "shuffle"] {
        c.add_method(a, m, sig0(elems()));
    }
    c.add_method(a, "flatten", sig0(Ty::array(untyped())));
    c.add_method(a, "sum", sig0(elem()));
    c.add_method(a, "zip", sig_rest(untyped(), Ty::array(Ty::array(untyped()))));
    c.add_method(a, "to_h", sig0(Ty::hash(untyped(), untyped())));
}

fn register_hash(c: &mut Catalogue) {
    let h = names::HASH;
    let same = || Ty::hash(key(), value());
    let pair = || Ty::tuple(vec![key(), value()]);

    c.add_type_method(h, "new", sig_opt(untyped(), Ty::hash(untyped(), untyped())));

    c.add_method(h, "[]", sig1(key(), Ty::optional(value())));
    c.add_method(h, "[]=", sig2(key(), value(), value()));
    c.add_method(h, "fetch", sig1(key(), value()));
    c.add_method(h, "fetch", sig2(key(), value(), value()));
    c.add_method(h, "delete", sig1(key(), Ty::optional(value())));
    c.add_method(h, "dig", sig_rest(untyped(), untyped()));
    c.add_method(h, "keys", sig0(Ty::array(key())));
    c.add_method(h, "values", sig0(Ty::array(value())));
    for m in ["key?", "has_key?", "include?", "member?"] {
        c.add_method(h, m, sig1(key(), Ty::bool()));
    }
    for m in ["size", "length", "count"] {
        c.add_method(h, m, sig0(Ty::integer()));
    }
    c.add_method(h, "empty?", sig0(Ty::bool()));
    c.add_method(h, "merge", sig_rest(same(), same()));
    c.add_method(h, "to_h", sig0(same()));
    c.add_method(h, "to_a", sig0(Ty::array(pair())));

    for m in ["each", "each_pair"] {
        c.add_method(h, m, sig0(Ty::SelfTy));
        c.set_block_params(h, m, vec![key(), value()]);
    }
    c.add_method(h, "map", sig0(Ty::array(block_result())));
    c.set_block_params(h, "map", vec![key(), value()]);
    for m in ["select", "filter", "reject"] {
        c.add_method(h, m, sig0(same()));
        c.set_block_params(h, m, vec![key(), value()]);
    }
    c.add_method(h, "any?", sig0(Ty::bool()));
    c.set_block_params(h, "any?", vec![key(), value()]);
    c.add_method(h, "sort_by", sig0(Ty::array(pair())));
    c.set_block_params(h, "sort_by", vec![key(), value()]);
    c.add_method(h, "transform_values", sig0(Ty::hash(key(), block_result())));
    c.set_block_params(h, "transform_values", vec![value()]);
    c.add_method(h, "transform_keys", sig0(Ty::hash(block_result(), value())));
    c.set_block_params(h, "transform_keys", vec![key()]);
}

fn register_range(c: &mut Catalogue) {
    let r = names::RANGE;
    c.add_method(r, "each", sig0(Ty::SelfTy));
    c.set_block_params(r, "each", vec![elem()]);
    c.add_method(r, "step", sig1(untyped(), Ty::SelfTy));
    c.set_block_params(r, "step", vec![elem()]);
    c.add_method(r, "map", sig0(Ty::array(block_result())));
    c.set_block_params(r, "map", vec![elem()]);
    c.add_method(r, "select", sig0(Ty::array(elem())));
    c.set_block_params(r, "select", vec![elem()]);
    c.add_method(r, "to_a", sig0(Ty::array(elem())));
    c.add_method(r, "first", sig0(elem()));
    c.add_method(r, "last", sig0(elem()));
    c.add_method(r, "min", sig0(Ty::optional(elem())));
    c.add_method(r, "max", sig0(Ty::optional(elem())));
    c.add_method(r, "sum", sig0(elem()));
    c.add_method(r, "size", sig0(Ty::integer()));
    c.add_method(r, "include?", sig1(untyped(), Ty::bool()));
}
