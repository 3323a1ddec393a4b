//! Type representation for guessed types.
//!
//! Defines the immutable `Ty` value, the `Members` set behind unions,
//! method and parameter signatures, and `Subst`, the binding map used to
//! instantiate type variables and `self`. Types have no identity beyond
//! structural equality; unions compare as sets.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Maximum number of members a union keeps.
pub const UNION_CAP: usize = 10;
/// Longest tuple kept positionally before widening to an array.
pub const TUPLE_CAP: usize = 8;
/// Most literal-key fields a hash shape keeps before widening to a hash.
pub const SHAPE_CAP: usize = 15;

/// Well-known nominal type names.
pub mod names {
    pub const NIL: &str = "NilClass";
    pub const TRUE: &str = "TrueClass";
    pub const FALSE: &str = "FalseClass";
    pub const STRING: &str = "String";
    pub const SYMBOL: &str = "Symbol";
    pub const INTEGER: &str = "Integer";
    pub const FLOAT: &str = "Float";
    pub const ARRAY: &str = "Array";
    pub const HASH: &str = "Hash";
    pub const RANGE: &str = "Range";
    pub const PROC: &str = "Proc";
    pub const OBJECT: &str = "Object";
}

/// Type variable names used by generic container signatures.
pub mod vars {
    /// Element of a sequence or range.
    pub const ELEM: &str = "Elem";
    /// Key of a mapping.
    pub const KEY: &str = "K";
    /// Value of a mapping.
    pub const VALUE: &str = "V";
    /// Result of the block attached to a call.
    pub const BLOCK_RESULT: &str = "U";
}

// ── Parameters & Signatures ────────────────────────────────────────────

/// How a parameter receives its argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Required,
    Optional,
    Rest,
    Keyword,
    KeywordRest,
    Block,
    Forwarding,
}

/// One parameter of a method signature. Not a type on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSig {
    pub name: String,
    pub kind: ParamKind,
    pub ty: Ty,
}

impl ParamSig {
    pub fn new(name: impl Into<String>, kind: ParamKind, ty: Ty) -> Self {
        ParamSig { name: name.into(), kind, ty }
    }

    pub fn required(name: impl Into<String>, ty: Ty) -> Self {
        Self::new(name, ParamKind::Required, ty)
    }

    pub fn optional(name: impl Into<String>, ty: Ty) -> Self {
        Self::new(name, ParamKind::Optional, ty)
    }

    pub fn rest(name: impl Into<String>, ty: Ty) -> Self {
        Self::new(name, ParamKind::Rest, ty)
    }
}

/// A callable shape: ordered parameters and a return type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSig {
    pub params: Vec<ParamSig>,
    pub ret: Box<Ty>,
}

impl MethodSig {
    pub fn new(params: Vec<ParamSig>, ret: Ty) -> Self {
        MethodSig { params, ret: Box::new(ret) }
    }

    /// Positional arity accepted by this signature.
    pub fn arity(&self) -> Arity {
        Arity::from_kinds(self.params.iter().map(|p| p.kind))
    }
}

/// Positional-argument counts a method accepts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Arity {
    pub required: usize,
    pub optional: usize,
    /// Accepts an unbounded tail (rest or forwarding parameter).
    pub rest: bool,
}

impl Arity {
    pub fn from_kinds(kinds: impl IntoIterator<Item = ParamKind>) -> Self {
        let mut arity = Arity::default();
        for kind in kinds {
            match kind {
                ParamKind::Required => arity.required += 1,
                ParamKind::Optional => arity.optional += 1,
                ParamKind::Rest | ParamKind::Forwarding => arity.rest = true,
                ParamKind::Keyword | ParamKind::KeywordRest | ParamKind::Block => {}
            }
        }
        arity
    }

    /// Whether a call with `count` positional arguments fits.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required && (self.rest || count <= self.required + self.optional)
    }
}

// ── Types ──────────────────────────────────────────────────────────────

/// A guessed type.
///
/// Build unions, tuples, and shapes through [`Ty::union`], [`Ty::tuple`],
/// and [`Ty::shape`] so flattening, the size caps, and widening apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    /// No information.
    Unknown,
    /// Inference deferred to a later pass.
    Unguessed,
    /// An instance of a named type.
    Instance(String),
    /// The type or module object itself.
    Singleton(String),
    /// One of several alternatives.
    Union(Members),
    /// A homogeneous sequence.
    Array(Box<Ty>),
    /// A fixed positional sequence.
    Tuple(Vec<Ty>),
    /// A key to value mapping.
    Hash(Box<Ty>, Box<Ty>),
    /// A mapping with known literal-symbol keys.
    Shape(BTreeMap<String, Ty>),
    /// A bounded sequence.
    Range(Box<Ty>),
    /// A placeholder bound by substitution (`Elem`, `K`, `V`, `U`).
    Var(String),
    /// The receiver, bound at call time.
    SelfTy,
    /// All remaining arguments.
    ForwardingArgs,
    /// A callable shape.
    Method(MethodSig),
}

/// The flattened, deduplicated members of a union.
///
/// Equality ignores member order.
#[derive(Clone, Debug, Eq)]
pub struct Members(Vec<Ty>);

impl Members {
    pub fn as_slice(&self) -> &[Ty] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ty> {
        self.0.iter()
    }
}

impl PartialEq for Members {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|m| other.0.contains(m))
    }
}

impl Ty {
    pub fn instance(name: impl Into<String>) -> Ty {
        Ty::Instance(name.into())
    }

    pub fn singleton(name: impl Into<String>) -> Ty {
        Ty::Singleton(name.into())
    }

    pub fn var(name: impl Into<String>) -> Ty {
        Ty::Var(name.into())
    }

    pub fn nil() -> Ty {
        Ty::instance(names::NIL)
    }

    pub fn string() -> Ty {
        Ty::instance(names::STRING)
    }

    pub fn symbol() -> Ty {
        Ty::instance(names::SYMBOL)
    }

    pub fn integer() -> Ty {
        Ty::instance(names::INTEGER)
    }

    pub fn float() -> Ty {
        Ty::instance(names::FLOAT)
    }

    /// `true | false`.
    pub fn bool() -> Ty {
        Ty::union([Ty::instance(names::TRUE), Ty::instance(names::FALSE)])
    }

    /// `inner | nil`.
    pub fn optional(inner: Ty) -> Ty {
        Ty::union([inner, Ty::nil()])
    }

    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    pub fn hash(key: Ty, value: Ty) -> Ty {
        Ty::Hash(Box::new(key), Box::new(value))
    }

    pub fn range(elem: Ty) -> Ty {
        Ty::Range(Box::new(elem))
    }

    pub fn method(params: Vec<ParamSig>, ret: Ty) -> Ty {
        Ty::Method(MethodSig::new(params, ret))
    }

    /// Build a union: nested unions are flattened, duplicates dropped,
    /// `Unknown` dropped unless it is the only member, and the result is
    /// capped at [`UNION_CAP`] members in insertion order. Zero members
    /// give `Unknown`; one member is returned unwrapped.
    pub fn union<I: IntoIterator<Item = Ty>>(types: I) -> Ty {
        let mut members = Vec::new();
        for ty in types {
            push_flat(&mut members, ty);
        }
        if members.len() > 1 {
            members.retain(|m| !m.is_unknown());
        }
        members.truncate(UNION_CAP);
        if members.len() > 1 {
            Ty::Union(Members(members))
        } else {
            members.pop().unwrap_or(Ty::Unknown)
        }
    }

    /// Build a tuple, widening to `Array[union]` beyond [`TUPLE_CAP`].
    pub fn tuple(elems: Vec<Ty>) -> Ty {
        if elems.len() > TUPLE_CAP {
            Ty::array(Ty::union(elems))
        } else {
            Ty::Tuple(elems)
        }
    }

    /// Build a hash shape, widening to `Hash[Symbol, union]` beyond
    /// [`SHAPE_CAP`] fields. A repeated key keeps its last value.
    pub fn shape<I, S>(fields: I) -> Ty
    where
        I: IntoIterator<Item = (S, Ty)>,
        S: Into<String>,
    {
        let fields: BTreeMap<String, Ty> =
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if fields.len() > SHAPE_CAP {
            Ty::hash(Ty::symbol(), Ty::union(fields.into_values()))
        } else {
            Ty::Shape(fields)
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Ty::Instance(n) if n == names::NIL)
    }

    /// The members of a union, or the type itself as a single member.
    pub fn members(&self) -> &[Ty] {
        match self {
            Ty::Union(m) => m.as_slice(),
            other => std::slice::from_ref(other),
        }
    }

    /// The nominal type whose methods this value responds to.
    pub fn nominal_name(&self) -> Option<&str> {
        match self {
            Ty::Instance(name) | Ty::Singleton(name) => Some(name),
            Ty::Array(_) | Ty::Tuple(_) => Some(names::ARRAY),
            Ty::Hash(..) | Ty::Shape(_) => Some(names::HASH),
            Ty::Range(_) => Some(names::RANGE),
            Ty::Method(_) => Some(names::PROC),
            _ => None,
        }
    }

    /// Whether any type variable or `self` placeholder remains.
    pub fn has_placeholders(&self) -> bool {
        let mut found = false;
        let _ = self.try_map(&mut |t: &Ty| {
            if matches!(t, Ty::Var(_) | Ty::SelfTy) {
                found = true;
            }
            None
        });
        found
    }

    // ── Substitution ───────────────────────────────────────────────────

    /// Replace bound variables and `self`.
    ///
    /// Returns `Cow::Borrowed(self)` when nothing changed, so callers can
    /// detect a no-op without comparing.
    pub fn substitute<'a>(&'a self, subst: &Subst) -> Cow<'a, Ty> {
        let replaced = self.try_map(&mut |t: &Ty| match t {
            Ty::Var(name) => subst.get(name).cloned(),
            Ty::SelfTy => subst.self_ty().cloned(),
            _ => None,
        });
        match replaced {
            Some(ty) => Cow::Owned(ty),
            None => Cow::Borrowed(self),
        }
    }

    /// Replace every remaining variable and `self` with `Unknown`.
    pub fn erase_placeholders(&self) -> Cow<'_, Ty> {
        let replaced = self.try_map(&mut |t: &Ty| match t {
            Ty::Var(_) | Ty::SelfTy => Some(Ty::Unknown),
            _ => None,
        });
        match replaced {
            Some(ty) => Cow::Owned(ty),
            None => Cow::Borrowed(self),
        }
    }

    /// Rebuild the type with `f` applied top-down. `f` returning `Some`
    /// replaces that subtree; `None` descends. Returns `None` if nothing
    /// was replaced anywhere.
    fn try_map(&self, f: &mut dyn FnMut(&Ty) -> Option<Ty>) -> Option<Ty> {
        if let Some(replacement) = f(self) {
            return Some(replacement);
        }
        match self {
            Ty::Array(elem) => elem.try_map(f).map(Ty::array),
            Ty::Range(elem) => elem.try_map(f).map(Ty::range),
            Ty::Hash(key, value) => {
                let new_key = key.try_map(f);
                let new_value = value.try_map(f);
                if new_key.is_none() && new_value.is_none() {
                    return None;
                }
                Some(Ty::hash(
                    new_key.unwrap_or_else(|| (**key).clone()),
                    new_value.unwrap_or_else(|| (**value).clone()),
                ))
            }
            Ty::Tuple(elems) => map_all(elems, f).map(Ty::tuple),
            Ty::Union(members) => map_all(members.as_slice(), f).map(Ty::union),
            Ty::Shape(fields) => {
                let values: Vec<Ty> = fields.values().cloned().collect();
                let mapped = map_all(&values, f)?;
                Some(Ty::shape(fields.keys().cloned().zip(mapped)))
            }
            Ty::Method(sig) => {
                let tys: Vec<Ty> = sig.params.iter().map(|p| p.ty.clone()).collect();
                let new_params = map_all(&tys, f);
                let new_ret = sig.ret.try_map(f);
                if new_params.is_none() && new_ret.is_none() {
                    return None;
                }
                let params = match new_params {
                    Some(tys) => sig
                        .params
                        .iter()
                        .zip(tys)
                        .map(|(p, ty)| ParamSig::new(p.name.clone(), p.kind, ty))
                        .collect(),
                    None => sig.params.clone(),
                };
                Some(Ty::method(params, new_ret.unwrap_or_else(|| (*sig.ret).clone())))
            }
            Ty::Unknown
            | Ty::Unguessed
            | Ty::Instance(_)
            | Ty::Singleton(_)
            | Ty::Var(_)
            | Ty::SelfTy
            | Ty::ForwardingArgs => None,
        }
    }

    /// Bindings a generic container supplies to its method signatures:
    /// `Elem` for sequences and ranges, `K`/`V` for mappings.
    pub fn container_bindings(&self) -> Subst {
        let mut subst = Subst::new();
        match self {
            Ty::Array(elem) | Ty::Range(elem) => subst.bind(vars::ELEM, (**elem).clone()),
            Ty::Tuple(elems) => subst.bind(vars::ELEM, Ty::union(elems.iter().cloned())),
            Ty::Hash(key, value) => {
                subst.bind(vars::KEY, (**key).clone());
                subst.bind(vars::VALUE, (**value).clone());
            }
            Ty::Shape(fields) => {
                subst.bind(vars::KEY, Ty::symbol());
                subst.bind(vars::VALUE, Ty::union(fields.values().cloned()));
            }
            _ => {}
        }
        subst
    }
}

fn push_flat(members: &mut Vec<Ty>, ty: Ty) {
    match ty {
        Ty::Union(inner) => {
            for m in inner.0 {
                push_flat(members, m);
            }
        }
        other => {
            if !members.contains(&other) {
                members.push(other);
            }
        }
    }
}

/// Map every type in `tys`; `None` if none of them changed.
fn map_all(tys: &[Ty], f: &mut dyn FnMut(&Ty) -> Option<Ty>) -> Option<Vec<Ty>> {
    let mut out: Option<Vec<Ty>> = None;
    for (i, ty) in tys.iter().enumerate() {
        match (ty.try_map(f), out.as_mut()) {
            (Some(new), Some(done)) => done.push(new),
            (Some(new), None) => {
                let mut done = tys[..i].to_vec();
                done.push(new);
                out = Some(done);
            }
            (None, Some(done)) => done.push(ty.clone()),
            (None, None) => {}
        }
    }
    out
}

// ── Substitution Map ───────────────────────────────────────────────────

/// Bindings for type variables and for `self`.
#[derive(Clone, Debug, Default)]
pub struct Subst {
    vars: FxHashMap<String, Ty>,
    self_ty: Option<Ty>,
}

impl Subst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings for a call on `receiver`: its container variables plus
    /// `self`.
    pub fn for_receiver(receiver: &Ty) -> Self {
        let mut subst = receiver.container_bindings();
        subst.self_ty = Some(receiver.clone());
        subst
    }

    pub fn bind(&mut self, var: impl Into<String>, ty: Ty) {
        self.vars.insert(var.into(), ty);
    }

    pub fn with(mut self, var: impl Into<String>, ty: Ty) -> Self {
        self.bind(var, ty);
        self
    }

    pub fn set_self(&mut self, ty: Ty) {
        self.self_ty = Some(ty);
    }

    pub fn get(&self, var: &str) -> Option<&Ty> {
        self.vars.get(var)
    }

    pub fn self_ty(&self) -> Option<&Ty> {
        self.self_ty.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.self_ty.is_none()
    }
}

// ── Display ────────────────────────────────────────────────────────────

impl fmt::Display for ParamSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::Required => write!(f, "{} {}", self.ty, self.name),
            ParamKind::Optional => write!(f, "?{} {}", self.ty, self.name),
            ParamKind::Rest => write!(f, "*{} {}", self.ty, self.name),
            ParamKind::Keyword => write!(f, "{}: {}", self.name, self.ty),
            ParamKind::KeywordRest => write!(f, "**{} {}", self.ty, self.name),
            ParamKind::Block => write!(f, "&{} {}", self.ty, self.name),
            ParamKind::Forwarding => write!(f, "..."),
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => write!(f, "untyped"),
            Ty::Unguessed => write!(f, "unguessed"),
            Ty::Instance(name) => match name.as_str() {
                names::NIL => write!(f, "nil"),
                names::TRUE => write!(f, "true"),
                names::FALSE => write!(f, "false"),
                _ => write!(f, "{}", name),
            },
            Ty::Singleton(name) => write!(f, "singleton({})", name),
            Ty::Union(members) => fmt_union(members.as_slice(), f),
            Ty::Array(elem) => write!(f, "Array[{}]", elem),
            Ty::Tuple(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Ty::Hash(key, value) => write!(f, "Hash[{}, {}]", key, value),
            Ty::Shape(fields) => {
                if fields.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, " }}")
            }
            Ty::Range(elem) => write!(f, "Range[{}]", elem),
            Ty::Var(name) => write!(f, "{}", name),
            Ty::SelfTy => write!(f, "self"),
            Ty::ForwardingArgs => write!(f, "..."),
            Ty::Method(sig) => write!(f, "{}", sig),
        }
    }
}

fn fmt_union(members: &[Ty], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let [a, b] = members {
        let is_true = |t: &Ty| matches!(t, Ty::Instance(n) if n == names::TRUE);
        let is_false = |t: &Ty| matches!(t, Ty::Instance(n) if n == names::FALSE);
        if (is_true(a) && is_false(b)) || (is_false(a) && is_true(b)) {
            return write!(f, "bool");
        }
        let inner = if b.is_nil() {
            Some(a)
        } else if a.is_nil() {
            Some(b)
        } else {
            None
        };
        if let Some(inner) = inner {
            return match inner {
                Ty::Method(_) => write!(f, "({})?", inner),
                _ => write!(f, "{}?", inner),
            };
        }
    }
    for (i, m) in members.iter().enumerate() {
        if i > 0 {
            write!(f, " | ")?;
        }
        write!(f, "{}", m)?;
    }
    Ok(())
}
