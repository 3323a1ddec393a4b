//! Capabilities the engine consumes from its surroundings.
//!
//! The resolver is handed a [`CodeIndex`] (structural questions about the
//! analyzed program), a [`SignatureProvider`] (the catalogue of built-in
//! method shapes), and optionally a [`Simplifier`]. All are queried
//! synchronously and are expected to be cheap to call repeatedly.

use std::sync::Arc;

use crate::ir::CalledMethod;
use crate::ty::{MethodSig, Ty};

/// What a constant name denotes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Type,
    Module,
}

/// Structural knowledge about the analyzed program.
pub trait CodeIndex {
    /// Supertypes and mixins of `type_name`, nearest first. May or may not
    /// include `type_name` itself; callers skip it.
    fn ancestors_of(&self, type_name: &str) -> Vec<String>;

    /// Whether `name` is a known type or module.
    fn constant_kind(&self, name: &str) -> Option<ConstantKind>;

    /// The type or module that actually provides type-level method
    /// `method` of `type_name` (e.g. a module it extends).
    fn type_method_owner(&self, type_name: &str, method: &str) -> Option<String>;

    /// Every type defining all of `methods`. Implementations may use the
    /// arity hints to pre-filter; the resolver filters again.
    fn find_types_defining_methods(&self, methods: &[CalledMethod]) -> Vec<String>;
}

/// The catalogue of known method shapes.
///
/// Returned types may contain type variables (`Elem`, `K`, `V`, `U`) and
/// `self`; the resolver substitutes them. `Ty::Unknown` or an empty list
/// means "no entry".
pub trait SignatureProvider {
    fn return_type_of(&self, type_name: &str, method: &str, args: &[Ty]) -> Ty;

    fn type_level_return_type_of(&self, type_name: &str, method: &str, args: &[Ty]) -> Ty;

    /// All overloads, used for arity filtering.
    fn signatures_of(&self, type_name: &str, method: &str) -> Vec<MethodSig>;

    /// Types of the parameters the method yields to its block.
    fn block_param_types_of(&self, type_name: &str, method: &str) -> Vec<Ty>;
}

/// A final rewrite applied to every inferred type before it is cached.
/// Must be total and idempotent.
pub trait Simplifier {
    fn simplify(&self, ty: Ty) -> Ty;
}

/// A code index that knows nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIndex;

impl CodeIndex for NoIndex {
    fn ancestors_of(&self, _type_name: &str) -> Vec<String> {
        Vec::new()
    }

    fn constant_kind(&self, _name: &str) -> Option<ConstantKind> {
        None
    }

    fn type_method_owner(&self, _type_name: &str, _method: &str) -> Option<String> {
        None
    }

    fn find_types_defining_methods(&self, _methods: &[CalledMethod]) -> Vec<String> {
        Vec::new()
    }
}

/// A catalogue with no entries.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoSignatures;

impl SignatureProvider for NoSignatures {
    fn return_type_of(&self, _type_name: &str, _method: &str, _args: &[Ty]) -> Ty {
        Ty::Unknown
    }

    fn type_level_return_type_of(&self, _type_name: &str, _method: &str, _args: &[Ty]) -> Ty {
        Ty::Unknown
    }

    fn signatures_of(&self, _type_name: &str, _method: &str) -> Vec<MethodSig> {
        Vec::new()
    }

    fn block_param_types_of(&self, _type_name: &str, _method: &str) -> Vec<Ty> {
        Vec::new()
    }
}

// ── Forwarding ─────────────────────────────────────────────────────────

impl<T: CodeIndex + ?Sized> CodeIndex for &T {
    fn ancestors_of(&self, type_name: &str) -> Vec<String> {
        (**self).ancestors_of(type_name)
    }

    fn constant_kind(&self, name: &str) -> Option<ConstantKind> {
        (**self).constant_kind(name)
    }

    fn type_method_owner(&self, type_name: &str, method: &str) -> Option<String> {
        (**self).type_method_owner(type_name, method)
    }

    fn find_types_defining_methods(&self, methods: &[CalledMethod]) -> Vec<String> {
        (**self).find_types_defining_methods(methods)
    }
}

impl<T: CodeIndex + ?Sized> CodeIndex for Arc<T> {
    fn ancestors_of(&self, type_name: &str) -> Vec<String> {
        (**self).ancestors_of(type_name)
    }

    fn constant_kind(&self, name: &str) -> Option<ConstantKind> {
        (**self).constant_kind(name)
    }

    fn type_method_owner(&self, type_name: &str, method: &str) -> Option<String> {
        (**self).type_method_owner(type_name, method)
    }

    fn find_types_defining_methods(&self, methods: &[CalledMethod]) -> Vec<String> {
        (**self).find_types_defining_methods(methods)
    }
}
