//! Type simplifiers applied to results before they are cached.

use crate::ports::{CodeIndex, Simplifier};
use crate::ty::{MethodSig, ParamSig, Ty};

/// Leaves every type as it is.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSimplifier;

impl Simplifier for NoopSimplifier {
    fn simplify(&self, ty: Ty) -> Ty {
        ty
    }
}

/// Collapses unions whose members are related by inheritance: a member is
/// dropped when one of its ancestors is also a member. Applies inside
/// containers and signatures too.
#[derive(Clone, Debug)]
pub struct AncestorSimplifier<I> {
    index: I,
}

impl<I: CodeIndex> AncestorSimplifier<I> {
    pub fn new(index: I) -> Self {
        AncestorSimplifier { index }
    }

    fn prune(&self, members: Vec<Ty>) -> Vec<Ty> {
        let ancestors: Vec<Vec<String>> = members
            .iter()
            .map(|m| match m {
                Ty::Instance(name) => self.index.ancestors_of(name),
                _ => Vec::new(),
            })
            .collect();
        let named = |i: usize| match &members[i] {
            Ty::Instance(name) => Some(name.as_str()),
            _ => None,
        };
        let subsumed = |i: usize| {
            let Some(me) = named(i) else { return false };
            (0..members.len()).any(|j| {
                j != i
                    && named(j).is_some_and(|other| {
                        other != me
                            && ancestors[i].iter().any(|a| a == other)
                            && !ancestors[j].iter().any(|a| a == me)
                    })
            })
        };
        let keep: Vec<bool> = (0..members.len()).map(|i| !subsumed(i)).collect();
        members
            .into_iter()
            .zip(keep)
            .filter_map(|(m, keep)| keep.then_some(m))
            .collect()
    }

    fn walk(&self, ty: Ty) -> Ty {
        match ty {
            Ty::Union(members) => {
                let inner: Vec<Ty> = members.iter().cloned().map(|m| self.walk(m)).collect();
                Ty::union(self.prune(inner))
            }
            Ty::Array(elem) => Ty::array(self.walk(*elem)),
            Ty::Range(elem) => Ty::range(self.walk(*elem)),
            Ty::Tuple(elems) => Ty::tuple(elems.into_iter().map(|e| self.walk(e)).collect()),
            Ty::Hash(key, value) => Ty::hash(self.walk(*key), self.walk(*value)),
            Ty::Shape(fields) => Ty::shape(fields.into_iter().map(|(k, v)| (k, self.walk(v)))),
            Ty::Method(sig) => {
                let params = sig
                    .params
                    .into_iter()
                    .map(|p| ParamSig::new(p.name, p.kind, self.walk(p.ty)))
                    .collect();
                Ty::Method(MethodSig::new(params, self.walk(*sig.ret)))
            }
            other => other,
        }
    }
}

impl<I: CodeIndex> Simplifier for AncestorSimplifier<I> {
    fn simplify(&self, ty: Ty) -> Ty {
        self.walk(ty)
    }
}
