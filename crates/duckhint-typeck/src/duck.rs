//! Duck typing: guessing a nominal type from the methods called on a
//! value.
//!
//! The code index proposes every type defining all of the called methods.
//! Candidates are then filtered by positional arity wherever a call site
//! fixed its argument count, and a candidate is dropped when one of its
//! ancestors is also a candidate. What is left decides the answer: none
//! gives `Unknown`, one gives that type, a few give a union, and more than
//! `duck_max_candidates` are too ambiguous to report.

use rustc_hash::FxHashSet;

use crate::error::{Inference, Provenance, Reason};
use crate::ir::{CalledMethod, NodeKind};
use crate::resolve::Env;
use crate::ty::{Arity, Ty};

/// Guess the type that responds to every method in `methods`.
pub fn guess(env: &Env<'_>, methods: &[CalledMethod]) -> Inference {
    let names = method_names(methods);
    if methods.is_empty() {
        return Inference::unknown(Reason::NoDuckCandidate { methods: names });
    }

    let mut seen = FxHashSet::default();
    let candidates: Vec<String> = env
        .index
        .find_types_defining_methods(methods)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .filter(|t| methods.iter().all(|call| accepts(env, t, call)))
        .collect();
    let candidates = drop_descendants(env, candidates);

    match candidates.len() {
        0 => {
            tracing::debug!(methods = ?names, "no duck-typing candidate");
            Inference::unknown(Reason::NoDuckCandidate { methods: names })
        }
        n if n > env.config.duck_max_candidates => {
            tracing::debug!(methods = ?names, candidates = n, "duck typing too ambiguous");
            Inference::unknown(Reason::AmbiguousDuckType { methods: names, candidates: n })
        }
        n => {
            tracing::debug!(methods = ?names, candidates = ?candidates, "duck typed");
            Inference::new(
                Ty::union(candidates.into_iter().map(Ty::instance)),
                Reason::DuckTyped { methods: names, candidates: n },
                Provenance::Heuristic,
            )
        }
    }
}

fn method_names(methods: &[CalledMethod]) -> Vec<String> {
    methods.iter().map(|m| m.name.clone()).collect()
}

/// Whether `type_name`'s `call.name` accepts the call's argument count.
/// With nothing known about the method's parameters the candidate stays.
fn accepts(env: &Env<'_>, type_name: &str, call: &CalledMethod) -> bool {
    let Some(count) = call.arity else {
        return true;
    };
    if let Some(arity) = project_arity(env, type_name, &call.name) {
        return arity.accepts(count);
    }
    let overloads = env.signatures.signatures_of(type_name, &call.name);
    overloads.is_empty() || overloads.iter().any(|sig| sig.arity().accepts(count))
}

/// Arity of the project definition of `type_name#method`, read from its
/// parameter nodes.
fn project_arity(env: &Env<'_>, type_name: &str, method: &str) -> Option<Arity> {
    let def_id = env
        .registries
        .methods
        .lookup(type_name, method, false, Some(env.index))?;
    let NodeKind::Def(def) = env.graph.kind(def_id)? else {
        return None;
    };
    let kinds = def.params.iter().filter_map(|p| match env.graph.kind(*p) {
        Some(NodeKind::Param { kind, .. }) => Some(*kind),
        _ => None,
    });
    Some(Arity::from_kinds(kinds))
}

/// Keep only candidates none of whose ancestors is another candidate.
fn drop_descendants(env: &Env<'_>, candidates: Vec<String>) -> Vec<String> {
    if candidates.len() < 2 {
        return candidates;
    }
    let set: FxHashSet<&str> = candidates.iter().map(String::as_str).collect();
    let keep: Vec<bool> = candidates
        .iter()
        .map(|c| {
            !env.index
                .ancestors_of(c)
                .iter()
                .any(|a| a != c && set.contains(a.as_str()))
        })
        .collect();
    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect()
}
