//! duckhint type inference: heuristic types for a dynamically-typed
//! language.
//!
//! The engine guesses a static type for any program element without
//! annotations, for editor features such as hover and signature display.
//! It never rejects a program; whatever cannot be resolved comes back as
//! `untyped` with a reason. Supported heuristics:
//!
//! - Data flow through locals, fields, parameters, and returns
//! - Generic container signatures with `Elem`/`K`/`V`/`U` substitution
//! - Overload selection by arity and argument types
//! - Duck typing from the methods called on a value
//! - Hash shapes for symbol-keyed literals
//!
//! # Architecture
//!
//! - [`ty`]: Type representation, unions, substitution, and rendering
//! - [`ir`]: The IR node graph with explicit node and variable ids
//! - [`registry`]: Project method and field tables with ancestor fallback
//! - [`ports`]: Code index, signature provider, and simplifier traits
//! - [`resolve`]: The memoized, cycle-safe resolver
//! - [`duck`]: Duck typing over the code index
//! - [`error`]: Inference results with reasons and provenance
//! - [`catalogue`]: In-memory signature provider and the core catalogue
//! - [`index`]: In-memory code index
//! - [`simplify`]: Type simplifiers
//! - [`session`]: The locked indexing session
//! - [`dump`]: Graph dumps for debugging

pub mod catalogue;
pub mod duck;
pub mod dump;
pub mod error;
pub mod index;
pub mod ir;
pub mod ports;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod simplify;
pub mod ty;

pub use error::{Inference, Provenance, Reason};
pub use resolve::{Env, InferCache, Resolver};
pub use session::{FileBuilder, Session};
pub use ty::Ty;
