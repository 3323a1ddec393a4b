//! Integration tests for the resolver's per-kind rules.
//!
//! These tests exercise:
//! - Literals, composite literals, and data flow through locals
//! - Constructors, project methods, inherited and extended methods
//! - Catalogue calls with Elem/K/V/U substitution and overloads
//! - Block parameters, including auto-splat
//! - Duck typing for parameters and untyped receivers
//! - Deferred field lookups and branch joins

use duckhint_common::InferConfig;
use duckhint_typeck::catalogue::{core_catalogue, Catalogue};
use duckhint_typeck::index::MemoryIndex;
use duckhint_typeck::ir::{
    BlockBody, CallNode, CalledMethod, DefNode, FieldScope, HashKey, IrGraph, LiteralValue,
    NodeId, NodeKind, VarId,
};
use duckhint_typeck::registry::Registries;
use duckhint_typeck::simplify::AncestorSimplifier;
use duckhint_typeck::ty::{ParamKind, Ty};
use duckhint_typeck::{Env, InferCache, Inference, Provenance, Reason, Resolver};

// ── Helpers ────────────────────────────────────────────────────────────

struct Fixture {
    graph: IrGraph,
    registries: Registries,
    index: MemoryIndex,
    catalogue: Catalogue,
    config: InferConfig,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            graph: IrGraph::new(),
            registries: Registries::new(),
            index: MemoryIndex::with_core_types(),
            catalogue: core_catalogue(),
            config: InferConfig::default(),
        }
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        self.graph.add(kind)
    }

    fn lit(&mut self, ty: Ty) -> NodeId {
        self.add(NodeKind::literal(ty))
    }

    fn sym(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::symbol(name))
    }

    fn constant(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Constant { name: name.into(), target: None })
    }

    fn call(&mut self, method: &str, receiver: Option<NodeId>, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Call(CallNode::new(method, receiver, args)))
    }

    fn param(&mut self, name: &str, calls: &[CalledMethod]) -> (NodeId, VarId) {
        let var = self.graph.new_var(name, None);
        for call in calls {
            self.graph.record_call(var, call.clone());
        }
        let id = self.add(NodeKind::Param {
            name: name.into(),
            kind: ParamKind::Required,
            default: None,
            var,
        });
        (id, var)
    }

    /// Add and register a method whose body is just `ret`.
    fn def(&mut self, owner: &str, name: &str, params: Vec<NodeId>, ret: Option<NodeId>) -> NodeId {
        let def = DefNode {
            name: name.into(),
            owner: owner.into(),
            params,
            ret,
            body: ret.into_iter().collect(),
            singleton: false,
        };
        let id = self.add(NodeKind::Def(def.clone()));
        self.registries.methods.register_def(&def, id, None);
        id
    }

    fn infer(&self, id: NodeId) -> Inference {
        let env = Env::new(&self.graph, &self.registries, &self.index, &self.catalogue, &self.config);
        let mut cache = InferCache::new();
        Resolver::new(env, &mut cache).infer(id)
    }

    fn ty(&self, id: NodeId) -> String {
        self.infer(id).ty.to_string()
    }
}

// ── Literals & Locals ──────────────────────────────────────────────────

#[test]
fn string_literal_is_string() {
    let mut f = Fixture::new();
    let lit = f.lit(Ty::string());
    let inference = f.infer(lit);
    assert_eq!(inference.ty, Ty::instance("String"));
    assert_eq!(inference.reason.to_string(), "literal");
}

#[test]
fn read_of_constructed_local() {
    let mut f = Fixture::new();
    f.index.define_class("Thing", None);
    let var = f.graph.new_var("x", None);
    let class = f.constant("Thing");
    let new = f.call("new", Some(class), vec![]);
    let write = f.add(NodeKind::LocalWrite { name: "x".into(), var, value: Some(new) });
    let read = f.add(NodeKind::LocalRead { name: "x".into(), var, write: Some(write) });
    let inference = f.infer(read);
    assert_eq!(inference.ty, Ty::instance("Thing"));
    assert_eq!(inference.reason.to_string(), "constructed by Thing.new");
}

#[test]
fn constructor_works_without_index_entry() {
    let mut f = Fixture::new();
    let class = f.constant("Unindexed");
    let new = f.call("new", Some(class), vec![]);
    insta::assert_snapshot!(f.ty(new), @"Unindexed");
    assert!(f.infer(class).is_unknown());
}

#[test]
fn constant_alias_is_followed() {
    let mut f = Fixture::new();
    f.index.define_class("User", None);
    let user = f.constant("User");
    let alias = f.add(NodeKind::Constant { name: "Person".into(), target: Some(user) });
    let new = f.call("new", Some(alias), vec![]);
    insta::assert_snapshot!(f.ty(new), @"User");
    insta::assert_snapshot!(f.ty(alias), @"singleton(User)");
}

#[test]
fn unassigned_read() {
    let mut f = Fixture::new();
    let var = f.graph.new_var("y", None);
    let read = f.add(NodeKind::LocalRead { name: "y".into(), var, write: None });
    assert_eq!(f.infer(read).reason.to_string(), "`y` is never assigned");
}

#[test]
fn write_read_write_cycle_is_circular() {
    let mut f = Fixture::new();
    let var = f.graph.new_var("x", None);
    let read_id = f.graph.next_id();
    let write_id = NodeId(read_id.0 + 1);
    f.add(NodeKind::LocalRead { name: "x".into(), var, write: Some(write_id) });
    f.add(NodeKind::LocalWrite { name: "x".into(), var, value: Some(read_id) });
    let inference = f.infer(write_id);
    assert!(inference.is_unknown());
    assert_eq!(inference.reason, Reason::CircularReference);
    assert_eq!(inference.reason.to_string(), "circular reference");
}

#[test]
fn branch_join_is_union() {
    let mut f = Fixture::new();
    let s = f.lit(Ty::string());
    let i = f.lit(Ty::integer());
    let merge = f.add(NodeKind::Merge { branches: vec![s, i] });
    let inference = f.infer(merge);
    assert_eq!(inference.ty, Ty::union([Ty::string(), Ty::integer()]));
    assert_eq!(inference.ty.members().len(), 2);
    assert_eq!(inference.reason.to_string(), "join of 2 branches");

    let single = f.add(NodeKind::Merge { branches: vec![s] });
    assert_eq!(f.infer(single).ty, Ty::string());
}

#[test]
fn nil_branch_renders_optional() {
    let mut f = Fixture::new();
    let nil = f.lit(Ty::nil());
    let s = f.lit(Ty::string());
    let merge = f.add(NodeKind::Merge { branches: vec![nil, s] });
    insta::assert_snapshot!(f.ty(merge), @"String?");
}

// ── Composite Literals ─────────────────────────────────────────────────

fn shape_literal(f: &mut Fixture) -> NodeId {
    let name = f.lit(Ty::string());
    let age = f.lit(Ty::integer());
    f.add(NodeKind::Literal {
        ty: Ty::hash(Ty::Unknown, Ty::Unknown),
        value: LiteralValue::Hash(vec![
            (HashKey::Symbol("name".into()), name),
            (HashKey::Symbol("age".into()), age),
        ]),
    })
}

#[test]
fn symbol_keyed_hash_is_shape() {
    let mut f = Fixture::new();
    let hash = shape_literal(&mut f);
    insta::assert_snapshot!(f.ty(hash), @"{ age: Integer, name: String }");
}

#[test]
fn shape_subscript_by_symbol() {
    let mut f = Fixture::new();
    let hash = shape_literal(&mut f);
    let key = f.sym("name");
    let get = f.call("[]", Some(hash), vec![key]);
    let inference = f.infer(get);
    assert_eq!(inference.ty, Ty::string());
    assert_eq!(inference.reason.to_string(), "shape field :name");

    let missing = f.sym("email");
    let get = f.call("[]", Some(hash), vec![missing]);
    let inference = f.infer(get);
    assert!(inference.ty.is_nil());
    assert!(!inference.is_unknown());
    assert_eq!(inference.reason.to_string(), "shape has no key :email");
}

#[test]
fn shape_subscript_by_expression_uses_hash_signature() {
    let mut f = Fixture::new();
    let hash = shape_literal(&mut f);
    let key = f.lit(Ty::symbol());
    let get = f.call("[]", Some(hash), vec![key]);
    insta::assert_snapshot!(f.ty(get), @"Integer | String | nil");
}

#[test]
fn tuple_literal_widens_past_eight() {
    let mut f = Fixture::new();
    let eight: Vec<NodeId> = (0..8).map(|_| f.lit(Ty::integer())).collect();
    let tuple = f.add(NodeKind::Literal {
        ty: Ty::array(Ty::Unknown),
        value: LiteralValue::Array(eight.clone()),
    });
    assert!(matches!(f.infer(tuple).ty, Ty::Tuple(ref e) if e.len() == 8));

    let mut nine = eight;
    nine.push(f.lit(Ty::string()));
    let widened = f.add(NodeKind::Literal {
        ty: Ty::array(Ty::Unknown),
        value: LiteralValue::Array(nine),
    });
    insta::assert_snapshot!(f.ty(widened), @"Array[Integer | String]");
}

#[test]
fn shape_literal_widens_past_fifteen() {
    let mut f = Fixture::new();
    let entries: Vec<(HashKey, NodeId)> = (0..16)
        .map(|i| (HashKey::Symbol(format!("k{}", i)), f.lit(Ty::integer())))
        .collect();
    let fifteen = f.add(NodeKind::Literal {
        ty: Ty::hash(Ty::Unknown, Ty::Unknown),
        value: LiteralValue::Hash(entries[..15].to_vec()),
    });
    let sixteen = f.add(NodeKind::Literal {
        ty: Ty::hash(Ty::Unknown, Ty::Unknown),
        value: LiteralValue::Hash(entries),
    });
    assert!(matches!(f.infer(fifteen).ty, Ty::Shape(ref s) if s.len() == 15));
    insta::assert_snapshot!(f.ty(sixteen), @"Hash[Symbol, Integer]");
}

// ── Catalogue Calls ────────────────────────────────────────────────────

#[test]
fn map_with_string_block_is_array_of_string() {
    let mut f = Fixture::new();
    let recv = f.lit(Ty::array(Ty::integer()));
    let body = f.lit(Ty::string());
    let block = BlockBody { params: vec![], body: vec![body], result: Some(body) };
    let map = f.add(NodeKind::Call(CallNode::new("map", Some(recv), vec![]).with_block(block)));
    let inference = f.infer(map);
    assert_eq!(inference.ty, Ty::array(Ty::string()));
    assert_eq!(inference.provenance, Provenance::Catalogue);
    assert_eq!(inference.reason.to_string(), "signature of Array#map");
}

#[test]
fn map_over_block_parameter() {
    // [1, 2].map { |x| x.to_s }
    let mut f = Fixture::new();
    let one = f.lit(Ty::integer());
    let two = f.lit(Ty::integer());
    let recv = f.add(NodeKind::Literal {
        ty: Ty::array(Ty::Unknown),
        value: LiteralValue::Array(vec![one, two]),
    });
    let call_id = f.graph.next_id();
    let x = NodeId(call_id.0 + 1);
    let to_s = NodeId(call_id.0 + 2);
    let block = BlockBody { params: vec![x], body: vec![to_s], result: Some(to_s) };
    f.add(NodeKind::Call(CallNode::new("map", Some(recv), vec![]).with_block(block)));
    f.add(NodeKind::BlockParam { index: 0, call: call_id });
    f.call("to_s", Some(x), vec![]);

    insta::assert_snapshot!(f.ty(x), @"Integer");
    insta::assert_snapshot!(f.ty(call_id), @"Array[String]");
}

#[test]
fn overloads_follow_argument_types() {
    let mut f = Fixture::new();
    let one = f.lit(Ty::integer());
    let half = f.lit(Ty::float());
    let sum = f.call("+", Some(one), vec![half]);
    insta::assert_snapshot!(f.ty(sum), @"Float");
    let other = f.lit(Ty::integer());
    let sum = f.call("+", Some(one), vec![other]);
    insta::assert_snapshot!(f.ty(sum), @"Integer");
}

#[test]
fn element_accessors_are_optional() {
    let mut f = Fixture::new();
    let recv = f.lit(Ty::array(Ty::integer()));
    let first = f.call("first", Some(recv), vec![]);
    insta::assert_snapshot!(f.ty(first), @"Integer?");
    let n = f.lit(Ty::integer());
    let first_n = f.call("first", Some(recv), vec![n]);
    insta::assert_snapshot!(f.ty(first_n), @"Array[Integer]");
}

#[test]
fn hash_values_bind_k_and_v() {
    let mut f = Fixture::new();
    let recv = f.lit(Ty::hash(Ty::symbol(), Ty::float()));
    let keys = f.call("keys", Some(recv), vec![]);
    let values = f.call("values", Some(recv), vec![]);
    insta::assert_snapshot!(f.ty(keys), @"Array[Symbol]");
    insta::assert_snapshot!(f.ty(values), @"Array[Float]");
}

#[test]
fn type_level_catalogue_new() {
    let mut f = Fixture::new();
    let array = f.constant("Array");
    let new = f.call("new", Some(array), vec![]);
    insta::assert_snapshot!(f.ty(new), @"Array[untyped]");
}

#[test]
fn kernel_function_through_catch_all() {
    let mut f = Fixture::new();
    let msg = f.lit(Ty::string());
    let puts = f.call("puts", None, vec![msg]);
    let inference = f.infer(puts);
    assert!(inference.ty.is_nil());
    assert_eq!(inference.reason.to_string(), "signature of Object#puts");
}

#[test]
fn union_receiver_dispatches_per_member() {
    let mut f = Fixture::new();
    let s = f.lit(Ty::string());
    let a = f.lit(Ty::array(Ty::integer()));
    let either = f.add(NodeKind::Merge { branches: vec![s, a] });
    let size = f.call("size", Some(either), vec![]);
    let inference = f.infer(size);
    assert_eq!(inference.ty, Ty::integer());
    assert_eq!(inference.reason.to_string(), "joined .size over 2 receiver types");
}

// ── Block Parameters ───────────────────────────────────────────────────

/// Add `receiver.method { |p0, p1, ...| }` and return the call and its
/// block parameters.
fn call_with_block(f: &mut Fixture, method: &str, receiver: NodeId, n: usize) -> (NodeId, Vec<NodeId>) {
    let call_id = f.graph.next_id();
    let params: Vec<NodeId> = (1..=n).map(|i| NodeId(call_id.0 + i as u32)).collect();
    let block = BlockBody { params: params.clone(), body: vec![], result: None };
    f.add(NodeKind::Call(CallNode::new(method, Some(receiver), vec![]).with_block(block)));
    for index in 0..n {
        f.add(NodeKind::BlockParam { index, call: call_id });
    }
    (call_id, params)
}

#[test]
fn each_yields_element() {
    let mut f = Fixture::new();
    let recv = f.lit(Ty::array(Ty::string()));
    let (_, params) = call_with_block(&mut f, "each", recv, 1);
    let inference = f.infer(params[0]);
    assert_eq!(inference.ty, Ty::string());
    assert_eq!(inference.reason.to_string(), "block parameter 0 of Array#each");
}

#[test]
fn hash_each_yields_key_and_value() {
    let mut f = Fixture::new();
    let recv = shape_literal(&mut f);
    let (_, params) = call_with_block(&mut f, "each", recv, 2);
    insta::assert_snapshot!(f.ty(params[0]), @"Symbol");
    insta::assert_snapshot!(f.ty(params[1]), @"Integer | String");
}

#[test]
fn single_tuple_element_is_splatted() {
    let mut f = Fixture::new();
    let recv = f.lit(Ty::array(Ty::tuple(vec![Ty::string(), Ty::integer()])));
    let (_, params) = call_with_block(&mut f, "each", recv, 2);
    insta::assert_snapshot!(f.ty(params[0]), @"String");
    insta::assert_snapshot!(f.ty(params[1]), @"Integer");
}

#[test]
fn times_yields_integer_and_tap_yields_self() {
    let mut f = Fixture::new();
    let n = f.lit(Ty::integer());
    let (_, params) = call_with_block(&mut f, "times", n, 1);
    insta::assert_snapshot!(f.ty(params[0]), @"Integer");

    let widget = f.lit(Ty::instance("Widget"));
    let (_, params) = call_with_block(&mut f, "tap", widget, 1);
    let inference = f.infer(params[0]);
    assert_eq!(inference.ty, Ty::instance("Widget"));
    assert_eq!(inference.reason.to_string(), "block parameter 0 of Object#tap");
}

#[test]
fn block_parameter_needs_typed_receiver() {
    let mut f = Fixture::new();
    let (p, _) = f.param("items", &[]);
    let (_, params) = call_with_block(&mut f, "each", p, 1);
    assert_eq!(
        f.infer(params[0]).reason,
        Reason::BlockParamWithoutReceiver { method: "each".into() }
    );
}

// ── Project Methods ────────────────────────────────────────────────────

#[test]
fn project_method_and_inheritance() {
    let mut f = Fixture::new();
    f.index.define_class("User", None).define_class("Admin", Some("User"));
    let body = f.lit(Ty::string());
    f.def("User", "name", vec![], Some(body));

    let admin = f.constant("Admin");
    let new = f.call("new", Some(admin), vec![]);
    let name = f.call("name", Some(new), vec![]);
    let inference = f.infer(name);
    assert_eq!(inference.ty, Ty::string());
    assert_eq!(inference.provenance, Provenance::Project);
    assert_eq!(inference.reason.to_string(), "defined at User#name");
}

#[test]
fn redefinition_overwrites() {
    let mut f = Fixture::new();
    f.index.define_class("User", None);
    let s = f.lit(Ty::string());
    let i = f.lit(Ty::integer());
    f.def("User", "id", vec![], Some(s));
    f.def("User", "id", vec![], Some(i));
    let recv = f.lit(Ty::instance("User"));
    let id = f.call("id", Some(recv), vec![]);
    insta::assert_snapshot!(f.ty(id), @"Integer");
}

#[test]
fn self_returning_method_binds_receiver() {
    let mut f = Fixture::new();
    f.index.define_class("Builder", None).define_class("HtmlBuilder", Some("Builder"));
    let this = f.add(NodeKind::SelfRef { owner: "Builder".into(), singleton: false });
    let ret = f.add(NodeKind::Return { value: Some(this) });
    f.def("Builder", "tag", vec![], Some(ret));
    let recv = f.lit(Ty::instance("HtmlBuilder"));
    let tag = f.call("tag", Some(recv), vec![]);
    insta::assert_snapshot!(f.ty(tag), @"Builder");
    // `dup` comes from Object and keeps the receiver.
    let dup = f.call("dup", Some(recv), vec![]);
    insta::assert_snapshot!(f.ty(dup), @"HtmlBuilder");
}

#[test]
fn initializer_returns_self_and_empty_body_nil() {
    let mut f = Fixture::new();
    let init = f.def("User", "initialize", vec![], None);
    let empty = f.def("User", "noop", vec![], None);
    assert_eq!(f.infer(init).ty, Ty::SelfTy);
    assert!(f.infer(empty).ty.is_nil());
    assert_eq!(f.infer(empty).reason.to_string(), "empty body");
}

#[test]
fn type_level_method_from_extended_module() {
    let mut f = Fixture::new();
    f.index
        .define_class("User", None)
        .define_module("Finders")
        .define_method("Finders", "find", None)
        .extend("User", "Finders");
    let body = f.lit(Ty::instance("Record"));
    f.def("Finders", "find", vec![], Some(body));
    let user = f.constant("User");
    let one = f.lit(Ty::integer());
    let find = f.call("find", Some(user), vec![one]);
    let inference = f.infer(find);
    assert_eq!(inference.ty, Ty::instance("Record"));
    assert_eq!(inference.reason.to_string(), "defined at Finders.find");
}

#[test]
fn top_level_function() {
    let mut f = Fixture::new();
    let body = f.lit(Ty::float());
    let def = f.add(NodeKind::Def(DefNode {
        name: "ratio".into(),
        owner: String::new(),
        params: vec![],
        ret: Some(body),
        body: vec![body],
        singleton: false,
    }));
    f.registries.methods.register_function("ratio", def, None);
    let call = f.call("ratio", None, vec![]);
    let inference = f.infer(call);
    assert_eq!(inference.ty, Ty::float());
    assert_eq!(inference.reason.to_string(), "defined at top level as `ratio`");
}

#[test]
fn top_level_function_answers_unresolved_receiver_calls() {
    let mut f = Fixture::new();
    let body = f.lit(Ty::symbol());
    let def = f.add(NodeKind::Def(DefNode {
        name: "helper".into(),
        owner: String::new(),
        params: vec![],
        ret: Some(body),
        body: vec![body],
        singleton: false,
    }));
    f.registries.methods.register_function("helper", def, None);

    let (p, _) = f.param("target", &[]);
    let untyped = f.call("helper", Some(p), vec![]);
    let inference = f.infer(untyped);
    assert_eq!(inference.ty, Ty::symbol());
    assert_eq!(inference.reason.to_string(), "defined at top level as `helper`");

    let widget = f.lit(Ty::instance("Widget"));
    let typed = f.call("helper", Some(widget), vec![]);
    assert_eq!(f.infer(typed).ty, Ty::symbol());
}

#[test]
fn signature_of_definition() {
    let mut f = Fixture::new();
    let default = f.lit(Ty::integer());
    let limit_var = f.graph.new_var("limit", None);
    let limit = f.add(NodeKind::Param {
        name: "limit".into(),
        kind: ParamKind::Optional,
        default: Some(default),
        var: limit_var,
    });
    let rest_var = f.graph.new_var("rest", None);
    let rest = f.add(NodeKind::Param {
        name: "rest".into(),
        kind: ParamKind::Rest,
        default: None,
        var: rest_var,
    });
    let init = f.def("Page", "initialize", vec![limit, rest], None);

    let env = Env::new(&f.graph, &f.registries, &f.index, &f.catalogue, &f.config);
    let mut cache = InferCache::new();
    let sig = Resolver::new(env, &mut cache).signature_of(init).unwrap();
    insta::assert_snapshot!(sig.to_string(), @"(?Integer limit, *Array[untyped] rest) -> Page");
}

// ── Fields ─────────────────────────────────────────────────────────────

#[test]
fn deferred_field_read_uses_first_writer() {
    let mut f = Fixture::new();
    let read = f.add(NodeKind::FieldRead {
        scope: FieldScope::Instance,
        owner: "User".into(),
        name: "@name".into(),
        write: None,
    });
    assert_eq!(
        f.infer(read).reason.to_string(),
        "no assignment to `@name` in User"
    );

    let s = f.lit(Ty::string());
    let i = f.lit(Ty::integer());
    for value in [s, i] {
        let write = f.add(NodeKind::FieldWrite {
            scope: FieldScope::Instance,
            owner: "User".into(),
            name: "@name".into(),
            value: Some(value),
        });
        f.registries.ivars.register("User", "@name", write, None);
    }
    insta::assert_snapshot!(f.ty(read), @"String");
}

#[test]
fn class_fields_are_separate_from_instance_fields() {
    let mut f = Fixture::new();
    let count = f.lit(Ty::integer());
    let write = f.add(NodeKind::FieldWrite {
        scope: FieldScope::Class,
        owner: "Counter".into(),
        name: "@@count".into(),
        value: Some(count),
    });
    f.registries.cvars.register("Counter", "@@count", write, None);
    let class_read = f.add(NodeKind::FieldRead {
        scope: FieldScope::Class,
        owner: "Counter".into(),
        name: "@@count".into(),
        write: None,
    });
    let instance_read = f.add(NodeKind::FieldRead {
        scope: FieldScope::Instance,
        owner: "Counter".into(),
        name: "@@count".into(),
        write: None,
    });
    insta::assert_snapshot!(f.ty(class_read), @"Integer");
    assert!(f.infer(instance_read).is_unknown());
}

// ── Duck Typing ────────────────────────────────────────────────────────

fn duck_zoo(f: &mut Fixture) {
    f.index
        .define_class("Alpha", None)
        .define_method("Alpha", "alpha", None)
        .define_method("Alpha", "beta", None)
        .define_class("Partial", None)
        .define_method("Partial", "alpha", None);
}

#[test]
fn parameter_duck_typed_to_single_type() {
    let mut f = Fixture::new();
    duck_zoo(&mut f);
    let (p, _) = f.param("thing", &[CalledMethod::named("alpha"), CalledMethod::named("beta")]);
    let inference = f.infer(p);
    assert_eq!(inference.ty, Ty::instance("Alpha"));
    assert_eq!(inference.provenance, Provenance::Heuristic);
    assert_eq!(
        inference.reason.to_string(),
        "duck typed from .alpha, .beta (1 candidate)"
    );
}

#[test]
fn parameter_duck_typed_to_union() {
    let mut f = Fixture::new();
    duck_zoo(&mut f);
    let (p, _) = f.param("thing", &[CalledMethod::named("alpha")]);
    assert_eq!(
        f.infer(p).ty,
        Ty::union([Ty::instance("Alpha"), Ty::instance("Partial")])
    );
}

#[test]
fn duck_typing_filters_by_call_arity() {
    let mut f = Fixture::new();
    f.index
        .define_class("One", None)
        .define_method("One", "m", None)
        .define_class("Two", None)
        .define_method("Two", "m", None);
    for (owner, n) in [("One", 1), ("Two", 2)] {
        let params = (0..n)
            .map(|i| {
                let var = f.graph.new_var(format!("a{}", i), None);
                f.add(NodeKind::Param {
                    name: format!("a{}", i),
                    kind: ParamKind::Required,
                    default: None,
                    var,
                })
            })
            .collect();
        f.def(owner, "m", params, None);
    }
    let (p, var) = f.param("target", &[]);
    let a = f.lit(Ty::integer());
    let b = f.lit(Ty::integer());
    f.call("m", Some(p), vec![a, b]);
    f.graph.record_call(var, CalledMethod::new("m", Some(2)));
    assert_eq!(f.infer(p).ty, Ty::instance("Two"));
}

#[test]
fn read_falls_back_to_duck_typing() {
    let mut f = Fixture::new();
    duck_zoo(&mut f);
    let var = f.graph.new_var("x", None);
    f.graph.record_call(var, CalledMethod::named("beta"));
    let read = f.add(NodeKind::LocalRead { name: "x".into(), var, write: None });
    insta::assert_snapshot!(f.ty(read), @"Alpha");
}

#[test]
fn untyped_receiver_is_duck_typed_by_method() {
    let mut f = Fixture::new();
    f.index.define_class("Duck", None).define_method("Duck", "quack", None);
    let sound = f.lit(Ty::string());
    f.def("Duck", "quack", vec![], Some(sound));
    let (p, _) = f.param("bird", &[]);
    let quack = f.call("quack", Some(p), vec![]);
    let inference = f.infer(quack);
    assert_eq!(inference.ty, Ty::string());
    assert_eq!(inference.provenance, Provenance::Heuristic);
}

#[test]
fn untyped_receiver_without_candidates() {
    let mut f = Fixture::new();
    let (p, _) = f.param("bird", &[]);
    let call = f.call("fly", Some(p), vec![]);
    assert_eq!(
        f.infer(call).reason.to_string(),
        "receiver of .fly has no known type"
    );
}

// ── Simplifier ─────────────────────────────────────────────────────────

#[test]
fn ancestor_simplifier_narrows_joins() {
    let mut f = Fixture::new();
    let i = f.lit(Ty::integer());
    let n = f.lit(Ty::instance("Numeric"));
    let merge = f.add(NodeKind::Merge { branches: vec![i, n] });

    let simplifier = AncestorSimplifier::new(&f.index);
    let env = Env::new(&f.graph, &f.registries, &f.index, &f.catalogue, &f.config)
        .with_simplifier(&simplifier);
    let mut cache = InferCache::new();
    let ty = Resolver::new(env, &mut cache).infer(merge).ty;
    assert_eq!(ty, Ty::instance("Numeric"));
    insta::assert_snapshot!(f.ty(merge), @"Integer | Numeric");
}
