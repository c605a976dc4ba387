//! End-to-end behaviour of the dispatch strategies through the public API.
//!
//! Each strategy is exercised over a fusion holding one node of every
//! concrete kind, plus the scenarios a pass author relies on: overriding a
//! single handler, chaining from a family handler, and rewriting a child.

use fuser::diagnostics::{DispatchError, DispatchResult};
use fuser::dispatch::composers::visit_all;
use fuser::dispatch::mutator::walk_expr;
use fuser::dispatch::visitor::{walk_expr_const, walk_val};
use fuser::dispatch::{OptInConstDispatch, OptInDispatch, OptInMutator, OptOutDispatch, OptOutMutator};
use fuser::ir::*;

/// One statement of every kind, listed in `StatementKind::ALL` order.
fn every_kind(f: &mut Fusion) -> Vec<StmtId> {
    let zero = f.new_int(0);
    let eight = f.new_int(8);
    let id = f.new_iter_domain(zero, eight, ParallelType::Serial, false);
    let td = f.new_tensor_domain(vec![id]);
    let tv = f.new_tensor_view(td, DataType::Float);
    let x = f.new_float(1.5);
    let four = f.new_int(4);

    let two = f.new_int(2);
    let outer = f.new_iter_domain(zero, two, ParallelType::Serial, false);
    let inner = f.new_iter_domain(zero, four, ParallelType::Serial, false);
    let split_td = f.new_tensor_domain(vec![outer, inner]);
    let split = f.new_split(split_td, td, 0, four);
    let merge = f.new_merge(td, split_td, 0);
    let reorder = f.new_reorder(split_td, split_td, vec![1, 0]);
    let y = f.new_float(None);
    let unary = f.new_unary_op(UnaryOpType::Neg, y.as_val(), x.as_val());
    let binary = f.new_binary_op(BinaryOpType::Add, y.as_val(), x.as_val(), tv.as_val());

    vec![
        id.stmt(),
        td.stmt(),
        tv.stmt(),
        x.stmt(),
        zero.stmt(),
        split.stmt(),
        merge.stmt(),
        reorder.stmt(),
        unary.stmt(),
        binary.stmt(),
    ]
}

fn fixture() -> (Fusion, Vec<StmtId>) {
    let mut f = Fusion::new();
    let ids = every_kind(&mut f);
    (f, ids)
}

struct Silent;
impl OptOutDispatch for Silent {}

struct Strict;
impl OptInDispatch for Strict {}

struct StrictConst;
impl OptInConstDispatch for StrictConst {}

struct Identity;
impl OptOutMutator for Identity {}

struct StrictMutator;
impl OptInMutator for StrictMutator {}

#[test]
fn fixture_covers_every_kind() {
    let (f, ids) = fixture();
    let kinds: Vec<_> = ids.iter().map(|id| f.kind(*id).unwrap()).collect();
    assert_eq!(kinds, StatementKind::ALL.to_vec());
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn opt_out_dispatch_defaults_have_no_effect() {
    let (mut f, ids) = fixture();
    let before = f.clone();
    for id in ids {
        Silent.handle(&mut f, id).unwrap();
    }
    assert_eq!(f, before);
}

#[test]
fn opt_in_dispatch_defaults_fail_with_the_kind() {
    let (mut f, ids) = fixture();
    for (id, kind) in ids.into_iter().zip(StatementKind::ALL) {
        assert_eq!(Strict.handle(&mut f, id), Err(DispatchError::HandlerNotOverridden(kind)));
        assert_eq!(StrictConst.handle(&f, id), Err(DispatchError::HandlerNotOverridden(kind)));
    }
}

#[test]
fn opt_out_mutator_defaults_return_the_same_statement() {
    let (mut f, ids) = fixture();
    let before = f.clone();
    for id in ids {
        assert_eq!(Identity.mutate(&mut f, id).unwrap(), id);
    }
    assert_eq!(f, before);
}

#[test]
fn opt_in_mutator_defaults_fail_with_the_kind() {
    let (mut f, ids) = fixture();
    for (id, kind) in ids.into_iter().zip(StatementKind::ALL) {
        assert_eq!(StrictMutator.mutate(&mut f, id), Err(DispatchError::MutatorNotOverridden(kind)));
    }
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn family_override_suppresses_concrete_handlers() {
    #[derive(Default)]
    struct ValsOnly {
        vals: usize,
        concrete: usize,
    }

    impl OptInDispatch for ValsOnly {
        fn handle_val(&mut self, _fusion: &mut Fusion, _val: Id<Val>) -> DispatchResult<()> {
            self.vals += 1;
            Ok(())
        }

        fn handle_float(&mut self, _fusion: &mut Fusion, _f: Id<Float>) -> DispatchResult<()> {
            self.concrete += 1;
            Ok(())
        }
    }

    let (mut f, ids) = fixture();
    let mut v = ValsOnly::default();
    for id in &ids[..5] {
        v.handle(&mut f, *id).unwrap();
    }
    assert_eq!((v.vals, v.concrete), (5, 0));
    // The expr family still routes, and none of its handlers are overridden.
    assert_eq!(v.handle(&mut f, ids[5]), Err(DispatchError::HandlerNotOverridden(StatementKind::Split)));
}

#[test]
fn family_override_can_forward_to_concrete_handlers() {
    #[derive(Default)]
    struct Trace {
        events: Vec<&'static str>,
    }

    impl OptOutDispatch for Trace {
        fn handle_val(&mut self, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<()> {
            self.events.push("val");
            walk_val(self, fusion, val)
        }

        fn handle_int(&mut self, _fusion: &mut Fusion, _i: Id<Int>) -> DispatchResult<()> {
            self.events.push("int");
            Ok(())
        }
    }

    let (mut f, ids) = fixture();
    let mut t = Trace::default();
    t.handle(&mut f, ids[4]).unwrap();
    t.handle(&mut f, ids[3]).unwrap();
    assert_eq!(t.events, ["val", "int", "val"]);
}

#[test]
fn concrete_override_keeps_default_routing() {
    struct Splits(usize);

    impl OptInConstDispatch for Splits {
        fn handle_split(&mut self, _fusion: &Fusion, _split: Id<Split>) -> DispatchResult<()> {
            self.0 += 1;
            Ok(())
        }
    }

    let (f, ids) = fixture();
    let mut s = Splits(0);
    s.handle(&f, ids[5]).unwrap();
    s.handle_expr(&f, f.downcast::<Expr>(ids[5]).unwrap()).unwrap();
    assert_eq!(s.0, 2);
}

#[test]
fn family_handler_runs_before_the_concrete_handler() {
    #[derive(Default)]
    struct Order {
        events: Vec<&'static str>,
    }

    impl OptInConstDispatch for Order {
        fn handle_expr(&mut self, fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<()> {
            self.events.push("expr");
            walk_expr_const(self, fusion, expr)
        }

        fn handle_split(&mut self, _fusion: &Fusion, _split: Id<Split>) -> DispatchResult<()> {
            self.events.push("split");
            Ok(())
        }
    }

    let (f, ids) = fixture();
    let mut order = Order::default();
    order.handle(&f, ids[5]).unwrap();
    assert_eq!(order.events, ["expr", "split"]);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn single_binary_op_override_runs_exactly_once() {
    #[derive(Default)]
    struct Flag {
        binary: usize,
        other: usize,
    }

    impl OptOutDispatch for Flag {
        fn handle_binary_op(&mut self, _fusion: &mut Fusion, _op: Id<BinaryOp>) -> DispatchResult<()> {
            self.binary += 1;
            Ok(())
        }

        fn handle_unary_op(&mut self, _fusion: &mut Fusion, _op: Id<UnaryOp>) -> DispatchResult<()> {
            self.other += 1;
            Ok(())
        }
    }

    let (mut f, ids) = fixture();
    let mut flag = Flag::default();
    flag.handle(&mut f, ids[9]).unwrap();
    assert_eq!((flag.binary, flag.other), (1, 0));
}

#[test]
fn strict_visitor_rejects_split() {
    let (mut f, ids) = fixture();
    let err = Strict.handle(&mut f, ids[5]).unwrap_err();
    assert_eq!(err, DispatchError::HandlerNotOverridden(StatementKind::Split));
    assert_eq!(err.to_string(), "Handle not overridden for Split");
}

#[test]
fn rewriting_a_float_operand_builds_a_new_unary_op() {
    struct BumpFloats;

    impl OptOutMutator for BumpFloats {
        fn mutate_float(&mut self, fusion: &mut Fusion, f: Id<Float>) -> DispatchResult<StmtId> {
            match fusion[f].value {
                Some(v) => Ok(fusion.new_float(v + 1.0).stmt()),
                None => Ok(f.stmt()),
            }
        }
    }

    let mut f = Fusion::new();
    let x = f.new_float(2.0);
    let y = f.new_float(None);
    let op = f.new_unary_op(UnaryOpType::Exp, y.as_val(), x.as_val());
    let original = f[op].clone();

    let rewritten = BumpFloats.mutate(&mut f, op.stmt()).unwrap();
    assert_ne!(rewritten, op.stmt());
    let new_op = f.downcast::<UnaryOp>(rewritten).unwrap();
    let new_input = f.downcast::<Float>(f[new_op].input.stmt()).unwrap();
    assert_ne!(new_input, x);
    assert_eq!(f[new_input].value, Some(3.0));
    assert_eq!(f[new_op].out, y.as_val());
    // The original node and its operand are untouched.
    assert_eq!(f[op], original);
    assert_eq!(f[x].value, Some(2.0));
}

#[test]
fn identity_mutator_keeps_iter_domain() {
    let (mut f, ids) = fixture();
    assert_eq!(Identity.mutate(&mut f, ids[0]).unwrap(), ids[0]);
}

#[test]
fn opt_in_mutator_visits_exprs_in_declared_order() {
    #[derive(Default)]
    struct Recorder {
        seen: Vec<StatementKind>,
    }

    impl OptInMutator for Recorder {
        fn mutate_split(&mut self, _fusion: &mut Fusion, split: Id<Split>) -> DispatchResult<StmtId> {
            self.seen.push(StatementKind::Split);
            Ok(split.stmt())
        }

        fn mutate_binary_op(&mut self, _fusion: &mut Fusion, op: Id<BinaryOp>) -> DispatchResult<StmtId> {
            self.seen.push(StatementKind::BinaryOp);
            Ok(op.stmt())
        }

        fn mutate_reorder(&mut self, _fusion: &mut Fusion, reorder: Id<Reorder>) -> DispatchResult<StmtId> {
            self.seen.push(StatementKind::Reorder);
            Ok(reorder.stmt())
        }
    }

    let mut f = Fusion::new();
    let zero = f.new_int(0);
    let n = f.new_int(16);
    let four = f.new_int(4);
    let ax = f.new_iter_domain(zero, n, ParallelType::Serial, false);
    let td = f.new_tensor_domain(vec![ax]);
    let outer = f.new_iter_domain(zero, four, ParallelType::Serial, false);
    let inner = f.new_iter_domain(zero, four, ParallelType::Serial, false);
    let split_td = f.new_tensor_domain(vec![outer, inner]);
    let swapped = f.new_tensor_domain(vec![inner, outer]);
    let a = f.new_float(None);
    let b = f.new_float(None);
    f.new_split(split_td, td, 0, four);
    f.new_binary_op(BinaryOpType::Mul, b.as_val(), a.as_val(), a.as_val());
    f.new_reorder(swapped, split_td, vec![1, 0]);
    let before = f.clone();

    let mut recorder = Recorder::default();
    recorder.mutate_fusion(&mut f).unwrap();
    assert_eq!(
        recorder.seen,
        [StatementKind::Split, StatementKind::BinaryOp, StatementKind::Reorder]
    );
    assert_eq!(f, before);
}

#[test]
fn unknown_statements_fail_in_every_strategy() {
    let (mut f, ids) = fixture();
    let removed = f.downcast::<Expr>(ids[6]).unwrap();
    f.remove_expr(removed);

    for id in [removed.stmt(), StmtId::from_raw(10_000)] {
        let unknown = Err(DispatchError::UnknownNodeKind(id));
        assert_eq!(Silent.handle(&mut f, id), unknown);
        assert_eq!(Strict.handle(&mut f, id), unknown);
        assert_eq!(StrictConst.handle(&f, id), unknown);
        assert_eq!(Identity.mutate(&mut f, id), Err(DispatchError::UnknownNodeKind(id)));
        assert_eq!(StrictMutator.mutate(&mut f, id), Err(DispatchError::UnknownNodeKind(id)));
    }
}

// ============================================================================
// Whole fusion
// ============================================================================

#[test]
fn identity_mutator_round_trips_a_fusion() {
    let (mut f, _) = fixture();
    let before = f.clone();
    Identity.mutate_fusion(&mut f).unwrap();
    assert_eq!(f, before);
}

#[test]
fn expr_level_override_can_drop_back_to_the_default_walk() {
    /// Swaps binary op operands, leaving every other expr to the identity walk.
    struct Commute;

    impl OptOutMutator for Commute {
        fn mutate_expr(&mut self, fusion: &mut Fusion, expr: Id<Expr>) -> DispatchResult<StmtId> {
            match fusion[expr].clone() {
                Expr::BinaryOp(op) => Ok(fusion.add_node(BinaryOp { lhs: op.rhs, rhs: op.lhs, ..op }).stmt()),
                _ => walk_expr(self, fusion, expr),
            }
        }
    }

    let (mut f, ids) = fixture();
    let exprs_before = f.exprs().to_vec();
    Commute.mutate_fusion(&mut f).unwrap();

    assert!(!f.contains(ids[9]));
    assert_eq!(f.exprs().len(), exprs_before.len());
    assert_eq!(&f.exprs()[..4], &exprs_before[..4]);
    let Expr::BinaryOp(op) = &f[f.exprs()[4]] else {
        panic!("expected the commuted binary op last");
    };
    assert_eq!(op.lhs.stmt(), ids[2]);
    assert_eq!(op.rhs.stmt(), ids[3]);
}

#[test]
fn visit_all_reaches_vals_and_exprs() {
    #[derive(Default)]
    struct Kinds(Vec<StatementKind>);

    impl OptOutDispatch for Kinds {
        fn handle(&mut self, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<()> {
            if let Some(kind) = fusion.kind(stmt) {
                self.0.push(kind);
            }
            Ok(())
        }
    }

    let (mut f, _) = fixture();
    let mut kinds = Kinds::default();
    visit_all(&mut kinds, &mut f).unwrap();
    assert_eq!(kinds.0.len(), f.len());
    for kind in StatementKind::ALL {
        assert!(kinds.0.contains(&kind), "{kind} not visited");
    }
}
