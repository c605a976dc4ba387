//! Drivers and small ready-made visitors built on the dispatch traits.
//!
//! The dispatch layer never walks children on its own, so these helpers
//! supply the common outer loops: every live statement in arena order, or
//! every expr in declared order.
//!
//! # Examples
//!
//! ```
//! use fuser::dispatch::composers::{contains_kind, count_kinds};
//! use fuser::ir::{Fusion, StatementKind};
//!
//! let mut fusion = Fusion::new();
//! fusion.new_int(4);
//! fusion.new_float(None);
//!
//! let counts = count_kinds(&fusion).unwrap();
//! assert_eq!(counts[&StatementKind::Int], 1);
//! assert!(!contains_kind(&fusion, StatementKind::Split).unwrap());
//! ```

use std::collections::BTreeMap;

use crate::diagnostics::DispatchResult;
use crate::dispatch::router;
use crate::dispatch::{OptInConstDispatch, OptOutDispatch};
use crate::ir::*;

// ============================================================================
// Drivers
// ============================================================================

/// Dispatch every live statement, vals and exprs alike, in arena order.
///
/// The id list is snapshotted first; statements a handler adds are not
/// visited, statements it removes are skipped.
pub fn visit_all<V: OptOutDispatch + ?Sized>(v: &mut V, fusion: &mut Fusion) -> DispatchResult<()> {
    let ids: Vec<StmtId> = fusion.statements().map(|(id, _)| id).collect();
    for id in ids {
        if fusion.contains(id) {
            v.handle(fusion, id)?;
        }
    }
    Ok(())
}

pub fn visit_all_const<V: OptInConstDispatch + ?Sized>(v: &mut V, fusion: &Fusion) -> DispatchResult<()> {
    for (id, _) in fusion.statements() {
        v.handle(fusion, id)?;
    }
    Ok(())
}

/// Dispatch every expr in the fusion's declared order.
pub fn visit_exprs_const<V: OptInConstDispatch + ?Sized>(v: &mut V, fusion: &Fusion) -> DispatchResult<()> {
    for expr in fusion.exprs() {
        v.handle_expr(fusion, *expr)?;
    }
    Ok(())
}

// ============================================================================
// Census
// ============================================================================

/// Number of live statements of each kind. Kinds that do not occur are absent.
pub fn count_kinds(fusion: &Fusion) -> DispatchResult<BTreeMap<StatementKind, usize>> {
    // Overrides only the family-level handlers, so the strict concrete
    // defaults are never reached.
    #[derive(Default)]
    struct Census {
        counts: BTreeMap<StatementKind, usize>,
    }

    impl OptInConstDispatch for Census {
        fn handle_val(&mut self, fusion: &Fusion, val: Id<Val>) -> DispatchResult<()> {
            let kind = router::route_val(fusion, val)?.kind();
            *self.counts.entry(kind).or_default() += 1;
            Ok(())
        }

        fn handle_expr(&mut self, fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<()> {
            let kind = router::route_expr(fusion, expr)?.kind();
            *self.counts.entry(kind).or_default() += 1;
            Ok(())
        }
    }

    let mut census = Census::default();
    visit_all_const(&mut census, fusion)?;
    Ok(census.counts)
}

/// Whether any live statement has the given kind. Stops at the first hit.
pub fn contains_kind(fusion: &Fusion, kind: StatementKind) -> DispatchResult<bool> {
    struct Detector {
        kind: StatementKind,
        found: bool,
    }

    impl OptInConstDispatch for Detector {
        fn handle_val(&mut self, fusion: &Fusion, val: Id<Val>) -> DispatchResult<()> {
            self.found = router::route_val(fusion, val)?.kind() == self.kind;
            Ok(())
        }

        fn handle_expr(&mut self, fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<()> {
            self.found = router::route_expr(fusion, expr)?.kind() == self.kind;
            Ok(())
        }
    }

    let mut detector = Detector { kind, found: false };
    for (id, _) in fusion.statements() {
        detector.handle(fusion, id)?;
        if detector.found {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Live statements of `kind`, in arena order.
pub fn collect_kind(fusion: &Fusion, kind: StatementKind) -> DispatchResult<Vec<StmtId>> {
    struct Gather {
        kind: StatementKind,
        found: Vec<StmtId>,
    }

    impl OptInConstDispatch for Gather {
        fn handle_val(&mut self, fusion: &Fusion, val: Id<Val>) -> DispatchResult<()> {
            if router::route_val(fusion, val)?.kind() == self.kind {
                self.found.push(val.stmt());
            }
            Ok(())
        }

        fn handle_expr(&mut self, fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<()> {
            if router::route_expr(fusion, expr)?.kind() == self.kind {
                self.found.push(expr.stmt());
            }
            Ok(())
        }
    }

    let mut gather = Gather { kind, found: Vec::new() };
    visit_all_const(&mut gather, fusion)?;
    Ok(gather.found)
}

/// Exprs matching `predicate`, in declared order. A dead entry in the order
/// fails with `UnknownNodeKind`.
pub fn collect_exprs<F>(fusion: &Fusion, predicate: F) -> DispatchResult<Vec<Id<Expr>>>
where
    F: Fn(&Expr) -> bool,
{
    struct Collector<F> {
        predicate: F,
        found: Vec<Id<Expr>>,
    }

    impl<F> OptInConstDispatch for Collector<F>
    where
        F: Fn(&Expr) -> bool,
    {
        fn handle_expr(&mut self, fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<()> {
            if (self.predicate)(fusion.node(expr)?) {
                self.found.push(expr);
            }
            Ok(())
        }
    }

    let mut collector = Collector { predicate, found: Vec::new() };
    visit_exprs_const(&mut collector, fusion)?;
    Ok(collector.found)
}
