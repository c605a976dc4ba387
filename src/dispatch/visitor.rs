//! Visiting dispatch strategies.
//!
//! - [`OptOutDispatch`]: unhandled kinds are silently skipped.
//! - [`OptInDispatch`]: unhandled kinds fail with `HandlerNotOverridden`.
//! - [`OptInConstDispatch`]: as `OptInDispatch`, but over `&Fusion`.
//!
//! Each trait has three abstract-level handlers (`handle`, `handle_val`,
//! `handle_expr`) whose defaults route to the next level, and one handler per
//! concrete kind. The routing defaults are also available as free `walk_*`
//! functions so an override of an abstract-level handler can chain to the
//! concrete level after (or instead of) its own logic.

use crate::diagnostics::{DispatchError, DispatchResult};
use crate::dispatch::router::{self, ExprRef, StmtRef, ValRef};
use crate::ir::*;

// ============================================================================
// OptOutDispatch
// ============================================================================

/// Permissive visitor: every concrete handler defaults to a no-op.
pub trait OptOutDispatch {
    fn handle(&mut self, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<()> {
        walk_stmt(self, fusion, stmt)
    }

    fn handle_val(&mut self, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<()> {
        walk_val(self, fusion, val)
    }

    fn handle_expr(&mut self, fusion: &mut Fusion, expr: Id<Expr>) -> DispatchResult<()> {
        walk_expr(self, fusion, expr)
    }

    // Vals
    fn handle_iter_domain(&mut self, _fusion: &mut Fusion, _id: Id<IterDomain>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_tensor_domain(&mut self, _fusion: &mut Fusion, _td: Id<TensorDomain>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_tensor_view(&mut self, _fusion: &mut Fusion, _tv: Id<TensorView>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_float(&mut self, _fusion: &mut Fusion, _f: Id<Float>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_int(&mut self, _fusion: &mut Fusion, _i: Id<Int>) -> DispatchResult<()> {
        Ok(())
    }

    // Exprs
    fn handle_split(&mut self, _fusion: &mut Fusion, _split: Id<Split>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_merge(&mut self, _fusion: &mut Fusion, _merge: Id<Merge>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_reorder(&mut self, _fusion: &mut Fusion, _reorder: Id<Reorder>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_unary_op(&mut self, _fusion: &mut Fusion, _op: Id<UnaryOp>) -> DispatchResult<()> {
        Ok(())
    }

    fn handle_binary_op(&mut self, _fusion: &mut Fusion, _op: Id<BinaryOp>) -> DispatchResult<()> {
        Ok(())
    }
}

pub fn walk_stmt<V: OptOutDispatch + ?Sized>(v: &mut V, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<()> {
    match router::route(fusion, stmt)? {
        StmtRef::Val(val) => v.handle_val(fusion, val),
        StmtRef::Expr(expr) => v.handle_expr(fusion, expr),
    }
}

pub fn walk_val<V: OptOutDispatch + ?Sized>(v: &mut V, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<()> {
    match router::route_val(fusion, val)? {
        ValRef::IterDomain(id) => v.handle_iter_domain(fusion, id),
        ValRef::TensorDomain(td) => v.handle_tensor_domain(fusion, td),
        ValRef::TensorView(tv) => v.handle_tensor_view(fusion, tv),
        ValRef::Float(f) => v.handle_float(fusion, f),
        ValRef::Int(i) => v.handle_int(fusion, i),
    }
}

pub fn walk_expr<V: OptOutDispatch + ?Sized>(v: &mut V, fusion: &mut Fusion, expr: Id<Expr>) -> DispatchResult<()> {
    match router::route_expr(fusion, expr)? {
        ExprRef::Split(s) => v.handle_split(fusion, s),
        ExprRef::Merge(m) => v.handle_merge(fusion, m),
        ExprRef::Reorder(r) => v.handle_reorder(fusion, r),
        ExprRef::UnaryOp(u) => v.handle_unary_op(fusion, u),
        ExprRef::BinaryOp(b) => v.handle_binary_op(fusion, b),
    }
}

// ============================================================================
// OptInDispatch
// ============================================================================

/// Strict visitor: a concrete handler that is not overridden fails with
/// `HandlerNotOverridden(kind)` the first time a node of that kind is seen.
pub trait OptInDispatch {
    fn handle(&mut self, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<()> {
        walk_stmt_strict(self, fusion, stmt)
    }

    fn handle_val(&mut self, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<()> {
        walk_val_strict(self, fusion, val)
    }

    fn handle_expr(&mut self, fusion: &mut Fusion, expr: Id<Expr>) -> DispatchResult<()> {
        walk_expr_strict(self, fusion, expr)
    }

    // Vals
    fn handle_iter_domain(&mut self, _fusion: &mut Fusion, _id: Id<IterDomain>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::IterDomain))
    }

    fn handle_tensor_domain(&mut self, _fusion: &mut Fusion, _td: Id<TensorDomain>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::TensorDomain))
    }

    fn handle_tensor_view(&mut self, _fusion: &mut Fusion, _tv: Id<TensorView>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::TensorView))
    }

    fn handle_float(&mut self, _fusion: &mut Fusion, _f: Id<Float>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Float))
    }

    fn handle_int(&mut self, _fusion: &mut Fusion, _i: Id<Int>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Int))
    }

    // Exprs
    fn handle_split(&mut self, _fusion: &mut Fusion, _split: Id<Split>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Split))
    }

    fn handle_merge(&mut self, _fusion: &mut Fusion, _merge: Id<Merge>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Merge))
    }

    fn handle_reorder(&mut self, _fusion: &mut Fusion, _reorder: Id<Reorder>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Reorder))
    }

    fn handle_unary_op(&mut self, _fusion: &mut Fusion, _op: Id<UnaryOp>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::UnaryOp))
    }

    fn handle_binary_op(&mut self, _fusion: &mut Fusion, _op: Id<BinaryOp>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::BinaryOp))
    }
}

pub fn walk_stmt_strict<V: OptInDispatch + ?Sized>(
    v: &mut V,
    fusion: &mut Fusion,
    stmt: StmtId,
) -> DispatchResult<()> {
    match router::route(fusion, stmt)? {
        StmtRef::Val(val) => v.handle_val(fusion, val),
        StmtRef::Expr(expr) => v.handle_expr(fusion, expr),
    }
}

pub fn walk_val_strict<V: OptInDispatch + ?Sized>(
    v: &mut V,
    fusion: &mut Fusion,
    val: Id<Val>,
) -> DispatchResult<()> {
    match router::route_val(fusion, val)? {
        ValRef::IterDomain(id) => v.handle_iter_domain(fusion, id),
        ValRef::TensorDomain(td) => v.handle_tensor_domain(fusion, td),
        ValRef::TensorView(tv) => v.handle_tensor_view(fusion, tv),
        ValRef::Float(f) => v.handle_float(fusion, f),
        ValRef::Int(i) => v.handle_int(fusion, i),
    }
}

pub fn walk_expr_strict<V: OptInDispatch + ?Sized>(
    v: &mut V,
    fusion: &mut Fusion,
    expr: Id<Expr>,
) -> DispatchResult<()> {
    match router::route_expr(fusion, expr)? {
        ExprRef::Split(s) => v.handle_split(fusion, s),
        ExprRef::Merge(m) => v.handle_merge(fusion, m),
        ExprRef::Reorder(r) => v.handle_reorder(fusion, r),
        ExprRef::UnaryOp(u) => v.handle_unary_op(fusion, u),
        ExprRef::BinaryOp(b) => v.handle_binary_op(fusion, b),
    }
}

// ============================================================================
// OptInConstDispatch
// ============================================================================

/// Strict visitor over an immutable fusion. Callers that only hold `&Fusion`
/// can run it, and handlers cannot modify nodes.
pub trait OptInConstDispatch {
    fn handle(&mut self, fusion: &Fusion, stmt: StmtId) -> DispatchResult<()> {
        walk_stmt_const(self, fusion, stmt)
    }

    fn handle_val(&mut self, fusion: &Fusion, val: Id<Val>) -> DispatchResult<()> {
        walk_val_const(self, fusion, val)
    }

    fn handle_expr(&mut self, fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<()> {
        walk_expr_const(self, fusion, expr)
    }

    // Vals
    fn handle_iter_domain(&mut self, _fusion: &Fusion, _id: Id<IterDomain>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::IterDomain))
    }

    fn handle_tensor_domain(&mut self, _fusion: &Fusion, _td: Id<TensorDomain>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::TensorDomain))
    }

    fn handle_tensor_view(&mut self, _fusion: &Fusion, _tv: Id<TensorView>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::TensorView))
    }

    fn handle_float(&mut self, _fusion: &Fusion, _f: Id<Float>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Float))
    }

    fn handle_int(&mut self, _fusion: &Fusion, _i: Id<Int>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Int))
    }

    // Exprs
    fn handle_split(&mut self, _fusion: &Fusion, _split: Id<Split>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Split))
    }

    fn handle_merge(&mut self, _fusion: &Fusion, _merge: Id<Merge>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Merge))
    }

    fn handle_reorder(&mut self, _fusion: &Fusion, _reorder: Id<Reorder>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::Reorder))
    }

    fn handle_unary_op(&mut self, _fusion: &Fusion, _op: Id<UnaryOp>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::UnaryOp))
    }

    fn handle_binary_op(&mut self, _fusion: &Fusion, _op: Id<BinaryOp>) -> DispatchResult<()> {
        Err(DispatchError::HandlerNotOverridden(StatementKind::BinaryOp))
    }
}

pub fn walk_stmt_const<V: OptInConstDispatch + ?Sized>(
    v: &mut V,
    fusion: &Fusion,
    stmt: StmtId,
) -> DispatchResult<()> {
    match router::route(fusion, stmt)? {
        StmtRef::Val(val) => v.handle_val(fusion, val),
        StmtRef::Expr(expr) => v.handle_expr(fusion, expr),
    }
}

pub fn walk_val_const<V: OptInConstDispatch + ?Sized>(
    v: &mut V,
    fusion: &Fusion,
    val: Id<Val>,
) -> DispatchResult<()> {
    match router::route_val(fusion, val)? {
        ValRef::IterDomain(id) => v.handle_iter_domain(fusion, id),
        ValRef::TensorDomain(td) => v.handle_tensor_domain(fusion, td),
        ValRef::TensorView(tv) => v.handle_tensor_view(fusion, tv),
        ValRef::Float(f) => v.handle_float(fusion, f),
        ValRef::Int(i) => v.handle_int(fusion, i),
    }
}

pub fn walk_expr_const<V: OptInConstDispatch + ?Sized>(
    v: &mut V,
    fusion: &Fusion,
    expr: Id<Expr>,
) -> DispatchResult<()> {
    match router::route_expr(fusion, expr)? {
        ExprRef::Split(s) => v.handle_split(fusion, s),
        ExprRef::Merge(m) => v.handle_merge(fusion, m),
        ExprRef::Reorder(r) => v.handle_reorder(fusion, r),
        ExprRef::UnaryOp(u) => v.handle_unary_op(fusion, u),
        ExprRef::BinaryOp(b) => v.handle_binary_op(fusion, b),
    }
}
