//! Rewriting dispatch strategies.
//!
//! A mutator handler returns the id of the statement that should stand in for
//! its input. Returning the input id itself means "unchanged"; callers compare
//! ids, never structure, to detect a rewrite.
//!
//! [`OptOutMutator`] defaults to the identity rewrite: each concrete kind
//! mutates its children in declaration order and rebuilds the node through the
//! fusion only when some child came back different. [`OptInMutator`] fails on
//! every kind it does not override.

use tracing::debug;

use crate::diagnostics::{DispatchError, DispatchResult};
use crate::dispatch::router::{self, ExprRef, StmtRef, ValRef};
use crate::ir::*;

// ============================================================================
// OptOutMutator
// ============================================================================

pub trait OptOutMutator {
    /// Rewrite every expr of `fusion` in declared order, replacing each one
    /// whose mutation produced a different expr.
    fn mutate_fusion(&mut self, fusion: &mut Fusion) -> DispatchResult<()> {
        mutate_fusion_with(fusion, |fusion, expr| self.mutate_expr(fusion, expr))
    }

    fn mutate(&mut self, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<StmtId> {
        walk_stmt(self, fusion, stmt)
    }

    fn mutate_val(&mut self, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<StmtId> {
        walk_val(self, fusion, val)
    }

    fn mutate_expr(&mut self, fusion: &mut Fusion, expr: Id<Expr>) -> DispatchResult<StmtId> {
        walk_expr(self, fusion, expr)
    }

    // Vals
    fn mutate_iter_domain(&mut self, fusion: &mut Fusion, id: Id<IterDomain>) -> DispatchResult<StmtId> {
        walk_iter_domain(self, fusion, id)
    }

    fn mutate_tensor_domain(&mut self, fusion: &mut Fusion, td: Id<TensorDomain>) -> DispatchResult<StmtId> {
        walk_tensor_domain(self, fusion, td)
    }

    fn mutate_tensor_view(&mut self, fusion: &mut Fusion, tv: Id<TensorView>) -> DispatchResult<StmtId> {
        walk_tensor_view(self, fusion, tv)
    }

    fn mutate_float(&mut self, _fusion: &mut Fusion, f: Id<Float>) -> DispatchResult<StmtId> {
        Ok(f.stmt())
    }

    fn mutate_int(&mut self, _fusion: &mut Fusion, i: Id<Int>) -> DispatchResult<StmtId> {
        Ok(i.stmt())
    }

    // Exprs
    fn mutate_split(&mut self, fusion: &mut Fusion, split: Id<Split>) -> DispatchResult<StmtId> {
        walk_split(self, fusion, split)
    }

    fn mutate_merge(&mut self, fusion: &mut Fusion, merge: Id<Merge>) -> DispatchResult<StmtId> {
        walk_merge(self, fusion, merge)
    }

    fn mutate_reorder(&mut self, fusion: &mut Fusion, reorder: Id<Reorder>) -> DispatchResult<StmtId> {
        walk_reorder(self, fusion, reorder)
    }

    fn mutate_unary_op(&mut self, fusion: &mut Fusion, op: Id<UnaryOp>) -> DispatchResult<StmtId> {
        walk_unary_op(self, fusion, op)
    }

    fn mutate_binary_op(&mut self, fusion: &mut Fusion, op: Id<BinaryOp>) -> DispatchResult<StmtId> {
        walk_binary_op(self, fusion, op)
    }
}

// ============================================================================
// Walk Functions (identity rewrite)
// ============================================================================

pub fn walk_stmt<M: OptOutMutator + ?Sized>(m: &mut M, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<StmtId> {
    match router::route(fusion, stmt)? {
        StmtRef::Val(val) => m.mutate_val(fusion, val),
        StmtRef::Expr(expr) => m.mutate_expr(fusion, expr),
    }
}

pub fn walk_val<M: OptOutMutator + ?Sized>(m: &mut M, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<StmtId> {
    match router::route_val(fusion, val)? {
        ValRef::IterDomain(id) => m.mutate_iter_domain(fusion, id),
        ValRef::TensorDomain(td) => m.mutate_tensor_domain(fusion, td),
        ValRef::TensorView(tv) => m.mutate_tensor_view(fusion, tv),
        ValRef::Float(f) => m.mutate_float(fusion, f),
        ValRef::Int(i) => m.mutate_int(fusion, i),
    }
}

pub fn walk_expr<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    expr: Id<Expr>,
) -> DispatchResult<StmtId> {
    match router::route_expr(fusion, expr)? {
        ExprRef::Split(s) => m.mutate_split(fusion, s),
        ExprRef::Merge(mg) => m.mutate_merge(fusion, mg),
        ExprRef::Reorder(r) => m.mutate_reorder(fusion, r),
        ExprRef::UnaryOp(u) => m.mutate_unary_op(fusion, u),
        ExprRef::BinaryOp(b) => m.mutate_binary_op(fusion, b),
    }
}

/// Fetch a copy of the node so children can be mutated while the fusion is
/// borrowed mutably.
fn snapshot<T: IrNode + Clone>(fusion: &Fusion, id: Id<T>) -> DispatchResult<T> {
    fusion
        .get(id)
        .cloned()
        .ok_or(DispatchError::UnknownNodeKind(id.stmt()))
}

/// Mutate one child through the val entry point and check that the result
/// still fits the child's slot.
fn mutate_child<M, T>(m: &mut M, fusion: &mut Fusion, child: Id<T>) -> DispatchResult<Id<T>>
where
    M: OptOutMutator + ?Sized,
    T: IrNode,
{
    let mutated = m.mutate_val(fusion, child.cast())?;
    if mutated == child.stmt() {
        return Ok(child);
    }
    let mutated = Id::new(mutated);
    fusion.node(mutated)?;
    Ok(mutated)
}

pub fn walk_iter_domain<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    id: Id<IterDomain>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, id)?;
    let start = mutate_child(m, fusion, node.start)?;
    let extent = mutate_child(m, fusion, node.extent)?;
    if start == node.start && extent == node.extent {
        return Ok(id.stmt());
    }
    Ok(fusion.add_node(IterDomain { start, extent, ..node }).stmt())
}

pub fn walk_tensor_domain<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    td: Id<TensorDomain>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, td)?;
    let mut axes = Vec::with_capacity(node.axes.len());
    for axis in &node.axes {
        axes.push(mutate_child(m, fusion, *axis)?);
    }
    if axes == node.axes {
        return Ok(td.stmt());
    }
    Ok(fusion.add_node(TensorDomain { axes }).stmt())
}

pub fn walk_tensor_view<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    tv: Id<TensorView>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, tv)?;
    let domain = mutate_child(m, fusion, node.domain)?;
    if domain == node.domain {
        return Ok(tv.stmt());
    }
    Ok(fusion.add_node(TensorView { domain, ..node }).stmt())
}

pub fn walk_split<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    split: Id<Split>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, split)?;
    let out = mutate_child(m, fusion, node.out)?;
    let input = mutate_child(m, fusion, node.input)?;
    let factor = mutate_child(m, fusion, node.factor)?;
    if out == node.out && input == node.input && factor == node.factor {
        return Ok(split.stmt());
    }
    Ok(fusion.add_node(Split { out, input, factor, ..node }).stmt())
}

pub fn walk_merge<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    merge: Id<Merge>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, merge)?;
    let out = mutate_child(m, fusion, node.out)?;
    let input = mutate_child(m, fusion, node.input)?;
    if out == node.out && input == node.input {
        return Ok(merge.stmt());
    }
    Ok(fusion.add_node(Merge { out, input, ..node }).stmt())
}

pub fn walk_reorder<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    reorder: Id<Reorder>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, reorder)?;
    let out = mutate_child(m, fusion, node.out)?;
    let input = mutate_child(m, fusion, node.input)?;
    if out == node.out && input == node.input {
        return Ok(reorder.stmt());
    }
    Ok(fusion.add_node(Reorder { out, input, ..node }).stmt())
}

pub fn walk_unary_op<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    op: Id<UnaryOp>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, op)?;
    let out = mutate_child(m, fusion, node.out)?;
    let input = mutate_child(m, fusion, node.input)?;
    if out == node.out && input == node.input {
        return Ok(op.stmt());
    }
    Ok(fusion.add_node(UnaryOp { out, input, ..node }).stmt())
}

pub fn walk_binary_op<M: OptOutMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    op: Id<BinaryOp>,
) -> DispatchResult<StmtId> {
    let node = snapshot(fusion, op)?;
    let out = mutate_child(m, fusion, node.out)?;
    let lhs = mutate_child(m, fusion, node.lhs)?;
    let rhs = mutate_child(m, fusion, node.rhs)?;
    if out == node.out && lhs == node.lhs && rhs == node.rhs {
        return Ok(op.stmt());
    }
    Ok(fusion.add_node(BinaryOp { out, lhs, rhs, ..node }).stmt())
}

// ============================================================================
// OptInMutator
// ============================================================================

pub trait OptInMutator {
    fn mutate_fusion(&mut self, fusion: &mut Fusion) -> DispatchResult<()> {
        mutate_fusion_with(fusion, |fusion, expr| self.mutate_expr(fusion, expr))
    }

    fn mutate(&mut self, fusion: &mut Fusion, stmt: StmtId) -> DispatchResult<StmtId> {
        walk_stmt_strict(self, fusion, stmt)
    }

    fn mutate_val(&mut self, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<StmtId> {
        walk_val_strict(self, fusion, val)
    }

    fn mutate_expr(&mut self, fusion: &mut Fusion, expr: Id<Expr>) -> DispatchResult<StmtId> {
        walk_expr_strict(self, fusion, expr)
    }

    // Vals
    fn mutate_iter_domain(&mut self, _fusion: &mut Fusion, _id: Id<IterDomain>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::IterDomain))
    }

    fn mutate_tensor_domain(&mut self, _fusion: &mut Fusion, _td: Id<TensorDomain>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::TensorDomain))
    }

    fn mutate_tensor_view(&mut self, _fusion: &mut Fusion, _tv: Id<TensorView>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::TensorView))
    }

    fn mutate_float(&mut self, _fusion: &mut Fusion, _f: Id<Float>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::Float))
    }

    fn mutate_int(&mut self, _fusion: &mut Fusion, _i: Id<Int>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::Int))
    }

    // Exprs
    fn mutate_split(&mut self, _fusion: &mut Fusion, _split: Id<Split>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::Split))
    }

    fn mutate_merge(&mut self, _fusion: &mut Fusion, _merge: Id<Merge>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::Merge))
    }

    fn mutate_reorder(&mut self, _fusion: &mut Fusion, _reorder: Id<Reorder>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::Reorder))
    }

    fn mutate_unary_op(&mut self, _fusion: &mut Fusion, _op: Id<UnaryOp>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::UnaryOp))
    }

    fn mutate_binary_op(&mut self, _fusion: &mut Fusion, _op: Id<BinaryOp>) -> DispatchResult<StmtId> {
        Err(DispatchError::MutatorNotOverridden(StatementKind::BinaryOp))
    }
}

pub fn walk_stmt_strict<M: OptInMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    stmt: StmtId,
) -> DispatchResult<StmtId> {
    match router::route(fusion, stmt)? {
        StmtRef::Val(val) => m.mutate_val(fusion, val),
        StmtRef::Expr(expr) => m.mutate_expr(fusion, expr),
    }
}

pub fn walk_val_strict<M: OptInMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    val: Id<Val>,
) -> DispatchResult<StmtId> {
    match router::route_val(fusion, val)? {
        ValRef::IterDomain(id) => m.mutate_iter_domain(fusion, id),
        ValRef::TensorDomain(td) => m.mutate_tensor_domain(fusion, td),
        ValRef::TensorView(tv) => m.mutate_tensor_view(fusion, tv),
        ValRef::Float(f) => m.mutate_float(fusion, f),
        ValRef::Int(i) => m.mutate_int(fusion, i),
    }
}

pub fn walk_expr_strict<M: OptInMutator + ?Sized>(
    m: &mut M,
    fusion: &mut Fusion,
    expr: Id<Expr>,
) -> DispatchResult<StmtId> {
    match router::route_expr(fusion, expr)? {
        ExprRef::Split(s) => m.mutate_split(fusion, s),
        ExprRef::Merge(mg) => m.mutate_merge(fusion, mg),
        ExprRef::Reorder(r) => m.mutate_reorder(fusion, r),
        ExprRef::UnaryOp(u) => m.mutate_unary_op(fusion, u),
        ExprRef::BinaryOp(b) => m.mutate_binary_op(fusion, b),
    }
}

// ============================================================================
// Whole-fusion driver
// ============================================================================

/// Apply `mutate_expr` to every expr in the fusion's declared order.
///
/// The order is snapshotted up front, so exprs created by a rewrite are not
/// themselves revisited. An expr removed by an earlier rewrite is skipped.
/// Replacement is delegated to [`Fusion::replace_expr`]; a rewrite that
/// removed its own expr from the order fails with `UnknownNodeKind`.
///
/// Works in place: on error, exprs before the failing one are already
/// replaced. Callers that need all-or-nothing run it on a clone.
pub fn mutate_fusion_with<F>(fusion: &mut Fusion, mut mutate_expr: F) -> DispatchResult<()>
where
    F: FnMut(&mut Fusion, Id<Expr>) -> DispatchResult<StmtId>,
{
    let order = fusion.exprs().to_vec();
    for expr in order {
        if !fusion.contains(expr.stmt()) {
            continue;
        }
        let mutated = mutate_expr(fusion, expr)?;
        if mutated == expr.stmt() {
            continue;
        }
        let replacement: Id<Expr> = Id::new(mutated);
        fusion.node(replacement)?;
        debug!(%expr, %replacement, "replacing mutated expr");
        fusion
            .replace_expr(expr, replacement)
            .ok_or(DispatchError::UnknownNodeKind(expr.stmt()))?;
    }
    Ok(())
}
