//! Two-hop routing from a statement id to a typed handle of its concrete kind.
//!
//! This is the only place that decodes the discriminant. Every strategy's
//! abstract-level default is an exhaustive match over the typed references
//! returned here.

use tracing::trace;

use crate::diagnostics::{DispatchError, DispatchResult};
use crate::ir::*;

/// First hop: which family a statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtRef {
    Val(Id<Val>),
    Expr(Id<Expr>),
}

/// Second hop for vals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValRef {
    IterDomain(Id<IterDomain>),
    TensorDomain(Id<TensorDomain>),
    TensorView(Id<TensorView>),
    Float(Id<Float>),
    Int(Id<Int>),
}

/// Second hop for exprs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprRef {
    Split(Id<Split>),
    Merge(Id<Merge>),
    Reorder(Id<Reorder>),
    UnaryOp(Id<UnaryOp>),
    BinaryOp(Id<BinaryOp>),
}

impl ValRef {
    pub fn kind(self) -> StatementKind {
        match self {
            ValRef::IterDomain(_) => StatementKind::IterDomain,
            ValRef::TensorDomain(_) => StatementKind::TensorDomain,
            ValRef::TensorView(_) => StatementKind::TensorView,
            ValRef::Float(_) => StatementKind::Float,
            ValRef::Int(_) => StatementKind::Int,
        }
    }
}

impl ExprRef {
    pub fn kind(self) -> StatementKind {
        match self {
            ExprRef::Split(_) => StatementKind::Split,
            ExprRef::Merge(_) => StatementKind::Merge,
            ExprRef::Reorder(_) => StatementKind::Reorder,
            ExprRef::UnaryOp(_) => StatementKind::UnaryOp,
            ExprRef::BinaryOp(_) => StatementKind::BinaryOp,
        }
    }
}

pub fn route(fusion: &Fusion, stmt: StmtId) -> DispatchResult<StmtRef> {
    let routed = match fusion.statement(stmt) {
        Some(Statement::Val(_)) => StmtRef::Val(Id::new(stmt)),
        Some(Statement::Expr(_)) => StmtRef::Expr(Id::new(stmt)),
        None => return Err(DispatchError::UnknownNodeKind(stmt)),
    };
    trace!(%stmt, ?routed, "route statement");
    Ok(routed)
}

pub fn route_val(fusion: &Fusion, val: Id<Val>) -> DispatchResult<ValRef> {
    let routed = match fusion.get(val) {
        Some(Val::IterDomain(_)) => ValRef::IterDomain(val.cast()),
        Some(Val::TensorDomain(_)) => ValRef::TensorDomain(val.cast()),
        Some(Val::TensorView(_)) => ValRef::TensorView(val.cast()),
        Some(Val::Float(_)) => ValRef::Float(val.cast()),
        Some(Val::Int(_)) => ValRef::Int(val.cast()),
        None => return Err(DispatchError::UnknownNodeKind(val.stmt())),
    };
    Ok(routed)
}

pub fn route_expr(fusion: &Fusion, expr: Id<Expr>) -> DispatchResult<ExprRef> {
    let routed = match fusion.get(expr) {
        Some(Expr::Split(_)) => ExprRef::Split(expr.cast()),
        Some(Expr::Merge(_)) => ExprRef::Merge(expr.cast()),
        Some(Expr::Reorder(_)) => ExprRef::Reorder(expr.cast()),
        Some(Expr::UnaryOp(_)) => ExprRef::UnaryOp(expr.cast()),
        Some(Expr::BinaryOp(_)) => ExprRef::BinaryOp(expr.cast()),
        None => return Err(DispatchError::UnknownNodeKind(expr.stmt())),
    };
    Ok(routed)
}
