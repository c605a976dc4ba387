use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::id::{Id, StmtId};
use super::*;
use crate::diagnostics::{DispatchError, DispatchResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Slot {
    Live(Statement),
    Removed,
}

/// Owns every statement of one compilation unit.
///
/// Statements live in an arena and are addressed by [`StmtId`]/[`Id`].
/// Removing an expr leaves a tombstone so ids are never reused; the router
/// reports such ids as unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fusion {
    stmts: Vec<Slot>,
    /// Declared expr order. Whole-fusion traversals follow it.
    exprs: Vec<Id<Expr>>,
    inputs: Vec<Id<Val>>,
    outputs: Vec<Id<Val>>,
}

impl Fusion {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- construction ----

    /// Register a node. Exprs are appended to the declared order.
    pub fn add_node<T: ConcreteNode>(&mut self, node: T) -> Id<T> {
        let raw = StmtId(self.stmts.len() as u32);
        self.stmts.push(Slot::Live(node.into_stmt()));
        if T::KIND.is_expr() {
            self.exprs.push(Id::new(raw));
        }
        Id::new(raw)
    }

    pub fn new_int(&mut self, value: impl Into<Option<i32>>) -> Id<Int> {
        self.add_node(Int { value: value.into() })
    }

    pub fn new_float(&mut self, value: impl Into<Option<f32>>) -> Id<Float> {
        self.add_node(Float { value: value.into() })
    }

    pub fn new_iter_domain(
        &mut self,
        start: Id<Int>,
        extent: Id<Int>,
        parallel: ParallelType,
        reduction: bool,
    ) -> Id<IterDomain> {
        self.add_node(IterDomain { start, extent, parallel, reduction })
    }

    pub fn new_tensor_domain(&mut self, axes: Vec<Id<IterDomain>>) -> Id<TensorDomain> {
        self.add_node(TensorDomain { axes })
    }

    pub fn new_tensor_view(&mut self, domain: Id<TensorDomain>, dtype: DataType) -> Id<TensorView> {
        self.add_node(TensorView { domain, dtype })
    }

    pub fn new_split(
        &mut self,
        out: Id<TensorDomain>,
        input: Id<TensorDomain>,
        axis: usize,
        factor: Id<Int>,
    ) -> Id<Split> {
        self.add_node(Split { out, input, axis, factor })
    }

    pub fn new_merge(&mut self, out: Id<TensorDomain>, input: Id<TensorDomain>, axis: usize) -> Id<Merge> {
        self.add_node(Merge { out, input, axis })
    }

    pub fn new_reorder(
        &mut self,
        out: Id<TensorDomain>,
        input: Id<TensorDomain>,
        pos2axis: Vec<usize>,
    ) -> Id<Reorder> {
        self.add_node(Reorder { out, input, pos2axis })
    }

    pub fn new_unary_op(&mut self, op: UnaryOpType, out: Id<Val>, input: Id<Val>) -> Id<UnaryOp> {
        self.add_node(UnaryOp { op, out, input })
    }

    pub fn new_binary_op(
        &mut self,
        op: BinaryOpType,
        out: Id<Val>,
        lhs: Id<Val>,
        rhs: Id<Val>,
    ) -> Id<BinaryOp> {
        self.add_node(BinaryOp { op, out, lhs, rhs })
    }

    // ---- lookup ----

    pub fn statement(&self, id: StmtId) -> Option<&Statement> {
        match self.stmts.get(id.index()) {
            Some(Slot::Live(stmt)) => Some(stmt),
            Some(Slot::Removed) | None => None,
        }
    }

    fn statement_mut(&mut self, id: StmtId) -> Option<&mut Statement> {
        match self.stmts.get_mut(id.index()) {
            Some(Slot::Live(stmt)) => Some(stmt),
            Some(Slot::Removed) | None => None,
        }
    }

    pub fn contains(&self, id: StmtId) -> bool {
        self.statement(id).is_some()
    }

    pub fn kind(&self, id: StmtId) -> Option<StatementKind> {
        self.statement(id).map(Statement::kind)
    }

    pub fn get<T: IrNode>(&self, id: Id<T>) -> Option<&T> {
        self.statement(id.stmt()).and_then(T::from_stmt)
    }

    pub fn get_mut<T: IrNode>(&mut self, id: Id<T>) -> Option<&mut T> {
        self.statement_mut(id.stmt()).and_then(T::from_stmt_mut)
    }

    /// Like [`Fusion::get`], but a dead id or a slot of another kind is an error.
    pub fn node<T: IrNode>(&self, id: Id<T>) -> DispatchResult<&T> {
        match self.get(id) {
            Some(node) => Ok(node),
            None => Err(match self.kind(id.stmt()) {
                Some(found) => DispatchError::mismatch(T::NAME, found),
                None => DispatchError::UnknownNodeKind(id.stmt()),
            }),
        }
    }

    /// Typed handle for `id` if it is live and of kind `T`.
    pub fn downcast<T: IrNode>(&self, id: StmtId) -> Option<Id<T>> {
        self.statement(id).and_then(T::from_stmt).map(|_| Id::new(id))
    }

    /// Live statements in arena order.
    pub fn statements(&self) -> impl Iterator<Item = (StmtId, &Statement)> {
        self.stmts.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Live(stmt) => Some((StmtId(i as u32), stmt)),
            Slot::Removed => None,
        })
    }

    pub fn vals(&self) -> Vec<Id<Val>> {
        self.statements()
            .filter(|(_, stmt)| matches!(stmt, Statement::Val(_)))
            .map(|(id, _)| Id::new(id))
            .collect()
    }

    pub fn exprs(&self) -> &[Id<Expr>] {
        &self.exprs
    }

    /// Number of live statements.
    pub fn len(&self) -> usize {
        self.statements().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last expr in declared order that writes `val`.
    pub fn origin(&self, val: Id<Val>) -> Option<Id<Expr>> {
        self.exprs
            .iter()
            .rev()
            .copied()
            .find(|e| self.get(*e).is_some_and(|expr| expr.outputs().contains(&val)))
    }

    /// Exprs reading `val`, in declared order.
    pub fn uses(&self, val: Id<Val>) -> Vec<Id<Expr>> {
        self.exprs
            .iter()
            .copied()
            .filter(|e| self.get(*e).is_some_and(|expr| expr.inputs().contains(&val)))
            .collect()
    }

    pub fn add_input(&mut self, val: Id<Val>) {
        if !self.inputs.contains(&val) {
            self.inputs.push(val);
        }
    }

    pub fn add_output(&mut self, val: Id<Val>) {
        if !self.outputs.contains(&val) {
            self.outputs.push(val);
        }
    }

    pub fn inputs(&self) -> &[Id<Val>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Id<Val>] {
        &self.outputs
    }

    /// Swap `old` for `new` wherever it appears among the fusion inputs and
    /// outputs. Returns whether anything changed.
    pub fn replace_io_val(&mut self, old: Id<Val>, new: Id<Val>) -> bool {
        let mut changed = false;
        for slot in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if *slot == old {
                *slot = new;
                changed = true;
            }
        }
        changed
    }

    // ---- well-formedness ----

    /// Check every reference held by a live statement or the IO lists points
    /// at a live statement of the expected kind, and that the declared order
    /// lists each live expr exactly once.
    ///
    /// The constructors keep a fusion well formed. A deserialized one has to
    /// be validated before passes run over it.
    pub fn validate(&self) -> DispatchResult<()> {
        for (_, stmt) in self.statements() {
            match stmt {
                Statement::Val(val) => self.validate_val(val)?,
                Statement::Expr(expr) => self.validate_expr(expr)?,
            }
        }
        for val in self.inputs.iter().chain(&self.outputs) {
            self.node(*val)?;
        }

        let mut listed = HashSet::new();
        for expr in &self.exprs {
            self.node(*expr)?;
            if !listed.insert(expr.stmt()) {
                return Err(DispatchError::ExprOrder(expr.stmt()));
            }
        }
        match self
            .statements()
            .find(|(id, stmt)| matches!(stmt, Statement::Expr(_)) && !listed.contains(id))
        {
            Some((id, _)) => Err(DispatchError::ExprOrder(id)),
            None => Ok(()),
        }
    }

    fn validate_val(&self, val: &Val) -> DispatchResult<()> {
        match val {
            Val::IterDomain(axis) => {
                self.node(axis.start)?;
                self.node(axis.extent)?;
            }
            Val::TensorDomain(td) => {
                for axis in &td.axes {
                    self.node(*axis)?;
                }
            }
            Val::TensorView(tv) => {
                self.node(tv.domain)?;
            }
            Val::Float(_) | Val::Int(_) => {}
        }
        Ok(())
    }

    fn validate_expr(&self, expr: &Expr) -> DispatchResult<()> {
        match expr {
            Expr::Split(s) => {
                self.node(s.out)?;
                self.node(s.input)?;
                self.node(s.factor)?;
            }
            Expr::Merge(m) => {
                self.node(m.out)?;
                self.node(m.input)?;
            }
            Expr::Reorder(r) => {
                self.node(r.out)?;
                self.node(r.input)?;
            }
            Expr::UnaryOp(u) => {
                self.node(u.out)?;
                self.node(u.input)?;
            }
            Expr::BinaryOp(b) => {
                self.node(b.out)?;
                self.node(b.lhs)?;
                self.node(b.rhs)?;
            }
        }
        Ok(())
    }

    // ---- removal / replacement ----

    /// Tombstone `expr` and drop it from the declared order.
    /// Returns the removed node, or `None` if `expr` was not live.
    pub fn remove_expr(&mut self, expr: Id<Expr>) -> Option<Expr> {
        self.get(expr)?;
        self.exprs.retain(|e| *e != expr);
        self.take_expr(expr)
    }

    /// Put `new` at `old`'s position in the declared order and remove `old`.
    /// Returns the removed node; `None` leaves the fusion untouched.
    pub fn replace_expr(&mut self, old: Id<Expr>, new: Id<Expr>) -> Option<Expr> {
        if old == new {
            return None;
        }
        self.get(new)?;
        let pos = self.exprs.iter().position(|e| *e == old)?;
        self.exprs = self
            .exprs
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match i == pos {
                true => Some(new),
                false => (*e != new).then_some(*e),
            })
            .collect();
        self.take_expr(old)
    }

    fn take_expr(&mut self, expr: Id<Expr>) -> Option<Expr> {
        let slot = self.stmts.get_mut(expr.stmt().index())?;
        match std::mem::replace(slot, Slot::Removed) {
            Slot::Live(Statement::Expr(removed)) => Some(removed),
            other => {
                *slot = other;
                None
            }
        }
    }
}

impl<T: IrNode> Index<Id<T>> for Fusion {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        match self.get(id) {
            Some(node) => node,
            None => panic!("statement {id} is not live in this fusion"),
        }
    }
}

impl<T: IrNode> IndexMut<Id<T>> for Fusion {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("statement {id} is not live in this fusion"),
        }
    }
}
