//! Node taxonomy of the fusion IR.
//!
//! Every node is a [`Statement`], which is exactly one of a [`Val`] (a value in
//! the dataflow graph) or an [`Expr`] (an operation over vals). The set of
//! concrete kinds is closed; [`StatementKind`] is the discriminant the
//! dispatch router switches on.
//!
//! Nodes refer to each other through typed [`Id`] handles into the owning
//! [`Fusion`], never by ownership.

mod fusion;
mod id;

pub use fusion::Fusion;
pub use id::{Id, StmtId};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Discriminant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    // Vals
    IterDomain,
    TensorDomain,
    TensorView,
    Float,
    Int,
    // Exprs
    Split,
    Merge,
    Reorder,
    UnaryOp,
    BinaryOp,
}

impl StatementKind {
    pub const ALL: [StatementKind; 10] = [
        StatementKind::IterDomain,
        StatementKind::TensorDomain,
        StatementKind::TensorView,
        StatementKind::Float,
        StatementKind::Int,
        StatementKind::Split,
        StatementKind::Merge,
        StatementKind::Reorder,
        StatementKind::UnaryOp,
        StatementKind::BinaryOp,
    ];

    pub fn is_val(self) -> bool {
        matches!(
            self,
            StatementKind::IterDomain
                | StatementKind::TensorDomain
                | StatementKind::TensorView
                | StatementKind::Float
                | StatementKind::Int
        )
    }

    pub fn is_expr(self) -> bool {
        !self.is_val()
    }

    pub fn name(self) -> &'static str {
        match self {
            StatementKind::IterDomain => "IterDomain",
            StatementKind::TensorDomain => "TensorDomain",
            StatementKind::TensorView => "TensorView",
            StatementKind::Float => "Float",
            StatementKind::Int => "Int",
            StatementKind::Split => "Split",
            StatementKind::Merge => "Merge",
            StatementKind::Reorder => "Reorder",
            StatementKind::UnaryOp => "UnaryOp",
            StatementKind::BinaryOp => "BinaryOp",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Attribute enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParallelType {
    #[default]
    Serial,
    BlockX,
    BlockY,
    BlockZ,
    ThreadX,
    ThreadY,
    ThreadZ,
    Unroll,
    Vectorize,
}

impl fmt::Display for ParallelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParallelType::Serial => "serial",
            ParallelType::BlockX => "blockIdx.x",
            ParallelType::BlockY => "blockIdx.y",
            ParallelType::BlockZ => "blockIdx.z",
            ParallelType::ThreadX => "threadIdx.x",
            ParallelType::ThreadY => "threadIdx.y",
            ParallelType::ThreadZ => "threadIdx.z",
            ParallelType::Unroll => "unroll",
            ParallelType::Vectorize => "vectorize",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float,
    Int,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Float => f.write_str("float"),
            DataType::Int => f.write_str("int"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOpType {
    Neg,
    Cast,
    Abs,
    Exp,
    Relu,
}

impl fmt::Display for UnaryOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOpType::Neg => "neg",
            UnaryOpType::Cast => "cast",
            UnaryOpType::Abs => "abs",
            UnaryOpType::Exp => "exp",
            UnaryOpType::Relu => "relu",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOpType {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LessThan,
    CeilDiv,
}

impl fmt::Display for BinaryOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOpType::Add => "add",
            BinaryOpType::Sub => "sub",
            BinaryOpType::Mul => "mul",
            BinaryOpType::Div => "div",
            BinaryOpType::Mod => "mod",
            BinaryOpType::LessThan => "lt",
            BinaryOpType::CeilDiv => "ceilDiv",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Vals
// ============================================================================

/// One axis of a tensor's iteration space: `[start, start + extent)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterDomain {
    pub start: Id<Int>,
    pub extent: Id<Int>,
    pub parallel: ParallelType,
    pub reduction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDomain {
    pub axes: Vec<Id<IterDomain>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorView {
    pub domain: Id<TensorDomain>,
    pub dtype: DataType,
}

/// Scalar float. `None` is a symbolic value only known at runtime.
///
/// Constants compare by bit pattern, so a NaN constant equals itself and
/// `0.0` differs from `-0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Float {
    #[serde(default, with = "float_value")]
    pub value: Option<f32>,
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.value.map(f32::to_bits) == other.value.map(f32::to_bits)
    }
}

/// JSON has no literal for infinities or NaN, so non-finite constants are
/// written as `{"bits": <u32>}`. Finite ones stay plain numbers.
mod float_value {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Finite(f32),
        Bits { bits: u32 },
    }

    pub fn serialize<S: Serializer>(value: &Option<f32>, s: S) -> Result<S::Ok, S::Error> {
        value
            .map(|v| match v.is_finite() {
                true => Encoded::Finite(v),
                false => Encoded::Bits { bits: v.to_bits() },
            })
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f32>, D::Error> {
        Ok(Option::<Encoded>::deserialize(d)?.map(|encoded| match encoded {
            Encoded::Finite(v) => v,
            Encoded::Bits { bits } => f32::from_bits(bits),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Int {
    pub value: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Val {
    IterDomain(IterDomain),
    TensorDomain(TensorDomain),
    TensorView(TensorView),
    Float(Float),
    Int(Int),
}

impl Val {
    pub fn kind(&self) -> StatementKind {
        match self {
            Val::IterDomain(_) => StatementKind::IterDomain,
            Val::TensorDomain(_) => StatementKind::TensorDomain,
            Val::TensorView(_) => StatementKind::TensorView,
            Val::Float(_) => StatementKind::Float,
            Val::Int(_) => StatementKind::Int,
        }
    }

    /// Vals this val is built from, in declaration order.
    pub fn children(&self) -> Vec<StmtId> {
        match self {
            Val::IterDomain(id) => vec![id.start.stmt(), id.extent.stmt()],
            Val::TensorDomain(td) => td.axes.iter().map(|a| a.stmt()).collect(),
            Val::TensorView(tv) => vec![tv.domain.stmt()],
            Val::Float(_) | Val::Int(_) => vec![],
        }
    }
}

// ============================================================================
// Exprs
// ============================================================================

/// Splits `axis` of `input` by `factor`, producing `out`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub out: Id<TensorDomain>,
    pub input: Id<TensorDomain>,
    pub axis: usize,
    pub factor: Id<Int>,
}

/// Merges `axis` and `axis + 1` of `input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    pub out: Id<TensorDomain>,
    pub input: Id<TensorDomain>,
    pub axis: usize,
}

/// `pos2axis[i]` is the input axis placed at output position `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reorder {
    pub out: Id<TensorDomain>,
    pub input: Id<TensorDomain>,
    pub pos2axis: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOp {
    pub op: UnaryOpType,
    pub out: Id<Val>,
    pub input: Id<Val>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOp {
    pub op: BinaryOpType,
    pub out: Id<Val>,
    pub lhs: Id<Val>,
    pub rhs: Id<Val>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Split(Split),
    Merge(Merge),
    Reorder(Reorder),
    UnaryOp(UnaryOp),
    BinaryOp(BinaryOp),
}

impl Expr {
    pub fn kind(&self) -> StatementKind {
        match self {
            Expr::Split(_) => StatementKind::Split,
            Expr::Merge(_) => StatementKind::Merge,
            Expr::Reorder(_) => StatementKind::Reorder,
            Expr::UnaryOp(_) => StatementKind::UnaryOp,
            Expr::BinaryOp(_) => StatementKind::BinaryOp,
        }
    }

    pub fn outputs(&self) -> Vec<Id<Val>> {
        match self {
            Expr::Split(s) => vec![s.out.cast()],
            Expr::Merge(m) => vec![m.out.cast()],
            Expr::Reorder(r) => vec![r.out.cast()],
            Expr::UnaryOp(u) => vec![u.out],
            Expr::BinaryOp(b) => vec![b.out],
        }
    }

    pub fn inputs(&self) -> Vec<Id<Val>> {
        match self {
            Expr::Split(s) => vec![s.input.cast(), s.factor.cast()],
            Expr::Merge(m) => vec![m.input.cast()],
            Expr::Reorder(r) => vec![r.input.cast()],
            Expr::UnaryOp(u) => vec![u.input],
            Expr::BinaryOp(b) => vec![b.lhs, b.rhs],
        }
    }
}

// ============================================================================
// Statement
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Val(Val),
    Expr(Expr),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Val(v) => v.kind(),
            Statement::Expr(e) => e.kind(),
        }
    }
}

// ============================================================================
// Typed access
// ============================================================================

/// A node type that can be viewed inside a [`Statement`].
pub trait IrNode: Sized {
    const NAME: &'static str;

    fn from_stmt(stmt: &Statement) -> Option<&Self>;
    fn from_stmt_mut(stmt: &mut Statement) -> Option<&mut Self>;
}

/// A node of exactly one concrete kind, constructible into a [`Statement`].
pub trait ConcreteNode: IrNode {
    const KIND: StatementKind;

    fn into_stmt(self) -> Statement;
}

impl IrNode for Val {
    const NAME: &'static str = "Val";

    fn from_stmt(stmt: &Statement) -> Option<&Self> {
        match stmt {
            Statement::Val(v) => Some(v),
            Statement::Expr(_) => None,
        }
    }

    fn from_stmt_mut(stmt: &mut Statement) -> Option<&mut Self> {
        match stmt {
            Statement::Val(v) => Some(v),
            Statement::Expr(_) => None,
        }
    }
}

impl IrNode for Expr {
    const NAME: &'static str = "Expr";

    fn from_stmt(stmt: &Statement) -> Option<&Self> {
        match stmt {
            Statement::Expr(e) => Some(e),
            Statement::Val(_) => None,
        }
    }

    fn from_stmt_mut(stmt: &mut Statement) -> Option<&mut Self> {
        match stmt {
            Statement::Expr(e) => Some(e),
            Statement::Val(_) => None,
        }
    }
}

/// Concrete kinds of the `Val` family.
pub trait ValNode: ConcreteNode {}

/// Concrete kinds of the `Expr` family.
pub trait ExprNode: ConcreteNode {}

impl<T: ValNode> Id<T> {
    pub fn as_val(self) -> Id<Val> {
        self.cast()
    }
}

impl<T: ExprNode> Id<T> {
    pub fn as_expr(self) -> Id<Expr> {
        self.cast()
    }
}

macro_rules! concrete_node {
    ($family:ident, $marker:ident, $ty:ident) => {
        impl $marker for $ty {}

        impl IrNode for $ty {
            const NAME: &'static str = stringify!($ty);

            fn from_stmt(stmt: &Statement) -> Option<&Self> {
                match stmt {
                    Statement::$family($family::$ty(n)) => Some(n),
                    _ => None,
                }
            }

            fn from_stmt_mut(stmt: &mut Statement) -> Option<&mut Self> {
                match stmt {
                    Statement::$family($family::$ty(n)) => Some(n),
                    _ => None,
                }
            }
        }

        impl ConcreteNode for $ty {
            const KIND: StatementKind = StatementKind::$ty;

            fn into_stmt(self) -> Statement {
                Statement::$family($family::$ty(self))
            }
        }
    };
}

concrete_node!(Val, ValNode, IterDomain);
concrete_node!(Val, ValNode, TensorDomain);
concrete_node!(Val, ValNode, TensorView);
concrete_node!(Val, ValNode, Float);
concrete_node!(Val, ValNode, Int);
concrete_node!(Expr, ExprNode, Split);
concrete_node!(Expr, ExprNode, Merge);
concrete_node!(Expr, ExprNode, Reorder);
concrete_node!(Expr, ExprNode, UnaryOp);
concrete_node!(Expr, ExprNode, BinaryOp);
