//! Dispatch infrastructure for fusion IR passes
//!
//! Passes that need to branch on the concrete kind of a statement implement
//! one of the strategy traits and override only the handlers they care about:
//!
//! - `OptOutDispatch`: visitor over `&mut Fusion`, unhandled kinds are no-ops
//! - `OptInDispatch`: visitor over `&mut Fusion`, unhandled kinds are errors
//! - `OptInConstDispatch`: visitor over `&Fusion`, unhandled kinds are errors
//! - `OptOutMutator`: rewriter, unhandled kinds get the identity rewrite
//! - `OptInMutator`: rewriter, unhandled kinds are errors
//!
//! Routing is two hops: `handle` sends a statement to `handle_val` or
//! `handle_expr`, which send it on to the concrete handler. Overriding a
//! family-level handler takes over the whole family; call the matching
//! `walk_*` function from the override to continue to the concrete level.
//!
//! ## Usage
//!
//! ```rust
//! use fuser::diagnostics::DispatchResult;
//! use fuser::dispatch::OptOutDispatch;
//! use fuser::ir::{BinaryOp, BinaryOpType, Fusion, Id};
//!
//! #[derive(Default)]
//! struct BinaryOpCounter {
//!     count: usize,
//! }
//!
//! impl OptOutDispatch for BinaryOpCounter {
//!     fn handle_binary_op(&mut self, _fusion: &mut Fusion, _op: Id<BinaryOp>) -> DispatchResult<()> {
//!         self.count += 1;
//!         Ok(())
//!     }
//! }
//!
//! let mut fusion = Fusion::new();
//! let a = fusion.new_float(1.0);
//! let b = fusion.new_float(None);
//! let add = fusion.new_binary_op(BinaryOpType::Add, b.as_val(), a.as_val(), a.as_val());
//!
//! let mut counter = BinaryOpCounter::default();
//! counter.handle(&mut fusion, a.stmt()).unwrap();
//! counter.handle(&mut fusion, add.stmt()).unwrap();
//! assert_eq!(counter.count, 1);
//! ```

pub mod composers;
pub mod mutator;
pub mod router;
pub mod visitor;

pub use mutator::{OptInMutator, OptOutMutator};
pub use visitor::{OptInConstDispatch, OptInDispatch, OptOutDispatch};
