//! Substitute vals throughout a fusion.
//!
//! [`ReplaceVals`] is an [`OptOutMutator`] that answers `mutate_val` from a
//! substitution map and otherwise falls back to the identity rewrite, so
//! every val and expr that transitively refers to a replaced val is rebuilt.

use std::collections::HashMap;

use tracing::debug;

use crate::diagnostics::DispatchResult;
use crate::dispatch::OptOutMutator;
use crate::dispatch::mutator::walk_val;
use crate::ir::*;

pub struct ReplaceVals<'m> {
    map: &'m HashMap<StmtId, StmtId>,
}

impl<'m> ReplaceVals<'m> {
    pub fn new(map: &'m HashMap<StmtId, StmtId>) -> Self {
        Self { map }
    }
}

impl OptOutMutator for ReplaceVals<'_> {
    fn mutate_val(&mut self, fusion: &mut Fusion, val: Id<Val>) -> DispatchResult<StmtId> {
        match self.map.get(&val.stmt()) {
            Some(with) => Ok(*with),
            None => walk_val(self, fusion, val),
        }
    }
}

/// Replace every use of each key of `map` by its value, rewriting exprs in
/// place and remapping fusion inputs and outputs.
///
/// Replacement targets must be live vals. A target whose kind does not fit a
/// slot it lands in fails with `KindMismatch`. The rewrite runs on a copy, so
/// on failure `fusion` is left as it was.
pub fn replace_all(fusion: &mut Fusion, map: &HashMap<StmtId, StmtId>) -> DispatchResult<()> {
    let mut pairs = Vec::with_capacity(map.len());
    for (from, to) in map {
        let from: Id<Val> = Id::new(*from);
        let to: Id<Val> = Id::new(*to);
        fusion.node(from)?;
        fusion.node(to)?;
        pairs.push((from, to));
    }

    let mut rewritten = fusion.clone();
    ReplaceVals::new(map).mutate_fusion(&mut rewritten)?;

    for (from, to) in pairs {
        if rewritten.replace_io_val(from, to) {
            debug!(%from, %to, "remapped fusion input/output");
        }
    }
    *fusion = rewritten;
    Ok(())
}

/// Replace a single val. See [`replace_all`].
pub fn replace_val(fusion: &mut Fusion, old: Id<Val>, new: Id<Val>) -> DispatchResult<()> {
    let map = HashMap::from([(old.stmt(), new.stmt())]);
    replace_all(fusion, &map)
}
