use crate::config::PrinterSettings;
use crate::diagnostics::DispatchResult;
use crate::dispatch::OptInConstDispatch;
use crate::ir::*;

/// Render a fusion as text.
///
/// The header lists inputs and outputs with their full tensor types, then
/// one line per expr follows in declared order:
///
/// ```text
/// fusion(T5[[0, i1]]: float) -> (T8[[0, i1]]: float)
///   %9 T8 = exp(T5)
/// ```
pub fn print_fusion(fusion: &Fusion, settings: &PrinterSettings) -> DispatchResult<String> {
    let mut p = IrPrinter::new(settings);
    p.write("fusion(");
    p.declare_list(fusion, fusion.inputs())?;
    p.write(") -> (");
    p.declare_list(fusion, fusion.outputs())?;
    p.write(")\n");
    for expr in fusion.exprs() {
        p.handle_expr(fusion, *expr)?;
    }
    Ok(p.finish())
}

/// Render a single statement: a val as its inline form, an expr as its line.
pub fn print_stmt(fusion: &Fusion, stmt: StmtId, settings: &PrinterSettings) -> DispatchResult<String> {
    let mut p = IrPrinter::new(settings);
    match fusion.downcast::<Val>(stmt) {
        Some(val) => p.declare(fusion, val)?,
        None => p.handle(fusion, stmt)?,
    }
    Ok(p.finish())
}

/// Text printer for fusion IR. Handles every statement kind.
///
/// Vals write their inline form into the buffer; exprs write a full line.
/// Outside of declarations tensor views and domains are printed by name
/// only (`T5`, `D4`).
pub struct IrPrinter<'s> {
    settings: &'s PrinterSettings,
    buf: String,
    verbose: bool,
}

impl<'s> IrPrinter<'s> {
    pub fn new(settings: &'s PrinterSettings) -> Self {
        Self { settings, buf: String::new(), verbose: false }
    }

    pub fn finish(self) -> String {
        self.buf
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn start_line(&mut self, stmt: StmtId) {
        for _ in 0..self.settings.indent {
            self.buf.push(' ');
        }
        if self.settings.show_ids {
            self.buf.push_str(&format!("{stmt} "));
        }
    }

    fn val(&mut self, fusion: &Fusion, val: Id<Val>) -> DispatchResult<()> {
        self.handle_val(fusion, val)
    }

    fn declare(&mut self, fusion: &Fusion, val: Id<Val>) -> DispatchResult<()> {
        let prev = std::mem::replace(&mut self.verbose, true);
        let result = self.handle_val(fusion, val);
        self.verbose = prev;
        result
    }

    fn declare_list(&mut self, fusion: &Fusion, vals: &[Id<Val>]) -> DispatchResult<()> {
        for (i, val) in vals.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.declare(fusion, *val)?;
        }
        Ok(())
    }

    fn declare_domain(&mut self, fusion: &Fusion, td: Id<TensorDomain>) -> DispatchResult<()> {
        self.write(&format!("D{}", td.stmt().index()));
        self.declare(fusion, td.as_val())
    }
}

impl OptInConstDispatch for IrPrinter<'_> {
    fn handle_iter_domain(&mut self, fusion: &Fusion, id: Id<IterDomain>) -> DispatchResult<()> {
        let axis = fusion.node(id)?;
        let (start, extent) = (axis.start, axis.extent);
        let (parallel, reduction) = (axis.parallel, axis.reduction);
        if reduction {
            self.write("r");
        }
        self.write("[");
        self.handle_int(fusion, start)?;
        self.write(", ");
        self.handle_int(fusion, extent)?;
        self.write("]");
        if parallel != ParallelType::Serial {
            self.write(&format!("@{parallel}"));
        }
        Ok(())
    }

    fn handle_tensor_domain(&mut self, fusion: &Fusion, td: Id<TensorDomain>) -> DispatchResult<()> {
        let axes = fusion.node(td)?.axes.clone();
        if !self.verbose {
            self.write(&format!("D{}", td.stmt().index()));
            return Ok(());
        }
        self.write("[");
        for (i, axis) in axes.into_iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.handle_iter_domain(fusion, axis)?;
        }
        self.write("]");
        Ok(())
    }

    fn handle_tensor_view(&mut self, fusion: &Fusion, tv: Id<TensorView>) -> DispatchResult<()> {
        let (domain, dtype) = {
            let view = fusion.node(tv)?;
            (view.domain, view.dtype)
        };
        self.write(&format!("T{}", tv.stmt().index()));
        if !self.verbose {
            return Ok(());
        }
        self.handle_tensor_domain(fusion, domain)?;
        self.write(&format!(": {dtype}"));
        Ok(())
    }

    fn handle_float(&mut self, fusion: &Fusion, f: Id<Float>) -> DispatchResult<()> {
        match fusion.node(f)?.value {
            Some(v) => self.write(&format!("{v:?}f")),
            None => self.write(&format!("f{}", f.stmt().index())),
        }
        Ok(())
    }

    fn handle_int(&mut self, fusion: &Fusion, i: Id<Int>) -> DispatchResult<()> {
        match fusion.node(i)?.value {
            Some(v) => self.write(&v.to_string()),
            None => self.write(&format!("i{}", i.stmt().index())),
        }
        Ok(())
    }

    fn handle_split(&mut self, fusion: &Fusion, split: Id<Split>) -> DispatchResult<()> {
        let node = fusion.node(split)?.clone();
        self.start_line(split.stmt());
        self.declare_domain(fusion, node.out)?;
        self.write(" = split(");
        self.handle_tensor_domain(fusion, node.input)?;
        self.write(&format!(", axis={}, factor=", node.axis));
        self.handle_int(fusion, node.factor)?;
        self.write(")\n");
        Ok(())
    }

    fn handle_merge(&mut self, fusion: &Fusion, merge: Id<Merge>) -> DispatchResult<()> {
        let node = fusion.node(merge)?.clone();
        self.start_line(merge.stmt());
        self.declare_domain(fusion, node.out)?;
        self.write(" = merge(");
        self.handle_tensor_domain(fusion, node.input)?;
        self.write(&format!(", axis={})\n", node.axis));
        Ok(())
    }

    fn handle_reorder(&mut self, fusion: &Fusion, reorder: Id<Reorder>) -> DispatchResult<()> {
        let node = fusion.node(reorder)?.clone();
        self.start_line(reorder.stmt());
        self.declare_domain(fusion, node.out)?;
        self.write(" = reorder(");
        self.handle_tensor_domain(fusion, node.input)?;
        self.write(&format!(", {:?})\n", node.pos2axis));
        Ok(())
    }

    fn handle_unary_op(&mut self, fusion: &Fusion, op: Id<UnaryOp>) -> DispatchResult<()> {
        let node = fusion.node(op)?.clone();
        self.start_line(op.stmt());
        self.val(fusion, node.out)?;
        self.write(&format!(" = {}(", node.op));
        self.val(fusion, node.input)?;
        self.write(")\n");
        Ok(())
    }

    fn handle_binary_op(&mut self, fusion: &Fusion, op: Id<BinaryOp>) -> DispatchResult<()> {
        let node = fusion.node(op)?.clone();
        self.start_line(op.stmt());
        self.val(fusion, node.out)?;
        self.write(" = ");
        match infix(node.op) {
            Some(sym) => {
                self.val(fusion, node.lhs)?;
                self.write(&format!(" {sym} "));
                self.val(fusion, node.rhs)?;
            }
            None => {
                self.write(&format!("{}(", node.op));
                self.val(fusion, node.lhs)?;
                self.write(", ");
                self.val(fusion, node.rhs)?;
                self.write(")");
            }
        }
        self.write("\n");
        Ok(())
    }
}

fn infix(op: BinaryOpType) -> Option<&'static str> {
    match op {
        BinaryOpType::Add => Some("+"),
        BinaryOpType::Sub => Some("-"),
        BinaryOpType::Mul => Some("*"),
        BinaryOpType::Div => Some("/"),
        BinaryOpType::Mod => Some("%"),
        BinaryOpType::LessThan => Some("<"),
        BinaryOpType::CeilDiv => None,
    }
}
