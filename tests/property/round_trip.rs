//! Property-based tests for whole-fusion rewrites.
//!
//! Random fusions are built from a small instruction list so every kind of
//! statement shows up with arbitrary sharing between nodes.

use proptest::prelude::*;

use fuser::config::PrinterSettings;
use fuser::dispatch::composers::count_kinds;
use fuser::dispatch::{OptInConstDispatch, OptOutMutator};
use fuser::ir::*;

#[derive(Debug, Clone)]
enum Step {
    Float(Option<f32>),
    Int(Option<i32>),
    Axis { extent: usize, parallel: ParallelType, reduction: bool },
    Domain(Vec<usize>),
    Tensor(usize),
    Unary { op: UnaryOpType, input: usize },
    Binary { op: BinaryOpType, lhs: usize, rhs: usize },
    Split { input: usize, factor: usize },
    Merge { input: usize },
    Reorder { input: usize },
    Remove(usize),
}

fn arb_parallel() -> impl Strategy<Value = ParallelType> {
    prop_oneof![
        Just(ParallelType::Serial),
        Just(ParallelType::BlockX),
        Just(ParallelType::ThreadX),
        Just(ParallelType::Vectorize),
    ]
}

fn arb_unary() -> impl Strategy<Value = UnaryOpType> {
    prop_oneof![
        Just(UnaryOpType::Neg),
        Just(UnaryOpType::Abs),
        Just(UnaryOpType::Exp),
        Just(UnaryOpType::Relu),
    ]
}

fn arb_binary() -> impl Strategy<Value = BinaryOpType> {
    prop_oneof![
        Just(BinaryOpType::Add),
        Just(BinaryOpType::Mul),
        Just(BinaryOpType::CeilDiv),
        Just(BinaryOpType::LessThan),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    let idx = 0usize..64;
    prop_oneof![
        proptest::option::of(prop_oneof![
            8 => -100.0f32..100.0,
            1 => Just(f32::NAN),
            1 => Just(f32::NEG_INFINITY),
        ])
        .prop_map(Step::Float),
        proptest::option::of(0i32..1024).prop_map(Step::Int),
        (idx.clone(), arb_parallel(), any::<bool>())
            .prop_map(|(extent, parallel, reduction)| Step::Axis { extent, parallel, reduction }),
        prop::collection::vec(idx.clone(), 1..4).prop_map(Step::Domain),
        idx.clone().prop_map(Step::Tensor),
        (arb_unary(), idx.clone()).prop_map(|(op, input)| Step::Unary { op, input }),
        (arb_binary(), idx.clone(), idx.clone()).prop_map(|(op, lhs, rhs)| Step::Binary { op, lhs, rhs }),
        (idx.clone(), idx.clone()).prop_map(|(input, factor)| Step::Split { input, factor }),
        (idx.clone(), any::<bool>()).prop_map(|(input, merge)| match merge {
            true => Step::Merge { input },
            false => Step::Reorder { input },
        }),
        idx.prop_map(Step::Remove),
    ]
}

fn pick<T: Copy>(pool: &[T], i: usize) -> T {
    pool[i % pool.len()]
}

/// Interpret `steps` into a fusion. Indices wrap around the pools they pick from.
fn build(steps: &[Step]) -> Fusion {
    let mut f = Fusion::new();
    let zero = f.new_int(0);
    let mut ints = vec![zero, f.new_int(None)];
    let mut scalars = vec![f.new_float(None).as_val(), f.new_float(1.0).as_val()];
    let first_axis = f.new_iter_domain(zero, ints[1], ParallelType::Serial, false);
    let mut axes = vec![first_axis];
    let mut domains = vec![f.new_tensor_domain(vec![first_axis])];

    for step in steps {
        match step {
            Step::Float(v) => scalars.push(f.new_float(*v).as_val()),
            Step::Int(v) => {
                let i = f.new_int(*v);
                ints.push(i);
                scalars.push(i.as_val());
            }
            Step::Axis { extent, parallel, reduction } => {
                let extent = pick(&ints, *extent);
                axes.push(f.new_iter_domain(zero, extent, *parallel, *reduction));
            }
            Step::Domain(picks) => {
                let chosen = picks.iter().map(|i| pick(&axes, *i)).collect();
                domains.push(f.new_tensor_domain(chosen));
            }
            Step::Tensor(d) => {
                let tv = f.new_tensor_view(pick(&domains, *d), DataType::Float);
                scalars.push(tv.as_val());
            }
            Step::Unary { op, input } => {
                let out = f.new_float(None).as_val();
                f.new_unary_op(*op, out, pick(&scalars, *input));
                scalars.push(out);
            }
            Step::Binary { op, lhs, rhs } => {
                let out = f.new_float(None).as_val();
                f.new_binary_op(*op, out, pick(&scalars, *lhs), pick(&scalars, *rhs));
                scalars.push(out);
            }
            Step::Split { input, factor } => {
                let out = f.new_tensor_domain(vec![first_axis, first_axis]);
                f.new_split(out, pick(&domains, *input), 0, pick(&ints, *factor));
                domains.push(out);
            }
            Step::Merge { input } => {
                let out = f.new_tensor_domain(vec![first_axis]);
                f.new_merge(out, pick(&domains, *input), 0);
                domains.push(out);
            }
            Step::Reorder { input } => {
                let input = pick(&domains, *input);
                let mut reversed = f[input].axes.clone();
                reversed.reverse();
                let pos2axis = (0..reversed.len()).rev().collect();
                let out = f.new_tensor_domain(reversed);
                f.new_reorder(out, input, pos2axis);
                domains.push(out);
            }
            Step::Remove(i) => {
                if !f.exprs().is_empty() {
                    let victim = pick(f.exprs(), *i);
                    f.remove_expr(victim);
                }
            }
        }
    }
    if let Some(last) = scalars.last() {
        f.add_output(*last);
    }
    f.add_input(scalars[0]);
    f
}

fn arb_fusion() -> impl Strategy<Value = Fusion> {
    prop::collection::vec(arb_step(), 0..40).prop_map(|steps| build(&steps))
}

struct Identity;
impl OptOutMutator for Identity {}

proptest! {
    /// Property: the default mutator leaves any fusion structurally unchanged
    #[test]
    fn identity_rewrite_preserves_fusion(fusion in arb_fusion()) {
        let mut rewritten = fusion.clone();
        Identity.mutate_fusion(&mut rewritten).unwrap();
        prop_assert_eq!(&rewritten, &fusion);
        prop_assert!(fuser::check_fusion(&fusion).is_ok());
    }

    /// Property: the identity rewrite returns the same id for every live statement
    #[test]
    fn identity_rewrite_is_id_preserving(fusion in arb_fusion()) {
        let mut f = fusion.clone();
        let ids: Vec<StmtId> = f.statements().map(|(id, _)| id).collect();
        for id in ids {
            prop_assert_eq!(Identity.mutate(&mut f, id).unwrap(), id);
        }
        prop_assert_eq!(f.len(), fusion.len());
    }

    /// Property: the census counts every live statement exactly once
    #[test]
    fn census_matches_live_statements(fusion in arb_fusion()) {
        let census = count_kinds(&fusion).unwrap();
        prop_assert_eq!(census.values().sum::<usize>(), fusion.len());
        prop_assert_eq!(
            census.iter().filter(|(k, _)| k.is_expr()).map(|(_, n)| n).sum::<usize>(),
            fusion.exprs().len()
        );
    }

    /// Property: the printer handles every kind, one line per expr plus the header
    #[test]
    fn printer_covers_every_statement(fusion in arb_fusion()) {
        let settings = PrinterSettings::default();
        let text = fuser::printer::print_fusion(&fusion, &settings).unwrap();
        prop_assert_eq!(text.lines().count(), fusion.exprs().len() + 1);

        let mut printer = fuser::printer::IrPrinter::new(&settings);
        for (id, _) in fusion.statements() {
            prop_assert!(printer.handle(&fusion, id).is_ok());
        }
    }

    /// Property: JSON serialisation round-trips, and generated fusions are well formed
    #[test]
    fn json_round_trip(fusion in arb_fusion()) {
        prop_assert!(fusion.validate().is_ok());
        let json = serde_json::to_string(&fusion).unwrap();
        let back: Fusion = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, fusion);
    }
}
