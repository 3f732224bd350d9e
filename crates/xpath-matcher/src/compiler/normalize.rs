//! Mid-path backtrack elimination.
//!
//! `a/b/c/../d` steps into `c` only to prove it exists before continuing to
//! `d`, so it is rewritten to `a/b[c]/d`. Runs of `..`/`parent::` that cannot
//! be folded (leading runs, runs without an anchor, runs over `//` steps) are
//! left in place and evaluated literally by the matcher.

use tracing::trace;

use super::ir::{self, CompiledExpr, CompiledStep, NameTest, NodeTypeTest, StepKind};

pub(super) fn normalize(steps: Vec<CompiledStep>) -> Vec<CompiledStep> {
    let mut out: Vec<CompiledStep> = Vec::with_capacity(steps.len());
    let mut iter = steps.into_iter().peekable();
    while let Some(step) = iter.next() {
        if !step.is_backtrack() {
            out.push(step);
            continue;
        }
        let mut run = vec![step];
        while let Some(next) = iter.next_if(CompiledStep::is_backtrack) {
            run.push(next);
        }
        if let Some(last) = foldable(&out, &run) {
            fold_run(&mut out, run.len(), last);
        } else {
            out.extend(run);
        }
    }
    out
}

/// Checks whether the run can be folded onto `out` and returns the run's last
/// step, whose predicates move to the anchor.
fn foldable(out: &[CompiledStep], run: &[CompiledStep]) -> Option<CompiledStep> {
    let k = run.len();
    if out.len() <= k {
        return None;
    }
    let (head, consumed) = out.split_at(out.len() - k);
    let anchor = head.last()?;
    if anchor.is_backtrack() || !consumed.iter().all(CompiledStep::is_plain_child) {
        return None;
    }
    let (last, rest) = run.split_last()?;
    if run.iter().any(CompiledStep::is_descendant) || rest.iter().any(|s| !s.predicates().is_empty()) {
        return None;
    }
    if last.needs_position() || !parent_test_accepts(last, anchor) {
        return None;
    }
    Some(last.clone())
}

/// For `parent::x` the test has to hold for the anchor itself.
fn parent_test_accepts(step: &CompiledStep, anchor: &CompiledStep) -> bool {
    if step.kind() == StepKind::DotDot {
        return true;
    }
    match (step.node_type(), step.name()) {
        (Some(NodeTypeTest::Node), _) | (None, Some(NameTest::Wildcard)) => true,
        (None, Some(name)) => anchor.kind() == StepKind::NameTest && anchor.name() == Some(name),
        _ => false,
    }
}

fn fold_run(out: &mut Vec<CompiledStep>, k: usize, mut last: CompiledStep) {
    let consumed = out.split_off(out.len() - k);
    let predicate = existence_predicate(consumed);
    let Some(anchor) = out.last_mut() else {
        return;
    };
    trace!(anchor = %anchor, predicate = %predicate, "folded backtrack run into existence predicate");
    anchor.push_predicate(predicate);
    for p in last.take_predicates() {
        anchor.push_predicate(p);
    }
}

fn existence_predicate(consumed: Vec<CompiledStep>) -> CompiledExpr {
    if let [step] = consumed.as_slice()
        && step.predicates().is_empty()
        && let Some(name) = step.name()
    {
        return CompiledExpr::Child(name.clone());
    }
    CompiledExpr::Path { steps: ir::freeze(consumed), terminal: None }
}
