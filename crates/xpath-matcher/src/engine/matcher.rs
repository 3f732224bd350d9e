//! Bottom-up matching of compiled expressions against a cursor.
//!
//! The last step is tested at the cursor's current node and every earlier
//! step on the ancestor chain (or, after a backtrack step, on the children of
//! the position the backtrack landed on). Matching never fails: a malformed or
//! unreachable path is simply "no match".

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use tracing::warn;

use super::cursor::{Cursor, Position};
use super::evaluator::{Focus, evaluate, filter_nodes, predicate_holds};
use crate::cache;
use crate::compiler::ir::{
    Axis, CompiledFilterExpr, CompiledStep, CompiledXPath, MatchStrategy, NameTest, NodeTypeTest, StepKind, XPathBody,
};
use crate::model::{NodeKind, XmlNode};

/// Does `compiled` select the cursor's current node?
pub fn matches<N: XmlNode>(compiled: &CompiledXPath, cursor: &Cursor<N>) -> bool {
    let Some(current) = Position::current(cursor) else {
        return false;
    };
    match compiled.body() {
        XPathBody::Path(steps) => {
            let path = PathMatch::new(steps, compiled.flags().is_absolute(), cursor.depth());
            steps.len().checked_sub(1).is_some_and(|last| path.selects(last, &current))
        }
        XPathBody::Boolean(expr) => evaluate(expr, &Focus::single(&current)).to_boolean(),
        XPathBody::Filter(filter) => matches_filter(filter, &current),
    }
}

fn matches_filter<N: XmlNode>(filter: &CompiledFilterExpr, current: &Position<'_, N>) -> bool {
    if let Some(primary) = &filter.primary
        && filter.predicates.is_empty()
        && filter.trailing.is_none()
    {
        return evaluate(primary, &Focus::single(current)).to_boolean();
    }
    filter_nodes(filter, &current.document_position()).iter().any(|p| p.same_node(current))
}

struct PathMatch<'s> {
    steps: &'s [CompiledStep],
    rooted: bool,
    /// `(step, chain depth)` pairs already known not to select, row-major by step.
    /// Only failures are kept; a success ends the whole search.
    rejected: RefCell<Vec<bool>>,
    stride: usize,
}

impl<'s> PathMatch<'s> {
    fn new(steps: &'s [CompiledStep], rooted: bool, chain_len: usize) -> Self {
        let stride = chain_len + 1;
        Self { steps, rooted, rejected: RefCell::new(vec![false; steps.len() * stride]), stride }
    }

    fn slot<N: XmlNode>(&self, i: usize, pos: &Position<'_, N>) -> Option<usize> {
        pos.chain_depth().filter(|&d| d < self.stride).map(|d| i * self.stride + d)
    }

    /// Step `i` accepts `pos`, and `steps[..i]` can reach a context from which
    /// step `i` selects `pos`.
    fn selects<N: XmlNode>(&self, i: usize, pos: &Position<'_, N>) -> bool {
        let slot = self.slot(i, pos);
        if let Some(s) = slot
            && self.rejected.borrow().get(s).copied().unwrap_or(false)
        {
            return false;
        }
        let selected = self.search(i, pos);
        if !selected
            && let Some(s) = slot
            && let Some(flag) = self.rejected.borrow_mut().get_mut(s)
        {
            *flag = true;
        }
        selected
    }

    fn search<N: XmlNode>(&self, i: usize, pos: &Position<'_, N>) -> bool {
        let Some(step) = self.steps.get(i) else {
            return false;
        };
        if !accepts(step, pos) {
            return false;
        }
        let backtrack = match i.checked_sub(1) {
            Some(prev) => self.steps[prev].followed_by_backtrack(),
            None => step.is_backtrack(),
        };
        let reach = |ctx: &Position<'_, N>| self.reaches(i, ctx);

        if backtrack {
            // `pos` is the parent of whatever the previous steps selected.
            pos.children().chain(pos.attributes()).any(|c| reach(&c))
                || (step.is_descendant() && (reach(pos) || pos.ancestors().any(|a| reach(&a))))
        } else if step.stays_in_place() {
            reach(pos) || (step.is_descendant() && pos.ancestors().any(|a| reach(&a)))
        } else if step.is_descendant() {
            pos.ancestors().any(|a| reach(&a))
        } else {
            pos.parent().is_some_and(|p| reach(&p))
        }
    }

    /// `ctx` is a valid context for step `i`.
    fn reaches<N: XmlNode>(&self, i: usize, ctx: &Position<'_, N>) -> bool {
        match i.checked_sub(1) {
            Some(prev) => self.selects(prev, ctx),
            None => !self.rooted || ctx.is_document(),
        }
    }
}

fn accepts<N: XmlNode>(step: &CompiledStep, pos: &Position<'_, N>) -> bool {
    let node = pos.node();
    let principal = || node.is_some_and(|n| n.kind() == principal_kind(step));
    match step.strategy() {
        MatchStrategy::Dot => true,
        MatchStrategy::Wildcard => principal(),
        MatchStrategy::NameOnly => matches_node(step, node),
        MatchStrategy::PredicatesOnly => principal() && predicates_hold(step, pos),
        MatchStrategy::NameThenPredicates | MatchStrategy::NodeType | MatchStrategy::Other => {
            matches_node(step, node) && predicates_hold(step, pos)
        }
    }
}

fn predicates_hold<N: XmlNode>(step: &CompiledStep, pos: &Position<'_, N>) -> bool {
    let focus = Focus::among_siblings(pos, step);
    step.predicates().iter().all(|p| predicate_holds(p, &focus))
}

fn principal_kind(step: &CompiledStep) -> NodeKind {
    if step.kind() == StepKind::AttributeStep { NodeKind::Attribute } else { NodeKind::Element }
}

/// Name/kind test of a step, without predicates. `None` is the document
/// position, which only `.`, `..`, `self::node()` and `parent::node()` pass.
pub(crate) fn matches_node<N: XmlNode>(step: &CompiledStep, node: Option<&N>) -> bool {
    let Some(node) = node else {
        return matches!(step.kind(), StepKind::Dot | StepKind::DotDot)
            || (step.stays_in_place() && step.node_type() == Some(NodeTypeTest::Node));
    };
    match step.kind() {
        StepKind::Dot | StepKind::DotDot => true,
        StepKind::NameTest => is_named(node, NodeKind::Element, step.name()),
        StepKind::AttributeStep => is_named(node, NodeKind::Attribute, step.name()),
        StepKind::NodeTypeTest => step.node_type().is_some_and(|t| kind_test(t, node.kind(), false)),
        StepKind::AxisStep => match step.axis() {
            Some(axis @ (Axis::Parent | Axis::SelfAxis | Axis::Child)) => match step.node_type() {
                Some(t) => kind_test(t, node.kind(), axis != Axis::Child),
                None => is_named(node, NodeKind::Element, step.name()),
            },
            Some(Axis::Other) | None => false,
        },
    }
}

fn is_named<N: XmlNode>(node: &N, kind: NodeKind, test: Option<&NameTest>) -> bool {
    node.kind() == kind && matches!((test, node.name()), (Some(t), Some(n)) if t.matches(n))
}

/// `node()` on the child axis excludes attributes; on `self`/`parent` it
/// accepts every kind.
pub(crate) fn kind_test(test: NodeTypeTest, kind: NodeKind, any_kind: bool) -> bool {
    match test {
        NodeTypeTest::Text => kind == NodeKind::Text,
        NodeTypeTest::Comment => kind == NodeKind::Comment,
        NodeTypeTest::ProcessingInstruction => kind == NodeKind::ProcessingInstruction,
        NodeTypeTest::Node => any_kind || !matches!(kind, NodeKind::Attribute | NodeKind::Document),
        NodeTypeTest::Unknown => false,
    }
}

/// An expression string paired with its lazily compiled form.
///
/// Compilation goes through the process-wide cache on first use. An
/// expression that does not compile never matches; the failure is logged
/// once per matcher.
#[derive(Debug, Clone)]
pub struct XPathMatcher {
    expression: String,
    compiled: OnceLock<Option<Arc<CompiledXPath>>>,
}

impl XPathMatcher {
    pub fn new(expression: impl Into<String>) -> Self {
        Self { expression: expression.into(), compiled: OnceLock::new() }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn compiled(&self) -> Option<&Arc<CompiledXPath>> {
        self.compiled
            .get_or_init(|| {
                cache::compile(&self.expression)
                    .inspect_err(|err| {
                        warn!(expression = %self.expression, error = %err, "expression does not compile and will never match");
                    })
                    .ok()
            })
            .as_ref()
    }

    pub fn matches<N: XmlNode>(&self, cursor: &Cursor<N>) -> bool {
        self.compiled().is_some_and(|c| matches(c, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_uncached;
    use crate::model::simple::{SimpleNode, attr, doc, elem};

    fn tree() -> SimpleNode {
        doc()
            .child(
                elem("a")
                    .child(elem("b").child(elem("c")).child(elem("d")))
                    .child(elem("b").attr(attr("k", "v")).child(elem("d"))),
            )
            .build()
    }

    fn hits(expr: &str, document: &SimpleNode, name: &str) -> Vec<bool> {
        let compiled = compile_uncached(expr).unwrap();
        document.find_all(name).iter().map(|n| matches(&compiled, &n.cursor())).collect()
    }

    #[test]
    fn absolute_path_is_anchored() {
        let d = tree();
        assert_eq!(hits("/a/b/d", &d, "d"), [true, true]);
        assert_eq!(hits("/b/d", &d, "d"), [false, false]);
        assert_eq!(hits("b/d", &d, "d"), [true, true]);
    }

    #[test]
    fn normalized_backtrack_requires_sibling() {
        let d = tree();
        assert_eq!(hits("/a/b/c/../d", &d, "d"), [true, false]);
        assert_eq!(hits("/a/b[c]/d", &d, "d"), [true, false]);
    }

    #[test]
    fn literal_backtrack_uses_children() {
        let d = tree();
        // No anchor before `c`, so the run stays and is walked as written.
        assert_eq!(hits("c/../d", &d, "d"), [true, false]);
    }

    #[test]
    fn attribute_predicate_and_wildcard() {
        let d = tree();
        assert_eq!(hits("/a/*[@k = 'v']/d", &d, "d"), [false, true]);
        assert_eq!(hits("//b[2]/d", &d, "d"), [false, true]);
    }

    #[test]
    fn unknown_axis_never_matches() {
        let d = tree();
        assert_eq!(hits("/a/b/following-sibling::d", &d, "d"), [false, false]);
    }

    #[test]
    fn empty_cursor_is_no_match() {
        let compiled = compile_uncached("//a").unwrap();
        assert!(!matches(&compiled, &Cursor::<SimpleNode>::new(Vec::new())));
    }

    #[test]
    fn matcher_with_bad_expression_never_matches() {
        let d = tree();
        let m = XPathMatcher::new("foo()");
        assert!(m.compiled().is_none());
        assert!(!m.matches(&d.find("a").unwrap().cursor()));
    }
}
