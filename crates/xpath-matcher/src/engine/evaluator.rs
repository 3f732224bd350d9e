//! Forward evaluation of predicates, boolean expressions and filter inputs.
//!
//! Values follow XPath 1.0: booleans, numbers (`f64`), strings and node
//! sets. Node sets are selections of [`Position`]s so that the ancestry of a
//! selected node stays known.

use std::borrow::Cow;
use std::cell::Cell;
use std::sync::Arc;

use tracing::warn;

use super::cursor::Position;
use super::matcher::matches_node;
use crate::cache;
use crate::compiler::ir::{
    Axis, CompiledExpr, CompiledFilterExpr, CompiledStep, CompiledXPath, ComparisonOp, FunctionType, NameTest,
    StepKind, XPathBody,
};
use crate::model::{NodeKind, XmlNode};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// ===== Scalars =====

/// Non-node value. Shared with compile-time constant folding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    fn to_boolean(&self) -> bool {
        match self {
            Scalar::Boolean(b) => *b,
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::String(s) => !s.is_empty(),
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Scalar::Boolean(b) => f64::from(u8::from(*b)),
            Scalar::Number(n) => *n,
            Scalar::String(s) => string_to_number(s),
        }
    }

    fn to_text(&self) -> Cow<'_, str> {
        match self {
            Scalar::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Scalar::Number(n) => Cow::Owned(number_to_string(*n)),
            Scalar::String(s) => Cow::Borrowed(s),
        }
    }
}

/// XPath 1.0 comparison of two non-node values.
#[allow(clippy::float_cmp)]
pub(crate) fn compare_scalars(left: &Scalar, op: ComparisonOp, right: &Scalar) -> bool {
    match op {
        ComparisonOp::Eq | ComparisonOp::Ne => {
            let equal = match (left, right) {
                (Scalar::Boolean(_), _) | (_, Scalar::Boolean(_)) => left.to_boolean() == right.to_boolean(),
                (Scalar::Number(_), _) | (_, Scalar::Number(_)) => left.to_number() == right.to_number(),
                _ => left.to_text() == right.to_text(),
            };
            equal == (op == ComparisonOp::Eq)
        }
        ComparisonOp::Lt => left.to_number() < right.to_number(),
        ComparisonOp::Le => left.to_number() <= right.to_number(),
        ComparisonOp::Gt => left.to_number() > right.to_number(),
        ComparisonOp::Ge => left.to_number() >= right.to_number(),
    }
}

/// `number()` of a string: optional minus, digits with at most one dot, and
/// surrounding whitespace. Anything else is NaN.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if well_formed { trimmed.parse().unwrap_or(f64::NAN) } else { f64::NAN }
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ===== Values =====

#[derive(Debug, Clone)]
pub(crate) enum Value<'c, N> {
    Boolean(bool),
    Number(f64),
    String(String),
    Nodes(Vec<Position<'c, N>>),
}

impl<'c, N: XmlNode> Value<'c, N> {
    pub(crate) fn to_boolean(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => Scalar::Number(*n).to_boolean(),
            Value::String(s) => !s.is_empty(),
        }
    }

    fn into_scalar(self) -> Scalar {
        match self {
            Value::Boolean(b) => Scalar::Boolean(b),
            Value::Number(n) => Scalar::Number(n),
            Value::String(s) => Scalar::String(s),
            Value::Nodes(nodes) => Scalar::String(nodes.first().map(Position::string_value).unwrap_or_default()),
        }
    }

    fn into_string(self) -> String {
        match self.into_scalar() {
            Scalar::String(s) => s,
            other => other.to_text().into_owned(),
        }
    }

    pub(crate) fn into_nodes(self) -> Vec<Position<'c, N>> {
        match self {
            Value::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }
}

fn compare<N: XmlNode>(left: Value<'_, N>, op: ComparisonOp, right: Value<'_, N>) -> bool {
    match (left, right) {
        (Value::Nodes(l), Value::Nodes(r)) => {
            let right_values: Vec<Scalar> = r.iter().map(|p| Scalar::String(p.string_value())).collect();
            l.iter().any(|p| {
                let value = Scalar::String(p.string_value());
                right_values.iter().any(|rv| compare_scalars(&value, op, rv))
            })
        }
        (Value::Nodes(nodes), other) => {
            let other = other.into_scalar();
            existential(&nodes, &other, |node| compare_scalars(node, op, &other))
        }
        (other, Value::Nodes(nodes)) => {
            let other = other.into_scalar();
            existential(&nodes, &other, |node| compare_scalars(&other, op, node))
        }
        (l, r) => compare_scalars(&l.into_scalar(), op, &r.into_scalar()),
    }
}

/// Node set against a scalar: a boolean compares with the set's emptiness,
/// numbers and strings compare with each node's string value.
fn existential<N: XmlNode>(nodes: &[Position<'_, N>], other: &Scalar, test: impl Fn(&Scalar) -> bool) -> bool {
    match other {
        Scalar::Boolean(_) => test(&Scalar::Boolean(!nodes.is_empty())),
        Scalar::Number(_) => nodes.iter().any(|p| test(&Scalar::Number(string_to_number(&p.string_value())))),
        Scalar::String(_) => nodes.iter().any(|p| test(&Scalar::String(p.string_value()))),
    }
}

// ===== Focus =====

#[derive(Debug, Clone, Copy)]
enum Proximity<'s> {
    Fixed { position: usize, size: usize },
    /// Position among the siblings that pass this step's node test.
    AmongSiblings(&'s CompiledStep),
}

/// Context node plus lazily computed context position and size.
pub(crate) struct Focus<'f, 'c, N> {
    pos: &'f Position<'c, N>,
    proximity: Proximity<'f>,
    resolved: Cell<Option<(usize, usize)>>,
}

impl<'f, 'c, N: XmlNode> Focus<'f, 'c, N> {
    pub(crate) fn single(pos: &'f Position<'c, N>) -> Self {
        Self::at(pos, 1, 1)
    }

    pub(crate) fn at(pos: &'f Position<'c, N>, position: usize, size: usize) -> Self {
        Self { pos, proximity: Proximity::Fixed { position, size }, resolved: Cell::new(None) }
    }

    pub(crate) fn among_siblings(pos: &'f Position<'c, N>, step: &'f CompiledStep) -> Self {
        Self { pos, proximity: Proximity::AmongSiblings(step), resolved: Cell::new(None) }
    }

    fn proximity(&self) -> (usize, usize) {
        if let Some(resolved) = self.resolved.get() {
            return resolved;
        }
        let resolved = match self.proximity {
            Proximity::Fixed { position, size } => (position, size),
            Proximity::AmongSiblings(step) => sibling_proximity(self.pos, step),
        };
        self.resolved.set(Some(resolved));
        resolved
    }

    fn position(&self) -> usize {
        self.proximity().0
    }

    fn size(&self) -> usize {
        self.proximity().1
    }
}

fn sibling_proximity<N: XmlNode>(pos: &Position<'_, N>, step: &CompiledStep) -> (usize, usize) {
    if step.stays_in_place() {
        return (1, 1);
    }
    let (Some(me), Some(parent)) = (pos.node(), pos.parent()) else {
        return (1, 1);
    };
    let siblings = if step.kind() == StepKind::AttributeStep {
        parent.attribute_nodes()
    } else {
        parent.child_nodes()
    };
    let mut position = 0;
    let mut size = 0;
    for sibling in siblings.iter().filter(|s| matches_node(step, Some(*s))) {
        size += 1;
        if sibling == me {
            position = size;
        }
    }
    (position, size)
}

// ===== Evaluation =====

/// Predicate truth: a number tests the context position, anything else
/// converts with `boolean()`.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
pub(crate) fn predicate_holds<N: XmlNode>(expr: &CompiledExpr, focus: &Focus<'_, '_, N>) -> bool {
    match evaluate(expr, focus) {
        Value::Number(n) => n == focus.position() as f64,
        other => other.to_boolean(),
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn evaluate<'c, N: XmlNode>(expr: &CompiledExpr, focus: &Focus<'_, 'c, N>) -> Value<'c, N> {
    let pos = focus.pos;
    match expr {
        CompiledExpr::Numeric(n) => Value::Number(*n as f64),
        CompiledExpr::String(s) => Value::String(s.clone()),
        CompiledExpr::Boolean(b) => Value::Boolean(*b),
        CompiledExpr::Comparison { left, op, right } => {
            Value::Boolean(compare(evaluate(left, focus), *op, evaluate(right, focus)))
        }
        CompiledExpr::And(l, r) => Value::Boolean(evaluate(l, focus).to_boolean() && evaluate(r, focus).to_boolean()),
        CompiledExpr::Or(l, r) => Value::Boolean(evaluate(l, focus).to_boolean() || evaluate(r, focus).to_boolean()),
        CompiledExpr::Attribute(test) => Value::Nodes(pos.attributes().filter(|a| has_name(a, test)).collect()),
        CompiledExpr::Child(test) => Value::Nodes(
            pos.children()
                .filter(|c| c.node().is_some_and(|n| n.kind() == NodeKind::Element) && has_name(c, test))
                .collect(),
        ),
        CompiledExpr::Parent => Value::Nodes(pos.parent().into_iter().collect()),
        CompiledExpr::SelfNode => Value::Nodes(vec![pos.clone()]),
        CompiledExpr::Path { steps, terminal } => {
            let mut nodes = select_steps(vec![pos.clone()], steps);
            if let Some(terminal) = terminal {
                nodes = nodes.iter().flat_map(|p| typed_children(p, *terminal)).collect();
            }
            Value::Nodes(nodes)
        }
        CompiledExpr::AbsolutePath(text) => {
            let doc = pos.document_position();
            Value::Nodes(resolve(text).map(|c| select_compiled(&c, &doc)).unwrap_or_default())
        }
        CompiledExpr::Function { function, args } => call(*function, args, focus),
    }
}

fn has_name<N: XmlNode>(pos: &Position<'_, N>, test: &NameTest) -> bool {
    pos.node().and_then(XmlNode::name).is_some_and(|n| test.matches(n))
}

fn typed_children<'c, N: XmlNode>(pos: &Position<'c, N>, function: FunctionType) -> Vec<Position<'c, N>> {
    let Some(test) = function.node_type() else {
        return Vec::new();
    };
    pos.children()
        .filter(|c| c.node().is_some_and(|n| super::matcher::kind_test(test, n.kind(), false)))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn call<'c, N: XmlNode>(function: FunctionType, args: &[CompiledExpr], focus: &Focus<'_, 'c, N>) -> Value<'c, N> {
    let string_arg = |i: usize| args.get(i).map(|a| evaluate(a, focus).into_string()).unwrap_or_default();
    // Zero-argument forms default to the context node.
    let subject = || match args.first() {
        Some(arg) => evaluate(arg, focus).into_nodes().into_iter().next(),
        None => Some(focus.pos.clone()),
    };
    let context_string = || match args.first() {
        Some(arg) => evaluate(arg, focus).into_string(),
        None => focus.pos.string_value(),
    };

    match function {
        FunctionType::Position => Value::Number(focus.position() as f64),
        FunctionType::Last => Value::Number(focus.size() as f64),
        FunctionType::LocalName => Value::String(
            subject()
                .and_then(|p| p.node().and_then(XmlNode::local_name).map(str::to_owned))
                .unwrap_or_default(),
        ),
        FunctionType::NamespaceUri => Value::String(subject().map(|p| namespace_uri(&p)).unwrap_or_default()),
        FunctionType::Contains => Value::Boolean(string_arg(0).contains(string_arg(1).as_str())),
        FunctionType::StartsWith => Value::Boolean(string_arg(0).starts_with(string_arg(1).as_str())),
        FunctionType::EndsWith => Value::Boolean(string_arg(0).ends_with(string_arg(1).as_str())),
        FunctionType::StringLength => Value::Number(context_string().chars().count() as f64),
        FunctionType::SubstringBefore => {
            let (haystack, needle) = (string_arg(0), string_arg(1));
            Value::String(haystack.find(&needle).map(|i| haystack[..i].to_owned()).unwrap_or_default())
        }
        FunctionType::SubstringAfter => {
            let (haystack, needle) = (string_arg(0), string_arg(1));
            Value::String(
                haystack
                    .find(&needle)
                    .map(|i| haystack[i + needle.len()..].to_owned())
                    .unwrap_or_default(),
            )
        }
        FunctionType::Count => {
            Value::Number(args.first().map_or(0, |a| evaluate(a, focus).into_nodes().len()) as f64)
        }
        FunctionType::Not => Value::Boolean(!args.first().is_some_and(|a| evaluate(a, focus).to_boolean())),
        FunctionType::Text | FunctionType::Comment | FunctionType::Node | FunctionType::ProcessingInstruction => {
            Value::Nodes(typed_children(focus.pos, function))
        }
    }
}

/// Resolve the node's literal prefix against `xmlns:prefix` (or `xmlns`)
/// attributes on its ancestor-or-self elements, nearest first. Unprefixed
/// attributes are in no namespace.
fn namespace_uri<N: XmlNode>(pos: &Position<'_, N>) -> String {
    let Some(node) = pos.node() else {
        return String::new();
    };
    let prefix = node.prefix();
    let scope = match node.kind() {
        NodeKind::Element => pos.clone(),
        NodeKind::Attribute if prefix.is_some() => match pos.parent() {
            Some(parent) => parent,
            None => return String::new(),
        },
        _ => return String::new(),
    };
    if prefix == Some("xml") {
        return XML_NAMESPACE.to_owned();
    }
    let declaration = prefix.map_or(Cow::Borrowed("xmlns"), |p| Cow::Owned(format!("xmlns:{p}")));
    std::iter::once(scope.clone())
        .chain(scope.ancestors())
        .find_map(|p| p.node().and_then(|n| n.attribute(&declaration)))
        .map(|decl| decl.string_value())
        .unwrap_or_default()
}

// ===== Forward selection =====

/// Apply `steps` to every context, in order, keeping each node once.
pub(crate) fn select_steps<'c, N: XmlNode>(
    mut contexts: Vec<Position<'c, N>>,
    steps: &[CompiledStep],
) -> Vec<Position<'c, N>> {
    for step in steps {
        let mut next: Vec<Position<'c, N>> = Vec::new();
        for ctx in &contexts {
            let origins = if step.is_descendant() { ctx.descendants_or_self() } else { vec![ctx.clone()] };
            for origin in &origins {
                for selected in select_step(step, origin) {
                    if !next.iter().any(|p| p.same_node(&selected)) {
                        next.push(selected);
                    }
                }
            }
        }
        contexts = next;
        if contexts.is_empty() {
            break;
        }
    }
    contexts
}

fn select_step<'c, N: XmlNode>(step: &CompiledStep, origin: &Position<'c, N>) -> Vec<Position<'c, N>> {
    let candidates: Vec<Position<'c, N>> = match (step.kind(), step.axis()) {
        (StepKind::Dot, _) | (StepKind::AxisStep, Some(Axis::SelfAxis)) => vec![origin.clone()],
        (StepKind::DotDot, _) | (StepKind::AxisStep, Some(Axis::Parent)) => origin.parent().into_iter().collect(),
        (StepKind::AttributeStep, _) => origin.attributes().collect(),
        (StepKind::NameTest | StepKind::NodeTypeTest, _) | (StepKind::AxisStep, Some(Axis::Child)) => {
            origin.children().collect()
        }
        (StepKind::AxisStep, _) => Vec::new(),
    };
    let mut selected: Vec<Position<'c, N>> = candidates.into_iter().filter(|p| matches_node(step, p.node())).collect();
    for predicate in step.predicates() {
        selected = filter_positional(selected, predicate);
    }
    selected
}

/// Keep the nodes for which `predicate` holds, numbering them 1..=len.
fn filter_positional<'c, N: XmlNode>(nodes: Vec<Position<'c, N>>, predicate: &CompiledExpr) -> Vec<Position<'c, N>> {
    let size = nodes.len();
    nodes
        .into_iter()
        .enumerate()
        .filter(|(i, p)| predicate_holds(predicate, &Focus::at(p, i + 1, size)))
        .map(|(_, p)| p)
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn nth_node<N>(nodes: Vec<N>, position: f64) -> Vec<N> {
    nodes.into_iter().enumerate().filter(|(i, _)| (i + 1) as f64 == position).map(|(_, p)| p).collect()
}

/// Look up an expression stored as text. Failures are logged and select nothing.
fn resolve(text: &str) -> Option<Arc<CompiledXPath>> {
    cache::compile(text)
        .inspect_err(|err| warn!(expression = text, error = %err, "stored expression failed to resolve; no match"))
        .ok()
}

/// Nodes selected by a whole compiled expression, evaluated from the document.
pub(crate) fn select_compiled<'c, N: XmlNode>(compiled: &CompiledXPath, doc: &Position<'c, N>) -> Vec<Position<'c, N>> {
    match compiled.body() {
        XPathBody::Path(steps) => select_steps(vec![doc.clone()], steps),
        XPathBody::Filter(filter) => filter_nodes(filter, doc),
        XPathBody::Boolean(_) => Vec::new(),
    }
}

/// Node set of `(inner)[predicates]/trailing`, evaluated from the document.
pub(crate) fn filter_nodes<'c, N: XmlNode>(filter: &CompiledFilterExpr, doc: &Position<'c, N>) -> Vec<Position<'c, N>> {
    let mut nodes = match &filter.primary {
        Some(primary) => evaluate(primary, &Focus::single(doc)).into_nodes(),
        None => match resolve(&filter.inner_text) {
            Some(inner) => select_compiled(&inner, doc),
            None => return Vec::new(),
        },
    };
    for predicate in &filter.predicates {
        if predicate.is_context_free() {
            // Same value for every node; a number still picks a position.
            match evaluate(predicate, &Focus::single(doc)) {
                Value::Number(n) => nodes = nth_node(nodes, n),
                value if value.to_boolean() => {}
                _ => return Vec::new(),
            }
            continue;
        }
        nodes = filter_positional(nodes, predicate);
    }
    if let Some(trailing) = &filter.trailing {
        let Some(path) = resolve(trailing) else {
            return Vec::new();
        };
        let contexts = if filter.trailing_descendant {
            nodes.iter().flat_map(Position::descendants_or_self).collect()
        } else {
            nodes
        };
        nodes = select_steps(contexts, path.steps());
    }
    nodes
}
