use core::fmt;

use bitflags::bitflags;
use string_cache::DefaultAtom as Atom;

use crate::error::Arity;

bitflags! {
    /// Characteristics of a compiled location path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PathFlags: u8 {
        const ABSOLUTE = 1 << 0;                    // /a
        const DESCENDANT_OR_SELF_ROOTED = 1 << 1;   // //a
        const HAS_DESCENDANT_STEP = 1 << 2;
        const HAS_ABBREVIATED_STEP = 1 << 3;        // . or ..
        const HAS_AXIS_STEP = 1 << 4;
        const HAS_ATTRIBUTE_STEP = 1 << 5;
        const HAS_NODE_TYPE_TEST = 1 << 6;
        const HAS_WILDCARD = 1 << 7;
    }
}

impl PathFlags {
    /// Bits that describe how the path is rooted rather than what its steps are.
    pub const ROOTED: Self = Self::ABSOLUTE.union(Self::DESCENDANT_OR_SELF_ROOTED);

    /// Structural bits derived from a step list. Never sets the rooted bits.
    pub fn from_steps(steps: &[CompiledStep]) -> Self {
        steps.iter().fold(Self::empty(), |mut acc, step| {
            if step.descendant {
                acc |= Self::HAS_DESCENDANT_STEP;
            }
            match step.kind {
                StepKind::Dot | StepKind::DotDot => acc |= Self::HAS_ABBREVIATED_STEP,
                StepKind::AxisStep => acc |= Self::HAS_AXIS_STEP,
                StepKind::AttributeStep => acc |= Self::HAS_ATTRIBUTE_STEP,
                StepKind::NodeTypeTest => acc |= Self::HAS_NODE_TYPE_TEST,
                StepKind::NameTest => {}
            }
            if step.node_type.is_some() {
                acc |= Self::HAS_NODE_TYPE_TEST;
            }
            if matches!(step.name, Some(NameTest::Wildcard)) {
                acc |= Self::HAS_WILDCARD;
            }
            acc
        })
    }

    pub fn is_absolute(self) -> bool {
        self.intersects(Self::ROOTED)
    }
}

// ===== Steps =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Dot,
    DotDot,
    AxisStep,
    AttributeStep,
    NodeTypeTest,
    NameTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Parent,
    SelfAxis,
    Child,
    /// Any other axis name. Compiles, never matches.
    Other,
}

impl Axis {
    pub fn from_name(name: &str) -> Self {
        match name {
            "parent" => Self::Parent,
            "self" => Self::SelfAxis,
            "child" => Self::Child,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Comment,
    Node,
    ProcessingInstruction,
    Unknown,
}

impl NodeTypeTest {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Comment => "comment",
            Self::Node => "node",
            Self::ProcessingInstruction => "processing-instruction",
            Self::Unknown => "unknown",
        }
    }
}

/// Element or attribute name test. Prefixes are compared literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameTest {
    Name(Atom),
    Wildcard,
}

impl NameTest {
    pub fn name(name: &str) -> Self {
        Self::Name(Atom::from(name))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Name(n) => n.as_ref() == candidate,
            Self::Wildcard => true,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Name(n) => n,
            Self::Wildcard => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    NameOnly,
    NameThenPredicates,
    Wildcard,
    PredicatesOnly,
    Dot,
    NodeType,
    Other,
}

impl MatchStrategy {
    fn derive(kind: StepKind, name: Option<&NameTest>, has_predicates: bool) -> Self {
        match kind {
            StepKind::Dot if !has_predicates => Self::Dot,
            StepKind::NodeTypeTest => Self::NodeType,
            StepKind::NameTest | StepKind::AttributeStep => match (name, has_predicates) {
                (Some(NameTest::Wildcard), false) => Self::Wildcard,
                (Some(NameTest::Wildcard), true) => Self::PredicatesOnly,
                (_, false) => Self::NameOnly,
                (_, true) => Self::NameThenPredicates,
            },
            _ => Self::Other,
        }
    }
}

/// One segment of a location path.
///
/// Fields are private so that `strategy` can never drift from
/// `(kind, name, predicates)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    kind: StepKind,
    descendant: bool,
    name: Option<NameTest>,
    axis: Option<Axis>,
    node_type: Option<NodeTypeTest>,
    predicates: Vec<CompiledExpr>,
    strategy: MatchStrategy,
    followed_by_backtrack: bool,
}

impl CompiledStep {
    fn new(kind: StepKind, descendant: bool) -> Self {
        Self {
            kind,
            descendant,
            name: None,
            axis: None,
            node_type: None,
            predicates: Vec::new(),
            strategy: MatchStrategy::derive(kind, None, false),
            followed_by_backtrack: false,
        }
    }

    pub fn dot(descendant: bool) -> Self {
        Self::new(StepKind::Dot, descendant)
    }

    pub fn dotdot(descendant: bool) -> Self {
        Self::new(StepKind::DotDot, descendant)
    }

    pub fn name_test(name: NameTest, descendant: bool) -> Self {
        Self { name: Some(name), ..Self::new(StepKind::NameTest, descendant) }.refreshed()
    }

    pub fn attribute(name: NameTest, descendant: bool) -> Self {
        Self { name: Some(name), ..Self::new(StepKind::AttributeStep, descendant) }.refreshed()
    }

    pub fn node_type_test(test: NodeTypeTest, descendant: bool) -> Self {
        Self { node_type: Some(test), ..Self::new(StepKind::NodeTypeTest, descendant) }
    }

    /// `axis::name` or `axis::*`.
    pub fn axis_name(axis: Axis, name: NameTest, descendant: bool) -> Self {
        Self { axis: Some(axis), name: Some(name), ..Self::new(StepKind::AxisStep, descendant) }
    }

    /// `axis::text()` and friends.
    pub fn axis_node_type(axis: Axis, test: NodeTypeTest, descendant: bool) -> Self {
        Self { axis: Some(axis), node_type: Some(test), ..Self::new(StepKind::AxisStep, descendant) }
    }

    #[must_use]
    pub fn with_predicates(mut self, predicates: Vec<CompiledExpr>) -> Self {
        self.predicates = predicates;
        self.refreshed()
    }

    /// Append a predicate. Only used while the step list is still being built.
    pub(crate) fn push_predicate(&mut self, predicate: CompiledExpr) {
        self.predicates.push(predicate);
        self.strategy = MatchStrategy::derive(self.kind, self.name.as_ref(), true);
    }

    pub(crate) fn take_predicates(&mut self) -> Vec<CompiledExpr> {
        let taken = core::mem::take(&mut self.predicates);
        self.strategy = MatchStrategy::derive(self.kind, self.name.as_ref(), false);
        taken
    }

    fn refreshed(mut self) -> Self {
        self.strategy = MatchStrategy::derive(self.kind, self.name.as_ref(), !self.predicates.is_empty());
        self
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn is_descendant(&self) -> bool {
        self.descendant
    }

    pub fn name(&self) -> Option<&NameTest> {
        self.name.as_ref()
    }

    pub fn axis(&self) -> Option<Axis> {
        self.axis
    }

    pub fn node_type(&self) -> Option<NodeTypeTest> {
        self.node_type
    }

    pub fn predicates(&self) -> &[CompiledExpr] {
        &self.predicates
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// The next step in the path ascends (`..` or `parent::`).
    pub fn followed_by_backtrack(&self) -> bool {
        self.followed_by_backtrack
    }

    pub fn is_backtrack(&self) -> bool {
        self.kind == StepKind::DotDot || self.axis == Some(Axis::Parent)
    }

    /// `.`, `self::` and the backtrack steps evaluate at a position already
    /// reached instead of moving down to a child.
    pub fn stays_in_place(&self) -> bool {
        matches!(self.kind, StepKind::Dot | StepKind::DotDot)
            || matches!(self.axis, Some(Axis::SelfAxis | Axis::Parent))
    }

    /// A `/`-reached element name test.
    pub(crate) fn is_plain_child(&self) -> bool {
        self.kind == StepKind::NameTest && !self.descendant
    }

    /// Whether the step's own predicates depend on the context position.
    pub fn needs_position(&self) -> bool {
        self.predicates.iter().any(CompiledExpr::needs_position)
    }
}

/// Set the backtrack lookahead on every step and publish the list.
pub(crate) fn freeze(mut steps: Vec<CompiledStep>) -> Box<[CompiledStep]> {
    let mut next_is_backtrack = false;
    for step in steps.iter_mut().rev() {
        step.followed_by_backtrack = next_is_backtrack;
        next_is_backtrack = step.is_backtrack();
    }
    steps.into_boxed_slice()
}

impl fmt::Display for CompiledStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_ref().map_or("*", NameTest::as_str);
        match self.kind {
            StepKind::Dot => f.write_str(".")?,
            StepKind::DotDot => f.write_str("..")?,
            StepKind::AttributeStep => write!(f, "@{name}")?,
            StepKind::NameTest => f.write_str(name)?,
            StepKind::NodeTypeTest => {
                write!(f, "{}()", self.node_type.unwrap_or(NodeTypeTest::Unknown).name())?;
            }
            StepKind::AxisStep => {
                let axis = match self.axis {
                    Some(Axis::Parent) => "parent",
                    Some(Axis::SelfAxis) => "self",
                    Some(Axis::Child) => "child",
                    Some(Axis::Other) | None => "other",
                };
                match self.node_type {
                    Some(t) => write!(f, "{axis}::{}()", t.name())?,
                    None => write!(f, "{axis}::{name}")?,
                }
            }
        }
        for p in &self.predicates {
            write!(f, "[{p}]")?;
        }
        Ok(())
    }
}

// ===== Expressions =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionType {
    Position,
    Last,
    LocalName,
    NamespaceUri,
    Contains,
    StartsWith,
    EndsWith,
    StringLength,
    SubstringBefore,
    SubstringAfter,
    Count,
    Text,
    Not,
    Comment,
    Node,
    ProcessingInstruction,
}

impl FunctionType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "position" => Self::Position,
            "last" => Self::Last,
            "local-name" => Self::LocalName,
            "namespace-uri" => Self::NamespaceUri,
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            "ends-with" => Self::EndsWith,
            "string-length" => Self::StringLength,
            "substring-before" => Self::SubstringBefore,
            "substring-after" => Self::SubstringAfter,
            "count" => Self::Count,
            "text" => Self::Text,
            "not" => Self::Not,
            "comment" => Self::Comment,
            "node" => Self::Node,
            "processing-instruction" => Self::ProcessingInstruction,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Last => "last",
            Self::LocalName => "local-name",
            Self::NamespaceUri => "namespace-uri",
            Self::Contains => "contains",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
            Self::StringLength => "string-length",
            Self::SubstringBefore => "substring-before",
            Self::SubstringAfter => "substring-after",
            Self::Count => "count",
            Self::Text => "text",
            Self::Not => "not",
            Self::Comment => "comment",
            Self::Node => "node",
            Self::ProcessingInstruction => "processing-instruction",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::Position | Self::Last | Self::Text | Self::Comment | Self::Node => Arity::exactly(0),
            Self::LocalName | Self::NamespaceUri | Self::StringLength | Self::ProcessingInstruction => {
                Arity::between(0, 1)
            }
            Self::Count | Self::Not => Arity::exactly(1),
            Self::Contains | Self::StartsWith | Self::EndsWith | Self::SubstringBefore | Self::SubstringAfter => {
                Arity::exactly(2)
            }
        }
    }

    /// Node-type tests that double as functions (`text()`, `node()`, ...).
    pub fn node_type(self) -> Option<NodeTypeTest> {
        match self {
            Self::Text => Some(NodeTypeTest::Text),
            Self::Comment => Some(NodeTypeTest::Comment),
            Self::Node => Some(NodeTypeTest::Node),
            Self::ProcessingInstruction => Some(NodeTypeTest::ProcessingInstruction),
            _ => None,
        }
    }
}

/// Predicate / boolean sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpr {
    Numeric(i64),
    String(String),
    Comparison {
        left: Box<CompiledExpr>,
        op: ComparisonOp,
        right: Box<CompiledExpr>,
    },
    And(Box<CompiledExpr>, Box<CompiledExpr>),
    Or(Box<CompiledExpr>, Box<CompiledExpr>),
    Function {
        function: FunctionType,
        args: Vec<CompiledExpr>,
    },
    /// `@name` / `@*`
    Attribute(NameTest),
    /// `name` / `*` (single child step)
    Child(NameTest),
    Path {
        steps: Box<[CompiledStep]>,
        terminal: Option<FunctionType>,
    },
    /// Path text beginning with `/`, resolved against the document at match time.
    AbsolutePath(String),
    Boolean(bool),
    Parent,
    SelfNode,
}

impl CompiledExpr {
    pub fn needs_position(&self) -> bool {
        match self {
            Self::Numeric(_) => true,
            Self::Function { function, .. } => matches!(function, FunctionType::Position | FunctionType::Last),
            Self::Comparison { left, right, .. } | Self::And(left, right) | Self::Or(left, right) => {
                left.needs_position() || right.needs_position()
            }
            _ => false,
        }
    }

    pub fn has_relative_path(&self) -> bool {
        match self {
            Self::Child(_) | Self::Path { .. } => true,
            Self::Comparison { left, right, .. } | Self::And(left, right) | Self::Or(left, right) => {
                left.has_relative_path() || right.has_relative_path()
            }
            Self::Function { args, .. } => args.iter().any(Self::has_relative_path),
            _ => false,
        }
    }

    /// Evaluates to the same value regardless of the context node or position.
    pub fn is_context_free(&self) -> bool {
        match self {
            Self::String(_) | Self::Boolean(_) | Self::AbsolutePath(_) => true,
            Self::Comparison { left, right, .. } | Self::And(left, right) | Self::Or(left, right) => {
                left.is_context_free() && right.is_context_free()
            }
            Self::Function { function, args } => {
                function.node_type().is_none()
                    && !matches!(function, FunctionType::Position | FunctionType::Last)
                    && !args.is_empty()
                    && args.iter().all(Self::is_context_free)
            }
            _ => false,
        }
    }
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::String(s) if s.contains('\'') => write!(f, "\"{s}\""),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Comparison { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::And(l, r) => write!(f, "({l} and {r})"),
            Self::Or(l, r) => write!(f, "({l} or {r})"),
            Self::Function { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            Self::Attribute(n) => write!(f, "@{}", n.as_str()),
            Self::Child(n) => f.write_str(n.as_str()),
            Self::Path { steps, terminal } => {
                for (i, s) in steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(if s.is_descendant() { "//" } else { "/" })?;
                    }
                    write!(f, "{s}")?;
                }
                if let Some(t) = terminal {
                    write!(f, "/{}()", t.name())?;
                }
                Ok(())
            }
            Self::AbsolutePath(text) => f.write_str(text),
            Self::Boolean(b) => write!(f, "{b}()"),
            Self::Parent => f.write_str(".."),
            Self::SelfNode => f.write_str("."),
        }
    }
}

// ===== Top level =====

/// `(inner)[pred]*(/|//)trailing?`, or a bare function call / literal.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilterExpr {
    /// Source text of the inner expression, re-resolved against the document.
    pub inner_text: String,
    /// Compiled form of a bare function call or literal inner term.
    pub primary: Option<CompiledExpr>,
    pub predicates: Vec<CompiledExpr>,
    pub trailing: Option<String>,
    pub trailing_descendant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathKind {
    Path,
    Boolean,
    Filter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XPathBody {
    Path(Box<[CompiledStep]>),
    Boolean(CompiledExpr),
    Filter(CompiledFilterExpr),
}

/// Immutable compiled form of one expression string.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledXPath {
    source: String,
    flags: PathFlags,
    body: XPathBody,
}

impl CompiledXPath {
    pub(crate) fn new(source: impl Into<String>, flags: PathFlags, body: XPathBody) -> Self {
        Self { source: source.into(), flags, body }
    }

    pub fn kind(&self) -> XPathKind {
        match self.body {
            XPathBody::Path(_) => XPathKind::Path,
            XPathBody::Boolean(_) => XPathKind::Boolean,
            XPathBody::Filter(_) => XPathKind::Filter,
        }
    }

    pub fn body(&self) -> &XPathBody {
        &self.body
    }

    /// Root-to-leaf steps; empty unless the kind is [`XPathKind::Path`].
    pub fn steps(&self) -> &[CompiledStep] {
        match &self.body {
            XPathBody::Path(steps) => steps,
            _ => &[],
        }
    }

    pub fn boolean_expr(&self) -> Option<&CompiledExpr> {
        match &self.body {
            XPathBody::Boolean(e) => Some(e),
            _ => None,
        }
    }

    pub fn filter_expr(&self) -> Option<&CompiledFilterExpr> {
        match &self.body {
            XPathBody::Filter(f) => Some(f),
            _ => None,
        }
    }

    pub fn flags(&self) -> PathFlags {
        self.flags
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for CompiledXPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
