//! AST for the supported XPath 1.0 subset.
//!
//! Single-operand precedence layers are collapsed while building, so the root
//! of `a/b` is a [`Expr::Path`] and the root of `a/b = 'x'` is a
//! [`Expr::GeneralComparison`]. Every binary node records its operator.

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Raw numeral text; the compiler decides whether it is a valid integer.
    Number(String),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralComp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    GeneralComparison {
        left: Box<Expr>,
        op: GeneralComp,
        right: Box<Expr>,
    },
    /// Unary minus.
    Negate(Box<Expr>),
    Union {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Path(PathExpr),
    Filter(FilterExpr),
}

// ===== Paths and steps =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStart {
    Root,
    RootDescendant,
    Relative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub start: PathStart,
    pub steps: Vec<Step>,
    /// Source text of the whole path, trimmed.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Reached through `//` rather than `/`.
    pub descendant: bool,
    pub test: StepTest,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepTest {
    /// `.`
    SelfNode,
    /// `..`
    Parent,
    /// `axis::test`; the axis name is kept verbatim.
    Axis { axis: String, test: NodeTest },
    /// `@name` / `@*`
    Attribute(NameTest),
    /// `text()`, `comment()`, ...
    Kind(KindTest),
    /// `name` / `*`
    Name(NameTest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Name(NameTest),
    Kind(KindTest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    QName(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    AnyKind,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// Bracketed condition. `None` for an empty `[]`, which the compiler rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate(pub Option<Expr>);

// ===== Filter expressions =====

/// `(expr)[pred]*(/|//)path?`, or a bare function call / literal carrying
/// predicates or a trailing path.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub primary: Box<Expr>,
    pub parenthesized: bool,
    /// Verbatim text of the inner expression (without the parentheses).
    pub text: String,
    pub predicates: Vec<Predicate>,
    pub trailing: Option<TrailingPath>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrailingPath {
    pub descendant: bool,
    pub path: PathExpr,
}
