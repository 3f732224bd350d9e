use core::fmt;

/// Compile-time rejection of an expression outside the supported XPath subset.
///
/// This is the only error the crate produces. Matching never fails: an
/// expression either matches a cursor position or it does not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported XPath expression `{expression}`: {reason}")]
pub struct UnsupportedExpression {
    pub expression: String,
    pub reason: Reason,
}

/// What exactly made an expression unsupported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reason {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("expression is empty")]
    Empty,
    #[error("empty predicate `[]`")]
    EmptyPredicate,
    #[error("unknown function `{0}()`")]
    UnknownFunction(String),
    #[error("function `{name}()` called with {given} argument(s), expected {expected}")]
    WrongArity {
        name: String,
        given: usize,
        expected: Arity,
    },
    #[error("malformed numeric literal `{0}`")]
    MalformedNumber(String),
    #[error("{0} is not supported")]
    Construct(String),
}

/// Accepted argument count range of a built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn accepts(self, argc: usize) -> bool {
        (self.min..=self.max).contains(&argc)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

impl UnsupportedExpression {
    pub fn new(expression: impl Into<String>, reason: Reason) -> Self {
        Self {
            expression: expression.into(),
            reason,
        }
    }

    pub fn construct(expression: impl Into<String>, what: impl Into<String>) -> Self {
        Self::new(expression, Reason::Construct(what.into()))
    }
}

pub type Result<T> = core::result::Result<T, UnsupportedExpression>;
