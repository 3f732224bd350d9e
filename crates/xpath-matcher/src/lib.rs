//! Compile a subset of XPath 1.0 once, then ask cheaply whether a position in
//! an element tree matches it.
//!
//! Expressions are classified at compile time into location paths, boolean
//! expressions and filter expressions. Location paths are matched bottom-up
//! from the node under the [`Cursor`]; the other two are evaluated with the
//! cursor's node as context.
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;

pub use cache::{DEFAULT_CACHE_CAPACITY, XPathCache, compile, global_cache};
pub use compiler::compile_uncached;
pub use compiler::ir::{
    Axis, ComparisonOp, CompiledExpr, CompiledFilterExpr, CompiledStep, CompiledXPath, FunctionType, MatchStrategy,
    NameTest, NodeTypeTest, PathFlags, StepKind, XPathBody, XPathKind,
};
pub use engine::cursor::Cursor;
pub use engine::matcher::{XPathMatcher, matches};
pub use error::{Arity, Reason, Result, UnsupportedExpression};
pub use model::{NodeKind, XmlNode};
pub use parser::parse_xpath;
