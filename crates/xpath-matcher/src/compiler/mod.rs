use tracing::trace;

use crate::error::{Reason, Result, UnsupportedExpression};
use crate::parser::{ast, parse_xpath};

pub mod ir;

mod expr;
mod normalize;
mod step;

use ir::{CompiledFilterExpr, CompiledXPath, PathFlags, XPathBody};

/// Compile without consulting or filling any cache.
///
/// `compile_uncached(e)` always returns a structurally equal value for the same
/// `e`; see [`crate::compile`] for the memoized entry point.
pub fn compile_uncached(expr: &str) -> Result<CompiledXPath> {
    let ast = parse_xpath(expr)?;
    Compiler::new(expr).compile(&ast)
}

struct Compiler<'a> {
    source: &'a str,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn error(&self, reason: Reason) -> UnsupportedExpression {
        UnsupportedExpression::new(self.source, reason)
    }

    fn unsupported(&self, what: impl Into<String>) -> UnsupportedExpression {
        UnsupportedExpression::construct(self.source, what)
    }

    /// Collapse to the simplest kind: a lone location path is a `Path`, a lone
    /// function call, literal or parenthesized term is a `Filter`, anything
    /// with an operator is `Boolean`.
    fn compile(&self, ast: &ast::Expr) -> Result<CompiledXPath> {
        match ast {
            ast::Expr::Path(path) => self.compile_location_path(path),
            ast::Expr::FunctionCall { .. } | ast::Expr::Literal(_) | ast::Expr::Filter(_) => {
                let filter = self.compile_filter(ast)?;
                Ok(CompiledXPath::new(self.source, PathFlags::empty(), XPathBody::Filter(filter)))
            }
            _ => {
                let expr = self.compile_expr(ast)?;
                Ok(CompiledXPath::new(self.source, PathFlags::empty(), XPathBody::Boolean(expr)))
            }
        }
    }

    fn compile_location_path(&self, path: &ast::PathExpr) -> Result<CompiledXPath> {
        if path.steps.is_empty() {
            return Err(self.unsupported("the bare root path `/`"));
        }
        let rooted = match path.start {
            ast::PathStart::Root => PathFlags::ABSOLUTE,
            ast::PathStart::RootDescendant => PathFlags::DESCENDANT_OR_SELF_ROOTED,
            ast::PathStart::Relative => PathFlags::empty(),
        };
        let steps = path.steps.iter().map(|s| self.compile_step(s)).collect::<Result<Vec<_>>>()?;
        let compiled = rooted | PathFlags::from_steps(&steps);

        let steps = normalize::normalize(steps);
        let flags = (compiled & PathFlags::ROOTED) | PathFlags::from_steps(&steps);
        if flags != compiled {
            trace!(source = self.source, before = ?compiled, after = ?flags, "path flags changed by normalization");
        }
        Ok(CompiledXPath::new(self.source, flags, XPathBody::Path(ir::freeze(steps))))
    }

    fn compile_filter(&self, ast: &ast::Expr) -> Result<CompiledFilterExpr> {
        let ast::Expr::Filter(filter) = ast else {
            return Ok(CompiledFilterExpr {
                inner_text: self.source.trim().to_owned(),
                primary: Some(self.compile_expr(ast)?),
                predicates: Vec::new(),
                trailing: None,
                trailing_descendant: false,
            });
        };

        let primary = if filter.parenthesized {
            // Only validated here; the text is resolved again at match time.
            self.compile(&filter.primary)?;
            None
        } else {
            Some(self.compile_expr(&filter.primary)?)
        };
        let predicates = self.compile_predicates(&filter.predicates)?;
        let (trailing, trailing_descendant) = match &filter.trailing {
            Some(t) => {
                self.compile_location_path(&t.path)?;
                (Some(t.path.text.clone()), t.descendant)
            }
            None => (None, false),
        };
        Ok(CompiledFilterExpr {
            inner_text: filter.text.clone(),
            primary,
            predicates,
            trailing,
            trailing_descendant,
        })
    }
}
