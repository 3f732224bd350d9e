use pest::Parser;
use pest::error::{Error, LineColLocation};
use pest::iterators::{Pair, Pairs};

use crate::error::{Reason, Result, UnsupportedExpression};

pub mod ast;

#[derive(pest_derive::Parser)]
#[grammar = "xpath.pest"]
pub struct XPathParser;

/// Parse an expression of the supported subset into its AST.
///
/// Blank input is rejected with [`Reason::Empty`]; anything the grammar does
/// not accept is a [`Reason::Syntax`] error carrying the pest message and the
/// line/column it refers to.
pub fn parse_xpath(input: &str) -> Result<ast::Expr> {
    if input.trim().is_empty() {
        return Err(UnsupportedExpression::new(input, Reason::Empty));
    }
    let mut pairs = XPathParser::parse(Rule::xpath, input).map_err(|e| syntax_error(input, &e))?;
    let builder = AstBuilder { input };
    let root = pairs.next().ok_or_else(|| builder.missing("expression"))?;
    debug_assert_eq!(root.as_rule(), Rule::xpath);
    let expr = builder.only_child(root)?;
    builder.expr(expr)
}

fn syntax_error(input: &str, err: &Error<Rule>) -> UnsupportedExpression {
    let (line, col) = match err.line_col {
        LineColLocation::Pos(pos) | LineColLocation::Span(pos, _) => pos,
    };
    UnsupportedExpression::new(
        input,
        Reason::Syntax(format!("{} at {line}:{col}", err.variant.message())),
    )
}

struct AstBuilder<'i> {
    input: &'i str,
}

impl<'i> AstBuilder<'i> {
    fn unexpected(&self, pair: &Pair<'i, Rule>) -> UnsupportedExpression {
        UnsupportedExpression::new(
            self.input,
            Reason::Syntax(format!("unexpected {:?} `{}`", pair.as_rule(), pair.as_str())),
        )
    }

    fn missing(&self, what: &str) -> UnsupportedExpression {
        UnsupportedExpression::new(self.input, Reason::Syntax(format!("missing {what}")))
    }

    fn next(&self, pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>> {
        pairs.next().ok_or_else(|| self.missing(what))
    }

    fn only_child(&self, pair: Pair<'i, Rule>) -> Result<Pair<'i, Rule>> {
        let rule = pair.as_rule();
        pair.into_inner()
            .next()
            .ok_or_else(|| self.missing(&format!("operand of {rule:?}")))
    }

    // ====== Expressions ======

    fn expr(&self, pair: Pair<'i, Rule>) -> Result<ast::Expr> {
        match pair.as_rule() {
            Rule::expr | Rule::path_expr => {
                let inner = self.only_child(pair)?;
                self.expr(inner)
            }
            Rule::or_expr => self.logical(pair, ast::BinaryOp::Or),
            Rule::and_expr => self.logical(pair, ast::BinaryOp::And),
            Rule::equality_expr | Rule::relational_expr => self.comparison(pair),
            Rule::unary_expr => self.unary(pair),
            Rule::union_expr => self.union(pair),
            Rule::filter_path => self.filter_path(pair),
            Rule::location_path => Ok(ast::Expr::Path(self.location_path(pair)?)),
            _ => Err(self.unexpected(&pair)),
        }
    }

    fn logical(&self, pair: Pair<'i, Rule>, op: ast::BinaryOp) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let mut left = self.expr(self.next(&mut inner, "operand")?)?;
        while let Some(keyword) = inner.next() {
            debug_assert!(matches!(keyword.as_rule(), Rule::K_OR | Rule::K_AND));
            let right = self.expr(self.next(&mut inner, "right operand")?)?;
            left = ast::Expr::Binary { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok(left)
    }

    fn comparison(&self, pair: Pair<'i, Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let mut left = self.expr(self.next(&mut inner, "operand")?)?;
        while let Some(op_pair) = inner.next() {
            let op = self.comparison_op(op_pair)?;
            let right = self.expr(self.next(&mut inner, "right operand")?)?;
            left = ast::Expr::GeneralComparison { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok(left)
    }

    fn comparison_op(&self, pair: Pair<'i, Rule>) -> Result<ast::GeneralComp> {
        let token = self.only_child(pair)?;
        Ok(match token.as_rule() {
            Rule::OP_EQ => ast::GeneralComp::Eq,
            Rule::OP_NE => ast::GeneralComp::Ne,
            Rule::OP_LT => ast::GeneralComp::Lt,
            Rule::OP_LTE => ast::GeneralComp::Le,
            Rule::OP_GT => ast::GeneralComp::Gt,
            Rule::OP_GTE => ast::GeneralComp::Ge,
            _ => return Err(self.unexpected(&token)),
        })
    }

    fn unary(&self, pair: Pair<'i, Rule>) -> Result<ast::Expr> {
        let mut negations = 0usize;
        let mut operand = None;
        for p in pair.into_inner() {
            if p.as_rule() == Rule::OP_MINUS {
                negations += 1;
            } else {
                operand = Some(self.expr(p)?);
            }
        }
        let mut expr = operand.ok_or_else(|| self.missing("operand of unary minus"))?;
        for _ in 0..negations {
            expr = ast::Expr::Negate(Box::new(expr));
        }
        Ok(expr)
    }

    fn union(&self, pair: Pair<'i, Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let mut left = self.expr(self.next(&mut inner, "operand")?)?;
        while let Some(pipe) = inner.next() {
            debug_assert_eq!(pipe.as_rule(), Rule::OP_PIPE);
            let right = self.expr(self.next(&mut inner, "right operand of `|`")?)?;
            left = ast::Expr::Union { left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn filter_path(&self, pair: Pair<'i, Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let filter = self.next(&mut inner, "filter expression")?;
        let trailing = match inner.next() {
            Some(sep) => {
                let descendant = self.separator(sep)?;
                let rel = self.next(&mut inner, "trailing path")?;
                Some(ast::TrailingPath { descendant, path: self.relative_path(rel)? })
            }
            None => None,
        };

        let mut parts = filter.into_inner();
        let primary = self.only_child(self.next(&mut parts, "primary expression")?)?;
        let predicates = parts.map(|p| self.predicate(p)).collect::<Result<Vec<_>>>()?;

        let (primary, parenthesized, text) = if primary.as_rule() == Rule::parenthesized_expr {
            let inner_expr = self.only_child(primary)?;
            let text = inner_expr.as_str().trim().to_owned();
            (self.expr(inner_expr)?, true, text)
        } else {
            let text = primary.as_str().trim().to_owned();
            (self.primary(primary)?, false, text)
        };

        if !parenthesized && predicates.is_empty() && trailing.is_none() {
            return Ok(primary);
        }
        Ok(ast::Expr::Filter(ast::FilterExpr {
            primary: Box::new(primary),
            parenthesized,
            text,
            predicates,
            trailing,
        }))
    }

    fn primary(&self, pair: Pair<'i, Rule>) -> Result<ast::Expr> {
        match pair.as_rule() {
            Rule::string_literal => Ok(ast::Expr::Literal(ast::Literal::String(string_literal(pair)))),
            Rule::number => Ok(ast::Expr::Literal(ast::Literal::Number(pair.as_str().to_owned()))),
            Rule::function_call => {
                let mut inner = pair.into_inner();
                let name = self.next(&mut inner, "function name")?.as_str().to_owned();
                let args = inner.map(|a| self.expr(a)).collect::<Result<Vec<_>>>()?;
                Ok(ast::Expr::FunctionCall { name, args })
            }
            _ => Err(self.unexpected(&pair)),
        }
    }

    // ====== Paths ======

    fn location_path(&self, pair: Pair<'i, Rule>) -> Result<ast::PathExpr> {
        let text = pair.as_str().trim().to_owned();
        let path = self.only_child(pair)?;
        match path.as_rule() {
            Rule::absolute_path => {
                let mut inner = path.into_inner();
                let root = self.next(&mut inner, "path root")?;
                let start = if root.as_rule() == Rule::OP_DSLASH {
                    ast::PathStart::RootDescendant
                } else {
                    ast::PathStart::Root
                };
                let mut steps = match inner.next() {
                    Some(rel) => self.steps(rel)?,
                    None => Vec::new(),
                };
                if start == ast::PathStart::RootDescendant
                    && let Some(first) = steps.first_mut()
                {
                    first.descendant = true;
                }
                Ok(ast::PathExpr { start, steps, text })
            }
            Rule::relative_path => Ok(ast::PathExpr { start: ast::PathStart::Relative, steps: self.steps(path)?, text }),
            _ => Err(self.unexpected(&path)),
        }
    }

    fn relative_path(&self, pair: Pair<'i, Rule>) -> Result<ast::PathExpr> {
        let text = pair.as_str().trim().to_owned();
        Ok(ast::PathExpr { start: ast::PathStart::Relative, steps: self.steps(pair)?, text })
    }

    /// `/` → false, `//` → true.
    fn separator(&self, pair: Pair<'i, Rule>) -> Result<bool> {
        let token = self.only_child(pair)?;
        match token.as_rule() {
            Rule::OP_DSLASH => Ok(true),
            Rule::OP_SLASH => Ok(false),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn steps(&self, pair: Pair<'i, Rule>) -> Result<Vec<ast::Step>> {
        let mut steps = Vec::new();
        let mut descendant = false;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::path_sep => descendant = self.separator(p)?,
                Rule::step => {
                    steps.push(self.step(p, descendant)?);
                    descendant = false;
                }
                _ => return Err(self.unexpected(&p)),
            }
        }
        Ok(steps)
    }

    fn step(&self, pair: Pair<'i, Rule>, descendant: bool) -> Result<ast::Step> {
        let step = self.only_child(pair)?;
        let rule = step.as_rule();
        let mut inner = step.into_inner();
        let head = self.next(&mut inner, "step")?;
        let test = match rule {
            Rule::abbrev_step if head.as_rule() == Rule::dotdot => ast::StepTest::Parent,
            Rule::abbrev_step => ast::StepTest::SelfNode,
            Rule::axis_step => {
                let axis = head.as_str().to_owned();
                let node_test = self.only_child(self.next(&mut inner, "node test")?)?;
                let test = match node_test.as_rule() {
                    Rule::node_type_test => ast::NodeTest::Kind(self.kind_test(node_test)?),
                    _ => ast::NodeTest::Name(self.name_test(node_test)?),
                };
                ast::StepTest::Axis { axis, test }
            }
            Rule::attribute_step => ast::StepTest::Attribute(self.name_test(head)?),
            Rule::node_type_step => ast::StepTest::Kind(self.kind_test(head)?),
            Rule::name_step => ast::StepTest::Name(self.name_test(head)?),
            _ => return Err(self.unexpected(&head)),
        };
        let predicates = inner.map(|p| self.predicate(p)).collect::<Result<Vec<_>>>()?;
        Ok(ast::Step { descendant, test, predicates })
    }

    fn name_test(&self, pair: Pair<'i, Rule>) -> Result<ast::NameTest> {
        let token = self.only_child(pair)?;
        match token.as_rule() {
            Rule::wildcard => Ok(ast::NameTest::Wildcard),
            Rule::qname => Ok(ast::NameTest::QName(token.as_str().to_owned())),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn kind_test(&self, pair: Pair<'i, Rule>) -> Result<ast::KindTest> {
        let mut inner = pair.into_inner();
        let node_type = self.next(&mut inner, "node type")?;
        Ok(match node_type.as_str() {
            "text" => ast::KindTest::Text,
            "comment" => ast::KindTest::Comment,
            "node" => ast::KindTest::AnyKind,
            "processing-instruction" => ast::KindTest::ProcessingInstruction(inner.next().map(string_literal)),
            _ => return Err(self.unexpected(&node_type)),
        })
    }

    fn predicate(&self, pair: Pair<'i, Rule>) -> Result<ast::Predicate> {
        let expr = pair.into_inner().next().map(|e| self.expr(e)).transpose()?;
        Ok(ast::Predicate(expr))
    }
}

fn string_literal(pair: Pair<'_, Rule>) -> String {
    pair.into_inner().next().map_or_else(String::new, |content| content.as_str().to_owned())
}
