use super::Compiler;
use super::ir::{self, CompiledExpr, ComparisonOp, FunctionType};
use super::step::name_test;
use crate::engine::evaluator::{Scalar, compare_scalars};
use crate::error::{Reason, Result};
use crate::parser::ast;

impl Compiler<'_> {
    pub(super) fn compile_expr(&self, expr: &ast::Expr) -> Result<CompiledExpr> {
        match expr {
            ast::Expr::Literal(lit) => self.compile_literal(lit, false),
            ast::Expr::Negate(inner) => match inner.as_ref() {
                ast::Expr::Literal(lit @ ast::Literal::Number(_)) => self.compile_literal(lit, true),
                _ => Err(self.unsupported("unary minus on anything but a numeric literal")),
            },
            ast::Expr::Union { .. } => Err(self.unsupported("the union operator `|`")),
            ast::Expr::Binary { left, op, right } => {
                let left = self.compile_expr(left)?;
                let right = self.compile_expr(right)?;
                Ok(fold_logical(*op, left, right))
            }
            ast::Expr::GeneralComparison { left, op, right } => {
                let left = self.compile_expr(left)?;
                let right = self.compile_expr(right)?;
                Ok(fold_comparison(left, comparison_op(*op), right))
            }
            ast::Expr::FunctionCall { name, args } => self.compile_function(name, args),
            ast::Expr::Path(path) => self.compile_path_expr(path),
            ast::Expr::Filter(f) if f.parenthesized && f.predicates.is_empty() && f.trailing.is_none() => {
                self.compile_expr(&f.primary)
            }
            ast::Expr::Filter(_) => Err(self.unsupported("a filter expression inside a predicate")),
        }
    }

    fn compile_literal(&self, lit: &ast::Literal, negative: bool) -> Result<CompiledExpr> {
        match lit {
            ast::Literal::String(s) => Ok(CompiledExpr::String(s.clone())),
            ast::Literal::Number(raw) => {
                let text = if negative { format!("-{raw}") } else { raw.clone() };
                text.parse::<i64>()
                    .map(CompiledExpr::Numeric)
                    .map_err(|_| self.error(Reason::MalformedNumber(text)))
            }
        }
    }

    fn compile_function(&self, name: &str, args: &[ast::Expr]) -> Result<CompiledExpr> {
        let function =
            FunctionType::from_name(name).ok_or_else(|| self.error(Reason::UnknownFunction(name.to_owned())))?;
        let arity = function.arity();
        if !arity.accepts(args.len()) {
            return Err(self.error(Reason::WrongArity { name: name.to_owned(), given: args.len(), expected: arity }));
        }
        let args = args.iter().map(|a| self.compile_expr(a)).collect::<Result<Vec<_>>>()?;
        if function == FunctionType::Not
            && let [CompiledExpr::Boolean(b)] = args.as_slice()
        {
            return Ok(CompiledExpr::Boolean(!b));
        }
        Ok(CompiledExpr::Function { function, args })
    }

    /// Relative paths become `Self`/`Parent`/`Child`/`Attribute` when they are a
    /// single plain step, otherwise `Path`. Anything rooted at `/` is kept as
    /// text and resolved against the document when matching.
    fn compile_path_expr(&self, path: &ast::PathExpr) -> Result<CompiledExpr> {
        if path.start != ast::PathStart::Relative {
            self.compile_location_path(path)?;
            return Ok(CompiledExpr::AbsolutePath(path.text.clone()));
        }

        if let [step] = path.steps.as_slice()
            && step.predicates.is_empty()
        {
            match &step.test {
                ast::StepTest::SelfNode => return Ok(CompiledExpr::SelfNode),
                ast::StepTest::Parent => return Ok(CompiledExpr::Parent),
                ast::StepTest::Name(n) => return Ok(CompiledExpr::Child(name_test(n))),
                ast::StepTest::Attribute(n) => return Ok(CompiledExpr::Attribute(name_test(n))),
                ast::StepTest::Kind(k) => {
                    return Ok(CompiledExpr::Function { function: kind_function(k), args: Vec::new() });
                }
                ast::StepTest::Axis { .. } => {}
            }
        }

        let (body, terminal) = match path.steps.split_last() {
            Some((last, rest))
                if !rest.is_empty() && last.predicates.is_empty() && !last.descendant =>
            {
                match &last.test {
                    ast::StepTest::Kind(k) => (rest, Some(kind_function(k))),
                    _ => (path.steps.as_slice(), None),
                }
            }
            _ => (path.steps.as_slice(), None),
        };
        let steps = body.iter().map(|s| self.compile_step(s)).collect::<Result<Vec<_>>>()?;
        Ok(CompiledExpr::Path { steps: ir::freeze(steps), terminal })
    }
}

fn kind_function(kind: &ast::KindTest) -> FunctionType {
    match kind {
        ast::KindTest::Text => FunctionType::Text,
        ast::KindTest::Comment => FunctionType::Comment,
        ast::KindTest::AnyKind => FunctionType::Node,
        ast::KindTest::ProcessingInstruction(_) => FunctionType::ProcessingInstruction,
    }
}

fn comparison_op(op: ast::GeneralComp) -> ComparisonOp {
    match op {
        ast::GeneralComp::Eq => ComparisonOp::Eq,
        ast::GeneralComp::Ne => ComparisonOp::Ne,
        ast::GeneralComp::Lt => ComparisonOp::Lt,
        ast::GeneralComp::Le => ComparisonOp::Le,
        ast::GeneralComp::Gt => ComparisonOp::Gt,
        ast::GeneralComp::Ge => ComparisonOp::Ge,
    }
}

fn scalar(expr: &CompiledExpr) -> Option<Scalar> {
    match expr {
        CompiledExpr::Boolean(b) => Some(Scalar::Boolean(*b)),
        #[allow(clippy::cast_precision_loss)]
        CompiledExpr::Numeric(n) => Some(Scalar::Number(*n as f64)),
        CompiledExpr::String(s) => Some(Scalar::String(s.clone())),
        _ => None,
    }
}

fn fold_comparison(left: CompiledExpr, op: ComparisonOp, right: CompiledExpr) -> CompiledExpr {
    if let (Some(l), Some(r)) = (scalar(&left), scalar(&right)) {
        return CompiledExpr::Boolean(compare_scalars(&l, op, &r));
    }
    CompiledExpr::Comparison { left: Box::new(left), op, right: Box::new(right) }
}

/// Expressions whose value is always a boolean, so they mean the same thing
/// whether they stand alone in a predicate or under `and`/`or`.
fn is_boolean_typed(expr: &CompiledExpr) -> bool {
    match expr {
        CompiledExpr::Boolean(_) | CompiledExpr::Comparison { .. } | CompiledExpr::And(..) | CompiledExpr::Or(..) => {
            true
        }
        CompiledExpr::Function { function, .. } => matches!(
            function,
            FunctionType::Not | FunctionType::Contains | FunctionType::StartsWith | FunctionType::EndsWith
        ),
        _ => false,
    }
}

fn fold_logical(op: ast::BinaryOp, left: CompiledExpr, right: CompiledExpr) -> CompiledExpr {
    let constant = |e: &CompiledExpr| match e {
        CompiledExpr::Boolean(b) => Some(*b),
        _ => None,
    };
    match (op, constant(&left), constant(&right)) {
        (ast::BinaryOp::And, Some(false), _) | (ast::BinaryOp::And, _, Some(false)) => CompiledExpr::Boolean(false),
        (ast::BinaryOp::Or, Some(true), _) | (ast::BinaryOp::Or, _, Some(true)) => CompiledExpr::Boolean(true),
        (_, Some(_), _) if is_boolean_typed(&right) => right,
        (_, _, Some(_)) if is_boolean_typed(&left) => left,
        (ast::BinaryOp::And, ..) => CompiledExpr::And(Box::new(left), Box::new(right)),
        (ast::BinaryOp::Or, ..) => CompiledExpr::Or(Box::new(left), Box::new(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::compile_uncached;
    use super::*;

    fn predicate(src: &str) -> CompiledExpr {
        let c = compile_uncached(src).unwrap();
        c.steps()[0].predicates()[0].clone()
    }

    #[test]
    fn literal_comparisons_fold() {
        assert_eq!(predicate("a['x' = 'x']"), CompiledExpr::Boolean(true));
        assert_eq!(predicate("a[1 = 2]"), CompiledExpr::Boolean(false));
        assert_eq!(predicate("a['10' > 9]"), CompiledExpr::Boolean(true));
        assert_eq!(predicate("a[not(1 = 2)]"), CompiledExpr::Boolean(true));
    }

    #[test]
    fn logical_short_circuit_keeps_position_semantics() {
        assert!(matches!(predicate("a[1 = 1 and @k = 'v']"), CompiledExpr::Comparison { .. }));
        assert_eq!(predicate("a[1 = 2 and @k = 'v']"), CompiledExpr::Boolean(false));
        // `2` alone would be a position test, so the conjunction stays.
        assert!(matches!(predicate("a[1 = 1 and 2]"), CompiledExpr::And(..)));
    }

    #[test]
    fn negative_numeral() {
        assert_eq!(predicate("a[-3]"), CompiledExpr::Numeric(-3));
    }

    #[test]
    fn single_steps_map_to_references() {
        assert_eq!(predicate("a[.]"), CompiledExpr::SelfNode);
        assert_eq!(predicate("a[..]"), CompiledExpr::Parent);
        assert_eq!(predicate("a[b]"), CompiledExpr::Child(ir::NameTest::name("b")));
        assert_eq!(predicate("a[@*]"), CompiledExpr::Attribute(ir::NameTest::Wildcard));
        assert_eq!(
            predicate("a[text()]"),
            CompiledExpr::Function { function: FunctionType::Text, args: vec![] }
        );
        assert!(matches!(predicate("a[b[1]]"), CompiledExpr::Path { ref steps, terminal: None } if steps.len() == 1));
    }

    #[test]
    fn trailing_node_type_becomes_terminal() {
        let CompiledExpr::Path { steps, terminal } = predicate("a[b/c/text()]") else { panic!("path expected") };
        assert_eq!(steps.len(), 2);
        assert_eq!(terminal, Some(FunctionType::Text));
    }

    #[test]
    fn absolute_path_keeps_text() {
        assert_eq!(predicate("a[/r/b]"), CompiledExpr::AbsolutePath("/r/b".into()));
    }
}
