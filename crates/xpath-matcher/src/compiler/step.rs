use tracing::trace;

use super::Compiler;
use super::ir::{Axis, CompiledExpr, CompiledStep, NameTest, NodeTypeTest};
use crate::error::{Reason, Result};
use crate::parser::ast;

impl Compiler<'_> {
    pub(super) fn compile_step(&self, step: &ast::Step) -> Result<CompiledStep> {
        let descendant = step.descendant;
        let compiled = match &step.test {
            ast::StepTest::SelfNode => CompiledStep::dot(descendant),
            ast::StepTest::Parent => CompiledStep::dotdot(descendant),
            ast::StepTest::Attribute(name) => CompiledStep::attribute(name_test(name), descendant),
            ast::StepTest::Name(name) => CompiledStep::name_test(name_test(name), descendant),
            ast::StepTest::Kind(kind) => CompiledStep::node_type_test(node_type_test(kind), descendant),
            ast::StepTest::Axis { axis, test } => {
                let resolved = Axis::from_name(axis);
                if resolved == Axis::Other {
                    trace!(source = self.source, axis = axis.as_str(), "unsupported axis compiled as never-matching step");
                }
                match test {
                    ast::NodeTest::Name(name) => CompiledStep::axis_name(resolved, name_test(name), descendant),
                    ast::NodeTest::Kind(kind) => CompiledStep::axis_node_type(resolved, node_type_test(kind), descendant),
                }
            }
        };
        Ok(compiled.with_predicates(self.compile_predicates(&step.predicates)?))
    }

    pub(super) fn compile_predicates(&self, predicates: &[ast::Predicate]) -> Result<Vec<CompiledExpr>> {
        predicates
            .iter()
            .map(|p| match &p.0 {
                Some(expr) => self.compile_expr(expr),
                None => Err(self.error(Reason::EmptyPredicate)),
            })
            .collect()
    }
}

pub(super) fn name_test(name: &ast::NameTest) -> NameTest {
    match name {
        ast::NameTest::QName(q) => NameTest::name(q),
        ast::NameTest::Wildcard => NameTest::Wildcard,
    }
}

// The processing-instruction target literal is accepted and not checked.
pub(super) fn node_type_test(kind: &ast::KindTest) -> NodeTypeTest {
    match kind {
        ast::KindTest::Text => NodeTypeTest::Text,
        ast::KindTest::Comment => NodeTypeTest::Comment,
        ast::KindTest::AnyKind => NodeTypeTest::Node,
        ast::KindTest::ProcessingInstruction(_) => NodeTypeTest::ProcessingInstruction,
    }
}
