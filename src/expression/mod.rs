//! # Logical Expressions
//!
//! A [`LogicalExpression`] is a boolean formula over named operands (trigger
//! paths, L1 algorithms, GT status bits) combined with `AND`, `OR`, `NOT` and
//! parentheses. A leading `~` negates the whole expression; it is stripped
//! before parsing and reapplied (XOR) to the final result.
//!
//! Compilation is total: an empty or malformed body does not fail
//! construction but is carried as invalid and surfaces as an
//! [`ExpressionError`] from [`LogicalExpression::evaluate`]. This matches the
//! lazy-fault policy needed for expressions delivered from the conditions
//! database at run boundaries, where a bad entry must degrade to the
//! category's error reply instead of aborting the job.
//!
//! Operand decisions are supplied externally through a resolver closure; the
//! expression itself never knows how a name maps to a decision. Duplicate
//! operand names are resolved independently per occurrence.

mod parser;

use crate::error::{ExpressionError, ExpressionResult};

/// Parsed expression tree. Operands are leaf names; the evaluator substitutes
/// their decisions at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprNode {
    Operand(String),
    Not(Box<ExprNode>),
    And(Box<ExprNode>, Box<ExprNode>),
    Or(Box<ExprNode>, Box<ExprNode>),
}

impl ExprNode {
    fn collect_operands<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ExprNode::Operand(name) => out.push(name),
            ExprNode::Not(inner) => inner.collect_operands(out),
            ExprNode::And(left, right) | ExprNode::Or(left, right) => {
                left.collect_operands(out);
                right.collect_operands(out);
            }
        }
    }

    // All operands are resolved, then combined; there is no short-circuit
    // inside a single expression (operand order carries no meaning).
    fn eval<F>(&self, resolve: &mut F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        match self {
            ExprNode::Operand(name) => resolve(name),
            ExprNode::Not(inner) => !inner.eval(resolve),
            ExprNode::And(left, right) => {
                let lhs = left.eval(resolve);
                let rhs = right.eval(resolve);
                lhs && rhs
            }
            ExprNode::Or(left, right) => {
                let lhs = left.eval(resolve);
                let rhs = right.eval(resolve);
                lhs || rhs
            }
        }
    }
}

/// An immutable logical expression: source text, whole-expression negation
/// flag, and the compiled tree (or the compile fault, kept for evaluation
/// time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalExpression {
    source: String,
    negated: bool,
    compiled: ExpressionResult<ExprNode>,
}

impl LogicalExpression {
    /// Compiles an expression string. Never fails; faults are deferred to
    /// [`evaluate`](Self::evaluate).
    pub fn compile(input: &str) -> Self {
        let trimmed = input.trim();
        let (negated, body) = match trimmed.strip_prefix('~') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let compiled = if body.is_empty() {
            Err(ExpressionError::Empty)
        } else {
            parser::parse(body).map_err(|detail| ExpressionError::Malformed {
                source_text: body.to_string(),
                detail,
            })
        };
        Self {
            source: input.to_string(),
            negated,
            compiled,
        }
    }

    /// The original expression string, including any leading `~`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    /// Operand names in source order; duplicates are kept. Empty for an
    /// invalid expression.
    pub fn operands(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Ok(root) = &self.compiled {
            root.collect_operands(&mut out);
        }
        out
    }

    /// Evaluates the expression, resolving each operand occurrence through
    /// `resolve`, then XOR-ing the result with the negation flag.
    pub fn evaluate<F>(&self, mut resolve: F) -> ExpressionResult<bool>
    where
        F: FnMut(&str) -> bool,
    {
        let root = self.compiled.as_ref().map_err(Clone::clone)?;
        Ok(root.eval(&mut resolve) ^ self.negated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn fixed(decisions: &[(&str, bool)]) -> HashMap<String, bool> {
        decisions
            .iter()
            .map(|(name, decision)| (name.to_string(), *decision))
            .collect()
    }

    #[test]
    fn test_evaluate_with_substituted_decisions() {
        let expression = LogicalExpression::compile("PathA AND (PathB OR NOT PathC)");
        let decisions = fixed(&[("PathA", true), ("PathB", false), ("PathC", false)]);
        let result = expression.evaluate(|name| decisions[name]).unwrap();
        assert!(result);
    }

    #[test]
    fn test_leading_tilde_negates_whole_expression() {
        let plain = LogicalExpression::compile("PathA OR PathB");
        let negated = LogicalExpression::compile("~PathA OR PathB");
        assert!(!plain.negated());
        assert!(negated.negated());
        let decisions = fixed(&[("PathA", true), ("PathB", false)]);
        assert!(plain.evaluate(|name| decisions[name]).unwrap());
        assert!(!negated.evaluate(|name| decisions[name]).unwrap());
    }

    #[test]
    fn test_empty_expression_faults_at_evaluation() {
        for source in ["", "   ", "~", "~  "] {
            let expression = LogicalExpression::compile(source);
            assert!(!expression.is_valid());
            assert_eq!(
                expression.evaluate(|_| true),
                Err(ExpressionError::Empty),
                "source {source:?}"
            );
        }
    }

    #[test]
    fn test_malformed_expression_faults_at_evaluation() {
        let expression = LogicalExpression::compile("PathA AND OR PathB");
        assert!(!expression.is_valid());
        assert!(matches!(
            expression.evaluate(|_| true),
            Err(ExpressionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_duplicate_operands_resolved_per_occurrence() {
        let expression = LogicalExpression::compile("PathA OR PathA");
        assert_eq!(expression.operands(), vec!["PathA", "PathA"]);
        let mut calls = 0;
        expression
            .evaluate(|_| {
                calls += 1;
                false
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_operands_in_source_order() {
        let expression = LogicalExpression::compile("NOT PathC AND (PathA OR PathB)");
        assert_eq!(expression.operands(), vec!["PathC", "PathA", "PathB"]);
    }

    proptest! {
        // evaluate("~E") == NOT evaluate("E") for any operand assignment
        #[test]
        fn prop_negation_round_trip(
            a in any::<bool>(),
            b in any::<bool>(),
            c in any::<bool>(),
        ) {
            let body = "OpA AND (OpB OR NOT OpC)";
            let plain = LogicalExpression::compile(body);
            let negated = LogicalExpression::compile(&format!("~{body}"));
            let decisions = fixed(&[("OpA", a), ("OpB", b), ("OpC", c)]);
            let resolve = |name: &str| decisions[name];
            prop_assert_eq!(
                negated.evaluate(resolve).unwrap(),
                !plain.evaluate(resolve).unwrap()
            );
        }

        // compile never panics, whatever the input
        #[test]
        fn prop_compile_is_total(input in "\\PC*") {
            let _ = LogicalExpression::compile(&input);
        }
    }
}
