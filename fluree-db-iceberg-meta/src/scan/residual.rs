//! Residual filters left for the execution path after planning.

use crate::manifest::PartitionData;
use crate::metadata::PartitionSpec;
use crate::scan::predicate::Expression;

/// Computes the part of a scan filter that planning could not prove.
///
/// Metadata table files are unpartitioned, so nothing can be proven from a
/// partition tuple and the residual is always the whole filter.
#[derive(Debug, Clone)]
pub struct ResidualEvaluator {
    spec: PartitionSpec,
    expr: Expression,
}

impl ResidualEvaluator {
    /// Evaluator for files without partition values.
    pub fn unpartitioned(expr: Expression) -> Self {
        Self {
            spec: PartitionSpec::unpartitioned(),
            expr,
        }
    }

    pub fn spec(&self) -> &PartitionSpec {
        &self.spec
    }

    /// The filter this evaluator was built with.
    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Residual for a file with the given partition tuple.
    pub fn residual_for(&self, _partition: &PartitionData) -> Expression {
        self.expr.clone()
    }
}
