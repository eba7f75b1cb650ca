//! Condition expressions.
//!
//! The engine only needs two things from an expression language: a syntax
//! check at validation time and an evaluation against `{result, context}` at
//! routing time.  [`JinjaExpressionEvaluator`] provides both using minijinja
//! expressions (`result > 1000`, `context.tier == "gold" and result.ok`).

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("cannot parse expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("cannot evaluate expression '{expression}': {message}")]
    Evaluation { expression: String, message: String },
}

/// The expression capability used by the validator and the router.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression` with `variables` (a JSON object) in scope.
    fn evaluate(&self, expression: &str, variables: &Value) -> Result<Value, ExpressionError>;

    /// Whether `expression` parses.
    fn is_valid(&self, expression: &str) -> bool;
}

/// minijinja-backed evaluator.  Undefined lookups are errors, so a condition
/// over a missing key is a non-match rather than a silent `false`.
pub struct JinjaExpressionEvaluator {
    env: Environment<'static>,
}

impl JinjaExpressionEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }
}

impl Default for JinjaExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator for JinjaExpressionEvaluator {
    fn evaluate(&self, expression: &str, variables: &Value) -> Result<Value, ExpressionError> {
        let compiled = self
            .env
            .compile_expression(expression)
            .map_err(|e| ExpressionError::Syntax {
                expression: expression.to_owned(),
                message: e.to_string(),
            })?;

        let evaluation_error = |message: String| ExpressionError::Evaluation {
            expression: expression.to_owned(),
            message,
        };

        let value = compiled
            .eval(minijinja::Value::from_serialize(variables))
            .map_err(|e| evaluation_error(e.to_string()))?;

        serde_json::to_value(&value).map_err(|e| evaluation_error(e.to_string()))
    }

    fn is_valid(&self, expression: &str) -> bool {
        self.env.compile_expression(expression).is_ok()
    }
}
