//! Resource access control
//!
//! Decides whether the current user may access a resource by evaluating an
//! access-control expression such as `is_granted("ROLE_ADMIN") || user == object`
//! against the current security token.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use cel_interpreter::extractors::Arguments;
use cel_interpreter::{Context, ExecutionError, Program, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Access control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Token storage and an authentication trust resolver must be configured to evaluate access control expressions")]
    SecurityNotAvailable,

    #[error("An expression language must be configured to evaluate access control expressions")]
    ExpressionLanguageNotAvailable,

    #[error("The current token must be set to evaluate access control expressions (is the route behind a firewall?)")]
    NoToken,

    #[error("Invalid access control expression: {0}")]
    InvalidExpression(String),
}

/// How strongly a token was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationLevel {
    #[default]
    Anonymous,
    RememberMe,
    Full,
}

/// The authenticated (or anonymous) caller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityToken {
    pub user: Option<String>,
    pub roles: Vec<String>,
    pub level: AuthenticationLevel,
}

impl SecurityToken {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated<I, S>(user: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: Some(user.into()),
            roles: roles.into_iter().map(Into::into).collect(),
            level: AuthenticationLevel::Full,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: AuthenticationLevel) -> Self {
        self.level = level;
        self
    }
}

/// Source of the current token
pub trait TokenStorage {
    fn token(&self) -> Option<SecurityToken>;
}

/// Token storage holding a fixed token (or none)
#[derive(Debug, Clone, Default)]
pub struct StaticTokenStorage(pub Option<SecurityToken>);

impl TokenStorage for StaticTokenStorage {
    fn token(&self) -> Option<SecurityToken> {
        self.0.clone()
    }
}

/// Classifies how a token was authenticated
pub trait AuthenticationTrustResolver {
    fn is_anonymous(&self, token: &SecurityToken) -> bool {
        token.level == AuthenticationLevel::Anonymous
    }

    fn is_remember_me(&self, token: &SecurityToken) -> bool {
        token.level == AuthenticationLevel::RememberMe
    }

    fn is_fully_authenticated(&self, token: &SecurityToken) -> bool {
        token.level == AuthenticationLevel::Full
    }
}

/// Trust resolver reading the token's own authentication level
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTrustResolver;

impl AuthenticationTrustResolver for DefaultTrustResolver {}

/// Grants attributes (roles, permissions) on an optional subject
pub trait AuthorizationChecker: Send + Sync {
    fn is_granted(&self, attribute: &str, subject: Option<&ExpressionValue>) -> bool;
}

/// Roles reachable from other roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHierarchy(pub HashMap<String, Vec<String>>);

impl RoleHierarchy {
    /// `roles` plus every role they reach, transitively, without duplicates
    pub fn reachable_roles(&self, roles: &[String]) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<String> = roles.iter().rev().cloned().collect();

        while let Some(role) = stack.pop() {
            if !seen.insert(role.clone()) {
                continue;
            }
            if let Some(children) = self.0.get(&role) {
                stack.extend(children.iter().rev().cloned());
            }
            out.push(role);
        }
        out
    }
}

/// A value an expression can read or produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionValue {
    Null,
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl From<&str> for ExpressionValue {
    fn from(value: &str) -> Self {
        ExpressionValue::Str(value.to_string())
    }
}

impl From<String> for ExpressionValue {
    fn from(value: String) -> Self {
        ExpressionValue::Str(value)
    }
}

impl From<bool> for ExpressionValue {
    fn from(value: bool) -> Self {
        ExpressionValue::Bool(value)
    }
}

/// Everything an expression is evaluated against
pub struct EvaluationScope<'a> {
    pub variables: HashMap<String, ExpressionValue>,
    pub token: &'a SecurityToken,
    pub roles: Vec<String>,
    pub trust_resolver: &'a dyn AuthenticationTrustResolver,
    pub authorization_checker: Option<Arc<dyn AuthorizationChecker>>,
}

/// Evaluates access control expressions
pub trait ExpressionLanguage {
    fn evaluate(&self, expression: &str, scope: &EvaluationScope<'_>) -> Result<bool, SecurityError>;
}

/// Decides access to resources from access control expressions
pub struct ResourceAccessChecker {
    expression_language: Option<Rc<dyn ExpressionLanguage>>,
    trust_resolver: Option<Rc<dyn AuthenticationTrustResolver>>,
    role_hierarchy: Option<RoleHierarchy>,
    token_storage: Option<Rc<dyn TokenStorage>>,
    authorization_checker: Option<Arc<dyn AuthorizationChecker>>,
    exception_on_no_token: bool,
}

impl ResourceAccessChecker {
    pub fn new(expression_language: Option<Rc<dyn ExpressionLanguage>>) -> Self {
        Self {
            expression_language,
            trust_resolver: None,
            role_hierarchy: None,
            token_storage: None,
            authorization_checker: None,
            exception_on_no_token: true,
        }
    }

    #[must_use]
    pub fn with_trust_resolver(mut self, resolver: Rc<dyn AuthenticationTrustResolver>) -> Self {
        self.trust_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_role_hierarchy(mut self, hierarchy: RoleHierarchy) -> Self {
        self.role_hierarchy = Some(hierarchy);
        self
    }

    #[must_use]
    pub fn with_token_storage(mut self, storage: Rc<dyn TokenStorage>) -> Self {
        self.token_storage = Some(storage);
        self
    }

    #[must_use]
    pub fn with_authorization_checker(mut self, checker: Arc<dyn AuthorizationChecker>) -> Self {
        self.authorization_checker = Some(checker);
        self
    }

    /// Whether a missing token is an error (default) or treated as anonymous
    #[must_use]
    pub fn exception_on_no_token(mut self, enabled: bool) -> Self {
        self.exception_on_no_token = enabled;
        self
    }

    /// Evaluate `expression` for `resource_class` with the current token.
    pub fn is_granted(
        &self,
        resource_class: &str,
        expression: &str,
        extra_variables: HashMap<String, ExpressionValue>,
    ) -> Result<bool, SecurityError> {
        let (Some(token_storage), Some(trust_resolver)) = (&self.token_storage, &self.trust_resolver) else {
            return Err(SecurityError::SecurityNotAvailable);
        };

        let token = match token_storage.token() {
            Some(token) => token,
            None if self.exception_on_no_token => return Err(SecurityError::NoToken),
            None => SecurityToken::anonymous(),
        };

        let Some(expression_language) = &self.expression_language else {
            return Err(SecurityError::ExpressionLanguageNotAvailable);
        };

        let roles = match &self.role_hierarchy {
            Some(hierarchy) => hierarchy.reachable_roles(&token.roles),
            None => token.roles.clone(),
        };

        let mut variables = extra_variables;
        variables.insert("resource_class".to_string(), resource_class.into());
        variables.insert(
            "user".to_string(),
            token
                .user
                .clone()
                .map_or(ExpressionValue::Null, ExpressionValue::Str),
        );
        variables.insert("roles".to_string(), ExpressionValue::List(roles.clone()));

        let scope = EvaluationScope {
            variables,
            token: &token,
            roles,
            trust_resolver: trust_resolver.as_ref(),
            authorization_checker: self.authorization_checker.clone(),
        };

        let granted = expression_language.evaluate(expression, &scope)?;
        debug!(resource_class, expression, granted, "evaluated access control expression");
        Ok(granted)
    }
}

/// Access control expressions in the Common Expression Language.
///
/// Variables: `resource_class`, `user`, `roles` and the caller's extra
/// variables (usually `object`). Functions: `is_granted(attribute[, subject])`,
/// `is_authenticated()`, `is_fully_authenticated()`, `is_remember_me()` and
/// `is_anonymous()`. Expressions must evaluate to a boolean.
#[derive(Debug, Clone, Copy, Default)]
pub struct CelExpressionLanguage;

impl ExpressionLanguage for CelExpressionLanguage {
    fn evaluate(&self, expression: &str, scope: &EvaluationScope<'_>) -> Result<bool, SecurityError> {
        let program = Program::compile(expression)
            .map_err(|e| SecurityError::InvalidExpression(format!("{expression:?}: {e}")))?;

        let mut context = Context::default();
        for (name, value) in &scope.variables {
            context.add_variable(name.as_str(), to_cel(value));
        }
        register_functions(&mut context, scope);

        match program.execute(&context) {
            Ok(Value::Bool(granted)) => Ok(granted),
            Ok(other) => Err(SecurityError::InvalidExpression(format!(
                "{expression:?} did not evaluate to a boolean, got {other:?}"
            ))),
            Err(e) => Err(SecurityError::InvalidExpression(format!("{expression:?}: {e}"))),
        }
    }
}

fn register_functions(context: &mut Context, scope: &EvaluationScope<'_>) {
    let resolver = scope.trust_resolver;
    let token = scope.token;
    let anonymous = resolver.is_anonymous(token);
    let remember_me = resolver.is_remember_me(token);
    let fully_authenticated = resolver.is_fully_authenticated(token);

    context.add_function("is_authenticated", move || !anonymous);
    context.add_function("is_fully_authenticated", move || fully_authenticated);
    context.add_function("is_remember_me", move || remember_me);
    context.add_function("is_anonymous", move || anonymous);

    let roles = scope.roles.clone();
    let checker = scope.authorization_checker.clone();
    context.add_function(
        "is_granted",
        move |Arguments(args): Arguments| -> Result<bool, ExecutionError> {
            let (attribute, subject) = match args.as_slice() {
                [Value::String(attribute)] => (attribute, None),
                [Value::String(attribute), subject] => (attribute, Some(from_cel(subject))),
                _ => {
                    return Err(ExecutionError::function_error(
                        "is_granted",
                        "expected an attribute and an optional subject",
                    ))
                }
            };
            Ok(match &checker {
                Some(checker) => checker.is_granted(attribute, subject.as_ref()),
                None => roles.iter().any(|role| role == attribute.as_str()),
            })
        },
    );
}

fn to_cel(value: &ExpressionValue) -> Value {
    match value {
        ExpressionValue::Null => Value::Null,
        ExpressionValue::Bool(b) => Value::Bool(*b),
        ExpressionValue::Str(s) => Value::String(Rc::new(s.clone())),
        ExpressionValue::List(items) => Value::List(Rc::new(
            items
                .iter()
                .map(|item| Value::String(Rc::new(item.clone())))
                .collect(),
        )),
    }
}

fn from_cel(value: &Value) -> ExpressionValue {
    match value {
        Value::Bool(b) => ExpressionValue::Bool(*b),
        Value::String(s) => ExpressionValue::Str(s.as_str().to_string()),
        Value::List(items) => ExpressionValue::List(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.as_str().to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => ExpressionValue::Null,
    }
}
