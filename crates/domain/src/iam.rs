use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use stackforge_core::{AppError, AppResult};

use crate::{Arn, LogicalId};

/// IAM policy language version emitted for every document.
pub const POLICY_LANGUAGE_VERSION: &str = "2012-10-17";

/// Whether a statement allows or denies its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the listed actions.
    Allow,
    /// Explicitly denies the listed actions.
    Deny,
}

impl Effect {
    /// Returns the policy-language value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// Log write actions granted to log producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogAction {
    /// `logs:CreateLogGroup`.
    CreateLogGroup,
    /// `logs:CreateLogStream`.
    CreateLogStream,
    /// `logs:PutLogEvents`.
    PutLogEvents,
}

impl LogAction {
    /// Returns the IAM action name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateLogGroup => "logs:CreateLogGroup",
            Self::CreateLogStream => "logs:CreateLogStream",
            Self::PutLogEvents => "logs:PutLogEvents",
        }
    }

    /// Returns every write-only log action.
    #[must_use]
    pub fn write_actions() -> &'static [Self] {
        const ALL: &[LogAction] = &[
            LogAction::CreateLogGroup,
            LogAction::CreateLogStream,
            LogAction::PutLogEvents,
        ];

        ALL
    }
}

impl FromStr for LogAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "logs:CreateLogGroup" => Ok(Self::CreateLogGroup),
            "logs:CreateLogStream" => Ok(Self::CreateLogStream),
            "logs:PutLogEvents" => Ok(Self::PutLogEvents),
            _ => Err(AppError::Validation(format!(
                "unknown log write action '{value}'"
            ))),
        }
    }
}

/// Principal a resource-based statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    /// Every principal, rendered as `{"AWS": "*"}`.
    Any,
    /// A specific AWS principal ARN.
    Aws(Arn),
}

impl Principal {
    fn to_template_value(&self) -> Value {
        match self {
            Self::Any => json!({ "AWS": "*" }),
            Self::Aws(arn) => json!({ "AWS": arn.to_template_value() }),
        }
    }
}

/// One `{operator: {key: value}}` entry of a statement condition block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementCondition {
    operator: String,
    key: String,
    value: Value,
}

impl StatementCondition {
    /// Creates a condition entry.
    #[must_use]
    pub fn new(operator: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            operator: operator.into(),
            key: key.into(),
            value,
        }
    }
}

/// A single permission statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<Arn>,
    principal: Option<Principal>,
    conditions: Vec<StatementCondition>,
}

impl PolicyStatement {
    /// Creates a validated statement.
    ///
    /// Actions must be `service:Action` (wildcards allowed in the action part)
    /// and both lists must be non-empty.
    pub fn new(
        effect: Effect,
        actions: impl IntoIterator<Item = impl Into<String>>,
        resources: Vec<Arn>,
    ) -> AppResult<Self> {
        let actions: Vec<String> = actions.into_iter().map(Into::into).collect();
        if actions.is_empty() {
            return Err(AppError::Validation(
                "policy statements must include at least one action".to_owned(),
            ));
        }

        for action in &actions {
            validate_action(action)?;
        }

        if resources.is_empty() {
            return Err(AppError::Validation(
                "policy statements must include at least one resource".to_owned(),
            ));
        }

        Ok(Self::from_parts(effect, actions, resources))
    }

    /// Builds a statement from already-valid parts.
    pub(crate) fn from_parts(effect: Effect, actions: Vec<String>, resources: Vec<Arn>) -> Self {
        Self {
            effect,
            actions,
            resources,
            principal: None,
            conditions: Vec::new(),
        }
    }

    /// Sets the statement principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Adds a condition entry.
    #[must_use]
    pub fn with_condition(mut self, condition: StatementCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns the statement effect.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Returns the granted or denied actions.
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Returns the resources the statement applies to.
    #[must_use]
    pub fn resources(&self) -> &[Arn] {
        &self.resources
    }

    /// Returns the statement principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Renders the statement in policy-language form.
    ///
    /// Single-element lists collapse to scalars.
    #[must_use]
    pub fn to_template_value(&self) -> Value {
        let mut statement = Map::new();
        statement.insert(
            "Action".to_owned(),
            collapse(self.actions.iter().map(|action| Value::String(action.clone()))),
        );

        if !self.conditions.is_empty() {
            let mut grouped: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();
            for condition in &self.conditions {
                grouped
                    .entry(condition.operator.as_str())
                    .or_default()
                    .insert(condition.key.clone(), condition.value.clone());
            }
            let block: Map<String, Value> = grouped
                .into_iter()
                .map(|(operator, entries)| (operator.to_owned(), Value::Object(entries)))
                .collect();
            statement.insert("Condition".to_owned(), Value::Object(block));
        }

        statement.insert(
            "Effect".to_owned(),
            Value::String(self.effect.as_str().to_owned()),
        );

        if let Some(principal) = &self.principal {
            statement.insert("Principal".to_owned(), principal.to_template_value());
        }

        statement.insert(
            "Resource".to_owned(),
            collapse(self.resources.iter().map(Arn::to_template_value)),
        );

        Value::Object(statement)
    }
}

/// Ordered set of statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Creates a document from statements.
    #[must_use]
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    /// Returns the statements.
    #[must_use]
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Returns every action across all statements.
    #[must_use]
    pub fn actions(&self) -> Vec<&str> {
        self.statements
            .iter()
            .flat_map(|statement| statement.actions().iter().map(String::as_str))
            .collect()
    }

    /// Renders the document in policy-language form.
    #[must_use]
    pub fn to_template_value(&self) -> Value {
        json!({
            "Statement": self
                .statements
                .iter()
                .map(PolicyStatement::to_template_value)
                .collect::<Vec<_>>(),
            "Version": POLICY_LANGUAGE_VERSION,
        })
    }
}

const MAX_POLICY_NAME_LENGTH: usize = 128;

/// Read-only handle to a declared identity policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyHandle {
    logical_id: LogicalId,
    document: PolicyDocument,
}

impl PolicyHandle {
    /// Creates a handle for a declared policy.
    #[must_use]
    pub fn new(logical_id: LogicalId, document: PolicyDocument) -> Self {
        Self {
            logical_id,
            document,
        }
    }

    /// Returns the logical id of the policy resource.
    #[must_use]
    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Returns the declared document.
    #[must_use]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Returns the physical policy name: the logical id, keeping only its
    /// last 128 characters.
    #[must_use]
    pub fn policy_name(&self) -> String {
        let logical_id = self.logical_id.as_str();
        let excess = logical_id
            .chars()
            .count()
            .saturating_sub(MAX_POLICY_NAME_LENGTH);
        logical_id.chars().skip(excess).collect()
    }
}

fn validate_action(action: &str) -> AppResult<()> {
    if action == "*" {
        return Ok(());
    }

    match action.split_once(':') {
        Some((service, name))
            if !service.is_empty()
                && !name.is_empty()
                && service
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '-')
                && name
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '*') =>
        {
            Ok(())
        }
        _ => Err(AppError::Validation(format!(
            "invalid policy action '{action}', expected 'service:Action'"
        ))),
    }
}

fn collapse(values: impl Iterator<Item = Value>) -> Value {
    let mut values: Vec<Value> = values.collect();
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::{
        Effect, LogAction, PolicyDocument, PolicyHandle, PolicyStatement, Principal,
        StatementCondition,
    };
    use crate::{Arn, LogicalId};

    fn any_resource() -> Vec<Arn> {
        vec![Arn::Literal("*".to_owned())]
    }

    #[test]
    fn log_action_roundtrip_storage_value() {
        for action in LogAction::write_actions() {
            let restored = LogAction::from_str(action.as_str());
            assert_eq!(restored.ok(), Some(*action));
        }
        assert!(LogAction::from_str("logs:DeleteLogGroup").is_err());
    }

    #[test]
    fn statement_rejects_malformed_actions() {
        assert!(PolicyStatement::new(Effect::Allow, ["CreateLogGroup"], any_resource()).is_err());
        assert!(PolicyStatement::new(Effect::Allow, ["logs:"], any_resource()).is_err());
        assert!(PolicyStatement::new(Effect::Allow, Vec::<String>::new(), any_resource()).is_err());
        assert!(PolicyStatement::new(Effect::Allow, ["s3:Get*"], Vec::new()).is_err());
        assert!(PolicyStatement::new(Effect::Allow, ["s3:Get*"], any_resource()).is_ok());
    }

    #[test]
    fn single_values_render_as_scalars() {
        let statement = PolicyStatement::new(Effect::Deny, ["s3:*"], any_resource())
            .unwrap_or_else(|_| unreachable!())
            .with_principal(Principal::Any)
            .with_condition(StatementCondition::new(
                "Bool",
                "aws:SecureTransport",
                json!("false"),
            ));

        assert_eq!(
            statement.to_template_value(),
            json!({
                "Action": "s3:*",
                "Condition": { "Bool": { "aws:SecureTransport": "false" } },
                "Effect": "Deny",
                "Principal": { "AWS": "*" },
                "Resource": "*"
            })
        );
    }

    #[test]
    fn document_renders_version_and_statements() {
        let statement = PolicyStatement::new(
            Effect::Allow,
            LogAction::write_actions().iter().map(LogAction::as_str),
            any_resource(),
        )
        .unwrap_or_else(|_| unreachable!());
        let document = PolicyDocument::new(vec![statement]);

        let rendered = document.to_template_value();
        assert_eq!(rendered["Version"], json!("2012-10-17"));
        assert_eq!(
            rendered["Statement"][0]["Action"],
            json!(["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"])
        );
        assert_eq!(document.actions().len(), 3);
    }

    #[test]
    fn policy_name_keeps_tail_of_long_logical_id() {
        let long = LogicalId::from_path(&["Block".repeat(60).as_str(), "Policy", "Resource"])
            .unwrap_or_else(|_| unreachable!());
        assert!(long.as_str().len() > 128);
        let handle = PolicyHandle::new(long.clone(), PolicyDocument::default());

        let name = handle.policy_name();
        assert_eq!(name.len(), 128);
        assert!(long.as_str().ends_with(name.as_str()));

        let short = LogicalId::from_path(&["LogsPolicy"]).unwrap_or_else(|_| unreachable!());
        let handle = PolicyHandle::new(short, PolicyDocument::default());
        assert_eq!(handle.policy_name(), "LogsPolicy");
    }

    #[test]
    fn account_principal_renders_arn() {
        let principal = Principal::Aws(Arn::Literal("arn:aws:iam::123456789012:root".to_owned()));
        let statement = PolicyStatement::new(Effect::Allow, ["s3:GetObject"], any_resource())
            .unwrap_or_else(|_| unreachable!())
            .with_principal(principal.clone());

        assert_eq!(statement.principal(), Some(&principal));
        assert_eq!(
            statement.to_template_value()["Principal"],
            json!({ "AWS": "arn:aws:iam::123456789012:root" })
        );
    }
}
