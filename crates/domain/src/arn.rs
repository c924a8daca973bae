use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stackforge_core::{AppError, AppResult, DeploymentEnvironment, NonEmptyString};

use crate::LogicalId;

/// How the resource name is joined to the resource type in an ARN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArnFormat {
    /// `arn:aws:service:region:account:resource`.
    NoResourceName,
    /// `arn:aws:service:region:account:resource:resourceName`.
    ColonResourceName,
    /// `arn:aws:service:region:account:resource/resourceName`.
    SlashResourceName,
}

impl ArnFormat {
    fn separator(&self) -> Option<char> {
        match self {
            Self::NoResourceName => None,
            Self::ColonResourceName => Some(':'),
            Self::SlashResourceName => Some('/'),
        }
    }
}

/// Parts of an ARN that are not taken from the deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArnComponents {
    service: NonEmptyString,
    resource: String,
    resource_name: Option<String>,
    arn_format: ArnFormat,
    region: Option<String>,
    account: Option<String>,
}

impl ArnComponents {
    /// Creates components for a service resource without a resource name.
    pub fn new(service: impl Into<String>, resource: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            service: NonEmptyString::named("arn service", service)?,
            resource: resource.into(),
            resource_name: None,
            arn_format: ArnFormat::NoResourceName,
            region: None,
            account: None,
        })
    }

    /// Sets the resource name and how it is joined to the resource.
    #[must_use]
    pub fn with_resource_name(mut self, resource_name: impl Into<String>, format: ArnFormat) -> Self {
        self.resource_name = Some(resource_name.into());
        self.arn_format = format;
        self
    }

    /// Overrides the region; an empty string is used by global services.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Overrides the account; an empty string is used by global services.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Returns the service namespace.
    #[must_use]
    pub fn service(&self) -> &str {
        self.service.as_str()
    }
}

/// A resolved ARN as it appears in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arn {
    /// Fully known at declaration time.
    Literal(String),
    /// Contains deploy-time pseudo parameters; rendered through `Fn::Sub`.
    Sub(String),
    /// ARN attribute of a resource declared in the same template.
    Attribute {
        /// Logical id of the owning resource.
        logical_id: LogicalId,
        /// Text appended after the attribute value, for example `/*`.
        suffix: Option<String>,
    },
}

impl Arn {
    /// References the `Arn` attribute of a resource in the same template.
    #[must_use]
    pub fn attribute_of(logical_id: LogicalId) -> Self {
        Self::Attribute {
            logical_id,
            suffix: None,
        }
    }

    /// Returns a copy with `suffix` appended.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(format!("{value}{suffix}")),
            Self::Sub(value) => Self::Sub(format!("{value}{suffix}")),
            Self::Attribute {
                logical_id,
                suffix: existing,
            } => Self::Attribute {
                logical_id: logical_id.clone(),
                suffix: Some(format!("{}{suffix}", existing.as_deref().unwrap_or_default())),
            },
        }
    }

    /// Renders the ARN as a template value.
    #[must_use]
    pub fn to_template_value(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Sub(value) => json!({ "Fn::Sub": value }),
            Self::Attribute {
                logical_id,
                suffix: None,
            } => json!({ "Fn::GetAtt": [logical_id.as_str(), "Arn"] }),
            Self::Attribute {
                logical_id,
                suffix: Some(suffix),
            } => json!({
                "Fn::Join": [
                    "",
                    [{ "Fn::GetAtt": [logical_id.as_str(), "Arn"] }, suffix]
                ]
            }),
        }
    }
}

/// Formats an ARN for `components` inside `environment`.
///
/// Coordinates not overridden by the components come from the environment.
/// The result is a literal only when every coordinate is concrete.
pub fn format_arn(components: &ArnComponents, environment: &DeploymentEnvironment) -> AppResult<Arn> {
    if components.resource.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "arn for service '{}' requires a resource",
            components.service
        )));
    }

    let resource_part = match (components.arn_format.separator(), &components.resource_name) {
        (None, None) => components.resource.clone(),
        (Some(separator), Some(name)) => format!("{}{separator}{name}", components.resource),
        (None, Some(_)) => {
            return Err(AppError::Validation(format!(
                "resource name given for '{}' but arn format has no resource name",
                components.resource
            )));
        }
        (Some(_), None) => {
            return Err(AppError::Validation(format!(
                "arn format for '{}' requires a resource name",
                components.resource
            )));
        }
    };

    let partition = environment.partition();
    let region = components
        .region
        .clone()
        .unwrap_or_else(|| environment.region().as_sub_fragment());
    let account = components
        .account
        .clone()
        .unwrap_or_else(|| environment.account().as_sub_fragment());

    let is_literal = partition.concrete().is_some()
        && (components.region.is_some() || environment.region().concrete().is_some())
        && (components.account.is_some() || environment.account().concrete().is_some());

    let text = format!(
        "arn:{}:{}:{region}:{account}:{resource_part}",
        partition.as_sub_fragment(),
        components.service,
    );

    Ok(if is_literal {
        Arn::Literal(text)
    } else {
        Arn::Sub(text)
    })
}
