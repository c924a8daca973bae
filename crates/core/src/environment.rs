use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppResult, NonEmptyString};

/// Values CloudFormation resolves at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PseudoParameter {
    /// `AWS::Partition`.
    Partition,
    /// `AWS::Region`.
    Region,
    /// `AWS::AccountId`.
    AccountId,
}

impl PseudoParameter {
    /// Returns the pseudo parameter name as written in templates.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Partition => "AWS::Partition",
            Self::Region => "AWS::Region",
            Self::AccountId => "AWS::AccountId",
        }
    }
}

/// One coordinate of the deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvValue {
    /// Value known at declaration time.
    Concrete(NonEmptyString),
    /// Value deferred to deploy time.
    Pseudo(PseudoParameter),
}

impl EnvValue {
    /// Returns the concrete value, if known at declaration time.
    #[must_use]
    pub fn concrete(&self) -> Option<&str> {
        match self {
            Self::Concrete(value) => Some(value.as_str()),
            Self::Pseudo(_) => None,
        }
    }

    /// Renders the value for use inside an `Fn::Sub` template string.
    #[must_use]
    pub fn as_sub_fragment(&self) -> String {
        match self {
            Self::Concrete(value) => value.as_str().to_owned(),
            Self::Pseudo(parameter) => format!("${{{}}}", parameter.as_str()),
        }
    }
}

impl Display for EnvValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_sub_fragment().as_str())
    }
}

/// Partition, region and account a stack is deployed into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentEnvironment {
    partition: EnvValue,
    region: EnvValue,
    account: EnvValue,
}

impl DeploymentEnvironment {
    /// Creates an environment resolved entirely at deploy time.
    #[must_use]
    pub fn agnostic() -> Self {
        Self {
            partition: EnvValue::Pseudo(PseudoParameter::Partition),
            region: EnvValue::Pseudo(PseudoParameter::Region),
            account: EnvValue::Pseudo(PseudoParameter::AccountId),
        }
    }

    /// Creates an environment from optional concrete coordinates.
    ///
    /// Missing coordinates fall back to their pseudo parameter.
    pub fn from_parts(
        partition: Option<String>,
        region: Option<String>,
        account: Option<String>,
    ) -> AppResult<Self> {
        let resolve = |field: &str, value: Option<String>, fallback: PseudoParameter| {
            value
                .map(|value| NonEmptyString::named(field, value).map(EnvValue::Concrete))
                .unwrap_or(Ok(EnvValue::Pseudo(fallback)))
        };

        Ok(Self {
            partition: resolve("partition", partition, PseudoParameter::Partition)?,
            region: resolve("region", region, PseudoParameter::Region)?,
            account: resolve("account", account, PseudoParameter::AccountId)?,
        })
    }

    /// Returns the partition coordinate.
    #[must_use]
    pub fn partition(&self) -> &EnvValue {
        &self.partition
    }

    /// Returns the region coordinate.
    #[must_use]
    pub fn region(&self) -> &EnvValue {
        &self.region
    }

    /// Returns the account coordinate.
    #[must_use]
    pub fn account(&self) -> &EnvValue {
        &self.account
    }

    /// Returns whether every coordinate is known at declaration time.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.partition.concrete().is_some()
            && self.region.concrete().is_some()
            && self.account.concrete().is_some()
    }
}

impl Default for DeploymentEnvironment {
    fn default() -> Self {
        Self::agnostic()
    }
}
