use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use stackforge_core::{AppError, AppResult, DeploymentEnvironment, NonEmptyString};
use stackforge_domain::{
    BucketDefinition, BucketProps, ExternalBucket, HIDDEN_FROM_HUMAN_COMPONENT, LogicalId,
    OwnedBucket, PolicyDocument, PolicyHandle, ResourceMetadata, SuppressionRule,
};
use tracing::debug;

/// Child id under which a bucket's TLS-enforcing policy is synthesized.
pub const BUCKET_POLICY_CHILD_ID: &str = "Policy";

/// Address of a declaration relative to its stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ScopePath(Vec<String>);

impl ScopePath {
    /// Returns the stack root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns whether this is the stack root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the path components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Returns the last component.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns the enclosing scope.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    fn child(&self, id: &str) -> Self {
        let mut components = self.0.clone();
        components.push(id.to_owned());
        Self(components)
    }

    fn resource_logical_id(&self, extra: &[&str]) -> AppResult<LogicalId> {
        let mut components: Vec<&str> = self.0.iter().map(String::as_str).collect();
        components.extend_from_slice(extra);
        components.push(HIDDEN_FROM_HUMAN_COMPONENT);
        LogicalId::from_path(&components)
    }
}

impl Display for ScopePath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.join("/").as_str())
    }
}

/// Kind of a registered declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// Grouping construct without a resource of its own.
    Construct,
    /// Identity policy.
    Policy,
    /// Bucket owned by the stack.
    Bucket,
    /// Bucket referenced by name.
    ImportedBucket,
}

/// Registered declaration as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSummary {
    /// Declaration path.
    pub path: ScopePath,
    /// Declaration kind.
    pub kind: DeclarationKind,
}

#[derive(Debug, Clone)]
pub(crate) enum Declaration {
    Construct,
    Policy {
        handle: PolicyHandle,
        roles: Vec<NonEmptyString>,
        metadata: ResourceMetadata,
    },
    Bucket {
        bucket: OwnedBucket,
        policy_logical_id: Option<LogicalId>,
        metadata: ResourceMetadata,
    },
    ImportedBucket(ExternalBucket),
}

impl Declaration {
    fn kind(&self) -> DeclarationKind {
        match self {
            Self::Construct => DeclarationKind::Construct,
            Self::Policy { .. } => DeclarationKind::Policy,
            Self::Bucket { .. } => DeclarationKind::Bucket,
            Self::ImportedBucket(_) => DeclarationKind::ImportedBucket,
        }
    }

    fn logical_id(&self) -> Option<&LogicalId> {
        match self {
            Self::Policy { handle, .. } => Some(handle.logical_id()),
            Self::Bucket { bucket, .. } => Some(bucket.logical_id()),
            Self::Construct | Self::ImportedBucket(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) path: ScopePath,
    pub(crate) declaration: Declaration,
}

/// Declaration scope for one deployable template.
///
/// Ids are unique per scope; declaring the same id twice is a conflict and
/// never overwrites the first declaration. A bucket that enforces TLS also
/// holds the id of its synthesized policy child.
#[derive(Debug, Clone)]
pub struct Stack {
    name: NonEmptyString,
    environment: DeploymentEnvironment,
    description: Option<String>,
    nodes: Vec<Node>,
    index: HashMap<ScopePath, usize>,
    implicit_children: HashSet<ScopePath>,
}

impl Stack {
    /// Creates an empty stack deployed into `environment`.
    pub fn new(name: impl Into<String>, environment: DeploymentEnvironment) -> AppResult<Self> {
        let name = NonEmptyString::named("stack name", name)?;
        if name.as_str().contains('/') {
            return Err(AppError::Validation(format!(
                "stack name '{name}' must not contain '/'"
            )));
        }

        Ok(Self {
            name,
            environment,
            description: None,
            nodes: Vec::new(),
            index: HashMap::new(),
            implicit_children: HashSet::new(),
        })
    }

    /// Sets the template description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the deployment environment.
    #[must_use]
    pub fn environment(&self) -> &DeploymentEnvironment {
        &self.environment
    }

    /// Returns the template description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the root scope.
    #[must_use]
    pub fn root(&self) -> ScopePath {
        ScopePath::root()
    }

    /// Declares a grouping construct and returns its scope.
    pub fn add_construct(&mut self, scope: &ScopePath, id: &str) -> AppResult<ScopePath> {
        let path = self.reserve(scope, id)?;
        self.push(path.clone(), Declaration::Construct);
        Ok(path)
    }

    /// Declares an identity policy.
    pub fn add_policy(
        &mut self,
        scope: &ScopePath,
        id: &str,
        document: PolicyDocument,
    ) -> AppResult<PolicyHandle> {
        if document.statements().is_empty() {
            return Err(AppError::Validation(format!(
                "policy '{id}' must include at least one statement"
            )));
        }

        let path = self.reserve(scope, id)?;
        let handle = PolicyHandle::new(path.resource_logical_id(&[])?, document);
        let metadata = self.resource_metadata(&path, &[]);
        self.push(
            path,
            Declaration::Policy {
                handle: handle.clone(),
                roles: Vec::new(),
                metadata,
            },
        );

        Ok(handle)
    }

    /// Declares a bucket owned by this stack.
    pub fn add_bucket(
        &mut self,
        scope: &ScopePath,
        id: &str,
        props: BucketProps,
    ) -> AppResult<OwnedBucket> {
        let definition = BucketDefinition::new(props)?;
        let path = self.reserve(scope, id)?;
        let bucket = OwnedBucket::new(path.resource_logical_id(&[])?, definition);
        let policy_logical_id = if bucket.definition().enforce_ssl() {
            Some(path.resource_logical_id(&[BUCKET_POLICY_CHILD_ID])?)
        } else {
            None
        };
        let metadata = self.resource_metadata(&path, &[]);
        if policy_logical_id.is_some() {
            self.implicit_children.insert(path.child(BUCKET_POLICY_CHILD_ID));
        }
        self.push(
            path,
            Declaration::Bucket {
                bucket: bucket.clone(),
                policy_logical_id,
                metadata,
            },
        );

        Ok(bucket)
    }

    /// Registers a handle to an existing bucket. Nothing is created.
    pub fn import_bucket(
        &mut self,
        scope: &ScopePath,
        id: &str,
        bucket_name: NonEmptyString,
    ) -> AppResult<ExternalBucket> {
        let bucket = ExternalBucket::from_bucket_name(bucket_name, &self.environment)?;
        let path = self.reserve(scope, id)?;
        self.push(path, Declaration::ImportedBucket(bucket.clone()));
        Ok(bucket)
    }

    /// Appends linter suppressions to a declared resource's metadata.
    pub fn add_suppress_rules(
        &mut self,
        logical_id: &LogicalId,
        rules: impl IntoIterator<Item = SuppressionRule>,
    ) -> AppResult<()> {
        let node = self.node_for_logical_id_mut(logical_id)?;
        match &mut node.declaration {
            Declaration::Policy { metadata, .. } | Declaration::Bucket { metadata, .. } => {
                metadata.add_suppress_rules(rules);
                Ok(())
            }
            Declaration::Construct | Declaration::ImportedBucket(_) => Err(AppError::Validation(
                format!("declaration '{logical_id}' has no resource to annotate"),
            )),
        }
    }

    /// Attaches a declared policy to an existing role by name.
    pub fn attach_policy(&mut self, policy: &PolicyHandle, role_name: &str) -> AppResult<()> {
        let role_name = NonEmptyString::named("role name", role_name)?;
        let node = self.node_for_logical_id_mut(policy.logical_id())?;
        match &mut node.declaration {
            Declaration::Policy { roles, .. } => {
                if !roles.contains(&role_name) {
                    roles.push(role_name);
                }
                Ok(())
            }
            _ => Err(AppError::Validation(format!(
                "declaration '{}' is not a policy",
                policy.logical_id()
            ))),
        }
    }

    /// Returns every declaration in registration order.
    #[must_use]
    pub fn declarations(&self) -> Vec<DeclarationSummary> {
        self.nodes
            .iter()
            .map(|node| DeclarationSummary {
                path: node.path.clone(),
                kind: node.declaration.kind(),
            })
            .collect()
    }

    /// Returns the declarations directly inside `scope`.
    #[must_use]
    pub fn children(&self, scope: &ScopePath) -> Vec<DeclarationSummary> {
        self.declarations()
            .into_iter()
            .filter(|summary| summary.path.parent().as_ref() == Some(scope))
            .collect()
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn construct_path(&self, path: &ScopePath, extra: &[&str]) -> String {
        let mut rendered = format!("{}/{path}", self.name);
        for component in extra {
            rendered.push('/');
            rendered.push_str(component);
        }
        rendered.push('/');
        rendered.push_str(HIDDEN_FROM_HUMAN_COMPONENT);
        rendered
    }

    fn resource_metadata(&self, path: &ScopePath, extra: &[&str]) -> ResourceMetadata {
        ResourceMetadata::for_path(self.construct_path(path, extra))
    }

    fn reserve(&self, scope: &ScopePath, id: &str) -> AppResult<ScopePath> {
        if id.trim().is_empty() {
            return Err(AppError::Validation(
                "construct id must not be empty or whitespace".to_owned(),
            ));
        }

        if id.contains('/') {
            return Err(AppError::Validation(format!(
                "construct id '{id}' must not contain '/'"
            )));
        }

        if !scope.is_root() && !self.index.contains_key(scope) {
            return Err(AppError::NotFound(format!(
                "scope '{scope}' is not declared in stack '{}'",
                self.name
            )));
        }

        let path = scope.child(id);
        if self.index.contains_key(&path) || self.implicit_children.contains(&path) {
            let scope_label = if scope.is_root() {
                self.name.to_string()
            } else {
                format!("{}/{scope}", self.name)
            };
            return Err(AppError::Conflict(format!(
                "there is already a construct with id '{id}' in scope '{scope_label}'"
            )));
        }

        Ok(path)
    }

    fn push(&mut self, path: ScopePath, declaration: Declaration) {
        debug!(
            stack = %self.name,
            path = %path,
            kind = ?declaration.kind(),
            "declaration registered"
        );
        self.index.insert(path.clone(), self.nodes.len());
        self.nodes.push(Node { path, declaration });
    }

    fn node_for_logical_id_mut(&mut self, logical_id: &LogicalId) -> AppResult<&mut Node> {
        let stack_name = &self.name;
        self.nodes
            .iter_mut()
            .find(|node| node.declaration.logical_id() == Some(logical_id))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no resource with logical id '{logical_id}' in stack '{stack_name}'"
                ))
            })
    }
}
