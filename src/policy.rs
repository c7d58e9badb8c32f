//! Policy identities and authorization
//!
//! Every UI entry point is guarded by a policy whose identity is a plain
//! string synthesized from type names and an action tag:
//!
//! - `{Context}/Info` for the context overview
//! - `{Context}/{RecordType}/{Read|Create|Edit|Delete}` for set actions
//!
//! The UI and the registration pass build these strings independently, so
//! synthesis must stay pure.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::discovery::Catalog;
use crate::error::{AdminError, Result};

// ============================================================================
// Actions and identities
// ============================================================================

/// Authorizable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    ReadContextInfo,
    ReadRecords,
    CreateRecord,
    EditRecord,
    DeleteRecord,
}

impl Action {
    /// Actions guarded per set
    pub const SET_ACTIONS: [Action; 4] = [
        Action::ReadRecords,
        Action::CreateRecord,
        Action::EditRecord,
        Action::DeleteRecord,
    ];

    /// Tag used in policy identities
    pub fn tag(&self) -> &'static str {
        match self {
            Action::ReadContextInfo => "Info",
            Action::ReadRecords => "Read",
            Action::CreateRecord => "Create",
            Action::EditRecord => "Edit",
            Action::DeleteRecord => "Delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Deterministic key of an authorization policy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyIdentity(String);

impl PolicyIdentity {
    /// Identity of a context-level action
    pub fn context(context_type: &str, action: Action) -> Self {
        Self(format!("{}/{}", context_type, action.tag()))
    }

    /// Identity of a set-level action
    pub fn set(context_type: &str, set_type: &str, action: Action) -> Self {
        Self(format!("{}/{}/{}", context_type, set_type, action.tag()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Principals and action info
// ============================================================================

/// The user a request runs as
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// `None` for anonymous users
    pub name: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub claims: Vec<(String, String)>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push((claim_type.into(), value.into()));
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims.iter().any(|(t, v)| t == claim_type && v == value)
    }
}

/// What the host's authorization callback is asked about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInfo {
    pub action: Action,
    pub context_name: String,
    /// Record type name; `None` for context-level actions
    pub set_name: Option<String>,
}

impl ActionInfo {
    pub fn context(action: Action, context_name: impl Into<String>) -> Self {
        Self {
            action,
            context_name: context_name.into(),
            set_name: None,
        }
    }

    pub fn set(action: Action, context_name: impl Into<String>, set_name: impl Into<String>) -> Self {
        Self {
            action,
            context_name: context_name.into(),
            set_name: Some(set_name.into()),
        }
    }

    /// Identity of the policy guarding this action
    pub fn identity(&self) -> PolicyIdentity {
        match &self.set_name {
            Some(set) => PolicyIdentity::set(&self.context_name, set, self.action),
            None => PolicyIdentity::context(&self.context_name, self.action),
        }
    }
}

impl fmt::Display for ActionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.set_name {
            Some(set) => write!(f, "{} on {}/{}", self.action, self.context_name, set),
            None => write!(f, "{} on {}", self.action, self.context_name),
        }
    }
}

// ============================================================================
// Predicates and registration
// ============================================================================

/// Boolean assertion over the current user
pub type PolicyPredicate = Arc<dyn Fn(&Principal) -> bool + Send + Sync>;

/// Host callback deciding any action
pub type AuthorizationCallback = Arc<dyn Fn(&ActionInfo, &Principal) -> bool + Send + Sync>;

/// Callback that allows everything
pub fn allow_all() -> AuthorizationCallback {
    Arc::new(|_, _| true)
}

/// Every (identity, predicate) pair for the discovered contexts and sets
///
/// Each predicate forwards to `callback` with the matching [`ActionInfo`], so
/// every UI entry point resolves to a policy even when the host configures
/// nothing.
pub fn default_policies(
    catalog: &Catalog,
    callback: &AuthorizationCallback,
) -> Vec<(PolicyIdentity, PolicyPredicate)> {
    let mut policies = Vec::new();

    let mut push = |info: ActionInfo| {
        let identity = info.identity();
        let callback = Arc::clone(callback);
        let predicate: PolicyPredicate = Arc::new(move |principal| callback(&info, principal));
        policies.push((identity, predicate));
    };

    for context in catalog.contexts() {
        push(ActionInfo::context(Action::ReadContextInfo, &context.name));
        for set in &context.sets {
            for action in Action::SET_ACTIONS {
                push(ActionInfo::set(action, &context.name, &set.record_type));
            }
        }
    }

    policies
}

/// Evaluates registered policies
pub trait AuthorizationEvaluator: Send + Sync {
    /// Attach a predicate to an identity, replacing any earlier one
    fn add_policy(&mut self, identity: PolicyIdentity, predicate: PolicyPredicate);

    /// Evaluate an identity for a principal; unknown identities are an error
    fn evaluate(&self, identity: &PolicyIdentity, principal: &Principal) -> Result<bool>;
}

/// In-process policy table
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<PolicyIdentity, PolicyPredicate>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register many policies at once
    pub fn register_all<I>(&mut self, policies: I)
    where
        I: IntoIterator<Item = (PolicyIdentity, PolicyPredicate)>,
    {
        let before = self.policies.len();
        let mut registered = 0usize;
        for (identity, predicate) in policies {
            self.add_policy(identity, predicate);
            registered += 1;
        }
        info!(
            registered,
            distinct_added = self.policies.len() - before,
            "Registered authorization policies"
        );
    }

    pub fn contains(&self, identity: &PolicyIdentity) -> bool {
        self.policies.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Registered identities, sorted
    pub fn identities(&self) -> Vec<&PolicyIdentity> {
        let mut identities: Vec<_> = self.policies.keys().collect();
        identities.sort();
        identities
    }
}

impl AuthorizationEvaluator for PolicyRegistry {
    fn add_policy(&mut self, identity: PolicyIdentity, predicate: PolicyPredicate) {
        self.policies.insert(identity, predicate);
    }

    fn evaluate(&self, identity: &PolicyIdentity, principal: &Principal) -> Result<bool> {
        let predicate = self
            .policies
            .get(identity)
            .ok_or_else(|| AdminError::policy_not_found(identity.as_str()))?;
        let allowed = predicate(principal);
        debug!(policy = %identity, allowed, "Evaluated policy");
        Ok(allowed)
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("policies", &self.identities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DataContext;
    use crate::schema::{ContextDefinition, DataModel, RecordType};

    fn catalog() -> Catalog {
        let model = DataModel::new()
            .record_type(RecordType::new("ParentEntity"))
            .record_type(RecordType::new("JobEntity"));
        let demo = ContextDefinition::new("DemoDbContext", model)
            .set("Parents", "ParentEntity")
            .set("Jobs", "JobEntity");
        Catalog::discover([&demo as &dyn DataContext]).unwrap()
    }

    // =========================================================================
    // Identity Tests
    // =========================================================================

    #[test]
    fn test_identity_format() {
        assert_eq!(
            PolicyIdentity::context("DemoDbContext", Action::ReadContextInfo).as_str(),
            "DemoDbContext/Info"
        );
        assert_eq!(
            PolicyIdentity::set("DemoDbContext", "ParentEntity", Action::EditRecord).as_str(),
            "DemoDbContext/ParentEntity/Edit"
        );
    }

    #[test]
    fn test_identity_is_pure_and_action_sensitive() {
        let a = PolicyIdentity::set("Ctx", "Set", Action::ReadRecords);
        let b = PolicyIdentity::set("Ctx", "Set", Action::ReadRecords);
        assert_eq!(a, b);

        let all: BTreeSet<_> = Action::SET_ACTIONS
            .iter()
            .map(|action| PolicyIdentity::set("Ctx", "Set", *action))
            .collect();
        assert_eq!(all.len(), Action::SET_ACTIONS.len());
    }

    #[test]
    fn test_action_info_display_and_identity() {
        let info = ActionInfo::set(Action::DeleteRecord, "DemoDbContext", "JobEntity");
        assert_eq!(info.to_string(), "Delete on DemoDbContext/JobEntity");
        assert_eq!(info.identity().as_str(), "DemoDbContext/JobEntity/Delete");

        let info = ActionInfo::context(Action::ReadContextInfo, "DemoDbContext");
        assert_eq!(info.to_string(), "Info on DemoDbContext");
        assert_eq!(info, ActionInfo::context(Action::ReadContextInfo, "DemoDbContext"));
    }

    // =========================================================================
    // Principal Tests
    // =========================================================================

    #[test]
    fn test_principal() {
        let anonymous = Principal::anonymous();
        assert!(!anonymous.is_authenticated());

        let ada = Principal::authenticated("ada")
            .with_role("Admin")
            .with_claim("department", "hr");
        assert!(ada.is_authenticated());
        assert!(ada.is_in_role("Admin"));
        assert!(!ada.is_in_role("User"));
        assert!(ada.has_claim("department", "hr"));
        assert!(!ada.has_claim("department", "it"));
    }

    // =========================================================================
    // Registration Tests
    // =========================================================================

    #[test]
    fn test_default_policies_cover_every_entry_point() {
        let policies = default_policies(&catalog(), &allow_all());
        // one info policy plus four per set
        assert_eq!(policies.len(), 1 + 2 * 4);

        let mut registry = PolicyRegistry::new();
        registry.register_all(policies);

        let anonymous = Principal::anonymous();
        assert!(registry
            .evaluate(&PolicyIdentity::context("DemoDbContext", Action::ReadContextInfo), &anonymous)
            .unwrap());
        for action in Action::SET_ACTIONS {
            let identity = PolicyIdentity::set("DemoDbContext", "JobEntity", action);
            assert!(registry.evaluate(&identity, &anonymous).unwrap());
        }
    }

    #[test]
    fn test_callback_receives_action_info() {
        let callback: AuthorizationCallback = Arc::new(|info, principal| {
            info.action == Action::ReadRecords || principal.is_in_role("Admin")
        });
        let mut registry = PolicyRegistry::new();
        registry.register_all(default_policies(&catalog(), &callback));

        let user = Principal::authenticated("bob");
        let admin = Principal::authenticated("ada").with_role("Admin");
        let read = PolicyIdentity::set("DemoDbContext", "ParentEntity", Action::ReadRecords);
        let delete = PolicyIdentity::set("DemoDbContext", "ParentEntity", Action::DeleteRecord);

        assert!(registry.evaluate(&read, &user).unwrap());
        assert!(!registry.evaluate(&delete, &user).unwrap());
        assert!(registry.evaluate(&delete, &admin).unwrap());
    }

    #[test]
    fn test_add_policy_replaces() {
        let mut registry = PolicyRegistry::new();
        registry.register_all(default_policies(&catalog(), &allow_all()));
        let identity = PolicyIdentity::set("DemoDbContext", "JobEntity", Action::EditRecord);

        registry.add_policy(identity.clone(), Arc::new(|p| p.is_in_role("Admin")));

        assert!(!registry.evaluate(&identity, &Principal::anonymous()).unwrap());
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_unknown_identity_is_an_error() {
        let registry = PolicyRegistry::new();
        let result = registry.evaluate(
            &PolicyIdentity::set("Other", "Set", Action::ReadRecords),
            &Principal::anonymous(),
        );
        assert!(matches!(result, Err(AdminError::PolicyNotFound(_))));
    }
}
