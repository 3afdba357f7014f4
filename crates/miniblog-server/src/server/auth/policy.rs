use miniblog_core::Authorizer;

/// Methods a non-admin subject may use on its own resources.
const SELF_SERVICE_ACTIONS: [&str; 3] = ["GET", "PUT", "DELETE"];

/// Ownership-based policy.
///
/// The admin subject may do anything. Every other subject may read, update
/// and delete `/v1/users/{subject}` (and anything below it), and nothing else.
#[derive(Debug, Clone)]
pub struct PolicyAuthorizer {
    admin: String,
}

impl PolicyAuthorizer {
    pub fn new(admin: impl Into<String>) -> Self {
        Self {
            admin: admin.into(),
        }
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> bool {
        if subject == self.admin {
            return true;
        }
        if subject.is_empty() || !SELF_SERVICE_ACTIONS.contains(&action) {
            return false;
        }

        object
            .strip_prefix("/v1/users/")
            .and_then(|rest| rest.strip_prefix(subject))
            .is_some_and(|tail| tail.is_empty() || tail.starts_with('/'))
    }
}
