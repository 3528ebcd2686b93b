//! Core API project and user-key tools.
//!
//! These hit the Core API host rather than the orchestrator; results get the
//! same local sort/paginate treatment as topology queries. Membership comes
//! flattened out of the project detail record, since the Core API embeds it
//! there rather than exposing a separate listing.

use crate::error::{Error, Result};
use crate::fabric::client::{ClientFactory, ProjectsQuery};
use crate::fabric::Record;
use crate::query::{apply_sort, paginate, SortSpec};
use serde_json::Value;

/// Project-member roles carried inline on a Core API project record.
const MEMBER_FIELDS: [&str; 3] = ["project_members", "project_owners", "project_creators"];

/// Default key-type filter; matches what slivers accept.
pub const DEFAULT_KEY_TYPE: &str = "sliver";

pub struct ProjectTools {
    clients: ClientFactory,
}

impl ProjectTools {
    #[must_use]
    pub fn new(clients: ClientFactory) -> Self {
        Self { clients }
    }

    /// List Core API projects visible to the caller, optionally narrowed by
    /// name, id, or member uuid.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn show_my_projects(
        &self,
        token: &str,
        query: &ProjectsQuery,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Record>> {
        let mut items = (self.clients)()?.get_projects(token, query).await?;
        apply_sort(&mut items, sort);
        Ok(paginate(items, limit, offset))
    }

    /// List the users of one project, flattened across member roles.
    ///
    /// # Errors
    ///
    /// Fails on an empty project uuid or upstream failure.
    pub async fn list_project_users(
        &self,
        token: &str,
        project_uuid: &str,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Record>> {
        if project_uuid.is_empty() {
            return Err(Error::Custom("project_uuid is required".to_string()));
        }
        let project = (self.clients)()?.get_project(token, project_uuid).await?;
        let mut users = flatten_members(&project);
        apply_sort(&mut users, sort);
        Ok(paginate(users, limit, offset))
    }

    /// Fetch a user's public keys, filtered by key type (`"sliver"` unless
    /// overridden).
    ///
    /// # Errors
    ///
    /// Fails on an empty user uuid or upstream failure.
    pub async fn get_user_keys(
        &self,
        token: &str,
        user_uuid: &str,
        key_type: Option<&str>,
    ) -> Result<Vec<Record>> {
        if user_uuid.is_empty() {
            return Err(Error::Custom("user_uuid is required".to_string()));
        }
        let keys = (self.clients)()?.get_user_keys(token, user_uuid).await?;
        let wanted = key_type.unwrap_or(DEFAULT_KEY_TYPE);
        Ok(keys
            .into_iter()
            .filter(|k| {
                k.get("fabric_key_type")
                    .and_then(Value::as_str)
                    .is_none_or(|t| t == wanted)
            })
            .collect())
    }
}

/// Pull the inline member arrays out of a project detail record, deduplicated
/// by user uuid across roles.
fn flatten_members(project: &Record) -> Vec<Record> {
    let mut seen = Vec::new();
    let mut users = Vec::new();
    for field in MEMBER_FIELDS {
        let Some(Value::Array(members)) = project.get(field) else {
            continue;
        };
        for member in members {
            let Value::Object(user) = member else {
                continue;
            };
            let uuid = user.get("uuid").and_then(Value::as_str).map(str::to_string);
            if let Some(uuid) = uuid {
                if seen.contains(&uuid) {
                    continue;
                }
                seen.push(uuid);
            }
            users.push(user.clone());
        }
    }
    users
}
