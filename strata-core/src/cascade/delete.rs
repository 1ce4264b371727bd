//! Cascade delete orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CascadeConfig, CascadePlan, RelType};
use crate::collection::Collection;
use crate::document::Document;
use crate::error::{StrataError, StrataResult};
use crate::store::{Query, Update};

/// What a delete cascade does when one of its rules fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Run every rule, then report all failures together
    #[default]
    BestEffort,
    /// Stop at the first failing rule
    FailFast,
}

impl FromStr for DeletePolicy {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(DeletePolicy::BestEffort),
            "fail_fast" => Ok(DeletePolicy::FailFast),
            other => Err(StrataError::InvalidCascadeData(format!("unknown delete policy '{}'", other))),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePolicy::BestEffort => write!(f, "best_effort"),
            DeletePolicy::FailFast => write!(f, "fail_fast"),
        }
    }
}

/// Remove the embeds of a deleted document using the database's policy
pub async fn cascade_delete(collection: &Collection, doc: &dyn Document) -> StrataResult<()> {
    let policy = collection.database().settings().delete_policy;
    cascade_delete_with_policy(collection, doc, policy).await
}

/// Remove the embeds of a deleted document. Nested cascades never run here.
pub async fn cascade_delete_with_policy(
    collection: &Collection,
    doc: &dyn Document,
    policy: DeletePolicy,
) -> StrataResult<()> {
    match CascadePlan::collect(collection, doc) {
        Some(plan) => run_delete(plan, policy).await,
        None => Ok(()),
    }
}

/// Execute an already collected delete plan
pub async fn run_delete(plan: CascadePlan, policy: DeletePolicy) -> StrataResult<()> {
    let mut failures = Vec::new();

    for conf in &plan.configs {
        let result = match conf.resolved_reference(plan.collection.name(), plan.source_id) {
            Ok(reference) => delete_with_config(conf, &reference).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            match policy {
                DeletePolicy::FailFast => return Err(e),
                DeletePolicy::BestEffort => {
                    log::warn!(
                        "delete cascade from {} into {} failed: {}",
                        plan.collection.name(),
                        conf.collection.name(),
                        e
                    );
                    failures.push(e);
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(StrataError::Incomplete { failures })
    }
}

async fn delete_with_config(conf: &CascadeConfig, reference: &Query) -> StrataResult<()> {
    let target = &conf.collection;

    match conf.rel_type {
        RelType::One => {
            if let Some(clear) = conf.clear_update() {
                log::debug!("clearing embed in {} ({:?})", target.name(), conf.through_prop);
                target.update_many(&conf.query, &clear).await?;
            }
        }
        RelType::Many => {
            let through = conf.array_path()?;
            log::debug!("pulling entry from {}.{}", target.name(), through);
            target.update_many(&conf.query, &Update::pull(through, reference.clone())).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::document::{DocumentId, ID_FIELD};
    use crate::store::{DocumentStore, MemoryStore};
    use serde_json::json;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("best_effort".parse::<DeletePolicy>().unwrap(), DeletePolicy::BestEffort);
        assert_eq!("Fail-Fast".parse::<DeletePolicy>().unwrap(), DeletePolicy::FailFast);
        assert!("sometimes".parse::<DeletePolicy>().is_err());
        assert_eq!(DeletePolicy::default(), DeletePolicy::BestEffort);
        assert_eq!(DeletePolicy::FailFast.to_string(), "fail_fast");
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&DeletePolicy::FailFast).unwrap();
        assert_eq!(json, "\"fail_fast\"");
        let back: DeletePolicy = serde_json::from_str("\"best_effort\"").unwrap();
        assert_eq!(back, DeletePolicy::BestEffort);
    }

    #[tokio::test]
    async fn test_many_delete_pulls_by_custom_reference() {
        let store = MemoryStore::new();
        let db = Database::with_store(store.clone());
        let parent = DocumentId::new();
        let other = json!({ "slug": "c-2" });
        store
            .insert_or_replace("parents", parent, json!({ "children": [{ "slug": "c-1" }, other.clone()] }))
            .await
            .unwrap();

        let conf = CascadeConfig::many(db.collection("parents"))
            .through("children")
            .matching(Query::eq(ID_FIELD, parent))
            .reference("slug", "c-1");
        let plan = CascadePlan { collection: db.collection("slugged"), source_id: None, configs: vec![conf] };
        run_delete(plan, DeletePolicy::FailFast).await.unwrap();

        assert_eq!(store.get("parents", parent).await.unwrap()["children"], json!([other]));
    }
}
