//! Cascade save orchestrator.

use futures::future::{BoxFuture, FutureExt};

use super::{CascadeConfig, CascadePath, CascadePlan, RelType};
use crate::collection::Collection;
use crate::document::{Capability, Document};
use crate::error::StrataResult;
use crate::store::{Query, Update};

/// Propagate a just-persisted document into every collection embedding it.
///
/// Documents without the `Cascading` capability are a no-op. Configs run in
/// order and the first failure aborts the run; effects of earlier configs
/// stay committed.
pub async fn cascade_save(collection: &Collection, doc: &dyn Document) -> StrataResult<()> {
    match CascadePlan::collect(collection, doc) {
        Some(plan) => run_save(plan).await,
        None => Ok(()),
    }
}

/// Execute an already collected save plan
pub async fn run_save(plan: CascadePlan) -> StrataResult<()> {
    let mut path = CascadePath::new(plan.collection.database().settings().max_nest_depth);
    save_plan(plan, &mut path).await
}

fn save_plan(plan: CascadePlan, path: &mut CascadePath) -> BoxFuture<'_, StrataResult<()>> {
    async move {
        path.enter(plan.collection.name(), plan.source_id)?;

        for conf in &plan.configs {
            let reference = conf.resolved_reference(plan.collection.name(), plan.source_id)?;
            save_with_config(conf, &reference).await?;

            if let Some(factory) = &conf.instance {
                let owners = conf.collection.find_values(&conf.query).await?;
                log::debug!(
                    "nesting cascade from {} into {} owner(s) in {} at depth {}",
                    plan.collection.name(),
                    owners.len(),
                    conf.collection.name(),
                    path.depth()
                );

                for value in owners {
                    let mut owner = factory(value)?;
                    if owner.has(Capability::AfterFind) {
                        owner.after_find(&conf.collection)?;
                    }
                    if owner.has(Capability::NewTrackable) {
                        owner.set_is_new(false);
                    }

                    if let Some(nested) = CascadePlan::collect(&conf.collection, owner.as_ref()) {
                        save_plan(nested, path).await?;
                    }
                }
            }
        }

        path.leave();
        Ok(())
    }
    .boxed()
}

/// Run the save half of a single rule
pub(crate) async fn save_with_config(conf: &CascadeConfig, reference: &Query) -> StrataResult<()> {
    let target = &conf.collection;

    match conf.rel_type {
        RelType::One => {
            if let Some(old_query) = &conf.old_query {
                if let Some(clear) = conf.clear_update() {
                    target.update_many(old_query, &clear).await?;
                }
            }
            if conf.remove_only {
                return Ok(());
            }

            target.update_many(&conf.query, &conf.embed_update()?).await?;
        }
        RelType::Many => {
            let through = conf.array_path()?;
            let pull_self = Update::pull(through, reference.clone());

            if let Some(old_query) = &conf.old_query {
                target.update_many(old_query, &pull_self).await?;
            }
            if conf.remove_only {
                return Ok(());
            }

            // Drop any previous copy first so repeated saves never duplicate the entry
            target.update_many(&conf.query, &pull_self).await?;
            target.update_many(&conf.query, &Update::push(through, conf.data.clone())).await?;
        }
    }

    Ok(())
}
