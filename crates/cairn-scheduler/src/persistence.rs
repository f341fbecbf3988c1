//! Couples a schedule to a retention policy: when the schedule is due, the
//! catalog's prune pass runs with that policy against a given uuid.

use chrono::{DateTime, Local};

use cairn_catalog::prune::{prune_with_policy, PruneReport, RetentionPolicy};
use cairn_catalog::{Catalog, IndexId};

use crate::schedule::ScheduleNode;

#[derive(Clone, Debug)]
pub struct PersistenceNode {
    pub schedule: ScheduleNode,
    pub retention: RetentionPolicy,
    pub last_run: Option<DateTime<Local>>,
}

impl PersistenceNode {
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.schedule.is_due(now, self.last_run)
    }

    /// Runs the retention pass if due, recording `now` as the new
    /// `last_run` on success.
    pub async fn run_if_due(
        &mut self,
        catalog: &Catalog,
        uuid_id: IndexId,
        now: DateTime<Local>,
    ) -> Result<Option<PruneReport>, cairn_catalog::Error> {
        if !self.is_due(now) {
            return Ok(None);
        }
        let report =
            prune_with_policy(catalog_pool(catalog), uuid_id, self.retention.clone(), now.timestamp()).await?;
        self.last_run = Some(now);
        Ok(Some(report))
    }
}

/// `Catalog` doesn't expose its pool publicly (operations go through its
/// own methods); maintenance code that needs direct pool access, like
/// running a specific `RetentionPolicy`, goes through this narrow seam
/// instead of widening `Catalog`'s public API.
fn catalog_pool(catalog: &Catalog) -> &sqlx::SqlitePool {
    catalog.raw_pool()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bandwidth::TimeOfDay;
    use cairn_catalog::model::StorageMode;
    use cairn_catalog::prune::AGE_FOREVER;
    use chrono::{TimeZone, Weekday};

    #[tokio::test]
    async fn runs_only_when_schedule_is_due() {
        let catalog = Catalog::open_memory().await.unwrap();
        let uuid_id = catalog.find_or_create_uuid("job-a").await.unwrap();
        let entity_id = catalog
            .create_entity(uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        catalog
            .create_storage(entity_id, "vol-1", StorageMode::Auto, 2000)
            .await
            .unwrap();

        let mut node = PersistenceNode {
            schedule: ScheduleNode::Daily {
                weekdays: vec![],
                time: TimeOfDay::new(2, 0),
            },
            retention: RetentionPolicy {
                archive_type: "full".to_string(),
                min_keep: 0,
                max_keep: 0,
                max_age_days: AGE_FOREVER,
                move_to: None,
            },
            last_run: None,
        };

        let not_due_time = Local.with_ymd_and_hms(2026, 8, 3, 5, 0, 0).unwrap();
        assert!(node.run_if_due(&catalog, uuid_id, not_due_time).await.unwrap().is_none());

        let due_time = Local.with_ymd_and_hms(2026, 8, 3, 2, 0, 0).unwrap();
        let report = node.run_if_due(&catalog, uuid_id, due_time).await.unwrap().unwrap();
        assert_eq!(report.purged_storages, 1);
        assert!(node.last_run.is_some());
    }
}
