//! Plan storage: save, load, and list plans, and record overrides.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::captain::OverrideRecord;
use crate::model::{SafetyClass, VoyagePlan};

use super::{Result, Storage, StorageError};

/// One row of the plan list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    pub id: Uuid,
    pub created_at: Timestamp,
    pub vessel: String,
    pub departure: String,
    pub destination: String,
    pub class: SafetyClass,
    pub override_required: bool,
    pub overrides: usize,
}

impl Storage {
    /// Saves a plan. Alternatives are kept inside the plan body.
    pub fn save_plan(&self, plan: &VoyagePlan) -> Result<()> {
        let conn = self.open_plans()?;
        conn.execute(
            "INSERT INTO plan (id, created_at, vessel, departure, destination, class, override_required, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                plan.id.to_string(),
                plan.created_at.to_string(),
                &plan.request.vessel.name,
                &plan.request.departure.name,
                &plan.request.destination().name,
                plan.verdict.class.as_str(),
                plan.override_required,
                serde_json::to_string(plan)?,
            ],
        )?;
        Ok(())
    }

    /// Loads a saved plan.
    pub fn load_plan(&self, id: Uuid) -> Result<VoyagePlan> {
        let conn = self.open_plans()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM plan WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let body = body.ok_or(StorageError::PlanNotFound(id))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Lists saved plans, oldest first.
    pub fn list_plans(&self) -> Result<Vec<PlanSummary>> {
        let conn = self.open_plans()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.created_at, p.vessel, p.departure, p.destination, p.class,
                    p.override_required, COUNT(o.id)
             FROM plan p LEFT JOIN override o ON o.plan_id = p.id
             GROUP BY p.id
             ORDER BY p.created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut plans = Vec::new();
        for row in rows {
            let (id, created_at, vessel, departure, destination, class, override_required, overrides) =
                row?;
            plans.push(PlanSummary {
                id: id
                    .parse()
                    .map_err(|e| StorageError::Corrupt(format!("invalid plan id: {e}")))?,
                created_at: created_at
                    .parse()
                    .map_err(|e| StorageError::Corrupt(format!("invalid created_at: {e}")))?,
                vessel,
                departure,
                destination,
                class: class.parse().map_err(StorageError::Corrupt)?,
                override_required,
                overrides: usize::try_from(overrides).unwrap_or(0),
            });
        }
        Ok(plans)
    }

    /// Records an override against a saved plan.
    pub fn save_override(&self, record: &OverrideRecord) -> Result<()> {
        let conn = self.open_plans()?;
        let known: Option<String> = conn
            .query_row(
                "SELECT id FROM plan WHERE id = ?1",
                [record.plan_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(StorageError::PlanNotFound(record.plan_id));
        }
        conn.execute(
            "INSERT INTO override (id, plan_id, at, operator, body) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.id.to_string(),
                record.plan_id.to_string(),
                record.at.to_string(),
                &record.operator_id,
                serde_json::to_string(record)?,
            ],
        )?;
        Ok(())
    }

    /// Overrides recorded against a plan, oldest first.
    pub fn load_overrides(&self, plan_id: Uuid) -> Result<Vec<OverrideRecord>> {
        let conn = self.open_plans()?;
        let mut stmt = conn.prepare("SELECT body FROM override WHERE plan_id = ?1 ORDER BY at")?;
        let rows = stmt.query_map([plan_id.to_string()], |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for body in rows {
            records.push(serde_json::from_str(&body?)?);
        }
        Ok(records)
    }

    /// Opens the plan database, creating its tables on first use.
    fn open_plans(&self) -> Result<Connection> {
        let conn = Connection::open(self.plans_path())?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS plan (
                 id                TEXT PRIMARY KEY,
                 created_at        TEXT NOT NULL,
                 vessel            TEXT NOT NULL,
                 departure         TEXT NOT NULL,
                 destination       TEXT NOT NULL,
                 class             TEXT NOT NULL,
                 override_required INTEGER NOT NULL,
                 body              TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS override (
                 id       TEXT PRIMARY KEY,
                 plan_id  TEXT NOT NULL REFERENCES plan(id),
                 at       TEXT NOT NULL,
                 operator TEXT NOT NULL,
                 body     TEXT NOT NULL
             );",
        )?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::audit::MemoryLogbook;
    use crate::captain::CaptainOverride;
    use crate::catalog::AnchorageCatalog;
    use crate::forecast::StaticForecast;
    use crate::model::{PlanRequest, Position, Vessel, Waypoint};
    use crate::planner::RoutePlanner;
    use crate::safety::SafetyAssessor;
    use crate::selector::AnchorageSelector;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("lookout")).unwrap();
        (dir, storage)
    }

    /// A plan with no forecast behind it, so it is blocked.
    fn sample_plan(depart_at: &str) -> VoyagePlan {
        let planner = RoutePlanner::new(
            SafetyAssessor::default(),
            AnchorageSelector::default(),
            AnchorageCatalog::princes_islands(),
            Arc::new(StaticForecast::default()),
        );
        let request = PlanRequest {
            vessel: Vessel {
                name: "Poyraz".into(),
                ..Vessel::default()
            },
            departure: Waypoint {
                name: "Kalamış".into(),
                position: Position::new(40.98, 29.03),
            },
            waypoints: vec![Waypoint {
                name: "Büyükada".into(),
                position: Position::new(40.86, 29.12),
            }],
            nights: 1,
            depart_at: depart_at.parse().unwrap(),
        };
        planner.plan(&request).unwrap()
    }

    #[test]
    fn save_and_load_plan() {
        let (_dir, storage) = test_storage();
        let plan = sample_plan("2026-07-01T06:00:00Z");

        storage.save_plan(&plan).unwrap();
        let loaded = storage.load_plan(plan.id).unwrap();

        assert_eq!(loaded.id, plan.id);
        assert_eq!(loaded.verdict.class, plan.verdict.class);
        assert_eq!(loaded.segments.len(), plan.segments.len());
    }

    #[test]
    fn load_nonexistent_plan_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.load_plan(Uuid::new_v4()).unwrap_err();

        assert!(matches!(err, StorageError::PlanNotFound(_)));
    }

    #[test]
    fn saving_a_plan_twice_fails() {
        let (_dir, storage) = test_storage();
        let plan = sample_plan("2026-07-01T06:00:00Z");

        storage.save_plan(&plan).unwrap();
        let err = storage.save_plan(&plan).unwrap_err();

        assert!(matches!(err, StorageError::Sqlite(_)));
    }

    #[test]
    fn list_plans_empty() {
        let (_dir, storage) = test_storage();
        assert!(storage.list_plans().unwrap().is_empty());
    }

    #[test]
    fn list_plans_sorted_by_created_at() {
        let (_dir, storage) = test_storage();
        let mut first = sample_plan("2026-07-01T06:00:00Z");
        first.created_at = Timestamp::new(1_000_000_000, 0).unwrap();
        let mut second = sample_plan("2026-07-02T06:00:00Z");
        second.created_at = Timestamp::new(2_000_000_000, 0).unwrap();

        // Save in reverse order to verify sorting.
        storage.save_plan(&second).unwrap();
        storage.save_plan(&first).unwrap();

        let plans = storage.list_plans().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, first.id);
        assert_eq!(plans[1].id, second.id);
        assert_eq!(plans[0].vessel, "Poyraz");
        assert_eq!(plans[0].destination, "Büyükada");
        assert_eq!(plans[0].class, first.verdict.class);
    }

    #[test]
    fn overrides_are_kept_per_plan() {
        let (_dir, storage) = test_storage();
        let plan = sample_plan("2026-07-01T06:00:00Z");
        storage.save_plan(&plan).unwrap();

        let record = CaptainOverride::new("deniz", "medical evacuation", true)
            .apply(&plan, &MemoryLogbook::new())
            .unwrap();
        storage.save_override(&record).unwrap();

        let loaded = storage.load_overrides(plan.id).unwrap();
        assert_eq!(loaded, vec![record]);
        assert_eq!(storage.list_plans().unwrap()[0].overrides, 1);
    }

    #[test]
    fn override_for_unknown_plan_fails() {
        let (_dir, storage) = test_storage();
        let plan = sample_plan("2026-07-01T06:00:00Z");
        let record = CaptainOverride::new("deniz", "medical evacuation", true)
            .apply(&plan, &MemoryLogbook::new())
            .unwrap();

        let err = storage.save_override(&record).unwrap_err();
        assert!(matches!(err, StorageError::PlanNotFound(_)));
    }
}
