use std::sync::RwLock;

use tracing::{debug, info};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::settings::{
    OptimizerSettings, PlannerSettings, ScoringWeights, KEY_PLANNER_SETTINGS,
};

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub scoring: Option<ScoringWeights>,
    pub optimizer: Option<OptimizerSettings>,
}

/// Planner configuration stored as one JSON document in `app_settings`.
pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<PlannerSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<PlannerSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<PlannerSettings> {
        let mut current = self.get()?;

        if let Some(scoring) = input.scoring {
            current.scoring = scoring;
        }
        if let Some(optimizer) = input.optimizer {
            current.optimizer = optimizer;
        }

        current.validate()?;
        self.db.with_connection(|conn| {
            SettingsRepository::upsert_json(conn, KEY_PLANNER_SETTINGS, &current)
        })?;
        info!(target: "app::settings", "planner settings updated");

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }
        Ok(current)
    }

    /// Drops the stored document so defaults apply again.
    pub fn reset(&self) -> AppResult<PlannerSettings> {
        self.db
            .with_connection(|conn| SettingsRepository::delete(conn, KEY_PLANNER_SETTINGS))?;
        let defaults = PlannerSettings::default();
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(defaults.clone());
        }
        info!(target: "app::settings", "planner settings reset to defaults");
        Ok(defaults)
    }

    fn load_from_db(&self) -> AppResult<PlannerSettings> {
        let stored = self.db.with_connection(|conn| {
            SettingsRepository::get_json::<PlannerSettings>(conn, KEY_PLANNER_SETTINGS)
        })?;

        match stored {
            Some(settings) => {
                settings.validate()?;
                Ok(settings)
            }
            None => {
                debug!(target: "app::settings", "no stored planner settings, using defaults");
                Ok(PlannerSettings::default())
            }
        }
    }
}
