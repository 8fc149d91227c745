//! Departure recording for issued manifests

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Manifest, RollStatus, MANIFEST_COLUMNS};

#[derive(Clone)]
pub struct DepartureService {
    db: PgPool,
}

impl DepartureService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Manifests whose truck has not left yet, oldest first
    pub async fn pending(&self) -> AppResult<Vec<Manifest>> {
        let manifests = sqlx::query_as::<_, Manifest>(&format!(
            "SELECT {} FROM romaneios WHERE departed_at IS NULL ORDER BY manifest_date, manifest_time, created_at",
            MANIFEST_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(manifests)
    }

    /// Stamp the departure and make sure every linked roll is `loaded`
    pub async fn record(&self, id: Uuid) -> AppResult<Manifest> {
        let mut tx = self.db.begin().await?;

        let manifest = sqlx::query_as::<_, Manifest>(&format!(
            "SELECT {} FROM romaneios WHERE id = $1 FOR UPDATE",
            MANIFEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Manifest".to_string()))?;

        if let Some(departed_at) = manifest.departed_at {
            return Err(AppError::conflict(
                "departed_at",
                format!("Manifest already departed at {}", departed_at.format("%d/%m/%Y %H:%M")),
                format!("Romaneio já expedido em {}", departed_at.format("%d/%m/%Y %H:%M")),
            ));
        }

        let departed = sqlx::query_as::<_, Manifest>(&format!(
            "UPDATE romaneios SET departed_at = NOW() WHERE id = $1 RETURNING {}",
            MANIFEST_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let rolls = sqlx::query(
            r#"
            UPDATE bobinas SET status = $1
            WHERE id IN (SELECT roll_id FROM romaneios_bobinas WHERE manifest_id = $2)
              AND status <> $1
            "#,
        )
        .bind(RollStatus::Loaded)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            manifest_id = %id,
            crt = %departed.crt_number,
            rolls_flipped = rolls.rows_affected(),
            "departure recorded"
        );
        Ok(departed)
    }
}
