// crates/db/src/plans.rs
//! Daily plan documents, keyed `"{user}-{date}"`.

use chrono::{DateTime, Utc};
use coach_types::DailyTrainingPlan;
use sqlx::SqliteConnection;
use tracing::warn;

use crate::{Database, DbError, DbResult};

fn decode(id: &str, document: &str) -> DbResult<DailyTrainingPlan> {
    serde_json::from_str(document).map_err(|source| DbError::Json {
        id: id.to_string(),
        source,
    })
}

fn encode(plan: &DailyTrainingPlan) -> DbResult<String> {
    serde_json::to_string(plan).map_err(|source| DbError::Json {
        id: plan.id.clone(),
        source,
    })
}

fn stamp(plan: &DailyTrainingPlan) -> i64 {
    plan.updated_at.unwrap_or_else(Utc::now).timestamp()
}

impl Database {
    pub async fn get_plan(&self, id: &str) -> DbResult<Option<DailyTrainingPlan>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT document FROM daily_plans WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(document,)| decode(id, &document)).transpose()
    }

    /// Insert or replace the plan stored under `plan.id`.
    pub async fn put_plan(&self, user: &str, plan: &DailyTrainingPlan) -> DbResult<()> {
        sqlx::query(
            r#"INSERT INTO daily_plans (id, user_email, date, document, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(id) DO UPDATE SET
                   document = excluded.document,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&plan.id)
        .bind(user)
        .bind(&plan.date)
        .bind(encode(plan)?)
        .bind(stamp(plan))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store `plan` unless a document with its id already exists, and return
    /// whichever plan ends up stored.
    pub async fn insert_plan_if_absent(
        &self,
        user: &str,
        plan: &DailyTrainingPlan,
    ) -> DbResult<DailyTrainingPlan> {
        sqlx::query(
            r#"INSERT INTO daily_plans (id, user_email, date, document, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(&plan.id)
        .bind(user)
        .bind(&plan.date)
        .bind(encode(plan)?)
        .bind(stamp(plan))
        .execute(&self.pool)
        .await?;

        Ok(self.get_plan(&plan.id).await?.unwrap_or_else(|| plan.clone()))
    }

    /// Merge a partial update into the stored plan inside a write
    /// transaction. Returns `false` when no plan is stored under `id`.
    pub async fn update_plan(
        &self,
        id: &str,
        update: &DailyTrainingPlan,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = merge(&mut conn, id, update, now).await;
        let finish = if matches!(result, Ok(true)) {
            "COMMIT"
        } else {
            "ROLLBACK"
        };
        match sqlx::query(finish).execute(&mut *conn).await {
            Ok(_) => result,
            Err(e) if result.is_err() => {
                warn!(id, error = %e, "rollback failed");
                result
            }
            Err(e) => Err(e.into()),
        }
    }

}

async fn merge(
    conn: &mut SqliteConnection,
    id: &str,
    update: &DailyTrainingPlan,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let row: Option<(String,)> = sqlx::query_as("SELECT document FROM daily_plans WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some((document,)) = row else {
        return Ok(false);
    };

    let mut plan = decode(id, &document)?;
    plan.apply_update(update, now);

    sqlx::query("UPDATE daily_plans SET document = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(encode(&plan)?)
        .bind(now.timestamp())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(true)
}
