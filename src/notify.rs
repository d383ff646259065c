//! Notification sink. Writes happen after the business transaction commits
//! and failures are only logged.

use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub user_id: Uuid,
    pub message: String,
    pub link: Option<String>,
}

impl Notice {
    pub fn new(user_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

pub async fn notify(pool: &DbPool, notice: &Notice) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, message, link)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(notice.user_id)
    .bind(&notice.message)
    .bind(notice.link.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fire-and-forget delivery of a batch.
pub async fn dispatch(pool: &DbPool, notices: &[Notice]) {
    for notice in notices {
        if let Err(err) = notify(pool, notice).await {
            tracing::warn!(error = %err, user_id = %notice.user_id, "notification failed");
        }
    }
}

/// Ids of every admin account, for farmer requests that need review.
pub async fn admin_ids(pool: &DbPool) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE role = 'admin'")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
