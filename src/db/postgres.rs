use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    repository::{
        AvailabilityRepository, ColorRepository, DateRepository, GroupRepository,
        MembershipRepository, UserRepository,
    },
    StoreError, StoreResult,
};
use crate::{
    interval::{RecurrenceLink, TimeWindow},
    models::{
        availability::{Availability, NewAvailability},
        color::{Color, NewColor},
        date::{Date, NewDate},
        group::{Group, Membership, NewGroup},
        user::{NewUser, User},
    },
};

const USER_COLUMNS: &str = "id, username, email, password_hash, name, surname, color_id,
    created_at, updated_at, deleted_at";
const DATE_COLUMNS: &str = "id, title, body, user_id, begin_time, end_time, private,
    recurrence_id, color_id, created_at, updated_at";
/// Advisory lock taken by every date update that sets a recurrence parent.
const RECURRENCE_LOCK_KEY: i64 = 0x7970_6c61_6e00_0001;

/// sqlx-backed implementation of every storage port.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate constraint violations into the store's error kinds.
fn write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let msg = match db.constraint() {
                Some("users_email_key") => "email already in use",
                Some("users_username_key") => "username already in use",
                Some("colors_hex_code_key") => "hex_code already in use",
                Some("user_groups_pkey") => "user is already a member of this group",
                _ => "unique constraint violated",
            };
            return StoreError::Conflict(msg.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::InvalidReference(format!(
                "referenced record does not exist ({})",
                db.constraint().unwrap_or("foreign key")
            ));
        }
        if db.is_check_violation() {
            return StoreError::InvalidReference(
                "begin_time must be before end_time".to_string(),
            );
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, name, surname, color_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(user.color_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(user)
    }

    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", format!("id {id}")))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", format!("email {email}")))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", format!("username {username}")))
    }

    async fn update_by_id(&self, id: i64, user: &NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = $1, email = $2, password_hash = $3,
                 name = $4, surname = $5, color_id = $6, updated_at = NOW()
             WHERE id = $7 AND deleted_at IS NULL
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(user.color_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?
        .ok_or_else(|| StoreError::not_found("user", format!("id {id}")))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::not_found("user", format!("id {id}")));
        }

        // The row stays, so the ON DELETE CASCADE rules do not fire.
        for stmt in [
            "DELETE FROM dates WHERE user_id = $1",
            "DELETE FROM availabilities WHERE user_id = $1",
            "DELETE FROM user_groups WHERE user_id = $1",
            "DELETE FROM groups WHERE creator_id = $1",
        ] {
            sqlx::query(stmt).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        tracing::info!(user_id = id, "user soft-deleted with owned records");
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for PgStore {
    async fn create(&self, group: &NewGroup) -> StoreResult<Group> {
        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (name, creator_id)
             VALUES ($1, $2)
             RETURNING *",
        )
        .bind(&group.name)
        .bind(group.creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(group)
    }

    async fn find_all(&self) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>("SELECT * FROM groups ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Group> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("group", format!("id {id}")))
    }

    async fn find_by_creator_id(&self, creator_id: i64) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE creator_id = $1 ORDER BY name, id",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn update_by_id(&self, id: i64, group: &NewGroup) -> StoreResult<Group> {
        sqlx::query_as::<_, Group>(
            "UPDATE groups
             SET name = $1, creator_id = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING *",
        )
        .bind(&group.name)
        .bind(group.creator_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?
        .ok_or_else(|| StoreError::not_found("group", format!("id {id}")))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::not_found("group", format!("id {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ColorRepository for PgStore {
    async fn create(&self, color: &NewColor) -> StoreResult<Color> {
        let color = sqlx::query_as::<_, Color>(
            "INSERT INTO colors (hex_code, name)
             VALUES ($1, $2)
             RETURNING *",
        )
        .bind(&color.hex_code)
        .bind(&color.name)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(color)
    }

    async fn find_all(&self) -> StoreResult<Vec<Color>> {
        let colors = sqlx::query_as::<_, Color>("SELECT * FROM colors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(colors)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Color> {
        sqlx::query_as::<_, Color>("SELECT * FROM colors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("color", format!("id {id}")))
    }

    async fn find_by_hex_code(&self, hex_code: &str) -> StoreResult<Color> {
        sqlx::query_as::<_, Color>("SELECT * FROM colors WHERE hex_code = $1")
            .bind(hex_code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("color", format!("hex_code {hex_code}")))
    }

    async fn update_by_id(&self, id: i64, color: &NewColor) -> StoreResult<Color> {
        sqlx::query_as::<_, Color>(
            "UPDATE colors
             SET hex_code = $1, name = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING *",
        )
        .bind(&color.hex_code)
        .bind(&color.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?
        .ok_or_else(|| StoreError::not_found("color", format!("id {id}")))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        // ON DELETE SET NULL clears users, dates and memberships.
        let res = sqlx::query("DELETE FROM colors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::not_found("color", format!("id {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AvailabilityRepository for PgStore {
    async fn create(&self, availability: &NewAvailability) -> StoreResult<Availability> {
        let availability = sqlx::query_as::<_, Availability>(
            "INSERT INTO availabilities (user_id, begin_time, end_time)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(availability.user_id)
        .bind(availability.window.begin())
        .bind(availability.window.end())
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(availability)
    }

    async fn find_all(&self) -> StoreResult<Vec<Availability>> {
        let rows = sqlx::query_as::<_, Availability>("SELECT * FROM availabilities ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Availability> {
        sqlx::query_as::<_, Availability>("SELECT * FROM availabilities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("availability", format!("id {id}")))
    }

    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Availability> {
        sqlx::query_as::<_, Availability>("SELECT * FROM availabilities WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("availability", format!("id {user_id}")))
    }

    async fn find_by_owner(&self, user_id: i64) -> StoreResult<Vec<Availability>> {
        let rows = sqlx::query_as::<_, Availability>(
            "SELECT * FROM availabilities WHERE user_id = $1 ORDER BY begin_time, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_by_id(
        &self,
        id: i64,
        availability: &NewAvailability,
    ) -> StoreResult<Availability> {
        sqlx::query_as::<_, Availability>(
            "UPDATE availabilities
             SET user_id = $1, begin_time = $2, end_time = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING *",
        )
        .bind(availability.user_id)
        .bind(availability.window.begin())
        .bind(availability.window.end())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?
        .ok_or_else(|| StoreError::not_found("availability", format!("id {id}")))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM availabilities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::not_found("availability", format!("id {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DateRepository for PgStore {
    async fn create(&self, date: &NewDate) -> StoreResult<Date> {
        let date = sqlx::query_as::<_, Date>(&format!(
            "INSERT INTO dates (title, body, user_id, begin_time, end_time, private,
                                recurrence_id, color_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {DATE_COLUMNS}"
        ))
        .bind(&date.title)
        .bind(&date.body)
        .bind(date.user_id)
        .bind(date.window.begin())
        .bind(date.window.end())
        .bind(date.private)
        .bind(date.recurrence_id)
        .bind(date.color_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(date)
    }

    async fn find_all(&self) -> StoreResult<Vec<Date>> {
        let dates = sqlx::query_as::<_, Date>(&format!(
            "SELECT {DATE_COLUMNS} FROM dates ORDER BY begin_time, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Date> {
        sqlx::query_as::<_, Date>(&format!("SELECT {DATE_COLUMNS} FROM dates WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("date", format!("id {id}")))
    }

    async fn find_by_owner(&self, user_id: i64) -> StoreResult<Vec<Date>> {
        let dates = sqlx::query_as::<_, Date>(&format!(
            "SELECT {DATE_COLUMNS} FROM dates WHERE user_id = $1 ORDER BY begin_time, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn find_by_recurrence_id(&self, recurrence_id: i64) -> StoreResult<RecurrenceLink> {
        let date = DateRepository::find_by_id(self, recurrence_id).await?;
        let recurrence = match date.recurrence_id {
            Some(parent) => sqlx::query_as::<_, Date>(&format!(
                "SELECT {DATE_COLUMNS} FROM dates WHERE id = $1"
            ))
            .bind(parent)
            .fetch_optional(&self.pool)
            .await?,
            None => None,
        };
        Ok(RecurrenceLink { date, recurrence })
    }

    async fn find_recurrence_children(&self, parent_id: i64) -> StoreResult<Vec<Date>> {
        let dates = sqlx::query_as::<_, Date>(&format!(
            "SELECT {DATE_COLUMNS} FROM dates WHERE recurrence_id = $1 ORDER BY begin_time, id"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn find_by_day_range(
        &self,
        window: &TimeWindow,
        user_id: i64,
    ) -> StoreResult<Vec<Date>> {
        // Containment, mirrors TimeWindow::contains.
        let dates = sqlx::query_as::<_, Date>(&format!(
            "SELECT {DATE_COLUMNS} FROM dates
             WHERE user_id = $1 AND begin_time >= $2 AND end_time <= $3
             ORDER BY begin_time, id"
        ))
        .bind(user_id)
        .bind(window.begin())
        .bind(window.end())
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn update_by_id(&self, id: i64, date: &NewDate) -> StoreResult<Date> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent) = date.recurrence_id {
            // Held until commit: re-links run one at a time, so two of them
            // cannot close a loop between them.
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(RECURRENCE_LOCK_KEY)
                .execute(&mut *tx)
                .await?;
            let closes_loop: bool = sqlx::query_scalar(
                "WITH RECURSIVE ancestors(id, recurrence_id) AS (
                     SELECT id, recurrence_id FROM dates WHERE id = $1
                     UNION
                     SELECT d.id, d.recurrence_id
                     FROM dates d JOIN ancestors a ON d.id = a.recurrence_id
                 )
                 SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)",
            )
            .bind(parent)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if closes_loop {
                return Err(StoreError::InvalidReference(format!(
                    "recurrence_id would make date {id} its own ancestor"
                )));
            }
        }

        let row = sqlx::query_as::<_, Date>(&format!(
            "UPDATE dates
             SET title = $1, body = $2, user_id = $3, begin_time = $4, end_time = $5,
                 private = $6, recurrence_id = $7, color_id = $8, updated_at = NOW()
             WHERE id = $9
             RETURNING {DATE_COLUMNS}"
        ))
        .bind(&date.title)
        .bind(&date.body)
        .bind(date.user_id)
        .bind(date.window.begin())
        .bind(date.window.end())
        .bind(date.private)
        .bind(date.recurrence_id)
        .bind(date.color_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_error)?
        .ok_or_else(|| StoreError::not_found("date", format!("id {id}")))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        // ON DELETE SET NULL detaches recurrence children.
        let res = sqlx::query("DELETE FROM dates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::not_found("date", format!("id {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipRepository for PgStore {
    async fn create(&self, membership: &Membership) -> StoreResult<Membership> {
        let row = sqlx::query_as::<_, Membership>(
            "INSERT INTO user_groups (user_id, group_id, color_id)
             VALUES ($1, $2, $3)
             RETURNING user_id, group_id, color_id",
        )
        .bind(membership.user_id)
        .bind(membership.group_id)
        .bind(membership.color_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(row)
    }

    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, Membership>(
            "SELECT user_id, group_id, color_id FROM user_groups
             WHERE user_id = $1 ORDER BY group_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_group_id(&self, group_id: i64) -> StoreResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, Membership>(
            "SELECT user_id, group_id, color_id FROM user_groups
             WHERE group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_color(
        &self,
        user_id: i64,
        group_id: i64,
        color_id: Option<i64>,
    ) -> StoreResult<Membership> {
        sqlx::query_as::<_, Membership>(
            "UPDATE user_groups SET color_id = $1
             WHERE user_id = $2 AND group_id = $3
             RETURNING user_id, group_id, color_id",
        )
        .bind(color_id)
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?
        .ok_or_else(|| {
            StoreError::not_found("membership", format!("user {user_id} in group {group_id}"))
        })
    }

    async fn delete_by_user_and_group(&self, user_id: i64, group_id: i64) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::not_found(
                "membership",
                format!("user {user_id} in group {group_id}"),
            ));
        }
        Ok(())
    }

    async fn delete_by_group_id(&self, group_id: i64) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM user_groups WHERE group_id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
