//! In-process store used when no database is configured, and by the tests.
//!
//! Mirrors the constraints of `migrations/`: unique keys, foreign keys that
//! must resolve, cascades on owner deletion and set-null on associative
//! references.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    repository::{
        AvailabilityRepository, ColorRepository, DateRepository, GroupRepository,
        MembershipRepository, UserRepository,
    },
    StoreError, StoreResult,
};
use crate::{
    interval::{dates_in_window, RecurrenceLink, TimeWindow},
    models::{
        availability::{Availability, NewAvailability},
        color::{Color, NewColor},
        date::{Date, NewDate},
        group::{Group, Membership, NewGroup},
        user::{NewUser, User},
    },
};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    colors: BTreeMap<i64, Color>,
    availabilities: BTreeMap<i64, Availability>,
    dates: BTreeMap<i64, Date>,
    memberships: BTreeMap<(i64, i64), Membership>,
}

fn dangling(what: &str, id: i64) -> StoreError {
    StoreError::InvalidReference(format!("{what} {id} does not exist"))
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Soft-deleted users still satisfy the foreign key, as in Postgres.
    fn check_user(&self, id: i64) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(dangling("user", id))
        }
    }

    fn check_color(&self, id: Option<i64>) -> StoreResult<()> {
        match id {
            Some(id) if !self.colors.contains_key(&id) => Err(dangling("color", id)),
            _ => Ok(()),
        }
    }

    fn check_date(&self, id: Option<i64>) -> StoreResult<()> {
        match id {
            Some(id) if !self.dates.contains_key(&id) => Err(dangling("date", id)),
            _ => Ok(()),
        }
    }

    /// Refuse to link `id` under `parent` when `id` is already one of
    /// `parent`'s recurrence ancestors (or `parent` itself).
    fn check_acyclic(&self, id: i64, parent: Option<i64>) -> StoreResult<()> {
        let mut seen = HashSet::new();
        let mut next = parent;
        while let Some(cur) = next {
            if cur == id {
                return Err(StoreError::InvalidReference(format!(
                    "recurrence_id would make date {id} its own ancestor"
                )));
            }
            // A loop that does not involve `id`.
            if !seen.insert(cur) {
                break;
            }
            next = self.dates.get(&cur).and_then(|d| d.recurrence_id);
        }
        Ok(())
    }

    fn check_user_unique(&self, user: &NewUser, skip: Option<i64>) -> StoreResult<()> {
        for existing in self.users.values().filter(|u| Some(u.id) != skip) {
            if existing.email == user.email {
                return Err(StoreError::Conflict("email already in use".into()));
            }
            if existing.username == user.username {
                return Err(StoreError::Conflict("username already in use".into()));
            }
        }
        Ok(())
    }

    fn check_hex_unique(&self, hex_code: &str, skip: Option<i64>) -> StoreResult<()> {
        if self
            .colors
            .values()
            .any(|c| c.hex_code == hex_code && Some(c.id) != skip)
        {
            return Err(StoreError::Conflict("hex_code already in use".into()));
        }
        Ok(())
    }

    fn live_user(&self, id: i64) -> Option<&User> {
        self.users.get(&id).filter(|u| u.deleted_at.is_none())
    }

    fn remove_dates_where(&mut self, pred: impl Fn(&Date) -> bool) {
        let doomed: Vec<i64> = self.dates.values().filter(|&d| pred(d)).map(|d| d.id).collect();
        for id in doomed {
            self.remove_date(id);
        }
    }

    fn remove_date(&mut self, id: i64) -> Option<Date> {
        let removed = self.dates.remove(&id)?;
        for child in self.dates.values_mut() {
            if child.recurrence_id == Some(id) {
                child.recurrence_id = None;
            }
        }
        Some(removed)
    }

    fn remove_group(&mut self, id: i64) -> Option<Group> {
        let removed = self.groups.remove(&id)?;
        self.memberships.retain(|(_, group_id), _| *group_id != id);
        Some(removed)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        t.check_user_unique(user, None)?;
        t.check_color(user.color_id)?;
        let now = Utc::now();
        let row = User {
            id: t.next_id("users"),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            color_id: user.color_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().filter(|u| u.deleted_at.is_none()).cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<User> {
        let t = self.tables.read().await;
        t.live_user(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", format!("id {id}")))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let t = self.tables.read().await;
        t.users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", format!("email {email}")))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let t = self.tables.read().await;
        t.users
            .values()
            .find(|u| u.deleted_at.is_none() && u.username == username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", format!("username {username}")))
    }

    async fn update_by_id(&self, id: i64, user: &NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.live_user(id).is_none() {
            return Err(StoreError::not_found("user", format!("id {id}")));
        }
        t.check_user_unique(user, Some(id))?;
        t.check_color(user.color_id)?;
        let row = t
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", format!("id {id}")))?;
        row.username = user.username.clone();
        row.email = user.email.clone();
        row.password_hash = user.password_hash.clone();
        row.name = user.name.clone();
        row.surname = user.surname.clone();
        row.color_id = user.color_id;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        match t.users.get_mut(&id) {
            Some(u) if u.deleted_at.is_none() => {
                u.deleted_at = Some(now);
                u.updated_at = now;
            }
            _ => return Err(StoreError::not_found("user", format!("id {id}"))),
        }
        t.remove_dates_where(|d| d.user_id == id);
        t.availabilities.retain(|_, a| a.user_id != id);
        t.memberships.retain(|(user_id, _), _| *user_id != id);
        let created: Vec<i64> = t
            .groups
            .values()
            .filter(|g| g.creator_id == id)
            .map(|g| g.id)
            .collect();
        for group_id in created {
            t.remove_group(group_id);
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create(&self, group: &NewGroup) -> StoreResult<Group> {
        let mut t = self.tables.write().await;
        t.check_user(group.creator_id)?;
        let now = Utc::now();
        let row = Group {
            id: t.next_id("groups"),
            name: group.name.clone(),
            creator_id: group.creator_id,
            created_at: now,
            updated_at: now,
        };
        t.groups.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<Group>> {
        let t = self.tables.read().await;
        let mut groups: Vec<Group> = t.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Group> {
        let t = self.tables.read().await;
        t.groups
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("group", format!("id {id}")))
    }

    async fn find_by_creator_id(&self, creator_id: i64) -> StoreResult<Vec<Group>> {
        let t = self.tables.read().await;
        let mut groups: Vec<Group> = t
            .groups
            .values()
            .filter(|g| g.creator_id == creator_id)
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn update_by_id(&self, id: i64, group: &NewGroup) -> StoreResult<Group> {
        let mut t = self.tables.write().await;
        t.check_user(group.creator_id)?;
        let row = t
            .groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("group", format!("id {id}")))?;
        row.name = group.name.clone();
        row.creator_id = group.creator_id;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.remove_group(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("group", format!("id {id}")))
    }
}

#[async_trait]
impl ColorRepository for MemoryStore {
    async fn create(&self, color: &NewColor) -> StoreResult<Color> {
        let mut t = self.tables.write().await;
        t.check_hex_unique(&color.hex_code, None)?;
        let now = Utc::now();
        let row = Color {
            id: t.next_id("colors"),
            hex_code: color.hex_code.clone(),
            name: color.name.clone(),
            created_at: now,
            updated_at: now,
        };
        t.colors.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<Color>> {
        let t = self.tables.read().await;
        Ok(t.colors.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Color> {
        let t = self.tables.read().await;
        t.colors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("color", format!("id {id}")))
    }

    async fn find_by_hex_code(&self, hex_code: &str) -> StoreResult<Color> {
        let t = self.tables.read().await;
        t.colors
            .values()
            .find(|c| c.hex_code == hex_code)
            .cloned()
            .ok_or_else(|| StoreError::not_found("color", format!("hex_code {hex_code}")))
    }

    async fn update_by_id(&self, id: i64, color: &NewColor) -> StoreResult<Color> {
        let mut t = self.tables.write().await;
        if !t.colors.contains_key(&id) {
            return Err(StoreError::not_found("color", format!("id {id}")));
        }
        t.check_hex_unique(&color.hex_code, Some(id))?;
        let row = t
            .colors
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("color", format!("id {id}")))?;
        row.hex_code = color.hex_code.clone();
        row.name = color.name.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.colors.remove(&id).is_none() {
            return Err(StoreError::not_found("color", format!("id {id}")));
        }
        for u in t.users.values_mut().filter(|u| u.color_id == Some(id)) {
            u.color_id = None;
        }
        for d in t.dates.values_mut().filter(|d| d.color_id == Some(id)) {
            d.color_id = None;
        }
        for m in t.memberships.values_mut().filter(|m| m.color_id == Some(id)) {
            m.color_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl AvailabilityRepository for MemoryStore {
    async fn create(&self, availability: &NewAvailability) -> StoreResult<Availability> {
        let mut t = self.tables.write().await;
        t.check_user(availability.user_id)?;
        let now = Utc::now();
        let row = Availability {
            id: t.next_id("availabilities"),
            user_id: availability.user_id,
            begin_time: availability.window.begin(),
            end_time: availability.window.end(),
            created_at: now,
            updated_at: now,
        };
        t.availabilities.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<Availability>> {
        let t = self.tables.read().await;
        Ok(t.availabilities.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Availability> {
        let t = self.tables.read().await;
        t.availabilities
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("availability", format!("id {id}")))
    }

    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Availability> {
        AvailabilityRepository::find_by_id(self, user_id).await
    }

    async fn find_by_owner(&self, user_id: i64) -> StoreResult<Vec<Availability>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Availability> = t
            .availabilities
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.begin_time, a.id));
        Ok(rows)
    }

    async fn update_by_id(
        &self,
        id: i64,
        availability: &NewAvailability,
    ) -> StoreResult<Availability> {
        let mut t = self.tables.write().await;
        t.check_user(availability.user_id)?;
        let row = t
            .availabilities
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("availability", format!("id {id}")))?;
        row.user_id = availability.user_id;
        row.begin_time = availability.window.begin();
        row.end_time = availability.window.end();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.availabilities
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("availability", format!("id {id}")))
    }
}

#[async_trait]
impl DateRepository for MemoryStore {
    async fn create(&self, date: &NewDate) -> StoreResult<Date> {
        let mut t = self.tables.write().await;
        t.check_user(date.user_id)?;
        t.check_date(date.recurrence_id)?;
        t.check_color(date.color_id)?;
        let now = Utc::now();
        let row = Date {
            id: t.next_id("dates"),
            title: date.title.clone(),
            body: date.body.clone(),
            user_id: date.user_id,
            begin_time: date.window.begin(),
            end_time: date.window.end(),
            private: date.private,
            recurrence_id: date.recurrence_id,
            color_id: date.color_id,
            created_at: now,
            updated_at: now,
        };
        t.dates.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_all(&self) -> StoreResult<Vec<Date>> {
        let t = self.tables.read().await;
        let mut dates: Vec<Date> = t.dates.values().cloned().collect();
        dates.sort_by_key(|d| (d.begin_time, d.id));
        Ok(dates)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Date> {
        let t = self.tables.read().await;
        t.dates
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("date", format!("id {id}")))
    }

    async fn find_by_owner(&self, user_id: i64) -> StoreResult<Vec<Date>> {
        let t = self.tables.read().await;
        let mut dates: Vec<Date> = t
            .dates
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        dates.sort_by_key(|d| (d.begin_time, d.id));
        Ok(dates)
    }

    async fn find_by_recurrence_id(&self, recurrence_id: i64) -> StoreResult<RecurrenceLink> {
        let t = self.tables.read().await;
        let date = t
            .dates
            .get(&recurrence_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("date", format!("id {recurrence_id}")))?;
        let recurrence = date.recurrence_id.and_then(|p| t.dates.get(&p).cloned());
        Ok(RecurrenceLink { date, recurrence })
    }

    async fn find_recurrence_children(&self, parent_id: i64) -> StoreResult<Vec<Date>> {
        let t = self.tables.read().await;
        let mut dates: Vec<Date> = t
            .dates
            .values()
            .filter(|d| d.recurrence_id == Some(parent_id))
            .cloned()
            .collect();
        dates.sort_by_key(|d| (d.begin_time, d.id));
        Ok(dates)
    }

    async fn find_by_day_range(
        &self,
        window: &TimeWindow,
        user_id: i64,
    ) -> StoreResult<Vec<Date>> {
        let t = self.tables.read().await;
        Ok(dates_in_window(window, user_id, t.dates.values()))
    }

    async fn update_by_id(&self, id: i64, date: &NewDate) -> StoreResult<Date> {
        let mut t = self.tables.write().await;
        t.check_user(date.user_id)?;
        t.check_date(date.recurrence_id)?;
        t.check_color(date.color_id)?;
        t.check_acyclic(id, date.recurrence_id)?;
        let row = t
            .dates
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("date", format!("id {id}")))?;
        row.title = date.title.clone();
        row.body = date.body.clone();
        row.user_id = date.user_id;
        row.begin_time = date.window.begin();
        row.end_time = date.window.end();
        row.private = date.private;
        row.recurrence_id = date.recurrence_id;
        row.color_id = date.color_id;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.remove_date(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("date", format!("id {id}")))
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn create(&self, membership: &Membership) -> StoreResult<Membership> {
        let mut t = self.tables.write().await;
        t.check_user(membership.user_id)?;
        if !t.groups.contains_key(&membership.group_id) {
            return Err(dangling("group", membership.group_id));
        }
        t.check_color(membership.color_id)?;
        let key = (membership.user_id, membership.group_id);
        if t.memberships.contains_key(&key) {
            return Err(StoreError::Conflict(
                "user is already a member of this group".into(),
            ));
        }
        t.memberships.insert(key, membership.clone());
        Ok(membership.clone())
    }

    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Vec<Membership>> {
        let t = self.tables.read().await;
        Ok(t.memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_group_id(&self, group_id: i64) -> StoreResult<Vec<Membership>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Membership> = t
            .memberships
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.user_id);
        Ok(rows)
    }

    async fn update_color(
        &self,
        user_id: i64,
        group_id: i64,
        color_id: Option<i64>,
    ) -> StoreResult<Membership> {
        let mut t = self.tables.write().await;
        t.check_color(color_id)?;
        let row = t.memberships.get_mut(&(user_id, group_id)).ok_or_else(|| {
            StoreError::not_found("membership", format!("user {user_id} in group {group_id}"))
        })?;
        row.color_id = color_id;
        Ok(row.clone())
    }

    async fn delete_by_user_and_group(&self, user_id: i64, group_id: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.memberships
            .remove(&(user_id, group_id))
            .map(|_| ())
            .ok_or_else(|| {
                StoreError::not_found("membership", format!("user {user_id} in group {group_id}"))
            })
    }

    async fn delete_by_group_id(&self, group_id: i64) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let before = t.memberships.len();
        t.memberships.retain(|(_, g), _| *g != group_id);
        Ok((before - t.memberships.len()) as u64)
    }
}
