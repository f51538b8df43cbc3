use crate::{
    db::Store,
    error::AppResult,
    models::group::{
        AddMemberRequest, CreateGroupRequest, Group, Membership, UpdateGroupRequest,
        UpdateMemberRequest,
    },
    services::users::require_user,
};

pub struct GroupService;

impl GroupService {
    pub async fn list(store: &Store) -> AppResult<Vec<Group>> {
        Ok(store.groups.find_all().await?)
    }

    pub async fn get(store: &Store, id: i64) -> AppResult<Group> {
        Ok(store.groups.find_by_id(id).await?)
    }

    pub async fn list_by_creator(store: &Store, creator_id: i64) -> AppResult<Vec<Group>> {
        Ok(store.groups.find_by_creator_id(creator_id).await?)
    }

    pub async fn create(store: &Store, req: &CreateGroupRequest) -> AppResult<Group> {
        let new = req.validate()?;
        require_user(store, "creator_id", new.creator_id).await?;
        let group = store.groups.create(&new).await?;
        tracing::info!(group_id = group.id, creator_id = group.creator_id, "group created");
        Ok(group)
    }

    pub async fn update(store: &Store, id: i64, req: &UpdateGroupRequest) -> AppResult<Group> {
        let current = store.groups.find_by_id(id).await?;
        let changes = req.apply(&current)?;
        if changes.creator_id != current.creator_id {
            require_user(store, "creator_id", changes.creator_id).await?;
        }
        Ok(store.groups.update_by_id(id, &changes).await?)
    }

    /// Drop the memberships, then the group.
    pub async fn delete(store: &Store, id: i64) -> AppResult<()> {
        store.groups.find_by_id(id).await?;
        let detached = store.memberships.delete_by_group_id(id).await?;
        store.groups.delete_by_id(id).await?;
        tracing::info!(group_id = id, members = detached, "group deleted");
        Ok(())
    }

    pub async fn list_members(store: &Store, group_id: i64) -> AppResult<Vec<Membership>> {
        store.groups.find_by_id(group_id).await?;
        Ok(store.memberships.find_by_group_id(group_id).await?)
    }

    pub async fn add_member(
        store: &Store,
        group_id: i64,
        req: &AddMemberRequest,
    ) -> AppResult<Membership> {
        req.validate()?;
        store.groups.find_by_id(group_id).await?;
        require_user(store, "user_id", req.user_id).await?;
        let membership = Membership {
            user_id: req.user_id,
            group_id,
            color_id: req.color_id,
        };
        Ok(store.memberships.create(&membership).await?)
    }

    pub async fn update_member(
        store: &Store,
        group_id: i64,
        user_id: i64,
        req: &UpdateMemberRequest,
    ) -> AppResult<Membership> {
        Ok(store
            .memberships
            .update_color(user_id, group_id, req.color_id)
            .await?)
    }

    pub async fn remove_member(store: &Store, group_id: i64, user_id: i64) -> AppResult<()> {
        store
            .memberships
            .delete_by_user_and_group(user_id, group_id)
            .await?;
        Ok(())
    }
}
