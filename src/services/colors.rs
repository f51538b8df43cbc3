use crate::{
    db::Store,
    error::AppResult,
    models::color::{normalize_hex, Color, CreateColorRequest, UpdateColorRequest},
};

pub struct ColorService;

impl ColorService {
    pub async fn list(store: &Store) -> AppResult<Vec<Color>> {
        Ok(store.colors.find_all().await?)
    }

    pub async fn get(store: &Store, id: i64) -> AppResult<Color> {
        Ok(store.colors.find_by_id(id).await?)
    }

    pub async fn get_by_hex(store: &Store, raw: &str) -> AppResult<Color> {
        let hex_code = normalize_hex(raw)?;
        Ok(store.colors.find_by_hex_code(&hex_code).await?)
    }

    pub async fn create(store: &Store, req: &CreateColorRequest) -> AppResult<Color> {
        let new = req.validate()?;
        let color = store.colors.create(&new).await?;
        tracing::debug!(color_id = color.id, hex = %color.hex_code, "color created");
        Ok(color)
    }

    pub async fn update(store: &Store, id: i64, req: &UpdateColorRequest) -> AppResult<Color> {
        let current = store.colors.find_by_id(id).await?;
        let changes = req.apply(&current)?;
        Ok(store.colors.update_by_id(id, &changes).await?)
    }

    /// References to the color are cleared, nothing else is removed.
    pub async fn delete(store: &Store, id: i64) -> AppResult<()> {
        store.colors.delete_by_id(id).await?;
        Ok(())
    }
}
