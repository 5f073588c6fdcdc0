use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{prelude::*, tools};

#[derive(Debug, Clone)]
pub struct NewTool {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub staff_default_access: bool,
}

pub struct ToolRepository {
    conn: DatabaseConnection,
}

impl ToolRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_all(&self) -> Result<Vec<tools::Model>> {
        Tools::find()
            .order_by_asc(tools::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list tools")
    }

    pub async fn get(&self, id: i32) -> Result<Option<tools::Model>> {
        Tools::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query tool")
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<tools::Model>> {
        Tools::find()
            .filter(tools::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query tool by name")
    }

    pub async fn create(&self, tool: NewTool) -> Result<tools::Model> {
        tools::ActiveModel {
            name: Set(tool.name),
            description: Set(tool.description),
            url: Set(tool.url),
            icon: Set(tool.icon),
            staff_default_access: Set(tool.staff_default_access),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert tool")
    }
}
