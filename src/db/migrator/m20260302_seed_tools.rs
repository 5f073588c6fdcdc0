use crate::entities::prelude::*;
use crate::entities::tools;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (name, description, url, icon, staff default)
const DEFAULT_TOOLS: [(&str, &str, &str, &str, bool); 5] = [
    (
        "Email Marketing",
        "Use directory data for targeted email marketing campaigns.",
        "https://ymlp.com",
        "envelope",
        true,
    ),
    (
        "Postal Mail",
        "Send physical mail to businesses in the directory.",
        "https://postalmethods.com",
        "mail-bulk",
        true,
    ),
    (
        "Label Making",
        "Create mailing labels from directory data.",
        "https://avery.com/templates",
        "tag",
        true,
    ),
    (
        "Mass Calls & Texting",
        "Send mass calls and text messages to businesses in the directory.",
        "https://dialmycalls.com",
        "phone",
        true,
    ),
    (
        "Promotional Texts",
        "Promotional text templates.",
        "/promotional_texts",
        "bullhorn",
        true,
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Tools)
            .columns([
                tools::Column::Name,
                tools::Column::Description,
                tools::Column::Url,
                tools::Column::Icon,
                tools::Column::StaffDefaultAccess,
            ])
            .to_owned();

        for (name, description, url, icon, staff_default) in DEFAULT_TOOLS {
            insert.values_panic([
                name.into(),
                description.into(),
                url.into(),
                icon.into(),
                staff_default.into(),
            ]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let names: Vec<&str> = DEFAULT_TOOLS.iter().map(|t| t.0).collect();
        let delete = sea_orm_migration::sea_query::Query::delete()
            .from_table(Tools)
            .and_where(Expr::col(tools::Column::Name).is_in(names))
            .to_owned();

        manager.exec_stmt(delete).await
    }
}
