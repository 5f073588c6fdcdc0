use sea_orm_migration::prelude::*;

mod m20260301_initial;
mod m20260302_seed_tools;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_initial::Migration),
            Box::new(m20260302_seed_tools::Migration),
        ]
    }
}
