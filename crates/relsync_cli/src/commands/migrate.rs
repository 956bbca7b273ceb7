use relsync::db;
use relsync::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            println!("Applying migrations...");
            Migrator::up(&db, None).await?;
            println!("Migrations applied successfully.");
        }
        MigrateAction::Down => {
            println!("Rolling back last migration...");
            Migrator::down(&db, Some(1)).await?;
            println!("Rollback complete.");
        }
        MigrateAction::Status => {
            let pending = Migrator::get_pending_migrations(&db).await?;
            let applied = Migrator::get_applied_migrations(&db).await?;
            println!("Applied migrations: {}", applied.len());
            for migration in &applied {
                println!("  ✓ {}", migration.name());
            }
            println!("Pending migrations: {}", pending.len());
            for migration in &pending {
                println!("  · {}", migration.name());
            }
        }
        MigrateAction::Fresh => {
            println!("Dropping all tables and reapplying migrations...");
            Migrator::fresh(&db).await?;
            println!("Fresh migration complete.");
        }
    }

    Ok(())
}
