use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Register the two export jobs, disabled until an operator turns
        // them on. Schedules use the seconds-field cron syntax.
        manager
            .get_connection()
            .execute_unprepared(
                "INSERT INTO chronicle.cron_jobs (id, enabled, schedule)
                VALUES
                    ('speaker_finetuning', FALSE, '0 0 3 * * *'),
                    ('asr_jargon_extraction', FALSE, '0 0 4 * * *')
                ON CONFLICT (id) DO NOTHING",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DELETE FROM chronicle.cron_jobs
                WHERE id IN ('speaker_finetuning', 'asr_jargon_extraction')",
            )
            .await?;

        Ok(())
    }
}
