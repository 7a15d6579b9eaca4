use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the engine's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS chronicle;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO chronicle, public;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL ON SCHEMA chronicle TO chronicle;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA chronicle GRANT ALL ON TABLES TO chronicle;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA chronicle GRANT ALL ON SEQUENCES TO chronicle;
                END $$;
            "#,
            )
            .await?;

        // Create annotation_kind enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE chronicle.annotation_kind AS ENUM (
                    'diarization',
                    'transcript_edit',
                    'insert',
                    'title_edit',
                    'memory_edit'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE chronicle.annotation_kind OWNER TO chronicle")
            .await?;

        // Create annotation_state enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE chronicle.annotation_state AS ENUM (
                    'pending',
                    'applied',
                    'trained',
                    'orphaned'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE chronicle.annotation_state OWNER TO chronicle")
            .await?;

        // Create version_kind enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE chronicle.version_kind AS ENUM (
                    'transcript',
                    'memory'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE chronicle.version_kind OWNER TO chronicle")
            .await?;

        // Create version_source enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE chronicle.version_source AS ENUM (
                    'original',
                    'reprocess',
                    'annotation_apply'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE chronicle.version_source OWNER TO chronicle")
            .await?;

        // Create conversations table
        let create_conversations_sql = r#"
            CREATE TABLE IF NOT EXISTS chronicle.conversations (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                active_transcript_version_id UUID,
                active_memory_version_id UUID,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_conversations_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE chronicle.conversations OWNER TO chronicle")
            .await?;

        // Create versions table. Version content is an immutable JSONB
        // snapshot; numbers count up per (conversation, kind) and are never
        // reused.
        let create_versions_sql = r#"
            CREATE TABLE IF NOT EXISTS chronicle.versions (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                conversation_id UUID NOT NULL
                    REFERENCES chronicle.conversations(id) ON DELETE CASCADE,
                kind chronicle.version_kind NOT NULL,
                number INTEGER NOT NULL,
                content JSONB NOT NULL,
                parent_version_id UUID REFERENCES chronicle.versions(id),
                created_by chronicle.version_source NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT versions_conversation_kind_number_unique
                    UNIQUE(conversation_id, kind, number)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_versions_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE chronicle.versions OWNER TO chronicle")
            .await?;

        // The active version pointers can only land after the versions table
        // exists.
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE chronicle.conversations
                    ADD CONSTRAINT conversations_active_transcript_version_fkey
                    FOREIGN KEY (active_transcript_version_id)
                    REFERENCES chronicle.versions(id) ON DELETE SET NULL",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE chronicle.conversations
                    ADD CONSTRAINT conversations_active_memory_version_fkey
                    FOREIGN KEY (active_memory_version_id)
                    REFERENCES chronicle.versions(id) ON DELETE SET NULL",
            )
            .await?;

        // Create annotations table. conversation_id is intentionally NOT a
        // foreign key: annotations must survive conversation deletion so the
        // orphan sweep can find and mark them.
        let create_annotations_sql = r#"
            CREATE TABLE IF NOT EXISTS chronicle.annotations (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                conversation_id UUID NOT NULL,
                kind chronicle.annotation_kind NOT NULL,
                state chronicle.annotation_state NOT NULL DEFAULT 'pending',
                payload JSONB NOT NULL,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                applied_at TIMESTAMPTZ,
                trained_at TIMESTAMPTZ
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_annotations_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE chronicle.annotations OWNER TO chronicle")
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS annotations_conversation_state_idx
                    ON chronicle.annotations (conversation_id, state)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS annotations_kind_state_idx
                    ON chronicle.annotations (kind, state)",
            )
            .await?;

        // Create cron_jobs table. The running flag doubles as a
        // cross-process guard against concurrent runs of the same job.
        let create_cron_jobs_sql = r#"
            CREATE TABLE IF NOT EXISTS chronicle.cron_jobs (
                id VARCHAR(255) PRIMARY KEY,
                enabled BOOLEAN NOT NULL DEFAULT FALSE,
                schedule VARCHAR(255) NOT NULL,
                running BOOLEAN NOT NULL DEFAULT FALSE,
                last_run TIMESTAMPTZ,
                next_run TIMESTAMPTZ,
                last_error TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_cron_jobs_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE chronicle.cron_jobs OWNER TO chronicle")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS chronicle CASCADE;")
            .await?;

        Ok(())
    }
}
