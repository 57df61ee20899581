//! Persistence for the HR tables.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{JobCandidateStatus, JobCandidateUpdate, NewCandidate};

#[async_trait]
pub trait HrRepository: Send + Sync {
    /// `None` when no `hr_jobs` row has this id.
    async fn job_description(&self, job_id: Uuid) -> Result<Option<String>, sqlx::Error>;

    async fn candidate_exists(&self, candidate_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<(), sqlx::Error>;

    /// Whether an `hr_job_candidates` row with primary key `id` exists.
    async fn join_record_exists(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn complete_join_record(
        &self,
        id: Uuid,
        update: &JobCandidateUpdate,
    ) -> Result<(), sqlx::Error>;

    /// Sets status "failed" on the row for (job_id, candidate_id), if there is one.
    /// Returns whether a row was updated.
    async fn mark_join_record_failed(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<bool, sqlx::Error>;
}

pub struct PgHrRepository {
    pool: PgPool,
}

impl PgHrRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HrRepository for PgHrRepository {
    async fn job_description(&self, job_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let description: Option<Option<String>> =
            sqlx::query_scalar("SELECT description FROM hr_jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(description.map(Option::unwrap_or_default))
    }

    async fn candidate_exists(&self, candidate_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM hr_candidates WHERE id = $1)")
            .bind(candidate_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO hr_candidates (id, name, email, phone_number, linkedin_url, github_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.phone_number)
        .bind(&candidate.linkedin_url)
        .bind(&candidate.github_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn join_record_exists(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM hr_job_candidates WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    async fn complete_join_record(
        &self,
        id: Uuid,
        update: &JobCandidateUpdate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE hr_job_candidates SET
                status = $2,
                job_id = $3,
                candidate_id = $4,
                overall_score = $5,
                overall_summary = $6,
                skills_score = $7,
                skills_summary = $8,
                skills_enhancement_tips = $9,
                work_experience_score = $10,
                work_experience_summary = $11,
                work_experience_enhancement_tips = $12,
                projects_score = $13,
                projects_summary = $14,
                projects_enhancement_tips = $15,
                education_score = $16,
                education_summary = $17,
                education_enhancement_tips = $18
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.job_id)
        .bind(update.candidate_id)
        .bind(update.overall_score)
        .bind(&update.overall_summary)
        .bind(update.skills.score)
        .bind(&update.skills.summary)
        .bind(&update.skills.enhancement_tips)
        .bind(update.work_experience.score)
        .bind(&update.work_experience.summary)
        .bind(&update.work_experience.enhancement_tips)
        .bind(update.projects.score)
        .bind(&update.projects.summary)
        .bind(&update.projects.enhancement_tips)
        .bind(update.education.score)
        .bind(&update.education.summary)
        .bind(&update.education.enhancement_tips)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_join_record_failed(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE hr_job_candidates SET status = $3 WHERE job_id = $1 AND candidate_id = $2",
        )
        .bind(job_id)
        .bind(candidate_id)
        .bind(JobCandidateStatus::Failed.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
