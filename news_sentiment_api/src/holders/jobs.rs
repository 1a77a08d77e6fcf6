use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::SentimentJob;

/// Результаты фоновых задач анализа тональности
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, job: SentimentJob) -> Result<()>;

    /// Перезаписывает существующую задачу. Удаленную задачу не восстанавливает
    /// и возвращает `false`.
    async fn update(&self, job: SentimentJob) -> Result<bool>;

    async fn get(&self, job_id: &Uuid) -> Result<Option<SentimentJob>>;

    async fn evict(&self, job_id: &Uuid) -> Result<Option<SentimentJob>>;

    /// Удаляет задачи, созданные раньше `cutoff`, и возвращает их число
    async fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, SentimentJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> Result<usize> {
        let jobs = self.jobs.read().await;
        Ok(jobs.len())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: SentimentJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.job_id, job);
        Ok(())
    }

    async fn update(&self, job: SentimentJob) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.job_id) {
            Some(current) => {
                *current = job;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, job_id: &Uuid) -> Result<Option<SentimentJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn evict(&self, job_id: &Uuid) -> Result<Option<SentimentJob>> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs.remove(job_id))
    }

    async fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= cutoff);
        Ok(before - jobs.len())
    }
}

/// Периодически удаляет задачи старше `ttl`
pub fn spawn_job_sweeper(
    store: Arc<dyn JobStore>,
    ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            let ttl = match chrono::Duration::from_std(ttl) {
                Ok(ttl) => ttl,
                Err(e) => {
                    tracing::error!("Некорректный TTL задач: {}", e);
                    return;
                }
            };

            let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
                tracing::error!("TTL задач {} выходит за пределы допустимых дат", ttl);
                continue;
            };

            match store.evict_older_than(cutoff).await {
                Ok(0) => {}
                Ok(evicted) => {
                    tracing::info!("Удалено {} устаревших задач анализа", evicted)
                }
                Err(e) => tracing::warn!("Ошибка очистки задач: {}", e),
            }
        }
    })
}
