use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::errors::{NewsSentimentError, Result};
use crate::holders::JobStore;
use crate::models::{JobStatus, SentimentJob, SentimentLabel, SentimentScore};

// Нормализация как в VADER
const NORMALIZATION_ALPHA: f64 = 15.0;
const INTENSIFIER_FACTOR: f64 = 1.5;
const LABEL_THRESHOLD: f64 = 0.05;

struct Lexicon {
    positive: &'static [&'static str],
    negative: &'static [&'static str],
    negations: &'static [&'static str],
    intensifiers: &'static [&'static str],
}

const ENGLISH: Lexicon = Lexicon {
    positive: &[
        "good", "great", "excellent", "amazing", "wonderful", "fantastic", "positive", "success",
        "successful", "growth", "gain", "gains", "profit", "rise", "rising", "increase", "boom",
        "breakthrough", "win", "wins", "strong", "record", "improve", "improved", "happy", "hope",
        "peace", "safe", "recovery", "support", "agreement", "celebrate", "best", "benefit",
    ],
    negative: &[
        "bad", "terrible", "awful", "horrible", "negative", "crash", "loss", "losses", "fall",
        "decline", "drop", "collapse", "crisis", "war", "attack", "death", "dead", "killed",
        "scandal", "fraud", "scam", "hack", "theft", "fear", "risk", "weak", "worst", "fail",
        "failure", "protest", "conflict", "disaster", "threat", "corruption", "ban",
    ],
    negations: &["not", "never", "no", "without", "hardly", "isn't", "don't", "won't"],
    intensifiers: &["very", "extremely", "highly", "really", "deeply", "hugely"],
};

const HUNGARIAN: Lexicon = Lexicon {
    positive: &[
        "jó", "kiváló", "remek", "nagyszerű", "sikeres", "siker", "pozitív", "növekedés",
        "nyereség", "boldog", "béke", "biztonságos", "javulás", "rekord", "győzelem", "öröm",
        "erős", "támogatás",
    ],
    negative: &[
        "rossz", "szörnyű", "negatív", "válság", "csökkenés", "veszteség", "háború", "támadás",
        "halál", "botrány", "csalás", "félelem", "kockázat", "gyenge", "kudarc", "tüntetés",
        "katasztrófa", "fenyegetés", "korrupció", "baj",
    ],
    negations: &["nem", "sem", "soha", "nincs", "nélkül"],
    intensifiers: &["nagyon", "rendkívül", "igazán", "különösen"],
};

/// Словарный анализатор тональности для одного языка
pub struct SentimentAnalyzer {
    language: String,
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negations: HashSet<&'static str>,
    intensifiers: HashSet<&'static str>,
    html_regex: Regex,
    url_regex: Regex,
    token_regex: Regex,
}

impl SentimentAnalyzer {
    pub fn for_language(lang: &str) -> Result<Self> {
        let lexicon = match lang.trim().to_lowercase().as_str() {
            "en" | "english" => &ENGLISH,
            "hu" | "hungarian" => &HUNGARIAN,
            other => {
                return Err(NewsSentimentError::Validation(format!(
                    "Unsupported language '{}'",
                    other
                )))
            }
        };

        Ok(SentimentAnalyzer {
            language: lang.trim().to_lowercase(),
            positive: lexicon.positive.iter().copied().collect(),
            negative: lexicon.negative.iter().copied().collect(),
            negations: lexicon.negations.iter().copied().collect(),
            intensifiers: lexicon.intensifiers.iter().copied().collect(),
            html_regex: Regex::new(r"<[^>]+>")?,
            url_regex: Regex::new(r"http\S+|www\.\S+")?,
            token_regex: Regex::new(r"[\p{L}\p{N}']+")?,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn clean_text(&self, text: &str) -> String {
        let cleaned = self.html_regex.replace_all(text, " ");
        let cleaned = self.url_regex.replace_all(&cleaned, " ");
        cleaned.to_lowercase()
    }

    pub fn analyze_text(&self, text: &str) -> SentimentScore {
        let cleaned = self.clean_text(text);
        let tokens: Vec<&str> = self
            .token_regex
            .find_iter(&cleaned)
            .map(|m| m.as_str())
            .collect();

        let mut value = 0.0;
        let mut positive_count = 0usize;
        let mut negative_count = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let mut valence = if self.positive.contains(*token) {
                1.0
            } else if self.negative.contains(*token) {
                -1.0
            } else {
                continue;
            };

            // Отрицание может стоять перед усилителем: "not very good"
            let mut modifier_at = i;
            if i > 0 && self.intensifiers.contains(tokens[i - 1]) {
                valence *= INTENSIFIER_FACTOR;
                modifier_at = i - 1;
            }
            if modifier_at > 0 && self.negations.contains(tokens[modifier_at - 1]) {
                valence = -valence;
            }

            if valence > 0.0 {
                positive_count += 1;
            } else {
                negative_count += 1;
            }
            value += valence;
        }

        let total = tokens.len();
        let share = |count: usize| {
            if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            }
        };

        let compound = value / (value * value + NORMALIZATION_ALPHA).sqrt();
        let label = if compound >= LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if compound <= -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        SentimentScore {
            label,
            value,
            compound,
            positive: share(positive_count),
            negative: share(negative_count),
            neutral: share(total - positive_count - negative_count),
        }
    }
}

/// Пул фоновых задач анализа. Число одновременно работающих задач
/// ограничено семафором, сам подсчет идет в `spawn_blocking`.
#[derive(Clone)]
pub struct SentimentWorkerPool {
    permits: Arc<Semaphore>,
    jobs: Arc<dyn JobStore>,
}

impl SentimentWorkerPool {
    pub fn new(workers: usize, jobs: Arc<dyn JobStore>) -> Self {
        SentimentWorkerPool {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            jobs,
        }
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    pub async fn submit(&self, lang: &str, texts: Vec<String>) -> Result<SentimentJob> {
        if texts.is_empty() {
            return Err(NewsSentimentError::Validation(
                "Field 'texts' must contain at least one text".to_string(),
            ));
        }

        let analyzer = SentimentAnalyzer::for_language(lang)?;
        let job = SentimentJob::pending(Uuid::new_v4(), analyzer.language(), texts.len());
        self.jobs.put(job.clone()).await?;

        tracing::info!("Поставлена задача анализа {} ({} текстов)", job.job_id, texts.len());

        let pool = self.clone();
        let pending = job.clone();
        tokio::spawn(async move {
            let job_id = pending.job_id;
            if let Err(e) = pool.run(pending, analyzer, texts).await {
                tracing::error!("Задача анализа {} не сохранена: {}", job_id, e);
            }
        });

        Ok(job)
    }

    async fn run(
        &self,
        mut job: SentimentJob,
        analyzer: SentimentAnalyzer,
        texts: Vec<String>,
    ) -> Result<()> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| NewsSentimentError::JobFailed(e.to_string()))?;

        job.status = JobStatus::Running;
        if !self.jobs.update(job.clone()).await? {
            tracing::info!("Задача анализа {} удалена до запуска", job.job_id);
            return Ok(());
        }

        let outcome = tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| analyzer.analyze_text(text))
                .collect::<Vec<_>>()
        })
        .await;

        match outcome {
            Ok(results) => {
                tracing::info!("Задача анализа {} завершена", job.job_id);
                job.status = JobStatus::Completed;
                job.results = results;
            }
            Err(e) => {
                tracing::error!("Задача анализа {} упала: {}", job.job_id, e);
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
            }
        }
        job.finished_at = Some(Utc::now());

        let job_id = job.job_id;
        if !self.jobs.update(job).await? {
            tracing::info!("Задача анализа {} удалена во время выполнения", job_id);
        }
        Ok(())
    }
}
