use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    AnalysisError, AnalysisRecord, FeedbackAggregate, FeedbackRecord, FeedbackStore, FeedbackType,
    NewsItem, NewsProvider, RecordStore,
};

/// In-memory record store keyed by upper-cased company id.
///
/// Holds the latest finalized record per company, which is exactly what the
/// temporal-trend lookup needs. Used in tests and as the default store when
/// no persistent backend is wired in.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: DashMap<String, AnalysisRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(company: &str) -> String {
        company.trim().to_uppercase()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_previous(&self, company: &str) -> Result<Option<AnalysisRecord>, AnalysisError> {
        Ok(self
            .records
            .get(&Self::key(company))
            .map(|r| r.value().clone()))
    }

    async fn upsert(&self, record: &AnalysisRecord) -> Result<(), AnalysisError> {
        self.records
            .insert(Self::key(&record.company), record.clone());
        Ok(())
    }
}

/// In-memory append-only feedback store keyed by analysis id.
#[derive(Default)]
pub struct MemoryFeedbackStore {
    entries: DashMap<Uuid, Vec<FeedbackRecord>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn append(
        &self,
        analysis_id: Uuid,
        feedback: FeedbackRecord,
    ) -> Result<(), AnalysisError> {
        self.entries.entry(analysis_id).or_default().push(feedback);
        Ok(())
    }

    async fn aggregate(
        &self,
        analysis_id: Uuid,
    ) -> Result<HashMap<FeedbackType, FeedbackAggregate>, AnalysisError> {
        let mut sums: HashMap<FeedbackType, (usize, f64)> = HashMap::new();
        if let Some(entries) = self.entries.get(&analysis_id) {
            for entry in entries.iter() {
                let slot = sums.entry(entry.feedback_type).or_insert((0, 0.0));
                slot.0 += 1;
                slot.1 += entry.score as f64;
            }
        }
        Ok(sums
            .into_iter()
            .map(|(feedback_type, (count, total))| {
                (
                    feedback_type,
                    FeedbackAggregate {
                        count,
                        mean_score: total / count as f64,
                    },
                )
            })
            .collect())
    }
}

/// News provider that always returns an empty article list. Stands in when
/// news enrichment is disabled or unavailable.
#[derive(Default)]
pub struct NoNewsProvider;

#[async_trait]
impl NewsProvider for NoNewsProvider {
    async fn fetch(
        &self,
        _company: &str,
        _day_window: u32,
        _max_articles: usize,
    ) -> Result<Vec<NewsItem>, AnalysisError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalysisRequest, FeedbackType};
    use chrono::Utc;

    fn request(company: &str) -> AnalysisRequest {
        AnalysisRequest {
            company: company.to_string(),
            exchange: None,
            document: "annual report".to_string(),
            financials: None,
            effective_year: None,
            flags: Default::default(),
        }
    }

    #[tokio::test]
    async fn record_store_upsert_and_lookup_ignores_case() {
        let store = MemoryRecordStore::new();
        let record = AnalysisRecord::new(&request("Acme Cement"));
        store.upsert(&record).await.unwrap();

        let found = store.get_previous("acme cement").await.unwrap();
        assert_eq!(found.map(|r| r.analysis_id), Some(record.analysis_id));
        assert!(store.get_previous("other co").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn feedback_aggregates_per_type_mean() {
        let store = MemoryFeedbackStore::new();
        let id = Uuid::new_v4();
        for score in [80, 60] {
            store
                .append(
                    id,
                    FeedbackRecord {
                        feedback_type: FeedbackType::Accuracy,
                        score,
                        notes: String::new(),
                        submitted_by: "analyst".to_string(),
                        submitted_at: Utc::now(),
                    },
                )
                .await
                .unwrap();
        }

        let aggregated = store.aggregate(id).await.unwrap();
        let accuracy = aggregated.get(&FeedbackType::Accuracy).unwrap();
        assert_eq!(accuracy.count, 2);
        assert!((accuracy.mean_score - 70.0).abs() < f64::EPSILON);
        assert!(store.aggregate(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
