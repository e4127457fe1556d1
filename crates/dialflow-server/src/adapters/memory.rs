//! In-memory repositories
//!
//! Process-local state for the engine. Durable storage of results is the
//! outcome sinks' job; in-flight attempts do not survive a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use dialflow::{
    AttemptRepository, CallAttempt, CallResult, CallResultRepository, DndRecord, DndRepository,
    DndSource, DomainError,
};

/// DND cache keyed by normalized phone number
#[derive(Default)]
pub struct InMemoryDndRepository {
    records: DashMap<String, DndRecord>,
}

impl InMemoryDndRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DndRepository for InMemoryDndRepository {
    async fn find(&self, phone: &str) -> Result<Option<DndRecord>, DomainError> {
        Ok(self.records.get(phone).map(|r| r.clone()))
    }

    async fn save(&self, record: &DndRecord) -> Result<DndRecord, DomainError> {
        match self.records.entry(record.phone.clone()) {
            // Local opt-outs outrank whatever the registry says
            Entry::Occupied(existing)
                if existing.get().source == DndSource::Local
                    && record.source == DndSource::Registry =>
            {
                Ok(existing.get().clone())
            }
            Entry::Occupied(mut existing) => {
                existing.insert(record.clone());
                Ok(record.clone())
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record.clone())
            }
        }
    }

    async fn delete(&self, phone: &str) -> Result<bool, DomainError> {
        Ok(self.records.remove(phone).is_some())
    }

    async fn list_local(&self) -> Result<Vec<DndRecord>, DomainError> {
        let mut local: Vec<DndRecord> = self
            .records
            .iter()
            .filter(|r| r.source == DndSource::Local)
            .map(|r| r.clone())
            .collect();
        local.sort_by(|a, b| a.phone.cmp(&b.phone));
        Ok(local)
    }
}

/// Finalized results keyed by attempt id
#[derive(Default)]
pub struct InMemoryCallResultRepository {
    results: DashMap<Uuid, CallResult>,
}

impl InMemoryCallResultRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallResultRepository for InMemoryCallResultRepository {
    async fn find(&self, attempt_id: Uuid) -> Result<Option<CallResult>, DomainError> {
        Ok(self.results.get(&attempt_id).map(|r| r.clone()))
    }

    async fn insert_if_absent(
        &self,
        result: CallResult,
    ) -> Result<(CallResult, bool), DomainError> {
        match self.results.entry(result.attempt_id) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                slot.insert(result.clone());
                Ok((result, true))
            }
        }
    }

    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Vec<CallResult>, DomainError> {
        let mut results: Vec<CallResult> = self
            .results
            .iter()
            .filter(|r| r.lead_id == lead_id)
            .map(|r| r.clone())
            .collect();
        results.sort_by_key(|r| r.finalized_at);
        Ok(results)
    }
}

/// Active attempts, with a lead index enforcing one active attempt per lead
#[derive(Default)]
pub struct InMemoryAttemptRepository {
    attempts: DashMap<Uuid, CallAttempt>,
    by_lead: DashMap<Uuid, Uuid>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn register(&self, attempt: &CallAttempt) -> Result<(), DomainError> {
        match self.by_lead.entry(attempt.request.lead_id) {
            Entry::Occupied(active) => Err(DomainError::Conflict(format!(
                "lead {} already has active attempt {}",
                attempt.request.lead_id,
                active.get()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(attempt.id);
                self.attempts.insert(attempt.id, attempt.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, attempt_id: Uuid) -> Result<Option<CallAttempt>, DomainError> {
        Ok(self.attempts.get(&attempt_id).map(|a| a.clone()))
    }

    async fn update(&self, attempt: &CallAttempt) -> Result<(), DomainError> {
        match self.attempts.get_mut(&attempt.id) {
            Some(mut current) => {
                *current = attempt.clone();
                Ok(())
            }
            None => Err(DomainError::not_found("CallAttempt", attempt.id)),
        }
    }

    async fn find_by_lead(&self, lead_id: Uuid) -> Result<Option<CallAttempt>, DomainError> {
        let Some(attempt_id) = self.by_lead.get(&lead_id).map(|id| *id) else {
            return Ok(None);
        };
        self.get(attempt_id).await
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<CallAttempt>, DomainError> {
        Ok(self
            .attempts
            .iter()
            .filter(|a| a.status.is_pending_answer() && a.started_at < cutoff)
            .map(|a| a.clone())
            .collect())
    }

    async fn remove(&self, attempt_id: Uuid) -> Result<Option<CallAttempt>, DomainError> {
        let removed = self.attempts.remove(&attempt_id).map(|(_, a)| a);
        if let Some(attempt) = &removed {
            self.by_lead
                .remove_if(&attempt.request.lead_id, |_, active| *active == attempt_id);
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.attempts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialflow::{CallOutcome, CallRequest, CallStatus, DndCategory, OutcomeSignals};

    fn attempt(lead_id: Uuid) -> CallAttempt {
        CallAttempt::new(
            Uuid::new_v4(),
            CallRequest::new(lead_id, Uuid::new_v4(), "+919800000080"),
        )
    }

    #[tokio::test]
    async fn test_registry_answer_does_not_replace_local_block() {
        let repo = InMemoryDndRepository::new();
        repo.save(&DndRecord::local_block("+919800000080", "operator"))
            .await
            .unwrap();
        let kept = repo
            .save(&DndRecord::from_registry(
                "+919800000080",
                false,
                DndCategory::NotRegistered,
            ))
            .await
            .unwrap();
        assert_eq!(kept.source, DndSource::Local);
        assert!(repo.find("+919800000080").await.unwrap().unwrap().blocked);
        assert_eq!(repo.list_local().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_one_active_attempt_per_lead() {
        let repo = InMemoryAttemptRepository::new();
        let lead_id = Uuid::new_v4();
        let first = attempt(lead_id);
        repo.register(&first).await.unwrap();

        let second = attempt(lead_id);
        assert!(matches!(
            repo.register(&second).await,
            Err(DomainError::Conflict(_))
        ));

        assert_eq!(repo.find_by_lead(lead_id).await.unwrap().map(|a| a.id), Some(first.id));
        repo.remove(first.id).await.unwrap();
        repo.register(&second).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_does_not_resurrect_removed_attempt() {
        let repo = InMemoryAttemptRepository::new();
        let a = attempt(Uuid::new_v4());
        repo.register(&a).await.unwrap();
        repo.remove(a.id).await.unwrap();
        assert!(repo.update(&a).await.is_err());
        assert!(repo.get(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first() {
        let repo = InMemoryCallResultRepository::new();
        let request = CallRequest::new(Uuid::new_v4(), Uuid::new_v4(), "+919800000081");
        let attempt_id = Uuid::new_v4();
        let first = CallResult::new(
            attempt_id,
            OutcomeSignals::for_request(&request, CallStatus::Completed),
            CallOutcome::Interested,
        );
        let second = CallResult::new(
            attempt_id,
            OutcomeSignals::for_request(&request, CallStatus::Failed),
            CallOutcome::Failed,
        );

        assert!(repo.insert_if_absent(first.clone()).await.unwrap().1);
        let (stored, inserted) = repo.insert_if_absent(second).await.unwrap();
        assert!(!inserted);
        assert_eq!(stored, first);
        assert_eq!(repo.find_by_lead(request.lead_id).await.unwrap().len(), 1);
    }
}
