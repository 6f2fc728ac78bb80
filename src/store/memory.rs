//! In-memory generational store.

use super::{Store, StoreError, StoreResult};
use crate::types::{CachedResponse, RequestKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Generation {
    entries: HashMap<RequestKey, CachedResponse>,
    order: Vec<RequestKey>,
}

impl Generation {
    fn insert(&mut self, key: &RequestKey, response: &CachedResponse) {
        if self.entries.insert(key.clone(), response.clone()).is_none() {
            self.order.push(key.clone());
        }
    }
}

/// Generations live in a vector so creation order falls out of iteration.
#[derive(Clone, Default)]
pub struct MemoryStore {
    generations: Arc<RwLock<Vec<(String, Generation)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<(String, Generation)>>> {
        self.generations
            .read()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<(String, Generation)>>> {
        self.generations
            .write()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }
}

fn position(generations: &[(String, Generation)], name: &str) -> Option<usize> {
    generations.iter().position(|(n, _)| n == name)
}

#[async_trait]
impl Store for MemoryStore {
    async fn open(&self, generation: &str) -> StoreResult<bool> {
        let mut generations = self.write()?;
        if position(&generations, generation).is_some() {
            return Ok(false);
        }
        generations.push((generation.to_string(), Generation::default()));
        Ok(true)
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> StoreResult<()> {
        let mut generations = self.write()?;
        match position(&generations, generation) {
            Some(idx) => generations[idx].1.insert(key, response),
            None => {
                let mut fresh = Generation::default();
                fresh.insert(key, response);
                generations.push((generation.to_string(), fresh));
            }
        }
        Ok(())
    }

    async fn get(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> StoreResult<Option<CachedResponse>> {
        let generations = self.read()?;
        Ok(position(&generations, generation)
            .and_then(|idx| generations[idx].1.entries.get(key).cloned()))
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.read()?.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete(&self, generation: &str) -> StoreResult<bool> {
        let mut generations = self.write()?;
        match position(&generations, generation) {
            Some(idx) => {
                generations.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self, generation: &str) -> StoreResult<Vec<RequestKey>> {
        let generations = self.read()?;
        Ok(position(&generations, generation)
            .map(|idx| generations[idx].1.order.clone())
            .unwrap_or_default())
    }

    async fn contains(&self, generation: &str) -> StoreResult<bool> {
        Ok(position(&self.read()?, generation).is_some())
    }

    // Single read lock: a concurrent delete either happens entirely before or after.
    async fn match_any(&self, key: &RequestKey) -> StoreResult<Option<(String, CachedResponse)>> {
        let generations = self.read()?;
        Ok(generations.iter().find_map(|(name, generation)| {
            generation
                .entries
                .get(key)
                .map(|resp| (name.clone(), resp.clone()))
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
