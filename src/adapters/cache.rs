//! Time-to-live memoization.
//!
//! Entries expire `ttl` after insertion. There is no invalidation beyond
//! expiry; expired entries are replaced on the next lookup.

use crate::domain::error::DashboardError;
use crate::domain::statement::{StatementKind, StatementRow};
use crate::ports::fundamentals_port::FundamentalsPort;
use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

struct Entry<V> {
    value: V,
    inserted: Instant,
}

pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.inserted.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Cached value for `key`, computing and storing it on a miss. Errors are
    /// returned without being cached.
    pub fn get_or_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.inserted.elapsed() < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Memoizes a fundamentals store per `(symbol, statement)`.
pub struct CachedFundamentals<P> {
    inner: P,
    statements: TtlCache<(String, StatementKind), Vec<StatementRow>>,
    symbols: TtlCache<(), Vec<String>>,
}

impl<P: FundamentalsPort> CachedFundamentals<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            statements: TtlCache::new(ttl),
            symbols: TtlCache::new(ttl),
        }
    }
}

impl<P: FundamentalsPort> FundamentalsPort for CachedFundamentals<P> {
    fn fetch_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        let key = (symbol.to_uppercase(), kind);
        self.statements.get_or_insert_with(key, || {
            tracing::debug!(symbol, %kind, "statement cache miss");
            self.inner.fetch_statement(symbol, kind)
        })
    }

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        self.symbols
            .get_or_insert_with((), || self.inner.list_symbols())
    }
}
