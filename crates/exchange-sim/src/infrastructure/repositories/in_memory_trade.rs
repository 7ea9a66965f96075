use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use exchange_core::{Timestamp, Trade, TradeId};
use exchange_ports::{RepositoryError, RepositoryResult, TradeRepository};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const ENTITY: &str = "trade";

/// A trade plus the order it was saved in
///
/// Trades from one match share a timestamp, so the save sequence is the
/// tie-break that keeps them in generation order.
struct StoredTrade {
    sequence: u64,
    trade: Trade,
}

/// In-memory trade store backed by DashMap
pub struct InMemoryTradeRepository {
    trades: Arc<DashMap<TradeId, StoredTrade>>,
    next_sequence: Arc<AtomicU64>,
}

impl InMemoryTradeRepository {
    pub fn new() -> Self {
        InMemoryTradeRepository {
            trades: Arc::new(DashMap::new()),
            next_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    fn collect<F>(&self, predicate: F) -> Vec<Trade>
    where
        F: Fn(&Trade) -> bool,
    {
        let mut matched: Vec<(u64, Trade)> = self
            .trades
            .iter()
            .filter(|entry| predicate(&entry.value().trade))
            .map(|entry| (entry.value().sequence, entry.value().trade.clone()))
            .collect();
        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            a.timestamp.cmp(&b.timestamp).then_with(|| seq_a.cmp(seq_b))
        });
        matched.into_iter().map(|(_, trade)| trade).collect()
    }
}

impl Default for InMemoryTradeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryTradeRepository {
    fn clone(&self) -> Self {
        InMemoryTradeRepository {
            trades: Arc::clone(&self.trades),
            next_sequence: Arc::clone(&self.next_sequence),
        }
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeRepository {
    async fn save(&self, trade: &Trade) -> RepositoryResult<()> {
        trade.validate()?;

        match self.trades.entry(trade.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::AlreadyExists {
                entity: ENTITY,
                id: trade.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(StoredTrade {
                    sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
                    trade: trade.clone(),
                });
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Trade> {
        self.trades
            .get(id)
            .map(|entry| entry.value().trade.clone())
            .ok_or_else(|| RepositoryError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }

    async fn get_by_order_id(&self, order_id: &str) -> RepositoryResult<Vec<Trade>> {
        Ok(self.collect(|t| t.involves(order_id)))
    }

    async fn get_by_symbol(&self, symbol: &str) -> RepositoryResult<Vec<Trade>> {
        Ok(self.collect(|t| t.symbol == symbol))
    }

    async fn get_trades_in_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> RepositoryResult<Vec<Trade>> {
        Ok(self.collect(|t| t.timestamp >= start && t.timestamp <= end))
    }

    async fn get_recent_trades(&self, limit: usize) -> RepositoryResult<Vec<Trade>> {
        let mut trades = self.collect(|_| true);
        trades.reverse();
        trades.truncate(limit);
        Ok(trades)
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.trades
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn trade(buy: &str, sell: &str, at: Timestamp) -> Trade {
        Trade::new_with_time(buy, sell, "BTCUSD", dec!(100), dec!(1), at).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_lookup_by_order() {
        let repo = InMemoryTradeRepository::new();
        let now = Utc::now();
        let t1 = trade("b-1", "s-1", now);
        let t2 = trade("b-2", "s-1", now + Duration::seconds(1));
        repo.save(&t1).await.unwrap();
        repo.save(&t2).await.unwrap();

        assert_eq!(repo.get_by_id(&t1.id).await.unwrap(), t1);
        assert_eq!(repo.get_by_order_id("s-1").await.unwrap(), vec![t1.clone(), t2]);
        assert_eq!(repo.get_by_order_id("b-1").await.unwrap(), vec![t1]);
        assert!(repo.get_by_order_id("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let repo = InMemoryTradeRepository::new();
        let t = trade("b-1", "s-1", Utc::now());
        repo.save(&t).await.unwrap();

        assert!(matches!(
            repo.save(&t).await,
            Err(RepositoryError::AlreadyExists { .. })
        ));
        assert!(repo.get_by_id("missing").await.unwrap_err().is_not_found());

        repo.delete(&t.id).await.unwrap();
        assert!(repo.delete(&t.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_recent_trades_newest_first() {
        let repo = InMemoryTradeRepository::new();
        let t0 = Utc::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            let t = trade(&format!("b-{i}"), &format!("s-{i}"), t0 + Duration::seconds(i));
            ids.push(t.id.clone());
            repo.save(&t).await.unwrap();
        }

        let recent: Vec<_> = repo
            .get_recent_trades(2)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(recent, vec![ids[4].clone(), ids[3].clone()]);
        assert!(repo.get_recent_trades(0).await.unwrap().is_empty());

        let window = repo
            .get_trades_in_time_range(t0 + Duration::seconds(1), t0 + Duration::seconds(3))
            .await
            .unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(repo.get_by_symbol("BTCUSD").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_same_timestamp_keeps_save_order() {
        let repo = InMemoryTradeRepository::new();
        let at = Utc::now();
        let mut ids = Vec::new();
        for i in 0..8 {
            let t = trade("b-1", &format!("s-{i}"), at);
            ids.push(t.id.clone());
            repo.save(&t).await.unwrap();
        }

        let by_order: Vec<_> = repo
            .get_by_order_id("b-1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(by_order, ids);

        let by_symbol: Vec<_> = repo
            .get_by_symbol("BTCUSD")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(by_symbol, ids);

        let recent: Vec<_> = repo
            .get_recent_trades(3)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(recent, vec![ids[7].clone(), ids[6].clone(), ids[5].clone()]);
    }
}
