use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use exchange_core::{Order, OrderId, OrderStatus, Timestamp};
use exchange_ports::{OrderRepository, RepositoryError, RepositoryResult};
use log::debug;
use std::sync::Arc;

const ENTITY: &str = "order";

/// In-memory order store
///
/// Thread-safe storage for orders using DashMap.
/// Suitable for simulation and testing.
pub struct InMemoryOrderRepository {
    orders: Arc<DashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        InMemoryOrderRepository {
            orders: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Collect matching orders, oldest first
    fn collect<F>(&self, predicate: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        orders
    }
}

fn stale_reason(stored: &Order, incoming: &Order) -> Option<String> {
    if stored.status.is_terminal() && stored != incoming {
        return Some(format!("stored order is already {}", stored.status));
    }
    if incoming.filled_quantity < stored.filled_quantity {
        return Some(format!(
            "filled quantity {} is behind stored {}",
            incoming.filled_quantity, stored.filled_quantity
        ));
    }
    None
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryOrderRepository {
    fn clone(&self) -> Self {
        InMemoryOrderRepository {
            orders: Arc::clone(&self.orders),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> RepositoryResult<()> {
        order.validate_record()?;

        match self.orders.entry(order.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::AlreadyExists {
                entity: ENTITY,
                id: order.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                debug!("Saved order {} ({})", order.id, order.status);
                Ok(())
            }
        }
    }

    /// Replace a stored order with a newer state of it
    ///
    /// Writes can arrive out of order, so an update that would move a
    /// terminal order or shrink `filled_quantity` is refused as `Stale`.
    async fn update(&self, order: &Order) -> RepositoryResult<()> {
        order.validate_record()?;

        match self.orders.get_mut(&order.id) {
            Some(mut stored) => {
                if let Some(reason) = stale_reason(&stored, order) {
                    return Err(RepositoryError::Stale {
                        entity: ENTITY,
                        id: order.id.clone(),
                        reason,
                    });
                }
                *stored = order.clone();
                debug!("Updated order {} ({})", order.id, order.status);
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: ENTITY,
                id: order.id.clone(),
            }),
        }
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.orders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Order> {
        self.orders
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RepositoryError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }

    async fn get_by_user_id(&self, user_id: &str) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect(|o| o.user_id == user_id))
    }

    async fn get_by_symbol(&self, symbol: &str) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect(|o| o.symbol == symbol))
    }

    async fn get_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect(|o| o.status == status))
    }

    async fn get_active_orders(&self) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect(|o| o.status.is_active()))
    }

    async fn get_orders_in_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect(|o| o.timestamp >= start && o.timestamp <= end))
    }
}
