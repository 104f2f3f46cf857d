use async_trait::async_trait;
use tokio::sync::Mutex;

use super::traits::EntityConsumer;

/// Consumer that keeps every item it receives, in arrival order
pub struct EntityContainer<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for EntityContainer<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone + Send> EntityContainer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn items(&self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl<T: Send + 'static> EntityConsumer<T> for EntityContainer<T> {
    async fn add_entity(&self, entity: T) {
        self.items.lock().await.push(entity);
    }
}
