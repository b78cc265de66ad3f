use std::any::Any;

use super::{PublishResult, Registry, TopicHandle};
use crate::BusResult;

/// Издатель: фасад без собственного состояния поверх реестра.
///
/// Издателей над одним реестром может быть сколько угодно, все видят
/// одни и те же темы.
#[derive(Debug, Clone)]
pub struct Publisher {
    registry: Registry,
}

impl Publisher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Создание темы `name` с типом payload `T`.
    ///
    /// См. `Registry::create_topic`.
    pub fn create_topic<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> BusResult<TopicHandle<T>> {
        self.registry.create_topic::<T>(name)
    }

    /// Есть ли тема с именем `name`.
    pub fn has_topic(
        &self,
        name: &str,
    ) -> bool {
        self.registry.exists(name)
    }

    /// Публикация значения `value` в тему `name`.
    ///
    /// Тема резолвится с проверкой типа; фан-аут синхронный — к
    /// моменту возврата сообщение лежит в очереди каждого живого
    /// подписчика темы.
    pub fn publish<T: Any + Send + Sync>(
        &self,
        name: &str,
        value: T,
    ) -> BusResult<PublishResult> {
        Ok(self.registry.resolve::<T>(name)?.publish(value))
    }
}
