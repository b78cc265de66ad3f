use std::{
    any::{Any, TypeId},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

use super::{topic::Topic, Publisher, Subscriber, TopicHandle};
use crate::{BusError, BusResult};

/// Реестр тем: единственный источник истины о существовании темы и её
/// закреплённом типе payload.
///
/// Создаётся явно и передаётся конструкторам `Publisher` и
/// `Subscriber` — никакого скрытого процессно-глобального состояния.
/// Клонирование дёшево и даёт хэндл на то же разделяемое состояние.
///
/// Каждый publish и каждый attach проходит через `resolve`, поэтому
/// значение несоответствующего типа не может попасть в тему ни с какой
/// стороны — центральное свойство корректности всей шины.
///
/// Карта тем шардирована (`DashMap`), у каждой темы и каждой очереди
/// подписчика свой замок: несвязанные темы и подписчики не конкурируют
/// за один глобальный лок.
#[derive(Clone)]
pub struct Registry {
    topics: Arc<DashMap<Arc<str>, Arc<Topic>>>,
    next_subscriber_id: Arc<AtomicU64>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            next_subscriber_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Создаёт тему `name`, закрепляя за ней тип `T`.
    ///
    /// Гонка двух создателей одного имени разрешается в пользу ровно
    /// одного: проигравший получает `BusError::DuplicateTopic`
    /// независимо от типового аргумента.
    pub fn create_topic<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> BusResult<TopicHandle<T>> {
        match self.topics.entry(Arc::from(name)) {
            Entry::Occupied(_) => Err(BusError::DuplicateTopic(name.to_string())),
            Entry::Vacant(slot) => {
                let topic = Arc::new(Topic::new::<T>(slot.key().clone()));
                debug!(topic = name, payload_type = topic.type_name(), "topic created");
                slot.insert(topic.clone());
                Ok(TopicHandle::new(topic))
            }
        }
    }

    /// Есть ли тема с именем `name`. Чистый lookup без побочных
    /// эффектов.
    pub fn exists(
        &self,
        name: &str,
    ) -> bool {
        self.topics.contains_key(name)
    }

    /// Возвращает типизированный хэндл темы `name`.
    ///
    /// `UnknownTopic`, если темы нет; `TypeMismatch`, если `T` — не тот
    /// тип, что был закреплён при создании. Сравнение по `TypeId`, не
    /// по имени типа.
    pub fn resolve<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> BusResult<TopicHandle<T>> {
        let topic = self
            .lookup(name)
            .ok_or_else(|| BusError::UnknownTopic(name.to_string()))?;
        if topic.tag() != TypeId::of::<T>() {
            return Err(BusError::TypeMismatch {
                topic: name.to_string(),
                bound: topic.type_name(),
                requested: std::any::type_name::<T>(),
            });
        }
        Ok(TopicHandle::new(topic))
    }

    /// Имена всех зарегистрированных тем.
    pub fn topic_names(&self) -> Vec<String> {
        self.topics.iter().map(|e| e.key().to_string()).collect()
    }

    /// Число зарегистрированных тем.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Пуст ли реестр.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Полный сброс реестра: все темы удаляются, имена снова свободны.
    ///
    /// Явная операция для тестов. Живые подписчики остаются валидными,
    /// но из удалённых тем больше ничего не получают.
    pub fn reset(&self) {
        self.topics.clear();
        debug!("registry reset");
    }

    /// `Publisher`, привязанный к этому реестру.
    pub fn publisher(&self) -> Publisher {
        Publisher::new(self.clone())
    }

    /// Новый `Subscriber` с собственной очередью, привязанный к этому
    /// реестру.
    pub fn subscriber(&self) -> Subscriber {
        Subscriber::new(self.clone())
    }

    pub(crate) fn allocate_subscriber_id(&self) -> u64 {
        self.next_subscriber_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn lookup(
        &self,
        name: &str,
    ) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|entry| entry.value().clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("topics", &self.topics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет создание темы и последующий lookup.
    #[test]
    fn test_create_and_exists() {
        let registry = Registry::new();
        assert!(!registry.exists("temp"));

        let handle = registry.create_topic::<f64>("temp").unwrap();
        assert_eq!(handle.name(), "temp");
        assert!(registry.exists("temp"));
        assert_eq!(registry.len(), 1);
    }

    /// Тест проверяет, что повторное создание темы с тем же именем
    /// всегда даёт `DuplicateTopic` — даже с другим типом.
    #[test]
    fn test_duplicate_topic_rejected() {
        let registry = Registry::new();
        registry.create_topic::<f64>("temp").unwrap();

        let err = registry.create_topic::<f64>("temp").unwrap_err();
        assert_eq!(err, BusError::DuplicateTopic("temp".into()));

        // Тип другой, имя то же: всё равно дубликат.
        let err = registry.create_topic::<String>("temp").unwrap_err();
        assert_eq!(err, BusError::DuplicateTopic("temp".into()));
        assert_eq!(registry.len(), 1);
    }

    /// Тест проверяет resolve несуществующей темы.
    #[test]
    fn test_resolve_unknown_topic() {
        let registry = Registry::new();
        let err = registry.resolve::<u32>("nope").unwrap_err();
        assert_eq!(err, BusError::UnknownTopic("nope".into()));
    }

    /// Тест проверяет, что resolve с чужим типом даёт `TypeMismatch`
    /// и не меняет состояние реестра.
    #[test]
    fn test_resolve_type_mismatch() {
        let registry = Registry::new();
        registry.create_topic::<String>("cmd").unwrap();

        let err = registry.resolve::<i32>("cmd").unwrap_err();
        match err {
            BusError::TypeMismatch { topic, .. } => assert_eq!(topic, "cmd"),
            other => panic!("expected TypeMismatch, got {other:?}"),
        }

        // Тема жива и резолвится правильным типом.
        assert!(registry.exists("cmd"));
        assert!(registry.resolve::<String>("cmd").is_ok());
    }

    /// Тест проверяет перечисление имён тем.
    #[test]
    fn test_topic_names() {
        let registry = Registry::new();
        registry.create_topic::<u8>("a").unwrap();
        registry.create_topic::<u8>("b").unwrap();

        let mut names = registry.topic_names();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    /// Тест проверяет, что после reset имена снова свободны.
    #[test]
    fn test_reset_frees_names() {
        let registry = Registry::new();
        registry.create_topic::<u8>("temp").unwrap();
        registry.reset();

        assert!(registry.is_empty());
        assert!(!registry.exists("temp"));
        // Имя свободно, причём и под другой тип.
        registry.create_topic::<String>("temp").unwrap();
    }

    /// Тест проверяет гонку создания: из N потоков, создающих одну и
    /// ту же тему, выигрывает ровно один.
    #[test]
    fn test_create_race_single_winner() {
        let registry = Registry::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.create_topic::<u64>("contested").is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    /// Тест проверяет, что клоны реестра видят одно состояние.
    #[test]
    fn test_clones_share_state() {
        let registry = Registry::new();
        let other = registry.clone();

        registry.create_topic::<u8>("shared").unwrap();
        assert!(other.exists("shared"));
        assert_eq!(
            other.create_topic::<u8>("shared").unwrap_err(),
            BusError::DuplicateTopic("shared".into())
        );
    }

    /// Тест проверяет, что идентификаторы подписчиков уникальны.
    #[test]
    fn test_subscriber_ids_unique() {
        let registry = Registry::new();
        let a = registry.subscriber();
        let b = registry.subscriber();
        assert_ne!(a.id(), b.id());
    }
}
