use std::{
    any::{Any, TypeId},
    fmt,
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::Message;

/// Единственный шов между фан-аутом темы и очередью подписчика.
///
/// Сейчас единственная реализация — синхронный `Mailbox` подписчика;
/// интерфейс позволяет подменить доставку (например, на асинхронную),
/// не меняя контрактов `Publisher`/`Subscriber`.
pub(crate) trait Deliver: Send + Sync {
    /// Кладёт сообщение в очередь получателя. Не может завершиться
    /// ошибкой и не блокируется в ожидании потребителя.
    fn deliver(&self, message: Message);
}

/// Итог одной публикации.
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Тема, в которую публиковали.
    pub topic: Arc<str>,
    /// Порядковый номер сообщения внутри темы (нумерация с 1).
    pub seq: u64,
    /// Сколько живых подписчиков получили сообщение. Ноль — не ошибка.
    pub subscribers_reached: usize,
}

/// Тема: имя, закреплённый тип payload и набор подписчиков.
///
/// Тип фиксируется в момент создания и не меняется никогда. Подписчики
/// хранятся несобственническими ссылками: тема не владеет подписчиком и
/// не продлевает ему жизнь, мёртвые записи вычищаются при фан-ауте и
/// при `detach`.
pub(crate) struct Topic {
    name: Arc<str>,
    tag: TypeId,
    type_name: &'static str,
    subscribers: RwLock<Vec<(u64, Weak<dyn Deliver>)>>,
    sequence: AtomicU64,
}

impl Topic {
    pub(crate) fn new<T: Any + Send + Sync>(name: Arc<str>) -> Self {
        Self {
            name,
            tag: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            subscribers: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn tag(&self) -> TypeId {
        self.tag
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Идемпотентное добавление подписчика. Повторный attach того же
    /// подписчика не меняет набор и возвращает `false`.
    pub(crate) fn attach(
        &self,
        id: u64,
        queue: Weak<dyn Deliver>,
    ) -> bool {
        let mut subs = self.subscribers.write();
        if subs.iter().any(|(sid, _)| *sid == id) {
            return false;
        }
        subs.push((id, queue));
        debug!(topic = %self.name, subscriber = id, "subscriber attached");
        true
    }

    /// Убирает подписчика из набора. `false`, если его там не было.
    pub(crate) fn detach(
        &self,
        id: u64,
    ) -> bool {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        let removed = subs.len() != before;
        if removed {
            debug!(topic = %self.name, subscriber = id, "subscriber detached");
        }
        removed
    }

    /// Число живых подписчиков темы.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|(_, queue)| queue.strong_count() > 0)
            .count()
    }

    /// Синхронный фан-аут: по одному `Message` каждому живому
    /// подписчику. К моменту возврата сообщение лежит в каждой очереди.
    ///
    /// Блокировка набора подписчиков держится на весь фан-аут, поэтому
    /// публикации в одну тему сериализуются; записи уничтоженных
    /// подписчиков вычищаются по пути.
    pub(crate) fn fan_out(
        &self,
        payload: Arc<dyn Any + Send + Sync>,
    ) -> PublishResult {
        let mut subs = self.subscribers.write();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let mut reached = 0usize;
        subs.retain(|(_, queue)| match queue.upgrade() {
            Some(queue) => {
                queue.deliver(Message::new(
                    self.name.clone(),
                    seq,
                    self.type_name,
                    payload.clone(),
                ));
                reached += 1;
                true
            }
            None => false,
        });
        drop(subs);
        trace!(topic = %self.name, seq, reached, "fan-out complete");
        PublishResult {
            topic: self.name.clone(),
            seq,
            subscribers_reached: reached,
        }
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

/// Типизированный хэндл темы — единственный публичный путь к ней.
///
/// Выдаётся из `Registry::create_topic` и `Registry::resolve`, то есть
/// только после проверки типа: `publish` через хэндл уже статически
/// типобезопасен, динамической проверки в нём нет.
pub struct TopicHandle<T> {
    pub(crate) topic: Arc<Topic>,
    _payload: PhantomData<fn(T)>,
}

impl<T: Any + Send + Sync> TopicHandle<T> {
    pub(crate) fn new(topic: Arc<Topic>) -> Self {
        Self {
            topic,
            _payload: PhantomData,
        }
    }

    /// Имя темы.
    pub fn name(&self) -> &str {
        self.topic.name()
    }

    /// Имя типа payload, закреплённого за темой.
    pub fn payload_type(&self) -> &'static str {
        self.topic.type_name()
    }

    /// Число живых подписчиков темы.
    pub fn subscriber_count(&self) -> usize {
        self.topic.subscriber_count()
    }

    /// Публикация значения закреплённого типа.
    pub fn publish(
        &self,
        value: T,
    ) -> PublishResult {
        self.topic.fan_out(Arc::new(value))
    }
}

impl<T> Clone for TopicHandle<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TopicHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicHandle")
            .field("topic", &self.topic)
            .finish()
    }
}
