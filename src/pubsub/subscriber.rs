use std::{
    any::Any,
    collections::{HashSet, VecDeque},
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::trace;

use super::{topic::Deliver, Message, Registry};
use crate::{BusError, BusResult};

/// Приватная очередь входящих сообщений подписчика.
///
/// FIFO без ограничения ёмкости: если подписчик не разгребает очередь,
/// она растёт. Back-pressure в шине нет — это осознанный размен на
/// простоту, а не дефект.
pub(crate) struct Mailbox {
    queue: Mutex<VecDeque<Message>>,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }

    fn pop(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }
}

impl Deliver for Mailbox {
    fn deliver(&self, message: Message) {
        trace!(topic = message.topic(), seq = message.seq(), "message enqueued");
        self.queue.lock().push_back(message);
    }
}

/// Подписчик: владеет собственной очередью, подключается к темам и
/// разгребает доставленные сообщения в своём темпе.
///
/// Создаётся независимо от тем (`Registry::subscriber`), может быть
/// подключён к нескольким темам сразу. При уничтожении отключается от
/// всех тем; даже без этого тема держит подписчика только слабой
/// ссылкой, так что висячих указателей не бывает.
pub struct Subscriber {
    id: u64,
    registry: Registry,
    mailbox: Arc<Mailbox>,
    attached: Mutex<HashSet<Arc<str>>>,
}

impl Subscriber {
    pub fn new(registry: Registry) -> Self {
        Self {
            id: registry.allocate_subscriber_id(),
            registry,
            mailbox: Arc::new(Mailbox::new()),
            attached: Mutex::new(HashSet::new()),
        }
    }

    /// Идентификатор подписчика внутри его реестра.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Подключение к теме `name` с ожидаемым типом payload `T`.
    ///
    /// Ошибки те же, что у `Registry::resolve`; повторное подключение
    /// к той же теме — no-op без дублирования доставки.
    pub fn attach<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> BusResult<()> {
        let handle = self.registry.resolve::<T>(name)?;
        let mailbox: Arc<dyn Deliver> = self.mailbox.clone();
        let queue: Weak<dyn Deliver> = Arc::downgrade(&mailbox);
        handle.topic.attach(self.id, queue);
        self.attached.lock().insert(handle.topic.name().clone());
        Ok(())
    }

    /// Отключение от темы `name`.
    ///
    /// `false`, если подписки не было; отключение от несуществующей
    /// темы — не ошибка.
    pub fn detach(
        &self,
        name: &str,
    ) -> bool {
        let was_attached = self.attached.lock().remove(name);
        if was_attached {
            if let Some(topic) = self.registry.lookup(name) {
                topic.detach(self.id);
            }
        }
        was_attached
    }

    /// Отключение от всех тем сразу. Вызывается также из `Drop`.
    pub fn detach_all(&self) {
        let names: Vec<Arc<str>> = self.attached.lock().drain().collect();
        for name in names {
            if let Some(topic) = self.registry.lookup(&name) {
                topic.detach(self.id);
            }
        }
    }

    /// Есть ли сообщения в очереди в момент вызова.
    ///
    /// Пара `has_message`/`pop` не атомарна: при конкурентном доступе
    /// `pop` может вернуть `EmptyQueue` даже сразу после `true`. Это
    /// безобидная гонка, вызывающий обязан обращаться с ней как с
    /// нормальным исходом.
    pub fn has_message(&self) -> bool {
        !self.is_empty()
    }

    /// Забирает самое старое недоставленное сообщение (FIFO).
    ///
    /// `EmptyQueue`, если очередь пуста; вызов не блокируется и не
    /// ждёт поступлений.
    pub fn pop(&self) -> BusResult<Message> {
        self.mailbox.pop().ok_or(BusError::EmptyQueue)
    }

    /// Число сообщений, ждущих в очереди.
    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    /// Пуста ли очередь.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.detach_all();
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("pending", &self.len())
            .field("attached", &self.attached.lock().len())
            .finish()
    }
}
