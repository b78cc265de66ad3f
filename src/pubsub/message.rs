use std::{any::Any, fmt, sync::Arc};

/// Конверт сообщения, доставляемого подписчику.
///
/// Хранит имя темы, порядковый номер публикации внутри темы и payload
/// в стёртом виде. Фактический тип payload всегда равен типу,
/// закреплённому за темой при создании: проверка выполняется на этапе
/// `resolve`, до фан-аута, поэтому здесь несоответствие невозможно.
///
/// Копии, доставленные разным подписчикам, разделяют одну неизменяемую
/// аллокацию payload (клон `Arc`).
#[derive(Clone)]
pub struct Message {
    topic: Arc<str>,
    seq: u64,
    type_name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Message {
    pub(crate) fn new(
        topic: Arc<str>,
        seq: u64,
        type_name: &'static str,
        payload: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            topic,
            seq,
            type_name,
            payload,
        }
    }

    /// Имя темы, в которую сообщение было опубликовано.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Порядковый номер сообщения внутри темы (нумерация с 1).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Имя типа payload (диагностика).
    pub fn payload_type(&self) -> &'static str {
        self.type_name
    }

    /// Ссылка на payload, если его тип — `T`.
    pub fn payload_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Забирает payload, потребляя сообщение.
    ///
    /// При несоответствии типа сообщение возвращается нетронутым.
    pub fn into_payload<T: Any + Send + Sync>(self) -> Result<Arc<T>, Message> {
        let Message {
            topic,
            seq,
            type_name,
            payload,
        } = self;
        payload.downcast::<T>().map_err(|payload| Message {
            topic,
            seq,
            type_name,
            payload,
        })
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("topic", &self.topic)
            .field("seq", &self.seq)
            .field("payload", &self.type_name)
            .finish()
    }
}
