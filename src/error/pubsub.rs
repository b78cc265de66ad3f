use thiserror::Error;

/// Ошибки контрактов шины сообщений.
///
/// Все варианты — нарушения контракта вызывающей стороной, а не
/// транзиентные сбои: каждая ошибка возвращается синхронно в точке
/// нарушения, внутри шины ничего не перехватывается и не повторяется.
/// Неудавшийся вызов не трогает ни реестр, ни очереди: существующие
/// темы и подписки остаются валидными.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("topic already exists: {0}")]
    DuplicateTopic(String),

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("type mismatch on topic {topic}: bound to {bound}, requested {requested}")]
    TypeMismatch {
        topic: String,
        /// Имя типа, закреплённого за темой при создании. Только для
        /// диагностики: сама проверка идёт по `TypeId`, а не по имени.
        bound: &'static str,
        /// Имя типа, с которым пришёл вызывающий.
        requested: &'static str,
    },

    #[error("no messages available")]
    EmptyQueue,
}

/// Результат операций шины.
pub type BusResult<T> = Result<T, BusError>;
