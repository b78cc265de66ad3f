//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Внутрипроцессная шина сообщений с типизированными темами:
//!
//! - `registry`: реестр тем — единственный источник истины о
//!   существовании темы и её типе payload.
//! - `topic`: тема, набор подписчиков и синхронный фан-аут.
//! - `message`: конверт доставляемого сообщения.
//! - `subscriber`: подписчик и его приватная FIFO-очередь.
//! - `publisher`: фасад создания тем и публикации.
//!
//! Тип payload закрепляется за темой при создании и проверяется (по
//! `TypeId`) на каждом publish и attach; очередь каждого подписчика
//! принадлежит только ему и разгребается без блокировок на ожидание.

pub mod message;
pub mod publisher;
pub mod registry;
pub mod subscriber;
pub mod topic;

pub use message::Message;
pub use publisher::Publisher;
pub use registry::Registry;
pub use subscriber::Subscriber;
pub use topic::{PublishResult, TopicHandle};
