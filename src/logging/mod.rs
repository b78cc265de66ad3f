use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Инициализация логирования для бинарей и тестов.
///
/// Фильтр берётся из `RUST_LOG`, по умолчанию `info`. Повторные вызовы
/// безопасны: подписчик ставится один раз на процесс, чужой уже
/// установленный глобальный подписчик не перетирается.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .try_init();
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "logging initialized");
    });
}
