pub mod process;

// Условное логирование: форматирование пропускается, если уровень DEBUG выключен
#[macro_export]
macro_rules! debug_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

/// Выполнить нативную операцию и залогировать ошибку вместо её проброса.
///
/// Возвращает `true`, если операция прошла успешно.
#[macro_export]
macro_rules! warn_on_err {
    ($result:expr, $($arg:tt)*) => {
        match $result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("{}: {}", format!($($arg)*), e);
                false
            }
        }
    };
}
