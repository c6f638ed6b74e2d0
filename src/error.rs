use crate::events::WindowId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка разбора JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Некорректный запрос: {0}")]
    BadRequest(String),

    #[error("Окно {0} больше не существует")]
    WindowGone(WindowId),

    #[error("Ошибка оконной системы: {0}")]
    Platform(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl EmbedError {
    pub fn bad_request<T>(msg: impl Into<String>) -> Result<T> {
        Err(EmbedError::BadRequest(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, EmbedError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! embed_error {
    (bad_request, $($arg:tt)*) => {
        $crate::error::EmbedError::BadRequest(format!($($arg)*))
    };
    (platform, $($arg:tt)*) => {
        $crate::error::EmbedError::Platform(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::EmbedError::Internal(format!($($arg)*))
    };
}
