//! Ошибки загрузки бандлов модели.

use diac_core::DiacError;
use thiserror::Error;

/// Ошибка сетевого транспорта или распаковки.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Сетевой запрос не удался.
    #[error("Network request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Сервер ответил неуспешным статусом.
    #[error("HTTP status {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Архив повреждён или не читается.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O ошибка.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Не удалось определить имя файла для загрузки.
    #[error("Cannot determine file name for {0}")]
    NoFileName(String),
}

impl From<DownloadError> for DiacError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::Io(io) => DiacError::Io(io),
            other => DiacError::Download(other.to_string()),
        }
    }
}
