//! # model-hub
//!
//! Загрузка и версионирование бандлов моделей восстановления диакритики.
//!
//! - [`ModelRegistry`]: типизированное дерево `язык → путь → {link, version}`
//! - [`Transport`] / [`HttpTransport`]: получение файлов по URL
//! - [`ModelVersion`]: покомпонентное сравнение версий
//! - [`ModelHub`]: загрузка, распаковка и проверка обновлений

mod error;
mod fetcher;
mod registry;
mod transport;
mod version;

pub use error::DownloadError;
pub use fetcher::ModelHub;
pub use registry::{join_path, LookupError, ModelLinks, ModelRegistry, RegistryNode};
pub use transport::{
    download, download_temp, extract_zip, filename_from_content_disposition, filename_from_url, is_zip,
    FetchedFile, HttpTransport, Transport,
};
pub use version::{newer_version, read_version, ModelVersion};
