//! Загрузка бандлов модели и проверка их версий.
//!
//! Вызовы блокирующие и без повторов. Блокировок между параллельными
//! вызовами нет: ожидается, что процесс вызывает их последовательно при старте.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use diac_core::model_files::{self, VERSION_FILE};
use diac_core::{DiacResult, Lang};
use tempfile::tempdir_in;
use tracing::{error, info, warn};

use crate::error::DownloadError;
use crate::registry::{join_path, ModelLinks, ModelRegistry, RegistryNode};
use crate::transport::{self, HttpTransport, Transport};
use crate::version::{newer_version, read_version};

/// Загрузчик моделей поверх реестра и транспорта.
pub struct ModelHub {
    registry: ModelRegistry,
    transport: Box<dyn Transport>,
    resources_root: PathBuf,
}

impl ModelHub {
    /// Встроенный реестр и HTTP-транспорт.
    pub fn new(resources_root: impl Into<PathBuf>) -> DiacResult<Self> {
        Ok(Self::with_transport(
            resources_root,
            ModelRegistry::builtin().clone(),
            Box::new(HttpTransport::new()?),
        ))
    }

    /// Явно заданные реестр и транспорт.
    pub fn with_transport(
        resources_root: impl Into<PathBuf>,
        registry: ModelRegistry,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            registry,
            transport,
            resources_root: resources_root.into(),
        }
    }

    /// Корень дерева ресурсов.
    pub fn resources_root(&self) -> &Path {
        &self.resources_root
    }

    /// Директория модели в дереве ресурсов.
    pub fn model_dir(&self, lang: Lang, path: &[impl AsRef<str>]) -> PathBuf {
        model_files::model_dir(&self.resources_root, lang, path)
    }

    fn lookup_leaf(&self, lang: Lang, path: &[impl AsRef<str>]) -> Result<&ModelLinks, String> {
        match self.registry.resolve(lang, path) {
            Ok(RegistryNode::Leaf(links)) => Ok(links),
            Ok(RegistryNode::Branch(_)) => Err(format!(
                "Remote path {} is not a model bundle",
                join_path(path)
            )),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Скачать и распаковать бандл модели.
    ///
    /// Возвращает `Ok(false)`, если язык или путь не найден в реестре.
    /// Ошибки сети и файловой системы возвращаются как `Err`.
    pub fn fetch_model(&self, lang: Lang, path: &[impl AsRef<str>]) -> DiacResult<bool> {
        let links = match self.lookup_leaf(lang, path) {
            Ok(links) => links,
            Err(msg) => {
                info!("{}", msg);
                return Ok(false);
            }
        };
        info!("Downloading model {} for {} ...", join_path(path), lang);
        let folder = model_files::bundle_parent_dir(&self.resources_root, lang, path);
        self.download_folder(&links.link, &folder)?;
        Ok(true)
    }

    /// Скачать файл в директорию и распаковать, если это zip-архив.
    ///
    /// Архив скачивается во временный файл и распаковывается во временную
    /// директорию рядом с `destination`. Содержимое `destination`
    /// заменяется только после успешной распаковки; при ошибке оно остаётся
    /// прежним. Архив удаляется в любом случае.
    pub fn download_folder(&self, link: &str, destination: impl AsRef<Path>) -> Result<(), DownloadError> {
        let destination = destination.as_ref();
        fs::create_dir_all(destination)?;
        let (archive, fetched) = transport::download_temp(self.transport.as_ref(), link, destination)?;
        info!("Downloaded {} ({} bytes)", fetched.file_name, fetched.len);

        if !transport::is_zip(archive.path()) {
            let path = destination.join(&fetched.file_name);
            archive.persist(&path).map_err(|e| e.error)?;
            return Ok(());
        }

        let staging = tempdir_in(destination)?;
        transport::extract_zip(archive.path(), staging.path())?;
        drop(archive);
        replace_entries(staging.path(), destination)?;
        Ok(())
    }

    /// Скачать одиночный файл без распаковки.
    pub fn download_file(&self, link: &str, destination: impl AsRef<Path>) -> Result<PathBuf, DownloadError> {
        let destination = destination.as_ref();
        fs::create_dir_all(destination)?;
        let file = transport::download(self.transport.as_ref(), link, destination)?;
        info!("Downloaded {:?}", file);
        Ok(file)
    }

    /// Нужна ли (повторная) загрузка модели.
    ///
    /// - нет локального `version.txt` → `true`;
    /// - язык/путь не найден в реестре → `false`;
    /// - путь ведёт не к бандлу или у бандла нет ссылки на версию → `true`;
    /// - удалённую версию получить не удалось → `false` с предупреждением;
    /// - иначе покомпонентное сравнение версий.
    ///
    /// Ошибка возвращается только для некорректной строки версии.
    pub fn is_remote_newer(&self, lang: Lang, path: &[impl AsRef<str>]) -> DiacResult<bool> {
        let model_path = join_path(path);
        info!("Checking version for model {}, {}", model_path, lang);

        let local_file = self.model_dir(lang, path).join(VERSION_FILE);
        let local_version = match read_version(&local_file) {
            Ok(v) => v,
            Err(e) => {
                info!("Local model {} for {} not found ({})", model_path, lang, e);
                return Ok(true);
            }
        };

        let links = match self.registry.resolve(lang, path) {
            Ok(RegistryNode::Leaf(links)) => links,
            Ok(RegistryNode::Branch(_)) => {
                error!("Remote path {} is not a model bundle", model_path);
                return Ok(true);
            }
            Err(e) => {
                error!("{}", e);
                return Ok(false);
            }
        };
        let Some(version_link) = links.version.as_deref() else {
            error!("No version link for {} ({})", model_path, lang);
            return Ok(true);
        };

        let remote_version = match self.fetch_remote_version(version_link) {
            Ok(v) => v,
            Err(e) => {
                warn!("Error reading remote version for {} ({}): {}", model_path, lang, e);
                return Ok(false);
            }
        };
        newer_version(&remote_version, &local_version)
    }

    // Файл версии скачивается во временную директорию и удаляется вместе с ней.
    fn fetch_remote_version(&self, link: &str) -> Result<String, DownloadError> {
        let tmp = tempfile::tempdir()?;
        let file = transport::download(self.transport.as_ref(), link, tmp.path())?;
        Ok(read_version(file)?)
    }

    /// Проверить версию и при необходимости скачать модель.
    ///
    /// Неудачная загрузка не трогает локальные файлы (см.
    /// [`ModelHub::download_folder`]): если локальная модель полная, работа
    /// продолжается с ней. Возвращает директорию модели.
    pub fn ensure_model(&self, lang: Lang, path: &[impl AsRef<str>]) -> DiacResult<PathBuf> {
        let model_dir = self.model_dir(lang, path);
        if self.is_remote_newer(lang, path)? {
            match self.fetch_model(lang, path) {
                Ok(true) => info!("Model {} for {} is up to date", join_path(path), lang),
                Ok(false) => warn!("Model {} for {} was not downloaded", join_path(path), lang),
                Err(e) if model_files::missing_artifacts(&model_dir).is_empty() => {
                    warn!("Update failed, keeping local model {:?}: {}", model_dir, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(model_dir)
    }
}

/// Перенести верхнеуровневые записи `staging` в `destination`.
///
/// Существующая запись сначала уходит в резервную директорию и
/// возвращается на место, если перенос новой не удался.
fn replace_entries(staging: &Path, destination: &Path) -> io::Result<()> {
    let backup = tempdir_in(destination)?;
    let mut replaced: Vec<(PathBuf, PathBuf)> = Vec::new();

    let result = (|| -> io::Result<()> {
        for entry in fs::read_dir(staging)? {
            let entry = entry?;
            let target = destination.join(entry.file_name());
            if target.exists() {
                let saved = backup.path().join(entry.file_name());
                fs::rename(&target, &saved)?;
                replaced.push((saved, target.clone()));
            }
            fs::rename(entry.path(), &target)?;
        }
        Ok(())
    })();

    if let Err(e) = result {
        for (saved, target) in replaced.into_iter().rev() {
            if target.exists() {
                let _ = remove_entry(&target);
            }
            if let Err(restore) = fs::rename(&saved, &target) {
                error!("Cannot restore {:?}: {}", target, restore);
            }
        }
        return Err(e);
    }
    Ok(())
}

fn remove_entry(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
