//! Сетевой транспорт и распаковка архивов.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::DownloadError;

/// Загруженный файл.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Имя файла, предложенное сервером.
    pub file_name: String,
    /// Сколько байт записано.
    pub len: u64,
}

/// Источник файлов по URL.
pub trait Transport: Send + Sync {
    /// Скачать файл потоком в `out`.
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<FetchedFile, DownloadError>;
}

/// HTTP-транспорт на `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Создать транспорт с клиентом по умолчанию.
    pub fn new() -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("diacritice/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<FetchedFile, DownloadError> {
        debug!("GET {}", url);
        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus(response.status()));
        }
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .or_else(|| filename_from_url(url))
            .ok_or_else(|| DownloadError::NoFileName(url.to_string()))?;
        let len = response.copy_to(out)?;
        Ok(FetchedFile { file_name, len })
    }
}

/// Имя файла из заголовка `Content-Disposition`.
///
/// Поддерживает `filename*=UTF-8''name` и `filename="name"`.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        if let Some(rest) = part.strip_prefix("filename*=") {
            let name = rest.rsplit("''").next().unwrap_or(rest);
            let decoded = percent_decode_str(name).decode_utf8_lossy();
            if let Some(name) = sanitize_file_name(&decoded) {
                return Some(name);
            }
        } else if let Some(rest) = part.strip_prefix("filename=") {
            plain = sanitize_file_name(rest.trim_matches('"'));
        }
    }
    plain
}

/// Имя файла из последнего сегмента URL.
pub fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').find(|s| !s.is_empty())?;
    if last.contains(':') {
        return None;
    }
    sanitize_file_name(last)
}

// Только последний компонент пути: имя от сервера не должно выводить из директории.
fn sanitize_file_name(name: &str) -> Option<String> {
    let file_name = Path::new(name.trim()).file_name()?.to_str()?;
    if file_name.is_empty() || file_name == "." || file_name == ".." {
        return None;
    }
    Some(file_name.to_string())
}

/// Скачать файл во временный файл внутри `destination`.
///
/// Временный файл удаляется при drop, если его не сохранили через
/// `persist`.
pub fn download_temp(
    transport: &dyn Transport,
    link: &str,
    destination: impl AsRef<Path>,
) -> Result<(NamedTempFile, FetchedFile), DownloadError> {
    let mut temp_file = NamedTempFile::new_in(destination.as_ref())?;
    let fetched = transport.fetch(link, &mut temp_file)?;
    temp_file.flush()?;
    debug!("Получено {} байт ({})", fetched.len, fetched.file_name);
    Ok((temp_file, fetched))
}

/// Скачать файл в директорию; возвращает путь к сохранённому файлу.
pub fn download(
    transport: &dyn Transport,
    link: &str,
    destination: impl AsRef<Path>,
) -> Result<PathBuf, DownloadError> {
    let destination = destination.as_ref();
    let (temp_file, fetched) = download_temp(transport, link, destination)?;
    let path = destination.join(&fetched.file_name);
    temp_file.persist(&path).map_err(|e| e.error)?;
    Ok(path)
}

/// Является ли файл zip-архивом.
pub fn is_zip(path: impl AsRef<Path>) -> bool {
    File::open(path.as_ref())
        .map(|f| ZipArchive::new(io::BufReader::new(f)).is_ok())
        .unwrap_or(false)
}

/// Распаковать zip-архив в директорию.
pub fn extract_zip(archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<(), DownloadError> {
    let archive = archive.as_ref();
    let destination = destination.as_ref();
    info!("Распаковка {:?} в {:?}", archive, destination);
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(io::BufReader::new(file))?;
    zip.extract(destination)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_content_disposition_plain() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"base.zip\""),
            Some("base.zip".into())
        );
    }

    #[test]
    fn test_content_disposition_extended_wins() {
        assert_eq!(
            filename_from_content_disposition(
                "attachment; filename=\"fallback.zip\"; filename*=UTF-8''diacritice%20base.zip"
            ),
            Some("diacritice base.zip".into())
        );
    }

    #[test]
    fn test_content_disposition_strips_directories() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"../../etc/passwd\""),
            Some("passwd".into())
        );
        assert_eq!(filename_from_content_disposition("attachment"), None);
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://host/files/version.txt?dl=1"),
            Some("version.txt".into())
        );
        assert_eq!(
            filename_from_url("https://host/index.php/s/abc/download"),
            Some("download".into())
        );
        assert_eq!(filename_from_url("https://"), None);
    }

    #[test]
    fn test_is_zip_on_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.txt");
        fs::write(&path, "1.0.0\n").unwrap();
        assert!(!is_zip(&path));
        assert!(!is_zip(dir.path().join("missing.zip")));
    }

    struct Chunked;

    impl Transport for Chunked {
        fn fetch(&self, _url: &str, out: &mut dyn Write) -> Result<FetchedFile, DownloadError> {
            let mut len = 0;
            for chunk in [&b"1.2"[..], b".3\n"] {
                out.write_all(chunk)?;
                len += chunk.len() as u64;
            }
            Ok(FetchedFile {
                file_name: "version.txt".into(),
                len,
            })
        }
    }

    #[test]
    fn test_download_streams_into_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = download(&Chunked, "https://host/v", dir.path()).unwrap();
        assert_eq!(path, dir.path().join("version.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "1.2.3\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
