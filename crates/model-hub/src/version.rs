//! Версии бандлов модели.
//!
//! Версия: строка вида `1.2.3` в первой строке `version.txt`.
//! Сравнение покомпонентное, слева направо, и только по общему префиксу:
//! `1.0` и `1.0.5` считаются равными. Это известное ограничение формата,
//! оставленное намеренно.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use diac_core::{DiacError, DiacResult};
use tracing::info;

/// Версия бандла модели.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelVersion(Vec<u64>);

impl ModelVersion {
    /// Компоненты версии.
    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Новее ли эта версия, чем `other`.
    ///
    /// Решает первый различающийся компонент из общего префикса.
    /// Если общий префикс совпадает, версия не считается новее,
    /// даже если у неё больше компонентов.
    pub fn is_newer_than(&self, other: &ModelVersion) -> bool {
        for (a, b) in self.0.iter().zip(&other.0) {
            if a != b {
                return a > b;
            }
        }
        false
    }
}

impl FromStr for ModelVersion {
    type Err = DiacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .split('.')
            .map(|part| {
                part.trim().parse::<u64>().map_err(|e| {
                    DiacError::Version(format!("Malformed version {trimmed:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ModelVersion)
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Прочитать первую строку файла версии.
pub fn read_version(path: impl AsRef<Path>) -> io::Result<String> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line)
}

/// Новее ли удалённая версия локальной.
///
/// Ошибка разбора любой из строк фатальна для проверки.
pub fn newer_version(remote: &str, local: &str) -> DiacResult<bool> {
    let remote: ModelVersion = remote.parse()?;
    let local: ModelVersion = local.parse()?;
    let newer = remote.is_newer_than(&local);
    if newer {
        info!("Remote version {} is ahead of local version {}", remote, local);
    } else if local.is_newer_than(&remote) {
        info!("Remote version {} is behind local version {}", remote, local);
    } else {
        info!("Remote version {} is the same as local version {}", remote, local);
    }
    Ok(newer)
}
