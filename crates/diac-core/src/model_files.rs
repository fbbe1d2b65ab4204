//! Раскладка файлов модели в дереве ресурсов.
//!
//! ```text
//! resources/<lang>/models/diacritice/base/
//!     config.json            конфигурация BERT-CNN
//!     model.safetensors      веса (или шарды + index.json)
//!     tokenizer.json         subword-токенайзер
//!     char_dict              символьный словарь (JSON)
//!     version.txt            версия бандла в первой строке
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::{DiacError, DiacResult, Lang};

/// Символьный словарь модели.
pub const CHAR_DICT_FILE: &str = "char_dict";
/// Версия бандла.
pub const VERSION_FILE: &str = "version.txt";
/// Конфигурация модели.
pub const CONFIG_FILE: &str = "config.json";
/// Subword-токенайзер в формате HF `tokenizers`.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Директория модели: `<root>/<lang>/<path...>`.
pub fn model_dir(root: impl AsRef<Path>, lang: Lang, path: &[impl AsRef<str>]) -> PathBuf {
    let mut dir = root.as_ref().join(lang.as_str());
    for segment in path {
        dir.push(segment.as_ref());
    }
    dir
}

/// Директория, в которую распаковывается бандл: путь модели без последнего сегмента.
pub fn bundle_parent_dir(root: impl AsRef<Path>, lang: Lang, path: &[impl AsRef<str>]) -> PathBuf {
    let parent = path.len().saturating_sub(1);
    model_dir(root, lang, &path[..parent])
}

/// Список обязательных артефактов, которых нет в директории модели.
pub fn missing_artifacts(model_dir: impl AsRef<Path>) -> Vec<&'static str> {
    let model_dir = model_dir.as_ref();
    let mut missing: Vec<&'static str> = [CHAR_DICT_FILE, CONFIG_FILE]
        .into_iter()
        .filter(|f| !model_dir.join(f).is_file())
        .collect();
    if resolve_safetensors_files(model_dir).is_err() {
        missing.push("model.safetensors");
    }
    missing
}

#[derive(serde::Deserialize)]
struct SafetensorsIndex {
    weight_map: HashMap<String, String>,
}

/// Разрешить список safetensors-файлов в директории модели.
///
/// Поддерживает:
/// - `model.safetensors` (один файл)
/// - `model.safetensors.index.json` + шардированные `model-00001-of-0000N.safetensors`
/// - fallback: поиск `model-*-of-*.safetensors` без index.json
pub fn resolve_safetensors_files(model_dir: impl AsRef<Path>) -> DiacResult<Vec<PathBuf>> {
    let model_dir = model_dir.as_ref();

    let single = model_dir.join("model.safetensors");
    if single.exists() {
        return Ok(vec![single]);
    }

    let index_path = model_dir.join("model.safetensors.index.json");
    if index_path.exists() {
        let data = std::fs::read(&index_path)?;
        let idx: SafetensorsIndex = serde_json::from_slice(&data)?;

        // Порядок не важен для VarBuilder, но для детерминизма сортируем.
        let uniq: BTreeSet<String> = idx.weight_map.into_values().collect();

        let mut out = Vec::with_capacity(uniq.len());
        for shard in uniq {
            let p = model_dir.join(&shard);
            if !p.exists() {
                return Err(DiacError::Model(format!(
                    "В index.json указан шард, но файл не найден: {}",
                    p.display()
                )));
            }
            out.push(p);
        }

        if out.is_empty() {
            return Err(DiacError::Model(format!(
                "Пустой weight_map в {}",
                index_path.display()
            )));
        }

        return Ok(out);
    }

    if !model_dir.is_dir() {
        return Err(DiacError::Model(format!(
            "Директория модели не найдена: {}",
            model_dir.display()
        )));
    }

    let mut shards: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(model_dir)? {
        let p = entry?.path();
        if !p.is_file() {
            continue;
        }
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if name.starts_with("model-") && name.ends_with(".safetensors") && name.contains("-of-") {
            shards.push(p);
        }
    }
    shards.sort();
    if !shards.is_empty() {
        return Ok(shards);
    }

    Err(DiacError::Model(format!(
        "В директории модели нет ни model.safetensors, ни index.json, ни шардов model-*-of-*.safetensors: {}",
        model_dir.display()
    )))
}
