//! Реестр удалённых бандлов моделей.
//!
//! Дерево `язык → вложенный путь → {link, version}`. Встроенный реестр
//! описывает модели `ro/models/diacritice/{small,base}`; для тестов и
//! зеркал реестр можно собрать вручную или прочитать из JSON.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use diac_core::{DiacResult, Lang};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ссылки на бандл модели.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelLinks {
    /// Ссылка на архив бандла.
    pub link: String,
    /// Ссылка на файл с версией бандла.
    #[serde(default)]
    pub version: Option<String>,
}

/// Узел реестра.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryNode {
    /// Конечный бандл.
    Leaf(ModelLinks),
    /// Вложенный уровень пути.
    Branch(BTreeMap<String, RegistryNode>),
}

/// Ошибка поиска в реестре.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Для языка нет ни одной модели.
    #[error("{0} not supported")]
    UnsupportedLanguage(Lang),

    /// Сегмент пути не найден.
    #[error("Remote path not found {path} ({key})")]
    PathNotFound {
        /// Полный путь через `/`.
        path: String,
        /// Первый отсутствующий сегмент.
        key: String,
    },
}

/// Реестр бандлов.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRegistry {
    langs: BTreeMap<Lang, RegistryNode>,
}

impl ModelRegistry {
    /// Встроенный реестр.
    pub fn builtin() -> &'static ModelRegistry {
        static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let mut registry = ModelRegistry::default();
            registry.insert(
                Lang::Ro,
                &["models", "diacritice", "small"],
                ModelLinks {
                    link: "https://nextcloud.readerbench.com/index.php/s/HbNRckT5LHa4cc4/download".into(),
                    version: Some(
                        "https://nextcloud.readerbench.com/index.php/s/wtcqmsb6CmpnwdN/download".into(),
                    ),
                },
            );
            registry.insert(
                Lang::Ro,
                &["models", "diacritice", "base"],
                ModelLinks {
                    link: "https://nextcloud.readerbench.com/index.php/s/Y56BLDLtYZ6WRRa/download".into(),
                    version: Some(
                        "https://nextcloud.readerbench.com/index.php/s/GRsJP7yFreeicaR/download".into(),
                    ),
                },
            );
            registry
        })
    }

    /// Прочитать реестр из JSON вида `{ "ro": { "models": { ... } } }`.
    pub fn from_json_str(data: &str) -> DiacResult<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Зарегистрировать бандл по пути. Промежуточные уровни создаются.
    ///
    /// Пустой путь ничего не делает.
    pub fn insert(&mut self, lang: Lang, path: &[&str], links: ModelLinks) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let root = self
            .langs
            .entry(lang)
            .or_insert_with(|| RegistryNode::Branch(BTreeMap::new()));
        let mut children = branch_children(root);
        for segment in parents {
            let child = children
                .entry((*segment).to_string())
                .or_insert_with(|| RegistryNode::Branch(BTreeMap::new()));
            children = branch_children(child);
        }
        children.insert((*last).to_string(), RegistryNode::Leaf(links));
    }

    /// Языки, для которых есть модели.
    pub fn languages(&self) -> impl Iterator<Item = Lang> + '_ {
        self.langs.keys().copied()
    }

    /// Найти узел по пути.
    pub fn resolve(&self, lang: Lang, path: &[impl AsRef<str>]) -> Result<&RegistryNode, LookupError> {
        let mut node = self
            .langs
            .get(&lang)
            .ok_or(LookupError::UnsupportedLanguage(lang))?;
        for key in path {
            let key = key.as_ref();
            let child = match node {
                RegistryNode::Branch(children) => children.get(key),
                RegistryNode::Leaf(_) => None,
            };
            node = child.ok_or_else(|| LookupError::PathNotFound {
                path: join_path(path),
                key: key.to_string(),
            })?;
        }
        Ok(node)
    }
}

// Лист на месте промежуточного уровня заменяется веткой.
fn branch_children(node: &mut RegistryNode) -> &mut BTreeMap<String, RegistryNode> {
    if let RegistryNode::Leaf(_) = node {
        *node = RegistryNode::Branch(BTreeMap::new());
    }
    match node {
        RegistryNode::Branch(children) => children,
        RegistryNode::Leaf(_) => unreachable!(),
    }
}

/// Путь модели через `/`.
pub fn join_path(path: &[impl AsRef<str>]) -> String {
    path.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join("/")
}
