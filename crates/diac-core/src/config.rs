//! Конфигурационные структуры восстановителя диакритики.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::lang::Lang;

/// Жёсткие ограничения формы входа модели.
///
/// Всё, что не помещается в эти границы в рамках одного батча,
/// переносится в следующий батч генератором признаков.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLimits {
    /// Максимальная длина последовательности BERT (в subword-токенах).
    pub bert_max_seq_len: usize,

    /// Максимальное количество окон (диакритических позиций) в батче.
    pub max_windows: usize,

    /// Максимальное количество предложений в батче.
    pub max_sentences: usize,

    /// Максимальная длина предложения и чанка в символах.
    pub max_sentence_length: usize,

    /// Ширина символьного окна вокруг позиции.
    pub window_size: usize,

    /// Количество классов на выходе модели.
    pub num_classes: usize,
}

impl Default for FeatureLimits {
    fn default() -> Self {
        Self {
            bert_max_seq_len: 512,
            max_windows: 280,
            max_sentences: 10,
            max_sentence_length: 256,
            window_size: 11,
            num_classes: 5,
        }
    }
}

impl FeatureLimits {
    /// Количество символов контекста с каждой стороны от центра окна.
    pub fn half_window(&self) -> usize {
        self.window_size / 2
    }

    /// Оценка количества батчей для заданного числа диакритических позиций.
    pub fn estimated_steps(&self, eligible: usize) -> usize {
        eligible / self.max_windows + 1
    }

    /// Проверить согласованность ограничений.
    pub fn validate(&self) -> crate::DiacResult<()> {
        let zero = [
            ("bert_max_seq_len", self.bert_max_seq_len),
            ("max_windows", self.max_windows),
            ("max_sentences", self.max_sentences),
            ("max_sentence_length", self.max_sentence_length),
            ("window_size", self.window_size),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);
        if let Some((name, _)) = zero {
            return Err(crate::DiacError::Config(format!("{name} must be positive")));
        }
        if self.window_size % 2 == 0 {
            return Err(crate::DiacError::Config(format!(
                "window_size must be odd, got {}",
                self.window_size
            )));
        }
        if self.num_classes < crate::char_dict::DiacriticClass::COUNT {
            return Err(crate::DiacError::Config(format!(
                "num_classes must be at least {}, got {}",
                crate::char_dict::DiacriticClass::COUNT,
                self.num_classes
            )));
        }
        Ok(())
    }
}

/// Конфигурация восстановителя.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorerConfig {
    /// Корень дерева ресурсов (`resources/<lang>/models/...`).
    pub resources_root: PathBuf,

    /// Язык модели.
    pub lang: Lang,

    /// Путь модели в реестре (например, `["models", "diacritice", "base"]`).
    pub model_path: Vec<String>,

    /// Явный путь к `tokenizer.json`; по умолчанию берётся из директории модели.
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,

    /// Токены длиннее этого значения исключаются из обработки моделью.
    pub max_word_len: usize,

    /// Проверять ли удалённую версию модели при создании.
    pub check_updates: bool,

    /// Ограничения формы входа модели.
    pub limits: FeatureLimits,
}

impl Default for RestorerConfig {
    fn default() -> Self {
        Self::base(Lang::Ro)
    }
}

impl RestorerConfig {
    /// Конфигурация для базовой модели.
    pub fn base(lang: Lang) -> Self {
        Self::with_variant(lang, "base")
    }

    /// Конфигурация для облегчённой модели.
    pub fn small(lang: Lang) -> Self {
        Self::with_variant(lang, "small")
    }

    fn with_variant(lang: Lang, variant: &str) -> Self {
        Self {
            resources_root: PathBuf::from("resources"),
            lang,
            model_path: vec!["models".into(), "diacritice".into(), variant.into()],
            tokenizer_path: None,
            max_word_len: lang.longest_word_len(),
            check_updates: true,
            limits: FeatureLimits::default(),
        }
    }

    /// Задать корень дерева ресурсов.
    pub fn with_resources_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resources_root = root.into();
        self
    }

    /// Отключить проверку обновлений.
    pub fn without_update_check(mut self) -> Self {
        self.check_updates = false;
        self
    }

    /// Директория модели: `<root>/<lang>/<model_path...>`.
    pub fn model_dir(&self) -> PathBuf {
        crate::model_files::model_dir(&self.resources_root, self.lang, self.model_path.as_slice())
    }

    /// Путь к `tokenizer.json`.
    pub fn tokenizer_file(&self) -> PathBuf {
        self.tokenizer_path
            .clone()
            .unwrap_or_else(|| self.model_dir().join(crate::model_files::TOKENIZER_FILE))
    }
}
