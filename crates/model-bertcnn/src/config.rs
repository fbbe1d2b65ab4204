//! Конфигурация BERT-CNN (`config.json` в директории модели).

use std::path::Path;

use candle_transformers::models::bert;
use diac_core::{DiacError, DiacResult};
use serde::{Deserialize, Serialize};

/// Конфигурация модели BERT-CNN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BertCnnConfig {
    /// Название модели (например, "diacritice-base").
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Конфигурация BERT-энкодера в формате HF `config.json`.
    pub bert: BertSection,

    /// Размер символьного словаря (максимальный id `char_dict` + 1).
    pub char_vocab_size: usize,

    /// Размерность эмбеддинга символа.
    #[serde(default = "default_char_embedding_dim")]
    pub char_embedding_dim: usize,

    /// Количество фильтров на одно ядро свёртки.
    #[serde(default = "default_conv_filters")]
    pub conv_filters: usize,

    /// Размеры ядер свёрток над окном.
    #[serde(default = "default_conv_kernel_sizes")]
    pub conv_kernel_sizes: Vec<usize>,

    /// Размерность скрытого dense-слоя.
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,

    /// Количество классов диакритики (5).
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,

    /// Ширина символьного окна (11).
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

/// Секция BERT: размерность выхода типизирована, остальное передаётся
/// в `candle_transformers` как есть.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BertSection {
    /// Размерность скрытого состояния (768 для base).
    pub hidden_size: usize,

    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl BertSection {
    /// Конфигурация для [`bert::BertModel`].
    pub fn to_candle(&self) -> DiacResult<bert::Config> {
        let mut map = self.rest.clone();
        map.insert("hidden_size".into(), self.hidden_size.into());
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

fn default_model_name() -> String {
    "diacritice-bertcnn".to_string()
}

fn default_char_embedding_dim() -> usize {
    100
}

fn default_conv_filters() -> usize {
    64
}

fn default_conv_kernel_sizes() -> Vec<usize> {
    vec![2, 3, 4, 5]
}

fn default_hidden_dim() -> usize {
    256
}

fn default_num_classes() -> usize {
    5
}

fn default_window_size() -> usize {
    11
}

impl BertCnnConfig {
    /// Загрузить конфигурацию из `config.json`.
    pub fn from_file(path: impl AsRef<Path>) -> DiacResult<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    /// Разобрать конфигурацию из JSON-строки.
    pub fn from_json_str(data: &str) -> DiacResult<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Размерность признаков окна после CNN.
    pub fn char_features_dim(&self) -> usize {
        self.conv_filters * self.conv_kernel_sizes.len()
    }

    /// Проверить согласованность гиперпараметров.
    pub fn validate(&self) -> DiacResult<()> {
        if self.conv_kernel_sizes.is_empty() {
            return Err(DiacError::Config("conv_kernel_sizes is empty".into()));
        }
        if let Some(k) = self
            .conv_kernel_sizes
            .iter()
            .find(|&&k| k == 0 || k > self.window_size)
        {
            return Err(DiacError::Config(format!(
                "conv kernel {k} does not fit window of {} chars",
                self.window_size
            )));
        }
        if self.num_classes < diac_core::DiacriticClass::COUNT {
            return Err(DiacError::Config(format!(
                "num_classes must be at least {}, got {}",
                diac_core::DiacriticClass::COUNT,
                self.num_classes
            )));
        }
        if self.char_vocab_size == 0 {
            return Err(DiacError::Config("char_vocab_size must be positive".into()));
        }
        Ok(())
    }
}
