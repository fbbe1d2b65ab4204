//! # diac-core
//!
//! Базовые типы, трейты и определения ошибок для восстановления
//! румынской диакритики.
//!
//! Этот крейт предоставляет фундаментальные абстракции для всех остальных
//! крейтов в workspace:
//!
//! - Символьный словарь модели [`CharDict`] и правила диакритики
//! - Батчи признаков фиксированной формы ([`FeatureBatch`]) и выход модели
//! - Конфигурация ([`RestorerConfig`], [`FeatureLimits`])
//! - Унифицированная обработка ошибок через [`DiacError`]
//! - Трейты [`DiacriticsModel`] и [`SubwordTokenizer`]
//! - Раскладка файлов модели на диске

pub mod char_dict;
pub mod config;
pub mod debug;
pub mod error;
pub mod lang;
pub mod model_files;
pub mod traits;
pub mod types;

pub use char_dict::{CharDict, DiacriticClass};
pub use config::{FeatureLimits, RestorerConfig};
pub use error::{DiacError, DiacResult};
pub use lang::Lang;
pub use traits::{DiacriticsModel, SubwordTokenizer};
pub use types::{
    FeatureBatch, FeatureTensors, ProblematicSpan, RestoreMode, SubwordEncoding,
    WindowPredictions,
};
