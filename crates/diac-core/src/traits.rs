//! Швы конвейера: модель-классификатор и subword-токенайзер.
//!
//! Обе сущности являются внешними коллабораторами. Конвейер видит их только
//! через эти трейты, поэтому в тестах их легко подменить заглушками.

use crate::error::DiacResult;
use crate::types::{FeatureBatch, SubwordEncoding, WindowPredictions};

/// Предобученный классификатор диакритики.
///
/// # Пример
/// ```ignore
/// let mut model = BertCnnModel::load("resources/ro/models/diacritice/base", &device)?;
/// let preds = model.predict(&batch)?;
/// let classes = preds.valid_classes()?;
/// ```
pub trait DiacriticsModel: Send {
    /// Имя загруженной модели (например, "diacritice-base").
    fn name(&self) -> &str;

    /// Прогнать один батч признаков.
    ///
    /// Возвращает вероятности классов `[max_windows, num_classes]` и
    /// признак валидности окна `[max_windows]`.
    ///
    /// `&mut self`: в один момент времени выполняется не больше одного инференса.
    fn predict(&mut self, batch: &FeatureBatch) -> DiacResult<WindowPredictions>;
}

/// Subword-токенайзер, который кормит BERT-ветку модели.
pub trait SubwordTokenizer: Send + Sync {
    /// Закодировать предложение вместе со спец-токенами.
    ///
    /// Смещения в [`SubwordEncoding::offsets`] считаются в символах, а не в байтах.
    fn encode(&self, text: &str) -> DiacResult<SubwordEncoding>;

    /// Id паддинга.
    fn pad_id(&self) -> u32 {
        0
    }
}

impl<T: DiacriticsModel + ?Sized> DiacriticsModel for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict(&mut self, batch: &FeatureBatch) -> DiacResult<WindowPredictions> {
        (**self).predict(batch)
    }
}
