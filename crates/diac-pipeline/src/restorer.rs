//! Восстановитель диакритики: единая точка входа.
//!
//! `DiacriticsRestorer` владеет моделью, токенайзером и символьным
//! словарём, загруженными один раз при создании. Один вызов
//! [`DiacriticsRestorer::restore`] синхронный и блокирующий; `&mut self`
//! гарантирует, что инференс идёт не больше чем в одном вызове сразу.

use std::sync::Arc;
use std::time::Instant;

use candle_core::Device;
use tracing::{debug, info, warn};

use diac_core::model_files::{self, CHAR_DICT_FILE};
use diac_core::{
    CharDict, DiacError, DiacResult, DiacriticsModel, FeatureLimits, RestoreMode, RestorerConfig,
    SubwordTokenizer,
};
use model_bertcnn::BertCnnModel;
use model_hub::ModelHub;
use text_features::{FeatureGenerator, HfTokenizer};

use crate::spans::{excise_spans, find_problematic_spans, reinsert_spans};
use crate::text::{clean_chunk, reassemble};

/// Восстановитель румынской диакритики.
pub struct DiacriticsRestorer {
    /// Классификатор диакритики.
    model: Box<dyn DiacriticsModel>,
    /// Генератор батчей признаков (токенайзер + словарь).
    features: FeatureGenerator,
    /// Слова длиннее этого значения не отдаются модели.
    max_word_len: usize,
    /// Логировать прогресс по чанкам на уровне `info`.
    verbose: bool,
}

impl DiacriticsRestorer {
    /// Базовая модель из `resources/` с проверкой обновлений, на CPU.
    pub fn new(verbose: bool) -> DiacResult<Self> {
        Self::from_config(&RestorerConfig::default(), &Device::Cpu, verbose)
    }

    /// Загрузить восстановитель по конфигурации.
    ///
    /// При `check_updates` модель сначала сверяется с реестром и при
    /// необходимости скачивается. Если после этого каких-то файлов модели
    /// нет, возвращается ошибка: частично загруженный восстановитель
    /// не создаётся.
    pub fn from_config(config: &RestorerConfig, device: &Device, verbose: bool) -> DiacResult<Self> {
        config.limits.validate()?;

        let model_dir = if config.check_updates {
            ModelHub::new(&config.resources_root)?.ensure_model(config.lang, config.model_path.as_slice())?
        } else {
            config.model_dir()
        };
        info!("DiacriticsRestorer: модель {:?}", model_dir);

        let mut missing = model_files::missing_artifacts(&model_dir);
        let tokenizer_file = config.tokenizer_file();
        if !tokenizer_file.is_file() {
            missing.push(model_files::TOKENIZER_FILE);
        }
        if !missing.is_empty() {
            return Err(DiacError::Model(format!(
                "Model in {:?} is incomplete, missing: {}",
                model_dir,
                missing.join(", ")
            )));
        }

        let char_dict = CharDict::from_file(model_dir.join(CHAR_DICT_FILE))?;
        let tokenizer = HfTokenizer::from_file(&tokenizer_file)?;
        let model = BertCnnModel::load(&model_dir, device)?;

        Self::from_parts(
            Box::new(model),
            Arc::new(tokenizer),
            Arc::new(char_dict),
            config,
            verbose,
        )
    }

    /// Собрать восстановитель из уже загруженных частей.
    pub fn from_parts(
        model: Box<dyn DiacriticsModel>,
        tokenizer: Arc<dyn SubwordTokenizer>,
        char_dict: Arc<CharDict>,
        config: &RestorerConfig,
        verbose: bool,
    ) -> DiacResult<Self> {
        let features = FeatureGenerator::new(tokenizer, char_dict, config.limits.clone())?;
        info!(
            "DiacriticsRestorer: модель '{}', словарь {} символов",
            model.name(),
            features.char_dict().len()
        );
        Ok(Self {
            model,
            features,
            max_word_len: config.max_word_len,
            verbose: verbose || diac_core::debug::enabled(),
        })
    }

    /// Имя загруженной модели.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Ограничения формы входа модели.
    pub fn limits(&self) -> &FeatureLimits {
        self.features.limits()
    }

    /// Восстановить диакритику в тексте.
    ///
    /// Длина результата в символах равна длине входа. Слова длиннее
    /// `max_word_len` возвращаются без изменений на свои места.
    pub fn restore(&mut self, text: &str, mode: RestoreMode) -> DiacResult<String> {
        let start = Instant::now();
        let spans = find_problematic_spans(text, self.max_word_len);
        if !spans.is_empty() {
            debug!("Проблемных участков: {}", spans.len());
        }

        let remaining = excise_spans(text, &spans);
        let processed = self.process_text(&remaining, mode)?;
        let result = reinsert_spans(&processed, text, &spans);

        debug!(
            "Восстановлено {} символов за {:.3}с",
            result.chars().count(),
            start.elapsed().as_secs_f64()
        );
        Ok(result)
    }

    /// Обработать текст без проблемных участков, чанками по
    /// `max_sentence_length` символов.
    pub fn process_text(&mut self, text: &str, mode: RestoreMode) -> DiacResult<String> {
        let chars: Vec<char> = text.chars().collect();
        let chunk_len = self.features.limits().max_sentence_length;
        let total = chars.len().div_ceil(chunk_len);

        let mut out = String::with_capacity(text.len());
        for (idx, chunk) in chars.chunks(chunk_len).enumerate() {
            let chunk: String = chunk.iter().collect();
            if self.verbose {
                info!("Чанк {}/{} ({} символов)", idx + 1, total, chunk.chars().count());
            } else {
                debug!("Чанк {}/{} ({} символов)", idx + 1, total, chunk.chars().count());
            }
            out.push_str(&self.process_chunk(&chunk, mode)?);
        }
        Ok(out)
    }

    fn process_chunk(&mut self, chunk: &str, mode: RestoreMode) -> DiacResult<String> {
        let cleaned = clean_chunk(chunk, self.features.char_dict());
        if cleaned.eligible == 0 {
            return Ok(chunk.to_string());
        }
        debug!(
            "Диакритических позиций: {}, ожидается батчей: {}",
            cleaned.eligible,
            self.features.limits().estimated_steps(cleaned.eligible)
        );

        let mut classes = Vec::with_capacity(cleaned.eligible);
        for batch in self.features.batches(&cleaned.text) {
            let batch = batch?;
            let predictions = self.model.predict(&batch)?;
            classes.extend(predictions.valid_classes()?);
        }

        let out = reassemble(chunk, &classes, mode, self.features.char_dict());
        if out.unmatched > 0 {
            warn!(
                "Предсказаний меньше, чем позиций: {} из {}; {} символов оставлены как есть",
                classes.len(),
                cleaned.eligible,
                out.unmatched
            );
        } else if out.consumed < classes.len() {
            warn!(
                "Лишние предсказания: {} при {} позициях, хвост проигнорирован",
                classes.len(),
                out.consumed
            );
        }
        Ok(out.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_fails_fast_on_incomplete_model() {
        let root = tempfile::tempdir().unwrap();
        let config = RestorerConfig::default()
            .with_resources_root(root.path())
            .without_update_check();
        let msg = match DiacriticsRestorer::from_config(&config, &Device::Cpu, false) {
            Err(DiacError::Model(msg)) => msg,
            Err(e) => panic!("expected model error, got {e:?}"),
            Ok(_) => panic!("restorer created without model files"),
        };
        assert!(msg.contains("char_dict"));
        assert!(msg.contains("tokenizer.json"));
    }

    #[test]
    fn test_from_config_rejects_bad_limits() {
        let mut config = RestorerConfig::default().without_update_check();
        config.limits.window_size = 10;
        assert!(matches!(
            DiacriticsRestorer::from_config(&config, &Device::Cpu, false),
            Err(DiacError::Config(_))
        ));
    }
}
