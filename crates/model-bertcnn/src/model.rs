//! BertCnnModel: BERT-энкодер предложений + символьная CNN.
//!
//! Реализует [`DiacriticsModel`] trait.
//!
//! Имена весов в safetensors:
//! - `bert.*`: BERT в раскладке HF
//! - `char_cnn.embedding.weight`, `char_cnn.convs.{i}.{weight,bias}`
//! - `dense.{weight,bias}`, `classifier.{weight,bias}`

use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::BertModel;
use tracing::{debug, info};

use diac_core::model_files::{self, CONFIG_FILE};
use diac_core::{DiacError, DiacResult, DiacriticsModel, FeatureBatch, WindowPredictions};

use crate::char_cnn::CharCnn;
use crate::config::BertCnnConfig;

/// Классификатор диакритики BERT-CNN.
pub struct BertCnnModel {
    /// BERT-энкодер предложений.
    bert: BertModel,
    /// CNN над символьными окнами.
    char_cnn: CharCnn,
    /// Dense-слой над склеенными признаками.
    dense: Linear,
    /// Проекция на классы диакритики.
    classifier: Linear,
    /// Устройство (CPU, Metal, CUDA).
    device: Device,
    /// Конфигурация модели.
    config: BertCnnConfig,
}

impl BertCnnModel {
    /// Загрузить модель из директории.
    ///
    /// Ожидаемые файлы:
    /// - `config.json`: конфигурация
    /// - `model.safetensors` (или шарды + index.json): веса
    pub fn load(model_dir: impl AsRef<Path>, device: &Device) -> DiacResult<Self> {
        let model_dir = model_dir.as_ref();
        info!("BERT-CNN: загрузка модели из {:?}", model_dir);

        let config_path = model_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(DiacError::Model(format!(
                "Файл {CONFIG_FILE} не найден в {:?}",
                model_dir
            )));
        }
        let config = BertCnnConfig::from_file(&config_path)?;
        info!(
            "BERT-CNN: {} (hidden={}, {} ядер CNN, окно {})",
            config.model_name,
            config.bert.hidden_size,
            config.conv_kernel_sizes.len(),
            config.window_size,
        );

        let start = Instant::now();
        let files = model_files::resolve_safetensors_files(model_dir)?;

        // BF16 только на CUDA: conv1d на Metal/CPU считаем в F32.
        let dtype = if device.is_cuda() { DType::BF16 } else { DType::F32 };
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&files, dtype, device)? };

        let model = Self::from_var_builder(config, vb, device)?;
        info!(
            "BERT-CNN: модель загружена за {:.2}с",
            start.elapsed().as_secs_f64()
        );
        Ok(model)
    }

    /// Собрать модель поверх готового `VarBuilder`.
    pub fn from_var_builder(config: BertCnnConfig, vb: VarBuilder, device: &Device) -> DiacResult<Self> {
        config.validate()?;
        let bert = BertModel::load(vb.pp("bert"), &config.bert.to_candle()?)?;
        debug!("BERT-CNN: BERT загружен");

        let char_cnn = CharCnn::load(&config, vb.pp("char_cnn"))?;
        debug!("BERT-CNN: CNN загружена");

        let features = config.bert.hidden_size + config.char_features_dim();
        let dense = candle_nn::linear(features, config.hidden_dim, vb.pp("dense"))?;
        let classifier = candle_nn::linear(config.hidden_dim, config.num_classes, vb.pp("classifier"))?;

        Ok(Self {
            bert,
            char_cnn,
            dense,
            classifier,
            device: device.clone(),
            config,
        })
    }

    /// Конфигурация модели.
    pub fn config(&self) -> &BertCnnConfig {
        &self.config
    }

    fn check_batch(&self, batch: &FeatureBatch) -> DiacResult<()> {
        if batch.window_size() != self.config.window_size {
            return Err(DiacError::Inference(format!(
                "batch windows have {} chars, model expects {}",
                batch.window_size(),
                self.config.window_size
            )));
        }
        Ok(())
    }

    /// Прямой проход: вероятности классов `[max_windows, num_classes]`.
    fn forward(&self, batch: &FeatureBatch) -> candle_core::Result<Tensor> {
        let t = batch.to_tensors(&self.device)?;
        let seq_len = batch.seq_len();

        // 1. BERT: (S, L) → (S, L, H) → (S * L, H)
        let hidden = self.bert.forward(
            &t.bert_input_ids,
            &t.bert_segment_ids,
            Some(&t.bert_attention_mask),
        )?;
        let (s, l, h) = hidden.dims3()?;
        let hidden = hidden.reshape((s * l, h))?;

        // 2. Скрытое состояние токена для каждого окна: sent_id * L + token_id.
        let flat: Vec<u32> = batch
            .sent_ids
            .iter()
            .zip(&batch.token_ids)
            .map(|(&sent, &tok)| sent * seq_len as u32 + tok)
            .collect();
        let index = Tensor::from_vec(flat, batch.max_windows(), &self.device)?;
        let token_features = hidden.index_select(&index, 0)?;

        // 3. Символьные окна → CNN.
        let char_features = self.char_cnn.forward(&t.char_windows)?;

        // 4. concat → dense → ReLU → classifier → softmax.
        let features = Tensor::cat(&[token_features, char_features.to_dtype(hidden.dtype())?], 1)?;
        let hidden = self.dense.forward(&features)?.relu()?;
        let logits = self.classifier.forward(&hidden)?;
        candle_nn::ops::softmax(&logits.to_dtype(DType::F32)?, D::Minus1)
    }
}

impl DiacriticsModel for BertCnnModel {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    fn predict(&mut self, batch: &FeatureBatch) -> DiacResult<WindowPredictions> {
        self.check_batch(batch)?;
        let start = Instant::now();
        let class_scores = self.forward(batch)?;
        let valid = Tensor::from_slice(&batch.mask, batch.max_windows(), &self.device)?;
        debug!(
            "BERT-CNN: {} окон, {} предложений за {:.3}с",
            batch.num_windows,
            batch.num_sentences,
            start.elapsed().as_secs_f64()
        );
        Ok(WindowPredictions {
            class_scores,
            valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::TINY_CONFIG;
    use candle_nn::VarMap;
    use diac_core::{FeatureLimits, SubwordEncoding};

    fn tiny_limits() -> FeatureLimits {
        FeatureLimits {
            bert_max_seq_len: 8,
            max_windows: 4,
            max_sentences: 2,
            max_sentence_length: 16,
            window_size: 5,
            num_classes: 5,
        }
    }

    fn tiny_model() -> BertCnnModel {
        let cfg = BertCnnConfig::from_json_str(TINY_CONFIG).unwrap();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        BertCnnModel::from_var_builder(cfg, vb, &Device::Cpu).unwrap()
    }

    fn sample_batch(limits: &FeatureLimits) -> FeatureBatch {
        let mut batch = FeatureBatch::empty(limits, 0);
        let enc = SubwordEncoding {
            ids: vec![1, 5, 6, 2],
            type_ids: vec![0; 4],
            offsets: vec![(0, 0), (0, 3), (4, 7), (0, 0)],
            special: vec![true, false, false, true],
        };
        let slot = batch.push_sentence(&enc).unwrap();
        batch.push_window(1, slot, &[0, 0, 1, 2, 1]).unwrap();
        batch.push_window(2, slot, &[2, 1, 3, 4, 5]).unwrap();
        batch
    }

    #[test]
    fn test_predict_shapes_and_validity() {
        let mut model = tiny_model();
        let limits = tiny_limits();
        let preds = model.predict(&sample_batch(&limits)).unwrap();

        assert_eq!(preds.class_scores.dims(), &[4, 5]);
        assert_eq!(preds.valid.to_vec1::<f32>().unwrap(), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(preds.valid_classes().unwrap().len(), 2);

        // Softmax: сумма по классам равна 1.
        let sums: Vec<f32> = preds.class_scores.sum(D::Minus1).unwrap().to_vec1().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-4, "sum = {s}");
        }
    }

    #[test]
    fn test_window_size_mismatch_is_error() {
        let mut model = tiny_model();
        let limits = FeatureLimits {
            window_size: 11,
            ..tiny_limits()
        };
        let batch = FeatureBatch::empty(&limits, 0);
        assert!(matches!(model.predict(&batch), Err(DiacError::Inference(_))));
    }

    #[test]
    fn test_load_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BertCnnModel::load(dir.path(), &Device::Cpu),
            Err(DiacError::Model(_))
        ));
    }
}
