//! Общие типы конвейера восстановления диакритики.
//!
//! Содержит режимы восстановления, проблемные участки текста,
//! батчи признаков фиксированной формы и выход модели.

use std::fmt;
use std::str::FromStr;

use candle_core::{DType, Device, Tensor, D};
use serde::{Deserialize, Serialize};

use crate::config::FeatureLimits;
use crate::{DiacError, DiacResult};

// ---------------------------------------------------------------------------
// Режим восстановления
// ---------------------------------------------------------------------------

/// Режим восстановления диакритики.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    /// Заменить все диакритические позиции предсказаниями модели.
    #[default]
    ReplaceAll,
    /// Заменить только буквы без знака; существующие знаки сохраняются.
    ReplaceMissing,
}

impl RestoreMode {
    /// Строковый идентификатор.
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreMode::ReplaceAll => "replace_all",
            RestoreMode::ReplaceMissing => "replace_missing",
        }
    }
}

impl FromStr for RestoreMode {
    type Err = DiacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace_all" => Ok(RestoreMode::ReplaceAll),
            "replace_missing" => Ok(RestoreMode::ReplaceMissing),
            other => Err(DiacError::Config(format!(
                "Unknown restore mode {other:?} (expected replace_all or replace_missing)"
            ))),
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Проблемный участок
// ---------------------------------------------------------------------------

/// Участок исходного текста, исключённый из обработки моделью.
///
/// Смещения в символах (code points), `end` не включается.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProblematicSpan {
    /// Начало участка.
    pub start: usize,
    /// Конец участка (не включается).
    pub end: usize,
}

impl ProblematicSpan {
    /// Создать участок.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Длина участка в символах.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Пуст ли участок.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

// ---------------------------------------------------------------------------
// Результат токенизации
// ---------------------------------------------------------------------------

/// Результат subword-токенизации одного предложения.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubwordEncoding {
    /// Id токенов (включая спец-токены).
    pub ids: Vec<u32>,
    /// Id сегментов.
    pub type_ids: Vec<u32>,
    /// Смещения токенов в символах исходной строки.
    pub offsets: Vec<(usize, usize)>,
    /// `true` для спец-токенов (`[CLS]`, `[SEP]`, ...).
    pub special: Vec<bool>,
}

impl SubwordEncoding {
    /// Количество токенов.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Пуста ли последовательность.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Обрезать последовательность до `max_len` токенов.
    pub fn truncate(&mut self, max_len: usize) {
        self.ids.truncate(max_len);
        self.type_ids.truncate(max_len);
        self.offsets.truncate(max_len);
        self.special.truncate(max_len);
    }
}

// ---------------------------------------------------------------------------
// Батч признаков
// ---------------------------------------------------------------------------

/// Батч признаков фиксированной формы для одного вызова модели.
///
/// Все буферы плоские, в row-major порядке; формы задаются [`FeatureLimits`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    /// `[max_sentences, bert_max_seq_len]` id subword-токенов.
    pub bert_input_ids: Vec<u32>,
    /// `[max_sentences, bert_max_seq_len]` id сегментов.
    pub bert_segment_ids: Vec<u32>,
    /// `[max_sentences, bert_max_seq_len]` маска внимания BERT.
    pub bert_attention_mask: Vec<u32>,
    /// `[max_windows]` позиция токена, которому принадлежит окно.
    pub token_ids: Vec<u32>,
    /// `[max_windows]` слот предложения, которому принадлежит окно.
    pub sent_ids: Vec<u32>,
    /// `[max_windows]` 1.0 для настоящего окна, 0.0 для паддинга.
    pub mask: Vec<f32>,
    /// `[max_windows, window_size]` id символов окна.
    pub char_windows: Vec<u32>,
    /// Количество заполненных окон.
    pub num_windows: usize,
    /// Количество заполненных слотов предложений.
    pub num_sentences: usize,
    max_sentences: usize,
    seq_len: usize,
    max_windows: usize,
    window_size: usize,
}

impl FeatureBatch {
    /// Пустой батч, заполненный паддингом.
    pub fn empty(limits: &FeatureLimits, pad_token_id: u32) -> Self {
        let bert_len = limits.max_sentences * limits.bert_max_seq_len;
        Self {
            bert_input_ids: vec![pad_token_id; bert_len],
            bert_segment_ids: vec![0; bert_len],
            bert_attention_mask: vec![0; bert_len],
            token_ids: vec![0; limits.max_windows],
            sent_ids: vec![0; limits.max_windows],
            mask: vec![0.0; limits.max_windows],
            char_windows: vec![0; limits.max_windows * limits.window_size],
            num_windows: 0,
            num_sentences: 0,
            max_sentences: limits.max_sentences,
            seq_len: limits.bert_max_seq_len,
            max_windows: limits.max_windows,
            window_size: limits.window_size,
        }
    }

    /// Батч без окон.
    pub fn is_empty(&self) -> bool {
        self.num_windows == 0
    }

    /// Все слоты окон заняты.
    pub fn windows_full(&self) -> bool {
        self.num_windows >= self.max_windows
    }

    /// Все слоты предложений заняты.
    pub fn sentences_full(&self) -> bool {
        self.num_sentences >= self.max_sentences
    }

    /// Ёмкость батча по окнам.
    pub fn max_windows(&self) -> usize {
        self.max_windows
    }

    /// Ширина символьного окна.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Длина BERT-последовательности.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Ёмкость батча по предложениям.
    pub fn max_sentences(&self) -> usize {
        self.max_sentences
    }

    /// Поместить закодированное предложение в следующий слот.
    ///
    /// Последовательность длиннее `bert_max_seq_len` обрезается.
    pub fn push_sentence(&mut self, encoding: &SubwordEncoding) -> DiacResult<u32> {
        if self.sentences_full() {
            return Err(DiacError::Inference(format!(
                "batch already holds {} sentences",
                self.max_sentences
            )));
        }
        let slot = self.num_sentences;
        let row = slot * self.seq_len;
        let n = encoding.len().min(self.seq_len);
        self.bert_input_ids[row..row + n].copy_from_slice(&encoding.ids[..n]);
        for (i, &t) in encoding.type_ids.iter().take(n).enumerate() {
            self.bert_segment_ids[row + i] = t;
        }
        self.bert_attention_mask[row..row + n].fill(1);
        self.num_sentences += 1;
        Ok(slot as u32)
    }

    /// Добавить окно одной диакритической позиции.
    pub fn push_window(&mut self, token_id: u32, sent_id: u32, window: &[u32]) -> DiacResult<()> {
        if self.windows_full() {
            return Err(DiacError::Inference(format!(
                "batch already holds {} windows",
                self.max_windows
            )));
        }
        if window.len() != self.window_size {
            return Err(DiacError::Inference(format!(
                "window has {} chars, expected {}",
                window.len(),
                self.window_size
            )));
        }
        let w = self.num_windows;
        self.token_ids[w] = token_id;
        self.sent_ids[w] = sent_id;
        self.mask[w] = 1.0;
        self.char_windows[w * self.window_size..(w + 1) * self.window_size].copy_from_slice(window);
        self.num_windows += 1;
        Ok(())
    }

    /// Символьное окно по индексу.
    pub fn window(&self, index: usize) -> &[u32] {
        &self.char_windows[index * self.window_size..(index + 1) * self.window_size]
    }

    /// Преобразовать батч в тензоры на заданном устройстве.
    pub fn to_tensors(&self, device: &Device) -> candle_core::Result<FeatureTensors> {
        let bert_shape = (self.max_sentences, self.seq_len);
        Ok(FeatureTensors {
            bert_input_ids: Tensor::from_slice(&self.bert_input_ids, bert_shape, device)?,
            bert_segment_ids: Tensor::from_slice(&self.bert_segment_ids, bert_shape, device)?,
            bert_attention_mask: Tensor::from_slice(&self.bert_attention_mask, bert_shape, device)?,
            token_ids: Tensor::from_slice(&self.token_ids, self.max_windows, device)?,
            sent_ids: Tensor::from_slice(&self.sent_ids, self.max_windows, device)?,
            mask: Tensor::from_slice(&self.mask, self.max_windows, device)?,
            char_windows: Tensor::from_slice(
                &self.char_windows,
                (self.max_windows, self.window_size),
                device,
            )?,
        })
    }
}

/// Тензорное представление [`FeatureBatch`].
#[derive(Debug, Clone)]
pub struct FeatureTensors {
    /// `[S, L]` u32.
    pub bert_input_ids: Tensor,
    /// `[S, L]` u32.
    pub bert_segment_ids: Tensor,
    /// `[S, L]` u32.
    pub bert_attention_mask: Tensor,
    /// `[W]` u32.
    pub token_ids: Tensor,
    /// `[W]` u32.
    pub sent_ids: Tensor,
    /// `[W]` f32.
    pub mask: Tensor,
    /// `[W, K]` u32.
    pub char_windows: Tensor,
}

// ---------------------------------------------------------------------------
// Выход модели
// ---------------------------------------------------------------------------

/// Двойной выход модели на один батч.
#[derive(Debug, Clone)]
pub struct WindowPredictions {
    /// `[max_windows, num_classes]` вероятности (или логиты) классов.
    pub class_scores: Tensor,
    /// `[max_windows]` признак настоящего окна (1.0) или паддинга (0.0).
    pub valid: Tensor,
}

impl WindowPredictions {
    /// Argmax классов только для окон, помеченных как настоящие, в исходном порядке.
    pub fn valid_classes(&self) -> candle_core::Result<Vec<u32>> {
        let classes: Vec<u32> = self.class_scores.argmax(D::Minus1)?.to_vec1()?;
        let valid: Vec<f32> = self.valid.to_dtype(DType::F32)?.to_vec1()?;
        Ok(classes
            .into_iter()
            .zip(valid)
            .filter(|(_, v)| *v > 0.5)
            .map(|(c, _)| c)
            .collect())
    }
}
