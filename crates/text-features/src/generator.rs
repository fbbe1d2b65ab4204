//! Генератор батчей признаков.
//!
//! На каждую диакритическую позицию очищенного текста приходится ровно одно
//! окно во всей последовательности батчей. Если окна или слоты предложений
//! заканчиваются, предложение переносится в следующий батч (и кодируется
//! там заново), поэтому ничего не теряется.

use std::ops::Range;
use std::sync::Arc;

use diac_core::char_dict::is_eligible;
use diac_core::{
    CharDict, DiacResult, FeatureBatch, FeatureLimits, SubwordEncoding, SubwordTokenizer,
};
use tracing::debug;

use crate::segment::split_sentences;

/// Генератор батчей признаков для модели.
#[derive(Clone)]
pub struct FeatureGenerator {
    tokenizer: Arc<dyn SubwordTokenizer>,
    char_dict: Arc<CharDict>,
    limits: FeatureLimits,
}

impl FeatureGenerator {
    /// Создать генератор.
    pub fn new(
        tokenizer: Arc<dyn SubwordTokenizer>,
        char_dict: Arc<CharDict>,
        limits: FeatureLimits,
    ) -> DiacResult<Self> {
        limits.validate()?;
        Ok(Self {
            tokenizer,
            char_dict,
            limits,
        })
    }

    /// Ограничения формы батча.
    pub fn limits(&self) -> &FeatureLimits {
        &self.limits
    }

    /// Символьный словарь.
    pub fn char_dict(&self) -> &CharDict {
        &self.char_dict
    }

    /// Ленивая последовательность батчей для очищенного текста.
    ///
    /// Каждый вызов строит новую последовательность с начала.
    pub fn batches(&self, text: &str) -> FeatureBatches<'_> {
        let chars: Vec<char> = text.chars().collect();
        let sentences = split_sentences(&chars, self.limits.max_sentence_length);
        debug!(
            "Признаки: {} символов, {} предложений",
            chars.len(),
            sentences.len()
        );
        FeatureBatches {
            generator: self,
            chars,
            sentences,
            next_sentence: 0,
            pending: None,
            done: false,
        }
    }

    /// Id символов окна шириной `window_size` с центром в `pos`.
    fn char_window(&self, chars: &[char], pos: usize) -> Vec<u32> {
        let half = self.limits.half_window();
        (0..self.limits.window_size)
            .map(|k| {
                (pos + k)
                    .checked_sub(half)
                    .and_then(|i| chars.get(i))
                    .map_or(CharDict::PAD_ID, |&c| self.char_dict.id_or_pad(c))
            })
            .collect()
    }

    fn encode_sentence(&self, chars: &[char], range: Range<usize>) -> DiacResult<PendingSentence> {
        let text: String = chars[range.clone()].iter().collect();
        let mut encoding = self.tokenizer.encode(&text)?;
        encoding.truncate(self.limits.bert_max_seq_len);
        let char_to_token = map_chars_to_tokens(&encoding, range.len());
        let positions = range.clone().filter(|&i| is_eligible(chars[i])).collect();
        Ok(PendingSentence {
            range,
            encoding,
            char_to_token,
            positions,
            next: 0,
        })
    }
}

/// Для каждого символа предложения: позиция токена, который его покрывает.
///
/// Символ без токена (пробел, отброшенный нормализатором, обрезанный хвост)
/// получает ближайший предыдущий токен, а в начале позицию 0.
fn map_chars_to_tokens(encoding: &SubwordEncoding, len: usize) -> Vec<u32> {
    let mut covered: Vec<Option<u32>> = vec![None; len];
    for (t, &(start, end)) in encoding.offsets.iter().enumerate() {
        if encoding.special.get(t).copied().unwrap_or(false) {
            continue;
        }
        for slot in covered.iter_mut().take(end.min(len)).skip(start) {
            slot.get_or_insert(t as u32);
        }
    }
    let mut last = 0;
    covered
        .into_iter()
        .map(|t| {
            if let Some(t) = t {
                last = t;
            }
            last
        })
        .collect()
}

/// Предложение, окна которого ещё не все выданы.
struct PendingSentence {
    range: Range<usize>,
    encoding: SubwordEncoding,
    char_to_token: Vec<u32>,
    /// Абсолютные индексы диакритических позиций.
    positions: Vec<usize>,
    next: usize,
}

impl PendingSentence {
    fn is_exhausted(&self) -> bool {
        self.next >= self.positions.len()
    }
}

/// Ленивая последовательность батчей, см. [`FeatureGenerator::batches`].
pub struct FeatureBatches<'a> {
    generator: &'a FeatureGenerator,
    chars: Vec<char>,
    sentences: Vec<Range<usize>>,
    next_sentence: usize,
    pending: Option<PendingSentence>,
    done: bool,
}

impl FeatureBatches<'_> {
    fn next_pending(&mut self) -> DiacResult<Option<PendingSentence>> {
        if let Some(pending) = self.pending.take() {
            // Перенесённое предложение кодируется заново в новом батче.
            return Ok(Some(pending));
        }
        while let Some(range) = self.sentences.get(self.next_sentence).cloned() {
            self.next_sentence += 1;
            if !range.clone().any(|i| is_eligible(self.chars[i])) {
                continue;
            }
            return self
                .generator
                .encode_sentence(&self.chars, range)
                .map(Some);
        }
        Ok(None)
    }

    fn fill_batch(&mut self) -> DiacResult<FeatureBatch> {
        let limits = self.generator.limits();
        let mut batch = FeatureBatch::empty(limits, self.generator.tokenizer.pad_id());
        while !batch.windows_full() && !batch.sentences_full() {
            let Some(mut sentence) = self.next_pending()? else {
                break;
            };
            let slot = batch.push_sentence(&sentence.encoding)?;
            while !sentence.is_exhausted() && !batch.windows_full() {
                let pos = sentence.positions[sentence.next];
                let token = sentence.char_to_token[pos - sentence.range.start];
                let window = self.generator.char_window(&self.chars, pos);
                batch.push_window(token, slot, &window)?;
                sentence.next += 1;
            }
            if !sentence.is_exhausted() {
                self.pending = Some(sentence);
                break;
            }
        }
        Ok(batch)
    }
}

impl Iterator for FeatureBatches<'_> {
    type Item = DiacResult<FeatureBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fill_batch() {
            Ok(batch) if batch.is_empty() => {
                self.done = true;
                None
            }
            Ok(batch) => Some(Ok(batch)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
