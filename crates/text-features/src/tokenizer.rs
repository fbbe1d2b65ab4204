//! Адаптер HF `tokenizers` к [`SubwordTokenizer`].

use std::path::Path;

use diac_core::{DiacError, DiacResult, SubwordEncoding, SubwordTokenizer};
use tracing::debug;

/// Subword-токенайзер BERT-ветки модели (`tokenizer.json`).
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    pad_id: u32,
}

impl HfTokenizer {
    /// Загрузить токенайзер из `tokenizer.json`.
    pub fn from_file(path: impl AsRef<Path>) -> DiacResult<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            DiacError::Tokenizer(format!("Cannot load tokenizer {}: {e}", path.display()))
        })?;
        Ok(Self::from_tokenizer(inner))
    }

    /// Обернуть уже загруженный токенайзер.
    pub fn from_tokenizer(inner: tokenizers::Tokenizer) -> Self {
        let pad_id = inner
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| inner.token_to_id("[PAD]"))
            .unwrap_or(0);
        debug!(
            "Токенайзер: словарь {} токенов, pad_id={}",
            inner.get_vocab_size(true),
            pad_id
        );
        Self { inner, pad_id }
    }
}

impl SubwordTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> DiacResult<SubwordEncoding> {
        let encoding = self
            .inner
            .encode_char_offsets(text, true)
            .map_err(|e| DiacError::Tokenizer(format!("Cannot encode {text:?}: {e}")))?;
        Ok(SubwordEncoding {
            ids: encoding.get_ids().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
            special: encoding
                .get_special_tokens_mask()
                .iter()
                .map(|&m| m == 1)
                .collect(),
        })
    }

    fn pad_id(&self) -> u32 {
        self.pad_id
    }
}
