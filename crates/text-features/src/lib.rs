//! # text-features
//!
//! Превращает очищенный текст в батчи признаков фиксированной формы:
//!
//! - [`split_sentences`]: разбиение на предложения
//! - [`FeatureGenerator`]: ленивая последовательность [`FeatureBatch`]
//!   (по одному окну на каждую диакритическую позицию)
//! - [`HfTokenizer`]: адаптер HF `tokenizers` к [`SubwordTokenizer`]
//!
//! [`FeatureBatch`]: diac_core::FeatureBatch
//! [`SubwordTokenizer`]: diac_core::SubwordTokenizer

mod generator;
mod segment;
mod tokenizer;

pub use generator::{FeatureBatches, FeatureGenerator};
pub use segment::{is_sentence_terminator, split_sentences};
pub use tokenizer::HfTokenizer;
