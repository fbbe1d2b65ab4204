//! Integration tests: HF tokenizer + feature generator.

use std::str::FromStr;
use std::sync::Arc;

use diac_core::char_dict::is_eligible;
use diac_core::{CharDict, DiacResult, FeatureBatch, FeatureLimits, SubwordTokenizer};
use text_features::{FeatureGenerator, HfTokenizer};

const TOKENIZER_JSON: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [
    {"id": 0, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
    {"id": 1, "content": "[CLS]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
    {"id": 2, "content": "[SEP]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
    {"id": 3, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
  ],
  "normalizer": null,
  "pre_tokenizer": {"type": "Whitespace"},
  "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1]},
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {"[PAD]": 0, "[CLS]": 1, "[SEP]": 2, "[UNK]": 3, "ana": 4, "are": 5, "mere": 6, "pe": 7, "masa": 8, ".": 9},
    "unk_token": "[UNK]"
  }
}"#;

fn tokenizer() -> HfTokenizer {
    let inner = tokenizers::Tokenizer::from_str(TOKENIZER_JSON).expect("tokenizer json");
    HfTokenizer::from_tokenizer(inner)
}

fn char_dict() -> Arc<CharDict> {
    Arc::new(CharDict::from_alphabet("abcdefghijklmnopqrstuvwxyz .,!?").unwrap())
}

fn collect(gen: &FeatureGenerator, text: &str) -> Vec<FeatureBatch> {
    gen.batches(text).collect::<DiacResult<Vec<_>>>().unwrap()
}

#[test]
fn test_hf_encoding_uses_char_offsets() {
    let tok = tokenizer();
    let enc = tok.encode("ana are mere.").unwrap();
    assert_eq!(enc.ids, vec![1, 4, 5, 6, 9, 2]);
    assert_eq!(enc.offsets[1..5], [(0, 3), (4, 7), (8, 12), (12, 13)]);
    assert_eq!(enc.special, vec![true, false, false, false, false, true]);
    assert_eq!(tok.pad_id(), 0);
}

#[test]
fn test_unknown_words_map_to_unk() {
    let enc = tokenizer().encode("tata").unwrap();
    assert_eq!(enc.ids, vec![1, 3, 2]);
}

#[test]
fn test_generator_with_hf_tokenizer() {
    let gen = FeatureGenerator::new(Arc::new(tokenizer()), char_dict(), FeatureLimits::default())
        .unwrap();
    let text = "ana are mere. pe masa";
    let batches = collect(&gen, text);
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];

    let eligible = text.chars().filter(|&c| is_eligible(c)).count();
    assert_eq!(batch.num_windows, eligible);
    assert_eq!(batch.num_sentences, 2);

    // Первое предложение: [CLS] ana are mere . [SEP]
    let seq = batch.seq_len();
    assert_eq!(&batch.bert_input_ids[..6], &[1, 4, 5, 6, 9, 2]);
    assert_eq!(&batch.bert_attention_mask[..7], &[1, 1, 1, 1, 1, 1, 0]);
    // Второе предложение " pe masa": [CLS] pe masa [SEP]
    assert_eq!(&batch.bert_input_ids[seq..seq + 4], &[1, 7, 8, 2]);

    // "ana" → a, a; "are" → a; "mere" → нет; "masa" → a, s, a.
    assert_eq!(&batch.token_ids[..eligible], &[1, 1, 2, 2, 2, 2]);
    assert_eq!(&batch.sent_ids[..eligible], &[0, 0, 0, 1, 1, 1]);
    assert!(batch.mask[eligible..].iter().all(|&m| m == 0.0));
}

#[test]
fn test_long_text_spreads_over_batches() {
    let gen = FeatureGenerator::new(Arc::new(tokenizer()), char_dict(), FeatureLimits::default())
        .unwrap();
    let text = "ana are mere. ".repeat(40);
    let eligible = text.chars().filter(|&c| is_eligible(c)).count();
    let batches = collect(&gen, &text);
    let windows: usize = batches.iter().map(|b| b.num_windows).sum();
    assert_eq!(windows, eligible);
    assert!(batches.len() >= 4);
    for batch in &batches {
        assert!(batch.num_sentences <= FeatureLimits::default().max_sentences);
        assert!(batch.num_windows <= FeatureLimits::default().max_windows);
    }
}
