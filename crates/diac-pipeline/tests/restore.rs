//! Integration tests for the diacritics restorer with stub model and tokenizer.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use candle_core::{Device, Tensor};
use diac_core::{
    CharDict, DiacResult, DiacriticClass, DiacriticsModel, FeatureBatch, RestoreMode,
    RestorerConfig, SubwordEncoding, SubwordTokenizer, WindowPredictions,
};
use diac_pipeline::DiacriticsRestorer;

/// Токенайзер "по словам" со спец-токенами [CLS]=1 и [SEP]=2.
struct WordTokenizer;

impl SubwordTokenizer for WordTokenizer {
    fn encode(&self, text: &str) -> DiacResult<SubwordEncoding> {
        let mut enc = SubwordEncoding::default();
        let mut push = |id: u32, off: (usize, usize), special: bool| {
            enc.ids.push(id);
            enc.type_ids.push(0);
            enc.offsets.push(off);
            enc.special.push(special);
        };
        push(1, (0, 0), true);
        let chars: Vec<char> = text.chars().collect();
        let mut start = None;
        for i in 0..=chars.len() {
            let boundary = i == chars.len() || chars[i].is_whitespace();
            match (start, boundary) {
                (None, false) => start = Some(i),
                (Some(s), true) => {
                    push(10 + (i - s) as u32, (s, i), false);
                    start = None;
                }
                _ => {}
            }
        }
        push(2, (0, 0), true);
        Ok(enc)
    }
}

/// Как выбирать класс для окна.
enum Rule {
    /// Один и тот же класс для всех окон.
    Constant(DiacriticClass),
    /// Классы по очереди, затем `Plain`.
    Script(VecDeque<u32>),
    /// Класс по символу справа от центра окна.
    NextChar(CharDict),
    /// Модель не помечает ни одно окно валидным.
    Silent,
}

struct StubModel {
    rule: Rule,
}

impl StubModel {
    fn boxed(rule: Rule) -> Box<Self> {
        Box::new(Self { rule })
    }
}

impl DiacriticsModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    fn predict(&mut self, batch: &FeatureBatch) -> DiacResult<WindowPredictions> {
        let classes = DiacriticClass::COUNT;
        let half = batch.window_size() / 2;
        let mut scores = vec![0f32; batch.max_windows() * classes];
        for w in 0..batch.num_windows {
            let class = match &mut self.rule {
                Rule::Constant(c) => c.index(),
                Rule::Script(queue) => queue.pop_front().unwrap_or(0),
                Rule::NextChar(dict) => {
                    let next = batch.window(w)[half + 1];
                    if next == dict.id_or_pad('r') { 1 } else { 0 }
                }
                Rule::Silent => 0,
            };
            scores[w * classes + class as usize] = 1.0;
        }
        let mask = match self.rule {
            Rule::Silent => vec![0f32; batch.max_windows()],
            _ => batch.mask.clone(),
        };
        Ok(WindowPredictions {
            class_scores: Tensor::from_vec(scores, (batch.max_windows(), classes), &Device::Cpu)?,
            valid: Tensor::from_vec(mask, batch.max_windows(), &Device::Cpu)?,
        })
    }
}

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789 .,;:!?-'\"\n";

fn char_dict() -> Arc<CharDict> {
    Arc::new(CharDict::from_alphabet(ALPHABET).unwrap())
}

fn restorer(rule: Rule) -> DiacriticsRestorer {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    DiacriticsRestorer::from_parts(
        StubModel::boxed(rule),
        Arc::new(WordTokenizer),
        char_dict(),
        &RestorerConfig::default(),
        true,
    )
    .unwrap()
}

#[test]
fn test_text_without_eligible_letters_is_unchanged() {
    let mut r = restorer(Rule::Constant(DiacriticClass::Breve));
    for text in ["", "Bun, ok! 123", "€€€ - ünë"] {
        assert_eq!(r.restore(text, RestoreMode::ReplaceAll).unwrap(), text);
    }
}

#[test]
fn test_replace_all_preserves_case_and_length() {
    let mut r = restorer(Rule::Constant(DiacriticClass::CommaBelow));
    let out = r.restore("Stat", RestoreMode::ReplaceAll).unwrap();
    assert_eq!(out, "Șțaț");

    let text = "Ana ARE mere, iar Tata taie lemne în pădure.";
    let out = r.restore(text, RestoreMode::ReplaceAll).unwrap();
    assert_eq!(out.chars().count(), text.chars().count());
    for (a, b) in text.chars().zip(out.chars()) {
        assert_eq!(a.is_uppercase(), b.is_uppercase(), "{a} vs {b}");
    }
}

#[test]
fn test_replace_all_can_remove_marks() {
    let mut r = restorer(Rule::Constant(DiacriticClass::Plain));
    assert_eq!(r.restore("Țară", RestoreMode::ReplaceAll).unwrap(), "Tara");
}

#[test]
fn test_replace_missing_keeps_existing_marks() {
    let mut r = restorer(Rule::Constant(DiacriticClass::Plain));
    assert_eq!(r.restore("Țară", RestoreMode::ReplaceMissing).unwrap(), "Țară");
}

#[test]
fn test_replace_missing_stream_stays_aligned() {
    // ă потребляет свой класс (0), следующая a получает 1.
    let mut r = restorer(Rule::Script(VecDeque::from([0, 1])));
    assert_eq!(r.restore("ăa", RestoreMode::ReplaceMissing).unwrap(), "ăă");
}

#[test]
fn test_predictions_follow_character_order() {
    let mut r = restorer(Rule::Script(VecDeque::from([4, 1, 0, 3])));
    assert_eq!(r.restore("Sat mi", RestoreMode::ReplaceAll).unwrap(), "Șăt mî");
}

#[test]
fn test_problematic_span_is_reinserted_verbatim() {
    let mut r = restorer(Rule::Constant(DiacriticClass::Breve));
    let long = "a".repeat(50);
    let text = format!("ma {long} ta");
    let out = r.restore(&text, RestoreMode::ReplaceAll).unwrap();
    assert_eq!(out, format!("mă {long} tă"));
}

#[test]
fn test_chunks_are_independent() {
    let dict = (*char_dict()).clone();
    let mut r = restorer(Rule::NextChar(dict));
    let text: String = "ara tara sare ".repeat(43).chars().take(600).collect();
    assert_eq!(text.chars().count(), 600);

    let whole = r.restore(&text, RestoreMode::ReplaceAll).unwrap();
    let chars: Vec<char> = text.chars().collect();
    let mut manual = String::new();
    for piece in chars.chunks(256) {
        let piece: String = piece.iter().collect();
        manual.push_str(&r.restore(&piece, RestoreMode::ReplaceAll).unwrap());
    }
    assert_eq!(whole, manual);
    assert!(whole.contains("tăra"));
}

#[test]
fn test_missing_predictions_pass_through() {
    let mut r = restorer(Rule::Silent);
    let text = "Țara mea";
    assert_eq!(r.restore(text, RestoreMode::ReplaceAll).unwrap(), text);
}

#[test]
fn test_unknown_characters_pass_through() {
    let mut r = restorer(Rule::Constant(DiacriticClass::Breve));
    assert_eq!(
        r.restore("ana€are😀", RestoreMode::ReplaceAll).unwrap(),
        "ănă€ăre😀"
    );
}

#[test]
fn test_long_text_spans_multiple_batches() {
    let mut r = restorer(Rule::Constant(DiacriticClass::CircumflexI));
    // Предложений в чанке больше, чем слотов в одном батче.
    let text = "i. ".repeat(100);
    let out = r.restore(&text, RestoreMode::ReplaceAll).unwrap();
    assert_eq!(out, "î. ".repeat(100));
}

fn get_model_path() -> Option<PathBuf> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("resources");

    if root.join("ro/models/diacritice/base/config.json").exists() {
        Some(root)
    } else {
        None
    }
}

#[test]
fn test_real_model_restores_romanian() {
    let root = match get_model_path() {
        Some(p) => p,
        None => {
            eprintln!("⚠️  Skipping test: model not found");
            return;
        }
    };

    let config = RestorerConfig::default()
        .with_resources_root(root)
        .without_update_check();
    let mut r = DiacriticsRestorer::from_config(&config, &Device::Cpu, true)
        .expect("Failed to create restorer");

    let text = "Si in acest an, tara noastra a castigat multe medalii.";
    let out = r.restore(text, RestoreMode::ReplaceAll).unwrap();
    eprintln!("✅ {out}");
    assert_eq!(out.chars().count(), text.chars().count());
}
