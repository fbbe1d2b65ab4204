//! Разбиение очищенного текста на предложения.

use std::ops::Range;

/// Символ, завершающий предложение.
pub fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// Разбить текст на предложения (диапазоны индексов символов).
///
/// Предложение заканчивается сразу после серии терминаторов (`...`, `?!`)
/// или при достижении `max_len` символов. Диапазоны покрывают весь текст
/// без пропусков и пересечений.
pub fn split_sentences(chars: &[char], max_len: usize) -> Vec<Range<usize>> {
    let max_len = max_len.max(1);
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, &c) in chars.iter().enumerate() {
        let end = i + 1;
        let closes_run = is_sentence_terminator(c)
            && chars.get(end).map_or(true, |&next| !is_sentence_terminator(next));
        if closes_run || end - start >= max_len {
            sentences.push(start..end);
            start = end;
        }
    }
    if start < chars.len() {
        sentences.push(start..chars.len());
    }
    sentences
}
