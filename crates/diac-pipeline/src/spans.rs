//! Проблемные участки: слова длиннее самого длинного слова языка.
//!
//! Такие участки (URL, хэши, склеенный мусор) вырезаются до обработки
//! моделью и возвращаются на те же абсолютные позиции после неё.
//! Все смещения в символах.

use diac_core::ProblematicSpan;

/// Найти слова (разделённые пробельными символами) длиннее `max_word_len`.
///
/// Участки не пересекаются и отсортированы по началу.
pub fn find_problematic_spans(text: &str, max_word_len: usize) -> Vec<ProblematicSpan> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        if i - start > max_word_len {
            spans.push(ProblematicSpan::new(start, i));
        }
    }
    spans
}

/// Текст без проблемных участков.
pub fn excise_spans(text: &str, spans: &[ProblematicSpan]) -> String {
    let mut spans = spans.iter().peekable();
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        while spans.next_if(|s| s.end <= i).is_some() {}
        match spans.peek() {
            Some(s) if s.start <= i => {}
            _ => out.push(c),
        }
    }
    out
}

/// Вернуть вырезанные участки `original` в обработанный текст.
///
/// Участки вставляются по возрастанию начала, поэтому каждый оказывается
/// на своей исходной позиции.
pub fn reinsert_spans(processed: &str, original: &str, spans: &[ProblematicSpan]) -> String {
    if spans.is_empty() {
        return processed.to_string();
    }
    let original: Vec<char> = original.chars().collect();
    let mut result: Vec<char> = processed.chars().collect();
    for span in spans {
        let at = span.start.min(result.len());
        let end = span.end.min(original.len());
        let start = span.start.min(end);
        result.splice(at..at, original[start..end].iter().copied());
    }
    result.into_iter().collect()
}
