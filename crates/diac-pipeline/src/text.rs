//! Очистка чанка перед моделью и сборка результата после неё.

use diac_core::char_dict::{basic_char, is_eligible, is_explicit_diacritic, lower_char, upper_char};
use diac_core::{CharDict, RestoreMode};

/// Чанк, подготовленный для генератора признаков.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedChunk {
    /// Нижний регистр, только символы словаря, диакритика снята.
    pub text: String,
    /// Количество диакритических позиций в `text`.
    pub eligible: usize,
}

/// Очистить чанк: нижний регистр, выбросить символы вне словаря,
/// привести диакритические буквы к базовой форме.
///
/// Символ остаётся, если его базовая форма есть в словаре. Базовые буквы
/// `a i s t` в словаре обязательны, поэтому диакритические позиции
/// никогда не выбрасываются и их число совпадает с исходным чанком.
pub fn clean_chunk(chunk: &str, dict: &CharDict) -> CleanedChunk {
    let mut text = String::with_capacity(chunk.len());
    let mut eligible = 0;
    for c in chunk.chars() {
        let base = basic_char(lower_char(c));
        if !dict.contains(base) {
            continue;
        }
        if is_eligible(base) {
            eligible += 1;
        }
        text.push(base);
    }
    CleanedChunk { text, eligible }
}

/// Результат сборки чанка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    /// Текст с восстановленной диакритикой; длина равна исходной.
    pub text: String,
    /// Сколько предсказаний использовано.
    pub consumed: usize,
    /// Сколько диакритических позиций осталось без предсказания.
    pub unmatched: usize,
}

/// Наложить предсказанные классы на исходный чанк.
///
/// Проход идёт по исходному чанку, а не по очищенному: символы вне
/// словаря просто переносятся как есть. Каждая диакритическая позиция
/// берёт следующий класс из потока; в `ReplaceMissing` буква со знаком
/// остаётся прежней, но свой класс всё равно потребляет. Регистр сохраняется.
pub fn reassemble(chunk: &str, classes: &[u32], mode: RestoreMode, dict: &CharDict) -> Reassembled {
    let mut text = String::with_capacity(chunk.len() + chunk.len() / 4);
    let mut stream = classes.iter();
    let mut consumed = 0;
    let mut unmatched = 0;

    for c in chunk.chars() {
        let lower = lower_char(c);
        if !is_eligible(lower) {
            text.push(c);
            continue;
        }
        let Some(&class) = stream.next() else {
            unmatched += 1;
            text.push(c);
            continue;
        };
        consumed += 1;

        let restored = match mode {
            RestoreMode::ReplaceMissing if is_explicit_diacritic(lower) => lower,
            _ => dict.resolve(basic_char(lower), class),
        };
        text.push(if c.is_uppercase() { upper_char(restored) } else { restored });
    }

    Reassembled {
        text,
        consumed,
        unmatched,
    }
}
