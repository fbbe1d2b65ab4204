//! Символьный словарь модели и правила румынской диакритики.
//!
//! Словарь (`char_dict`) отображает нормализованный символ (нижний регистр,
//! без диакритики) в целочисленный id для символьных окон CNN. Он загружается
//! один раз и не меняется после загрузки.
//!
//! Формат файла: JSON-объект `{ "a": 1, "b": 2, ... }`. Id `0` зарезервирован
//! под паддинг окон.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::{DiacError, DiacResult};

/// Буквы, для которых модель предсказывает диакритику.
pub const ELIGIBLE_CHARS: [char; 9] = ['a', 'ă', 'â', 'i', 'î', 's', 'ș', 't', 'ț'];

/// Буквы, уже несущие диакритический знак.
pub const EXPLICIT_DIACRITICS: [char; 5] = ['ă', 'â', 'î', 'ș', 'ț'];

/// Базовые буквы, которые обязаны присутствовать в словаре.
const REQUIRED_BASE_CHARS: [char; 4] = ['a', 'i', 's', 't'];

/// Нижний регистр одного символа.
///
/// Если преобразование даёт несколько символов (например, `İ`),
/// символ возвращается без изменений: длина текста должна сохраняться.
pub fn lower_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Верхний регистр одного символа (с той же оговоркой, что и [`lower_char`]).
pub fn upper_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Может ли символ (в любом регистре) получить предсказание модели.
pub fn is_eligible(c: char) -> bool {
    ELIGIBLE_CHARS.contains(&lower_char(c))
}

/// Несёт ли символ (в любом регистре) диакритический знак.
pub fn is_explicit_diacritic(c: char) -> bool {
    EXPLICIT_DIACRITICS.contains(&lower_char(c))
}

/// Базовая форма символа: снимает диакритику только с букв из [`ELIGIBLE_CHARS`].
pub fn basic_char(c: char) -> char {
    match c {
        'ă' | 'â' => 'a',
        'Ă' | 'Â' => 'A',
        'î' => 'i',
        'Î' => 'I',
        'ș' => 's',
        'Ș' => 'S',
        'ț' => 't',
        'Ț' => 'T',
        other => other,
    }
}

/// Класс диакритики на выходе модели.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiacriticClass {
    /// Без знака.
    Plain,
    /// Бреве: ă.
    Breve,
    /// Циркумфлекс над a: â.
    CircumflexA,
    /// Циркумфлекс над i: î.
    CircumflexI,
    /// Запятая снизу: ș, ț.
    CommaBelow,
}

impl DiacriticClass {
    /// Количество классов.
    pub const COUNT: usize = 5;

    /// Класс по индексу выхода модели.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Plain),
            1 => Some(Self::Breve),
            2 => Some(Self::CircumflexA),
            3 => Some(Self::CircumflexI),
            4 => Some(Self::CommaBelow),
            _ => None,
        }
    }

    /// Индекс класса на выходе модели.
    pub fn index(&self) -> u32 {
        match self {
            Self::Plain => 0,
            Self::Breve => 1,
            Self::CircumflexA => 2,
            Self::CircumflexI => 3,
            Self::CommaBelow => 4,
        }
    }

    /// Класс, которому соответствует символ (обратное к [`Self::apply`]).
    pub fn of(c: char) -> Self {
        match lower_char(c) {
            'ă' => Self::Breve,
            'â' => Self::CircumflexA,
            'î' => Self::CircumflexI,
            'ș' | 'ț' => Self::CommaBelow,
            _ => Self::Plain,
        }
    }

    /// Применить класс к базовой букве в нижнем регистре.
    ///
    /// Недопустимая комбинация (например, бреве над `i`) оставляет букву базовой.
    pub fn apply(&self, base: char) -> char {
        match (base, self) {
            ('a', Self::Breve) => 'ă',
            ('a', Self::CircumflexA) => 'â',
            ('i', Self::CircumflexI) => 'î',
            ('s', Self::CommaBelow) => 'ș',
            ('t', Self::CommaBelow) => 'ț',
            (b, _) => b,
        }
    }
}

/// Символьный словарь модели.
#[derive(Debug, Clone)]
pub struct CharDict {
    char_to_id: HashMap<char, u32>,
}

impl CharDict {
    /// Id паддинга в символьных окнах.
    pub const PAD_ID: u32 = 0;

    /// Загрузить словарь из JSON-файла `char_dict`.
    pub fn from_file(path: impl AsRef<Path>) -> DiacResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            DiacError::Dictionary(format!("Не удалось прочитать {}: {e}", path.display()))
        })?;
        let dict = Self::from_json_str(&data)?;
        debug!("char_dict загружен из {:?}: {} символов", path, dict.len());
        Ok(dict)
    }

    /// Разобрать словарь из JSON-строки.
    pub fn from_json_str(data: &str) -> DiacResult<Self> {
        let raw: HashMap<String, u32> = serde_json::from_str(data)?;
        let mut pairs = Vec::with_capacity(raw.len());
        for (key, id) in raw {
            let mut chars = key.chars();
            let c = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(DiacError::Dictionary(format!(
                        "Ключ словаря должен быть одним символом: {key:?}"
                    )));
                }
            };
            pairs.push((c, id));
        }
        Self::from_pairs(pairs)
    }

    /// Построить словарь из пар `(символ, id)` с проверкой схемы.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (char, u32)>) -> DiacResult<Self> {
        let mut char_to_id = HashMap::new();
        let mut seen_ids = HashMap::new();
        for (c, id) in pairs {
            if lower_char(c) != c {
                return Err(DiacError::Dictionary(format!(
                    "Символ словаря должен быть в нижнем регистре: {c:?}"
                )));
            }
            if id == Self::PAD_ID {
                return Err(DiacError::Dictionary(format!(
                    "Id {} зарезервирован под паддинг (символ {c:?})",
                    Self::PAD_ID
                )));
            }
            if let Some(prev) = seen_ids.insert(id, c) {
                return Err(DiacError::Dictionary(format!(
                    "Id {id} назначен двум символам: {prev:?} и {c:?}"
                )));
            }
            char_to_id.insert(c, id);
        }

        if let Some(missing) = REQUIRED_BASE_CHARS
            .iter()
            .find(|c| !char_to_id.contains_key(c))
        {
            return Err(DiacError::Dictionary(format!(
                "В словаре нет обязательной базовой буквы {missing:?}"
            )));
        }

        Ok(Self { char_to_id })
    }

    /// Словарь из алфавита: id назначаются по порядку начиная с 1.
    pub fn from_alphabet(alphabet: &str) -> DiacResult<Self> {
        Self::from_pairs(alphabet.chars().zip(1u32..))
    }

    /// Есть ли символ в словаре.
    pub fn contains(&self, c: char) -> bool {
        self.char_to_id.contains_key(&c)
    }

    /// Id символа.
    pub fn id(&self, c: char) -> Option<u32> {
        self.char_to_id.get(&c).copied()
    }

    /// Id символа или [`Self::PAD_ID`], если символа нет.
    pub fn id_or_pad(&self, c: char) -> u32 {
        self.id(c).unwrap_or(Self::PAD_ID)
    }

    /// Размер словаря.
    pub fn len(&self) -> usize {
        self.char_to_id.len()
    }

    /// Пуст ли словарь (после валидации всегда `false`).
    pub fn is_empty(&self) -> bool {
        self.char_to_id.is_empty()
    }

    /// Превратить предсказанный класс обратно в конкретную букву.
    ///
    /// `base`: базовая буква в нижнем регистре. Неизвестный индекс класса
    /// даёт базовую букву.
    pub fn resolve(&self, base: char, class: u32) -> char {
        DiacriticClass::from_index(class)
            .map(|cls| cls.apply(base))
            .unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: &str = "aăâbcdefghiîjklmnopqrsștțuvwxyz .,!?";

    #[test]
    fn test_eligibility_is_case_insensitive() {
        for c in "aăâiîsștțAĂÂIÎSȘTȚ".chars() {
            assert!(is_eligible(c), "{c} should be eligible");
        }
        for c in "bxşţŞ1 ".chars() {
            assert!(!is_eligible(c), "{c} should not be eligible");
        }
    }

    #[test]
    fn test_explicit_diacritics() {
        assert!(is_explicit_diacritic('Ț'));
        assert!(is_explicit_diacritic('ă'));
        assert!(!is_explicit_diacritic('a'));
        assert!(!is_explicit_diacritic('ş'));
    }

    #[test]
    fn test_basic_char_only_strips_eligible() {
        assert_eq!(basic_char('ă'), 'a');
        assert_eq!(basic_char('Â'), 'A');
        assert_eq!(basic_char('ț'), 't');
        assert_eq!(basic_char('ş'), 'ş');
        assert_eq!(basic_char('é'), 'é');
    }

    #[test]
    fn test_class_apply_and_of_are_inverse() {
        for c in ELIGIBLE_CHARS {
            let class = DiacriticClass::of(c);
            assert_eq!(class.apply(basic_char(c)), c);
        }
    }

    #[test]
    fn test_invalid_class_keeps_base() {
        assert_eq!(DiacriticClass::Breve.apply('i'), 'i');
        assert_eq!(DiacriticClass::CommaBelow.apply('a'), 'a');
        let dict = CharDict::from_alphabet(ALPHABET).unwrap();
        assert_eq!(dict.resolve('s', 4), 'ș');
        assert_eq!(dict.resolve('s', 17), 's');
    }

    #[test]
    fn test_load_json_dict() {
        let dict = CharDict::from_json_str(r#"{"a": 1, "i": 2, "s": 3, "t": 4, " ": 5}"#).unwrap();
        assert_eq!(dict.len(), 5);
        assert_eq!(dict.id('t'), Some(4));
        assert_eq!(dict.id_or_pad('x'), CharDict::PAD_ID);
    }

    #[test]
    fn test_dict_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("char_dict");
        std::fs::write(&path, r#"{"a": 1, "i": 2, "s": 3, "t": 4}"#).unwrap();
        let dict = CharDict::from_file(&path).unwrap();
        assert!(dict.contains('a'));
        assert!(CharDict::from_file(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_schema_violations() {
        assert!(CharDict::from_json_str(r#"{"ab": 1, "i": 2, "s": 3, "t": 4}"#).is_err());
        assert!(CharDict::from_json_str(r#"{"A": 1, "a": 5, "i": 2, "s": 3, "t": 4}"#).is_err());
        assert!(CharDict::from_json_str(r#"{"a": 0, "i": 2, "s": 3, "t": 4}"#).is_err());
        assert!(CharDict::from_json_str(r#"{"a": 1, "i": 1, "s": 3, "t": 4}"#).is_err());
        assert!(CharDict::from_json_str(r#"{"a": 1, "i": 2, "s": 3}"#).is_err());
    }
}
