//! Языки, для которых существуют модели восстановления диакритики.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Язык модели.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lang {
    /// Румынский: ă, â, î, ș, ț.
    #[serde(rename = "ro")]
    Ro,
}

impl Lang {
    /// Все поддерживаемые языки.
    pub fn all() -> &'static [Lang] {
        &[Lang::Ro]
    }

    /// Код ISO 639-1, он же имя директории в дереве ресурсов.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Ro => "ro",
        }
    }

    /// Полное человекочитаемое название.
    pub fn display_name(&self) -> &'static str {
        match self {
            Lang::Ro => "Romanian",
        }
    }

    /// Длина самого длинного известного слова языка.
    ///
    /// Токены длиннее этого значения считаются мусором и не подаются в модель.
    pub fn longest_word_len(&self) -> usize {
        match self {
            // pneumonoultramicroscopicsilicovolcanoconioză
            Lang::Ro => 44,
        }
    }

    /// Парсинг из строки (регистр не важен).
    pub fn from_str_loose(s: &str) -> Option<Lang> {
        match s.trim().to_lowercase().as_str() {
            "ro" | "ron" | "rum" | "romanian" | "română" | "romana" => Some(Lang::Ro),
            _ => None,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
