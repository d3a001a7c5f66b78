use std::fmt;
use std::str::FromStr;

use failure::bail;

use crate::errors::NluTrainingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    DE,
    EN,
    ES,
    FR,
    JA,
    KO,
}

impl Language {
    pub fn all() -> &'static [Language] {
        static ALL: [Language; 6] = [
            Language::DE,
            Language::EN,
            Language::ES,
            Language::FR,
            Language::JA,
            Language::KO,
        ];
        &ALL
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::DE => "de",
            Language::EN => "en",
            Language::ES => "es",
            Language::FR => "fr",
            Language::JA => "ja",
            Language::KO => "ko",
        }
    }

    /// Word-character test backing `Token::is_word`. Space-separated
    /// languages additionally accept the apostrophe inside contracted
    /// forms, which the tokenizer keeps attached to the word.
    pub fn is_word_char(&self, c: char) -> bool {
        match self {
            Language::JA | Language::KO => c.is_alphanumeric(),
            _ => c.is_alphanumeric() || c == '\'',
        }
    }
}

impl FromStr for Language {
    type Err = ::failure::Error;

    fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
        for language in Language::all() {
            if language.code() == s.to_lowercase() {
                return Ok(*language);
            }
        }
        bail!(NluTrainingError::UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
