/// A (locale, text) pair. Strings carry an explicit length and are not null-terminated; they may
/// contain embedded zero bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalizedText {
    locale: String,
    text: String,
}

impl LocalizedText {
    #[must_use]
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            text: text.into(),
        }
    }

    /// Creates a localized text with an empty locale, for applications that do not localize.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
