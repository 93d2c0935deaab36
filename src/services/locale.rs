use std::collections::HashMap;

/// Maps request locales (`en`, `en-GB`, `fr_FR`) to the store's locale codes (`eng-GB`).
#[derive(Debug, Clone, Default)]
pub struct LocaleConverter {
    mappings: HashMap<String, String>,
}

impl LocaleConverter {
    /// Parses `tag=code` pairs separated by commas, e.g. `en=eng-GB,fr=fre-FR`.
    pub fn from_mapping(raw: &str) -> Self {
        let mappings = raw
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(tag, code)| (normalize(tag), code.trim().to_string()))
            .filter(|(tag, code)| !tag.is_empty() && !code.is_empty())
            .collect();
        Self { mappings }
    }

    /// Store locale code for `locale`, trying the full tag before its primary subtag.
    pub fn convert_to_store(&self, locale: &str) -> Option<String> {
        let tag = normalize(locale);
        if let Some(code) = self.mappings.get(&tag) {
            return Some(code.clone());
        }
        let primary = tag.split('-').next()?;
        self.mappings.get(primary).cloned()
    }
}

/// First language tag of an `Accept-Language` header value.
pub fn preferred_locale(accept_language: &str) -> Option<String> {
    accept_language
        .split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim())
        .find(|tag| !tag.is_empty() && *tag != "*")
        .map(String::from)
}

fn normalize(tag: &str) -> String {
    tag.trim().replace('_', "-").to_lowercase()
}
