//! Shareable links: the full configuration packed into a query string.

use std::collections::HashMap;

use url::{Url, form_urlencoded};

use crate::{
    Error, Result,
    schema::{ConfigField, Configuration},
};

/// Build a configuration from link query parameters.
///
/// Returns `None` unless all five short keys carry a non-empty value; a
/// partially filled configuration is never produced.
pub fn from_link_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Option<Configuration>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let params: HashMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().trim().to_string()))
        .collect();

    let mut config = Configuration::default();
    for field in ConfigField::ALL {
        let value = params.get(field.link_key()).filter(|v| !v.is_empty())?;
        config.set(field, value.clone());
    }
    Some(config)
}

/// Parse a full URL, a bare query string, or `?query`.
pub fn from_link(link: &str) -> Option<Configuration> {
    let query = link.split_once('?').map_or(link, |(_, query)| query);
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    from_link_params(form_urlencoded::parse(query.as_bytes()))
}

/// Append the five fields to `base_url` using the short link keys.
pub fn to_shareable_link(config: &Configuration, base_url: &str) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|e| Error::invalid_link(format!("{base_url}: {e}")))?;
    url.query_pairs_mut().extend_pairs(
        ConfigField::ALL
            .into_iter()
            .map(|field| (field.link_key(), config.get(field))),
    );
    Ok(url.into())
}
