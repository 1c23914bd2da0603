use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use network::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/posts?user=john&page=2");
/// assert_eq!(params.get("user"), Some(&"john".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.find('?') {
        Some(query_start) => parse_pairs(&uri[query_start + 1..]),
        None => HashMap::new(),
    }
}

/// Decode an `application/x-www-form-urlencoded` string (a query string
/// without the leading `?`, or a form body).
pub fn parse_pairs(encoded: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for param in encoded.split('&').filter(|p| !p.is_empty()) {
        match param.split_once('=') {
            Some((key, value)) => {
                params.insert(decode_component(key), decode_component(value));
            }
            // Flag parameter without value
            None => {
                params.insert(decode_component(param), String::new());
            }
        }
    }

    params
}

fn decode_component(raw: &str) -> String {
    // Forms encode spaces as '+', which percent-decoding leaves alone.
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Get an integer parameter with validation and default
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params.get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

/// Requested page number from a URI; anything unparsable means page 1.
pub fn page_param(uri: &str) -> usize {
    get_int(&parse_query_params(uri), "page", 1)
}
