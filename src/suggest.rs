//! Autocomplete suggestions for command parameters

const COUNTS: [&str; 4] = ["16", "23", "50", "99"];
const DISTANCES: [&str; 4] = ["100", "200", "300", "400"];
const REQUEST_URLS: [&str; 2] = [
    "https://httpbin.org/get?success=true",
    "https://jsonplaceholder.typicode.com/posts/1",
];
const IMAGE_URLS: [&str; 3] = [
    "https://picsum.photos/200/300",
    "https://picsum.photos/256",
    "https://picsum.photos/512",
];

/// Suggestions for the parameter `key` given what the user typed so far.
/// `None` for keys without suggestions.
///
/// Numeric keys filter their presets by substring. URL keys echo the query
/// first so it can be accepted as typed.
pub fn suggestions(key: &str, query: &str) -> Option<Vec<String>> {
    match key {
        "count" => Some(filtered(&COUNTS, query)),
        "distance" => Some(filtered(&DISTANCES, query)),
        "requestUrl" => Some(echoed(&REQUEST_URLS, query)),
        "imageUrl" => Some(echoed(&IMAGE_URLS, query)),
        _ => None,
    }
}

fn filtered(presets: &[&str], query: &str) -> Vec<String> {
    presets
        .iter()
        .filter(|s| s.contains(query))
        .map(|s| s.to_string())
        .collect()
}

fn echoed(presets: &[&str], query: &str) -> Vec<String> {
    std::iter::once(query)
        .chain(presets.iter().copied())
        .map(str::to_string)
        .collect()
}
