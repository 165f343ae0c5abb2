use serde::{Deserialize, Serialize};

/// Subset of the Brave web search response we read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchApiResponse {
    #[serde(default)]
    pub web: Option<WebResults>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebResults {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub page_age: Option<String>,
    #[serde(default)]
    pub cluster: Option<Vec<ResultItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl WebSearchApiResponse {
    /// Result URLs in display order.
    ///
    /// Web results can be a plain result with `url`, or a "cluster" with
    /// several items; clusters are expanded in place.
    pub fn urls(&self) -> Vec<String> {
        let mut out = Vec::new();
        let Some(web) = self.web.as_ref() else {
            return out;
        };
        for it in &web.results {
            if let Some(u) = it.url.as_deref().filter(|u| !u.is_empty()) {
                out.push(u.to_string());
                continue;
            }
            if let Some(cluster) = it.cluster.as_ref() {
                out.extend(cluster.iter().map(|item| item.url.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clusters_are_expanded_in_order() {
        let resp: WebSearchApiResponse = serde_json::from_value(json!({
            "type": "search",
            "web": { "results": [
                { "title": "A", "url": "https://a.test" },
                { "cluster": [
                    { "title": "B", "url": "https://b.test" },
                    { "title": "C", "url": "https://c.test" }
                ]},
                { "title": "D", "url": "https://d.test", "page_age": "2025-01-02" }
            ]}
        }))
        .unwrap();

        assert_eq!(
            resp.urls(),
            vec!["https://a.test", "https://b.test", "https://c.test", "https://d.test"]
        );
    }

    #[test]
    fn missing_web_vertical_is_empty() {
        let resp: WebSearchApiResponse = serde_json::from_value(json!({ "type": "search" })).unwrap();
        assert!(resp.urls().is_empty());
    }
}
