//! Relevance filtering: the model keeps only the parts of an excerpt that
//! answer the query.

use cheatguard_common::{Result, RunMode};
use cheatguard_llm::traits::LlmClient;
use std::sync::Arc;

const KEEP_URL_NOTE: &str = "\n\nThe content starts with the address of the page. Keep that address \
as the first line of your reply.";

pub fn filter_prompt(query: &str, content: &str, mode: RunMode) -> String {
    let keep_url = if mode.prefix_source_url() {
        KEEP_URL_NOTE
    } else {
        ""
    };
    format!(
        "You are an assistant that keeps only the parts of a web page that answer a user's query.

User query: {query}

Content:
{content}

Remove everything that does not answer the query. Do not add anything that is not in the content, \
and leave out navigation, filters and comments. If nothing in the content answers the query, reply \
with an empty string. Reply with the kept text only, without any introduction or remark. Keep every \
date tied to the article (submission, publication, revision). When the same article carries several \
dates, keep only the most recent one.{keep_url}"
    )
}

/// The model's way of saying "nothing relevant here".
pub fn is_empty_reply(reply: &str) -> bool {
    matches!(reply.trim(), "" | "\"\"" | "''")
}

#[derive(Clone)]
pub struct RelevanceFilter {
    llm: Arc<dyn LlmClient>,
    mode: RunMode,
}

impl RelevanceFilter {
    pub fn new(llm: Arc<dyn LlmClient>, mode: RunMode) -> Self {
        Self { llm, mode }
    }

    /// `Ok(None)` when the model found nothing relevant.
    pub async fn filter(&self, query: &str, excerpt: &str) -> Result<Option<String>> {
        let reply = self.llm.ask(&filter_prompt(query, excerpt, self.mode)).await?;
        if is_empty_reply(&reply) {
            return Ok(None);
        }
        Ok(Some(reply))
    }
}
