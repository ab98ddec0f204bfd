//! Prompt construction.

use crate::engine::RetrievedDoc;

/// Build a grounded prompt from retrieved context and the original query.
pub fn build_prompt(query: &str, contexts: &[RetrievedDoc], extra: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are ROXY, a local assistant. Answer from the context below. \
         If the context does not contain the answer, say so plainly; never \
         claim to have performed an action.\n",
    );

    if !contexts.is_empty() {
        prompt.push_str("\nContext:\n");
        for doc in contexts {
            prompt.push_str(&format!("[{}] {}\n", doc.id, doc.document));
        }
    }

    if let Some(extra) = extra {
        prompt.push_str(&format!("\nAdditional context:\n{extra}\n"));
    }

    prompt.push_str(&format!("\nQuestion: {query}\nAnswer:"));
    prompt
}

/// Build a context-free prompt for the degraded path.
pub fn build_direct_prompt(query: &str) -> String {
    format!(
        "You are ROXY, a local assistant. No stored notes were retrievable \
         for this question, so answer from general knowledge and say when \
         you are unsure.\n\nQuestion: {query}\nAnswer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_context_ids_and_query() {
        let contexts = vec![RetrievedDoc {
            id: "notes-3".to_string(),
            document: "ROXY runs on localhost.".to_string(),
            score: 0.9,
        }];

        let prompt = build_prompt("where does roxy run", &contexts, None);
        assert!(prompt.contains("[notes-3] ROXY runs on localhost."));
        assert!(prompt.contains("Question: where does roxy run"));
    }

    #[test]
    fn extra_context_is_appended() {
        let prompt = build_prompt("q", &[], Some("file sample"));
        assert!(prompt.contains("Additional context:\nfile sample"));
    }
}
