// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROMPTS DA GERAÇÃO FINAL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::llm::ChatMessage;
use crate::types::{ConversationTurn, DetailLevel};

/// Mensagem fixa quando o provedor não carrega
pub const MODEL_LOAD_FAILURE_MESSAGE: &str = "Error: Failed to load language model.";

/// Mensagem fixa quando nenhuma fonte foi encontrada
pub const NO_INFORMATION_MESSAGE: &str =
    "Could not find any information matching your query. Please try rephrasing it.";

const SYSTEM_PROMPT: &str = r#"You are a research assistant. Your sole purpose is to write a comprehensive report based *only* on the provided search results.

**Instructions:**
1.  **Strictly Adhere to Sources:** Base your entire report on the information given in the 'Source X' snippets. Do not add external knowledge.
2.  **Structure the Report:** Organize your response into:
    *   **Executive Summary:** A brief, high-level summary of the main findings.
    *   **Detailed Findings:** A thorough breakdown of the information, organized by key themes.
    *   **Conclusion:** A summary of the most important points.
3.  **Cite Everything:** For every piece of information you use, you MUST cite the source using the format `[Source X]`. Multiple sources can be cited like `[Source 1, 3]`. The URL is already included in the context; just use the number.
4.  **Synthesize, Don't List:** Do not simply list the sources. Weave the information together into a coherent narrative. If sources conflict, note the discrepancy.
5.  **Format with Markdown:** Use headers, bullet points, and bold text to make the report easy to read.
"#;

const CONCISE_MODIFIER: &str = "\n\nFORMAT: Maximum 3 bullet points total. Be extremely concise.";

const DETAILED_MODIFIER: &str =
    "\n\nFORMAT: Include specific statistics and direct quotes where available.";

/// Instrução de sistema com o modificador de nível de detalhe
pub fn system_prompt(detail: DetailLevel) -> String {
    let modifier = match detail {
        DetailLevel::Concise => CONCISE_MODIFIER,
        DetailLevel::Standard => "",
        DetailLevel::Detailed => DETAILED_MODIFIER,
    };
    format!("{}{}", SYSTEM_PROMPT, modifier)
}

/// Preâmbulo com os turnos anteriores (vazio sem histórico)
pub fn history_preamble(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut preamble = String::from("PREVIOUS CONVERSATION:\n");
    for turn in history {
        preamble.push_str(&format!(
            "User asked: {}\nYou answered: {}\n---\n",
            turn.query, turn.answer
        ));
    }
    preamble.push_str("CURRENT QUERY:\n");
    preamble
}

/// Instrução do usuário: histórico + pergunta + contexto de evidências
pub fn user_prompt(query: &str, context: &str, history: &[ConversationTurn]) -> String {
    format!(
        "{}Please write a detailed research report on the query: \"{}\"\n\n\
         Use the following search results as your only source of information:\n---\n{}\n---",
        history_preamble(history),
        query,
        context
    )
}

/// Mensagens do chat de geração
pub fn report_messages(
    query: &str,
    context: &str,
    history: &[ConversationTurn],
    detail: DetailLevel,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(detail)),
        ChatMessage::user(user_prompt(query, context, history)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_rules() {
        let prompt = system_prompt(DetailLevel::Standard);
        assert!(prompt.contains("Executive Summary"));
        assert!(prompt.contains("Detailed Findings"));
        assert!(prompt.contains("`[Source X]`"));
        assert!(prompt.contains("`[Source 1, 3]`"));
        assert!(!prompt.contains("FORMAT:"));
    }

    #[test]
    fn test_detail_modifiers() {
        assert!(system_prompt(DetailLevel::Concise).ends_with("Maximum 3 bullet points total. Be extremely concise."));
        assert!(system_prompt(DetailLevel::Detailed).ends_with("direct quotes where available."));
    }

    #[test]
    fn test_user_prompt_without_history() {
        let prompt = user_prompt("rust", "Source 1: x", &[]);
        assert_eq!(
            prompt,
            "Please write a detailed research report on the query: \"rust\"\n\n\
             Use the following search results as your only source of information:\n---\nSource 1: x\n---"
        );
    }

    #[test]
    fn test_history_preamble_precedes_query() {
        let history = vec![ConversationTurn::new("q1", "a1"), ConversationTurn::new("q2", "a2")];
        let prompt = user_prompt("q3", "ctx", &history);
        assert!(prompt.starts_with(
            "PREVIOUS CONVERSATION:\nUser asked: q1\nYou answered: a1\n---\nUser asked: q2\nYou answered: a2\n---\nCURRENT QUERY:\nPlease write"
        ));
    }

    #[test]
    fn test_report_messages_roles() {
        let messages = report_messages("q", "ctx", &[], DetailLevel::Concise);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, crate::llm::ChatRole::System);
        assert_eq!(messages[1].role, crate::llm::ChatRole::User);
    }
}
