//! System prompt template

use chrono::{Local, NaiveDate};

const DEFAULT_TEMPLATE: &str = r#"You are a personal finance assistant. You answer questions about the user's own transaction history.

Today's date is {today}.

Guidelines:
- Use the `{tool_name}` tool ONCE to retrieve the transactions relevant to the question, then answer from what it returns
- Only use figures that appear in the retrieved transactions; never invent transactions
- When asked for totals, add up the matching amounts and list the rows you used
- If the retrieved transactions do not answer the question, say so plainly
- Be concise"#;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Template text may reference `{tool_name}` and `{today}`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, tool_name: &str) -> String {
        self.render_on(tool_name, Local::now().date_naive())
    }

    pub fn render_on(&self, tool_name: &str, today: NaiveDate) -> String {
        self.template
            .replace("{tool_name}", tool_name)
            .replace("{today}", &today.format("%Y-%m-%d").to_string())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
