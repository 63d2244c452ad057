use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::use_cases::sql_guard::SqlGuard;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::query::ValidatedQuery;
use crate::domain::schema::SchemaDescription;
use crate::infrastructure::llm_clients::LLMClient;
use crate::shared::token_counter::TokenCounter;

pub const SYSTEM_PROMPT: &str = "You are a senior data scientist. \
Your job is to write SQLite SQL queries.\n\
Rules:\n\
- Output only raw SQL (no explanations)\n\
- Only SELECT or WITH queries\n\
- No semicolons\n\
- No DDL or DML (no CREATE, DROP, DELETE, etc.)\n\
- Use ONLY the tables and columns provided\n\
- Add LIMIT 200 unless the user explicitly asks for more\n\
- If you compute aggregates (COUNT/SUM/AVG), include ORDER BY the main metric DESC";

/// Turns a natural-language question into a guarded read-only query.
pub struct QueryPlanner {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    guard: SqlGuard,
}

impl QueryPlanner {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, guard: SqlGuard) -> Self {
        Self { llm_client, guard }
    }

    /// The user message: the request verbatim, then the schema. No cell values.
    pub fn user_prompt(question: &str, schema: &SchemaDescription) -> String {
        format!(
            "user request:\n{}\n\nDatabase schema:\n{}\n",
            question,
            schema.render()
        )
    }

    pub async fn plan(
        &self,
        config: &LLMConfig,
        question: &str,
        schema: &SchemaDescription,
    ) -> Result<ValidatedQuery> {
        if config.credential().is_none() {
            return Err(AppError::MissingCredential(
                config.provider.display_name().to_string(),
            ));
        }

        // Sampling is pinned regardless of what the config says.
        let config = LLMConfig {
            temperature: 0.0,
            ..config.clone()
        };

        let user_prompt = Self::user_prompt(question, schema);
        debug!(
            estimated_tokens = TokenCounter::estimate_messages_tokens(&[
                ("system", SYSTEM_PROMPT),
                ("user", user_prompt.as_str()),
            ]),
            tables = schema.tables.len(),
            "Requesting SQL from model"
        );

        let raw = self
            .llm_client
            .generate(&config, SYSTEM_PROMPT, &user_prompt)
            .await?;
        let sql = raw.trim();

        match self.guard.validate(sql) {
            Ok(query) => {
                info!(sql = %query.as_str(), "Model produced SQL");
                Ok(query)
            }
            Err(e) => {
                warn!(sql = %sql, error = %e, "Rejected model SQL");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{ColumnSchema, TableSchema};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a canned completion and records what it was sent.
    struct StubClient {
        reply: String,
        calls: Mutex<Vec<(f32, String, String)>>,
    }

    impl StubClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMClient for StubClient {
        async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
            self.calls.lock().unwrap().push((
                config.temperature,
                system.to_string(),
                user.to_string(),
            ));
            Ok(self.reply.clone())
        }
    }

    fn schema() -> SchemaDescription {
        SchemaDescription {
            tables: vec![TableSchema {
                table_name: "orders".to_string(),
                columns: vec![
                    ColumnSchema {
                        name: "region".to_string(),
                        data_type: "VARCHAR".to_string(),
                    },
                    ColumnSchema {
                        name: "amount".to_string(),
                        data_type: "DOUBLE".to_string(),
                    },
                ],
            }],
        }
    }

    fn config() -> LLMConfig {
        LLMConfig {
            api_key: Some("sk-test".to_string()),
            temperature: 0.7,
            ..LLMConfig::default()
        }
    }

    #[tokio::test]
    async fn test_plan_returns_guarded_query() {
        let stub = StubClient::new("\n  SELECT region, SUM(amount) AS total FROM orders GROUP BY region ORDER BY total DESC LIMIT 200\n");
        let planner = QueryPlanner::new(stub.clone(), SqlGuard::new());

        let query = planner
            .plan(&config(), "Total amount per region", &schema())
            .await
            .unwrap();

        assert!(query.as_str().starts_with("SELECT region"));
        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (temperature, system, user) = &calls[0];
        assert_eq!(*temperature, 0.0);
        assert_eq!(system, SYSTEM_PROMPT);
        assert_eq!(
            user,
            "user request:\nTotal amount per region\n\nDatabase schema:\nTable: orders\n  - region (VARCHAR)\n  - amount (DOUBLE)\n"
        );
    }

    #[tokio::test]
    async fn test_stacked_statement_from_model_is_rejected() {
        let reply = "SELECT * FROM orders; DROP TABLE orders";
        let planner = QueryPlanner::new(StubClient::new(reply), SqlGuard::new());

        let err = planner
            .plan(&config(), "show orders", &schema())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::MultipleStatements);

        let violations = SqlGuard::new().violations(reply);
        assert!(violations.contains(&AppError::DisallowedKeyword("drop".to_string())));
    }

    #[tokio::test]
    async fn test_non_sql_reply_is_rejected() {
        let stub = StubClient::new("Here is your query: SELECT 1");
        let planner = QueryPlanner::new(stub, SqlGuard::new());

        let err = planner
            .plan(&config(), "anything", &schema())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::NotAReadQuery);
    }

    #[tokio::test]
    async fn test_missing_credential_skips_model() {
        let stub = StubClient::new("SELECT 1");
        let planner = QueryPlanner::new(stub.clone(), SqlGuard::new());
        let config = LLMConfig {
            api_key: Some("  ".to_string()),
            ..LLMConfig::default()
        };

        let err = planner.plan(&config, "anything", &schema()).await.unwrap_err();
        assert_eq!(err, AppError::MissingCredential("OpenAI".to_string()));
        assert!(stub.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_system_prompt_rules() {
        assert!(SYSTEM_PROMPT.contains("Only SELECT or WITH queries"));
        assert!(SYSTEM_PROMPT.contains("LIMIT 200"));
        assert!(SYSTEM_PROMPT.contains("ORDER BY the main metric DESC"));
    }
}
