//! Prompt construction for SQL generation.
//!
//! Builds the full generation prompt from the user question, the rendered
//! schema text and a fixed rule set. Pure functions of their inputs.

/// Prompt template for the SQL generator.
const SQL_PROMPT_TEMPLATE: &str = r#"You are a highly skilled AI that converts natural language questions into valid SQL queries for a PostgreSQL database.

Database schema:
{schema_text}

Rules:
0. If the user question is NOT related to data, metrics, revenue, counts, averages, trends, subscribers, products, billing, or any measurable information in the database, then DO NOT generate SQL from the schema.
   Instead return exactly:
   SELECT 'Non-data question: ask about measurable information in this database.' AS message;
1. Understand the user's question carefully.
2. Only return valid PostgreSQL SQL that can execute without errors.
3. Only use columns and tables present in the schema.
4. Include necessary JOINs if the query spans multiple tables.
5. If the question asks for totals, counts, sums, averages, or comparisons, always return aggregated numeric columns (COUNT, SUM, AVG, etc).
6. If grouping by a text column, include the numeric column in GROUP BY or use MIN()/MAX() to order.
7. Ensure ORDER BY columns are either in GROUP BY or aggregated.
8. If calculating age from date_of_birth, always cast to DATE first.
9. Return ONLY the SQL query, nothing else.

Examples:

User: "What is the total revenue per product category last year?"
SQL: "SELECT p.category, SUM(fb.total_charges) AS total_revenue
FROM fact_billing fb
JOIN dim_subscriber ds ON fb.subscriber_key = ds.subscriber_key
JOIN dim_product p ON ds.product_key = p.product_key
JOIN dim_time dt ON fb.time_key = dt.time_key
WHERE dt.year = (SELECT MAX(year)-1 FROM dim_time)
GROUP BY p.category;"

User: "How many subscribers signed up in 2024?"
SQL: "SELECT COUNT(subscriber_key) AS num_subscribers
FROM dim_subscriber ds
JOIN dim_time dt ON ds.time_key = dt.time_key
WHERE dt.year = 2024;"

User question:
{user_question}

SQL:
"#;

/// Builds the generation prompt for the given question and schema text.
pub fn build_sql_prompt(user_question: &str, schema_text: &str) -> String {
    SQL_PROMPT_TEMPLATE
        .replace("{schema_text}", schema_text)
        .replace("{user_question}", user_question)
}

/// A question/SQL pair used as a few-shot example.
#[derive(Debug, Clone)]
pub struct FewShotExample {
    /// The natural-language question.
    pub question: String,
    /// The SQL answering it.
    pub sql: String,
}

/// Builds a prompt with caller-supplied few-shot examples.
pub fn build_few_shot_prompt(
    user_question: &str,
    schema_text: &str,
    examples: &[FewShotExample],
) -> String {
    let mut lines = vec![
        "You are an expert SQL generator AI for PostgreSQL.".to_string(),
        "Database schema:".to_string(),
        schema_text.to_string(),
    ];

    if !examples.is_empty() {
        lines.push("Follow these examples:".to_string());
        for example in examples {
            lines.push(format!(
                "User: \"{}\"\nSQL: \"{}\"",
                example.question, example.sql
            ));
        }
    }

    lines.push(format!("User: \"{user_question}\"\nSQL:"));
    lines.join("\n")
}
