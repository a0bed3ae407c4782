//! Terminal rendering of flow forms
//!
//! Each field of a form is asked for on its own line. An empty answer keeps
//! the field's default.

use anyhow::{bail, Result};
use onewire_flow::{ConfigFlowHandler, FlowManager, FlowResult, FlowResultType, FormField};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, question: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => bail!("input closed"),
        }
    }

    /// Drive a flow until it creates an entry or aborts
    pub async fn run(
        &mut self,
        manager: &FlowManager,
        mut result: FlowResult,
    ) -> Result<FlowResult> {
        while result.result_type == FlowResultType::Form {
            print_form(&result);

            let mut input = Map::new();
            for field in &result.data_schema {
                let answer = self.ask(&question(field)).await?;
                if let Some(value) = parse_answer(field, &answer) {
                    input.insert(field.name.clone(), value);
                }
            }

            result = manager
                .progress_flow(&result.flow_id, Some(Value::Object(input)))
                .await?;
        }
        Ok(result)
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

fn print_form(result: &FlowResult) {
    println!();
    println!("== {} ==", result.step_id.as_deref().unwrap_or_default());

    if let Some(placeholders) = &result.description_placeholders {
        for (key, value) in placeholders {
            println!("{}: {}", key, value);
        }
    }
    if let Some(errors) = &result.errors {
        for (field, code) in errors {
            println!("error ({}): {}", field, code);
        }
    }
}

fn question(field: &FormField) -> String {
    let mut question = field.name.clone();

    if let Some(options) = &field.options {
        let choices: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, option)| format!("{}) {}", i + 1, option))
            .collect();
        question.push_str(&format!(" [{}]", choices.join(", ")));
    }
    if let Some(default) = &field.default {
        question.push_str(&format!(" (default {})", default));
    }
    question.push_str(": ");
    question
}

/// Pick an option by 1-based number or by its text
fn choose(options: &[String], answer: &str) -> String {
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_else(|| answer.to_string())
}

/// Turn a typed answer into the submitted value; `None` leaves the field out
pub fn parse_answer(field: &FormField, answer: &str) -> Option<Value> {
    if answer.is_empty() {
        return field.default.clone();
    }

    let options = field.options.as_deref().unwrap_or_default();
    let value = match field.field_type.as_str() {
        "integer" => answer
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(answer)),
        "boolean" => Value::Bool(matches!(
            answer.to_ascii_lowercase().as_str(),
            "y" | "yes" | "true" | "1"
        )),
        "select" => Value::from(choose(options, answer)),
        "multi_select" => Value::from(
            answer
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| choose(options, part))
                .collect::<Vec<_>>(),
        ),
        _ => Value::from(answer),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_answer_keeps_default() {
        let field = FormField::required("host", "string").with_default("localhost");
        assert_eq!(parse_answer(&field, ""), Some(json!("localhost")));

        let field = FormField::required("mount_dir", "string");
        assert_eq!(parse_answer(&field, ""), None);
    }

    #[test]
    fn test_integer_answer() {
        let field = FormField::required("port", "integer");
        assert_eq!(parse_answer(&field, "4304"), Some(json!(4304)));
        assert_eq!(parse_answer(&field, "http"), Some(json!("http")));
    }

    #[test]
    fn test_select_by_number_or_text() {
        let field = FormField::required("type", "select").with_options(["OWServer", "SysBus"]);
        assert_eq!(parse_answer(&field, "2"), Some(json!("SysBus")));
        assert_eq!(parse_answer(&field, "OWServer"), Some(json!("OWServer")));
        assert_eq!(parse_answer(&field, "7"), Some(json!("7")));
    }

    #[test]
    fn test_multi_select() {
        let field = FormField::optional("ds18b20_device_selection", "multi_select")
            .with_options(["Kitchen (28.AAA)", "28.BBB"]);
        assert_eq!(
            parse_answer(&field, "1, 28.BBB"),
            Some(json!(["Kitchen (28.AAA)", "28.BBB"]))
        );
    }

    #[test]
    fn test_boolean() {
        let field = FormField::optional("clear_device_config", "boolean").with_default(false);
        assert_eq!(parse_answer(&field, "yes"), Some(json!(true)));
        assert_eq!(parse_answer(&field, "no"), Some(json!(false)));
    }
}
