use serde_json::json;

use crate::commands::input::{evaluate, input_failure, EvaluateArgs};
use crate::commands::CommandResult;

pub fn run(args: &EvaluateArgs) -> CommandResult {
    let evaluation = match evaluate(args) {
        Ok(evaluation) => evaluation,
        Err(error) => return input_failure("quote", &error),
    };

    let quote = evaluation.quote;
    let message = match &quote.duration.display_text {
        Some(length) => {
            format!("final amount {} for a shortened {length} visit", quote.final_amount)
        }
        None => format!("final amount {}", quote.final_amount),
    };
    CommandResult::success("quote", message, Some(json!(quote)))
}
