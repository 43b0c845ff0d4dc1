use serde_json::json;

use crate::commands::input::{evaluate, input_failure, EvaluateArgs};
use crate::commands::CommandResult;

pub fn run(args: &EvaluateArgs) -> CommandResult {
    let evaluation = match evaluate(args) {
        Ok(evaluation) => evaluation,
        Err(error) => return input_failure("eligibility", &error),
    };

    let eligibility = &evaluation.eligibility;
    let message = format!(
        "{} service categories, {} frequencies, {} extras, {} exclude parameters eligible",
        eligibility.service_categories.len(),
        eligibility.frequencies.len(),
        eligibility.extras.len(),
        eligibility.exclude_parameters.len()
    );
    let data = json!({ "eligibility": evaluation.eligibility, "draft": evaluation.draft });
    CommandResult::success("eligibility", message, Some(data))
}
