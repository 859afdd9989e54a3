// src/reasoning/decompose.rs
// Rule-based decomposition of a prompt into one step per validation type plus synthesis

use super::backend::{Thought, ThoughtRequest};

fn threshold_clause(request: &ThoughtRequest, name: &str, unit: &str) -> String {
    match request.context.thresholds.get(name) {
        Some(value) => format!(" ({} {}{})", name, value, unit),
        None => String::new(),
    }
}

fn step_text(request: &ThoughtRequest, validation_type: &str) -> String {
    let profile = &request.context.profile;
    match validation_type {
        "test" => format!(
            "Run the test suite and check coverage against the {} profile{}.",
            profile,
            threshold_clause(request, "test_coverage", "%")
        ),
        "code_quality" => format!(
            "Run the linter and compare complexity, errors and warnings with the {} limits{}.",
            profile,
            threshold_clause(request, "complexity", "")
        ),
        "type_check" => "Run the type checker and report any type errors.".to_string(),
        "security" => {
            "Scan the code for security vulnerabilities and flag high-severity findings.".to_string()
        }
        "performance" => "Benchmark the code and record its wall time.".to_string(),
        other => format!("Run the {} validation and record its result.", other),
    }
}

/// Draft the thought for `request.step_index` (1-based)
pub fn draft_step(request: &ThoughtRequest) -> Thought {
    let types = &request.context.validation_types;
    let index = request.step_index.max(1);

    if let Some(validation_type) = types.get(index - 1) {
        return Thought {
            step_index: index,
            content: step_text(request, validation_type),
            next_step_needed: true,
            validation_type: Some(validation_type.clone()),
        };
    }

    let content = if types.is_empty() {
        format!(
            "Nothing selected to validate for \"{}\"; report the result under the {} profile.",
            request.prompt, request.context.profile
        )
    } else {
        format!(
            "Aggregate the results of {} and decide the overall status under the {} profile.",
            types.join(", "),
            request.context.profile
        )
    };
    Thought {
        step_index: index,
        content,
        next_step_needed: false,
        validation_type: None,
    }
}
