/// Evaluates an arithmetic expression for display.
///
/// Failures are reported in the returned text rather than as an error.
pub fn calculate(expression: &str) -> String {
    match meval::eval_str(expression) {
        Ok(value) => value.to_string(),
        Err(err) => format!("Invalid expression: {err}"),
    }
}
