/// Formats an error and each of its causes on separate lines.
pub fn format_error_chain(err: &anyhow::Error) -> String {
    err.chain()
        .skip(1)
        .fold(err.to_string(), |output, cause| {
            format!("{output}\nCaused by: {cause}")
        })
}
