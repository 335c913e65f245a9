use crate::ProcessError;

/// Splits a command line into program and arguments using POSIX shell quoting rules.
///
/// No shell is involved: globs, variables and redirections are passed through literally.
pub fn parse_command_line(command_line: &str) -> Result<Vec<String>, ProcessError> {
    let words = shell_words::split(command_line).map_err(|source| ProcessError::Parse {
        command: command_line.to_string(),
        source,
    })?;
    if words.is_empty() {
        return Err(ProcessError::EmptyCommand);
    }
    Ok(words)
}
