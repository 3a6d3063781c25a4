use std::path::Path;

/// Prompt asking the model to write code for an instruction
pub fn generate_code(instruction: &str, language: &str) -> String {
    format!(
        r#"You are a {language} programmer agent. Your task is to write {language} code based on the user's instruction.
Ensure the code is clean, well-commented, and follows best practices.
Use the available tools like `write_file` to save the code to a file if needed.

Instruction: {instruction}

Return only the {language} code block, enclosed in ```{language} ... ```"#
    )
}

/// Prompt asking the model to execute a file with the run_command tool
pub fn run_code(path: &Path, command: &str) -> String {
    format!(
        r#"You are a code execution agent. Your task is to run the code located at {path}
and return the output.
Use the `run_command` tool.

Command: {command}

Return the output of the command."#,
        path = path.display(),
    )
}

/// Prompt asking the model to read a file with the read_file tool
pub fn read_file(path: &Path) -> String {
    format!(
        r#"You are a file reading agent. Your task is to read the content of the file located at {path}
and return its content.
Use the `read_file` tool."#,
        path = path.display(),
    )
}
