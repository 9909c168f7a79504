use lazy_static::lazy_static;

use crate::models::tool::{InputSchema, Property, ToolDescriptor};

lazy_static! {
    static ref TOOLS: Vec<ToolDescriptor> = vec![
        ToolDescriptor::new(
            "execute_command",
            "Execute a shell command in the terminal. Use this to run any command like ls, cat, mkdir, etc.",
            InputSchema::object(
                [("command", Property::string("The shell command to execute"))],
                &["command"],
            ),
        ),
        ToolDescriptor::new(
            "read_file",
            "Read the contents of a file",
            InputSchema::object(
                [("path", Property::string("The path to the file to read"))],
                &["path"],
            ),
        ),
        ToolDescriptor::new(
            "write_file",
            "Write content to a file. Creates the file if it doesn't exist.",
            InputSchema::object(
                [
                    ("path", Property::string("The path to the file")),
                    ("content", Property::string("The content to write to the file")),
                ],
                &["path", "content"],
            ),
        ),
        ToolDescriptor::new(
            "list_files",
            "List files in a directory",
            InputSchema::object(
                [(
                    "path",
                    Property::string(
                        "The directory path to list. Defaults to current directory if not specified."
                    ),
                )],
                &[],
            ),
        ),
        ToolDescriptor::new(
            "create_directory",
            "Create a new directory",
            InputSchema::object(
                [("path", Property::string("The path of the directory to create"))],
                &["path"],
            ),
        ),
        ToolDescriptor::new(
            "delete_file",
            "Delete a file or directory",
            InputSchema::object(
                [(
                    "path",
                    Property::string("The path to the file or directory to delete"),
                )],
                &["path"],
            ),
        ),
        ToolDescriptor::new(
            "run_python",
            "Execute Python code",
            InputSchema::object(
                [("code", Property::string("The Python code to execute"))],
                &["code"],
            ),
        ),
        ToolDescriptor::new(
            "run_javascript",
            "Execute JavaScript/Node.js code",
            InputSchema::object(
                [("code", Property::string("The JavaScript code to execute"))],
                &["code"],
            ),
        ),
    ];
}

/// Every tool offered to the model, in a fixed order
pub fn all_tools() -> &'static [ToolDescriptor] {
    &TOOLS
}

pub fn get_tool(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|tool| tool.name == name)
}
