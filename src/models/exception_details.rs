use serde::Serialize;

/// Exception details of the exception in a chain.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub id: i32,

    pub outer_id: i32,

    /// Exception type name.
    pub type_name: String,

    /// Exception message.
    pub message: String,

    pub has_full_stack: bool,

    /// Text describing the stack; the JSON-encoded form of `parsed_stack`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Structured stack frames.
    pub parsed_stack: Vec<StackFrame>,
}

/// A single frame of a stack trace.
///
/// Native frames carry `file_name` and `line`. Client-reported (browser)
/// stacks are not parsed; they produce one synthetic frame with method and
/// assembly `"JS"` and the raw stack text in `stack`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub level: usize,

    /// Synthesized method name, `<class><type><function>` for native frames.
    pub method: String,

    pub assembly: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Raw stack text for the synthetic JS frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}
