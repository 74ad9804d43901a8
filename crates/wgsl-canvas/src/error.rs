use std::fmt;

/// Shader stage a compilation diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Severity reported by the shader compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Error,
    Warning,
    Info,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Error => f.write_str("error"),
            MessageKind::Warning => f.write_str("warning"),
            MessageKind::Info => f.write_str("info"),
        }
    }
}

/// One diagnostic emitted while compiling a shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationMessage {
    pub kind: MessageKind,
    pub text: String,
    /// One-based `(line, column)` inside the submitted source, when known.
    pub location: Option<(u32, u32)>,
}

impl CompilationMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            location: None,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Some((line, column));
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error)
    }
}

impl fmt::Display for CompilationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some((line, column)) => write!(f, "{}:{}: {}: {}", line, column, self.kind, self.text),
            None => write!(f, "{}: {}", self.kind, self.text),
        }
    }
}

/// A shader stage did not produce a usable module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} shader failed to compile{}", render_messages(.messages))]
pub struct ShaderCompileError {
    pub stage: ShaderStage,
    pub messages: Vec<CompilationMessage>,
}

fn render_messages(messages: &[CompilationMessage]) -> String {
    messages
        .iter()
        .map(|message| format!("\n  {message}"))
        .collect()
}

/// A GPU object could not be created after the shaders compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to create {resource}: {reason}")]
pub struct ResourceError {
    pub resource: &'static str,
    pub reason: String,
}

impl ResourceError {
    pub fn new(resource: &'static str, reason: impl Into<String>) -> Self {
        Self {
            resource,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("no graphics backend is available on this platform: {0}")]
    UnsupportedPlatform(String),
    #[error("failed to acquire a GPU device: {0}")]
    DeviceAcquisition(String),
    #[error(transparent)]
    ShaderCompile(#[from] ShaderCompileError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("canvas session has been destroyed")]
    Destroyed,
}

impl CanvasError {
    /// Whether the session keeps rendering its previous program after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CanvasError::ShaderCompile(_) | CanvasError::Resource(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
