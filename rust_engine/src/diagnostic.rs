//! 模型构建期诊断信息
//!
//! 构建模型时不通过错误中断流程，而是收集诊断列表，
//! 由调用方决定如何展示。

use std::fmt;

/// 诊断严重程度
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// 必须回退到安全行为的问题
    Fatal,
}

/// 单条诊断
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 相关的资源文件（相对路径）
    pub file: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            file: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, message)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// 写入日志
    pub fn log(&self) {
        match self.severity {
            Severity::Info => log::info!("{self}"),
            Severity::Warning => log::warn!("{self}"),
            Severity::Error | Severity::Fatal => log::error!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{:?}] {}: {}", self.severity, file, self.message),
            None => write!(f, "[{:?}] {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_file() {
        let diagnostic = Diagnostic::error("bad").with_file("animations.json");
        assert_eq!(diagnostic.to_string(), "[Error] animations.json: bad");
        assert_eq!(Diagnostic::info("ok").to_string(), "[Info] ok");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Warning > Severity::Info);
    }
}
